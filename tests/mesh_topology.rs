mod common;

use approx::assert_relative_eq;
use common::{cube_indices, cube_vertices, tetrahedron};
use riposte3d::math::Point;
use riposte3d::mesh::{Mesh, MeshBuilderError, MeshFlags, TopologyError, INVALID, PATCH_LEAF};

#[test]
fn cube_twins_are_an_involution() {
    let mesh = Mesh::from_polygons(
        &cube_vertices(Point::origin(), 0.5),
        &cube_indices(),
        None,
        1.0,
        MeshFlags::empty(),
    )
    .unwrap();

    assert_eq!(mesh.vertices().len(), 8);
    assert_eq!(mesh.faces().len(), 12);
    assert_eq!(mesh.edges().len(), 36);

    for e in 0..mesh.edges().len() as u32 {
        let t = mesh.twin(e, PATCH_LEAF);
        assert_ne!(t, INVALID, "edge {} has no twin", e);
        assert_eq!(mesh.twin(t, PATCH_LEAF), e);
        assert_ne!(t, e);

        // Twins traverse the same undirected edge in opposite directions.
        assert_eq!(mesh.edges()[e as usize].origin, mesh.head(t));
        assert_eq!(mesh.edges()[t as usize].origin, mesh.head(e));
    }
}

#[test]
fn duplicate_coordinates_are_merged() {
    // Every face brings its own copies of its vertices.
    let verts = cube_vertices(Point::origin(), 0.5);
    let indices = cube_indices();
    let mut exploded = Vec::new();
    let mut new_indices = Vec::new();
    for &i in &indices {
        new_indices.push(exploded.len() as u32);
        exploded.push(verts[i as usize]);
    }

    let mesh =
        Mesh::from_polygons(&exploded, &new_indices, None, 1.0, MeshFlags::empty()).unwrap();
    assert_eq!(mesh.vertices().len(), 8);
}

#[test]
fn quads_are_fan_triangulated() {
    let verts = cube_vertices(Point::origin(), 0.5);
    let quads = vec![
        0u32, 2, 3, 1, // bottom
        4, 5, 7, 6, // top
        0, 4, 6, 2, // -x
        1, 3, 7, 5, // +x
        0, 1, 5, 4, // -y
        2, 6, 7, 3, // +y
    ];
    let mesh =
        Mesh::from_polygons(&verts, &quads, Some(&[4; 6]), 1.0, MeshFlags::empty()).unwrap();
    assert_eq!(mesh.faces().len(), 12);
    for e in 0..mesh.edges().len() as u32 {
        assert_ne!(mesh.twin(e, PATCH_LEAF), INVALID);
    }
}

#[test]
fn reversed_winding_is_rejected() {
    let (verts, mut indices) = tetrahedron();
    // Flip the last face.
    let n = indices.len();
    indices.swap(n - 2, n - 1);

    let err = Mesh::from_polygons(&verts, &indices, None, 1.0, MeshFlags::empty()).unwrap_err();
    assert!(matches!(
        err,
        MeshBuilderError::Topology(TopologyError::InconsistentWinding { .. })
    ));
}

#[test]
fn non_manifold_edge_is_rejected() {
    // Three triangles sharing the edge (0, 1).
    let verts = vec![
        Point::new(0.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 0.0),
        Point::new(0.0, 1.0, 0.0),
        Point::new(0.0, -1.0, 0.0),
        Point::new(0.0, 0.0, 1.0),
    ];
    let indices = vec![0u32, 1, 2, 1, 0, 3, 0, 1, 4];

    let err = Mesh::from_polygons(
        &verts,
        &indices,
        None,
        1.0,
        MeshFlags::ALLOW_OPEN_EDGES,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        MeshBuilderError::Topology(TopologyError::NonManifoldEdge(0, 1))
    ));
}

#[test]
fn open_surface_needs_the_flag() {
    // A cube missing its top: ten triangles, one open boundary loop.
    let verts = cube_vertices(Point::origin(), 0.5);
    let mut open = cube_indices();
    let _ = open.drain(6..12);
    assert_eq!(open.len(), 30);

    let err = Mesh::from_polygons(&verts, &open, None, 1.0, MeshFlags::empty()).unwrap_err();
    assert!(matches!(
        err,
        MeshBuilderError::Topology(TopologyError::OpenEdge(_, _))
    ));

    let mesh =
        Mesh::from_polygons(&verts, &open, None, 1.0, MeshFlags::ALLOW_OPEN_EDGES).unwrap();
    assert_eq!(mesh.faces().len(), 10);
}

#[test]
fn inside_out_surface_is_rejected() {
    let verts = cube_vertices(Point::origin(), 0.5);
    let mut indices = cube_indices();
    for tri in indices.chunks_mut(3) {
        tri.swap(1, 2);
    }

    let err = Mesh::from_polygons(&verts, &indices, None, 1.0, MeshFlags::empty()).unwrap_err();
    assert!(matches!(
        err,
        MeshBuilderError::Topology(TopologyError::InsideOut)
    ));
}

#[test]
fn degenerate_faces_are_rejected() {
    let verts = vec![
        Point::new(0.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 0.0),
        Point::new(0.0, 1.0, 0.0),
    ];
    let err = Mesh::from_polygons(&verts, &[0, 1, 1], None, 1.0, MeshFlags::ALLOW_OPEN_EDGES)
        .unwrap_err();
    assert!(matches!(
        err,
        MeshBuilderError::Topology(TopologyError::DegenerateFace(0))
    ));
}

#[test]
fn scale_is_baked_into_the_mesh() {
    let mesh = Mesh::from_polygons(
        &cube_vertices(Point::origin(), 0.5),
        &cube_indices(),
        None,
        2.0,
        MeshFlags::empty(),
    )
    .unwrap();
    let aabb = mesh.local_aabb();
    assert_relative_eq!(aabb.maxs.x, 1.0);
    assert_relative_eq!(aabb.mins.y, -1.0);
}
