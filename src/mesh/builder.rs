use super::half_edge::{Face, FaceClass, HalfEdge, PatchRef, Vertex, INVALID, PATCH_LEAF};
use super::Mesh;
use crate::bounding_volume::Aabb;
use crate::math::{Point, Real, UnitVector};
use crate::utils;
use smallvec::SmallVec;
use std::collections::HashMap;

bitflags::bitflags! {
    /// Flags controlling half-edge mesh construction.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct MeshFlags: u8 {
        /// Tolerate open boundary loops: undirected edges bordered by a
        /// single face do not make the construction fail.
        const ALLOW_OPEN_EDGES = 1 << 0;
    }
}

/// An inconsistency in the topology of the input surface.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum TopologyError {
    /// Found a face with fewer than three distinct vertices.
    #[error("the face {0} has fewer than three distinct vertices.")]
    DegenerateFace(u32),
    /// An edge is shared by three faces or more.
    #[error("the edge ({0}, {1}) is shared by more than two faces.")]
    NonManifoldEdge(u32, u32),
    /// Two adjacent faces have opposite orientations.
    #[error("the faces {face1} and {face2} sharing the edge {edge:?} have opposite orientations.")]
    InconsistentWinding {
        /// The first face, with an orientation opposite to the second face.
        face1: u32,
        /// The second face, with an orientation opposite to the first face.
        face2: u32,
        /// The edge shared between the two faces.
        edge: (u32, u32),
    },
    /// An edge is bordered by a single face, but open meshes were not allowed.
    #[error("the edge ({0}, {1}) borders a single face but open meshes are not allowed.")]
    OpenEdge(u32, u32),
    /// The surface is closed but encloses a negative volume, i.e. every face
    /// normal points inward.
    #[error("the surface is inside out (it encloses a negative volume).")]
    InsideOut,
}

/// An inconsistency found while building a half-edge mesh.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq)]
pub enum MeshBuilderError {
    /// A closed surface needs at least four faces.
    #[error("a closed surface needs at least four faces, got {0}.")]
    TooFewFaces(usize),
    /// A face references a vertex that does not exist.
    #[error("the face {face} references the vertex {vertex} but only {num_vertices} vertices were given.")]
    VertexOutOfBounds {
        /// The offending face.
        face: u32,
        /// The out-of-bounds vertex index.
        vertex: u32,
        /// The number of vertices of the mesh.
        num_vertices: usize,
    },
    /// The per-polygon vertex counts do not match the index buffer length.
    #[error("the per-polygon vertex counts do not sum to the index buffer length.")]
    BadFaceSizes,
    /// The uniform scale must be strictly positive.
    #[error("the uniform scale must be strictly positive, got {0}.")]
    InvalidScale(Real),
    /// An inconsistency in the topology of the input surface.
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),
}

impl Mesh {
    /// Builds a half-edge mesh from raw vertex coordinates and polygon index
    /// lists.
    ///
    /// Polygons with more than three vertices are fan-triangulated. When
    /// `face_sizes` is `None` the index buffer is interpreted as a flat list
    /// of triangles. Duplicate coordinates are merged into a single vertex.
    /// The uniform `scale` is baked into the vertex positions.
    ///
    /// The input must describe a closed orientable 2-manifold (every edge
    /// bordered by exactly two faces, consistently wound counter-clockwise
    /// seen from the outside), unless
    /// [`MeshFlags::ALLOW_OPEN_EDGES`] is set.
    pub fn from_polygons(
        coords: &[Point<Real>],
        indices: &[u32],
        face_sizes: Option<&[u32]>,
        scale: Real,
        flags: MeshFlags,
    ) -> Result<Mesh, MeshBuilderError> {
        if !(scale > 0.0) {
            return Err(MeshBuilderError::InvalidScale(scale));
        }

        let (vertices, remap) = merge_duplicate_vertices(coords, scale);
        let (mut faces, mut edges) = triangulate(coords.len(), indices, face_sizes, &remap)?;

        if faces.len() < 4 && !flags.contains(MeshFlags::ALLOW_OPEN_EDGES) {
            return Err(MeshBuilderError::TooFewFaces(faces.len()));
        }

        let mut vertices = vertices;
        let any_open = identify_twins(&mut edges, flags)?;
        compute_geometry(&vertices, &mut edges, &mut faces)?;

        // Incident leaf edges.
        for (eid, e) in edges.iter().enumerate() {
            let v = &mut vertices[e.origin as usize];
            if v.incident.is_empty() {
                v.incident.push(PatchRef {
                    patch: PATCH_LEAF,
                    edge: eid as u32,
                });
            }
        }

        if !any_open {
            check_orientation(&vertices, &edges, &faces)?;
        }

        let (com, radius) = surface_com_radius(&vertices, &edges, &faces);
        let local_aabb = Aabb::from_points(vertices.iter().map(|v| &v.pos));

        log::debug!(
            "built half-edge mesh: {} vertices ({} merged), {} faces, {} half-edges",
            vertices.len(),
            coords.len() - vertices.len(),
            faces.len(),
            edges.len(),
        );

        Ok(Mesh {
            n_src_vertices: vertices.len() as u32,
            n_src_edges: edges.len() as u32,
            n_src_faces: faces.len() as u32,
            vertices,
            edges,
            faces,
            bvs: Vec::new(),
            root: INVALID,
            com,
            radius,
            local_aabb,
        })
    }
}

/// Merges exactly-equal coordinates into single vertices through a coarse
/// spatial hash grid, returning the merged vertex set and the original-index
/// to merged-index remap table.
fn merge_duplicate_vertices(coords: &[Point<Real>], scale: Real) -> (Vec<Vertex>, Vec<u32>) {
    let mut aabb = Aabb::new_invalid();
    for c in coords {
        aabb.take_point(*c * scale);
    }
    let max_extent = aabb.extents().max().max(0.0);
    let inv_cell = if max_extent > 0.0 {
        64.0 / max_extent
    } else {
        1.0
    };

    let mut grid: HashMap<(i64, i64, i64), SmallVec<[u32; 4]>> = HashMap::new();
    let mut vertices: Vec<Vertex> = Vec::with_capacity(coords.len());
    let mut remap = Vec::with_capacity(coords.len());

    for c in coords {
        let p = *c * scale;
        let key = (
            (p.x * inv_cell).floor() as i64,
            (p.y * inv_cell).floor() as i64,
            (p.z * inv_cell).floor() as i64,
        );

        let bucket = grid.entry(key).or_default();
        let found = bucket
            .iter()
            .copied()
            .find(|id| vertices[*id as usize].pos == p);

        match found {
            Some(id) => remap.push(id),
            None => {
                let id = vertices.len() as u32;
                vertices.push(Vertex::new(p));
                bucket.push(id);
                remap.push(id);
            }
        }
    }

    (vertices, remap)
}

/// Fan-triangulates the input polygons, allocating one face and three
/// half-edges per triangle.
fn triangulate(
    num_coords: usize,
    indices: &[u32],
    face_sizes: Option<&[u32]>,
    remap: &[u32],
) -> Result<(Vec<Face>, Vec<HalfEdge>), MeshBuilderError> {
    let sizes: Vec<u32> = match face_sizes {
        Some(sizes) => {
            if sizes.iter().map(|s| *s as usize).sum::<usize>() != indices.len() {
                return Err(MeshBuilderError::BadFaceSizes);
            }
            sizes.to_vec()
        }
        None => {
            if indices.len() % 3 != 0 {
                return Err(MeshBuilderError::BadFaceSizes);
            }
            vec![3; indices.len() / 3]
        }
    };

    let mut faces = Vec::new();
    let mut edges = Vec::new();
    let mut offset = 0usize;

    for (poly, &size) in sizes.iter().enumerate() {
        let size = size as usize;
        if size < 3 {
            return Err(TopologyError::DegenerateFace(poly as u32).into());
        }

        let poly_indices = &indices[offset..offset + size];
        for &idx in poly_indices {
            if idx as usize >= num_coords {
                return Err(MeshBuilderError::VertexOutOfBounds {
                    face: poly as u32,
                    vertex: idx,
                    num_vertices: num_coords,
                });
            }
        }

        let v0 = remap[poly_indices[0] as usize];
        for k in 1..size - 1 {
            let v1 = remap[poly_indices[k] as usize];
            let v2 = remap[poly_indices[k + 1] as usize];
            if v0 == v1 || v1 == v2 || v2 == v0 {
                return Err(TopologyError::DegenerateFace(poly as u32).into());
            }

            let fid = faces.len() as u32;
            let e0 = edges.len() as u32;
            for (k, origin) in [v0, v1, v2].into_iter().enumerate() {
                edges.push(HalfEdge {
                    origin,
                    next: e0 + (k as u32 + 1) % 3,
                    prev: e0 + (k as u32 + 2) % 3,
                    face: fid,
                    dir: UnitVector::new_unchecked(na::Vector3::x()),
                    length: 0.0,
                    face_dist: 0.0,
                    twins: SmallVec::new(),
                });
            }
            faces.push(Face {
                edge: e0,
                normal: UnitVector::new_unchecked(na::Vector3::x()),
                offset: 0.0,
                class: FaceClass::Original,
            });
        }

        offset += size;
    }

    Ok((faces, edges))
}

/// Pairs the directed edges into twins by lexicographic sort over
/// `(origin, head)` vertex ids, diagnosing non-manifold and
/// inconsistently-wound inputs.
///
/// Returns `true` if the surface has at least one open boundary edge.
fn identify_twins(edges: &mut [HalfEdge], flags: MeshFlags) -> Result<bool, MeshBuilderError> {
    let mut directed: Vec<(u32, u32, u32)> = Vec::with_capacity(edges.len());
    for eid in 0..edges.len() as u32 {
        let origin = edges[eid as usize].origin;
        let head = edges[edges[eid as usize].next as usize].origin;
        directed.push((origin, head, eid));
    }
    directed.sort_unstable();

    let find = |origin: u32, head: u32| -> Option<u32> {
        directed
            .binary_search_by(|probe| (probe.0, probe.1).cmp(&(origin, head)))
            .ok()
            .map(|i| directed[i].2)
    };

    // Duplicate directed edges: either a non-manifold edge (if the reversed
    // direction also exists) or two faces wound in opposite directions.
    for w in directed.windows(2) {
        if w[0].0 == w[1].0 && w[0].1 == w[1].1 {
            let (a, b) = (w[0].0, w[0].1);
            if find(b, a).is_some() {
                return Err(TopologyError::NonManifoldEdge(a.min(b), a.max(b)).into());
            } else {
                return Err(TopologyError::InconsistentWinding {
                    face1: edges[w[0].2 as usize].face,
                    face2: edges[w[1].2 as usize].face,
                    edge: (a, b),
                }
                .into());
            }
        }
    }

    let mut any_open = false;
    for &(origin, head, eid) in &directed {
        match find(head, origin) {
            Some(twin) => edges[eid as usize].twins.push(PatchRef {
                patch: PATCH_LEAF,
                edge: twin,
            }),
            None => {
                if !flags.contains(MeshFlags::ALLOW_OPEN_EDGES) {
                    return Err(TopologyError::OpenEdge(origin, head).into());
                }
                any_open = true;
            }
        }
    }

    Ok(any_open)
}

/// Computes face planes and per-edge directions, lengths and edge-face plane
/// offsets. Shared twin quantities are computed once, using a visited mark to
/// avoid doing the work twice.
fn compute_geometry(
    vertices: &[Vertex],
    edges: &mut [HalfEdge],
    faces: &mut [Face],
) -> Result<(), MeshBuilderError> {
    for (fid, f) in faces.iter_mut().enumerate() {
        let e0 = f.edge as usize;
        let e1 = edges[e0].next as usize;
        let e2 = edges[e1].next as usize;
        let a = vertices[edges[e0].origin as usize].pos;
        let b = vertices[edges[e1].origin as usize].pos;
        let c = vertices[edges[e2].origin as usize].pos;

        let normal = utils::ccw_face_normal([&a, &b, &c])
            .ok_or(TopologyError::DegenerateFace(fid as u32))?;
        f.normal = normal;
        f.offset = normal.dot(&a.coords);
    }

    let mut visited = vec![false; edges.len()];
    for eid in 0..edges.len() {
        if visited[eid] {
            continue;
        }
        visited[eid] = true;

        let tail = vertices[edges[eid].origin as usize].pos;
        let head = vertices[edges[edges[eid].next as usize].origin as usize].pos;
        let diff = head - tail;
        let length = diff.norm();
        let dir = UnitVector::try_new(diff, crate::math::DEFAULT_EPSILON)
            .ok_or(TopologyError::DegenerateFace(edges[eid].face))?;

        edges[eid].dir = dir;
        edges[eid].length = length;

        let twin = edges[eid].leaf_twin();
        if twin != INVALID {
            visited[twin as usize] = true;
            edges[twin as usize].dir = -dir;
            edges[twin as usize].length = length;
        }
    }

    for eid in 0..edges.len() {
        let tail = vertices[edges[eid].origin as usize].pos;
        let n = faces[edges[eid].face as usize].normal;
        edges[eid].face_dist = n.cross(&*edges[eid].dir).dot(&tail.coords);
    }

    Ok(())
}

/// Rejects closed surfaces whose consistent winding encloses a negative
/// volume (every normal pointing inward).
fn check_orientation(
    vertices: &[Vertex],
    edges: &[HalfEdge],
    faces: &[Face],
) -> Result<(), MeshBuilderError> {
    let mut volume6: Real = 0.0;
    for f in faces {
        let e0 = f.edge as usize;
        let e1 = edges[e0].next as usize;
        let e2 = edges[e1].next as usize;
        let a = vertices[edges[e0].origin as usize].pos.coords;
        let b = vertices[edges[e1].origin as usize].pos.coords;
        let c = vertices[edges[e2].origin as usize].pos.coords;
        volume6 += a.cross(&b).dot(&c);
    }

    if volume6 <= 0.0 {
        return Err(TopologyError::InsideOut.into());
    }

    Ok(())
}

/// Area-weighted center of mass of the surface, and the radius of the
/// enclosing sphere centered there.
fn surface_com_radius(
    vertices: &[Vertex],
    edges: &[HalfEdge],
    faces: &[Face],
) -> (Point<Real>, Real) {
    let mut acc = na::Vector3::zeros();
    let mut total_area: Real = 0.0;

    for f in faces {
        let e0 = f.edge as usize;
        let e1 = edges[e0].next as usize;
        let e2 = edges[e1].next as usize;
        let a = vertices[edges[e0].origin as usize].pos;
        let b = vertices[edges[e1].origin as usize].pos;
        let c = vertices[edges[e2].origin as usize].pos;

        let area = (b - a).cross(&(c - a)).norm() * 0.5;
        let centroid = (a.coords + b.coords + c.coords) / 3.0;
        acc += centroid * area;
        total_area += area;
    }

    let com = if total_area > 0.0 {
        Point::from(acc / total_area)
    } else {
        utils::center(&vertices.iter().map(|v| v.pos).collect::<Vec<_>>())
    };

    let (_, radius) = crate::bounding_volume::point_cloud_bounding_sphere_with_center(
        &vertices.iter().map(|v| v.pos).collect::<Vec<_>>(),
        com,
    );

    (com, radius)
}
