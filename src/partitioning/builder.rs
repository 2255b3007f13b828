use super::{convex_hull, split, Bv, DirectionTable, SplitStrategy};
use crate::math::{Point, Real, UnitVector, Vector};
use crate::mesh::{FaceClass, Mesh, INVALID, PATCH_LEAF};
use std::collections::{HashMap, HashSet};

/// Parameters of the hierarchy construction.
#[derive(Copy, Clone, Debug)]
pub(crate) struct HierarchySettings {
    /// The strategy cutting sorted projections in two groups.
    pub strategy: SplitStrategy,
    /// The resolution cap of the per-patch direction lookup tables.
    pub max_lookup_res: u32,
}

impl Default for HierarchySettings {
    fn default() -> Self {
        HierarchySettings {
            strategy: SplitStrategy::default(),
            max_lookup_res: 8,
        }
    }
}

/// Builds the bounding-volume hierarchy of `mesh`.
///
/// `piece_of_face` assigns every source face to a convex piece; when absent
/// the whole surface is treated as a single convex piece. Pieces become the
/// leaves of a binary tree whose internal nodes carry convex hull caps of
/// their children.
pub(crate) fn build_hierarchy(
    mesh: &mut Mesh,
    piece_of_face: Option<&[u32]>,
    settings: &HierarchySettings,
) {
    let n_faces = mesh.n_src_faces as usize;
    let n_pieces = piece_of_face
        .map(|pf| pf.iter().max().map(|m| *m as usize + 1).unwrap_or(1))
        .unwrap_or(1);

    let mut pieces = vec![Vec::new(); n_pieces];
    for f in 0..n_faces {
        let p = piece_of_face.map(|pf| pf[f] as usize).unwrap_or(0);
        pieces[p].push(f as u32);
    }
    pieces.retain(|p| !p.is_empty());

    let mut leaves = Vec::with_capacity(pieces.len());
    for faces in &pieces {
        leaves.push(create_leaf(mesh, faces, settings));
    }

    let root = if leaves.len() == 1 {
        leaves[0]
    } else {
        let original_map = source_face_map(mesh);
        build_subtree(mesh, &leaves, settings, &original_map)
    };
    mesh.root = root;

    assign_levels(mesh);
    create_twins(mesh);

    log::debug!(
        "built hierarchy: {} pieces, {} nodes, {} synthetic faces",
        pieces.len(),
        mesh.bvs.len(),
        mesh.faces().len() - mesh.n_src_faces as usize,
    );
}

/// Second pass of the hierarchy construction: resolves, bottom-up, the twin
/// links of every patch so that each node's face set forms its own closed
/// 2-manifold independently of its children.
///
/// Children are stored before their parents in the node arena, so a single
/// in-order sweep is bottom-up.
pub(crate) fn create_twins(mesh: &mut Mesh) {
    for patch in 0..mesh.bvs.len() as u32 {
        let faces: Vec<u32> = mesh.patch_faces(patch).collect();
        create_patch_twins(mesh, patch, &faces);
    }
}

/// Creates the leaf node of one convex piece, sealing its open boundary
/// rings with centroid fans of `Contained` faces.
fn create_leaf(mesh: &mut Mesh, faces: &[u32], settings: &HierarchySettings) -> u32 {
    let piece_set: HashSet<u32> = faces.iter().copied().collect();

    // Directed edges of the piece whose twin lies outside of it.
    let mut boundary = Vec::new();
    for &f in faces {
        for e in mesh.face_edges(f) {
            let t = mesh.twin(e, PATCH_LEAF);
            if t == INVALID || !piece_set.contains(&mesh.edges()[t as usize].face) {
                boundary.push(e);
            }
        }
    }

    let mut owned = faces.to_vec();

    if !boundary.is_empty() {
        let mut by_origin: HashMap<u32, u32> = boundary
            .iter()
            .map(|&e| (mesh.edges()[e as usize].origin, e))
            .collect();

        let mut rings = Vec::new();
        while !by_origin.is_empty() {
            let start = *by_origin.values().next().unwrap();
            let mut ring = Vec::new();
            let mut e = start;
            loop {
                ring.push(e);
                let _ = by_origin.remove(&mesh.edges()[e as usize].origin);
                match by_origin.get(&mesh.head(e)) {
                    Some(&next) => e = next,
                    None => break,
                }
            }
            rings.push(ring);
        }

        for ring in rings {
            seal_ring(mesh, &ring, &mut owned);
        }
    }

    finish_bv(mesh, owned, Vec::new(), None, settings)
}

/// Seals one boundary ring with a fan of `Contained` faces around the ring
/// centroid.
fn seal_ring(mesh: &mut Mesh, ring: &[u32], owned: &mut Vec<u32>) {
    let mut centroid = Vector::zeros();
    let mut newell = Vector::zeros();
    for (i, &e) in ring.iter().enumerate() {
        let p = mesh.vertex_pos(mesh.edges()[e as usize].origin);
        let q = mesh.vertex_pos(mesh.edges()[ring[(i + 1) % ring.len()] as usize].origin);
        centroid += p.coords;
        newell += p.coords.cross(&q.coords);
    }
    centroid /= ring.len() as Real;

    // The seal traverses the ring backward, so its outward normal is the
    // reversed Newell normal of the ring polygon.
    let hint = UnitVector::try_new(-newell, crate::math::DEFAULT_EPSILON);

    let c = mesh.push_synthetic_vertex(Point::from(centroid));
    for &e in ring {
        let a = mesh.edges()[e as usize].origin;
        let b = mesh.head(e);
        let fid = mesh.push_synthetic_face([b, a, c], FaceClass::Contained, hint);
        owned.push(fid);
    }
}

/// Recursively builds the subtree over the given nodes and returns its root.
fn build_subtree(
    mesh: &mut Mesh,
    nodes: &[u32],
    settings: &HierarchySettings,
    original_map: &HashMap<[u32; 3], u32>,
) -> u32 {
    if nodes.len() == 1 {
        return nodes[0];
    }

    let coms: Vec<Point<Real>> = nodes
        .iter()
        .map(|&i| mesh.bvs[i as usize].com)
        .collect();
    let dir = split::split_direction(&coms);

    let mut items: Vec<(u32, Real)> = nodes
        .iter()
        .map(|&i| (i, dir.dot(&mesh.bvs[i as usize].com.coords)))
        .collect();
    let k = split::partition_projections(&mut items, settings.strategy);

    let left: Vec<u32> = items[..k].iter().map(|it| it.0).collect();
    let right: Vec<u32> = items[k..].iter().map(|it| it.0).collect();

    let l = build_subtree(mesh, &left, settings, original_map);
    let r = build_subtree(mesh, &right, settings, original_map);
    make_internal(mesh, l, r, settings, original_map)
}

/// Creates an internal node whose convex cap is the hull of its children's
/// vertices. Hull triangles coinciding with a source face borrow it; the
/// rest become new `Free` faces owned by the node.
fn make_internal(
    mesh: &mut Mesh,
    left: u32,
    right: u32,
    settings: &HierarchySettings,
    original_map: &HashMap<[u32; 3], u32>,
) -> u32 {
    let mut vert_ids = mesh.patch_vertices(left);
    vert_ids.extend(mesh.patch_vertices(right));
    vert_ids.sort_unstable();
    vert_ids.dedup();

    let positions: Vec<Point<Real>> = vert_ids.iter().map(|&v| mesh.vertex_pos(v)).collect();

    let mut owned = Vec::new();
    let mut other = Vec::new();

    match convex_hull(&positions) {
        Some(tris) => {
            for tri in tris {
                let ids = [
                    vert_ids[tri[0] as usize],
                    vert_ids[tri[1] as usize],
                    vert_ids[tri[2] as usize],
                ];
                let mut key = ids;
                key.sort_unstable();

                if let Some(&f) = original_map.get(&key) {
                    let a = positions[tri[0] as usize];
                    let b = positions[tri[1] as usize];
                    let c = positions[tri[2] as usize];
                    let hull_normal = (b - a).cross(&(c - a));
                    let face_normal = mesh.faces()[f as usize].normal.into_inner();
                    if hull_normal.dot(&face_normal) > 0.0 {
                        other.push(f);
                        continue;
                    }
                }

                owned.push(mesh.push_synthetic_face(ids, FaceClass::Free, None));
            }
        }
        None => {
            log::warn!("degenerate child vertex set; falling back to a cuboid cap");
            owned = cuboid_cap(mesh, &positions);
        }
    }

    finish_bv(mesh, owned, other, Some([left, right]), settings)
}

/// A conservative cuboid cap used when the hull of a child vertex set is
/// degenerate.
fn cuboid_cap(mesh: &mut Mesh, pts: &[Point<Real>]) -> Vec<u32> {
    let aabb = crate::bounding_volume::Aabb::from_points(pts);
    let margin = aabb.extents().amax().max(1.0) * 1.0e-6;
    let mins = aabb.mins - Vector::repeat(margin);
    let maxs = aabb.maxs + Vector::repeat(margin);

    let mut corners = [0u32; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let pos = Point::new(
            if i & 1 != 0 { maxs.x } else { mins.x },
            if i & 2 != 0 { maxs.y } else { mins.y },
            if i & 4 != 0 { maxs.z } else { mins.z },
        );
        *corner = mesh.push_synthetic_vertex(pos);
    }

    const TRIS: [[usize; 3]; 12] = [
        [0, 2, 3],
        [0, 3, 1],
        [4, 5, 7],
        [4, 7, 6],
        [0, 4, 6],
        [0, 6, 2],
        [1, 3, 7],
        [1, 7, 5],
        [0, 1, 5],
        [0, 5, 4],
        [2, 6, 7],
        [2, 7, 3],
    ];

    TRIS.iter()
        .map(|t| {
            mesh.push_synthetic_face(
                [corners[t[0]], corners[t[1]], corners[t[2]]],
                FaceClass::Free,
                None,
            )
        })
        .collect()
}

/// Computes the derived quantities of a node (center of mass, radius,
/// direction table) and pushes it into the arena.
fn finish_bv(
    mesh: &mut Mesh,
    owned: Vec<u32>,
    other: Vec<u32>,
    children: Option<[u32; 2]>,
    settings: &HierarchySettings,
) -> u32 {
    let patch = mesh.bvs.len() as u32;

    let mut verts: Vec<u32> = owned
        .iter()
        .chain(other.iter())
        .flat_map(|&f| mesh.face_vertices(f))
        .collect();
    verts.sort_unstable();
    verts.dedup();

    let com = patch_com(mesh, owned.iter().chain(other.iter()).copied());
    let mut radius: Real = 0.0;
    for &v in &verts {
        radius = radius.max(na::distance(&mesh.vertex_pos(v), &com));
    }

    let lookup = DirectionTable::build(&verts, |v| mesh.vertex_pos(v), settings.max_lookup_res);

    if let Some([l, r]) = children {
        mesh.bvs[l as usize].parent = patch;
        mesh.bvs[r as usize].parent = patch;
    }

    mesh.bvs.push(Bv {
        faces: owned,
        other_faces: other,
        com,
        radius,
        level: 0,
        parent: INVALID,
        children,
        lookup,
    });

    patch
}

/// Area-weighted centroid of a set of faces.
fn patch_com(mesh: &Mesh, faces: impl Iterator<Item = u32>) -> Point<Real> {
    let mut acc = Vector::zeros();
    let mut total: Real = 0.0;

    for f in faces {
        let [va, vb, vc] = mesh.face_vertices(f);
        let a = mesh.vertex_pos(va);
        let b = mesh.vertex_pos(vb);
        let c = mesh.vertex_pos(vc);
        let area = (b - a).cross(&(c - a)).norm() * 0.5;
        acc += (a.coords + b.coords + c.coords) / 3.0 * area;
        total += area;
    }

    if total > 0.0 {
        Point::from(acc / total)
    } else {
        mesh.com()
    }
}

/// Depth of every node, the root being at level 0.
fn assign_levels(mesh: &mut Mesh) {
    let mut stack = vec![(mesh.root, 0u8)];
    while let Some((id, level)) = stack.pop() {
        mesh.bvs[id as usize].level = level;
        if let Some([l, r]) = mesh.bvs[id as usize].children {
            stack.push((l, level.saturating_add(1)));
            stack.push((r, level.saturating_add(1)));
        }
    }
}

/// Sorted-triple → face id map over the source faces, used to recognize hull
/// triangles that coincide with a real face.
fn source_face_map(mesh: &Mesh) -> HashMap<[u32; 3], u32> {
    let mut map = HashMap::new();
    for f in 0..mesh.n_src_faces {
        let mut key = mesh.face_vertices(f);
        key.sort_unstable();
        let _ = map.insert(key, f);
    }
    map
}

/// Pairs the directed edges of one patch into per-patch twins and records
/// usable per-patch incident edges on its vertices.
fn create_patch_twins(mesh: &mut Mesh, patch: u32, faces: &[u32]) {
    let mut directed: Vec<(u32, u32, u32)> = Vec::with_capacity(faces.len() * 3);
    for &f in faces {
        for e in mesh.face_edges(f) {
            directed.push((mesh.edges()[e as usize].origin, mesh.head(e), e));
        }
    }
    directed.sort_unstable();

    let find = |origin: u32, head: u32| -> Option<u32> {
        directed
            .binary_search_by(|probe| (probe.0, probe.1).cmp(&(origin, head)))
            .ok()
            .map(|i| directed[i].2)
    };

    let mut matches = Vec::with_capacity(directed.len());
    for &(a, b, e) in &directed {
        match find(b, a) {
            Some(t) => matches.push((e, t)),
            None => log::warn!("patch {} has an unmatched edge ({}, {})", patch, a, b),
        }
    }
    for (e, t) in matches {
        mesh.set_patch_twin(e, patch, t);
    }

    let edge_set: HashSet<u32> = directed.iter().map(|d| d.2).collect();
    let mut seen = HashSet::new();
    let mut incidents = Vec::new();
    for &(a, _, e) in &directed {
        if seen.insert(a) {
            let fallback = mesh.incident_edge(a, PATCH_LEAF);
            if fallback == INVALID || !edge_set.contains(&fallback) {
                incidents.push((a, e));
            }
        }
    }
    for (v, e) in incidents {
        mesh.set_patch_incident(v, patch, e);
    }
}
