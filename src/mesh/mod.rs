//! Half-edge surface meshes with hierarchy-aware twin links.

pub use self::builder::{MeshBuilderError, MeshFlags, TopologyError};
pub use self::half_edge::{Face, FaceClass, HalfEdge, PatchRef, Vertex, INVALID, PATCH_LEAF};

use crate::bounding_volume::Aabb;
use crate::math::{Point, Real, UnitVector};
use crate::partitioning::Bv;
use crate::utils;

mod builder;
mod half_edge;

/// A closed triangulated surface stored as a half-edge mesh, together with
/// its bounding-volume hierarchy of convex patches.
///
/// A mesh is built once when an object is added to a [`crate::scene::Scene`]
/// and is never mutated structurally afterward; copied objects share it
/// behind an `Arc`.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) edges: Vec<HalfEdge>,
    pub(crate) faces: Vec<Face>,
    /// Number of source-surface vertices; synthetic seal/hull vertices follow.
    pub(crate) n_src_vertices: u32,
    /// Number of source-surface half-edges.
    pub(crate) n_src_edges: u32,
    /// Number of source-surface faces.
    pub(crate) n_src_faces: u32,
    pub(crate) bvs: Vec<Bv>,
    pub(crate) root: u32,
    pub(crate) com: Point<Real>,
    pub(crate) radius: Real,
    pub(crate) local_aabb: Aabb,
}

impl Mesh {
    /// The vertices of this mesh, source-surface vertices first.
    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// The half-edges of this mesh.
    #[inline]
    pub fn edges(&self) -> &[HalfEdge] {
        &self.edges
    }

    /// The faces of this mesh.
    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// The number of vertices of the source surface (excluding synthetic
    /// vertices added by the hierarchy builder).
    #[inline]
    pub fn num_source_vertices(&self) -> usize {
        self.n_src_vertices as usize
    }

    /// The number of faces of the source surface.
    #[inline]
    pub fn num_source_faces(&self) -> usize {
        self.n_src_faces as usize
    }

    /// Is `vertex` part of the source surface (as opposed to a synthetic
    /// vertex introduced by the hierarchy builder)?
    #[inline]
    pub fn is_source_vertex(&self, vertex: u32) -> bool {
        vertex < self.n_src_vertices
    }

    /// Is `edge` part of the source surface?
    #[inline]
    pub fn is_source_edge(&self, edge: u32) -> bool {
        edge < self.n_src_edges
    }

    /// The center of mass of the source surface.
    #[inline]
    pub fn com(&self) -> Point<Real> {
        self.com
    }

    /// The radius of the smallest sphere centered at `self.com()` enclosing
    /// the source surface.
    #[inline]
    pub fn radius(&self) -> Real {
        self.radius
    }

    /// The AABB of the source surface in its local frame.
    #[inline]
    pub fn local_aabb(&self) -> Aabb {
        self.local_aabb
    }

    /// The root node of the bounding-volume hierarchy.
    #[inline]
    pub fn root(&self) -> u32 {
        self.root
    }

    /// The bounding-volume hierarchy nodes, children stored before parents.
    #[inline]
    pub fn bvs(&self) -> &[Bv] {
        &self.bvs
    }

    /// The position of the given vertex.
    #[inline]
    pub fn vertex_pos(&self, vertex: u32) -> Point<Real> {
        self.vertices[vertex as usize].pos
    }

    /// The head vertex of the given half-edge.
    #[inline]
    pub fn head(&self, edge: u32) -> u32 {
        self.edges[self.edges[edge as usize].next as usize].origin
    }

    /// The positions of the origin and head vertices of the given half-edge.
    #[inline]
    pub fn edge_endpoints(&self, edge: u32) -> (Point<Real>, Point<Real>) {
        let e = &self.edges[edge as usize];
        (
            self.vertices[e.origin as usize].pos,
            self.vertices[self.head(edge) as usize].pos,
        )
    }

    /// The twin of `edge` within the given patch.
    ///
    /// Falls back to the leaf-level twin when no patch-specific link is
    /// stored. Returns [`INVALID`] for an unmatched (open boundary) edge.
    #[inline]
    pub fn twin(&self, edge: u32, patch: u32) -> u32 {
        let e = &self.edges[edge as usize];

        if patch != PATCH_LEAF {
            if let Some(t) = e.twins.iter().find(|t| t.patch == patch) {
                return t.edge;
            }
        }

        e.leaf_twin()
    }

    /// An half-edge emanating from `vertex` and belonging to the given patch.
    #[inline]
    pub fn incident_edge(&self, vertex: u32, patch: u32) -> u32 {
        let v = &self.vertices[vertex as usize];

        if patch != PATCH_LEAF {
            if let Some(i) = v.incident.iter().find(|i| i.patch == patch) {
                return i.edge;
            }
        }

        v.incident
            .iter()
            .find(|i| i.patch == PATCH_LEAF)
            .map(|i| i.edge)
            .unwrap_or(INVALID)
    }

    /// The signed distance from `pt` to the plane of `face`.
    #[inline]
    pub fn signed_dist(&self, face: u32, pt: &Point<Real>) -> Real {
        let f = &self.faces[face as usize];
        f.normal.dot(&pt.coords) - f.offset
    }

    /// The plane of `face` as `(unit normal, signed offset)`.
    #[inline]
    pub fn face_plane(&self, face: u32) -> (UnitVector<Real>, Real) {
        let f = &self.faces[face as usize];
        (f.normal, f.offset)
    }

    /// The three half-edges of `face`, in CCW order.
    #[inline]
    pub fn face_edges(&self, face: u32) -> [u32; 3] {
        let e0 = self.faces[face as usize].edge;
        let e1 = self.edges[e0 as usize].next;
        let e2 = self.edges[e1 as usize].next;
        [e0, e1, e2]
    }

    /// The three vertices of `face`, in CCW order.
    #[inline]
    pub fn face_vertices(&self, face: u32) -> [u32; 3] {
        let [e0, e1, e2] = self.face_edges(face);
        [
            self.edges[e0 as usize].origin,
            self.edges[e1 as usize].origin,
            self.edges[e2 as usize].origin,
        ]
    }

    /// Iterates over the half-edges emanating from `vertex` within `patch`.
    #[inline]
    pub fn edges_around(&self, vertex: u32, patch: u32) -> VertexEdges<'_> {
        VertexEdges {
            mesh: self,
            patch,
            start: self.incident_edge(vertex, patch),
            curr: INVALID,
        }
    }

    /// The ids of the faces forming the convex cap of the given patch.
    #[inline]
    pub fn patch_faces(&self, patch: u32) -> impl Iterator<Item = u32> + '_ {
        let bv = &self.bvs[patch as usize];
        bv.faces.iter().chain(bv.other_faces.iter()).copied()
    }

    /// The deduplicated vertex ids of the given patch.
    pub fn patch_vertices(&self, patch: u32) -> Vec<u32> {
        let mut verts: Vec<u32> = self
            .patch_faces(patch)
            .flat_map(|f| self.face_vertices(f))
            .collect();
        verts.sort_unstable();
        verts.dedup();
        verts
    }

    /// The deduplicated half-edge ids of the given patch, one per undirected
    /// edge (the twin with the smaller id is kept).
    pub fn patch_edges(&self, patch: u32) -> Vec<u32> {
        let mut edges = Vec::new();
        for f in self.patch_faces(patch) {
            for e in self.face_edges(f) {
                let t = self.twin(e, patch);
                if t == INVALID || e < t {
                    edges.push(e);
                }
            }
        }
        edges
    }

    /// Is `vertex` a synthetic vertex introduced by a piece seal (as opposed
    /// to a hull cap)?
    pub(crate) fn is_seal_vertex(&self, vertex: u32) -> bool {
        self.vertices[vertex as usize].incident.iter().any(|i| {
            let face = self.edges[i.edge as usize].face;
            self.faces[face as usize].class == FaceClass::Contained
        })
    }

    /// Is `edge` part of a piece seal (one of its sides is a `Contained`
    /// face)?
    pub(crate) fn is_seal_edge(&self, edge: u32) -> bool {
        let e = &self.edges[edge as usize];
        if self.faces[e.face as usize].class == FaceClass::Contained {
            return true;
        }
        e.twins.iter().any(|t| {
            let face = self.edges[t.edge as usize].face;
            self.faces[face as usize].class == FaceClass::Contained
        })
    }

    /// Appends a synthetic vertex, returning its id.
    pub(crate) fn push_synthetic_vertex(&mut self, pos: Point<Real>) -> u32 {
        let id = self.vertices.len() as u32;
        self.vertices.push(Vertex::new(pos));
        id
    }

    /// Appends a synthetic triangular face spanning existing vertices,
    /// together with its three half-edges, returning the face id.
    ///
    /// `hint_normal` is used when the triangle is too degenerate for its
    /// normal to be computed from its vertices.
    pub(crate) fn push_synthetic_face(
        &mut self,
        vtx: [u32; 3],
        class: FaceClass,
        hint_normal: Option<UnitVector<Real>>,
    ) -> u32 {
        let pts = [
            self.vertices[vtx[0] as usize].pos,
            self.vertices[vtx[1] as usize].pos,
            self.vertices[vtx[2] as usize].pos,
        ];
        let normal = utils::ccw_face_normal([&pts[0], &pts[1], &pts[2]])
            .or(hint_normal)
            .unwrap_or(UnitVector::new_unchecked(na::Vector3::x()));
        let offset = normal.dot(&pts[0].coords);

        let fid = self.faces.len() as u32;
        let e0 = self.edges.len() as u32;

        for k in 0..3u32 {
            let tail = pts[k as usize];
            let head = pts[(k as usize + 1) % 3];
            let diff = head - tail;
            let length = diff.norm();
            let dir = UnitVector::try_new(diff, crate::math::DEFAULT_EPSILON)
                .unwrap_or(UnitVector::new_unchecked(na::Vector3::x()));
            let face_dist = normal.cross(&*dir).dot(&tail.coords);

            self.edges.push(HalfEdge {
                origin: vtx[k as usize],
                next: e0 + (k + 1) % 3,
                prev: e0 + (k + 2) % 3,
                face: fid,
                dir,
                length,
                face_dist,
                twins: smallvec::SmallVec::new(),
            });
        }

        self.faces.push(Face {
            edge: e0,
            normal,
            offset,
            class,
        });
        fid
    }

    /// Records the twin of `edge` within `patch`, unless the leaf-level
    /// fallback already gives the same answer.
    pub(crate) fn set_patch_twin(&mut self, edge: u32, patch: u32, twin: u32) {
        let e = &mut self.edges[edge as usize];
        if e.leaf_twin() == twin {
            return;
        }
        if let Some(t) = e.twins.iter_mut().find(|t| t.patch == patch) {
            t.edge = twin;
        } else {
            e.twins.push(PatchRef { patch, edge: twin });
        }
    }

    /// Records an incident half-edge for `vertex` within `patch`.
    pub(crate) fn set_patch_incident(&mut self, vertex: u32, patch: u32, edge: u32) {
        let v = &mut self.vertices[vertex as usize];
        if let Some(i) = v.incident.iter_mut().find(|i| i.patch == patch) {
            i.edge = edge;
        } else {
            v.incident.push(PatchRef { patch, edge });
        }
    }
}

/// An iterator over the half-edges emanating from a vertex within one patch.
pub struct VertexEdges<'a> {
    mesh: &'a Mesh,
    patch: u32,
    start: u32,
    curr: u32,
}

impl Iterator for VertexEdges<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.start == INVALID {
            return None;
        }

        if self.curr == INVALID {
            self.curr = self.start;
            return Some(self.start);
        }

        let prev = self.mesh.edges[self.curr as usize].prev;
        let next = self.mesh.twin(prev, self.patch);

        if next == INVALID || next == self.start {
            None
        } else {
            self.curr = next;
            Some(next)
        }
    }
}
