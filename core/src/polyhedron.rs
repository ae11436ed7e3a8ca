//! Fixed-capacity, index-addressed convex polyhedron (spec: the per-voxel
//! Polyhedron data model, §3, and BoxInit, §4.2).
//!
//! The polyhedron is an arena of vertices referenced by small integer
//! indices rather than pointers: this keeps cache locality, makes snapshots
//! trivial to copy, and sidesteps ownership questions around the cyclic
//! neighbor graph (spec §9, "Polyhedron as arena + indices").

use super::geometry::{Point3, Vector3};
use crate::error::VoxelizeError;

/// Vertex capacity: the initial cube (8) plus up to four new vertices per
/// face clipped against up to four faces stays well under this bound; see
/// spec §4.3 ("Capacity").
pub const MAX_VERTS: usize = 128;

/// Bit 7 of `fflags`: a transient scratch marker set by the clipper to
/// indicate a vertex has been removed from the active subgraph. Cleared
/// implicitly each voxel, since a fresh polyhedron is initialized per voxel.
pub const CLIPPED_BIT: u8 = 0x80;

/// Index into a [`Polyhedron`]'s vertex arena.
pub type VertIdx = u8;

/// Sentinel used while building a new vertex's neighbor before it is known.
const NO_VERT: VertIdx = u8::MAX;

#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub pos: Point3,
    /// Three neighbor indices, in a consistent rotational sense (spec
    /// invariant I2): Reducer's face traversal depends entirely on this.
    pub nbrs: [VertIdx; 3],
    /// Bits 0..3: inside-flag for each of the 4 tet faces. Bit 7: clipped.
    pub fflags: u8,
    /// Signed perpendicular distance to each of the 4 tet faces.
    pub fdist: [f64; 4],
}

impl Vertex {
    const EMPTY: Vertex = Vertex {
        pos: Point3::new(0.0, 0.0, 0.0),
        nbrs: [NO_VERT; 3],
        fflags: 0,
        fdist: [0.0; 4],
    };

    #[inline]
    pub fn is_clipped(&self) -> bool {
        self.fflags & CLIPPED_BIT != 0
    }

    #[inline]
    pub fn is_inside_face(&self, face: usize) -> bool {
        self.fflags & (1 << face) != 0
    }
}

/// A convex polyhedron represented as a fixed-capacity vertex arena.
#[derive(Debug, Clone)]
pub struct Polyhedron {
    pub verts: [Vertex; MAX_VERTS],
    pub nverts: usize,
}

/// Canonical cube adjacency table (spec §4.2). Vertex `i`'s three neighbors
/// are its three cube neighbors along +/-x, +/-y, +/-z, ordered so that
/// `(nbrs[k], nbrs[k+1 mod 3])` traverses incident faces in a consistent
/// sense. This exact table MUST NOT be altered: doing so inverts
/// orientation throughout Reducer.
const CUBE_ADJACENCY: [[VertIdx; 3]; 8] = [
    [1, 4, 3],
    [2, 5, 0],
    [3, 6, 1],
    [0, 7, 2],
    [7, 0, 5],
    [4, 1, 6],
    [5, 2, 7],
    [6, 3, 4],
];

impl Polyhedron {
    /// Initializes the eight-vertex, twelve-edge unit-cube polyhedron
    /// between `lower` and `upper` (opposite corners of an axis-aligned
    /// box), using the fixed cube connectivity of §4.2.
    pub fn init_box(lower: Point3, upper: Point3) -> Self {
        let corners = [
            Point3::new(lower.x, lower.y, lower.z),
            Point3::new(upper.x, lower.y, lower.z),
            Point3::new(upper.x, upper.y, lower.z),
            Point3::new(lower.x, upper.y, lower.z),
            Point3::new(lower.x, lower.y, upper.z),
            Point3::new(upper.x, lower.y, upper.z),
            Point3::new(upper.x, upper.y, upper.z),
            Point3::new(lower.x, upper.y, upper.z),
        ];

        let mut verts = [Vertex::EMPTY; MAX_VERTS];
        for i in 0..8 {
            verts[i] = Vertex {
                pos: corners[i],
                nbrs: CUBE_ADJACENCY[i],
                fflags: 0,
                fdist: [0.0; 4],
            };
        }

        Self { verts, nverts: 8 }
    }

    /// Classifies every active vertex against `faces`, setting `fflags`
    /// bits 0..3 and `fdist` (spec invariants I3, I4).
    pub fn classify_against_faces(&mut self, faces: &[super::geometry::plane::Plane; 4]) {
        for v in self.verts[..self.nverts].iter_mut() {
            v.fflags &= CLIPPED_BIT;
            for (f, plane) in faces.iter().enumerate() {
                let dist = plane.signed_distance(v.pos);
                v.fdist[f] = dist;
                if dist > 0.0 {
                    v.fflags |= 1 << f;
                }
            }
        }
    }

    /// Allocates a new vertex, returning its index.
    #[inline]
    pub fn push_vertex(&mut self, v: Vertex) -> Result<VertIdx, VoxelizeError> {
        if self.nverts >= MAX_VERTS {
            log::warn!("polyhedron vertex arena exceeded capacity {MAX_VERTS}");
            return Err(VoxelizeError::BufferExhausted {
                what: "polyhedron vertex arena",
                capacity: MAX_VERTS,
            });
        }
        let idx = self.nverts as VertIdx;
        self.verts[self.nverts] = v;
        self.nverts += 1;
        Ok(idx)
    }

    #[inline]
    pub fn get(&self, idx: VertIdx) -> &Vertex {
        &self.verts[idx as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, idx: VertIdx) -> &mut Vertex {
        &mut self.verts[idx as usize]
    }

    /// Finds the first active (unclipped) vertex, if any.
    pub fn first_active(&self) -> Option<VertIdx> {
        self.verts[..self.nverts]
            .iter()
            .position(|v| !v.is_clipped())
            .map(|i| i as VertIdx)
    }

    #[cfg(debug_assertions)]
    /// Debug-only check of invariant I2: for each active vertex and each
    /// local slot `k`, the triple `(pos, nbrs[k].pos, nbrs[(k+1)%3].pos)`
    /// should wind consistently. We check this against the vertex's own
    /// average outward direction (the mean of the three edge vectors),
    /// which is a cheap proxy that catches a reversed cube table or a
    /// clipper linkage bug without needing the true face normals.
    pub fn check_rotational_order(&self) {
        for v in self.verts[..self.nverts].iter() {
            if v.is_clipped() {
                continue;
            }
            let p0 = v.pos;
            let mut avg = Vector3::new(0.0, 0.0, 0.0);
            for &n in &v.nbrs {
                avg += self.get(n).pos - p0;
            }
            for k in 0..3 {
                let a = self.get(v.nbrs[k]).pos - p0;
                let b = self.get(v.nbrs[(k + 1) % 3]).pos - p0;
                let area = a.cross(&b);
                debug_assert!(
                    area.dot(&avg) >= -1e-9,
                    "rotational order invariant (I2) violated"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_box_has_eight_vertices_and_symmetric_neighbors() {
        let poly = Polyhedron::init_box(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert_eq!(poly.nverts, 8);
        for i in 0..8u8 {
            for &n in &poly.get(i).nbrs {
                assert!(poly.get(n).nbrs.contains(&i), "neighbor relation not symmetric");
            }
        }
    }

    #[test]
    fn init_box_corners_match_bounds() {
        let lower = Point3::new(-1.0, -2.0, -3.0);
        let upper = Point3::new(1.0, 2.0, 3.0);
        let poly = Polyhedron::init_box(lower, upper);
        for v in &poly.verts[..poly.nverts] {
            assert!(v.pos.x == lower.x || v.pos.x == upper.x);
            assert!(v.pos.y == lower.y || v.pos.y == upper.y);
            assert!(v.pos.z == lower.z || v.pos.z == upper.z);
        }
    }
}
