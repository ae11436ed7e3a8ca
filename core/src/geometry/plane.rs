//! Oriented halfspace planes and the tetrahedron face builder (spec:
//! FaceBuilder).

use super::vector::normalize_safe;
use super::{Point3, Vector3};
use crate::error::VoxelizeError;

/// An oriented halfspace: unit normal `n` and signed offset `d`, defining
/// the inside region `{x : d + n·x > 0}`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Plane {
    pub normal: Vector3,
    pub offset: f64,
}

impl Plane {
    pub fn new(normal: Vector3, offset: f64) -> Self {
        Self {
            normal: normalize_safe(normal),
            offset,
        }
    }

    /// `d + n·x`. Positive means `point` is on the inside of this plane.
    #[inline]
    pub fn signed_distance(&self, point: Point3) -> f64 {
        self.offset + self.normal.dot(&point.coords)
    }

    #[inline]
    pub fn is_inside(&self, point: Point3) -> bool {
        self.signed_distance(point) > 0.0
    }
}

/// Derives the four oriented supporting planes of a tetrahedron from its
/// four vertices, with normals pointing into the tet interior.
///
/// For plane `k`, built from the three non-`k` vertices in the cyclic order
/// fixed below, `d_k + n_k · v_k > 0` for the opposite vertex `v_k` — this
/// is the contract Clipper and Reducer's `fflags` bit convention rely on.
///
/// Callers whose vertex winding is unknown should check
/// [`crate::geometry::vector::signed_tet_volume`] and swap two vertices if
/// it is negative before calling this function; a degenerate (colinear or
/// coplanar) tetrahedron yields numerically unusable normals, which this
/// function does not detect unless `degeneracy_eps` is `Some`.
pub fn planes_from_tet(
    verts: [Point3; 4],
    degeneracy_eps: Option<f64>,
) -> Result<[Plane; 4], VoxelizeError> {
    for (i, v) in verts.iter().enumerate() {
        if !v.x.is_finite() || !v.y.is_finite() || !v.z.is_finite() {
            let _ = i;
            return Err(VoxelizeError::NonFiniteInput {
                context: "planes_from_tet vertex",
            });
        }
    }

    // Face k is built from the three vertices other than k, in a fixed
    // cyclic order chosen so the cross product gives the inward normal
    // under the assumed input winding (v0, v1, v2, v3).
    const FACE_VERTS: [[usize; 3]; 4] = [[1, 3, 2], [0, 2, 3], [0, 3, 1], [0, 1, 2]];

    let mut planes = [Plane {
        normal: Vector3::new(0.0, 0.0, 1.0),
        offset: 0.0,
    }; 4];

    for (k, face) in FACE_VERTS.iter().enumerate() {
        let a = verts[face[0]];
        let b = verts[face[1]];
        let c = verts[face[2]];
        let raw_normal = (b - a).cross(&(c - a));

        if let Some(eps) = degeneracy_eps {
            let magnitude = raw_normal.norm();
            if magnitude < eps {
                return Err(VoxelizeError::DegenerateTetrahedron {
                    face: k,
                    magnitude,
                });
            }
        }

        let centroid = Point3::from((a.coords + b.coords + c.coords) / 3.0);
        let normal = normalize_safe(raw_normal);
        let offset = -normal.dot(&centroid.coords);
        planes[k] = Plane { normal, offset };
    }

    Ok(planes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tet() -> [Point3; 4] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn each_plane_is_inside_at_its_opposite_vertex() {
        let verts = unit_tet();
        let planes = planes_from_tet(verts, None).unwrap();
        for (k, plane) in planes.iter().enumerate() {
            assert!(
                plane.signed_distance(verts[k]) > 0.0,
                "face {k} should classify its own opposite vertex as inside"
            );
        }
    }

    #[test]
    fn centroid_is_inside_all_four_faces() {
        let verts = unit_tet();
        let planes = planes_from_tet(verts, None).unwrap();
        let centroid = Point3::from(
            (verts[0].coords + verts[1].coords + verts[2].coords + verts[3].coords) / 4.0,
        );
        for plane in &planes {
            assert!(plane.is_inside(centroid));
        }
    }

    #[test]
    fn rejects_non_finite_vertex() {
        let mut verts = unit_tet();
        verts[2].x = f64::NAN;
        assert!(planes_from_tet(verts, None).is_err());
    }

    #[test]
    fn degenerate_tet_detected_when_eps_given() {
        // Coplanar (flat) tetrahedron: all four points on z = 0.
        let verts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        let result = planes_from_tet(verts, Some(1e-9));
        assert!(matches!(
            result,
            Err(VoxelizeError::DegenerateTetrahedron { .. })
        ));
    }
}
