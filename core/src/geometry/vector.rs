//! Pure vector arithmetic shared by every other module (spec: VectorOps).
//!
//! Nothing here carries state; everything is a free function over
//! `nalgebra` points and vectors so the rest of the crate can stay
//! generic over the exact representation.

use super::{Point3, Vector3};

/// Divisor epsilon used to sidestep divide-by-zero during normalization
/// without branching, matching the reference kernel's `norm()` macro.
const NORM_EPS: f64 = 1.0e-299;

/// Normalizes `v` to unit length, guarding against a zero vector by adding
/// [`NORM_EPS`] to the divisor rather than branching on zero.
#[inline]
pub fn normalize_safe(v: Vector3) -> Vector3 {
    let len = (v.x * v.x + v.y * v.y + v.z * v.z).sqrt();
    v / (len + NORM_EPS)
}

/// 3x3 determinant of the matrix whose rows are `a`, `b`, `c`.
#[inline]
pub fn det3(a: Vector3, b: Vector3, c: Vector3) -> f64 {
    a.x * (b.y * c.z - b.z * c.y) - a.y * (b.x * c.z - b.z * c.x) + a.z * (b.x * c.y - b.y * c.x)
}

/// Signed volume of the tetrahedron (v0, v1, v2, v3), i.e. `det[v1-v0, v2-v0,
/// v3-v0] / 6`. Positive when the vertices have a right-handed winding.
#[inline]
pub fn signed_tet_volume(v0: Point3, v1: Point3, v2: Point3, v3: Point3) -> f64 {
    det3(v1 - v0, v2 - v0, v3 - v0) / 6.0
}

/// The unsigned volume of the tetrahedron (v0, v1, v2, v3).
#[inline]
pub fn tet_volume(v0: Point3, v1: Point3, v2: Point3, v3: Point3) -> f64 {
    signed_tet_volume(v0, v1, v2, v3).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_safe_unit_vector() {
        let v = Vector3::new(3.0, 4.0, 0.0);
        let n = normalize_safe(v);
        assert!((n.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalize_safe_zero_vector_does_not_panic_or_nan() {
        let n = normalize_safe(Vector3::new(0.0, 0.0, 0.0));
        assert!(n.x.is_finite() && n.y.is_finite() && n.z.is_finite());
    }

    #[test]
    fn det3_matches_scalar_triple_product() {
        let a = Vector3::new(1.0, 0.0, 0.0);
        let b = Vector3::new(0.0, 1.0, 0.0);
        let c = Vector3::new(0.0, 0.0, 1.0);
        assert!((det3(a, b, c) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unit_tet_volume_is_one_sixth() {
        let v0 = Point3::new(0.0, 0.0, 0.0);
        let v1 = Point3::new(1.0, 0.0, 0.0);
        let v2 = Point3::new(0.0, 1.0, 0.0);
        let v3 = Point3::new(0.0, 0.0, 1.0);
        assert!((tet_volume(v0, v1, v2, v3) - 1.0 / 6.0).abs() < 1e-12);
    }
}
