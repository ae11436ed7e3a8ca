//! Polynomial moment integration over a convex polyhedron via triangle-fan
//! decomposition (spec §4.4, the Reducer).

use crate::geometry::Point3;
use crate::polyhedron::{Polyhedron, VertIdx, MAX_VERTS};

/// Requested polynomial order of the moment integrals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MomentOrder {
    Zero,
    One,
    Two,
}

impl MomentOrder {
    /// `num_moments(P)`: 1, 4, or 10 for P = 0, 1, 2.
    #[inline]
    pub const fn num_moments(self) -> usize {
        match self {
            MomentOrder::Zero => 1,
            MomentOrder::One => 4,
            MomentOrder::Two => 10,
        }
    }
}

/// A length-10 moment buffer, ordered `[1, x, y, z, x^2, y^2, z^2, xy, yz,
/// zx]`. Only the first `order.num_moments()` entries are meaningful.
pub type MomentBuffer = [f64; 10];

/// Integrates polynomial moments up to `order` over `poly`'s interior, with
/// the origin as the integration basepoint.
///
/// Chooses the first active vertex as the triangle-fan apex, enumerates
/// every face exactly once via a per-(vertex, local-edge-slot) mark grid,
/// and accumulates closed-form per-triangle moment contributions.
pub fn reduce(poly: &Polyhedron, order: MomentOrder) -> MomentBuffer {
    let mut moments = [0.0f64; 10];
    let nmax = order.num_moments();

    let Some(vstart0) = poly.first_active() else {
        return moments;
    };

    // emarks[v][slot]: has directed edge (v, nbrs[slot]) been traversed as
    // a face-enumeration seed yet?
    let mut emarks = [[false; 3]; MAX_VERTS];

    let mut stack: Vec<(VertIdx, u8)> = Vec::with_capacity(256);
    stack.push((vstart0, 0));

    while let Some((seed_vcur, seed_pnext)) = stack.pop() {
        if emarks[seed_vcur as usize][seed_pnext as usize] {
            continue;
        }
        emarks[seed_vcur as usize][seed_pnext as usize] = true;

        let vstart = seed_vcur;
        let v0 = poly.get(vstart).pos;
        let mut vcur = seed_vcur;
        let mut pnext = seed_pnext;
        let mut vnext = poly.get(vcur).nbrs[pnext as usize];
        stack.push((vcur, (pnext + 1) % 3));

        // Advance to the face's second edge.
        let np = slot_of_neighbor(poly, vnext, vcur);
        vcur = vnext;
        pnext = (np + 1) % 3;
        emarks[vcur as usize][pnext as usize] = true;
        vnext = poly.get(vcur).nbrs[pnext as usize];
        stack.push((vcur, (pnext + 1) % 3));

        // Fan triangles (v0, vnext, vcur) around the face until we return
        // to the starting vertex.
        while vnext != vstart {
            let v2 = poly.get(vcur).pos;
            let v1 = poly.get(vnext).pos;
            accumulate_triangle(&mut moments, v0, v1, v2, nmax);

            let np = slot_of_neighbor(poly, vnext, vcur);
            vcur = vnext;
            pnext = (np + 1) % 3;
            emarks[vcur as usize][pnext as usize] = true;
            vnext = poly.get(vcur).nbrs[pnext as usize];
            stack.push((vcur, (pnext + 1) % 3));
        }
    }

    moments
}

#[inline]
fn slot_of_neighbor(poly: &Polyhedron, owner: VertIdx, neighbor: VertIdx) -> u8 {
    poly.get(owner)
        .nbrs
        .iter()
        .position(|&n| n == neighbor)
        .expect("polyhedron neighbor graph is not symmetric (invariant I1 violated)") as u8
}

/// Adds one triangle's (apex at the origin) moment contributions to
/// `moments`, for triangle vertices `(v0, v1, v2)`.
fn accumulate_triangle(moments: &mut MomentBuffer, v0: Point3, v1: Point3, v2: Point3, nmax: usize) {
    let vol = (1.0 / 6.0)
        * (-(v2.x * v1.y * v0.z) + v1.x * v2.y * v0.z + v2.x * v0.y * v1.z
            - v0.x * v2.y * v1.z
            - v1.x * v0.y * v2.z
            + v0.x * v1.y * v2.z);

    moments[0] += vol;
    if nmax <= 1 {
        return;
    }

    moments[1] += vol * 0.25 * (v0.x + v1.x + v2.x);
    moments[2] += vol * 0.25 * (v0.y + v1.y + v2.y);
    moments[3] += vol * 0.25 * (v0.z + v1.z + v2.z);
    if nmax <= 4 {
        return;
    }

    moments[4] += vol * 0.1 * (v0.x * v0.x + v1.x * v1.x + v2.x * v2.x + v1.x * v2.x + v0.x * (v1.x + v2.x));
    moments[5] += vol * 0.1 * (v0.y * v0.y + v1.y * v1.y + v2.y * v2.y + v1.y * v2.y + v0.y * (v1.y + v2.y));
    moments[6] += vol * 0.1 * (v0.z * v0.z + v1.z * v1.z + v2.z * v2.z + v1.z * v2.z + v0.z * (v1.z + v2.z));
    moments[7] += vol
        * 0.05
        * (v2.x * v0.y + v2.x * v1.y + 2.0 * v2.x * v2.y
            + v0.x * (2.0 * v0.y + v1.y + v2.y)
            + v1.x * (v0.y + 2.0 * v1.y + v2.y));
    moments[8] += vol
        * 0.05
        * (v2.y * v0.z + v2.y * v1.z + 2.0 * v2.y * v2.z
            + v0.y * (2.0 * v0.z + v1.z + v2.z)
            + v1.y * (v0.z + 2.0 * v1.z + v2.z));
    moments[9] += vol
        * 0.05
        * (v2.x * v0.z + v2.x * v1.z + 2.0 * v2.x * v2.z
            + v0.x * (2.0 * v0.z + v1.z + v2.z)
            + v1.x * (v0.z + 2.0 * v1.z + v2.z));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedron::Polyhedron;

    #[test]
    fn unit_cube_has_volume_one() {
        let poly = Polyhedron::init_box(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let moments = reduce(&poly, MomentOrder::Zero);
        assert!((moments[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn centered_unit_cube_has_zero_first_moments() {
        let poly = Polyhedron::init_box(Point3::new(-0.5, -0.5, -0.5), Point3::new(0.5, 0.5, 0.5));
        let moments = reduce(&poly, MomentOrder::Two);
        assert!((moments[0] - 1.0).abs() < 1e-12);
        assert!(moments[1].abs() < 1e-12);
        assert!(moments[2].abs() < 1e-12);
        assert!(moments[3].abs() < 1e-12);
        // Second moment of a centered unit cube on each axis is 1/12.
        assert!((moments[4] - 1.0 / 12.0).abs() < 1e-12);
        assert!((moments[5] - 1.0 / 12.0).abs() < 1e-12);
        assert!((moments[6] - 1.0 / 12.0).abs() < 1e-12);
        // Cross moments vanish by symmetry.
        assert!(moments[7].abs() < 1e-12);
        assert!(moments[8].abs() < 1e-12);
        assert!(moments[9].abs() < 1e-12);
    }

    #[test]
    fn offset_box_first_moment_matches_centroid() {
        let lower = Point3::new(2.0, 3.0, 4.0);
        let upper = Point3::new(3.0, 5.0, 7.0);
        let poly = Polyhedron::init_box(lower, upper);
        let moments = reduce(&poly, MomentOrder::One);
        let vol = (upper.x - lower.x) * (upper.y - lower.y) * (upper.z - lower.z);
        assert!((moments[0] - vol).abs() < 1e-9);
        let cx = (lower.x + upper.x) / 2.0;
        let cy = (lower.y + upper.y) / 2.0;
        let cz = (lower.z + upper.z) / 2.0;
        assert!((moments[1] / moments[0] - cx).abs() < 1e-9);
        assert!((moments[2] / moments[0] - cy).abs() < 1e-9);
        assert!((moments[3] / moments[0] - cz).abs() < 1e-9);
    }
}
