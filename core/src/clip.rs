//! Convex clipping against the four tet faces, one face at a time (spec
//! §4.3).
//!
//! This is the component with the tightest orientation contract in the
//! crate: the push order in step 4 and the neighbor-linkage convention for
//! newly created vertices are exactly what preserves invariant I2 (spec
//! §9, "Orientation as a contract, not a computation").

use crate::error::VoxelizeError;
use crate::polyhedron::{Polyhedron, VertIdx, CLIPPED_BIT};

/// Traversal stack capacity: 256 entries (128 (vprev, vcur) pairs), mirrored
/// from spec §4.3 / §5.
const STACK_CAP: usize = 256;

/// Clips `poly` against every face `f` in `0..4` whose bit is clear in
/// `andcmp` (faces with the bit set already contain every current vertex,
/// so they are skipped). On return, `poly` contains the intersection of the
/// entry polyhedron with all four halfspaces, with invariants (I1)-(I4)
/// restored.
pub fn clip(poly: &mut Polyhedron, andcmp: u8) -> Result<(), VoxelizeError> {
    for f in 0..4u8 {
        let fmask = 1u8 << f;
        if andcmp & fmask != 0 {
            continue;
        }
        clip_one_face(poly, f, fmask, andcmp)?;
    }
    Ok(())
}

fn clip_one_face(
    poly: &mut Polyhedron,
    f: u8,
    fmask: u8,
    andcmp: u8,
) -> Result<(), VoxelizeError> {
    // Find any active, not-yet-clipped vertex outside this face.
    let mut seed = None;
    for i in 0..poly.nverts as VertIdx {
        let v = poly.get(i);
        if v.fflags & (CLIPPED_BIT | fmask) == 0 {
            seed = Some(i);
            break;
        }
    }
    let Some(vstart) = seed else {
        // Fully inside this face already.
        return Ok(());
    };

    // (vprev, vcur) pairs, pushed/popped as a flat stack of index pairs.
    let mut stack: Vec<(VertIdx, VertIdx)> = Vec::with_capacity(STACK_CAP / 2);
    let start_nbrs = poly.get(vstart).nbrs;
    stack.push((vstart, start_nbrs[1]));
    stack.push((vstart, start_nbrs[0]));
    stack.push((vstart, start_nbrs[2]));
    poly.get_mut(vstart).fflags |= CLIPPED_BIT;

    let mut first_new: Option<VertIdx> = None;
    let mut prev_new: Option<VertIdx> = None;

    while let Some((vprev, vcur)) = stack.pop() {
        if stack.len() + 1 > STACK_CAP {
            log::warn!("clipper traversal stack exceeded capacity {STACK_CAP} clipping face {f}");
            return Err(VoxelizeError::BufferExhausted {
                what: "clipper traversal stack",
                capacity: STACK_CAP,
            });
        }

        if poly.get(vcur).is_clipped() {
            continue;
        }

        if poly.get(vcur).is_inside_face(f as usize) {
            // Interpolate a new vertex along (vprev -> vcur) on face f's plane.
            let vprev_v = *poly.get(vprev);
            let vcur_v = *poly.get(vcur);
            let dp = vprev_v.fdist[f as usize];
            let dc = vcur_v.fdist[f as usize];
            let denom = dc - dp;
            let new_pos = (vcur_v.pos.coords * (-dp) + vprev_v.pos.coords * dc) / denom;

            let mut new_vertex = crate::polyhedron::Vertex {
                pos: nalgebra::Point3::from(new_pos),
                nbrs: [vcur, 0, 0],
                fflags: 0,
                fdist: [0.0; 4],
            };

            for ff in (f + 1)..4 {
                let ffmask = 1u8 << ff;
                if andcmp & ffmask != 0 {
                    continue;
                }
                let fd = (vprev_v.fdist[ff as usize] * dc - dp * vcur_v.fdist[ff as usize]) / denom;
                new_vertex.fdist[ff as usize] = fd;
                if fd > 0.0 {
                    new_vertex.fflags |= ffmask;
                }
            }

            let new_idx = poly.push_vertex(new_vertex)?;

            // Replace vcur's neighbor slot that pointed at vprev.
            let slot = poly
                .get(vcur)
                .nbrs
                .iter()
                .position(|&n| n == vprev)
                .expect("vprev must be a neighbor of vcur");
            poly.get_mut(vcur).nbrs[slot] = new_idx;

            // Chain new vertices around the cut: nbrs[0] interior (vcur),
            // nbrs[2] previous new vertex (closing nbrs[1] on that one).
            if let Some(prev) = prev_new {
                poly.get_mut(new_idx).nbrs[2] = prev;
                poly.get_mut(prev).nbrs[1] = new_idx;
            }
            if first_new.is_none() {
                first_new = Some(new_idx);
            }
            prev_new = Some(new_idx);
        } else {
            // Outside the face: mark clipped and push its two non-vprev
            // neighbors in (k+2, k+1) order to preserve invariant I2.
            let nbrs = poly.get(vcur).nbrs;
            let k = nbrs
                .iter()
                .position(|&n| n == vprev)
                .expect("vprev must be a neighbor of vcur");
            poly.get_mut(vcur).fflags |= CLIPPED_BIT;

            stack.push((vcur, nbrs[(k + 2) % 3]));
            stack.push((vcur, nbrs[(k + 1) % 3]));
        }
    }

    if let (Some(first), Some(last)) = (first_new, prev_new) {
        poly.get_mut(first).nbrs[2] = last;
        poly.get_mut(last).nbrs[1] = first;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::plane::Plane;
    use crate::geometry::{Point3, Vector3};
    use crate::polyhedron::Polyhedron;

    fn unit_cube() -> Polyhedron {
        Polyhedron::init_box(Point3::new(-0.5, -0.5, -0.5), Point3::new(0.5, 0.5, 0.5))
    }

    #[test]
    fn clip_against_single_halfspace_halves_the_cube() {
        let mut poly = unit_cube();
        // Single active plane: keep x > 0. Other three faces trivially
        // inside (normal = +x, offset large so every corner is inside).
        let planes = [
            Plane::new(Vector3::new(1.0, 0.0, 0.0), 0.0),
            Plane::new(Vector3::new(0.0, 0.0, 1.0), 10.0),
            Plane::new(Vector3::new(0.0, 0.0, 1.0), 10.0),
            Plane::new(Vector3::new(0.0, 0.0, 1.0), 10.0),
        ];
        poly.classify_against_faces(&planes);
        let andcmp = 0b1110; // faces 1,2,3 trivially inside; only face 0 active
        clip(&mut poly, andcmp).unwrap();

        let moments = crate::moments::reduce(&poly, crate::moments::MomentOrder::Zero);
        assert!((moments[0] - 0.5).abs() < 1e-12, "got {}", moments[0]);
    }

    #[test]
    fn clip_leaves_cube_untouched_when_fully_inside() {
        let mut poly = unit_cube();
        let planes = [
            Plane::new(Vector3::new(1.0, 0.0, 0.0), 10.0),
            Plane::new(Vector3::new(0.0, 1.0, 0.0), 10.0),
            Plane::new(Vector3::new(0.0, 0.0, 1.0), 10.0),
            Plane::new(Vector3::new(-1.0, 0.0, 0.0), 10.0),
        ];
        poly.classify_against_faces(&planes);
        clip(&mut poly, 0x0f).unwrap();
        let moments = crate::moments::reduce(&poly, crate::moments::MomentOrder::Zero);
        assert!((moments[0] - 1.0).abs() < 1e-12);
    }
}
