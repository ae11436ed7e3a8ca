//! Optional `f32` entry point (spec §6: "implementations MAY offer a
//! single-precision variant as a separate entry point but must match the
//! double-precision results up to rounding").
//!
//! Rather than duplicating Clipper/Reducer in `f32`, this widens inputs to
//! `f64`, runs the ordinary double-precision pipeline, and narrows the
//! output back to `f32` — which is what "match up to rounding" requires in
//! practice, since an independent `f32` polyhedron clipper would accumulate
//! a different rounding error entirely.

use crate::error::VoxelizeError;
use crate::geometry::plane::planes_from_tet;
use crate::geometry::{Point3, Vector3};
use crate::grid::Grid;
use crate::moments::MomentOrder;
use crate::voxelize::voxelize_tet_dense;

/// `f32` counterpart of [`planes_from_tet`], returning moments in `f32`.
pub fn voxelize_tet_f32(
    verts: [[f32; 3]; 4],
    spacing: [f32; 3],
    counts: [usize; 3],
    order: MomentOrder,
    degeneracy_eps: Option<f32>,
) -> Result<Vec<f32>, VoxelizeError> {
    let verts64: Vec<Point3> = verts
        .iter()
        .map(|v| Point3::new(v[0] as f64, v[1] as f64, v[2] as f64))
        .collect();
    let verts64: [Point3; 4] = [verts64[0], verts64[1], verts64[2], verts64[3]];

    let planes = planes_from_tet(verts64, degeneracy_eps.map(|e| e as f64))?;
    let grid = Grid::new(
        Vector3::new(spacing[0] as f64, spacing[1] as f64, spacing[2] as f64),
        counts,
    )?;
    let out = voxelize_tet_dense(&planes, &grid, order)?;

    let nmax = order.num_moments();
    let n = grid.num_voxels();
    let mut flat = Vec::with_capacity(nmax * n);
    for m in 0..nmax {
        for k in 0..counts[2] {
            for j in 0..counts[1] {
                for i in 0..counts[0] {
                    flat.push(out.get(m, i, j, k) as f32);
                }
            }
        }
    }
    Ok(flat)
}
