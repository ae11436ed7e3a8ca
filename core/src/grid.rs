//! Grid descriptor and moment-field storage (spec §3, "Grid" and "Moment
//! buffer").

use crate::error::VoxelizeError;
use crate::geometry::Vector3;
use crate::moments::MomentOrder;

/// A rectangular axis-aligned lattice, origin implicit at the world origin,
/// with per-axis spacing and voxel count.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid {
    pub spacing: Vector3,
    pub counts: [usize; 3],
}

impl Grid {
    pub fn new(spacing: Vector3, counts: [usize; 3]) -> Result<Self, VoxelizeError> {
        if counts.iter().any(|&c| c == 0) {
            return Err(VoxelizeError::InvalidGrid {
                reason: "voxel count along every axis must be at least 1",
            });
        }
        if !spacing.x.is_finite() || !spacing.y.is_finite() || !spacing.z.is_finite() {
            return Err(VoxelizeError::InvalidGrid {
                reason: "grid spacing must be finite",
            });
        }
        if spacing.x <= 0.0 || spacing.y <= 0.0 || spacing.z <= 0.0 {
            return Err(VoxelizeError::InvalidGrid {
                reason: "grid spacing must be strictly positive on every axis",
            });
        }
        Ok(Self { spacing, counts })
    }

    #[inline]
    pub fn num_voxels(&self) -> usize {
        self.counts[0] * self.counts[1] * self.counts[2]
    }

    /// Node counts for the dense-sweep corner-classification scratch field:
    /// `(nx+1, ny+1, nz+1)`.
    #[inline]
    pub fn corner_counts(&self) -> [usize; 3] {
        [self.counts[0] + 1, self.counts[1] + 1, self.counts[2] + 1]
    }

    #[inline]
    pub fn voxel_index(&self, i: usize, j: usize, k: usize) -> usize {
        i + j * self.counts[0] + k * self.counts[0] * self.counts[1]
    }
}

/// Dense storage for `order.num_moments()` scalar fields over a [`Grid`],
/// voxel-centered and moment-major (all of field 0, then all of field 1,
/// ...).
#[derive(Debug, Clone)]
pub struct MomentGrid {
    order: MomentOrder,
    counts: [usize; 3],
    data: Vec<f64>,
}

impl MomentGrid {
    pub fn zeros(order: MomentOrder, counts: [usize; 3]) -> Self {
        let n = counts[0] * counts[1] * counts[2];
        Self {
            order,
            counts,
            data: vec![0.0; n * order.num_moments()],
        }
    }

    #[inline]
    pub fn order(&self) -> MomentOrder {
        self.order
    }

    #[inline]
    pub fn counts(&self) -> [usize; 3] {
        self.counts
    }

    #[inline]
    fn voxel_index(&self, i: usize, j: usize, k: usize) -> usize {
        i + j * self.counts[0] + k * self.counts[0] * self.counts[1]
    }

    #[inline]
    pub fn get(&self, moment: usize, i: usize, j: usize, k: usize) -> f64 {
        let n = self.counts[0] * self.counts[1] * self.counts[2];
        self.data[moment * n + self.voxel_index(i, j, k)]
    }

    /// Overwrites the moment values at voxel `(i, j, k)` (dense-sweep mode:
    /// each voxel is written exactly once).
    pub fn set_voxel(&mut self, i: usize, j: usize, k: usize, values: &[f64]) {
        let n = self.counts[0] * self.counts[1] * self.counts[2];
        let idx = self.voxel_index(i, j, k);
        for (m, &v) in values.iter().enumerate() {
            self.data[m * n + idx] = v;
        }
    }

    /// Adds `values` into the moment fields at voxel `(i, j, k)` (recursive
    /// mode: sub-blocks that touch the same voxel accumulate).
    pub fn accumulate_voxel(&mut self, i: usize, j: usize, k: usize, values: &[f64]) {
        let n = self.counts[0] * self.counts[1] * self.counts[2];
        let idx = self.voxel_index(i, j, k);
        for (m, &v) in values.iter().enumerate() {
            self.data[m * n + idx] += v;
        }
    }

    /// Sum of moment `m` over every voxel; used by property tests (volume
    /// and centroid conservation).
    pub fn sum(&self, moment: usize) -> f64 {
        let n = self.counts[0] * self.counts[1] * self.counts[2];
        self.data[moment * n..(moment + 1) * n].iter().sum()
    }
}
