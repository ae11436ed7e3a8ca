//! Exact tetrahedron voxelization: per-voxel polynomial moment integrals of
//! a tetrahedron's indicator function against a regular axial grid, via
//! convex-polyhedron clipping and closed-form moment reduction.

pub mod geometry;

pub mod error;
pub mod polyhedron;
pub mod clip;
pub mod moments;
pub mod grid;
pub mod voxelize;

#[cfg(feature = "single-precision")]
pub mod single_precision;

pub use error::{VoxelizeError, VoxelizeResult};
pub use geometry::plane::{planes_from_tet, Plane};
pub use grid::{Grid, MomentGrid};
pub use moments::{reduce, MomentBuffer, MomentOrder};
pub use polyhedron::Polyhedron;
pub use voxelize::{voxelize_tet_dense, voxelize_tet_octree, Accumulator};
