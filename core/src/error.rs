//! Structured failure taxonomy for the voxelization core.
//!
//! The core is a pure computation: it does not retry, and every failure is
//! immediate. See spec section 7 ("Error Handling Design") for the taxonomy.

use thiserror::Error;

/// Errors raised by the tetrahedron voxelization core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VoxelizeError {
    /// A vertex, plane, or grid spacing/count contained NaN or infinity.
    #[error("non-finite value encountered in {context}")]
    NonFiniteInput { context: &'static str },

    /// A face normal's pre-normalization magnitude fell below the caller's
    /// degeneracy threshold. Only raised when the caller opts into the check.
    #[error("degenerate tetrahedron: face {face} normal magnitude {magnitude} is below threshold")]
    DegenerateTetrahedron { face: usize, magnitude: f64 },

    /// A fixed-capacity buffer (vertex arena or traversal stack) was
    /// exhausted. This indicates a violated precondition (non-convex input,
    /// or a buggy caller) and is fatal.
    #[error("{what} exhausted its capacity of {capacity}")]
    BufferExhausted {
        what: &'static str,
        capacity: usize,
    },

    /// The grid descriptor or an associated scratch buffer was malformed.
    #[error("invalid grid: {reason}")]
    InvalidGrid { reason: &'static str },
}

/// Result type for fallible core operations.
pub type VoxelizeResult<T> = Result<T, VoxelizeError>;
