use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("rank mismatch: expected {expected}, got {actual}")]
    RankMismatch { expected: usize, actual: usize },

    #[error("coordinate {coord:?} is outside extent {dims:?}")]
    OutOfBounds { coord: Vec<u64>, dims: Vec<u64> },

    #[error("hyperslab block has a zero count on axis {axis}")]
    EmptyBlock { axis: usize },

    #[error("hyperslab blocks overlap")]
    OverlappingBlocks,

    #[error("extent mismatch: expected {expected:?}, got {actual:?}")]
    ExtentMismatch { expected: Vec<u64>, actual: Vec<u64> },
}
