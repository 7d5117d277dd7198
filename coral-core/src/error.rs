//! Construction errors.

use thiserror::Error;

/// Rejected skip list configuration.
///
/// Only construction can fail; every operation on a built list is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max height {max_height} outside [1, {limit}]")]
    MaxHeightOutOfRange { max_height: usize, limit: usize },

    #[error("initial height {initial_height} outside [1, {max_height}]")]
    InitialHeightOutOfRange {
        initial_height: usize,
        max_height: usize,
    },

    #[error("recycler chunk size must be positive")]
    ZeroChunkSize,
}
