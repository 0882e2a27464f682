use std::io;

use crate::types::SubLevelId;

/// All error types for the sub-level kernel.
#[derive(thiserror::Error, Debug)]
pub enum KernelError {
    #[error("Decode error: expected {expected} elements, found {actual}")]
    DecodeShape { expected: usize, actual: usize },
    #[error("Plot error: chunk column ({chunk_x}, {chunk_z}) is already claimed by {owner}")]
    PlotOverlap {
        chunk_x: i32,
        chunk_z: i32,
        owner: SubLevelId,
    },
    #[error("Registry error: {0}")]
    Registry(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Scene error: {0}")]
    Scene(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KernelError>;
