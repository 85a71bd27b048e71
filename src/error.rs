//! Error types for the decision engine and baseline store.

use std::path::PathBuf;

use crate::types::Mint;

/// Errors produced by the core.
///
/// None of these are fatal to the polling loop: a missing price skips the
/// tick, and a failed baseline write leaves the value in memory only.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("price unavailable for {0}")]
    PriceUnavailable(Mint),

    #[error("failed to write baseline file {path}: {source}")]
    BaselineWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove baseline file {path}: {source}")]
    BaselineRemove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode baseline snapshot: {0}")]
    BaselineEncode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
