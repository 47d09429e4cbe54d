//! Error types for gfxd-core

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GfxdError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("unsupported serialize version {0}")]
    UnsupportedVersion(u8),

    #[error("invalid dimension string: {0}")]
    InvalidDimension(String),

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("image generation failed: {0}")]
    Generation(String),

    #[error("worker pool error: {0}")]
    Pool(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
