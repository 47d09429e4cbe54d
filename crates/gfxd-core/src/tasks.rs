//! Task and dimension value types

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::GfxdError;

/// A requested output size, width x height in pixels.
///
/// A height of zero means "preserve aspect ratio, bound by width".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimension {
    width: u32,
    height: u32,
}

impl Dimension {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimension {
    type Err = GfxdError;

    /// Parses `"WxH"`. Malformed input is rejected, never zero-filled.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || GfxdError::InvalidDimension(s.to_owned());
        let (w, h) = s.split_once('x').ok_or_else(malformed)?;
        Ok(Self {
            width: parse_axis(w).ok_or_else(malformed)?,
            height: parse_axis(h).ok_or_else(malformed)?,
        })
    }
}

/// Strict decimal parse: digits only, so `"+1"`, `" 1"` and `""` all fail.
fn parse_axis(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// One request to generate thumbnails for a file at multiple target sizes.
///
/// `path` is platform-encoded and already resolved to an absolute path by
/// the caller. The order of `dimensions` is caller-significant: result
/// entries align index-for-index with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GfxTask {
    pub path: PathBuf,
    pub dimensions: Vec<Dimension>,
}

/// Processing status of a task.
///
/// `Pending` exists only for task lifecycle bookkeeping before
/// processing; [`crate::GfxProcessor::process`] produces `Success` or
/// `Error`, never `Pending`. There are no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TaskStatus {
    Success = 0,
    Error = 1,
    Pending = 2,
}

/// Outcome of processing one [`GfxTask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GfxTaskResult {
    pub status: TaskStatus,
    /// One entry per requested dimension, in request order. Entries may
    /// be empty when generation for that size produced nothing.
    pub outputs: Vec<String>,
}

impl GfxTaskResult {
    #[must_use]
    pub fn new(outputs: Vec<String>, status: TaskStatus) -> Self {
        Self { status, outputs }
    }

    /// An error result carrying `len` empty output slots.
    #[must_use]
    pub fn failed(len: usize) -> Self {
        Self {
            status: TaskStatus::Error,
            outputs: vec![String::new(); len],
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_round_trips_through_display() {
        for d in [
            Dimension::new(0, 0),
            Dimension::new(200, 200),
            Dimension::new(1000, 0),
            Dimension::new(u32::MAX, 1),
        ] {
            assert_eq!(d.to_string().parse::<Dimension>().unwrap(), d);
        }
    }

    #[test]
    fn dimension_parse_rejects_malformed() {
        for s in [
            "", "x", "100", "100x", "x100", "10x-1", "-1x10", "+1x2", " 1x2", "1x2 ", "1x2x3",
            "axb", "10×20",
        ] {
            assert!(s.parse::<Dimension>().is_err(), "accepted {s:?}");
        }
    }

    #[test]
    fn dimension_equality_is_structural() {
        assert_eq!(Dimension::new(3, 4), Dimension::new(3, 4));
        assert_ne!(Dimension::new(3, 4), Dimension::new(4, 3));
    }

    #[test]
    fn failed_result_has_one_empty_slot_per_dimension() {
        let r = GfxTaskResult::failed(3);
        assert_eq!(r.status, TaskStatus::Error);
        assert_eq!(r.outputs, vec!["", "", ""]);
    }
}
