//! Image task processing
//!
//! Turns one [`GfxTask`] into one [`GfxTaskResult`], delegating pixel
//! work to a [`GfxProvider`]. The provider is called once per task with
//! the dimensions sorted by width descending (it reuses decode and
//! scale state best when producing the largest target first); outputs
//! are scattered back so the caller always sees its own request order.

use std::path::Path;

use once_cell::sync::Lazy;

use crate::tasks::{GfxTask, GfxTaskResult, TaskStatus};
use crate::{Dimension, Result};

/// The external image-decoding/resizing capability.
///
/// Implementations must be safe for concurrent invocation from the
/// worker pool; all per-task state belongs to one call.
pub trait GfxProvider: Send + Sync {
    /// Generate one artifact per requested dimension, in the same order
    /// as `dimensions`. All-or-nothing: a failure fails the whole batch.
    fn generate_images(&self, path: &Path, dimensions: &[Dimension]) -> Result<Vec<String>>;

    /// Delimited extension list of decodable image formats, or `None`
    /// for "no pre-filtering, accept all".
    fn supported_formats(&self) -> Option<String>;

    /// Delimited extension list of decodable video formats, or `None`.
    fn supported_video_formats(&self) -> Option<String>;
}

/// Extensions deliberately advertised only through this isolated worker:
/// these are the formats most likely to crash third-party decoders, so
/// the main process never decodes them itself.
static EXTRA_WORKER_FORMATS: Lazy<String> =
    Lazy::new(|| compose_extension_list(&["tif", "exr", "pic", "pct", "tiff", "pict"]));

/// Join extensions into a ".ext.ext" list, longest first, so a shorter
/// extension can never mask a longer one sharing its prefix when a
/// caller scans the list by substring (".tif" must not hit before
/// ".tiff" is checked).
fn compose_extension_list(exts: &[&str]) -> String {
    let mut ordered = exts.to_vec();
    ordered.sort_by_key(|e| std::cmp::Reverse(e.len()));
    let mut out = String::new();
    for ext in ordered {
        out.push('.');
        out.push_str(ext);
    }
    out
}

/// Owns the image task algorithm; shared read-only across pool workers.
pub struct GfxProcessor<P> {
    provider: P,
}

impl<P: GfxProvider> GfxProcessor<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Process one task. Never returns [`TaskStatus::Pending`]; provider
    /// failure becomes an error result with one empty output slot per
    /// requested dimension.
    pub fn process(&self, task: GfxTask) -> GfxTaskResult {
        let count = task.dimensions.len();
        if count == 0 {
            tracing::error!(path = %task.path.display(), "received empty dimensions");
            return GfxTaskResult::failed(0);
        }

        // Stable sort of dimension indices by width descending. The
        // permutation is remembered so outputs can be scattered back
        // into request order.
        let dimensions = &task.dimensions;
        let mut indices: Vec<usize> = (0..count).collect();
        indices.sort_by(|&a, &b| dimensions[b].width().cmp(&dimensions[a].width()));

        let sorted: Vec<Dimension> = indices.iter().map(|&i| dimensions[i]).collect();

        tracing::debug!(path = %task.path.display(), sizes = count, "generating thumbnails");
        match self.provider.generate_images(&task.path, &sorted) {
            Ok(images) => {
                let mut outputs = vec![String::new(); count];
                for (k, image) in images.into_iter().enumerate().take(count) {
                    outputs[indices[k]] = image;
                }
                GfxTaskResult::new(outputs, TaskStatus::Success)
            }
            Err(e) => {
                tracing::error!(path = %task.path.display(), error = %e, "generation failed");
                GfxTaskResult::failed(count)
            }
        }
    }

    /// Provider format list plus the worker-only extras. Matches the
    /// provider's "no list" answer with an empty string, extras and all.
    pub fn supported_formats(&self) -> String {
        match self.provider.supported_formats() {
            Some(formats) => formats + &EXTRA_WORKER_FORMATS,
            None => String::new(),
        }
    }

    pub fn supported_video_formats(&self) -> String {
        self.provider.supported_video_formats().unwrap_or_default()
    }
}
