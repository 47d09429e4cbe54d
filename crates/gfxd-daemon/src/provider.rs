//! Built-in image provider
//!
//! Decodes with the `image` crate and writes JPEG thumbnails into the
//! configured output directory. The decode happens once per batch; each
//! requested size is produced from that single decode. Runs only inside
//! this worker process, so a decoder crash never takes the client down.

use std::path::{Path, PathBuf};

use gfxd_core::{Dimension, GfxProvider, GfxdError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

pub struct ThumbnailProvider {
    output_dir: PathBuf,
}

impl ThumbnailProvider {
    pub fn new(output_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    fn output_path(&self, source: &Path, dimension: Dimension) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_owned());
        self.output_dir.join(format!("{stem}_{dimension}.jpg"))
    }
}

/// Scale to `dimension`. A zero height means "bound by width, preserve
/// aspect ratio"; otherwise the target is filled exactly, cropping
/// centered.
fn scale(img: &DynamicImage, dimension: Dimension) -> DynamicImage {
    if dimension.height() == 0 {
        let width = dimension.width().max(1);
        let height =
            ((u64::from(img.height()) * u64::from(width)) / u64::from(img.width().max(1))).max(1);
        img.resize_exact(width, height as u32, FilterType::Lanczos3)
    } else {
        img.resize_to_fill(dimension.width().max(1), dimension.height(), FilterType::Lanczos3)
    }
}

impl GfxProvider for ThumbnailProvider {
    fn generate_images(&self, path: &Path, dimensions: &[Dimension]) -> Result<Vec<String>> {
        let img = image::open(path).map_err(|e| GfxdError::Generation(e.to_string()))?;

        let mut outputs = Vec::with_capacity(dimensions.len());
        for &dimension in dimensions {
            let out_path = self.output_path(path, dimension);
            scale(&img, dimension)
                .to_rgb8()
                .save_with_format(&out_path, ImageFormat::Jpeg)
                .map_err(|e| GfxdError::Generation(e.to_string()))?;
            outputs.push(out_path.to_string_lossy().into_owned());
        }
        Ok(outputs)
    }

    fn supported_formats(&self) -> Option<String> {
        Some(".jpg.jpeg.png.gif.bmp.ico.tga.webp".to_owned())
    }

    fn supported_video_formats(&self) -> Option<String> {
        None
    }
}
