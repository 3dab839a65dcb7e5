//! PNG output: the first decodable image attachment, or a placeholder canvas.

use super::{fit_within_px, output_path, ExportFormat, LocalAttachments, Renderer};
use crate::error::RenderError;
use crate::record::IssueRecord;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

pub const PLACEHOLDER_SIZE: (u32, u32) = (800, 600);
pub const PLACEHOLDER_FILL: [u8; 3] = [250, 251, 252];

#[derive(Debug, Clone)]
pub struct PngRenderer {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for PngRenderer {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
        }
    }
}

/// Composites any alpha channel over white.
pub fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        rgb.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    rgb
}

pub fn placeholder() -> RgbImage {
    let (w, h) = PLACEHOLDER_SIZE;
    RgbImage::from_pixel(w, h, Rgb(PLACEHOLDER_FILL))
}

impl PngRenderer {
    /// Picks the first image attachment that decodes, scaled down to the bound.
    pub fn compose(&self, record: &IssueRecord, attachments: &LocalAttachments) -> RgbImage {
        for (att, path) in attachments.images(record) {
            match image::open(path) {
                Ok(decoded) => {
                    let flat = flatten_on_white(&decoded);
                    let (w, h) = fit_within_px(flat.width(), flat.height(), self.max_width, self.max_height);
                    if (w, h) == flat.dimensions() {
                        return flat;
                    }
                    return imageops::resize(&flat, w, h, FilterType::Lanczos3);
                }
                Err(err) => {
                    log::warn!("{}: skipping unreadable image {}: {}", record.key, att.filename, err);
                }
            }
        }
        placeholder()
    }
}

impl Renderer for PngRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Png
    }

    fn render(
        &self,
        record: &IssueRecord,
        attachments: &LocalAttachments,
        out_dir: &Path,
    ) -> Result<PathBuf, RenderError> {
        fs::create_dir_all(out_dir)?;
        let path = output_path(record, self.format(), out_dir);
        self.compose(record, attachments)
            .save_with_format(&path, ImageFormat::Png)?;
        Ok(path)
    }
}
