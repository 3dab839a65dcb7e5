//! Document renderers and the helpers they share.

pub mod docx;
pub mod markdown;
pub mod markup;
pub mod pdf;
pub mod png;
pub mod sections;

use crate::error::RenderError;
use crate::record::{AttachmentInfo, IssueRecord};
use chrono::{DateTime, FixedOffset, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Output formats, identified by their file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Docx,
    #[serde(rename = "md")]
    Markdown,
    Png,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Pdf,
        ExportFormat::Docx,
        ExportFormat::Markdown,
        ExportFormat::Png,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(ExportFormat::Pdf),
            "docx" | "word" => Some(ExportFormat::Docx),
            "md" | "markdown" => Some(ExportFormat::Markdown),
            "png" | "image" => Some(ExportFormat::Png),
            _ => None,
        }
    }

    pub fn id(self) -> &'static str {
        self.extension()
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Markdown => "md",
            ExportFormat::Png => "png",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "PDF",
            ExportFormat::Docx => "Word",
            ExportFormat::Markdown => "Markdown",
            ExportFormat::Png => "PNG",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "Formatted document with inline images",
            ExportFormat::Docx => "Editable Word document",
            ExportFormat::Markdown => "Plain text with front matter, suited for search and AI indexing",
            ExportFormat::Png => "First image attachment, or a placeholder canvas",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Markdown => "text/markdown",
            ExportFormat::Png => "image/png",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Locally downloaded attachments, keyed by the remote file name.
#[derive(Debug, Clone, Default)]
pub struct LocalAttachments {
    files: BTreeMap<String, PathBuf>,
}

impl LocalAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, filename: impl Into<String>, path: impl Into<PathBuf>) {
        self.files.insert(filename.into(), path.into());
    }

    pub fn get(&self, filename: &str) -> Option<&Path> {
        self.files.get(filename).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Image attachments of `record` whose local file exists, in record order.
    pub fn images<'a>(&'a self, record: &'a IssueRecord) -> Vec<(&'a AttachmentInfo, &'a Path)> {
        record
            .attachments
            .iter()
            .filter(|att| is_image(&att.filename))
            .filter_map(|att| {
                self.get(&att.filename)
                    .filter(|path| path.is_file())
                    .map(|path| (att, path))
            })
            .collect()
    }
}

/// Writes one issue in one format.
pub trait Renderer: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn render(
        &self,
        record: &IssueRecord,
        attachments: &LocalAttachments,
        out_dir: &Path,
    ) -> Result<PathBuf, RenderError>;
}

pub fn renderer_for(format: ExportFormat) -> Box<dyn Renderer> {
    match format {
        ExportFormat::Pdf => Box::new(pdf::PdfRenderer),
        ExportFormat::Docx => Box::new(docx::DocxRenderer),
        ExportFormat::Markdown => Box::new(markdown::MarkdownRenderer::default()),
        ExportFormat::Png => Box::new(png::PngRenderer::default()),
    }
}

/// `{out_dir}/{KEY}.{ext}`
pub fn output_path(record: &IssueRecord, format: ExportFormat, out_dir: &Path) -> PathBuf {
    out_dir.join(format!("{}.{}", record.key, format.extension()))
}

pub fn is_image(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Scales `(width, height)` down to fit the box, preserving aspect ratio. Never upscales.
pub fn fit_within(width: f64, height: f64, max_width: f64, max_height: f64) -> (f64, f64) {
    if width <= 0.0 || height <= 0.0 {
        return (width.max(0.0), height.max(0.0));
    }
    let scale = (max_width / width).min(max_height / height).min(1.0);
    (width * scale, height * scale)
}

/// Pixel variant of [`fit_within`]; dimensions are rounded and stay at least 1.
pub fn fit_within_px(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let (w, h) = fit_within(
        f64::from(width),
        f64::from(height),
        f64::from(max_width),
        f64::from(max_height),
    );
    (
        (w.round() as u32).clamp(1, max_width),
        (h.round() as u32).clamp(1, max_height),
    )
}

/// `x.x KB` below one megabyte, `x.x MB` above.
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    if kb < 1024.0 {
        format!("{:.1} KB", kb)
    } else {
        format!("{:.1} MB", kb / 1024.0)
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}

/// `YYYY-MM-DD HH:MM` in the timestamp's own offset; unparsable input keeps its first 19 characters.
pub fn format_date(value: Option<&str>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => "N/A".to_string(),
        Some(text) => match parse_timestamp(text) {
            Some(parsed) => parsed.format("%Y-%m-%d %H:%M").to_string(),
            None => text.chars().take(19).collect(),
        },
    }
}

pub fn export_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M").to_string()
}

/// Caps `text` at `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max).collect();
        cut.push_str("...");
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_aliases() {
        assert_eq!(ExportFormat::parse("PDF"), Some(ExportFormat::Pdf));
        assert_eq!(ExportFormat::parse("markdown"), Some(ExportFormat::Markdown));
        assert_eq!(ExportFormat::parse("word"), Some(ExportFormat::Docx));
        assert_eq!(ExportFormat::parse("xls"), None);
        assert_eq!(ExportFormat::Markdown.to_string(), "md");
    }

    #[test]
    fn fit_within_preserves_ratio_and_never_upscales() {
        let (w, h) = fit_within(4000.0, 2000.0, 160.0, 200.0);
        assert!((w - 160.0).abs() < 1e-9);
        assert!((h - 80.0).abs() < 1e-9);
        assert!((w / h - 2.0).abs() < 1e-9);

        assert_eq!(fit_within(50.0, 30.0, 160.0, 200.0), (50.0, 30.0));

        let (w, h) = fit_within(100.0, 1000.0, 160.0, 200.0);
        assert!(w <= 160.0 && h <= 200.0);
        assert!((w / h - 0.1).abs() < 1e-9);
    }

    #[test]
    fn fit_within_px_bounds() {
        assert_eq!(fit_within_px(3840, 2160, 1920, 1080), (1920, 1080));
        assert_eq!(fit_within_px(640, 480, 1920, 1080), (640, 480));
        let (w, h) = fit_within_px(1000, 3000, 1920, 1080);
        assert_eq!(h, 1080);
        assert_eq!(w, 360);
    }

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(0), "0.0 KB");
    }

    #[test]
    fn dates_format_or_fall_back() {
        assert_eq!(format_date(Some("2024-03-01T10:15:00.000+0100")), "2024-03-01 10:15");
        assert_eq!(format_date(Some("2024-03-01T10:15:30Z")), "2024-03-01 10:15");
        assert_eq!(format_date(Some("yesterday around lunch time")), "yesterday around lu");
        assert_eq!(format_date(None), "N/A");
        assert_eq!(format_date(Some("")), "N/A");
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("åäöåäö", 3), "åäö...");
    }

    #[test]
    fn image_detection_by_extension() {
        assert!(is_image("shot.PNG"));
        assert!(is_image("photo.jpeg"));
        assert!(!is_image("notes.pdf"));
        assert!(!is_image("README"));
    }

    #[test]
    fn images_require_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let on_disk = dir.path().join("a.png");
        std::fs::write(&on_disk, b"x").unwrap();

        let mut record = IssueRecord::empty("PROJ-1");
        for name in ["a.png", "b.png", "c.txt"] {
            record.attachments.push(AttachmentInfo {
                id: name.to_string(),
                filename: name.to_string(),
                size: 1,
                mime_type: None,
                content_url: None,
                thumbnail_url: None,
                created: None,
                author: None,
            });
        }
        let mut local = LocalAttachments::new();
        local.insert("a.png", &on_disk);
        local.insert("b.png", dir.path().join("missing.png"));
        local.insert("c.txt", &on_disk);

        let images = local.images(&record);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].0.filename, "a.png");
    }
}
