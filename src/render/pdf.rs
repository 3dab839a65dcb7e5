//! A4 PDF documents drawn with the built-in Helvetica faces.

use super::markup::to_plain;
use super::png::flatten_on_white;
use super::sections::{self, SectionKind};
use super::{export_timestamp, fit_within, format_date, output_path, truncate};
use super::{ExportFormat, LocalAttachments, Renderer};
use crate::error::RenderError;
use crate::record::IssueRecord;
use image::DynamicImage;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, PdfPageIndex, Point, Rgb,
};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
pub const MAX_IMAGE_WIDTH_MM: f64 = 160.0;
pub const MAX_IMAGE_HEIGHT_MM: f64 = 200.0;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width relative to the font size.
const GLYPH_RATIO: f32 = 0.5;
const LINE_SPACING: f32 = 1.35;
const LAYER: &str = "content";

const PRIMARY: (f32, f32, f32) = (0.0, 0.322, 0.8);
const TEXT: (f32, f32, f32) = (0.09, 0.169, 0.302);
const MUTED: (f32, f32, f32) = (0.369, 0.424, 0.518);
const DONE: (f32, f32, f32) = (0.0, 0.529, 0.353);
const BORDER: (f32, f32, f32) = (0.875, 0.882, 0.902);

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

fn color((r, g, b): (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn pdf_error(err: impl std::fmt::Display) -> RenderError {
    RenderError::Pdf(err.to_string())
}

/// Built-in fonts only cover Latin-1; other characters are approximated or replaced.
fn latin1(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2022}' => '*',
            '\t' => ' ',
            c if (c as u32) < 0x20 => ' ',
            c if (c as u32) <= 0xFF => c,
            _ => '?',
        })
        .collect()
}

/// Greedy word wrap at `max_chars`, splitting words that do not fit on a line.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let word: String = word.into_iter().collect();
            let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }
    while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }
    lines
}

/// Cursor over the current page; starts a new page when content runs past the bottom margin.
struct PageWriter {
    doc: PdfDocumentReference,
    page: PdfPageIndex,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
    /// Section headings in drawing order, mirrored as bookmarks.
    outline: Vec<String>,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, RenderError> {
        let (doc, page, layer) =
            PdfDocument::new(latin1(title), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            page,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
            outline: Vec::new(),
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page = page;
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    fn ensure(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn text(&mut self, text: &str, size: f32, bold: bool, rgb: (f32, f32, f32)) {
        let line_height = size * PT_TO_MM * LINE_SPACING;
        let max_chars = (CONTENT_WIDTH / (size * PT_TO_MM * GLYPH_RATIO)) as usize;
        for line in wrap(&latin1(text), max_chars) {
            self.ensure(line_height);
            self.y -= line_height;
            self.layer.set_fill_color(color(rgb));
            let font = if bold { &self.bold } else { &self.regular };
            self.layer.use_text(line, size, Mm(MARGIN), Mm(self.y), font);
        }
    }

    fn heading(&mut self, text: &str) {
        self.ensure(14.0);
        self.doc.add_bookmark(latin1(text), self.page);
        self.outline.push(text.to_string());
        self.gap(4.0);
        self.text(text, 13.0, true, PRIMARY);
        self.rule();
    }

    fn rule(&mut self) {
        self.gap(1.5);
        self.layer.set_outline_color(color(BORDER));
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(self.y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(self.y)), false),
            ],
            is_closed: false,
        });
        self.gap(2.0);
    }

    fn field(&mut self, label: &str, value: &str) {
        self.text(&format!("{}: {}", label, value), 10.0, false, TEXT);
    }

    fn image(&mut self, path: &Path) -> Result<(), RenderError> {
        let decoded = image::open(path)?;
        let flat = flatten_on_white(&decoded);
        let (px_w, px_h) = flat.dimensions();
        let rgb = DynamicImage::ImageRgb8(flat);
        let natural_w = f64::from(px_w) * 25.4 / 72.0;
        let natural_h = f64::from(px_h) * 25.4 / 72.0;
        let (w_mm, h_mm) = fit_within(natural_w, natural_h, MAX_IMAGE_WIDTH_MM, MAX_IMAGE_HEIGHT_MM);
        if w_mm <= 0.0 || h_mm <= 0.0 {
            return Ok(());
        }

        self.ensure(h_mm as f32 + 2.0);
        self.y -= h_mm as f32;
        let dpi = f64::from(px_w) * 25.4 / w_mm;
        Image::from_dynamic_image(&rgb).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN)),
                translate_y: Some(Mm(self.y)),
                dpi: Some(dpi as f32),
                ..Default::default()
            },
        );
        self.gap(3.0);
        Ok(())
    }

    fn save(self, path: &Path) -> Result<(), RenderError> {
        let file = File::create(path)?;
        self.doc
            .save(&mut BufWriter::new(file))
            .map_err(pdf_error)
    }
}

impl PdfRenderer {
    /// Lays out every planned section without touching the filesystem.
    fn layout(
        &self,
        record: &IssueRecord,
        attachments: &LocalAttachments,
    ) -> Result<PageWriter, RenderError> {
        let mut writer = PageWriter::new(&format!("{} {}", record.key, record.summary))?;
        for section in sections::plan(record) {
            self.section(&mut writer, section, record, attachments);
        }
        Ok(writer)
    }

    fn section(
        &self,
        writer: &mut PageWriter,
        section: SectionKind,
        record: &IssueRecord,
        attachments: &LocalAttachments,
    ) {
        match section {
            SectionKind::Header => {
                writer.text(
                    &format!("{} | {}", record.issue_type.name, record.key),
                    10.0,
                    true,
                    PRIMARY,
                );
            }
            SectionKind::Title => {
                writer.gap(2.0);
                writer.text(&record.summary, 18.0, true, TEXT);
                writer.gap(2.0);
            }
            SectionKind::StatusPriority => {
                let status_color = if sections::is_done(&record.status.name) {
                    DONE
                } else {
                    PRIMARY
                };
                writer.text(&format!("Status: {}", record.status.name), 11.0, true, status_color);
                writer.text(&format!("Priority: {}", record.priority_name()), 11.0, false, TEXT);
            }
            SectionKind::Details => {
                writer.heading(&section.heading(record));
                for (label, value) in sections::detail_rows(record) {
                    writer.field(label, &value);
                }
            }
            SectionKind::Description => {
                writer.heading(&section.heading(record));
                writer.text(&to_plain(&record.description), 10.0, false, TEXT);
            }
            SectionKind::CustomFields => {
                writer.heading(&section.heading(record));
                for (name, value) in sections::custom_field_rows(record) {
                    writer.field(&name, &value);
                }
            }
            SectionKind::Attachments => {
                writer.heading(&section.heading(record));
                for att in &record.attachments {
                    writer.text(
                        &sections::attachment_line(&att.filename, att.size, att.author.as_deref()),
                        10.0,
                        false,
                        TEXT,
                    );
                }
                for (att, path) in attachments.images(record) {
                    writer.gap(2.0);
                    writer.text(&att.filename, 9.0, true, MUTED);
                    if let Err(err) = writer.image(path) {
                        log::warn!("{}: skipping image {}: {}", record.key, att.filename, err);
                    }
                }
            }
            SectionKind::Subtasks => {
                writer.heading(&section.heading(record));
                for subtask in &record.subtasks {
                    let mark = if sections::is_done(&subtask.status) { "[x]" } else { "[ ]" };
                    writer.text(
                        &format!(
                            "{} {}  {} ({})",
                            mark,
                            subtask.key,
                            truncate(&subtask.summary, sections::SUBTASK_SUMMARY_LIMIT),
                            subtask.status
                        ),
                        10.0,
                        false,
                        TEXT,
                    );
                }
            }
            SectionKind::Links => {
                writer.heading(&section.heading(record));
                for link in &record.links {
                    writer.text(
                        &format!(
                            "{} {}: {}",
                            link.link_type,
                            link.key,
                            truncate(&link.summary, sections::LINK_SUMMARY_LIMIT)
                        ),
                        10.0,
                        false,
                        TEXT,
                    );
                }
            }
            SectionKind::Comments => {
                writer.heading(&section.heading(record));
                for comment in &record.comments {
                    writer.gap(1.5);
                    writer.text(
                        &format!(
                            "{} ({})",
                            comment.author,
                            format_date(comment.created.as_deref())
                        ),
                        10.0,
                        true,
                        TEXT,
                    );
                    writer.text(
                        &to_plain(&truncate(&comment.body, sections::COMMENT_LIMIT)),
                        10.0,
                        false,
                        TEXT,
                    );
                }
            }
            SectionKind::Footer => {
                writer.gap(4.0);
                writer.rule();
                writer.text(
                    &sections::footer_line(record, &export_timestamp()),
                    8.0,
                    false,
                    MUTED,
                );
            }
        }
    }
}

impl Renderer for PdfRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn render(
        &self,
        record: &IssueRecord,
        attachments: &LocalAttachments,
        out_dir: &Path,
    ) -> Result<PathBuf, RenderError> {
        fs::create_dir_all(out_dir)?;
        let writer = self.layout(record, attachments)?;
        log::debug!("{}: {} pdf page(s)", record.key, writer.pages);
        let path = output_path(record, self.format(), out_dir);
        writer.save(&path)?;
        Ok(path)
    }
}
