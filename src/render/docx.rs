//! Word documents built with `docx-rs`.

use super::markup::to_plain;
use super::png::flatten_on_white;
use super::sections::{self, SectionKind};
use super::{export_timestamp, fit_within, format_date, output_path, truncate};
use super::{ExportFormat, LocalAttachments, Renderer};
use crate::error::RenderError;
use crate::record::IssueRecord;
use docx_rs::{Docx, Paragraph, Pic, Run, Table, TableCell, TableRow};
use image::{DynamicImage, ImageOutputFormat};
use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};

const EMU_PER_INCH: f64 = 914_400.0;
/// Pixels are laid out at 96 dpi.
const EMU_PER_PIXEL: f64 = 9_525.0;
pub const MAX_IMAGE_WIDTH_IN: f64 = 5.5;
pub const MAX_IMAGE_HEIGHT_IN: f64 = 7.5;

const PRIMARY: &str = "0052CC";
const TEXT: &str = "172B4D";
const MUTED: &str = "5E6C84";
const DONE: &str = "00875A";

#[derive(Debug, Clone, Copy, Default)]
pub struct DocxRenderer;

/// Run sizes are in half points.
fn run(text: &str, half_points: usize, color: &str) -> Run {
    Run::new().add_text(text).size(half_points).color(color)
}

fn heading(text: &str) -> Paragraph {
    Paragraph::new().add_run(run(text, 28, PRIMARY).bold())
}

fn body(text: &str) -> Vec<Paragraph> {
    text.split('\n')
        .map(|line| Paragraph::new().add_run(run(line, 20, TEXT)))
        .collect()
}

fn two_column_table(rows: &[(String, String)]) -> Table {
    let rows = rows
        .iter()
        .map(|(label, value)| {
            TableRow::new(vec![
                TableCell::new().add_paragraph(Paragraph::new().add_run(run(label, 20, MUTED).bold())),
                TableCell::new().add_paragraph(Paragraph::new().add_run(run(value, 20, TEXT))),
            ])
        })
        .collect();
    Table::new(rows)
}

/// Re-encodes the image as PNG and returns it with its bounded size in EMU.
fn prepare_image(path: &Path) -> Result<(Vec<u8>, u32, u32), RenderError> {
    let decoded = image::open(path)?;
    let flat = flatten_on_white(&decoded);
    let (px_w, px_h) = flat.dimensions();
    let (w, h) = fit_within(
        f64::from(px_w) * EMU_PER_PIXEL,
        f64::from(px_h) * EMU_PER_PIXEL,
        MAX_IMAGE_WIDTH_IN * EMU_PER_INCH,
        MAX_IMAGE_HEIGHT_IN * EMU_PER_INCH,
    );
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(flat).write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
    Ok((bytes, w.round() as u32, h.round() as u32))
}

impl DocxRenderer {
    fn document(&self, record: &IssueRecord, attachments: &LocalAttachments) -> Docx {
        sections::plan(record)
            .into_iter()
            .fold(Docx::new(), |docx, section| {
                self.section(docx, section, record, attachments)
            })
    }

    fn section(
        &self,
        mut docx: Docx,
        section: SectionKind,
        record: &IssueRecord,
        attachments: &LocalAttachments,
    ) -> Docx {
        match section {
            SectionKind::Header => docx.add_paragraph(
                Paragraph::new()
                    .add_run(run(&format!("{} | {}", record.issue_type.name, record.key), 22, PRIMARY).bold()),
            ),
            SectionKind::Title => {
                docx.add_paragraph(Paragraph::new().add_run(run(&record.summary, 36, TEXT).bold()))
            }
            SectionKind::StatusPriority => {
                let status_color = if sections::is_done(&record.status.name) {
                    DONE
                } else {
                    PRIMARY
                };
                docx.add_paragraph(
                    Paragraph::new()
                        .add_run(run("Status: ", 22, TEXT).bold())
                        .add_run(run(&record.status.name, 22, status_color).bold())
                        .add_run(run("    Priority: ", 22, TEXT).bold())
                        .add_run(run(record.priority_name(), 22, TEXT)),
                )
            }
            SectionKind::Details => {
                let rows: Vec<(String, String)> = sections::detail_rows(record)
                    .into_iter()
                    .map(|(label, value)| (label.to_string(), value))
                    .collect();
                docx.add_paragraph(heading(&section.heading(record)))
                    .add_table(two_column_table(&rows))
            }
            SectionKind::Description => {
                docx = docx.add_paragraph(heading(&section.heading(record)));
                for paragraph in body(&to_plain(&record.description)) {
                    docx = docx.add_paragraph(paragraph);
                }
                docx
            }
            SectionKind::CustomFields => docx
                .add_paragraph(heading(&section.heading(record)))
                .add_table(two_column_table(&sections::custom_field_rows(record))),
            SectionKind::Attachments => {
                docx = docx.add_paragraph(heading(&section.heading(record)));
                for att in &record.attachments {
                    docx = docx.add_paragraph(Paragraph::new().add_run(run(
                        &sections::attachment_line(&att.filename, att.size, att.author.as_deref()),
                        20,
                        TEXT,
                    )));
                }
                for (att, path) in attachments.images(record) {
                    match prepare_image(path) {
                        Ok((bytes, w, h)) => {
                            docx = docx
                                .add_paragraph(Paragraph::new().add_run(run(&att.filename, 18, MUTED).italic()))
                                .add_paragraph(
                                    Paragraph::new().add_run(Run::new().add_image(Pic::new(&bytes).size(w, h))),
                                );
                        }
                        Err(err) => {
                            log::warn!("{}: skipping image {}: {}", record.key, att.filename, err);
                        }
                    }
                }
                docx
            }
            SectionKind::Subtasks => {
                let rows: Vec<(String, String)> = record
                    .subtasks
                    .iter()
                    .map(|subtask| {
                        (
                            subtask.key.clone(),
                            format!(
                                "{} ({})",
                                truncate(&subtask.summary, sections::SUBTASK_SUMMARY_LIMIT),
                                subtask.status
                            ),
                        )
                    })
                    .collect();
                docx.add_paragraph(heading(&section.heading(record)))
                    .add_table(two_column_table(&rows))
            }
            SectionKind::Links => {
                docx = docx.add_paragraph(heading(&section.heading(record)));
                for link in &record.links {
                    docx = docx.add_paragraph(
                        Paragraph::new()
                            .add_run(run(&format!("{} ", link.link_type), 20, MUTED))
                            .add_run(run(&link.key, 20, PRIMARY).bold())
                            .add_run(run(
                                &format!(": {}", truncate(&link.summary, sections::LINK_SUMMARY_LIMIT)),
                                20,
                                TEXT,
                            )),
                    );
                }
                docx
            }
            SectionKind::Comments => {
                docx = docx.add_paragraph(heading(&section.heading(record)));
                for comment in &record.comments {
                    docx = docx.add_paragraph(Paragraph::new().add_run(
                        run(
                            &format!("{} ({})", comment.author, format_date(comment.created.as_deref())),
                            20,
                            TEXT,
                        )
                        .bold(),
                    ));
                    for paragraph in body(&to_plain(&truncate(&comment.body, sections::COMMENT_LIMIT))) {
                        docx = docx.add_paragraph(paragraph);
                    }
                }
                docx
            }
            SectionKind::Footer => docx.add_paragraph(Paragraph::new().add_run(
                run(&sections::footer_line(record, &export_timestamp()), 16, MUTED).italic(),
            )),
        }
    }
}

impl Renderer for DocxRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Docx
    }

    fn render(
        &self,
        record: &IssueRecord,
        attachments: &LocalAttachments,
        out_dir: &Path,
    ) -> Result<PathBuf, RenderError> {
        fs::create_dir_all(out_dir)?;
        let docx = self.document(record, attachments);
        let path = output_path(record, self.format(), out_dir);
        let file = File::create(&path)?;
        docx.build()
            .pack(file)
            .map_err(|err| RenderError::Docx(err.to_string()))?;
        Ok(path)
    }
}
