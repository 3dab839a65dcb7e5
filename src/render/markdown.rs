//! Markdown documents with YAML front matter, tuned for search and AI indexing.

use super::markup::to_markdown;
use super::sections::{self, SectionKind};
use super::{export_timestamp, format_date, is_image, output_path, truncate};
use super::{ExportFormat, LocalAttachments, Renderer};
use crate::error::RenderError;
use crate::record::IssueRecord;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_IMAGES_DIR: &str = "images";
pub const INDEX_FILE: &str = "INDEX.md";

#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    pub images_dir: String,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self {
            images_dir: DEFAULT_IMAGES_DIR.to_string(),
        }
    }
}

fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

impl MarkdownRenderer {
    fn image_name(record: &IssueRecord, filename: &str) -> String {
        format!("{}-{}", record.key, filename)
    }

    /// Full document text for `record`.
    pub fn build(&self, record: &IssueRecord) -> String {
        let mut lines: Vec<String> = Vec::new();
        for section in sections::plan(record) {
            match section {
                SectionKind::Header => self.front_matter(record, &mut lines),
                SectionKind::Title => {
                    lines.push(format!("# {} – {}", record.key, record.summary));
                    lines.push(String::new());
                }
                SectionKind::StatusPriority => {
                    lines.push("## Overview".to_string());
                    lines.push(String::new());
                    lines.push("| Field | Value |".to_string());
                    lines.push("|-------|-------|".to_string());
                    lines.push(format!("| **Type** | {} |", cell(&record.issue_type.name)));
                    lines.push(format!("| **Status** | {} |", cell(&record.status.name)));
                    lines.push(format!("| **Priority** | {} |", cell(record.priority_name())));
                }
                SectionKind::Details => {
                    for (label, value) in sections::detail_rows(record) {
                        lines.push(format!("| **{}** | {} |", label, cell(&value)));
                    }
                    lines.push(String::new());
                }
                SectionKind::Description => {
                    lines.push(format!("## {}", section.heading(record)));
                    lines.push(String::new());
                    lines.push(to_markdown(&record.description));
                    lines.push(String::new());
                }
                SectionKind::CustomFields => {
                    lines.push(format!("## {}", section.heading(record)));
                    lines.push(String::new());
                    for (name, value) in sections::custom_field_rows(record) {
                        lines.push(format!("### {}", name));
                        lines.push(String::new());
                        lines.push(value);
                        lines.push(String::new());
                    }
                }
                SectionKind::Attachments => {
                    lines.push(format!("## {}", section.heading(record)));
                    lines.push(String::new());
                    for att in &record.attachments {
                        if is_image(&att.filename) {
                            lines.push(format!("### {}", att.filename));
                            lines.push(String::new());
                            lines.push(format!(
                                "![{}]({}/{})",
                                att.filename,
                                self.images_dir,
                                Self::image_name(record, &att.filename)
                            ));
                            lines.push(String::new());
                        } else {
                            lines.push(format!(
                                "- **{}**",
                                sections::attachment_line(&att.filename, att.size, att.author.as_deref())
                            ));
                        }
                    }
                    lines.push(String::new());
                }
                SectionKind::Subtasks => {
                    lines.push(format!("## {}", section.heading(record)));
                    lines.push(String::new());
                    for subtask in &record.subtasks {
                        let mark = if sections::is_done(&subtask.status) { "x" } else { " " };
                        lines.push(format!(
                            "- [{}] **{}**: {} ({})",
                            mark,
                            subtask.key,
                            truncate(&subtask.summary, sections::SUBTASK_SUMMARY_LIMIT),
                            subtask.status
                        ));
                    }
                    lines.push(String::new());
                }
                SectionKind::Links => {
                    lines.push(format!("## {}", section.heading(record)));
                    lines.push(String::new());
                    for link in &record.links {
                        lines.push(format!(
                            "- {} **{}**: {}",
                            link.link_type,
                            link.key,
                            truncate(&link.summary, sections::LINK_SUMMARY_LIMIT)
                        ));
                    }
                    lines.push(String::new());
                }
                SectionKind::Comments => {
                    lines.push(format!("## {}", section.heading(record)));
                    lines.push(String::new());
                    for comment in &record.comments {
                        lines.push(format!(
                            "### {} ({})",
                            comment.author,
                            format_date(comment.created.as_deref())
                        ));
                        lines.push(String::new());
                        lines.push(to_markdown(&truncate(&comment.body, sections::COMMENT_LIMIT)));
                        lines.push(String::new());
                    }
                }
                SectionKind::Footer => {
                    lines.push("---".to_string());
                    lines.push(String::new());
                    lines.push(format!("*{}*", sections::footer_line(record, &export_timestamp())));
                    lines.push(String::new());
                }
            }
        }
        lines.join("\n")
    }

    fn front_matter(&self, record: &IssueRecord, lines: &mut Vec<String>) {
        lines.push("---".to_string());
        lines.push(format!("issue_key: {}", record.key));
        lines.push(format!("type: {}", record.issue_type.name));
        lines.push(format!("status: {}", record.status.name));
        lines.push(format!("priority: {}", record.priority_name()));
        if let Some(assignee) = &record.assignee {
            lines.push(format!("assignee: {}", assignee.name));
        }
        if !record.labels.is_empty() {
            lines.push(format!("labels: [{}]", record.labels.join(", ")));
        }
        if !record.components.is_empty() {
            lines.push(format!("components: [{}]", record.components.join(", ")));
        }
        lines.push(format!("created: {}", format_date(record.created.as_deref())));
        lines.push(format!("updated: {}", format_date(record.updated.as_deref())));
        lines.push("---".to_string());
        lines.push(String::new());
    }

    /// Copies local image attachments next to the document so the references resolve.
    fn copy_images(&self, record: &IssueRecord, attachments: &LocalAttachments, out_dir: &Path) {
        let images = attachments.images(record);
        if images.is_empty() {
            return;
        }
        let target_dir = out_dir.join(&self.images_dir);
        if let Err(err) = fs::create_dir_all(&target_dir) {
            log::warn!("could not create {}: {}", target_dir.display(), err);
            return;
        }
        for (att, source) in images {
            let target = target_dir.join(Self::image_name(record, &att.filename));
            if let Err(err) = fs::copy(source, &target) {
                log::warn!("{}: could not copy image {}: {}", record.key, att.filename, err);
            }
        }
    }
}

impl Renderer for MarkdownRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Markdown
    }

    fn render(
        &self,
        record: &IssueRecord,
        attachments: &LocalAttachments,
        out_dir: &Path,
    ) -> Result<PathBuf, RenderError> {
        fs::create_dir_all(out_dir)?;
        self.copy_images(record, attachments, out_dir);
        let path = output_path(record, self.format(), out_dir);
        fs::write(&path, self.build(record))?;
        Ok(path)
    }
}

fn status_marker(status: &str) -> &'static str {
    let lower = status.to_lowercase();
    if sections::is_done(&lower) {
        "[x]"
    } else if lower.contains("progress") {
        "[~]"
    } else {
        "[ ]"
    }
}

/// Catalog of exported issues grouped by type, with every label and component.
pub fn build_index(records: &[IssueRecord]) -> String {
    let mut by_type: BTreeMap<&str, Vec<&IssueRecord>> = BTreeMap::new();
    for record in records {
        by_type
            .entry(record.issue_type.name.as_str())
            .or_default()
            .push(record);
    }

    let mut lines = vec![
        "# Issue Index".to_string(),
        String::new(),
        format!("*Generated: {}*", export_timestamp()),
        format!("*Issues: {}*", records.len()),
        String::new(),
        "## Contents".to_string(),
        String::new(),
    ];

    for (issue_type, mut issues) in by_type {
        issues.sort_by(|a, b| a.key.cmp(&b.key));
        lines.push(format!("### {} ({})", issue_type, issues.len()));
        lines.push(String::new());
        for record in issues {
            lines.push(format!(
                "- {} [{}]({}.md) – {}",
                status_marker(&record.status.name),
                record.key,
                record.key,
                record.summary
            ));
        }
        lines.push(String::new());
    }

    let labels: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.labels.iter().map(String::as_str))
        .collect();
    let components: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.components.iter().map(String::as_str))
        .collect();
    for (title, values) in [("Labels", labels), ("Components", components)] {
        if values.is_empty() {
            continue;
        }
        lines.push(format!("## {}", title));
        lines.push(String::new());
        let tags: Vec<String> = values.iter().map(|v| format!("`{}`", v)).collect();
        lines.push(tags.join(" "));
        lines.push(String::new());
    }

    lines.join("\n")
}

pub fn write_index(records: &[IssueRecord], out_dir: &Path) -> Result<PathBuf, RenderError> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(INDEX_FILE);
    fs::write(&path, build_index(records))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{build_index, MarkdownRenderer};
    use crate::record::{AttachmentInfo, IssueRecord, StatusInfo};
    use crate::render::{LocalAttachments, Renderer};
    use std::fs;

    fn attachment(name: &str, size: u64) -> AttachmentInfo {
        AttachmentInfo {
            id: name.to_string(),
            filename: name.to_string(),
            size,
            mime_type: None,
            content_url: None,
            thumbnail_url: None,
            created: None,
            author: Some("Ada".to_string()),
        }
    }

    fn icon_record() -> IssueRecord {
        let mut record = IssueRecord::empty("PROJ-42");
        record.summary = "Icon bibliotek".to_string();
        record.status = StatusInfo {
            name: "Done".to_string(),
            category: Some("Done".to_string()),
        };
        record.attachments = vec![attachment("icons.png", 2048), attachment("brief.pdf", 4096)];
        record
    }

    #[test]
    fn front_matter_and_image_references() {
        let text = MarkdownRenderer::default().build(&icon_record());
        assert!(text.starts_with("---\nissue_key: PROJ-42\n"));
        assert!(text.contains("\nstatus: Done\n"));
        assert!(text.contains("# PROJ-42 – Icon bibliotek"));
        assert_eq!(text.matches("![").count(), 1);
        assert!(text.contains("![icons.png](images/PROJ-42-icons.png)"));
        assert!(text.contains("- **brief.pdf (4.0 KB, Ada)**"));
    }

    #[test]
    fn no_attachments_section_without_attachments() {
        let record = IssueRecord::empty("PROJ-1");
        let text = MarkdownRenderer::default().build(&record);
        assert!(!text.contains("## Attachments"));
        assert!(text.contains("| **Assignee** | Unassigned |"));
    }

    #[test]
    fn render_writes_file_and_copies_images() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("staged-icons.png");
        fs::write(&staged, b"not really a png").unwrap();
        let mut local = LocalAttachments::new();
        local.insert("icons.png", &staged);

        let out = dir.path().join("out");
        let path = MarkdownRenderer::default()
            .render(&icon_record(), &local, &out)
            .unwrap();
        assert_eq!(path, out.join("PROJ-42.md"));
        assert!(out.join("images/PROJ-42-icons.png").is_file());
    }

    #[test]
    fn index_groups_by_type() {
        let mut story = IssueRecord::empty("PROJ-2");
        story.issue_type.name = "Story".into();
        story.labels = vec!["ui".into()];
        let mut bug = IssueRecord::empty("PROJ-1");
        bug.issue_type.name = "Bug".into();
        bug.status.name = "In Progress".into();
        bug.labels = vec!["backend".into(), "ui".into()];

        let text = build_index(&[story, bug]);
        let bug_at = text.find("### Bug (1)").unwrap();
        let story_at = text.find("### Story (1)").unwrap();
        assert!(bug_at < story_at);
        assert!(text.contains("- [~] [PROJ-1](PROJ-1.md)"));
        assert!(text.contains("`backend` `ui`"));
        assert!(!text.contains("## Components"));
    }
}
