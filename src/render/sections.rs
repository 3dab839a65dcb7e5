//! Section order and row content shared by every renderer.

use super::{format_date, format_size, truncate};
use crate::record::{format_number, IssueRecord};

pub const COMMENT_LIMIT: usize = 1000;
pub const SUBTASK_SUMMARY_LIMIT: usize = 80;
pub const LINK_SUMMARY_LIMIT: usize = 60;
pub const CUSTOM_VALUE_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Header,
    Title,
    StatusPriority,
    Details,
    Description,
    CustomFields,
    Attachments,
    Subtasks,
    Links,
    Comments,
    Footer,
}

impl SectionKind {
    pub fn heading(self, record: &IssueRecord) -> String {
        match self {
            SectionKind::Header => record.key.clone(),
            SectionKind::Title => record.summary.clone(),
            SectionKind::StatusPriority => "Status".to_string(),
            SectionKind::Details => "Details".to_string(),
            SectionKind::Description => "Description".to_string(),
            SectionKind::CustomFields => "Additional Information".to_string(),
            SectionKind::Attachments => format!("Attachments ({})", record.attachments.len()),
            SectionKind::Subtasks => format!("Subtasks ({})", record.subtasks.len()),
            SectionKind::Links => "Linked Issues".to_string(),
            SectionKind::Comments => format!("Comments ({})", record.comments.len()),
            SectionKind::Footer => "Export".to_string(),
        }
    }
}

/// Sections to emit for `record`, in document order. Empty optional sections are left out.
pub fn plan(record: &IssueRecord) -> Vec<SectionKind> {
    let mut sections = vec![
        SectionKind::Header,
        SectionKind::Title,
        SectionKind::StatusPriority,
        SectionKind::Details,
    ];
    if !record.description.trim().is_empty() {
        sections.push(SectionKind::Description);
    }
    if !record.custom_fields.is_empty() {
        sections.push(SectionKind::CustomFields);
    }
    if !record.attachments.is_empty() {
        sections.push(SectionKind::Attachments);
    }
    if !record.subtasks.is_empty() {
        sections.push(SectionKind::Subtasks);
    }
    if !record.links.is_empty() {
        sections.push(SectionKind::Links);
    }
    if !record.comments.is_empty() {
        sections.push(SectionKind::Comments);
    }
    sections.push(SectionKind::Footer);
    sections
}

fn join_nonempty<I: IntoIterator<Item = String>>(items: I) -> Option<String> {
    let joined: Vec<String> = items.into_iter().filter(|s| !s.is_empty()).collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined.join(", "))
    }
}

/// Label/value rows of the details block.
pub fn detail_rows(record: &IssueRecord) -> Vec<(&'static str, String)> {
    let mut rows = vec![(
        "Assignee",
        record
            .assignee
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "Unassigned".to_string()),
    )];
    if let Some(reporter) = &record.reporter {
        rows.push(("Reporter", reporter.name.clone()));
    }
    if let Some(versions) = join_nonempty(record.fix_versions.iter().map(|v| {
        if v.released {
            format!("{} (released)", v.name)
        } else {
            v.name.clone()
        }
    })) {
        rows.push(("Fix Versions", versions));
    }
    if let Some(components) = join_nonempty(record.components.iter().cloned()) {
        rows.push(("Components", components));
    }
    if let Some(labels) = join_nonempty(record.labels.iter().cloned()) {
        rows.push(("Labels", labels));
    }
    if let Some(sprints) =
        join_nonempty(record.sprints.iter().map(|s| format!("{} ({})", s.name, s.state)))
    {
        rows.push(("Sprints", sprints));
    }
    if let Some(points) = record.story_points {
        rows.push(("Story Points", format_number(points)));
    }
    if let Some(epic) = &record.epic {
        rows.push(("Epic", epic.clone()));
    }
    if let Some(parent) = &record.parent {
        rows.push(("Parent", format!("{}: {}", parent.key, parent.summary)));
    }
    rows.push(("Created", format_date(record.created.as_deref())));
    rows.push(("Updated", format_date(record.updated.as_deref())));
    if record.resolved.is_some() {
        rows.push(("Resolved", format_date(record.resolved.as_deref())));
    }
    rows
}

/// Custom field rows with values capped for display.
pub fn custom_field_rows(record: &IssueRecord) -> Vec<(String, String)> {
    record
        .custom_fields
        .iter()
        .map(|(name, value)| (name.clone(), truncate(&value.to_string(), CUSTOM_VALUE_LIMIT)))
        .collect()
}

/// One line per attachment: name, size and author.
pub fn attachment_line(filename: &str, size: u64, author: Option<&str>) -> String {
    match author {
        Some(author) => format!("{} ({}, {})", filename, format_size(size), author),
        None => format!("{} ({})", filename, format_size(size)),
    }
}

pub fn is_done(status: &str) -> bool {
    matches!(status.to_lowercase().as_str(), "done" | "closed")
}

pub fn footer_line(record: &IssueRecord, exported_at: &str) -> String {
    if record.self_url.is_empty() {
        format!("Exported {} | {}", exported_at, record.key)
    } else {
        format!("Exported {} | {} | {}", exported_at, record.key, record.self_url)
    }
}

#[cfg(test)]
mod tests {
    use super::{detail_rows, plan, SectionKind};
    use crate::record::{CommentInfo, IssueRecord, Person, Sprint};

    #[test]
    fn minimal_record_keeps_fixed_sections_only() {
        let record = IssueRecord::empty("PROJ-1");
        assert_eq!(
            plan(&record),
            vec![
                SectionKind::Header,
                SectionKind::Title,
                SectionKind::StatusPriority,
                SectionKind::Details,
                SectionKind::Footer,
            ]
        );
    }

    #[test]
    fn populated_sections_keep_order() {
        let mut record = IssueRecord::empty("PROJ-1");
        record.description = "text".into();
        record.comments.push(CommentInfo {
            id: "1".into(),
            author: "Ada".into(),
            body: "hi".into(),
            created: None,
            updated: None,
        });
        let sections = plan(&record);
        assert_eq!(sections[4], SectionKind::Description);
        assert_eq!(sections[5], SectionKind::Comments);
        assert!(!sections.contains(&SectionKind::Attachments));
    }

    #[test]
    fn details_default_assignee_and_dates() {
        let mut record = IssueRecord::empty("PROJ-1");
        record.reporter = Some(Person {
            name: "Bo".into(),
            email: None,
            avatar_url: None,
        });
        record.sprints.push(Sprint {
            name: "Sprint 2".into(),
            state: "active".into(),
        });
        record.story_points = Some(8.0);
        let rows = detail_rows(&record);
        assert_eq!(rows[0], ("Assignee", "Unassigned".to_string()));
        assert!(rows.contains(&("Reporter", "Bo".to_string())));
        assert!(rows.contains(&("Sprints", "Sprint 2 (active)".to_string())));
        assert!(rows.contains(&("Story Points", "8".to_string())));
        assert!(rows.contains(&("Created", "N/A".to_string())));
        assert!(!rows.iter().any(|(label, _)| *label == "Resolved"));
    }
}
