//! Raw issue payloads to [`IssueRecord`]s.

pub mod adf;
mod fields;

pub use fields::FieldCatalog;

use crate::record::{
    AttachmentInfo, CommentInfo, IssueRecord, Link, NamedIcon, ParentRef, Person, StatusInfo,
    Subtask, Version,
};
use jira_api::{
    Attachment, CommentPage, IssueLink, IssueRef, NamedEntity, RawIssue, UserProfile,
};

const UNKNOWN: &str = "Unknown";
const DEFAULT_LINK_TYPE: &str = "relates to";

/// Builds the canonical record for one issue. Pure and deterministic.
pub fn normalize_issue(raw: &RawIssue, catalog: &FieldCatalog) -> IssueRecord {
    let issue_type = raw.field::<NamedEntity>("issuetype");
    let status = raw.field::<NamedEntity>("status");

    let mut record = IssueRecord::empty(raw.key.clone());
    record.id = raw.id.clone().unwrap_or_default();
    record.self_url = raw.self_url.clone().unwrap_or_default();
    record.summary = raw.text("summary").unwrap_or_default();
    record.description = raw.raw("description").map(adf::to_text).unwrap_or_default();
    record.issue_type = NamedIcon {
        name: issue_type
            .as_ref()
            .and_then(|t| t.name.clone())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        icon_url: issue_type.and_then(|t| t.icon_url),
    };
    record.status = StatusInfo {
        name: status
            .as_ref()
            .and_then(|s| s.name.clone())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        category: status
            .and_then(|s| s.status_category)
            .and_then(|category| category.name),
    };
    record.priority = raw.field::<NamedEntity>("priority").map(|p| NamedIcon {
        name: p.name.unwrap_or_else(|| "None".to_string()),
        icon_url: p.icon_url,
    });
    record.created = raw.text("created");
    record.updated = raw.text("updated");
    record.resolved = raw.text("resolutiondate");

    record.assignee = raw.field::<UserProfile>("assignee").map(person);
    record.reporter = raw.field::<UserProfile>("reporter").map(person);

    record.story_points = catalog.story_points(raw);
    record.fix_versions = raw
        .field::<Vec<NamedEntity>>("fixVersions")
        .unwrap_or_default()
        .into_iter()
        .map(|v| Version {
            name: v.name.unwrap_or_default(),
            released: v.released.unwrap_or(false),
        })
        .collect();
    record.components = raw
        .field::<Vec<NamedEntity>>("components")
        .unwrap_or_default()
        .into_iter()
        .map(|c| c.name.unwrap_or_default())
        .collect();
    record.labels = raw.field::<Vec<String>>("labels").unwrap_or_default();
    record.sprints = catalog.sprints(raw);
    record.epic = catalog.epic(raw);

    record.parent = raw.field::<IssueRef>("parent").map(|parent| ParentRef {
        key: parent.key,
        summary: parent.fields.summary.unwrap_or_default(),
    });
    record.subtasks = raw
        .field::<Vec<IssueRef>>("subtasks")
        .unwrap_or_default()
        .into_iter()
        .map(|sub| Subtask {
            key: sub.key,
            summary: sub.fields.summary.unwrap_or_default(),
            status: sub
                .fields
                .status
                .and_then(|s| s.name)
                .unwrap_or_else(|| UNKNOWN.to_string()),
        })
        .collect();
    record.links = links(
        &raw.field::<Vec<IssueLink>>("issuelinks").unwrap_or_default(),
    );
    record.attachments = raw
        .field::<Vec<Attachment>>("attachment")
        .unwrap_or_default()
        .into_iter()
        .map(attachment)
        .collect();
    record.comments = raw
        .field::<CommentPage>("comment")
        .unwrap_or_default()
        .comments
        .into_iter()
        .map(|comment| CommentInfo {
            id: comment.id.unwrap_or_default(),
            author: display_name(comment.author.as_ref()),
            body: adf::to_text(&comment.body),
            created: comment.created,
            updated: comment.updated,
        })
        .collect();
    record.custom_fields = catalog.custom_fields(raw).into_iter().collect();

    record
}

fn person(user: UserProfile) -> Person {
    let avatar_url = user.avatar();
    Person {
        name: user.display_name.unwrap_or_else(|| UNKNOWN.to_string()),
        email: user.email_address,
        avatar_url,
    }
}

fn display_name(user: Option<&UserProfile>) -> String {
    user.and_then(|u| u.display_name.clone())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn attachment(att: Attachment) -> AttachmentInfo {
    AttachmentInfo {
        id: att.id.unwrap_or_default(),
        filename: att.filename.unwrap_or_default(),
        size: att.size,
        mime_type: att.mime_type,
        content_url: att.content,
        thumbnail_url: att.thumbnail,
        created: att.created,
        author: Some(display_name(att.author.as_ref())),
    }
}

/// One entry per direction present on each link.
fn links(raw_links: &[IssueLink]) -> Vec<Link> {
    let mut links = Vec::new();
    for link in raw_links {
        let sides = [
            (&link.outward_issue, &link.link_type.outward),
            (&link.inward_issue, &link.link_type.inward),
        ];
        for (issue, label) in sides {
            if let Some(issue) = issue {
                links.push(Link {
                    link_type: label
                        .clone()
                        .unwrap_or_else(|| DEFAULT_LINK_TYPE.to_string()),
                    key: issue.key.clone(),
                    summary: issue.fields.summary.clone().unwrap_or_default(),
                });
            }
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::{normalize_issue, FieldCatalog};
    use crate::record::CustomValue;
    use jira_api::{FieldDefinition, RawIssue};
    use serde_json::json;

    fn catalog() -> FieldCatalog {
        let defs: Vec<FieldDefinition> = serde_json::from_value(json!([
            {"id": "summary", "name": "Summary", "custom": false},
            {"id": "customfield_10016", "name": "Story point estimate", "custom": true},
            {"id": "customfield_10020", "name": "Sprint", "custom": true},
            {"id": "customfield_10014", "name": "Epic Link", "custom": true},
            {"id": "customfield_10050", "name": "QA Tester", "custom": true}
        ]))
        .unwrap();
        FieldCatalog::new(&defs)
    }

    fn sample() -> RawIssue {
        serde_json::from_value(json!({
            "id": "10042",
            "key": "PROJ-42",
            "self": "https://acme.atlassian.net/rest/api/3/issue/10042",
            "fields": {
                "summary": "Icon bibliotek",
                "description": {"type": "doc", "content": [
                    {"type": "paragraph", "content": [{"type": "text", "text": "Collect icons"}]}
                ]},
                "issuetype": {"name": "Story", "iconUrl": "https://x/story.svg"},
                "status": {"name": "Done", "statusCategory": {"name": "Done"}},
                "priority": null,
                "created": "2024-03-01T10:15:00.000+0100",
                "assignee": {"displayName": "Ada", "emailAddress": "ada@acme.io",
                             "avatarUrls": {"48x48": "https://x/ada.png"}},
                "reporter": null,
                "fixVersions": [{"name": "1.0", "released": true}],
                "components": [{"name": "UI"}],
                "labels": ["design"],
                "customfield_10016": 3,
                "customfield_10020": [{"name": "Sprint 7", "state": "closed"}],
                "customfield_10014": "PROJ-1",
                "customfield_10050": {"displayName": "QA Team"},
                "parent": {"key": "PROJ-1", "fields": {"summary": "Design system"}},
                "subtasks": [{"key": "PROJ-43", "fields": {"summary": "SVGs", "status": {"name": "To Do"}}}],
                "issuelinks": [{
                    "type": {"name": "Blocks", "inward": "is blocked by", "outward": "blocks"},
                    "inwardIssue": {"key": "PROJ-5", "fields": {"summary": "Brand colours"}}
                }],
                "attachment": [{"id": "1", "filename": "icons.png", "size": 2048,
                                "mimeType": "image/png", "content": "https://x/att/1",
                                "author": {"displayName": "Ada"}}],
                "comment": {"comments": [{"id": "7", "author": {"displayName": "Bo"},
                                          "body": "Looks good", "created": "2024-03-02T09:00:00.000+0000"}]}
            }
        }))
        .unwrap()
    }

    #[test]
    fn normalizes_sample_issue() {
        let record = normalize_issue(&sample(), &catalog());
        assert_eq!(record.key, "PROJ-42");
        assert_eq!(record.id, "10042");
        assert_eq!(record.summary, "Icon bibliotek");
        assert_eq!(record.description, "Collect icons\n");
        assert_eq!(record.issue_type.name, "Story");
        assert_eq!(record.status.name, "Done");
        assert_eq!(record.status.category.as_deref(), Some("Done"));
        assert!(record.priority.is_none());
        assert_eq!(record.priority_name(), "None");
        assert_eq!(record.assignee.as_ref().unwrap().name, "Ada");
        assert!(record.reporter.is_none());
        assert_eq!(record.story_points, Some(3.0));
        assert_eq!(record.sprints.len(), 1);
        assert_eq!(record.epic.as_deref(), Some("PROJ-1"));
        assert_eq!(record.parent.as_ref().unwrap().summary, "Design system");
        assert_eq!(record.subtasks[0].status, "To Do");
        assert_eq!(record.links[0].link_type, "is blocked by");
        assert_eq!(record.attachments[0].author.as_deref(), Some("Ada"));
        assert_eq!(record.comments[0].body, "Looks good");
        assert_eq!(
            record.custom_fields.get("QA Tester"),
            Some(&CustomValue::Text("QA Team".to_string()))
        );
        assert_eq!(record.custom_fields.len(), 1);
    }

    #[test]
    fn normalization_is_deterministic() {
        let raw = sample();
        let catalog = catalog();
        assert_eq!(normalize_issue(&raw, &catalog), normalize_issue(&raw, &catalog));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let raw: RawIssue = serde_json::from_value(json!({"key": "PROJ-2", "fields": {}})).unwrap();
        let record = normalize_issue(&raw, &FieldCatalog::default());
        assert_eq!(record.issue_type.name, "Unknown");
        assert_eq!(record.status.name, "Unknown");
        assert!(record.attachments.is_empty());
        assert!(record.custom_fields.is_empty());
        assert!(record.parent.is_none());
    }

    #[test]
    fn links_emit_both_directions() {
        let raw: RawIssue = serde_json::from_value(json!({"key": "PROJ-3", "fields": {
            "issuelinks": [{
                "type": {"name": "Relates"},
                "inwardIssue": {"key": "PROJ-4", "fields": {"summary": "a"}},
                "outwardIssue": {"key": "PROJ-5", "fields": {"summary": "b"}}
            }]
        }})).unwrap();
        let record = normalize_issue(&raw, &FieldCatalog::default());
        let keys: Vec<(&str, &str)> = record
            .links
            .iter()
            .map(|l| (l.link_type.as_str(), l.key.as_str()))
            .collect();
        assert_eq!(keys, vec![("relates to", "PROJ-5"), ("relates to", "PROJ-4")]);
    }
}
