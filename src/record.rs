//! Canonical issue record shared by every renderer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NamedIcon {
    pub name: String,
    pub icon_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatusInfo {
    pub name: String,
    pub category: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Person {
    pub name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Version {
    pub name: String,
    pub released: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Sprint {
    pub name: String,
    pub state: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParentRef {
    pub key: String,
    pub summary: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Subtask {
    pub key: String,
    pub summary: String,
    pub status: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Link {
    pub link_type: String,
    pub key: String,
    pub summary: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AttachmentInfo {
    pub id: String,
    pub filename: String,
    pub size: u64,
    pub mime_type: Option<String>,
    pub content_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub created: Option<String>,
    pub author: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommentInfo {
    pub id: String,
    pub author: String,
    pub body: String,
    pub created: Option<String>,
    pub updated: Option<String>,
}

/// A resolved custom field value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum CustomValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl fmt::Display for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomValue::Bool(flag) => write!(f, "{}", flag),
            CustomValue::Number(number) => write!(f, "{}", format_number(*number)),
            CustomValue::Text(text) => f.write_str(text),
            CustomValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

/// Whole numbers print without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Normalized issue, built once per fetch and read by the renderers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IssueRecord {
    pub key: String,
    pub id: String,
    pub self_url: String,
    pub summary: String,
    pub description: String,
    pub issue_type: NamedIcon,
    pub status: StatusInfo,
    pub priority: Option<NamedIcon>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub resolved: Option<String>,
    pub assignee: Option<Person>,
    pub reporter: Option<Person>,
    pub story_points: Option<f64>,
    pub fix_versions: Vec<Version>,
    pub components: Vec<String>,
    pub labels: Vec<String>,
    pub sprints: Vec<Sprint>,
    pub epic: Option<String>,
    pub parent: Option<ParentRef>,
    pub subtasks: Vec<Subtask>,
    pub links: Vec<Link>,
    pub attachments: Vec<AttachmentInfo>,
    pub comments: Vec<CommentInfo>,
    pub custom_fields: BTreeMap<String, CustomValue>,
}

impl IssueRecord {
    /// Minimal record for the given key; used by tests and as a normalization seed.
    pub fn empty(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            id: String::new(),
            self_url: String::new(),
            summary: String::new(),
            description: String::new(),
            issue_type: NamedIcon {
                name: "Unknown".to_string(),
                icon_url: None,
            },
            status: StatusInfo {
                name: "Unknown".to_string(),
                category: None,
            },
            priority: None,
            created: None,
            updated: None,
            resolved: None,
            assignee: None,
            reporter: None,
            story_points: None,
            fix_versions: Vec::new(),
            components: Vec::new(),
            labels: Vec::new(),
            sprints: Vec::new(),
            epic: None,
            parent: None,
            subtasks: Vec::new(),
            links: Vec::new(),
            attachments: Vec::new(),
            comments: Vec::new(),
            custom_fields: BTreeMap::new(),
        }
    }

    pub fn priority_name(&self) -> &str {
        self.priority
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or("None")
    }
}
