use crate::models::entity::{deserialize_string_field, NamedEntity};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Issue payload as returned by `issue/{key}` and `search/jql`.
///
/// Fields stay untyped because the field set depends on the site's
/// configuration; use [`RawIssue::field`] to decode a known field lazily.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawIssue {
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub id: Option<String>,
    #[serde(default)]
    pub key: String,
    #[serde(rename = "self")]
    pub self_url: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    /// Field id to display name, present when requested with `expand=names`.
    #[serde(default)]
    pub names: HashMap<String, String>,
}

impl RawIssue {
    /// Raw value of a field, treating JSON null as absent.
    pub fn raw(&self, id: &str) -> Option<&Value> {
        self.fields.get(id).filter(|value| !value.is_null())
    }

    /// Decodes a field into a typed model; malformed values yield `None`.
    pub fn field<T: DeserializeOwned>(&self, id: &str) -> Option<T> {
        self.raw(id)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn text(&self, id: &str) -> Option<String> {
        match self.raw(id)? {
            Value::String(text) => Some(text.clone()),
            _ => None,
        }
    }
}

/// Reduced issue reference used by subtasks, parents and links.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct IssueRef {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub fields: IssueRefFields,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IssueRefFields {
    pub summary: Option<String>,
    pub status: Option<NamedEntity>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IssueLinkType {
    pub name: Option<String>,
    pub inward: Option<String>,
    pub outward: Option<String>,
}

/// One entry of the `issuelinks` field. Exactly one side is normally present.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct IssueLink {
    #[serde(rename = "type", default)]
    pub link_type: IssueLinkType,
    pub inward_issue: Option<IssueRef>,
    pub outward_issue: Option<IssueRef>,
}

/// Response of `search/jql`, paged with an opaque continuation token.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    #[serde(default)]
    pub issues: Vec<RawIssue>,
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub is_last: Option<bool>,
}

impl SearchPage {
    /// Only an explicit `isLast: false` with a token continues; a missing flag ends paging.
    pub fn has_more(&self) -> bool {
        self.is_last == Some(false) && self.next_page_token.is_some()
    }
}
