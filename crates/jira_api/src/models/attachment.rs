//! Attachment metadata embedded in the `attachment` issue field.

use crate::models::entity::deserialize_string_field;
use crate::models::UserProfile;
use serde::Deserialize;

/// Represents attachment metadata returned by Jira, including id, file name, size, mime type, content and thumbnail URLs, creation time and author.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub id: Option<String>,
    pub filename: Option<String>,
    #[serde(default)]
    pub size: u64,
    pub mime_type: Option<String>,
    pub content: Option<String>,
    pub thumbnail: Option<String>,
    pub created: Option<String>,
    pub author: Option<UserProfile>,
}
