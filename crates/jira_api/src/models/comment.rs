use crate::models::entity::deserialize_string_field;
use crate::models::UserProfile;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub id: Option<String>,
    pub author: Option<UserProfile>,
    /// Rich text document (API v3) or plain markup (API v2).
    #[serde(default)]
    pub body: Value,
    pub created: Option<String>,
    pub updated: Option<String>,
}

/// The `comment` issue field wraps the list with paging counters.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub total: Option<u64>,
}
