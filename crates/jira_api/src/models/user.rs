//! User profile models returned by Jira identity endpoints and embedded in issue fields.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
/// Represents a Jira user, including display name, email and the avatar URL set keyed by size.
pub struct UserProfile {
    pub account_id: Option<String>,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
    #[serde(default)]
    pub avatar_urls: HashMap<String, String>,
}

impl UserProfile {
    /// Returns the 48x48 avatar, the size Jira exposes on every profile.
    pub fn avatar(&self) -> Option<String> {
        self.avatar_urls.get("48x48").cloned()
    }
}
