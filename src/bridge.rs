//! Request and response payloads exchanged with HTTP clients.
//!
//! Field names follow the JSON the service has always spoken, so existing
//! callers keep working.

use crate::record::IssueRecord;
use crate::render::ExportFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Credentials a caller may send to override the server environment.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct CredentialsPayload {
    pub jira_url: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ExportRequest {
    pub issue_keys: Vec<String>,
    pub format: Option<String>,
    #[serde(flatten)]
    pub credentials: CredentialsPayload,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SearchRequest {
    pub issue_keys: Option<Vec<String>>,
    pub jql: Option<String>,
    pub max_results: Option<usize>,
    #[serde(flatten)]
    pub credentials: CredentialsPayload,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SingleExportQuery {
    pub format: Option<String>,
    pub download: Option<String>,
}

impl SingleExportQuery {
    pub fn wants_download(&self) -> bool {
        self.download
            .as_deref()
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// A rendered file carried inline as base64.
#[derive(Serialize, Debug, Clone)]
pub struct FilePayload {
    pub issue_key: String,
    pub filename: String,
    pub file_base64: String,
    pub format: ExportFormat,
    /// Length of the base64 text.
    pub size: usize,
}

#[derive(Serialize, Debug, Clone)]
pub struct FailurePayload {
    pub issue_key: String,
    pub error: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct ExportResponse {
    pub success: bool,
    pub files: Vec<FilePayload>,
    pub errors: Vec<FailurePayload>,
    pub total: usize,
    pub exported: usize,
    pub failed: usize,
    pub format: ExportFormat,
}

#[derive(Serialize, Debug, Clone)]
pub struct SingleExportResponse {
    pub success: bool,
    pub issue_key: String,
    pub filename: String,
    pub file_base64: String,
    pub format: ExportFormat,
}

#[derive(Serialize, Debug, Clone)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct CredentialsResponse {
    pub success: bool,
    pub site_name: String,
    pub user: String,
}

/// Short issue summary returned by search.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct IssueSummary {
    pub key: String,
    pub summary: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub status: String,
}

impl From<&IssueRecord> for IssueSummary {
    fn from(record: &IssueRecord) -> Self {
        Self {
            key: record.key.clone(),
            summary: record.summary.clone(),
            issue_type: record.issue_type.name.clone(),
            status: record.status.name.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct SearchResponse {
    pub success: bool,
    pub issues: Vec<IssueSummary>,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub formats: BTreeMap<&'static str, bool>,
}

#[derive(Serialize, Debug, Clone)]
pub struct FormatInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub extension: String,
    pub available: bool,
    pub description: &'static str,
}

impl From<ExportFormat> for FormatInfo {
    fn from(format: ExportFormat) -> Self {
        Self {
            id: format.id(),
            name: format.display_name(),
            extension: format!(".{}", format.extension()),
            available: true,
            description: format.description(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct FormatsResponse {
    pub formats: Vec<FormatInfo>,
}
