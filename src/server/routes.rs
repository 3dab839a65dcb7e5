//! Route handlers for the export service.

use super::AppState;
use crate::bridge::{
    CredentialsPayload, CredentialsResponse, ErrorResponse, ExportRequest, ExportResponse,
    FailurePayload, FilePayload, FormatInfo, FormatsResponse, HealthResponse, IssueSummary,
    SearchRequest, SearchResponse, SingleExportQuery, SingleExportResponse,
};
use crate::config::Settings;
use crate::error::{redact, ExportError};
use crate::export::{ExportOptions, Exporter, IssueFetcher};
use crate::render::ExportFormat;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use jira_api::{verify_credentials, JiraConfig, JiraError};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

pub const SEARCH_RESULT_LIMIT: usize = 100;
const DEFAULT_SEARCH_RESULTS: usize = 50;
const CREDENTIAL_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Error answer: a status code and a `{success: false, error}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        let status = match &err {
            ExportError::Config(_) | ExportError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            ExportError::Fetch { source, .. } => match source.status().map(|s| s.as_u16()) {
                Some(404) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.redacted())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal(format!("file staging failed: {}", err))
    }
}

fn parse_format(value: Option<&str>) -> Result<ExportFormat, ApiError> {
    let value = value.unwrap_or(ExportFormat::Pdf.id());
    ExportFormat::parse(value).ok_or_else(|| {
        let valid: Vec<&str> = ExportFormat::ALL.iter().map(|f| f.id()).collect();
        ApiError::bad_request(format!(
            "Invalid format '{}'. Use one of: {}",
            value,
            valid.join(", ")
        ))
    })
}

fn exporter_for(settings: &Settings, format: ExportFormat, dir: &Path) -> Result<Exporter, ApiError> {
    let fetcher = IssueFetcher::from_settings(settings)?;
    Ok(Exporter::new(fetcher, ExportOptions::new(format, dir)))
}

/// Reads a rendered file into memory and removes it from the staging area.
async fn read_back(path: &Path) -> std::io::Result<Vec<u8>> {
    let bytes = fs::read(path).await?;
    if let Err(err) = fs::remove_file(path).await {
        log::debug!("could not remove {}: {}", path.display(), err);
    }
    Ok(bytes)
}

fn file_name(issue_key: &str, format: ExportFormat) -> String {
    format!("{}.{}", issue_key, format.extension())
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "Jira Export Server",
        version: env!("CARGO_PKG_VERSION"),
        formats: ExportFormat::ALL.iter().map(|f| (f.id(), true)).collect(),
    })
}

/// GET /api/formats
pub async fn list_formats() -> Json<FormatsResponse> {
    Json(FormatsResponse {
        formats: ExportFormat::ALL.into_iter().map(FormatInfo::from).collect(),
    })
}

/// POST /api/test-credentials
pub async fn test_credentials(
    payload: Result<Json<CredentialsPayload>, JsonRejection>,
) -> Result<Json<CredentialsResponse>, ApiError> {
    let Json(payload) = payload?;
    let field = |value: &Option<String>| value.as_deref().map(str::trim).unwrap_or("").to_string();
    let (jira_url, email, api_token) = (
        field(&payload.jira_url),
        field(&payload.email),
        field(&payload.api_token),
    );
    if jira_url.is_empty() || email.is_empty() || api_token.is_empty() {
        return Err(ApiError::new(StatusCode::OK, "All fields are required"));
    }

    let config = JiraConfig::new(jira_url, email.clone(), api_token)
        .with_timeout(CREDENTIAL_CHECK_TIMEOUT);
    let site_name = config.site_name();
    match verify_credentials(config).await {
        Ok(profile) => Ok(Json(CredentialsResponse {
            success: true,
            site_name,
            user: profile.display_name.unwrap_or(email),
        })),
        Err(err) => {
            log::info!("credential check failed: {}", redact(&err.to_string()));
            Err(ApiError::new(StatusCode::OK, credential_failure(&err)))
        }
    }
}

/// User-facing explanation of a failed credential check.
fn credential_failure(err: &JiraError) -> String {
    match err {
        JiraError::Authentication { status, .. } => match status.map(|s| s.as_u16()) {
            Some(403) => "Access denied. Check your permissions.".to_string(),
            _ => "Invalid email or API token".to_string(),
        },
        JiraError::Http { status, .. } => format!("Could not connect (HTTP {})", status.as_u16()),
        JiraError::Timeout(_) => "Timeout - check the URL".to_string(),
        JiraError::Network(_) => "Could not connect - check the URL".to_string(),
        other => redact(&other.to_string()),
    }
}

/// POST /api/search
pub async fn search_issues(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = payload?;
    let settings = state.settings_for(&request.credentials);
    if !settings.missing().is_empty() {
        return Err(ApiError::bad_request("Missing Jira credentials"));
    }

    let issues: Vec<IssueSummary> = if let Some(keys) = request.issue_keys {
        let fetcher = IssueFetcher::from_settings(&settings)?;
        let mut found = Vec::new();
        for key in keys.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
            match fetcher.fetch_issue(key).await {
                Ok(record) => found.push(IssueSummary::from(&record)),
                Err(err) => log::debug!("search skipped {}: {}", key, err.redacted()),
            }
        }
        found
    } else if let Some(jql) = request.jql.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let cap = request
            .max_results
            .unwrap_or(DEFAULT_SEARCH_RESULTS)
            .min(SEARCH_RESULT_LIMIT);
        let fetcher = IssueFetcher::from_settings(&settings)?;
        let records = fetcher.search(jql, cap).await.map_err(|err| {
            ApiError::new(
                StatusCode::BAD_GATEWAY,
                format!("JQL search failed: {}", err.redacted()),
            )
        })?;
        records.iter().map(IssueSummary::from).collect()
    } else {
        return Err(ApiError::bad_request("Provide issue_keys or jql"));
    };

    Ok(Json(SearchResponse {
        success: true,
        count: issues.len(),
        issues,
    }))
}

/// POST /api/export
pub async fn export_issues(
    State(state): State<AppState>,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Json<ExportResponse>, ApiError> {
    let Json(request) = payload?;
    let keys: Vec<String> = request
        .issue_keys
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if keys.is_empty() {
        return Err(ApiError::bad_request("No issue_keys provided"));
    }

    let settings = state.settings_for(&request.credentials);
    let missing = settings.missing();
    if !missing.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Missing Jira credentials. Configure {}",
            missing.join(", ")
        )));
    }
    let format = parse_format(request.format.as_deref())?;

    let workdir = state.request_dir()?;
    let exporter = exporter_for(&settings, format, workdir.path())?;
    let report = exporter.export_batch(&keys).await;

    let mut errors: Vec<FailurePayload> = report
        .errors
        .into_iter()
        .map(|failure| FailurePayload {
            issue_key: failure.issue_key,
            error: failure.error,
        })
        .collect();
    let mut files = Vec::with_capacity(report.files.len());
    for file in report.files {
        match read_back(&file.path).await {
            Ok(bytes) => {
                let file_base64 = BASE64.encode(bytes);
                files.push(FilePayload {
                    filename: file_name(&file.issue_key, format),
                    size: file_base64.len(),
                    issue_key: file.issue_key,
                    file_base64,
                    format,
                });
            }
            Err(err) => errors.push(FailurePayload {
                issue_key: file.issue_key,
                error: format!("could not read rendered file: {}", err),
            }),
        }
    }

    Ok(Json(ExportResponse {
        success: true,
        total: report.total,
        exported: files.len(),
        failed: errors.len(),
        files,
        errors,
        format,
    }))
}

/// GET /api/export/single/:issue_key
pub async fn export_single(
    State(state): State<AppState>,
    UrlPath(issue_key): UrlPath<String>,
    Query(query): Query<SingleExportQuery>,
) -> Result<Response, ApiError> {
    let issue_key = issue_key.trim().to_string();
    let format = parse_format(query.format.as_deref())?;
    let settings = state.settings();
    if !settings.missing().is_empty() {
        return Err(ApiError::internal("Server not configured with Jira credentials"));
    }

    let workdir = state.request_dir()?;
    let exporter = exporter_for(settings, format, workdir.path())?;
    let exported = exporter.export_issue(&issue_key).await?;
    let bytes = read_back(&exported.path).await?;
    let filename = file_name(&issue_key, format);

    if query.wants_download() {
        let headers = [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ];
        return Ok((headers, bytes).into_response());
    }

    Ok(Json(SingleExportResponse {
        success: true,
        issue_key,
        filename,
        file_base64: BASE64.encode(bytes),
        format,
    })
    .into_response())
}
