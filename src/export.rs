//! Fetch, normalize and render pipeline for single issues, key batches and JQL queries.

use crate::config::Settings;
use crate::error::{ExportError, Result};
use crate::normalize::{normalize_issue, FieldCatalog};
use crate::record::IssueRecord;
use crate::render::markdown::write_index;
use crate::render::{renderer_for, ExportFormat, LocalAttachments};
use jira_api::{JiraClient, RawIssue};
use serde::Serialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::sync::OnceCell;
use tokio::task;

pub const ATTACHMENTS_DIR: &str = "attachments";

/// `project = KEY [AND issuetype = "T"] ORDER BY key DESC`
pub fn project_jql(project_key: &str, issue_type: Option<&str>) -> String {
    let mut jql = format!("project = {}", project_key.trim());
    if let Some(issue_type) = issue_type.map(str::trim).filter(|t| !t.is_empty()) {
        jql.push_str(&format!(" AND issuetype = \"{}\"", issue_type.replace('"', "\\\"")));
    }
    jql.push_str(" ORDER BY key DESC");
    jql
}

/// File-system safe version of an attachment name.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').trim().to_string();
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned
    }
}

/// Fetches issues and resolves field names once per instance.
pub struct IssueFetcher {
    client: JiraClient,
    catalog: OnceCell<FieldCatalog>,
}

impl IssueFetcher {
    pub fn new(client: JiraClient) -> Self {
        Self {
            client,
            catalog: OnceCell::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = JiraClient::new(settings.jira_config()?)
            .map_err(|err| ExportError::fetch("client setup", err))?;
        Ok(Self::new(client))
    }

    /// Site field catalog; falls back to the names embedded in `raw` when the field list is unavailable.
    async fn catalog_for<'a>(&'a self, raw: &RawIssue) -> Cow<'a, FieldCatalog> {
        let loaded = self
            .catalog
            .get_or_try_init(|| async {
                let definitions = self.client.get_fields().await?;
                log::debug!("loaded {} field definitions", definitions.len());
                Ok::<_, jira_api::JiraError>(FieldCatalog::new(&definitions))
            })
            .await;
        match loaded {
            Ok(catalog) => Cow::Borrowed(catalog),
            Err(err) => {
                log::warn!("field catalog unavailable, using issue names: {}", err);
                Cow::Owned(FieldCatalog::from_issue_names(raw))
            }
        }
    }

    pub async fn normalize(&self, raw: &RawIssue) -> IssueRecord {
        let catalog = self.catalog_for(raw).await;
        normalize_issue(raw, &catalog)
    }

    pub async fn fetch_issue(&self, key: &str) -> Result<IssueRecord> {
        let raw = self
            .client
            .get_issue(key)
            .await
            .map_err(|err| ExportError::fetch(key, err))?;
        Ok(self.normalize(&raw).await)
    }

    pub async fn search(&self, jql: &str, cap: usize) -> Result<Vec<IssueRecord>> {
        let raw_issues = self
            .client
            .search_issues(jql, cap)
            .await
            .map_err(|err| ExportError::fetch(format!("query `{}`", jql), err))?;
        let mut records = Vec::with_capacity(raw_issues.len());
        for raw in &raw_issues {
            records.push(self.normalize(raw).await);
        }
        Ok(records)
    }

    /// Downloads every attachment of `record` into `dir`, one by one. Failures are logged and skipped.
    pub async fn download_attachments(&self, record: &IssueRecord, dir: &Path) -> LocalAttachments {
        let mut local = LocalAttachments::new();
        if record.attachments.is_empty() {
            return local;
        }
        if let Err(err) = async_fs::create_dir_all(dir).await {
            log::warn!("{}: cannot create {}: {}", record.key, dir.display(), err);
            return local;
        }
        for att in &record.attachments {
            let Some(url) = att.content_url.as_deref() else {
                continue;
            };
            let target = dir.join(sanitize_filename(&att.filename));
            match self.client.fetch_binary(url).await {
                Ok(content) => match async_fs::write(&target, &content.bytes).await {
                    Ok(()) => local.insert(att.filename.clone(), target),
                    Err(err) => log::warn!("{}: cannot save {}: {}", record.key, att.filename, err),
                },
                Err(err) => log::warn!("{}: cannot download {}: {}", record.key, att.filename, err),
            }
        }
        log::debug!(
            "{}: downloaded {}/{} attachments",
            record.key,
            local.len(),
            record.attachments.len()
        );
        local
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub out_dir: PathBuf,
    pub download_attachments: bool,
    pub write_index: bool,
}

impl ExportOptions {
    pub fn new(format: ExportFormat, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            format,
            out_dir: out_dir.into(),
            download_attachments: true,
            write_index: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedFile {
    pub issue_key: String,
    pub path: PathBuf,
    pub format: ExportFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueFailure {
    pub issue_key: String,
    pub error: String,
}

/// Outcome of a batch: per-issue files and errors, never aborted by a single issue.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<ExportedFile>,
    pub errors: Vec<IssueFailure>,
    pub total: usize,
    pub exported: usize,
    pub failed: usize,
    pub index: Option<PathBuf>,
}

impl BatchReport {
    fn record_success(&mut self, file: ExportedFile) {
        self.exported += 1;
        self.files.push(file);
    }

    fn record_failure(&mut self, issue_key: &str, err: &ExportError) {
        log::warn!("{}: export failed: {}", issue_key, err.redacted());
        self.failed += 1;
        self.errors.push(IssueFailure {
            issue_key: issue_key.to_string(),
            error: err.redacted(),
        });
    }
}

pub struct Exporter {
    fetcher: IssueFetcher,
    options: ExportOptions,
}

impl Exporter {
    pub fn new(fetcher: IssueFetcher, options: ExportOptions) -> Self {
        Self { fetcher, options }
    }

    /// Downloads attachments and renders one already-fetched record.
    pub async fn render_record(&self, record: &IssueRecord) -> Result<ExportedFile> {
        let attachments = if self.options.download_attachments {
            let dir = self
                .options
                .out_dir
                .join(ATTACHMENTS_DIR)
                .join(sanitize_filename(&record.key));
            self.fetcher.download_attachments(record, &dir).await
        } else {
            LocalAttachments::new()
        };

        let format = self.options.format;
        let out_dir = self.options.out_dir.clone();
        let owned = record.clone();
        let path = task::spawn_blocking(move || {
            renderer_for(format).render(&owned, &attachments, &out_dir)
        })
        .await
        .map_err(|err| ExportError::Task(err.to_string()))??;

        log::info!("{}: wrote {}", record.key, path.display());
        Ok(ExportedFile {
            issue_key: record.key.clone(),
            path,
            format,
        })
    }

    /// Single-issue export; the first error aborts.
    pub async fn export_issue(&self, key: &str) -> Result<ExportedFile> {
        let record = self.fetcher.fetch_issue(key).await?;
        self.render_record(&record).await
    }

    /// Exports keys in order; a failing key is reported and the batch continues.
    pub async fn export_batch(&self, keys: &[String]) -> BatchReport {
        let mut report = BatchReport {
            total: keys.len(),
            ..Default::default()
        };
        let mut records = Vec::new();
        for key in keys {
            let key = key.trim();
            let outcome = match self.fetcher.fetch_issue(key).await {
                Ok(record) => {
                    let rendered = self.render_record(&record).await;
                    records.push(record);
                    rendered
                }
                Err(err) => Err(err),
            };
            match outcome {
                Ok(file) => report.record_success(file),
                Err(err) => report.record_failure(key, &err),
            }
        }
        self.finish(&mut report, &records).await;
        report
    }

    /// Runs the query and exports every match. A failing search aborts; failing issues do not.
    pub async fn export_query(&self, jql: &str, cap: usize) -> Result<BatchReport> {
        let records = self.fetcher.search(jql, cap).await?;
        log::info!("query matched {} issues", records.len());
        let mut report = BatchReport {
            total: records.len(),
            ..Default::default()
        };
        for record in &records {
            match self.render_record(record).await {
                Ok(file) => report.record_success(file),
                Err(err) => report.record_failure(&record.key, &err),
            }
        }
        self.finish(&mut report, &records).await;
        Ok(report)
    }

    async fn finish(&self, report: &mut BatchReport, records: &[IssueRecord]) {
        if !self.options.write_index || records.is_empty() {
            return;
        }
        let records = records.to_vec();
        let out_dir = self.options.out_dir.clone();
        match task::spawn_blocking(move || write_index(&records, &out_dir)).await {
            Ok(Ok(path)) => report.index = Some(path),
            Ok(Err(err)) => log::warn!("could not write index: {}", err),
            Err(err) => log::warn!("index task failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{project_jql, sanitize_filename, ExportOptions, Exporter, IssueFetcher};
    use crate::render::ExportFormat;
    use jira_api::{JiraClient, JiraConfig};
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    fn exporter(server: &ServerGuard, out: &std::path::Path, format: ExportFormat) -> Exporter {
        let client = JiraClient::new(JiraConfig::new(server.url(), "me@acme.io", "t")).unwrap();
        Exporter::new(IssueFetcher::new(client), ExportOptions::new(format, out))
    }

    async fn mock_fields(server: &mut ServerGuard) {
        server
            .mock("GET", "/rest/api/3/field")
            .with_status(200)
            .with_body(
                json!([{"id": "customfield_1", "name": "QA Tester", "custom": true}]).to_string(),
            )
            .create_async()
            .await;
    }

    async fn mock_issue(server: &mut ServerGuard, key: &str) {
        server
            .mock("GET", format!("/rest/api/3/issue/{}", key).as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "id": "1",
                    "key": key,
                    "fields": {
                        "summary": format!("Summary of {}", key),
                        "status": {"name": "Open"},
                        "customfield_1": {"displayName": "QA Team"}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
    }

    #[test]
    fn project_query_with_and_without_type() {
        assert_eq!(project_jql("PROJ", None), "project = PROJ ORDER BY key DESC");
        assert_eq!(
            project_jql("PROJ", Some("Story")),
            "project = PROJ AND issuetype = \"Story\" ORDER BY key DESC"
        );
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename("../etc/passwd"), "_etc_passwd");
        assert_eq!(sanitize_filename("screen shot.png"), "screen shot.png");
        assert_eq!(sanitize_filename("   "), "attachment");
    }

    #[tokio::test]
    async fn batch_continues_past_failing_key() {
        let mut server = Server::new_async().await;
        mock_fields(&mut server).await;
        mock_issue(&mut server, "PROJ-1").await;
        mock_issue(&mut server, "PROJ-2").await;
        server
            .mock("GET", "/rest/api/3/issue/PROJ-404")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"errorMessages":["Issue does not exist"]}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter(&server, dir.path(), ExportFormat::Markdown);
        let keys = vec!["PROJ-1".to_string(), "PROJ-404".to_string(), "PROJ-2".to_string()];
        let report = exporter.export_batch(&keys).await;

        assert_eq!(report.total, 3);
        assert_eq!(report.exported, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].issue_key, "PROJ-404");
        assert!(report.errors[0].error.contains("PROJ-404"));
        let written = std::fs::read_to_string(dir.path().join("PROJ-1.md")).unwrap();
        assert!(written.contains("### QA Tester\n\nQA Team"));
    }

    #[tokio::test]
    async fn empty_query_produces_empty_report() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/search/jql")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"issues": [], "isLast": true}).to_string())
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut exporter = exporter(&server, dir.path(), ExportFormat::Pdf);
        exporter.options.write_index = true;
        let report = exporter.export_query("project = NONE", 50).await.unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.exported, 0);
        assert_eq!(report.failed, 0);
        assert!(report.index.is_none());
    }

    #[tokio::test]
    async fn attachments_are_staged_per_issue() {
        let mut server = Server::new_async().await;
        mock_fields(&mut server).await;
        let content_url = format!("{}/rest/api/3/attachment/content/10", server.url());
        server
            .mock("GET", "/rest/api/3/issue/PROJ-7")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "key": "PROJ-7",
                    "fields": {
                        "summary": "With files",
                        "attachment": [
                            {"id": "10", "filename": "notes.txt", "size": 5, "content": content_url},
                            {"id": "11", "filename": "gone.txt", "size": 5,
                             "content": format!("{}/rest/api/3/attachment/content/11", server.url())}
                        ]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/rest/api/3/attachment/content/10")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;
        server
            .mock("GET", "/rest/api/3/attachment/content/11")
            .with_status(500)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter(&server, dir.path(), ExportFormat::Markdown);
        let file = exporter.export_issue("PROJ-7").await.unwrap();
        assert_eq!(file.path, dir.path().join("PROJ-7.md"));
        let staged = dir.path().join("attachments/PROJ-7/notes.txt");
        assert_eq!(std::fs::read_to_string(staged).unwrap(), "hello");
        assert!(!dir.path().join("attachments/PROJ-7/gone.txt").exists());
    }

    #[tokio::test]
    async fn single_issue_failure_propagates() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/issue/PROJ-9")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter(&server, dir.path(), ExportFormat::Markdown);
        let err = exporter.export_issue("PROJ-9").await.unwrap_err();
        assert!(err.to_string().starts_with("PROJ-9: credentials rejected"));
    }
}
