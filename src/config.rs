//! Runtime settings from the environment and persisted export defaults.

use crate::error::{ExportError, Result};
use crate::render::ExportFormat;
use jira_api::JiraConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "exports";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Connection settings and output location, resolved from `.env` and the process environment.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    pub jira_url: String,
    pub email: String,
    pub api_token: String,
    pub project_key: Option<String>,
    pub output_dir: PathBuf,
    pub port: u16,
}

impl Settings {
    /// Loads `.env` (when present) and reads the `JIRA_*` variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            jira_url: read("JIRA_URL").unwrap_or_default(),
            email: read("JIRA_EMAIL").unwrap_or_default(),
            api_token: read("JIRA_API_TOKEN").unwrap_or_default(),
            project_key: read("JIRA_PROJECT_KEY"),
            output_dir: read("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            port: read("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        }
    }

    /// Replaces credentials with the non-empty values supplied by a caller.
    pub fn with_overrides(
        mut self,
        jira_url: Option<&str>,
        email: Option<&str>,
        api_token: Option<&str>,
    ) -> Self {
        let pick = |value: Option<&str>| value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);
        if let Some(url) = pick(jira_url) {
            self.jira_url = url;
        }
        if let Some(email) = pick(email) {
            self.email = email;
        }
        if let Some(token) = pick(api_token) {
            self.api_token = token;
        }
        self
    }

    /// Names of the credential variables that are still empty.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.jira_url.is_empty() {
            missing.push("JIRA_URL");
        }
        if self.email.is_empty() {
            missing.push("JIRA_EMAIL");
        }
        if self.api_token.is_empty() {
            missing.push("JIRA_API_TOKEN");
        }
        missing
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ExportError::Config(format!(
                "missing Jira credentials: {}",
                missing.join(", ")
            )))
        }
    }

    /// Client configuration for these credentials; fails before any network call when incomplete.
    pub fn jira_config(&self) -> Result<JiraConfig> {
        self.validate()?;
        Ok(JiraConfig::new(
            self.jira_url.clone(),
            self.email.clone(),
            self.api_token.clone(),
        ))
    }
}

fn default_format() -> String {
    ExportFormat::Pdf.id().to_string()
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_download_attachments() -> bool {
    true
}

/// Non-secret export defaults persisted as JSON in the platform config directory.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub output_dir: Option<String>,
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_download_attachments")]
    pub download_attachments: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: None,
            default_format: default_format(),
            max_results: default_max_results(),
            download_attachments: default_download_attachments(),
        }
    }
}

impl Config {
    /// Configured default format, falling back to PDF when the stored id is unknown.
    pub fn format(&self) -> ExportFormat {
        ExportFormat::parse(&self.default_format).unwrap_or(ExportFormat::Pdf)
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Manager bound to the platform config path, or `None` when no home directory is known.
    pub fn new() -> Option<Self> {
        let dirs = directories::ProjectDirs::from("io", "jira-export", "jira-export")?;
        Some(Self {
            path: dirs.config_dir().join("config.json"),
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads config from disk, falling back to defaults on read/parse errors.
    pub fn load(&self) -> Config {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                log::warn!("ignoring invalid config {}: {}", self.path.display(), err);
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }

    pub fn save(&self, config: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigManager, Settings, DEFAULT_PORT};
    use crate::render::ExportFormat;
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    fn settings_from(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let settings = settings_from(&[]);
        assert_eq!(settings.output_dir, PathBuf::from("exports"));
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(
            settings.missing(),
            vec!["JIRA_URL", "JIRA_EMAIL", "JIRA_API_TOKEN"]
        );
        assert!(settings.validate().is_err());
    }

    #[test]
    fn overrides_replace_only_supplied_values() {
        let settings = settings_from(&[
            ("JIRA_URL", "https://acme.atlassian.net"),
            ("JIRA_EMAIL", "env@acme.io"),
            ("JIRA_API_TOKEN", "env-token"),
            ("PORT", "8080"),
        ])
        .with_overrides(None, Some("req@acme.io"), Some("  "));

        assert_eq!(settings.email, "req@acme.io");
        assert_eq!(settings.api_token, "env-token");
        assert_eq!(settings.port, 8080);
        let config = settings.jira_config().unwrap();
        assert_eq!(config.api_root(), "https://acme.atlassian.net/rest/api/3/");
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::at(dir.path().join("config.json"));
        let config = manager.load();
        assert_eq!(config.format(), ExportFormat::Pdf);
        assert_eq!(config.max_results, 100);
        assert!(config.download_attachments);
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::at(dir.path().join("nested/config.json"));
        let config = Config {
            output_dir: Some("out".to_string()),
            default_format: "md".to_string(),
            max_results: 25,
            download_attachments: false,
        };
        manager.save(&config).unwrap();

        let loaded = manager.load();
        assert_eq!(loaded.output_dir.as_deref(), Some("out"));
        assert_eq!(loaded.format(), ExportFormat::Markdown);
        assert_eq!(loaded.max_results, 25);
        assert!(!loaded.download_attachments);
    }

    #[test]
    fn invalid_json_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not-valid-json").unwrap();
        let loaded = ConfigManager::at(path).load();
        assert_eq!(loaded.default_format, "pdf");
    }
}
