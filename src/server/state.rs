//! Shared state for the HTTP handlers.

use crate::bridge::CredentialsPayload;
use crate::config::Settings;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Cloned into every handler. Cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    settings: Arc<Settings>,
    staging: Arc<TempDir>,
}

impl AppState {
    /// Creates the staging directory that lives as long as the process.
    pub fn new(settings: Settings) -> io::Result<Self> {
        let staging = tempfile::Builder::new().prefix("jira-export-").tempdir()?;
        log::debug!("staging exports under {}", staging.path().display());
        Ok(Self {
            settings: Arc::new(settings),
            staging: Arc::new(staging),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Environment settings with any non-empty request credentials layered on top.
    pub fn settings_for(&self, credentials: &CredentialsPayload) -> Settings {
        (*self.settings).clone().with_overrides(
            credentials.jira_url.as_deref(),
            credentials.email.as_deref(),
            credentials.api_token.as_deref(),
        )
    }

    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }

    /// Private working directory for one request, removed when dropped.
    pub fn request_dir(&self) -> io::Result<TempDir> {
        tempfile::Builder::new()
            .prefix("request-")
            .tempdir_in(self.staging_dir())
    }
}
