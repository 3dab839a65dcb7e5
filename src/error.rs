//! Error taxonomy for the export pipeline.

use jira_api::JiraError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io;
use thiserror::Error;

/// Failures raised while writing a document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("pdf error: {0}")]
    Pdf(String),
    #[error("docx error: {0}")]
    Docx(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{context}: {source}")]
    Fetch {
        context: String,
        #[source]
        source: JiraError,
    },
    #[error("{0}")]
    Render(#[from] RenderError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("task failed: {0}")]
    Task(String),
}

impl ExportError {
    pub fn fetch(context: impl Into<String>, source: JiraError) -> Self {
        ExportError::Fetch {
            context: context.into(),
            source,
        }
    }

    /// Message safe to log or return to clients: credentials never leak.
    pub fn redacted(&self) -> String {
        redact(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;

static AUTH_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(basic|bearer)\s+[A-Za-z0-9+/=._-]{8,}").expect("invalid auth header regex")
});
static TOKEN_PARAM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(api_token|token|password)=([^&\s]+)").expect("invalid token param regex")
});

/// Masks basic-auth headers and `token=` style parameters in free text.
pub fn redact(message: &str) -> String {
    let text = AUTH_HEADER_REGEX.replace_all(message, "$1 ***");
    TOKEN_PARAM_REGEX.replace_all(&text, "$1=***").into_owned()
}

#[cfg(test)]
mod tests {
    use super::{redact, ExportError};
    use jira_api::JiraError;

    #[test]
    fn fetch_error_names_context() {
        let err = ExportError::fetch("PROJ-9", JiraError::Other("status 404".into()));
        assert_eq!(err.to_string(), "PROJ-9: jira client failure: status 404");
    }

    #[test]
    fn redact_masks_credentials() {
        let text = redact("header Basic bWVAYWNtZS5pbzpzZWNyZXQ= and api_token=abc123&x=1");
        assert!(!text.contains("bWVAYWNtZS5pbzpzZWNyZXQ="));
        assert!(!text.contains("abc123"));
        assert!(text.contains("Basic ***"));
        assert!(text.contains("api_token=***"));
    }
}
