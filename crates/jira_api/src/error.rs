//! Failures surfaced by `JiraClient` calls.

use std::io;

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, JiraError>;

/// Why a Jira call failed. `Http` and `Authentication` keep the status Jira answered with.
#[derive(Debug, Error)]
pub enum JiraError {
    #[error("jira answered {status}: {message}")]
    Http {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
    #[error("credentials rejected: {message}")]
    Authentication {
        status: Option<StatusCode>,
        message: String,
    },
    #[error("jira did not answer in time: {0}")]
    Timeout(String),
    #[error("could not reach jira: {0}")]
    Network(String),
    #[error("malformed jira payload: {0}")]
    Serialization(String),
    #[error("local io failed: {0}")]
    Io(#[from] io::Error),
    #[error("jira client failure: {0}")]
    Other(String),
}

impl JiraError {
    /// Non-2xx answer; `code` is the first `errorMessages` entry when Jira sent one.
    pub fn http(status: StatusCode, code: Option<String>, message: impl Into<String>) -> Self {
        JiraError::Http {
            status,
            code,
            message: message.into(),
        }
    }

    /// Credentials rejected before or without a service answer.
    pub fn authentication(message: impl Into<String>) -> Self {
        JiraError::Authentication {
            status: None,
            message: message.into(),
        }
    }

    /// HTTP status behind this error, when the service answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            JiraError::Http { status, .. } => Some(*status),
            JiraError::Authentication { status, .. } => *status,
            _ => None,
        }
    }
}

/// Timeouts and refused connections get their own variants so callers can explain them.
impl From<reqwest::Error> for JiraError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            JiraError::Timeout(err.to_string())
        } else if err.is_status() {
            let status = err.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            JiraError::Http {
                status,
                code: None,
                message: err.to_string(),
            }
        } else if err.is_connect() {
            JiraError::Network(err.to_string())
        } else if err.is_decode() {
            JiraError::Serialization(err.to_string())
        } else {
            JiraError::Other(err.to_string())
        }
    }
}

impl From<serde_json::Error> for JiraError {
    fn from(err: serde_json::Error) -> Self {
        JiraError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::JiraError;
    use reqwest::StatusCode;

    #[test]
    fn http_error_exposes_status() {
        let err = JiraError::http(StatusCode::NOT_FOUND, None, "Issue does not exist");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "jira answered 404 Not Found: Issue does not exist");
    }

    #[test]
    fn non_http_errors_have_no_status() {
        assert!(JiraError::Timeout("slow".into()).status().is_none());
        assert!(JiraError::authentication("nope").status().is_none());
    }

    #[test]
    fn serde_errors_become_serialization_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(JiraError::from(err), JiraError::Serialization(_)));
    }
}
