//! Typed Jira Cloud REST client used by the exporter.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use auth::verify_credentials;
pub use client::{BinaryContent, JiraClient, SEARCH_PAGE_SIZE};
pub use config::JiraConfig;
pub use error::{JiraError, Result};
pub use models::{
    Attachment, Comment, CommentPage, FieldDefinition, IssueLink, IssueLinkType, IssueRef,
    IssueRefFields, NamedEntity, RawIssue, SearchPage, UserProfile,
};
