mod attachment;
mod comment;
mod entity;
mod issue;
mod user;

pub use attachment::Attachment;
pub use comment::{Comment, CommentPage};
pub use entity::{FieldDefinition, NamedEntity};
pub use issue::{IssueLink, IssueLinkType, IssueRef, IssueRefFields, RawIssue, SearchPage};
pub use user::UserProfile;
