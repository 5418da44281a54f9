//! Row types for the remote tables (wire names match the store's columns).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Opaque row identifier; the store hands out integers or UUID strings.
///
/// Remembers whether it arrived as a JSON number so it is written back in
/// the same form. Equality only looks at the text, so `1` and `"1"` match.
#[derive(Debug, Clone)]
pub struct RowId {
    text: String,
    numeric: bool,
}

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            text: id.into(),
            numeric: false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for RowId {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for RowId {}

impl Hash for RowId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<i64> for RowId {
    fn from(n: i64) -> Self {
        Self {
            text: n.to_string(),
            numeric: true,
        }
    }
}

impl Serialize for RowId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.text.parse::<i64>() {
            Ok(n) if self.numeric => serializer.serialize_i64(n),
            _ => serializer.serialize_str(&self.text),
        }
    }
}

impl<'de> Deserialize<'de> for RowId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => RowId::from(n),
            Raw::Str(s) => RowId::new(s),
        })
    }
}

/// Table names in the remote store.
pub mod tables {
    pub const PROJECTS: &str = "projects";
    pub const CERTIFICATES: &str = "certificates";
    pub const CONTACT_MESSAGES: &str = "contact_messages";
    pub const COMMENTS: &str = "comments";
}

/// Portfolio project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: RowId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub demo_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    pub created_at: DateTime<Utc>,
}

/// Project fields as written by the dashboard (insert or full update).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInput {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub demo_url: Option<String>,
    pub github_url: Option<String>,
    pub tags: Vec<String>,
    pub featured: bool,
}

/// Certificate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: RowId,
    pub title: String,
    pub issuer: String,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub credential_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateInput {
    pub title: String,
    pub issuer: String,
    pub issue_date: NaiveDate,
    pub credential_url: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Unread,
    Read,
}

/// Visitor message from the contact form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: RowId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    #[serde(default)]
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMessageInput {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

/// Visitor comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: RowId,
    pub name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub message: String,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentInput {
    pub name: String,
    pub photo_url: Option<String>,
    pub message: String,
}

/// Sort comments pinned-first, then newest first.
pub fn sort_comments(comments: &mut [Comment]) {
    comments.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

/// One row of the `verify_admin_login` RPC result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminLoginRow {
    pub success: bool,
    #[serde(default)]
    pub admin_id: Option<RowId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}
