//! Form payloads and their validation into store records.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::{
    CertificateInput, CommentInput, ContactMessageInput, Project, ProjectInput,
};

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles");
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Strip unsafe markup from visitor-supplied text.
fn sanitize(text: &str) -> String {
    ammonia::clean(text)
}

/// Split a comma-separated tag field into an ordered list: entries are
/// trimmed, empty entries dropped, and repeats keep their first position.
pub fn parse_tags(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(','))
}

fn normalize_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags.into_iter().map(str::trim).filter(|t| !t.is_empty()) {
        if !out.iter().any(|seen| seen == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Render tags back into the editable field.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(", ")
}

/// The tag field arrives either as typed text or as an untouched list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagsField {
    Text(String),
    List(Vec<String>),
}

impl Default for TagsField {
    fn default() -> Self {
        TagsField::Text(String::new())
    }
}

impl TagsField {
    pub fn to_tags(&self) -> Vec<String> {
        match self {
            TagsField::Text(raw) => parse_tags(raw),
            TagsField::List(list) => normalize_tags(list.iter().map(String::as_str)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectForm {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub demo_url: String,
    pub github_url: String,
    pub tags: TagsField,
    pub featured: bool,
}

impl ProjectForm {
    /// Pre-fill the edit form from an existing project.
    pub fn from_project(project: &Project) -> Self {
        Self {
            title: project.title.clone(),
            description: project.description.clone(),
            image_url: project.image_url.clone().unwrap_or_default(),
            demo_url: project.demo_url.clone().unwrap_or_default(),
            github_url: project.github_url.clone().unwrap_or_default(),
            tags: TagsField::Text(join_tags(&project.tags)),
            featured: project.featured,
        }
    }

    pub fn validate(&self) -> Result<ProjectInput, ValidationError> {
        Ok(ProjectInput {
            title: required(&self.title, "title")?,
            description: required(&self.description, "description")?,
            image_url: optional(Some(&self.image_url)),
            demo_url: optional(Some(&self.demo_url)),
            github_url: optional(Some(&self.github_url)),
            tags: self.tags.to_tags(),
            featured: self.featured,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateForm {
    pub title: String,
    pub issuer: String,
    /// `YYYY-MM-DD`
    pub issue_date: String,
    pub credential_url: String,
    pub image_url: String,
}

impl CertificateForm {
    pub fn validate(&self) -> Result<CertificateInput, ValidationError> {
        let raw_date = required(&self.issue_date, "issue_date")?;
        let issue_date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d").map_err(|e| {
            ValidationError::Invalid {
                field: "issue_date",
                reason: e.to_string(),
            }
        })?;

        Ok(CertificateInput {
            title: required(&self.title, "title")?,
            issuer: required(&self.issuer, "issuer")?,
            issue_date,
            credential_url: optional(Some(&self.credential_url)),
            image_url: optional(Some(&self.image_url)),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<ContactMessageInput, ValidationError> {
        let name = required(&self.name, "name")?;
        let email = required(&self.email, "email")?;
        if !EMAIL_REGEX.is_match(&email) {
            return Err(ValidationError::Invalid {
                field: "email",
                reason: "not an e-mail address".to_string(),
            });
        }
        let message = required(&self.message, "message")?;

        Ok(ContactMessageInput {
            name: sanitize(&name),
            email,
            subject: optional(self.subject.as_deref()).map(|s| sanitize(&s)),
            message: sanitize(&message),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub name: String,
    pub photo_url: Option<String>,
    pub message: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<CommentInput, ValidationError> {
        Ok(CommentInput {
            name: sanitize(&required(&self.name, "name")?),
            photo_url: optional(self.photo_url.as_deref()),
            message: sanitize(&required(&self.message, "message")?),
        })
    }
}
