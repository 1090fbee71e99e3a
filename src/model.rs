// ABOUTME: Serde data models for Yuque API responses
// ABOUTME: Tolerant parsing with optional fields and RFC 3339 timestamps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every Yuque endpoint wraps its payload in a `data` field.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub namespace: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryHandle {
    #[serde(rename = "id")]
    pub remote_id: u64,
    pub slug: String,
    #[serde(default)]
    pub name: String,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    #[serde(rename = "id")]
    pub remote_id: u64,
    #[serde(default)]
    pub title: String,
    pub slug: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub content_updated_at: Option<DateTime<Utc>>,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContent {
    #[serde(rename = "id")]
    pub remote_id: u64,
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Raw markdown. Yuque returns `null` for non-markdown document types.
    #[serde(default)]
    pub body: Option<String>,
}

impl DocumentContent {
    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub original_url: String,
    pub local_filename: String,
}

/// Leading metadata block read by static-site generators such as Docusaurus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frontmatter {
    pub title: String,
    pub description: String,
    pub doc_id: u64,
}
