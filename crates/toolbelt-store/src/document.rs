//! Document store seam shared by the Firestore client and the in-memory store.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A decoded remote document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Last path segment.
    pub id: String,
    /// Path below the database's documents root,
    /// e.g. `tenants/acme/organizations/hierarchy/nodes/n1`.
    pub path: String,
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl Document {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let id = path.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            id,
            path,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// The field as a string, if present and a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }
}

/// One pending single-field write. The document must already exist; only
/// `field` is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub path: String,
    pub field: String,
    pub value: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("firestore returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("cannot read credentials '{}': {source}", .path.display())]
    Credentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid service account key: {0}")]
    Key(String),
    #[error("token signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("token exchange failed: {0}")]
    Auth(String),
    #[error("commit rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Config(#[from] toolbelt_core::config::ConfigError),
}

/// Read access to a collection plus batched single-field writes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document directly under `collection`.
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Apply `writes` atomically as one batch.
    async fn commit(&self, writes: &[FieldUpdate]) -> Result<(), StoreError>;
}
