//! In-process [`DocumentStore`] for tests and dry runs against fixtures.

use crate::document::{Document, DocumentStore, FieldUpdate, StoreError};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    docs: BTreeMap<String, Document>,
    commits: Vec<Vec<FieldUpdate>>,
    /// Zero-based commit attempts that fail.
    failing: BTreeSet<usize>,
    attempts: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(docs: impl IntoIterator<Item = Document>) -> Self {
        let inner = Inner {
            docs: docs.into_iter().map(|d| (d.path.clone(), d)).collect(),
            ..Inner::default()
        };
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub async fn insert(&self, doc: Document) {
        self.inner.lock().await.docs.insert(doc.path.clone(), doc);
    }

    /// Make the `attempt`-th commit (zero-based) fail without applying it.
    pub async fn fail_commit(&self, attempt: usize) {
        self.inner.lock().await.failing.insert(attempt);
    }

    /// Every successfully applied batch, in order.
    pub async fn commits(&self) -> Vec<Vec<FieldUpdate>> {
        self.inner.lock().await.commits.clone()
    }

    pub async fn get(&self, path: &str) -> Option<Document> {
        self.inner.lock().await.docs.get(path).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let prefix = format!("{}/", collection.trim_matches('/'));
        let inner = self.inner.lock().await;
        Ok(inner
            .docs
            .values()
            .filter(|d| {
                d.path
                    .strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .cloned()
            .collect())
    }

    async fn commit(&self, writes: &[FieldUpdate]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let attempt = inner.attempts;
        inner.attempts += 1;

        if inner.failing.contains(&attempt) {
            return Err(StoreError::Rejected(format!("injected failure on commit {attempt}")));
        }
        if let Some(missing) = writes.iter().find(|w| !inner.docs.contains_key(&w.path)) {
            return Err(StoreError::Rejected(format!("no document at {}", missing.path)));
        }

        for w in writes {
            if let Some(doc) = inner.docs.get_mut(&w.path) {
                doc.fields
                    .insert(w.field.clone(), serde_json::Value::String(w.value.clone()));
            }
        }
        inner.commits.push(writes.to_vec());
        Ok(())
    }
}
