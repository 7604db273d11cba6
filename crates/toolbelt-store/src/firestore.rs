//! Firestore REST v1 client.

use crate::auth::TokenSource;
use crate::document::{Document, DocumentStore, FieldUpdate, StoreError};
use crate::value::{decode_fields, encode_string};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const PAGE_SIZE: usize = 300;

pub struct FirestoreClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    token: Arc<dyn TokenSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

impl FirestoreClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        token: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            token,
        }
    }

    /// `projects/{p}/databases/(default)/documents`
    fn database_root(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn url(&self, suffix: &str) -> Result<Url, StoreError> {
        let raw = format!("{}/v1/{}{suffix}", self.base_url, self.database_root());
        Url::parse(&raw).map_err(|e| StoreError::Decode(format!("bad url {raw:?}: {e}")))
    }

    fn decode_document(&self, raw: RawDocument) -> Result<Document, StoreError> {
        let prefix = format!("{}/", self.database_root());
        let path = raw
            .name
            .split_once(&prefix)
            .map(|(_, rel)| rel.to_string())
            .unwrap_or(raw.name);
        let mut doc = Document::new(path);
        doc.fields = decode_fields(&raw.fields)?;
        Ok(doc)
    }

    fn write_for(&self, update: &FieldUpdate) -> Value {
        let mut fields = serde_json::Map::new();
        fields.insert(update.field.clone(), encode_string(&update.value));
        json!({
            "update": {
                "name": format!("{}/{}", self.database_root(), update.path),
                "fields": fields,
            },
            "updateMask": { "fieldPaths": [field_path(&update.field)] },
            "currentDocument": { "exists": true },
        })
    }
}

/// Field names outside `[A-Za-z_][A-Za-z0-9_]*` must be backtick-quoted in
/// field paths.
fn field_path(field: &str) -> String {
    let simple = field
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        field.to_string()
    } else {
        format!("`{}`", field.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.url(&format!("/{}", collection.trim_matches('/')))?;
            {
                let mut q = url.query_pairs_mut();
                q.append_pair("pageSize", &PAGE_SIZE.to_string());
                if let Some(t) = &page_token {
                    q.append_pair("pageToken", t);
                }
            }

            let token = self.token.access_token().await?;
            let resp = self.http.get(url).bearer_auth(token).send().await?;
            let resp = check(resp).await?;
            let page: ListResponse = resp.json().await?;

            for raw in page.documents {
                out.push(self.decode_document(raw)?);
            }
            tracing::debug!(collection, fetched = out.len(), "listed page");

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(out)
    }

    async fn commit(&self, writes: &[FieldUpdate]) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }
        let body = json!({
            "writes": writes.iter().map(|w| self.write_for(w)).collect::<Vec<_>>(),
        });
        let token = self.token.access_token().await?;
        let resp = self
            .http
            .post(self.url(":commit")?)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}
