//! HTTP client for the spreadsheet REST API.
//!
//! Protocol:
//! - `GET base` lists every row
//! - `GET base/search?id=<id>` lists rows matching an id
//! - `POST base` with `{"data": row}` answers `{"created": n}`
//! - `PUT|PATCH base/id/<id>` with `{"data": row}` answers `{"updated": n}`
//! - `DELETE base/id/<id>` answers `{"deleted": n}`

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use sheetsync_core::RecordId;
use sheetsync_reports::Record;

use super::{RemoteError, RemoteStore, UpdateMode};

/// Remote store backed by one spreadsheet API base URL.
#[derive(Debug, Clone)]
pub struct SheetDbStore {
    client: Client,
    base_url: Url,
    token: Option<String>,
    update_mode: UpdateMode,
}

#[derive(Serialize)]
struct Envelope<'a, R> {
    data: &'a R,
}

#[derive(Debug, Default, Deserialize)]
struct MutationCount {
    created: Option<u64>,
    updated: Option<u64>,
    deleted: Option<u64>,
}

impl SheetDbStore {
    pub fn new(base_url: Url, update_mode: UpdateMode, timeout: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !base_url.cannot_be_a_base(),
            "remote store URL {base_url} cannot carry a path"
        );

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            token: None,
            update_mode,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    /// `base` with extra percent-encoded path segments appended.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(%method, %url, "remote store request");
        let req = self.client.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, RemoteError> {
        let resp = req
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp)
    }

    async fn fetch_rows<R: Record>(&self, req: RequestBuilder) -> Result<Vec<R>, RemoteError> {
        let resp = self.send(req).await?;
        let rows: Vec<Value> = resp
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(decode_rows(rows))
    }

    async fn mutation(&self, req: RequestBuilder) -> Result<MutationCount, RemoteError> {
        let resp = self.send(req).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        // A 2xx without a count body is taken as applied.
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}

/// Decode rows one by one; a malformed row is skipped, not fatal to the listing.
fn decode_rows<R: Record>(rows: Vec<Value>) -> Vec<R> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<R>(row) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(collection = R::COLLECTION, error = %err, "skipping undecodable remote row");
                None
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl<R: Record> RemoteStore<R> for SheetDbStore {
    async fn list(&self) -> Result<Vec<R>, RemoteError> {
        let url = self.endpoint(&[]);
        self.fetch_rows(self.request(Method::GET, url)).await
    }

    async fn search_by_id(&self, id: &RecordId) -> Result<Vec<R>, RemoteError> {
        let url = self.endpoint(&["search"]);
        let req = self
            .request(Method::GET, url)
            .query(&[("id", id.as_str())]);
        self.fetch_rows(req).await
    }

    async fn create(&self, record: &R) -> Result<(), RemoteError> {
        let url = self.endpoint(&[]);
        let req = self
            .request(Method::POST, url)
            .json(&Envelope { data: record });

        match self.mutation(req).await?.created {
            Some(0) => Err(RemoteError::Rejected("created: 0".to_string())),
            _ => Ok(()),
        }
    }

    async fn update(&self, id: &RecordId, record: &R) -> Result<(), RemoteError> {
        let method = match self.update_mode {
            UpdateMode::Put => Method::PUT,
            UpdateMode::Patch => Method::PATCH,
        };
        let url = self.endpoint(&["id", id.as_str()]);
        let req = self.request(method, url).json(&Envelope { data: record });

        match self.mutation(req).await?.updated {
            Some(0) => Err(RemoteError::NotFound(id.clone())),
            _ => Ok(()),
        }
    }

    async fn delete(&self, id: &RecordId) -> Result<(), RemoteError> {
        let url = self.endpoint(&["id", id.as_str()]);
        match self.mutation(self.request(Method::DELETE, url)).await?.deleted {
            Some(0) => Err(RemoteError::NotFound(id.clone())),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> SheetDbStore {
        SheetDbStore::new(Url::parse(base).unwrap(), UpdateMode::Put, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn endpoint_appends_encoded_segments() {
        let store = store("https://sheetdb.io/api/v1/abc123");
        assert_eq!(
            store.endpoint(&["id", "a b/c"]).as_str(),
            "https://sheetdb.io/api/v1/abc123/id/a%20b%2Fc"
        );
        assert_eq!(store.endpoint(&[]).as_str(), "https://sheetdb.io/api/v1/abc123");
    }

    #[test]
    fn trailing_slash_in_base_is_not_doubled() {
        let store = store("https://sheetdb.io/api/v1/abc123/");
        assert_eq!(
            store.endpoint(&["search"]).as_str(),
            "https://sheetdb.io/api/v1/abc123/search"
        );
    }

    #[test]
    fn base_without_path_is_rejected() {
        let url = Url::parse("mailto:ops@example.com").unwrap();
        assert!(SheetDbStore::new(url, UpdateMode::Patch, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn mutation_counts_tolerate_missing_fields() {
        let count: MutationCount = serde_json::from_str(r#"{"deleted": 1}"#).unwrap();
        assert_eq!(count.deleted, Some(1));
        assert_eq!(count.created, None);
    }
}
