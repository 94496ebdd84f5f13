//! Object listings against the GCS JSON API
//!
//! Used after an export to check what actually landed under a view's prefix.
//! Listing is read-only and paginates with `nextPageToken` until the prefix
//! is exhausted.

pub mod error;

pub use error::StorageError;

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::gcp::{GoogleAuth, STORAGE_READ_SCOPE};

const API_BASE: &str = "https://storage.googleapis.com/storage/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Aggregate of one prefix listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefixStats {
    pub objects: u64,
    pub total_bytes: u64,
}

/// Seam for listing exported objects; tests script it.
#[async_trait]
pub trait ObjectLister: Send + Sync {
    async fn list_prefix(&self, bucket: &str, prefix: &str) -> Result<PrefixStats, StorageError>;
}

/// Read-only client for bucket listings.
pub struct GcsClient {
    http: reqwest::Client,
    auth: GoogleAuth,
}

impl GcsClient {
    pub fn new(auth: GoogleAuth) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(StorageError::from_reqwest)?;
        Ok(Self { http, auth })
    }
}

#[async_trait]
impl ObjectLister for GcsClient {
    async fn list_prefix(&self, bucket: &str, prefix: &str) -> Result<PrefixStats, StorageError> {
        let token = self.auth.token(&[STORAGE_READ_SCOPE]).await?;
        let url = format!("{}/b/{}/o", API_BASE, bucket);

        let mut stats = PrefixStats::default();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(&url).bearer_auth(&token).query(&[
                ("prefix", prefix),
                ("fields", "items(size),nextPageToken"),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(StorageError::from_reqwest)?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(StorageError::Api {
                    status: status.as_u16(),
                    message: body.trim().chars().take(300).collect(),
                });
            }

            let page: ListResponse = response
                .json()
                .await
                .map_err(|e| StorageError::Protocol(format!("malformed listing: {}", e)))?;

            for object in &page.items {
                stats.objects += 1;
                stats.total_bytes += object.size.parse::<u64>().unwrap_or(0);
            }

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(bucket, prefix, objects = stats.objects, bytes = stats.total_bytes, "listed prefix");
        Ok(stats)
    }
}

/// Wire shape of `objects.list`; `size` arrives as a decimal string.
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ObjectEntry>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    #[serde(default)]
    size: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_parses_sizes_as_strings() {
        let raw = r#"{
            "items": [
                {"size": "1048576"},
                {"size": "2048"}
            ],
            "nextPageToken": "CaE1"
        }"#;
        let page: ListResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].size, "1048576");
        assert_eq!(page.next_page_token.as_deref(), Some("CaE1"));
    }

    #[test]
    fn test_empty_listing_parses() {
        let page: ListResponse = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
