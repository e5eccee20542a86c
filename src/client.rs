//! # Object Store Client Module
//!
//! ## Purpose
//! Read-only HTTP access to the public object store holding year-partitioned
//! metadata documents, per-(year, language) archive indexes, and compressed
//! archive shards.
//!
//! ## Input/Output Specification
//! - **Input**: Year, language, and shard coordinates
//! - **Output**: Raw JSON documents and shard bytes
//! - **Timeouts**: ~30s for metadata/index documents, ~120s for shard downloads
//!
//! ## Key Features
//! - Per-request timeouts on a single shared client
//! - Non-2xx responses surfaced as typed errors, never panics
//! - No retries: a failed call degrades to the caller's `None`

use crate::config::RemoteConfig;
use crate::errors::{Result, RetrievalError};
use reqwest::Client;
use std::time::Duration;

/// HTTP client for the judgment object store
pub struct StoreClient {
    client: Client,
    base_url: String,
    document_timeout: Duration,
    shard_timeout: Duration,
}

impl StoreClient {
    /// Build a client for the configured object store
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(RetrievalError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            document_timeout: Duration::from_secs(config.document_timeout_seconds),
            shard_timeout: Duration::from_secs(config.shard_timeout_seconds),
        })
    }

    /// URL of the metadata document for one year
    pub fn metadata_url(&self, year: u16) -> String {
        format!("{}/metadata/json/year={}/metadata.json", self.base_url, year)
    }

    /// URL of the archive index for one (year, language) pair
    pub fn index_url(&self, year: u16, language: &str) -> String {
        format!(
            "{}/data/tar/year={}/{}/{}.index.json",
            self.base_url, year, language, language
        )
    }

    /// URL of one archive shard
    pub fn shard_url(&self, year: u16, language: &str, shard_name: &str) -> String {
        format!(
            "{}/data/tar/year={}/{}/{}",
            self.base_url, year, language, shard_name
        )
    }

    /// Fetch the column-major metadata document for one year
    pub async fn fetch_metadata_document(&self, year: u16) -> Result<serde_json::Value> {
        let url = self.metadata_url(year);
        self.fetch_json(&url).await
    }

    /// Fetch the archive index document for one (year, language) pair
    pub async fn fetch_index_document(
        &self,
        year: u16,
        language: &str,
    ) -> Result<serde_json::Value> {
        let url = self.index_url(year, language);
        self.fetch_json(&url).await
    }

    /// Download one archive shard in full
    pub async fn download_shard(
        &self,
        year: u16,
        language: &str,
        shard_name: &str,
    ) -> Result<Vec<u8>> {
        let url = self.shard_url(year, language, shard_name);
        tracing::debug!(url = %url, "Downloading archive shard");

        let response = self
            .client
            .get(&url)
            .timeout(self.shard_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let bytes = response.bytes().await?;
        tracing::debug!(url = %url, size = bytes.len(), "Shard downloaded");
        Ok(bytes.to_vec())
    }

    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value> {
        tracing::debug!(url = %url, "Fetching store document");

        let response = self
            .client
            .get(url)
            .timeout(self.document_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let value = response.json::<serde_json::Value>().await.map_err(|e| {
            RetrievalError::MalformedPayload {
                payload_source: url.to_string(),
                details: e.to_string(),
            }
        })?;

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> RemoteConfig {
        RemoteConfig {
            base_url: base_url.to_string(),
            document_timeout_seconds: 5,
            shard_timeout_seconds: 5,
            user_agent: "judgment-archive-test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_metadata_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metadata/json/year=1975/metadata.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "case_id": ["1975 INSC 1"]
            })))
            .mount(&server)
            .await;

        let client = StoreClient::new(&test_config(&server.uri())).unwrap();
        let doc = client.fetch_metadata_document(1975).await.unwrap();
        assert_eq!(doc["case_id"][0], "1975 INSC 1");
    }

    #[tokio::test]
    async fn test_missing_document_maps_to_status_error() {
        let server = MockServer::start().await;

        let client = StoreClient::new(&test_config(&server.uri())).unwrap();
        let err = client.fetch_metadata_document(1950).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.category(), "network");
    }

    #[tokio::test]
    async fn test_non_json_document_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/tar/year=2021/english/english.index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = StoreClient::new(&test_config(&server.uri())).unwrap();
        let err = client.fetch_index_document(2021, "english").await.unwrap_err();
        assert_eq!(err.category(), "malformed");
    }

    #[tokio::test]
    async fn test_download_shard_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/tar/year=2021/english/data.tar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let client = StoreClient::new(&test_config(&server.uri())).unwrap();
        let bytes = client.download_shard(2021, "english", "data.tar").await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_url_layout() {
        let client = StoreClient::new(&test_config("https://store.example.com/")).unwrap();
        assert_eq!(
            client.metadata_url(1980),
            "https://store.example.com/metadata/json/year=1980/metadata.json"
        );
        assert_eq!(
            client.index_url(2021, "english"),
            "https://store.example.com/data/tar/year=2021/english/english.index.json"
        );
        assert_eq!(
            client.shard_url(2021, "english", "data-part-1.tar"),
            "https://store.example.com/data/tar/year=2021/english/data-part-1.tar"
        );
    }
}
