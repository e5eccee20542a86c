//! # Combined Dataset Builder
//!
//! ## Purpose
//! Materializes one fully normalized dataset across the whole supported year
//! range. The cold path fans out per-year metadata fetches over a bounded
//! worker pool and merges whatever succeeds; the fast path loads a previously
//! persisted snapshot. The result lives as a long-lived singleton with manual
//! invalidation only.
//!
//! ## Input/Output Specification
//! - **Input**: Optional year subset for filtering
//! - **Output**: `Some(Dataset)` or `None` when not a single year could be
//!   fetched
//! - **Partial failure**: years that fail to fetch are simply omitted
//!
//! ## Key Features
//! - Bounded concurrency (fixed pool width, default 10) with fan-in into a
//!   single collecting task — no shared mutable aggregation map
//! - One global normalization pass, parallelized across rows
//! - Deterministic (year, case_id) ordering after the unordered merge
//! - Filtering never triggers a rebuild

use crate::cache::CacheManager;
use crate::config::{current_year, DatasetConfig};
use crate::metadata::{MetadataStore, YearlyMetadataSet};
use crate::normalize;
use crate::storage::SnapshotStore;
use crate::{CaseRecord, Dataset};
use futures::stream::{self, StreamExt};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

/// Builds and caches the combined cross-year dataset
pub struct DatasetBuilder {
    config: DatasetConfig,
    metadata: Arc<MetadataStore>,
    caches: Arc<CacheManager>,
    snapshot: Option<Arc<SnapshotStore>>,
}

impl DatasetBuilder {
    pub fn new(
        config: DatasetConfig,
        metadata: Arc<MetadataStore>,
        caches: Arc<CacheManager>,
        snapshot: Option<Arc<SnapshotStore>>,
    ) -> Self {
        Self {
            config,
            metadata,
            caches,
            snapshot,
        }
    }

    /// The combined dataset, optionally filtered to a year subset.
    ///
    /// Filtering is applied to the cached singleton and never rebuilds it.
    pub async fn get_combined(&self, years: Option<&HashSet<u16>>) -> Option<Arc<Dataset>> {
        let full = self.full_dataset().await?;
        match years {
            None => Some(full),
            Some(subset) => Some(Arc::new(full.filter_years(subset))),
        }
    }

    async fn full_dataset(&self) -> Option<Arc<Dataset>> {
        if let Some(dataset) = self.caches.combined() {
            return Some(dataset);
        }

        // Fast path: a previously materialized snapshot skips the network
        // and the normalization pass entirely.
        if let Some(store) = &self.snapshot {
            match store.load() {
                Ok(Some(dataset)) => {
                    let dataset = Arc::new(dataset);
                    self.caches.set_combined(dataset.clone());
                    return Some(dataset);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(category = e.category(), error = %e, "Snapshot load failed");
                }
            }
        }

        let dataset = Arc::new(self.build_cold().await?);
        self.caches.set_combined(dataset.clone());

        if let Some(store) = &self.snapshot {
            if let Err(e) = store.save(&dataset) {
                tracing::warn!(category = e.category(), error = %e, "Snapshot write failed");
            }
        }

        Some(dataset)
    }

    /// Fetch every year in [start_year, current_year] through the bounded
    /// pool and normalize the merged rows once, globally.
    async fn build_cold(&self) -> Option<Dataset> {
        let years: Vec<u16> = (self.config.start_year..=current_year()).collect();
        let total_years = years.len();

        tracing::info!(
            years = total_years,
            workers = self.config.max_concurrent_fetches,
            "Building combined dataset"
        );

        // Workers emit (year, result); this stream collect is the single
        // owner of the aggregation, so no shared map is ever written
        // concurrently. Failed years fall out in filter_map.
        let fetched: Vec<(u16, Arc<YearlyMetadataSet>)> = stream::iter(years)
            .map(|year| {
                let metadata = self.metadata.clone();
                async move { (year, metadata.get_metadata(year).await) }
            })
            .buffer_unordered(self.config.max_concurrent_fetches)
            .filter_map(|(year, set)| async move { set.map(|s| (year, s)) })
            .collect()
            .await;

        if fetched.is_empty() {
            tracing::warn!("No metadata year could be fetched; combined dataset unavailable");
            return None;
        }

        tracing::info!(
            fetched = fetched.len(),
            missing = total_years - fetched.len(),
            "Year fetch phase complete"
        );

        let dataset = tokio::task::spawn_blocking(move || normalize_rows(fetched))
            .await
            .ok()?;

        tracing::info!(rows = dataset.len(), "Combined dataset materialized");
        Some(dataset)
    }
}

/// The global normalization pass: project every row of every fetched year,
/// derive petitioner/respondent from titles where present, and sort for
/// deterministic output despite unordered fetch completion.
fn normalize_rows(fetched: Vec<(u16, Arc<YearlyMetadataSet>)>) -> Dataset {
    let mut rows: Vec<CaseRecord> = fetched
        .par_iter()
        .flat_map_iter(|(year, set)| {
            let has_title = set.has_column("title");
            (0..set.len()).map(move |row| {
                let mut record = set.record(row, *year);
                if has_title {
                    let (petitioners, respondents) = normalize::extract_parties(&record.title);
                    record.petitioner = petitioners;
                    record.respondent = respondents;
                }
                // Reporter-abbreviation debris is dropped only here; per-case
                // lookups keep citations as the catalog records them
                record.citation = normalize::filter_citation_fragments(record.citation);
                record
            })
        })
        .collect();

    rows.sort_by(|a, b| (a.year, &a.case_id).cmp(&(b.year, &b.case_id)));
    Dataset::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SystemClock;
    use crate::client::StoreClient;
    use crate::config::{CacheConfig, RemoteConfig, START_YEAR};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn builder_for(server_url: &str, snapshot: Option<Arc<SnapshotStore>>) -> DatasetBuilder {
        let client = Arc::new(
            StoreClient::new(&RemoteConfig {
                base_url: server_url.to_string(),
                document_timeout_seconds: 5,
                shard_timeout_seconds: 5,
                user_agent: "judgment-archive-test".to_string(),
            })
            .unwrap(),
        );
        let caches = Arc::new(CacheManager::new(
            &CacheConfig {
                metadata_ttl_seconds: 3600,
                index_ttl_seconds: 7200,
                case_ttl_seconds: 3600,
            },
            Arc::new(SystemClock::new()),
        ));
        let metadata = Arc::new(MetadataStore::new(client, caches.clone()));
        DatasetBuilder::new(
            DatasetConfig {
                start_year: START_YEAR,
                max_concurrent_fetches: 10,
                snapshot_path: std::path::PathBuf::new(),
            },
            metadata,
            caches,
            snapshot,
        )
    }

    async fn mount_metadata(server: &MockServer, year: u16, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/metadata/json/year={}/metadata.json", year)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_partial_failure_yields_union_of_successes() {
        let server = MockServer::start().await;
        mount_metadata(
            &server,
            1975,
            json!({"case_id": ["1975 INSC 1"], "title": ["A vs B"]}),
        )
        .await;
        mount_metadata(
            &server,
            2021,
            json!({"case_id": ["2021 INSC 5", "2021 INSC 6"], "title": ["C versus D", "E vs F"]}),
        )
        .await;
        // 1980 exists but is broken; it must be omitted, not fatal
        Mock::given(method("GET"))
            .and(path("/metadata/json/year=1980/metadata.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        // Every other year 404s

        let builder = builder_for(&server.uri(), None);
        let dataset = builder.get_combined(None).await.unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.year_span(), Some((1975, 2021)));
        // Deterministic order: sorted by (year, case_id)
        assert_eq!(dataset.rows()[0].case_id, "1975 INSC 1");
        assert_eq!(dataset.rows()[1].case_id, "2021 INSC 5");
    }

    #[tokio::test]
    async fn test_parties_derived_from_title() {
        let server = MockServer::start().await;
        mount_metadata(
            &server,
            1975,
            json!({"case_id": ["x"], "title": ["Kesavananda Bharati vs State of Kerala"]}),
        )
        .await;

        let builder = builder_for(&server.uri(), None);
        let dataset = builder.get_combined(None).await.unwrap();
        assert_eq!(dataset.rows()[0].petitioner, vec!["Kesavananda Bharati"]);
        assert_eq!(dataset.rows()[0].respondent, vec!["State Of Kerala"]);
    }

    #[tokio::test]
    async fn test_singleton_and_filtering_do_not_rebuild() {
        let server = MockServer::start().await;
        mount_metadata(&server, 1975, json!({"case_id": ["a"]})).await;
        mount_metadata(&server, 1980, json!({"case_id": ["b"]})).await;

        let builder = builder_for(&server.uri(), None);
        builder.get_combined(None).await.unwrap();
        let requests_after_build = server.received_requests().await.unwrap().len();

        let filtered = builder
            .get_combined(Some(&HashSet::from([1980])))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows()[0].year, 1980);

        // Neither the second call nor the filter touched the network
        assert_eq!(
            server.received_requests().await.unwrap().len(),
            requests_after_build
        );
    }

    #[tokio::test]
    async fn test_citation_fragments_filtered_in_global_pass() {
        let server = MockServer::start().await;
        mount_metadata(
            &server,
            1975,
            json!({
                "case_id": ["1975 INSC 1"],
                "citation": ["1975 AIR 1378, SCR"]
            }),
        )
        .await;

        let builder = builder_for(&server.uri(), None);
        let dataset = builder.get_combined(None).await.unwrap();
        assert_eq!(dataset.rows()[0].citation, vec!["1975 AIR 1378"]);
    }

    #[tokio::test]
    async fn test_all_years_failing_is_none() {
        let server = MockServer::start().await;
        let builder = builder_for(&server.uri(), None);
        assert!(builder.get_combined(None).await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_fast_path_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot_path = dir.path().join("snapshot");

        // First process: cold build against a live mock, snapshot persisted
        {
            let server = MockServer::start().await;
            mount_metadata(
                &server,
                1975,
                json!({"case_id": ["1975 INSC 1"], "title": ["A vs B"]}),
            )
            .await;

            let store = Arc::new(SnapshotStore::open(&snapshot_path).unwrap());
            let builder = builder_for(&server.uri(), Some(store));
            assert_eq!(builder.get_combined(None).await.unwrap().len(), 1);
        }

        // Second process: fresh caches, dead server — snapshot must serve
        let server = MockServer::start().await;
        let store = Arc::new(SnapshotStore::open(&snapshot_path).unwrap());
        let builder = builder_for(&server.uri(), Some(store));

        let dataset = builder.get_combined(None).await.unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.rows()[0].case_id, "1975 INSC 1");
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
