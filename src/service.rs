//! # Retrieval Service
//!
//! ## Purpose
//! The collaborator-facing orchestrator. Wires the object-store client, the
//! cache manager, and every resolution component together, and exposes the
//! two operations the outside world consumes: the combined dataset and
//! single-document fetch.
//!
//! ## Input/Output Specification
//! - **Input**: Years, case identifiers, language, optional known path
//! - **Output**: Datasets, case records, document bytes — or `None`
//! - **Failure policy**: `None` is the only failure signal; retrying will not
//!   help and no backoff is performed
//!
//! ## Key Features
//! - Explicit cache manager, constructed once and shared by reference
//! - A caller-supplied path skips case resolution entirely
//! - Any stage's `None` short-circuits the whole call

use crate::archive::ShardRetriever;
use crate::cache::{CacheManager, Clock, SystemClock};
use crate::client::StoreClient;
use crate::config::Config;
use crate::dataset::DatasetBuilder;
use crate::errors::Result;
use crate::index::IndexResolver;
use crate::metadata::MetadataStore;
use crate::resolver::CaseResolver;
use crate::storage::SnapshotStore;
use crate::{CaseRecord, Dataset};
use std::collections::HashSet;
use std::sync::Arc;

/// Orchestrates document resolution and retrieval over the layered caches
pub struct RetrievalService {
    caches: Arc<CacheManager>,
    client: Arc<StoreClient>,
    resolver: CaseResolver,
    index: IndexResolver,
    retriever: ShardRetriever,
    dataset: DatasetBuilder,
}

impl RetrievalService {
    /// Build the service with the wall clock
    pub fn new(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Build the service with an injected clock (used by expiry tests)
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let client = Arc::new(StoreClient::new(&config.remote)?);
        let caches = Arc::new(CacheManager::new(&config.cache, clock));
        let metadata = Arc::new(MetadataStore::new(client.clone(), caches.clone()));

        // The snapshot store is an optimization; failing to open it must not
        // take the service down
        let snapshot = match SnapshotStore::open(&config.dataset.snapshot_path) {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                tracing::warn!(
                    path = ?config.dataset.snapshot_path,
                    error = %e,
                    "Snapshot store unavailable; cold builds will not persist"
                );
                None
            }
        };

        let resolver = CaseResolver::new(metadata.clone(), caches.clone());
        let index = IndexResolver::new(client.clone(), caches.clone());
        let retriever = ShardRetriever::new(client.clone());
        let dataset = DatasetBuilder::new(config.dataset.clone(), metadata, caches.clone(), snapshot);

        Ok(Self {
            caches,
            client,
            resolver,
            index,
            retriever,
            dataset,
        })
    }

    /// The combined, normalized dataset, optionally filtered to a year subset
    pub async fn get_combined_dataset(&self, years: Option<&HashSet<u16>>) -> Option<Arc<Dataset>> {
        self.dataset.get_combined(years).await
    }

    /// Resolve one case record, disambiguating the year from the identifier
    pub async fn resolve_case(&self, year: u16, case_id: &str) -> Option<Arc<CaseRecord>> {
        self.resolver.resolve(year, case_id).await
    }

    /// Fetch the document bytes for one case.
    ///
    /// When the caller already knows the document `path` (from dataset rows),
    /// case resolution is skipped. Otherwise the case is resolved first and
    /// the lookup continues under the year the record was actually found in.
    pub async fn fetch_document(
        &self,
        year: u16,
        case_id: &str,
        language: &str,
        path: Option<&str>,
    ) -> Option<Vec<u8>> {
        let (lookup_year, path) = match path {
            Some(path) => (year, path.to_string()),
            None => {
                let record = self.resolver.resolve(year, case_id).await?;
                if record.path.is_empty() {
                    tracing::debug!(year, case_id, "Resolved case carries no document path");
                    return None;
                }
                (record.year, record.path.clone())
            }
        };

        let filename = last_segment(&path);
        let shard = self.index.locate_shard(lookup_year, filename, language).await?;

        tracing::info!(
            year = lookup_year,
            case_id,
            shard = %shard,
            filename,
            "Retrieving document"
        );
        self.retriever
            .extract(lookup_year, &shard, filename, language)
            .await
    }

    /// URL of the shard holding a case's document, without downloading it
    pub async fn document_url(
        &self,
        year: u16,
        case_id: &str,
        language: &str,
    ) -> Option<String> {
        let record = self.resolver.resolve(year, case_id).await?;
        if record.path.is_empty() {
            return None;
        }

        let filename = last_segment(&record.path);
        let shard = self
            .index
            .locate_shard(record.year, filename, language)
            .await?;
        Some(self.client.shard_url(record.year, language, &shard))
    }

    /// Reset every cache tier, including the combined dataset singleton
    pub fn clear_caches(&self) {
        self.caches.clear_all();
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
