//! # Archive Index Resolver
//!
//! ## Purpose
//! Fetches and parses the per-(year, language) shard index and maps a target
//! filename to the shard that contains it. Two on-the-wire schema variants are
//! normalized at parse time into one ordered [`ShardReference`] list so the
//! matching code is schema-agnostic.
//!
//! ## Input/Output Specification
//! - **Input**: Year, language, target filename
//! - **Output**: Owning shard name, or `None`
//! - **Schemas**: V1 flat `{shard: [files]}` (non-array values ignored),
//!   V2 `{parts: [{name, files, ...}]}`
//!
//! ## Key Features
//! - Filename matching tolerant of `.pdf` / `_EN.pdf` suffixes and year
//!   prefixes, expressed as an ordered candidate list
//! - Shards tested in document order; first containing shard wins
//! - Indexes cached ~2h (effectively immutable once published)

use crate::cache::CacheManager;
use crate::client::StoreClient;
use crate::errors::{Result, RetrievalError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// A shard name plus the file set used for membership testing
#[derive(Debug)]
pub struct ShardReference {
    pub name: String,
    pub files: HashSet<String>,
}

/// Normalized archive index for one (year, language) pair
#[derive(Debug)]
pub struct ArchiveIndex {
    shards: Vec<ShardReference>,
}

/// V2 shard descriptor as it appears under `parts`
#[derive(Debug, Deserialize)]
struct ShardDescriptor {
    name: Option<String>,
    #[serde(default)]
    files: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PartsDocument {
    parts: Vec<ShardDescriptor>,
}

impl ArchiveIndex {
    /// Parse either schema variant into the normalized shard list.
    ///
    /// A `parts` key marks schema V2; anything else that is an object is read
    /// as the V1 flat mapping, where values that are not arrays are incidental
    /// metadata and skipped.
    pub fn from_document(year: u16, language: &str, document: Value) -> Result<Self> {
        let source = || format!("index year={} language={}", year, language);

        if !document.is_object() {
            return Err(RetrievalError::MalformedPayload {
                payload_source: source(),
                details: "index document is not an object".to_string(),
            });
        }

        let shards = if document.get("parts").is_some() {
            let parsed: PartsDocument =
                serde_json::from_value(document).map_err(|e| RetrievalError::MalformedPayload {
                    payload_source: source(),
                    details: format!("bad parts schema: {}", e),
                })?;

            parsed
                .parts
                .into_iter()
                .filter_map(|part| {
                    let name = part.name?;
                    Some(ShardReference {
                        name,
                        files: part.files.into_iter().collect(),
                    })
                })
                .collect()
        } else {
            // V1: flat map in document order, array values only
            let object = match document {
                Value::Object(map) => map,
                _ => unreachable!("checked is_object above"),
            };

            object
                .into_iter()
                .filter_map(|(name, value)| match value {
                    Value::Array(entries) => Some(ShardReference {
                        name,
                        files: entries
                            .into_iter()
                            .filter_map(|v| match v {
                                Value::String(s) => Some(s),
                                _ => None,
                            })
                            .collect(),
                    }),
                    _ => None,
                })
                .collect()
        };

        Ok(Self { shards })
    }

    /// Shards in document order
    pub fn shards(&self) -> &[ShardReference] {
        &self.shards
    }

    /// First shard whose file list contains any candidate form of `filename`
    pub fn locate(&self, year: u16, filename: &str) -> Option<&str> {
        let candidates = filename_candidates(year, filename);
        self.shards
            .iter()
            .find(|shard| candidates.iter().any(|c| shard.files.contains(c)))
            .map(|shard| shard.name.as_str())
    }
}

/// Ordered filename variants tried against each shard's file list: the raw
/// name, `.pdf`, `_EN.pdf`, the same suffixes on the bare stem (so "X.pdf"
/// still finds "X_EN.pdf"), then the year-prefixed form of each.
pub fn filename_candidates(year: u16, filename: &str) -> Vec<String> {
    let stem = filename.strip_suffix(".pdf").unwrap_or(filename);
    let stem = stem.strip_suffix("_EN").unwrap_or(stem);

    let mut bases: Vec<String> = Vec::with_capacity(6);
    for base in [
        filename.to_string(),
        stem.to_string(),
        format!("{}.pdf", filename),
        format!("{}.pdf", stem),
        format!("{}_EN.pdf", filename),
        format!("{}_EN.pdf", stem),
    ] {
        if !bases.contains(&base) {
            bases.push(base);
        }
    }

    let mut candidates = bases.clone();
    for base in &bases {
        candidates.push(format!("{}/{}", year, base));
    }
    candidates
}

/// Cached access to archive indexes and shard location
pub struct IndexResolver {
    client: Arc<StoreClient>,
    caches: Arc<CacheManager>,
}

impl IndexResolver {
    pub fn new(client: Arc<StoreClient>, caches: Arc<CacheManager>) -> Self {
        Self { client, caches }
    }

    /// The parsed index for one (year, language), fetched at most once per
    /// TTL window. Failures of any kind read as `None`.
    pub async fn get_index(&self, year: u16, language: &str) -> Option<Arc<ArchiveIndex>> {
        let key = (year, language.to_string());
        self.caches
            .index
            .get_or_compute(key, || async move {
                match self.fetch(year, language).await {
                    Ok(index) => {
                        tracing::debug!(
                            year,
                            language,
                            shards = index.shards().len(),
                            "Fetched archive index"
                        );
                        Some(Arc::new(index))
                    }
                    Err(e) => {
                        tracing::warn!(
                            year,
                            language,
                            category = e.category(),
                            error = %e,
                            "Index fetch failed"
                        );
                        None
                    }
                }
            })
            .await
    }

    /// Map a target filename to its owning shard name
    pub async fn locate_shard(
        &self,
        year: u16,
        filename: &str,
        language: &str,
    ) -> Option<String> {
        let index = self.get_index(year, language).await?;
        let shard = index.locate(year, filename).map(str::to_string);
        if shard.is_none() {
            tracing::debug!(year, language, filename, "Filename absent from every shard");
        }
        shard
    }

    async fn fetch(&self, year: u16, language: &str) -> Result<ArchiveIndex> {
        let document = self.client.fetch_index_document(year, language).await?;
        ArchiveIndex::from_document(year, language, document)
    }
}
