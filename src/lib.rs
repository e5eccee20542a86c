//! # Judgment Archive Retrieval
//!
//! ## Overview
//! This library locates and retrieves individual court judgments that are
//! stored, compressed, inside sharded tar archives on a remote object store,
//! using a year-partitioned metadata catalog and a per-shard file index.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `cache`: TTL cache tiers and the `CacheManager` that owns them
//! - `client`: read-only HTTP access to the object store
//! - `normalize`: list-field and title normalization helpers
//! - `metadata`: per-year metadata sets and their cached store
//! - `resolver`: case-identifier resolution with year disambiguation
//! - `index`: archive index parsing (two schema variants) and shard location
//! - `archive`: shard download and single-member extraction
//! - `dataset`: combined dataset build with a bounded worker pool
//! - `storage`: local snapshot of the materialized dataset
//! - `service`: the collaborator-facing orchestrator
//! - `config`: configuration management and settings
//! - `errors`: centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Human-entered case identifiers with an approximate year
//! - **Output**: Normalized case records, combined datasets, document bytes
//! - **Failure signal**: every public operation degrades to `None`; no error
//!   crosses the service boundary
//!
//! ## Usage
//! ```rust,no_run
//! use judgment_archive::{Config, RetrievalService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let service = RetrievalService::new(config)?;
//!     if let Some(bytes) = service.fetch_document(2025, "2025 INSC 1401", "english", None).await {
//!         println!("Fetched {} bytes", bytes.len());
//!     }
//!     Ok(())
//! }
//! ```

// Core modules
pub mod archive;
pub mod cache;
pub mod client;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod index;
pub mod metadata;
pub mod normalize;
pub mod resolver;
pub mod service;
pub mod storage;

// Re-exports for convenience
pub use config::Config;
pub use errors::{Result, RetrievalError};
pub use service::RetrievalService;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One resolved case row with all list-valued fields normalized to trimmed,
/// non-empty strings. Derived from a [`metadata::YearlyMetadataSet`] lookup;
/// never stored independently of its cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Human-entered style case identifier, e.g. "2025 INSC 1401"
    pub case_id: String,
    /// Full case title
    pub title: String,
    /// Deciding judges
    pub judges: Vec<String>,
    /// Reporter citations
    pub citation: Vec<String>,
    /// Petitioning parties
    pub petitioner: Vec<String>,
    /// Responding parties
    pub respondent: Vec<String>,
    /// Decision date as recorded in the catalog
    pub decision_date: String,
    /// Disposal nature (allowed, dismissed, ...)
    pub disposal_nature: String,
    /// Languages the judgment document is published in
    pub available_languages: Vec<String>,
    /// Relative filename of the source document
    pub path: String,
    /// Deciding court
    pub court: String,
    /// Authoring judge(s)
    pub author_judge: Vec<String>,
    /// Case number register identifier
    pub cnr: String,
    /// Free-text description
    pub description: String,
    /// Year the record was actually found under (may differ from the
    /// caller-requested year)
    pub year: u16,
}

/// The combined, fully normalized dataset across all fetched years
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    rows: Vec<CaseRecord>,
}

impl Dataset {
    pub fn from_rows(rows: Vec<CaseRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[CaseRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inclusive (first, last) year present in the dataset
    pub fn year_span(&self) -> Option<(u16, u16)> {
        let min = self.rows.iter().map(|r| r.year).min()?;
        let max = self.rows.iter().map(|r| r.year).max()?;
        Some((min, max))
    }

    /// Non-destructive filter to a year subset; the full dataset is untouched
    pub fn filter_years(&self, years: &HashSet<u16>) -> Dataset {
        Dataset {
            rows: self
                .rows
                .iter()
                .filter(|r| years.contains(&r.year))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: u16, case_id: &str) -> CaseRecord {
        CaseRecord {
            case_id: case_id.to_string(),
            title: String::new(),
            judges: Vec::new(),
            citation: Vec::new(),
            petitioner: Vec::new(),
            respondent: Vec::new(),
            decision_date: String::new(),
            disposal_nature: String::new(),
            available_languages: Vec::new(),
            path: String::new(),
            court: String::new(),
            author_judge: Vec::new(),
            cnr: String::new(),
            description: String::new(),
            year,
        }
    }

    #[test]
    fn test_filter_years_is_non_destructive() {
        let dataset = Dataset::from_rows(vec![
            record(1975, "a"),
            record(1980, "b"),
            record(1980, "c"),
        ]);

        let filtered = dataset.filter_years(&HashSet::from([1980]));
        assert_eq!(filtered.len(), 2);
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.year_span(), Some((1975, 1980)));
        assert_eq!(filtered.year_span(), Some((1980, 1980)));
    }
}
