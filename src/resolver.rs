//! # Case Resolver
//!
//! ## Purpose
//! Resolves a human-entered (year, case id) pair to one normalized
//! [`CaseRecord`]. The caller's year is only a hint: identifiers frequently
//! embed their true year ("2025 INSC 1401"), so an embedded plausible year is
//! tried first. Within each candidate year, matching falls back through an
//! ordered chain of predicates.
//!
//! ## Input/Output Specification
//! - **Input**: Requested year, raw case identifier
//! - **Output**: `Some(CaseRecord)` with the actually-matching year, or `None`
//! - **Caching**: resolved cases cached ~1h keyed by (requested year,
//!   trimmed identifier)
//!
//! ## Matching Chain (in order)
//! 1. Exact match after case-fold and trim
//! 2. Exact match after additionally stripping all whitespace
//! 3. Case-insensitive substring containment

use crate::cache::CacheManager;
use crate::config::current_year;
use crate::metadata::MetadataStore;
use crate::normalize;
use crate::CaseRecord;
use serde_json::Value;
use std::sync::Arc;

/// One matching strategy: (query, case-id cell) → does the cell match
type MatchPredicate = fn(&str, &str) -> bool;

/// The fallback chain, tried in order; each named for diagnostics
const MATCHERS: &[(&str, MatchPredicate)] = &[
    ("exact_casefold", match_exact_casefold),
    ("whitespace_stripped", match_whitespace_stripped),
    ("substring", match_substring),
];

fn match_exact_casefold(query: &str, cell: &str) -> bool {
    cell.trim().to_lowercase() == query.to_lowercase()
}

fn match_whitespace_stripped(query: &str, cell: &str) -> bool {
    let strip = |s: &str| {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    };
    strip(cell) == strip(query)
}

fn match_substring(query: &str, cell: &str) -> bool {
    cell.to_lowercase().contains(&query.to_lowercase())
}

/// Candidate years in the order they are tried: an embedded plausible year
/// first, then the caller-supplied year.
pub fn candidate_years(requested: u16, case_id: &str) -> Vec<u16> {
    let mut years = vec![requested];
    if let Some(embedded) = normalize::embedded_year(case_id, current_year()) {
        if embedded != requested {
            years.insert(0, embedded);
        }
    }
    years
}

/// Resolves case identifiers against per-year metadata sets
pub struct CaseResolver {
    metadata: Arc<MetadataStore>,
    caches: Arc<CacheManager>,
}

impl CaseResolver {
    pub fn new(metadata: Arc<MetadataStore>, caches: Arc<CacheManager>) -> Self {
        Self { metadata, caches }
    }

    /// Resolve a case record, disambiguating the year from the identifier.
    ///
    /// The returned record's `year` is the candidate year it was actually
    /// found under, not necessarily the caller's input.
    pub async fn resolve(&self, year: u16, case_id: &str) -> Option<Arc<CaseRecord>> {
        let normalized = case_id.trim().to_string();
        if normalized.is_empty() {
            return None;
        }

        let key = (year, normalized.clone());
        self.caches
            .case
            .get_or_compute(key, || async move {
                self.lookup(year, &normalized).await.map(Arc::new)
            })
            .await
    }

    async fn lookup(&self, requested_year: u16, case_id: &str) -> Option<CaseRecord> {
        for candidate in candidate_years(requested_year, case_id) {
            let set = match self.metadata.get_metadata(candidate).await {
                Some(set) => set,
                None => continue,
            };

            let cells = match set.column("case_id") {
                Some(cells) => cells,
                None => {
                    tracing::debug!(year = candidate, "Metadata set lacks case_id column");
                    continue;
                }
            };

            for (matcher_name, matcher) in MATCHERS {
                for (row, cell) in cells.iter().enumerate() {
                    let cell = match cell {
                        Value::String(s) => s.as_str(),
                        _ => continue,
                    };
                    if matcher(case_id, cell) {
                        tracing::debug!(
                            case_id,
                            requested_year,
                            resolved_year = candidate,
                            matcher = matcher_name,
                            "Case resolved"
                        );
                        return Some(set.record(row, candidate));
                    }
                }
            }
        }

        tracing::debug!(case_id, requested_year, "Case not found in any candidate year");
        None
    }
}
