//! # Year Metadata Store
//!
//! ## Purpose
//! Fetches, validates, and caches one tabular metadata set per calendar year.
//! The wire format is a column-major JSON document (column name → array of
//! cells); it is validated into a [`YearlyMetadataSet`] and projected into
//! [`CaseRecord`] rows on demand.
//!
//! ## Input/Output Specification
//! - **Input**: Year number
//! - **Output**: `Some(YearlyMetadataSet)` or `None` (absent, unreachable, or
//!   malformed — the cause survives only in logs)
//! - **Caching**: one network fetch per year per TTL window (~1h), negative
//!   results included
//!
//! ## Key Features
//! - Ragged or non-tabular payloads rejected as malformed
//! - Immutable sets, replaced wholesale on expiry, never mutated in place
//! - Row projection applies all list-field normalization

use crate::cache::CacheManager;
use crate::client::StoreClient;
use crate::errors::{Result, RetrievalError};
use crate::normalize;
use crate::CaseRecord;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One year's tabular metadata, column-major
#[derive(Debug)]
pub struct YearlyMetadataSet {
    year: u16,
    columns: HashMap<String, Vec<Value>>,
    rows: usize,
}

impl YearlyMetadataSet {
    /// Validate a column-major JSON document into a metadata set.
    ///
    /// Every top-level value must be an array and all arrays must have the
    /// same length; anything else is a malformed payload.
    pub fn from_document(year: u16, document: Value) -> Result<Self> {
        let object = match document {
            Value::Object(map) => map,
            other => {
                return Err(RetrievalError::MalformedPayload {
                    payload_source: format!("metadata year={}", year),
                    details: format!("expected object, got {}", type_name(&other)),
                })
            }
        };

        let mut columns = HashMap::with_capacity(object.len());
        let mut rows: Option<usize> = None;

        for (name, value) in object {
            let cells = match value {
                Value::Array(cells) => cells,
                other => {
                    return Err(RetrievalError::MalformedPayload {
                        payload_source: format!("metadata year={}", year),
                        details: format!(
                            "column '{}' is {} instead of an array",
                            name,
                            type_name(&other)
                        ),
                    })
                }
            };

            match rows {
                None => rows = Some(cells.len()),
                Some(expected) if expected != cells.len() => {
                    return Err(RetrievalError::MalformedPayload {
                        payload_source: format!("metadata year={}", year),
                        details: format!(
                            "ragged columns: '{}' has {} cells, expected {}",
                            name,
                            cells.len(),
                            expected
                        ),
                    })
                }
                Some(_) => {}
            }

            columns.insert(name, cells);
        }

        Ok(Self {
            year,
            columns,
            rows: rows.unwrap_or(0),
        })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    /// Number of case rows in this set
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// All cells of one column, in row order
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// One cell, `Null` when the column is absent or the row out of range
    pub fn cell(&self, name: &str, row: usize) -> &Value {
        self.columns
            .get(name)
            .and_then(|cells| cells.get(row))
            .unwrap_or(&Value::Null)
    }

    fn cell_str(&self, name: &str, row: usize) -> String {
        match self.cell(name, row) {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Project one row into a fully normalized [`CaseRecord`].
    ///
    /// `resolved_year` is the year the record was actually found under, which
    /// may differ from the year the caller asked for.
    pub fn record(&self, row: usize, resolved_year: u16) -> CaseRecord {
        // Older partitions carry a singular `judge` column, newer ones `judges`
        let judge_cell = if self.has_column("judge") {
            self.cell("judge", row)
        } else {
            self.cell("judges", row)
        };

        CaseRecord {
            case_id: self.cell_str("case_id", row).trim().to_string(),
            title: self.cell_str("title", row),
            judges: normalize::normalize_judges(judge_cell),
            citation: normalize::normalize_list_field(self.cell("citation", row)),
            petitioner: normalize::normalize_list_field(self.cell("petitioner", row)),
            respondent: normalize::normalize_list_field(self.cell("respondent", row)),
            decision_date: self.cell_str("decision_date", row),
            disposal_nature: self.cell_str("disposal_nature", row),
            available_languages: normalize::normalize_list_field(
                self.cell("available_languages", row),
            ),
            path: self.cell_str("path", row),
            court: self.cell_str("court", row),
            author_judge: normalize::normalize_list_field(self.cell("author_judge", row)),
            cnr: self.cell_str("cnr", row),
            description: self.cell_str("description", row),
            year: resolved_year,
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Cached access to per-year metadata sets
pub struct MetadataStore {
    client: Arc<StoreClient>,
    caches: Arc<CacheManager>,
}

impl MetadataStore {
    pub fn new(client: Arc<StoreClient>, caches: Arc<CacheManager>) -> Self {
        Self { client, caches }
    }

    /// The metadata set for one year, fetched at most once per TTL window.
    ///
    /// Absent years, network failures, and malformed payloads all read as
    /// `None`; the distinction is logged and then discarded.
    pub async fn get_metadata(&self, year: u16) -> Option<Arc<YearlyMetadataSet>> {
        self.caches
            .metadata
            .get_or_compute(year, || async move {
                match self.fetch(year).await {
                    Ok(set) => {
                        tracing::debug!(year, rows = set.len(), "Fetched metadata set");
                        Some(Arc::new(set))
                    }
                    Err(e) => {
                        tracing::warn!(
                            year,
                            category = e.category(),
                            error = %e,
                            "Metadata fetch failed"
                        );
                        None
                    }
                }
            })
            .await
    }

    async fn fetch(&self, year: u16) -> Result<YearlyMetadataSet> {
        let document = self.client.fetch_metadata_document(year).await?;
        YearlyMetadataSet::from_document(year, document)
    }
}
