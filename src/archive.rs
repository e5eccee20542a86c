//! # Archive Retriever
//!
//! ## Purpose
//! Downloads one compressed archive shard and extracts a single member's
//! bytes. Shards are tar archives, usually gzip-compressed; compression is
//! sniffed from magic bytes, mirroring the store's mixed publication history.
//!
//! ## Input/Output Specification
//! - **Input**: Year, language, shard name, target filename
//! - **Output**: Raw document bytes, or `None`
//! - **Failure policy**: download and extraction failures are logged and
//!   converted to `None`, never propagated
//!
//! ## Key Features
//! - Full member list scanned before concluding absence
//! - Suffix-tolerant member matching (`.pdf`, `_EN.pdf`, path containment)
//! - Decompression and scanning run on a blocking thread

use crate::client::StoreClient;
use crate::errors::{Result, RetrievalError};
use flate2::read::GzDecoder;
use std::io::Read;
use std::sync::Arc;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Downloads shards and extracts single documents from them
pub struct ShardRetriever {
    client: Arc<StoreClient>,
}

impl ShardRetriever {
    pub fn new(client: Arc<StoreClient>) -> Self {
        Self { client }
    }

    /// Download `shard_name` and return the bytes of the member matching
    /// `filename`. Every failure mode reads as `None`.
    pub async fn extract(
        &self,
        year: u16,
        shard_name: &str,
        filename: &str,
        language: &str,
    ) -> Option<Vec<u8>> {
        match self.try_extract(year, shard_name, filename, language).await {
            Ok(bytes) => {
                tracing::debug!(
                    year,
                    shard = shard_name,
                    filename,
                    size = bytes.len(),
                    "Extracted document from shard"
                );
                Some(bytes)
            }
            Err(e) => {
                tracing::warn!(
                    year,
                    shard = shard_name,
                    filename,
                    category = e.category(),
                    error = %e,
                    "Shard extraction failed"
                );
                None
            }
        }
    }

    async fn try_extract(
        &self,
        year: u16,
        shard_name: &str,
        filename: &str,
        language: &str,
    ) -> Result<Vec<u8>> {
        let shard_bytes = self
            .client
            .download_shard(year, language, shard_name)
            .await?;

        let filename = filename.to_string();
        let shard_label = shard_name.to_string();
        let shard_name = shard_name.to_string();

        // Decompression and the member scan are CPU-bound
        tokio::task::spawn_blocking(move || extract_member(&shard_bytes, &filename, &shard_name))
            .await
            .map_err(|e| RetrievalError::Archive {
                shard: shard_label,
                details: format!("extraction task failed: {}", e),
            })?
    }
}

/// Scan a tar (plain or gzipped) for the first member matching `filename`
fn extract_member(shard_bytes: &[u8], filename: &str, shard_name: &str) -> Result<Vec<u8>> {
    let reader: Box<dyn Read + '_> = if shard_bytes.starts_with(&GZIP_MAGIC) {
        Box::new(GzDecoder::new(shard_bytes))
    } else {
        Box::new(shard_bytes)
    };

    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|e| archive_error(shard_name, &e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| archive_error(shard_name, &e))?;
        let member_name = entry
            .path()
            .map_err(|e| archive_error(shard_name, &e))?
            .to_string_lossy()
            .into_owned();

        if member_matches(&member_name, filename) {
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| archive_error(shard_name, &e))?;
            return Ok(bytes);
        }
    }

    Err(RetrievalError::NotFoundInSource {
        resource: format!("member '{}' in shard {}", filename, shard_name),
    })
}

/// Member matching fallback chain: suffix matches on the raw name, `.pdf`,
/// and `_EN.pdf` forms, plus substring containment when the target carries
/// its own path segments.
fn member_matches(member: &str, filename: &str) -> bool {
    if member.ends_with(filename)
        || member.ends_with(&format!("{}.pdf", filename))
        || member.ends_with(&format!("{}_EN.pdf", filename))
    {
        return true;
    }

    filename.contains('/')
        && (member.contains(filename)
            || member.contains(&format!("{}.pdf", filename))
            || member.contains(&format!("{}_EN.pdf", filename)))
}

fn archive_error(shard: &str, e: &dyn std::fmt::Display) -> RetrievalError {
    RetrievalError::Archive {
        shard: shard.to_string(),
        details: e.to_string(),
    }
}
