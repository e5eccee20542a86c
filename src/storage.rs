//! # Snapshot Storage Module
//!
//! ## Purpose
//! Local persistence for the materialized combined dataset. Re-normalizing the
//! full corpus is expensive, so a successful cold build is written here and
//! later cold starts load it directly (the Combined Dataset Builder's fast
//! path).
//!
//! ## Input/Output Specification
//! - **Input**: Fully normalized dataset rows
//! - **Output**: Snapshot load/save/clear operations
//! - **Storage**: Sled embedded database with bincode serialization

use crate::errors::Result;
use crate::Dataset;
use serde::{Deserialize, Serialize};
use std::path::Path;

const SNAPSHOT_TREE: &str = "combined_dataset";
const SNAPSHOT_KEY: &[u8] = b"snapshot";

/// On-disk snapshot payload
#[derive(Serialize, Deserialize)]
struct Snapshot {
    created_at: chrono::DateTime<chrono::Utc>,
    dataset: Dataset,
}

/// Embedded store for the materialized dataset snapshot
pub struct SnapshotStore {
    tree: sled::Tree,
}

impl SnapshotStore {
    /// Open (or create) the snapshot database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = sled::open(path.as_ref())?;
        let tree = db.open_tree(SNAPSHOT_TREE)?;
        Ok(Self { tree })
    }

    /// Load the snapshot, if one has been written
    pub fn load(&self) -> Result<Option<Dataset>> {
        match self.tree.get(SNAPSHOT_KEY)? {
            Some(bytes) => {
                let snapshot: Snapshot = bincode::deserialize(&bytes)?;
                tracing::info!(
                    rows = snapshot.dataset.len(),
                    created_at = %snapshot.created_at,
                    "Loaded dataset snapshot"
                );
                Ok(Some(snapshot.dataset))
            }
            None => Ok(None),
        }
    }

    /// Persist a freshly built dataset, replacing any previous snapshot
    pub fn save(&self, dataset: &Dataset) -> Result<()> {
        let snapshot = Snapshot {
            created_at: chrono::Utc::now(),
            dataset: dataset.clone(),
        };
        let bytes = bincode::serialize(&snapshot)?;
        self.tree.insert(SNAPSHOT_KEY, bytes)?;
        self.tree.flush()?;
        tracing::info!(rows = dataset.len(), "Dataset snapshot written");
        Ok(())
    }

    /// Drop the stored snapshot
    pub fn clear(&self) -> Result<()> {
        self.tree.remove(SNAPSHOT_KEY)?;
        self.tree.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CaseRecord;

    fn sample_dataset() -> Dataset {
        Dataset::from_rows(vec![CaseRecord {
            case_id: "1975 INSC 1".to_string(),
            title: "A vs B".to_string(),
            judges: vec!["J1".to_string()],
            citation: Vec::new(),
            petitioner: vec!["A".to_string()],
            respondent: vec!["B".to_string()],
            decision_date: "1975-04-24".to_string(),
            disposal_nature: String::new(),
            available_languages: vec!["english".to_string()],
            path: "1975/a_vs_b.pdf".to_string(),
            court: String::new(),
            author_judge: Vec::new(),
            cnr: String::new(),
            description: String::new(),
            year: 1975,
        }])
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path().join("snapshot")).unwrap();

        assert!(store.load().unwrap().is_none());

        store.save(&sample_dataset()).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.rows()[0].case_id, "1975 INSC 1");
        assert_eq!(loaded.rows()[0].judges, vec!["J1"]);
    }

    #[test]
    fn test_clear_removes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path().join("snapshot")).unwrap();

        store.save(&sample_dataset()).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
