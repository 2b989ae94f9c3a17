//! Ordered collection of diet entries with optional JSON persistence.
//!
//! The store does not enforce fingerprint uniqueness. Deduplication is the
//! capture coordinator's job; the store simply remembers what it is given.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::fingerprint::Fingerprint;
use crate::types::DietEntry;

#[derive(Debug, Default)]
pub struct DietEntryStore {
    entries: Vec<DietEntry>,
    path: Option<PathBuf>,
}

impl DietEntryStore {
    /// A store with no backing file.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the snapshot at `path`, or start empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&content)?
        } else {
            Vec::new()
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "opened diet store");
        Ok(Self {
            entries,
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// First entry with the given fingerprint, if any.
    pub fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Option<&DietEntry> {
        self.entries.iter().find(|e| &e.fingerprint == fingerprint)
    }

    /// Add an entry in memory only. Duplicates are accepted.
    pub fn append(&mut self, entry: DietEntry) {
        self.entries.push(entry);
    }

    /// Persist the store with `entry` added, then add it in memory.
    ///
    /// If writing the snapshot fails the in-memory collection is left as it was.
    pub fn commit(&mut self, entry: DietEntry) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            let mut snapshot: Vec<&DietEntry> = self.entries.iter().collect();
            snapshot.push(&entry);
            write_snapshot(path, &snapshot)?;
        }
        self.append(entry);
        Ok(())
    }

    pub fn all(&self) -> &[DietEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Write to a sibling temp file and rename over the target.
fn write_snapshot(path: &Path, entries: &[&DietEntry]) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let json = serde_json::to_string_pretty(entries)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use crate::types::AnalysisSummary;
    use chrono::Utc;
    use uuid::Uuid;

    fn entry(title: &str, bytes: &[u8]) -> DietEntry {
        DietEntry {
            id: Uuid::new_v4(),
            image_location: PathBuf::from(format!("/photos/{}.jpg", title)),
            fingerprint: fingerprint(bytes),
            title: title.to_string(),
            captured_at: Utc::now(),
            analysis: AnalysisSummary::default(),
        }
    }

    #[test]
    fn test_find_by_fingerprint() {
        let mut store = DietEntryStore::in_memory();
        store.append(entry("lunch", b"lunch"));
        store.append(entry("dinner", b"dinner"));

        let found = store.find_by_fingerprint(&fingerprint(b"dinner")).unwrap();
        assert_eq!(found.title, "dinner");
        assert!(store.find_by_fingerprint(&fingerprint(b"breakfast")).is_none());
    }

    #[test]
    fn test_duplicates_are_accepted_and_first_wins() {
        let mut store = DietEntryStore::in_memory();
        store.append(entry("first", b"same"));
        store.append(entry("second", b"same"));

        assert_eq!(store.len(), 2);
        let found = store.find_by_fingerprint(&fingerprint(b"same")).unwrap();
        assert_eq!(found.title, "first");
    }

    #[test]
    fn test_all_preserves_insertion_order() {
        let mut store = DietEntryStore::in_memory();
        for title in ["a", "b", "c"] {
            store.append(entry(title, title.as_bytes()));
        }
        let titles: Vec<_> = store.all().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_commit_persists_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("diets.json");

        let mut store = DietEntryStore::open(&path).unwrap();
        assert!(store.is_empty());
        let lunch = entry("lunch", b"lunch");
        store.commit(lunch.clone()).unwrap();

        let reopened = DietEntryStore::open(&path).unwrap();
        assert_eq!(reopened.all(), &[lunch]);
    }

    #[test]
    fn test_failed_commit_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the snapshot file should be makes the rename fail
        let path = dir.path().join("diets.json");
        std::fs::create_dir_all(path.join("blocker")).unwrap();

        let mut store = DietEntryStore {
            entries: Vec::new(),
            path: Some(path),
        };
        let result = store.commit(entry("lunch", b"lunch"));

        assert!(matches!(result, Err(StoreError::Write { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn test_open_rejects_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diets.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            DietEntryStore::open(&path),
            Err(StoreError::InvalidJson(_))
        ));
    }
}
