//! Durable storage for pending funding attempts
//!
//! Two implementations of [`PendingFundingAttemptStore`]:
//!
//! - [`InMemoryPendingStore`]: process-local, for tests and short-lived tools
//! - [`FilePendingStore`]: one JSON document per attempt at
//!   `<dir>/<reference>.json`, replaced atomically on every write

use crate::core::traits::PendingFundingAttemptStore;
use crate::types::{PendingFundingAttempt, Reference, WalletError};
use dashmap::DashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const EXTENSION: &str = "json";

/// Pending attempts held in memory
#[derive(Debug, Default)]
pub struct InMemoryPendingStore {
    attempts: DashMap<Reference, PendingFundingAttempt>,
}

impl InMemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingFundingAttemptStore for InMemoryPendingStore {
    fn put(&self, attempt: &PendingFundingAttempt) -> Result<(), WalletError> {
        self.attempts
            .insert(attempt.reference.clone(), attempt.clone());
        Ok(())
    }

    fn get(&self, reference: &Reference) -> Result<Option<PendingFundingAttempt>, WalletError> {
        Ok(self.attempts.get(reference).map(|entry| entry.clone()))
    }

    fn delete(&self, reference: &Reference) -> Result<bool, WalletError> {
        Ok(self.attempts.remove(reference).is_some())
    }

    fn list(&self) -> Result<Vec<PendingFundingAttempt>, WalletError> {
        let mut attempts: Vec<PendingFundingAttempt> = self
            .attempts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        attempts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(attempts)
    }
}

/// Pending attempts stored as JSON files in a directory
///
/// A write goes to a temporary file in the same directory which is then
/// renamed over the target, so readers never see a partial document.
#[derive(Debug, Clone)]
pub struct FilePendingStore {
    dir: PathBuf,
}

impl FilePendingStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, WalletError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, reference: &Reference) -> Result<PathBuf, WalletError> {
        let name = reference.as_str();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(WalletError::storage(format!(
                "reference '{}' cannot be used as a file name",
                name
            )));
        }
        Ok(self.dir.join(format!("{}.{}", name, EXTENSION)))
    }

    fn read(path: &Path) -> Result<PendingFundingAttempt, WalletError> {
        let contents = fs::read(path)?;
        Ok(serde_json::from_slice(&contents)?)
    }
}

impl PendingFundingAttemptStore for FilePendingStore {
    fn put(&self, attempt: &PendingFundingAttempt) -> Result<(), WalletError> {
        let path = self.path_for(&attempt.reference)?;
        let json = serde_json::to_vec_pretty(attempt)?;

        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(&json)?;
        file.as_file().sync_all()?;
        file.persist(&path)
            .map_err(|err| WalletError::storage(err.error))?;

        debug!(reference = %attempt.reference, path = %path.display(), "pending attempt stored");
        Ok(())
    }

    fn get(&self, reference: &Reference) -> Result<Option<PendingFundingAttempt>, WalletError> {
        let path = self.path_for(reference)?;
        match fs::read(&path) {
            Ok(contents) => Ok(Some(serde_json::from_slice(&contents)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn delete(&self, reference: &Reference) -> Result<bool, WalletError> {
        let path = self.path_for(reference)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn list(&self) -> Result<Vec<PendingFundingAttempt>, WalletError> {
        let mut attempts = Vec::new();

        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }

            match Self::read(&path) {
                Ok(attempt) => attempts.push(attempt),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable pending attempt");
                }
            }
        }

        attempts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OwnerId;
    use chrono::{Duration, Utc};
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn attempt(reference: &str, age_minutes: i64) -> PendingFundingAttempt {
        PendingFundingAttempt {
            reference: Reference::from(reference),
            owner_id: OwnerId::from("parent-1"),
            amount: dec!(10000),
            fee: dec!(150),
            authorization_url: Some("https://checkout.example/abc".to_string()),
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    fn exercise_store(store: &dyn PendingFundingAttemptStore) {
        let first = attempt("FUND-1", 10);
        let second = attempt("FUND-2", 5);

        store.put(&second).unwrap();
        store.put(&first).unwrap();

        assert_eq!(store.get(&first.reference).unwrap(), Some(first.clone()));
        assert_eq!(store.get(&Reference::from("FUND-9")).unwrap(), None);

        let listed = store.list().unwrap();
        assert_eq!(listed, vec![first.clone(), second.clone()]);

        assert!(store.delete(&first.reference).unwrap());
        assert!(!store.delete(&first.reference).unwrap());
        assert_eq!(store.list().unwrap(), vec![second]);
    }

    #[test]
    fn test_in_memory_store() {
        exercise_store(&InMemoryPendingStore::new());
    }

    #[test]
    fn test_file_store() {
        let dir = TempDir::new().unwrap();
        exercise_store(&FilePendingStore::open(dir.path()).unwrap());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let stored = attempt("FUND-1", 0);

        FilePendingStore::open(dir.path())
            .unwrap()
            .put(&stored)
            .unwrap();

        let reopened = FilePendingStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(&stored.reference).unwrap(), Some(stored));
        assert!(dir.path().join("FUND-1.json").exists());
    }

    #[test]
    fn test_put_overwrites_existing_attempt() {
        let dir = TempDir::new().unwrap();
        let store = FilePendingStore::open(dir.path()).unwrap();
        let mut stored = attempt("FUND-1", 0);
        store.put(&stored).unwrap();

        stored.authorization_url = None;
        store.put(&stored).unwrap();

        assert_eq!(store.get(&stored.reference).unwrap(), Some(stored));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_skips_corrupt_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = FilePendingStore::open(dir.path()).unwrap();
        store.put(&attempt("FUND-1", 0)).unwrap();
        fs::write(dir.path().join("FUND-2.json"), b"{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].reference, Reference::from("FUND-1"));
    }

    #[rstest]
    #[case::path_traversal("../escape")]
    #[case::separator("a/b")]
    #[case::empty("")]
    fn test_unsafe_references_are_rejected(#[case] reference: &str) {
        let dir = TempDir::new().unwrap();
        let store = FilePendingStore::open(dir.path()).unwrap();
        let result = store.get(&Reference::from(reference));
        assert!(matches!(result, Err(WalletError::StorageError { .. })));
    }
}
