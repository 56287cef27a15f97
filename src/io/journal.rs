//! Append-only ledger entry file
//!
//! `CsvEntryJournal` appends settled entries to a ledger entry file in the
//! same column layout the replay readers consume, so the file can be replayed
//! to rebuild every wallet. A funding attempt typically shows up twice: once
//! as `pending` when it starts, once as `success` or `failed` when it
//! settles. Replay folds both lines into one entry.

use crate::core::traits::EntryJournal;
use crate::types::{Transaction, WalletError};
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Column header of ledger entry files
pub const ENTRY_HEADER: [&str; 7] = [
    "owner",
    "category",
    "status",
    "amount",
    "reference",
    "description",
    "created_at",
];

/// Ledger entry file that settled entries are appended to
#[derive(Debug)]
pub struct CsvEntryJournal {
    path: PathBuf,
    /// Serializes appends from concurrent verifications
    lock: Mutex<()>,
}

impl CsvEntryJournal {
    /// Use `path` as the journal; the file is created on the first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, error: impl std::fmt::Display) -> WalletError {
        WalletError::IoError {
            message: format!("Failed to append to ledger '{}': {}", self.path.display(), error),
        }
    }
}

impl EntryJournal for CsvEntryJournal {
    /// Append one entry and sync it to disk
    fn record(&self, entry: &Transaction) -> Result<(), WalletError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| WalletError::storage("ledger journal lock poisoned"))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;
        let needs_header = file.metadata().map_err(|e| self.write_error(e))?.len() == 0;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer
                .write_record(ENTRY_HEADER)
                .map_err(|e| self.write_error(e))?;
        }
        writer
            .write_record([
                entry.owner_id.as_str(),
                entry.category.to_string().as_str(),
                entry.status.to_string().as_str(),
                entry.amount.to_string().as_str(),
                entry.reference.as_str(),
                entry.description.as_str(),
                entry.created_at.to_rfc3339().as_str(),
            ])
            .map_err(|e| self.write_error(e))?;
        writer.flush().map_err(|e| self.write_error(e))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| self.write_error(e))?;

        debug!(reference = %entry.reference, status = %entry.status, "entry journaled");
        Ok(())
    }
}
