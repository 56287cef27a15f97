//! Batch replay with owner-based partitioning
//!
//! This module provides the `BatchProcessor` struct, which replays batches of
//! ledger entry records into a shared [`Ledger`], processing different owners
//! concurrently while keeping each owner's records in file order.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── Arc<Ledger>  (per-owner locking, shared across tasks)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::ledger::Ledger;
use crate::types::{EntryRecord, OwnerId, Transaction, WalletError};
use tracing::{debug, error};

/// Result of replaying a single record
#[derive(Debug, Clone)]
pub struct ReplayResult {
    /// The record that was replayed
    pub record: EntryRecord,

    /// The entry written, or why the record was rejected
    pub result: Result<Transaction, WalletError>,
}

/// Batch processor with owner-based partitioning
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    ledger: Arc<Ledger>,
}

impl BatchProcessor {
    /// Create a new BatchProcessor over a shared ledger
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Partition a batch of records by owner
    ///
    /// # Guarantees
    ///
    /// - Each record appears in exactly one sub-batch
    /// - Records for each owner keep their original order
    pub fn partition_by_owner(&self, batch: Vec<EntryRecord>) -> HashMap<OwnerId, Vec<EntryRecord>> {
        let mut owner_batches: HashMap<OwnerId, Vec<EntryRecord>> = HashMap::new();

        for record in batch {
            owner_batches
                .entry(record.owner_id().clone())
                .or_default()
                .push(record);
        }

        owner_batches
    }

    /// Replay all records of one owner in order
    ///
    /// Rejected records are captured in the results and do not stop the
    /// remaining ones.
    pub async fn process_owner_records(&self, records: Vec<EntryRecord>) -> Vec<ReplayResult> {
        let mut results = Vec::with_capacity(records.len());

        for record in records {
            let result = self.ledger.replay(record.clone());
            if let Err(e) = &result {
                debug!(reference = %record.request.reference, error = %e, "entry rejected");
            }
            results.push(ReplayResult { record, result });
        }

        results
    }

    /// Replay a batch, one tokio task per owner
    ///
    /// Results are grouped by owner; their order across owners is not
    /// specified.
    pub async fn process_batch(&self, batch: Vec<EntryRecord>) -> Vec<ReplayResult> {
        let owner_batches = self.partition_by_owner(batch);

        let mut tasks = Vec::with_capacity(owner_batches.len());
        for (_owner, records) in owner_batches {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_owner_records(records).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(owner_results) => results.extend(owner_results),
                Err(e) => error!(error = %e, "replay task panicked"),
            }
        }

        results
    }
}
