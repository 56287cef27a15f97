//! Asynchronous batch processing strategy
//!
//! Replays a ledger entry file batch by batch on a tokio multi-threaded
//! runtime. Within a batch, records are partitioned by owner and owners are
//! replayed concurrently; batches themselves run one after another so that an
//! owner's records spanning two batches keep their order.

use crate::core::{BatchProcessor, Ledger};
use crate::io::async_reader::AsyncReader;
use crate::strategy::ProcessingStrategy;
use crate::types::WalletError;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for batch processing
///
/// Controls how records are batched and the number of worker threads used
/// within each batch.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Number of records per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults with a warning.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                "Invalid batch_size ({}), using default ({})",
                batch_size, default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                "Invalid max_concurrent_batches ({}), using default ({})",
                max_concurrent_batches, default.max_concurrent_batches
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay the file on a dedicated tokio runtime
    ///
    /// 1. Creates a multi-threaded runtime with the configured worker count
    /// 2. Reads records in batches through `AsyncReader`
    /// 3. Replays each batch with a `BatchProcessor`, waiting for it to finish
    ///    before reading the next one
    fn replay(&self, input_path: &Path) -> Result<Arc<Ledger>, WalletError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .enable_time()
            .build()
            .map_err(|e| WalletError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(async {
            let ledger = Arc::new(Ledger::new());
            let processor = BatchProcessor::new(Arc::clone(&ledger));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| WalletError::IoError {
                    message: format!("Failed to open file '{}': {}", input_path.display(), e),
                })?;

            // Wrap tokio file in a compatibility layer for csv-async
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                let results = processor.process_batch(batch).await;
                let rejected = results.iter().filter(|r| r.result.is_err()).count();
                debug!(records = results.len(), rejected, "batch replayed");
            }

            Ok(ledger)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OwnerId;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "owner,category,status,amount,reference,description,created_at\n";

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_async_strategy_writes_wallets() {
        let file = create_temp_csv(&format!(
            "{HEADER}p2,credit,success,200,C,,\np1,credit,success,100,A,,\np1,debit,success,40,B,,\n"
        ));

        let strategy = AsyncProcessingStrategy::new(BatchConfig::default());
        let mut output = Vec::new();
        strategy.process(file.path(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "owner,balance,currency\np1,60.00,NGN\np2,200.00,NGN\n"
        );
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default());
        let err = strategy.replay(Path::new("nonexistent.csv")).unwrap_err();
        assert!(err.to_string().contains("Failed to open file"));
    }

    #[test]
    fn test_async_strategy_maintains_ordering_across_batches() {
        let file = create_temp_csv(&format!(
            "{HEADER}p1,credit,success,100,A,,\n\
             p2,credit,success,50,B,,\n\
             p1,debit,success,30,C,,\n\
             p2,credit,success,25,D,,\n\
             p1,debit,success,70,E,,\n"
        ));

        // A batch size of 2 spreads p1's records over three batches.
        let strategy = AsyncProcessingStrategy::new(BatchConfig::new(2, 2));
        let ledger = strategy.replay(file.path()).unwrap();

        assert_eq!(ledger.get_balance(&OwnerId::from("p1")), dec!(0));
        assert_eq!(ledger.get_balance(&OwnerId::from("p2")), dec!(75));
    }

    #[rstest]
    #[case::valid(500, 4, 500, 4)]
    #[case::zero_batch_size(0, 4, 1000, 4)]
    #[case::zero_workers(500, 0, 500, num_cpus::get())]
    fn test_batch_config_validation(
        #[case] batch_size: usize,
        #[case] workers: usize,
        #[case] expected_batch_size: usize,
        #[case] expected_workers: usize,
    ) {
        let config = BatchConfig::new(batch_size, workers);
        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_workers);
    }
}
