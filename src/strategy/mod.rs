//! Processing strategy module for ledger replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing both CSV parsing and ledger writes. This allows different
//! processing implementations (synchronous, asynchronous batch) to be selected
//! at runtime.

use crate::cli::StrategyType;
use crate::core::Ledger;
use crate::io::csv_format::write_wallets_csv;
use crate::types::WalletError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Replay a ledger entry file into a fresh ledger
    ///
    /// # Returns
    ///
    /// * `Ok(ledger)` once every record was replayed or rejected
    /// * `Err(WalletError)` if a fatal error occurred (file not found, I/O
    ///   error, runtime failure)
    ///
    /// Individual records that are malformed or rejected by the ledger are
    /// logged and skipped; they never make this method fail.
    fn replay(&self, input_path: &Path) -> Result<Arc<Ledger>, WalletError>;

    /// Replay a ledger entry file and write the resulting wallets as CSV
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), WalletError> {
        let ledger = self.replay(input_path)?;
        write_wallets_csv(&ledger.wallets(), output)
    }
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional configuration for async batch processing (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}
