//! Synchronous processing strategy
//!
//! Single-threaded replay: records are streamed from the file one at a time
//! through [`SyncReader`] and written to the ledger in file order.

use crate::core::Ledger;
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;
use crate::types::WalletError;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use wallet_funding_engine::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy;
/// strategy
///     .process(Path::new("entries.csv"), &mut io::stdout())
///     .expect("Replay failed");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn replay(&self, input_path: &Path) -> Result<Arc<Ledger>, WalletError> {
        let ledger = Ledger::new();
        let reader = SyncReader::new(input_path)?;

        for result in reader {
            match result {
                Ok(record) => {
                    let reference = record.request.reference.clone();
                    if let Err(e) = ledger.replay(record) {
                        warn!(%reference, error = %e, "entry rejected");
                    }
                }
                Err(e) => warn!(error = %e, "skipping ledger entry"),
            }
        }

        Ok(Arc::new(ledger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OwnerId;
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
    fn test_sync_strategy_writes_wallets() {
        let file = create_temp_csv(&format!(
            "{HEADER}p1,credit,success,100,A,,\np1,debit,success,40,B,,\np2,credit,success,200,C,,\n"
        ));

        let mut output = Vec::new();
        SyncProcessingStrategy
            .process(file.path(), &mut output)
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "owner,balance,currency\np1,60.00,NGN\np2,200.00,NGN\n"
        );
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let err = SyncProcessingStrategy
            .replay(Path::new("nonexistent.csv"))
            .unwrap_err();
        assert!(matches!(err, WalletError::IoError { .. }));
    }

    #[test]
    fn test_sync_strategy_continues_on_rejected_records() {
        let file = create_temp_csv(&format!(
            "{HEADER}p1,credit,success,100,A,,\n\
             p1,credit,success,100,A,,\n\
             p1,debit,success,500,B,,\n\
             p1,bogus,success,1,C,,\n\
             p1,debit,success,25,D,,\n"
        ));

        let ledger = SyncProcessingStrategy.replay(file.path()).unwrap();
        assert_eq!(ledger.get_balance(&OwnerId::from("p1")), dec!(75));
        assert!(ledger.audit(&OwnerId::from("p1")).is_ok());
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
