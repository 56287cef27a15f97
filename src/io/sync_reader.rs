//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over ledger entry records from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<EntryRecord, WalletError>` for each CSV row:
//!
//! ```no_run
//! use wallet_funding_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("entries.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(record) => println!("Replaying entry: {:?}", record),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record errors are yielded as Err variants carrying the line
//!   number

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{EntryRecord, WalletError};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV reader
///
/// Reads one record at a time; memory use does not grow with the file.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader trims whitespace from all fields and accepts rows
    /// without the trailing optional columns.
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if file opened successfully
    /// * `Err(WalletError::IoError)` if file could not be opened
    pub fn new(path: &Path) -> Result<Self, WalletError> {
        let file = File::open(path).map_err(|e| WalletError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<EntryRecord, WalletError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let row = deserializer.next()?;
        self.line_num += 1;

        let line = self.line_num;
        Some(
            row.map_err(WalletError::from)
                .and_then(convert_csv_record)
                .map_err(|e| match e {
                    WalletError::ParseError { line: None, message } => WalletError::ParseError {
                        line: Some(line),
                        message,
                    },
                    other => other,
                }),
        )
    }
}
