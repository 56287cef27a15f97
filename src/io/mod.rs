//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, charge rules, wallet output)
//! - `sync_reader` - Synchronous CSV reader with iterator interface
//! - `async_reader` - Asynchronous CSV reader with batch reading interface
//! - `journal` - Append-only ledger entry file for settled funding entries

pub mod async_reader;
pub mod csv_format;
pub mod journal;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_charge_rule_record, convert_csv_record, read_charge_rules, write_wallets_csv,
    ChargeRuleCsvRecord, CsvRecord,
};
pub use journal::{CsvEntryJournal, ENTRY_HEADER};
pub use sync_reader::SyncReader;
