//! Wallet Funding Engine CLI
//!
//! # Usage
//!
//! ```bash
//! cargo run -- quote --rules charges.csv --amount 10000
//! cargo run -- replay --strategy sync entries.csv > wallets.csv
//! cargo run -- replay --strategy async --batch-size 2000 --max-concurrent 8 entries.csv
//! cargo run -- stats entries.csv --owner parent-1 --year 2024
//! WALLET_GATEWAY_SECRET=sk_test_xxx cargo run -- fund --owner parent-1 --amount 5000
//! WALLET_GATEWAY_SECRET=sk_test_xxx cargo run -- reconcile --reference FUND-...
//! ```
//!
//! Results go to stdout; logs go to stderr when `--log-level` is given.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, invalid amount, provider unavailable, etc.)

use std::process;
use wallet_funding_engine::cli;

fn main() {
    let args = cli::parse_args();
    if let Some(log_level) = args.log_level {
        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();
    }

    let mut output = std::io::stdout();
    if let Err(e) = cli::run(args, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
