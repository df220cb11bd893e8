//! Payment Streams CLI
//!
//! Replays a CSV journal of stream operations and outputs the final party
//! balances, or the outstanding streams with `--streams`.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- journal.csv > balances.csv
//! cargo run -- journal.csv --streams > streams.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug`, `info` or `warn` to control logging verbosity

use payment_streams::{EngineError, Result, StreamProcessor};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let show_streams = args.iter().any(|a| a == "--streams");
    let input_path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .ok_or(EngineError::MissingArgument)?;

    let file = File::open(input_path)?;
    let reader = BufReader::new(file);

    let mut processor = StreamProcessor::new();
    processor.process_csv(reader)?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    if show_streams {
        processor.write_streams(handle)?;
    } else {
        processor.write_balances(handle)?;
    }

    Ok(())
}
