//! Journal replay host.
//!
//! Plays the role of the transaction host around a [`StreamEngine`]: it
//! reads operations from CSV in order, advances the clock to each row's time,
//! authenticates the caller, and applies the row as one atomic unit. Rejected
//! rows are logged and skipped without affecting later rows, including the
//! clock: only an applied row moves time forward.

use crate::clock::{Clock, ManualClock};
use crate::custody::Ledger;
use crate::engine::StreamEngine;
use crate::error::{EngineError, Result};
use crate::stream::StreamStatus;
use crate::transaction::{OpKind, OperationRecord, ParsedOperation};
use crate::{Decimal4, PartyId};
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use serde::Serialize;
use std::io::{Read, Write};

/// One line of the `--streams` report.
#[derive(Debug, Serialize)]
struct StreamRow {
    sender: PartyId,
    receiver: PartyId,
    status: StreamStatus,
    start_time: u64,
    duration: u64,
    escrowed: Decimal4,
}

/// Replays operation journals against an in-memory ledger.
pub struct StreamProcessor {
    engine: StreamEngine<Ledger, ManualClock>,
}

impl StreamProcessor {
    /// Creates a processor with an empty ledger and the clock at zero.
    pub fn new() -> Self {
        StreamProcessor {
            engine: StreamEngine::new(Ledger::new(), ManualClock::new(0)),
        }
    }

    pub fn engine(&self) -> &StreamEngine<Ledger, ManualClock> {
        &self.engine
    }

    /// Processes operations from a CSV reader in streaming fashion.
    ///
    /// Records are read one at a time. Invalid or rejected records are logged
    /// at warn level and skipped.
    pub fn process_csv<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        for (row_idx, result) in csv_reader.deserialize::<OperationRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            match result {
                Ok(record) => {
                    if let Some(op) = record.parse() {
                        if let Err(e) = self.process_operation(op, row_num) {
                            warn!("Row {}: {}", row_num, e);
                        }
                    } else {
                        warn!("Row {}: Failed to parse operation record", row_num);
                    }
                }
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                }
            }
        }

        Ok(())
    }

    /// Applies a single parsed operation.
    ///
    /// The clock is set to the row's time while the operation runs and is
    /// restored if the operation is rejected.
    pub fn process_operation(&mut self, op: ParsedOperation, row: usize) -> Result<()> {
        let previous = self.engine.clock().now();
        self.engine.clock_mut().set(op.time)?;

        let result = self.apply_operation(op, row);
        if result.is_err() {
            *self.engine.clock_mut() = ManualClock::new(previous);
        }
        result
    }

    fn apply_operation(&mut self, op: ParsedOperation, row: usize) -> Result<()> {
        let caller = op.caller;

        match op.kind {
            OpKind::Fund(amount) => {
                self.engine.custody_mut().fund(caller, amount)?;
            }
            OpKind::Create {
                sender,
                receiver,
                amount,
                duration,
            } => {
                authorize(caller, sender, "fund")?;
                self.engine
                    .create_stream(sender, receiver, amount, duration)?;
            }
            OpKind::Accept { sender, receiver } => {
                authorize(caller, receiver, "accept")?;
                self.engine.accept_stream(receiver, sender)?;
            }
            OpKind::Claim { sender, receiver } => {
                let paid = self.engine.claim_stream(receiver, sender)?;
                debug!(
                    "Row {}: Claim by {} paid {} to {}",
                    row, caller, paid, receiver
                );
            }
            OpKind::Cancel { sender, receiver } => {
                let settlement = self.engine.cancel_stream(caller, sender, receiver)?;
                debug!(
                    "Row {}: Cancel by {} paid {} to {}, refunded {} to {}",
                    row,
                    caller,
                    settlement.paid_to_receiver,
                    receiver,
                    settlement.refunded_to_sender,
                    sender
                );
            }
        }

        Ok(())
    }

    /// Writes every party's free balance as CSV, sorted by party ID.
    pub fn write_balances<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["party", "balance"])?;
        for (party, balance) in self.engine.custody().balances() {
            csv_writer.write_record([party.to_string(), balance.to_string()])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes outstanding streams as CSV, sorted by (sender, receiver).
    pub fn write_streams<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let streams = self.engine.store().streams();
        if streams.is_empty() {
            csv_writer.write_record([
                "sender",
                "receiver",
                "status",
                "start_time",
                "duration",
                "escrowed",
            ])?;
        }

        for stream in streams {
            csv_writer.serialize(StreamRow {
                sender: stream.sender,
                receiver: stream.receiver,
                status: stream.status(),
                start_time: stream.start_time(),
                duration: stream.duration_seconds,
                escrowed: stream.escrowed_value,
            })?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

impl Default for StreamProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Host-level check that the authenticated caller is the expected party.
fn authorize(caller: PartyId, expected: PartyId, action: &'static str) -> Result<()> {
    if caller != expected {
        return Err(EngineError::Unauthorized { caller, action });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::Custody;
    use std::io::Cursor;
    use std::str::FromStr;

    fn process_csv_str(csv: &str) -> StreamProcessor {
        let mut processor = StreamProcessor::new();
        processor.process_csv(Cursor::new(csv)).unwrap();
        processor
    }

    fn balance(processor: &StreamProcessor, party: PartyId) -> String {
        processor.engine().custody().balance_of(party).to_string()
    }

    #[test]
    fn test_fund_and_create() {
        let csv = r#"type,time,caller,sender,receiver,amount,duration
fund,0,1,,,1000.0,
create,0,1,1,2,400.0,100"#;

        let processor = process_csv_str(csv);
        assert_eq!(balance(&processor, 1), "600.0000");
        let info = processor.engine().get_stream(1, 2).unwrap();
        assert_eq!(info.escrowed_value.to_string(), "400.0000");
        assert_eq!(info.status, StreamStatus::Pending);
    }

    #[test]
    fn test_create_by_non_sender_is_rejected() {
        let csv = r#"type,time,caller,sender,receiver,amount,duration
fund,0,1,,,1000.0,
create,0,2,1,2,400.0,100"#;

        let processor = process_csv_str(csv);
        assert_eq!(balance(&processor, 1), "1000.0000");
        assert!(processor.engine().get_stream(1, 2).is_err());
    }

    #[test]
    fn test_accept_by_non_receiver_is_rejected() {
        let csv = r#"type,time,caller,sender,receiver,amount,duration
fund,0,1,,,100,
create,0,1,1,2,100,10
accept,1,1,1,2,,"#;

        let processor = process_csv_str(csv);
        let info = processor.engine().get_stream(1, 2).unwrap();
        assert_eq!(info.status, StreamStatus::Pending);
    }

    #[test]
    fn test_full_lifecycle() {
        let csv = r#"type,time,caller,sender,receiver,amount,duration
fund,0,1,,,1000,
create,0,1,1,2,1000,1000
accept,0,2,1,2,,
claim,400,2,1,2,,
claim,700,2,1,2,,
cancel,800,1,1,2,,"#;

        let processor = process_csv_str(csv);
        assert_eq!(balance(&processor, 2), "800.0000");
        assert_eq!(balance(&processor, 1), "200.0000");
        assert!(processor.engine().streams_of(1).is_empty());
    }

    #[test]
    fn test_time_regression_row_is_skipped() {
        let csv = r#"type,time,caller,sender,receiver,amount,duration
fund,10,1,,,100,
fund,5,1,,,100,
fund,10,1,,,1,"#;

        let processor = process_csv_str(csv);
        assert_eq!(balance(&processor, 1), "101.0000");
    }

    #[test]
    fn test_rejected_row_does_not_advance_clock() {
        let csv = r#"type,time,caller,sender,receiver,amount,duration
fund,0,1,,,100,
create,100,2,1,2,50,10
create,50,1,1,2,50,10"#;

        let processor = process_csv_str(csv);
        assert_eq!(processor.engine().clock().now(), 50);
        assert_eq!(balance(&processor, 1), "50.0000");
        let info = processor.engine().get_stream(1, 2).unwrap();
        assert_eq!(info.escrowed_value.to_string(), "50.0000");
    }

    #[test]
    fn test_overflowing_fund_row_is_skipped() {
        let max = "79228162514264337593543950335";
        let csv = format!(
            "type,time,caller,sender,receiver,amount,duration\n\
             fund,0,1,,,{max},\n\
             fund,0,1,,,{max},\n\
             create,1,1,1,2,100,10\n",
            max = max
        );

        let processor = process_csv_str(&csv);
        let expected = Decimal4::from_str(max).unwrap() - Decimal4::from_units(100);
        assert_eq!(processor.engine().custody().balance_of(1), expected);
        assert_eq!(processor.engine().clock().now(), 1);
        assert!(processor.engine().get_stream(1, 2).is_ok());
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let csv = r#"type,time,caller,sender,receiver,amount,duration
fund,0,1,,,abc,
teleport,0,1,1,2,5,5
create,0,1,1,2,,10
fund,0,1,,,7,"#;

        let processor = process_csv_str(csv);
        assert_eq!(balance(&processor, 1), "7.0000");
        assert!(processor.engine().store().account(1).is_err());
    }

    #[test]
    fn test_whitespace_handling() {
        let csv = r#"type, time, caller, sender, receiver, amount, duration
fund, 0, 1, , , 50.5,
create, 0, 1, 1, 2, 50.5, 5"#;

        let processor = process_csv_str(csv);
        assert_eq!(
            processor.engine().get_stream(1, 2).unwrap().escrowed_value,
            Decimal4::from_str("50.5").unwrap()
        );
    }

    #[test]
    fn test_balances_output_format() {
        let csv = r#"type,time,caller,sender,receiver,amount,duration
fund,0,2,,,2.0,
fund,0,1,,,1.0,"#;

        let processor = process_csv_str(csv);
        let mut output = Vec::new();
        processor.write_balances(&mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(output_str, "party,balance\n1,1.0000\n2,2.0000\n");
    }

    #[test]
    fn test_streams_output_format() {
        let csv = r#"type,time,caller,sender,receiver,amount,duration
fund,0,1,,,100,
create,0,1,1,3,40,20
create,0,1,1,2,60,30
accept,5,2,1,2,,"#;

        let processor = process_csv_str(csv);
        let mut output = Vec::new();
        processor.write_streams(&mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(
            output_str,
            "sender,receiver,status,start_time,duration,escrowed\n\
             1,2,active,5,30,60.0000\n\
             1,3,pending,0,20,40.0000\n"
        );
    }

    #[test]
    fn test_streams_output_empty_has_header() {
        let processor = StreamProcessor::new();
        let mut output = Vec::new();
        processor.write_streams(&mut output).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "sender,receiver,status,start_time,duration,escrowed\n"
        );
    }
}
