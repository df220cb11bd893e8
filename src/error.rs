//! Error types for the stream engine.

use crate::decimal::Decimal4;
use crate::PartyId;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur during engine operation.
///
/// Every variant is terminal for the operation that raised it: no state
/// change from that operation survives.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Sender and receiver are the same party
    #[error("Sender and receiver must differ (party {party})")]
    InvalidParticipants { party: PartyId },

    /// Zero or negative amount, or zero duration
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Sender has never created a stream
    #[error("No payments account for sender {sender}")]
    NoSuchAccount { sender: PartyId },

    /// No stream between the two parties
    #[error("No stream from {sender} to {receiver}")]
    NoSuchStream { sender: PartyId, receiver: PartyId },

    /// Stream was already accepted
    #[error("Stream from {sender} to {receiver} is already active")]
    AlreadyActive { sender: PartyId, receiver: PartyId },

    /// Stream has not been accepted yet
    #[error("Stream from {sender} to {receiver} has not been accepted")]
    NotActive { sender: PartyId, receiver: PartyId },

    /// Caller is not a participant allowed to perform the operation
    #[error("Party {caller} is not authorized to {action} this stream")]
    Unauthorized {
        caller: PartyId,
        action: &'static str,
    },

    /// Custody rejected a transfer
    #[error("Insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds {
        needed: Decimal4,
        available: Decimal4,
    },

    /// Pool handle not issued by this custody service
    #[error("Unknown custody pool {0}")]
    UnknownPool(u64),

    /// Time source moved backwards
    #[error("Clock cannot move backwards from {now} to {requested}")]
    ClockRegression { now: u64, requested: u64 },

    /// Settlement would not disburse exactly the escrowed value
    #[error("Settlement of {escrowed} does not balance: paid {paid}, refunded {refunded}")]
    ConservationViolated {
        escrowed: Decimal4,
        paid: Decimal4,
        refunded: Decimal4,
    },

    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Missing input file argument
    #[error("Missing input file argument. Usage: payment-streams <journal.csv> [--streams]")]
    MissingArgument,
}
