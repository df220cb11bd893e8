//! Journal records for CSV parsing and internal representation.

use crate::decimal::Decimal4;
use crate::PartyId;
use serde::Deserialize;

/// Raw journal row as read from CSV.
///
/// Columns not used by an operation type may be left empty.
#[derive(Debug, Deserialize)]
pub struct OperationRecord {
    /// Operation type: fund, create, accept, claim, cancel
    #[serde(rename = "type")]
    pub op_type: String,

    /// Time in seconds at which the operation executes
    pub time: u64,

    /// Authenticated party submitting the operation
    pub caller: PartyId,

    /// Stream sender (stream operations only)
    pub sender: Option<PartyId>,

    /// Stream receiver (stream operations only)
    pub receiver: Option<PartyId>,

    /// Amount (fund and create only)
    pub amount: Option<Decimal4>,

    /// Vesting duration in seconds (create only)
    pub duration: Option<u64>,
}

impl OperationRecord {
    /// Parses the raw CSV record into a typed operation.
    ///
    /// Returns `None` if the record is invalid (unknown type, missing field).
    /// Value checks such as positive amounts are left to the engine.
    pub fn parse(&self) -> Option<ParsedOperation> {
        let op_type = self.op_type.trim().to_lowercase();

        let kind = match op_type.as_str() {
            "fund" => OpKind::Fund(self.amount?),
            "create" => OpKind::Create {
                sender: self.sender?,
                receiver: self.receiver?,
                amount: self.amount?,
                duration: self.duration?,
            },
            "accept" => OpKind::Accept {
                sender: self.sender?,
                receiver: self.receiver?,
            },
            "claim" => OpKind::Claim {
                sender: self.sender?,
                receiver: self.receiver?,
            },
            "cancel" => OpKind::Cancel {
                sender: self.sender?,
                receiver: self.receiver?,
            },
            _ => return None,
        };

        Some(ParsedOperation {
            time: self.time,
            caller: self.caller,
            kind,
        })
    }
}

/// A parsed operation ready for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOperation {
    pub time: u64,

    pub caller: PartyId,

    /// Operation type with associated data
    pub kind: OpKind,
}

/// Operation variants with associated data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpKind {
    /// Credit external funds to the caller.
    Fund(Decimal4),

    /// Lock funds for a receiver; the caller must be the sender.
    Create {
        sender: PartyId,
        receiver: PartyId,
        amount: Decimal4,
        duration: u64,
    },

    /// Start vesting; the caller must be the receiver.
    Accept { sender: PartyId, receiver: PartyId },

    /// Pay out vested funds to the receiver.
    Claim { sender: PartyId, receiver: PartyId },

    /// Close the stream with a pro-rata split.
    Cancel { sender: PartyId, receiver: PartyId },
}
