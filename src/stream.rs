//! Stream model and vesting arithmetic.
//!
//! A stream escrows value from a sender for a receiver and releases it
//! linearly over `duration_seconds` once accepted.

use crate::decimal::Decimal4;
use crate::PartyId;
use serde::Serialize;
use std::fmt;

/// Lifecycle state of a stream still held in the store.
///
/// Closed streams are removed from the store, so they have no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    /// Funded but not yet accepted by the receiver.
    Pending,

    /// Accepted; value vests as time passes.
    Active,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamStatus::Pending => write!(f, "pending"),
            StreamStatus::Active => write!(f, "active"),
        }
    }
}

/// One escrow arrangement between a sender and a receiver.
///
/// # Invariants
///
/// - `sender != receiver`
/// - A stored stream always has `escrowed_value > 0`
/// - `started_at == None` means nothing has vested; the whole escrow
///   notionally belongs to the sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    /// Party that funded the stream.
    pub sender: PartyId,

    /// Party entitled to the vested funds.
    pub receiver: PartyId,

    /// Remaining length of the vesting window, counted from `started_at`.
    pub duration_seconds: u64,

    /// Start of the current vesting window, `None` until accepted.
    pub started_at: Option<u64>,

    /// Custodied funds not yet paid out.
    pub escrowed_value: Decimal4,
}

impl Stream {
    /// Creates an empty pending stream; callers fund it immediately.
    pub fn new(sender: PartyId, receiver: PartyId) -> Self {
        Stream {
            sender,
            receiver,
            duration_seconds: 0,
            started_at: None,
            escrowed_value: Decimal4::ZERO,
        }
    }

    pub fn status(&self) -> StreamStatus {
        match self.started_at {
            Some(_) => StreamStatus::Active,
            None => StreamStatus::Pending,
        }
    }

    /// Start time as reported externally: `0` while pending.
    pub fn start_time(&self) -> u64 {
        self.started_at.unwrap_or(0)
    }

    /// Seconds elapsed in the current window, or `None` while pending.
    pub fn elapsed(&self, now: u64) -> Option<u64> {
        self.started_at.map(|start| now.saturating_sub(start))
    }

    /// Returns `true` once the whole window has elapsed.
    pub fn is_exhausted(&self, now: u64) -> bool {
        self.elapsed(now)
            .map(|elapsed| elapsed >= self.duration_seconds)
            .unwrap_or(false)
    }

    /// Amount owed to the receiver if the stream were settled at `now`.
    ///
    /// Pending streams owe nothing. Exhausted streams owe the entire escrow,
    /// so no dust is stranded by the truncated rate.
    pub fn payout_at(&self, now: u64) -> Decimal4 {
        match self.elapsed(now) {
            None => Decimal4::ZERO,
            Some(elapsed) if elapsed >= self.duration_seconds => self.escrowed_value,
            // inside the window the duration is positive and the product is
            // bounded by the escrow
            Some(elapsed) => vested_amount(self.escrowed_value, self.duration_seconds, elapsed)
                .unwrap_or(Decimal4::ZERO),
        }
    }

    /// Verifies the stored-stream invariants.
    pub fn check_invariant(&self) -> bool {
        self.sender != self.receiver && self.escrowed_value.is_positive()
    }
}

/// Linear vesting with a truncated per-second rate.
///
/// `vested = trunc(escrowed / duration) * elapsed`. The rate is truncated to
/// the smallest unit before multiplying, so partial payouts may fall short of
/// the exact linear share by up to `elapsed` units. For `elapsed < duration`
/// the result never exceeds `escrowed`.
///
/// Returns `None` for a zero duration or if the product overflows.
pub fn vested_amount(escrowed: Decimal4, duration_seconds: u64, elapsed: u64) -> Option<Decimal4> {
    escrowed
        .div_truncated(duration_seconds)
        .and_then(|rate| rate.checked_mul_u64(elapsed))
}
