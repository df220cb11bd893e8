//! Stream lifecycle engine.
//!
//! Implements the state machine `Pending -> Active -> Closed` and the vesting
//! arithmetic on top of a [`StreamStore`], a [`Custody`] service and a
//! [`Clock`].
//!
//! Every mutating operation performs all of its fallible steps (validation,
//! balance checks, pool withdrawals) before the first change to the store, so
//! a failed operation leaves the store and the ledger exactly as they were.

use crate::clock::Clock;
use crate::custody::Custody;
use crate::decimal::Decimal4;
use crate::error::{EngineError, Result};
use crate::store::StreamStore;
use crate::stream::{Stream, StreamStatus};
use crate::PartyId;
use log::{debug, info};

/// Snapshot of a stream returned by [`StreamEngine::get_stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    /// Remaining vesting window in seconds.
    pub duration_seconds: u64,

    /// Start of the current window, `0` while pending.
    pub start_time: u64,

    /// Funds still in escrow.
    pub escrowed_value: Decimal4,

    pub status: StreamStatus,
}

impl From<&Stream> for StreamInfo {
    fn from(stream: &Stream) -> Self {
        StreamInfo {
            duration_seconds: stream.duration_seconds,
            start_time: stream.start_time(),
            escrowed_value: stream.escrowed_value,
            status: stream.status(),
        }
    }
}

/// How a cancelled stream's escrow was disbursed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub paid_to_receiver: Decimal4,
    pub refunded_to_sender: Decimal4,
}

/// The stream engine.
///
/// Mutating operations take `&mut self`; the exclusive borrow serializes
/// operations against every payments account. Queries take `&self`.
pub struct StreamEngine<C, K> {
    store: StreamStore,
    custody: C,
    clock: K,
}

impl<C: Custody, K: Clock> StreamEngine<C, K> {
    /// Creates an engine with an empty store.
    pub fn new(custody: C, clock: K) -> Self {
        Self::with_store(StreamStore::new(), custody, clock)
    }

    pub fn with_store(store: StreamStore, custody: C, clock: K) -> Self {
        StreamEngine {
            store,
            custody,
            clock,
        }
    }

    pub fn store(&self) -> &StreamStore {
        &self.store
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut K {
        &mut self.clock
    }

    /// Locks `amount` from `sender` for `receiver`, vesting over
    /// `duration_seconds` once accepted.
    ///
    /// Funding an existing stream only adds to its escrow: its start time and
    /// remaining duration are left as they are, even when it is already
    /// active.
    pub fn create_stream(
        &mut self,
        sender: PartyId,
        receiver: PartyId,
        amount: Decimal4,
        duration_seconds: u64,
    ) -> Result<()> {
        if sender == receiver {
            return Err(EngineError::InvalidParticipants { party: sender });
        }
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "stream amount must be positive, got {}",
                amount
            )));
        }
        if duration_seconds == 0 {
            return Err(EngineError::InvalidAmount(
                "stream duration must be positive".to_string(),
            ));
        }

        let available = self.custody.balance_of(sender);
        if available < amount {
            return Err(EngineError::InsufficientFunds {
                needed: amount,
                available,
            });
        }

        let merged = match self.store.get_stream(sender, receiver) {
            Ok(existing) => Some(existing.escrowed_value.checked_add(amount).ok_or_else(|| {
                EngineError::InvalidAmount(format!(
                    "adding {} to stream {} -> {} overflows",
                    amount, sender, receiver
                ))
            })?),
            Err(_) => None,
        };

        let pool = self
            .store
            .get_or_create_account(sender, &mut self.custody)
            .custody_handle();
        self.custody.deposit(sender, pool, amount)?;

        self.store
            .upsert_stream(sender, receiver, |stream| match merged {
                Some(escrowed_value) => Stream {
                    escrowed_value,
                    ..stream
                },
                None => Stream {
                    duration_seconds,
                    escrowed_value: amount,
                    ..stream
                },
            })?;

        info!(
            "Stream {} -> {} funded with {} over {}s",
            sender, receiver, amount, duration_seconds
        );
        debug_assert!(self.pool_is_consistent(sender));
        Ok(())
    }

    /// Starts the vesting clock. Only a pending stream can be accepted.
    pub fn accept_stream(&mut self, receiver: PartyId, sender: PartyId) -> Result<()> {
        let now = self.clock.now();
        let stream = self.store.get_stream_mut(sender, receiver)?;

        if stream.started_at.is_some() {
            return Err(EngineError::AlreadyActive { sender, receiver });
        }

        stream.started_at = Some(now);
        info!("Stream {} -> {} accepted at {}", sender, receiver, now);
        Ok(())
    }

    /// Pays the vested amount to the receiver and returns it.
    ///
    /// A partial claim restarts the window at `now` on the remaining value
    /// and remaining duration. Once the window has fully elapsed the entire
    /// escrow is paid and the stream is closed.
    pub fn claim_stream(&mut self, receiver: PartyId, sender: PartyId) -> Result<Decimal4> {
        let now = self.clock.now();
        let pool = self.store.account(sender)?.custody_handle();
        let stream = self.store.get_stream(sender, receiver)?;

        let elapsed = stream
            .elapsed(now)
            .ok_or(EngineError::NotActive { sender, receiver })?;
        let exhausted = stream.is_exhausted(now);
        let payout = stream.payout_at(now);

        let value = self.custody.withdraw(pool, payout)?;

        if exhausted {
            self.store.remove_stream(sender, receiver)?;
            info!(
                "Stream {} -> {} exhausted, paid final {}",
                sender, receiver, payout
            );
        } else {
            let stream = self.store.get_stream_mut(sender, receiver)?;
            stream.escrowed_value -= payout;
            stream.duration_seconds -= elapsed;
            stream.started_at = Some(now);
            debug!(
                "Stream {} -> {} paid {}, {} left over {}s",
                sender, receiver, payout, stream.escrowed_value, stream.duration_seconds
            );
        }

        self.custody.credit(receiver, value);
        debug_assert!(self.pool_is_consistent(sender));
        Ok(payout)
    }

    /// Closes a stream, paying the vested part to the receiver and refunding
    /// the rest to the sender. Either participant may cancel.
    pub fn cancel_stream(
        &mut self,
        caller: PartyId,
        sender: PartyId,
        receiver: PartyId,
    ) -> Result<Settlement> {
        if caller != sender && caller != receiver {
            return Err(EngineError::Unauthorized {
                caller,
                action: "cancel",
            });
        }

        let now = self.clock.now();
        let pool = self.store.account(sender)?.custody_handle();
        let stream = self.store.get_stream(sender, receiver)?;

        let escrowed = stream.escrowed_value;
        let paid = stream.payout_at(now);
        let refunded = escrowed - paid;
        if paid < Decimal4::ZERO || refunded < Decimal4::ZERO {
            return Err(EngineError::ConservationViolated {
                escrowed,
                paid,
                refunded,
            });
        }

        let mut value = self.custody.withdraw(pool, escrowed)?;
        let payout = value.split(paid)?;
        debug_assert_eq!(payout.amount() + value.amount(), escrowed);
        debug_assert_eq!(value.amount(), refunded);

        self.store.remove_stream(sender, receiver)?;
        self.custody.credit(receiver, payout);
        self.custody.credit(sender, value);

        info!(
            "Stream {} -> {} cancelled by {}: paid {}, refunded {}",
            sender, receiver, caller, paid, refunded
        );
        debug_assert!(self.pool_is_consistent(sender));
        Ok(Settlement {
            paid_to_receiver: paid,
            refunded_to_sender: refunded,
        })
    }

    /// Current state of a stream.
    pub fn get_stream(&self, sender: PartyId, receiver: PartyId) -> Result<StreamInfo> {
        self.store
            .get_stream(sender, receiver)
            .map(StreamInfo::from)
    }

    pub fn status_of(&self, sender: PartyId, receiver: PartyId) -> Result<StreamStatus> {
        Ok(self.store.get_stream(sender, receiver)?.status())
    }

    /// Amount a claim would pay right now.
    pub fn claimable_amount(&self, sender: PartyId, receiver: PartyId) -> Result<Decimal4> {
        let stream = self.store.get_stream(sender, receiver)?;
        Ok(stream.payout_at(self.clock.now()))
    }

    /// Amount a cancellation would refund to the sender right now.
    pub fn refundable_amount(&self, sender: PartyId, receiver: PartyId) -> Result<Decimal4> {
        let stream = self.store.get_stream(sender, receiver)?;
        Ok(stream.escrowed_value - stream.payout_at(self.clock.now()))
    }

    /// Outstanding streams funded by `sender`, ordered by receiver.
    pub fn streams_of(&self, sender: PartyId) -> Vec<&Stream> {
        self.store.streams_of(sender)
    }

    /// Checks that the sender's pool holds exactly the value escrowed in its
    /// streams, and that every stream satisfies its own invariants.
    pub fn pool_is_consistent(&self, sender: PartyId) -> bool {
        let account = match self.store.account(sender) {
            Ok(account) => account,
            Err(_) => return true,
        };

        let pool_matches = self
            .custody
            .pool_balance(account.custody_handle())
            .map(|balance| balance == account.escrowed_total())
            .unwrap_or(false);

        pool_matches && account.streams().all(Stream::check_invariant)
    }
}
