//! Per-sender stream storage.
//!
//! Each sender owns one [`PaymentsAccount`]: the streams it funds, keyed by
//! receiver, and the custody pool holding their escrowed value. Accounts are
//! created lazily and never deleted, since they own the pool handle.

use crate::custody::{Custody, PoolHandle};
use crate::decimal::Decimal4;
use crate::error::{EngineError, Result};
use crate::stream::Stream;
use crate::PartyId;
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// One sender's collection of outstanding streams.
#[derive(Debug, Clone)]
pub struct PaymentsAccount {
    /// Sender that owns this account.
    pub owner: PartyId,

    /// Pool holding the escrow of every stream below.
    custody_handle: PoolHandle,

    /// Streams keyed by receiver, ordered for deterministic iteration.
    streams: BTreeMap<PartyId, Stream>,
}

impl PaymentsAccount {
    fn new(owner: PartyId, custody_handle: PoolHandle) -> Self {
        PaymentsAccount {
            owner,
            custody_handle,
            streams: BTreeMap::new(),
        }
    }

    pub fn custody_handle(&self) -> PoolHandle {
        self.custody_handle
    }

    /// Streams ordered by receiver.
    pub fn streams(&self) -> impl Iterator<Item = &Stream> {
        self.streams.values()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Total value escrowed across all streams of this account.
    pub fn escrowed_total(&self) -> Decimal4 {
        self.streams
            .values()
            .fold(Decimal4::ZERO, |acc, s| acc + s.escrowed_value)
    }
}

/// Maps sender identities to their payments accounts.
#[derive(Debug, Default)]
pub struct StreamStore {
    accounts: HashMap<PartyId, PaymentsAccount>,
}

impl StreamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sender's account, opening a custody pool on first use.
    pub fn get_or_create_account<C: Custody>(
        &mut self,
        sender: PartyId,
        custody: &mut C,
    ) -> &mut PaymentsAccount {
        self.accounts.entry(sender).or_insert_with(|| {
            let handle = custody.open_pool(sender);
            debug!("Created payments account for sender {} ({})", sender, handle);
            PaymentsAccount::new(sender, handle)
        })
    }

    pub fn account(&self, sender: PartyId) -> Result<&PaymentsAccount> {
        self.accounts
            .get(&sender)
            .ok_or(EngineError::NoSuchAccount { sender })
    }

    fn account_mut(&mut self, sender: PartyId) -> Result<&mut PaymentsAccount> {
        self.accounts
            .get_mut(&sender)
            .ok_or(EngineError::NoSuchAccount { sender })
    }

    /// Applies `update` to the existing stream, or stores
    /// `update(Stream::new(sender, receiver))` if there is none.
    pub fn upsert_stream<F>(&mut self, sender: PartyId, receiver: PartyId, update: F) -> Result<()>
    where
        F: FnOnce(Stream) -> Stream,
    {
        let account = self.account_mut(sender)?;
        let current = account
            .streams
            .remove(&receiver)
            .unwrap_or_else(|| Stream::new(sender, receiver));
        account.streams.insert(receiver, update(current));
        Ok(())
    }

    /// Read-only lookup.
    pub fn get_stream(&self, sender: PartyId, receiver: PartyId) -> Result<&Stream> {
        self.account(sender)?
            .streams
            .get(&receiver)
            .ok_or(EngineError::NoSuchStream { sender, receiver })
    }

    pub fn get_stream_mut(&mut self, sender: PartyId, receiver: PartyId) -> Result<&mut Stream> {
        self.account_mut(sender)?
            .streams
            .get_mut(&receiver)
            .ok_or(EngineError::NoSuchStream { sender, receiver })
    }

    pub fn remove_stream(&mut self, sender: PartyId, receiver: PartyId) -> Result<Stream> {
        self.account_mut(sender)?
            .streams
            .remove(&receiver)
            .ok_or(EngineError::NoSuchStream { sender, receiver })
    }

    /// Outstanding streams funded by `sender`, ordered by receiver.
    pub fn streams_of(&self, sender: PartyId) -> Vec<&Stream> {
        self.accounts
            .get(&sender)
            .map(|account| account.streams().collect())
            .unwrap_or_default()
    }

    /// Every outstanding stream, ordered by (sender, receiver).
    pub fn streams(&self) -> Vec<&Stream> {
        let mut accounts: Vec<_> = self.accounts.values().collect();
        accounts.sort_by_key(|a| a.owner);
        accounts.into_iter().flat_map(|a| a.streams()).collect()
    }
}
