//! Value custody: pooled sub-accounts addressed by opaque handles.
//!
//! The engine never holds balances itself. It holds a [`PoolHandle`] per
//! sender and moves funds through a [`Custody`] implementation. Withdrawn
//! funds travel as a [`Value`] token that can only be split or credited.

use crate::decimal::Decimal4;
use crate::error::{EngineError, Result};
use crate::PartyId;
use log::debug;
use std::collections::HashMap;
use std::fmt;

/// Capability for one custody pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle(u64);

impl PoolHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

/// Funds withdrawn from a pool and not yet credited to anyone.
///
/// Not `Clone`: value can only move, never be duplicated.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "withdrawn value must be credited to a party"]
pub struct Value {
    amount: Decimal4,
}

impl Value {
    pub fn amount(&self) -> Decimal4 {
        self.amount
    }

    /// Splits `amount` off into a new `Value`, leaving the rest in `self`.
    pub fn split(&mut self, amount: Decimal4) -> Result<Value> {
        if amount > self.amount || amount < Decimal4::ZERO {
            return Err(EngineError::InsufficientFunds {
                needed: amount,
                available: self.amount,
            });
        }
        self.amount -= amount;
        Ok(Value { amount })
    }
}

/// The ledger service holding fungible value.
///
/// Transfers are exact: they either move the full amount or fail without
/// effect.
pub trait Custody {
    /// Opens a new, empty pool owned by `owner`.
    fn open_pool(&mut self, owner: PartyId) -> PoolHandle;

    /// Free balance of a party.
    fn balance_of(&self, party: PartyId) -> Decimal4;

    /// Balance held in a pool.
    fn pool_balance(&self, pool: PoolHandle) -> Result<Decimal4>;

    /// Moves `amount` from a party's free balance into a pool.
    fn deposit(&mut self, from: PartyId, pool: PoolHandle, amount: Decimal4) -> Result<()>;

    /// Takes `amount` out of a pool.
    fn withdraw(&mut self, pool: PoolHandle, amount: Decimal4) -> Result<Value>;

    /// Credits withdrawn value to a party's free balance.
    fn credit(&mut self, to: PartyId, value: Value);
}

/// In-memory ledger implementing [`Custody`].
#[derive(Debug, Default)]
pub struct Ledger {
    balances: HashMap<PartyId, Decimal4>,
    pools: HashMap<PoolHandle, Decimal4>,
    next_pool: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits funds entering the system from outside (e.g. a bank deposit).
    ///
    /// The total value held by the ledger must stay representable, which
    /// keeps every balance and pool sum below the decimal maximum.
    pub fn fund(&mut self, party: PartyId, amount: Decimal4) -> Result<()> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "funding amount must be positive, got {}",
                amount
            )));
        }
        if self.total_value().checked_add(amount).is_none() {
            return Err(EngineError::InvalidAmount(format!(
                "funding {} overflows the ledger total",
                amount
            )));
        }
        *self.balances.entry(party).or_insert(Decimal4::ZERO) += amount;
        debug!("Funded party {} with {}", party, amount);
        Ok(())
    }

    /// Every party with a balance entry, sorted by party ID.
    pub fn balances(&self) -> Vec<(PartyId, Decimal4)> {
        let mut balances: Vec<_> = self.balances.iter().map(|(p, b)| (*p, *b)).collect();
        balances.sort_by_key(|(party, _)| *party);
        balances
    }

    /// Sum of all free balances and pool balances.
    pub fn total_value(&self) -> Decimal4 {
        self.balances
            .values()
            .chain(self.pools.values())
            .fold(Decimal4::ZERO, |acc, v| acc + *v)
    }
}

impl Custody for Ledger {
    fn open_pool(&mut self, owner: PartyId) -> PoolHandle {
        self.next_pool += 1;
        let handle = PoolHandle(self.next_pool);
        self.pools.insert(handle, Decimal4::ZERO);
        debug!("Opened {} for party {}", handle, owner);
        handle
    }

    fn balance_of(&self, party: PartyId) -> Decimal4 {
        self.balances.get(&party).copied().unwrap_or(Decimal4::ZERO)
    }

    fn pool_balance(&self, pool: PoolHandle) -> Result<Decimal4> {
        self.pools
            .get(&pool)
            .copied()
            .ok_or(EngineError::UnknownPool(pool.id()))
    }

    fn deposit(&mut self, from: PartyId, pool: PoolHandle, amount: Decimal4) -> Result<()> {
        let pooled = self.pool_balance(pool)?;

        let available = self.balance_of(from);
        if available < amount {
            return Err(EngineError::InsufficientFunds {
                needed: amount,
                available,
            });
        }

        let pooled = pooled.checked_add(amount).ok_or_else(|| {
            EngineError::InvalidAmount(format!("deposit of {} overflows {}", amount, pool))
        })?;

        *self.balances.entry(from).or_insert(Decimal4::ZERO) -= amount;
        self.pools.insert(pool, pooled);
        Ok(())
    }

    fn withdraw(&mut self, pool: PoolHandle, amount: Decimal4) -> Result<Value> {
        let balance = self
            .pools
            .get_mut(&pool)
            .ok_or(EngineError::UnknownPool(pool.id()))?;

        if *balance < amount {
            return Err(EngineError::InsufficientFunds {
                needed: amount,
                available: *balance,
            });
        }

        *balance -= amount;
        Ok(Value { amount })
    }

    fn credit(&mut self, to: PartyId, value: Value) {
        if value.amount.is_zero() {
            return;
        }
        *self.balances.entry(to).or_insert(Decimal4::ZERO) += value.amount;
    }
}
