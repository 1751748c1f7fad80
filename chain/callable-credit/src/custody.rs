//! Custody book — settlement and wrapped balances by account
//!
//! Tracks who holds what once value leaves the lending ledger or the wrapped
//! market: the facility's own wrapped holdings, origination fees, draw
//! proceeds and any value returned to borrowers. Credits and debits are
//! overflow/underflow checked.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use types::ids::AccountId;
use types::numeric::{Notional, WrappedAmount};

use crate::errors::CustodyError;

/// Asset held in custody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    /// The settlement stablecoin
    Settlement,
    /// The yield-bearing wrapped asset
    Wrapped,
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Settlement => write!(f, "settlement"),
            Asset::Wrapped => write!(f, "wrapped"),
        }
    }
}

/// Balances: account -> (asset -> base units)
#[derive(Debug, Clone, Default)]
pub struct Custody {
    balances: HashMap<AccountId, HashMap<Asset, u128>>,
}

impl Custody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account_id: &AccountId, asset: Asset) -> u128 {
        self.balances
            .get(account_id)
            .and_then(|assets| assets.get(&asset))
            .copied()
            .unwrap_or(0)
    }

    pub fn settlement_balance(&self, account_id: &AccountId) -> Notional {
        Notional::new(self.balance(account_id, Asset::Settlement))
    }

    pub fn wrapped_balance(&self, account_id: &AccountId) -> WrappedAmount {
        WrappedAmount::new(self.balance(account_id, Asset::Wrapped))
    }

    /// Credit with overflow protection.
    pub fn safe_credit(
        &mut self,
        account_id: AccountId,
        asset: Asset,
        amount: u128,
    ) -> Result<(), CustodyError> {
        if amount == 0 {
            return Ok(());
        }
        let current = self
            .balances
            .entry(account_id)
            .or_default()
            .entry(asset)
            .or_insert(0);
        *current = current.checked_add(amount).ok_or(CustodyError::Overflow)?;
        Ok(())
    }

    /// Debit with underflow protection.
    pub fn safe_debit(
        &mut self,
        account_id: &AccountId,
        asset: Asset,
        amount: u128,
    ) -> Result<(), CustodyError> {
        if amount == 0 {
            return Ok(());
        }
        let available = self.balance(account_id, asset);
        if available < amount {
            return Err(CustodyError::InsufficientBalance {
                account: account_id.to_string(),
                asset: asset.to_string(),
                required: amount,
                available,
            });
        }
        if let Some(current) = self
            .balances
            .get_mut(account_id)
            .and_then(|assets| assets.get_mut(&asset))
        {
            *current -= amount;
        }
        Ok(())
    }

    /// Move `amount` of `asset` between two accounts.
    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: AccountId,
        asset: Asset,
        amount: u128,
    ) -> Result<(), CustodyError> {
        self.safe_debit(from, asset, amount)?;
        self.safe_credit(to, asset, amount)
    }
}
