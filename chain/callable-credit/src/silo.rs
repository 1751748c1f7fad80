//! Silo ledger — per counter-protocol aggregates and borrower shares
//!
//! Each counter-protocol gets an isolated silo. Operations on one silo never
//! read or write another silo's entries. Within a silo the sum of borrower
//! shares always equals `total_shares`, and a silo with no shares holds no
//! principal or wrapped asset.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use types::errors::AmountError;
use types::ids::{AccountId, SiloId};
use types::numeric::{mul_div, Notional, Rounding, SharesAmount, WrappedAmount};

use crate::errors::CreditError;
use crate::shares;

/// Aggregate state of one silo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Silo {
    pub total_principal: Notional,
    pub total_shares: SharesAmount,
    pub total_wrapped_held: WrappedAmount,
}

/// What a burn removes from a silo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurnSlice {
    pub shares: SharesAmount,
    pub principal: Notional,
    pub wrapped: WrappedAmount,
    /// The borrower's whole share balance is burned
    pub closes_position: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SiloLedger {
    silos: HashMap<SiloId, Silo>,
    borrower_shares: HashMap<SiloId, HashMap<AccountId, SharesAmount>>,
}

impl SiloLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // ───────────────────────── Queries ─────────────────────────

    pub fn silo(&self, silo: &SiloId) -> Silo {
        self.silos.get(silo).copied().unwrap_or_default()
    }

    pub fn borrower_shares(&self, silo: &SiloId, borrower: &AccountId) -> SharesAmount {
        self.borrower_shares
            .get(silo)
            .and_then(|entries| entries.get(borrower))
            .copied()
            .unwrap_or(SharesAmount::ZERO)
    }

    /// Principal currently attributable to `borrower`, rounded down.
    pub fn borrower_principal(
        &self,
        silo: &SiloId,
        borrower: &AccountId,
    ) -> Result<Notional, CreditError> {
        let state = self.silo(silo);
        let balance = self.borrower_shares(silo, borrower);
        Ok(shares::assets_for_shares(
            balance,
            state.total_principal,
            state.total_shares,
        )?)
    }

    /// Total wrapped asset held across all silos.
    pub fn total_wrapped_held(&self) -> Result<WrappedAmount, CreditError> {
        self.silos
            .values()
            .try_fold(WrappedAmount::ZERO, |acc, silo| {
                acc.checked_add(silo.total_wrapped_held)
            })
            .map_err(CreditError::from)
    }

    // ───────────────────────── Mutations ─────────────────────────

    /// Record a new deposit of `principal` backed by `wrapped`. Returns the
    /// shares minted, priced on the pre-deposit totals.
    pub fn mint(
        &mut self,
        silo: SiloId,
        borrower: AccountId,
        principal: Notional,
        wrapped: WrappedAmount,
    ) -> Result<SharesAmount, CreditError> {
        let state = self.silo(&silo);
        let exhausted = || CreditError::ShareSupplyExhausted {
            silo: silo.to_string(),
        };
        let minted =
            shares::shares_for_deposit(principal, state.total_principal, state.total_shares)
                .map_err(|err| match err {
                    AmountError::Overflow => exhausted(),
                    other => other.into(),
                })?;
        if minted.is_zero() {
            return Err(CreditError::ZeroShares);
        }
        let total_shares = state
            .total_shares
            .checked_add(minted)
            .map_err(|_| exhausted())?;

        let updated = Silo {
            total_principal: state.total_principal.checked_add(principal)?,
            total_shares,
            total_wrapped_held: state.total_wrapped_held.checked_add(wrapped)?,
        };
        let balance = self.borrower_shares(&silo, &borrower).checked_add(minted)?;

        self.silos.insert(silo, updated);
        self.borrower_shares
            .entry(silo)
            .or_default()
            .insert(borrower, balance);
        Ok(minted)
    }

    /// Work out what burning `amount` of the borrower's principal removes.
    /// `None` burns the whole position.
    ///
    /// Burned shares round up and are clamped to the borrower's balance; a clamp
    /// retires the position and takes its whole principal. When the burn leaves
    /// the silo without shares, the silo's residual principal and wrapped
    /// holdings go with it so no principal survives without shares.
    pub fn plan_burn(
        &self,
        silo: &SiloId,
        borrower: &AccountId,
        amount: Option<Notional>,
    ) -> Result<BurnSlice, CreditError> {
        let state = self.silo(silo);
        let balance = self.borrower_shares(silo, borrower);
        if balance.is_zero() {
            return Err(CreditError::NoPosition {
                silo: silo.to_string(),
                borrower: borrower.to_string(),
            });
        }
        let current =
            shares::assets_for_shares(balance, state.total_principal, state.total_shares)?;

        let (burned, mut principal, closes_position) = match amount {
            None => (balance, current, true),
            Some(amount) => {
                if amount > current {
                    return Err(CreditError::InsufficientPrincipal {
                        requested: amount.get(),
                        available: current.get(),
                    });
                }
                let needed = shares::shares_for_withdrawal(
                    amount,
                    state.total_principal,
                    state.total_shares,
                )?;
                if needed >= balance {
                    (balance, current, true)
                } else {
                    (needed, amount, false)
                }
            }
        };

        let remaining_shares = state.total_shares.checked_sub(burned)?;
        if remaining_shares.is_zero() {
            return Ok(BurnSlice {
                shares: burned,
                principal: state.total_principal,
                wrapped: state.total_wrapped_held,
                closes_position,
            });
        }

        // Other positions remain: leave them at least one unit of principal.
        if principal >= state.total_principal {
            principal = state.total_principal.saturating_sub(Notional::new(1));
        }
        let wrapped = if state.total_principal.is_zero() {
            WrappedAmount::ZERO
        } else {
            WrappedAmount::new(mul_div(
                state.total_wrapped_held.get(),
                principal.get(),
                state.total_principal.get(),
                Rounding::Up,
            )?)
            .min(state.total_wrapped_held)
        };

        Ok(BurnSlice {
            shares: burned,
            principal,
            wrapped,
            closes_position,
        })
    }

    /// Apply a slice produced by [`SiloLedger::plan_burn`].
    pub fn burn(
        &mut self,
        silo: SiloId,
        borrower: AccountId,
        slice: &BurnSlice,
    ) -> Result<Silo, CreditError> {
        let state = self.silo(&silo);
        let balance = self.borrower_shares(&silo, &borrower);
        if slice.shares > balance {
            return Err(CreditError::InsufficientShares {
                requested: slice.shares.get(),
                available: balance.get(),
            });
        }

        let updated = Silo {
            total_principal: state.total_principal.checked_sub(slice.principal)?,
            total_shares: state.total_shares.checked_sub(slice.shares)?,
            total_wrapped_held: state.total_wrapped_held.checked_sub(slice.wrapped)?,
        };
        let remaining = balance.checked_sub(slice.shares)?;

        self.silos.insert(silo, updated);
        if let Some(entries) = self.borrower_shares.get_mut(&silo) {
            if remaining.is_zero() {
                entries.remove(&borrower);
            } else {
                entries.insert(borrower, remaining);
            }
        }
        Ok(updated)
    }

    /// Reduce the silo's principal and wrapped holdings without burning shares.
    ///
    /// Every borrower's derived principal shrinks proportionally. Draining the
    /// whole principal retires every share in the silo. Returns the new state
    /// and whether shares were retired.
    pub fn reduce_pro_rata(
        &mut self,
        silo: SiloId,
        principal: Notional,
        wrapped: WrappedAmount,
    ) -> Result<(Silo, bool), CreditError> {
        let state = self.silo(&silo);
        if principal > state.total_principal {
            return Err(CreditError::InsufficientPrincipal {
                requested: principal.get(),
                available: state.total_principal.get(),
            });
        }

        let mut updated = Silo {
            total_principal: state.total_principal.checked_sub(principal)?,
            total_shares: state.total_shares,
            total_wrapped_held: state.total_wrapped_held.checked_sub(wrapped)?,
        };
        let retired = updated.total_principal.is_zero() && !updated.total_shares.is_zero();
        if retired {
            updated.total_shares = SharesAmount::ZERO;
            self.borrower_shares.remove(&silo);
        }

        self.silos.insert(silo, updated);
        Ok((updated, retired))
    }

    // ───────────────────────── Invariants ─────────────────────────

    /// Check the silo's share and zero-balance invariants.
    pub fn check_conservation(&self, silo: &SiloId) -> Result<(), CreditError> {
        let state = self.silo(silo);
        let violation = |detail: String| CreditError::Conservation {
            silo: silo.to_string(),
            detail,
        };

        let sum = self
            .borrower_shares
            .get(silo)
            .map(|entries| {
                entries
                    .values()
                    .try_fold(SharesAmount::ZERO, |acc, s| acc.checked_add(*s))
            })
            .transpose()?
            .unwrap_or(SharesAmount::ZERO);

        if sum != state.total_shares {
            return Err(violation(format!(
                "total_shares {} != sum of borrower shares {}",
                state.total_shares, sum
            )));
        }
        if state.total_shares.is_zero() != state.total_principal.is_zero() {
            return Err(violation(format!(
                "total_shares {} and total_principal {} disagree on emptiness",
                state.total_shares, state.total_principal
            )));
        }
        if state.total_shares.is_zero() && !state.total_wrapped_held.is_zero() {
            return Err(violation(format!(
                "{} wrapped held with no shares outstanding",
                state.total_wrapped_held
            )));
        }
        Ok(())
    }
}
