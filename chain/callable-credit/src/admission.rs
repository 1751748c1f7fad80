//! Admission control — allowances, capacity caps and the rolling throttle
//!
//! Every open passes through [`AdmissionState::admit`], which evaluates the
//! checks in a fixed order (allowance, throttle, global cap, borrower cap) and
//! only commits their side effects once all of them pass.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use types::ids::AccountId;
use types::numeric::{Bps, Notional, Rounding, WrappedAmount};

use crate::config::FacilityConfig;
use crate::errors::{CapScope, CreditError};
use crate::market::WrappedAssetMarket;

/// Amount a borrower lets one counter-protocol open on their behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Allowance {
    Amount(Notional),
    Unlimited,
}

impl Allowance {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Allowance::Unlimited)
    }

    /// Remaining allowance after spending `required`, or `None` when it does not cover it.
    fn spend(self, required: Notional) -> Option<Allowance> {
        match self {
            Allowance::Unlimited => Some(Allowance::Unlimited),
            Allowance::Amount(available) => {
                available.checked_sub(required).ok().map(Allowance::Amount)
            }
        }
    }
}

impl Default for Allowance {
    fn default() -> Self {
        Allowance::Amount(Notional::ZERO)
    }
}

/// Rolling notional throttle window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleState {
    /// Unix seconds at which the current window started
    pub period_start: i64,
    /// Notional admitted in the current window
    pub period_notional: Notional,
}

/// Cap in wrapped units for `fraction` of `limit`; `None` when uncapped.
///
/// A full fraction is unlimited. A zero fraction yields a zero cap, which
/// forbids any new capacity. The cap converts with the same round-up preview
/// as the requested amount, so opening exactly the notional cap fits.
pub fn capacity_cap<M: WrappedAssetMarket>(
    market: &M,
    limit: Notional,
    fraction: Bps,
) -> Result<Option<WrappedAmount>, CreditError> {
    if fraction.is_full() {
        return Ok(None);
    }
    let notional_cap = fraction.apply(limit, Rounding::Down)?;
    Ok(Some(market.preview_withdraw(notional_cap)?))
}

/// One open presented to admission control.
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub borrower: AccountId,
    pub counter_protocol: AccountId,
    pub amount: Notional,
    pub fee: Notional,
    /// Wrapped equivalent of `amount`, the unit the capacity trackers count in
    pub wrapped: WrappedAmount,
    pub global_cap: Option<WrappedAmount>,
    pub borrower_cap: Option<WrappedAmount>,
    pub now: i64,
}

#[derive(Debug, Clone, Default)]
pub struct AdmissionState {
    allowances: HashMap<(AccountId, AccountId), Allowance>,
    total_cc_notional: WrappedAmount,
    borrower_cc_notional: HashMap<AccountId, WrappedAmount>,
    throttle: ThrottleState,
}

impl AdmissionState {
    pub fn new() -> Self {
        Self::default()
    }

    // ───────────────────────── Allowances ─────────────────────────

    /// Set the allowance `borrower` grants `counter_protocol`. Overwrites any previous value.
    pub fn approve(&mut self, borrower: AccountId, counter_protocol: AccountId, allowance: Allowance) {
        if allowance == Allowance::default() {
            self.allowances.remove(&(borrower, counter_protocol));
        } else {
            self.allowances.insert((borrower, counter_protocol), allowance);
        }
    }

    pub fn allowance(&self, borrower: &AccountId, counter_protocol: &AccountId) -> Allowance {
        self.allowances
            .get(&(*borrower, *counter_protocol))
            .copied()
            .unwrap_or_default()
    }

    // ───────────────────────── Trackers ─────────────────────────

    pub fn total_cc_notional(&self) -> WrappedAmount {
        self.total_cc_notional
    }

    pub fn borrower_cc_notional(&self, borrower: &AccountId) -> WrappedAmount {
        self.borrower_cc_notional
            .get(borrower)
            .copied()
            .unwrap_or(WrappedAmount::ZERO)
    }

    pub fn throttle(&self) -> ThrottleState {
        self.throttle
    }

    /// Add wrapped holdings created by an open to both trackers.
    pub fn record_open(&mut self, borrower: AccountId, wrapped: WrappedAmount) -> Result<(), CreditError> {
        let global = self.total_cc_notional.checked_add(wrapped)?;
        let own = self.borrower_cc_notional(&borrower).checked_add(wrapped)?;
        self.total_cc_notional = global;
        self.borrower_cc_notional.insert(borrower, own);
        Ok(())
    }

    /// Release wrapped holdings from the global tracker.
    pub fn release_global(&mut self, wrapped: WrappedAmount) {
        self.total_cc_notional = self.total_cc_notional.saturating_sub(wrapped);
    }

    /// Release wrapped holdings from the borrower's tracker.
    pub fn release_borrower(&mut self, borrower: &AccountId, wrapped: WrappedAmount) {
        let remaining = self.borrower_cc_notional(borrower).saturating_sub(wrapped);
        if remaining.is_zero() {
            self.borrower_cc_notional.remove(borrower);
        } else {
            self.borrower_cc_notional.insert(*borrower, remaining);
        }
    }

    // ───────────────────────── Admission ─────────────────────────

    /// Run every admission check for `request` and commit the allowance and
    /// throttle updates. Nothing is written if any check fails.
    pub fn admit(&mut self, request: &AdmissionRequest, config: &FacilityConfig) -> Result<(), CreditError> {
        // Allowance
        let required = request.amount.checked_add(request.fee)?;
        let current = self.allowance(&request.borrower, &request.counter_protocol);
        let remaining = current.spend(required).ok_or_else(|| {
            CreditError::InsufficientBorrowerAllowance {
                required: required.get(),
                available: match current {
                    Allowance::Amount(a) => a.get(),
                    Allowance::Unlimited => u128::MAX,
                },
            }
        })?;

        // Throttle
        let throttle = if config.throttle_enabled() {
            let period = i64::try_from(config.throttle_period_secs).unwrap_or(i64::MAX);
            let mut window = self.throttle;
            if request.now >= window.period_start.saturating_add(period) {
                window = ThrottleState {
                    period_start: request.now,
                    period_notional: Notional::ZERO,
                };
            }
            let projected = window.period_notional.checked_add(request.amount)?;
            if projected > config.throttle_limit {
                return Err(CreditError::ThrottleLimitExceeded {
                    projected: projected.get(),
                    limit: config.throttle_limit.get(),
                });
            }
            window.period_notional = projected;
            Some(window)
        } else {
            None
        };

        // Global cap
        if let Some(cap) = request.global_cap {
            let projected = self.total_cc_notional.checked_add(request.wrapped)?;
            if projected > cap {
                return Err(CreditError::CcCapExceeded {
                    scope: CapScope::Global,
                    projected: projected.get(),
                    cap: cap.get(),
                });
            }
        }

        // Borrower cap
        if let Some(cap) = request.borrower_cap {
            let projected = self
                .borrower_cc_notional(&request.borrower)
                .checked_add(request.wrapped)?;
            if projected > cap {
                return Err(CreditError::CcCapExceeded {
                    scope: CapScope::Borrower,
                    projected: projected.get(),
                    cap: cap.get(),
                });
            }
        }

        debug!(
            borrower = %request.borrower,
            counter_protocol = %request.counter_protocol,
            required = required.get(),
            wrapped = request.wrapped.get(),
            "open admitted"
        );

        if !current.is_unlimited() {
            self.approve(request.borrower, request.counter_protocol, remaining);
        }
        if let Some(window) = throttle {
            self.throttle = window;
        }
        Ok(())
    }
}
