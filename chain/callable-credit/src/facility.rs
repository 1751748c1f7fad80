//! CallableCredit — position lifecycle controller
//!
//! Authorized counter-protocols open, close and draw borrower positions. Each
//! counter-protocol's positions live in its own silo. Every lifecycle call:
//! - acquires the reentrancy guard and rejects callers that are not authorized
//!   counter-protocols, or any call while the facility is frozen
//! - runs against a checkpoint of facility state and both collaborators, which
//!   is restored if any step fails
//! - checks silo and custody conservation before it returns
//! - appends one event to the log and returns it

use tracing::{info, warn};
use types::ids::{AccountId, SiloId};
use types::numeric::{Notional, Rounding, SharesAmount, WrappedAmount};
use uuid::Uuid;

use crate::admission::{self, AdmissionRequest, AdmissionState, Allowance, ThrottleState};
use crate::config::FacilityConfig;
use crate::conversion;
use crate::custody::{Asset, Custody};
use crate::errors::CreditError;
use crate::events::{
    AllowanceApproved, ConfigUpdated, ContractEvent, CounterProtocolAuthorizationSet, FreezeSet,
    OwnershipTransferred, PositionClosed, PositionOpened, ProRataDraw, TargetedDraw,
};
use crate::ledger::LendingLedger;
use crate::market::WrappedAssetMarket;
use crate::security::{AccessControl, FreezeGuard, ReentrancyGuard};
use crate::silo::{Silo, SiloLedger};

/// State restored when a lifecycle call fails part-way.
struct Checkpoint<L, M> {
    silos: SiloLedger,
    admission: AdmissionState,
    custody: Custody,
    ledger: L,
    market: M,
    events_len: usize,
}

pub struct CallableCredit<L, M> {
    /// Custody account holding the facility's wrapped assets
    facility_account: AccountId,
    config: FacilityConfig,
    access: AccessControl,
    freeze: FreezeGuard,
    reentrancy_guard: ReentrancyGuard,
    silos: SiloLedger,
    admission: AdmissionState,
    custody: Custody,
    ledger: L,
    market: M,
    /// Emitted events log (append-only)
    events: Vec<ContractEvent>,
}

impl<L, M> CallableCredit<L, M>
where
    L: LendingLedger + Clone,
    M: WrappedAssetMarket + Clone,
{
    pub fn new(owner: AccountId, config: FacilityConfig, ledger: L, market: M) -> Result<Self, CreditError> {
        config.validate()?;
        Ok(Self {
            facility_account: AccountId::new(),
            config,
            access: AccessControl::new(owner),
            freeze: FreezeGuard::new(),
            reentrancy_guard: ReentrancyGuard::new(),
            silos: SiloLedger::new(),
            admission: AdmissionState::new(),
            custody: Custody::new(),
            ledger,
            market,
            events: Vec::new(),
        })
    }

    // ───────────────────────── Owner ─────────────────────────

    pub fn set_authorized_counter_protocol(
        &mut self,
        caller: &AccountId,
        counter_protocol: AccountId,
        authorized: bool,
    ) -> Result<ContractEvent, CreditError> {
        if !self.access.set_counter_protocol(caller, counter_protocol, authorized) {
            return Err(CreditError::Unauthorized);
        }
        info!(counter_protocol = %counter_protocol, authorized, "counter-protocol authorization set");
        Ok(self.emit(ContractEvent::CounterProtocolAuthorizationSet(
            CounterProtocolAuthorizationSet {
                counter_protocol,
                authorized,
            },
        )))
    }

    pub fn freeze(&mut self, caller: &AccountId) -> Result<ContractEvent, CreditError> {
        self.check_owner(caller)?;
        self.freeze.freeze();
        warn!("facility frozen");
        Ok(self.emit(ContractEvent::FreezeSet(FreezeSet { frozen: true })))
    }

    pub fn unfreeze(&mut self, caller: &AccountId) -> Result<ContractEvent, CreditError> {
        self.check_owner(caller)?;
        self.freeze.unfreeze();
        info!("facility unfrozen");
        Ok(self.emit(ContractEvent::FreezeSet(FreezeSet { frozen: false })))
    }

    /// Replace the facility configuration. Existing positions keep their shares;
    /// the new values apply from the next open.
    pub fn set_config(&mut self, caller: &AccountId, config: FacilityConfig) -> Result<ContractEvent, CreditError> {
        self.check_owner(caller)?;
        config.validate()?;
        self.config = config.clone();
        info!(
            fee_bps = self.config.origination_fee_bps.get(),
            cc_fraction_bps = self.config.cc_fraction_bps.get(),
            borrower_cc_fraction_bps = self.config.borrower_cc_fraction_bps.get(),
            "config updated"
        );
        Ok(self.emit(ContractEvent::ConfigUpdated(ConfigUpdated { config })))
    }

    pub fn transfer_ownership(&mut self, caller: &AccountId, new_owner: AccountId) -> Result<ContractEvent, CreditError> {
        let previous_owner = self.access.owner();
        if !self.access.transfer_ownership(caller, new_owner) {
            return Err(CreditError::Unauthorized);
        }
        info!(previous_owner = %previous_owner, new_owner = %new_owner, "ownership transferred");
        Ok(self.emit(ContractEvent::OwnershipTransferred(OwnershipTransferred {
            previous_owner,
            new_owner,
        })))
    }

    // ───────────────────────── Borrower ─────────────────────────

    /// Called by `borrower`: allow `counter_protocol` to open up to `allowance`
    /// (principal plus fee) on their behalf. Overwrites the previous allowance.
    pub fn approve(&mut self, borrower: AccountId, counter_protocol: AccountId, allowance: Allowance) -> ContractEvent {
        self.admission.approve(borrower, counter_protocol, allowance);
        info!(borrower = %borrower, counter_protocol = %counter_protocol, ?allowance, "allowance approved");
        self.emit(ContractEvent::AllowanceApproved(AllowanceApproved {
            borrower,
            counter_protocol,
            allowance,
        }))
    }

    // ───────────────────────── Open ─────────────────────────

    /// Open or extend `borrower`'s position in the caller's silo with `amount`
    /// of principal drawn against their credit line. `now` is unix seconds.
    pub fn open(
        &mut self,
        caller: &AccountId,
        borrower: AccountId,
        amount: Notional,
        now: i64,
    ) -> Result<ContractEvent, CreditError> {
        let silo = *caller;
        self.transact("open", |f| f.open_inner(silo, borrower, amount, now))
    }

    fn open_inner(
        &mut self,
        silo: SiloId,
        borrower: AccountId,
        amount: Notional,
        now: i64,
    ) -> Result<ContractEvent, CreditError> {
        self.check_lifecycle_caller(&silo)?;
        if amount.is_zero() {
            return Err(CreditError::ZeroAmount);
        }
        let credit_line = self.ledger.credit_line_of(&borrower);
        if credit_line.is_zero() {
            return Err(CreditError::NoCreditLine {
                borrower: borrower.to_string(),
            });
        }

        let fee = match self.config.fee_recipient {
            Some(_) => self.config.origination_fee_bps.apply(amount, Rounding::Down)?,
            None => Notional::ZERO,
        };
        let request = AdmissionRequest {
            borrower,
            counter_protocol: silo,
            amount,
            fee,
            wrapped: conversion::wrapped_equivalent(&self.market, amount)?,
            global_cap: admission::capacity_cap(
                &self.market,
                self.config.global_debt_ceiling,
                self.config.cc_fraction_bps,
            )?,
            borrower_cap: admission::capacity_cap(
                &self.market,
                credit_line,
                self.config.borrower_cc_fraction_bps,
            )?,
            now,
        };
        self.admission.admit(&request, &self.config)?;

        // Draw the principal plus fee from the lending market
        let drawn = amount.checked_add(fee)?;
        self.ledger.draw_debt(&borrower, drawn)?;
        self.custody
            .safe_credit(self.facility_account, Asset::Settlement, drawn.get())?;
        if let Some(recipient) = self.config.fee_recipient {
            self.custody
                .transfer(&self.facility_account, recipient, Asset::Settlement, fee.get())?;
        }

        let wrapped = self.market.wrap(amount)?;
        self.custody
            .safe_debit(&self.facility_account, Asset::Settlement, amount.get())?;
        self.custody
            .safe_credit(self.facility_account, Asset::Wrapped, wrapped.get())?;

        let shares_minted = self.silos.mint(silo, borrower, amount, wrapped)?;
        self.admission.record_open(borrower, wrapped)?;
        self.check_conservation(&silo)?;

        let state = self.silos.silo(&silo);
        let event = PositionOpened {
            event_id: Uuid::now_v7(),
            silo,
            borrower,
            principal: amount,
            fee,
            wrapped,
            shares_minted,
            borrower_shares: self.silos.borrower_shares(&silo, &borrower),
            silo_principal: state.total_principal,
        };
        info!(
            silo = %silo,
            borrower = %borrower,
            principal = amount.get(),
            fee = fee.get(),
            wrapped = wrapped.get(),
            shares = shares_minted.get(),
            "position opened"
        );
        Ok(self.emit(ContractEvent::PositionOpened(event)))
    }

    // ───────────────────────── Close ─────────────────────────

    /// Close `borrower`'s whole position in the caller's silo.
    pub fn close(&mut self, caller: &AccountId, borrower: AccountId) -> Result<ContractEvent, CreditError> {
        let silo = *caller;
        self.transact("close", |f| f.close_inner(silo, borrower, None))
    }

    /// Close `amount` of `borrower`'s principal in the caller's silo.
    pub fn close_partial(
        &mut self,
        caller: &AccountId,
        borrower: AccountId,
        amount: Notional,
    ) -> Result<ContractEvent, CreditError> {
        let silo = *caller;
        self.transact("close_partial", |f| f.close_inner(silo, borrower, Some(amount)))
    }

    fn close_inner(
        &mut self,
        silo: SiloId,
        borrower: AccountId,
        amount: Option<Notional>,
    ) -> Result<ContractEvent, CreditError> {
        self.check_lifecycle_caller(&silo)?;
        if amount.is_some_and(|a| a.is_zero()) {
            return Err(CreditError::ZeroAmount);
        }

        let slice = self.silos.plan_burn(&silo, &borrower, amount)?;
        let state = self.silos.burn(silo, borrower, &slice)?;
        self.custody
            .safe_debit(&self.facility_account, Asset::Wrapped, slice.wrapped.get())?;

        // Redeemed value repays debt first; the rest goes back to the borrower
        let payout = conversion::redeem_all(&mut self.market, slice.wrapped)?;
        let routed = conversion::apply_excess(&mut self.ledger, &borrower, payout.notional)?;
        self.custody
            .safe_credit(borrower, Asset::Settlement, routed.remainder.get())?;
        self.custody
            .safe_credit(borrower, Asset::Wrapped, payout.wrapped.get())?;

        self.admission.release_global(slice.wrapped);
        self.admission.release_borrower(&borrower, slice.wrapped);
        self.check_conservation(&silo)?;

        let event = PositionClosed {
            event_id: Uuid::now_v7(),
            silo,
            borrower,
            principal: slice.principal,
            shares_burned: slice.shares,
            wrapped_released: slice.wrapped,
            debt_repaid: routed.to_debt,
            notional_returned: routed.remainder,
            wrapped_returned: payout.wrapped,
            borrower_shares: self.silos.borrower_shares(&silo, &borrower),
            silo_principal: state.total_principal,
        };
        info!(
            silo = %silo,
            borrower = %borrower,
            principal = slice.principal.get(),
            shares = slice.shares.get(),
            debt_repaid = routed.to_debt.get(),
            returned = routed.remainder.get(),
            full = slice.closes_position,
            "position closed"
        );
        Ok(self.emit(ContractEvent::PositionClosed(event)))
    }

    // ───────────────────────── Draws ─────────────────────────

    /// Pay `amount` of `borrower`'s principal to `recipient`, burning only that
    /// borrower's shares.
    pub fn draw_targeted(
        &mut self,
        caller: &AccountId,
        borrower: AccountId,
        amount: Notional,
        recipient: AccountId,
    ) -> Result<ContractEvent, CreditError> {
        let silo = *caller;
        self.transact("draw_targeted", |f| {
            f.draw_targeted_inner(silo, borrower, amount, recipient)
        })
    }

    fn draw_targeted_inner(
        &mut self,
        silo: SiloId,
        borrower: AccountId,
        amount: Notional,
        recipient: AccountId,
    ) -> Result<ContractEvent, CreditError> {
        self.check_lifecycle_caller(&silo)?;
        if amount.is_zero() {
            return Err(CreditError::ZeroAmount);
        }

        let slice = self.silos.plan_burn(&silo, &borrower, Some(amount))?;
        let state = self.silos.burn(silo, borrower, &slice)?;
        self.custody
            .safe_debit(&self.facility_account, Asset::Wrapped, slice.wrapped.get())?;

        let split = conversion::split_slice(&self.market, amount, slice.wrapped)?;
        let sent = conversion::redeem_all(&mut self.market, split.needed)?;
        self.custody
            .safe_credit(recipient, Asset::Settlement, sent.notional.get())?;
        self.custody
            .safe_credit(recipient, Asset::Wrapped, sent.wrapped.get())?;
        let value_sent = sent.value(&self.market)?;
        if value_sent < amount.saturating_sub(Notional::new(1)) {
            warn!(
                silo = %silo,
                borrower = %borrower,
                requested = amount.get(),
                value_sent = value_sent.get(),
                "targeted draw slice worth less than requested"
            );
        }

        let leftover = conversion::redeem_all(&mut self.market, split.excess)?;
        let routed = conversion::apply_excess(&mut self.ledger, &borrower, leftover.notional)?;
        self.custody
            .safe_credit(borrower, Asset::Settlement, routed.remainder.get())?;
        self.custody
            .safe_credit(borrower, Asset::Wrapped, leftover.wrapped.get())?;

        self.admission.release_global(slice.wrapped);
        self.admission.release_borrower(&borrower, slice.wrapped);
        self.check_conservation(&silo)?;

        let event = TargetedDraw {
            event_id: Uuid::now_v7(),
            silo,
            borrower,
            recipient,
            principal: slice.principal,
            shares_burned: slice.shares,
            notional_sent: sent.notional,
            wrapped_sent: sent.wrapped,
            debt_repaid: routed.to_debt,
            excess_to_borrower: routed.remainder,
            borrower_shares: self.silos.borrower_shares(&silo, &borrower),
            silo_principal: state.total_principal,
        };
        info!(
            silo = %silo,
            borrower = %borrower,
            recipient = %recipient,
            amount = amount.get(),
            shares = slice.shares.get(),
            notional_sent = sent.notional.get(),
            value_sent = value_sent.get(),
            debt_repaid = routed.to_debt.get(),
            "targeted draw"
        );
        Ok(self.emit(ContractEvent::TargetedDraw(event)))
    }

    /// Pay `amount` of the caller's silo principal to `recipient`, reducing
    /// every borrower in the silo proportionally. Shares are untouched unless
    /// the draw takes the whole silo principal, which retires them all.
    pub fn draw_pro_rata(
        &mut self,
        caller: &AccountId,
        amount: Notional,
        recipient: AccountId,
    ) -> Result<ContractEvent, CreditError> {
        let silo = *caller;
        self.transact("draw_pro_rata", |f| f.draw_pro_rata_inner(silo, amount, recipient))
    }

    fn draw_pro_rata_inner(
        &mut self,
        silo: SiloId,
        amount: Notional,
        recipient: AccountId,
    ) -> Result<ContractEvent, CreditError> {
        self.check_lifecycle_caller(&silo)?;
        if amount.is_zero() {
            return Err(CreditError::ZeroAmount);
        }

        let current = self.silos.silo(&silo);
        if amount > current.total_principal {
            return Err(CreditError::InsufficientPrincipal {
                requested: amount.get(),
                available: current.total_principal.get(),
            });
        }
        let wrapped = if amount == current.total_principal {
            current.total_wrapped_held
        } else {
            conversion::wrapped_equivalent(&self.market, amount)?.min(current.total_wrapped_held)
        };

        let (state, shares_retired) = self.silos.reduce_pro_rata(silo, amount, wrapped)?;
        self.custody
            .safe_debit(&self.facility_account, Asset::Wrapped, wrapped.get())?;
        let payout = conversion::redeem_all(&mut self.market, wrapped)?;
        self.custody
            .safe_credit(recipient, Asset::Settlement, payout.notional.get())?;
        self.custody
            .safe_credit(recipient, Asset::Wrapped, payout.wrapped.get())?;

        self.admission.release_global(wrapped);
        self.check_conservation(&silo)?;

        let event = ProRataDraw {
            event_id: Uuid::now_v7(),
            silo,
            recipient,
            principal: amount,
            wrapped_released: wrapped,
            notional_sent: payout.notional,
            wrapped_sent: payout.wrapped,
            shares_retired,
            silo_principal: state.total_principal,
        };
        info!(
            silo = %silo,
            recipient = %recipient,
            amount = amount.get(),
            wrapped = wrapped.get(),
            notional_sent = payout.notional.get(),
            shares_retired,
            "pro-rata draw"
        );
        Ok(self.emit(ContractEvent::ProRataDraw(event)))
    }

    // ───────────────────────── Queries ─────────────────────────

    pub fn silo(&self, silo: &SiloId) -> Silo {
        self.silos.silo(silo)
    }

    pub fn borrower_shares(&self, silo: &SiloId, borrower: &AccountId) -> SharesAmount {
        self.silos.borrower_shares(silo, borrower)
    }

    pub fn borrower_principal(&self, silo: &SiloId, borrower: &AccountId) -> Result<Notional, CreditError> {
        self.silos.borrower_principal(silo, borrower)
    }

    pub fn allowance(&self, borrower: &AccountId, counter_protocol: &AccountId) -> Allowance {
        self.admission.allowance(borrower, counter_protocol)
    }

    pub fn total_cc_notional(&self) -> WrappedAmount {
        self.admission.total_cc_notional()
    }

    pub fn borrower_cc_notional(&self, borrower: &AccountId) -> WrappedAmount {
        self.admission.borrower_cc_notional(borrower)
    }

    pub fn throttle_state(&self) -> ThrottleState {
        self.admission.throttle()
    }

    pub fn is_authorized(&self, counter_protocol: &AccountId) -> bool {
        self.access.is_counter_protocol(counter_protocol)
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze.is_frozen()
    }

    pub fn owner(&self) -> AccountId {
        self.access.owner()
    }

    pub fn config(&self) -> &FacilityConfig {
        &self.config
    }

    pub fn facility_account(&self) -> AccountId {
        self.facility_account
    }

    pub fn custody(&self) -> &Custody {
        &self.custody
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Direct access to the lending ledger, e.g. to set credit lines.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn market(&self) -> &M {
        &self.market
    }

    /// Direct access to the wrapped market, e.g. to move its exchange rate.
    pub fn market_mut(&mut self) -> &mut M {
        &mut self.market
    }

    // ───────────────────────── Events ─────────────────────────

    /// Get all emitted events.
    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    /// Drain all events (consume and clear).
    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: ContractEvent) -> ContractEvent {
        self.events.push(event.clone());
        event
    }

    // ───────────────────────── Internal Guards ─────────────────────────

    fn check_owner(&self, caller: &AccountId) -> Result<(), CreditError> {
        if !self.access.is_owner(caller) {
            return Err(CreditError::Unauthorized);
        }
        Ok(())
    }

    fn check_lifecycle_caller(&self, caller: &AccountId) -> Result<(), CreditError> {
        if !self.access.is_counter_protocol(caller) {
            return Err(CreditError::NotAuthorizedCounterProtocol {
                caller: caller.to_string(),
            });
        }
        if self.freeze.is_frozen() {
            return Err(CreditError::Frozen);
        }
        Ok(())
    }

    /// Silo invariants plus custody agreement: the facility holds exactly the
    /// wrapped units the silos account for and no settlement balance.
    fn check_conservation(&self, silo: &SiloId) -> Result<(), CreditError> {
        self.silos.check_conservation(silo)?;
        let held = self.custody.wrapped_balance(&self.facility_account);
        let accounted = self.silos.total_wrapped_held()?;
        if held != accounted {
            return Err(CreditError::Conservation {
                silo: silo.to_string(),
                detail: format!("facility holds {held} wrapped, silos account for {accounted}"),
            });
        }
        let idle = self.custody.settlement_balance(&self.facility_account);
        if !idle.is_zero() {
            return Err(CreditError::Conservation {
                silo: silo.to_string(),
                detail: format!("{idle} settlement left in facility custody"),
            });
        }
        Ok(())
    }

    /// Run `op` atomically: on error every change it made is rolled back.
    fn transact<T>(
        &mut self,
        operation: &'static str,
        op: impl FnOnce(&mut Self) -> Result<T, CreditError>,
    ) -> Result<T, CreditError> {
        if !self.reentrancy_guard.acquire() {
            return Err(CreditError::Reentrancy);
        }
        let checkpoint = self.checkpoint();
        let result = op(self);
        if let Err(err) = &result {
            warn!(operation, error = %err, kind = ?err.kind(), "operation reverted");
            self.restore(checkpoint);
        }
        self.reentrancy_guard.release();
        result
    }

    fn checkpoint(&self) -> Checkpoint<L, M> {
        Checkpoint {
            silos: self.silos.clone(),
            admission: self.admission.clone(),
            custody: self.custody.clone(),
            ledger: self.ledger.clone(),
            market: self.market.clone(),
            events_len: self.events.len(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint<L, M>) {
        self.silos = checkpoint.silos;
        self.admission = checkpoint.admission;
        self.custody = checkpoint.custody;
        self.ledger = checkpoint.ledger;
        self.market = checkpoint.market;
        self.events.truncate(checkpoint.events_len);
    }
}
