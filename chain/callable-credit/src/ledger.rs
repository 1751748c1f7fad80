//! Lending ledger interface
//!
//! The lending market owns each borrower's credit line and debt record. The
//! facility only queries credit lines and debt, draws debt on open and repays
//! debt from redeemed value. Interest accrual and liquidation live behind this
//! boundary.

use std::collections::HashMap;
use types::ids::AccountId;
use types::numeric::Notional;

use crate::errors::LedgerError;

pub trait LendingLedger {
    fn credit_line_of(&self, borrower: &AccountId) -> Notional;

    fn debt_of(&self, borrower: &AccountId) -> Notional;

    /// Increase the borrower's debt by `amount`; the ledger pays `amount` to the facility.
    fn draw_debt(&mut self, borrower: &AccountId, amount: Notional) -> Result<(), LedgerError>;

    /// Repay up to `amount` of the borrower's debt. Returns the amount applied,
    /// which never exceeds the outstanding debt.
    fn repay_debt(&mut self, borrower: &AccountId, amount: Notional) -> Result<Notional, LedgerError>;
}

/// In-memory lending ledger with fixed credit lines and no interest.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLendingLedger {
    credit_lines: HashMap<AccountId, Notional>,
    debts: HashMap<AccountId, Notional>,
}

impl InMemoryLendingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_credit_line(&mut self, borrower: AccountId, credit_line: Notional) {
        self.credit_lines.insert(borrower, credit_line);
    }
}

impl LendingLedger for InMemoryLendingLedger {
    fn credit_line_of(&self, borrower: &AccountId) -> Notional {
        self.credit_lines.get(borrower).copied().unwrap_or(Notional::ZERO)
    }

    fn debt_of(&self, borrower: &AccountId) -> Notional {
        self.debts.get(borrower).copied().unwrap_or(Notional::ZERO)
    }

    fn draw_debt(&mut self, borrower: &AccountId, amount: Notional) -> Result<(), LedgerError> {
        let debt = self.debt_of(borrower);
        let new_debt = debt.checked_add(amount)?;
        let credit_line = self.credit_line_of(borrower);
        if new_debt > credit_line {
            return Err(LedgerError::CreditLineExceeded {
                borrower: borrower.to_string(),
                requested: amount.get(),
                available: credit_line.saturating_sub(debt).get(),
            });
        }
        self.debts.insert(*borrower, new_debt);
        Ok(())
    }

    fn repay_debt(&mut self, borrower: &AccountId, amount: Notional) -> Result<Notional, LedgerError> {
        let debt = self.debt_of(borrower);
        let applied = amount.min(debt);
        let remaining = debt.checked_sub(applied)?;
        if remaining.is_zero() {
            self.debts.remove(borrower);
        } else {
            self.debts.insert(*borrower, remaining);
        }
        Ok(applied)
    }
}
