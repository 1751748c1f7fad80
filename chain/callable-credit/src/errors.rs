//! Facility error types
//!
//! Error taxonomy for the facility and the collaborators it calls into. Every
//! failure is returned synchronously and leaves facility state untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use types::errors::AmountError;

/// Which capacity cap rejected an open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapScope {
    Global,
    Borrower,
}

impl fmt::Display for CapScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapScope::Global => write!(f, "global"),
            CapScope::Borrower => write!(f, "borrower"),
        }
    }
}

/// Lending ledger errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Credit line exceeded for {borrower}: requested {requested}, available {available}")]
    CreditLineExceeded {
        borrower: String,
        requested: u128,
        available: u128,
    },

    #[error("Ledger arithmetic error: {0}")]
    Amount(#[from] AmountError),
}

/// Wrapped-asset market errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("Insufficient redemption liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: u128, available: u128 },

    #[error("Market arithmetic error: {0}")]
    Amount(#[from] AmountError),
}

/// Custody book errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CustodyError {
    #[error("Insufficient {asset} balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: String,
        asset: String,
        required: u128,
        available: u128,
    },

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Origination fee too high: {bps} bps")]
    FeeTooHigh { bps: u32 },

    #[error("Origination fee configured without a fee recipient")]
    MissingFeeRecipient,

    #[error("Invalid config: {0}")]
    Parse(String),
}

/// Coarse error class, for callers that branch on cause rather than exact code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    Validation,
    Admission,
    Conservation,
    External,
}

/// Facility error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CreditError {
    #[error("Caller is not an authorized counter-protocol: {caller}")]
    NotAuthorizedCounterProtocol { caller: String },

    #[error("Unauthorized: caller is not the owner")]
    Unauthorized,

    #[error("Facility is frozen")]
    Frozen,

    #[error("Reentrancy detected")]
    Reentrancy,

    #[error("Amount must be positive")]
    ZeroAmount,

    #[error("Amount too small to mint any shares")]
    ZeroShares,

    #[error("Silo {silo} cannot mint shares for this deposit: share supply exhausted")]
    ShareSupplyExhausted { silo: String },

    #[error("No position for borrower {borrower} in silo {silo}")]
    NoPosition { silo: String, borrower: String },

    #[error("Borrower {borrower} has no credit line")]
    NoCreditLine { borrower: String },

    #[error("Insufficient principal: requested {requested}, available {available}")]
    InsufficientPrincipal { requested: u128, available: u128 },

    #[error("Insufficient shares: requested {requested}, available {available}")]
    InsufficientShares { requested: u128, available: u128 },

    #[error("Insufficient borrower allowance: required {required}, available {available}")]
    InsufficientBorrowerAllowance { required: u128, available: u128 },

    #[error("{scope} callable credit cap exceeded: projected {projected}, cap {cap}")]
    CcCapExceeded {
        scope: CapScope,
        projected: u128,
        cap: u128,
    },

    #[error("Throttle limit exceeded: projected {projected}, limit {limit}")]
    ThrottleLimitExceeded { projected: u128, limit: u128 },

    #[error("Conservation violated in silo {silo}: {detail}")]
    Conservation { silo: String, detail: String },

    #[error("Lending ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Wrapped-asset market error: {0}")]
    Market(#[from] MarketError),

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Arithmetic error: {0}")]
    Amount(#[from] AmountError),
}

impl CreditError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CreditError::NotAuthorizedCounterProtocol { .. }
            | CreditError::Unauthorized
            | CreditError::Frozen
            | CreditError::Reentrancy => ErrorKind::Authorization,
            CreditError::ZeroAmount
            | CreditError::ZeroShares
            | CreditError::ShareSupplyExhausted { .. }
            | CreditError::NoPosition { .. }
            | CreditError::NoCreditLine { .. }
            | CreditError::InsufficientPrincipal { .. }
            | CreditError::InsufficientShares { .. }
            | CreditError::Config(_) => ErrorKind::Validation,
            CreditError::InsufficientBorrowerAllowance { .. }
            | CreditError::CcCapExceeded { .. }
            | CreditError::ThrottleLimitExceeded { .. } => ErrorKind::Admission,
            CreditError::Conservation { .. }
            | CreditError::Custody(_)
            | CreditError::Amount(_) => ErrorKind::Conservation,
            CreditError::Ledger(_) | CreditError::Market(_) => ErrorKind::External,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_error_display() {
        let err = CreditError::CcCapExceeded {
            scope: CapScope::Borrower,
            projected: 101,
            cap: 100,
        };
        assert_eq!(
            err.to_string(),
            "borrower callable credit cap exceeded: projected 101, cap 100"
        );
    }

    #[test]
    fn test_credit_error_from_ledger() {
        let ledger_err = LedgerError::CreditLineExceeded {
            borrower: "b".to_string(),
            requested: 2,
            available: 1,
        };
        let err: CreditError = ledger_err.into();
        assert!(matches!(err, CreditError::Ledger(_)));
        assert_eq!(err.kind(), ErrorKind::External);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(CreditError::Frozen.kind(), ErrorKind::Authorization);
        assert_eq!(CreditError::ZeroAmount.kind(), ErrorKind::Validation);
        assert_eq!(
            CreditError::ThrottleLimitExceeded {
                projected: 2,
                limit: 1
            }
            .kind(),
            ErrorKind::Admission
        );
        assert_eq!(
            CreditError::Conservation {
                silo: "s".to_string(),
                detail: "d".to_string()
            }
            .kind(),
            ErrorKind::Conservation
        );
    }

    #[test]
    fn test_amount_error_wraps() {
        let err: CreditError = AmountError::Overflow.into();
        assert!(err.to_string().contains("overflow"));
    }
}
