//! Facility configuration
//!
//! Values the facility reads from governance: origination fee, capacity caps and
//! the rolling throttle. The facility never interprets them beyond the checks in
//! `admission` and the fee deduction on open.

use serde::{Deserialize, Serialize};
use types::ids::AccountId;
use types::numeric::{Bps, Notional};

use crate::errors::ConfigError;

/// Facility configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityConfig {
    /// Origination fee charged on open, in basis points of the opened notional
    pub origination_fee_bps: Bps,
    /// Receiver of origination fees; no fee is charged without one
    pub fee_recipient: Option<AccountId>,
    /// Debt ceiling of the underlying lending market
    pub global_debt_ceiling: Notional,
    /// Share of the debt ceiling usable by callable credit (>= 10_000 is unlimited)
    pub cc_fraction_bps: Bps,
    /// Share of each borrower's credit line usable by callable credit (>= 10_000 is unlimited)
    pub borrower_cc_fraction_bps: Bps,
    /// Throttle window length in seconds; zero disables the throttle
    pub throttle_period_secs: u64,
    /// Notional admitted per throttle window; zero disables the throttle
    pub throttle_limit: Notional,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            origination_fee_bps: Bps::ZERO,
            fee_recipient: None,
            global_debt_ceiling: Notional::ZERO,
            cc_fraction_bps: Bps::FULL,
            borrower_cc_fraction_bps: Bps::FULL,
            throttle_period_secs: 0,
            throttle_limit: Notional::ZERO,
        }
    }
}

impl FacilityConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: FacilityConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.origination_fee_bps.is_full() {
            return Err(ConfigError::FeeTooHigh {
                bps: self.origination_fee_bps.get(),
            });
        }
        if self.origination_fee_bps > Bps::ZERO && self.fee_recipient.is_none() {
            return Err(ConfigError::MissingFeeRecipient);
        }
        Ok(())
    }

    /// True when the throttle is active.
    pub fn throttle_enabled(&self) -> bool {
        self.throttle_period_secs > 0 && !self.throttle_limit.is_zero()
    }
}
