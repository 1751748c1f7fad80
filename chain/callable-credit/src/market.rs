//! Wrapped-asset market interface
//!
//! The facility holds principal as a yield-bearing wrapped asset. This module
//! defines what the facility needs from the wrapped-asset contract, plus an
//! in-memory market with a settable exchange rate and redemption liquidity.

use rust_decimal::Decimal;
use types::errors::AmountError;
use types::numeric::{Notional, Rate, Rounding, WrappedAmount};

use crate::errors::MarketError;

/// Operations the facility calls on the wrapped-asset market.
///
/// Previews are pure; `wrap` and `redeem` move value. All conversions
/// use [`WrappedAssetMarket::exchange_rate`].
pub trait WrappedAssetMarket {
    /// Settlement units per wrapped unit.
    fn exchange_rate(&self) -> Rate;

    /// Wrapped units a deposit of `notional` would mint (rounds down).
    fn preview_deposit(&self, notional: Notional) -> Result<WrappedAmount, MarketError> {
        Ok(self.exchange_rate().notional_to_wrapped(notional, Rounding::Down)?)
    }

    /// Wrapped units that must be burned to withdraw `notional` (rounds up).
    fn preview_withdraw(&self, notional: Notional) -> Result<WrappedAmount, MarketError> {
        Ok(self.exchange_rate().notional_to_wrapped(notional, Rounding::Up)?)
    }

    /// Settlement units a redemption of `wrapped` would pay (rounds down).
    fn preview_redeem(&self, wrapped: WrappedAmount) -> Result<Notional, MarketError> {
        Ok(self.exchange_rate().wrapped_to_notional(wrapped, Rounding::Down)?)
    }

    /// Largest wrapped amount that can be redeemed right now.
    fn max_redeemable(&self) -> WrappedAmount;

    /// Convert exactly `notional` into wrapped units, crediting the round-up
    /// preview `preview_withdraw(notional)`.
    fn wrap(&mut self, notional: Notional) -> Result<WrappedAmount, MarketError>;

    /// Burn `wrapped` and pay out its settlement value.
    fn redeem(&mut self, wrapped: WrappedAmount) -> Result<Notional, MarketError>;
}

/// In-memory wrapped-asset market.
///
/// `liquidity` is the settlement balance available for redemptions; `None`
/// means redemptions are never liquidity-constrained.
#[derive(Debug, Clone)]
pub struct InMemoryWrappedMarket {
    rate: Rate,
    liquidity: Option<Notional>,
}

impl InMemoryWrappedMarket {
    /// Market with unlimited redemption liquidity.
    pub fn new(rate: Rate) -> Self {
        Self {
            rate,
            liquidity: None,
        }
    }

    /// Market whose redemptions are capped by `liquidity` settlement units.
    pub fn with_liquidity(rate: Rate, liquidity: Notional) -> Self {
        Self {
            rate,
            liquidity: Some(liquidity),
        }
    }

    pub fn set_exchange_rate(&mut self, rate: Rate) {
        self.rate = rate;
    }

    /// Grow the exchange rate by `yield_fraction`, e.g. `0.10` for +10%.
    pub fn accrue(&mut self, yield_fraction: Decimal) -> Result<Rate, MarketError> {
        let grown = Decimal::ONE
            .checked_add(yield_fraction)
            .and_then(|factor| self.rate.value().checked_mul(factor))
            .ok_or(AmountError::Overflow)?;
        self.rate = Rate::new(grown)?;
        Ok(self.rate)
    }

    pub fn set_liquidity(&mut self, liquidity: Option<Notional>) {
        self.liquidity = liquidity;
    }

    pub fn liquidity(&self) -> Option<Notional> {
        self.liquidity
    }
}

impl Default for InMemoryWrappedMarket {
    fn default() -> Self {
        Self::new(Rate::ONE)
    }
}

impl WrappedAssetMarket for InMemoryWrappedMarket {
    fn exchange_rate(&self) -> Rate {
        self.rate
    }

    fn max_redeemable(&self) -> WrappedAmount {
        match self.liquidity {
            None => WrappedAmount::MAX,
            Some(liquidity) => self
                .rate
                .notional_to_wrapped(liquidity, Rounding::Down)
                .unwrap_or(WrappedAmount::ZERO),
        }
    }

    fn wrap(&mut self, notional: Notional) -> Result<WrappedAmount, MarketError> {
        let wrapped = self.preview_withdraw(notional)?;
        if let Some(liquidity) = self.liquidity {
            self.liquidity = Some(liquidity.checked_add(notional)?);
        }
        Ok(wrapped)
    }

    fn redeem(&mut self, wrapped: WrappedAmount) -> Result<Notional, MarketError> {
        let notional = self.preview_redeem(wrapped)?;
        if let Some(liquidity) = self.liquidity {
            if notional > liquidity {
                return Err(MarketError::InsufficientLiquidity {
                    requested: notional.get(),
                    available: liquidity.get(),
                });
            }
            self.liquidity = Some(liquidity.checked_sub(notional)?);
        }
        Ok(notional)
    }
}
