//! Asset conversion between the settlement stablecoin and the wrapped asset
//!
//! Opens wrap notional with the round-up preview. Draws and closes redeem a
//! slice of wrapped holdings back into notional up to the market's redeemable
//! liquidity; whatever cannot be redeemed is paid out as residual wrapped.
//! Value the slice gained through appreciation beyond what a payout needs is
//! applied to the borrower's debt before anything is returned to them.

use tracing::{debug, warn};
use types::ids::AccountId;
use types::numeric::{Notional, Rounding, WrappedAmount};

use crate::errors::CreditError;
use crate::ledger::LendingLedger;
use crate::market::WrappedAssetMarket;

/// Value delivered by a redemption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Payout {
    pub notional: Notional,
    /// Wrapped units that could not be redeemed and are delivered as-is
    pub wrapped: WrappedAmount,
}

impl Payout {
    /// Settlement value of the payout at the market's current rate, rounded down.
    pub fn value<M: WrappedAssetMarket>(&self, market: &M) -> Result<Notional, CreditError> {
        let residual = market
            .exchange_rate()
            .wrapped_to_notional(self.wrapped, Rounding::Down)?;
        Ok(self.notional.checked_add(residual)?)
    }
}

/// How much of a wrapped slice a payout needs, and what is left over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceSplit {
    pub needed: WrappedAmount,
    pub excess: WrappedAmount,
}

/// Result of routing excess value to the borrower's debt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExcessSplit {
    pub to_debt: Notional,
    pub remainder: Notional,
}

/// Wrapped units held for an open of `amount`, using the round-up preview.
pub fn wrapped_equivalent<M: WrappedAssetMarket>(
    market: &M,
    amount: Notional,
) -> Result<WrappedAmount, CreditError> {
    Ok(market.preview_withdraw(amount)?)
}

/// Split `slice` into the wrapped units needed to deliver `amount` and the excess.
pub fn split_slice<M: WrappedAssetMarket>(
    market: &M,
    amount: Notional,
    slice: WrappedAmount,
) -> Result<SliceSplit, CreditError> {
    let needed = market.preview_withdraw(amount)?.min(slice);
    Ok(SliceSplit {
        needed,
        excess: slice.checked_sub(needed)?,
    })
}

/// Redeem as much of `wrapped` as the market allows. The rest is returned as
/// residual wrapped in the payout.
pub fn redeem_all<M: WrappedAssetMarket>(
    market: &mut M,
    wrapped: WrappedAmount,
) -> Result<Payout, CreditError> {
    let redeemable = wrapped.min(market.max_redeemable());
    let notional = if redeemable.is_zero() {
        Notional::ZERO
    } else {
        market.redeem(redeemable)?
    };
    let residual = wrapped.checked_sub(redeemable)?;
    if !residual.is_zero() {
        warn!(
            requested = wrapped.get(),
            redeemed = redeemable.get(),
            residual = residual.get(),
            "redemption liquidity short, paying residual wrapped"
        );
    }
    Ok(Payout {
        notional,
        wrapped: residual,
    })
}

/// Apply `excess` to the borrower's debt and return what is left for the borrower.
pub fn apply_excess<L: LendingLedger>(
    ledger: &mut L,
    borrower: &AccountId,
    excess: Notional,
) -> Result<ExcessSplit, CreditError> {
    if excess.is_zero() {
        return Ok(ExcessSplit::default());
    }
    let to_debt = ledger.repay_debt(borrower, excess)?;
    let remainder = excess.checked_sub(to_debt)?;
    debug!(
        borrower = %borrower,
        to_debt = to_debt.get(),
        remainder = remainder.get(),
        "excess routed"
    );
    Ok(ExcessSplit { to_debt, remainder })
}
