//! Share math with virtual offsets
//!
//! Maps notional amounts to facility shares and back. The virtual offsets make
//! an empty silo behave as if it already held `VIRTUAL_ASSETS` of principal
//! backed by `VIRTUAL_SHARES` shares, which removes the first-depositor case
//! where a tiny deposit followed by a donation inflates the share price.
//!
//! | Use              | Convert          | Rounding |
//! |------------------|------------------|----------|
//! | Open (deposit)   | assets -> shares | Down     |
//! | Draw / close     | assets -> shares | Up       |
//! | Report principal | shares -> assets | Down     |
//!
//! All functions take the totals as they are before the mutation being priced.

use types::errors::AmountError;
use types::numeric::{mul_div, Notional, Rounding, SharesAmount};

pub const VIRTUAL_SHARES: u128 = 1_000_000;
pub const VIRTUAL_ASSETS: u128 = 1;

/// `shares = assets * (total_shares + V_s) / (total_assets + V_a)`
pub fn to_shares(
    assets: Notional,
    total_assets: Notional,
    total_shares: SharesAmount,
    rounding: Rounding,
) -> Result<SharesAmount, AmountError> {
    mul_div(
        assets.get(),
        total_shares.get().checked_add(VIRTUAL_SHARES).ok_or(AmountError::Overflow)?,
        total_assets.get().checked_add(VIRTUAL_ASSETS).ok_or(AmountError::Overflow)?,
        rounding,
    )
    .map(SharesAmount::new)
}

/// `assets = shares * (total_assets + V_a) / (total_shares + V_s)`
pub fn to_assets(
    shares: SharesAmount,
    total_assets: Notional,
    total_shares: SharesAmount,
    rounding: Rounding,
) -> Result<Notional, AmountError> {
    mul_div(
        shares.get(),
        total_assets.get().checked_add(VIRTUAL_ASSETS).ok_or(AmountError::Overflow)?,
        total_shares.get().checked_add(VIRTUAL_SHARES).ok_or(AmountError::Overflow)?,
        rounding,
    )
    .map(Notional::new)
}

/// Shares minted for a deposit of `assets` (rounds against the depositor).
pub fn shares_for_deposit(
    assets: Notional,
    total_assets: Notional,
    total_shares: SharesAmount,
) -> Result<SharesAmount, AmountError> {
    to_shares(assets, total_assets, total_shares, Rounding::Down)
}

/// Shares burned to withdraw exactly `assets` (rounds against the withdrawer).
pub fn shares_for_withdrawal(
    assets: Notional,
    total_assets: Notional,
    total_shares: SharesAmount,
) -> Result<SharesAmount, AmountError> {
    to_shares(assets, total_assets, total_shares, Rounding::Up)
}

/// Principal reported for a share balance.
pub fn assets_for_shares(
    shares: SharesAmount,
    total_assets: Notional,
    total_shares: SharesAmount,
) -> Result<Notional, AmountError> {
    to_assets(shares, total_assets, total_shares, Rounding::Down)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: u128) -> Notional {
        Notional::new(v)
    }

    fn s(v: u128) -> SharesAmount {
        SharesAmount::new(v)
    }

    #[test]
    fn test_first_deposit() {
        // 1000 * (0 + 1e6) / (0 + 1)
        let shares = shares_for_deposit(n(1000), n(0), s(0)).unwrap();
        assert_eq!(shares, s(1_000_000_000));
    }

    #[test]
    fn test_deposit_then_report_never_exceeds_deposit() {
        let total_assets = n(10_000_000);
        let total_shares = s(10_000_000_000_000);
        let shares = shares_for_deposit(n(1_000_000), total_assets, total_shares).unwrap();
        let reported = assets_for_shares(
            shares,
            n(total_assets.get() + 1_000_000),
            s(total_shares.get() + shares.get()),
        )
        .unwrap();
        assert!(reported <= n(1_000_000));
    }

    #[test]
    fn test_withdrawal_rounds_up() {
        let total_assets = n(1000);
        let total_shares = s(999);
        let down = to_shares(n(100), total_assets, total_shares, Rounding::Down).unwrap();
        let up = shares_for_withdrawal(n(100), total_assets, total_shares).unwrap();
        assert!(up >= down);
        assert!(up.get() - down.get() <= 1);
    }

    #[test]
    fn test_inflation_attack_protection() {
        // Attacker deposits one unit, then donates a large amount to the silo.
        let attacker_shares = shares_for_deposit(n(1), n(0), s(0)).unwrap();
        let donated = 1_000_000u128;
        let total_assets = n(1 + donated);

        let victim_shares = shares_for_deposit(n(1_000_000), total_assets, attacker_shares).unwrap();
        assert!(victim_shares.get() > 1000, "victim must receive meaningful shares");

        let victim_value = assets_for_shares(
            victim_shares,
            n(total_assets.get() + 1_000_000),
            s(attacker_shares.get() + victim_shares.get()),
        )
        .unwrap();
        // The donation is not capturable: the victim keeps almost all of the deposit.
        assert!(victim_value.get() > 990_000);
    }

    #[test]
    fn test_dilution_increases_shares_per_unit() {
        // After principal is drawn pro-rata, the same deposit mints more shares.
        let before = shares_for_deposit(n(1000), n(1_000_000), s(1_000_000_000_000)).unwrap();
        let after = shares_for_deposit(n(1000), n(500_000), s(1_000_000_000_000)).unwrap();
        assert!(after > before);
    }

    #[test]
    fn test_empty_silo_reports_zero() {
        assert_eq!(assets_for_shares(s(0), n(0), s(0)).unwrap(), n(0));
    }
}
