//! Fee model shared by both trade directions: a `curve_fee` charged against
//! the slippage a trade causes, an optional `flat_fee` on the matured
//! portion, a `floor_fee` clamp for small trades, and a `governance_fee`
//! split taken out of the curve fee.

use fixedpointmath::FixedDecimal;

use crate::PoolConfig;

/// Applies the curve fee to a slippage differential, then clamps the
/// result upward to `amount * floor_fee` if a floor fee is configured and
/// the unclamped fee would fall short of it.
///
/// `differential` is `|no_slippage_reference - actual_outcome|`, already
/// non-negative by construction at call sites.
pub fn curve_fee(config: &PoolConfig, differential: FixedDecimal, amount: FixedDecimal) -> FixedDecimal {
    let fee = config.curve_fee * differential;
    match config.floor_fee {
        Some(floor) => fee.max(amount * floor),
        None => fee,
    }
}

/// The flat fee charged on the matured (non-curve) portion of a trade,
/// i.e. the `(1 - t)` fraction of the position that has already reached
/// term.
pub fn flat_fee(config: &PoolConfig, amount: FixedDecimal, time_remaining: FixedDecimal) -> FixedDecimal {
    let matured_fraction = FixedDecimal::one() - time_remaining;
    config.flat_fee * amount * matured_fraction
}

/// The portion of a curve fee claimed by governance, booked separately from
/// the LP's share (see `Market`'s `governance_fees_accrued` accumulator).
pub fn governance_share(config: &PoolConfig, curve_fee_amount: FixedDecimal) -> FixedDecimal {
    config.governance_fee * curve_fee_amount
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixedpointmath::fixed;

    fn config(floor: Option<FixedDecimal>) -> PoolConfig {
        PoolConfig {
            initial_share_price: fixed!(1),
            time_stretch: crate::time::time_stretch_from_apr(fixed!(0.05)),
            curve_fee: fixed!(0.1),
            flat_fee: fixed!(0.05),
            governance_fee: fixed!(0.1),
            floor_fee: floor,
            minimum_share_reserves: fixed!(0),
            minimum_transaction_amount: fixed!(0),
            position_duration_days: fixed!(365),
        }
    }

    #[test]
    fn curve_fee_without_floor_is_proportional() {
        let cfg = config(None);
        let fee = curve_fee(&cfg, fixed!(100), fixed!(1_000));
        assert_eq!(fee, fixed!(10));
    }

    #[test]
    fn curve_fee_is_clamped_by_floor_for_small_trades() {
        let cfg = config(Some(fixed!(0.05)));
        // curve fee on a near-zero differential would be ~0, but the floor
        // guarantees at least 5% of the trade amount.
        let fee = curve_fee(&cfg, fixed!(0), fixed!(1_000));
        assert_eq!(fee, fixed!(50));
    }

    #[test]
    fn flat_fee_is_zero_when_time_remaining_is_a_full_unit() {
        let cfg = config(None);
        assert_eq!(flat_fee(&cfg, fixed!(1_000), FixedDecimal::one()), FixedDecimal::zero());
    }

    #[test]
    fn flat_fee_is_full_rate_at_maturity() {
        let cfg = config(None);
        let fee = flat_fee(&cfg, fixed!(1_000), FixedDecimal::zero());
        assert_eq!(fee, fixed!(50));
    }
}
