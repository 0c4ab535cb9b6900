//! Time-stretch and time-remaining helpers.

use fixedpointmath::{fixed, FixedDecimal};

/// Days in a year used to convert day counts to year-fractions throughout
/// the pricing model, matching the convention of the reference
/// implementation this crate is ported from.
pub fn days_per_year() -> FixedDecimal {
    fixed!(365)
}

/// Derives the time-stretch constant `tau` from a target fixed APR,
/// following the reference implementation's
/// `3.09396 / (0.02789 * apr * 100)`.
pub fn time_stretch_from_apr(target_apr: FixedDecimal) -> FixedDecimal {
    let numerator = fixed!(3.09396);
    let denominator = fixed!(0.02789) * target_apr * fixed!(100);
    numerator / denominator
}

/// Stretched time remaining `t` for a position minted at `mint_time`
/// (year-fraction) observed at `block_time`, given a term of
/// `position_duration_days` and time-stretch `tau`.
///
/// `t = years_remaining / tau`, following the reference implementation's
/// `days_to_time_remaining`. This is *not* a `[0, 1]`-bounded fraction: at
/// open, `years_remaining` equals the full term and `t` is on the order of
/// `1/tau` (small for the time-stretch values this model uses); it falls to
/// `0` at maturity. The invariant's actual exponent is `1 - t`
/// (`time_elapsed`), which is therefore close to `1` at open and `1` at
/// maturity, never `0`.
pub fn time_remaining(
    block_time: FixedDecimal,
    mint_time: FixedDecimal,
    position_duration_days: FixedDecimal,
    time_stretch: FixedDecimal,
) -> eyre::Result<FixedDecimal> {
    let term_years = position_duration_days / days_per_year();
    let elapsed = (block_time - mint_time).max(FixedDecimal::zero());
    let years_remaining = (term_years - elapsed).max(FixedDecimal::zero());
    Ok(years_remaining / time_stretch)
}

/// The stretched time parameter for a freshly-opened position, i.e. the
/// full term: `(position_duration_days / 365) / tau`.
pub fn full_term_time_remaining(position_duration_days: FixedDecimal, time_stretch: FixedDecimal) -> FixedDecimal {
    (position_duration_days / days_per_year()) / time_stretch
}

/// Updates a running weighted average when `delta` is added (sign `+1`) or
/// removed (sign `-1`) with weight `delta_weight` at value `value`,
/// following the weighted-average update rule used for maturity-time
/// tracking: `avg' = (w*avg (+/-) delta_weight*value) / (w (+/-) delta_weight)`,
/// with the degenerate `w' = 0 => avg' = 0` case handled explicitly.
pub fn weighted_average_update(
    weight: FixedDecimal,
    average: FixedDecimal,
    delta_weight: FixedDecimal,
    value: FixedDecimal,
    adding: bool,
) -> FixedDecimal {
    let new_weight = if adding {
        weight + delta_weight
    } else {
        weight - delta_weight
    };
    if new_weight.is_zero() {
        return FixedDecimal::zero();
    }
    let numerator = if adding {
        weight * average + delta_weight * value
    } else {
        weight * average - delta_weight * value
    };
    numerator / new_weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_stretch_decreases_with_higher_apr() {
        let low = time_stretch_from_apr(fixed!(0.01));
        let high = time_stretch_from_apr(fixed!(0.2));
        assert!(high < low);
    }

    #[test]
    fn full_term_matches_full_term_time_remaining() {
        let t = time_remaining(fixed!(0), fixed!(0), fixed!(365), fixed!(22.18)).unwrap();
        assert_eq!(t, full_term_time_remaining(fixed!(365), fixed!(22.18)));
        assert!(t < FixedDecimal::one());
    }

    #[test]
    fn matured_position_has_t_at_zero() {
        let t = time_remaining(fixed!(1), fixed!(0), fixed!(365), fixed!(22.18)).unwrap();
        assert_eq!(t, FixedDecimal::zero());
    }

    #[test]
    fn time_stretch_of_one_makes_full_term_time_remaining_equal_one() {
        let t = full_term_time_remaining(fixed!(365), fixed!(1));
        assert_eq!(t, FixedDecimal::one());
    }

    #[test]
    fn weighted_average_degenerates_to_zero_when_weight_empties() {
        let avg = weighted_average_update(fixed!(5), fixed!(10), fixed!(5), fixed!(0), false);
        assert_eq!(avg, FixedDecimal::zero());
    }
}
