//! The `fixed!` convenience macro, filling in for the proc-macro crate the
//! upstream workspace splits out (`fixed_point_macros`). `fixed!(1)`
//! constructs the `FixedDecimal` for the decimal value `1.0`; `fixed!(0.01)`
//! is `0.01`; `fixed!(1.5e3)` is `1500.0`. The literal is parsed at runtime
//! from its `stringify!`'d form and scaled by `10^18` the same way
//! `FixedDecimal`'s `FromStr` impl scales a parsed string, which is
//! adequate for the handful of call sites per expression this crate has
//! (pricing-model constants, tests).

use ethers::types::I256;

use crate::{FixedDecimal, DECIMALS};

#[doc(hidden)]
pub fn parse_raw_literal(src: &str) -> I256 {
    let cleaned: String = src.chars().filter(|c| *c != '_').collect();
    let (mantissa, exponent): (&str, i32) = match cleaned.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse().expect("invalid exponent in fixed! literal")),
        None => (cleaned.as_str(), 0),
    };
    let negative = mantissa.starts_with('-');
    let mantissa = mantissa.strip_prefix('-').unwrap_or(mantissa);
    let (whole, frac) = match mantissa.split_once('.') {
        Some((w, f)) => (w, f),
        None => (mantissa, ""),
    };
    let whole = if whole.is_empty() { "0" } else { whole };
    let digits: String = format!("{whole}{frac}");
    let magnitude: I256 = digits
        .parse::<i128>()
        .expect("fixed! literal mantissa too large")
        .into();
    // The literal denotes a decimal value, not an already-scaled one: shift
    // by the full 1e18 scale in addition to the literal's own exponent and
    // fractional digits, mirroring `FixedDecimal::from_str`.
    let power = DECIMALS as i32 + exponent - frac.len() as i32;
    let scaled = if power >= 0 {
        magnitude * I256::from(10u64).pow(power as u32)
    } else {
        magnitude / I256::from(10u64).pow((-power) as u32)
    };
    if negative {
        -scaled
    } else {
        scaled
    }
}

impl FixedDecimal {
    #[doc(hidden)]
    pub fn __from_raw_literal(src: &str) -> Self {
        Self::from_scaled(parse_raw_literal(src))
    }
}

/// Constructs a [`FixedDecimal`] from a decimal numeric literal, e.g.
/// `fixed!(1)` is `1.0` and `fixed!(0.05)` is `0.05`. Scientific notation is
/// also accepted: `fixed!(1.5e3)` is `1500.0`.
#[macro_export]
macro_rules! fixed {
    ($value:literal) => {
        $crate::FixedDecimal::__from_raw_literal(stringify!($value))
    };
}

#[cfg(test)]
mod tests {
    use crate::FixedDecimal;

    #[test]
    fn fixed_macro_parses_scientific_literals() {
        assert_eq!(fixed!(1), FixedDecimal::one());
        assert_eq!(fixed!(0), FixedDecimal::zero());
        assert_eq!(fixed!(0.01), FixedDecimal::one().checked_div(FixedDecimal::from_integer(100)).unwrap());
        assert_eq!(fixed!(1.5e3), FixedDecimal::from_integer(1500));
    }
}
