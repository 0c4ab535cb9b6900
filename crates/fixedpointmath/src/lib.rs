//! Deterministic 18-decimal fixed point math.
//!
//! [`FixedDecimal`] is the only scalar type used across the simulation core:
//! reserves, prices, rates, durations and fees are all represented as a
//! signed integer scaled by `1e18`. Arithmetic is exact; `pow` is computed
//! via fixed-iteration Taylor series so that results agree bit-for-bit
//! across platforms, independent of the host's floating point unit.

mod error;
mod macros;
mod ops;
mod rand_support;
mod transcendental;

pub use error::{FixedMathError, Result};

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use ethers::types::I256;
use serde::{Deserialize, Serialize};

/// Number of decimal digits of precision carried by every [`FixedDecimal`].
pub const DECIMALS: u32 = 18;

/// `10^18` as a raw scaled value, i.e. `FixedDecimal::one().to_scaled()`.
pub fn scale() -> I256 {
    I256::from(10u64).pow(DECIMALS)
}

/// An 18-decimal fixed point scalar backed by a signed 256-bit integer.
///
/// All monetary quantities, rates, reserves, times-remaining and prices in
/// the simulation core are `FixedDecimal`. Comparisons and `add`/`sub` are
/// bit-exact; `mul`/`div` round toward zero unless an `_up` variant is used;
/// `pow` is a deterministic approximation (see [`FixedDecimal::pow`]).
#[derive(Copy, Clone, Eq, PartialEq, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixedDecimal(#[serde(with = "i256_serde")] I256);

impl FixedDecimal {
    /// Constructs a `FixedDecimal` from an already-scaled raw value, i.e.
    /// `FixedDecimal::from_scaled(I256::from(1_500_000_000_000_000_000i128))`
    /// is `1.5`.
    pub fn from_scaled(raw: I256) -> Self {
        Self(raw)
    }

    /// Returns the raw scaled representation.
    pub fn to_scaled(self) -> I256 {
        self.0
    }

    pub fn zero() -> Self {
        Self(I256::zero())
    }

    pub fn one() -> Self {
        Self(scale())
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_negative()
    }

    /// Constructs a `FixedDecimal` from an integer number of whole units,
    /// e.g. `FixedDecimal::from_integer(5)` is `5.0`.
    pub fn from_integer(units: i64) -> Self {
        Self(I256::from(units) * scale())
    }

    pub fn neg(self) -> Self {
        Self(-self.0)
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        if self.0 < other.0 {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self.0 > other.0 {
            self
        } else {
            other
        }
    }
}

impl fmt::Debug for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedDecimal({})", self)
    }
}

impl fmt::Display for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.0.is_negative();
        let abs = self.0.abs();
        let divisor = scale();
        let whole = abs / divisor;
        let frac = abs % divisor;
        if negative && !(whole.is_zero() && frac.is_zero()) {
            write!(f, "-")?;
        }
        write!(f, "{}.{:018}", whole, frac)
    }
}

impl FromStr for FixedDecimal {
    type Err = FixedMathError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let negative = s.starts_with('-');
        let s = s.strip_prefix('-').unwrap_or(s);
        let mut parts = s.splitn(2, '.');
        let whole_str = parts.next().unwrap_or("0");
        let frac_str = parts.next().unwrap_or("");
        if frac_str.len() > DECIMALS as usize {
            return Err(FixedMathError::ParseError(s.to_string()));
        }
        let whole: I256 = whole_str
            .parse::<i128>()
            .map_err(|_| FixedMathError::ParseError(s.to_string()))?
            .into();
        let mut frac_padded = frac_str.to_string();
        while frac_padded.len() < DECIMALS as usize {
            frac_padded.push('0');
        }
        let frac: I256 = if frac_padded.is_empty() {
            I256::zero()
        } else {
            frac_padded
                .parse::<i128>()
                .map_err(|_| FixedMathError::ParseError(s.to_string()))?
                .into()
        };
        let magnitude = whole * scale() + frac;
        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl PartialOrd for FixedDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FixedDecimal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

mod i256_serde {
    use ethers::types::I256;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &I256, serializer: S) -> Result<S::Ok, S::Error> {
        value.to_string().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<I256, D::Error> {
        let s = String::deserialize(deserializer)?;
        I256::from_dec_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_round_trip() {
        let values = ["0.0", "1.5", "-1.5", "123456.000000000000000001", "-0.1"];
        for v in values {
            let parsed: FixedDecimal = v.parse().unwrap();
            let rendered = parsed.to_string();
            let reparsed: FixedDecimal = rendered.parse().unwrap();
            assert_eq!(parsed, reparsed, "round trip failed for {v}");
        }
    }

    #[test]
    fn from_integer_matches_scale() {
        assert_eq!(FixedDecimal::from_integer(1), FixedDecimal::one());
        assert_eq!(FixedDecimal::from_integer(0), FixedDecimal::zero());
    }

    #[test]
    fn ordering_respects_sign() {
        let neg = FixedDecimal::from_integer(-5);
        let pos = FixedDecimal::from_integer(5);
        assert!(neg < pos);
        assert!(neg.abs() == pos);
    }
}
