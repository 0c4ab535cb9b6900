//! Deterministic `ln`/`exp`/`pow` via fixed-iteration Taylor series.
//!
//! The upstream `FixedPointMath.sol`-derived crate computes these with a
//! bit-manipulation algorithm operating on a 192.64 representation; we
//! don't have that source to port faithfully, and the spec calls for
//! "deterministic Taylor expansions with a fixed iteration count" directly,
//! so that's what this implements: range-reduce to a neighborhood of 1
//! (for `ln`) or 0 (for `exp`), then sum a fixed number of series terms.
//! Every platform that computes in `I256` gets the identical sequence of
//! integer operations, so results agree to the last ULP everywhere.

use crate::{fixed, FixedDecimal, FixedMathError, Result};

/// `ln(2)` to 18 decimals, used for range reduction in both `ln` and `exp`.
fn ln2() -> FixedDecimal {
    fixed!(0.693147180559945309)
}

const LN_SERIES_TERMS: u32 = 15;
const EXP_SERIES_TERMS: u32 = 25;

impl FixedDecimal {
    /// Natural log of `self`. Errors with [`FixedMathError::NegativeLog`] if
    /// `self <= 0`.
    pub fn ln(self) -> Result<Self> {
        if self.is_negative() || self.is_zero() {
            return Err(FixedMathError::NegativeLog);
        }

        // Range-reduce: write self = m * 2^k with m in [2/3, 4/3) so the
        // atanh-style series below converges in a fixed, small number of
        // terms regardless of how large or small `self` is.
        let two = fixed!(2);
        let two_thirds = fixed!(2) / fixed!(3);
        let four_thirds = fixed!(4) / fixed!(3);

        let mut m = self;
        let mut k: i64 = 0;
        while m >= four_thirds {
            m = m.checked_div(two)?;
            k += 1;
        }
        while m < two_thirds {
            m = m.checked_mul(two)?;
            k -= 1;
        }

        // ln(m) = 2 * atanh(v), v = (m - 1) / (m + 1), via the odd power
        // series v + v^3/3 + v^5/5 + ...
        let one = FixedDecimal::one();
        let v = m.checked_sub(one)?.checked_div(m.checked_add(one)?)?;
        let v_sq = v.checked_mul(v)?;
        let mut term = v;
        let mut sum = v;
        for i in 1..LN_SERIES_TERMS {
            term = term.checked_mul(v_sq)?;
            let denom = FixedDecimal::from_integer(2 * i as i64 + 1);
            sum = sum.checked_add(term.checked_div(denom)?)?;
        }
        let ln_m = sum.checked_mul(two)?;

        ln_m.checked_add(FixedDecimal::from_integer(k).checked_mul(ln2())?)
    }

    /// `e^self`.
    pub fn exp(self) -> Result<Self> {
        // Range-reduce: self = n * ln(2) + r, with |r| <= ln(2)/2, then
        // exp(self) = 2^n * exp(r) with exp(r) computed via Maclaurin series.
        let ln2 = ln2();
        let half_ln2 = ln2.checked_div(fixed!(2))?;

        let n = {
            // round self / ln2 to nearest integer, toward zero is fine for
            // this purpose since we just need |r| <= ln2/2.
            let quotient = self.checked_div(ln2)?;
            let whole = quotient.to_scaled() / crate::scale();
            let candidate = FixedDecimal::from_integer(i64::try_from(whole).unwrap_or(0));
            let mut n = candidate;
            let mut r = self.checked_sub(n.checked_mul(ln2)?)?;
            while r > half_ln2 {
                n = n.checked_add(FixedDecimal::one())?;
                r = self.checked_sub(n.checked_mul(ln2)?)?;
            }
            while r < half_ln2.neg() {
                n = n.checked_sub(FixedDecimal::one())?;
                r = self.checked_sub(n.checked_mul(ln2)?)?;
            }
            n
        };
        let r = self.checked_sub(n.checked_mul(ln2)?)?;

        let mut term = FixedDecimal::one();
        let mut sum = FixedDecimal::one();
        for i in 1..EXP_SERIES_TERMS {
            term = term.checked_mul(r)?.checked_div(FixedDecimal::from_integer(i as i64))?;
            sum = sum.checked_add(term)?;
        }

        let n_int: i64 = (n.to_scaled() / crate::scale())
            .try_into()
            .map_err(|_| FixedMathError::Overflow)?;
        if n_int >= 0 {
            let mut result = sum;
            for _ in 0..n_int {
                result = result.checked_mul(fixed!(2))?;
            }
            Ok(result)
        } else {
            let mut result = sum;
            for _ in 0..(-n_int) {
                result = result.checked_div(fixed!(2))?;
            }
            Ok(result)
        }
    }

    /// `self^exponent` computed as `exp(exponent * ln(self))`, with the fast
    /// paths from the spec: `pow(x, 0) = 1`, `pow(0, y) = 0` for `y != 0`,
    /// `pow(x, 1) = x`.
    pub fn pow(self, exponent: Self) -> Result<Self> {
        if exponent.is_zero() {
            return Ok(FixedDecimal::one());
        }
        if self.is_zero() {
            return Ok(FixedDecimal::zero());
        }
        if exponent == FixedDecimal::one() {
            return Ok(self);
        }
        self.ln()?.checked_mul(exponent)?.exp()
    }
}
