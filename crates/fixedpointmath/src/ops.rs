use std::ops::{Add, Div, Mul, Neg, Sub};

use ethers::types::I256;

use crate::{scale, FixedDecimal, FixedMathError, Result};

impl FixedDecimal {
    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(FixedMathError::Overflow)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(FixedMathError::Overflow)
    }

    /// `self * rhs`, rounding toward zero.
    pub fn checked_mul(self, rhs: Self) -> Result<Self> {
        let product = self.0.checked_mul(rhs.0).ok_or(FixedMathError::Overflow)?;
        product
            .checked_div(scale())
            .map(Self)
            .ok_or(FixedMathError::DivByZero)
    }

    /// `self * rhs`, rounding away from zero (up in magnitude).
    pub fn checked_mul_up(self, rhs: Self) -> Result<Self> {
        let product = self.0.checked_mul(rhs.0).ok_or(FixedMathError::Overflow)?;
        let s = scale();
        let quotient = product
            .checked_div(s)
            .ok_or(FixedMathError::DivByZero)?;
        let remainder = product.checked_rem(s).ok_or(FixedMathError::DivByZero)?;
        if !remainder.is_zero() && product.is_positive() == s.is_positive() {
            Ok(Self(quotient + I256::from(1)))
        } else {
            Ok(Self(quotient))
        }
    }

    /// `self / rhs`, rounding toward zero.
    pub fn checked_div(self, rhs: Self) -> Result<Self> {
        if rhs.0.is_zero() {
            return Err(FixedMathError::DivByZero);
        }
        let numerator = self.0.checked_mul(scale()).ok_or(FixedMathError::Overflow)?;
        numerator
            .checked_div(rhs.0)
            .map(Self)
            .ok_or(FixedMathError::DivByZero)
    }

    /// `self / rhs`, rounding away from zero (up in magnitude).
    pub fn checked_div_up(self, rhs: Self) -> Result<Self> {
        if rhs.0.is_zero() {
            return Err(FixedMathError::DivByZero);
        }
        let numerator = self.0.checked_mul(scale()).ok_or(FixedMathError::Overflow)?;
        let quotient = numerator
            .checked_div(rhs.0)
            .ok_or(FixedMathError::DivByZero)?;
        let remainder = numerator
            .checked_rem(rhs.0)
            .ok_or(FixedMathError::DivByZero)?;
        if !remainder.is_zero() && numerator.is_positive() == rhs.0.is_positive() {
            Ok(Self(quotient + I256::from(1)))
        } else {
            Ok(Self(quotient))
        }
    }

    /// `(self * mul) / div` computed with a single widened intermediate,
    /// rounding toward zero. Avoids the double-rounding that
    /// `self.checked_mul(mul)?.checked_div(div)` would incur.
    pub fn mul_div_down(self, mul: Self, div: Self) -> Result<Self> {
        if div.0.is_zero() {
            return Err(FixedMathError::DivByZero);
        }
        let product = self.0.checked_mul(mul.0).ok_or(FixedMathError::Overflow)?;
        product
            .checked_div(div.0)
            .map(Self)
            .ok_or(FixedMathError::DivByZero)
    }

    /// Like [`FixedDecimal::mul_div_down`] but rounds away from zero.
    pub fn mul_div_up(self, mul: Self, div: Self) -> Result<Self> {
        if div.0.is_zero() {
            return Err(FixedMathError::DivByZero);
        }
        let product = self.0.checked_mul(mul.0).ok_or(FixedMathError::Overflow)?;
        let quotient = product
            .checked_div(div.0)
            .ok_or(FixedMathError::DivByZero)?;
        let remainder = product
            .checked_rem(div.0)
            .ok_or(FixedMathError::DivByZero)?;
        if !remainder.is_zero() && product.is_positive() == div.0.is_positive() {
            Ok(Self(quotient + I256::from(1)))
        } else {
            Ok(Self(quotient))
        }
    }

    /// Convenience wrapper around [`FixedDecimal::checked_mul`] that panics
    /// on overflow, for call sites where the caller has already reasoned
    /// about the magnitude of its operands (mirrors the ergonomics of the
    /// upstream `FixedPoint` type, which panics the same way Solidity's
    /// checked arithmetic reverts).
    pub fn mul_up(self, rhs: Self) -> Self {
        self.checked_mul_up(rhs).expect("FixedDecimal mul_up overflow")
    }

    pub fn div_up(self, rhs: Self) -> Self {
        self.checked_div_up(rhs).expect("FixedDecimal div_up overflow")
    }
}

impl Add for FixedDecimal {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.checked_add(rhs).expect("FixedDecimal add overflow")
    }
}

impl Sub for FixedDecimal {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.checked_sub(rhs).expect("FixedDecimal sub overflow")
    }
}

impl Mul for FixedDecimal {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.checked_mul(rhs).expect("FixedDecimal mul overflow")
    }
}

impl Div for FixedDecimal {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        self.checked_div(rhs).expect("FixedDecimal div overflow")
    }
}

impl Neg for FixedDecimal {
    type Output = Self;
    fn neg(self) -> Self {
        FixedDecimal::neg(self)
    }
}

impl std::iter::Sum for FixedDecimal {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(FixedDecimal::zero(), |acc, x| acc + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed;

    #[test]
    fn mul_div_matches_expectation() {
        assert_eq!(fixed!(3) * fixed!(2), fixed!(6));
        assert_eq!(fixed!(6) / fixed!(2), fixed!(3));
        assert_eq!(fixed!(1) / fixed!(3) * fixed!(3) <= fixed!(1), true);
    }

    #[test]
    fn div_by_zero_is_checked_err() {
        assert_eq!(fixed!(1).checked_div(fixed!(0)), Err(FixedMathError::DivByZero));
    }

    #[test]
    fn mul_up_rounds_away_from_zero() {
        let third = fixed!(1).checked_div(fixed!(3)).unwrap();
        let rounded_up = fixed!(1).checked_div_up(fixed!(3)).unwrap();
        assert!(rounded_up.to_scaled() >= third.to_scaled());
    }

    #[test]
    fn mul_div_down_single_rounding() {
        let a = fixed!(1);
        let b = fixed!(2);
        let c = fixed!(3);
        assert_eq!(a.mul_div_down(b, c).unwrap(), fixed!(1).checked_mul(b).unwrap().checked_div(c).unwrap());
    }
}
