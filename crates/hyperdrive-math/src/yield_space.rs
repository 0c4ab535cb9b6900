//! The YieldSpace invariant and its closed-form inverses.
//!
//! $$
//! k = \frac{c}{\mu} \cdot (\mu z)^{1-t} + y^{1-t}
//! $$
//!
//! where `z` is share reserves, `y` is bond reserves, `c` the current share
//! price, `mu` the initial share price, and `t` the stretched time
//! remaining. Every pricing-model calculation either evaluates `k` or
//! solves it for one reserve given the other.

use eyre::{ensure, Result};
use fixedpointmath::{fixed, FixedDecimal};

/// Evaluates the invariant constant `k` for the given reserves.
pub fn invariant_k(
    mu: FixedDecimal,
    c: FixedDecimal,
    z: FixedDecimal,
    y: FixedDecimal,
    t: FixedDecimal,
) -> Result<FixedDecimal> {
    let one_minus_t = FixedDecimal::one() - t;
    let share_term = (c / mu) * (mu * z).pow(one_minus_t)?;
    let bond_term = y.pow(one_minus_t)?;
    Ok(share_term + bond_term)
}

/// Solves the invariant for bond reserves `y'` given a new share reserve
/// `z_new`, i.e. the reserves a pool ends up at after shares move.
///
/// $$
/// y' = \left( k - \frac{c}{\mu} (\mu z')^{1-t} \right)^{\frac{1}{1-t}}
/// $$
pub fn bond_reserves_given_shares(
    k: FixedDecimal,
    mu: FixedDecimal,
    c: FixedDecimal,
    z_new: FixedDecimal,
    t: FixedDecimal,
) -> Result<FixedDecimal> {
    let one_minus_t = FixedDecimal::one() - t;
    let share_term = (c / mu) * (mu * z_new).pow(one_minus_t)?;
    ensure!(k >= share_term, "yield space: share term exceeds k, negative bond reserves");
    let remainder = k - share_term;
    Ok(remainder.pow(FixedDecimal::one() / one_minus_t)?)
}

/// Solves the invariant for share reserves `z'` given a new bond reserve
/// `y_new`.
///
/// $$
/// z' = \frac{1}{\mu} \left( \frac{\mu}{c} \left( k - y'^{1-t} \right) \right)^{\frac{1}{1-t}}
/// $$
pub fn share_reserves_given_bonds(
    k: FixedDecimal,
    mu: FixedDecimal,
    c: FixedDecimal,
    y_new: FixedDecimal,
    t: FixedDecimal,
) -> Result<FixedDecimal> {
    let one_minus_t = FixedDecimal::one() - t;
    let bond_term = y_new.pow(one_minus_t)?;
    ensure!(k >= bond_term, "yield space: bond term exceeds k, negative share reserves");
    let remainder = (k - bond_term) * (mu / c);
    let z_pow = remainder.pow(FixedDecimal::one() / one_minus_t)?;
    Ok(z_pow / mu)
}

/// Spot price of one bond in base units:
/// `p = ((y + z*c) / (mu*z)) ^ t`.
pub fn spot_price(
    mu: FixedDecimal,
    c: FixedDecimal,
    z: FixedDecimal,
    y: FixedDecimal,
    t: FixedDecimal,
) -> Result<FixedDecimal> {
    ensure!(!z.is_zero(), "yield space: spot price undefined for zero share reserves");
    let numerator = y + z * c;
    let denominator = mu * z;
    Ok((numerator / denominator).pow(t)?)
}

/// The fixed APR implied by a spot price over a term of `term_years`:
/// `apr = (1 - p) / (p * term_years)`.
pub fn apr_from_spot_price(spot_price: FixedDecimal, term_years: FixedDecimal) -> Result<FixedDecimal> {
    ensure!(!spot_price.is_zero(), "yield space: apr undefined for zero spot price");
    Ok((FixedDecimal::one() - spot_price) / (spot_price * term_years))
}

/// Inverts [`apr_from_spot_price`]: `p = 1 / (1 + apr * term_years)`.
pub fn spot_price_from_apr(apr: FixedDecimal, term_years: FixedDecimal) -> FixedDecimal {
    fixed!(1) / (fixed!(1) + apr * term_years)
}
