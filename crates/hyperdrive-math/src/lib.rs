//! Closed-form solver for the YieldSpace invariant
//! `(c/mu)*(mu*z)^(1-t) + y^(1-t) = k` used by a Hyperdrive-style
//! fixed-rate lending AMM, plus the derived quantities (spot price, APR,
//! max-trade bounds, reserve initialization) built on top of it.
//!
//! This crate is pure: nothing here mutates state or knows about wallets,
//! agents or a block clock. [`PricingModel`]'s methods take a [`PoolConfig`]
//! and a [`MarketState`] by reference and return a [`TradeResult`] or an
//! error; the `hyperdrive-sim` crate is the only thing that turns those
//! results into reserve and wallet deltas.

pub mod fees;
pub mod max_long;
pub mod max_short;
pub mod pricing_model;
pub mod reserves;
pub mod time;
pub mod yield_space;

pub use fixedpointmath::{fixed, FixedDecimal};
pub use pricing_model::PricingModel;

use serde::{Deserialize, Serialize};

/// Static, per-pool parameters that don't change on a per-trade basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// `mu`: the share price at pool initialization.
    pub initial_share_price: FixedDecimal,
    /// `tau`: the time-stretch constant controlling slippage curvature.
    pub time_stretch: FixedDecimal,
    pub curve_fee: FixedDecimal,
    pub flat_fee: FixedDecimal,
    pub governance_fee: FixedDecimal,
    /// Minimum effective fee ratio; `None` disables the floor.
    pub floor_fee: Option<FixedDecimal>,
    /// Share reserves (scaled by the share price) that must remain after
    /// any trade.
    pub minimum_share_reserves: FixedDecimal,
    pub minimum_transaction_amount: FixedDecimal,
    pub position_duration_days: FixedDecimal,
}

/// The mutable reserves and running accumulators of a single pool.
///
/// Buffers, LP supply, and the variable APR series live in the simulation
/// layer's `Market`, which owns one `MarketState` per pool; this crate only
/// reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    /// `z`: share reserves.
    pub share_reserves: FixedDecimal,
    /// `y`: bond reserves.
    pub bond_reserves: FixedDecimal,
    pub share_buffer: FixedDecimal,
    pub bond_buffer: FixedDecimal,
    pub lp_total_supply: FixedDecimal,
    /// `c`: the current share price.
    pub share_price: FixedDecimal,
    pub variable_apr: FixedDecimal,
    pub long_average_maturity_time: FixedDecimal,
    pub short_average_maturity_time: FixedDecimal,
}

/// The unit a [`Quantity`] or [`TradeResult`] leg is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Base,
    Pt,
    Shares,
    Lp,
}

/// An amount paired with the unit it's denominated in. The unit is fixed at
/// construction and never implicitly reinterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub amount: FixedDecimal,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(amount: FixedDecimal, unit: Unit) -> Self {
        Self { amount, unit }
    }

    pub fn base(amount: FixedDecimal) -> Self {
        Self::new(amount, Unit::Base)
    }

    pub fn pt(amount: FixedDecimal) -> Self {
        Self::new(amount, Unit::Pt)
    }
}

/// A finer-grained accounting of how a trade's headline amount was derived,
/// used both for the trade log (§6) and for property tests (§8).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    /// What the trader would have received/paid if the pool charged no fee
    /// and had no slippage (the reference, spot-price-only outcome).
    pub without_fee_or_slippage: FixedDecimal,
    /// The curve-determined outcome before fees are applied.
    pub without_fee: FixedDecimal,
    /// The final outcome after fees are applied; this is the number that
    /// actually moves reserves and wallets.
    pub with_fee: FixedDecimal,
    /// The fee charged, always non-negative.
    pub fee: FixedDecimal,
    pub breakdown: TradeBreakdown,
}

/// The unit the output leg of a [`TradeResult`] is denominated in, needed
/// by callers since `without_fee`/`with_fee` don't carry a `Unit` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeBreakdown {
    /// The trade produced (or consumed) base.
    Base,
    /// The trade produced (or consumed) bonds (principal tokens).
    Pt,
}
