//! The pricing model sum type and its trade-surface calculations.
//!
//! Rather than a class hierarchy (`PricingModel` / `ElementPricingModel` /
//! `HyperdrivePricingModel` in the reference implementation), the pricing
//! model is a tagged variant: `Hyperdrive` carries a share-adjusted
//! invariant (`mu` may differ from `c`), `Element` is the classic
//! YieldSpace invariant with `mu = c = 1` fixed at construction. Every
//! trade-surface function dispatches on this tag for the handful of places
//! `mu`/`c` differ; the invariant math itself (`yield_space`) is identical.

use eyre::{ensure, Result};
use fixedpointmath::FixedDecimal;

use crate::{fees, yield_space, MarketState, PoolConfig, Quantity, TradeBreakdown, TradeResult, Unit};

/// Which invariant variant a trade is priced under (see module docs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum PricingModel {
    #[default]
    Hyperdrive,
    Element,
}

impl PricingModel {
    /// The effective initial share price `mu` used by the invariant: the
    /// pool's configured value for `Hyperdrive`, fixed at `1` for
    /// `Element`.
    pub fn mu(&self, config: &PoolConfig) -> FixedDecimal {
        match self {
            PricingModel::Hyperdrive => config.initial_share_price,
            PricingModel::Element => FixedDecimal::one(),
        }
    }

    /// The effective current share price `c`: the pool's live share price
    /// for `Hyperdrive`, fixed at `1` for `Element`.
    pub fn c(&self, state: &MarketState) -> FixedDecimal {
        match self {
            PricingModel::Hyperdrive => state.share_price,
            PricingModel::Element => FixedDecimal::one(),
        }
    }

    fn k(&self, config: &PoolConfig, state: &MarketState, t: FixedDecimal) -> Result<FixedDecimal> {
        yield_space::invariant_k(
            self.mu(config),
            self.c(state),
            state.share_reserves,
            state.bond_reserves,
            t,
        )
    }

    /// `p = ((y + z*c) / (mu*z))^t`.
    pub fn calc_spot_price(&self, config: &PoolConfig, state: &MarketState, t: FixedDecimal) -> Result<FixedDecimal> {
        yield_space::spot_price(
            self.mu(config),
            self.c(state),
            state.share_reserves,
            state.bond_reserves,
            t,
        )
    }

    /// The fixed APR implied by the pool's current spot price.
    pub fn calc_apr_from_reserves(
        &self,
        config: &PoolConfig,
        state: &MarketState,
        t: FixedDecimal,
    ) -> Result<FixedDecimal> {
        let p = self.calc_spot_price(config, state, t)?;
        let term_years = config.position_duration_days / crate::time::days_per_year();
        yield_space::apr_from_spot_price(p, term_years)
    }

    /// Given an input quantity, returns the output after both the curve fee
    /// and the flat fee on the matured (`1 - t`) portion are deducted.
    /// Dispatches on `in_quantity.unit`:
    ///
    /// - `Base`: the trader pays base and receives bonds (opening a long).
    /// - `Pt`: the trader pays bonds and receives base (closing a long, or
    ///   the curve leg of closing a short).
    pub fn calc_out_given_in(
        &self,
        config: &PoolConfig,
        state: &MarketState,
        in_quantity: Quantity,
        t: FixedDecimal,
    ) -> Result<TradeResult> {
        ensure!(in_quantity.amount > FixedDecimal::zero(), "calc_out_given_in: amount must be positive");
        let mu = self.mu(config);
        let c = self.c(state);
        let k = self.k(config, state, t)?;
        let p = self.calc_spot_price(config, state, t)?;

        match in_quantity.unit {
            Unit::Base => {
                let amount = in_quantity.amount;
                let share_delta = amount / c;
                let z_new = state.share_reserves + share_delta;
                let y_new = yield_space::bond_reserves_given_shares(k, mu, c, z_new, t)?;
                let without_fee = state.bond_reserves - y_new;
                ensure!(without_fee > FixedDecimal::zero(), "calc_out_given_in: non-positive bond output");

                let without_fee_or_slippage = amount / p;
                let differential = if without_fee > amount {
                    without_fee - amount
                } else {
                    FixedDecimal::zero()
                };
                let fee = fees::curve_fee(config, differential, amount) + fees::flat_fee(config, amount, t);
                let with_fee = without_fee - fee;
                ensure!(with_fee > FixedDecimal::zero(), "calc_out_given_in: fee exceeds output");

                Ok(TradeResult {
                    without_fee_or_slippage,
                    without_fee,
                    with_fee,
                    fee,
                    breakdown: TradeBreakdown::Pt,
                })
            }
            Unit::Pt => {
                let amount = in_quantity.amount;
                let y_new = state.bond_reserves + amount;
                let z_new = yield_space::share_reserves_given_bonds(k, mu, c, y_new, t)?;
                let share_delta = state.share_reserves - z_new;
                let without_fee = share_delta * c;
                ensure!(without_fee > FixedDecimal::zero(), "calc_out_given_in: non-positive base output");

                let without_fee_or_slippage = amount * p;
                let differential = if amount > without_fee {
                    amount - without_fee
                } else {
                    FixedDecimal::zero()
                };
                let fee = fees::curve_fee(config, differential, amount) + fees::flat_fee(config, amount, t);
                let with_fee = without_fee - fee;
                ensure!(with_fee > FixedDecimal::zero(), "calc_out_given_in: fee exceeds output");

                Ok(TradeResult {
                    without_fee_or_slippage,
                    without_fee,
                    with_fee,
                    fee,
                    breakdown: TradeBreakdown::Base,
                })
            }
            other => Err(eyre::eyre!("calc_out_given_in: unsupported input unit {other:?}")),
        }
    }

    /// The inverse problem: given a desired output quantity, returns the
    /// fee-adjusted input required. Derived by the same invariant
    /// substitution as [`PricingModel::calc_out_given_in`], with the fee
    /// applied in the direction that increases cost / decreases proceeds
    /// for the trader rather than decreasing output, since here the
    /// magnitude being solved for is the input.
    pub fn calc_in_given_out(
        &self,
        config: &PoolConfig,
        state: &MarketState,
        out_quantity: Quantity,
        t: FixedDecimal,
    ) -> Result<TradeResult> {
        ensure!(out_quantity.amount > FixedDecimal::zero(), "calc_in_given_out: amount must be positive");
        let mu = self.mu(config);
        let c = self.c(state);
        let k = self.k(config, state, t)?;
        let p = self.calc_spot_price(config, state, t)?;

        match out_quantity.unit {
            Unit::Pt => {
                // The trader wants `amount` bonds out; solve the base they
                // must pay in.
                let amount = out_quantity.amount;
                ensure!(state.bond_reserves > amount, "calc_in_given_out: insufficient bond reserves");
                let y_new = state.bond_reserves - amount;
                let z_new = yield_space::share_reserves_given_bonds(k, mu, c, y_new, t)?;
                ensure!(z_new > state.share_reserves, "calc_in_given_out: non-positive base input");
                let without_fee = (z_new - state.share_reserves) * c;

                let without_fee_or_slippage = amount * p;
                let differential = if without_fee > without_fee_or_slippage {
                    without_fee - without_fee_or_slippage
                } else {
                    FixedDecimal::zero()
                };
                let fee = fees::curve_fee(config, differential, amount) + fees::flat_fee(config, amount, t);
                let with_fee = without_fee + fee;

                Ok(TradeResult {
                    without_fee_or_slippage,
                    without_fee,
                    with_fee,
                    fee,
                    breakdown: TradeBreakdown::Base,
                })
            }
            Unit::Base => {
                // The trader wants `amount` base out; solve the bonds they
                // must pay in.
                let amount = out_quantity.amount;
                let share_delta = amount / c;
                ensure!(state.share_reserves > share_delta, "calc_in_given_out: insufficient share reserves");
                let z_new = state.share_reserves - share_delta;
                let y_new = yield_space::bond_reserves_given_shares(k, mu, c, z_new, t)?;
                ensure!(y_new > state.bond_reserves, "calc_in_given_out: non-positive bond input");
                let without_fee = y_new - state.bond_reserves;

                let without_fee_or_slippage = amount / p;
                let differential = if without_fee > without_fee_or_slippage {
                    without_fee - without_fee_or_slippage
                } else {
                    FixedDecimal::zero()
                };
                let fee = fees::curve_fee(config, differential, amount) + fees::flat_fee(config, without_fee, t);
                let with_fee = without_fee + fee;

                Ok(TradeResult {
                    without_fee_or_slippage,
                    without_fee,
                    with_fee,
                    fee,
                    breakdown: TradeBreakdown::Pt,
                })
            }
            other => Err(eyre::eyre!("calc_in_given_out: unsupported output unit {other:?}")),
        }
    }

    /// Solves for the bond reserves that pair with `share_reserves` to hit
    /// `target_apr` over a term of `position_duration_days`, at pool
    /// initialization (`t = 1`, full term remaining).
    pub fn calc_bond_reserves(
        &self,
        config: &PoolConfig,
        share_reserves: FixedDecimal,
        share_price: FixedDecimal,
        target_apr: FixedDecimal,
    ) -> Result<FixedDecimal> {
        let term_years = config.position_duration_days / crate::time::days_per_year();
        let p = yield_space::spot_price_from_apr(target_apr, term_years);
        let mu = match self {
            PricingModel::Hyperdrive => config.initial_share_price,
            PricingModel::Element => FixedDecimal::one(),
        };
        // p = ((y + z*c) / (mu*z)) ^ t, t = full_term_time_remaining at init, solved for y:
        let t = crate::time::full_term_time_remaining(config.position_duration_days, config.time_stretch);
        let y = p.pow(FixedDecimal::one() / t)? * mu * share_reserves - share_reserves * share_price;
        Ok(y)
    }

    /// Solves for the share reserves that pair with `bond_reserves` to hit
    /// `target_apr`, the mirror of [`PricingModel::calc_bond_reserves`].
    pub fn calc_share_reserves_for_target_apr(
        &self,
        config: &PoolConfig,
        bond_reserves: FixedDecimal,
        share_price: FixedDecimal,
        target_apr: FixedDecimal,
    ) -> Result<FixedDecimal> {
        let term_years = config.position_duration_days / crate::time::days_per_year();
        let p = yield_space::spot_price_from_apr(target_apr, term_years);
        let mu = match self {
            PricingModel::Hyperdrive => config.initial_share_price,
            PricingModel::Element => FixedDecimal::one(),
        };
        let t = crate::time::full_term_time_remaining(config.position_duration_days, config.time_stretch);
        let denominator = mu * p.pow(FixedDecimal::one() / t)? - share_price;
        ensure!(denominator > FixedDecimal::zero(), "calc_share_reserves_for_target_apr: non-positive denominator");
        Ok(bond_reserves / denominator)
    }

    /// LP tokens minted for a proportional base contribution: LP supply
    /// grows by the same proportion the share reserves do.
    pub fn calc_lp_out_given_base_in(
        &self,
        state: &MarketState,
        base_in: FixedDecimal,
    ) -> Result<FixedDecimal> {
        let c = self.c(state);
        if state.lp_total_supply.is_zero() {
            return Ok(base_in / c);
        }
        let share_in = base_in / c;
        Ok(state.lp_total_supply * (share_in / state.share_reserves))
    }

    /// Base and bond reserves released for a proportional LP redemption.
    pub fn calc_tokens_out_given_lp_in(
        &self,
        state: &MarketState,
        lp_in: FixedDecimal,
    ) -> Result<(FixedDecimal, FixedDecimal)> {
        ensure!(!state.lp_total_supply.is_zero(), "calc_tokens_out_given_lp_in: empty pool");
        let proportion = lp_in / state.lp_total_supply;
        let base_out = (state.share_reserves - state.share_buffer / self.c(state)) * proportion * self.c(state);
        let bonds_out = (state.bond_reserves - state.bond_buffer) * proportion;
        Ok((base_out, bonds_out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixedpointmath::fixed;

    fn config() -> PoolConfig {
        PoolConfig {
            initial_share_price: fixed!(1),
            time_stretch: crate::time::time_stretch_from_apr(fixed!(0.05)),
            curve_fee: fixed!(0.1),
            flat_fee: fixed!(0.05),
            governance_fee: fixed!(0.1),
            floor_fee: None,
            minimum_share_reserves: fixed!(1_000),
            minimum_transaction_amount: fixed!(1),
            position_duration_days: fixed!(365),
        }
    }

    fn state() -> MarketState {
        MarketState {
            share_reserves: fixed!(500_000),
            bond_reserves: fixed!(550_000),
            share_buffer: fixed!(0),
            bond_buffer: fixed!(0),
            lp_total_supply: fixed!(500_000),
            share_price: fixed!(1),
            variable_apr: fixed!(0.03),
            long_average_maturity_time: fixed!(0),
            short_average_maturity_time: fixed!(0),
        }
    }

    #[test]
    fn element_and_hyperdrive_agree_when_mu_equals_c() {
        let cfg = config();
        let st = state();
        let t = fixed!(0.9);
        let hp = PricingModel::Hyperdrive.calc_spot_price(&cfg, &st, t).unwrap();
        let el = PricingModel::Element.calc_spot_price(&cfg, &st, t).unwrap();
        let tolerance = fixed!(0.000000000000001); // 1e-15
        let diff = if hp > el { hp - el } else { el - hp };
        assert!(diff <= tolerance, "hp={hp} el={el}");
    }

    #[test]
    fn opening_then_closing_a_long_never_profits() {
        let cfg = config();
        let st = state();
        let t = crate::time::full_term_time_remaining(cfg.position_duration_days, cfg.time_stretch);
        let base_in = fixed!(10_000);

        let open = PricingModel::Hyperdrive
            .calc_out_given_in(&cfg, &st, Quantity::base(base_in), t)
            .unwrap();

        let mut after_open = st;
        after_open.share_reserves = after_open.share_reserves + base_in / cfg.initial_share_price;
        after_open.bond_reserves = after_open.bond_reserves - open.with_fee;

        let close = PricingModel::Hyperdrive
            .calc_out_given_in(&cfg, &after_open, Quantity::pt(open.with_fee), t)
            .unwrap();

        assert!(close.with_fee <= base_in, "round trip produced free lunch: {} > {}", close.with_fee, base_in);
    }

    #[test]
    fn fee_is_never_negative() {
        let cfg = config();
        let st = state();
        let t = crate::time::full_term_time_remaining(cfg.position_duration_days, cfg.time_stretch);
        let result = PricingModel::Hyperdrive
            .calc_out_given_in(&cfg, &st, Quantity::base(fixed!(5_000)), t)
            .unwrap();
        assert!(result.fee >= FixedDecimal::zero());
        let diff = if result.with_fee > result.without_fee {
            result.with_fee - result.without_fee
        } else {
            result.without_fee - result.with_fee
        };
        assert_eq!(diff, result.fee);
    }
}
