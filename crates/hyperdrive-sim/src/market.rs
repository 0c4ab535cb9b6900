//! The market state machine: dispatches a [`MarketAction`] to the pricing
//! model, turns the result into reserve and wallet deltas, enforces buffer
//! invariants, and commits both atomically.

use fixedpointmath::{fixed, FixedDecimal};
use hyperdrive_math::{time, MarketState, PoolConfig, PricingModel, Quantity, TradeResult, Unit};
use serde::{Deserialize, Serialize};
use tracing::warn;

use hyperdrive_math::fees::governance_share;

use crate::error::{HyperdriveError, Result};
use crate::wallet::{Wallet, WalletDelta, WalletDeltas};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    OpenLong,
    CloseLong,
    OpenShort,
    CloseShort,
    AddLiquidity,
    RemoveLiquidity,
}

/// A trade a [`crate::policy::Policy`] wants to submit, before it has been
/// validated against the market. Close actions must name the `mint_time`
/// of an existing position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketAction {
    pub agent_id: u64,
    pub action_type: ActionType,
    pub trade_amount: FixedDecimal,
    pub mint_time: Option<FixedDecimal>,
    pub slippage_tolerance: FixedDecimal,
}

/// The read-only snapshot a policy observes; taken once at the start of a
/// block and shared by every agent polled in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketView {
    pub share_reserves: FixedDecimal,
    pub bond_reserves: FixedDecimal,
    pub share_buffer: FixedDecimal,
    pub bond_buffer: FixedDecimal,
    pub lp_total_supply: FixedDecimal,
    pub share_price: FixedDecimal,
    pub init_share_price: FixedDecimal,
    pub spot_price: FixedDecimal,
    pub fixed_apr: FixedDecimal,
    pub variable_apr: FixedDecimal,
    pub block_time: FixedDecimal,
    pub position_duration_days: FixedDecimal,
    pub minimum_share_reserves: FixedDecimal,
    pub minimum_transaction_amount: FixedDecimal,
    pub pool_config: PoolConfig,
    pub pricing_model: PricingModel,
}

impl MarketView {
    /// Reconstructs the full `MarketState` a pure pricing-model call needs
    /// (e.g. `calc_max_long`/`calc_max_short`), so policies can size trades
    /// against the pre-block snapshot without holding a `Market` reference.
    pub fn state(&self) -> MarketState {
        MarketState {
            share_reserves: self.share_reserves,
            bond_reserves: self.bond_reserves,
            share_buffer: self.share_buffer,
            bond_buffer: self.bond_buffer,
            lp_total_supply: self.lp_total_supply,
            share_price: self.share_price,
            variable_apr: self.variable_apr,
            long_average_maturity_time: FixedDecimal::zero(),
            short_average_maturity_time: FixedDecimal::zero(),
        }
    }
}

/// What applying a trade produced: the wallet-side deltas (for the caller
/// to apply to its own copy of the wallet) and the full fee breakdown (for
/// the trade log and property tests).
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub wallet_deltas: WalletDeltas,
    pub trade: TradeResult,
    pub mint_time: FixedDecimal,
}

/// Owns one pool's reserves and the block clock driving it.
#[derive(Debug, Clone)]
pub struct Market {
    pub config: PoolConfig,
    pub model: PricingModel,
    pub state: MarketState,
    pub block_time: FixedDecimal,
    pub blocks_per_day: u32,
    pub governance_fees_accrued: FixedDecimal,
}

impl Market {
    pub fn new(config: PoolConfig, model: PricingModel, state: MarketState, blocks_per_day: u32) -> Self {
        Self {
            config,
            model,
            state,
            block_time: FixedDecimal::zero(),
            blocks_per_day,
            governance_fees_accrued: FixedDecimal::zero(),
        }
    }

    pub fn view(&self) -> Result<MarketView> {
        let t = time::full_term_time_remaining(self.config.position_duration_days, self.config.time_stretch);
        let spot_price = self.model.calc_spot_price(&self.config, &self.state, t)?;
        let fixed_apr = self.model.calc_apr_from_reserves(&self.config, &self.state, t)?;
        Ok(MarketView {
            share_reserves: self.state.share_reserves,
            bond_reserves: self.state.bond_reserves,
            share_buffer: self.state.share_buffer,
            bond_buffer: self.state.bond_buffer,
            lp_total_supply: self.state.lp_total_supply,
            share_price: self.state.share_price,
            init_share_price: self.config.initial_share_price,
            spot_price,
            fixed_apr,
            variable_apr: self.state.variable_apr,
            block_time: self.block_time,
            position_duration_days: self.config.position_duration_days,
            minimum_share_reserves: self.config.minimum_share_reserves,
            minimum_transaction_amount: self.config.minimum_transaction_amount,
            pool_config: self.config,
            pricing_model: self.model,
        })
    }

    pub fn max_long(&self, wallet: &Wallet) -> Result<FixedDecimal> {
        let t = time::full_term_time_remaining(self.config.position_duration_days, self.config.time_stretch);
        Ok(self.model.calc_max_long(&self.config, &self.state, t, wallet.budget())?)
    }

    pub fn max_short(&self, wallet: &Wallet) -> Result<FixedDecimal> {
        let t = time::full_term_time_remaining(self.config.position_duration_days, self.config.time_stretch);
        Ok(self.model.calc_max_short(&self.config, &self.state, t, wallet.budget())?)
    }

    /// Advances the block clock by one block, updating `share_price` by the
    /// caller-supplied variable APR for the day and refreshing the running
    /// maturity-time averages.
    pub fn advance_time(&mut self, variable_apr: FixedDecimal) {
        let blocks_per_day = FixedDecimal::from_integer(self.blocks_per_day as i128);
        let dt_years = FixedDecimal::one() / (blocks_per_day * time::days_per_year());
        self.block_time = self.block_time + dt_years;
        self.state.share_price = self.state.share_price * (FixedDecimal::one() + variable_apr * dt_years);
        self.state.variable_apr = variable_apr;
    }

    fn require_min_amount(&self, amount: FixedDecimal) -> Result<()> {
        if amount <= FixedDecimal::zero() {
            return Err(HyperdriveError::InputInvalid("trade_amount must be positive".into()));
        }
        if amount < self.config.minimum_transaction_amount {
            return Err(HyperdriveError::PreconditionFailed(format!(
                "trade_amount {amount} below minimum_transaction_amount {}",
                self.config.minimum_transaction_amount
            )));
        }
        Ok(())
    }

    fn check_buffers(&self, candidate: &MarketState) -> Result<()> {
        if candidate.share_reserves < FixedDecimal::zero() || candidate.bond_reserves < FixedDecimal::zero() {
            return Err(HyperdriveError::StateCorrupt("reserves went negative".into()));
        }
        if candidate.share_reserves * candidate.share_price < candidate.share_buffer {
            return Err(HyperdriveError::StateCorrupt("share_buffer exceeds backing reserves".into()));
        }
        if candidate.bond_reserves < candidate.bond_buffer {
            return Err(HyperdriveError::StateCorrupt("bond_buffer exceeds backing reserves".into()));
        }
        if candidate.lp_total_supply < FixedDecimal::zero() {
            return Err(HyperdriveError::StateCorrupt("lp_total_supply went negative".into()));
        }
        Ok(())
    }

    /// Validates, prices, and commits one action. On any error the market
    /// and wallet are left untouched; the caller applies the returned
    /// [`WalletDeltas`] to its own copy of `wallet` on success.
    pub fn apply(&mut self, wallet: &Wallet, action: &MarketAction) -> Result<ApplyOutcome> {
        self.require_min_amount(action.trade_amount)?;

        match action.action_type {
            ActionType::OpenLong => self.apply_open_long(wallet, action),
            ActionType::CloseLong => self.apply_close_long(wallet, action),
            ActionType::OpenShort => self.apply_open_short(wallet, action),
            ActionType::CloseShort => self.apply_close_short(wallet, action),
            ActionType::AddLiquidity => self.apply_add_liquidity(wallet, action),
            ActionType::RemoveLiquidity => self.apply_remove_liquidity(wallet, action),
        }
    }

    fn apply_open_long(&mut self, wallet: &Wallet, action: &MarketAction) -> Result<ApplyOutcome> {
        let amount = action.trade_amount;
        if amount > wallet.base {
            return Err(HyperdriveError::PreconditionFailed("insufficient base for OPEN_LONG".into()));
        }
        let max_long = self.max_long(wallet)?;
        if amount > max_long {
            return Err(HyperdriveError::PreconditionFailed(format!("amount {amount} exceeds max_long {max_long}")));
        }

        let t = time::full_term_time_remaining(self.config.position_duration_days, self.config.time_stretch);
        let c = self.model.c(&self.state);
        let trade = self.model.calc_out_given_in(&self.config, &self.state, Quantity::base(amount), t)?;
        let bonds_out = trade.with_fee;

        let term_years = self.config.position_duration_days / time::days_per_year();
        let longs_outstanding = self.state.share_buffer * c;
        let mint_time = self.block_time;

        let mut candidate = self.state;
        candidate.share_reserves = candidate.share_reserves + amount / c;
        candidate.bond_reserves = candidate.bond_reserves - bonds_out;
        candidate.share_buffer = candidate.share_buffer + bonds_out / c;
        candidate.long_average_maturity_time = time::weighted_average_update(
            longs_outstanding,
            self.state.long_average_maturity_time,
            bonds_out,
            mint_time + term_years,
            true,
        );
        self.check_buffers(&candidate)?;

        self.state = candidate;
        self.governance_fees_accrued = self.governance_fees_accrued + governance_share(&self.config, trade.fee);
        let wallet_deltas = WalletDeltas(vec![
            WalletDelta::Base(-amount),
            WalletDelta::Long { mint_time, balance_delta: bonds_out, open_share_price: c },
        ]);

        Ok(ApplyOutcome { wallet_deltas, trade, mint_time })
    }

    fn apply_close_long(&mut self, wallet: &Wallet, action: &MarketAction) -> Result<ApplyOutcome> {
        let mint_time = action
            .mint_time
            .ok_or_else(|| HyperdriveError::InputInvalid("CLOSE_LONG requires mint_time".into()))?;
        let long = wallet
            .longs
            .get(&mint_time)
            .ok_or_else(|| HyperdriveError::InputInvalid(format!("no open long at mint_time {mint_time}")))?;
        let amount = action.trade_amount;
        if amount > long.balance {
            return Err(HyperdriveError::PreconditionFailed("CLOSE_LONG amount exceeds position balance".into()));
        }

        let t = time::time_remaining(self.block_time, mint_time, self.config.position_duration_days, self.config.time_stretch)?;
        let c = self.model.c(&self.state);
        let trade = self.model.calc_out_given_in(&self.config, &self.state, Quantity::pt(amount), t)?;
        let base_out = trade.with_fee;

        let term_years = self.config.position_duration_days / time::days_per_year();
        let longs_outstanding = self.state.share_buffer * c;

        let mut candidate = self.state;
        candidate.share_reserves = candidate.share_reserves - base_out / c;
        candidate.bond_reserves = candidate.bond_reserves + amount;
        candidate.share_buffer = (candidate.share_buffer - amount / c).max(FixedDecimal::zero());
        candidate.long_average_maturity_time = time::weighted_average_update(
            longs_outstanding,
            self.state.long_average_maturity_time,
            amount,
            mint_time + term_years,
            false,
        );
        self.check_buffers(&candidate)?;

        self.state = candidate;
        self.governance_fees_accrued = self.governance_fees_accrued + governance_share(&self.config, trade.fee);
        let wallet_deltas = WalletDeltas(vec![
            WalletDelta::Base(base_out),
            WalletDelta::Long { mint_time, balance_delta: -amount, open_share_price: long.open_share_price },
        ]);

        Ok(ApplyOutcome { wallet_deltas, trade, mint_time })
    }

    fn apply_open_short(&mut self, wallet: &Wallet, action: &MarketAction) -> Result<ApplyOutcome> {
        let amount = action.trade_amount;
        let max_short = self.max_short(wallet)?;
        if amount > max_short {
            return Err(HyperdriveError::PreconditionFailed(format!("amount {amount} exceeds max_short {max_short}")));
        }

        let t = time::full_term_time_remaining(self.config.position_duration_days, self.config.time_stretch);
        let c = self.model.c(&self.state);
        let trade = self.model.calc_out_given_in(&self.config, &self.state, Quantity::pt(amount), t)?;
        let base_out = trade.with_fee;
        let max_loss = amount - base_out;
        if max_loss > wallet.base {
            return Err(HyperdriveError::PreconditionFailed("insufficient base for OPEN_SHORT margin".into()));
        }

        let term_years = self.config.position_duration_days / time::days_per_year();
        let mint_time = self.block_time;

        let mut candidate = self.state;
        candidate.share_reserves = candidate.share_reserves - base_out / c;
        candidate.bond_reserves = candidate.bond_reserves + amount;
        candidate.bond_buffer = candidate.bond_buffer + amount;
        candidate.short_average_maturity_time = time::weighted_average_update(
            self.state.bond_buffer,
            self.state.short_average_maturity_time,
            amount,
            mint_time + term_years,
            true,
        );
        self.check_buffers(&candidate)?;

        self.state = candidate;
        self.governance_fees_accrued = self.governance_fees_accrued + governance_share(&self.config, trade.fee);
        let wallet_deltas = WalletDeltas(vec![
            WalletDelta::Base(-max_loss),
            WalletDelta::Short { mint_time, balance_delta: amount, open_share_price: c, margin_delta: max_loss },
        ]);

        Ok(ApplyOutcome { wallet_deltas, trade, mint_time })
    }

    fn apply_close_short(&mut self, wallet: &Wallet, action: &MarketAction) -> Result<ApplyOutcome> {
        let mint_time = action
            .mint_time
            .ok_or_else(|| HyperdriveError::InputInvalid("CLOSE_SHORT requires mint_time".into()))?;
        let short = wallet
            .shorts
            .get(&mint_time)
            .ok_or_else(|| HyperdriveError::InputInvalid(format!("no open short at mint_time {mint_time}")))?;

        // Open question #2 (see DESIGN.md): the reference implementation
        // clamps an over-large close to the available bond reserves with a
        // warning rather than rejecting it outright. Preserved here. The
        // pricing model requires bond_reserves to stay strictly positive
        // after the close, so the clamp leaves minimum_transaction_amount of
        // headroom rather than draining reserves to exactly zero.
        let mut amount = action.trade_amount;
        if amount > short.balance {
            return Err(HyperdriveError::PreconditionFailed("CLOSE_SHORT amount exceeds position balance".into()));
        }
        let max_closeable = self.state.bond_reserves - self.config.minimum_transaction_amount;
        if amount > max_closeable {
            warn!(requested = %amount, available = %self.state.bond_reserves, "clamping CLOSE_SHORT to available bond reserves");
            amount = max_closeable.max(FixedDecimal::zero());
        }

        let t = time::time_remaining(self.block_time, mint_time, self.config.position_duration_days, self.config.time_stretch)?;
        let c = self.model.c(&self.state);
        let trade = self.model.calc_in_given_out(&self.config, &self.state, Quantity::pt(amount), t)?;
        let cost = trade.with_fee;

        let accrued = amount * (c - short.open_share_price) / short.open_share_price;
        let margin_share = if short.balance.is_zero() {
            FixedDecimal::zero()
        } else {
            (amount / short.balance) * short.margin
        };
        let payout = margin_share + accrued - cost;

        let term_years = self.config.position_duration_days / time::days_per_year();

        let mut candidate = self.state;
        candidate.share_reserves = candidate.share_reserves + cost / c;
        candidate.bond_reserves = candidate.bond_reserves - amount;
        candidate.bond_buffer = (candidate.bond_buffer - amount).max(FixedDecimal::zero());
        candidate.short_average_maturity_time = time::weighted_average_update(
            self.state.bond_buffer,
            self.state.short_average_maturity_time,
            amount,
            mint_time + term_years,
            false,
        );
        self.check_buffers(&candidate)?;

        self.state = candidate;
        self.governance_fees_accrued = self.governance_fees_accrued + governance_share(&self.config, trade.fee);
        let wallet_deltas = WalletDeltas(vec![
            WalletDelta::Base(payout),
            WalletDelta::Short { mint_time, balance_delta: -amount, open_share_price: short.open_share_price, margin_delta: -margin_share },
        ]);

        Ok(ApplyOutcome { wallet_deltas, trade, mint_time })
    }

    fn apply_add_liquidity(&mut self, wallet: &Wallet, action: &MarketAction) -> Result<ApplyOutcome> {
        let base_in = action.trade_amount;
        if base_in > wallet.base {
            return Err(HyperdriveError::PreconditionFailed("insufficient base for ADD_LIQUIDITY".into()));
        }

        let c = self.model.c(&self.state);
        let share_in = base_in / c;
        let lp_out = self.model.calc_lp_out_given_base_in(&self.state, base_in)?;

        let mut candidate = self.state;
        let bond_in = if candidate.share_reserves.is_zero() {
            FixedDecimal::zero()
        } else {
            candidate.bond_reserves * (share_in / candidate.share_reserves)
        };
        candidate.share_reserves = candidate.share_reserves + share_in;
        candidate.bond_reserves = candidate.bond_reserves + bond_in;
        candidate.lp_total_supply = candidate.lp_total_supply + lp_out;
        self.check_buffers(&candidate)?;

        self.state = candidate;
        let mint_time = self.block_time;
        let trade = TradeResult {
            without_fee_or_slippage: base_in,
            without_fee: base_in,
            with_fee: lp_out,
            fee: FixedDecimal::zero(),
            breakdown: hyperdrive_math::TradeBreakdown::Base,
        };
        let wallet_deltas = WalletDeltas(vec![WalletDelta::Base(-base_in), WalletDelta::LpBalance(lp_out)]);

        Ok(ApplyOutcome { wallet_deltas, trade, mint_time })
    }

    fn apply_remove_liquidity(&mut self, wallet: &Wallet, action: &MarketAction) -> Result<ApplyOutcome> {
        let lp_in = action.trade_amount;
        if lp_in > wallet.lp_balance {
            return Err(HyperdriveError::PreconditionFailed("insufficient lp_balance for REMOVE_LIQUIDITY".into()));
        }

        let c = self.model.c(&self.state);
        let (base_out, bonds_out) = self.model.calc_tokens_out_given_lp_in(&self.state, lp_in)?;
        let t = time::full_term_time_remaining(self.config.position_duration_days, self.config.time_stretch);
        let spot_price = self.model.calc_spot_price(&self.config, &self.state, t)?;
        // Simplification: the simulation core credits LPs purely in base,
        // valuing the withdrawn bonds at the current spot price rather than
        // minting a separate withdrawal-share claim (out of scope; see
        // DESIGN.md).
        let total_base_out = base_out + bonds_out * spot_price;

        let mut candidate = self.state;
        candidate.share_reserves = candidate.share_reserves - base_out / c;
        candidate.bond_reserves = candidate.bond_reserves - bonds_out;
        candidate.lp_total_supply = candidate.lp_total_supply - lp_in;
        self.check_buffers(&candidate)?;

        self.state = candidate;
        let mint_time = self.block_time;
        let trade = TradeResult {
            without_fee_or_slippage: total_base_out,
            without_fee: total_base_out,
            with_fee: total_base_out,
            fee: FixedDecimal::zero(),
            breakdown: hyperdrive_math::TradeBreakdown::Base,
        };
        let wallet_deltas = WalletDeltas(vec![WalletDelta::Base(total_base_out), WalletDelta::LpBalance(-lp_in)]);

        Ok(ApplyOutcome { wallet_deltas, trade, mint_time })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperdrive_math::reserves::initialize_reserves;
    use tracing_test::traced_test;

    fn config() -> PoolConfig {
        PoolConfig {
            initial_share_price: fixed!(1),
            time_stretch: hyperdrive_math::time::time_stretch_from_apr(fixed!(0.05)),
            curve_fee: fixed!(0.1),
            flat_fee: fixed!(0.05),
            governance_fee: fixed!(0.1),
            floor_fee: None,
            minimum_share_reserves: fixed!(1_000),
            minimum_transaction_amount: fixed!(1),
            position_duration_days: fixed!(365),
        }
    }

    fn market() -> Market {
        let cfg = config();
        let model = PricingModel::Hyperdrive;
        let state = initialize_reserves(&cfg, model, fixed!(1), fixed!(500_000_000), fixed!(0.05)).unwrap();
        Market::new(cfg, model, state, 5)
    }

    #[test]
    fn opening_a_long_sets_its_average_maturity_time_to_its_own_maturity() {
        let mut mkt = market();
        let wallet = Wallet::new(0, fixed!(1_000_000));
        assert_eq!(mkt.state.long_average_maturity_time, FixedDecimal::zero());

        let outcome = mkt
            .apply(
                &wallet,
                &MarketAction {
                    agent_id: 0,
                    action_type: ActionType::OpenLong,
                    trade_amount: fixed!(10_000),
                    mint_time: None,
                    slippage_tolerance: fixed!(0.01),
                },
            )
            .unwrap();

        let term_years = mkt.config.position_duration_days / time::days_per_year();
        assert_eq!(mkt.state.long_average_maturity_time, outcome.mint_time + term_years);
    }

    #[test]
    fn closing_the_only_open_long_resets_its_average_maturity_time_to_zero() {
        let mut mkt = market();
        let mut wallet = Wallet::new(0, fixed!(1_000_000));

        let open = mkt
            .apply(
                &wallet,
                &MarketAction {
                    agent_id: 0,
                    action_type: ActionType::OpenLong,
                    trade_amount: fixed!(10_000),
                    mint_time: None,
                    slippage_tolerance: fixed!(0.01),
                },
            )
            .unwrap();
        wallet.apply(&open.wallet_deltas);
        assert_ne!(mkt.state.long_average_maturity_time, FixedDecimal::zero());

        let bonds = wallet.longs.get(&open.mint_time).unwrap().balance;
        mkt.apply(
            &wallet,
            &MarketAction {
                agent_id: 0,
                action_type: ActionType::CloseLong,
                trade_amount: bonds,
                mint_time: Some(open.mint_time),
                slippage_tolerance: fixed!(0.01),
            },
        )
        .unwrap();

        assert_eq!(mkt.state.long_average_maturity_time, FixedDecimal::zero());
    }

    #[test]
    fn open_long_preserves_invariant_and_moves_reserves() {
        let mut mkt = market();
        let wallet = Wallet::new(0, fixed!(1_000_000));
        let t = time::full_term_time_remaining(mkt.config.position_duration_days, mkt.config.time_stretch);
        let mu = mkt.model.mu(&mkt.config);
        let c = mkt.model.c(&mkt.state);
        let k_before = hyperdrive_math::yield_space::invariant_k(mu, c, mkt.state.share_reserves, mkt.state.bond_reserves, t).unwrap();

        let action = MarketAction {
            agent_id: 0,
            action_type: ActionType::OpenLong,
            trade_amount: fixed!(10_000),
            mint_time: None,
            slippage_tolerance: fixed!(0.01),
        };
        let outcome = mkt.apply(&wallet, &action).unwrap();
        assert!(outcome.trade.with_fee > FixedDecimal::zero());

        let k_after = hyperdrive_math::yield_space::invariant_k(mu, c, mkt.state.share_reserves, mkt.state.bond_reserves, t).unwrap();
        let tolerance = fixed!(0.000000000001); // 1e-12
        let diff = if k_after > k_before { k_after - k_before } else { k_before - k_after };
        assert!(diff <= tolerance, "k drifted: before={k_before} after={k_after}");

        assert!(mkt.state.share_reserves * mkt.state.share_price >= mkt.state.share_buffer);
    }

    #[test]
    fn open_then_close_long_round_trips_without_profit() {
        let mut mkt = market();
        let mut wallet = Wallet::new(0, fixed!(1_000_000));

        let open = mkt
            .apply(
                &wallet,
                &MarketAction {
                    agent_id: 0,
                    action_type: ActionType::OpenLong,
                    trade_amount: fixed!(10_000),
                    mint_time: None,
                    slippage_tolerance: fixed!(0.01),
                },
            )
            .unwrap();
        wallet.apply(&open.wallet_deltas);
        let mint_time = open.mint_time;
        let bonds = wallet.longs.get(&mint_time).unwrap().balance;

        let close = mkt
            .apply(
                &wallet,
                &MarketAction {
                    agent_id: 0,
                    action_type: ActionType::CloseLong,
                    trade_amount: bonds,
                    mint_time: Some(mint_time),
                    slippage_tolerance: fixed!(0.01),
                },
            )
            .unwrap();
        wallet.apply(&close.wallet_deltas);

        assert!(wallet.longs.is_empty());
        assert!(close.trade.with_fee <= fixed!(10_000));
    }

    #[test]
    fn add_then_remove_liquidity_returns_roughly_the_same_base() {
        let mut mkt = market();
        let mut wallet = Wallet::new(0, fixed!(1_000_000));

        let add = mkt
            .apply(
                &wallet,
                &MarketAction {
                    agent_id: 0,
                    action_type: ActionType::AddLiquidity,
                    trade_amount: fixed!(1_000_000),
                    mint_time: None,
                    slippage_tolerance: fixed!(0),
                },
            )
            .unwrap();
        wallet.apply(&add.wallet_deltas);
        assert_eq!(wallet.base, fixed!(0));

        let remove = mkt
            .apply(
                &wallet,
                &MarketAction {
                    agent_id: 0,
                    action_type: ActionType::RemoveLiquidity,
                    trade_amount: wallet.lp_balance,
                    mint_time: None,
                    slippage_tolerance: fixed!(0),
                },
            )
            .unwrap();
        wallet.apply(&remove.wallet_deltas);

        let tolerance = fixed!(0.0000001); // 1e-7
        let diff = if wallet.base > fixed!(1_000_000) { wallet.base - fixed!(1_000_000) } else { fixed!(1_000_000) - wallet.base };
        assert!(diff <= tolerance, "base={}", wallet.base);
    }

    #[test]
    fn open_long_increases_spot_price_and_close_long_decreases_it() {
        let mut mkt = market();
        let mut wallet = Wallet::new(0, fixed!(1_000_000));
        let price_before = mkt.view().unwrap().spot_price;

        let open = mkt
            .apply(
                &wallet,
                &MarketAction {
                    agent_id: 0,
                    action_type: ActionType::OpenLong,
                    trade_amount: fixed!(10_000),
                    mint_time: None,
                    slippage_tolerance: fixed!(0.01),
                },
            )
            .unwrap();
        wallet.apply(&open.wallet_deltas);
        let price_after_open = mkt.view().unwrap().spot_price;
        assert!(price_after_open > price_before, "open long should raise spot price");

        let mint_time = open.mint_time;
        let bonds = wallet.longs.get(&mint_time).unwrap().balance;
        let close = mkt
            .apply(
                &wallet,
                &MarketAction {
                    agent_id: 0,
                    action_type: ActionType::CloseLong,
                    trade_amount: bonds,
                    mint_time: Some(mint_time),
                    slippage_tolerance: fixed!(0.01),
                },
            )
            .unwrap();
        wallet.apply(&close.wallet_deltas);
        let price_after_close = mkt.view().unwrap().spot_price;
        assert!(price_after_close < price_after_open, "close long should lower spot price");
    }

    #[test]
    fn open_short_decreases_spot_price_and_close_short_increases_it() {
        let mut mkt = market();
        let mut wallet = Wallet::new(0, fixed!(1_000_000));
        let price_before = mkt.view().unwrap().spot_price;

        let open = mkt
            .apply(
                &wallet,
                &MarketAction {
                    agent_id: 0,
                    action_type: ActionType::OpenShort,
                    trade_amount: fixed!(10_000),
                    mint_time: None,
                    slippage_tolerance: fixed!(0.01),
                },
            )
            .unwrap();
        wallet.apply(&open.wallet_deltas);
        let price_after_open = mkt.view().unwrap().spot_price;
        assert!(price_after_open < price_before, "open short should lower spot price");

        let mint_time = open.mint_time;
        let balance = wallet.shorts.get(&mint_time).unwrap().balance;
        let close = mkt
            .apply(
                &wallet,
                &MarketAction {
                    agent_id: 0,
                    action_type: ActionType::CloseShort,
                    trade_amount: balance,
                    mint_time: Some(mint_time),
                    slippage_tolerance: fixed!(0.5),
                },
            )
            .unwrap();
        wallet.apply(&close.wallet_deltas);
        let price_after_close = mkt.view().unwrap().spot_price;
        assert!(price_after_close > price_after_open, "close short should raise spot price");
    }

    #[test]
    fn open_short_is_rejected_when_it_exceeds_max_short() {
        let mut mkt = market();
        let wallet = Wallet::new(0, fixed!(1));
        let action = MarketAction {
            agent_id: 0,
            action_type: ActionType::OpenShort,
            trade_amount: fixed!(100_000_000),
            mint_time: None,
            slippage_tolerance: fixed!(0.01),
        };
        let result = mkt.apply(&wallet, &action);
        assert!(result.is_err());
    }

    #[test]
    #[traced_test]
    fn close_short_clamps_to_available_bond_reserves_and_warns() {
        let mut mkt = market();
        mkt.state.bond_reserves = fixed!(10_000);

        let mut wallet = Wallet::new(0, fixed!(1_000_000));
        wallet.apply(&WalletDeltas(vec![
            WalletDelta::Base(-fixed!(5_000)),
            WalletDelta::Short {
                mint_time: fixed!(0),
                balance_delta: fixed!(50_000),
                open_share_price: fixed!(1),
                margin_delta: fixed!(5_000),
            },
        ]));

        let action = MarketAction {
            agent_id: 0,
            action_type: ActionType::CloseShort,
            trade_amount: fixed!(50_000),
            mint_time: Some(fixed!(0)),
            slippage_tolerance: fixed!(0.5),
        };
        let result = mkt.apply(&wallet, &action).unwrap();
        assert_eq!(result.mint_time, fixed!(0));
        assert!(logs_contain("clamping CLOSE_SHORT"));
    }
}
