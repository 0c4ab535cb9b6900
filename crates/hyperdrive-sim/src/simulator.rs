//! The block-time driver (§4.3, §5): for each simulated block, shuffles
//! the agent list, polls every policy against the pre-block snapshot,
//! applies the returned trades in sequence, advances the share price by
//! the day's variable APR, and records one trade-log row per attempted
//! trade (including rejections, per §7).

use std::collections::HashMap;

use fixedpointmath::FixedDecimal;
use hyperdrive_math::reserves::initialize_reserves;
use hyperdrive_math::PoolConfig;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{PolicyKind, SimConfig};
use crate::error::{HyperdriveError, Result};
use crate::market::{ActionType, Market, MarketAction};
use crate::policy::{
    FixedShortPolicy, InitialLpAndShortPolicy, InitialLpPolicy, LongArbitragePolicy, LpAndArbPolicy, Policy,
    RandomPolicy,
};
use crate::wallet::Wallet;

/// One row of the trade log (§6's `SimulationState` schema), recorded for
/// every trade a policy submits, successful or rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLogRow {
    pub block_number: u64,
    pub day: u32,
    pub trade_number: u64,
    pub agent_id: u64,
    pub action_type: ActionType,
    pub amount: FixedDecimal,
    pub mint_time: Option<FixedDecimal>,
    pub spot_price: FixedDecimal,
    pub fixed_apr: FixedDecimal,
    pub variable_apr: FixedDecimal,
    pub share_reserves: FixedDecimal,
    pub bond_reserves: FixedDecimal,
    pub share_price: FixedDecimal,
    pub fees_paid: FixedDecimal,
    pub without_fee_or_slippage: FixedDecimal,
    pub with_fee: FixedDecimal,
    pub without_fee: FixedDecimal,
    pub fee: FixedDecimal,
    pub max_long: FixedDecimal,
    pub max_short: FixedDecimal,
    /// `None` for a successful trade; the rejection reason otherwise. A
    /// rejected row's other numeric fields besides the reserve/rate
    /// snapshot are zeroed.
    pub rejected: Option<String>,
}

/// The full result of [`run_simulation`]: the trade log plus the final
/// market and per-agent wallets, for analytics callers that want more than
/// the tabular log.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub rows: Vec<TradeLogRow>,
    pub final_market: Market,
    pub final_wallets: HashMap<u64, Wallet>,
    pub rejection_count: u64,
}

/// Mixes a per-run seed with an agent id to derive that agent's own RNG
/// substream, so no two agents (and no agent and the block scheduler)
/// ever share a generator (§9: "never use a global generator").
fn derive_rng(seed: u64, stream: u64) -> ChaCha8Rng {
    // SplitMix64 finalizer, used only to decorrelate the two u64s before
    // handing them to ChaCha8Rng's own seeding, not as a cryptographic
    // primitive.
    let mut z = seed.wrapping_add(stream.wrapping_mul(0x9E3779B97F4A7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^= z >> 31;
    ChaCha8Rng::seed_from_u64(z)
}

fn build_policy(kind: PolicyKind, rng: ChaCha8Rng) -> Box<dyn Policy> {
    match kind {
        PolicyKind::Random(cfg) => Box::new(RandomPolicy::new(cfg, rng)),
        PolicyKind::FixedShort(cfg) => Box::new(FixedShortPolicy::new(cfg, rng)),
        PolicyKind::LongArbitrage(cfg) => Box::new(LongArbitragePolicy::new(cfg, rng)),
        PolicyKind::LpAndArb(cfg) => Box::new(LpAndArbPolicy::new(cfg, rng)),
        PolicyKind::InitialLp(cfg) => Box::new(InitialLpPolicy::new(cfg, rng)),
        PolicyKind::InitialLpAndShort(cfg) => Box::new(InitialLpAndShortPolicy::new(cfg, rng)),
    }
}

/// The per-block scheduler owning one pool, its agents' wallets, and their
/// policies. [`run_simulation`] is a thin constructor + drive-to-completion
/// wrapper around this for callers who don't need to step block-by-block.
pub struct Simulator {
    market: Market,
    agent_order: Vec<u64>,
    wallets: HashMap<u64, Wallet>,
    policies: HashMap<u64, Box<dyn Policy>>,
    scheduler_rng: ChaCha8Rng,
    shuffle_users: bool,
    halt_on_errors: bool,
    variable_apr: Vec<FixedDecimal>,
    num_trading_days: u32,
    trade_number: u64,
    block_number: u64,
}

impl Simulator {
    pub fn new(config: &SimConfig) -> Result<Self> {
        let pool_config = PoolConfig {
            initial_share_price: config.init_share_price_or_default(),
            time_stretch: hyperdrive_math::time::time_stretch_from_apr(config.target_fixed_apr),
            curve_fee: config.curve_fee,
            flat_fee: config.flat_fee,
            governance_fee: config.governance_fee,
            floor_fee: config.floor_fee,
            minimum_share_reserves: config.minimum_share_reserves,
            minimum_transaction_amount: config.minimum_transaction_amount,
            position_duration_days: config.position_duration_days,
        };

        let state = initialize_reserves(
            &pool_config,
            config.pricing_model,
            config.init_share_price_or_default(),
            config.target_liquidity,
            config.target_fixed_apr,
        )
        .map_err(HyperdriveError::from)?;

        let market = Market::new(pool_config, config.pricing_model, state, config.num_blocks_per_day);

        let mut wallets = HashMap::new();
        let mut policies: HashMap<u64, Box<dyn Policy>> = HashMap::new();
        let mut agent_order = Vec::with_capacity(config.agents.len());
        for agent in &config.agents {
            wallets.insert(agent.agent_id, Wallet::new(agent.agent_id, agent.budget));
            let rng = derive_rng(config.random_seed, agent.agent_id.wrapping_add(1));
            policies.insert(agent.agent_id, build_policy(agent.policy, rng));
            agent_order.push(agent.agent_id);
        }

        Ok(Self {
            market,
            agent_order,
            wallets,
            policies,
            scheduler_rng: derive_rng(config.random_seed, 0),
            shuffle_users: config.shuffle_users,
            halt_on_errors: config.halt_on_errors,
            variable_apr: config.variable_apr.clone(),
            num_trading_days: config.num_trading_days,
            trade_number: 0,
            block_number: 0,
        })
    }

    /// Polls every agent once and applies whatever trades they submit,
    /// using the market snapshot taken at the top of the block for every
    /// policy (§5: policies never see another policy's trade from the same
    /// block, only trades already applied earlier in the same block see
    /// each other by virtue of mutating `self.market` in sequence).
    pub fn step_block(&mut self, day: u32, rows: &mut Vec<TradeLogRow>) -> Result<()> {
        let view = self.market.view()?;

        let mut order = self.agent_order.clone();
        if self.shuffle_users {
            order.shuffle(&mut self.scheduler_rng);
        }

        for agent_id in order {
            let actions: Vec<MarketAction> = {
                let wallet = &self.wallets[&agent_id];
                let policy = self.policies.get_mut(&agent_id).expect("agent has a policy");
                policy.action(&view, wallet)
            };

            for action in actions {
                self.apply_one(day, &action, rows)?;
            }
        }

        let apr_for_day = self.variable_apr.get(day as usize).copied().unwrap_or(view.variable_apr);
        self.market.advance_time(apr_for_day);
        self.block_number += 1;
        Ok(())
    }

    fn apply_one(&mut self, day: u32, action: &MarketAction, rows: &mut Vec<TradeLogRow>) -> Result<()> {
        self.trade_number += 1;
        let wallet = self.wallets[&action.agent_id].clone();
        let max_long = self.market.max_long(&wallet).unwrap_or(FixedDecimal::zero());
        let max_short = self.market.max_short(&wallet).unwrap_or(FixedDecimal::zero());

        match self.market.apply(&wallet, action) {
            Ok(outcome) => {
                let wallet = self.wallets.get_mut(&action.agent_id).expect("wallet exists");
                wallet.apply(&outcome.wallet_deltas);
                if !outcome.trade.fee.is_zero() {
                    wallet.fees_paid = wallet.fees_paid + outcome.trade.fee;
                }
                let view = self.market.view()?;
                rows.push(TradeLogRow {
                    block_number: self.block_number,
                    day,
                    trade_number: self.trade_number,
                    agent_id: action.agent_id,
                    action_type: action.action_type,
                    amount: action.trade_amount,
                    mint_time: Some(outcome.mint_time),
                    spot_price: view.spot_price,
                    fixed_apr: view.fixed_apr,
                    variable_apr: view.variable_apr,
                    share_reserves: view.share_reserves,
                    bond_reserves: view.bond_reserves,
                    share_price: view.share_price,
                    fees_paid: wallet.fees_paid,
                    without_fee_or_slippage: outcome.trade.without_fee_or_slippage,
                    with_fee: outcome.trade.with_fee,
                    without_fee: outcome.trade.without_fee,
                    fee: outcome.trade.fee,
                    max_long,
                    max_short,
                    rejected: None,
                });
                Ok(())
            }
            Err(err) => {
                debug!(agent_id = action.agent_id, action = ?action.action_type, error = %err, "trade rejected");
                let view = self.market.view().unwrap_or_else(|_| view_fallback(&self.market));
                rows.push(TradeLogRow {
                    block_number: self.block_number,
                    day,
                    trade_number: self.trade_number,
                    agent_id: action.agent_id,
                    action_type: action.action_type,
                    amount: action.trade_amount,
                    mint_time: action.mint_time,
                    spot_price: view.spot_price,
                    fixed_apr: view.fixed_apr,
                    variable_apr: view.variable_apr,
                    share_reserves: view.share_reserves,
                    bond_reserves: view.bond_reserves,
                    share_price: view.share_price,
                    fees_paid: FixedDecimal::zero(),
                    without_fee_or_slippage: FixedDecimal::zero(),
                    with_fee: FixedDecimal::zero(),
                    without_fee: FixedDecimal::zero(),
                    fee: FixedDecimal::zero(),
                    max_long,
                    max_short,
                    rejected: Some(err.to_string()),
                });
                if self.halt_on_errors {
                    return Err(err);
                }
                Ok(())
            }
        }
    }

    pub fn into_state(self, rows: Vec<TradeLogRow>, rejection_count: u64) -> SimulationState {
        SimulationState { rows, final_market: self.market, final_wallets: self.wallets, rejection_count }
    }
}

/// A degenerate view used only when recording a rejection row after the
/// market has somehow become unqueryable; never observed in practice since
/// `Market::apply` leaves state untouched on error.
fn view_fallback(market: &Market) -> crate::market::MarketView {
    crate::market::MarketView {
        share_reserves: market.state.share_reserves,
        bond_reserves: market.state.bond_reserves,
        share_buffer: market.state.share_buffer,
        bond_buffer: market.state.bond_buffer,
        lp_total_supply: market.state.lp_total_supply,
        share_price: market.state.share_price,
        init_share_price: market.config.initial_share_price,
        spot_price: FixedDecimal::zero(),
        fixed_apr: FixedDecimal::zero(),
        variable_apr: market.state.variable_apr,
        block_time: market.block_time,
        position_duration_days: market.config.position_duration_days,
        minimum_share_reserves: market.config.minimum_share_reserves,
        minimum_transaction_amount: market.config.minimum_transaction_amount,
        pool_config: market.config,
        pricing_model: market.model,
    }
}

/// Runs a full simulation to completion: builds the pool, seeds every
/// configured agent, then drives `num_trading_days * num_blocks_per_day`
/// blocks, recording one row per attempted trade.
pub fn run_simulation(config: SimConfig) -> Result<SimulationState> {
    let num_trading_days = config.num_trading_days;
    let num_blocks_per_day = config.num_blocks_per_day;
    let mut sim = Simulator::new(&config)?;
    let mut rows = Vec::new();

    for day in 0..num_trading_days {
        for _block in 0..num_blocks_per_day {
            sim.step_block(day, &mut rows)?;
        }
    }

    let rejection_count = rows.iter().filter(|r| r.rejected.is_some()).count() as u64;
    if rejection_count > 0 {
        warn!(rejection_count, "simulation completed with rejected trades");
    }
    Ok(sim.into_state(rows, rejection_count))
}
