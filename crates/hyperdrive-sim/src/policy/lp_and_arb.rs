//! A policy that seeds the pool with a portion of its budget as liquidity,
//! then spends the rest arbitraging the fixed rate back toward the
//! variable rate in whichever direction is cheaper.
//!
//! Grounded on `lib/agent0/agent0/hyperdrive/policies/lpandarb_test.py`'s
//! "Arbitrage Andy": one LP contribution at construction, then a per-block
//! decision between `OPEN_LONG` (when the pool needs fewer bonds to match
//! the variable rate) and `OPEN_SHORT` (when it needs more), using the
//! same bond-reserve-delta sizing as [`super::LongArbitragePolicy`]. The
//! `done_on_empty` flag mirrors the source's `Config.done_on_empty`: once
//! the rates are within `threshold` of each other, the policy stops acting
//! for the remainder of the run instead of re-checking every block.

use fixedpointmath::FixedDecimal;
use rand_chacha::ChaCha8Rng;

use crate::market::{ActionType, MarketAction, MarketView};
use crate::wallet::Wallet;

use super::long_arbitrage::target_bond_delta;
use super::{Policy, PolicySnapshot};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LpAndArbConfig {
    pub agent_id: u64,
    /// Fraction of the agent's budget contributed as liquidity at init.
    pub lp_portion: FixedDecimal,
    pub threshold: FixedDecimal,
    /// Once `|fixed_apr - variable_apr| < threshold`, stop acting entirely.
    pub done_on_empty: bool,
}

pub struct LpAndArbPolicy {
    config: LpAndArbConfig,
    rng: ChaCha8Rng,
    has_provided_liquidity: bool,
    done: bool,
}

impl LpAndArbPolicy {
    pub fn new(config: LpAndArbConfig, rng: ChaCha8Rng) -> Self {
        Self { config, rng, has_provided_liquidity: false, done: false }
    }
}

impl Policy for LpAndArbPolicy {
    fn action(&mut self, view: &MarketView, wallet: &Wallet) -> Vec<MarketAction> {
        if self.done {
            return Vec::new();
        }

        if !self.has_provided_liquidity {
            self.has_provided_liquidity = true;
            let lp_amount = wallet.budget() * self.config.lp_portion;
            if lp_amount > view.minimum_transaction_amount {
                return vec![MarketAction {
                    agent_id: self.config.agent_id,
                    action_type: ActionType::AddLiquidity,
                    trade_amount: lp_amount,
                    mint_time: None,
                    slippage_tolerance: FixedDecimal::zero(),
                }];
            }
            return Vec::new();
        }

        let diff = view.fixed_apr - view.variable_apr;
        let abs_diff = diff.abs();
        if abs_diff < self.config.threshold {
            if self.config.done_on_empty {
                self.done = true;
            }
            return Vec::new();
        }

        // Positive: bonds need to leave the pool, cheapest via a long.
        // Negative: bonds need to enter the pool, cheapest via a short.
        let gap = target_bond_delta(view);
        let state = view.state();
        let t = hyperdrive_math::time::full_term_time_remaining(view.position_duration_days, view.pool_config.time_stretch);

        if gap > FixedDecimal::zero() {
            let Ok(max_long) = view.pricing_model.calc_max_long(&view.pool_config, &state, t, wallet.budget()) else {
                return Vec::new();
            };
            let trade_amount = gap.min(max_long);
            if trade_amount > view.minimum_transaction_amount {
                return vec![MarketAction {
                    agent_id: self.config.agent_id,
                    action_type: ActionType::OpenLong,
                    trade_amount,
                    mint_time: None,
                    slippage_tolerance: FixedDecimal::zero(),
                }];
            }
        } else {
            let Ok(max_short) = view.pricing_model.calc_max_short(&view.pool_config, &state, t, wallet.budget()) else {
                return Vec::new();
            };
            let trade_amount = gap.abs().min(max_short);
            if trade_amount > view.minimum_transaction_amount {
                return vec![MarketAction {
                    agent_id: self.config.agent_id,
                    action_type: ActionType::OpenShort,
                    trade_amount,
                    mint_time: None,
                    slippage_tolerance: FixedDecimal::zero(),
                }];
            }
        }

        Vec::new()
    }

    fn describe(&self) -> &'static str {
        "lp_and_arb"
    }

    fn snapshot_state(&self) -> PolicySnapshot {
        PolicySnapshot::LpAndArb {
            rng_word_pos: self.rng.get_word_pos(),
            has_provided_liquidity: self.has_provided_liquidity,
            done: self.done,
        }
    }

    fn restore_state(&mut self, snapshot: PolicySnapshot) {
        if let PolicySnapshot::LpAndArb { rng_word_pos, has_provided_liquidity, done } = snapshot {
            self.rng.set_word_pos(rng_word_pos);
            self.has_provided_liquidity = has_provided_liquidity;
            self.done = done;
        }
    }
}
