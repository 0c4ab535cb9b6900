//! "Louie": a policy that opens a long sized to push the fixed rate back
//! towards the variable rate whenever it has drifted far enough below it,
//! and holds the position until maturity.
//!
//! Grounded on `examples/notebooks/frida_louie_simulation_fp.py`'s
//! `LongLouie`: the target trade size is derived from `calc_bond_reserves`
//! at the variable APR, halved to compensate for the reserve shift the
//! trade itself causes, then clipped to `max_long`.

use fixedpointmath::{fixed, FixedDecimal};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::market::{ActionType, MarketAction, MarketView};
use crate::wallet::Wallet;

use super::{Policy, PolicySnapshot};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LongArbitrageConfig {
    pub agent_id: u64,
    pub trade_chance: FixedDecimal,
    /// Opens a long once `fixed_apr - variable_apr <= threshold`.
    pub threshold: FixedDecimal,
}

pub struct LongArbitragePolicy {
    config: LongArbitrageConfig,
    rng: ChaCha8Rng,
    open_mint_time: Option<FixedDecimal>,
}

impl LongArbitragePolicy {
    pub fn new(config: LongArbitrageConfig, rng: ChaCha8Rng) -> Self {
        Self { config, rng, open_mint_time: None }
    }
}

/// The bond-amount adjustment shared by [`LongArbitragePolicy`] and
/// [`crate::policy::LpAndArbPolicy`]: the amount of bonds that would need to
/// leave the pool to bring the fixed rate to `view.variable_apr`, halved to
/// account for the reserve shift the trade itself will cause.
pub(crate) fn target_bond_delta(view: &MarketView) -> FixedDecimal {
    let target = view
        .pricing_model
        .calc_bond_reserves(&view.pool_config, view.share_reserves, view.share_price, view.variable_apr)
        .unwrap_or(view.bond_reserves);
    let delta_bonds = (view.bond_reserves - target) * view.spot_price;
    delta_bonds / fixed!(2)
}

impl Policy for LongArbitragePolicy {
    fn action(&mut self, view: &MarketView, wallet: &Wallet) -> Vec<MarketAction> {
        let roll: FixedDecimal = self.rng.gen::<FixedDecimal>() / fixed!(1_000_000);
        if roll >= self.config.trade_chance {
            return Vec::new();
        }

        let mut actions = Vec::new();

        for (mint_time, long) in &wallet.longs {
            let elapsed = view.block_time - *mint_time;
            let term_years = view.position_duration_days / hyperdrive_math::time::days_per_year();
            if elapsed >= term_years {
                actions.push(MarketAction {
                    agent_id: self.config.agent_id,
                    action_type: ActionType::CloseLong,
                    trade_amount: long.balance,
                    mint_time: Some(*mint_time),
                    slippage_tolerance: fixed!(0.01),
                });
                self.open_mint_time = None;
            }
        }

        let has_open_long = !wallet.longs.is_empty() && self.open_mint_time.is_some();
        if !has_open_long && (view.fixed_apr - view.variable_apr) <= self.config.threshold {
            let adjusted = target_bond_delta(view);
            if adjusted > FixedDecimal::zero() {
                let state = view.state();
                let t = hyperdrive_math::time::full_term_time_remaining(view.position_duration_days, view.pool_config.time_stretch);
                if let Ok(max_long) = view.pricing_model.calc_max_long(&view.pool_config, &state, t, wallet.budget()) {
                    let trade_amount = adjusted.min(max_long);
                    if trade_amount > view.minimum_transaction_amount {
                        actions.push(MarketAction {
                            agent_id: self.config.agent_id,
                            action_type: ActionType::OpenLong,
                            trade_amount,
                            mint_time: None,
                            slippage_tolerance: fixed!(0.01),
                        });
                        self.open_mint_time = Some(view.block_time);
                    }
                }
            }
        }

        actions
    }

    fn describe(&self) -> &'static str {
        "long_arbitrage"
    }

    fn snapshot_state(&self) -> PolicySnapshot {
        PolicySnapshot::LongArbitrage { rng_word_pos: self.rng.get_word_pos(), open_mint_time: self.open_mint_time }
    }

    fn restore_state(&mut self, snapshot: PolicySnapshot) {
        if let PolicySnapshot::LongArbitrage { rng_word_pos, open_mint_time } = snapshot {
            self.rng.set_word_pos(rng_word_pos);
            self.open_mint_time = open_mint_time;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Market;
    use hyperdrive_math::reserves::initialize_reserves;
    use hyperdrive_math::{PoolConfig, PricingModel};
    use rand::SeedableRng;

    fn view() -> MarketView {
        let cfg = PoolConfig {
            initial_share_price: fixed!(1),
            time_stretch: hyperdrive_math::time::time_stretch_from_apr(fixed!(0.05)),
            curve_fee: fixed!(0.1),
            flat_fee: fixed!(0.05),
            governance_fee: fixed!(0.1),
            floor_fee: None,
            minimum_share_reserves: fixed!(1_000),
            minimum_transaction_amount: fixed!(1),
            position_duration_days: fixed!(365),
        };
        let model = PricingModel::Hyperdrive;
        let state = initialize_reserves(&cfg, model, fixed!(1), fixed!(500_000_000), fixed!(0.05)).unwrap();
        Market::new(cfg, model, state, 5).view().unwrap()
    }

    #[test]
    fn opens_a_long_once_fixed_apr_drops_to_the_variable_apr_by_threshold() {
        let mut policy = LongArbitragePolicy::new(
            LongArbitrageConfig { agent_id: 0, trade_chance: fixed!(1), threshold: fixed!(0) },
            ChaCha8Rng::seed_from_u64(1),
        );
        let mut v = view();
        v.fixed_apr = fixed!(0.01);
        v.variable_apr = fixed!(0.05);
        let wallet = Wallet::new(0, fixed!(1_000_000));

        let actions = policy.action(&v, &wallet);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, ActionType::OpenLong);
        assert!(actions[0].trade_amount > FixedDecimal::zero());
    }

    #[test]
    fn stays_quiet_above_threshold() {
        let mut policy = LongArbitragePolicy::new(
            LongArbitrageConfig { agent_id: 0, trade_chance: fixed!(1), threshold: fixed!(0.01) },
            ChaCha8Rng::seed_from_u64(1),
        );
        let mut v = view();
        v.fixed_apr = fixed!(0.04);
        v.variable_apr = fixed!(0.03);
        let wallet = Wallet::new(0, fixed!(1_000_000));

        assert!(policy.action(&v, &wallet).is_empty());
    }

    #[test]
    fn trade_chance_roll_can_suppress_action_this_block() {
        let mut policy = LongArbitragePolicy::new(
            LongArbitrageConfig { agent_id: 0, trade_chance: fixed!(0), threshold: fixed!(1) },
            ChaCha8Rng::seed_from_u64(1),
        );
        let v = view();
        let wallet = Wallet::new(0, fixed!(1_000_000));
        assert!(policy.action(&v, &wallet).is_empty());
    }
}
