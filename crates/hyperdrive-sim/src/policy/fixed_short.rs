//! "Frida": a policy willing to open a fixed-rate borrow (a short) once the
//! fixed rate has drifted far enough above the variable rate, and to hold
//! it until maturity.
//!
//! Grounded on `examples/notebooks/frida_louie_simulation_fp.py`'s
//! `FixedFrida`: a trade-chance coin flip gates whether the agent acts at
//! all this block, mature shorts are closed unconditionally, and at most
//! one short is opened at a time.

use fixedpointmath::{fixed, FixedDecimal};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::market::{ActionType, MarketAction, MarketView};
use crate::wallet::Wallet;

use super::{Policy, PolicySnapshot};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FixedShortConfig {
    pub agent_id: u64,
    pub trade_chance: FixedDecimal,
    /// Opens a short once `fixed_apr - variable_apr >= threshold`.
    pub threshold: FixedDecimal,
}

pub struct FixedShortPolicy {
    config: FixedShortConfig,
    rng: ChaCha8Rng,
    open_mint_time: Option<FixedDecimal>,
}

impl FixedShortPolicy {
    pub fn new(config: FixedShortConfig, rng: ChaCha8Rng) -> Self {
        Self { config, rng, open_mint_time: None }
    }
}

impl Policy for FixedShortPolicy {
    fn action(&mut self, view: &MarketView, wallet: &Wallet) -> Vec<MarketAction> {
        let roll: FixedDecimal = self.rng.gen::<FixedDecimal>() / fixed!(1_000_000);
        if roll >= self.config.trade_chance {
            return Vec::new();
        }

        let mut actions = Vec::new();

        for (mint_time, short) in &wallet.shorts {
            let elapsed = view.block_time - *mint_time;
            let term_years = view.position_duration_days / hyperdrive_math::time::days_per_year();
            if elapsed >= term_years {
                actions.push(MarketAction {
                    agent_id: self.config.agent_id,
                    action_type: ActionType::CloseShort,
                    trade_amount: short.balance,
                    mint_time: Some(*mint_time),
                    slippage_tolerance: fixed!(0.01),
                });
                self.open_mint_time = None;
            }
        }

        let has_open_short = !wallet.shorts.is_empty() && self.open_mint_time.is_some();
        if !has_open_short && (view.fixed_apr - view.variable_apr) >= self.config.threshold {
            let state = view.state();
            let t = hyperdrive_math::time::full_term_time_remaining(view.position_duration_days, view.pool_config.time_stretch);
            if let Ok(trade_amount) = view.pricing_model.calc_max_short(&view.pool_config, &state, t, wallet.budget()) {
                if trade_amount > view.minimum_transaction_amount {
                    actions.push(MarketAction {
                        agent_id: self.config.agent_id,
                        action_type: ActionType::OpenShort,
                        trade_amount,
                        mint_time: None,
                        slippage_tolerance: fixed!(0.01),
                    });
                    self.open_mint_time = Some(view.block_time);
                }
            }
        }

        actions
    }

    fn describe(&self) -> &'static str {
        "fixed_short"
    }

    fn snapshot_state(&self) -> PolicySnapshot {
        PolicySnapshot::FixedShort { rng_word_pos: self.rng.get_word_pos(), open_mint_time: self.open_mint_time }
    }

    fn restore_state(&mut self, snapshot: PolicySnapshot) {
        if let PolicySnapshot::FixedShort { rng_word_pos, open_mint_time } = snapshot {
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
    fn opens_a_short_once_fixed_apr_clears_the_variable_apr_by_threshold() {
        let mut policy = FixedShortPolicy::new(
            FixedShortConfig { agent_id: 0, trade_chance: fixed!(1), threshold: fixed!(0) },
            ChaCha8Rng::seed_from_u64(1),
        );
        let mut v = view();
        v.fixed_apr = fixed!(0.08);
        v.variable_apr = fixed!(0.03);
        let wallet = Wallet::new(0, fixed!(1_000_000));

        let actions = policy.action(&v, &wallet);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, ActionType::OpenShort);
        assert!(actions[0].trade_amount > FixedDecimal::zero());
    }

    #[test]
    fn stays_quiet_below_threshold() {
        let mut policy = FixedShortPolicy::new(
            FixedShortConfig { agent_id: 0, trade_chance: fixed!(1), threshold: fixed!(0.05) },
            ChaCha8Rng::seed_from_u64(1),
        );
        let mut v = view();
        v.fixed_apr = fixed!(0.04);
        v.variable_apr = fixed!(0.03);
        let wallet = Wallet::new(0, fixed!(1_000_000));

        assert!(policy.action(&v, &wallet).is_empty());
    }

    #[test]
    fn closes_a_short_once_it_has_matured() {
        let mut policy = FixedShortPolicy::new(
            FixedShortConfig { agent_id: 0, trade_chance: fixed!(1), threshold: fixed!(1) },
            ChaCha8Rng::seed_from_u64(1),
        );
        let mut v = view();
        v.block_time = fixed!(2);
        let mut wallet = Wallet::new(0, fixed!(1_000_000));
        wallet.shorts.insert(
            fixed!(0),
            crate::wallet::Short { balance: fixed!(1_000), open_share_price: fixed!(1), mint_time: fixed!(0), margin: fixed!(500) },
        );

        let actions = policy.action(&v, &wallet);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, ActionType::CloseShort);
        assert_eq!(actions[0].mint_time, Some(fixed!(0)));
        assert_eq!(actions[0].trade_amount, fixed!(1_000));
    }
}
