//! A policy that trades at random: each block it flips a biased coin, and
//! on a hit picks a uniformly-random permissible action and amount.

use fixedpointmath::{fixed, FixedDecimal};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::market::{ActionType, MarketAction, MarketView};
use crate::wallet::Wallet;

use super::{uniform_in, Policy, PolicySnapshot};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RandomPolicyConfig {
    pub agent_id: u64,
    pub trade_chance: FixedDecimal,
    pub min_trade: FixedDecimal,
    pub max_trade: FixedDecimal,
}

pub struct RandomPolicy {
    config: RandomPolicyConfig,
    rng: ChaCha8Rng,
}

impl RandomPolicy {
    pub fn new(config: RandomPolicyConfig, rng: ChaCha8Rng) -> Self {
        Self { config, rng }
    }

    fn permissible_actions(&self, wallet: &Wallet) -> Vec<ActionType> {
        let mut actions = vec![ActionType::OpenLong, ActionType::OpenShort, ActionType::AddLiquidity];
        if !wallet.longs.is_empty() {
            actions.push(ActionType::CloseLong);
        }
        if !wallet.shorts.is_empty() {
            actions.push(ActionType::CloseShort);
        }
        if !wallet.lp_balance.is_zero() {
            actions.push(ActionType::RemoveLiquidity);
        }
        actions
    }
}

impl Policy for RandomPolicy {
    fn action(&mut self, _view: &MarketView, wallet: &Wallet) -> Vec<MarketAction> {
        let roll: FixedDecimal = self.rng.gen::<FixedDecimal>() / fixed!(1_000_000);
        if roll >= self.config.trade_chance {
            return Vec::new();
        }

        let actions = self.permissible_actions(wallet);
        let choice = actions[self.rng.gen_range(0..actions.len())];

        let (mint_time, trade_amount) = match choice {
            ActionType::CloseLong => {
                let mint_time = *wallet.longs.keys().next().expect("checked non-empty");
                (Some(mint_time), wallet.longs[&mint_time].balance)
            }
            ActionType::CloseShort => {
                let mint_time = *wallet.shorts.keys().next().expect("checked non-empty");
                (Some(mint_time), wallet.shorts[&mint_time].balance)
            }
            ActionType::RemoveLiquidity => (None, wallet.lp_balance),
            _ => (None, uniform_in(&mut self.rng, self.config.min_trade, self.config.max_trade)),
        };

        vec![MarketAction {
            agent_id: self.config.agent_id,
            action_type: choice,
            trade_amount,
            mint_time,
            slippage_tolerance: fixed!(0.01),
        }]
    }

    fn describe(&self) -> &'static str {
        "random"
    }

    fn snapshot_state(&self) -> PolicySnapshot {
        PolicySnapshot::Random { rng_word_pos: self.rng.get_word_pos() }
    }

    fn restore_state(&mut self, snapshot: PolicySnapshot) {
        if let PolicySnapshot::Random { rng_word_pos } = snapshot {
            self.rng.set_word_pos(rng_word_pos);
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
    fn never_proposes_close_or_remove_without_an_open_position() {
        let mut policy = RandomPolicy::new(
            RandomPolicyConfig { agent_id: 0, trade_chance: fixed!(1), min_trade: fixed!(100), max_trade: fixed!(1_000) },
            ChaCha8Rng::seed_from_u64(42),
        );
        let v = view();
        let wallet = Wallet::new(0, fixed!(1_000_000));

        for _ in 0..50 {
            let actions = policy.action(&v, &wallet);
            assert_eq!(actions.len(), 1);
            assert!(!matches!(actions[0].action_type, ActionType::CloseLong | ActionType::CloseShort | ActionType::RemoveLiquidity));
        }
    }

    #[test]
    fn trade_chance_zero_never_trades() {
        let mut policy = RandomPolicy::new(
            RandomPolicyConfig { agent_id: 0, trade_chance: fixed!(0), min_trade: fixed!(100), max_trade: fixed!(1_000) },
            ChaCha8Rng::seed_from_u64(42),
        );
        let v = view();
        let wallet = Wallet::new(0, fixed!(1_000_000));
        for _ in 0..20 {
            assert!(policy.action(&v, &wallet).is_empty());
        }
    }

    #[test]
    fn same_seed_reproduces_the_same_trade_sequence() {
        let cfg = RandomPolicyConfig { agent_id: 0, trade_chance: fixed!(1), min_trade: fixed!(100), max_trade: fixed!(1_000) };
        let v = view();
        let wallet = Wallet::new(0, fixed!(1_000_000));

        let mut a = RandomPolicy::new(cfg, ChaCha8Rng::seed_from_u64(7));
        let mut b = RandomPolicy::new(cfg, ChaCha8Rng::seed_from_u64(7));
        for _ in 0..10 {
            assert_eq!(a.action(&v, &wallet), b.action(&v, &wallet));
        }
    }
}
