//! The two reserved "bootstrap the pool" policies kept separate per the
//! spec's open question (§9): the source's `strategies/init_LP.py` mints
//! LP only, while its near-duplicate `strategies/init_lp.py` mints LP and
//! opens a short in the same block. Both act exactly once and never
//! trade again.

use fixedpointmath::FixedDecimal;
use rand_chacha::ChaCha8Rng;

use crate::market::{ActionType, MarketAction, MarketView};
use crate::wallet::Wallet;

use super::{Policy, PolicySnapshot};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InitialLpConfig {
    pub agent_id: u64,
    pub amount_to_lp: FixedDecimal,
}

/// Grounded on `strategies/init_LP.py`'s `Policy`: LP once, never trade
/// again.
pub struct InitialLpPolicy {
    config: InitialLpConfig,
    rng: ChaCha8Rng,
    has_acted: bool,
}

impl InitialLpPolicy {
    pub fn new(config: InitialLpConfig, rng: ChaCha8Rng) -> Self {
        Self { config, rng, has_acted: false }
    }
}

impl Policy for InitialLpPolicy {
    fn action(&mut self, _view: &MarketView, _wallet: &Wallet) -> Vec<MarketAction> {
        if self.has_acted {
            return Vec::new();
        }
        self.has_acted = true;
        vec![MarketAction {
            agent_id: self.config.agent_id,
            action_type: ActionType::AddLiquidity,
            trade_amount: self.config.amount_to_lp,
            mint_time: None,
            slippage_tolerance: FixedDecimal::zero(),
        }]
    }

    fn describe(&self) -> &'static str {
        "initial_lp"
    }

    fn snapshot_state(&self) -> PolicySnapshot {
        PolicySnapshot::InitialLp { rng_word_pos: self.rng.get_word_pos(), has_acted: self.has_acted }
    }

    fn restore_state(&mut self, snapshot: PolicySnapshot) {
        if let PolicySnapshot::InitialLp { rng_word_pos, has_acted } = snapshot {
            self.rng.set_word_pos(rng_word_pos);
            self.has_acted = has_acted;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InitialLpAndShortConfig {
    pub agent_id: u64,
    pub amount_to_lp: FixedDecimal,
    pub amount_to_short: FixedDecimal,
}

/// Grounded on `strategies/init_lp.py`'s `Policy`: LP and open a short in
/// the same block, never trade again.
pub struct InitialLpAndShortPolicy {
    config: InitialLpAndShortConfig,
    rng: ChaCha8Rng,
    has_acted: bool,
    open_mint_time: Option<FixedDecimal>,
}

impl InitialLpAndShortPolicy {
    pub fn new(config: InitialLpAndShortConfig, rng: ChaCha8Rng) -> Self {
        Self { config, rng, has_acted: false, open_mint_time: None }
    }
}

impl Policy for InitialLpAndShortPolicy {
    fn action(&mut self, view: &MarketView, _wallet: &Wallet) -> Vec<MarketAction> {
        if self.has_acted {
            return Vec::new();
        }
        self.has_acted = true;
        self.open_mint_time = Some(view.block_time);
        vec![
            MarketAction {
                agent_id: self.config.agent_id,
                action_type: ActionType::AddLiquidity,
                trade_amount: self.config.amount_to_lp,
                mint_time: None,
                slippage_tolerance: FixedDecimal::zero(),
            },
            MarketAction {
                agent_id: self.config.agent_id,
                action_type: ActionType::OpenShort,
                trade_amount: self.config.amount_to_short,
                mint_time: None,
                slippage_tolerance: FixedDecimal::zero(),
            },
        ]
    }

    fn describe(&self) -> &'static str {
        "initial_lp_and_short"
    }

    fn snapshot_state(&self) -> PolicySnapshot {
        PolicySnapshot::InitialLpAndShort {
            rng_word_pos: self.rng.get_word_pos(),
            has_acted: self.has_acted,
            open_mint_time: self.open_mint_time,
        }
    }

    fn restore_state(&mut self, snapshot: PolicySnapshot) {
        if let PolicySnapshot::InitialLpAndShort { rng_word_pos, has_acted, open_mint_time } = snapshot {
            self.rng.set_word_pos(rng_word_pos);
            self.has_acted = has_acted;
            self.open_mint_time = open_mint_time;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Market;
    use fixedpointmath::fixed;
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
    fn initial_lp_policy_acts_once_then_goes_quiet() {
        let mut policy = InitialLpPolicy::new(
            InitialLpConfig { agent_id: 0, amount_to_lp: fixed!(100_000) },
            ChaCha8Rng::seed_from_u64(1),
        );
        let v = view();
        let wallet = Wallet::new(0, fixed!(1_000_000));

        let first = policy.action(&v, &wallet);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].action_type, ActionType::AddLiquidity);
        assert_eq!(first[0].trade_amount, fixed!(100_000));

        let second = policy.action(&v, &wallet);
        assert!(second.is_empty());
    }

    #[test]
    fn initial_lp_and_short_policy_emits_both_trades_once() {
        let mut policy = InitialLpAndShortPolicy::new(
            InitialLpAndShortConfig { agent_id: 0, amount_to_lp: fixed!(100_000), amount_to_short: fixed!(1_000) },
            ChaCha8Rng::seed_from_u64(1),
        );
        let v = view();
        let wallet = Wallet::new(0, fixed!(1_000_000));

        let actions = policy.action(&v, &wallet);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].action_type, ActionType::AddLiquidity);
        assert_eq!(actions[1].action_type, ActionType::OpenShort);

        assert!(policy.action(&v, &wallet).is_empty());
    }

    #[test]
    fn snapshot_restore_round_trips_initial_lp_state() {
        let mut policy = InitialLpPolicy::new(
            InitialLpConfig { agent_id: 0, amount_to_lp: fixed!(100_000) },
            ChaCha8Rng::seed_from_u64(7),
        );
        let v = view();
        let wallet = Wallet::new(0, fixed!(1_000_000));
        policy.action(&v, &wallet);
        let snap = policy.snapshot_state();

        let mut restored =
            InitialLpPolicy::new(InitialLpConfig { agent_id: 0, amount_to_lp: fixed!(100_000) }, ChaCha8Rng::seed_from_u64(1));
        restored.restore_state(snap);
        assert!(restored.action(&v, &wallet).is_empty(), "restored policy should resume as already-acted");
    }
}
