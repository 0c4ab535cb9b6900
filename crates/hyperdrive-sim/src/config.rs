//! The serializable configuration data model a caller assembles and hands
//! to [`crate::simulator::run_simulation`]. This crate never reads a file
//! or an env var itself — loading `SimConfig` from disk, an RPC, or a CLI
//! flag is explicitly a caller concern (§1 out-of-scope) — but the types
//! themselves derive `serde` so a caller's loader has something concrete
//! to deserialize into.

use fixedpointmath::FixedDecimal;
use hyperdrive_math::PricingModel;
use serde::{Deserialize, Serialize};

use crate::policy::{
    FixedShortConfig, InitialLpAndShortConfig, InitialLpConfig, LongArbitrageConfig, LpAndArbConfig,
    RandomPolicyConfig,
};

/// Which reference policy an [`AgentConfig`] instantiates, paired with that
/// policy's own configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PolicyKind {
    Random(RandomPolicyConfig),
    FixedShort(FixedShortConfig),
    LongArbitrage(LongArbitrageConfig),
    LpAndArb(LpAndArbConfig),
    InitialLp(InitialLpConfig),
    InitialLpAndShort(InitialLpAndShortConfig),
}

/// One agent to seed into the simulation: its starting budget (in base)
/// and the policy driving its trades.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub agent_id: u64,
    pub budget: FixedDecimal,
    pub policy: PolicyKind,
}

/// Top-level configuration recognized by [`crate::simulator::run_simulation`]
/// (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub num_trading_days: u32,
    pub num_blocks_per_day: u32,
    pub position_duration_days: FixedDecimal,
    pub pricing_model: PricingModel,
    pub curve_fee: FixedDecimal,
    pub flat_fee: FixedDecimal,
    pub governance_fee: FixedDecimal,
    pub floor_fee: Option<FixedDecimal>,
    pub target_fixed_apr: FixedDecimal,
    pub target_liquidity: FixedDecimal,
    /// `mu`; defaults to `1` via [`SimConfig::init_share_price_or_default`].
    pub init_share_price: Option<FixedDecimal>,
    pub minimum_share_reserves: FixedDecimal,
    pub minimum_transaction_amount: FixedDecimal,
    /// One fixed APR per trading day; must have at least `num_trading_days`
    /// entries.
    pub variable_apr: Vec<FixedDecimal>,
    pub shuffle_users: bool,
    pub random_seed: u64,
    pub agents: Vec<AgentConfig>,
    /// If set, `run_simulation` returns the first rejection as an error
    /// instead of recording it and continuing.
    pub halt_on_errors: bool,
}

impl SimConfig {
    pub fn init_share_price_or_default(&self) -> FixedDecimal {
        self.init_share_price.unwrap_or_else(FixedDecimal::one)
    }
}
