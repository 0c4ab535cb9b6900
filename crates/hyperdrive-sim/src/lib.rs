//! The market state machine, wallet ledger, agent/policy loop, and
//! block-time simulator for a Hyperdrive-style fixed-rate AMM.
//!
//! [`simulator::run_simulation`] is the single public entry point: given a
//! [`config::SimConfig`] it builds a pool, seeds every configured agent,
//! drives the block-time loop, and returns a [`simulator::SimulationState`]
//! carrying the full trade log (§6) plus the final market and wallets.
//! Everything underneath — [`Market`], [`Wallet`], the [`policy`] library —
//! is exposed too, for callers that want to step a simulation block by
//! block or build their own policies against the same traits.

pub mod config;
pub mod error;
pub mod market;
pub mod policy;
pub mod simulator;
pub mod wallet;

pub use config::{AgentConfig, SimConfig};
pub use error::{HyperdriveError, Result};
pub use market::{ActionType, ApplyOutcome, Market, MarketAction, MarketView};
pub use policy::Policy;
pub use simulator::{run_simulation, SimulationState, Simulator, TradeLogRow};
pub use wallet::{Long, Short, Wallet, WalletDelta, WalletDeltas, WalletSnapshot};
