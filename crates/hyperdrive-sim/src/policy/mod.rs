//! The agent decision interface and the reference policy library (§4.5).
//!
//! A `Policy` is a capability object: `action` (the decision function),
//! `describe` (a human label for the trade log / reports), and a
//! `snapshot_state`/`restore_state` pair used by save/restore tests, since
//! a policy's only mutable state besides the market is its own bookkeeping
//! and its RNG substream.

pub mod fixed_short;
pub mod initial_lp;
pub mod long_arbitrage;
pub mod lp_and_arb;
pub mod random;

use fixedpointmath::FixedDecimal;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::market::{MarketAction, MarketView};
use crate::wallet::Wallet;

pub use fixed_short::FixedShortPolicy;
pub use initial_lp::{InitialLpAndShortPolicy, InitialLpPolicy};
pub use long_arbitrage::LongArbitragePolicy;
pub use lp_and_arb::LpAndArbPolicy;
pub use random::RandomPolicy;

/// Captures everything a policy needs to resume deterministically,
/// including the exact position of its RNG substream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PolicySnapshot {
    Random { rng_word_pos: u128 },
    FixedShort { rng_word_pos: u128, open_mint_time: Option<FixedDecimal> },
    LongArbitrage { rng_word_pos: u128, open_mint_time: Option<FixedDecimal> },
    LpAndArb { rng_word_pos: u128, has_provided_liquidity: bool, done: bool },
    InitialLp { rng_word_pos: u128, has_acted: bool },
    InitialLpAndShort { rng_word_pos: u128, has_acted: bool, open_mint_time: Option<FixedDecimal> },
}

/// The capability interface every reference policy implements. `action` is
/// pure with respect to `view`/`wallet` but may consult and advance the
/// policy's own RNG substream.
pub trait Policy: Send {
    fn action(&mut self, view: &MarketView, wallet: &Wallet) -> Vec<MarketAction>;
    fn describe(&self) -> &'static str;
    fn snapshot_state(&self) -> PolicySnapshot;
    fn restore_state(&mut self, snapshot: PolicySnapshot);
}

/// Draws a value uniformly in `[lo, hi)` from the shared `[0, 1e6)`
/// `FixedDecimal` sampler.
pub(crate) fn uniform_in(rng: &mut ChaCha8Rng, lo: FixedDecimal, hi: FixedDecimal) -> FixedDecimal {
    use fixedpointmath::fixed;
    use rand::Rng;
    let unit: FixedDecimal = rng.gen::<FixedDecimal>() / fixed!(1_000_000);
    lo + unit * (hi - lo)
}
