//! Reserve initialization from a target liquidity and target fixed APR,
//! used once when a pool is created.

use eyre::{ensure, Result};
use fixedpointmath::{fixed, FixedDecimal};

use crate::{time, MarketState, PoolConfig, PricingModel};

/// Builds the initial [`MarketState`] for a pool sized to `target_liquidity`
/// base units at `target_apr`, following the reference implementation's
/// three-step derivation: price from APR, an initial reserve estimate that
/// matches the APR exactly, then a uniform rescale so the total base value
/// of the reserves equals `target_liquidity`.
pub fn initialize_reserves(
    config: &PoolConfig,
    model: PricingModel,
    share_price: FixedDecimal,
    target_liquidity: FixedDecimal,
    target_apr: FixedDecimal,
) -> Result<MarketState> {
    ensure!(target_liquidity > FixedDecimal::zero(), "initialize_reserves: target_liquidity must be positive");
    ensure!(target_apr > FixedDecimal::zero(), "initialize_reserves: target_apr must be positive");

    let mu = model.mu(config);
    let c = share_price;
    let term_years = config.position_duration_days / time::days_per_year();
    let tau = time::time_stretch_from_apr(target_apr);

    // Step 1: spot price implied by the target APR.
    let p = fixed!(1) / (fixed!(1) + target_apr * term_years);

    // Step 2: a reserve pair that matches the target APR exactly.
    let y_estimate = target_liquidity / p / fixed!(2);
    let growth = (fixed!(1) - target_apr * term_years).pow(fixed!(1) / tau)?;
    let denominator = mu * growth - c;
    ensure!(denominator > FixedDecimal::zero(), "initialize_reserves: non-positive reserve denominator");
    let z_estimate = (fixed!(2) * c * y_estimate) / denominator;

    // Step 3: rescale uniformly so the reserves' total base value matches
    // target_liquidity exactly; scaling both reserves by the same factor
    // leaves the spot price (and therefore the APR) unchanged.
    let total_value = z_estimate * c + y_estimate * p;
    ensure!(total_value > FixedDecimal::zero(), "initialize_reserves: non-positive total value");
    let scale_factor = target_liquidity / total_value;

    let share_reserves = z_estimate * scale_factor;
    let bond_reserves = y_estimate * scale_factor;

    Ok(MarketState {
        share_reserves,
        bond_reserves,
        share_buffer: FixedDecimal::zero(),
        bond_buffer: FixedDecimal::zero(),
        lp_total_supply: share_reserves * c,
        share_price: c,
        variable_apr: FixedDecimal::zero(),
        long_average_maturity_time: FixedDecimal::zero(),
        short_average_maturity_time: FixedDecimal::zero(),
    })
}
