//! The largest base amount a long can pay, bounded by the pool's reserves
//! and the trader's budget.

use eyre::Result;
use fixedpointmath::FixedDecimal;

use crate::{MarketState, PoolConfig, PricingModel};

impl PricingModel {
    /// The largest base amount that can be used to open a long: the amount
    /// that drives the bond reserves to zero (`y' = 0` in the invariant),
    /// clipped to the trader's `budget` and to leaving at least
    /// `config.minimum_share_reserves` of share reserves in the pool.
    pub fn calc_max_long(
        &self,
        config: &PoolConfig,
        state: &MarketState,
        t: FixedDecimal,
        budget: FixedDecimal,
    ) -> Result<FixedDecimal> {
        let mu = self.mu(config);
        let c = self.c(state);
        let k = crate::yield_space::invariant_k(mu, c, state.share_reserves, state.bond_reserves, t)?;
        let one_minus_t = FixedDecimal::one() - t;

        // k = (c/mu)*(mu*z_target)^(1-t) when y' = 0.
        let mu_z_target = (k * mu / c).pow(FixedDecimal::one() / one_minus_t)?;
        let z_target = mu_z_target / mu;

        let floor = state.share_reserves.max(config.minimum_share_reserves);
        let z_target = z_target.max(floor);

        let share_delta = (z_target - state.share_reserves).max(FixedDecimal::zero());
        let base_amount = share_delta * c;

        Ok(base_amount.min(budget))
    }
}
