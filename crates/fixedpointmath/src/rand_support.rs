use ethers::types::I256;
use rand::distributions::{Distribution, Standard};
use rand::Rng;

use crate::{scale, FixedDecimal};

/// Samples a `FixedDecimal` uniformly in `[0, 1e6)` (whole units), matching
/// the teacher crate's convention of sampling reserve-sized fixtures for
/// differential fuzz tests via `rng.gen::<FixedDecimal>()`.
impl Distribution<FixedDecimal> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> FixedDecimal {
        let whole: u64 = rng.gen_range(0..1_000_000);
        let frac: u64 = rng.gen_range(0..1_000_000_000_000_000_000u64);
        FixedDecimal::from_scaled(I256::from(whole) * scale() + I256::from(frac))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn sampling_is_deterministic_given_seed() {
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        let xs: Vec<FixedDecimal> = (0..10).map(|_| a.gen()).collect();
        let ys: Vec<FixedDecimal> = (0..10).map(|_| b.gen()).collect();
        assert_eq!(xs, ys);
    }
}
