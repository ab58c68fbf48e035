//! Random sources for synthetic signal generation.
//!
//! spec.md §4.1 Inputs / §9 Design Notes "Randomness seeds": a uniform
//! U(0,1) source seeded from `seed`, and a Gamma(shape=2.0, scale=mean_slen/2)
//! read-length source seeded from `seed+1`. The source program hand-rolls
//! both; here they're built on `rand`/`rand_distr` (pack enrichment —
//! `easternanemone-rust-daq` already depends on `rand`) rather than
//! reimplementing a PRNG and a gamma sampler by hand.
//!
//! Per spec.md §9, positions are not offset from one another: multiple
//! positions sharing a run deliberately share the same `(seed, seed+1)`
//! streams. This is preserved rather than silently fixed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma};

use crate::constants::LENGTH_GAMMA_SHAPE;

/// Uniform U(0,1) sample source used for per-sample noise.
pub struct UniformSource {
    rng: StdRng,
}

impl UniformSource {
    pub fn new(seed: i64) -> Self {
        UniformSource {
            rng: StdRng::seed_from_u64(seed as u64),
        }
    }

    /// Draw `u ∈ [0, 1)`.
    pub fn next(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}

/// Gamma-distributed read-length source (shape 2.0, scale `mean_slen / 2`).
pub struct LengthSource {
    rng: StdRng,
    gamma: Gamma<f64>,
}

impl LengthSource {
    pub fn new(seed: i64, mean_slen: i64) -> Self {
        let scale = (mean_slen as f64) / 2.0;
        let gamma = Gamma::new(LENGTH_GAMMA_SHAPE, scale)
            .expect("gamma shape/scale must be positive for any valid derived options");
        LengthSource {
            rng: StdRng::seed_from_u64(seed as u64),
            gamma,
        }
    }

    /// Draw a non-negative target read length in samples.
    pub fn next(&mut self) -> u64 {
        let v = self.gamma.sample(&mut self.rng);
        v.round().max(0.0) as u64
    }
}

/// Generate one noisy sample: `500 + round(u*1000 - 500)`.
///
/// spec.md §4.1 / §9 Open Question (b): this formula is a fixed synthetic
/// contract, not a physical model of pore current.
pub fn noisy_sample(u: f64) -> i16 {
    (crate::constants::SAMPLE_BASE_LEVEL + (u * 1000.0 - 500.0).round()) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_source_stays_in_range() {
        let mut src = UniformSource::new(5);
        for _ in 0..1000 {
            let u = src.next();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn length_source_is_deterministic_for_same_seed() {
        let mut a = LengthSource::new(6, 100_000);
        let mut b = LengthSource::new(6, 100_000);
        for _ in 0..50 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn length_source_mean_is_in_the_right_ballpark() {
        let mut src = LengthSource::new(6, 100_000);
        let n = 20_000u64;
        let sum: u64 = (0..n).map(|_| src.next()).sum();
        let mean = sum as f64 / n as f64;
        // Gamma(shape=2, scale=mean_slen/2) has mean = shape*scale = mean_slen.
        assert!((mean - 100_000.0).abs() < 100_000.0 * 0.1);
    }

    #[test]
    fn noisy_sample_formula_matches_contract() {
        assert_eq!(noisy_sample(0.0), 500 + (0.0f64 - 500.0).round() as i16);
        assert_eq!(noisy_sample(1.0), 500 + (1000.0f64 - 500.0).round() as i16);
        assert_eq!(noisy_sample(0.5), 500);
    }
}
