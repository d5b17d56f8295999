//! Bounded real-vector genetic operators.
//!
//! Crossover and mutation for `Vec<f64>` genomes with per-gene bounds,
//! usable directly as the [`Operators`] of the standard variation pass.
//!
//! # Crossover Operators
//!
//! - [`sbx_crossover`]: Simulated Binary Crossover, bounded variant
//!
//! # Mutation Operators
//!
//! - [`polynomial_mutation`]: bounded polynomial mutation
//!
//! # References
//!
//! - Deb & Agrawal (1995), "Simulated Binary Crossover for Continuous Search Space"
//! - Deb & Goyal (1996), "A Combined Genetic Adaptive Search (GeneAS)"

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::types::{Operators, SearchRng};

/// Inclusive per-gene bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    /// Per-gene bounds.
    ///
    /// # Panics
    /// Panics if the vectors differ in length or any `lower > upper`.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Self {
        assert_eq!(lower.len(), upper.len(), "bounds must have equal length");
        assert!(
            lower.iter().zip(&upper).all(|(l, u)| l <= u),
            "lower bound exceeds upper bound"
        );
        Self { lower, upper }
    }

    /// The same `[lower, upper]` range for `dim` genes.
    pub fn uniform(lower: f64, upper: f64, dim: usize) -> Self {
        Self::new(vec![lower; dim], vec![upper; dim])
    }

    /// Number of genes.
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Draws a uniformly random genome inside the bounds.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(&l, &u)| if u > l { rng.random_range(l..=u) } else { l })
            .collect()
    }
}

/// Bounded Simulated Binary Crossover (SBX), in place.
///
/// Each gene is crossed with probability 0.5. `eta` is the crowding degree:
/// high values keep children close to their parents.
///
/// # Panics
/// Panics if the parents and bounds differ in length.
pub fn sbx_crossover<R: Rng>(a: &mut [f64], b: &mut [f64], eta: f64, bounds: &Bounds, rng: &mut R) {
    assert_eq!(a.len(), b.len(), "parents must have equal length");
    assert_eq!(a.len(), bounds.dim(), "parents must match bounds");

    for i in 0..a.len() {
        if rng.random::<f64>() > 0.5 || (a[i] - b[i]).abs() <= 1e-14 {
            continue;
        }
        let (x1, x2) = (a[i].min(b[i]), a[i].max(b[i]));
        let (xl, xu) = (bounds.lower[i], bounds.upper[i]);
        let u: f64 = rng.random();

        let spread_low = 1.0 + 2.0 * (x1 - xl) / (x2 - x1);
        let c1 = 0.5 * (x1 + x2 - sbx_beta_q(spread_low, eta, u) * (x2 - x1));
        let spread_high = 1.0 + 2.0 * (xu - x2) / (x2 - x1);
        let c2 = 0.5 * (x1 + x2 + sbx_beta_q(spread_high, eta, u) * (x2 - x1));

        let c1 = c1.clamp(xl, xu);
        let c2 = c2.clamp(xl, xu);
        if rng.random::<f64>() <= 0.5 {
            a[i] = c2;
            b[i] = c1;
        } else {
            a[i] = c1;
            b[i] = c2;
        }
    }
}

fn sbx_beta_q(beta: f64, eta: f64, u: f64) -> f64 {
    let alpha = 2.0 - beta.powf(-(eta + 1.0));
    if u <= 1.0 / alpha {
        (u * alpha).powf(1.0 / (eta + 1.0))
    } else {
        (1.0 / (2.0 - u * alpha)).powf(1.0 / (eta + 1.0))
    }
}

/// Bounded polynomial mutation, in place.
///
/// Each gene mutates with probability `indpb`; genes with a degenerate
/// range are left alone.
///
/// # Panics
/// Panics if the genome and bounds differ in length.
pub fn polynomial_mutation<R: Rng>(genes: &mut [f64], eta: f64, indpb: f64, bounds: &Bounds, rng: &mut R) {
    assert_eq!(genes.len(), bounds.dim(), "genome must match bounds");

    let mut_pow = 1.0 / (eta + 1.0);
    for (i, x) in genes.iter_mut().enumerate() {
        if rng.random::<f64>() > indpb {
            continue;
        }
        let (xl, xu) = (bounds.lower[i], bounds.upper[i]);
        let range = xu - xl;
        if range <= 0.0 {
            continue;
        }
        let delta_1 = (*x - xl) / range;
        let delta_2 = (xu - *x) / range;
        let u: f64 = rng.random();

        let delta_q = if u < 0.5 {
            let xy = 1.0 - delta_1;
            let val = 2.0 * u + (1.0 - 2.0 * u) * xy.powf(eta + 1.0);
            val.powf(mut_pow) - 1.0
        } else {
            let xy = 1.0 - delta_2;
            let val = 2.0 * (1.0 - u) + 2.0 * (u - 0.5) * xy.powf(eta + 1.0);
            1.0 - val.powf(mut_pow)
        };

        *x = (*x + delta_q * range).clamp(xl, xu);
    }
}

/// SBX crossover plus polynomial mutation over bounded `Vec<f64>` genomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealVectorOperators {
    pub bounds: Bounds,
    /// Crowding degree for both operators.
    pub eta: f64,
    /// Per-gene mutation probability.
    pub indpb: f64,
}

impl RealVectorOperators {
    /// Operators with `eta = 10` and `indpb = 1 / dim`.
    pub fn new(bounds: Bounds) -> Self {
        let indpb = 1.0 / bounds.dim().max(1) as f64;
        Self {
            bounds,
            eta: 10.0,
            indpb,
        }
    }

    /// Sets the crowding degree.
    pub fn with_eta(mut self, eta: f64) -> Self {
        self.eta = eta.max(0.0);
        self
    }

    /// Sets the per-gene mutation probability.
    pub fn with_indpb(mut self, indpb: f64) -> Self {
        self.indpb = indpb.clamp(0.0, 1.0);
        self
    }
}

impl Operators<Vec<f64>> for RealVectorOperators {
    fn crossover(&self, first: &mut Vec<f64>, second: &mut Vec<f64>, rng: &mut SearchRng) {
        sbx_crossover(first, second, self.eta, &self.bounds, rng);
    }

    fn mutate(&self, genome: &mut Vec<f64>, rng: &mut SearchRng) {
        polynomial_mutation(genome, self.eta, self.indpb, &self.bounds, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn within(genes: &[f64], bounds: &Bounds) -> bool {
        genes
            .iter()
            .zip(bounds.lower.iter().zip(&bounds.upper))
            .all(|(&g, (&l, &u))| g >= l && g <= u)
    }

    #[test]
    fn test_sbx_respects_bounds() {
        let bounds = Bounds::uniform(-1.0, 1.0, 6);
        let mut rng = SearchRng::seed_from_u64(42);
        for _ in 0..200 {
            let mut a = bounds.sample(&mut rng);
            let mut b = bounds.sample(&mut rng);
            sbx_crossover(&mut a, &mut b, 2.0, &bounds, &mut rng);
            assert!(within(&a, &bounds) && within(&b, &bounds));
        }
    }

    #[test]
    fn test_sbx_identical_parents_unchanged() {
        let bounds = Bounds::uniform(0.0, 10.0, 4);
        let mut rng = SearchRng::seed_from_u64(1);
        let mut a = vec![3.0; 4];
        let mut b = vec![3.0; 4];
        sbx_crossover(&mut a, &mut b, 10.0, &bounds, &mut rng);
        assert_eq!(a, vec![3.0; 4]);
        assert_eq!(b, vec![3.0; 4]);
    }

    #[test]
    fn test_polynomial_mutation_respects_bounds() {
        let bounds = Bounds::new(vec![0.0, -5.0, 2.0], vec![1.0, 5.0, 2.0]);
        let mut rng = SearchRng::seed_from_u64(7);
        for _ in 0..200 {
            let mut genes = bounds.sample(&mut rng);
            polynomial_mutation(&mut genes, 10.0, 1.0, &bounds, &mut rng);
            assert!(within(&genes, &bounds));
            assert_eq!(genes[2], 2.0);
        }
    }

    #[test]
    fn test_polynomial_mutation_zero_indpb_is_noop() {
        let bounds = Bounds::uniform(0.0, 1.0, 5);
        let mut rng = SearchRng::seed_from_u64(7);
        let original = bounds.sample(&mut rng);
        let mut genes = original.clone();
        polynomial_mutation(&mut genes, 10.0, 0.0, &bounds, &mut rng);
        assert_eq!(genes, original);
    }

    #[test]
    fn test_operators_are_deterministic_per_seed() {
        let ops = RealVectorOperators::new(Bounds::uniform(-2.0, 2.0, 3)).with_indpb(1.0);
        let run = |seed| {
            let mut rng = SearchRng::seed_from_u64(seed);
            let mut a = vec![-1.0, 0.0, 1.0];
            let mut b = vec![1.0, 0.5, -1.0];
            ops.crossover(&mut a, &mut b, &mut rng);
            ops.mutate(&mut a, &mut rng);
            (a, b)
        };
        assert_eq!(run(5), run(5));
    }

    #[test]
    #[should_panic(expected = "lower bound exceeds upper bound")]
    fn test_inverted_bounds_panic() {
        Bounds::new(vec![1.0], vec![0.0]);
    }
}
