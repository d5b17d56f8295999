//! Survivor selection.
//!
//! Reduces the merged parents-plus-offspring population back to `mu`
//! parents. Ranking is Pareto based, so the built-in strategies work for
//! one or many objectives.
//!
//! # References
//!
//! - Deb et al. (2002), "A Fast and Elitist Multiobjective GA: NSGA-II"
//! - Blickle & Thiele (1996), "A Comparison of Selection Schemes used in
//!   Evolutionary Algorithms"

use rand::Rng;

use super::multi_objective::{crowding_distance, non_dominated_sort};
use super::types::{FitnessComparator, Genome, Individual, SearchRng};

/// Reduces a population to `mu` parents.
pub trait SelectionStrategy<G>: Send + Sync {
    /// Selects `mu` individuals from `population`.
    fn select(
        &self,
        population: &[Individual<G>],
        mu: usize,
        comparator: &dyn FitnessComparator,
        rng: &mut SearchRng,
    ) -> Vec<Individual<G>>;
}

/// Built-in selection strategies.
///
/// # Examples
///
/// ```
/// use u_evoloop::ea::Selection;
///
/// // Deterministic elitist truncation
/// let sel = Selection::Nsga2;
///
/// // Binary tournament on Pareto rank
/// let sel = Selection::Tournament(2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// NSGA-II environmental selection: fill by Pareto front, break the last
    /// front by crowding distance. Deterministic; never draws from the RNG.
    #[default]
    Nsga2,

    /// Tournament of `k` on (Pareto rank, crowding distance), with
    /// replacement.
    ///
    /// Higher `k` = stronger selection pressure.
    Tournament(usize),
}

impl<G: Genome> SelectionStrategy<G> for Selection {
    fn select(
        &self,
        population: &[Individual<G>],
        mu: usize,
        comparator: &dyn FitnessComparator,
        rng: &mut SearchRng,
    ) -> Vec<Individual<G>> {
        if population.is_empty() || mu == 0 {
            return Vec::new();
        }
        let ranking = Ranking::new(population, comparator);
        let picked = match self {
            Selection::Nsga2 => ranking.truncate(mu),
            Selection::Tournament(k) => (0..mu).map(|_| ranking.tournament(*k, rng)).collect(),
        };
        picked.into_iter().map(|i| population[i].clone()).collect()
    }
}

/// Pareto rank and crowding distance of every individual.
struct Ranking {
    rank: Vec<usize>,
    crowding: Vec<f64>,
    fronts: Vec<Vec<usize>>,
}

impl Ranking {
    fn new<G: Genome>(population: &[Individual<G>], comparator: &dyn FitnessComparator) -> Self {
        // Unscored individuals rank behind everything that was scored.
        let objectives: Vec<Vec<f64>> = population
            .iter()
            .map(|ind| match ind.values() {
                Some(values) => comparator.to_minimization(values),
                None => vec![f64::INFINITY],
            })
            .collect();

        let sorted = non_dominated_sort(&objectives);
        let mut crowding = vec![0.0; population.len()];
        for front in &sorted.fronts {
            let front_objs: Vec<Vec<f64>> = front.iter().map(|&i| objectives[i].clone()).collect();
            for (&i, d) in front.iter().zip(crowding_distance(&front_objs)) {
                crowding[i] = d;
            }
        }

        Self {
            rank: sorted.ranks,
            crowding,
            fronts: sorted.fronts,
        }
    }

    /// `true` if `a` is preferred over `b`.
    fn better(&self, a: usize, b: usize) -> bool {
        self.rank[a] < self.rank[b]
            || (self.rank[a] == self.rank[b] && self.crowding[a] > self.crowding[b])
    }

    fn truncate(&self, mu: usize) -> Vec<usize> {
        let mut chosen = Vec::with_capacity(mu);
        for front in &self.fronts {
            if chosen.len() + front.len() <= mu {
                chosen.extend_from_slice(front);
                continue;
            }
            let mut last = front.clone();
            last.sort_by(|&a, &b| {
                self.crowding[b]
                    .partial_cmp(&self.crowding[a])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            chosen.extend(last.into_iter().take(mu - chosen.len()));
            break;
        }
        chosen
    }

    fn tournament(&self, k: usize, rng: &mut SearchRng) -> usize {
        let n = self.rank.len();
        let mut best = rng.random_range(0..n);
        for _ in 1..k.max(1) {
            let idx = rng.random_range(0..n);
            if self.better(idx, best) {
                best = idx;
            }
        }
        best
    }
}
