//! Offspring generation.
//!
//! The standard pass clones the parents, mates consecutive pairs and then
//! mutates each child independently. Offspring that were changed lose their
//! fitness and history id and record where they came from; offspring that
//! were not touched stay identical to their parent.

use rand::Rng;

use super::types::{Genome, Individual, Operators, SearchRng};

/// Produces offspring from the current parents.
pub trait VariationStrategy<G>: Send + Sync {
    /// Returns the offspring of `parents`.
    ///
    /// Changed offspring must have an invalid fitness so the dispatcher
    /// scores them.
    fn vary(
        &self,
        parents: &[Individual<G>],
        cxpb: f64,
        mutpb: f64,
        rng: &mut SearchRng,
    ) -> Vec<Individual<G>>;
}

/// How offspring are produced, fixed when the runner is built.
pub enum Variation<G> {
    /// [`vary_and`] with the given crossover and mutation operators.
    Standard(Box<dyn Operators<G>>),
    /// A caller-supplied strategy.
    Custom(Box<dyn VariationStrategy<G>>),
}

impl<G: Genome> Variation<G> {
    /// Standard variation over `operators`.
    pub fn standard(operators: impl Operators<G> + 'static) -> Self {
        Variation::Standard(Box::new(operators))
    }

    /// Custom variation strategy.
    pub fn custom(strategy: impl VariationStrategy<G> + 'static) -> Self {
        Variation::Custom(Box::new(strategy))
    }
}

impl<G: Genome> VariationStrategy<G> for Variation<G> {
    fn vary(
        &self,
        parents: &[Individual<G>],
        cxpb: f64,
        mutpb: f64,
        rng: &mut SearchRng,
    ) -> Vec<Individual<G>> {
        match self {
            Variation::Standard(operators) => vary_and(operators.as_ref(), parents, cxpb, mutpb, rng),
            Variation::Custom(strategy) => strategy.vary(parents, cxpb, mutpb, rng),
        }
    }
}

/// Crossover AND mutation over a copy of `parents`.
///
/// Children at positions `(0, 1)`, `(2, 3)`, ... are mated with probability
/// `cxpb`; afterwards every child is mutated with probability `mutpb`. The
/// result has the same length and order as `parents`.
pub fn vary_and<G: Genome>(
    operators: &dyn Operators<G>,
    parents: &[Individual<G>],
    cxpb: f64,
    mutpb: f64,
    rng: &mut SearchRng,
) -> Vec<Individual<G>> {
    let mut offspring = parents.to_vec();

    for i in (1..offspring.len()).step_by(2) {
        if rng.random::<f64>() < cxpb {
            let ids = [offspring[i - 1].id, offspring[i].id];
            let (left, right) = offspring.split_at_mut(i);
            let (first, second) = (&mut left[i - 1], &mut right[0]);
            operators.crossover(&mut first.genome, &mut second.genome, rng);
            first.derive_from(&ids);
            second.derive_from(&ids);
        }
    }

    for child in &mut offspring {
        if rng.random::<f64>() < mutpb {
            let id = child.id;
            operators.mutate(&mut child.genome, rng);
            child.derive_from(&[id]);
        }
    }

    offspring
}
