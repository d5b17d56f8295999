//! Core trait and type definitions for the evolutionary loop.
//!
//! The loop never looks inside a genome. It only reads and writes the
//! [`Fitness`] and lineage slots of an [`Individual`], and talks to the
//! outside world through the [`Evaluator`], [`Operators`] and
//! [`FitnessComparator`] traits.

use std::time::Duration;

use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::EvaluationFailure;
use super::multi_objective::{dominance_cmp, Dominance};

/// The random generator threaded through the loop and captured in every
/// checkpoint.
pub type SearchRng = ChaCha8Rng;

/// Identifier assigned to an individual the first time it is recorded in
/// the lineage history.
pub type IndividualId = u64;

/// Marker trait for genome representations.
///
/// Anything cloneable, thread-safe and serializable qualifies; the blanket
/// impl means users never implement this by hand.
pub trait Genome: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> Genome for T where T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

/// Fitness state of an individual.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Fitness {
    /// Not yet scored, or invalidated by variation.
    #[default]
    Invalid,
    /// Objective values, one per objective. Non-finite values survive a
    /// checkpoint round-trip.
    Valid(#[serde(with = "float_codec")] Vec<f64>),
}

impl Fitness {
    /// Returns `true` if the individual has been scored.
    pub fn is_valid(&self) -> bool {
        matches!(self, Fitness::Valid(_))
    }

    /// Objective values, if valid.
    pub fn values(&self) -> Option<&[f64]> {
        match self {
            Fitness::Valid(values) => Some(values),
            Fitness::Invalid => None,
        }
    }
}

/// A candidate solution: an opaque genome plus its fitness and lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "G: Genome")]
pub struct Individual<G> {
    /// The representation-owned genome.
    pub genome: G,
    /// Current fitness.
    pub fitness: Fitness,
    /// History id, assigned when the individual is first recorded.
    pub id: Option<IndividualId>,
    /// History ids of the individuals this one was derived from.
    pub parents: Vec<IndividualId>,
}

impl<G: Genome> Individual<G> {
    /// Wraps a fresh genome with invalid fitness and no lineage.
    pub fn new(genome: G) -> Self {
        Self {
            genome,
            fitness: Fitness::Invalid,
            id: None,
            parents: Vec::new(),
        }
    }

    /// Objective values, if the fitness is valid.
    pub fn values(&self) -> Option<&[f64]> {
        self.fitness.values()
    }

    /// Marks this individual as a new offspring of `parents`.
    ///
    /// Clears the fitness and the history id, so the dispatcher evaluates it
    /// and the history records it as a new entry. Calling this again on an
    /// individual that is already an unrecorded offspring only clears the
    /// fitness and keeps the parents from the first call.
    pub fn derive_from(&mut self, parents: &[Option<IndividualId>]) {
        self.fitness = Fitness::Invalid;
        if self.id.is_some() || self.parents.is_empty() {
            self.parents = parents.iter().flatten().copied().collect();
            self.parents.dedup();
        }
        self.id = None;
    }
}

/// Outcome of a successful evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Objective values.
    pub values: Vec<f64>,
    /// Wall-clock time the evaluation took, if the evaluator measured it.
    pub elapsed: Option<Duration>,
}

impl Evaluation {
    /// An evaluation without timing information.
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            elapsed: None,
        }
    }

    /// Attaches the measured evaluation time.
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }
}

/// Scores a genome.
///
/// This is typically the most expensive operation and may be called in
/// parallel across the offspring. `timeout_secs` is an advisory budget
/// derived from recent evaluation times; the loop never enforces it.
pub trait Evaluator<G>: Send + Sync {
    /// Evaluates one genome.
    fn evaluate(&self, genome: &G, timeout_secs: u64) -> Result<Evaluation, EvaluationFailure>;
}

impl<G, F> Evaluator<G> for F
where
    F: Fn(&G, u64) -> Result<Evaluation, EvaluationFailure> + Send + Sync,
{
    fn evaluate(&self, genome: &G, timeout_secs: u64) -> Result<Evaluation, EvaluationFailure> {
        self(genome, timeout_secs)
    }
}

/// Crossover and mutation for a genome type.
///
/// Used by the standard variation pass. Both operators work in place; the
/// variation pass takes care of fitness invalidation and lineage.
pub trait Operators<G>: Send + Sync {
    /// Recombines two genomes in place.
    fn crossover(&self, first: &mut G, second: &mut G, rng: &mut SearchRng);

    /// Perturbs a genome in place.
    fn mutate(&self, genome: &mut G, rng: &mut SearchRng);
}

/// Objective direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Minimize,
    Maximize,
}

/// Orders objective vectors.
///
/// Implementations map raw objective values into minimization space; the
/// dominance relation is derived from that mapping.
pub trait FitnessComparator: Send + Sync {
    /// Maps objective values so that lower is better in every component.
    fn to_minimization(&self, values: &[f64]) -> Vec<f64>;

    /// Pareto dominance between two objective vectors.
    fn dominance(&self, a: &[f64], b: &[f64]) -> Dominance {
        dominance_cmp(&self.to_minimization(a), &self.to_minimization(b))
    }

    /// Returns `true` if `a` dominates `b`.
    fn dominates(&self, a: &[f64], b: &[f64]) -> bool {
        self.dominance(a, b) == Dominance::Left
    }
}

/// Built-in comparator from objective directions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Objectives {
    /// Every objective is minimized.
    #[default]
    Minimize,
    /// Every objective is maximized.
    Maximize,
    /// One direction per objective; objectives beyond the list are minimized.
    Mixed(Vec<Direction>),
}

impl Objectives {
    fn direction(&self, index: usize) -> Direction {
        match self {
            Objectives::Minimize => Direction::Minimize,
            Objectives::Maximize => Direction::Maximize,
            Objectives::Mixed(directions) => directions
                .get(index)
                .copied()
                .unwrap_or(Direction::Minimize),
        }
    }
}

impl FitnessComparator for Objectives {
    fn to_minimization(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| match self.direction(i) {
                Direction::Minimize => v,
                Direction::Maximize => -v,
            })
            .collect()
    }
}

/// Serde adapter for objective vectors that may hold `inf` or `NaN`.
///
/// JSON has no literal for non-finite numbers, so they are written as the
/// strings `"inf"`, `"-inf"` and `"nan"`. Finite values stay plain numbers.
pub(crate) mod float_codec {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Float {
        Finite(f64),
        Special(String),
    }

    fn encode(value: f64) -> Float {
        if value.is_finite() {
            Float::Finite(value)
        } else if value.is_nan() {
            Float::Special("nan".into())
        } else if value > 0.0 {
            Float::Special("inf".into())
        } else {
            Float::Special("-inf".into())
        }
    }

    fn decode<E: serde::de::Error>(value: Float) -> Result<f64, E> {
        match value {
            Float::Finite(v) => Ok(v),
            Float::Special(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(E::custom(format!("unknown float literal `{other}`"))),
            },
        }
    }

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|&v| encode(v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<Float>::deserialize(deserializer)?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Same encoding for a map of named vectors.
    pub mod map {
        use super::*;

        pub fn serialize<S: Serializer>(
            map: &BTreeMap<String, Vec<f64>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.collect_map(map.iter().map(|(name, values)| {
                let encoded: Vec<Float> = values.iter().map(|&v| encode(v)).collect();
                (name, encoded)
            }))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<BTreeMap<String, Vec<f64>>, D::Error> {
            BTreeMap::<String, Vec<Float>>::deserialize(deserializer)?
                .into_iter()
                .map(|(name, values)| {
                    let values = values
                        .into_iter()
                        .map(decode)
                        .collect::<Result<Vec<f64>, D::Error>>()?;
                    Ok((name, values))
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_fitness_survives_json() {
        let fitness = Fitness::Valid(vec![1.5, f64::INFINITY, f64::NEG_INFINITY, f64::NAN]);
        let json = serde_json::to_string(&fitness).unwrap();
        assert_eq!(json, r#"{"Valid":[1.5,"inf","-inf","nan"]}"#);

        let values = match serde_json::from_str::<Fitness>(&json).unwrap() {
            Fitness::Valid(values) => values,
            Fitness::Invalid => panic!("expected valid fitness"),
        };
        assert_eq!(&values[..3], &[1.5, f64::INFINITY, f64::NEG_INFINITY]);
        assert!(values[3].is_nan());
    }

    #[test]
    fn test_unknown_float_literal_rejected() {
        assert!(serde_json::from_str::<Fitness>(r#"{"Valid":["huge"]}"#).is_err());
    }

    #[test]
    fn test_new_individual_is_invalid() {
        let ind = Individual::new(vec![1.0, 2.0]);
        assert!(!ind.fitness.is_valid());
        assert!(ind.id.is_none());
        assert!(ind.parents.is_empty());
    }

    #[test]
    fn test_derive_from_recorded_individual() {
        let mut ind = Individual::new(3u32);
        ind.fitness = Fitness::Valid(vec![1.0]);
        ind.id = Some(7);

        ind.derive_from(&[Some(7), Some(9)]);
        assert_eq!(ind.fitness, Fitness::Invalid);
        assert_eq!(ind.id, None);
        assert_eq!(ind.parents, vec![7, 9]);

        // A second derivation (mutation after crossover) keeps the parents.
        ind.derive_from(&[None]);
        assert_eq!(ind.parents, vec![7, 9]);
    }

    #[test]
    fn test_objectives_mixed() {
        let cmp = Objectives::Mixed(vec![Direction::Maximize, Direction::Minimize]);
        assert_eq!(cmp.to_minimization(&[2.0, 3.0, 4.0]), vec![-2.0, 3.0, 4.0]);

        assert!(cmp.dominates(&[5.0, 1.0], &[4.0, 2.0]));
        assert!(!cmp.dominates(&[5.0, 3.0], &[4.0, 2.0]));
    }

    #[test]
    fn test_maximize_dominance() {
        let cmp = Objectives::Maximize;
        assert!(cmp.dominates(&[10.0], &[3.0]));
        assert!(!cmp.dominates(&[3.0], &[10.0]));
        assert_eq!(cmp.dominance(&[1.0, 1.0], &[1.0, 1.0]), Dominance::Neither);
    }

    #[test]
    fn test_closure_evaluator() {
        let eval = |g: &Vec<f64>, _timeout: u64| {
            Ok::<_, EvaluationFailure>(Evaluation::new(vec![g.iter().sum()]))
        };
        let result = Evaluator::evaluate(&eval, &vec![1.0, 2.0], 600).unwrap();
        assert_eq!(result.values, vec![3.0]);
        assert!(result.elapsed.is_none());
    }
}
