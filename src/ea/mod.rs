//! Resumable (mu + lambda) evolutionary loop.
//!
//! A domain-agnostic generational loop for expensive fitness functions.
//! Users supply an [`Evaluator`] and [`Operators`] for their genome type;
//! the loop owns evaluation dispatch, lineage, statistics, survivor
//! selection and durable checkpoints.
//!
//! # Core Traits
//!
//! - [`Genome`]: Any cloneable, thread-safe, serializable representation
//! - [`Evaluator`]: Scores a genome under an advisory timeout
//! - [`Operators`]: In-place crossover and mutation
//! - [`FitnessComparator`]: Maps objectives to minimization space
//!
//! # Key Types
//!
//! - [`EaConfig`]: Loop parameters, timeout heuristic, checkpoint targets
//! - [`EaRunner`]: Executes and resumes the loop
//! - [`SearchState`]: Between-generation state, convertible to a [`CheckpointRecord`]
//! - [`EaResult`]: Final population, parents, hall of fame, history and logbook
//!
//! # Submodules
//!
//! - [`operators`]: Bounded SBX crossover and polynomial mutation for real vectors
//! - [`multi_objective`]: Pareto non-dominated sorting and crowding distance
//! - [`checkpoint`]: Checkpoint records, atomic writes and validated loading
//!
//! # References
//!
//! - Bäck, Fogel & Michalewicz (2000), *Evolutionary Computation 1*
//! - Deb et al. (2002), *A Fast and Elitist Multiobjective GA: NSGA-II*
//! - Fortin et al. (2012), *DEAP: Evolutionary Algorithms Made Easy*

pub mod checkpoint;
mod config;
mod dispatch;
mod error;
mod lineage;
pub mod multi_objective;
pub mod operators;
mod runner;
mod selection;
mod stats;
mod timeout;
mod types;
mod variation;

pub use checkpoint::{CheckpointRecord, CheckpointStore};
pub use config::{CheckpointConfig, EaConfig, TimeoutConfig};
pub use dispatch::{evaluate_invalid, DispatchReport};
pub use error::{CheckpointError, ConfigError, EaError, EvaluationFailure};
pub use lineage::{Archive, History, HistoryEntry, LineageTracker};
pub use operators::{Bounds, RealVectorOperators};
pub use runner::{EaResult, EaRunner, Phase, SearchState};
pub use selection::{Selection, SelectionStrategy};
pub use stats::{ObjectiveStats, StatisticsLog, StatsCompiler, StatsRecord, Summary};
pub use timeout::{DurationWindow, TimeoutEstimator};
pub use types::{
    Direction, Evaluation, Evaluator, Fitness, FitnessComparator, Genome, Individual,
    IndividualId, Objectives, Operators, SearchRng,
};
pub use variation::{vary_and, Variation, VariationStrategy};
