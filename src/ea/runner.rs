//! Generational loop execution.
//!
//! [`EaRunner`] drives the (mu + lambda) process:
//! evaluation → lineage → statistics → selection → checkpoint → variation → repeat.
//!
//! A run is a [`SearchState`] advanced one generation at a time by
//! [`EaRunner::step`]. The state can be captured as a
//! [`CheckpointRecord`] after any generation and rebuilt with
//! [`EaRunner::restore`]; continuing from a restored state produces the same
//! trajectory as a run that was never interrupted.

use rand::SeedableRng;

use super::checkpoint::{self, CheckpointRecord, CheckpointStore, FORMAT_VERSION};
use super::config::EaConfig;
use super::dispatch::evaluate_invalid;
use super::error::{CheckpointError, EaError};
use super::lineage::{Archive, History, LineageTracker};
use super::selection::{Selection, SelectionStrategy};
use super::stats::{StatisticsLog, StatsCompiler, Summary};
use super::timeout::TimeoutEstimator;
use super::types::{Evaluator, FitnessComparator, Genome, Individual, Objectives, Operators, SearchRng};
use super::variation::{Variation, VariationStrategy};

/// Where a [`SearchState`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Initial population evaluated (generation 1).
    Initialized,
    /// The given generation has completed.
    Running(usize),
    /// Rebuilt from a checkpoint of the given generation.
    Resumed(usize),
    /// The last configured generation has completed.
    Completed,
}

/// Mutable state of a run between two generations.
#[derive(Debug, Clone)]
pub struct SearchState<G: Genome> {
    /// Last completed generation.
    pub generation: usize,
    /// Merged population of the last completed generation.
    pub population: Vec<Individual<G>>,
    /// Parents of the next generation.
    pub parents: Vec<Individual<G>>,
    /// Evaluation history and Pareto archive.
    pub lineage: LineageTracker<G>,
    /// One statistics record per completed generation.
    pub logbook: StatisticsLog,
    /// Generator for variation and selection; advanced only by completed steps.
    pub rng: SearchRng,
    /// Duration window behind the next timeout hint.
    pub timeouts: TimeoutEstimator,
    /// Lifecycle marker.
    pub phase: Phase,
}

impl<G: Genome> SearchState<G> {
    /// Snapshot of this state.
    pub fn to_record(&self) -> CheckpointRecord<G> {
        CheckpointRecord {
            format_version: FORMAT_VERSION,
            generation: self.generation,
            population: self.population.clone(),
            parents: self.parents.clone(),
            archive: self.lineage.archive.clone(),
            history: self.lineage.history.clone(),
            logbook: self.logbook.clone(),
            rng: self.rng.clone(),
            durations: self.timeouts.window().clone(),
        }
    }

    /// Consumes the state into a result.
    pub fn into_result(self) -> EaResult<G> {
        EaResult {
            population: self.population,
            parents: self.parents,
            archive: self.lineage.archive,
            history: self.lineage.history,
            logbook: self.logbook,
            generations: self.generation,
        }
    }
}

/// Result of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct EaResult<G: Genome> {
    /// Merged population of the last generation.
    pub population: Vec<Individual<G>>,
    /// Parents selected in the last generation.
    pub parents: Vec<Individual<G>>,
    /// Hall of fame.
    pub archive: Archive<G>,
    /// Every individual ever evaluated.
    pub history: History<G>,
    /// One record per generation.
    pub logbook: StatisticsLog,
    /// Last completed generation.
    pub generations: usize,
}

/// Executes the generational loop.
///
/// # Usage
///
/// ```
/// use u_evoloop::ea::{
///     Bounds, EaConfig, EaRunner, Evaluation, EvaluationFailure, Objectives,
///     RealVectorOperators,
/// };
///
/// let bounds = Bounds::uniform(-5.0, 5.0, 3);
/// let config = EaConfig::default()
///     .with_mu(8)
///     .with_ngen(5)
///     .with_seed(42)
///     .with_parallel(false);
///
/// let sphere = |x: &Vec<f64>, _timeout: u64| {
///     Ok::<_, EvaluationFailure>(Evaluation::new(vec![x.iter().map(|v| v * v).sum()]))
/// };
/// let runner = EaRunner::new(config, sphere, RealVectorOperators::new(bounds.clone()))
///     .with_comparator(Objectives::Minimize);
///
/// let mut rng = rand::rng();
/// let genomes: Vec<Vec<f64>> = (0..8).map(|_| bounds.sample(&mut rng)).collect();
/// let result = runner.run(genomes).unwrap();
/// assert_eq!(result.generations, 5);
/// assert_eq!(result.logbook.len(), 5);
/// ```
pub struct EaRunner<G: Genome> {
    config: EaConfig,
    evaluator: Box<dyn Evaluator<G>>,
    variation: Variation<G>,
    selection: Box<dyn SelectionStrategy<G>>,
    comparator: Box<dyn FitnessComparator>,
    stats: Option<Box<dyn StatsCompiler<G>>>,
    store: CheckpointStore,
}

impl<G: Genome> EaRunner<G> {
    /// Creates a runner with standard variation over `operators`, NSGA-II
    /// selection, minimized objectives and no statistics.
    pub fn new(
        config: EaConfig,
        evaluator: impl Evaluator<G> + 'static,
        operators: impl Operators<G> + 'static,
    ) -> Self {
        let store = CheckpointStore::new(config.checkpoint.clone());
        Self {
            config,
            evaluator: Box::new(evaluator),
            variation: Variation::standard(operators),
            selection: Box::new(Selection::default()),
            comparator: Box::new(Objectives::default()),
            stats: None,
            store,
        }
    }

    /// Replaces the variation strategy.
    pub fn with_variation(mut self, variation: Variation<G>) -> Self {
        self.variation = variation;
        self
    }

    /// Replaces the selection strategy.
    pub fn with_selection(mut self, selection: impl SelectionStrategy<G> + 'static) -> Self {
        self.selection = Box::new(selection);
        self
    }

    /// Replaces the fitness comparator.
    pub fn with_comparator(mut self, comparator: impl FitnessComparator + 'static) -> Self {
        self.comparator = Box::new(comparator);
        self
    }

    /// Compiles per-generation statistics into the logbook.
    pub fn with_stats(mut self, stats: impl StatsCompiler<G> + 'static) -> Self {
        self.stats = Some(Box::new(stats));
        self
    }

    pub fn config(&self) -> &EaConfig {
        &self.config
    }

    /// Runs a fresh search from `genomes` to the last configured generation.
    ///
    /// # Errors
    ///
    /// - [`EaError::Config`] for an invalid configuration
    /// - [`EaError::EmptyPopulation`] if `genomes` is empty
    /// - [`EaError::Evaluation`] if any evaluation fails
    pub fn run(&self, genomes: Vec<G>) -> Result<EaResult<G>, EaError> {
        let mut state = self.initialize(genomes)?;
        self.run_state(&mut state)?;
        Ok(state.into_result())
    }

    /// Continues the search stored at the configured checkpoint path.
    ///
    /// The checkpointed generator state takes over; `seed` is ignored.
    pub fn resume(&self) -> Result<EaResult<G>, EaError> {
        let path = self
            .config
            .checkpoint
            .path
            .as_deref()
            .ok_or(EaError::NoCheckpointPath)?;
        let record = checkpoint::load(path)?;
        let mut state = self.restore(record)?;
        self.run_state(&mut state)?;
        Ok(state.into_result())
    }

    /// [`resume`](Self::resume) if `resume` is set, otherwise
    /// [`run`](Self::run) from `genomes`.
    pub fn run_or_resume(&self, genomes: Vec<G>, resume: bool) -> Result<EaResult<G>, EaError> {
        if resume {
            self.resume()
        } else {
            self.run(genomes)
        }
    }

    /// Evaluates the initial population and records generation 1.
    ///
    /// The whole population becomes the first parents. Checkpoints are
    /// written if due, as after any other generation.
    pub fn initialize(&self, genomes: Vec<G>) -> Result<SearchState<G>, EaError> {
        self.config.validate()?;
        if genomes.is_empty() {
            return Err(EaError::EmptyPopulation);
        }

        let rng = SearchRng::seed_from_u64(self.config.seed.unwrap_or_else(rand::random));
        let mut population: Vec<Individual<G>> = genomes.into_iter().map(Individual::new).collect();

        let report = evaluate_invalid(
            self.evaluator.as_ref(),
            &mut population,
            self.config.timeout.initial_timeout_secs,
            self.config.parallel,
        )?;

        let mut lineage = LineageTracker::new(self.config.archive_size);
        lineage.update(&mut population, 1, self.comparator.as_ref());

        let mut logbook = StatisticsLog::new();
        let record = logbook.record(1, report.evaluated, self.summarize(&population));
        log::info!("{}", record.line());

        let mut timeouts = TimeoutEstimator::new(self.config.timeout.clone());
        timeouts.observe(&report.durations, population.len());

        let state = SearchState {
            generation: 1,
            parents: population.clone(),
            population,
            lineage,
            logbook,
            rng,
            timeouts,
            phase: Phase::Initialized,
        };
        self.persist(&state)?;
        Ok(state)
    }

    /// Rebuilds a state from a checkpoint record.
    ///
    /// The archive is re-bounded if the configured size differs from the
    /// checkpointed one.
    pub fn restore(&self, record: CheckpointRecord<G>) -> Result<SearchState<G>, EaError> {
        self.config.validate()?;

        let mut archive = record.archive;
        if archive.capacity() != self.config.archive_size {
            let mut rebounded = Archive::new(self.config.archive_size);
            rebounded.update(archive.members(), self.comparator.as_ref());
            archive = rebounded;
        }

        log::info!(
            "resuming from generation {} ({} parents, {} recorded individuals)",
            record.generation,
            record.parents.len(),
            record.history.len()
        );

        Ok(SearchState {
            generation: record.generation,
            population: record.population,
            parents: record.parents,
            lineage: LineageTracker::from_parts(record.history, archive),
            logbook: record.logbook,
            rng: record.rng,
            timeouts: TimeoutEstimator::with_window(self.config.timeout.clone(), record.durations),
            phase: Phase::Resumed(record.generation),
        })
    }

    /// Advances `state` by one generation.
    ///
    /// # Errors
    ///
    /// Evaluation failures abort the step and leave `state` untouched, so the
    /// step can be retried. Checkpoint write failures are logged and do not
    /// abort.
    pub fn step(&self, state: &mut SearchState<G>) -> Result<(), EaError> {
        let generation = state.generation + 1;
        let mut rng = state.rng.clone();

        let offspring = self
            .variation
            .vary(&state.parents, self.config.cxpb, self.config.mutpb, &mut rng);
        let n_parents = state.parents.len();
        let mut population = state.parents.clone();
        population.extend(offspring);

        let timeout = state.timeouts.estimate();
        log::debug!("generation {generation}: timeout hint {timeout}s");
        let report = evaluate_invalid(
            self.evaluator.as_ref(),
            &mut population[n_parents..],
            timeout,
            self.config.parallel,
        )?;

        state
            .lineage
            .update(&mut population, generation, self.comparator.as_ref());

        let record = state
            .logbook
            .record(generation, report.evaluated, self.summarize(&population));
        log::info!("{}", record.line());

        state.parents = self.selection.select(
            &population,
            self.config.mu,
            self.comparator.as_ref(),
            &mut rng,
        );
        state.timeouts.observe(&report.durations, population.len());

        state.rng = rng;
        state.population = population;
        state.generation = generation;
        state.phase = Phase::Running(generation);

        self.persist(state)
    }

    /// Steps `state` until the last configured generation, then marks it
    /// completed.
    pub fn run_state(&self, state: &mut SearchState<G>) -> Result<(), EaError> {
        while state.generation < self.config.ngen {
            self.step(state)?;
        }
        state.phase = Phase::Completed;
        Ok(())
    }

    fn summarize(&self, population: &[Individual<G>]) -> Summary {
        self.stats
            .as_ref()
            .map(|stats| stats.compile(population))
            .unwrap_or_default()
    }

    fn persist(&self, state: &SearchState<G>) -> Result<(), EaError> {
        let primary = self.store.primary_due(state.generation);
        let backup = self.store.backup_due(state.generation);
        if !primary && !backup {
            return Ok(());
        }

        let record = state.to_record();
        if primary {
            tolerate_write_failure(self.store.save(&record))?;
        }
        if backup {
            tolerate_write_failure(self.store.save_backup(&record))?;
        }
        Ok(())
    }
}

/// Write failures are logged; anything else is surfaced.
fn tolerate_write_failure<T>(result: Result<T, CheckpointError>) -> Result<(), EaError> {
    match result {
        Ok(_) => Ok(()),
        Err(err @ CheckpointError::Write { .. }) => {
            log::warn!("{err}; continuing without this checkpoint");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

// ============================================================================
// Tests
// ============================================================================
