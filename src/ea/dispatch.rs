//! Evaluation dispatch.
//!
//! Scores every individual whose fitness is invalid, optionally in parallel,
//! and writes the results back in input order.

use std::time::Duration;

use rayon::prelude::*;

use super::error::{EaError, EvaluationFailure};
use super::types::{Evaluation, Evaluator, Fitness, Genome, Individual};

/// Outcome of one dispatch round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// Number of individuals evaluated.
    pub evaluated: usize,
    /// Reported duration per evaluated individual, in evaluation order.
    pub durations: Vec<Option<Duration>>,
}

/// Evaluates the individuals of `population` that lack a valid fitness.
///
/// Individuals with a valid fitness are skipped, so dispatching an
/// unchanged population twice evaluates nothing the second time.
///
/// # Errors
///
/// Returns [`EaError::Evaluation`] for the first failing individual (by
/// position in `population`). In that case no fitness is written at all.
pub fn evaluate_invalid<G, E>(
    evaluator: &E,
    population: &mut [Individual<G>],
    timeout_secs: u64,
    parallel: bool,
) -> Result<DispatchReport, EaError>
where
    G: Genome,
    E: Evaluator<G> + ?Sized,
{
    let invalid: Vec<usize> = population
        .iter()
        .enumerate()
        .filter(|(_, ind)| !ind.fitness.is_valid())
        .map(|(i, _)| i)
        .collect();

    if invalid.is_empty() {
        return Ok(DispatchReport::default());
    }

    let results: Vec<Result<Evaluation, EvaluationFailure>> = if parallel {
        let population = &*population;
        invalid
            .par_iter()
            .map(|&i| evaluate_one(evaluator, &population[i].genome, timeout_secs))
            .collect()
    } else {
        invalid
            .iter()
            .map(|&i| evaluate_one(evaluator, &population[i].genome, timeout_secs))
            .collect()
    };

    let mut evaluations = Vec::with_capacity(results.len());
    for (&index, result) in invalid.iter().zip(results) {
        evaluations.push(result.map_err(|source| EaError::Evaluation { index, source })?);
    }

    let mut durations = Vec::with_capacity(evaluations.len());
    for (&index, evaluation) in invalid.iter().zip(evaluations) {
        population[index].fitness = Fitness::Valid(evaluation.values);
        durations.push(evaluation.elapsed);
    }

    Ok(DispatchReport {
        evaluated: invalid.len(),
        durations,
    })
}

fn evaluate_one<G, E>(
    evaluator: &E,
    genome: &G,
    timeout_secs: u64,
) -> Result<Evaluation, EvaluationFailure>
where
    E: Evaluator<G> + ?Sized,
{
    let evaluation = evaluator.evaluate(genome, timeout_secs)?;
    if evaluation.values.is_empty() {
        return Err(EvaluationFailure::new("evaluator returned no objective values"));
    }
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SumEvaluator {
        calls: AtomicUsize,
    }

    impl Evaluator<Vec<f64>> for SumEvaluator {
        fn evaluate(
            &self,
            genome: &Vec<f64>,
            _timeout_secs: u64,
        ) -> Result<Evaluation, EvaluationFailure> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let sum: f64 = genome.iter().sum();
            Ok(Evaluation::new(vec![sum]).with_elapsed(Duration::from_secs(sum as u64)))
        }
    }

    fn population(sums: &[f64]) -> Vec<Individual<Vec<f64>>> {
        sums.iter().map(|&s| Individual::new(vec![s])).collect()
    }

    #[test]
    fn test_evaluates_only_invalid() {
        let evaluator = SumEvaluator {
            calls: AtomicUsize::new(0),
        };
        let mut pop = population(&[1.0, 2.0, 3.0]);
        pop[1].fitness = Fitness::Valid(vec![99.0]);

        let report = evaluate_invalid(&evaluator, &mut pop, 600, false).unwrap();
        assert_eq!(report.evaluated, 2);
        assert_eq!(
            report.durations,
            vec![Some(Duration::from_secs(1)), Some(Duration::from_secs(3))]
        );
        assert_eq!(pop[1].values(), Some(&[99.0][..]));
        assert_eq!(pop[2].values(), Some(&[3.0][..]));
    }

    #[test]
    fn test_second_dispatch_is_noop() {
        let evaluator = SumEvaluator {
            calls: AtomicUsize::new(0),
        };
        let mut pop = population(&[1.0, 2.0, 3.0, 4.0]);

        let first = evaluate_invalid(&evaluator, &mut pop, 600, true).unwrap();
        let second = evaluate_invalid(&evaluator, &mut pop, 600, true).unwrap();

        assert_eq!(first.evaluated, 4);
        assert_eq!(second, DispatchReport::default());
        assert_eq!(evaluator.calls.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_parallel_preserves_order() {
        let evaluator = SumEvaluator {
            calls: AtomicUsize::new(0),
        };
        let sums: Vec<f64> = (0..64).map(|i| i as f64).collect();
        let mut pop = population(&sums);

        evaluate_invalid(&evaluator, &mut pop, 600, true).unwrap();
        for (ind, &sum) in pop.iter().zip(&sums) {
            assert_eq!(ind.values(), Some(&[sum][..]));
        }
    }

    #[test]
    fn test_timeout_hint_is_forwarded() {
        let seen = AtomicUsize::new(0);
        let evaluator = |_: &Vec<f64>, timeout: u64| {
            seen.store(timeout as usize, Ordering::Relaxed);
            Ok::<_, EvaluationFailure>(Evaluation::new(vec![0.0]))
        };
        let mut pop = population(&[1.0]);
        evaluate_invalid(&evaluator, &mut pop, 37, false).unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 37);
    }

    #[test]
    fn test_failure_aborts_without_writing() {
        let evaluator = |g: &Vec<f64>, _: u64| {
            if g[0] > 1.5 {
                Err(EvaluationFailure::new("simulation diverged"))
            } else {
                Ok(Evaluation::new(vec![g[0]]))
            }
        };
        let mut pop = population(&[1.0, 2.0, 3.0]);

        let err = evaluate_invalid(&evaluator, &mut pop, 600, true).unwrap_err();
        match err {
            EaError::Evaluation { index, source } => {
                assert_eq!(index, 1);
                assert_eq!(source.0, "simulation diverged");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(pop.iter().all(|ind| !ind.fitness.is_valid()));
    }

    #[test]
    fn test_empty_objectives_are_a_failure() {
        let evaluator =
            |_: &Vec<f64>, _: u64| Ok::<_, EvaluationFailure>(Evaluation::new(Vec::new()));
        let mut pop = population(&[1.0]);
        assert!(matches!(
            evaluate_invalid(&evaluator, &mut pop, 600, false),
            Err(EaError::Evaluation { index: 0, .. })
        ));
    }
}
