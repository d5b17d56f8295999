//! Per-generation statistics.
//!
//! A [`StatsCompiler`] summarizes a population; the [`StatisticsLog`] keeps
//! one [`StatsRecord`] per generation.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::types::{Genome, Individual};

/// Named statistics, one value per objective.
pub type Summary = BTreeMap<String, Vec<f64>>;

/// Summarizes a population.
pub trait StatsCompiler<G>: Send + Sync {
    /// Compiles the summary for one generation.
    fn compile(&self, population: &[Individual<G>]) -> Summary;
}

/// Per-objective `avg`, `std`, `min` and `max` over valid individuals.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectiveStats;

impl<G: Genome> StatsCompiler<G> for ObjectiveStats {
    fn compile(&self, population: &[Individual<G>]) -> Summary {
        let scored: Vec<&[f64]> = population.iter().filter_map(|ind| ind.values()).collect();
        let mut summary = Summary::new();
        let Some(m) = scored.iter().map(|v| v.len()).min() else {
            return summary;
        };

        let n = scored.len() as f64;
        let mut avg = vec![0.0; m];
        let mut std = vec![0.0; m];
        let mut min = vec![f64::INFINITY; m];
        let mut max = vec![f64::NEG_INFINITY; m];

        for values in &scored {
            for k in 0..m {
                avg[k] += values[k] / n;
                min[k] = min[k].min(values[k]);
                max[k] = max[k].max(values[k]);
            }
        }
        for values in &scored {
            for k in 0..m {
                std[k] += (values[k] - avg[k]).powi(2) / n;
            }
        }
        std.iter_mut().for_each(|v| *v = v.sqrt());

        summary.insert("avg".into(), avg);
        summary.insert("std".into(), std);
        summary.insert("min".into(), min);
        summary.insert("max".into(), max);
        summary
    }
}

/// One generation's log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    /// Generation index (1 = initial evaluation).
    pub generation: usize,
    /// Number of evaluations performed in this generation.
    pub evaluations: usize,
    /// Compiled statistics; empty when no compiler is configured.
    #[serde(with = "super::types::float_codec::map")]
    pub summary: Summary,
}

impl StatsRecord {
    /// Single-line rendering used for logging and the progress side-channel.
    ///
    /// ```
    /// use u_evoloop::ea::StatsRecord;
    ///
    /// let record = StatsRecord {
    ///     generation: 3,
    ///     evaluations: 10,
    ///     summary: [("max".to_string(), vec![4.5])].into_iter().collect(),
    /// };
    /// assert_eq!(record.line(), "gen=3 nevals=10 max=[4.5]");
    /// ```
    pub fn line(&self) -> String {
        let mut line = format!("gen={} nevals={}", self.generation, self.evaluations);
        for (name, values) in &self.summary {
            let rendered: Vec<String> = values.iter().map(|v| format!("{v}")).collect();
            let _ = write!(line, " {name}=[{}]", rendered.join(", "));
        }
        line
    }
}

/// Append-only per-generation log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsLog {
    records: Vec<StatsRecord>,
}

impl StatisticsLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and returns it.
    pub fn record(&mut self, generation: usize, evaluations: usize, summary: Summary) -> &StatsRecord {
        self.records.push(StatsRecord {
            generation,
            evaluations,
            summary,
        });
        &self.records[self.records.len() - 1]
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[StatsRecord] {
        &self.records
    }

    /// Most recent record.
    pub fn last(&self) -> Option<&StatsRecord> {
        self.records.last()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total evaluations across all records.
    pub fn total_evaluations(&self) -> usize {
        self.records.iter().map(|r| r.evaluations).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ea::types::Fitness;

    fn scored(values: &[f64]) -> Individual<u8> {
        let mut ind = Individual::new(0u8);
        ind.fitness = Fitness::Valid(values.to_vec());
        ind
    }

    #[test]
    fn test_objective_stats() {
        let pop = vec![scored(&[1.0, 10.0]), scored(&[3.0, 30.0]), Individual::new(0u8)];
        let summary = ObjectiveStats.compile(&pop);

        assert_eq!(summary["avg"], vec![2.0, 20.0]);
        assert_eq!(summary["min"], vec![1.0, 10.0]);
        assert_eq!(summary["max"], vec![3.0, 30.0]);
        assert_eq!(summary["std"], vec![1.0, 10.0]);
    }

    #[test]
    fn test_objective_stats_empty() {
        let pop: Vec<Individual<u8>> = vec![Individual::new(0)];
        assert!(ObjectiveStats.compile(&pop).is_empty());
    }

    #[test]
    fn test_log_records_in_order() {
        let mut log = StatisticsLog::new();
        log.record(1, 10, Summary::new());
        log.record(2, 7, Summary::new());

        assert_eq!(log.len(), 2);
        assert_eq!(log.total_evaluations(), 17);
        assert_eq!(log.last().map(|r| r.generation), Some(2));
        assert_eq!(log.records()[0].line(), "gen=1 nevals=10");
    }
}
