//! Loop configuration.
//!
//! [`EaConfig`] holds every parameter that controls the generational loop,
//! the adaptive timeout heuristic and checkpointing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Configuration for the (mu + lambda) loop.
///
/// # Defaults
///
/// ```
/// use u_evoloop::ea::EaConfig;
///
/// let config = EaConfig::default();
/// assert_eq!(config.mu, 100);
/// assert_eq!(config.ngen, 100);
/// assert_eq!(config.timeout.percentile, 80.0);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_evoloop::ea::EaConfig;
///
/// let config = EaConfig::default()
///     .with_mu(20)
///     .with_ngen(50)
///     .with_seed(7)
///     .with_checkpoint_path("run.ckpt.json")
///     .with_checkpoint_cadence(5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EaConfig {
    /// Number of parents kept after each selection.
    pub mu: usize,

    /// Probability of mating each consecutive pair of offspring (0.0–1.0).
    pub cxpb: f64,

    /// Probability of mutating each offspring (0.0–1.0).
    pub mutpb: f64,

    /// Last generation to run. Generation 1 is the initial evaluation.
    pub ngen: usize,

    /// Maximum hall-of-fame size.
    pub archive_size: usize,

    /// Whether to evaluate offspring in parallel using rayon.
    pub parallel: bool,

    /// Random seed for reproducibility.
    ///
    /// `None` draws a random seed. Ignored on resume, where the checkpointed
    /// generator state takes over.
    pub seed: Option<u64>,

    /// Adaptive evaluation timeout.
    pub timeout: TimeoutConfig,

    /// Checkpoint targets and cadences.
    pub checkpoint: CheckpointConfig,
}

impl Default for EaConfig {
    fn default() -> Self {
        Self {
            mu: 100,
            cxpb: 0.7,
            mutpb: 0.2,
            ngen: 100,
            archive_size: 10,
            parallel: true,
            seed: None,
            timeout: TimeoutConfig::default(),
            checkpoint: CheckpointConfig::default(),
        }
    }
}

/// Parameters of the percentile-based timeout heuristic. All values are in
/// whole seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout hint used before any duration has been observed.
    pub initial_timeout_secs: u64,

    /// Substituted for evaluations that did not report a duration.
    pub default_duration_secs: u64,

    /// Percentile of the duration window used as the next hint.
    pub percentile: f64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            initial_timeout_secs: 600,
            default_duration_secs: 600,
            percentile: 80.0,
        }
    }
}

/// Checkpoint persistence settings.
///
/// A cadence of 0, or an unset path, disables the corresponding target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Primary checkpoint file. Also the source for resumption.
    pub path: Option<PathBuf>,

    /// Write the primary checkpoint every `cadence` generations.
    pub cadence: usize,

    /// Secondary backup file.
    pub backup_path: Option<PathBuf>,

    /// Write the backup every `backup_cadence` generations.
    pub backup_cadence: usize,

    /// Append-only log receiving one line per primary checkpoint.
    pub progress_log: Option<PathBuf>,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: None,
            cadence: 1,
            backup_path: None,
            backup_cadence: 5,
            progress_log: None,
        }
    }
}

impl EaConfig {
    /// Sets the number of parents.
    pub fn with_mu(mut self, mu: usize) -> Self {
        self.mu = mu;
        self
    }

    /// Sets the crossover probability.
    pub fn with_cxpb(mut self, p: f64) -> Self {
        self.cxpb = p.clamp(0.0, 1.0);
        self
    }

    /// Sets the mutation probability.
    pub fn with_mutpb(mut self, p: f64) -> Self {
        self.mutpb = p.clamp(0.0, 1.0);
        self
    }

    /// Sets the last generation to run.
    pub fn with_ngen(mut self, ngen: usize) -> Self {
        self.ngen = ngen;
        self
    }

    /// Sets the hall-of-fame size.
    pub fn with_archive_size(mut self, size: usize) -> Self {
        self.archive_size = size;
        self
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replaces the timeout settings.
    pub fn with_timeout(mut self, timeout: TimeoutConfig) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the primary checkpoint file.
    pub fn with_checkpoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint.path = Some(path.into());
        self
    }

    /// Sets the primary checkpoint cadence (0 disables checkpointing).
    pub fn with_checkpoint_cadence(mut self, cadence: usize) -> Self {
        self.checkpoint.cadence = cadence;
        self
    }

    /// Sets the backup file and its cadence.
    pub fn with_backup(mut self, path: impl Into<PathBuf>, cadence: usize) -> Self {
        self.checkpoint.backup_path = Some(path.into());
        self.checkpoint.backup_cadence = cadence;
        self
    }

    /// Sets the progress side-channel log.
    pub fn with_progress_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint.progress_log = Some(path.into());
        self
    }

    /// Preset for quick, cheap runs.
    ///
    /// - mu: 20, ngen: 20, sequential evaluation, 60 s timeouts
    pub fn fast() -> Self {
        Self {
            mu: 20,
            ngen: 20,
            parallel: false,
            timeout: TimeoutConfig {
                initial_timeout_secs: 60,
                default_duration_secs: 60,
                ..TimeoutConfig::default()
            },
            ..Self::default()
        }
    }

    /// Preset for long, expensive runs that must survive interruption.
    ///
    /// - mu: 128, ngen: 500, checkpoint every 5 generations, backup every 25
    pub fn thorough(checkpoint_path: impl Into<PathBuf>) -> Self {
        let path = checkpoint_path.into();
        let backup = path.with_extension("bak");
        Self {
            mu: 128,
            ngen: 500,
            archive_size: 50,
            checkpoint: CheckpointConfig {
                path: Some(path),
                cadence: 5,
                backup_path: Some(backup),
                backup_cadence: 25,
                progress_log: None,
            },
            ..Self::default()
        }
    }

    /// Parses a JSON configuration document; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mu == 0 {
            return Err(ConfigError::MuTooSmall);
        }
        if self.ngen == 0 {
            return Err(ConfigError::NoGenerations);
        }
        for (name, value) in [("crossover", self.cxpb), ("mutation", self.mutpb)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        if !(0.0..=100.0).contains(&self.timeout.percentile) {
            return Err(ConfigError::InvalidPercentile(self.timeout.percentile));
        }
        if self.archive_size == 0 {
            return Err(ConfigError::ArchiveTooSmall);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EaConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder_clamps_probabilities() {
        let config = EaConfig::default().with_cxpb(1.5).with_mutpb(-0.2);
        assert_eq!(config.cxpb, 1.0);
        assert_eq!(config.mutpb, 0.0);
    }

    #[test]
    fn test_validate_rejects_zero_mu() {
        let config = EaConfig::default().with_mu(0);
        assert_eq!(config.validate(), Err(ConfigError::MuTooSmall));
    }

    #[test]
    fn test_validate_rejects_zero_ngen() {
        let config = EaConfig::default().with_ngen(0);
        assert_eq!(config.validate(), Err(ConfigError::NoGenerations));
    }

    #[test]
    fn test_validate_rejects_raw_probability() {
        let config = EaConfig {
            cxpb: 2.0,
            ..EaConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProbability {
                name: "crossover",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_percentile() {
        let config = EaConfig::default().with_timeout(TimeoutConfig {
            percentile: 120.0,
            ..TimeoutConfig::default()
        });
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidPercentile(120.0))
        );
    }

    #[test]
    fn test_thorough_preset() {
        let config = EaConfig::thorough("runs/cell.json");
        assert_eq!(config.checkpoint.cadence, 5);
        assert_eq!(
            config.checkpoint.backup_path,
            Some(PathBuf::from("runs/cell.bak"))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fast_preset() {
        let config = EaConfig::fast().with_seed(3);
        assert_eq!(config.mu, 20);
        assert!(!config.parallel);
        assert_eq!(config.timeout.initial_timeout_secs, 60);
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn test_from_json_partial_document() {
        let config = EaConfig::from_json(r#"{ "mu": 8, "checkpoint": { "cadence": 2 } }"#).unwrap();
        assert_eq!(config.mu, 8);
        assert_eq!(config.checkpoint.cadence, 2);
        assert_eq!(config.checkpoint.backup_cadence, 5);
        assert_eq!(config.timeout, TimeoutConfig::default());
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(matches!(
            EaConfig::from_json(r#"{ "mu": 0 }"#),
            Err(ConfigError::MuTooSmall)
        ));
        assert!(matches!(
            EaConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
