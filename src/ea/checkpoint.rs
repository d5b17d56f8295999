//! Checkpoint persistence.
//!
//! A [`CheckpointRecord`] is a complete snapshot of a run between two
//! generations, stored as one JSON document. Writes replace the target
//! atomically: the record goes to `<name>.tmp`, is synced, then renamed over
//! the target, so a reader never sees a half-written checkpoint.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::config::CheckpointConfig;
use super::error::CheckpointError;
use super::lineage::{Archive, History};
use super::stats::StatisticsLog;
use super::timeout::DurationWindow;
use super::types::{Genome, Individual, SearchRng};

/// Version written into every record.
pub const FORMAT_VERSION: u32 = 1;

/// Keys a checkpoint cannot be resumed without.
const REQUIRED_KEYS: [&str; 3] = ["population", "generation", "rng"];

/// Everything needed to continue a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "G: Genome")]
pub struct CheckpointRecord<G> {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// Last completed generation.
    pub generation: usize,
    /// Merged population of that generation.
    pub population: Vec<Individual<G>>,
    /// Parents selected for the next generation.
    #[serde(default)]
    pub parents: Vec<Individual<G>>,
    #[serde(default)]
    pub archive: Archive<G>,
    #[serde(default)]
    pub history: History<G>,
    #[serde(default)]
    pub logbook: StatisticsLog,
    /// Generator state after the generation completed.
    pub rng: SearchRng,
    /// Timeout window after the generation's durations were observed.
    #[serde(default)]
    pub durations: DurationWindow,
}

fn default_format_version() -> u32 {
    FORMAT_VERSION
}

/// Writes checkpoints at their configured cadences.
#[derive(Debug, Clone, Default)]
pub struct CheckpointStore {
    config: CheckpointConfig,
}

impl CheckpointStore {
    pub fn new(config: CheckpointConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CheckpointConfig {
        &self.config
    }

    /// Whether the primary checkpoint is written after `generation`.
    pub fn primary_due(&self, generation: usize) -> bool {
        due(self.config.path.as_deref(), self.config.cadence, generation)
    }

    /// Whether the backup is written after `generation`.
    pub fn backup_due(&self, generation: usize) -> bool {
        due(
            self.config.backup_path.as_deref(),
            self.config.backup_cadence,
            generation,
        )
    }

    /// Writes the primary checkpoint if it is due.
    ///
    /// After a successful write, appends `<summary line> <checkpoint stem>`
    /// to the progress log when one is configured. Returns the path written,
    /// or `None` if nothing was due.
    pub fn save<G: Genome>(
        &self,
        record: &CheckpointRecord<G>,
    ) -> Result<Option<PathBuf>, CheckpointError> {
        let Some(path) = self.config.path.as_deref() else {
            return Ok(None);
        };
        if !self.primary_due(record.generation) {
            return Ok(None);
        }

        write_atomic(path, &serde_json::to_vec(record)?)?;
        log::debug!(
            "generation {}: checkpoint written to {}",
            record.generation,
            path.display()
        );

        if let Some(log_path) = self.config.progress_log.as_deref() {
            let summary = record
                .logbook
                .last()
                .map(|r| r.line())
                .unwrap_or_else(|| format!("gen={}", record.generation));
            append_line(log_path, &format!("{summary} {}", checkpoint_id(path)))?;
        }
        Ok(Some(path.to_path_buf()))
    }

    /// Writes the backup checkpoint if it is due.
    pub fn save_backup<G: Genome>(
        &self,
        record: &CheckpointRecord<G>,
    ) -> Result<Option<PathBuf>, CheckpointError> {
        let Some(path) = self.config.backup_path.as_deref() else {
            return Ok(None);
        };
        if !self.backup_due(record.generation) {
            return Ok(None);
        }

        write_atomic(path, &serde_json::to_vec(record)?)?;
        log::debug!(
            "generation {}: backup written to {}",
            record.generation,
            path.display()
        );
        Ok(Some(path.to_path_buf()))
    }
}

fn due(path: Option<&Path>, cadence: usize, generation: usize) -> bool {
    path.is_some() && cadence > 0 && generation % cadence == 0
}

/// Identifier of a checkpoint in the progress log: the file stem.
fn checkpoint_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Replaces `path` with `bytes` through a synced temporary sibling.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CheckpointError> {
    let wrap = |source| CheckpointError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file_name = path.file_name().ok_or_else(|| {
        wrap(io::Error::new(
            io::ErrorKind::InvalidInput,
            "checkpoint path has no file name",
        ))
    })?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(wrap)?;
    }

    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)
        .map_err(wrap)?;
    f.write_all(bytes).map_err(wrap)?;
    f.sync_all().map_err(wrap)?;
    fs::rename(&tmp_path, path).map_err(wrap)
}

fn append_line(path: &Path, line: &str) -> Result<(), CheckpointError> {
    let wrap = |source| CheckpointError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(wrap)?;
    writeln!(f, "{line}").map_err(wrap)
}

/// Loads and validates a checkpoint.
///
/// A record without `parents` resumes with its population as parents.
///
/// # Errors
///
/// - [`CheckpointError::Read`] if the file cannot be read
/// - [`CheckpointError::Corrupt`] if the document is not valid JSON, lacks
///   `population`, `generation` or `rng`, or fails validation (generation
///   below 1, empty population, unscored individuals)
pub fn load<G: Genome>(path: &Path) -> Result<CheckpointRecord<G>, CheckpointError> {
    let corrupt = |reason: String| CheckpointError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let text = fs::read_to_string(path).map_err(|source| CheckpointError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let document: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| corrupt(e.to_string()))?;
    let Some(fields) = document.as_object() else {
        return Err(corrupt("not a JSON object".into()));
    };
    if let Some(missing) = REQUIRED_KEYS.iter().find(|k| !fields.contains_key(**k)) {
        return Err(corrupt(format!("missing field `{missing}`")));
    }
    let has_parents = fields.contains_key("parents");

    let mut record: CheckpointRecord<G> =
        serde_json::from_str(&text).map_err(|e| corrupt(e.to_string()))?;

    if !has_parents {
        log::warn!(
            "{}: checkpoint has no parents, resuming from its population",
            path.display()
        );
        record.parents = record.population.clone();
    }

    validate(&record).map_err(corrupt)?;
    Ok(record)
}

fn validate<G>(record: &CheckpointRecord<G>) -> Result<(), String> {
    if record.generation < 1 {
        return Err(format!("generation {} is below 1", record.generation));
    }
    if record.population.is_empty() {
        return Err("population is empty".into());
    }
    if record.parents.is_empty() {
        return Err("parents are empty".into());
    }
    if let Some(i) = record.population.iter().position(|ind| !ind.fitness.is_valid()) {
        return Err(format!("population[{i}] has no valid fitness"));
    }
    if let Some(i) = record.parents.iter().position(|ind| !ind.fitness.is_valid()) {
        return Err(format!("parents[{i}] has no valid fitness"));
    }
    Ok(())
}
