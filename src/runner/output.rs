//! Run artifacts on disk.
//!
//! Each run writes into `<output_dir>/<YYYYmmdd_HHMMSS>/`:
//!
//! - `raw_generations.jsonl`: one [`AttemptRecord`] per line
//! - `metrics.json`: the [`RunMetrics`] plus model and timestamp
//! - `transcript.log`: a human-readable account of every task

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::result::AttemptRecord;
use crate::error::OutputError;
use crate::metrics::RunMetrics;

pub const GENERATIONS_FILE: &str = "raw_generations.jsonl";
pub const METRICS_FILE: &str = "metrics.json";
pub const TRANSCRIPT_FILE: &str = "transcript.log";

/// Formats the directory tag for a run started at `at`.
pub fn timestamp_tag(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// `metrics.json` contents.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport<'a> {
    pub model: &'a str,
    pub timestamp: &'a str,
    #[serde(flatten)]
    pub metrics: &'a RunMetrics,
}

/// Appends run artifacts as the run progresses.
pub struct RunWriter {
    run_dir: PathBuf,
    tag: String,
    generations: File,
    transcript: File,
}

impl RunWriter {
    /// Creates `<output_dir>/<tag>/` and opens the streaming artifacts.
    pub fn create(output_dir: &Path, tag: impl Into<String>) -> Result<Self, OutputError> {
        let tag = tag.into();
        let run_dir = output_dir.join(&tag);
        fs::create_dir_all(&run_dir).map_err(|source| OutputError::Write {
            path: run_dir.display().to_string(),
            source,
        })?;

        let generations = open_append(&run_dir.join(GENERATIONS_FILE))?;
        let transcript = open_append(&run_dir.join(TRANSCRIPT_FILE))?;
        debug!("Writing run artifacts to {}", run_dir.display());

        Ok(Self {
            run_dir,
            tag,
            generations,
            transcript,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Appends one attempt to `raw_generations.jsonl`.
    pub fn write_attempt(&mut self, record: &AttemptRecord) -> Result<(), OutputError> {
        let line = serde_json::to_string(record)?;
        let path = self.run_dir.join(GENERATIONS_FILE);
        writeln!(self.generations, "{}", line).map_err(|source| OutputError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// Appends lines to `transcript.log`.
    pub fn write_transcript(&mut self, lines: &[String]) -> Result<(), OutputError> {
        let path = self.run_dir.join(TRANSCRIPT_FILE);
        for line in lines {
            writeln!(self.transcript, "{}", line).map_err(|source| OutputError::Write {
                path: path.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// Writes `metrics.json` and returns its path.
    pub fn write_metrics(&self, model: &str, metrics: &RunMetrics) -> Result<PathBuf, OutputError> {
        let report = MetricsReport {
            model,
            timestamp: &self.tag,
            metrics,
        };
        let path = self.run_dir.join(METRICS_FILE);
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(&path, json).map_err(|source| OutputError::Write {
            path: path.display().to_string(),
            source,
        })?;
        debug!("Saved metrics to {}", path.display());
        Ok(path)
    }
}

fn open_append(path: &Path) -> Result<File, OutputError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| OutputError::Write {
            path: path.display().to_string(),
            source,
        })
}
