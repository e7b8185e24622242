//! Multi-subject batch runs.
//!
//! A manifest lists one coordinate file and one event file per subject.
//! Subjects share nothing, so they are handed to a small pool of worker
//! threads over a channel; results come back in manifest order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audit::RunLog;
use crate::config::AnalysisConfig;
use crate::core::pipeline::{run_subject, subject_id_from_path, PipelineError, SubjectReport};
use crate::loader::{DlcCsvFile, EventFile, LoadError};

/// One subject in a batch manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// DLC coordinate CSV
    pub coordinates: PathBuf,
    /// Laser event file
    pub events: PathBuf,
    /// Subject identifier; derived from the event file name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl ManifestEntry {
    pub fn subject_id(&self) -> String {
        self.subject
            .clone()
            .unwrap_or_else(|| subject_id_from_path(&self.events))
    }

    /// Run the pipeline for this entry.
    pub fn analyze(&self, config: &AnalysisConfig) -> Result<SubjectReport, PipelineError> {
        let coordinates = DlcCsvFile::new(&self.coordinates)
            .with_layout(config.columns.clone())
            .with_max_frames(config.max_frames);
        let events = EventFile::new(&self.events);
        run_subject(&self.subject_id(), &coordinates, &events, config)
    }
}

/// A list of subjects to analyze together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub subjects: Vec<ManifestEntry>,
}

impl Manifest {
    /// Load a JSON manifest. Relative paths are resolved against the
    /// manifest's own directory.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut manifest: Manifest =
            serde_json::from_str(&content).map_err(|e| LoadError::Malformed {
                line: e.line(),
                column: e.column(),
                message: e.to_string(),
            })?;

        if let Some(base) = path.parent() {
            for entry in &mut manifest.subjects {
                entry.coordinates = base.join(&entry.coordinates);
                entry.events = base.join(&entry.events);
            }
        }
        Ok(manifest)
    }
}

/// Analyze every entry on up to `jobs` threads. The output has one result
/// per entry, in input order.
pub fn run_batch(
    entries: &[ManifestEntry],
    config: &AnalysisConfig,
    jobs: usize,
    log: &RunLog,
) -> Vec<Result<SubjectReport, PipelineError>> {
    let jobs = jobs.clamp(1, entries.len().max(1));
    let (task_tx, task_rx) = crossbeam_channel::unbounded::<(usize, &ManifestEntry)>();
    let (result_tx, result_rx) = crossbeam_channel::unbounded();

    for task in entries.iter().enumerate() {
        if task_tx.send(task).is_err() {
            break;
        }
    }
    drop(task_tx);

    tracing::info!(subjects = entries.len(), jobs, "starting batch");

    std::thread::scope(|scope| {
        for _ in 0..jobs {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for (index, entry) in task_rx.iter() {
                    let result = entry.analyze(config);
                    match &result {
                        Ok(report) => log.record_subject(report),
                        Err(e) => {
                            tracing::warn!("{e}");
                            log.record_failure();
                        }
                    }
                    if result_tx.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut results: Vec<(usize, Result<SubjectReport, PipelineError>)> =
        result_rx.iter().collect();
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}
