//! Cumulative analysis ledger.
//!
//! Counters are atomic so batch workers can record into one shared ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::pipeline::SubjectReport;

/// Counts of analyzed subjects, frames and corrections.
#[derive(Debug)]
pub struct RunLog {
    /// Subjects that produced a summary
    subjects_analyzed: AtomicU64,
    /// Subjects whose run failed
    subjects_failed: AtomicU64,
    /// Frames across all analyzed recordings
    frames_processed: AtomicU64,
    /// Positions replaced by the outlier filter
    outliers_corrected: AtomicU64,
    /// Frames with an undefined body angle
    degenerate_frames: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl RunLog {
    /// Create a new, empty ledger.
    pub fn new() -> Self {
        Self {
            subjects_analyzed: AtomicU64::new(0),
            subjects_failed: AtomicU64::new(0),
            frames_processed: AtomicU64::new(0),
            outliers_corrected: AtomicU64::new(0),
            degenerate_frames: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a ledger backed by a JSON file, resuming its counts.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("could not load previous run ledger: {e}");
        }

        log
    }

    /// Record a successful subject.
    pub fn record_subject(&self, report: &SubjectReport) {
        self.subjects_analyzed.fetch_add(1, Ordering::Relaxed);
        self.frames_processed
            .fetch_add(report.frames as u64, Ordering::Relaxed);
        self.outliers_corrected
            .fetch_add(report.corrected_frames() as u64, Ordering::Relaxed);
        self.degenerate_frames
            .fetch_add(report.degenerate_angle_frames.len() as u64, Ordering::Relaxed);
    }

    /// Record a failed subject.
    pub fn record_failure(&self) {
        self.subjects_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> RunStats {
        RunStats {
            subjects_analyzed: self.subjects_analyzed.load(Ordering::Relaxed),
            subjects_failed: self.subjects_failed.load(Ordering::Relaxed),
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            outliers_corrected: self.outliers_corrected.load(Ordering::Relaxed),
            degenerate_frames: self.degenerate_frames.load(Ordering::Relaxed),
            session_start: self.session_start,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Run Statistics:\n\
             - Subjects analyzed: {}\n\
             - Subjects failed: {}\n\
             - Frames processed: {}\n\
             - Outlier positions corrected: {}\n\
             - Degenerate angle frames: {}",
            stats.subjects_analyzed,
            stats.subjects_failed,
            stats.frames_processed,
            stats.outliers_corrected,
            stats.degenerate_frames,
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                subjects_analyzed: stats.subjects_analyzed,
                subjects_failed: stats.subjects_failed,
                frames_processed: stats.frames_processed,
                outliers_corrected: stats.outliers_corrected,
                degenerate_frames: stats.degenerate_frames,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.subjects_analyzed
                    .store(persisted.subjects_analyzed, Ordering::Relaxed);
                self.subjects_failed
                    .store(persisted.subjects_failed, Ordering::Relaxed);
                self.frames_processed
                    .store(persisted.frames_processed, Ordering::Relaxed);
                self.outliers_corrected
                    .store(persisted.outliers_corrected, Ordering::Relaxed);
                self.degenerate_frames
                    .store(persisted.degenerate_frames, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of ledger statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub subjects_analyzed: u64,
    pub subjects_failed: u64,
    pub frames_processed: u64,
    pub outliers_corrected: u64,
    pub degenerate_frames: u64,
    pub session_start: DateTime<Utc>,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    subjects_analyzed: u64,
    subjects_failed: u64,
    frames_processed: u64,
    outliers_corrected: u64,
    degenerate_frames: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared ledger.
pub type SharedRunLog = Arc<RunLog>;

/// Create a new shared ledger.
pub fn create_shared_log() -> SharedRunLog {
    Arc::new(RunLog::new())
}

/// Create a new shared ledger with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedRunLog {
    Arc::new(RunLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::AlignedWindow;
    use crate::core::pipeline::PartOutliers;
    use crate::core::summary::SubjectSummary;
    use crate::loader::types::BodyPart;

    fn report(frames: usize, corrected: usize, degenerate: usize) -> SubjectReport {
        let window = AlignedWindow::new(0.0, 0.0);
        SubjectReport {
            summary: SubjectSummary {
                subject: "m1".to_string(),
                velocity_on: window,
                velocity_off: window,
                angle_on: window,
                angle_off: window,
            },
            frames,
            events: 1,
            total_displacement: 0.0,
            outliers: vec![PartOutliers {
                part: BodyPart::Nose,
                threshold: 1.0,
                corrected,
            }],
            degenerate_angle_frames: (0..degenerate).collect(),
        }
    }

    #[test]
    fn test_run_log_counting() {
        let log = RunLog::new();

        log.record_subject(&report(100, 3, 1));
        log.record_subject(&report(50, 2, 0));
        log.record_failure();

        let stats = log.stats();
        assert_eq!(stats.subjects_analyzed, 2);
        assert_eq!(stats.subjects_failed, 1);
        assert_eq!(stats.frames_processed, 150);
        assert_eq!(stats.outliers_corrected, 5);
        assert_eq!(stats.degenerate_frames, 1);
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("laser-kinematics-ledger-{}", uuid::Uuid::new_v4()))
            .join("ledger.json");

        let log = RunLog::with_persistence(path.clone());
        log.record_subject(&report(10, 1, 0));
        log.save().unwrap();

        let resumed = RunLog::with_persistence(path.clone());
        assert_eq!(resumed.stats().subjects_analyzed, 1);
        assert_eq!(resumed.stats().frames_processed, 10);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_summary_format() {
        let log = create_shared_log();
        let summary = log.summary();

        assert!(summary.contains("Subjects analyzed"));
        assert!(summary.contains("Outlier positions corrected"));
    }
}
