//! The per-subject analysis pipeline.
//!
//! One call runs every stage for one recording:
//!
//! ```text
//! coordinates ──▶ outlier filter ──▶ kinematics ──┐
//!                                                 ├──▶ alignment ──▶ SubjectSummary
//! events ─────────────────────────────────────────┘
//! ```
//!
//! Inputs are injected through [`CoordinateSource`] and [`EventSource`]; the
//! pipeline itself has no side effects besides logging.

use std::path::Path;

use serde::Serialize;

use crate::config::{AnalysisConfig, ConfigError};
use crate::core::alignment::{AlignmentError, EventAligner};
use crate::core::kinematics::compute_kinematics;
use crate::core::outliers::{FilteredTrack, OutlierFilter};
use crate::core::summary::SubjectSummary;
use crate::loader::types::BodyPart;
use crate::loader::{CoordinateSource, EventSource, LoadError};

/// Outlier statistics for one body part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartOutliers {
    pub part: BodyPart,
    pub threshold: f64,
    pub corrected: usize,
}

impl PartOutliers {
    fn from_filtered(filtered: &FilteredTrack) -> Self {
        Self {
            part: filtered.track.part(),
            threshold: filtered.threshold,
            corrected: filtered.corrected(),
        }
    }
}

/// A subject summary together with run diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectReport {
    pub summary: SubjectSummary,
    /// Frames in the recording
    pub frames: usize,
    /// Events aligned
    pub events: usize,
    /// Summed displacement of the filtered tail base
    pub total_displacement: f64,
    pub outliers: Vec<PartOutliers>,
    /// Frames whose body angle is undefined
    pub degenerate_angle_frames: Vec<usize>,
}

impl SubjectReport {
    pub fn corrected_frames(&self) -> usize {
        self.outliers.iter().map(|o| o.corrected).sum()
    }
}

/// Why a subject's run failed.
#[derive(Debug)]
pub enum PipelineErrorKind {
    Config(ConfigError),
    Load(LoadError),
    Alignment(AlignmentError),
}

/// A fatal error for one subject. No partial summary is produced.
#[derive(Debug)]
pub struct PipelineError {
    pub subject: String,
    pub kind: PipelineErrorKind,
}

impl PipelineError {
    fn new(subject: &str, kind: PipelineErrorKind) -> Self {
        Self {
            subject: subject.to_string(),
            kind,
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            PipelineErrorKind::Config(e) => write!(f, "subject {}: config error: {e}", self.subject),
            PipelineErrorKind::Load(e) => write!(f, "subject {}: load error: {e}", self.subject),
            PipelineErrorKind::Alignment(e) => {
                write!(f, "subject {}: alignment error: {e}", self.subject)
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            PipelineErrorKind::Config(e) => Some(e),
            PipelineErrorKind::Load(e) => Some(e),
            PipelineErrorKind::Alignment(e) => Some(e),
        }
    }
}

/// Run the full pipeline and return only the summary.
pub fn analyze_subject<C, E>(
    subject: &str,
    coordinates: &C,
    events: &E,
    config: &AnalysisConfig,
) -> Result<SubjectSummary, PipelineError>
where
    C: CoordinateSource + ?Sized,
    E: EventSource + ?Sized,
{
    run_subject(subject, coordinates, events, config).map(|report| report.summary)
}

/// Run the full pipeline for one subject.
pub fn run_subject<C, E>(
    subject: &str,
    coordinates: &C,
    events: &E,
    config: &AnalysisConfig,
) -> Result<SubjectReport, PipelineError>
where
    C: CoordinateSource + ?Sized,
    E: EventSource + ?Sized,
{
    let config_err = |e| PipelineError::new(subject, PipelineErrorKind::Config(e));
    let load_err = |e| PipelineError::new(subject, PipelineErrorKind::Load(e));

    config.validate().map_err(config_err)?;
    let window = config.velocity_window_frames().map_err(config_err)?;
    let offset = config.align_offset_frames().map_err(config_err)?;

    let tracks = coordinates.load_tracks().map_err(load_err)?;
    let mut events = events.load_events().map_err(load_err)?;
    if events.len() < config.event_count {
        return Err(load_err(LoadError::TooFewEvents {
            expected: config.event_count,
            found: events.len(),
        }));
    }
    events.truncate(config.event_count);

    let filtered = OutlierFilter::new(config.threshold_multiplier, config.first_frame_policy)
        .apply_all(&tracks);

    let kinematics = compute_kinematics(
        &filtered.nose.track,
        &filtered.body.track,
        &filtered.tail.track,
        window,
    );

    let aligner = EventAligner::new(config.fps, offset);
    let align_err = |e| PipelineError::new(subject, PipelineErrorKind::Alignment(e));
    let (velocity_on, velocity_off) = aligner
        .align(&kinematics.velocity, &events)
        .map_err(align_err)?
        .reduce();
    let (angle_on, angle_off) = aligner
        .align(&kinematics.angle.degrees, &events)
        .map_err(align_err)?
        .reduce();

    let report = SubjectReport {
        summary: SubjectSummary {
            subject: subject.to_string(),
            velocity_on,
            velocity_off,
            angle_on,
            angle_off,
        },
        frames: tracks.frame_count(),
        events: events.len(),
        total_displacement: kinematics.total_displacement,
        outliers: filtered.iter().map(PartOutliers::from_filtered).collect(),
        degenerate_angle_frames: kinematics.angle.degenerate_frames,
    };

    tracing::info!(
        subject,
        frames = report.frames,
        events = report.events,
        corrected = filtered.total_corrected(),
        total_displacement = report.total_displacement,
        "subject analyzed"
    );
    Ok(report)
}

/// Subject identifier from a file name: the stem up to the first `_`.
///
/// `recordings/pb16_bilateral_LaserTimes.json` gives `pb16`.
pub fn subject_id_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.split('_').next() {
        Some(prefix) if !prefix.is_empty() => prefix.to_string(),
        _ => stem,
    }
}
