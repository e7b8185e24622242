//! Core analysis for laser-kinematics.
//!
//! This module contains:
//! - Outlier rejection for tracked coordinates
//! - Velocity and body-bend angle computation
//! - Alignment of signals to laser events
//! - The per-subject pipeline and its summary output

pub mod alignment;
pub mod kinematics;
pub mod outliers;
pub mod pipeline;
pub mod summary;

// Re-export commonly used types
pub use alignment::{AlignedWindow, AlignmentError, Edge, EventAligner};
pub use kinematics::{bend_angle, compute_kinematics, AngleSignal, Kinematics};
pub use outliers::{
    FilteredTrack, FilteredTrackSet, FirstFramePolicy, OutlierFilter, DEFAULT_THRESHOLD_MULTIPLIER,
};
pub use pipeline::{
    analyze_subject, run_subject, subject_id_from_path, PipelineError, PipelineErrorKind,
    SubjectReport,
};
pub use summary::{ExportBuilder, ExportTable, GroupSummary, SubjectSummary, SummaryExport};
