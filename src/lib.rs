//! laser-kinematics - pose-tracking kinematics around laser stimulation.
//!
//! This library takes DeepLabCut coordinates for three tracked body points
//! (nose, body center, tail base) and laser on/off times, and reports how
//! locomotion speed and body-bend angle change around each laser edge.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         laser-kinematics                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌────────────┐   │
//! │  │  Loader  │──▶│ Outlier  │──▶│ Kinematics │──▶│  Aligner   │   │
//! │  │ (DLC CSV)│   │  Filter  │   │ (vel, ang) │   │ (on / off) │   │
//! │  └──────────┘   └──────────┘   └────────────┘   └────────────┘   │
//! │        ▲                                               │         │
//! │   event file                                           ▼         │
//! │                                               ┌────────────────┐ │
//! │                                               │ SubjectSummary │ │
//! │                                               └────────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use laser_kinematics::{analyze_subject, AnalysisConfig, DlcCsvFile, EventFile};
//!
//! let config = AnalysisConfig::default();
//! let coordinates = DlcCsvFile::new("pb16DLC_resnet50.csv");
//! let events = EventFile::new("pb16_bilateral_LaserTimes.json");
//!
//! let summary = analyze_subject("pb16", &coordinates, &events, &config)
//!     .expect("analysis failed");
//! println!("velocity at laser on: {:?}", summary.velocity_on);
//! ```

pub mod audit;
pub mod batch;
pub mod config;
pub mod core;
pub mod loader;

// Re-export key types at crate root for convenience
pub use audit::{RunLog, SharedRunLog};
pub use batch::{run_batch, Manifest, ManifestEntry};
pub use config::{AnalysisConfig, Config, ConfigError};
pub use core::{
    analyze_subject, run_subject, subject_id_from_path, AlignedWindow, ExportBuilder, ExportTable,
    FirstFramePolicy, GroupSummary, PipelineError, SubjectReport, SubjectSummary,
};
pub use loader::{
    BodyPart, CoordinateSource, DlcCsvFile, Event, EventFile, EventSource, LoadError, Point,
    TrackSet,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
