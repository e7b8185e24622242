//! Input loading for a single recording.
//!
//! This module reads tracked coordinates and laser event times. Both inputs
//! sit behind small traits so the pipeline can be fed from files or from
//! memory.

pub mod coordinates;
pub mod events;
pub mod types;

use std::path::PathBuf;

// Re-export commonly used types
pub use coordinates::{ColumnLayout, DlcCsvFile};
pub use events::EventFile;
pub use types::{BodyPart, Event, Point, Track, TrackSet};

/// Anything that can produce the three tracks of a recording.
pub trait CoordinateSource {
    fn load_tracks(&self) -> Result<TrackSet, LoadError>;
}

/// Anything that can produce the laser events of a recording.
pub trait EventSource {
    fn load_events(&self) -> Result<Vec<Event>, LoadError>;
}

impl CoordinateSource for TrackSet {
    fn load_tracks(&self) -> Result<TrackSet, LoadError> {
        Ok(self.clone())
    }
}

impl EventSource for Vec<Event> {
    fn load_events(&self) -> Result<Vec<Event>, LoadError> {
        Ok(self.clone())
    }
}

impl EventSource for [Event] {
    fn load_events(&self) -> Result<Vec<Event>, LoadError> {
        Ok(self.to_vec())
    }
}

/// Errors raised while reading a recording's inputs.
#[derive(Debug)]
pub enum LoadError {
    /// File could not be read
    Io { path: PathBuf, message: String },
    /// A field could not be parsed
    Malformed {
        line: usize,
        column: usize,
        message: String,
    },
    /// A data row has the wrong number of fields
    ColumnMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },
    /// A configured body-part label is absent from the header
    MissingBodyPart(String),
    /// Tracks of one recording differ in length
    TrackLengthMismatch {
        part: BodyPart,
        expected: usize,
        found: usize,
    },
    /// Fewer events available than configured
    TooFewEvents { expected: usize, found: usize },
    /// The source contains no frames
    Empty,
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io { path, message } => write!(f, "cannot read {path:?}: {message}"),
            LoadError::Malformed {
                line,
                column,
                message,
            } => write!(f, "malformed value at line {line}, column {column}: {message}"),
            LoadError::ColumnMismatch {
                line,
                expected,
                found,
            } => write!(
                f,
                "line {line} has {found} fields, expected {expected}"
            ),
            LoadError::MissingBodyPart(label) => {
                write!(f, "body part {label:?} not found in header")
            }
            LoadError::TrackLengthMismatch {
                part,
                expected,
                found,
            } => write!(f, "{part} track has {found} frames, expected {expected}"),
            LoadError::TooFewEvents { expected, found } => {
                write!(f, "expected {expected} events, source has {found}")
            }
            LoadError::Empty => write!(f, "source contains no frames"),
        }
    }
}

impl std::error::Error for LoadError {}
