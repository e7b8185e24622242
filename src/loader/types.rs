//! Tracked body-point data for a single recording.
//!
//! A recording is three [`Track`]s of equal length, one per [`BodyPart`],
//! plus a list of laser [`Event`]s in seconds.

use serde::{Deserialize, Serialize};

use super::LoadError;

/// A 2D position in video pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Squared Euclidean distance, without the rounding of a square root.
    pub fn distance_squared(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

/// The three tracked body locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Nose,
    Body,
    TailBase,
}

impl BodyPart {
    pub const ALL: [BodyPart; 3] = [BodyPart::Nose, BodyPart::Body, BodyPart::TailBase];

    /// Zero-based position of this part's `(x, y, likelihood)` triple in a DLC row.
    pub fn position(self) -> usize {
        match self {
            BodyPart::Nose => 0,
            BodyPart::Body => 1,
            BodyPart::TailBase => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BodyPart::Nose => "nose",
            BodyPart::Body => "body",
            BodyPart::TailBase => "tail_base",
        }
    }
}

impl std::fmt::Display for BodyPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-frame positions of one body part. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    part: BodyPart,
    points: Vec<Point>,
}

impl Track {
    pub fn new(part: BodyPart, points: Vec<Point>) -> Self {
        Self { part, points }
    }

    pub fn part(&self) -> BodyPart {
        self.part
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Frame-to-frame displacement. `deltas[i]` is the distance from frame
    /// `i` to `i + 1`; the last entry is always zero.
    pub fn deltas(&self) -> Vec<f64> {
        let mut deltas = vec![0.0; self.points.len()];
        for (i, pair) in self.points.windows(2).enumerate() {
            deltas[i] = pair[0].distance(&pair[1]);
        }
        deltas
    }

    /// Sum of all consecutive-frame displacements.
    pub fn total_displacement(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].distance(&pair[1]))
            .sum()
    }
}

impl std::ops::Index<usize> for Track {
    type Output = Point;

    fn index(&self, index: usize) -> &Point {
        &self.points[index]
    }
}

/// The three tracks of one recording, guaranteed to share a frame count.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSet {
    nose: Track,
    body: Track,
    tail: Track,
}

impl TrackSet {
    /// Build a track set from per-part point sequences.
    pub fn new(nose: Vec<Point>, body: Vec<Point>, tail: Vec<Point>) -> Result<Self, LoadError> {
        Self::from_tracks(
            Track::new(BodyPart::Nose, nose),
            Track::new(BodyPart::Body, body),
            Track::new(BodyPart::TailBase, tail),
        )
    }

    pub fn from_tracks(nose: Track, body: Track, tail: Track) -> Result<Self, LoadError> {
        let frames = nose.len();
        for track in [&body, &tail] {
            if track.len() != frames {
                return Err(LoadError::TrackLengthMismatch {
                    part: track.part(),
                    expected: frames,
                    found: track.len(),
                });
            }
        }
        if frames == 0 {
            return Err(LoadError::Empty);
        }
        Ok(Self { nose, body, tail })
    }

    pub fn nose(&self) -> &Track {
        &self.nose
    }

    pub fn body(&self) -> &Track {
        &self.body
    }

    pub fn tail(&self) -> &Track {
        &self.tail
    }


    /// Number of frames shared by all three tracks.
    pub fn frame_count(&self) -> usize {
        self.nose.len()
    }
}

/// One laser stimulation bout, in seconds from recording start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub on_secs: f64,
    pub off_secs: f64,
}

impl Event {
    pub const fn new(on_secs: f64, off_secs: f64) -> Self {
        Self { on_secs, off_secs }
    }
}
