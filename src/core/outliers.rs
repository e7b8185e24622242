//! Rejection of implausible frame-to-frame tracking jumps.
//!
//! Each track is filtered on its own. The threshold is derived from the
//! track's own raw displacement statistics, then frames are scanned left to
//! right over a working copy. A flagged frame takes the position of the
//! frame before it, so a run of bad frames collapses onto the last good one.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::loader::types::{Point, Track, TrackSet};

/// Default threshold multiplier: 2.58 standard deviations is the two-tailed
/// 99% cutoff of a normal distribution.
pub const DEFAULT_THRESHOLD_MULTIPLIER: f64 = 2.58;

/// Replacement rule for a flagged frame 0, which has no predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstFramePolicy {
    /// Leave frame 0 untouched and unflagged.
    #[default]
    Skip,
    /// Take the position of the last frame.
    Wrap,
}

/// A corrected copy of a track.
#[derive(Debug, Clone)]
pub struct FilteredTrack {
    /// Corrected positions, same length as the input
    pub track: Track,
    /// `true` where a position was replaced
    pub mask: Vec<bool>,
    /// Displacement above which a frame was flagged
    pub threshold: f64,
}

impl FilteredTrack {
    /// Number of replaced frames.
    pub fn corrected(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
}

/// Filtered versions of all three tracks of a recording.
#[derive(Debug, Clone)]
pub struct FilteredTrackSet {
    pub nose: FilteredTrack,
    pub body: FilteredTrack,
    pub tail: FilteredTrack,
}

impl FilteredTrackSet {
    pub fn iter(&self) -> impl Iterator<Item = &FilteredTrack> {
        [&self.nose, &self.body, &self.tail].into_iter()
    }

    pub fn total_corrected(&self) -> usize {
        self.iter().map(FilteredTrack::corrected).sum()
    }
}

/// Outlier filter parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierFilter {
    pub multiplier: f64,
    pub first_frame: FirstFramePolicy,
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self {
            multiplier: DEFAULT_THRESHOLD_MULTIPLIER,
            first_frame: FirstFramePolicy::default(),
        }
    }
}

impl OutlierFilter {
    pub fn new(multiplier: f64, first_frame: FirstFramePolicy) -> Self {
        Self {
            multiplier,
            first_frame,
        }
    }

    /// `mean + multiplier * population_std_dev` over all deltas, the trailing
    /// zero included.
    pub fn threshold(&self, deltas: &[f64]) -> f64 {
        let mean = deltas.mean();
        let std_dev = deltas.population_std_dev();
        mean + self.multiplier * std_dev
    }

    /// Filter one track. The input is never modified.
    pub fn apply(&self, track: &Track) -> FilteredTrack {
        let deltas = track.deltas();
        let threshold = self.threshold(&deltas);
        let frames = track.len();

        let mut work: Vec<Point> = track.points().to_vec();
        let mut mask = vec![false; frames];

        for i in 0..frames.saturating_sub(1) {
            // A NaN delta never exceeds the threshold
            let flagged = deltas[i] > threshold;
            if !flagged {
                continue;
            }
            let previous = match (i, self.first_frame) {
                (0, FirstFramePolicy::Skip) => continue,
                (0, FirstFramePolicy::Wrap) => frames - 1,
                _ => i - 1,
            };
            // Reads come from the working copy, so corrections cascade
            work[i] = work[previous];
            mask[i] = true;
        }

        let filtered = FilteredTrack {
            track: Track::new(track.part(), work),
            mask,
            threshold,
        };
        tracing::debug!(
            part = %track.part(),
            threshold,
            corrected = filtered.corrected(),
            "filtered track"
        );
        filtered
    }

    /// Filter all three tracks of a recording.
    pub fn apply_all(&self, tracks: &TrackSet) -> FilteredTrackSet {
        FilteredTrackSet {
            nose: self.apply(tracks.nose()),
            body: self.apply(tracks.body()),
            tail: self.apply(tracks.tail()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::types::BodyPart;

    fn track(points: &[(f64, f64)]) -> Track {
        Track::new(
            BodyPart::Nose,
            points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        )
    }

    /// 30 stationary frames with a 100-unit spike at `spike`.
    fn spiked(spike: usize) -> Track {
        let mut points = vec![(0.0, 0.0); 30];
        points[spike] = (100.0, 0.0);
        track(&points)
    }

    #[test]
    fn test_threshold_uses_population_std_dev() {
        let filter = OutlierFilter::default();
        // mean 5, population std dev 2
        let deltas = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let threshold = filter.threshold(&deltas);
        assert!((threshold - (5.0 + 2.58 * 2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_spike_is_replaced_by_previous_frame() {
        let input = spiked(15);
        let filtered = OutlierFilter::default().apply(&input);

        assert_eq!(filtered.track.len(), input.len());
        assert!(filtered.mask[15]);
        assert_eq!(filtered.track[15], input[14]);
        // The jump into the spike flags frame 14 as well
        assert!(filtered.mask[14]);
        assert_eq!(filtered.corrected(), 2);
    }

    #[test]
    fn test_input_track_is_not_mutated() {
        let input = spiked(15);
        let before = input.clone();
        let _ = OutlierFilter::default().apply(&input);
        assert_eq!(input, before);
    }

    #[test]
    fn test_corrections_cascade() {
        // Frames 2 and 3 both jump; 3 must take the already-corrected value of 2
        let mut points: Vec<(f64, f64)> = (0..200).map(|i| (i as f64 * 0.01, 0.0)).collect();
        points[3] = (50.0, 0.0);
        points[4] = (-50.0, 0.0);
        let input = track(&points);

        let filtered = OutlierFilter::default().apply(&input);
        assert!(filtered.mask[2] && filtered.mask[3] && filtered.mask[4]);
        assert_eq!(filtered.track[2], input[1]);
        assert_eq!(filtered.track[3], input[1]);
        assert_eq!(filtered.track[4], input[1]);
    }

    #[test]
    fn test_first_frame_skip_policy() {
        let input = spiked(0);
        let filtered = OutlierFilter::new(2.58, FirstFramePolicy::Skip).apply(&input);

        assert!(!filtered.mask[0]);
        assert_eq!(filtered.track[0], input[0]);
    }

    #[test]
    fn test_first_frame_wrap_policy() {
        let input = spiked(0);
        let filtered = OutlierFilter::new(2.58, FirstFramePolicy::Wrap).apply(&input);

        assert!(filtered.mask[0]);
        assert_eq!(filtered.track[0], input[29]);
    }

    #[test]
    fn test_second_pass_makes_no_corrections() {
        let once = OutlierFilter::default().apply(&spiked(15));
        let twice = OutlierFilter::default().apply(&once.track);
        assert_eq!(twice.corrected(), 0);
        assert_eq!(twice.track, once.track);
    }

    #[test]
    fn test_single_frame_track() {
        let filtered = OutlierFilter::default().apply(&track(&[(1.0, 1.0)]));
        assert_eq!(filtered.track.len(), 1);
        assert!(!filtered.mask[0]);
    }
}
