//! Alignment of kinematic signals to laser events.
//!
//! Each event edge is converted to a frame index and the signal is sampled
//! a fixed number of frames before and after it. Per-event samples are then
//! reduced to one pre and one post mean per edge.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::loader::types::Event;

/// Laser onset or offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    On,
    Off,
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::On => f.write_str("laser on"),
            Edge::Off => f.write_str("laser off"),
        }
    }
}

/// A signal sampled before and after one event edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedWindow {
    pub pre: f64,
    pub post: f64,
}

impl AlignedWindow {
    pub const fn new(pre: f64, post: f64) -> Self {
        Self { pre, post }
    }
}

/// Per-event windows for both edges of every event.
#[derive(Debug, Clone, Default)]
pub struct EdgeWindows {
    pub on: Vec<AlignedWindow>,
    pub off: Vec<AlignedWindow>,
}

impl EdgeWindows {
    /// Mean pre and post over all events, per edge.
    pub fn reduce(&self) -> (AlignedWindow, AlignedWindow) {
        (mean_window(&self.on), mean_window(&self.off))
    }
}

/// Alignment errors.
#[derive(Debug, Clone, PartialEq)]
pub enum AlignmentError {
    /// A pre/post sample falls outside the recording
    OutOfRange {
        event: usize,
        edge: Edge,
        frame: i64,
        frames: usize,
    },
    /// An event time is NaN or infinite
    InvalidTime { event: usize, edge: Edge, secs: f64 },
}

impl std::fmt::Display for AlignmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlignmentError::OutOfRange {
                event,
                edge,
                frame,
                frames,
            } => write!(
                f,
                "event {event} ({edge}) samples frame {frame}, recording has {frames} frames"
            ),
            AlignmentError::InvalidTime { event, edge, secs } => {
                write!(f, "event {event} ({edge}) has invalid time {secs}")
            }
        }
    }
}

impl std::error::Error for AlignmentError {}

/// Samples signals around laser events.
#[derive(Debug, Clone, Copy)]
pub struct EventAligner {
    fps: f64,
    offset: usize,
}

impl EventAligner {
    /// `offset` is the distance in frames of the pre/post samples from the
    /// event frame.
    pub fn new(fps: f64, offset: usize) -> Self {
        Self { fps, offset }
    }

    /// Frame index of a time in seconds. Halves round to even.
    pub fn event_frame(&self, secs: f64) -> i64 {
        (secs * self.fps).round_ties_even() as i64
    }

    /// Sample `signal` before and after every edge of every event.
    pub fn align(&self, signal: &[f64], events: &[Event]) -> Result<EdgeWindows, AlignmentError> {
        let mut windows = EdgeWindows {
            on: Vec::with_capacity(events.len()),
            off: Vec::with_capacity(events.len()),
        };

        for (index, event) in events.iter().enumerate() {
            windows
                .on
                .push(self.sample(signal, index, Edge::On, event.on_secs)?);
            windows
                .off
                .push(self.sample(signal, index, Edge::Off, event.off_secs)?);
        }
        Ok(windows)
    }

    fn sample(
        &self,
        signal: &[f64],
        event: usize,
        edge: Edge,
        secs: f64,
    ) -> Result<AlignedWindow, AlignmentError> {
        if !secs.is_finite() {
            return Err(AlignmentError::InvalidTime { event, edge, secs });
        }

        let frame = self.event_frame(secs);
        let offset = self.offset as i64;
        let at = |frame: i64| {
            usize::try_from(frame)
                .ok()
                .and_then(|i| signal.get(i).copied())
                .ok_or(AlignmentError::OutOfRange {
                    event,
                    edge,
                    frame,
                    frames: signal.len(),
                })
        };

        // Saturated frames are never inside the signal
        Ok(AlignedWindow {
            pre: at(frame.saturating_sub(offset))?,
            post: at(frame.saturating_add(offset))?,
        })
    }
}

/// Mean of the finite values; NaN if there are none.
pub fn finite_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let finite: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.mean()
}

/// Average per-event windows. Non-finite samples are skipped.
pub fn mean_window(windows: &[AlignedWindow]) -> AlignedWindow {
    let skipped = windows
        .iter()
        .filter(|w| !w.pre.is_finite() || !w.post.is_finite())
        .count();
    if skipped > 0 {
        tracing::debug!(skipped, total = windows.len(), "skipping non-finite samples");
    }

    AlignedWindow {
        pre: finite_mean(windows.iter().map(|w| w.pre)),
        post: finite_mean(windows.iter().map(|w| w.post)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<f64> {
        (0..len).map(|i| i as f64).collect()
    }

    #[test]
    fn test_event_frame_conversion() {
        let aligner = EventAligner::new(10.0, 5);
        assert_eq!(aligner.event_frame(2.0), 20);
        assert_eq!(aligner.event_frame(2.04), 20);
        assert_eq!(aligner.event_frame(2.06), 21);
    }

    #[test]
    fn test_event_frame_rounds_half_to_even() {
        let aligner = EventAligner::new(2.0, 1);
        assert_eq!(aligner.event_frame(1.25), 2);
        assert_eq!(aligner.event_frame(1.75), 4);
    }

    #[test]
    fn test_pre_and_post_indices() {
        let aligner = EventAligner::new(10.0, 5);
        let signal = ramp(40);
        let windows = aligner.align(&signal, &[Event::new(2.0, 3.0)]).unwrap();

        assert_eq!(windows.on[0], AlignedWindow::new(15.0, 25.0));
        assert_eq!(windows.off[0], AlignedWindow::new(25.0, 35.0));
    }

    #[test]
    fn test_post_sample_past_end_fails() {
        let aligner = EventAligner::new(10.0, 5);
        let signal = ramp(25);
        let err = aligner
            .align(&signal, &[Event::new(2.0, 2.1)])
            .unwrap_err();

        assert_eq!(
            err,
            AlignmentError::OutOfRange {
                event: 0,
                edge: Edge::On,
                frame: 25,
                frames: 25
            }
        );
    }

    #[test]
    fn test_pre_sample_before_start_fails() {
        let aligner = EventAligner::new(10.0, 5);
        let err = aligner
            .align(&ramp(100), &[Event::new(0.3, 1.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            AlignmentError::OutOfRange { frame: -2, edge: Edge::On, .. }
        ));
    }

    #[test]
    fn test_far_out_times_fail_without_overflow() {
        let aligner = EventAligner::new(10.0, 5);
        let signal = ramp(100);

        let err = aligner
            .align(&signal, &[Event::new(-1e300, 2.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            AlignmentError::OutOfRange { frame: i64::MIN, edge: Edge::On, .. }
        ));

        let err = aligner
            .align(&signal, &[Event::new(2.0, 1e300)])
            .unwrap_err();
        assert!(matches!(
            err,
            AlignmentError::OutOfRange { edge: Edge::Off, .. }
        ));
    }

    #[test]
    fn test_invalid_time() {
        let aligner = EventAligner::new(10.0, 5);
        let err = aligner
            .align(&ramp(100), &[Event::new(2.0, f64::NAN)])
            .unwrap_err();
        assert!(matches!(
            err,
            AlignmentError::InvalidTime { edge: Edge::Off, .. }
        ));
    }

    #[test]
    fn test_reduce_means_across_events() {
        let aligner = EventAligner::new(10.0, 5);
        let signal = ramp(100);
        let events = [Event::new(2.0, 3.0), Event::new(4.0, 5.0)];

        let (on, off) = aligner.align(&signal, &events).unwrap().reduce();
        assert_eq!(on, AlignedWindow::new(25.0, 35.0));
        assert_eq!(off, AlignedWindow::new(35.0, 45.0));
    }

    #[test]
    fn test_mean_window_skips_nan() {
        let windows = [
            AlignedWindow::new(10.0, f64::NAN),
            AlignedWindow::new(20.0, 4.0),
        ];
        let mean = mean_window(&windows);
        assert_eq!(mean.pre, 15.0);
        assert_eq!(mean.post, 4.0);

        let all_nan = mean_window(&[AlignedWindow::new(f64::NAN, f64::NAN)]);
        assert!(all_nan.pre.is_nan() && all_nan.post.is_nan());
    }
}
