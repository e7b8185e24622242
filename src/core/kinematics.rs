//! Kinematic signals derived from filtered tracks.
//!
//! Speed is the tail-base displacement over a fixed lookback window. Body
//! bend is the angle at the body vertex of the nose-body-tail triangle,
//! recovered from the three side lengths with the law of cosines:
//!
//! ```text
//!              body
//!             /  θ \
//!          c /      \ b
//!           /        \
//!       nose -------- tail
//!               a
//!
//!   cos θ = (b² + c² - a²) / (2bc)
//! ```
//!
//! Only side lengths enter the formula, so a left bend and a right bend of
//! the same magnitude give the same angle.

use crate::loader::types::{Point, Track};

/// Per-frame displacement of the tail base over `window` frames.
///
/// Frames before `window` have no lookback and stay at zero.
pub fn velocity(tail: &Track, window: usize) -> Vec<f64> {
    let points = tail.points();
    let mut velocity = vec![0.0; points.len()];
    for i in window..points.len() {
        velocity[i] = points[i].distance(&points[i - window]);
    }
    velocity
}

/// Angle in degrees at `body` between the rays towards `nose` and `tail`.
///
/// Returns `None` when the body point coincides with either end or a
/// coordinate is not finite, since the angle is undefined there.
pub fn bend_angle(nose: &Point, body: &Point, tail: &Point) -> Option<f64> {
    // Squared sides straight from the coordinates; collinear points stay exact
    let a2 = nose.distance_squared(tail);
    let b2 = tail.distance_squared(body);
    let c2 = body.distance_squared(nose);
    if b2 == 0.0 || c2 == 0.0 {
        return None;
    }

    let cos = (b2 + c2 - a2) / (2.0 * (b2 * c2).sqrt());
    if !cos.is_finite() {
        return None;
    }
    // Rounding can push nearly collinear triangles just past ±1
    Some(cos.clamp(-1.0, 1.0).acos().to_degrees())
}

/// Body-bend angle for every frame.
#[derive(Debug, Clone, Default)]
pub struct AngleSignal {
    /// Degrees per frame; NaN where the triangle is degenerate
    pub degrees: Vec<f64>,
    /// Frames where the angle could not be computed
    pub degenerate_frames: Vec<usize>,
}

/// Compute the body-bend angle for frames `0..N-1`. The final frame is left
/// at zero.
pub fn body_angle(nose: &Track, body: &Track, tail: &Track) -> AngleSignal {
    let frames = nose.len();
    let mut signal = AngleSignal {
        degrees: vec![0.0; frames],
        degenerate_frames: Vec::new(),
    };

    for i in 0..frames.saturating_sub(1) {
        match bend_angle(&nose[i], &body[i], &tail[i]) {
            Some(angle) => signal.degrees[i] = angle,
            None => {
                signal.degrees[i] = f64::NAN;
                signal.degenerate_frames.push(i);
            }
        }
    }

    if !signal.degenerate_frames.is_empty() {
        tracing::warn!(
            frames = signal.degenerate_frames.len(),
            first = signal.degenerate_frames[0],
            "degenerate body geometry, angle set to NaN"
        );
    }
    signal
}

/// All derived kinematics of one recording.
#[derive(Debug, Clone)]
pub struct Kinematics {
    /// Summed tail-base displacement over the recording
    pub total_displacement: f64,
    pub velocity: Vec<f64>,
    pub angle: AngleSignal,
}

/// Compute every kinematic signal from filtered tracks.
pub fn compute_kinematics(nose: &Track, body: &Track, tail: &Track, window: usize) -> Kinematics {
    Kinematics {
        total_displacement: tail.total_displacement(),
        velocity: velocity(tail, window),
        angle: body_angle(nose, body, tail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::types::BodyPart;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_velocity_three_four_five() {
        let mut points = vec![p(0.0, 0.0); 5];
        points.extend(vec![p(3.0, 4.0); 5]);
        let tail = Track::new(BodyPart::TailBase, points);

        let v = velocity(&tail, 5);
        assert_eq!(v.len(), 10);
        assert!(v[..5].iter().all(|&x| x == 0.0));
        assert_eq!(v[5], 5.0);
        assert_eq!(v[9], 5.0);
    }

    #[test]
    fn test_velocity_window_longer_than_track() {
        let tail = Track::new(BodyPart::TailBase, vec![p(1.0, 1.0); 3]);
        assert_eq!(velocity(&tail, 5), vec![0.0; 3]);
    }

    #[test]
    fn test_straight_body_is_180_degrees() {
        let angle = bend_angle(&p(0.0, 0.0), &p(1.0, 0.0), &p(2.0, 0.0)).unwrap();
        assert!((angle - 180.0).abs() < 1e-9);

        // Not axis aligned, unequal segments
        let angle = bend_angle(&p(-3.0, -3.0), &p(1.0, 1.0), &p(2.5, 2.5)).unwrap();
        assert!((angle - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_nan_coordinate_is_degenerate() {
        assert_eq!(bend_angle(&p(f64::NAN, 0.0), &p(1.0, 0.0), &p(2.0, 0.0)), None);

        let nose = Track::new(BodyPart::Nose, vec![p(0.0, 1.0), p(f64::NAN, 1.0), p(0.0, 1.0)]);
        let body = Track::new(BodyPart::Body, vec![p(0.0, 0.0); 3]);
        let tail = Track::new(BodyPart::TailBase, vec![p(1.0, 0.0); 3]);

        let signal = body_angle(&nose, &body, &tail);
        assert!((signal.degrees[0] - 90.0).abs() < 1e-9);
        assert!(signal.degrees[1].is_nan());
        assert_eq!(signal.degenerate_frames, vec![1]);
    }

    #[test]
    fn test_folded_body_is_zero_degrees() {
        let angle = bend_angle(&p(2.0, 0.0), &p(0.0, 0.0), &p(2.0, 0.0)).unwrap();
        assert!(angle.abs() < 1e-6);
    }

    #[test]
    fn test_right_angle_and_mirror() {
        let left = bend_angle(&p(0.0, 1.0), &p(0.0, 0.0), &p(1.0, 0.0)).unwrap();
        let right = bend_angle(&p(0.0, -1.0), &p(0.0, 0.0), &p(1.0, 0.0)).unwrap();
        assert!((left - 90.0).abs() < 1e-9);
        assert_eq!(left, right);
    }

    #[test]
    fn test_degenerate_frames_are_nan() {
        let nose = Track::new(BodyPart::Nose, vec![p(0.0, 0.0), p(1.0, 1.0), p(0.0, 0.0)]);
        let body = Track::new(BodyPart::Body, vec![p(1.0, 0.0), p(1.0, 1.0), p(1.0, 0.0)]);
        let tail = Track::new(BodyPart::TailBase, vec![p(2.0, 0.0), p(2.0, 0.0), p(2.0, 0.0)]);

        let signal = body_angle(&nose, &body, &tail);
        assert!((signal.degrees[0] - 180.0).abs() < 1e-9);
        assert!(signal.degrees[1].is_nan());
        assert_eq!(signal.degenerate_frames, vec![1]);
        // Last frame is not computed
        assert_eq!(signal.degrees[2], 0.0);
    }

    #[test]
    fn test_total_displacement_uses_tail() {
        let nose = Track::new(BodyPart::Nose, vec![p(0.0, 0.0); 3]);
        let body = Track::new(BodyPart::Body, vec![p(1.0, 0.0); 3]);
        let tail = Track::new(
            BodyPart::TailBase,
            vec![p(0.0, 0.0), p(3.0, 4.0), p(6.0, 8.0)],
        );

        let kinematics = compute_kinematics(&nose, &body, &tail, 1);
        assert_eq!(kinematics.total_displacement, 10.0);
        assert_eq!(kinematics.velocity, vec![0.0, 5.0, 5.0]);
    }
}
