//! Animatable value types
//!
//! Provides the interpolation trait and keyframe tracks sampled by progress
//! rather than by wall-clock time.

use scrollwork_core::VisualState;
use smallvec::SmallVec;

use crate::easing::Easing;

/// Trait for values that can be linearly interpolated
pub trait Interpolate: Clone {
    /// Linearly interpolate between self and other by factor t (0.0 to 1.0)
    fn lerp(&self, other: &Self, t: f32) -> Self;

    /// Check if two values are approximately equal (for settling detection)
    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool;
}

// ============================================================================
// f32 Implementation
// ============================================================================

impl Interpolate for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self - other).abs() < epsilon
    }
}

// ============================================================================
// VisualState Implementation
// ============================================================================

impl Interpolate for VisualState {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        VisualState {
            opacity: self.opacity.lerp(&other.opacity, t),
            translate_x: self.translate_x.lerp(&other.translate_x, t),
            translate_y: self.translate_y.lerp(&other.translate_y, t),
            scale: self.scale.lerp(&other.scale, t),
            rotate: self.rotate.lerp(&other.rotate, t),
        }
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.opacity.approx_eq(&other.opacity, epsilon)
            && self.translate_x.approx_eq(&other.translate_x, epsilon)
            && self.translate_y.approx_eq(&other.translate_y, epsilon)
            && self.scale.approx_eq(&other.scale, epsilon)
            && self.rotate.approx_eq(&other.rotate, epsilon)
    }
}

// ============================================================================
// Progress-sampled Keyframes
// ============================================================================

/// A keyframe holding a value of type T
#[derive(Clone, Debug)]
pub struct TypedKeyframe<T: Interpolate> {
    /// Position along the track (0.0 to 1.0)
    pub time: f32,
    /// Value at this keyframe
    pub value: T,
    /// Easing function when transitioning TO this keyframe
    pub easing: Easing,
}

impl<T: Interpolate> TypedKeyframe<T> {
    /// Create a new keyframe
    pub fn new(time: f32, value: T, easing: Easing) -> Self {
        Self {
            time: time.clamp(0.0, 1.0),
            value,
            easing,
        }
    }

    /// Create a keyframe with linear easing
    pub fn linear(time: f32, value: T) -> Self {
        Self::new(time, value, Easing::Linear)
    }
}

/// Keyframes sorted by position, sampled at an externally supplied progress
///
/// Sampling has no hidden state: the same progress always yields the same
/// value, which is what lets scroll bindings be tested without scrolling.
#[derive(Clone, Debug)]
pub struct KeyframeTrack<T: Interpolate> {
    keyframes: SmallVec<[TypedKeyframe<T>; 4]>,
}

impl<T: Interpolate> Default for KeyframeTrack<T> {
    fn default() -> Self {
        Self {
            keyframes: SmallVec::new(),
        }
    }
}

impl<T: Interpolate> KeyframeTrack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two-point track from `from` at 0 to `to` at 1
    pub fn from_to(from: T, to: T) -> Self {
        Self::new().at(0.0, from).at(1.0, to)
    }

    /// Add a keyframe (builder pattern)
    pub fn keyframe(mut self, time: f32, value: T, easing: Easing) -> Self {
        self.keyframes.push(TypedKeyframe::new(time, value, easing));
        self.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        self
    }

    /// Add a keyframe with linear easing
    pub fn at(self, time: f32, value: T) -> Self {
        self.keyframe(time, value, Easing::Linear)
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// Sample at a specific progress (0.0 to 1.0)
    pub fn sample_at(&self, progress: f32) -> Option<T> {
        let first = self.keyframes.first()?;
        let progress = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let mut prev_kf = first;
        let mut next_kf = first;

        for kf in &self.keyframes {
            if kf.time <= progress {
                prev_kf = kf;
            }
            if kf.time >= progress {
                next_kf = kf;
                break;
            }
            next_kf = kf;
        }

        if (prev_kf.time - next_kf.time).abs() < f32::EPSILON {
            return Some(prev_kf.value.clone());
        }

        let local_progress = (progress - prev_kf.time) / (next_kf.time - prev_kf.time);
        let eased = next_kf.easing.apply(local_progress);

        Some(prev_kf.value.lerp(&next_kf.value, eased))
    }
}

/// Keyframe track for f32 values
pub type FloatTrack = KeyframeTrack<f32>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_interpolation() {
        assert!((0.0_f32.lerp(&1.0, 0.5) - 0.5).abs() < 1e-6);
        assert!((10.0_f32.lerp(&20.0, 0.25) - 12.5).abs() < 1e-6);
    }

    #[test]
    fn test_visual_state_interpolation() {
        let a = VisualState {
            opacity: 0.0,
            translate_y: 40.0,
            ..VisualState::default()
        };
        let b = VisualState::default();
        let mid = a.lerp(&b, 0.5);

        assert!((mid.opacity - 0.5).abs() < 1e-6);
        assert!((mid.translate_y - 20.0).abs() < 1e-6);
        assert!(mid.approx_eq(&mid.clone(), 1e-6));
    }

    #[test]
    fn test_track_sampling() {
        let track = FloatTrack::new().at(0.0, 0.0).at(0.5, 100.0).at(1.0, 50.0);

        assert_eq!(track.sample_at(0.0), Some(0.0));
        assert!((track.sample_at(0.25).unwrap() - 50.0).abs() < 1e-4);
        assert_eq!(track.sample_at(0.5), Some(100.0));
        assert!((track.sample_at(0.75).unwrap() - 75.0).abs() < 1e-4);
        assert_eq!(track.sample_at(1.0), Some(50.0));
    }

    #[test]
    fn test_track_holds_outside_keyframes() {
        let track = FloatTrack::new().at(0.2, 10.0).at(0.8, 20.0);

        assert_eq!(track.sample_at(0.0), Some(10.0));
        assert_eq!(track.sample_at(1.0), Some(20.0));
        assert_eq!(track.sample_at(f32::NAN), Some(10.0));
    }

    #[test]
    fn test_empty_track() {
        assert!(FloatTrack::new().sample_at(0.5).is_none());
    }
}
