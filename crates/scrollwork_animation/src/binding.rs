//! Progress-to-presentation bindings
//!
//! An `AnimationBinding` turns a region's progress into a `VisualState`.
//! Bindings are pure: no clock, no interior state, no host access. The frame
//! scheduler samples them and performs the write, so scroll callbacks never
//! touch the document directly.
//!
//! # Example
//!
//! ```rust
//! use scrollwork_animation::{AnimationBinding, Easing};
//! use scrollwork_core::Property;
//!
//! let reveal = AnimationBinding::eased(Easing::EaseOutCubic)
//!     .from_to(Property::Opacity, 0.0, 1.0)
//!     .from_to(Property::TranslateY, 40.0, 0.0);
//!
//! let start = reveal.sample(0.0);
//! assert_eq!(start.opacity, 0.0);
//! assert_eq!(reveal.sample(1.0).translate_y, 0.0);
//! ```

use scrollwork_core::{Property, VisualState};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::easing::Easing;
use crate::values::FloatTrack;

/// How progress is shaped before the property tracks are sampled
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Progress is used as-is (scrub)
    #[default]
    Linear,
    /// Progress is passed through an easing curve first (eased toggle)
    Eased(Easing),
}

impl Interpolation {
    pub fn shape(&self, progress: f32) -> f32 {
        let progress = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        match self {
            Interpolation::Linear => progress,
            Interpolation::Eased(easing) => easing.apply(progress),
        }
    }
}

/// One property driven by a keyframe track
#[derive(Clone, Debug)]
pub struct PropertyTrack {
    pub property: Property,
    pub track: FloatTrack,
}

/// A set of property tracks sharing one interpolation rule
#[derive(Clone, Debug, Default)]
pub struct AnimationBinding {
    tracks: SmallVec<[PropertyTrack; 3]>,
    interpolation: Interpolation,
    base: VisualState,
}

impl AnimationBinding {
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            tracks: SmallVec::new(),
            interpolation,
            base: VisualState::default(),
        }
    }

    /// Binding that maps progress linearly (scrub)
    pub fn linear() -> Self {
        Self::new(Interpolation::Linear)
    }

    /// Binding that eases progress first (toggle)
    pub fn eased(easing: Easing) -> Self {
        Self::new(Interpolation::Eased(easing))
    }

    /// Values used for properties no track drives
    pub fn base(mut self, base: VisualState) -> Self {
        self.base = base;
        self
    }

    /// Animate a property from `from` at progress 0 to `to` at progress 1
    pub fn from_to(self, property: Property, from: f32, to: f32) -> Self {
        self.track(property, FloatTrack::from_to(from, to))
    }

    /// Animate a property along an explicit keyframe track
    pub fn track(mut self, property: Property, track: FloatTrack) -> Self {
        self.tracks.retain(|t| t.property != property);
        self.tracks.push(PropertyTrack { property, track });
        self
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn tracks(&self) -> &[PropertyTrack] {
        &self.tracks
    }

    /// Resolve the visual state at `progress`
    pub fn sample(&self, progress: f32) -> VisualState {
        let shaped = self.interpolation.shape(progress);
        let mut state = self.base;
        for PropertyTrack { property, track } in &self.tracks {
            if let Some(value) = track.sample_at(shaped) {
                state.set(*property, value);
            }
        }
        state
    }

    // =========================================================================
    // Presets
    // =========================================================================

    /// Fade in while rising `distance` px into place
    pub fn fade_up(distance: f32) -> Self {
        Self::eased(Easing::EaseOutCubic)
            .from_to(Property::Opacity, 0.0, 1.0)
            .from_to(Property::TranslateY, distance, 0.0)
    }

    /// Plain fade in
    pub fn fade_in() -> Self {
        Self::eased(Easing::EaseOut).from_to(Property::Opacity, 0.0, 1.0)
    }

    /// Fade in while growing from `from_scale`
    pub fn scale_in(from_scale: f32) -> Self {
        Self::eased(Easing::EaseOutCubic)
            .from_to(Property::Opacity, 0.0, 1.0)
            .from_to(Property::Scale, from_scale, 1.0)
    }

    /// Scrubbed horizontal slide by `distance` px
    pub fn slide_x(distance: f32) -> Self {
        Self::linear().from_to(Property::TranslateX, 0.0, -distance)
    }

    /// Scrubbed parallax drift on y
    pub fn parallax(distance: f32) -> Self {
        Self::linear().from_to(Property::TranslateY, distance * 0.5, -distance * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_is_deterministic() {
        let binding = AnimationBinding::fade_up(60.0).from_to(Property::Rotate, -8.0, 0.0);
        for i in 0..=64 {
            let p = i as f32 / 64.0;
            assert_eq!(binding.sample(p).bits(), binding.sample(p).bits());
        }
    }

    #[test]
    fn test_linear_scrub_maps_progress() {
        let binding = AnimationBinding::slide_x(1600.0);
        assert_eq!(binding.sample(0.0).translate_x, 0.0);
        assert!((binding.sample(0.5).translate_x + 800.0).abs() < 1e-3);
        assert_eq!(binding.sample(1.0).translate_x, -1600.0);
    }

    #[test]
    fn test_eased_shape_differs_from_linear() {
        let eased = AnimationBinding::fade_in();
        let linear = AnimationBinding::linear().from_to(Property::Opacity, 0.0, 1.0);
        assert!(eased.sample(0.3).opacity > linear.sample(0.3).opacity);
        assert_eq!(eased.sample(1.0).opacity, 1.0);
    }

    #[test]
    fn test_untracked_properties_use_base() {
        let binding = AnimationBinding::linear()
            .base(VisualState {
                scale: 2.0,
                ..VisualState::default()
            })
            .from_to(Property::Opacity, 0.0, 1.0);
        assert_eq!(binding.sample(0.5).scale, 2.0);
    }

    #[test]
    fn test_later_track_replaces_earlier_for_same_property() {
        let binding = AnimationBinding::linear()
            .from_to(Property::Opacity, 0.0, 1.0)
            .from_to(Property::Opacity, 1.0, 0.0);
        assert_eq!(binding.tracks().len(), 1);
        assert_eq!(binding.sample(0.0).opacity, 1.0);
    }

    #[test]
    fn test_out_of_range_progress_is_clamped() {
        let binding = AnimationBinding::slide_x(100.0);
        assert_eq!(binding.sample(-1.0).translate_x, 0.0);
        assert_eq!(binding.sample(2.0).translate_x, -100.0);
    }
}
