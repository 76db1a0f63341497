//! Scrollwork Animation
//!
//! Progress-driven animation primitives for scroll-synchronized effects.
//!
//! # Features
//!
//! - **Easing**: Standard curves plus CSS-style cubic beziers
//! - **Keyframe Tracks**: Values sampled by progress instead of time
//! - **Tweens**: Fixed-duration eased motion for programmatic scroll and toggles
//! - **Bindings**: Pure progress → visual state mappings, with presets

pub mod binding;
pub mod easing;
pub mod tween;
pub mod values;

pub use binding::{AnimationBinding, Interpolation, PropertyTrack};
pub use easing::Easing;
pub use tween::Tween;
pub use values::{FloatTrack, Interpolate, KeyframeTrack, TypedKeyframe};
