//! Engine configuration
//!
//! Loaded from the `[engine]` table of a scenario file or built in code from
//! one of the presets.

use scrollwork_animation::Easing;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrollError};

/// Configuration for the scroll engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fraction of the remaining distance the smoothed offset covers per
    /// frame, in (0, 1]. 1.0 disables smoothing.
    pub lerp: f32,
    /// Distance (px) under which the smoothed offset snaps to the raw one
    pub settle_epsilon: f32,
    /// Duration of a non-immediate `scroll_to`
    pub scroll_duration_ms: f32,
    /// Curve of a non-immediate `scroll_to`
    pub scroll_easing: Easing,
    /// Delay between a route mounting and its geometry refresh
    pub settle_delay_ms: f32,
    /// Quiet period after the last resize before geometry is refreshed
    pub resize_debounce_ms: f32,
    /// Time for a toggle region's playhead to run from 0 to 1
    pub toggle_duration_ms: f32,
    /// Upper bound on the frame delta fed to tweens and velocity
    pub max_frame_dt_ms: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lerp: 0.1,
            settle_epsilon: 0.1,
            scroll_duration_ms: 1200.0,
            scroll_easing: Easing::EaseOutExpo,
            settle_delay_ms: 100.0,
            resize_debounce_ms: 200.0,
            toggle_duration_ms: 600.0,
            max_frame_dt_ms: 100.0,
        }
    }
}

impl EngineConfig {
    /// Lighter smoothing and shorter programmatic scrolls
    pub fn responsive() -> Self {
        Self {
            lerp: 0.2,
            scroll_duration_ms: 600.0,
            toggle_duration_ms: 400.0,
            ..Default::default()
        }
    }

    /// Heavy smoothing for showcase pages
    pub fn cinematic() -> Self {
        Self {
            lerp: 0.07,
            scroll_duration_ms: 1600.0,
            toggle_duration_ms: 900.0,
            ..Default::default()
        }
    }

    /// No smoothing: the smoothed offset equals the raw offset every frame
    pub fn unsmoothed() -> Self {
        Self {
            lerp: 1.0,
            ..Default::default()
        }
    }

    /// Reject values that would break the engine's invariants
    pub fn validate(&self) -> Result<()> {
        if !(self.lerp > 0.0 && self.lerp <= 1.0) {
            return Err(ScrollError::InvalidConfig {
                field: "lerp",
                reason: format!("must be in (0, 1], got {}", self.lerp),
            });
        }
        let non_negative = [
            ("settle_epsilon", self.settle_epsilon),
            ("scroll_duration_ms", self.scroll_duration_ms),
            ("settle_delay_ms", self.settle_delay_ms),
            ("resize_debounce_ms", self.resize_debounce_ms),
            ("toggle_duration_ms", self.toggle_duration_ms),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ScrollError::InvalidConfig {
                    field,
                    reason: format!("must be a non-negative number, got {value}"),
                });
            }
        }
        if !self.max_frame_dt_ms.is_finite() || self.max_frame_dt_ms <= 0.0 {
            return Err(ScrollError::InvalidConfig {
                field: "max_frame_dt_ms",
                reason: format!("must be positive, got {}", self.max_frame_dt_ms),
            });
        }
        Ok(())
    }
}
