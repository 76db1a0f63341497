//! Fixed-duration eased tweens
//!
//! Used for programmatic scrolling and for the playhead of toggle regions.
//! Time is supplied by the caller in milliseconds, never read from a clock.

use crate::easing::Easing;

/// A value moving from `from` to `to` over `duration_ms`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween {
    from: f32,
    to: f32,
    elapsed_ms: f32,
    duration_ms: f32,
    easing: Easing,
}

impl Tween {
    pub fn new(from: f32, to: f32, duration_ms: f32, easing: Easing) -> Self {
        Self {
            from,
            to,
            elapsed_ms: 0.0,
            duration_ms: duration_ms.max(0.0),
            easing,
        }
    }

    pub fn from(&self) -> f32 {
        self.from
    }

    pub fn to(&self) -> f32 {
        self.to
    }

    /// Linear time progress (0.0 to 1.0)
    pub fn progress(&self) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
    }

    /// Current eased value
    pub fn value(&self) -> f32 {
        let eased = self.easing.apply(self.progress());
        if eased >= 1.0 {
            return self.to;
        }
        self.from + (self.to - self.from) * eased
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }

    /// Advance by `dt_ms` and return the new value
    pub fn advance(&mut self, dt_ms: f32) -> f32 {
        if dt_ms.is_finite() && dt_ms > 0.0 {
            self.elapsed_ms = (self.elapsed_ms + dt_ms).min(self.duration_ms);
        }
        self.value()
    }

    /// Restart toward a new target from the current value
    pub fn retarget(&mut self, to: f32, duration_ms: f32) {
        *self = Self::new(self.value(), to, duration_ms, self.easing);
    }
}
