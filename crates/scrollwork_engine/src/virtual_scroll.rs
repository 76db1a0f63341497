//! Virtual scroll source
//!
//! Keeps a smoothed scroll offset that trails the native one. Each frame the
//! smoothed offset covers a fixed fraction of the remaining distance, so
//! smoothing feels the same regardless of frame timing and never overshoots.
//! Programmatic scrolls move the raw offset along an eased tween.

use scrollwork_animation::{Easing, Tween};

use crate::config::EngineConfig;

/// Scroll positions for one frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollState {
    /// Last native reading (or tween position), px from the top
    pub raw_offset: f32,
    /// Interpolated offset every computation uses
    pub smoothed_offset: f32,
    /// Smoothed px/s, informational only
    pub velocity: f32,
}

/// How `scroll_to` moves
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScrollBehavior {
    /// Jump raw and smoothed offsets synchronously
    Immediate,
    /// Tween the raw offset over the configured duration
    #[default]
    Smooth,
}

/// Outcome of one `tick`
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollTick {
    /// The smoothed offset changed this frame
    pub moved: bool,
    /// Native scroll position the host should be moved to
    pub write_native: Option<f32>,
}

/// Smoothed scroll offset source
#[derive(Clone, Debug)]
pub struct VirtualScrollSource {
    state: ScrollState,
    lerp: f32,
    settle_epsilon: f32,
    limit: f32,
    tween: Option<Tween>,
    scroll_duration_ms: f32,
    scroll_easing: Easing,
    /// Last position written to the host, so its echo is not taken as input
    last_written: Option<f32>,
}

impl VirtualScrollSource {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: ScrollState::default(),
            lerp: config.lerp.clamp(f32::EPSILON, 1.0),
            settle_epsilon: config.settle_epsilon.max(0.0),
            limit: f32::INFINITY,
            tween: None,
            scroll_duration_ms: config.scroll_duration_ms,
            scroll_easing: config.scroll_easing,
            last_written: None,
        }
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn raw_offset(&self) -> f32 {
        self.state.raw_offset
    }

    pub fn smoothed_offset(&self) -> f32 {
        self.state.smoothed_offset
    }

    /// Maximum scroll offset
    pub fn limit(&self) -> f32 {
        self.limit
    }

    fn clamp(&self, offset: f32) -> f32 {
        if !offset.is_finite() {
            return self.state.raw_offset;
        }
        offset.clamp(0.0, self.limit)
    }

    /// Update the scrollable range; offsets beyond it are pulled back
    pub fn set_limit(&mut self, limit: f32) {
        self.limit = if limit.is_finite() { limit.max(0.0) } else { f32::INFINITY };
        self.state.raw_offset = self.clamp(self.state.raw_offset);
        if let Some(tween) = self.tween {
            if tween.to() > self.limit {
                self.tween = Some(Tween::new(
                    self.state.raw_offset,
                    self.limit,
                    self.scroll_duration_ms * (1.0 - tween.progress()),
                    self.scroll_easing,
                ));
            }
        }
    }

    /// Record a native scroll reading; takes effect on the next tick
    pub fn on_native_scroll(&mut self, raw: f32) {
        if let Some(written) = self.last_written {
            if (written - raw).abs() < 0.5 {
                return;
            }
        }
        self.last_written = None;
        if self.tween.take().is_some() {
            tracing::trace!(raw, "native scroll interrupted programmatic scroll");
        }
        self.state.raw_offset = self.clamp(raw);
    }

    /// Start a programmatic scroll
    ///
    /// Returns the native position to write for immediate jumps.
    pub fn scroll_to(&mut self, target: f32, behavior: ScrollBehavior) -> Option<f32> {
        let target = self.clamp(target);
        match behavior {
            ScrollBehavior::Immediate => {
                self.tween = None;
                self.state = ScrollState {
                    raw_offset: target,
                    smoothed_offset: target,
                    velocity: 0.0,
                };
                self.last_written = Some(target);
                Some(target)
            }
            ScrollBehavior::Smooth => {
                let from = self.state.raw_offset;
                let duration = if (target - from).abs() < f32::EPSILON {
                    0.0
                } else {
                    self.scroll_duration_ms
                };
                self.tween = Some(Tween::new(from, target, duration, self.scroll_easing));
                None
            }
        }
    }

    /// Reset to the top immediately (route change)
    pub fn reset(&mut self) -> f32 {
        self.scroll_to(0.0, ScrollBehavior::Immediate).unwrap_or(0.0)
    }

    /// Advance one frame
    pub fn tick(&mut self, dt_ms: f32) -> ScrollTick {
        let mut write_native = None;

        if let Some(tween) = self.tween.as_mut() {
            let raw = tween.advance(dt_ms);
            let finished = tween.is_finished();
            self.state.raw_offset = self.clamp(raw);
            write_native = Some(self.state.raw_offset);
            self.last_written = write_native;
            if finished {
                self.tween = None;
            }
        }

        let prev = self.state.smoothed_offset;
        let raw = self.state.raw_offset;
        let mut next = prev + (raw - prev) * self.lerp;
        if (raw - next).abs() <= self.settle_epsilon {
            next = raw;
        }
        self.state.smoothed_offset = next;
        self.state.velocity = if dt_ms > 0.0 {
            (next - prev) / (dt_ms / 1000.0)
        } else {
            0.0
        };

        ScrollTick {
            moved: next != prev,
            write_native,
        }
    }

    /// No tween running and the smoothed offset has caught up
    pub fn is_settled(&self) -> bool {
        self.tween.is_none() && self.state.smoothed_offset == self.state.raw_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(lerp: f32) -> VirtualScrollSource {
        VirtualScrollSource::new(&EngineConfig {
            lerp,
            ..Default::default()
        })
    }

    #[test]
    fn test_native_scroll_is_deferred_to_tick() {
        let mut s = source(0.5);
        s.on_native_scroll(100.0);
        assert_eq!(s.raw_offset(), 100.0);
        assert_eq!(s.smoothed_offset(), 0.0);

        s.tick(16.0);
        assert_eq!(s.smoothed_offset(), 50.0);
    }

    #[test]
    fn test_smoothing_never_overshoots() {
        let mut s = source(0.3);
        let readings = [400.0, 380.0, 900.0, 100.0, 100.0, 2000.0, 0.0];
        for raw in readings {
            s.on_native_scroll(raw);
            for _ in 0..5 {
                let prev = s.smoothed_offset();
                s.tick(16.0);
                let lo = prev.min(raw);
                let hi = prev.max(raw);
                let now = s.smoothed_offset();
                assert!(now >= lo && now <= hi, "{now} outside [{lo}, {hi}]");
            }
        }
    }

    #[test]
    fn test_converges_and_settles() {
        let mut s = source(0.1);
        s.on_native_scroll(1000.0);
        for _ in 0..200 {
            s.tick(16.0);
        }
        assert_eq!(s.smoothed_offset(), 1000.0);
        assert!(s.is_settled());
    }

    #[test]
    fn test_lerp_ignores_dt() {
        let mut a = source(0.2);
        let mut b = source(0.2);
        a.on_native_scroll(500.0);
        b.on_native_scroll(500.0);
        a.tick(8.0);
        b.tick(64.0);
        assert_eq!(a.smoothed_offset(), b.smoothed_offset());
    }

    #[test]
    fn test_immediate_scroll_sets_both_offsets() {
        let mut s = source(0.1);
        s.on_native_scroll(800.0);
        s.tick(16.0);

        let write = s.scroll_to(0.0, ScrollBehavior::Immediate);
        assert_eq!(write, Some(0.0));
        assert_eq!(s.raw_offset(), 0.0);
        assert_eq!(s.smoothed_offset(), 0.0);
        assert_eq!(s.state().velocity, 0.0);
    }

    #[test]
    fn test_smooth_scroll_tweens_raw_offset() {
        let mut s = VirtualScrollSource::new(&EngineConfig {
            lerp: 1.0,
            scroll_duration_ms: 100.0,
            scroll_easing: Easing::Linear,
            ..Default::default()
        });
        assert_eq!(s.scroll_to(1000.0, ScrollBehavior::Smooth), None);

        let tick = s.tick(50.0);
        assert_eq!(tick.write_native, Some(500.0));
        assert_eq!(s.smoothed_offset(), 500.0);

        s.tick(50.0);
        assert_eq!(s.raw_offset(), 1000.0);
        assert!(s.is_settled());
    }

    #[test]
    fn test_native_input_interrupts_tween_but_echo_does_not() {
        let mut s = VirtualScrollSource::new(&EngineConfig {
            scroll_duration_ms: 100.0,
            scroll_easing: Easing::Linear,
            ..Default::default()
        });
        s.scroll_to(1000.0, ScrollBehavior::Smooth);
        let written = s.tick(50.0).write_native.unwrap();

        s.on_native_scroll(written);
        assert!(!s.is_settled());
        s.tick(10.0);

        s.on_native_scroll(42.0);
        assert_eq!(s.raw_offset(), 42.0);
        assert!(s.tick(16.0).write_native.is_none());
    }

    #[test]
    fn test_limit_clamps_raw() {
        let mut s = source(1.0);
        s.set_limit(600.0);
        s.on_native_scroll(900.0);
        assert_eq!(s.raw_offset(), 600.0);
        s.on_native_scroll(-20.0);
        assert_eq!(s.raw_offset(), 0.0);
    }

    #[test]
    fn test_velocity_sign_follows_direction() {
        let mut s = source(0.5);
        s.on_native_scroll(200.0);
        s.tick(16.0);
        assert!(s.state().velocity > 0.0);
        s.on_native_scroll(0.0);
        s.tick(16.0);
        assert!(s.state().velocity < 0.0);
    }
}
