//! Frame scheduler
//!
//! Turns host frame timestamps into clamped frame deltas and runs deferred
//! work (the settle refresh after a route mounts, the debounced refresh after
//! a resize) on the first frame at or past its due time. Scheduling a task
//! that is already pending replaces it, which is what debounces resizes.
//!
//! Once shut down the scheduler produces no more frames.

use smallvec::SmallVec;

/// Work deferred to a later frame
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeferredTask {
    /// Remeasure after a newly mounted route has laid out
    SettleRefresh,
    /// Remeasure after the viewport stopped resizing
    ResizeRefresh,
}

#[derive(Clone, Copy, Debug)]
struct Deferred {
    task: DeferredTask,
    delay_ms: f32,
    /// Resolved against the frame clock; `None` until a frame has been seen
    due_ms: Option<f64>,
}

/// Timing for one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameClock {
    /// Monotonic frame counter, starting at 1
    pub frame: u64,
    pub now_ms: f64,
    /// Clamped to `[0, max_frame_dt_ms]`
    pub dt_ms: f32,
}

/// Frame timing and deferred tasks
#[derive(Debug)]
pub struct FrameScheduler {
    running: bool,
    frame: u64,
    last_frame_ms: Option<f64>,
    max_dt_ms: f32,
    deferred: SmallVec<[Deferred; 2]>,
}

impl FrameScheduler {
    pub fn new(max_dt_ms: f32) -> Self {
        Self {
            running: true,
            frame: 0,
            last_frame_ms: None,
            max_dt_ms,
            deferred: SmallVec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Start a frame at `now_ms`; `None` once shut down
    pub fn begin_frame(&mut self, now_ms: f64) -> Option<FrameClock> {
        if !self.running {
            return None;
        }

        let dt_ms = match self.last_frame_ms {
            Some(last) if now_ms.is_finite() => ((now_ms - last) as f32).clamp(0.0, self.max_dt_ms),
            _ => 0.0,
        };
        let now_ms = match self.last_frame_ms {
            Some(last) if !now_ms.is_finite() || now_ms < last => last,
            _ if !now_ms.is_finite() => 0.0,
            _ => now_ms,
        };
        self.last_frame_ms = Some(now_ms);
        self.frame += 1;

        for entry in self.deferred.iter_mut() {
            if entry.due_ms.is_none() {
                entry.due_ms = Some(now_ms + f64::from(entry.delay_ms));
            }
        }

        Some(FrameClock {
            frame: self.frame,
            now_ms,
            dt_ms,
        })
    }

    /// Schedule `task` `delay_ms` after the latest frame, replacing any
    /// pending instance of the same task
    pub fn schedule(&mut self, task: DeferredTask, delay_ms: f32) {
        if !self.running {
            return;
        }
        let delay_ms = if delay_ms.is_finite() { delay_ms.max(0.0) } else { 0.0 };
        self.deferred.retain(|d| d.task != task);
        self.deferred.push(Deferred {
            task,
            delay_ms,
            due_ms: self.last_frame_ms.map(|last| last + f64::from(delay_ms)),
        });
        tracing::trace!(?task, delay_ms, "scheduled deferred task");
    }

    pub fn cancel(&mut self, task: DeferredTask) {
        self.deferred.retain(|d| d.task != task);
    }

    pub fn is_pending(&self, task: DeferredTask) -> bool {
        self.deferred.iter().any(|d| d.task == task)
    }

    pub fn has_pending(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Remove and return tasks due at `now_ms`, in scheduling order
    pub fn take_due(&mut self, now_ms: f64) -> SmallVec<[DeferredTask; 2]> {
        let mut due = SmallVec::new();
        self.deferred.retain(|d| match d.due_ms {
            Some(at) if at <= now_ms => {
                due.push(d.task);
                false
            }
            _ => true,
        });
        due
    }

    /// Stop producing frames and drop pending work
    pub fn shutdown(&mut self) {
        if self.running {
            tracing::debug!(frames = self.frame, "frame scheduler stopped");
        }
        self.running = false;
        self.deferred.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_has_zero_dt() {
        let mut scheduler = FrameScheduler::new(100.0);
        let clock = scheduler.begin_frame(5000.0).unwrap();
        assert_eq!(clock.frame, 1);
        assert_eq!(clock.dt_ms, 0.0);

        let clock = scheduler.begin_frame(5016.0).unwrap();
        assert_eq!(clock.frame, 2);
        assert_eq!(clock.dt_ms, 16.0);
    }

    #[test]
    fn test_dt_is_clamped() {
        let mut scheduler = FrameScheduler::new(100.0);
        scheduler.begin_frame(0.0);
        assert_eq!(scheduler.begin_frame(5000.0).unwrap().dt_ms, 100.0);
        // Clock going backwards yields a zero delta
        assert_eq!(scheduler.begin_frame(4000.0).unwrap().dt_ms, 0.0);
    }

    #[test]
    fn test_deferred_task_runs_when_due() {
        let mut scheduler = FrameScheduler::new(100.0);
        scheduler.begin_frame(0.0);
        scheduler.schedule(DeferredTask::SettleRefresh, 100.0);

        scheduler.begin_frame(50.0);
        assert!(scheduler.take_due(50.0).is_empty());

        scheduler.begin_frame(100.0);
        assert_eq!(
            scheduler.take_due(100.0).as_slice(),
            &[DeferredTask::SettleRefresh]
        );
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn test_schedule_before_first_frame_resolves_on_first_frame() {
        let mut scheduler = FrameScheduler::new(100.0);
        scheduler.schedule(DeferredTask::SettleRefresh, 100.0);
        let clock = scheduler.begin_frame(1000.0).unwrap();
        assert!(scheduler.take_due(clock.now_ms).is_empty());
        assert_eq!(scheduler.take_due(1100.0).len(), 1);
    }

    #[test]
    fn test_rescheduling_debounces() {
        let mut scheduler = FrameScheduler::new(100.0);
        scheduler.begin_frame(0.0);
        scheduler.schedule(DeferredTask::ResizeRefresh, 200.0);
        scheduler.begin_frame(150.0);
        scheduler.schedule(DeferredTask::ResizeRefresh, 200.0);

        assert!(scheduler.take_due(200.0).is_empty());
        assert_eq!(scheduler.take_due(350.0).len(), 1);
    }

    #[test]
    fn test_shutdown_stops_frames() {
        let mut scheduler = FrameScheduler::new(100.0);
        scheduler.schedule(DeferredTask::SettleRefresh, 0.0);
        scheduler.shutdown();
        assert!(scheduler.begin_frame(0.0).is_none());
        assert!(!scheduler.has_pending());
        scheduler.schedule(DeferredTask::ResizeRefresh, 0.0);
        assert!(!scheduler.has_pending());
    }
}
