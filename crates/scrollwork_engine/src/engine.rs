//! Scroll engine
//!
//! Owns the host handle and every engine component, and runs the per-frame
//! pipeline in a fixed order:
//!
//! 1. Advance the virtual scroll source (and write any programmatic scroll)
//! 2. Run deferred refreshes that are due
//! 3. Evaluate trigger regions against the smoothed offset
//! 4. Apply pin placement and content transforms
//! 5. Apply animation bindings
//! 6. Notify listeners
//!
//! Listener panics are caught per region. A faulting region is deactivated
//! with a warning and the rest of the frame proceeds.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use scrollwork_animation::AnimationBinding;
use rustc_hash::FxHashMap;
use scrollwork_core::{ElementId, PinPlacement, ScrollHost, VisualState};

use crate::config::EngineConfig;
use crate::consumers::ProgressConsumer;
use crate::error::{Result, ScrollError};
use crate::lifecycle::{LifecycleManager, LifecycleState, ViewId, ViewRecord};
use crate::pin::PinController;
use crate::registry::{RefreshReport, RegionFault, RegionUpdate, TriggerRegistry};
use crate::scheduler::{DeferredTask, FrameScheduler};
use crate::trigger::{Listener, Position, RegionEvent, TriggerId, TriggerSpec};
use crate::virtual_scroll::{ScrollBehavior, ScrollState, VirtualScrollSource};

/// Engine shared between the host's event handlers and its frame callback
pub type SharedScrollEngine<H> = Arc<Mutex<ScrollEngine<H>>>;

/// What happened during one frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub dt_ms: f32,
    pub scroll: ScrollState,
    /// Per-region results, in evaluation order
    pub updates: Vec<RegionUpdate>,
    /// Geometry was refreshed by a deferred task this frame
    pub refreshed: bool,
    /// Regions deactivated this frame
    pub faulted: Vec<TriggerId>,
}

impl FrameReport {
    pub fn update(&self, id: TriggerId) -> Option<&RegionUpdate> {
        self.updates.iter().find(|u| u.id == id)
    }
}

/// Scroll-synchronized animation engine
pub struct ScrollEngine<H: ScrollHost> {
    config: EngineConfig,
    host: H,
    scroll: VirtualScrollSource,
    registry: TriggerRegistry,
    pins: PinController,
    lifecycle: LifecycleManager,
    scheduler: FrameScheduler,
    /// Last binding sample per element, before pin translation
    bound: FxHashMap<ElementId, VisualState>,
}

impl<H: ScrollHost> ScrollEngine<H> {
    pub fn new(config: EngineConfig, host: H) -> Result<Self> {
        config.validate()?;
        let mut engine = Self {
            scroll: VirtualScrollSource::new(&config),
            registry: TriggerRegistry::new(config.toggle_duration_ms),
            pins: PinController::new(),
            lifecycle: LifecycleManager::new(),
            scheduler: FrameScheduler::new(config.max_frame_dt_ms),
            bound: FxHashMap::default(),
            config,
            host,
        };
        engine.update_limit();
        tracing::debug!(lerp = engine.config.lerp, "scroll engine created");
        Ok(engine)
    }

    /// Wrap in `Arc<Mutex<_>>` for sharing with host callbacks
    pub fn shared(self) -> SharedScrollEngine<H> {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable host access; call `invalidate_layout` after moving anything
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    fn ensure_running(&self) -> Result<()> {
        if self.scheduler.is_running() {
            Ok(())
        } else {
            Err(ScrollError::ShutDown)
        }
    }

    fn update_limit(&mut self) {
        let document = self.host.document_extent().height;
        let viewport = self.host.viewport().height;
        let limit = (document + self.registry.total_pin_spacing() - viewport).max(0.0);
        if limit != self.scroll.limit() {
            tracing::trace!(limit, "scroll limit");
            self.scroll.set_limit(limit);
        }
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Feed a native scroll reading; applied on the next frame
    pub fn on_native_scroll(&mut self, raw: f32) {
        if self.scheduler.is_running() {
            self.scroll.on_native_scroll(raw);
        }
    }

    /// The viewport changed size; geometry is refreshed once resizing stops
    pub fn on_resize(&mut self) {
        if !self.scheduler.is_running() {
            return;
        }
        self.registry.invalidate("viewport resized");
        self.scheduler
            .schedule(DeferredTask::ResizeRefresh, self.config.resize_debounce_ms);
    }

    /// Something moved layout (an image or font loaded, content expanded)
    pub fn invalidate_layout(&mut self, reason: impl Into<String>) {
        self.registry.invalidate(reason);
    }

    /// Scroll programmatically
    pub fn scroll_to(&mut self, target: f32, behavior: ScrollBehavior) -> Result<()> {
        self.ensure_running()?;
        if let Some(write) = self.scroll.scroll_to(target, behavior) {
            self.host.write_scroll_position(write);
        }
        Ok(())
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Open a view whose regions survive route changes
    pub fn open_view(&mut self, name: impl Into<String>) -> ViewId {
        self.lifecycle.open_persistent(name)
    }

    /// Close a view and remove every region registered under it
    pub fn close_view(&mut self, view: ViewId) -> Result<()> {
        let record = self.lifecycle.close(view).ok_or(ScrollError::UnknownView)?;
        self.teardown(record);
        Ok(())
    }

    /// Tear down the outgoing route and jump back to the top
    pub fn route_will_change(&mut self) {
        let write = self.scroll.reset();
        self.host.write_scroll_position(write);
        self.scheduler.cancel(DeferredTask::SettleRefresh);

        if let Some(record) = self.lifecycle.route_will_change() {
            self.teardown(record);
        }
    }

    /// Mount a new route; its geometry is refreshed once layout settles
    pub fn route_did_mount(&mut self, name: impl Into<String>) -> ViewId {
        let mounted = self.lifecycle.route_did_mount(name);
        if let Some(orphaned) = mounted.orphaned {
            self.teardown(orphaned);
        }
        self.scheduler
            .schedule(DeferredTask::SettleRefresh, self.config.settle_delay_ms);
        mounted.view
    }

    fn teardown(&mut self, record: ViewRecord) {
        let mut removed = 0;
        for id in record.regions {
            removed += self.remove_region(id).len();
        }
        self.update_limit();
        tracing::debug!(view = %record.name, regions = removed, "view torn down");
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn current_route(&self) -> Option<ViewId> {
        self.lifecycle.current_route()
    }

    // =========================================================================
    // Regions
    // =========================================================================

    /// Register a trigger region under `view`
    pub fn register(&mut self, view: ViewId, spec: TriggerSpec) -> Result<TriggerId> {
        self.ensure_running()?;
        if !self.lifecycle.contains(view) {
            return Err(ScrollError::UnknownView);
        }
        let is_pin = spec.mode.is_pin();
        let id = self.registry.register(view, spec, &self.host)?;
        self.lifecycle.track(view, id)?;
        if is_pin {
            self.pins.sync_spacing(&self.registry, &mut self.host);
            self.update_limit();
        }
        Ok(id)
    }

    /// Remove a region (and regions nested in it); false if already gone
    pub fn unregister(&mut self, id: TriggerId) -> bool {
        let removed = self.remove_region(id);
        if removed.is_empty() {
            return false;
        }
        self.update_limit();
        true
    }

    fn remove_region(&mut self, id: TriggerId) -> Vec<TriggerId> {
        let infos: Vec<_> = self
            .registry
            .ids()
            .iter()
            .map(|&id| (id, self.registry.pin_info(id)))
            .collect();
        let removed = self.registry.unregister(id);
        for gone in &removed {
            let info = infos
                .iter()
                .find(|(id, _)| id == gone)
                .and_then(|(_, info)| *info);
            if let Some(content) = self.pins.release(*gone, info, &mut self.host) {
                self.write_visual(content);
            }
        }
        self.lifecycle.untrack(&removed);
        removed
    }

    /// Override how much page scroll a pin reserves
    pub fn reserve_scroll_length(&mut self, id: TriggerId, px: f32) -> Result<()> {
        self.registry.reserve_scroll_length(id, px)?;
        self.pins.sync_spacing(&self.registry, &mut self.host);
        self.update_limit();
        Ok(())
    }

    /// Drive `element` from the region's value
    ///
    /// The binding's current sample is written immediately so the element
    /// never shows its unbound state.
    pub fn bind(&mut self, id: TriggerId, element: ElementId, binding: AnimationBinding) -> Result<()> {
        let value = self.registry.value(id).ok_or(ScrollError::UnknownRegion)?;
        let sample = binding.sample(value);
        self.registry.add_binding(id, element, binding)?;
        self.bound.insert(element, sample);
        self.write_visual(element);
        Ok(())
    }

    /// Write an element's bound state combined with any pin translation
    fn write_visual(&mut self, element: ElementId) {
        if !self.host.is_attached(element) {
            return;
        }
        let mut visual = self.bound.get(&element).copied().unwrap_or_default();
        self.pins.compose(element, &mut visual);
        self.host.apply_visual(element, &visual);
    }

    /// Undo host effects of regions that faulted since the last check
    fn retire_faulted(&mut self) -> Vec<TriggerId> {
        let faulted = self.registry.take_new_faults();
        let mut released_pin = false;
        for &id in &faulted {
            let info = self.registry.pin_info(id);
            released_pin |= info.is_some();
            if let Some(content) = self.pins.release(id, info, &mut self.host) {
                self.write_visual(content);
            }
        }
        if released_pin {
            // Later regions no longer sit behind the released spacer
            self.registry.resolve_spans();
            self.update_limit();
        }
        faulted
    }

    /// Receive the region's progress whenever it changes
    pub fn subscribe<C>(&mut self, id: TriggerId, consumer: C) -> Result<()>
    where
        C: ProgressConsumer + 'static,
    {
        self.registry
            .add_listener(id, Listener::Progress(Box::new(consumer)))
    }

    /// Receive boundary events
    pub fn on_toggle<F>(&mut self, id: TriggerId, f: F) -> Result<()>
    where
        F: FnMut(RegionEvent) + Send + 'static,
    {
        self.registry.add_listener(id, Listener::Toggle(Box::new(f)))
    }

    pub fn progress(&self, id: TriggerId) -> Option<f32> {
        self.registry.progress(id)
    }

    /// Value fed to bindings: progress, or the playhead of a toggle region
    pub fn value(&self, id: TriggerId) -> Option<f32> {
        self.registry.value(id)
    }

    pub fn position(&self, id: TriggerId) -> Option<Position> {
        self.registry.position(id)
    }

    pub fn placement(&self, id: TriggerId) -> Option<PinPlacement> {
        self.pins.placement(id)
    }

    /// Current content translation of a pinned region
    pub fn pin_translation(&self, id: TriggerId) -> Option<f32> {
        self.pins.translation(id)
    }

    pub fn scroll_state(&self) -> ScrollState {
        self.scroll.state()
    }

    /// Maximum scroll offset, including pin spacing
    pub fn scroll_limit(&self) -> f32 {
        self.scroll.limit()
    }

    // =========================================================================
    // Frames
    // =========================================================================

    /// Remeasure every region now
    pub fn refresh_all(&mut self) -> Result<RefreshReport> {
        self.ensure_running()?;
        Ok(self.refresh())
    }

    fn refresh(&mut self) -> RefreshReport {
        let report = self.registry.refresh_all(&self.host);
        self.retire_faulted();
        self.pins.sync_spacing(&self.registry, &mut self.host);
        self.update_limit();
        report
    }

    /// Run one frame at host time `now_ms`
    pub fn frame(&mut self, now_ms: f64) -> Result<FrameReport> {
        let clock = self
            .scheduler
            .begin_frame(now_ms)
            .ok_or(ScrollError::ShutDown)?;

        let tick = self.scroll.tick(clock.dt_ms);
        if let Some(write) = tick.write_native {
            self.host.write_scroll_position(write);
        }

        let mut refreshed = false;
        for task in self.scheduler.take_due(clock.now_ms) {
            tracing::debug!(?task, frame = clock.frame, "running deferred task");
            self.refresh();
            refreshed = true;
            if task == DeferredTask::SettleRefresh {
                self.lifecycle.settled();
            }
        }

        let refresh_pending = self.scheduler.is_pending(DeferredTask::SettleRefresh)
            || self.scheduler.is_pending(DeferredTask::ResizeRefresh);
        if !refresh_pending {
            self.registry.warn_if_stale();
        }

        let scroll = self.scroll.state();
        let updates = self.registry.on_frame(&scroll, clock.dt_ms, &self.host);

        let mut dirty: Vec<ElementId> = Vec::new();
        for update in &updates {
            if let Some(info) = self.registry.pin_info(update.id) {
                dirty.extend(self.pins.apply(update, info, &mut self.host));
            }
        }

        for update in updates.iter().filter(|u| u.changed) {
            for (element, binding) in self.registry.bindings(update.id) {
                self.bound.insert(*element, binding.sample(update.value));
                dirty.push(*element);
            }
        }

        dirty.sort_unstable();
        dirty.dedup();
        for element in dirty {
            self.write_visual(element);
        }

        for update in &updates {
            self.dispatch(update);
        }

        let faulted = self.retire_faulted();

        Ok(FrameReport {
            frame: clock.frame,
            dt_ms: clock.dt_ms,
            scroll,
            updates,
            refreshed,
            faulted,
        })
    }

    fn dispatch(&mut self, update: &RegionUpdate) {
        if !update.changed && update.events.is_empty() {
            return;
        }
        let Some(listeners) = self.registry.listeners_mut(update.id) else {
            return;
        };
        if listeners.is_empty() {
            return;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            for listener in listeners.iter_mut() {
                match listener {
                    Listener::Progress(consumer) if update.changed => {
                        consumer.on_progress(update.progress)
                    }
                    Listener::Toggle(f) => {
                        for event in &update.events {
                            f(*event);
                        }
                    }
                    Listener::Progress(_) => {}
                }
            }
        }));

        if result.is_err() {
            self.registry.fault(update.id, RegionFault::ListenerPanicked);
        }
    }

    /// Whether another frame would change anything without new input
    pub fn is_animating(&self) -> bool {
        self.scheduler.is_running()
            && (!self.scroll.is_settled()
                || self.registry.has_running_playheads()
                || self.scheduler.has_pending())
    }

    /// Stop the frame loop; later frames and registrations fail with `ShutDown`
    pub fn shutdown(&mut self) {
        if !self.scheduler.is_running() {
            return;
        }
        self.scheduler.shutdown();
        tracing::info!(regions = self.registry.len(), "scroll engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessHost;
    use scrollwork_core::{Bounds, Property, Size};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine() -> ScrollEngine<HeadlessHost> {
        let host = HeadlessHost::new(Size::new(1000.0, 800.0), Size::new(1000.0, 4000.0));
        ScrollEngine::new(EngineConfig::unsmoothed(), host).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let host = HeadlessHost::new(Size::new(1000.0, 800.0), Size::new(1000.0, 4000.0));
        let config = EngineConfig {
            lerp: 0.0,
            ..Default::default()
        };
        assert!(ScrollEngine::new(config, host).is_err());
    }

    #[test]
    fn test_scroll_limit_from_document() {
        let engine = engine();
        assert_eq!(engine.scroll_limit(), 3200.0);
    }

    #[test]
    fn test_register_unknown_view() {
        let mut engine = engine();
        let view = engine.open_view("temp");
        engine.close_view(view).unwrap();
        let el = engine.host_mut().insert(Bounds::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(
            engine.register(view, TriggerSpec::scrub(el)).unwrap_err(),
            ScrollError::UnknownView
        );
    }

    #[test]
    fn test_frame_drives_binding() {
        let mut engine = engine();
        let view = engine.route_did_mount("home");
        let el = engine.host_mut().insert(Bounds::new(0.0, 1200.0, 1000.0, 400.0));
        let id = engine.register(view, TriggerSpec::scrub(el)).unwrap();
        engine
            .bind(id, el, AnimationBinding::linear().from_to(Property::Opacity, 0.0, 1.0))
            .unwrap();
        assert_eq!(engine.host().visual(el).opacity, 0.0);

        engine.on_native_scroll(1000.0);
        engine.frame(0.0).unwrap();
        assert_eq!(engine.progress(id), Some(0.5));
        assert_eq!(engine.host().visual(el).opacity, 0.5);
    }

    #[test]
    fn test_panicking_listener_faults_only_its_region() {
        let mut engine = engine();
        let view = engine.open_view("page");
        let a = engine.host_mut().insert(Bounds::new(0.0, 1200.0, 1000.0, 400.0));
        let b = engine.host_mut().insert(Bounds::new(0.0, 1200.0, 1000.0, 400.0));

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let bad = engine
            .register(view, TriggerSpec::scrub(a).on_update(|_| panic!("listener bug")))
            .unwrap();
        let good = engine
            .register(
                view,
                TriggerSpec::scrub(b).on_update(move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        engine.on_native_scroll(1000.0);
        let report = engine.frame(0.0).unwrap();
        assert_eq!(report.faulted, vec![bad]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(engine.registry().is_active(good));
        assert!(!engine.registry().is_active(bad));

        engine.on_native_scroll(1100.0);
        let report = engine.frame(16.0).unwrap();
        assert!(report.update(bad).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_shutdown_rejects_frames() {
        let mut engine = engine();
        engine.frame(0.0).unwrap();
        engine.shutdown();
        assert_eq!(engine.frame(16.0), Err(ScrollError::ShutDown));
        assert!(!engine.is_animating());
        let view = engine.open_view("late");
        let el = engine.host_mut().insert(Bounds::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(
            engine.register(view, TriggerSpec::scrub(el)).unwrap_err(),
            ScrollError::ShutDown
        );
    }
}
