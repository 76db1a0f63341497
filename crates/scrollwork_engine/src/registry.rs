//! Trigger registry
//!
//! Owns every live trigger region, caches its measured geometry, and turns
//! the current scroll state into per-region progress once per frame.
//!
//! Geometry is measured on registration and on `refresh_all`, never during a
//! frame. Anything that moves layout (image or font loads, resize, route
//! change) must be followed by a refresh, otherwise regions fire at stale
//! offsets. `invalidate` records such events so frames evaluated before the
//! next refresh are reported.
//!
//! Regions are evaluated in registration order. A nested region can only be
//! registered after its container, so containers are always evaluated first
//! and children read the container's progress from the same frame.

use scrollwork_animation::{AnimationBinding, Easing, Tween};
use scrollwork_core::{Axis, Bounds, ElementId, ScrollHost, Size};
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::error::{Result, ScrollError};
use crate::lifecycle::ViewId;
use crate::trigger::{
    EndCondition, Listener, Position, RegionEvent, ReservedLength, TriggerId, TriggerMode,
    TriggerPoint, TriggerSpec,
};
use crate::virtual_scroll::ScrollState;

/// Why a region stopped being evaluated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionFault {
    /// Element left the document without the region being unregistered
    Detached,
    /// Host reported NaN or infinite geometry
    NonFiniteGeometry,
    /// A listener panicked while receiving progress or events
    ListenerPanicked,
}

/// Whether a region takes part in frames
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegionStatus {
    #[default]
    Active,
    /// Permanently inactive for the rest of the session
    Faulted(RegionFault),
}

/// Cached host measurements for a region
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    pub bounds: Bounds,
    /// Bounds of the container's pinned element, for nested regions
    pub container_bounds: Option<Bounds>,
    pub viewport: Size,
    /// Extra page scroll consumed (pins only)
    pub reserved: f32,
    /// Internal translation distance at progress 1 (pins only)
    pub travel: f32,
}

/// Resolved scroll span
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Span {
    pub start: f32,
    pub end: f32,
}

impl Span {
    /// Clamped progress of `offset` through the span
    pub fn progress(&self, offset: f32) -> f32 {
        let length = self.end - self.start;
        if length <= 0.0 {
            return if offset >= self.start { 1.0 } else { 0.0 };
        }
        ((offset - self.start) / length).clamp(0.0, 1.0)
    }

    pub fn len(&self) -> f32 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0.0
    }
}

/// Pin data the pin controller needs
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinInfo {
    pub element: ElementId,
    pub content: ElementId,
    pub axis: Axis,
    pub reserved: f32,
    pub travel: f32,
    /// Distance from the viewport's top where the element is held
    pub viewport_offset: f32,
}

/// Per-region result of one frame
#[derive(Clone, Debug, PartialEq)]
pub struct RegionUpdate {
    pub id: TriggerId,
    pub progress: f32,
    /// Value fed to bindings: progress for scrub/pin, the playhead for toggles
    pub value: f32,
    pub position: Position,
    pub events: SmallVec<[RegionEvent; 2]>,
    /// Progress or value differs from the previous frame
    pub changed: bool,
}

/// Outcome of `refresh_all`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RefreshReport {
    /// Regions re-measured, in evaluation order
    pub refreshed: Vec<TriggerId>,
    /// Regions newly faulted during the refresh
    pub faulted: Vec<TriggerId>,
}

#[derive(Clone, Copy, Debug, Default)]
struct ToggleState {
    entered_once: bool,
    playhead: f32,
    tween: Option<Tween>,
}

pub(crate) struct Region {
    element: ElementId,
    start: TriggerPoint,
    end: EndCondition,
    mode: TriggerMode,
    container: Option<TriggerId>,
    label: Option<String>,
    owner: ViewId,
    reserved_override: Option<f32>,
    measurement: Option<Measurement>,
    span: Span,
    progress: f32,
    position: Position,
    status: RegionStatus,
    toggle: ToggleState,
    bindings: Vec<(ElementId, AnimationBinding)>,
    listeners: Vec<Listener>,
}

impl Region {
    fn name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("element {}", self.element),
        }
    }

    fn is_active(&self) -> bool {
        self.status == RegionStatus::Active
    }

    fn value(&self) -> f32 {
        match self.mode {
            TriggerMode::Toggle { .. } => self.toggle.playhead,
            _ => self.progress,
        }
    }

    /// Offset in this region's internal coordinate space (pins only)
    fn internal_offset(&self) -> Option<f32> {
        let m = self.measurement?;
        self.mode.pin_spec()?;
        Some(self.progress * m.travel)
    }
}

/// Registry of live trigger regions
pub struct TriggerRegistry {
    regions: SlotMap<TriggerId, Region>,
    order: Vec<TriggerId>,
    toggle_duration_ms: f32,
    stale_reason: Option<String>,
    stale_warned: bool,
    new_faults: Vec<TriggerId>,
}

impl TriggerRegistry {
    pub fn new(toggle_duration_ms: f32) -> Self {
        Self {
            regions: SlotMap::with_key(),
            order: Vec::new(),
            toggle_duration_ms,
            stale_reason: None,
            stale_warned: false,
            new_faults: Vec::new(),
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Validate and insert a region, measuring its geometry immediately
    pub fn register<H: ScrollHost>(
        &mut self,
        owner: ViewId,
        spec: TriggerSpec,
        host: &H,
    ) -> Result<TriggerId> {
        if host.element_bounds(spec.element).is_none() {
            return Err(ScrollError::InvalidRegion(spec.element));
        }

        if let Some(parent) = spec.container {
            if spec.mode.is_pin() {
                return Err(ScrollError::NestedPin);
            }
            let parent = self
                .regions
                .get(parent)
                .ok_or(ScrollError::UnknownContainer)?;
            if !parent.mode.is_pin() {
                return Err(ScrollError::ContainerNotPinned);
            }
        }

        if let TriggerMode::Pin(pin) = spec.mode {
            if let ReservedLength::Fixed(px) = pin.length {
                if !px.is_finite() || px < 0.0 {
                    return Err(ScrollError::InvalidLength(px));
                }
            }
        }
        if let EndCondition::Distance(d) = spec.end {
            if !d.is_finite() || d < 0.0 {
                return Err(ScrollError::InvalidLength(d));
            }
        }

        let region = Region {
            element: spec.element,
            start: spec.start,
            end: spec.end,
            mode: spec.mode,
            container: spec.container,
            label: spec.label,
            owner,
            reserved_override: None,
            measurement: None,
            span: Span::default(),
            progress: 0.0,
            position: Position::Before,
            status: RegionStatus::Active,
            toggle: ToggleState::default(),
            bindings: Vec::new(),
            listeners: spec.listeners,
        };

        let id = self.regions.insert(region);
        self.order.push(id);

        if let Some(fault) = self.measure(id, host) {
            self.fault(id, fault);
        }
        self.resolve_spans();

        if let Some(region) = self.regions.get(id) {
            tracing::debug!(
                region = %region.name(),
                start = region.span.start,
                end = region.span.end,
                "registered trigger region"
            );
        }
        Ok(id)
    }

    /// Remove a region and every region nested in it
    ///
    /// Returns the ids actually removed; empty if the handle was already gone.
    pub fn unregister(&mut self, id: TriggerId) -> Vec<TriggerId> {
        if !self.regions.contains_key(id) {
            return Vec::new();
        }

        let mut removed = vec![id];
        let mut i = 0;
        while i < removed.len() {
            let parent = removed[i];
            for (child, region) in self.regions.iter() {
                if region.container == Some(parent) && !removed.contains(&child) {
                    removed.push(child);
                }
            }
            i += 1;
        }

        for id in &removed {
            if let Some(region) = self.regions.remove(*id) {
                tracing::debug!(region = %region.name(), "unregistered trigger region");
            }
        }
        self.order.retain(|id| !removed.contains(id));
        self.resolve_spans();
        removed
    }

    pub fn contains(&self, id: TriggerId) -> bool {
        self.regions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Live region ids in evaluation order
    pub fn ids(&self) -> &[TriggerId] {
        &self.order
    }

    pub fn owner(&self, id: TriggerId) -> Option<ViewId> {
        self.regions.get(id).map(|r| r.owner)
    }

    /// Override a pin's reserved length
    pub fn reserve_scroll_length(&mut self, id: TriggerId, px: f32) -> Result<()> {
        if !px.is_finite() || px < 0.0 {
            return Err(ScrollError::InvalidLength(px));
        }
        let region = self.regions.get_mut(id).ok_or(ScrollError::UnknownRegion)?;
        if !region.mode.is_pin() {
            return Err(ScrollError::NotPinned);
        }
        region.reserved_override = Some(px);
        if let Some(m) = region.measurement.as_mut() {
            m.reserved = px;
        }
        self.resolve_spans();
        Ok(())
    }

    pub(crate) fn add_binding(
        &mut self,
        id: TriggerId,
        element: ElementId,
        binding: AnimationBinding,
    ) -> Result<()> {
        let region = self.regions.get_mut(id).ok_or(ScrollError::UnknownRegion)?;
        region.bindings.push((element, binding));
        Ok(())
    }

    pub(crate) fn add_listener(&mut self, id: TriggerId, listener: Listener) -> Result<()> {
        let region = self.regions.get_mut(id).ok_or(ScrollError::UnknownRegion)?;
        region.listeners.push(listener);
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn progress(&self, id: TriggerId) -> Option<f32> {
        self.regions.get(id).map(|r| r.progress)
    }

    pub fn value(&self, id: TriggerId) -> Option<f32> {
        self.regions.get(id).map(|r| r.value())
    }

    pub fn position(&self, id: TriggerId) -> Option<Position> {
        self.regions.get(id).map(|r| r.position)
    }

    pub fn span(&self, id: TriggerId) -> Option<Span> {
        self.regions.get(id).map(|r| r.span)
    }

    pub fn status(&self, id: TriggerId) -> Option<RegionStatus> {
        self.regions.get(id).map(|r| r.status)
    }

    pub fn measurement(&self, id: TriggerId) -> Option<Measurement> {
        self.regions.get(id).and_then(|r| r.measurement)
    }

    pub fn element(&self, id: TriggerId) -> Option<ElementId> {
        self.regions.get(id).map(|r| r.element)
    }

    pub fn mode(&self, id: TriggerId) -> Option<TriggerMode> {
        self.regions.get(id).map(|r| r.mode)
    }

    pub fn label(&self, id: TriggerId) -> Option<&str> {
        self.regions.get(id).and_then(|r| r.label.as_deref())
    }

    pub fn is_active(&self, id: TriggerId) -> bool {
        self.regions.get(id).is_some_and(|r| r.is_active())
    }

    pub fn pin_info(&self, id: TriggerId) -> Option<PinInfo> {
        let region = self.regions.get(id)?;
        let pin = region.mode.pin_spec()?;
        let m = region.measurement?;
        Some(PinInfo {
            element: region.element,
            content: pin.content.unwrap_or(region.element),
            axis: pin.axis,
            reserved: m.reserved,
            travel: m.travel,
            viewport_offset: region.start.viewport.resolve(m.viewport.height),
        })
    }

    pub(crate) fn bindings(&self, id: TriggerId) -> &[(ElementId, AnimationBinding)] {
        self.regions
            .get(id)
            .map(|r| r.bindings.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn listeners_mut(&mut self, id: TriggerId) -> Option<&mut Vec<Listener>> {
        self.regions.get_mut(id).map(|r| &mut r.listeners)
    }

    /// Total page scroll reserved by active top-level pins
    pub fn total_pin_spacing(&self) -> f32 {
        self.order
            .iter()
            .filter_map(|id| self.regions.get(*id))
            .filter(|r| r.is_active() && r.container.is_none() && r.mode.is_pin())
            .filter_map(|r| r.measurement.map(|m| m.reserved))
            .sum()
    }

    /// Whether any toggle playhead is still moving
    pub fn has_running_playheads(&self) -> bool {
        self.regions
            .values()
            .any(|r| r.is_active() && r.toggle.tween.is_some())
    }

    // =========================================================================
    // Faults and staleness
    // =========================================================================

    /// Deactivate a region for the rest of the session
    pub fn fault(&mut self, id: TriggerId, fault: RegionFault) {
        if let Some(region) = self.regions.get_mut(id) {
            if region.is_active() {
                tracing::warn!(
                    region = %region.name(),
                    ?fault,
                    "trigger region deactivated"
                );
                region.status = RegionStatus::Faulted(fault);
                region.toggle.tween = None;
                self.new_faults.push(id);
            }
        }
    }

    /// Flag that layout changed and cached geometry may be stale
    pub fn invalidate(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(%reason, "layout invalidated");
        if self.stale_reason.is_none() {
            self.stale_warned = false;
        }
        self.stale_reason = Some(reason);
    }

    pub fn is_stale(&self) -> bool {
        self.stale_reason.is_some()
    }

    /// Warn once per invalidation when frames run on stale geometry
    ///
    /// Returns true when the warning was emitted by this call.
    pub fn warn_if_stale(&mut self) -> bool {
        match &self.stale_reason {
            Some(reason) if !self.stale_warned => {
                tracing::warn!(
                    %reason,
                    "evaluating trigger regions against stale geometry; refresh_all() has not run since layout changed"
                );
                self.stale_warned = true;
                true
            }
            _ => false,
        }
    }

    /// Regions faulted since the last call
    pub fn take_new_faults(&mut self) -> Vec<TriggerId> {
        std::mem::take(&mut self.new_faults)
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// Re-measure every region against the host and re-resolve spans
    pub fn refresh_all<H: ScrollHost>(&mut self, host: &H) -> RefreshReport {
        let mut report = RefreshReport::default();

        for id in self.order.clone() {
            if !self.is_active(id) {
                continue;
            }
            match self.measure(id, host) {
                Some(fault) => {
                    self.fault(id, fault);
                    report.faulted.push(id);
                }
                None => report.refreshed.push(id),
            }
        }

        self.resolve_spans();
        self.stale_reason = None;
        self.stale_warned = false;

        tracing::debug!(
            refreshed = report.refreshed.len(),
            faulted = report.faulted.len(),
            "refreshed trigger geometry"
        );
        report
    }

    /// Read host geometry for one region; returns a fault if it cannot be used
    fn measure<H: ScrollHost>(&mut self, id: TriggerId, host: &H) -> Option<RegionFault> {
        let (element, container, mode, reserved_override) = {
            let r = self.regions.get(id)?;
            (r.element, r.container, r.mode, r.reserved_override)
        };

        let Some(bounds) = host.element_bounds(element) else {
            return Some(RegionFault::Detached);
        };
        let viewport = host.viewport();
        if !bounds.is_finite() || !viewport.is_finite() {
            return Some(RegionFault::NonFiniteGeometry);
        }

        let container_bounds = match container {
            Some(parent) => {
                let parent_element = self.regions.get(parent)?.element;
                match host.element_bounds(parent_element) {
                    Some(b) if b.is_finite() => Some(b),
                    Some(_) => return Some(RegionFault::NonFiniteGeometry),
                    None => return Some(RegionFault::Detached),
                }
            }
            None => None,
        };

        let (reserved, travel) = match mode {
            TriggerMode::Pin(pin) => {
                let content = pin.content.unwrap_or(element);
                let viewport_extent = viewport.along(pin.axis);
                let overflow = host
                    .content_extent(content)
                    .filter(|s| s.is_finite())
                    .map(|s| (s.along(pin.axis) - viewport_extent).max(0.0));
                let reserved = match (reserved_override, pin.length) {
                    (Some(px), _) => px,
                    (None, ReservedLength::Fixed(px)) => px,
                    (None, ReservedLength::ContentOverflow) => overflow.unwrap_or(0.0),
                };
                (reserved, overflow.unwrap_or(reserved))
            }
            _ => (0.0, 0.0),
        };

        if let Some(region) = self.regions.get_mut(id) {
            if let Some(previous) = region.measurement {
                if region.mode.is_pin() && previous.reserved != reserved {
                    tracing::debug!(
                        region = %region.name(),
                        from = previous.reserved,
                        to = reserved,
                        "pin reserved length changed"
                    );
                }
            }
            region.measurement = Some(Measurement {
                bounds,
                container_bounds,
                viewport,
                reserved,
                travel,
            });
        }
        None
    }

    /// Recompute every span from cached measurements
    ///
    /// Top-level pins push everything laid out after them down by their
    /// reserved length, so spans are resolved against shifted positions.
    pub(crate) fn resolve_spans(&mut self) {
        let pins: SmallVec<[(TriggerId, f32, f32); 4]> = self
            .order
            .iter()
            .filter_map(|id| {
                let r = self.regions.get(*id)?;
                if !r.is_active() || r.container.is_some() || !r.mode.is_pin() {
                    return None;
                }
                let m = r.measurement?;
                Some((*id, m.bounds.end(Axis::Vertical), m.reserved))
            })
            .collect();

        let mut spans: SmallVec<[(TriggerId, Span); 16]> = SmallVec::new();
        for id in &self.order {
            let Some(region) = self.regions.get(*id) else {
                continue;
            };
            let Some(m) = region.measurement else {
                continue;
            };

            let (element_start, element_extent, viewport_extent) = match region.container {
                None => {
                    let natural = m.bounds.start(Axis::Vertical);
                    let shift: f32 = pins
                        .iter()
                        .filter(|(pin, pin_end, _)| pin != id && *pin_end <= natural)
                        .map(|(_, _, reserved)| *reserved)
                        .sum();
                    (
                        natural + shift,
                        m.bounds.extent(Axis::Vertical),
                        m.viewport.height,
                    )
                }
                Some(parent) => {
                    let axis = self
                        .regions
                        .get(parent)
                        .and_then(|p| p.mode.pin_spec())
                        .map(|pin| pin.axis)
                        .unwrap_or_default();
                    let origin = m.container_bounds.map(|b| b.start(axis)).unwrap_or(0.0);
                    (
                        m.bounds.start(axis) - origin,
                        m.bounds.extent(axis),
                        m.viewport.along(axis),
                    )
                }
            };

            let start = region
                .start
                .resolve(element_start, element_extent, viewport_extent);
            let end = match (region.mode, region.end) {
                (TriggerMode::Pin(_), _) => start + m.reserved,
                (_, EndCondition::Distance(d)) => start + d,
                (_, EndCondition::Point(point)) => {
                    point.resolve(element_start, element_extent, viewport_extent)
                }
            };
            spans.push((*id, Span { start, end }));
        }

        for (id, span) in spans {
            if let Some(region) = self.regions.get_mut(id) {
                region.span = span;
            }
        }
    }

    // =========================================================================
    // Frame evaluation
    // =========================================================================

    /// Recompute progress for every active region
    pub fn on_frame<H: ScrollHost>(
        &mut self,
        scroll: &ScrollState,
        dt_ms: f32,
        host: &H,
    ) -> Vec<RegionUpdate> {
        let mut updates = Vec::with_capacity(self.order.len());

        for index in 0..self.order.len() {
            let id = self.order[index];
            let Some(region) = self.regions.get(id) else {
                continue;
            };
            if !region.is_active() {
                continue;
            }
            if !host.is_attached(region.element) {
                self.fault(id, RegionFault::Detached);
                continue;
            }

            let offset = match region.container {
                None => Some(scroll.smoothed_offset),
                Some(parent) => self
                    .regions
                    .get(parent)
                    .filter(|p| p.is_active())
                    .and_then(|p| p.internal_offset()),
            };
            let Some(offset) = offset else {
                continue;
            };

            let toggle_duration = self.toggle_duration_ms;
            let Some(region) = self.regions.get_mut(id) else {
                continue;
            };

            let span = region.span;
            if !span.start.is_finite() || !span.end.is_finite() || !offset.is_finite() {
                self.fault(id, RegionFault::NonFiniteGeometry);
                continue;
            }

            let progress = span.progress(offset);
            let position = Position::classify(offset, span.start, span.end);
            let mut events = region.position.transition(position);
            let previous_value = region.value();
            let previous_progress = region.progress;

            if let TriggerMode::Toggle { reset } = region.mode {
                events = filter_toggle_events(&mut region.toggle, reset, events);
                step_toggle(&mut region.toggle, &events, toggle_duration, dt_ms);
            }

            region.progress = progress;
            region.position = position;
            let value = region.value();

            updates.push(RegionUpdate {
                id,
                progress,
                value,
                position,
                changed: progress != previous_progress || value != previous_value,
                events,
            });
        }

        updates
    }
}

/// Apply `reset` semantics: without reset only the first enter is reported
fn filter_toggle_events(
    toggle: &mut ToggleState,
    reset: bool,
    events: SmallVec<[RegionEvent; 2]>,
) -> SmallVec<[RegionEvent; 2]> {
    if reset {
        return events;
    }
    let mut kept = SmallVec::new();
    if !toggle.entered_once && events.contains(&RegionEvent::Enter) {
        toggle.entered_once = true;
        kept.push(RegionEvent::Enter);
    }
    kept
}

/// Drive the toggle playhead: forward on enter, back on leave-back
fn step_toggle(toggle: &mut ToggleState, events: &[RegionEvent], duration_ms: f32, dt_ms: f32) {
    let target = events.iter().rev().find_map(|event| match event {
        RegionEvent::Enter | RegionEvent::EnterBack => Some(1.0),
        RegionEvent::LeaveBack => Some(0.0),
        RegionEvent::Leave => None,
    });

    if let Some(target) = target {
        let distance = (target - toggle.playhead).abs();
        if distance > 0.0 {
            toggle.tween = Some(Tween::new(
                toggle.playhead,
                target,
                duration_ms * distance,
                Easing::Linear,
            ));
        }
    }

    if let Some(tween) = toggle.tween.as_mut() {
        toggle.playhead = tween.advance(dt_ms);
        if tween.is_finished() {
            toggle.tween = None;
        }
    }
}
