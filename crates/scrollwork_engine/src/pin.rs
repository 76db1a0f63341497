//! Pin controller
//!
//! Performs the host writes for pinned regions: the page spacing that
//! reserves a pin's scroll length and the fixed/flow placement of the pinned
//! element. It also tracks the internal translation of each pin's content.
//! Both are derived from the region's current position and progress, so the
//! same scroll offset always produces the same result in either direction.
//!
//! Content translation is not written here. The engine folds it into the
//! content element's bound visual state with [`PinController::compose`] so
//! each element receives one complete visual write per frame.

use rustc_hash::FxHashMap;
use scrollwork_core::{Axis, ElementId, PinPlacement, ScrollHost, VisualState};

use crate::registry::{PinInfo, RegionUpdate, TriggerRegistry};
use crate::trigger::{Position, TriggerId};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct PinState {
    placement: PinPlacement,
    spacing: Option<f32>,
    translation: Option<f32>,
    content: Option<(ElementId, Axis)>,
}

/// Host-side effects of pinned regions
#[derive(Debug, Default)]
pub struct PinController {
    pins: FxHashMap<TriggerId, PinState>,
}

impl PinController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write reserved lengths for every active pin whose spacing changed
    pub fn sync_spacing<H: ScrollHost>(&mut self, registry: &TriggerRegistry, host: &mut H) {
        for &id in registry.ids() {
            if !registry.is_active(id) {
                continue;
            }
            let Some(info) = registry.pin_info(id) else {
                continue;
            };
            let state = self.pins.entry(id).or_default();
            if state.spacing != Some(info.reserved) {
                host.set_pin_spacing(info.element, info.reserved);
                state.spacing = Some(info.reserved);
            }
        }
    }

    /// Apply one frame's result to a pinned region
    ///
    /// Placement is written directly. Returns the content element when its
    /// translation changed and it needs a new visual write.
    pub fn apply<H: ScrollHost>(
        &mut self,
        update: &RegionUpdate,
        info: PinInfo,
        host: &mut H,
    ) -> Option<ElementId> {
        let state = self.pins.entry(update.id).or_default();

        let placement = match update.position {
            Position::Before => PinPlacement::Flow,
            Position::Inside => PinPlacement::Pinned {
                viewport_offset: info.viewport_offset,
            },
            Position::After => PinPlacement::Released {
                shift: info.reserved,
            },
        };
        if state.placement != placement {
            tracing::trace!(element = %info.element, ?placement, "pin placement");
            host.set_pin_placement(info.element, placement);
            state.placement = placement;
        }

        state.content = Some((info.content, info.axis));
        let translation = -update.progress * info.travel;
        if state.translation == Some(translation) {
            return None;
        }
        state.translation = Some(translation);
        Some(info.content)
    }

    /// Add the translation of every pin whose content is `element`
    pub fn compose(&self, element: ElementId, visual: &mut VisualState) {
        for state in self.pins.values() {
            let (Some((content, axis)), Some(translation)) = (state.content, state.translation)
            else {
                continue;
            };
            if content != element {
                continue;
            }
            match axis {
                Axis::Horizontal => visual.translate_x += translation,
                Axis::Vertical => visual.translate_y += translation,
            }
        }
    }

    /// Restore a removed or faulted pin's element to normal flow
    ///
    /// Returns the content element when its translation must be rewritten.
    pub fn release<H: ScrollHost>(
        &mut self,
        id: TriggerId,
        info: Option<PinInfo>,
        host: &mut H,
    ) -> Option<ElementId> {
        let state = self.pins.remove(&id)?;
        let info = info?;
        if !host.is_attached(info.element) {
            return None;
        }
        tracing::debug!(element = %info.element, "pin released");
        if state.placement != PinPlacement::Flow {
            host.set_pin_placement(info.element, PinPlacement::Flow);
        }
        if state.spacing.is_some_and(|s| s != 0.0) {
            host.set_pin_spacing(info.element, 0.0);
        }
        if state.translation.is_some_and(|t| t != 0.0) && host.is_attached(info.content) {
            Some(info.content)
        } else {
            None
        }
    }

    pub fn placement(&self, id: TriggerId) -> Option<PinPlacement> {
        self.pins.get(&id).map(|s| s.placement)
    }

    /// Current content translation along the pin axis
    pub fn translation(&self, id: TriggerId) -> Option<f32> {
        self.pins.get(&id).and_then(|s| s.translation)
    }

    pub fn spacing(&self, id: TriggerId) -> Option<f32> {
        self.pins.get(&id).and_then(|s| s.spacing)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}
