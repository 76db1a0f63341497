//! Host environment interface
//!
//! The host is whatever owns the real document: a browser binding, a native
//! UI toolkit, or the headless document used in tests. The engine reads
//! geometry through it and performs exactly four kinds of writes: the native
//! scroll position, pin placement, pin spacing, and bound visual state.

use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, Size};
use crate::visual::VisualState;

/// Non-owning handle to a host element
///
/// The element's lifetime belongs to the view that created it. Once the host
/// no longer resolves the id, the element is considered detached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Layout mode the pin controller assigns to a pinned element
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum PinPlacement {
    /// Normal document flow (scroll has not reached the pin yet)
    #[default]
    Flow,
    /// Fixed on screen, `viewport_offset` px from the viewport's leading edge
    Pinned { viewport_offset: f32 },
    /// Normal flow, pushed down by `shift` px to sit at the end of its spacer
    Released { shift: f32 },
}

impl PinPlacement {
    pub fn is_pinned(&self) -> bool {
        matches!(self, PinPlacement::Pinned { .. })
    }
}

/// Everything the scroll engine needs from its environment
pub trait ScrollHost {
    /// Current viewport size
    fn viewport(&self) -> Size;

    /// Natural document size, without any pin spacing
    fn document_extent(&self) -> Size;

    /// Natural layout bounds of an element in document coordinates
    ///
    /// Excludes pin spacing and transforms: the engine applies the shift of
    /// earlier pins itself, so bounds already moved by a spacer would be
    /// shifted twice.
    ///
    /// Returns `None` when the element is detached or unknown.
    fn element_bounds(&self, element: ElementId) -> Option<Bounds>;

    /// Intrinsic scroll size of an element's content (scrollWidth/scrollHeight)
    fn content_extent(&self, element: ElementId) -> Option<Size>;

    /// Whether the element is still part of the document
    fn is_attached(&self, element: ElementId) -> bool {
        self.element_bounds(element).is_some()
    }

    /// Move the native scroll position
    fn write_scroll_position(&mut self, offset: f32);

    /// Switch a pinned element between flow and fixed placement
    fn set_pin_placement(&mut self, element: ElementId, placement: PinPlacement);

    /// Reserve `spacing` px of extra scroll distance after an element
    fn set_pin_spacing(&mut self, element: ElementId, spacing: f32);

    /// Apply resolved presentation state to an element
    fn apply_visual(&mut self, element: ElementId, state: &VisualState);
}
