//! Headless host
//!
//! An in-memory document for tests, the scenario runner, and any embedding
//! that wants to drive the engine without a renderer. Elements are plain
//! bounding boxes; every write the engine performs is recorded so it can be
//! inspected afterwards.

use rustc_hash::FxHashMap;
use scrollwork_core::{Bounds, ElementId, PinPlacement, ScrollHost, Size, VisualState};

#[derive(Clone, Copy, Debug)]
struct HeadlessElement {
    bounds: Bounds,
    content: Option<Size>,
    attached: bool,
}

/// In-memory `ScrollHost`
#[derive(Clone, Debug)]
pub struct HeadlessHost {
    viewport: Size,
    document: Size,
    elements: FxHashMap<ElementId, HeadlessElement>,
    next_id: u64,
    scroll_position: f32,
    scroll_writes: Vec<f32>,
    placements: FxHashMap<ElementId, PinPlacement>,
    spacing: FxHashMap<ElementId, f32>,
    visuals: FxHashMap<ElementId, VisualState>,
}

impl HeadlessHost {
    pub fn new(viewport: Size, document: Size) -> Self {
        Self {
            viewport,
            document,
            elements: FxHashMap::default(),
            next_id: 1,
            scroll_position: 0.0,
            scroll_writes: Vec::new(),
            placements: FxHashMap::default(),
            spacing: FxHashMap::default(),
            visuals: FxHashMap::default(),
        }
    }

    /// Add an element with an auto-assigned id
    pub fn insert(&mut self, bounds: Bounds) -> ElementId {
        while self.elements.contains_key(&ElementId(self.next_id)) {
            self.next_id += 1;
        }
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.insert_with_id(id, bounds);
        id
    }

    /// Add or replace an element under a caller-chosen id
    pub fn insert_with_id(&mut self, id: ElementId, bounds: Bounds) {
        self.elements.insert(
            id,
            HeadlessElement {
                bounds,
                content: None,
                attached: true,
            },
        );
    }

    /// Builder form of `set_content_extent`
    pub fn with_content(mut self, element: ElementId, content: Size) -> Self {
        self.set_content_extent(element, content);
        self
    }

    pub fn set_content_extent(&mut self, element: ElementId, content: Size) {
        if let Some(el) = self.elements.get_mut(&element) {
            el.content = Some(content);
        }
    }

    pub fn set_bounds(&mut self, element: ElementId, bounds: Bounds) {
        if let Some(el) = self.elements.get_mut(&element) {
            el.bounds = bounds;
        }
    }

    /// Remove an element from the document without telling the engine
    pub fn detach(&mut self, element: ElementId) {
        if let Some(el) = self.elements.get_mut(&element) {
            el.attached = false;
        }
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn set_document(&mut self, document: Size) {
        self.document = document;
    }

    /// Last native scroll position written by the engine
    pub fn scroll_position(&self) -> f32 {
        self.scroll_position
    }

    /// Every native scroll write, oldest first
    pub fn scroll_writes(&self) -> &[f32] {
        &self.scroll_writes
    }

    pub fn placement(&self, element: ElementId) -> PinPlacement {
        self.placements.get(&element).copied().unwrap_or_default()
    }

    pub fn spacing(&self, element: ElementId) -> f32 {
        self.spacing.get(&element).copied().unwrap_or(0.0)
    }

    /// Sum of all reserved pin spacing
    pub fn total_spacing(&self) -> f32 {
        self.spacing.values().sum()
    }

    /// Last visual state applied to an element, identity if none
    pub fn visual(&self, element: ElementId) -> VisualState {
        self.visuals.get(&element).copied().unwrap_or_default()
    }
}

impl ScrollHost for HeadlessHost {
    fn viewport(&self) -> Size {
        self.viewport
    }

    fn document_extent(&self) -> Size {
        self.document
    }

    fn element_bounds(&self, element: ElementId) -> Option<Bounds> {
        self.elements
            .get(&element)
            .filter(|el| el.attached)
            .map(|el| el.bounds)
    }

    fn content_extent(&self, element: ElementId) -> Option<Size> {
        let el = self.elements.get(&element).filter(|el| el.attached)?;
        Some(el.content.unwrap_or_else(|| el.bounds.size()))
    }

    fn write_scroll_position(&mut self, offset: f32) {
        self.scroll_position = offset;
        self.scroll_writes.push(offset);
    }

    fn set_pin_placement(&mut self, element: ElementId, placement: PinPlacement) {
        self.placements.insert(element, placement);
    }

    fn set_pin_spacing(&mut self, element: ElementId, spacing: f32) {
        self.spacing.insert(element, spacing);
    }

    fn apply_visual(&mut self, element: ElementId, state: &VisualState) {
        self.visuals.insert(element, *state);
    }
}
