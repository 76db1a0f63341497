//! Trigger region definitions
//!
//! A trigger region is a span of scroll offsets bound to an element. Its
//! start and end are declared as pairs of anchors, one on the element and
//! one on the viewport: `"top 80%"` means "when the element's top reaches
//! 80% of the viewport height".
//!
//! # Example
//!
//! ```rust
//! use scrollwork_core::ElementId;
//! use scrollwork_engine::{TriggerPoint, TriggerSpec};
//!
//! let start: TriggerPoint = "top 80%".parse().unwrap();
//! let spec = TriggerSpec::scrub(ElementId(7))
//!     .start(start)
//!     .end("bottom 20%".parse().unwrap())
//!     .on_update(|progress| println!("progress {progress:.2}"));
//! assert!(spec.container_region().is_none());
//! ```

use std::fmt;
use std::str::FromStr;

use scrollwork_core::{Axis, ElementId};
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use smallvec::{smallvec, SmallVec};

use crate::consumers::ProgressConsumer;
use crate::error::ParseTriggerError;

new_key_type! {
    /// Handle to a registered trigger region
    pub struct TriggerId;
}

// ============================================================================
// Anchors
// ============================================================================

/// Reference edge within an element or the viewport
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Edge {
    /// Top (or left on a horizontal axis)
    Start,
    Center,
    /// Bottom (or right on a horizontal axis)
    End,
    /// Fraction of the extent, 0.8 for "80%"
    Fraction(f32),
    /// Fixed distance from the leading edge
    Pixels(f32),
}

impl Edge {
    fn resolve(&self, extent: f32) -> f32 {
        match *self {
            Edge::Start => 0.0,
            Edge::Center => extent * 0.5,
            Edge::End => extent,
            Edge::Fraction(f) => extent * f,
            Edge::Pixels(px) => px,
        }
    }
}

/// An edge plus a pixel adjustment (`"top+=100"`)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub edge: Edge,
    pub offset: f32,
}

impl Anchor {
    pub const START: Anchor = Anchor::new(Edge::Start);
    pub const CENTER: Anchor = Anchor::new(Edge::Center);
    pub const END: Anchor = Anchor::new(Edge::End);

    pub const fn new(edge: Edge) -> Self {
        Self { edge, offset: 0.0 }
    }

    pub const fn fraction(fraction: f32) -> Self {
        Self::new(Edge::Fraction(fraction))
    }

    pub const fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    /// Distance of this anchor from the leading edge of something `extent` long
    pub fn resolve(&self, extent: f32) -> f32 {
        self.edge.resolve(extent) + self.offset
    }
}

fn parse_number(raw: &str, whole: &str) -> Result<f32, ParseTriggerError> {
    raw.trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseTriggerError::InvalidOffset(whole.to_string()))
}

impl FromStr for Anchor {
    type Err = ParseTriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseTriggerError::Empty);
        }

        let (head, offset) = match s.find("+=").or_else(|| s.find("-=")) {
            Some(idx) => {
                let magnitude = parse_number(&s[idx + 2..], s)?;
                let sign = if s[idx..].starts_with('-') { -1.0 } else { 1.0 };
                (&s[..idx], sign * magnitude)
            }
            None => (s, 0.0),
        };

        let edge = match head.to_ascii_lowercase().as_str() {
            "top" | "left" | "start" => Edge::Start,
            "center" | "middle" => Edge::Center,
            "bottom" | "right" | "end" => Edge::End,
            other => {
                if let Some(pct) = other.strip_suffix('%') {
                    Edge::Fraction(parse_number(pct, s)? / 100.0)
                } else if let Some(px) = other.strip_suffix("px") {
                    Edge::Pixels(parse_number(px, s)?)
                } else if let Ok(px) = other.parse::<f32>() {
                    Edge::Pixels(px)
                } else {
                    return Err(ParseTriggerError::UnknownEdge(head.to_string()));
                }
            }
        };

        Ok(Anchor { edge, offset })
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.edge {
            Edge::Start => write!(f, "top")?,
            Edge::Center => write!(f, "center")?,
            Edge::End => write!(f, "bottom")?,
            Edge::Fraction(v) => write!(f, "{}%", v * 100.0)?,
            Edge::Pixels(v) => write!(f, "{v}px")?,
        }
        if self.offset > 0.0 {
            write!(f, "+={}", self.offset)?;
        } else if self.offset < 0.0 {
            write!(f, "-={}", -self.offset)?;
        }
        Ok(())
    }
}

// ============================================================================
// Trigger Points
// ============================================================================

/// "Element anchor meets viewport anchor"
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerPoint {
    pub element: Anchor,
    pub viewport: Anchor,
}

impl TriggerPoint {
    pub const fn new(element: Anchor, viewport: Anchor) -> Self {
        Self { element, viewport }
    }

    /// Element top reaches viewport top
    pub const fn top_top() -> Self {
        Self::new(Anchor::START, Anchor::START)
    }

    /// Element top reaches viewport bottom (the element starts to show)
    pub const fn top_bottom() -> Self {
        Self::new(Anchor::START, Anchor::END)
    }

    /// Element bottom reaches viewport top (the element has left)
    pub const fn bottom_top() -> Self {
        Self::new(Anchor::END, Anchor::START)
    }

    /// Scroll offset at which the two anchors coincide
    pub fn resolve(&self, element_start: f32, element_extent: f32, viewport_extent: f32) -> f32 {
        element_start + self.element.resolve(element_extent) - self.viewport.resolve(viewport_extent)
    }
}

impl FromStr for TriggerPoint {
    type Err = ParseTriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: SmallVec<[&str; 2]> = s.split_whitespace().collect();
        match tokens.as_slice() {
            [] => Err(ParseTriggerError::Empty),
            [both] => {
                let anchor: Anchor = both.parse()?;
                Ok(Self::new(anchor, anchor))
            }
            [element, viewport] => Ok(Self::new(element.parse()?, viewport.parse()?)),
            _ => Err(ParseTriggerError::Arity(s.to_string())),
        }
    }
}

impl fmt::Display for TriggerPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.element, self.viewport)
    }
}

/// Where a region ends
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EndCondition {
    Point(TriggerPoint),
    /// Fixed scroll distance after the start (`"+=1600"`)
    Distance(f32),
}

impl FromStr for EndCondition {
    type Err = ParseTriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.strip_prefix("+=") {
            Some(distance) => {
                let d = parse_number(distance.trim_end_matches("px"), trimmed)?;
                if d < 0.0 {
                    return Err(ParseTriggerError::InvalidOffset(trimmed.to_string()));
                }
                Ok(EndCondition::Distance(d))
            }
            None => Ok(EndCondition::Point(trimmed.parse()?)),
        }
    }
}

// ============================================================================
// Modes
// ============================================================================

/// How much extra page scroll a pin consumes
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservedLength {
    /// Content extent minus viewport extent along the pin axis
    #[default]
    ContentOverflow,
    /// A fixed number of pixels
    Fixed(f32),
}

/// Pin configuration
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PinSpec {
    /// Axis of the internal transform (horizontal rail, vertical timeline)
    pub axis: Axis,
    /// Extra page scroll to reserve
    pub length: ReservedLength,
    /// Element whose content is measured and translated; the pinned element
    /// itself when `None`
    pub content: Option<ElementId>,
}

impl PinSpec {
    /// Horizontal rail translating `content` sideways
    pub fn horizontal(content: ElementId) -> Self {
        Self {
            axis: Axis::Horizontal,
            length: ReservedLength::ContentOverflow,
            content: Some(content),
        }
    }

    /// Vertical timeline translating `content` upward
    pub fn vertical(content: ElementId) -> Self {
        Self {
            axis: Axis::Vertical,
            length: ReservedLength::ContentOverflow,
            content: Some(content),
        }
    }

    pub fn length(mut self, length: ReservedLength) -> Self {
        self.length = length;
        self
    }
}

/// Behavior of a trigger region
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TriggerMode {
    /// Binary enter/leave
    ///
    /// With `reset` every boundary event is reported and the playhead
    /// reverses on leave-back. Without it the region fires a single `Enter`
    /// and drops every later event, so it plays once per session.
    Toggle { reset: bool },
    /// Continuous progress every frame
    Scrub,
    /// Scrub plus a fixed on-screen position while the span is crossed
    Pin(PinSpec),
}

impl TriggerMode {
    pub fn is_pin(&self) -> bool {
        matches!(self, TriggerMode::Pin(_))
    }

    pub fn pin_spec(&self) -> Option<&PinSpec> {
        match self {
            TriggerMode::Pin(spec) => Some(spec),
            _ => None,
        }
    }
}

// ============================================================================
// Region events
// ============================================================================

/// Crossing of a region boundary
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegionEvent {
    /// Crossed the start scrolling forward
    Enter,
    /// Crossed the end scrolling forward
    Leave,
    /// Crossed the end scrolling backward
    EnterBack,
    /// Crossed the start scrolling backward
    LeaveBack,
}

/// Offset relative to a region's span
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Position {
    #[default]
    Before,
    Inside,
    After,
}

impl Position {
    pub fn classify(offset: f32, start: f32, end: f32) -> Self {
        if offset < start {
            Position::Before
        } else if offset > end {
            Position::After
        } else {
            Position::Inside
        }
    }

    /// Boundary events crossed moving from `self` to `next`
    pub fn transition(self, next: Position) -> SmallVec<[RegionEvent; 2]> {
        use Position::*;
        use RegionEvent::*;
        match (self, next) {
            (Before, Inside) => smallvec![Enter],
            (Inside, After) => smallvec![Leave],
            (Before, After) => smallvec![Enter, Leave],
            (After, Inside) => smallvec![EnterBack],
            (Inside, Before) => smallvec![LeaveBack],
            (After, Before) => smallvec![EnterBack, LeaveBack],
            _ => SmallVec::new(),
        }
    }
}

// ============================================================================
// Trigger specification
// ============================================================================

pub(crate) enum Listener {
    Progress(Box<dyn ProgressConsumer>),
    Toggle(Box<dyn FnMut(RegionEvent) + Send>),
}

/// Declarative description of a region, consumed by `register`
pub struct TriggerSpec {
    pub(crate) element: ElementId,
    pub(crate) start: TriggerPoint,
    pub(crate) end: EndCondition,
    pub(crate) mode: TriggerMode,
    pub(crate) container: Option<TriggerId>,
    pub(crate) label: Option<String>,
    pub(crate) listeners: Vec<Listener>,
}

impl TriggerSpec {
    fn with_mode(element: ElementId, mode: TriggerMode) -> Self {
        let (start, end) = if mode.is_pin() {
            (TriggerPoint::top_top(), EndCondition::Distance(0.0))
        } else {
            (
                TriggerPoint::top_bottom(),
                EndCondition::Point(TriggerPoint::bottom_top()),
            )
        };
        Self {
            element,
            start,
            end,
            mode,
            container: None,
            label: None,
            listeners: Vec::new(),
        }
    }

    /// One-shot or replaying enter/leave region
    pub fn toggle(element: ElementId, reset: bool) -> Self {
        Self::with_mode(element, TriggerMode::Toggle { reset })
    }

    /// Continuous progress region
    pub fn scrub(element: ElementId) -> Self {
        Self::with_mode(element, TriggerMode::Scrub)
    }

    /// Pinned region; its end is always start + reserved length
    pub fn pin(element: ElementId, pin: PinSpec) -> Self {
        Self::with_mode(element, TriggerMode::Pin(pin))
    }

    pub fn start(mut self, start: TriggerPoint) -> Self {
        self.start = start;
        self
    }

    /// Ignored for pinned regions
    pub fn end(mut self, end: EndCondition) -> Self {
        self.end = end;
        self
    }

    /// Evaluate against a pinned parent's internal scroll instead of the page
    pub fn container(mut self, parent: TriggerId) -> Self {
        self.container = Some(parent);
        self
    }

    /// Name used in logs
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Receive progress whenever it changes
    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: FnMut(f32) + Send + 'static,
    {
        self.listeners.push(Listener::Progress(Box::new(f)));
        self
    }

    /// Receive enter/leave events
    pub fn on_toggle<F>(mut self, f: F) -> Self
    where
        F: FnMut(RegionEvent) + Send + 'static,
    {
        self.listeners.push(Listener::Toggle(Box::new(f)));
        self
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn mode(&self) -> TriggerMode {
        self.mode
    }

    pub fn container_region(&self) -> Option<TriggerId> {
        self.container
    }
}

impl fmt::Debug for TriggerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerSpec")
            .field("element", &self.element)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("mode", &self.mode)
            .field("container", &self.container)
            .field("label", &self.label)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
