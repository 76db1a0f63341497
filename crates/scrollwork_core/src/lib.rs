//! Scrollwork Core
//!
//! Foundational types shared by the scroll engine and its hosts:
//!
//! - **Geometry**: `Bounds`, `Size`, and the scroll `Axis`
//! - **Element handles**: `ElementId`, a non-owning reference to a host node
//! - **Visual state**: the properties a binding may write to an element
//! - **Host interface**: the `ScrollHost` trait through which the engine
//!   reads layout and performs its few deliberate writes
//!
//! The engine never owns host nodes. Everything it knows about an element is
//! obtained through `ScrollHost` queries, so a node that disappears from the
//! document simply stops resolving.

pub mod geometry;
pub mod host;
pub mod visual;

pub use geometry::{Axis, Bounds, Size};
pub use host::{ElementId, PinPlacement, ScrollHost};
pub use visual::{Property, VisualState};
