//! Scrollwork Engine
//!
//! Scroll-synchronized animation: a smoothed virtual scroll offset drives
//! trigger regions, which report progress to pins, animation bindings and
//! presentation consumers once per frame.
//!
//! # Features
//!
//! - **Virtual Scroll**: Fixed-factor per-frame lerp smoothing and eased
//!   programmatic scrolls
//! - **Trigger Regions**: Toggle, scrub and pin modes with `"top 80%"` style
//!   positions, nested in pinned containers when needed
//! - **Pinning**: Reserved scroll length, fixed placement and horizontal or
//!   vertical content travel
//! - **Lifecycle**: Route-scoped teardown, persistent views and deferred
//!   geometry refresh
//! - **Fault Isolation**: Detached elements and panicking listeners disable
//!   one region, never the frame
//!
//! # Example
//!
//! ```rust
//! use scrollwork_animation::AnimationBinding;
//! use scrollwork_core::{Bounds, Size};
//! use scrollwork_engine::{EngineConfig, HeadlessHost, ScrollEngine, TriggerSpec};
//!
//! let mut host = HeadlessHost::new(Size::new(1280.0, 800.0), Size::new(1280.0, 4000.0));
//! let card = host.insert(Bounds::new(0.0, 1200.0, 1280.0, 400.0));
//!
//! let mut engine = ScrollEngine::new(EngineConfig::default(), host).unwrap();
//! let page = engine.route_did_mount("home");
//! let region = engine.register(page, TriggerSpec::scrub(card)).unwrap();
//! engine.bind(region, card, AnimationBinding::fade_up(60.0)).unwrap();
//!
//! engine.on_native_scroll(900.0);
//! for frame in 0..120 {
//!     engine.frame(frame as f64 * 16.0).unwrap();
//! }
//! assert!(engine.progress(region).unwrap() > 0.0);
//! ```

pub mod config;
pub mod consumers;
pub mod engine;
pub mod error;
pub mod headless;
pub mod lifecycle;
pub mod pin;
pub mod registry;
pub mod scheduler;
pub mod trigger;
pub mod virtual_scroll;

pub use config::EngineConfig;
pub use consumers::{
    active_index, DotState, GraphOpacity, GraphReveal, Presentation, ProgressConsumer,
    RailIndex, SharedPresentation, TimelineDots,
};
pub use engine::{FrameReport, ScrollEngine, SharedScrollEngine};
pub use error::{ParseTriggerError, Result, ScrollError};
pub use headless::HeadlessHost;
pub use lifecycle::{LifecycleEvent, LifecycleState, ViewId, ViewKind};
pub use pin::PinController;
pub use registry::{RefreshReport, RegionFault, RegionStatus, RegionUpdate, Span, TriggerRegistry};
pub use scheduler::{DeferredTask, FrameScheduler};
pub use trigger::{
    Anchor, Edge, EndCondition, PinSpec, Position, RegionEvent, ReservedLength, TriggerId,
    TriggerMode, TriggerPoint, TriggerSpec,
};
pub use virtual_scroll::{ScrollBehavior, ScrollState, VirtualScrollSource};
