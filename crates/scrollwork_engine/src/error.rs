//! Error types for scrollwork_engine

use scrollwork_core::ElementId;
use thiserror::Error;

/// Errors surfaced to callers of the engine
///
/// Only registration and configuration calls return these. Problems found
/// while a frame is running are handled per region and never propagate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScrollError {
    /// Registration referenced an element that is not in the document
    #[error("element {0} is not attached to the document")]
    InvalidRegion(ElementId),

    /// Handle does not refer to a live region
    #[error("unknown trigger region")]
    UnknownRegion,

    /// View id does not refer to a mounted view
    #[error("unknown view")]
    UnknownView,

    /// Container handle does not refer to a live region
    #[error("container region is unknown or has been removed")]
    UnknownContainer,

    /// Containers must be pinned so they have an internal coordinate space
    #[error("container region must be pinned")]
    ContainerNotPinned,

    /// Pins cannot be nested inside another pin's coordinate space
    #[error("a pinned region cannot be nested in a container")]
    NestedPin,

    /// Operation only applies to pinned regions
    #[error("region is not pinned")]
    NotPinned,

    /// Negative or non-finite length
    #[error("invalid length: {0}")]
    InvalidLength(f32),

    /// Configuration value out of range
    #[error("invalid configuration: `{field}` {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The frame loop was cancelled
    #[error("engine has been shut down")]
    ShutDown,
}

/// Errors parsing trigger positions such as `"top 80%"`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseTriggerError {
    #[error("empty trigger position")]
    Empty,

    #[error("unrecognized edge `{0}`")]
    UnknownEdge(String),

    #[error("invalid offset `{0}`")]
    InvalidOffset(String),

    #[error("expected `<element edge> <viewport edge>`, got `{0}`")]
    Arity(String),
}

/// Result type for scrollwork_engine operations
pub type Result<T> = std::result::Result<T, ScrollError>;
