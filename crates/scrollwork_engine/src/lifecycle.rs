//! View lifecycle
//!
//! Tracks which trigger regions belong to which view so a route change can
//! tear down everything the outgoing page registered in one step. Persistent
//! views (a site header, a global progress bar) survive route changes and are
//! only removed when closed explicitly.
//!
//! The manager itself is bookkeeping only. The engine performs the actual
//! teardown, scroll reset and refresh scheduling around these transitions.

use slotmap::{new_key_type, SlotMap};

use crate::error::{Result, ScrollError};
use crate::trigger::TriggerId;

new_key_type! {
    /// Handle to a mounted view
    pub struct ViewId;
}

/// Navigation phase of the engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No navigation in progress
    #[default]
    Idle,
    /// Outgoing route torn down, waiting for the next one to mount
    Navigating,
    /// Route mounted, geometry refresh pending until layout settles
    Rebuilding,
}

/// Inputs to the lifecycle state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    RouteWillChange,
    RouteDidMount,
    /// Deferred settle refresh completed
    Settled,
}

impl LifecycleState {
    /// Handle an event and return the new state, or None if no transition
    pub fn on_event(&self, event: LifecycleEvent) -> Option<Self> {
        use LifecycleEvent::*;
        use LifecycleState::*;

        match (self, event) {
            // Leaving a page, whether or not it finished settling
            (Idle | Rebuilding, RouteWillChange) => Some(Navigating),

            // Normal second half of a navigation, the first mount, or a
            // mount without a preceding will-change
            (Idle | Navigating, RouteDidMount) => Some(Rebuilding),

            (Rebuilding, Settled) => Some(Idle),

            _ => None,
        }
    }

    /// Returns true while the current route's geometry is not yet measured
    pub fn is_transitioning(&self) -> bool {
        matches!(self, LifecycleState::Navigating | LifecycleState::Rebuilding)
    }
}

/// Whether a view is torn down on navigation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewKind {
    Route,
    Persistent,
}

/// A view and the regions registered under it
#[derive(Clone, Debug, PartialEq)]
pub struct ViewRecord {
    pub name: String,
    pub kind: ViewKind,
    pub regions: Vec<TriggerId>,
}

/// Result of mounting a route
#[derive(Clone, Debug, PartialEq)]
pub struct Mounted {
    pub view: ViewId,
    /// Previous route that was never torn down with `route_will_change`
    pub orphaned: Option<ViewRecord>,
}

/// View and region ownership bookkeeping
#[derive(Debug, Default)]
pub struct LifecycleManager {
    views: SlotMap<ViewId, ViewRecord>,
    route: Option<ViewId>,
    state: LifecycleState,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    fn transition(&mut self, event: LifecycleEvent) {
        if let Some(next) = self.state.on_event(event) {
            tracing::debug!(from = ?self.state, to = ?next, ?event, "lifecycle transition");
            self.state = next;
        }
    }

    /// Open a view that outlives route changes
    pub fn open_persistent(&mut self, name: impl Into<String>) -> ViewId {
        self.views.insert(ViewRecord {
            name: name.into(),
            kind: ViewKind::Persistent,
            regions: Vec::new(),
        })
    }

    /// Detach the current route; the caller tears down its regions
    pub fn route_will_change(&mut self) -> Option<ViewRecord> {
        self.transition(LifecycleEvent::RouteWillChange);
        let route = self.route.take()?;
        self.views.remove(route)
    }

    /// Mount a new route view
    pub fn route_did_mount(&mut self, name: impl Into<String>) -> Mounted {
        let name = name.into();
        let orphaned = self.route.take().and_then(|stale| {
            let record = self.views.remove(stale)?;
            tracing::warn!(
                outgoing = %record.name,
                incoming = %name,
                "route mounted without route_will_change; tearing down previous route"
            );
            Some(record)
        });

        self.transition(LifecycleEvent::RouteDidMount);
        let view = self.views.insert(ViewRecord {
            name,
            kind: ViewKind::Route,
            regions: Vec::new(),
        });
        self.route = Some(view);
        Mounted { view, orphaned }
    }

    /// Mark the current route as measured
    pub fn settled(&mut self) {
        self.transition(LifecycleEvent::Settled);
    }

    /// Close any view; closing the current route leaves no route mounted
    pub fn close(&mut self, view: ViewId) -> Option<ViewRecord> {
        if self.route == Some(view) {
            self.route = None;
        }
        self.views.remove(view)
    }

    pub fn contains(&self, view: ViewId) -> bool {
        self.views.contains_key(view)
    }

    pub fn current_route(&self) -> Option<ViewId> {
        self.route
    }

    pub fn view(&self, view: ViewId) -> Option<&ViewRecord> {
        self.views.get(view)
    }

    /// Record that `region` belongs to `view`
    pub fn track(&mut self, view: ViewId, region: TriggerId) -> Result<()> {
        let record = self.views.get_mut(view).ok_or(ScrollError::UnknownView)?;
        record.regions.push(region);
        Ok(())
    }

    /// Forget removed regions wherever they were tracked
    pub fn untrack(&mut self, removed: &[TriggerId]) {
        for (_, record) in self.views.iter_mut() {
            record.regions.retain(|id| !removed.contains(id));
        }
    }
}
