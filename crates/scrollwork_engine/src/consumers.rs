//! Progress consumers
//!
//! Leaf call sites that turn one region's progress into local presentation
//! state: which rail card is active, which timeline dots are lit, how opaque
//! each skill-graph node is. Every derivation here is a pure function of
//! progress. Consumers only read; nothing flows back into the registry.

use std::sync::{Arc, Mutex};

/// Receives a region's progress once per frame, after pins are applied
pub trait ProgressConsumer: Send {
    fn on_progress(&mut self, progress: f32);
}

impl<F> ProgressConsumer for F
where
    F: FnMut(f32) + Send,
{
    fn on_progress(&mut self, progress: f32) {
        self(progress)
    }
}

fn sanitize(progress: f32) -> f32 {
    if progress.is_finite() {
        progress.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `floor(progress * count)` clamped to the last index
///
/// Returns `None` when there are no items.
pub fn active_index(progress: f32, count: usize) -> Option<usize> {
    if count == 0 {
        return None;
    }
    let index = (sanitize(progress) * count as f32).floor() as usize;
    Some(index.min(count - 1))
}

// ============================================================================
// Rail
// ============================================================================

/// Active card of a horizontal project rail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RailIndex {
    pub count: usize,
}

impl RailIndex {
    pub fn new(count: usize) -> Self {
        Self { count }
    }

    pub fn derive(&self, progress: f32) -> Option<usize> {
        active_index(progress, self.count)
    }
}

// ============================================================================
// Timeline
// ============================================================================

/// Highlight state of one timeline dot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DotState {
    Passed,
    Current,
    Upcoming,
}

/// Dots along a pinned timeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimelineDots {
    pub count: usize,
}

impl TimelineDots {
    pub fn new(count: usize) -> Self {
        Self { count }
    }

    pub fn derive(&self, progress: f32) -> Vec<DotState> {
        let current = active_index(progress, self.count);
        (0..self.count)
            .map(|i| match current {
                Some(c) if i < c => DotState::Passed,
                Some(c) if i == c => DotState::Current,
                _ => DotState::Upcoming,
            })
            .collect()
    }
}

// ============================================================================
// Skill graph
// ============================================================================

/// Opacity of nodes and edges in a progressively revealed graph
#[derive(Clone, Debug, PartialEq)]
pub struct GraphReveal {
    pub nodes: usize,
    pub edges: Vec<(usize, usize)>,
    /// Share of the progress range each node takes to fade in, in `(0, 1]`
    fade: f32,
}

/// Derived graph opacities
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphOpacity {
    pub nodes: Vec<f32>,
    pub edges: Vec<f32>,
}

impl GraphReveal {
    pub fn new(nodes: usize, edges: Vec<(usize, usize)>) -> Self {
        Self {
            nodes,
            edges,
            fade: 0.15,
        }
    }

    /// Set the fade share; non-finite values are ignored
    pub fn fade(mut self, fade: f32) -> Self {
        if fade.is_finite() {
            self.fade = fade.clamp(f32::EPSILON, 1.0);
        }
        self
    }

    /// Node `i` starts appearing at `i / nodes` and is opaque `fade` later
    pub fn node_opacity(&self, progress: f32, index: usize) -> f32 {
        if index >= self.nodes {
            return 0.0;
        }
        let progress = sanitize(progress);
        let threshold = index as f32 / self.nodes as f32 * (1.0 - self.fade);
        ((progress - threshold) / self.fade).clamp(0.0, 1.0)
    }

    pub fn derive(&self, progress: f32) -> GraphOpacity {
        let nodes: Vec<f32> = (0..self.nodes)
            .map(|i| self.node_opacity(progress, i))
            .collect();
        let edges = self
            .edges
            .iter()
            .map(|&(a, b)| {
                let oa = nodes.get(a).copied().unwrap_or(0.0);
                let ob = nodes.get(b).copied().unwrap_or(0.0);
                oa.min(ob)
            })
            .collect();
        GraphOpacity { nodes, edges }
    }
}

// ============================================================================
// Presentation cell
// ============================================================================

/// Shared handle to the latest derived presentation state
pub type SharedPresentation<S> = Arc<Mutex<S>>;

/// A consumer that stores `derive(progress)` where the view can read it
pub struct Presentation<S, F>
where
    F: Fn(f32) -> S,
{
    derive: F,
    state: SharedPresentation<S>,
}

impl<S, F> Presentation<S, F>
where
    S: Send + 'static,
    F: Fn(f32) -> S + Send + 'static,
{
    pub fn new(derive: F) -> Self {
        let initial = derive(0.0);
        Self {
            derive,
            state: Arc::new(Mutex::new(initial)),
        }
    }

    /// Handle the view keeps to read the current state
    pub fn handle(&self) -> SharedPresentation<S> {
        Arc::clone(&self.state)
    }
}

impl<S, F> ProgressConsumer for Presentation<S, F>
where
    S: Send,
    F: Fn(f32) -> S + Send,
{
    fn on_progress(&mut self, progress: f32) {
        let next = (self.derive)(progress);
        match self.state.lock() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}
