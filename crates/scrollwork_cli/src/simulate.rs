//! Headless scenario replay
//!
//! Builds a `HeadlessHost` page from a scenario, registers its triggers on a
//! `ScrollEngine`, then steps frames at a fixed interval while feeding the
//! scripted input. Each sampled frame becomes a `TraceRow`.

use anyhow::{Context, Result};
use scrollwork_core::{ElementId, Size};
use scrollwork_engine::{
    EndCondition, HeadlessHost, PinSpec, Position, RegionEvent, ReservedLength, ScrollBehavior,
    ScrollEngine, TriggerId, TriggerPoint, TriggerSpec, ViewId,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::scenario::{Action, ModeDef, Scenario, TriggerDef};

/// Resolved span of a registered trigger
#[derive(Debug, Clone, Serialize)]
pub struct SpanRow {
    pub name: String,
    pub mode: String,
    pub start: f32,
    pub end: f32,
    /// Pins only
    pub reserved: Option<f32>,
}

/// One region in one sampled frame
#[derive(Debug, Clone, Serialize)]
pub struct RegionSample {
    pub name: String,
    pub progress: f32,
    pub value: f32,
    pub position: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<&'static str>,
}

/// One sampled frame
#[derive(Debug, Clone, Serialize)]
pub struct TraceRow {
    pub frame: u64,
    pub time_ms: f64,
    pub raw: f32,
    pub smoothed: f32,
    pub velocity: f32,
    pub regions: Vec<RegionSample>,
}

fn position_name(position: Position) -> &'static str {
    match position {
        Position::Before => "before",
        Position::Inside => "inside",
        Position::After => "after",
    }
}

fn event_name(event: RegionEvent) -> &'static str {
    match event {
        RegionEvent::Enter => "enter",
        RegionEvent::Leave => "leave",
        RegionEvent::EnterBack => "enter_back",
        RegionEvent::LeaveBack => "leave_back",
    }
}

/// A scenario loaded into a running engine
pub struct Simulation {
    engine: ScrollEngine<HeadlessHost>,
    elements: HashMap<String, ElementId>,
    triggers: Vec<(String, TriggerId)>,
    script: Vec<(f64, Action)>,
    frame_ms: f64,
    duration_ms: f64,
}

impl Simulation {
    pub fn build(scenario: &Scenario) -> Result<Self> {
        let mut host = HeadlessHost::new(scenario.page.viewport, scenario.page.document);
        let mut elements = HashMap::new();
        for def in &scenario.elements {
            let id = host.insert(def.bounds);
            if let Some(content) = def.content {
                host.set_content_extent(id, content);
            }
            elements.insert(def.name.clone(), id);
        }

        let mut engine = ScrollEngine::new(scenario.engine.clone(), host)?;
        let shell = engine.open_view("shell");
        let route = engine.route_did_mount("scenario");

        let mut triggers: Vec<(String, TriggerId)> = Vec::new();
        for def in &scenario.triggers {
            let view = if def.persistent { shell } else { route };
            let id = register(&mut engine, view, def, &elements, &triggers)
                .with_context(|| format!("Failed to register trigger '{}'", def.name))?;
            if let Some(bind) = &def.bind {
                let element = lookup(&elements, &def.element)?;
                engine.bind(id, element, bind.binding())?;
            }
            triggers.push((def.name.clone(), id));
        }

        let mut script: Vec<(f64, Action)> = scenario
            .script
            .iter()
            .map(|step| (step.at_ms, step.action.clone()))
            .collect();
        script.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(Self {
            engine,
            elements,
            triggers,
            script,
            frame_ms: scenario.run.frame_ms,
            duration_ms: scenario.run.duration_ms,
        })
    }

    pub fn engine(&self) -> &ScrollEngine<HeadlessHost> {
        &self.engine
    }

    /// Resolved spans of every registered trigger
    pub fn spans(&self) -> Vec<SpanRow> {
        let registry = self.engine.registry();
        self.triggers
            .iter()
            .filter_map(|(name, id)| {
                let span = registry.span(*id)?;
                let mode = registry.mode(*id)?;
                let reserved = registry.pin_info(*id).map(|info| info.reserved);
                Some(SpanRow {
                    name: name.clone(),
                    mode: format!("{mode:?}"),
                    start: span.start,
                    end: span.end,
                    reserved,
                })
            })
            .collect()
    }

    /// Replay the script, sampling every `every` frames plus any frame with
    /// boundary events
    pub fn run(&mut self, every: u64) -> Result<Vec<TraceRow>> {
        let every = every.max(1);
        let mut rows = Vec::new();
        let mut next_step = 0;
        let mut now = 0.0;

        while now <= self.duration_ms {
            while next_step < self.script.len() && self.script[next_step].0 <= now {
                let action = self.script[next_step].1.clone();
                self.apply(&action)?;
                next_step += 1;
            }

            let report = self.engine.frame(now)?;
            let has_events = report.updates.iter().any(|u| !u.events.is_empty());
            if report.frame % every == 1 % every || has_events {
                rows.push(self.sample(&report, now));
            }
            now += self.frame_ms;
        }

        tracing::debug!(rows = rows.len(), "replay finished");
        Ok(rows)
    }

    fn sample(&self, report: &scrollwork_engine::FrameReport, now: f64) -> TraceRow {
        let regions = self
            .triggers
            .iter()
            .filter_map(|(name, id)| {
                let update = report.update(*id)?;
                Some(RegionSample {
                    name: name.clone(),
                    progress: update.progress,
                    value: update.value,
                    position: position_name(update.position),
                    events: update.events.iter().copied().map(event_name).collect(),
                })
            })
            .collect();

        TraceRow {
            frame: report.frame,
            time_ms: now,
            raw: report.scroll.raw_offset,
            smoothed: report.scroll.smoothed_offset,
            velocity: report.scroll.velocity,
            regions,
        }
    }

    fn apply(&mut self, action: &Action) -> Result<()> {
        tracing::debug!(?action, "script step");
        match action {
            Action::Scroll { offset } => self.engine.on_native_scroll(*offset),
            Action::ScrollTo { offset, immediate } => {
                let behavior = if *immediate {
                    ScrollBehavior::Immediate
                } else {
                    ScrollBehavior::Smooth
                };
                self.engine.scroll_to(*offset, behavior)?;
            }
            Action::Resize { width, height } => {
                self.engine
                    .host_mut()
                    .set_viewport(Size::new(*width, *height));
                self.engine.on_resize();
            }
            Action::Move { element, bounds } => {
                let id = lookup(&self.elements, element)?;
                self.engine.host_mut().set_bounds(id, *bounds);
            }
            Action::Invalidate { reason } => self.engine.invalidate_layout(reason.clone()),
            Action::Refresh => {
                self.engine.refresh_all()?;
            }
            Action::Navigate { route } => {
                self.engine.route_will_change();
                self.engine.route_did_mount(route.clone());
                let live = self.engine.registry();
                self.triggers.retain(|(_, id)| live.contains(*id));
            }
        }
        Ok(())
    }
}

fn lookup(elements: &HashMap<String, ElementId>, name: &str) -> Result<ElementId> {
    elements
        .get(name)
        .copied()
        .with_context(|| format!("Unknown element '{name}'"))
}

fn register(
    engine: &mut ScrollEngine<HeadlessHost>,
    view: ViewId,
    def: &TriggerDef,
    elements: &HashMap<String, ElementId>,
    triggers: &[(String, TriggerId)],
) -> Result<TriggerId> {
    let element = lookup(elements, &def.element)?;

    let mut spec = match def.mode {
        ModeDef::Toggle => TriggerSpec::toggle(element, def.reset),
        ModeDef::Scrub => TriggerSpec::scrub(element),
        ModeDef::Pin => {
            let content = def
                .content
                .as_deref()
                .map(|name| lookup(elements, name))
                .transpose()?;
            let length = match def.length {
                Some(px) => ReservedLength::Fixed(px),
                None => ReservedLength::ContentOverflow,
            };
            TriggerSpec::pin(
                element,
                PinSpec {
                    axis: def.axis,
                    length,
                    content,
                },
            )
        }
    };
    spec = spec.label(def.name.clone());

    if let Some(start) = &def.start {
        let start: TriggerPoint = start
            .parse()
            .with_context(|| format!("Invalid start position '{start}'"))?;
        spec = spec.start(start);
    }
    if let Some(end) = &def.end {
        let end: EndCondition = end
            .parse()
            .with_context(|| format!("Invalid end position '{end}'"))?;
        spec = spec.end(end);
    }
    if let Some(container) = &def.container {
        let parent = triggers
            .iter()
            .find(|(name, _)| name == container)
            .map(|(_, id)| *id)
            .with_context(|| format!("Unknown container '{container}'"))?;
        spec = spec.container(parent);
    }

    Ok(engine.register(view, spec)?)
}
