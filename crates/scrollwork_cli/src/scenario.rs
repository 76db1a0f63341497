//! Scenario file handling
//!
//! A scenario describes a headless page (viewport, document, element boxes),
//! the trigger regions registered on it, and a timed script of scroll input.
//!
//! ```toml
//! [engine]
//! lerp = 0.15
//!
//! [page]
//! viewport = { width = 1000, height = 800 }
//! document = { width = 1000, height = 3200 }
//!
//! [[elements]]
//! name = "work"
//! bounds = { x = 0, y = 800, width = 1000, height = 800 }
//!
//! [[triggers]]
//! name = "rail"
//! element = "work"
//! mode = "pin"
//!
//! [[script]]
//! at_ms = 0
//! action = "scroll"
//! offset = 900
//! ```

use anyhow::{Context, Result};
use scrollwork_animation::AnimationBinding;
use scrollwork_core::{Axis, Bounds, Size};
use scrollwork_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Top-level scenario file
#[derive(Debug, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default)]
    pub engine: EngineConfig,
    pub page: PageConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub elements: Vec<ElementDef>,
    #[serde(default)]
    pub triggers: Vec<TriggerDef>,
    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

/// Page geometry
#[derive(Debug, Deserialize, Serialize)]
pub struct PageConfig {
    pub viewport: Size,
    pub document: Size,
}

/// Replay timing
#[derive(Debug, Deserialize, Serialize)]
pub struct RunConfig {
    #[serde(default = "default_duration_ms")]
    pub duration_ms: f64,
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
}

fn default_duration_ms() -> f64 {
    3000.0
}

fn default_frame_ms() -> f64 {
    1000.0 / 60.0
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
            frame_ms: default_frame_ms(),
        }
    }
}

/// A named element box
#[derive(Debug, Deserialize, Serialize)]
pub struct ElementDef {
    pub name: String,
    pub bounds: Bounds,
    /// Intrinsic content size, for pins whose content overflows
    #[serde(default)]
    pub content: Option<Size>,
}

/// Trigger mode as written in scenario files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeDef {
    Toggle,
    #[default]
    Scrub,
    Pin,
}

/// A trigger region
#[derive(Debug, Deserialize, Serialize)]
pub struct TriggerDef {
    pub name: String,
    pub element: String,
    #[serde(default)]
    pub mode: ModeDef,
    /// Toggle only: replay on re-entry
    #[serde(default)]
    pub reset: bool,
    /// e.g. `"top 80%"`
    #[serde(default)]
    pub start: Option<String>,
    /// e.g. `"bottom top"` or `"+=1600"`
    #[serde(default)]
    pub end: Option<String>,
    /// Pin only
    #[serde(default)]
    pub axis: Axis,
    /// Pin only: element translated inside the pin
    #[serde(default)]
    pub content: Option<String>,
    /// Pin only: fixed reserved length instead of the content overflow
    #[serde(default)]
    pub length: Option<f32>,
    /// Name of an earlier pinned trigger to nest in
    #[serde(default)]
    pub container: Option<String>,
    /// Survive route changes
    #[serde(default)]
    pub persistent: bool,
    #[serde(default)]
    pub bind: Option<BindDef>,
}

/// Binding preset applied to the trigger's element
#[derive(Debug, Deserialize, Serialize)]
pub struct BindDef {
    pub preset: Preset,
    /// Distance in px, or the starting scale for `scale_in`
    #[serde(default)]
    pub amount: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    FadeUp,
    FadeIn,
    ScaleIn,
    SlideX,
    Parallax,
}

impl BindDef {
    pub fn binding(&self) -> AnimationBinding {
        match self.preset {
            Preset::FadeUp => AnimationBinding::fade_up(self.amount.unwrap_or(40.0)),
            Preset::FadeIn => AnimationBinding::fade_in(),
            Preset::ScaleIn => AnimationBinding::scale_in(self.amount.unwrap_or(0.9)),
            Preset::SlideX => AnimationBinding::slide_x(self.amount.unwrap_or(0.0)),
            Preset::Parallax => AnimationBinding::parallax(self.amount.unwrap_or(100.0)),
        }
    }
}

/// One timed input
#[derive(Debug, Deserialize, Serialize)]
pub struct ScriptStep {
    pub at_ms: f64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Native scroll reading
    Scroll { offset: f32 },
    /// Programmatic scroll
    ScrollTo {
        offset: f32,
        #[serde(default)]
        immediate: bool,
    },
    /// Viewport resize
    Resize { width: f32, height: f32 },
    /// Move an element (as if an image above it loaded)
    Move { element: String, bounds: Bounds },
    /// Report a layout change without refreshing
    Invalidate { reason: String },
    /// Refresh geometry immediately
    Refresh,
    /// Route change to a new, empty route
    Navigate { route: String },
}

impl Scenario {
    /// Load and check a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let scenario = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check cross references and timing before anything is built
    pub fn validate(&self) -> Result<()> {
        self.engine.validate().context("Invalid [engine] table")?;

        if !self.run.frame_ms.is_finite() || self.run.frame_ms <= 0.0 {
            anyhow::bail!("run.frame_ms must be positive, got {}", self.run.frame_ms);
        }
        if !self.run.duration_ms.is_finite() || self.run.duration_ms < 0.0 {
            anyhow::bail!("run.duration_ms must not be negative");
        }

        let mut elements = HashSet::new();
        for element in &self.elements {
            if !elements.insert(element.name.as_str()) {
                anyhow::bail!("Duplicate element '{}'", element.name);
            }
        }

        let mut triggers = HashSet::new();
        for trigger in &self.triggers {
            if !elements.contains(trigger.element.as_str()) {
                anyhow::bail!(
                    "Trigger '{}' references unknown element '{}'",
                    trigger.name,
                    trigger.element
                );
            }
            if let Some(content) = &trigger.content {
                if !elements.contains(content.as_str()) {
                    anyhow::bail!(
                        "Trigger '{}' references unknown content element '{}'",
                        trigger.name,
                        content
                    );
                }
            }
            if let Some(container) = &trigger.container {
                if !triggers.contains(container.as_str()) {
                    anyhow::bail!(
                        "Trigger '{}' is nested in '{}', which must be declared before it",
                        trigger.name,
                        container
                    );
                }
            }
            if !triggers.insert(trigger.name.as_str()) {
                anyhow::bail!("Duplicate trigger '{}'", trigger.name);
            }
        }

        for step in &self.script {
            if let Action::Move { element, .. } = &step.action {
                if !elements.contains(element.as_str()) {
                    anyhow::bail!("Script moves unknown element '{}'", element);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAIL: &str = include_str!("../scenarios/rail.toml");

    #[test]
    fn test_parse_bundled_scenario() {
        let scenario = Scenario::parse(RAIL).unwrap();
        assert_eq!(scenario.engine.lerp, 0.15);
        assert_eq!(scenario.page.viewport, Size::new(1000.0, 800.0));
        assert_eq!(scenario.triggers.len(), 4);
        assert_eq!(scenario.triggers[1].mode, ModeDef::Pin);
        assert_eq!(scenario.triggers[1].axis, Axis::Horizontal);
        assert_eq!(
            scenario.script[1].action,
            Action::ScrollTo {
                offset: 2400.0,
                immediate: false
            }
        );
    }

    #[test]
    fn test_defaults() {
        let scenario = Scenario::parse(
            r#"
            [page]
            viewport = { width = 800, height = 600 }
            document = { width = 800, height = 2000 }
            "#,
        )
        .unwrap();
        assert_eq!(scenario.engine, EngineConfig::default());
        assert_eq!(scenario.run.duration_ms, 3000.0);
        assert!(scenario.triggers.is_empty());
    }

    #[test]
    fn test_unknown_element_rejected() {
        let err = Scenario::parse(
            r#"
            [page]
            viewport = { width = 800, height = 600 }
            document = { width = 800, height = 2000 }

            [[triggers]]
            name = "hero"
            element = "missing"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown element"));
    }

    #[test]
    fn test_container_must_come_first() {
        let err = Scenario::parse(
            r#"
            [page]
            viewport = { width = 800, height = 600 }
            document = { width = 800, height = 2000 }

            [[elements]]
            name = "a"
            bounds = { x = 0, y = 0, width = 10, height = 10 }

            [[triggers]]
            name = "child"
            element = "a"
            container = "later"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("declared before"));
    }

    #[test]
    fn test_invalid_engine_table() {
        let err = Scenario::parse(
            r#"
            [engine]
            lerp = 2.0

            [page]
            viewport = { width = 800, height = 600 }
            document = { width = 800, height = 2000 }
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("lerp"));
    }
}
