//! Visual properties written by animation bindings

use serde::{Deserialize, Serialize};

/// An animatable presentation property
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Opacity,
    TranslateX,
    TranslateY,
    Scale,
    /// Rotation in degrees
    Rotate,
}

/// Resolved presentation state for one element
///
/// Default is the identity: fully opaque, untransformed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VisualState {
    pub opacity: f32,
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale: f32,
    pub rotate: f32,
}

impl Default for VisualState {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
            scale: 1.0,
            rotate: 0.0,
        }
    }
}

impl VisualState {
    pub fn get(&self, property: Property) -> f32 {
        match property {
            Property::Opacity => self.opacity,
            Property::TranslateX => self.translate_x,
            Property::TranslateY => self.translate_y,
            Property::Scale => self.scale,
            Property::Rotate => self.rotate,
        }
    }

    pub fn set(&mut self, property: Property, value: f32) {
        match property {
            Property::Opacity => self.opacity = value.clamp(0.0, 1.0),
            Property::TranslateX => self.translate_x = value,
            Property::TranslateY => self.translate_y = value,
            Property::Scale => self.scale = value,
            Property::Rotate => self.rotate = value,
        }
    }

    /// Bitwise equality, used to check binding determinism
    pub fn bits(&self) -> [u32; 5] {
        [
            self.opacity.to_bits(),
            self.translate_x.to_bits(),
            self.translate_y.to_bits(),
            self.scale.to_bits(),
            self.rotate.to_bits(),
        ]
    }
}
