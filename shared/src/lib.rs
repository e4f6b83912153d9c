use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

mod classifier;
mod config;
mod guard;
mod ink_format;
mod render;
mod surface;
mod stroke_surface;

#[cfg(test)]
mod testing;

pub use classifier::{
    Capture, Decision, InputClassifier, InputId, Phase, PointerKind, PointerSample, TouchBatch,
    TouchContact, TouchKind,
};
pub use config::{ConfigError, LineStyle, Smoothing, SurfaceConfig, TouchPolicy};
pub use guard::{DrawingGuard, PageLock};
pub use ink_format::{decode_ink, encode_ink, InkFormatError, INK_FILE_MAGIC, INK_FILE_VERSION};
pub use render::{InkCanvas, StrokeRenderer};
pub use stroke_surface::{Response, StrokeSurface};
pub use surface::{LogicalSize, SurfaceManager, SurfaceTransform};

/// Pressure assumed for devices that do not report one.
pub const DEFAULT_PRESSURE: f32 = 0.5;

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_pressure")]
    pub pressure: f32,
}

fn default_pressure() -> f32 {
    DEFAULT_PRESSURE
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            pressure: DEFAULT_PRESSURE,
        }
    }

    pub fn with_pressure(self, pressure: f32) -> Self {
        Self {
            pressure: normalize_pressure(pressure),
            ..self
        }
    }

    /// Rejects points that cannot be drawn.
    pub fn normalize(self) -> Option<Self> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return None;
        }
        Some(Self {
            pressure: normalize_pressure(self.pressure),
            ..self
        })
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            pressure: (self.pressure + other.pressure) / 2.0,
        }
    }
}

/// Browsers report 0 for contacts without pressure sensing, so it maps to the default.
fn normalize_pressure(value: f32) -> f32 {
    if !value.is_finite() || value <= 0.0 {
        return DEFAULT_PRESSURE;
    }
    value.min(1.0)
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub struct Stroke {
    pub points: Vec<Point>,
}

impl Stroke {
    pub fn start(point: Point) -> Self {
        Self {
            points: vec![point],
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }
}

/// Borrowed view of everything currently on the surface.
#[derive(Serialize, Clone, Copy, Debug)]
pub struct InkView<'a> {
    pub strokes: &'a [Stroke],
    pub current: Option<&'a Stroke>,
}

impl InkView<'_> {
    pub fn to_snapshot(&self) -> InkSnapshot {
        InkSnapshot {
            strokes: self.strokes.to_vec(),
            current: self.current.cloned(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, Default, PartialEq)]
pub struct InkSnapshot {
    pub strokes: Vec<Stroke>,
    #[serde(default)]
    pub current: Option<Stroke>,
}
