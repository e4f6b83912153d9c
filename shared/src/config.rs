use serde::{Deserialize, Serialize};

pub const DEFAULT_COLOR: &str = "#1f1f1f";
pub const DEFAULT_LINE_WIDTH: f32 = 3.0;
pub const DEFAULT_HEIGHT: f64 = 240.0;

const MAX_COLOR_LEN: usize = 32;
const MIN_LINE_WIDTH: f32 = 0.5;
const MAX_LINE_WIDTH: f32 = 60.0;
const MIN_HEIGHT: f64 = 16.0;
const MAX_HEIGHT: f64 = 4096.0;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid surface options: {0}")]
    Parse(#[from] serde_json::Error),
}

/// When a finger (as opposed to a pen) is allowed to draw.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TouchPolicy {
    Never,
    /// Only when the platform cannot tell a stylus from a finger.
    #[default]
    WhenUnreported,
    Always,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Smoothing {
    Linear,
    #[default]
    Midpoint,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineStyle {
    pub width: f32,
    pub color: String,
    pub pressure_sensitive: bool,
    pub smoothing: Smoothing,
}

impl LineStyle {
    /// Width of a segment drawn between two samples with the given pressures.
    pub fn width_for(&self, from_pressure: f32, to_pressure: f32) -> f64 {
        let base = self.width as f64;
        if !self.pressure_sensitive {
            return base;
        }
        let pressure = ((from_pressure + to_pressure) / 2.0) as f64;
        let factor = (pressure / crate::DEFAULT_PRESSURE as f64).clamp(0.25, 2.0);
        base * factor
    }
}

impl Default for LineStyle {
    fn default() -> Self {
        SurfaceConfig::default().line_style()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SurfaceConfig {
    /// Display height in CSS pixels. Width follows the container.
    pub height: f64,
    pub line_width: f32,
    pub color: String,
    pub touch_policy: TouchPolicy,
    pub palm_rejection: bool,
    pub smoothing: Smoothing,
    pub pressure_sensitive: bool,
    pub coalesce: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            height: DEFAULT_HEIGHT,
            line_width: DEFAULT_LINE_WIDTH,
            color: DEFAULT_COLOR.to_string(),
            touch_policy: TouchPolicy::default(),
            palm_rejection: true,
            smoothing: Smoothing::default(),
            pressure_sensitive: false,
            coalesce: true,
        }
    }
}

impl SurfaceConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: SurfaceConfig = serde_json::from_str(text)?;
        Ok(config.sanitized())
    }

    pub fn sanitized(mut self) -> Self {
        self.height = if self.height.is_finite() {
            self.height.clamp(MIN_HEIGHT, MAX_HEIGHT)
        } else {
            DEFAULT_HEIGHT
        };
        self.line_width = if self.line_width.is_finite() {
            self.line_width.clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH)
        } else {
            DEFAULT_LINE_WIDTH
        };
        if self.color.trim().is_empty() || self.color.len() > MAX_COLOR_LEN {
            self.color = DEFAULT_COLOR.to_string();
        }
        self
    }

    pub fn line_style(&self) -> LineStyle {
        LineStyle {
            width: self.line_width,
            color: self.color.clone(),
            pressure_sensitive: self.pressure_sensitive,
            smoothing: self.smoothing,
        }
    }
}
