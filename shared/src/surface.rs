use crate::config::LineStyle;
use crate::render::InkCanvas;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogicalSize {
    pub width: f64,
    pub height: f64,
}

impl LogicalSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn sanitized(self) -> Self {
        Self {
            width: sanitize_length(self.width),
            height: sanitize_length(self.height),
        }
    }
}

fn sanitize_length(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

fn sanitize_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}

/// Maps logical (CSS) pixels onto the backing buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceTransform {
    pub ratio: f64,
    pub width: f64,
    pub height: f64,
}

impl SurfaceTransform {
    pub fn new(size: LogicalSize, ratio: f64) -> Self {
        let size = size.sanitized();
        Self {
            ratio: sanitize_ratio(ratio),
            width: size.width,
            height: size.height,
        }
    }

    pub fn logical_size(&self) -> LogicalSize {
        LogicalSize::new(self.width, self.height)
    }

    /// Physical pixel dimensions of the backing buffer.
    pub fn backing_size(&self) -> (u32, u32) {
        (
            (self.width * self.ratio).round() as u32,
            (self.height * self.ratio).round() as u32,
        )
    }
}

impl Default for SurfaceTransform {
    fn default() -> Self {
        Self::new(LogicalSize::new(0.0, 0.0), 1.0)
    }
}

pub struct SurfaceManager {
    transform: SurfaceTransform,
    pending: Option<SurfaceTransform>,
}

impl SurfaceManager {
    pub fn new() -> Self {
        Self {
            transform: SurfaceTransform::default(),
            pending: None,
        }
    }

    pub fn transform(&self) -> SurfaceTransform {
        self.transform
    }

    #[cfg(test)]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Sizes the backing buffer for `size` at `ratio` and restores the line
    /// style the reallocation wiped. The buffer is empty afterwards.
    pub fn initialize<C: InkCanvas>(
        &mut self,
        canvas: &mut C,
        size: LogicalSize,
        ratio: f64,
        style: &LineStyle,
    ) -> SurfaceTransform {
        let last = self.transform;
        let transform = SurfaceTransform::new(size, ratio);
        let (width, height) = transform.backing_size();
        tracing::debug!(
            "resizing surface from {}x{}@{} to {}x{}@{}",
            last.width,
            last.height,
            last.ratio,
            transform.width,
            transform.height,
            transform.ratio
        );
        canvas.allocate(width, height);
        canvas.set_scale(transform.ratio);
        canvas.apply_style(style);
        self.transform = transform;
        self.pending = None;
        transform
    }

    /// Remembers a resize that cannot be applied yet. The latest one wins.
    pub fn defer(&mut self, size: LogicalSize, ratio: f64) {
        self.pending = Some(SurfaceTransform::new(size, ratio));
    }

    pub fn take_pending(&mut self) -> Option<(LogicalSize, f64)> {
        self.pending
            .take()
            .map(|pending| (pending.logical_size(), pending.ratio))
    }
}

impl Default for SurfaceManager {
    fn default() -> Self {
        Self::new()
    }
}
