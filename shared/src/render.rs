use crate::config::{LineStyle, Smoothing};
use crate::surface::SurfaceTransform;
use crate::{InkView, Point, Stroke};

/// The 2-D drawing backend the surface paints into.
///
/// Coordinates are logical (CSS) pixels; the device pixel ratio is applied
/// through [`InkCanvas::set_scale`].
pub trait InkCanvas {
    /// Reallocates the backing buffer. Its pixels and context state are lost.
    fn allocate(&mut self, width: u32, height: u32);
    fn set_scale(&mut self, ratio: f64);
    fn apply_style(&mut self, style: &LineStyle);
    fn clear(&mut self, width: f64, height: f64);
    fn set_line_width(&mut self, width: f64);
    fn begin_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn quadratic_curve_to(&mut self, cx: f64, cy: f64, x: f64, y: f64);
    fn stroke(&mut self);
}

pub struct StrokeRenderer {
    style: LineStyle,
    history: Vec<Stroke>,
    current: Option<Stroke>,
}

impl StrokeRenderer {
    pub fn new(style: LineStyle) -> Self {
        Self {
            style,
            history: Vec::new(),
            current: None,
        }
    }

    pub fn style(&self) -> &LineStyle {
        &self.style
    }

    pub fn history(&self) -> &[Stroke] {
        &self.history
    }

    pub fn current(&self) -> Option<&Stroke> {
        self.current.as_ref()
    }

    pub fn view(&self) -> InkView<'_> {
        InkView {
            strokes: &self.history,
            current: self.current.as_ref(),
        }
    }

    pub fn begin_stroke(&mut self, point: Point) {
        if self.current.is_some() {
            tracing::warn!("stroke started over an unfinished one");
        }
        self.current = Some(Stroke::start(point));
    }

    pub fn extend_stroke<C: InkCanvas>(&mut self, canvas: &mut C, point: Point) {
        let Some(stroke) = self.current.as_mut() else {
            return;
        };
        stroke.points.push(point);
        paint_segment(canvas, &self.style, &stroke.points, stroke.points.len() - 1);
    }

    /// Commits the in-progress stroke. A stroke that never moved past its
    /// first point is dropped. Returns whether anything was committed.
    pub fn end_stroke<C: InkCanvas>(&mut self, canvas: &mut C) -> bool {
        let Some(stroke) = self.current.take() else {
            return false;
        };
        if stroke.len() < 2 {
            return false;
        }
        paint_tail(canvas, &self.style, &stroke.points);
        self.history.push(stroke);
        true
    }

    pub fn repaint_all<C: InkCanvas>(&self, canvas: &mut C, transform: &SurfaceTransform) {
        canvas.clear(transform.width, transform.height);
        for stroke in &self.history {
            paint_stroke(canvas, &self.style, &stroke.points);
            paint_tail(canvas, &self.style, &stroke.points);
        }
        if let Some(stroke) = &self.current {
            paint_stroke(canvas, &self.style, &stroke.points);
        }
    }

    pub fn clear<C: InkCanvas>(&mut self, canvas: &mut C, transform: &SurfaceTransform) {
        self.history.clear();
        self.current = None;
        canvas.clear(transform.width, transform.height);
    }
}

fn paint_stroke<C: InkCanvas>(canvas: &mut C, style: &LineStyle, points: &[Point]) {
    for index in 1..points.len() {
        paint_segment(canvas, style, points, index);
    }
}

/// Paints the piece of ink that appears when `points[index]` is appended.
/// Both incremental drawing and full repaints go through here.
fn paint_segment<C: InkCanvas>(canvas: &mut C, style: &LineStyle, points: &[Point], index: usize) {
    if index == 0 || index >= points.len() {
        return;
    }
    let from = points[index - 1];
    let to = points[index];
    canvas.set_line_width(style.width_for(from.pressure, to.pressure));
    canvas.begin_path();
    match style.smoothing {
        Smoothing::Linear => {
            canvas.move_to(from.x as f64, from.y as f64);
            canvas.line_to(to.x as f64, to.y as f64);
        }
        Smoothing::Midpoint => {
            let end = from.midpoint(to);
            if index == 1 {
                canvas.move_to(from.x as f64, from.y as f64);
                canvas.line_to(end.x as f64, end.y as f64);
            } else {
                let start = points[index - 2].midpoint(from);
                canvas.move_to(start.x as f64, start.y as f64);
                canvas.quadratic_curve_to(from.x as f64, from.y as f64, end.x as f64, end.y as f64);
            }
        }
    }
    canvas.stroke();
}

/// Midpoint smoothing stops half a segment short; this closes the gap to the last point.
fn paint_tail<C: InkCanvas>(canvas: &mut C, style: &LineStyle, points: &[Point]) {
    if style.smoothing != Smoothing::Midpoint {
        return;
    }
    let [.., from, to] = points else {
        return;
    };
    let start = from.midpoint(*to);
    canvas.set_line_width(style.width_for(from.pressure, to.pressure));
    canvas.begin_path();
    canvas.move_to(start.x as f64, start.y as f64);
    canvas.line_to(to.x as f64, to.y as f64);
    canvas.stroke();
}
