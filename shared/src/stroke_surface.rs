use std::rc::Rc;

use crate::classifier::{Capture, Decision, InputClassifier, InputId, PointerSample, TouchBatch};
use crate::config::SurfaceConfig;
use crate::guard::PageLock;
use crate::render::{InkCanvas, StrokeRenderer};
use crate::surface::{LogicalSize, SurfaceManager, SurfaceTransform};
use crate::{InkView, Stroke};

/// What the host should do with the event it just fed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Response {
    /// Suppress the browser default (scrolling, selection, compat mouse events).
    pub consumed: bool,
    pub capture: Capture,
    /// The stroke buffer changed; observers may want a fresh snapshot.
    pub changed: bool,
}

impl Response {
    fn pass() -> Self {
        Self {
            consumed: false,
            capture: Capture::Keep,
            changed: false,
        }
    }
}

/// A freehand ink surface: classifier, renderer and backing buffer in one.
pub struct StrokeSurface<C: InkCanvas> {
    canvas: C,
    surface: SurfaceManager,
    classifier: InputClassifier,
    renderer: StrokeRenderer,
}

impl<C: InkCanvas> StrokeSurface<C> {
    pub fn new(canvas: C, config: SurfaceConfig, lock: Rc<dyn PageLock>) -> Self {
        let config = config.sanitized();
        let classifier = InputClassifier::new(config.touch_policy, config.palm_rejection, lock);
        let renderer = StrokeRenderer::new(config.line_style());
        Self {
            canvas,
            surface: SurfaceManager::new(),
            classifier,
            renderer,
        }
    }

    #[cfg(test)]
    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    #[cfg(test)]
    pub fn transform(&self) -> SurfaceTransform {
        self.surface.transform()
    }

    pub fn is_drawing(&self) -> bool {
        self.classifier.is_drawing()
    }

    pub fn history(&self) -> &[Stroke] {
        self.renderer.history()
    }

    pub fn current_stroke(&self) -> Option<&Stroke> {
        self.renderer.current()
    }

    pub fn view(&self) -> InkView<'_> {
        self.renderer.view()
    }

    pub fn initialize(&mut self, size: LogicalSize, ratio: f64) -> SurfaceTransform {
        self.surface
            .initialize(&mut self.canvas, size, ratio, self.renderer.style())
    }

    /// Reallocates for the new size and repaints from history. While a
    /// gesture is in progress the reallocation waits for it to finish.
    /// Returns whether the resize was applied now.
    pub fn on_resize(&mut self, size: LogicalSize, ratio: f64) -> bool {
        if self.classifier.is_drawing() {
            tracing::debug!("resize deferred until the gesture ends");
            self.surface.defer(size, ratio);
            return false;
        }
        self.initialize(size, ratio);
        self.repaint_all();
        true
    }

    pub fn repaint_all(&mut self) {
        let transform = self.surface.transform();
        self.renderer.repaint_all(&mut self.canvas, &transform);
    }

    pub fn clear(&mut self) {
        let transform = self.surface.transform();
        self.renderer.clear(&mut self.canvas, &transform);
    }

    pub fn handle_pointer(&mut self, sample: &PointerSample) -> Response {
        let active = self.classifier.active_id();
        let decision = self.classifier.classify_pointer(sample);
        self.apply(active, decision)
    }

    pub fn handle_touches(&mut self, batch: &TouchBatch) -> Response {
        let active = self.classifier.active_id();
        let decision = self.classifier.classify_touches(batch);
        self.apply(active, decision)
    }

    pub fn lost_capture(&mut self, id: InputId) -> Response {
        let active = self.classifier.active_id();
        let decision = self.classifier.lost_capture(id);
        self.apply(active, decision)
    }

    /// Ends any gesture in progress and releases the page lock. Safe to call
    /// more than once; dropping the surface has the same effect.
    pub fn teardown(&mut self) -> Response {
        let active = self.classifier.active_id();
        if self.classifier.release().is_none() {
            return Response::pass();
        }
        tracing::debug!("surface torn down mid-gesture");
        self.apply(active, Decision::Finish)
    }

    fn apply(&mut self, active: Option<InputId>, decision: Decision) -> Response {
        match decision {
            Decision::Pass => Response::pass(),
            Decision::Absorb => Response {
                consumed: true,
                capture: Capture::Keep,
                changed: false,
            },
            Decision::Begin { id, point } => {
                self.renderer.begin_stroke(point);
                let capture = match id {
                    InputId::Pointer(pointer_id) => Capture::Acquire(pointer_id),
                    InputId::Touch(_) => Capture::Keep,
                };
                Response {
                    consumed: true,
                    capture,
                    changed: true,
                }
            }
            Decision::Extend(point) => {
                self.renderer.extend_stroke(&mut self.canvas, point);
                Response {
                    consumed: true,
                    capture: Capture::Keep,
                    changed: true,
                }
            }
            Decision::Finish => {
                self.renderer.end_stroke(&mut self.canvas);
                if let Some((size, ratio)) = self.surface.take_pending() {
                    self.on_resize(size, ratio);
                }
                let capture = match active {
                    Some(InputId::Pointer(pointer_id)) => Capture::Release(pointer_id),
                    _ => Capture::Keep,
                };
                Response {
                    consumed: true,
                    capture,
                    changed: true,
                }
            }
        }
    }
}
