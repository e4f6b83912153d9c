use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::Function;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    AddEventListenerOptions, Document, Event, EventTarget, HtmlCanvasElement, PointerEvent,
    ResizeObserver, TouchEvent, Window,
};

use inkpad_shared::{
    encode_ink, Capture, InkSnapshot, InputId, Phase, Response, StrokeSurface, SurfaceConfig,
};

use crate::dom::{apply_canvas_layout, measure_canvas, resolve_canvas, set_inert};
use crate::events::{coalesced_pointer_events, pointer_sample, touch_batch};
use crate::page_lock::{DomPageLock, LockFlags};
use crate::render::WebCanvas;

/// An event listener that unregisters itself when dropped.
struct Listener {
    target: EventTarget,
    name: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn attach(
        target: &EventTarget,
        name: &'static str,
        callback: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut(Event)>::new(callback);
        // Non-passive so touch handlers may cancel scrolling.
        let options = AddEventListenerOptions::new();
        options.set_passive(false);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            name,
            callback.as_ref().unchecked_ref(),
            &options,
        )?;
        Ok(Self {
            target: target.clone(),
            name,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.name, self.callback.as_ref().unchecked_ref());
    }
}

struct ResizeWatch {
    observer: ResizeObserver,
    _callback: Closure<dyn FnMut(js_sys::Array)>,
}

impl Drop for ResizeWatch {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

struct Inner {
    window: Window,
    canvas: HtmlCanvasElement,
    config: SurfaceConfig,
    surface: RefCell<Option<StrokeSurface<WebCanvas>>>,
    on_change: RefCell<Option<Function>>,
    listeners: RefCell<Vec<Listener>>,
    resize_watch: RefCell<Option<ResizeWatch>>,
}

impl Inner {
    fn with_surface<R>(&self, f: impl FnOnce(&mut StrokeSurface<WebCanvas>) -> R) -> Option<R> {
        let Ok(mut surface) = self.surface.try_borrow_mut() else {
            tracing::warn!("ink surface is busy, event dropped");
            return None;
        };
        surface.as_mut().map(f)
    }

    fn resize(&self) {
        let (size, ratio) = measure_canvas(&self.window, &self.canvas, self.config.height);
        self.with_surface(|surface| surface.on_resize(size, ratio));
    }

    fn snapshot_json(&self) -> Result<String, JsValue> {
        let surface = self
            .surface
            .try_borrow()
            .map_err(|_| JsValue::from_str("Ink surface is busy"))?;
        let json = match &*surface {
            Some(surface) => surface.view().to_json(),
            None => serde_json::to_string(&InkSnapshot::default()),
        };
        json.map_err(|error| JsValue::from_str(&error.to_string()))
    }

    /// Hands the current ink to the host callback. Runs with no borrows held
    /// so the callback may call back into the surface.
    fn notify(&self) {
        let Some(callback) = self.on_change.borrow().clone() else {
            return;
        };
        let json = match self.snapshot_json() {
            Ok(json) => json,
            Err(error) => {
                tracing::warn!("failed to snapshot ink: {error:?}");
                return;
            }
        };
        if let Err(error) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
            tracing::warn!("ink change callback threw: {error:?}");
        }
    }

    fn settle(&self, event: &Event, response: Response) {
        if response.consumed && event.cancelable() {
            event.prevent_default();
        }
        self.apply_capture(response.capture);
        if response.changed {
            self.notify();
        }
    }

    fn apply_capture(&self, capture: Capture) {
        match capture {
            Capture::Keep => {}
            Capture::Acquire(pointer_id) => {
                if let Err(error) = self.canvas.set_pointer_capture(pointer_id) {
                    tracing::debug!("pointer capture refused: {error:?}");
                }
            }
            Capture::Release(pointer_id) => {
                if self.canvas.has_pointer_capture(pointer_id) {
                    let _ = self.canvas.release_pointer_capture(pointer_id);
                }
            }
        }
    }

    fn teardown(&self) {
        self.listeners.borrow_mut().clear();
        self.resize_watch.borrow_mut().take();
        // The partial stroke is committed first so the host's last payload matches.
        if let Some(response) = self.with_surface(|surface| surface.teardown()) {
            self.apply_capture(response.capture);
            if response.changed {
                self.notify();
            }
        }
        self.surface.borrow_mut().take();
        set_inert(&self.canvas, true);
    }
}

fn merge(total: Response, next: Response) -> Response {
    Response {
        consumed: total.consumed || next.consumed,
        capture: match next.capture {
            Capture::Keep => total.capture,
            capture => capture,
        },
        changed: total.changed || next.changed,
    }
}

const UNTOUCHED: Response = Response {
    consumed: false,
    capture: Capture::Keep,
    changed: false,
};

fn on_pointer(inner: &Inner, event: &PointerEvent, phase: Phase) {
    let events = if phase == Phase::Move && inner.config.coalesce {
        coalesced_pointer_events(event)
    } else {
        vec![event.clone()]
    };
    let rect = inner.canvas.get_bounding_client_rect();
    let response = inner.with_surface(|surface| {
        events.iter().fold(UNTOUCHED, |total, event| {
            merge(total, surface.handle_pointer(&pointer_sample(&rect, event, phase)))
        })
    });
    if let Some(response) = response {
        inner.settle(event, response);
    }
}

fn on_touch(inner: &Inner, event: &TouchEvent, phase: Phase) {
    let rect = inner.canvas.get_bounding_client_rect();
    let batch = touch_batch(&rect, event, phase);
    if let Some(response) = inner.with_surface(|surface| surface.handle_touches(&batch)) {
        inner.settle(event, response);
    }
}

fn on_lost_capture(inner: &Inner, event: &PointerEvent) {
    let id = InputId::Pointer(event.pointer_id());
    if let Some(response) = inner.with_surface(|surface| surface.lost_capture(id)) {
        inner.settle(event, response);
    }
}

fn pointer_listener(
    inner: &Rc<Inner>,
    name: &'static str,
    handler: impl Fn(&Inner, &PointerEvent) + 'static,
) -> Result<Listener, JsValue> {
    let weak: Weak<Inner> = Rc::downgrade(inner);
    Listener::attach(inner.canvas.as_ref(), name, move |event: Event| {
        let (Some(inner), Some(event)) = (weak.upgrade(), event.dyn_ref::<PointerEvent>()) else {
            return;
        };
        handler(&inner, event);
    })
}

fn touch_listener(inner: &Rc<Inner>, name: &'static str, phase: Phase) -> Result<Listener, JsValue> {
    let weak: Weak<Inner> = Rc::downgrade(inner);
    Listener::attach(inner.canvas.as_ref(), name, move |event: Event| {
        let (Some(inner), Some(event)) = (weak.upgrade(), event.dyn_ref::<TouchEvent>()) else {
            return;
        };
        on_touch(&inner, event, phase);
    })
}

fn install_listeners(inner: &Rc<Inner>, document: &Document, flags: LockFlags) -> Result<(), JsValue> {
    let mut listeners = Vec::new();

    for (name, phase) in [
        ("pointerdown", Phase::Start),
        ("pointermove", Phase::Move),
        ("pointerup", Phase::End),
        ("pointercancel", Phase::Cancel),
    ] {
        listeners.push(pointer_listener(inner, name, move |inner, event| {
            on_pointer(inner, event, phase)
        })?);
    }
    listeners.push(pointer_listener(inner, "lostpointercapture", on_lost_capture)?);

    for (name, phase) in [
        ("touchstart", Phase::Start),
        ("touchmove", Phase::Move),
        ("touchend", Phase::End),
        ("touchcancel", Phase::Cancel),
    ] {
        listeners.push(touch_listener(inner, name, phase)?);
    }

    {
        let weak = Rc::downgrade(inner);
        listeners.push(Listener::attach(inner.window.as_ref(), "resize", move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.resize();
            }
        })?);
    }

    {
        let scroll = flags.scroll.clone();
        listeners.push(Listener::attach(inner.canvas.as_ref(), "wheel", move |event: Event| {
            if scroll.get() {
                event.prevent_default();
            }
        })?);
    }

    // Palm contacts elsewhere on the page while a stylus is writing.
    for name in ["touchmove", "selectstart"] {
        let palm = flags.palm.clone();
        listeners.push(Listener::attach(document.as_ref(), name, move |event: Event| {
            if palm.get() && event.cancelable() {
                event.prevent_default();
            }
        })?);
    }

    *inner.listeners.borrow_mut() = listeners;

    let weak = Rc::downgrade(inner);
    let callback = Closure::<dyn FnMut(js_sys::Array)>::new(move |_entries: js_sys::Array| {
        if let Some(inner) = weak.upgrade() {
            inner.resize();
        }
    });
    let observer = ResizeObserver::new(callback.as_ref().unchecked_ref())?;
    observer.observe(&inner.canvas);
    *inner.resize_watch.borrow_mut() = Some(ResizeWatch {
        observer,
        _callback: callback,
    });
    Ok(())
}

fn read_config(options: &JsValue) -> Result<SurfaceConfig, JsValue> {
    if options.is_undefined() || options.is_null() {
        return Ok(SurfaceConfig::default());
    }
    let text: String = js_sys::JSON::stringify(options)?.into();
    SurfaceConfig::from_json(&text).map_err(|error| JsValue::from_str(&error.to_string()))
}

/// Freehand ink surface mounted on a `<canvas>`.
#[wasm_bindgen]
pub struct InkSurface {
    inner: Rc<Inner>,
}

#[wasm_bindgen]
impl InkSurface {
    /// Mounts on `target` (a canvas element or its id). Without a 2-D
    /// context the surface stays inert instead of failing.
    #[wasm_bindgen(constructor)]
    pub fn new(target: JsValue, options: JsValue) -> Result<InkSurface, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("Missing document"))?;
        let canvas = resolve_canvas(&document, target)?;
        let config = read_config(&options)?;
        apply_canvas_layout(&canvas, config.height);

        let flags = LockFlags::default();
        let surface = match WebCanvas::from_element(&canvas) {
            Some(backend) => {
                let lock = Rc::new(DomPageLock::new(&document, &canvas, flags.clone()));
                Some(StrokeSurface::new(backend, config.clone(), lock))
            }
            None => {
                tracing::error!("2d context unavailable, ink surface left inert");
                None
            }
        };
        let live = surface.is_some();
        set_inert(&canvas, !live);

        let inner = Rc::new(Inner {
            window,
            canvas,
            config,
            surface: RefCell::new(surface),
            on_change: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            resize_watch: RefCell::new(None),
        });
        if live {
            inner.resize();
            install_listeners(&inner, &document, flags)?;
        }
        Ok(InkSurface { inner })
    }

    pub fn clear(&self) {
        if self.inner.with_surface(|surface| surface.clear()).is_some() {
            self.inner.notify();
        }
    }

    #[wasm_bindgen(js_name = isDrawing)]
    pub fn is_drawing(&self) -> bool {
        self.inner.with_surface(|surface| surface.is_drawing()).unwrap_or(false)
    }

    #[wasm_bindgen(js_name = isInert)]
    pub fn is_inert(&self) -> bool {
        self.inner.surface.borrow().is_none()
    }

    #[wasm_bindgen(js_name = strokeCount)]
    pub fn stroke_count(&self) -> usize {
        self.inner
            .with_surface(|surface| surface.history().len())
            .unwrap_or(0)
    }

    /// Called with the ink as JSON after every change. Pass `null` to stop.
    #[wasm_bindgen(js_name = setOnChange)]
    pub fn set_on_change(&self, callback: Option<Function>) {
        *self.inner.on_change.borrow_mut() = callback;
    }

    pub fn snapshot(&self) -> Result<String, JsValue> {
        self.inner.snapshot_json()
    }

    #[wasm_bindgen(js_name = snapshotBytes)]
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>, JsValue> {
        let snapshot = self
            .inner
            .with_surface(|surface| surface.view().to_snapshot())
            .unwrap_or_default();
        encode_ink(&snapshot).map_err(|error| JsValue::from_str(&error.to_string()))
    }

    pub fn resize(&self) {
        self.inner.resize();
    }

    /// Detaches from the page and releases any scroll lock still held.
    pub fn destroy(&self) {
        self.inner.teardown();
    }
}

impl Drop for InkSurface {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}
