use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, DomRect, HtmlCanvasElement, HtmlElement, Window};

use inkpad_shared::{LogicalSize, Point};

pub fn get_element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    let element = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing element: {id}")))?;
    element
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {id}")))
}

/// Accepts either a canvas element or the id of one.
pub fn resolve_canvas(document: &Document, target: JsValue) -> Result<HtmlCanvasElement, JsValue> {
    if let Some(id) = target.as_string() {
        return get_element(document, &id);
    }
    target
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str("Expected a canvas element or its id"))
}

/// Lets the canvas follow its container's width at a fixed display height.
pub fn apply_canvas_layout(canvas: &HtmlCanvasElement, height: f64) {
    let style = canvas.style();
    let _ = style.set_property("display", "block");
    let _ = style.set_property("width", "100%");
    let _ = style.set_property("height", &format!("{height}px"));
}

pub fn set_inert(canvas: &HtmlCanvasElement, inert: bool) {
    let value = if inert { "true" } else { "false" };
    let _ = canvas.set_attribute("aria-disabled", value);
}

pub fn measure_canvas(window: &Window, canvas: &HtmlCanvasElement, height: f64) -> (LogicalSize, f64) {
    let rect = canvas.get_bounding_client_rect();
    let dpr = window.device_pixel_ratio();
    (LogicalSize::new(rect.width(), height), dpr)
}

pub fn local_point(rect: &DomRect, client_x: f64, client_y: f64) -> Point {
    Point::new(
        (client_x - rect.left()) as f32,
        (client_y - rect.top()) as f32,
    )
}

/// Overrides one inline style property and remembers what was there before.
pub struct StyleOverride {
    element: HtmlElement,
    property: &'static str,
    previous: Option<String>,
}

impl StyleOverride {
    pub fn new(element: HtmlElement, property: &'static str) -> Self {
        Self {
            element,
            property,
            previous: None,
        }
    }

    pub fn apply(&mut self, value: &str) {
        let style = self.element.style();
        if self.previous.is_none() {
            self.previous = Some(style.get_property_value(self.property).unwrap_or_default());
        }
        let _ = style.set_property(self.property, value);
    }

    pub fn restore(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        let style = self.element.style();
        if previous.is_empty() {
            let _ = style.remove_property(self.property);
        } else {
            let _ = style.set_property(self.property, &previous);
        }
    }
}
