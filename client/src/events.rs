use js_sys::{Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{DomRect, PointerEvent, Touch, TouchEvent, TouchList};

use inkpad_shared::{Phase, PointerKind, PointerSample, TouchBatch, TouchContact, TouchKind};

use crate::dom::local_point;

pub fn pointer_sample(rect: &DomRect, event: &PointerEvent, phase: Phase) -> PointerSample {
    let point = local_point(rect, event.client_x() as f64, event.client_y() as f64)
        .with_pressure(event.pressure());
    PointerSample {
        id: event.pointer_id(),
        kind: PointerKind::from_pointer_type(&event.pointer_type()),
        phase,
        button: event.button(),
        buttons: event.buttons(),
        point,
        timestamp: event.time_stamp(),
    }
}

pub fn touch_batch(rect: &DomRect, event: &TouchEvent, phase: Phase) -> TouchBatch {
    TouchBatch {
        phase,
        timestamp: event.time_stamp(),
        changed: touch_contacts(rect, &event.changed_touches()),
        touches: touch_contacts(rect, &event.touches()),
    }
}

fn touch_contacts(rect: &DomRect, list: &TouchList) -> Vec<TouchContact> {
    (0..list.length())
        .filter_map(|index| list.get(index))
        .map(|touch| TouchContact {
            id: touch.identifier(),
            kind: touch_kind(&touch),
            point: local_point(rect, touch.client_x() as f64, touch.client_y() as f64)
                .with_pressure(touch.force()),
        })
        .collect()
}

/// `Touch.touchType` is only implemented by WebKit.
fn touch_kind(touch: &Touch) -> TouchKind {
    let value = Reflect::get(touch.as_ref(), &JsValue::from_str("touchType"))
        .ok()
        .and_then(|value| value.as_string());
    TouchKind::from_touch_type(value.as_deref())
}

/// Every sample the browser merged into this event, oldest first.
pub fn coalesced_pointer_events(event: &PointerEvent) -> Vec<PointerEvent> {
    let get_coalesced_events =
        Reflect::get(event.as_ref(), &JsValue::from_str("getCoalescedEvents"))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok());

    let mut out = Vec::new();
    if let Some(get_coalesced_events) = get_coalesced_events {
        if let Ok(events) = get_coalesced_events
            .call0(event.as_ref())
            .and_then(|value| value.dyn_into::<js_sys::Array>())
        {
            out.reserve(events.length() as usize + 1);
            for index in 0..events.length() {
                if let Ok(event) = events.get(index).dyn_into::<PointerEvent>() {
                    out.push(event);
                }
            }
        }
    }
    if out.is_empty() {
        out.push(event.clone());
    }
    out.sort_by(|a, b| {
        a.time_stamp()
            .partial_cmp(&b.time_stamp())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out
}
