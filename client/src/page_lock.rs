use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlCanvasElement, HtmlElement};

use inkpad_shared::PageLock;

use crate::dom::StyleOverride;

/// Flags the document-level listeners consult while a gesture is active.
#[derive(Clone, Default)]
pub struct LockFlags {
    pub scroll: Rc<Cell<bool>>,
    pub palm: Rc<Cell<bool>>,
}

pub struct DomPageLock {
    flags: LockFlags,
    touch_action: RefCell<StyleOverride>,
    overscroll: RefCell<Option<StyleOverride>>,
    user_select: RefCell<Option<StyleOverride>>,
    webkit_user_select: RefCell<Option<StyleOverride>>,
}

impl DomPageLock {
    pub fn new(document: &Document, canvas: &HtmlCanvasElement, flags: LockFlags) -> Self {
        let canvas_element: HtmlElement = canvas.clone().unchecked_into();
        let root = document
            .document_element()
            .and_then(|element| element.dyn_into::<HtmlElement>().ok());
        let body = document.body();
        Self {
            flags,
            touch_action: RefCell::new(StyleOverride::new(canvas_element, "touch-action")),
            overscroll: RefCell::new(root.map(|root| StyleOverride::new(root, "overscroll-behavior"))),
            user_select: RefCell::new(
                body.clone()
                    .map(|body| StyleOverride::new(body, "user-select")),
            ),
            webkit_user_select: RefCell::new(
                body.map(|body| StyleOverride::new(body, "-webkit-user-select")),
            ),
        }
    }
}

fn apply(slot: &RefCell<Option<StyleOverride>>, value: &str) {
    if let Some(style) = slot.borrow_mut().as_mut() {
        style.apply(value);
    }
}

fn restore(slot: &RefCell<Option<StyleOverride>>) {
    if let Some(style) = slot.borrow_mut().as_mut() {
        style.restore();
    }
}

impl PageLock for DomPageLock {
    fn suspend_scroll(&self) {
        self.flags.scroll.set(true);
        self.touch_action.borrow_mut().apply("none");
        apply(&self.overscroll, "none");
    }

    fn restore_scroll(&self) {
        self.flags.scroll.set(false);
        self.touch_action.borrow_mut().restore();
        restore(&self.overscroll);
    }

    fn block_palm(&self) {
        self.flags.palm.set(true);
        apply(&self.user_select, "none");
        apply(&self.webkit_user_select, "none");
    }

    fn unblock_palm(&self) {
        self.flags.palm.set(false);
        restore(&self.user_select);
        restore(&self.webkit_user_select);
    }
}
