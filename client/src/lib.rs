use wasm_bindgen::prelude::*;

mod app;
mod dom;
mod events;
mod logging;
mod page_lock;
mod render;

pub use app::InkSurface;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    logging::configure();
}
