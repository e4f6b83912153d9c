/// Routes `tracing` output to the browser console. Leaves an already
/// installed subscriber alone.
pub fn configure() {
    #[cfg(target_arch = "wasm32")]
    if let Err(error) = tracing_wasm::try_set_as_global_default() {
        web_sys::console::warn_1(&format!("tracing already configured: {error}").into());
    }
}
