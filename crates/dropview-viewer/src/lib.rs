//! Dropview - drag-and-drop 3D model viewer
//!
//! Runs in the browser (WebGPU / WebGL2) and on the desktop. Files dropped
//! onto the canvas, or picked through the Browse button, are handed to the
//! format dispatcher and show up in the live scene.

pub mod app;
pub mod input;
pub mod loader;
pub mod ui;
#[cfg(target_arch = "wasm32")]
mod web_source;

pub use app::run;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Entry point for WASM module
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    // Set panic hook for better error messages
    console_error_panic_hook::set_once();

    let config = dropview_core::ViewerConfig::default();

    // Keep wgpu noise out of the browser console unless the page asks for more
    let max_level = console_level(page_log_level().as_deref(), &config.logging.wasm_max_level);
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(max_level)
            .build(),
    );

    app::run(config);
}

/// `?log=<level>` on the page URL, e.g. `?log=info` to see load progress
#[cfg(target_arch = "wasm32")]
fn page_log_level() -> Option<String> {
    let href = web_sys::window()?.location().href().ok()?;
    web_sys::Url::new(&href).ok()?.search_params().get("log")
}

/// Console level: the page override if it parses, else the configured level,
/// else WARN
#[cfg(any(target_arch = "wasm32", test))]
fn console_level(page: Option<&str>, configured: &str) -> tracing::Level {
    page.and_then(|level| level.parse().ok())
        .or_else(|| configured.parse().ok())
        .unwrap_or(tracing::Level::WARN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_page_level_overrides_config() {
        assert_eq!(console_level(Some("info"), "warn"), Level::INFO);
        assert_eq!(console_level(Some("DEBUG"), "warn"), Level::DEBUG);
    }

    #[test]
    fn test_bad_page_level_falls_back() {
        assert_eq!(console_level(Some("loud"), "error"), Level::ERROR);
        assert_eq!(console_level(None, "warn"), Level::WARN);
        assert_eq!(console_level(None, "nonsense"), Level::WARN);
    }
}
