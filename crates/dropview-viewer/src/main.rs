//! Dropview - native entry point
//!
//! The browser build starts from `lib.rs`; this binary runs the same app in
//! a desktop window, reading `dropview.toml` from the working directory.

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use std::path::Path;
    use tracing::info;
    use tracing_subscriber::EnvFilter;

    const CONFIG_PATH: &str = "dropview.toml";

    let config = dropview_core::load_config(Path::new(CONFIG_PATH))?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))?;
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Dropview v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config = CONFIG_PATH,
        level = %config.logging.level,
        "Starting viewer"
    );

    dropview_viewer::run(config);
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {}
