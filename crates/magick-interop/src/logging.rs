//! Logging setup for binaries and tests using the interop layer.
//!
//! The layer itself only emits `tracing` events: handle lifecycle at
//! `trace`, library loading at `debug`, native warnings at `warn`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Target used by every event the layer emits.
pub const TARGET: &str = "magick_interop";

/// Install a compact terminal subscriber filtered by `RUST_LOG`, falling
/// back to `info`.
pub fn init() {
    init_with_filter("info");
}

/// Same as [`init`] with `default_filter` used when `RUST_LOG` is unset.
pub fn init_with_filter(default_filter: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt::layer().compact())
        .init();
}

/// Like [`init_with_filter`], but returns `false` instead of panicking when
/// a global subscriber is already installed. Tests call this repeatedly.
pub fn try_init(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt::layer().compact().with_test_writer())
        .try_init()
        .is_ok()
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}
