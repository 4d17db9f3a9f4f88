//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from the environment.
///
/// Safe to call more than once; later calls are ignored, so tests and
/// binaries can both initialize unconditionally.
pub fn init() {
    let _ = env_logger::Builder::from_default_env().try_init();
}

/// Initialize the logging system, falling back to `filter` when `RUST_LOG`
/// is not set in the environment.
pub fn init_with_default(filter: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .try_init();
}
