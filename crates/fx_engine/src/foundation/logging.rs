//! Logging utilities
//!
//! Thin wrappers over `env_logger` so hosts initialize logging the same way
//! across tools and applications.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from the `RUST_LOG` environment variable
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with a fallback filter
///
/// `RUST_LOG` still wins when set; otherwise the given filter (e.g. "info"
/// or "fx_engine=debug") applies.
pub fn init_with_default(filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}
