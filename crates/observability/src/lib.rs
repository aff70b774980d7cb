//! Process-wide tracing setup shared by the wardstock binaries.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize tracing with the format chosen by `WARDSTOCK_LOG_FORMAT`.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    crate::tracing::init(LogFormat::from_env());
}
