//! Logging setup shared by hosts embedding the permission matrix.

/// Tracing subscriber configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{LogFormat, init, init_for_tests, init_with};
