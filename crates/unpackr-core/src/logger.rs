//! Logging capability consumed by the queue and the extractors.
//!
//! The library never installs a `tracing` subscriber. Applications either
//! plug in their own [`Logger`] or use [`TracingLogger`], which forwards to
//! whatever subscriber the binary configured.

use std::fmt;

/// Sink for informational and debug messages.
///
/// Logging never influences control flow; implementations must not panic.
pub trait Logger: Send + Sync {
    /// Records an informational message.
    fn info(&self, message: &str);

    /// Records a debug message.
    fn debug(&self, message: &str);
}

/// [`Logger`] that emits `tracing` events with target `unpackr`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "unpackr", "{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "unpackr", "{message}");
    }
}

/// [`Logger`] that drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn info(&self, _message: &str) {}

    fn debug(&self, _message: &str) {}
}

impl fmt::Debug for dyn Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Logger")
    }
}
