//! Leveled logging capability.
//!
//! The hub only ever talks to a [`BasicLogger`]; the backend is chosen by
//! whoever constructs it. [`TracingLogger`] forwards to `tracing`.

use std::fmt;

/// Leveled diagnostic sink with a plain and a formatted variant per level.
///
/// Implementors provide the formatted variants; the plain ones forward to
/// them. Logging never influences control flow inside the hub. `fatal`
/// marks an unrecoverable condition, but terminating the process is left to
/// the caller that owns the logger.
pub trait BasicLogger: Send + Sync {
    /// Formatted debug message.
    fn debugf(&self, args: fmt::Arguments<'_>);
    /// Formatted info message.
    fn infof(&self, args: fmt::Arguments<'_>);
    /// Formatted warning.
    fn warnf(&self, args: fmt::Arguments<'_>);
    /// Formatted error.
    fn errorf(&self, args: fmt::Arguments<'_>);
    /// Formatted fatal message.
    fn fatalf(&self, args: fmt::Arguments<'_>);

    /// Debug message.
    fn debug(&self, msg: &str) {
        self.debugf(format_args!("{msg}"));
    }

    /// Info message.
    fn info(&self, msg: &str) {
        self.infof(format_args!("{msg}"));
    }

    /// Warning.
    fn warn(&self, msg: &str) {
        self.warnf(format_args!("{msg}"));
    }

    /// Error.
    fn error(&self, msg: &str) {
        self.errorf(format_args!("{msg}"));
    }

    /// Fatal message.
    fn fatal(&self, msg: &str) {
        self.fatalf(format_args!("{msg}"));
    }
}

/// [`BasicLogger`] backed by the `tracing` macros.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    component: &'static str,
}

impl TracingLogger {
    /// Creates a logger tagging every event with `component`.
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("wshub")
    }
}

impl BasicLogger for TracingLogger {
    fn debugf(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(component = self.component, "{}", args);
    }

    fn infof(&self, args: fmt::Arguments<'_>) {
        tracing::info!(component = self.component, "{}", args);
    }

    fn warnf(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(component = self.component, "{}", args);
    }

    fn errorf(&self, args: fmt::Arguments<'_>) {
        tracing::error!(component = self.component, "{}", args);
    }

    fn fatalf(&self, args: fmt::Arguments<'_>) {
        tracing::error!(component = self.component, fatal = true, "{}", args);
    }
}
