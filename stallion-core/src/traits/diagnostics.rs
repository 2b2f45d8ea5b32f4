//! Operator-facing diagnostic messages

use core::fmt;

/// Message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MsgLevel {
    /// Configuration or hardware error
    Error,
    /// Something the operator should look at
    Warning,
    /// Normal status report
    Info,
    /// Tuning output
    Debug,
}

/// Destination for operator messages (serial console, display, ...)
///
/// Sending is fire-and-forget. Implementations that need mutable state use
/// interior mutability so several drivers can share one sink.
pub trait DiagnosticSink {
    /// Emit a formatted message
    fn send(&self, level: MsgLevel, args: fmt::Arguments<'_>);
}
