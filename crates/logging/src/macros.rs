//! Convenience macros that format lazily through a [`LogContext`].
//!
//! [`LogContext`]: crate::LogContext

/// Emit an error through a log context.
///
/// # Example
/// ```
/// use logging::{LogContext, Subsystem, log_error};
///
/// log_error!(LogContext::default(), Subsystem::Io, "cannot write {}", "a.txt");
/// ```
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $subsystem:expr, $($arg:tt)*) => {
        $ctx.log($crate::LogLevel::Error, $subsystem, format_args!($($arg)*))
    };
}

/// Emit a warning through a log context.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $subsystem:expr, $($arg:tt)*) => {
        $ctx.log($crate::LogLevel::Warn, $subsystem, format_args!($($arg)*))
    };
}

/// Emit an informational event through a log context.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $subsystem:expr, $($arg:tt)*) => {
        $ctx.log($crate::LogLevel::Info, $subsystem, format_args!($($arg)*))
    };
}

/// Emit a debug event through a log context.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $subsystem:expr, $($arg:tt)*) => {
        $ctx.log($crate::LogLevel::Debug, $subsystem, format_args!($($arg)*))
    };
}

/// Emit a trace event through a log context.
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $subsystem:expr, $($arg:tt)*) => {
        $ctx.log($crate::LogLevel::Trace, $subsystem, format_args!($($arg)*))
    };
}
