use std::fmt;
use std::sync::Arc;

use crate::levels::{LogLevel, Subsystem};

/// One diagnostic, borrowed for the duration of a [`LogSink::record`] call.
#[derive(Clone, Copy, Debug)]
pub struct LogEvent<'a> {
    /// Severity.
    pub level: LogLevel,
    /// Originating subsystem.
    pub subsystem: Subsystem,
    /// Lazily formatted message.
    pub message: fmt::Arguments<'a>,
}

/// Destination for log events.
///
/// Implementations must be shareable across threads because the generator
/// and receiver halves of a transfer log concurrently.
pub trait LogSink: Send + Sync {
    /// Consumes one event.
    fn record(&self, event: &LogEvent<'_>);
}

/// A sink that discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn record(&self, _event: &LogEvent<'_>) {}
}

/// Handle passed to every component that logs.
///
/// Cloning is cheap; clones share the same sink.
#[derive(Clone)]
pub struct LogContext {
    sink: Arc<dyn LogSink>,
    max_level: LogLevel,
    noop: bool,
}

impl fmt::Debug for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogContext")
            .field("max_level", &self.max_level)
            .field("noop", &self.noop)
            .finish_non_exhaustive()
    }
}

impl Default for LogContext {
    fn default() -> Self {
        Self::noop()
    }
}

impl LogContext {
    /// Creates a context that forwards every level to `sink`.
    pub fn new<S: LogSink + 'static>(sink: S) -> Self {
        Self::from_arc(Arc::new(sink))
    }

    /// Creates a context around an already shared sink.
    #[must_use]
    pub fn from_arc(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            max_level: LogLevel::Trace,
            noop: false,
        }
    }

    /// A context that discards everything.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            sink: Arc::new(NoopSink),
            max_level: LogLevel::Error,
            noop: true,
        }
    }

    /// A context that forwards to the `tracing` crate.
    #[cfg(feature = "tracing")]
    #[must_use]
    pub fn tracing() -> Self {
        Self::new(crate::tracing_bridge::TracingSink)
    }

    /// Restricts the context to events at `level` or more severe.
    #[must_use]
    pub const fn with_max_level(mut self, level: LogLevel) -> Self {
        self.max_level = level;
        self
    }

    /// Most verbose level that reaches the sink.
    #[must_use]
    pub const fn max_level(&self) -> LogLevel {
        self.max_level
    }

    /// Returns `true` when an event at `level` would reach the sink.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        !self.noop && level <= self.max_level
    }

    /// Emits an event. Prefer the `log_*!` macros, which build the
    /// [`fmt::Arguments`] for you.
    pub fn log(&self, level: LogLevel, subsystem: Subsystem, message: fmt::Arguments<'_>) {
        if self.enabled(level) {
            self.sink.record(&LogEvent {
                level,
                subsystem,
                message,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySink;

    #[test]
    fn default_context_is_silent() {
        let ctx = LogContext::default();
        for level in LogLevel::ALL {
            assert!(!ctx.enabled(level));
        }
        ctx.log(LogLevel::Error, Subsystem::Io, format_args!("dropped"));
    }

    #[test]
    fn max_level_filters_verbose_events() {
        let sink = MemorySink::new();
        let ctx = LogContext::new(sink.clone()).with_max_level(LogLevel::Info);

        ctx.log(LogLevel::Debug, Subsystem::Delta, format_args!("hidden"));
        ctx.log(LogLevel::Warn, Subsystem::Flist, format_args!("shown"));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].subsystem, Subsystem::Flist);
    }

    #[test]
    fn clones_share_the_sink() {
        let sink = MemorySink::new();
        let ctx = LogContext::new(sink.clone());
        let other = ctx.clone();
        ctx.log(LogLevel::Info, Subsystem::Auth, format_args!("one"));
        other.log(LogLevel::Info, Subsystem::Auth, format_args!("two"));
        assert_eq!(sink.messages(), ["one", "two"]);
    }
}
