use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::context::{LogEvent, LogSink};
use crate::levels::{LogLevel, Subsystem};

/// An owned copy of a [`LogEvent`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordedEvent {
    /// Severity.
    pub level: LogLevel,
    /// Originating subsystem.
    pub subsystem: Subsystem,
    /// Formatted message.
    pub message: String,
}

/// Sink that keeps every event in memory.
///
/// Clones share storage, so a test can hand one clone to a [`LogContext`]
/// and inspect the other.
///
/// [`LogContext`]: crate::LogContext
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.lock().clone()
    }

    /// Messages of every event, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|event| event.message.clone()).collect()
    }

    /// Messages recorded at exactly `level`.
    #[must_use]
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|event| event.level == level)
            .map(|event| event.message.clone())
            .collect()
    }

    /// Forgets every recorded event.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogSink for MemorySink {
    fn record(&self, event: &LogEvent<'_>) {
        self.lock().push(RecordedEvent {
            level: event.level,
            subsystem: event.subsystem,
            message: event.message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogContext;

    #[test]
    fn messages_can_be_filtered_by_level() {
        let sink = MemorySink::new();
        let ctx = LogContext::new(sink.clone());
        ctx.log(LogLevel::Warn, Subsystem::Protocol, format_args!("w"));
        ctx.log(LogLevel::Error, Subsystem::Protocol, format_args!("e"));
        assert_eq!(sink.messages_at(LogLevel::Error), ["e"]);

        sink.clear();
        assert!(sink.events().is_empty());
    }
}
