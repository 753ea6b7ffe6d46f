//! Bridge from [`LogContext`](crate::LogContext) events to the `tracing`
//! crate.
//!
//! `tracing` needs its target and level at compile time, so every
//! subsystem/level pair expands to its own macro call.

use tracing_subscriber::EnvFilter;

use crate::context::{LogEvent, LogSink};
use crate::levels::{LogLevel, Subsystem};

/// Sink that re-emits events through `tracing`.
///
/// Targets are `rsync::<subsystem>`, so `RUST_LOG=rsync::protocol=debug`
/// selects handshake detail only.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

macro_rules! forward {
    ($target:literal, $level:expr, $message:expr) => {
        match $level {
            LogLevel::Error => tracing::error!(target: $target, "{}", $message),
            LogLevel::Warn => tracing::warn!(target: $target, "{}", $message),
            LogLevel::Info => tracing::info!(target: $target, "{}", $message),
            LogLevel::Debug => tracing::debug!(target: $target, "{}", $message),
            LogLevel::Trace => tracing::trace!(target: $target, "{}", $message),
        }
    };
}

impl LogSink for TracingSink {
    fn record(&self, event: &LogEvent<'_>) {
        let message = event.message;
        match event.subsystem {
            Subsystem::Connect => forward!("rsync::connect", event.level, message),
            Subsystem::Protocol => forward!("rsync::protocol", event.level, message),
            Subsystem::Auth => forward!("rsync::auth", event.level, message),
            Subsystem::Flist => forward!("rsync::flist", event.level, message),
            Subsystem::Generator => forward!("rsync::generator", event.level, message),
            Subsystem::Receiver => forward!("rsync::receiver", event.level, message),
            Subsystem::Delta => forward!("rsync::delta", event.level, message),
            Subsystem::Io => forward!("rsync::io", event.level, message),
        }
    }
}

/// Installs a global `fmt` subscriber writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise events at `default_level` and more
/// severe are shown. Calling this twice is harmless: the second call leaves
/// the first subscriber in place.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogContext;
    use std::sync::{Arc, Mutex};
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    type Seen = Arc<Mutex<Vec<(String, tracing::Level)>>>;

    struct Capture(Seen);

    impl<S: Subscriber> Layer<S> for Capture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let metadata = event.metadata();
            self.0
                .lock()
                .unwrap()
                .push((metadata.target().to_owned(), *metadata.level()));
        }
    }

    #[test]
    fn events_use_subsystem_targets_and_levels() {
        let seen = Seen::default();
        let subscriber = tracing_subscriber::registry().with(Capture(Arc::clone(&seen)));

        tracing::subscriber::with_default(subscriber, || {
            let ctx = LogContext::tracing();
            for subsystem in Subsystem::ALL {
                ctx.log(LogLevel::Warn, subsystem, format_args!("x"));
            }
            ctx.log(LogLevel::Trace, Subsystem::Delta, format_args!("y"));
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), Subsystem::ALL.len() + 1);
        for (subsystem, (target, level)) in Subsystem::ALL.iter().zip(seen.iter()) {
            assert_eq!(target, subsystem.target());
            assert_eq!(*level, tracing::Level::WARN);
        }
        assert_eq!(seen[8], ("rsync::delta".to_owned(), tracing::Level::TRACE));
    }
}
