use std::fmt;

use tracing::field::{Field, Visit};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::attrs::{Attr, Value};
use crate::encoder::Caller;
use crate::{Config, Error, Level, Logger, Result};

/// A `tracing` layer that writes events through a [`Logger`].
///
/// The event's `message` field becomes the record message; every other
/// field becomes a per-call attribute.
#[derive(Debug, Clone)]
pub struct LogLayer {
    logger: Logger,
}

impl LogLayer {
    /// Route events to `logger`.
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl<S: Subscriber> Layer<S> for LogLayer {
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        if self.logger.is_noop() {
            Interest::never()
        } else {
            // the level may change at runtime, so never cache a verdict
            Interest::sometimes()
        }
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        self.logger.enabled(Level::from(metadata.level()))
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let caller = meta
            .file()
            .zip(meta.line())
            .map(|(file, line)| Caller { file, line });
        self.logger.emit(
            Level::from(meta.level()),
            &visitor.message,
            &visitor.attrs,
            caller,
        );
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    attrs: Vec<Attr>,
}

impl FieldVisitor {
    fn push(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = match value {
                Value::Str(s) => s,
                other => format!("{:?}", other),
            };
        } else {
            self.attrs.push(Attr::new(field.name(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Value::F64(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Value::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Value::U64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Value::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, Value::Str(value.to_string()));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, Value::Str(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, Value::Str(format!("{:?}", value)));
    }
}

/// `RUST_LOG`, when set and non-empty, narrows what reaches the logger.
fn env_directives() -> Option<String> {
    std::env::var("RUST_LOG").ok().filter(|s| !s.is_empty())
}

/// Install `logger` as the global `tracing` subscriber.
pub fn install(logger: &Logger) -> Result<()> {
    let env_filter = env_directives()
        .map(|spec| EnvFilter::try_new(&spec).map_err(|e| Error::Init(e.to_string())))
        .transpose()?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(LogLayer::new(logger.clone()))
        .try_init()
        .map_err(|e| Error::Init(e.to_string()))
}

/// Build a logger from `config` and install it as the global `tracing`
/// subscriber. The returned logger shares sinks and level with the
/// installed one.
pub fn init_logging(config: &Config) -> Result<Logger> {
    let logger = config.clone().logger([])?;
    install(&logger)?;
    Ok(logger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;

    #[test]
    fn rust_log_used_when_set() {
        let prev = std::env::var_os("RUST_LOG");
        unsafe {
            std::env::set_var("RUST_LOG", "warn");
        }

        assert_eq!(env_directives().as_deref(), Some("warn"));

        unsafe {
            std::env::set_var("RUST_LOG", "");
        }
        assert_eq!(env_directives(), None);

        unsafe {
            match prev {
                Some(v) => std::env::set_var("RUST_LOG", v),
                None => std::env::remove_var("RUST_LOG"),
            }
        }
    }

    #[test]
    fn off_logger_layer_reaches_no_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("off.log");
        let logger = Config::new()
            .with_mode(Mode::Off)
            .with_output(path.to_string_lossy())
            .logger([])
            .unwrap();
        let layer = LogLayer::new(logger);
        assert!(layer.logger.is_noop());

        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(code = 7, "nothing happens");
        });
        assert!(!path.exists());
    }

    #[test]
    fn install_twice_fails_with_init_error() {
        // the only test in this crate that touches the global subscriber
        let logger = init_logging(&Config::new().with_mode(Mode::Off)).unwrap();
        assert!(logger.is_noop());

        let err = install(&Logger::noop()).unwrap_err();
        assert!(matches!(err, Error::Init(_)));
    }
}
