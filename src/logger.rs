//! Building loggers from a [`Config`] and emitting records through them.

use std::panic::Location;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;

use crate::attrs::{Attr, Attrs, to_attrs};
use crate::config::Mode;
use crate::encoder::{Caller, Encoder, Entry, JsonEncoder};
use crate::profile::{ModeProfile, iso8601};
use crate::registry::Registry;
use crate::sink::{
    MultiSink, NonBlockingSink, ROLLING_SCHEME, RollingSinkFactory, StdStream, open_sinks,
};
use crate::writer::RotatingWriter;
use crate::{Config, Error, Level, LevelHandle, Result, RotationConfig};

/// Encoding pipeline shared by a logger and its derived loggers.
struct Core {
    profile: &'static ModeProfile,
    encoder: Arc<dyn Encoder>,
    line_ending: String,
    colored: bool,
    add_source: bool,
    level: LevelHandle,
    output: Mutex<MultiSink>,
    error_output: Mutex<MultiSink>,
}

fn lock(sink: &Mutex<MultiSink>) -> MutexGuard<'_, MultiSink> {
    sink.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Core {
    /// Report a failure of the logger itself. Errors here have nowhere left
    /// to go and are dropped.
    fn report(&self, err: &dyn std::fmt::Display) {
        let line = format!(
            "{} write error: {}\n",
            iso8601(OffsetDateTime::now_utc()),
            err
        );
        let _ = lock(&self.error_output).write_record(line.as_bytes());
    }
}

/// A structured logger.
///
/// Cloning is cheap; clones share sinks and the level gate. A logger built
/// in the `off` or `none` mode ignores every call.
#[derive(Clone)]
pub struct Logger {
    core: Option<Arc<Core>>,
    attrs: Attrs,
    name: Option<Arc<str>>,
}

impl Logger {
    /// A logger that discards everything without touching any destination.
    pub fn noop() -> Self {
        Self {
            core: None,
            attrs: Attrs::new(),
            name: None,
        }
    }

    /// Whether this logger discards everything.
    pub fn is_noop(&self) -> bool {
        self.core.is_none()
    }

    /// Whether a record at `level` would be written.
    pub fn enabled(&self, level: Level) -> bool {
        self.core.as_ref().is_some_and(|c| c.level.enabled(level))
    }

    /// The level gate, for changing the level at runtime.
    pub fn level_handle(&self) -> Option<&LevelHandle> {
        self.core.as_ref().map(|c| &c.level)
    }

    /// Attributes bound to every record of this logger.
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Logger name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// A logger with `attrs` bound in addition to this logger's own.
    pub fn with(&self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        Self {
            core: self.core.clone(),
            attrs: self.attrs.with(attrs),
            name: self.name.clone(),
        }
    }

    /// A child logger; names are joined with `.`.
    pub fn named(&self, name: &str) -> Self {
        let name: Arc<str> = match (&self.name, name.is_empty()) {
            (_, true) => return self.clone(),
            (Some(parent), false) => format!("{}.{}", parent, name).into(),
            (None, false) => name.into(),
        };
        Self {
            core: self.core.clone(),
            attrs: self.attrs.clone(),
            name: Some(name),
        }
    }

    /// Emit a record at `level`.
    #[track_caller]
    pub fn log(&self, level: Level, message: &str, attrs: &[Attr]) {
        let loc = Location::caller();
        self.emit(
            level,
            message,
            attrs,
            Some(Caller {
                file: loc.file(),
                line: loc.line(),
            }),
        );
    }

    /// Emit a debug record.
    #[track_caller]
    pub fn debug(&self, message: &str, attrs: &[Attr]) {
        self.log(Level::Debug, message, attrs);
    }

    /// Emit an info record.
    #[track_caller]
    pub fn info(&self, message: &str, attrs: &[Attr]) {
        self.log(Level::Info, message, attrs);
    }

    /// Emit a warn record.
    #[track_caller]
    pub fn warn(&self, message: &str, attrs: &[Attr]) {
        self.log(Level::Warn, message, attrs);
    }

    /// Emit an error record.
    #[track_caller]
    pub fn error(&self, message: &str, attrs: &[Attr]) {
        self.log(Level::Error, message, attrs);
    }

    /// Encode and write one record. Failures go to the error output.
    pub(crate) fn emit(
        &self,
        level: Level,
        message: &str,
        attrs: &[Attr],
        caller: Option<Caller<'_>>,
    ) {
        let Some(core) = self.core.as_ref() else {
            return;
        };
        if !core.level.enabled(level) {
            return;
        }

        let entry = Entry {
            time: OffsetDateTime::now_utc(),
            level,
            name: self.name.as_deref(),
            caller: caller.filter(|_| core.add_source),
            message,
            attrs: self.attrs.merged(attrs),
        };

        let mut buf = Vec::with_capacity(256);
        if let Err(e) = core.encoder.encode(
            &entry,
            core.profile,
            core.colored,
            &core.line_ending,
            &mut buf,
        ) {
            core.report(&e);
            return;
        }

        let (result, side_errors) = {
            let mut output = lock(&core.output);
            let result = output.write_record(&buf);
            (result, output.take_errors())
        };
        if let Err(e) = result {
            core.report(&e);
        }
        for e in side_errors {
            core.report(&e);
        }
    }

    /// Flush every output destination.
    pub fn sync(&self) -> Result<()> {
        match self.core.as_ref() {
            Some(core) => lock(&core.output).sync().map_err(Error::Io),
            None => Ok(()),
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("noop", &self.is_noop())
            .field("name", &self.name)
            .field("attrs", &self.attrs)
            .finish()
    }
}

impl Config {
    /// Build a logger with a fresh [`Registry`] and level gate.
    ///
    /// Configured attributes are bound first, then `attrs`.
    pub fn logger(self, attrs: impl IntoIterator<Item = Attr>) -> Result<Logger> {
        let mut registry = Registry::new();
        self.build(&mut registry, &LevelHandle::default(), attrs)
    }

    /// Build a logger against an explicit registry and level gate.
    ///
    /// When `file_logger` is set the `rolling` scheme is registered, so
    /// building twice against one registry fails with
    /// [`Error::SchemeConflict`] unless the registry tolerates
    /// re-registration. The registry and the gate are only changed by a
    /// successful build; on error both are left as they were.
    pub fn build(
        mut self,
        registry: &mut Registry,
        level: &LevelHandle,
        attrs: impl IntoIterator<Item = Attr>,
    ) -> Result<Logger> {
        self.init_defaults();
        let mode = self.mode.unwrap_or(Mode::Default);
        let Some(profile) = ModeProfile::for_mode(mode) else {
            return Ok(Logger::noop());
        };

        // stage registrations on a copy; the caller's registry and level are
        // only touched once every destination is open
        let mut staged = registry.clone();
        if let Some(rotation) = self.file_logger.as_ref() {
            staged.register_scheme(
                ROLLING_SCHEME,
                Arc::new(RollingSinkFactory::new(rotation.clone())),
            )?;
        }

        let encoder = staged
            .encoder(&self.encoding)
            .ok_or_else(|| Error::Config(format!("unknown encoding: {}", self.encoding)))?;

        let output = open_sinks(&self.output, &staged)?;
        let error_output = open_sinks(&self.error_output, &staged)?;
        let colored = profile.color && output.is_terminal();

        *registry = staged;
        level.set_level(Level::parse_or_info(&self.level));

        let mut base = self.attributes.as_ref().map(to_attrs).unwrap_or_default();
        base.extend(attrs);

        Ok(Logger {
            core: Some(Arc::new(Core {
                profile,
                encoder,
                line_ending: self.line_ending,
                colored,
                add_source: self.add_source,
                level: level.clone(),
                output: Mutex::new(output),
                error_output: Mutex::new(error_output),
            })),
            attrs: Attrs::from_vec(base),
            name: None,
        })
    }
}

/// Build a logger that writes production-profile JSON to a single rotating
/// file, bypassing output path resolution.
///
/// Writes are handed to a background worker; dropping the last clone of the
/// logger flushes it. A full queue blocks the caller instead of dropping
/// records.
pub fn rolling_logger(
    mut rotation: RotationConfig,
    level: &LevelHandle,
    attrs: impl IntoIterator<Item = Attr>,
) -> Result<Logger> {
    rotation.init_defaults();
    let writer = RotatingWriter::new(&rotation).map_err(|source| Error::Sink {
        path: rotation.filename.clone(),
        source,
    })?;
    let profile = ModeProfile::for_mode(Mode::Production)
        .ok_or_else(|| Error::Init("no production profile".to_string()))?;

    Ok(Logger {
        core: Some(Arc::new(Core {
            profile,
            encoder: Arc::new(JsonEncoder),
            line_ending: profile.line_ending.to_string(),
            colored: false,
            add_source: false,
            level: level.clone(),
            output: Mutex::new(MultiSink::new(vec![Box::new(NonBlockingSink::new(writer))])),
            error_output: Mutex::new(MultiSink::new(vec![Box::new(StdStream::Stderr)])),
        })),
        attrs: Attrs::from_vec(attrs.into_iter().collect()),
        name: None,
    })
}
