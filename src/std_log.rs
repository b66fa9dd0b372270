//! Bridges for callers that only know byte streams or line loggers.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::attrs::{Attr, Value};
use crate::{Level, Logger};

/// Message of every record produced by [`StdLogAdapter`].
pub const ADAPTER_MESSAGE: &str = "internal server error";

const STD_LOG_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]/[month]/[day] [hour]:[minute]:[second]");

/// Redirects raw bytes into a [`Logger`] as error records, e.g. for a
/// library that only accepts an `io::Write` for its diagnostics.
///
/// Writes never fail and always consume the whole buffer.
#[derive(Debug, Clone)]
pub struct StdLogAdapter {
    logger: Logger,
}

impl StdLogAdapter {
    /// Wrap `logger`.
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl Write for StdLogAdapter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let text = text.trim_end_matches(['\r', '\n']);
        self.logger.emit(
            Level::Error,
            ADAPTER_MESSAGE,
            &[Attr::new("error", Value::Str(text.to_string()))],
            None,
        );
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A line logger writing `<prefix>YYYY/MM/DD HH:MM:SS <message>` lines,
/// timestamped in UTC, into a [`StdLogAdapter`].
#[derive(Debug)]
pub struct StdLog {
    prefix: String,
    out: Mutex<StdLogAdapter>,
}

impl StdLog {
    /// Line logger over `adapter`.
    pub fn new(adapter: StdLogAdapter, prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            out: Mutex::new(adapter),
        }
    }

    /// Prefix written before the timestamp.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Write one line. A trailing newline is added when missing.
    pub fn print(&self, message: &str) {
        self.print_fmt(format_args!("{}", message));
    }

    /// Write one formatted line.
    pub fn print_fmt(&self, args: fmt::Arguments<'_>) {
        let line = self.format_line(OffsetDateTime::now_utc(), args);
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = out.write_all(line.as_bytes());
    }

    fn format_line(&self, at: OffsetDateTime, args: fmt::Arguments<'_>) -> String {
        let stamp = at
            .to_offset(time::UtcOffset::UTC)
            .format(STD_LOG_FORMAT)
            .unwrap_or_default();
        let mut line = format!("{}{} {}", self.prefix, stamp, args);
        if !line.ends_with('\n') {
            line.push('\n');
        }
        line
    }
}

/// A line logger writing into `base` through a [`StdLogAdapter`].
pub fn new_std_log(base: &Logger, prefix: impl Into<String>) -> StdLog {
    StdLog::new(StdLogAdapter::new(base.clone()), prefix)
}
