use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::Error;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    /// Verbose diagnostics.
    Debug = 0,
    /// Routine information.
    Info = 1,
    /// Something unexpected that does not stop the program.
    Warn = 2,
    /// A failure.
    Error = 3,
}

impl Level {
    /// Parse a level name case-insensitively, falling back to `Info` for
    /// anything unrecognized.
    pub fn parse_or_info(s: &str) -> Self {
        s.parse().unwrap_or(Level::Info)
    }

    /// Lowercase name, as written by the production profile.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }

    /// Uppercase name, as written by the colored profiles.
    pub fn as_capital_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Level::Debug,
            1 => Level::Info,
            2 => Level::Warn,
            _ => Level::Error,
        }
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            _ => Err(Error::Config(format!("invalid log level: {}", s))),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum-level gate shared between a logger and whoever adjusts it at
/// runtime. Clones observe and update the same level.
#[derive(Debug, Clone)]
pub struct LevelHandle {
    inner: Arc<AtomicU8>,
}

impl LevelHandle {
    /// Create a handle starting at `level`.
    pub fn new(level: Level) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(level as u8)),
        }
    }

    /// Current minimum level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.inner.load(Ordering::Relaxed))
    }

    /// Change the minimum level for every logger sharing this handle.
    pub fn set_level(&self, level: Level) {
        self.inner.store(level as u8, Ordering::Relaxed);
    }

    /// Whether a record at `level` passes the gate.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level()
    }
}

impl Default for LevelHandle {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_str_case_insensitive() {
        assert_eq!("debug".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!("INFO".parse::<Level>().unwrap(), Level::Info);
        assert_eq!("Warn".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("eRrOr".parse::<Level>().unwrap(), Level::Error);
    }

    #[test]
    fn test_level_from_str_invalid() {
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_parse_or_info_falls_back() {
        assert_eq!(Level::parse_or_info(""), Level::Info);
        assert_eq!(Level::parse_or_info("loud"), Level::Info);
        assert_eq!(Level::parse_or_info("DEBUG"), Level::Debug);
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Error > Level::Warn);
        assert!(Level::Warn > Level::Info);
        assert!(Level::Info > Level::Debug);
    }

    #[test]
    fn test_level_handle_shared_between_clones() {
        let handle = LevelHandle::new(Level::Info);
        let other = handle.clone();
        assert!(!handle.enabled(Level::Debug));

        other.set_level(Level::Debug);
        assert_eq!(handle.level(), Level::Debug);
        assert!(handle.enabled(Level::Debug));
    }

    #[test]
    fn test_level_handle_concurrent_updates() {
        let handle = LevelHandle::default();
        let threads: Vec<_> = (0..4)
            .map(|i| {
                let h = handle.clone();
                std::thread::spawn(move || {
                    let level = if i % 2 == 0 { Level::Warn } else { Level::Error };
                    for _ in 0..100 {
                        h.set_level(level);
                        let _ = h.level();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert!(matches!(handle.level(), Level::Warn | Level::Error));
    }

    #[test]
    fn test_tracing_level_conversion() {
        assert_eq!(Level::from(&tracing::Level::TRACE), Level::Debug);
        assert_eq!(Level::from(&tracing::Level::ERROR), Level::Error);
    }
}
