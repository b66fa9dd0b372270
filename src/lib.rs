//! # Logwise
//!
//! Configuration-driven structured logging with named output profiles,
//! pluggable sinks and size-based file rotation.
//!
//! ## Features
//!
//! - Mode profiles (`production`, `development`, `raw`, `off`) selecting keys and encodings
//! - JSON and console encoders, extensible through a [`Registry`]
//! - Outputs to `stdout`, `stderr`, files, `file://` and `rolling://` URLs
//! - Rotating files with backup pruning and optional gzip compression
//! - A runtime-adjustable level shared between loggers
//! - Integration with the `tracing` ecosystem
//!
//! ## Example
//!
//! ```rust
//! use logwise::{Config, Mode, attr};
//!
//! let logger = Config::new()
//!     .with_mode(Mode::Production)
//!     .with_output("stderr")
//!     .logger([attr("service", "billing")])?;
//!
//! logger.info("started", &[attr("port", 8080)]);
//! logger.named("db").warn("slow query", &[]);
//! # Ok::<(), logwise::Error>(())
//! ```

pub mod attrs;
pub mod builder;
pub mod config;
pub mod encoder;
pub mod error;
pub mod level;
pub mod logger;
pub mod profile;
pub mod registry;
pub mod rotation;
pub mod sink;
pub mod std_log;
pub mod tracing_init;
pub mod writer;

pub use attrs::{Attr, Attrs, Value, attr};
pub use builder::LoggerBuilder;
pub use config::{Config, Mode, RotationConfig};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use level::{Level, LevelHandle};
pub use logger::{Logger, rolling_logger};
pub use registry::Registry;
pub use sink::{Sink, SinkFactory};
pub use std_log::{StdLog, StdLogAdapter, new_std_log};
pub use tracing_init::{LogLayer, init_logging, install};
pub use writer::RotatingWriter;

/// Start a [`LoggerBuilder`].
pub fn builder() -> LoggerBuilder {
    LoggerBuilder::new()
}
