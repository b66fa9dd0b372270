//! Builder pattern for constructing and installing a logger.
//!
//! # Example
//!
//! ```rust,no_run
//! use logwise::{Mode, attr};
//!
//! let logger = logwise::builder()
//!     .with_mode(Mode::Production)
//!     .with_level("debug")
//!     .with_output("stdout")
//!     .with_attr(attr("service", "billing"))
//!     .init()
//!     .expect("Failed to initialize logging");
//!
//! logger.info("ready", &[]);
//! tracing::info!(port = 8080, "listening");
//! ```

use crate::attrs::Attr;
use crate::tracing_init::install;
use crate::{Config, LevelHandle, Logger, Mode, Registry, Result, RotationConfig};

/// A builder for configuring a [`Logger`].
#[derive(Debug, Clone)]
pub struct LoggerBuilder {
    config: Config,
    attrs: Vec<Attr>,
    registry: Option<Registry>,
    level: Option<LevelHandle>,
}

impl LoggerBuilder {
    /// Create a new builder with an empty configuration.
    pub fn new() -> Self {
        Self::from_config(Config::new())
    }

    /// Create a builder from an existing configuration.
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            attrs: Vec::new(),
            registry: None,
            level: None,
        }
    }

    /// Select the output profile.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.config = self.config.with_mode(mode);
        self
    }

    /// Set the minimum level ("debug", "info", "warn", "error").
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config = self.config.with_level(level);
        self
    }

    /// Set the encoder by name.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.config = self.config.with_encoding(encoding);
        self
    }

    /// Add an output destination.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.config = self.config.with_output(output);
        self
    }

    /// Add an internal-error destination.
    pub fn with_error_output(mut self, output: impl Into<String>) -> Self {
        self.config = self.config.with_error_output(output);
        self
    }

    /// Add a configured attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config = self.config.with_attribute(key, value);
        self
    }

    /// Bind an attribute after the configured ones.
    pub fn with_attr(mut self, attr: Attr) -> Self {
        self.attrs.push(attr);
        self
    }

    /// Enable the `rolling` sink scheme with these rotation settings.
    pub fn with_file_logger(mut self, file_logger: RotationConfig) -> Self {
        self.config = self.config.with_file_logger(file_logger);
        self
    }

    /// Record the call site on each entry.
    pub fn with_source(mut self, add_source: bool) -> Self {
        self.config = self.config.with_source(add_source);
        self
    }

    /// Build against `registry` instead of a fresh one.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Share an existing level gate.
    pub fn with_level_handle(mut self, level: LevelHandle) -> Self {
        self.level = Some(level);
        self
    }

    /// The configuration collected so far.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the logger without installing it.
    pub fn build(self) -> Result<Logger> {
        let mut registry = self.registry.unwrap_or_default();
        let level = self.level.unwrap_or_default();
        self.config.build(&mut registry, &level, self.attrs)
    }

    /// Build the logger and install it as the global `tracing` subscriber.
    ///
    /// # Errors
    ///
    /// Fails if a destination cannot be opened, the encoding is unknown, or
    /// a global subscriber is already set.
    pub fn init(self) -> Result<Logger> {
        let logger = self.build()?;
        install(&logger)?;
        Ok(logger)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
