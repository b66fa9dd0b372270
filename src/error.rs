use thiserror::Error as ThisError;

/// Errors that can occur while building a logger
#[derive(ThisError, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A destination could not be opened.
    #[error("failed to open sink {path:?}: {source}")]
    Sink {
        /// The output path as written in the configuration.
        path: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A destination URL could not be parsed.
    #[error("invalid sink URL {path:?}: {reason}")]
    InvalidUrl {
        /// The output path as written in the configuration.
        path: String,
        /// Why parsing failed.
        reason: String,
    },
    /// No sink factory is registered for the URL scheme.
    #[error("no sink registered for scheme {0:?}")]
    UnknownScheme(String),
    /// A sink factory is already registered under this scheme.
    #[error("sink factory already registered for scheme {0:?}")]
    SchemeConflict(String),
    /// An encoder is already registered under this name.
    #[error("encoder already registered for name {0:?}")]
    EncoderConflict(String),
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
    /// Initialization failed.
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
