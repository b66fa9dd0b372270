use std::collections::BTreeMap;
use std::fmt;
use std::io::IsTerminal;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::profile::ModeProfile;

/// Default maximum size of a rotated file, in megabytes.
pub const DEFAULT_MAX_SIZE: u64 = 100;
/// Default number of days rotated files are kept.
pub const DEFAULT_MAX_AGE: u32 = 30;
/// Default number of rotated files kept.
pub const DEFAULT_MAX_BACKUPS: usize = 10;

/// Named operating mode selecting a [`ModeProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Human-oriented output: ISO-8601 times, colored levels.
    Development,
    /// Machine-oriented output: epoch times, lowercase levels.
    Production,
    /// Message only, for pre-formatted text.
    Raw,
    /// Inert logger.
    Off,
    /// Inert logger, alias of `Off`.
    None,
    /// Terse single-letter keys, used for anything unrecognized.
    Default,
}

impl Mode {
    /// Configuration name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
            Mode::Raw => "raw",
            Mode::Off => "off",
            Mode::None => "none",
            Mode::Default => "default",
        }
    }

    /// Whether this mode builds an inert logger.
    pub fn is_off(&self) -> bool {
        matches!(self, Mode::Off | Mode::None)
    }
}

impl From<&str> for Mode {
    fn from(s: &str) -> Self {
        match s {
            "development" => Mode::Development,
            "production" => Mode::Production,
            "raw" => Mode::Raw,
            "off" => Mode::Off,
            "none" => Mode::None,
            _ => Mode::Default,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Mode::from(s.as_str()))
    }
}

/// An empty mode string counts as unset.
fn deserialize_mode<'de, D>(deserializer: D) -> Result<Option<Mode>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.is_empty()).map(|s| Mode::from(s.as_str())))
}

/// Whether the process output stream can display ANSI colors.
pub fn stdout_supports_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        return false;
    }
    if std::env::var("TERM").is_ok_and(|t| t == "dumb") {
        return false;
    }
    std::io::stdout().is_terminal()
}

/// Logger configuration.
///
/// Every field may be left empty; [`Config::init_defaults`] fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Template the logger is built from. Unset picks `production` when
    /// stdout cannot show colors and `development` otherwise.
    #[serde(
        deserialize_with = "deserialize_mode",
        skip_serializing_if = "Option::is_none"
    )]
    pub mode: Option<Mode>,
    /// Minimum enabled level ("debug", "info", "warn", "error").
    pub level: String,
    /// Line terminator appended to every record.
    #[serde(alias = "lineEnding")]
    pub line_ending: String,
    /// Encoder name ("json", "console", "text" or a registered encoder).
    pub encoding: String,
    /// Destinations for records: `stdout`, `stderr`, paths or URLs.
    pub output: Vec<String>,
    /// Destinations for the logger's own write failures.
    #[serde(alias = "errorOutput")]
    pub error_output: Vec<String>,
    /// Attributes added to every record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, serde_json::Value>>,
    /// Rotating file options, enabling the `rolling://` scheme.
    #[serde(alias = "fileLogger", skip_serializing_if = "Option::is_none")]
    pub file_logger: Option<RotationConfig>,
    /// Record the source location of each call.
    #[serde(alias = "addSource")]
    pub add_source: bool,
}

impl Config {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill unset fields with mode-appropriate defaults. Values already set
    /// are kept.
    pub fn init_defaults(&mut self) {
        let mode = *self.mode.get_or_insert_with(|| {
            if stdout_supports_color() {
                Mode::Development
            } else {
                Mode::Production
            }
        });
        if self.level.is_empty() {
            self.level = "info".to_string();
        }
        if self.line_ending.is_empty() {
            self.line_ending = ModeProfile::for_mode(mode)
                .map_or(crate::profile::DEFAULT_LINE_ENDING, |p| p.line_ending)
                .to_string();
        }
        if self.encoding.is_empty() {
            self.encoding = "json".to_string();
        }
        if self.output.is_empty() {
            self.output = vec!["stderr".to_string()];
        }
        if self.error_output.is_empty() {
            self.error_output = vec!["stderr".to_string()];
        }
        if let Some(file) = self.file_logger.as_mut() {
            file.init_defaults();
        }
    }

    /// Consume the configuration and return it with defaults applied.
    pub fn with_defaults(mut self) -> Self {
        self.init_defaults();
        self
    }

    /// Set the mode
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the encoding
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Set the line ending
    pub fn with_line_ending(mut self, line_ending: impl Into<String>) -> Self {
        self.line_ending = line_ending.into();
        self
    }

    /// Add an output destination
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output.push(output.into());
        self
    }

    /// Add an error output destination
    pub fn with_error_output(mut self, output: impl Into<String>) -> Self {
        self.error_output.push(output.into());
        self
    }

    /// Add an attribute bound to every record
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }

    /// Set rotating file options
    pub fn with_file_logger(mut self, file_logger: RotationConfig) -> Self {
        self.file_logger = Some(file_logger);
        self
    }

    /// Record source locations
    pub fn with_source(mut self, add_source: bool) -> Self {
        self.add_source = add_source;
        self
    }
}

/// Options of the rotating file writer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RotationConfig {
    /// File to write to. Empty means `<process-name>-logwise.log` in the
    /// temporary directory.
    pub filename: String,
    /// Size in megabytes at which the file is rotated.
    #[serde(alias = "maxsize", alias = "maxSize")]
    pub max_size: u64,
    /// Days a rotated file is kept.
    #[serde(alias = "maxage", alias = "maxAge")]
    pub max_age: u32,
    /// Number of rotated files kept.
    #[serde(alias = "maxbackups", alias = "maxBackups")]
    pub max_backups: usize,
    /// Use local time in rotated file names instead of UTC.
    #[serde(alias = "localtime", alias = "localTime")]
    pub local_time: bool,
    /// Gzip rotated files.
    pub compress: bool,
}

impl RotationConfig {
    /// Create options for `filename` with every limit unset.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Replace zero limits with the defaults.
    pub fn init_defaults(&mut self) {
        if self.max_size == 0 {
            self.max_size = DEFAULT_MAX_SIZE;
        }
        if self.max_age == 0 {
            self.max_age = DEFAULT_MAX_AGE;
        }
        if self.max_backups == 0 {
            self.max_backups = DEFAULT_MAX_BACKUPS;
        }
    }

    /// Set the maximum size in megabytes
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the maximum age in days
    pub fn with_max_age(mut self, max_age: u32) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the number of backups kept
    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups;
        self
    }

    /// Use local time in backup names
    pub fn with_local_time(mut self, local_time: bool) -> Self {
        self.local_time = local_time;
        self
    }

    /// Gzip rotated files
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_defaults_fills_empty_config() {
        let mut config = Config::new();
        config.init_defaults();
        assert!(matches!(
            config.mode,
            Some(Mode::Production) | Some(Mode::Development)
        ));
        assert_eq!(config.level, "info");
        assert_eq!(config.line_ending, "\n");
        assert_eq!(config.encoding, "json");
        assert_eq!(config.output, vec!["stderr".to_string()]);
        assert_eq!(config.error_output, vec!["stderr".to_string()]);
        assert!(config.file_logger.is_none());
    }

    #[test]
    fn test_init_defaults_keeps_supplied_values() {
        let mut config = Config::new()
            .with_mode(Mode::Raw)
            .with_level("debug")
            .with_line_ending("\r\n")
            .with_encoding("console")
            .with_output("stdout")
            .with_error_output("/tmp/err.log");
        config.init_defaults();
        assert_eq!(config.mode, Some(Mode::Raw));
        assert_eq!(config.level, "debug");
        assert_eq!(config.line_ending, "\r\n");
        assert_eq!(config.encoding, "console");
        assert_eq!(config.output, vec!["stdout".to_string()]);
        assert_eq!(config.error_output, vec!["/tmp/err.log".to_string()]);
    }

    #[test]
    fn test_mode_default_follows_color_support() {
        let config = Config::new().with_defaults();
        let expected = if stdout_supports_color() {
            Mode::Development
        } else {
            Mode::Production
        };
        assert_eq!(config.mode, Some(expected));
    }

    #[test]
    fn test_rotation_defaults_replace_zero() {
        let mut rotation = RotationConfig::new("app.log");
        rotation.init_defaults();
        assert_eq!(rotation.max_size, 100);
        assert_eq!(rotation.max_age, 30);
        assert_eq!(rotation.max_backups, 10);
        assert_eq!(rotation.filename, "app.log");
    }

    #[test]
    fn test_rotation_defaults_preserve_non_zero() {
        let mut rotation = RotationConfig::new("")
            .with_max_size(5)
            .with_max_age(2)
            .with_max_backups(1)
            .with_compress(true);
        rotation.init_defaults();
        assert_eq!(rotation.max_size, 5);
        assert_eq!(rotation.max_age, 2);
        assert_eq!(rotation.max_backups, 1);
        assert!(rotation.compress);
        assert!(rotation.filename.is_empty());
    }

    #[test]
    fn test_config_defaults_rotation() {
        let config = Config::new()
            .with_file_logger(RotationConfig::new("x.log").with_max_backups(3))
            .with_defaults();
        let file = config.file_logger.unwrap();
        assert_eq!(file.max_size, 100);
        assert_eq!(file.max_age, 30);
        assert_eq!(file.max_backups, 3);
    }

    #[test]
    fn test_mode_from_str_unknown_is_default() {
        assert_eq!(Mode::from("development"), Mode::Development);
        assert_eq!(Mode::from("production"), Mode::Production);
        assert_eq!(Mode::from("raw"), Mode::Raw);
        assert_eq!(Mode::from("off"), Mode::Off);
        assert_eq!(Mode::from("none"), Mode::None);
        assert_eq!(Mode::from("Production"), Mode::Default);
        assert_eq!(Mode::from("staging"), Mode::Default);
        assert!(Mode::Off.is_off());
        assert!(Mode::None.is_off());
        assert!(!Mode::Raw.is_off());
    }

    #[test]
    fn test_config_deserialize_yaml() {
        let yaml = r#"
mode: production
level: WARN
output: [stdout, "/var/log/app.log"]
attributes:
  service: api
  shard: 3
file_logger:
  filename: /var/log/app.log
  max_size: 20
  compress: true
add_source: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.mode, Some(Mode::Production));
        assert_eq!(config.level, "WARN");
        assert_eq!(config.output.len(), 2);
        assert!(config.error_output.is_empty());
        let attrs = config.attributes.as_ref().unwrap();
        assert_eq!(attrs["service"], serde_json::json!("api"));
        assert_eq!(attrs["shard"], serde_json::json!(3));
        let file = config.file_logger.as_ref().unwrap();
        assert_eq!(file.max_size, 20);
        assert_eq!(file.max_age, 0);
        assert!(file.compress);
        assert!(config.add_source);
    }

    #[test]
    fn test_config_deserialize_toml_empty_mode_is_unset() {
        let toml_str = r#"
mode = ""
encoding = "console"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.mode, None);
        assert_eq!(config.encoding, "console");
    }

    #[test]
    fn test_config_deserialize_unknown_mode() {
        let config: Config = serde_yaml::from_str("mode: test").unwrap();
        assert_eq!(config.mode, Some(Mode::Default));
    }

    #[test]
    fn test_config_deserialize_camel_case_keys() {
        let yaml = r#"
errorOutput: [stdout]
addSource: true
fileLogger:
  maxSize: 7
  maxBackups: 2
  localTime: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.error_output, vec!["stdout".to_string()]);
        assert!(config.add_source);
        let file = config.file_logger.unwrap();
        assert_eq!(file.max_size, 7);
        assert_eq!(file.max_backups, 2);
        assert!(file.local_time);
    }
}
