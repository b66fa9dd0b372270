//! Mode profiles: the fixed field keys and value formatting of each mode.
//!
//! Profiles live in a static table keyed by [`Mode`]; building a logger looks
//! one up and never mutates it.

use std::borrow::Cow;
use std::time::Duration;

use nu_ansi_term::Color;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::Level;
use crate::attrs::Value;
use crate::config::Mode;

/// Line ending used when neither the configuration nor the profile says
/// otherwise.
pub const DEFAULT_LINE_ENDING: &str = "\n";

/// Prefix given to attributes whose key is one of the profile's record keys.
pub const FIELD_PREFIX: &str = "fields.";

/// How timestamps are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeEncoding {
    /// Integer nanoseconds since the Unix epoch.
    EpochNanos,
    /// UTC ISO-8601 with millisecond precision and a numeric offset.
    Iso8601,
}

/// How [`Value::Duration`] attributes are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationEncoding {
    /// Floating point seconds.
    Seconds,
    /// Human-readable text such as `1.5s` or `250ms`.
    String,
}

/// How the level is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelEncoding {
    /// `info`
    Lowercase,
    /// `INFO`, colored when the destination is a terminal.
    CapitalColor,
}

/// Encoder settings selected by a [`Mode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeProfile {
    /// Key of the timestamp, omitted when `None`.
    pub time_key: Option<&'static str>,
    /// Key of the level, omitted when `None`.
    pub level_key: Option<&'static str>,
    /// Key of the logger name, omitted when `None`.
    pub name_key: Option<&'static str>,
    /// Key of the source location, omitted when `None`.
    pub caller_key: Option<&'static str>,
    /// Key of the message.
    pub message_key: Option<&'static str>,
    /// Terminator used when the configuration leaves it empty.
    pub line_ending: &'static str,
    /// Timestamp format.
    pub time: TimeEncoding,
    /// Duration format.
    pub duration: DurationEncoding,
    /// Level format.
    pub level: LevelEncoding,
    /// Whether level and name get ANSI colors on terminals.
    pub color: bool,
}

static PRODUCTION: ModeProfile = ModeProfile {
    time_key: Some("ts"),
    level_key: Some("level"),
    name_key: Some("logger"),
    caller_key: Some("caller"),
    message_key: Some("msg"),
    line_ending: DEFAULT_LINE_ENDING,
    time: TimeEncoding::EpochNanos,
    duration: DurationEncoding::Seconds,
    level: LevelEncoding::Lowercase,
    color: false,
};

static DEVELOPMENT: ModeProfile = ModeProfile {
    time_key: Some("ts"),
    level_key: Some("level"),
    name_key: Some("logger"),
    caller_key: Some("caller"),
    message_key: Some("msg"),
    line_ending: DEFAULT_LINE_ENDING,
    time: TimeEncoding::Iso8601,
    duration: DurationEncoding::String,
    level: LevelEncoding::CapitalColor,
    color: true,
};

static RAW: ModeProfile = ModeProfile {
    time_key: None,
    level_key: None,
    name_key: None,
    caller_key: None,
    message_key: Some("msg"),
    line_ending: DEFAULT_LINE_ENDING,
    time: TimeEncoding::Iso8601,
    duration: DurationEncoding::String,
    level: LevelEncoding::Lowercase,
    color: false,
};

static TERSE: ModeProfile = ModeProfile {
    time_key: Some("T"),
    level_key: Some("L"),
    name_key: Some("N"),
    caller_key: Some("C"),
    message_key: Some("M"),
    line_ending: DEFAULT_LINE_ENDING,
    time: TimeEncoding::Iso8601,
    duration: DurationEncoding::String,
    level: LevelEncoding::CapitalColor,
    color: true,
};

static PROFILES: [(Mode, &ModeProfile); 4] = [
    (Mode::Production, &PRODUCTION),
    (Mode::Development, &DEVELOPMENT),
    (Mode::Raw, &RAW),
    (Mode::Default, &TERSE),
];

impl ModeProfile {
    /// The profile of `mode`, or `None` for the inert modes.
    pub fn for_mode(mode: Mode) -> Option<&'static ModeProfile> {
        if mode.is_off() {
            return None;
        }
        PROFILES
            .iter()
            .find(|(m, _)| *m == mode)
            .map(|(_, p)| *p)
            .or(Some(&TERSE))
    }

    /// Whether `key` names one of the record fields this profile writes.
    pub fn is_reserved(&self, key: &str) -> bool {
        [
            self.time_key,
            self.level_key,
            self.name_key,
            self.caller_key,
            self.message_key,
        ]
        .into_iter()
        .flatten()
        .any(|k| k == key)
    }

    /// Output key of an attribute. Keys that would overwrite a record field
    /// are moved under [`FIELD_PREFIX`].
    pub fn attr_key<'k>(&self, key: &'k str) -> Cow<'k, str> {
        if self.is_reserved(key) {
            Cow::Owned(format!("{}{}", FIELD_PREFIX, key))
        } else {
            Cow::Borrowed(key)
        }
    }

    /// Encode a timestamp.
    pub fn encode_time(&self, ts: OffsetDateTime) -> serde_json::Value {
        match self.time {
            TimeEncoding::EpochNanos => {
                let nanos = i64::try_from(ts.unix_timestamp_nanos()).unwrap_or(i64::MAX);
                serde_json::Value::from(nanos)
            }
            TimeEncoding::Iso8601 => serde_json::Value::String(iso8601(ts)),
        }
    }

    /// Encode a duration.
    pub fn encode_duration(&self, d: Duration) -> serde_json::Value {
        match self.duration {
            DurationEncoding::Seconds => serde_json::Value::from(d.as_secs_f64()),
            DurationEncoding::String => serde_json::Value::String(format!("{:?}", d)),
        }
    }

    /// Encode a level, with color codes when `colored` and the profile
    /// allows it.
    pub fn encode_level(&self, level: Level, colored: bool) -> String {
        match self.level {
            LevelEncoding::Lowercase => level.as_str().to_string(),
            LevelEncoding::CapitalColor if colored && self.color => level_color(level)
                .paint(level.as_capital_str())
                .to_string(),
            LevelEncoding::CapitalColor => level.as_capital_str().to_string(),
        }
    }

    /// Encode a logger name.
    pub fn encode_name(&self, name: &str, colored: bool) -> String {
        if colored && self.color {
            Color::Cyan.paint(name).to_string()
        } else {
            name.to_string()
        }
    }

    /// Encode a source location as `dir/file.rs:line`.
    pub fn encode_caller(&self, file: &str, line: u32) -> String {
        format!("{}:{}", short_path(file), line)
    }

    /// Convert an attribute value to JSON.
    pub fn encode_value(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::I64(i) => serde_json::Value::from(*i),
            Value::U64(u) => serde_json::Value::from(*u),
            Value::F64(f) => serde_json::Value::from(*f),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Duration(d) => self.encode_duration(*d),
            Value::Json(j) => j.clone(),
        }
    }
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Debug => Color::Magenta,
        Level::Info => Color::Blue,
        Level::Warn => Color::Yellow,
        Level::Error => Color::Red,
    }
}

/// Format `ts` in UTC as `2026-01-09T08:15:30.123+00:00`.
pub fn iso8601(ts: OffsetDateTime) -> String {
    let ts = ts.to_offset(time::UtcOffset::UTC);
    ts.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3][offset_hour sign:mandatory]:[offset_minute]"
    ))
    .unwrap_or_else(|_| ts.unix_timestamp().to_string())
}

/// Keep the last directory and the file name.
fn short_path(file: &str) -> &str {
    let mut seps = file.rmatch_indices(['/', '\\']);
    match (seps.next(), seps.next()) {
        (Some(_), Some((idx, _))) => &file[idx + 1..],
        _ => file,
    }
}
