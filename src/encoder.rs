//! Record encoders.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::Level;
use crate::attrs::Value;
use crate::profile::ModeProfile;

/// Source location of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller<'a> {
    /// Source file.
    pub file: &'a str,
    /// Line in `file`.
    pub line: u32,
}

/// A record ready to be encoded.
#[derive(Debug)]
pub struct Entry<'a> {
    /// When the record was created.
    pub time: OffsetDateTime,
    /// Severity.
    pub level: Level,
    /// Logger name, if any.
    pub name: Option<&'a str>,
    /// Call site, when source capture is on.
    pub caller: Option<Caller<'a>>,
    /// Message text.
    pub message: &'a str,
    /// Merged attributes in output order.
    pub attrs: Vec<(&'a str, &'a Value)>,
}

/// Turns an [`Entry`] into bytes.
pub trait Encoder: Send + Sync {
    /// Append the encoded entry, terminated by `line_ending`, to `buf`.
    fn encode(
        &self,
        entry: &Entry<'_>,
        profile: &ModeProfile,
        colored: bool,
        line_ending: &str,
        buf: &mut Vec<u8>,
    ) -> std::io::Result<()>;
}

/// One JSON object per record.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(
        &self,
        entry: &Entry<'_>,
        profile: &ModeProfile,
        _colored: bool,
        line_ending: &str,
        buf: &mut Vec<u8>,
    ) -> std::io::Result<()> {
        let mut obj = serde_json::Map::new();
        if let Some(key) = profile.time_key {
            obj.insert(key.to_string(), profile.encode_time(entry.time));
        }
        if let Some(key) = profile.level_key {
            obj.insert(
                key.to_string(),
                profile.encode_level(entry.level, false).into(),
            );
        }
        if let (Some(key), Some(name)) = (profile.name_key, entry.name) {
            obj.insert(key.to_string(), name.into());
        }
        if let (Some(key), Some(caller)) = (profile.caller_key, entry.caller) {
            obj.insert(
                key.to_string(),
                profile.encode_caller(caller.file, caller.line).into(),
            );
        }
        if let Some(key) = profile.message_key {
            obj.insert(key.to_string(), entry.message.into());
        }
        for (key, value) in &entry.attrs {
            obj.insert(profile.attr_key(key).into_owned(), profile.encode_value(value));
        }
        serde_json::to_writer(&mut *buf, &obj)?;
        buf.extend_from_slice(line_ending.as_bytes());
        Ok(())
    }
}

/// Tab-separated header fields followed by the attributes as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleEncoder;

impl Encoder for ConsoleEncoder {
    fn encode(
        &self,
        entry: &Entry<'_>,
        profile: &ModeProfile,
        colored: bool,
        line_ending: &str,
        buf: &mut Vec<u8>,
    ) -> std::io::Result<()> {
        let mut parts: Vec<String> = Vec::with_capacity(6);
        if profile.time_key.is_some() {
            parts.push(match profile.encode_time(entry.time) {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            });
        }
        if profile.level_key.is_some() {
            parts.push(profile.encode_level(entry.level, colored));
        }
        if let (Some(_), Some(name)) = (profile.name_key, entry.name) {
            parts.push(profile.encode_name(name, colored));
        }
        if let (Some(_), Some(caller)) = (profile.caller_key, entry.caller) {
            parts.push(profile.encode_caller(caller.file, caller.line));
        }
        if profile.message_key.is_some() {
            parts.push(entry.message.to_string());
        }
        if !entry.attrs.is_empty() {
            let fields: serde_json::Map<String, serde_json::Value> = entry
                .attrs
                .iter()
                .map(|(k, v)| (profile.attr_key(k).into_owned(), profile.encode_value(v)))
                .collect();
            parts.push(serde_json::to_string(&fields)?);
        }
        buf.extend_from_slice(parts.join("\t").as_bytes());
        buf.extend_from_slice(line_ending.as_bytes());
        Ok(())
    }
}

/// The encoder registered under `name` by default, if any.
pub fn builtin(name: &str) -> Option<Arc<dyn Encoder>> {
    match name {
        "json" => Some(Arc::new(JsonEncoder)),
        "console" | "text" => Some(Arc::new(ConsoleEncoder)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use time::macros::datetime;

    fn entry<'a>(attrs: Vec<(&'a str, &'a Value)>) -> Entry<'a> {
        Entry {
            time: datetime!(2026-01-09 08:15:30 UTC),
            level: Level::Warn,
            name: Some("http"),
            caller: Some(Caller {
                file: "src/net/server.rs",
                line: 12,
            }),
            message: "slow request",
            attrs,
        }
    }

    fn encode(enc: &dyn Encoder, mode: Mode, e: &Entry<'_>, colored: bool) -> String {
        let profile = ModeProfile::for_mode(mode).unwrap();
        let mut buf = Vec::new();
        enc.encode(e, profile, colored, "\n", &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_json_production() {
        let took = Value::Duration(std::time::Duration::from_millis(250));
        let out = encode(&JsonEncoder, Mode::Production, &entry(vec![("took", &took)]), false);
        assert!(out.ends_with('\n'));
        assert_eq!(
            out.trim_end(),
            r#"{"ts":1767946530000000000,"level":"warn","logger":"http","caller":"net/server.rs:12","msg":"slow request","took":0.25}"#
        );
    }

    #[test]
    fn test_json_development_never_colors() {
        let out = encode(&JsonEncoder, Mode::Development, &entry(vec![]), true);
        let v: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(v["level"], "WARN");
        assert_eq!(v["ts"], "2026-01-09T08:15:30.000+00:00");
    }

    #[test]
    fn test_json_raw_only_message() {
        let out = encode(&JsonEncoder, Mode::Raw, &entry(vec![]), false);
        assert_eq!(out, "{\"msg\":\"slow request\"}\n");
    }

    #[test]
    fn test_json_omits_missing_name_and_caller() {
        let mut e = entry(vec![]);
        e.name = None;
        e.caller = None;
        let out = encode(&JsonEncoder, Mode::Production, &e, false);
        let v: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert!(v.get("logger").is_none());
        assert!(v.get("caller").is_none());
    }

    #[test]
    fn test_json_attribute_cannot_replace_record_fields() {
        let user = Value::Str("user data".into());
        let lvl = Value::Str("fatal".into());
        let out = encode(
            &JsonEncoder,
            Mode::Production,
            &entry(vec![("msg", &user), ("level", &lvl)]),
            false,
        );
        let v: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(v["msg"], "slow request");
        assert_eq!(v["level"], "warn");
        assert_eq!(v["fields.msg"], "user data");
        assert_eq!(v["fields.level"], "fatal");
    }

    #[test]
    fn test_console_development() {
        let req = Value::Str("1".into());
        let out = encode(&ConsoleEncoder, Mode::Development, &entry(vec![("req", &req)]), false);
        assert_eq!(
            out,
            "2026-01-09T08:15:30.000+00:00\tWARN\thttp\tnet/server.rs:12\tslow request\t{\"req\":\"1\"}\n"
        );
    }

    #[test]
    fn test_console_colored_level() {
        let out = encode(&ConsoleEncoder, Mode::Default, &entry(vec![]), true);
        assert!(out.contains("\x1b["));
    }

    #[test]
    fn test_builtin_names() {
        assert!(builtin("json").is_some());
        assert!(builtin("console").is_some());
        assert!(builtin("text").is_some());
        assert!(builtin("logfmt").is_none());
    }
}
