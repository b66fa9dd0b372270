use std::fs;
use std::io::Write;
use std::path::Path;

use logwise::{
    Config, Error, LevelHandle, LogLayer, Mode, Registry, RotationConfig, StdLogAdapter, attr,
    new_std_log, rolling_logger,
};
use tracing_subscriber::layer::SubscriberExt;

fn records(path: &Path) -> Vec<serde_json::Value> {
    fs::read_to_string(path)
        .expect("read log file")
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect()
}

#[test]
fn test_file_output_writes_json_records() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("app.log");

    let logger = Config::new()
        .with_mode(Mode::Production)
        .with_output(path.to_string_lossy())
        .logger([attr("service", "billing")])
        .expect("build logger");
    logger.info("started", &[attr("port", 8080)]);
    logger.debug("hidden", &[]);
    logger.sync().expect("sync");

    let recs = records(&path);
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["msg"], "started");
    assert_eq!(recs[0]["level"], "info");
    assert_eq!(recs[0]["service"], "billing");
    assert_eq!(recs[0]["port"], 8080);
}

#[test]
fn test_file_url_output() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("url.log");
    let url = url::Url::from_file_path(&path).expect("file url");

    let logger = Config::new()
        .with_mode(Mode::Production)
        .with_output(url.as_str())
        .logger([])
        .expect("build logger");
    logger.warn("via url", &[]);

    let recs = records(&path);
    assert_eq!(recs[0]["msg"], "via url");
    assert_eq!(recs[0]["level"], "warn");
}

#[test]
fn test_unopenable_output_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("missing").join("app.log");

    let result = Config::new()
        .with_mode(Mode::Production)
        .with_output("stdout")
        .with_output(path.to_string_lossy())
        .logger([]);
    assert!(matches!(result, Err(Error::Sink { .. })));
    assert!(!path.exists());
}

#[test]
fn test_unknown_scheme_fails() {
    let result = Config::new()
        .with_mode(Mode::Production)
        .with_output("kafka://broker/topic")
        .logger([]);
    assert!(matches!(result, Err(Error::UnknownScheme(s)) if s == "kafka"));
}

#[test]
fn test_rolling_output() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("nested").join("roll.log");
    let output = format!("rolling://{}", path.to_string_lossy());

    let logger = Config::new()
        .with_mode(Mode::Production)
        .with_output(output)
        .with_file_logger(RotationConfig::new(""))
        .logger([])
        .expect("build logger");
    logger.error("rolled", &[attr("attempt", 3)]);

    let recs = records(&path);
    assert_eq!(recs[0]["msg"], "rolled");
    assert_eq!(recs[0]["attempt"], 3);
}

#[test]
fn test_rolling_scheme_requires_file_logger() {
    let result = Config::new()
        .with_mode(Mode::Production)
        .with_output("rolling:///tmp/never.log")
        .logger([]);
    assert!(matches!(result, Err(Error::UnknownScheme(_))));
}

#[test]
fn test_shared_registry_rejects_second_rolling_build() {
    let dir = tempfile::tempdir().expect("temp dir");
    let rotation = RotationConfig::new(dir.path().join("a.log").to_string_lossy());
    let config = Config::new()
        .with_mode(Mode::Production)
        .with_output("stderr")
        .with_file_logger(rotation);

    let mut registry = Registry::new();
    let level = LevelHandle::default();
    config
        .clone()
        .build(&mut registry, &level, [])
        .expect("first build");
    assert!(matches!(
        config.clone().build(&mut registry, &level, []),
        Err(Error::SchemeConflict(_))
    ));

    let mut tolerant = Registry::new().allow_reregistration(true);
    config.clone().build(&mut tolerant, &level, []).expect("first");
    config.build(&mut tolerant, &level, []).expect("second");
}

#[test]
fn test_rolling_logger_flushes_on_drop() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("bg.log");

    let logger = rolling_logger(
        RotationConfig::new(path.to_string_lossy()),
        &LevelHandle::default(),
        [attr("worker", 1)],
    )
    .expect("rolling logger");
    logger.info("background", &[]);
    drop(logger);

    let recs = records(&path);
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["msg"], "background");
    assert_eq!(recs[0]["worker"], 1);
    assert!(recs[0]["ts"].is_i64());
}

#[test]
fn test_rolling_logger_keeps_every_record_of_a_burst() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("burst.log");

    let logger = rolling_logger(
        RotationConfig::new(path.to_string_lossy()),
        &LevelHandle::default(),
        [],
    )
    .expect("rolling logger");
    for i in 0..5_000 {
        logger.info("burst", &[attr("seq", i)]);
    }
    drop(logger);

    let recs = records(&path);
    assert_eq!(recs.len(), 5_000);
    assert_eq!(recs[4_999]["seq"], 4_999);
}

#[test]
fn test_off_mode_touches_nothing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("off.log");

    let logger = Config::new()
        .with_mode(Mode::Off)
        .with_output(path.to_string_lossy())
        .logger([])
        .expect("build logger");
    logger.error("nothing", &[]);
    assert!(!path.exists());
}

#[test]
fn test_std_adapter_logs_errors() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("std.log");

    let logger = Config::new()
        .with_mode(Mode::Production)
        .with_output(path.to_string_lossy())
        .logger([])
        .expect("build logger");

    let mut adapter = StdLogAdapter::new(logger.clone());
    let line = b"http: TLS handshake error from 10.0.0.1\n";
    assert_eq!(adapter.write(line).expect("write"), line.len());

    new_std_log(&logger, "[srv] ").print("accept failed");

    let recs = records(&path);
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0]["level"], "error");
    assert_eq!(recs[0]["msg"], "internal server error");
    assert_eq!(recs[0]["error"], "http: TLS handshake error from 10.0.0.1");
    let second = recs[1]["error"].as_str().expect("error attr");
    assert!(second.starts_with("[srv] "));
    assert!(second.ends_with(" accept failed"));
}

#[test]
fn test_tracing_layer_routes_events() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("tracing.log");

    let logger = Config::new()
        .with_mode(Mode::Production)
        .with_level("info")
        .with_output(path.to_string_lossy())
        .with_source(true)
        .logger([])
        .expect("build logger");

    let subscriber = tracing_subscriber::registry().with(LogLayer::new(logger));
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(user = "ada", retries = 2u64, "signed in");
        tracing::debug!("filtered out");
    });

    let recs = records(&path);
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["msg"], "signed in");
    assert_eq!(recs[0]["user"], "ada");
    assert_eq!(recs[0]["retries"], 2);
    let caller = recs[0]["caller"].as_str().expect("caller");
    assert!(caller.contains("logging_file_tests.rs:"), "caller was {}", caller);
}
