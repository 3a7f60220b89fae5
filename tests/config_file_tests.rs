//! Loading sink configuration from INI files.

use std::io::Write;
use std::time::Duration;

use http_forward_sink::{
    AuthConfig, ConfigError, EventBatch, EventSink, HttpSink, PayloadFormat, RawConfig,
    SinkConfig,
    test_utils::{MockHttpServer, record},
};
use rstest::rstest;
use serde_json::json;
use tempfile::NamedTempFile;

fn write_config(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp ini file");
    file.write_all(contents).expect("write ini contents");
    file
}

#[rstest]
fn loads_all_parameters_from_section() {
    let file = write_config(
        b"[output]\n\
          url = https://example.org/ingest\n\
          accept_status_code = 200, 202\n\
          authorization_token = secret\n\
          keep_alive_timeout = 32.5\n\
          format = form\n",
    );

    let raw = RawConfig::from_ini_file(file.path(), Some("output"), None).expect("load");
    let config = SinkConfig::from_raw(&raw).expect("validate");

    assert_eq!(config.destination.url().as_str(), "https://example.org/ingest");
    assert_eq!(config.accept_status_code.codes(), ["200", "202"]);
    assert_eq!(
        config.auth,
        AuthConfig::Token {
            token: "secret".into()
        }
    );
    assert_eq!(config.keep_alive_timeout.as_secs_f64(), 32.5);
    assert_eq!(config.format, PayloadFormat::Form);
}

#[rstest]
fn decodes_file_with_encoding_label() {
    let file = write_config(b"url = http://example.org/\nusername = jos\xe9\n");

    let raw = RawConfig::from_ini_file(file.path(), None, Some("latin1")).expect("load");

    assert_eq!(raw.get("username"), Some("josé"));
}

#[rstest]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.ini");

    let err = RawConfig::from_ini_file(&path, None, None).expect_err("file is missing");

    assert!(matches!(err, ConfigError::Read { .. }));
}

#[rstest]
fn invalid_values_fail_configuration() {
    let file = write_config(b"url = ws://example.org/\n");
    let raw = RawConfig::from_ini_file(file.path(), None, None).expect("load");

    let err = HttpSink::configure(&raw).expect_err("ws scheme");

    assert!(matches!(err, ConfigError::UnsupportedScheme(_)));
}

#[rstest]
fn configured_sink_delivers() {
    let server = MockHttpServer::with_status(201).expect("server");
    let file = write_config(
        format!(
            "url = {}\naccept_status_code = 201\n",
            server.url("/ingest")
        )
        .as_bytes(),
    );
    let raw = RawConfig::from_ini_file(file.path(), None, None).expect("load");
    let mut sink = HttpSink::configure(&raw).expect("configure");

    sink.deliver(&EventBatch::from_records(vec![record(json!({"foo": "bar"}))]))
        .expect("delivered");

    let captured = server
        .next_request(Duration::from_secs(5))
        .expect("request");
    assert_eq!(captured.path, "/ingest");
    assert_eq!(captured.body, r#"[{"foo":"bar"}]"#);
}
