//! Helpers shared by unit and integration tests.
//!
//! Compiled for the crate's own tests and, through the `test-util` feature,
//! for the integration tests under `tests/`.

mod mock_http;

use serde_json::Value;

use crate::event::Record;

pub use mock_http::{CapturedRequest, MockHttpServer, MockResponse, unused_local_addr};

/// Build a [`Record`] from a `serde_json::json!` object literal.
///
/// # Panics
///
/// Panics if `value` is not a JSON object.
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("record literal must be a JSON object, got {other}"),
    }
}
