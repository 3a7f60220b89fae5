//! Forward buffered event batches to an HTTP endpoint.
//!
//! A host pipeline configures an [`HttpSink`] once from key/value parameters,
//! calls [`HttpSink::deliver`] for every flushed [`EventBatch`], and calls
//! [`HttpSink::shutdown`] on teardown. Delivery is synchronous; the host owns
//! buffering, retries and backoff.
//!
//! ```no_run
//! use http_forward_sink::{EventBatch, EventSink, HttpSink, RawConfig, Record};
//!
//! let raw = RawConfig::new()
//!     .with("url", "https://logs.example.org/ingest")
//!     .with("accept_status_code", "200, 202")
//!     .with("authorization_token", "secret");
//! let mut sink = HttpSink::configure(&raw)?;
//! let mut record = Record::new();
//! record.insert("msg".to_owned(), "hello".into());
//! let batch = EventBatch::from_records(vec![record]);
//! sink.deliver(&batch)?;
//! sink.shutdown();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
mod error;
mod event;
pub mod http_sink;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use config::{
    AcceptedStatusSet, AuthConfig, Destination, KeepAliveTimeout, PayloadFormat, RawConfig,
    SinkConfig,
};
pub use error::{ConfigError, DeliveryError};
pub use event::{EventBatch, Record};
pub use http_sink::{
    DeliveryOutcome, EventSink, HttpResponse, HttpSink, OutboundRequest, RequestBuilder,
    ResponseError, SharedSink, SinkState,
};
