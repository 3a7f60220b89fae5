//! HTTP forwarding sink.
//!
//! [`HttpSink`] turns each flushed [`EventBatch`](crate::EventBatch) into one
//! or more POST requests, sends them over a lazily opened keep-alive
//! connection, and checks every response status against the configured
//! accepted set.
//!
//! # Payload encodings
//!
//! - **JSON** (default): one `application/json` request per batch whose body
//!   is an array of the batch's records.
//! - **Form**: one `application/x-www-form-urlencoded` request per record.
//!
//! # Failure semantics
//!
//! Nothing is retried here. Transport failures drop the connection and are
//! returned as [`DeliveryError`](crate::DeliveryError)s; responses outside the
//! accepted set are returned as [`ResponseError`]s wrapped in
//! `DeliveryError::Rejected`. The host decides whether to retry, back off or
//! drop the batch.

mod connection;
mod policy;
mod request;
mod serialise;
mod sink;


pub use connection::{
    Connection, ConnectionManager, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT,
};
pub use policy::{DeliveryOutcome, HttpResponse, ResponseError, evaluate};
pub use request::{HttpMethod, OutboundRequest, RequestBuilder, USER_AGENT};
pub use sink::{EventSink, HttpSink, SharedSink, SinkState};
