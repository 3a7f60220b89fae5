//! The sink the host drives: configure once, deliver per flush, shut down.

use log::{debug, warn};
use parking_lot::Mutex;

use super::connection::ConnectionManager;
use super::policy::evaluate;
use super::request::RequestBuilder;
use crate::config::{RawConfig, SinkConfig};
use crate::error::{ConfigError, DeliveryError};
use crate::event::EventBatch;

/// Lifecycle hooks a host pipeline invokes on an output.
pub trait EventSink: Send {
    /// Validate `raw` and build a ready-to-use sink.
    fn configure(raw: &RawConfig) -> Result<Self, ConfigError>
    where
        Self: Sized;

    /// Forward one flushed batch.
    fn deliver(&mut self, batch: &EventBatch) -> Result<(), DeliveryError>;

    /// Release held resources. Safe to call more than once.
    fn shutdown(&mut self);
}

/// Connection state of an [`HttpSink`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkState {
    /// No connection is open.
    Idle,
    /// A reusable connection is open.
    Connected,
}

/// Sink posting batches to one HTTP(S) endpoint.
///
/// Requests go out over a single keep-alive connection opened on the first
/// non-empty delivery. A response outside the accepted status set, or any
/// transport failure, is returned as a [`DeliveryError`]; retrying is left to
/// the caller.
#[derive(Debug)]
pub struct HttpSink {
    config: SinkConfig,
    builder: RequestBuilder,
    connection: ConnectionManager,
}

impl HttpSink {
    /// Construct the sink from an already validated configuration.
    pub fn with_config(config: SinkConfig) -> Self {
        let builder = RequestBuilder::from_config(&config);
        let connection =
            ConnectionManager::new(config.destination.clone(), config.keep_alive_timeout);
        Self {
            config,
            builder,
            connection,
        }
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    pub fn state(&self) -> SinkState {
        if self.connection.is_connected() {
            SinkState::Connected
        } else {
            SinkState::Idle
        }
    }

    /// Deliver `batch`, stopping at the first failed request.
    ///
    /// An empty batch is a no-op and opens no connection.
    pub fn deliver(&mut self, batch: &EventBatch) -> Result<(), DeliveryError> {
        if batch.is_empty() {
            return Ok(());
        }
        let requests = self.builder.build(batch)?;
        debug!(
            "HttpSink delivering {} records in {} requests to {}",
            batch.len(),
            requests.len(),
            self.config.destination
        );
        for request in requests {
            let response = self.connection.send(&request).inspect_err(|err| {
                warn!("HttpSink request failed: {err}");
            })?;
            evaluate(&self.config.accept_status_code, request, response)
                .into_result()
                .inspect_err(|err| warn!("HttpSink delivery rejected: {err}"))?;
        }
        Ok(())
    }

    /// Close the connection. Safe to call repeatedly or before any delivery.
    pub fn shutdown(&mut self) {
        self.connection.release();
    }
}

impl EventSink for HttpSink {
    fn configure(raw: &RawConfig) -> Result<Self, ConfigError> {
        SinkConfig::from_raw(raw).map(Self::with_config)
    }

    fn deliver(&mut self, batch: &EventBatch) -> Result<(), DeliveryError> {
        HttpSink::deliver(self, batch)
    }

    fn shutdown(&mut self) {
        HttpSink::shutdown(self);
    }
}

impl Drop for HttpSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// [`HttpSink`] behind a mutex, for hosts that flush from several threads.
#[derive(Debug)]
pub struct SharedSink {
    inner: Mutex<HttpSink>,
}

impl SharedSink {
    pub fn new(sink: HttpSink) -> Self {
        Self {
            inner: Mutex::new(sink),
        }
    }

    /// Deliver `batch`, waiting for any concurrent delivery to finish first.
    pub fn deliver(&self, batch: &EventBatch) -> Result<(), DeliveryError> {
        self.inner.lock().deliver(batch)
    }

    pub fn shutdown(&self) {
        self.inner.lock().shutdown();
    }

    pub fn state(&self) -> SinkState {
        self.inner.lock().state()
    }

    pub fn into_inner(self) -> HttpSink {
        self.inner.into_inner()
    }
}

impl From<HttpSink> for SharedSink {
    fn from(sink: HttpSink) -> Self {
        Self::new(sink)
    }
}
