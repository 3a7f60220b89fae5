//! Lazily established, reusable connection to the destination.
//!
//! A [`Connection`] wraps a `ureq::Agent` restricted to one idle socket, so
//! consecutive requests travel over the same keep-alive connection. The
//! manager discards the agent once it has been idle for the keep-alive
//! timeout, or after any transport failure, and the next send reconnects.

use std::{
    io::Read,
    sync::Arc,
    time::{Duration, Instant},
};

use log::debug;
use native_tls::TlsConnector;
use ureq::{Agent, AgentBuilder};

use super::policy::HttpResponse;
use super::request::OutboundRequest;
use crate::config::{Destination, KeepAliveTimeout};
use crate::error::DeliveryError;

/// Timeout for establishing a TCP (and TLS) connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for each read while waiting for the response.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Open, reusable connection to one destination.
pub struct Connection {
    agent: Agent,
    last_used: Instant,
}

impl Connection {
    fn open(destination: &Destination) -> Result<Self, DeliveryError> {
        let mut builder = AgentBuilder::new()
            .timeout_connect(DEFAULT_CONNECT_TIMEOUT)
            .timeout_read(DEFAULT_READ_TIMEOUT)
            .redirects(0)
            .max_idle_connections(1)
            .max_idle_connections_per_host(1);
        if destination.is_tls() {
            builder = builder.tls_connector(Arc::new(TlsConnector::new()?));
        }
        Ok(Self {
            agent: builder.build(),
            last_used: Instant::now(),
        })
    }

    fn is_stale(&self, keep_alive: KeepAliveTimeout, now: Instant) -> bool {
        now.saturating_duration_since(self.last_used) >= keep_alive.as_duration()
    }

    /// Send `request` and read the full response.
    ///
    /// Any status is returned as a response; only transport problems are
    /// errors.
    fn send(&self, request: &OutboundRequest) -> Result<HttpResponse, DeliveryError> {
        let mut call = self
            .agent
            .request_url(request.method.as_str(), &request.url);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }
        let response = match call.send_bytes(&request.body) {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(source)) => {
                return Err(DeliveryError::Transport {
                    url: request.url.to_string(),
                    source: Box::new(source),
                });
            }
        };
        let status = response.status();
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|source| DeliveryError::ResponseBody {
                url: request.url.to_string(),
                source,
            })?;
        Ok(HttpResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// Owns the sink's single connection.
pub struct ConnectionManager {
    destination: Destination,
    keep_alive: KeepAliveTimeout,
    connection: Option<Connection>,
}

impl ConnectionManager {
    pub fn new(destination: Destination, keep_alive: KeepAliveTimeout) -> Self {
        Self {
            destination,
            keep_alive,
            connection: None,
        }
    }

    /// Whether a connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Return the open connection, replacing it first if it has idled past
    /// the keep-alive timeout, or opening one if none is held.
    pub fn acquire(&mut self) -> Result<&Connection, DeliveryError> {
        let now = Instant::now();
        if self
            .connection
            .as_ref()
            .is_some_and(|conn| conn.is_stale(self.keep_alive, now))
        {
            debug!(
                "HttpSink connection to {}:{} idle past keep-alive; reconnecting",
                self.destination.host(),
                self.destination.port()
            );
            self.release();
        }
        let conn = match self.connection.take() {
            Some(conn) => conn,
            None => {
                debug!(
                    "HttpSink opening connection to {}:{}",
                    self.destination.host(),
                    self.destination.port()
                );
                Connection::open(&self.destination)?
            }
        };
        Ok(self.connection.insert(conn))
    }

    /// Send `request` over the managed connection.
    ///
    /// A transport failure drops the connection so the next call starts
    /// from a fresh one.
    pub fn send(&mut self, request: &OutboundRequest) -> Result<HttpResponse, DeliveryError> {
        let result = self.acquire()?.send(request);
        match &result {
            Ok(_) => {
                if let Some(conn) = self.connection.as_mut() {
                    conn.last_used = Instant::now();
                }
            }
            Err(_) => self.release(),
        }
        result
    }

    /// Close the connection if one is open. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.connection.take().is_some() {
            debug!(
                "HttpSink closed connection to {}:{}",
                self.destination.host(),
                self.destination.port()
            );
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("destination", &self.destination)
            .field("keep_alive", &self.keep_alive)
            .field("connected", &self.is_connected())
            .finish()
    }
}
