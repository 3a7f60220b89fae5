//! Error types surfaced by configuration and delivery.
//!
//! Configuration failures are fatal to sink startup and are reported as
//! [`ConfigError`]. Everything that goes wrong while forwarding a batch is a
//! [`DeliveryError`], which the host inspects to decide whether to retry.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::http_sink::ResponseError;

/// Errors raised while validating or loading sink configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required parameter was not supplied.
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),
    /// The URL could not be parsed.
    #[error("invalid URL {value:?}: {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    /// The URL parsed but does not use `http` or `https`.
    #[error("unacceptable URL scheme, expected http or https: {0}")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host: {0}")]
    MissingHost(String),
    /// The accepted status set is empty or contains out-of-range codes.
    #[error("invalid status codes: {0:?}")]
    InvalidStatusCodes(Vec<String>),
    /// A parameter was explicitly configured with an empty value.
    #[error("'{0}' must not be empty")]
    EmptyValue(&'static str),
    /// The keep-alive timeout is missing, malformed, negative or not finite.
    #[error("invalid keep-alive timeout: {0:?}")]
    InvalidKeepAliveTimeout(String),
    /// The payload format is not one of the supported encodings.
    #[error("unknown payload format {0:?}, expected 'json' or 'form'")]
    UnknownFormat(String),
    /// Mutually exclusive or incomplete authentication settings.
    #[error("invalid authentication settings: {0}")]
    InvalidAuth(&'static str),
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The configuration text is not valid INI.
    #[error("{origin} is invalid: {message}")]
    Parse { origin: String, message: String },
    /// The requested section does not exist in the configuration file.
    #[error("{origin} has no section [{section}]")]
    MissingSection { origin: String, section: String },
    /// The encoding label is not recognised.
    #[error("unknown encoding {0}")]
    UnknownEncoding(String),
    /// The file contents are not valid in the requested encoding.
    #[error("{path} is not valid {encoding}")]
    Decode { path: PathBuf, encoding: &'static str },
}

/// Errors raised while delivering a batch.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Connecting, sending, or reading the response headers failed.
    #[error("transport failure posting to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<ureq::Transport>,
    },
    /// The platform TLS connector could not be initialised.
    #[error("failed to initialise TLS: {0}")]
    TlsSetup(#[from] native_tls::Error),
    /// The response body could not be read.
    #[error("failed to read response body from {url}: {source}")]
    ResponseBody {
        url: String,
        #[source]
        source: io::Error,
    },
    /// The endpoint answered with a status outside the accepted set.
    #[error(transparent)]
    Rejected(#[from] ResponseError),
    /// Records could not be encoded into a request body.
    #[error("failed to encode records: {0}")]
    Encoding(#[from] serde_json::Error),
    /// A host chunk could not be decoded into records.
    #[error("failed to decode buffered chunk: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

impl DeliveryError {
    /// Whether resending the same batch later could succeed.
    ///
    /// Encoding and decoding failures are properties of the batch itself and
    /// will fail again; everything else depends on the remote side.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Encoding(_) | Self::Decode(_))
    }
}
