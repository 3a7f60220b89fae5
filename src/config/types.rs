//! Validated configuration values consumed by [`HttpSink`](crate::HttpSink).
//!
//! Each type upholds its invariant on construction, so holding one is proof
//! that the corresponding parameter passed validation.

use std::{fmt, time::Duration};

use url::Url;

use crate::error::ConfigError;

/// Accepted status codes applied when `accept_status_code` is not configured.
pub const DEFAULT_ACCEPT_STATUS_CODE: &str = "200";
/// Keep-alive timeout in seconds applied when none is configured.
pub const DEFAULT_KEEP_ALIVE_TIMEOUT_SECS: f64 = 60.0;

/// Half-open range of integers accepted as HTTP status codes.
const STATUS_CODE_RANGE: std::ops::Range<u16> = 100..600;

/// URL scheme of a [`Destination`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

/// Validated endpoint records are posted to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Destination {
    url: Url,
    scheme: Scheme,
    host: String,
    port: u16,
}

impl Destination {
    /// Parse an absolute `http` or `https` URL.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
            value: value.to_owned(),
            source,
        })?;
        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            _ => return Err(ConfigError::UnsupportedScheme(value.to_owned())),
        };
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ConfigError::MissingHost(value.to_owned()))?
            .to_owned();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ConfigError::MissingHost(value.to_owned()))?;
        Ok(Self {
            url,
            scheme,
            host,
            port,
        })
    }

    /// Full target URL including path and query.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, or the scheme's default when the URL omits one.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether connections to this destination are wrapped in TLS.
    pub fn is_tls(&self) -> bool {
        self.scheme == Scheme::Https
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Non-empty set of status codes that count as a successful delivery.
///
/// Codes are kept as the configured strings, in configuration order, and a
/// response is accepted when its status rendered as a decimal string matches
/// one of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptedStatusSet {
    codes: Vec<String>,
}

impl AcceptedStatusSet {
    /// Validate a list of status code strings.
    ///
    /// Fails when the list is empty or any member is not an integer in
    /// `[100, 600)`; the error carries the whole offending list.
    pub fn new<I, S>(codes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = codes.into_iter().map(Into::into).collect();
        if codes.is_empty() || !codes.iter().all(|code| is_http_status_code(code)) {
            return Err(ConfigError::InvalidStatusCodes(codes));
        }
        Ok(Self { codes })
    }

    /// Whether `status` is one of the accepted codes.
    pub fn contains(&self, status: u16) -> bool {
        let status = status.to_string();
        self.codes.iter().any(|code| *code == status)
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }
}

impl Default for AcceptedStatusSet {
    fn default() -> Self {
        Self {
            codes: vec![DEFAULT_ACCEPT_STATUS_CODE.to_owned()],
        }
    }
}

/// Canonical decimal only (no sign, no leading zero), so a valid code always
/// compares equal to some rendered response status.
fn is_http_status_code(code: &str) -> bool {
    !code.starts_with('0')
        && code.bytes().all(|b| b.is_ascii_digit())
        && code
            .parse::<u16>()
            .is_ok_and(|value| STATUS_CODE_RANGE.contains(&value))
}

/// Authentication attached to every outbound request.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum AuthConfig {
    /// No `Authorization` header.
    #[default]
    None,
    /// `Authorization: Token token=<token>`.
    Token { token: String },
    /// HTTP Basic authentication.
    Basic { username: String, password: String },
}

impl AuthConfig {
    /// Value of the `Authorization` header, if any.
    pub fn header_value(&self) -> Option<String> {
        use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};

        match self {
            Self::None => None,
            Self::Token { token } => Some(format!("Token token={token}")),
            Self::Basic { username, password } => {
                let credentials = format!("{username}:{password}");
                Some(format!(
                    "Basic {}",
                    BASE64_STANDARD.encode(credentials.as_bytes())
                ))
            }
        }
    }
}

// Secrets never reach logs through `{:?}`.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Token { .. } => f.debug_struct("Token").field("token", &"***").finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// Idle lifetime of a reusable connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeepAliveTimeout(Duration);

impl KeepAliveTimeout {
    /// Build from seconds; rejects negative, NaN and infinite values.
    ///
    /// Finite values beyond what a [`Duration`] can hold saturate to
    /// [`Duration::MAX`], so such a connection is never considered stale.
    pub fn from_secs_f64(secs: f64) -> Result<Self, ConfigError> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(ConfigError::InvalidKeepAliveTimeout(secs.to_string()));
        }
        Ok(Self(
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX),
        ))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }
}

impl Default for KeepAliveTimeout {
    fn default() -> Self {
        Self(Duration::from_secs_f64(DEFAULT_KEEP_ALIVE_TIMEOUT_SECS))
    }
}

/// Wire encoding of delivered records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PayloadFormat {
    /// One request per batch carrying a JSON array of records.
    #[default]
    Json,
    /// One `application/x-www-form-urlencoded` request per record.
    Form,
}

impl PayloadFormat {
    /// Parse the `format` parameter.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "form" => Ok(Self::Form),
            _ => Err(ConfigError::UnknownFormat(value.to_owned())),
        }
    }

    /// `Content-Type` header sent with this encoding.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Form => "application/x-www-form-urlencoded",
        }
    }
}

/// Fully validated sink configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct SinkConfig {
    /// Endpoint records are posted to.
    pub destination: Destination,
    /// Status codes treated as a successful delivery.
    pub accept_status_code: AcceptedStatusSet,
    /// Authentication applied to every request.
    pub auth: AuthConfig,
    /// Idle lifetime of the reusable connection.
    pub keep_alive_timeout: KeepAliveTimeout,
    /// Request body encoding.
    pub format: PayloadFormat,
}

impl SinkConfig {
    /// Configuration with defaults for everything but the destination.
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            accept_status_code: AcceptedStatusSet::default(),
            auth: AuthConfig::default(),
            keep_alive_timeout: KeepAliveTimeout::default(),
            format: PayloadFormat::default(),
        }
    }

    pub fn with_accept_status_code(mut self, codes: AcceptedStatusSet) -> Self {
        self.accept_status_code = codes;
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_keep_alive_timeout(mut self, timeout: KeepAliveTimeout) -> Self {
        self.keep_alive_timeout = timeout;
        self
    }

    pub fn with_format(mut self, format: PayloadFormat) -> Self {
        self.format = format;
        self
    }
}
