//! Validation of [`RawConfig`] into [`SinkConfig`].

use log::warn;

use super::raw::RawConfig;
use super::types::{
    AcceptedStatusSet, AuthConfig, Destination, KeepAliveTimeout, PayloadFormat, SinkConfig,
};
use crate::error::ConfigError;

const URL: &str = "url";
const ACCEPT_STATUS_CODE: &str = "accept_status_code";
const AUTHORIZATION_TOKEN: &str = "authorization_token";
const USERNAME: &str = "username";
const PASSWORD: &str = "password";
const KEEP_ALIVE_TIMEOUT: &str = "keep_alive_timeout";
const FORMAT: &str = "format";

/// Parameters understood by the sink.
pub const KNOWN_PARAMETERS: [&str; 7] = [
    URL,
    ACCEPT_STATUS_CODE,
    AUTHORIZATION_TOKEN,
    USERNAME,
    PASSWORD,
    KEEP_ALIVE_TIMEOUT,
    FORMAT,
];

impl SinkConfig {
    /// Validate raw parameters, failing on the first invalid one.
    pub fn from_raw(raw: &RawConfig) -> Result<Self, ConfigError> {
        warn_unknown_parameters(raw);
        Ok(Self {
            destination: validate_url(raw.get(URL))?,
            accept_status_code: validate_accept_status_code(raw.get(ACCEPT_STATUS_CODE))?,
            auth: validate_auth(
                raw.get(AUTHORIZATION_TOKEN),
                raw.get(USERNAME),
                raw.get(PASSWORD),
            )?,
            keep_alive_timeout: validate_keep_alive_timeout(raw.get(KEEP_ALIVE_TIMEOUT))?,
            format: raw
                .get(FORMAT)
                .map_or(Ok(PayloadFormat::default()), PayloadFormat::parse)?,
        })
    }
}

fn warn_unknown_parameters(raw: &RawConfig) {
    for key in raw.keys().filter(|key| !KNOWN_PARAMETERS.contains(key)) {
        warn!("HttpSink ignoring unknown parameter '{key}'");
    }
}

fn validate_url(value: Option<&str>) -> Result<Destination, ConfigError> {
    match value.map(str::trim) {
        None | Some("") => Err(ConfigError::MissingParameter(URL)),
        Some(url) => Destination::parse(url),
    }
}

/// Split a comma-separated list; an empty value yields an empty list.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

fn validate_accept_status_code(value: Option<&str>) -> Result<AcceptedStatusSet, ConfigError> {
    match value {
        None => Ok(AcceptedStatusSet::default()),
        Some(list) => AcceptedStatusSet::new(split_list(list)),
    }
}

fn validate_auth(
    token: Option<&str>,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<AuthConfig, ConfigError> {
    if token.is_some_and(str::is_empty) {
        return Err(ConfigError::EmptyValue(AUTHORIZATION_TOKEN));
    }
    if username.is_some_and(str::is_empty) {
        return Err(ConfigError::EmptyValue(USERNAME));
    }
    match (token, username) {
        (Some(_), Some(_)) => Err(ConfigError::InvalidAuth(
            "authorization_token cannot be combined with username/password",
        )),
        (Some(token), None) => {
            if password.is_some() {
                return Err(ConfigError::InvalidAuth("password requires username"));
            }
            Ok(AuthConfig::Token {
                token: token.to_owned(),
            })
        }
        (None, Some(username)) => Ok(AuthConfig::Basic {
            username: username.to_owned(),
            password: password.unwrap_or_default().to_owned(),
        }),
        (None, None) => match password {
            Some(_) => Err(ConfigError::InvalidAuth("password requires username")),
            None => Ok(AuthConfig::None),
        },
    }
}

fn validate_keep_alive_timeout(value: Option<&str>) -> Result<KeepAliveTimeout, ConfigError> {
    let Some(value) = value else {
        return Ok(KeepAliveTimeout::default());
    };
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidKeepAliveTimeout(value.to_owned()))?;
    KeepAliveTimeout::from_secs_f64(secs)
}
