//! Sink configuration.
//!
//! The host supplies parameters as a [`RawConfig`]; [`SinkConfig::from_raw`]
//! validates them into typed values and fails fast with a
//! [`ConfigError`](crate::ConfigError) naming the offending parameter.
//!
//! | Parameter             | Default | Notes                                  |
//! |-----------------------|---------|----------------------------------------|
//! | `url`                 | none    | Required, `http` or `https`.           |
//! | `accept_status_code`  | `200`   | Comma separated, each in `[100, 600)`. |
//! | `authorization_token` | unset   | Must not be empty when present.        |
//! | `username`/`password` | unset   | HTTP Basic; excludes the token.        |
//! | `keep_alive_timeout`  | `60.0`  | Seconds, finite and non-negative.      |
//! | `format`              | `json`  | `json` or `form`.                      |

mod raw;
mod types;
mod validate;


pub use raw::RawConfig;
pub use types::{
    AcceptedStatusSet, AuthConfig, DEFAULT_ACCEPT_STATUS_CODE, DEFAULT_KEEP_ALIVE_TIMEOUT_SECS,
    Destination, KeepAliveTimeout, PayloadFormat, Scheme, SinkConfig,
};
pub use validate::KNOWN_PARAMETERS;
