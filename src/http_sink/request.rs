//! Construction of outbound requests from a batch.

use url::Url;

use super::serialise::{serialise_form, serialise_json_array};
use crate::config::{AuthConfig, PayloadFormat, SinkConfig};
use crate::error::DeliveryError;
use crate::event::{EventBatch, Record};

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = "FluentPluginHTTP";

/// HTTP method of an outbound request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HttpMethod {
    #[default]
    Post,
}

impl HttpMethod {
    /// Convert to the string representation used by ureq.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
        }
    }
}

/// Fully built request, ready to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: Url,
    /// Header name/value pairs in the order they are sent.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl OutboundRequest {
    /// First value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Builds [`OutboundRequest`]s for one destination.
#[derive(Clone, Debug)]
pub struct RequestBuilder {
    url: Url,
    auth: AuthConfig,
    format: PayloadFormat,
}

impl RequestBuilder {
    pub fn new(url: Url, auth: AuthConfig, format: PayloadFormat) -> Self {
        Self { url, auth, format }
    }

    pub fn from_config(config: &SinkConfig) -> Self {
        Self::new(
            config.destination.url().clone(),
            config.auth.clone(),
            config.format,
        )
    }

    pub fn format(&self) -> PayloadFormat {
        self.format
    }

    /// Build the requests carrying `batch`.
    ///
    /// JSON yields a single request for the whole batch, form encoding one
    /// request per record. An empty batch yields no requests.
    pub fn build(&self, batch: &EventBatch) -> Result<Vec<OutboundRequest>, DeliveryError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        match self.format {
            PayloadFormat::Json => Ok(vec![self.build_json(batch.records())?]),
            PayloadFormat::Form => batch
                .records()
                .iter()
                .map(|record| self.build_form(record))
                .collect(),
        }
    }

    /// Build a JSON-array request for `records`.
    pub fn build_json(&self, records: &[Record]) -> Result<OutboundRequest, DeliveryError> {
        let body = serialise_json_array(records)?;
        Ok(self.request(body))
    }

    /// Build a form-encoded request for a single record.
    pub fn build_form(&self, record: &Record) -> Result<OutboundRequest, DeliveryError> {
        let body = serialise_form(record)?;
        Ok(self.request(body))
    }

    fn request(&self, body: Vec<u8>) -> OutboundRequest {
        let mut headers = vec![
            ("User-Agent".to_owned(), USER_AGENT.to_owned()),
            (
                "Content-Type".to_owned(),
                self.format.content_type().to_owned(),
            ),
        ];
        if let Some(value) = self.auth.header_value() {
            headers.push(("Authorization".to_owned(), value));
        }
        OutboundRequest {
            method: HttpMethod::Post,
            url: self.url.clone(),
            headers,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::record;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn url() -> Url {
        Url::parse("https://example.org/logs?source=test").expect("url")
    }

    #[fixture]
    fn batch() -> EventBatch {
        EventBatch::from_records(vec![
            record(json!({"foo": "bar"})),
            record(json!({"baz": 1})),
        ])
    }

    #[rstest]
    fn json_batch_is_one_request(url: Url, batch: EventBatch) {
        let builder = RequestBuilder::new(url.clone(), AuthConfig::None, PayloadFormat::Json);
        let requests = builder.build(&batch).expect("build");
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method.as_str(), "POST");
        assert_eq!(request.url, url);
        assert_eq!(request.body, br#"[{"foo":"bar"},{"baz":1}]"#);
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("user-agent"), Some(USER_AGENT));
    }

    #[rstest]
    fn form_batch_is_one_request_per_record(url: Url, batch: EventBatch) {
        let builder = RequestBuilder::new(url, AuthConfig::None, PayloadFormat::Form);
        let requests = builder.build(&batch).expect("build");
        let bodies: Vec<&[u8]> = requests.iter().map(|r| r.body.as_slice()).collect();
        assert_eq!(bodies, [b"foo=bar".as_slice(), b"baz=1".as_slice()]);
        assert!(requests.iter().all(|r| {
            r.header("Content-Type") == Some("application/x-www-form-urlencoded")
                && r.header("User-Agent") == Some(USER_AGENT)
        }));
    }

    #[rstest]
    #[case(PayloadFormat::Json)]
    #[case(PayloadFormat::Form)]
    fn empty_batch_builds_nothing(url: Url, #[case] format: PayloadFormat) {
        let builder = RequestBuilder::new(url, AuthConfig::None, format);
        assert!(builder.build(&EventBatch::new()).expect("build").is_empty());
    }

    #[rstest]
    #[case(AuthConfig::None, None)]
    #[case(AuthConfig::Token { token: "secret".into() }, Some("Token token=secret"))]
    #[case(
        AuthConfig::Basic { username: "user".into(), password: "secret".into() },
        Some("Basic dXNlcjpzZWNyZXQ=")
    )]
    fn authorization_header_follows_auth(
        url: Url,
        batch: EventBatch,
        #[case] auth: AuthConfig,
        #[case] expected: Option<&str>,
    ) {
        for format in [PayloadFormat::Json, PayloadFormat::Form] {
            let builder = RequestBuilder::new(url.clone(), auth.clone(), format);
            for request in builder.build(&batch).expect("build") {
                assert_eq!(request.header("authorization"), expected);
            }
        }
    }
}
