//! Response acceptance.
//!
//! A delivery succeeds exactly when the response status is in the configured
//! [`AcceptedStatusSet`]. Retry decisions belong to the host, so a rejection
//! only carries enough context to report it.

use thiserror::Error;

use super::request::OutboundRequest;
use crate::config::AcceptedStatusSet;

/// Status and body observed from the endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// A response whose status is outside the accepted set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error(
    "failed to {method} event records to {url}: unsuccessful response code \"{status}\" {body:?}",
    method = .request.method.as_str(),
    url = .request.url,
    status = .response.status,
    body = .response.body
)]
pub struct ResponseError {
    request: Box<OutboundRequest>,
    response: HttpResponse,
}

impl ResponseError {
    pub fn new(request: OutboundRequest, response: HttpResponse) -> Self {
        Self {
            request: Box::new(request),
            response,
        }
    }

    /// The rejected request.
    pub fn request(&self) -> &OutboundRequest {
        &self.request
    }

    pub fn status(&self) -> u16 {
        self.response.status
    }

    pub fn body(&self) -> &str {
        &self.response.body
    }
}

/// Result of evaluating a response.
#[derive(Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Accepted,
    Rejected(ResponseError),
}

impl DeliveryOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn into_result(self) -> Result<(), ResponseError> {
        match self {
            Self::Accepted => Ok(()),
            Self::Rejected(err) => Err(err),
        }
    }
}

/// Classify `response` to `request` against `accepted`.
pub fn evaluate(
    accepted: &AcceptedStatusSet,
    request: OutboundRequest,
    response: HttpResponse,
) -> DeliveryOutcome {
    if accepted.contains(response.status) {
        DeliveryOutcome::Accepted
    } else {
        DeliveryOutcome::Rejected(ResponseError::new(request, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, PayloadFormat};
    use crate::test_utils::record;
    use crate::http_sink::request::RequestBuilder;
    use proptest::prelude::*;
    use rstest::{fixture, rstest};
    use serde_json::json;
    use url::Url;

    fn sample_request() -> OutboundRequest {
        let url = Url::parse("https://example.org/").expect("url");
        RequestBuilder::new(url, AuthConfig::None, PayloadFormat::Json)
            .build_json(&[record(json!({"foo": "bar"}))])
            .expect("build")
    }

    #[fixture]
    fn request() -> OutboundRequest {
        sample_request()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_owned(),
        }
    }

    #[fixture]
    fn accepted() -> AcceptedStatusSet {
        AcceptedStatusSet::new(["200", "303"]).expect("valid codes")
    }

    #[rstest]
    #[case(200)]
    #[case(303)]
    fn accepted_status_succeeds(
        accepted: AcceptedStatusSet,
        request: OutboundRequest,
        #[case] status: u16,
    ) {
        assert!(evaluate(&accepted, request, response(status, "")).is_accepted());
    }

    #[rstest]
    fn rejected_status_carries_diagnostics(accepted: AcceptedStatusSet, request: OutboundRequest) {
        let outcome = evaluate(&accepted, request.clone(), response(500, "boom"));
        let err = outcome.into_result().expect_err("500 is rejected");
        assert_eq!(err.status(), 500);
        assert_eq!(err.body(), "boom");
        assert_eq!(err.request(), &request);
        assert_eq!(
            err.to_string(),
            r#"failed to POST event records to https://example.org/: unsuccessful response code "500" "boom""#
        );
    }

    #[rstest]
    fn default_set_only_accepts_200(request: OutboundRequest) {
        let accepted = AcceptedStatusSet::default();
        assert!(evaluate(&accepted, request.clone(), response(200, "")).is_accepted());
        assert!(!evaluate(&accepted, request, response(201, "")).is_accepted());
    }

    proptest! {
        #[test]
        fn accepted_iff_member(
            codes in proptest::collection::btree_set(100u16..600, 1..8),
            status in 100u16..600,
        ) {
            let accepted = AcceptedStatusSet::new(codes.iter().map(u16::to_string))
                .expect("codes in range");
            let outcome = evaluate(&accepted, sample_request(), response(status, ""));
            prop_assert_eq!(outcome.is_accepted(), codes.contains(&status));
        }
    }
}
