//! Span creation helpers for gateway calls

use crate::attributes::*;

/// Create the span a single backend request runs in.
///
/// The response status is left empty and recorded by the caller with
/// `span.record(HTTP_RESPONSE_STATUS, status)` once the response arrives.
pub fn gateway_span(method: &str, endpoint: &str) -> tracing::Span {
    tracing::info_span!(
        "gateway_call",
        { HTTP_REQUEST_METHOD } = %method,
        { SQLV_ENDPOINT } = %endpoint,
        { HTTP_RESPONSE_STATUS } = tracing::field::Empty,
    )
}
