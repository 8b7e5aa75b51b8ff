//! # sqlv Telemetry
//!
//! Tracing subscriber setup and span helpers for backend calls.
//!
//! Every gateway request runs inside a `gateway_call` span carrying the HTTP
//! method, the endpoint, and (once known) the response status. When
//! OpenTelemetry span processors are registered before initialization, those
//! spans are exported through them as well.

mod spans;
mod tracer;

pub use spans::gateway_span;
pub use tracer::{init_telemetry, register_span_processor, tracer_provider};

/// Span attribute names used by sqlv.
pub mod attributes {
    pub const HTTP_REQUEST_METHOD: &str = "http.request.method";
    pub const HTTP_RESPONSE_STATUS: &str = "http.response.status_code";
    pub const SQLV_ENDPOINT: &str = "sqlv.endpoint";

    /// Tracer name when no service name is configured
    pub const SYSTEM_NAME: &str = "sqlv";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_constants() {
        assert_eq!(attributes::HTTP_REQUEST_METHOD, "http.request.method");
        assert_eq!(attributes::SQLV_ENDPOINT, "sqlv.endpoint");
        assert_eq!(attributes::SYSTEM_NAME, "sqlv");
    }
}
