//! Uniform response envelope handling.

use anyhow::anyhow;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlv_core::{Error, Result};

/// Decode a backend response body.
///
/// A JSON body carrying a non-null `error` field is a server-reported failure
/// whatever the HTTP status. Non-JSON bodies, other non-success statuses and
/// payloads that do not match `T` are transport failures.
pub fn decode_envelope<T: DeserializeOwned>(
    endpoint: &str,
    status: StatusCode,
    body: &[u8],
) -> Result<T> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        Error::transport(
            endpoint,
            anyhow!("non-JSON response (status {}): {}", status.as_u16(), e),
        )
    })?;

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        let message = match error.as_str() {
            Some(text) => text.to_string(),
            None => error.to_string(),
        };
        return Err(Error::server(message));
    }

    if !status.is_success() {
        return Err(Error::transport(
            endpoint,
            anyhow!("unexpected status {}", status.as_u16()),
        ));
    }

    serde_json::from_value(value).map_err(|e| Error::transport(endpoint, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlv_core::GeneratedSql;

    #[test]
    fn test_error_field_wins_over_status() {
        let result: Result<GeneratedSql> = decode_envelope(
            "/generate_sql",
            StatusCode::OK,
            br#"{"error": "Failed to generate SQL"}"#,
        );

        match result {
            Err(Error::Server(msg)) => assert_eq!(msg, "Failed to generate SQL"),
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_on_bad_request_status() {
        let result: Result<GeneratedSql> = decode_envelope(
            "/generate_sql",
            StatusCode::BAD_REQUEST,
            br#"{"error": "Prompt is required"}"#,
        );
        assert!(matches!(result, Err(Error::Server(ref m)) if m == "Prompt is required"));
    }

    #[test]
    fn test_null_error_is_ignored() {
        let result: GeneratedSql = decode_envelope(
            "/generate_sql",
            StatusCode::OK,
            br#"{"error": null, "query": "SELECT 1"}"#,
        )
        .unwrap();
        assert_eq!(result.query, "SELECT 1");
    }

    #[test]
    fn test_non_json_is_transport() {
        let result: Result<GeneratedSql> = decode_envelope(
            "/generate_sql",
            StatusCode::INTERNAL_SERVER_ERROR,
            b"<html>Internal Server Error</html>",
        );
        assert!(result.unwrap_err().is_transport());
    }

    #[test]
    fn test_shape_mismatch_is_transport() {
        let result: Result<GeneratedSql> =
            decode_envelope("/generate_sql", StatusCode::OK, br#"{"success": true}"#);
        assert!(result.unwrap_err().is_transport());
    }
}
