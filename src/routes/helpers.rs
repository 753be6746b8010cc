//! Shared helpers for route handlers

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::BinderyError;

/// Serialize a body into a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(&body)
        .unwrap_or_else(|_| r#"{"error":"Serialization failed"}"#.to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// JSON error response with a message
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response<Full<Bytes>> {
    json_response(status, serde_json::json!({ "error": message.into() }))
}

/// Map a service error onto an HTTP response
pub fn service_error_response(err: BinderyError) -> Response<Full<Bytes>> {
    let status = match &err {
        BinderyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        BinderyError::NotFound(_) => StatusCode::NOT_FOUND,
        BinderyError::Conflict(_) => StatusCode::CONFLICT,
        BinderyError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

/// Read and deserialize a JSON request body
pub async fn read_json_body<T: DeserializeOwned>(
    req: Request<Incoming>,
) -> Result<T, Response<Full<Bytes>>> {
    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("Failed to read request body: {}", e),
            ));
        }
    };

    serde_json::from_slice(&body)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", e)))
}

/// Pull a single query parameter out of a raw query string
///
/// Values in this API are dates, uids, and policy numbers, so no
/// percent-decoding is applied.
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        if parts.next() == Some(name) {
            let value = parts.next().unwrap_or("").trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param() {
        let q = Some("start=2025-01-01&end=2025-01-31&agent=a1");
        assert_eq!(query_param(q, "start"), Some("2025-01-01".to_string()));
        assert_eq!(query_param(q, "end"), Some("2025-01-31".to_string()));
        assert_eq!(query_param(q, "agent"), Some("a1".to_string()));
        assert_eq!(query_param(q, "missing"), None);
        assert_eq!(query_param(None, "start"), None);
        assert_eq!(query_param(Some("start="), "start"), None);
    }
}
