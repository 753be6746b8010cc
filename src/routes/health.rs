//! Health check endpoints
//!
//! Kubernetes-style probes:
//! - /health, /healthz - liveness (is the service running?)
//! - /ready, /readyz - readiness (can it serve traffic?)
//!
//! Liveness returns 200 whenever the process is up. Readiness requires a
//! connected MongoDB, unless dev mode is enabled (the service can answer
//! engine-only requests against an empty roster in dev).

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::helpers::json_response;
use crate::server::AppState;

/// Health response body
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if service is running)
    pub healthy: bool,
    /// 'online' when storage is reachable, 'degraded' otherwise
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
    /// Seconds since process start
    pub uptime: u64,
    /// Current timestamp
    pub timestamp: String,
    /// Operating mode
    pub mode: String,
    /// Node identifier
    pub node_id: String,
    /// Storage connection status
    pub storage: StorageHealth,
    /// Rate book status
    pub rate_book: RateBookHealth,
}

/// Storage connection details
#[derive(Serialize)]
pub struct StorageHealth {
    pub connected: bool,
}

/// Rate book details
#[derive(Serialize)]
pub struct RateBookHealth {
    pub carriers: usize,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let storage_connected = state.store.is_some();

    let status = if storage_connected || state.args.dev_mode {
        "online"
    } else {
        "degraded"
    };

    HealthResponse {
        healthy: true,
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        node_id: state.args.node_id.to_string(),
        storage: StorageHealth {
            connected: storage_connected,
        },
        rate_book: RateBookHealth {
            carriers: state.rate_book.carrier_count(),
        },
    }
}

/// Handle liveness probe (/health, /healthz)
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state);
    json_response(StatusCode::OK, response)
}

/// Handle readiness probe (/ready, /readyz)
///
/// Use this for load balancer checks: reports and policy writes need
/// MongoDB, so an instance without storage is not ready in production.
pub fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state);
    let is_ready = response.storage.connected || state.args.dev_mode;

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    json_response(status, response)
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    /// Cargo package version
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    /// Git commit hash (full)
    pub commit_full: &'static str,
    /// Build timestamp
    pub build_time: &'static str,
    /// Service name
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "bindery",
    };

    json_response(StatusCode::OK, response)
}
