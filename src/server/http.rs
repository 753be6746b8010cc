//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Requests are routed
//! by a `(method, path)` match; each route group declares the permission
//! level it needs and the API-key gate runs before any handler.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::attribution::AttributionForwarder;
use crate::auth::{extract_api_key, ApiKeyValidator, PermissionLevel};
use crate::commission::RateBook;
use crate::config::Args;
use crate::db::{CrmStore, MongoClient};
use crate::routes;
use crate::routes::helpers::error_response;
use crate::types::BinderyError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: Option<MongoClient>,
    /// Typed CRM collections; absent only in dev mode without MongoDB
    pub store: Option<CrmStore>,
    /// Static commission rate table, loaded at startup
    pub rate_book: RateBook,
    /// API-key gate
    pub api_keys: ApiKeyValidator,
    /// Attribution webhook forwarder
    pub attribution: AttributionForwarder,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Create application state
    ///
    /// `mongo: None` is only valid in dev mode; production startup fails
    /// before reaching this point if MongoDB is unreachable.
    pub async fn new(
        args: Args,
        mongo: Option<MongoClient>,
        rate_book: RateBook,
    ) -> Result<Self, BinderyError> {
        let store = match &mongo {
            Some(client) => Some(CrmStore::new(client).await?),
            None => None,
        };
        let api_keys = ApiKeyValidator::from_args(&args);
        let attribution = AttributionForwarder::new(args.attribution_url.clone());

        Ok(Self {
            args,
            mongo,
            store,
            rate_book,
            api_keys,
            attribution,
            started_at: Instant::now(),
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), BinderyError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Bindery listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - authentication disabled");
    }
    if state.attribution.enabled() {
        info!("Attribution side-channel enabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Permission level a route requires
///
/// Reports and roster mutation are admin surfaces; the rest of the API
/// needs an authenticated key; probes are public.
fn required_permission(method: &Method, path: &str) -> PermissionLevel {
    match (method, path) {
        (_, "/health") | (_, "/healthz") | (_, "/ready") | (_, "/readyz") | (_, "/version") => {
            PermissionLevel::Public
        }
        (_, p) if p.starts_with("/api/reports/") => PermissionLevel::Admin,
        (&Method::POST, "/api/agents") => PermissionLevel::Admin,
        (&Method::POST, p) if p.starts_with("/api/agents/") && p.ends_with("/levels") => {
            PermissionLevel::Admin
        }
        _ => PermissionLevel::Authenticated,
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());

    debug!(%method, %path, %addr, "Request received");

    // API-key gate before any handler runs
    let required = required_permission(&method, &path);
    let granted = state.api_keys.level_for(extract_api_key(&req).as_deref());
    if granted < required {
        warn!(%method, %path, %granted, %required, "Request rejected by API-key gate");
        return Ok(error_response(
            StatusCode::UNAUTHORIZED,
            format!("{} access required", required),
        ));
    }

    let response = match (method, path.as_str()) {
        // Health checks
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::readiness_check(Arc::clone(&state))
        }
        (Method::GET, "/version") => routes::version_info(),

        // Agent roster
        (Method::GET, "/api/agents") => routes::handle_list_agents(Arc::clone(&state)).await,
        (Method::POST, "/api/agents") => {
            routes::handle_create_agent(req, Arc::clone(&state)).await
        }
        (Method::GET, p) if p.starts_with("/api/agents/") && p.ends_with("/levels") => {
            let uid = p
                .trim_start_matches("/api/agents/")
                .trim_end_matches("/levels");
            routes::handle_agent_levels(Arc::clone(&state), uid).await
        }
        (Method::POST, p) if p.starts_with("/api/agents/") && p.ends_with("/levels") => {
            let uid = p
                .trim_start_matches("/api/agents/")
                .trim_end_matches("/levels")
                .to_string();
            routes::handle_append_level(req, Arc::clone(&state), &uid).await
        }
        (Method::GET, p) if p.starts_with("/api/agents/") => {
            let uid = p.trim_start_matches("/api/agents/");
            routes::handle_get_agent(Arc::clone(&state), uid).await
        }

        // Policies
        (Method::GET, "/api/policies") => {
            routes::handle_list_policies(Arc::clone(&state), query.as_deref()).await
        }
        (Method::POST, "/api/policies") => {
            routes::handle_create_policy(req, Arc::clone(&state)).await
        }
        (Method::POST, p) if p.starts_with("/api/policies/") && p.ends_with("/status") => {
            let number = p
                .trim_start_matches("/api/policies/")
                .trim_end_matches("/status")
                .to_string();
            routes::handle_update_status(req, Arc::clone(&state), &number).await
        }
        (Method::GET, p) if p.starts_with("/api/policies/") => {
            let number = p.trim_start_matches("/api/policies/");
            routes::handle_get_policy(Arc::clone(&state), number).await
        }

        // Reports
        (Method::GET, "/api/reports/commissions") => {
            routes::handle_commissions_report(Arc::clone(&state), query.as_deref()).await
        }
        (Method::GET, "/api/reports/missing-rates") => {
            routes::handle_missing_rates(Arc::clone(&state)).await
        }

        (_, p) => error_response(StatusCode::NOT_FOUND, format!("No route for {}", p)),
    };

    Ok(response)
}
