//! Agent roster endpoints
//!
//! ## Endpoints
//!
//! - `GET /api/agents` — list the roster
//! - `POST /api/agents` — create an agent
//! - `GET /api/agents/{uid}` — fetch one agent
//! - `GET /api/agents/{uid}/levels` — level history, ascending
//! - `POST /api/agents/{uid}/levels` — append a dated level change

use bytes::Bytes;
use chrono::NaiveDate;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::schemas::{AgentDoc, AgentRole, LevelHistoryDoc};
use crate::db::CrmStore;
use crate::routes::helpers::{
    error_response, json_response, read_json_body, service_error_response,
};
use crate::server::AppState;

/// Agent as returned by the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    pub uid: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upline_uid: Option<String>,
    pub agency: String,
    pub role: AgentRole,
}

impl From<AgentDoc> for AgentView {
    fn from(doc: AgentDoc) -> Self {
        Self {
            uid: doc.uid,
            name: doc.name,
            email: doc.email,
            level: doc.level,
            upline_uid: doc.upline_uid,
            agency: doc.agency,
            role: doc.role,
        }
    }
}

/// Response for GET /api/agents
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsResponse {
    pub total: usize,
    pub agents: Vec<AgentView>,
}

fn store_or_unavailable(state: &AppState) -> Result<&CrmStore, Response<Full<Bytes>>> {
    state.store.as_ref().ok_or_else(|| {
        error_response(StatusCode::SERVICE_UNAVAILABLE, "Storage not available")
    })
}

/// Handle GET /api/agents
pub async fn handle_list_agents(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let store = match store_or_unavailable(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.list_agents().await {
        Ok(agents) => json_response(
            StatusCode::OK,
            AgentsResponse {
                total: agents.len(),
                agents: agents.into_iter().map(AgentView::from).collect(),
            },
        ),
        Err(e) => service_error_response(e),
    }
}

/// Request body for POST /api/agents
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRequest {
    /// Generated when absent
    #[serde(default)]
    pub uid: Option<String>,
    pub name: String,
    pub email: String,
    pub agency: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub upline_uid: Option<String>,
    #[serde(default)]
    pub role: Option<AgentRole>,
}

/// Handle POST /api/agents
pub async fn handle_create_agent(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let store = match store_or_unavailable(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let request: CreateAgentRequest = match read_json_body(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    for (field, value) in [
        ("name", &request.name),
        ("email", &request.email),
        ("agency", &request.agency),
    ] {
        if value.trim().is_empty() {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Missing required field: {}", field),
            );
        }
    }

    // An unknown upline is allowed (it may be imported later) but is worth
    // flagging since override walks will abandon that branch.
    if let Some(ref upline_uid) = request.upline_uid {
        match store.find_agent(upline_uid).await {
            Ok(None) => warn!(upline = %upline_uid, "Creating agent with unknown upline"),
            Ok(Some(_)) => {}
            Err(e) => return service_error_response(e),
        }
    }

    let mut agent = AgentDoc::new(
        request
            .uid
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        request.name.trim().to_string(),
        request.email.trim().to_string(),
        request.agency.trim().to_string(),
    );
    agent.level = request.level;
    agent.upline_uid = request.upline_uid;
    agent.role = request.role.unwrap_or_default();

    match store.insert_agent(agent).await {
        Ok(created) => {
            info!(uid = %created.uid, "Agent created");
            json_response(StatusCode::CREATED, AgentView::from(created))
        }
        Err(e) => service_error_response(e),
    }
}

/// Handle GET /api/agents/{uid}
pub async fn handle_get_agent(state: Arc<AppState>, uid: &str) -> Response<Full<Bytes>> {
    let store = match store_or_unavailable(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.find_agent(uid).await {
        Ok(Some(agent)) => json_response(StatusCode::OK, AgentView::from(agent)),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("Agent '{}' not found", uid)),
        Err(e) => service_error_response(e),
    }
}

/// One level history entry as returned by the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelEntryView {
    pub effective_date: NaiveDate,
    pub level: String,
}

/// Response for GET /api/agents/{uid}/levels
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelHistoryResponse {
    pub agent_uid: String,
    pub entries: Vec<LevelEntryView>,
}

/// Handle GET /api/agents/{uid}/levels
pub async fn handle_agent_levels(state: Arc<AppState>, uid: &str) -> Response<Full<Bytes>> {
    let store = match store_or_unavailable(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.find_agent(uid).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, format!("Agent '{}' not found", uid))
        }
        Err(e) => return service_error_response(e),
    }

    match store.level_history_for(uid).await {
        Ok(entries) => json_response(
            StatusCode::OK,
            LevelHistoryResponse {
                agent_uid: uid.to_string(),
                entries: entries
                    .into_iter()
                    .map(|e| LevelEntryView {
                        effective_date: e.effective_date,
                        level: e.level,
                    })
                    .collect(),
            },
        ),
        Err(e) => service_error_response(e),
    }
}

/// Request body for POST /api/agents/{uid}/levels
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendLevelRequest {
    pub effective_date: NaiveDate,
    pub level: String,
}

/// Handle POST /api/agents/{uid}/levels
pub async fn handle_append_level(
    req: Request<Incoming>,
    state: Arc<AppState>,
    uid: &str,
) -> Response<Full<Bytes>> {
    let store = match store_or_unavailable(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let request: AppendLevelRequest = match read_json_body(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    if request.level.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing required field: level");
    }

    match store.find_agent(uid).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, format!("Agent '{}' not found", uid))
        }
        Err(e) => return service_error_response(e),
    }

    let entry = LevelHistoryDoc::new(
        uid.to_string(),
        request.effective_date,
        request.level.trim().to_string(),
    );

    match store.append_level(entry).await {
        Ok(created) => {
            info!(
                agent = %uid,
                level = %created.level,
                effective = %created.effective_date,
                "Level history entry added"
            );
            json_response(
                StatusCode::CREATED,
                LevelEntryView {
                    effective_date: created.effective_date,
                    level: created.level,
                },
            )
        }
        Err(e) => service_error_response(e),
    }
}
