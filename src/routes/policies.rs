//! Policy endpoints
//!
//! ## Endpoints
//!
//! - `GET /api/policies` — list, optional `agent=` filter
//! - `POST /api/policies` — create; triggers the attribution side-channel
//! - `GET /api/policies/{number}` — fetch one policy
//! - `POST /api/policies/{number}/status` — patch lifecycle status
//!
//! Policy creation validates required fields up front and rejects with
//! 400 before any commission computation happens. When a house agent is
//! configured, the created policy's house commission share is computed
//! with the same override walk the report uses and forwarded to the
//! attribution webhook without blocking the response.

use bytes::Bytes;
use chrono::NaiveDate;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::attribution::AttributionEvent;
use crate::commission::{house_commission, parse_monthly_premium, RateResolver};
use crate::db::schemas::{PolicyDoc, PolicyStatus};
use crate::db::CrmStore;
use crate::routes::helpers::{
    error_response, json_response, query_param, read_json_body, service_error_response,
};
use crate::server::AppState;

/// Policy as returned by the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyView {
    pub policy_number: String,
    pub carrier: String,
    pub policy_type: String,
    pub monthly_premium: String,
    pub status: String,
    pub effective_date: NaiveDate,
    pub agent_ids: Vec<String>,
    pub split_policy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl From<PolicyDoc> for PolicyView {
    fn from(doc: PolicyDoc) -> Self {
        Self {
            policy_number: doc.policy_number,
            carrier: doc.carrier,
            policy_type: doc.policy_type,
            monthly_premium: doc.monthly_premium,
            status: doc.status.to_string(),
            effective_date: doc.effective_date,
            agent_ids: doc.agent_ids,
            split_policy: doc.split_policy,
            source: doc.source,
        }
    }
}

/// Response for GET /api/policies
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoliciesResponse {
    pub total: usize,
    pub policies: Vec<PolicyView>,
}

fn store_or_unavailable(state: &AppState) -> Result<&CrmStore, Response<Full<Bytes>>> {
    state.store.as_ref().ok_or_else(|| {
        error_response(StatusCode::SERVICE_UNAVAILABLE, "Storage not available")
    })
}

/// Handle GET /api/policies
pub async fn handle_list_policies(
    state: Arc<AppState>,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let store = match store_or_unavailable(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let agent = query_param(query, "agent");
    match store.list_policies(agent.as_deref()).await {
        Ok(policies) => json_response(
            StatusCode::OK,
            PoliciesResponse {
                total: policies.len(),
                policies: policies.into_iter().map(PolicyView::from).collect(),
            },
        ),
        Err(e) => service_error_response(e),
    }
}

/// Handle GET /api/policies/{number}
pub async fn handle_get_policy(state: Arc<AppState>, number: &str) -> Response<Full<Bytes>> {
    let store = match store_or_unavailable(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.find_policy(number).await {
        Ok(Some(policy)) => json_response(StatusCode::OK, PolicyView::from(policy)),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Policy '{}' not found", number),
        ),
        Err(e) => service_error_response(e),
    }
}

/// Request body for POST /api/policies
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePolicyRequest {
    pub policy_number: String,
    pub carrier: String,
    pub policy_type: String,
    pub monthly_premium: String,
    #[serde(default)]
    pub status: Option<String>,
    pub effective_date: NaiveDate,
    pub agent_ids: Vec<String>,
    #[serde(default)]
    pub split_policy: bool,
    #[serde(default)]
    pub source: Option<String>,
}

impl CreatePolicyRequest {
    /// Field validation; runs before any storage or commission work
    fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("policyNumber", &self.policy_number),
            ("carrier", &self.carrier),
            ("policyType", &self.policy_type),
        ] {
            if value.trim().is_empty() {
                return Err(format!("Missing required field: {}", field));
            }
        }

        if parse_monthly_premium(&self.monthly_premium).is_none() {
            return Err(format!(
                "monthlyPremium '{}' is not a number",
                self.monthly_premium
            ));
        }

        if self.agent_ids.is_empty() || self.agent_ids.iter().any(|a| a.trim().is_empty()) {
            return Err("agentIds must contain at least one agent uid".to_string());
        }
        if self.split_policy && self.agent_ids.len() != 2 {
            return Err("Split policies require exactly two agentIds".to_string());
        }
        if !self.split_policy && self.agent_ids.len() != 1 {
            return Err("Non-split policies require exactly one agentId".to_string());
        }

        Ok(())
    }
}

/// Response for POST /api/policies
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePolicyResponse {
    pub policy: PolicyView,
    /// House agent's share of the immediate commission, when configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house_commission: Option<f64>,
}

/// Handle POST /api/policies
pub async fn handle_create_policy(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let store = match store_or_unavailable(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let request: CreatePolicyRequest = match read_json_body(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    if let Err(message) = request.validate() {
        return error_response(StatusCode::BAD_REQUEST, message);
    }

    let policy = PolicyDoc {
        policy_number: request.policy_number.trim().to_string(),
        carrier: request.carrier.trim().to_string(),
        policy_type: request.policy_type.trim().to_string(),
        monthly_premium: request.monthly_premium.trim().to_string(),
        status: request
            .status
            .as_deref()
            .map(PolicyStatus::parse)
            .unwrap_or_default(),
        effective_date: request.effective_date,
        agent_ids: request
            .agent_ids
            .iter()
            .map(|a| a.trim().to_string())
            .collect(),
        split_policy: request.split_policy,
        source: request.source,
        ..PolicyDoc::default()
    };

    let created = match store.insert_policy(policy).await {
        Ok(p) => p,
        Err(e) => return service_error_response(e),
    };
    info!(policy = %created.policy_number, "Policy created");

    let house_share = compute_house_share(&state, store, &created).await;
    if let Some(amount) = house_share {
        state.attribution.spawn_forward(AttributionEvent {
            policy_number: created.policy_number.clone(),
            amount,
            source: created.source.clone(),
        });
    }

    json_response(
        StatusCode::CREATED,
        CreatePolicyResponse {
            policy: PolicyView::from(created),
            house_commission: house_share,
        },
    )
}

/// House agent's share of this policy's commission, for attribution
///
/// Failures here must not fail policy creation: the policy is already
/// stored, so a roster load error just drops the side-channel event.
async fn compute_house_share(
    state: &AppState,
    store: &CrmStore,
    policy: &PolicyDoc,
) -> Option<f64> {
    let house_uid = state.args.house_agent_uid.as_deref()?;

    let roster = match store.load_roster().await {
        Ok(r) => r,
        Err(e) => {
            warn!(
                policy = %policy.policy_number,
                error = %e,
                "Roster load failed, skipping attribution side-channel"
            );
            return None;
        }
    };

    let mut rates = RateResolver::new(&state.rate_book);
    let amount = house_commission(
        &roster,
        &mut rates,
        policy,
        house_uid,
        state.args.max_override_tiers,
    );
    store.record_missing_rates(&rates.into_misses()).await;

    Some(amount)
}

/// Request body for POST /api/policies/{number}/status
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Handle POST /api/policies/{number}/status
pub async fn handle_update_status(
    req: Request<Incoming>,
    state: Arc<AppState>,
    number: &str,
) -> Response<Full<Bytes>> {
    let store = match store_or_unavailable(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let request: UpdateStatusRequest = match read_json_body(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    if request.status.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing required field: status");
    }

    // Stored in canonical display form regardless of request casing
    let status = PolicyStatus::parse(&request.status);

    match store.update_policy_status(number, &status.to_string()).await {
        Ok(()) => {
            info!(policy = %number, status = %status, "Policy status updated");
            json_response(
                StatusCode::OK,
                serde_json::json!({
                    "policyNumber": number,
                    "status": status.to_string(),
                }),
            )
        }
        Err(e) => service_error_response(e),
    }
}
