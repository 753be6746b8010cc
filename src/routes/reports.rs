//! Reporting endpoints
//!
//! ## Endpoints
//!
//! - `GET /api/reports/commissions?start=YYYY-MM-DD&end=YYYY-MM-DD` —
//!   date-ranged commission rollup, descending by amount
//! - `GET /api/reports/missing-rates` — recorded rate-book gaps
//!
//! The commissions report loads the roster and the policies in range,
//! then runs the rollup synchronously. Rate-book gaps hit during the run
//! are persisted before the response is returned.

use bytes::Bytes;
use chrono::NaiveDate;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::commission::{aggregate_commissions, CommissionRow};
use crate::db::CrmStore;
use crate::routes::helpers::{
    error_response, json_response, query_param, service_error_response,
};
use crate::server::AppState;

/// Response for GET /api/reports/commissions
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionsResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub policies_included: usize,
    pub policies_excluded: usize,
    /// Per-agent totals, descending by amount
    pub totals: Vec<CommissionRow>,
}

fn store_or_unavailable(state: &AppState) -> Result<&CrmStore, Response<Full<Bytes>>> {
    state.store.as_ref().ok_or_else(|| {
        error_response(StatusCode::SERVICE_UNAVAILABLE, "Storage not available")
    })
}

fn parse_date(query: Option<&str>, name: &str) -> Result<NaiveDate, Response<Full<Bytes>>> {
    let raw = query_param(query, name).ok_or_else(|| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Missing required query parameter: {}", name),
        )
    })?;

    raw.parse().map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid date for '{}': expected YYYY-MM-DD, got '{}'", name, raw),
        )
    })
}

/// Handle GET /api/reports/commissions
pub async fn handle_commissions_report(
    state: Arc<AppState>,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let store = match store_or_unavailable(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let start = match parse_date(query, "start") {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let end = match parse_date(query, "end") {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    if start > end {
        return error_response(StatusCode::BAD_REQUEST, "start must be on or before end");
    }

    let roster = match store.load_roster().await {
        Ok(r) => r,
        Err(e) => return service_error_response(e),
    };
    let policies = match store.policies_in_range(start, end).await {
        Ok(p) => p,
        Err(e) => return service_error_response(e),
    };

    let report = aggregate_commissions(
        &roster,
        &state.rate_book,
        &policies,
        start,
        end,
        state.args.max_override_tiers,
    );
    store.record_missing_rates(&report.missing_rates).await;

    info!(
        start = %start,
        end = %end,
        agents = report.rows.len(),
        included = report.policies_included,
        excluded = report.policies_excluded,
        "Commissions report generated"
    );

    json_response(
        StatusCode::OK,
        CommissionsResponse {
            start,
            end,
            policies_included: report.policies_included,
            policies_excluded: report.policies_excluded,
            totals: report.rows,
        },
    )
}

/// One missing-rate diagnostic as returned by the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingRateView {
    pub carrier: String,
    pub policy_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// Response for GET /api/reports/missing-rates
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingRatesResponse {
    pub total: usize,
    pub missing_rates: Vec<MissingRateView>,
}

/// Handle GET /api/reports/missing-rates
pub async fn handle_missing_rates(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let store = match store_or_unavailable(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.list_missing_rates().await {
        Ok(records) => json_response(
            StatusCode::OK,
            MissingRatesResponse {
                total: records.len(),
                missing_rates: records
                    .into_iter()
                    .map(|r| MissingRateView {
                        carrier: r.carrier,
                        policy_type: r.policy_type,
                        level: r.level,
                    })
                    .collect(),
            },
        ),
        Err(e) => service_error_response(e),
    }
}
