//! Bindery - CRM API for insurance agencies
//!
//! Bindery backs an agency CRM with a JSON REST API over MongoDB:
//!
//! ## Services
//!
//! - **Roster**: agents with upline links and dated commission-level history
//! - **Policies**: creation with validation, listing, status updates
//! - **Commission engine**: override-walk rollup (agent plus up to two
//!   upline tiers) with fail-open rate defaulting and missing-rate
//!   diagnostics
//! - **Reports**: date-ranged commission totals per agent
//! - **Attribution**: house commission share forwarded to ad-attribution
//!   integrations at policy creation

pub mod attribution;
pub mod auth;
pub mod commission;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{BinderyError, Result};
