//! HTTP routes for Bindery

pub mod agents;
pub mod health;
pub mod helpers;
pub mod policies;
pub mod reports;

pub use agents::{
    handle_agent_levels, handle_append_level, handle_create_agent, handle_get_agent,
    handle_list_agents,
};
pub use health::{health_check, readiness_check, version_info};
pub use policies::{
    handle_create_policy, handle_get_policy, handle_list_policies, handle_update_status,
};
pub use reports::{handle_commissions_report, handle_missing_rates};
