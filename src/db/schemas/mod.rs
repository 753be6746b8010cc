//! Database schemas for Bindery
//!
//! Defines MongoDB document structures for agents, level history,
//! policies, and missing-rate diagnostics.

mod agent;
mod level_history;
mod metadata;
mod missing_rate;
mod policy;

pub use agent::{AgentDoc, AgentRole, AGENT_COLLECTION};
pub use level_history::{LevelHistoryDoc, LEVEL_HISTORY_COLLECTION};
pub use metadata::Metadata;
pub use missing_rate::{MissingRateDoc, MISSING_RATE_COLLECTION};
pub use policy::{PolicyDoc, PolicyStatus, POLICY_COLLECTION};
