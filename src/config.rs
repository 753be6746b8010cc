//! Configuration for Bindery
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

use crate::commission::DEFAULT_MAX_OVERRIDE_TIERS;

/// Bindery - CRM API for insurance agencies
#[derive(Parser, Debug, Clone)]
#[command(name = "bindery")]
#[command(about = "HTTP API for agent roster, policies, and commission rollups")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "bindery")]
    pub mongodb_db: String,

    /// Path to the rate book JSON file (carrier -> policy type -> level -> percentage)
    #[arg(long, env = "RATE_BOOK_PATH", default_value = "rate_book.json")]
    pub rate_book: PathBuf,

    /// Agent uid of the house/owner account whose commission share is
    /// forwarded to the attribution side-channel at policy creation
    #[arg(long, env = "HOUSE_AGENT_UID")]
    pub house_agent_uid: Option<String>,

    /// Webhook URL receiving the house commission amount for each created
    /// policy (ad attribution / CRM sync). Disabled when unset.
    #[arg(long, env = "ATTRIBUTION_URL")]
    pub attribution_url: Option<String>,

    /// How many upline tiers above the selling agent receive an override
    #[arg(long, env = "MAX_OVERRIDE_TIERS", default_value_t = DEFAULT_MAX_OVERRIDE_TIERS)]
    pub max_override_tiers: usize,

    /// Enable development mode (disables auth, MongoDB optional)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// API key for authenticated access (roster and policy endpoints)
    #[arg(long, env = "API_KEY_AUTHENTICATED")]
    pub api_key_authenticated: Option<String>,

    /// API key for admin access (reports, roster mutation)
    #[arg(long, env = "API_KEY_ADMIN")]
    pub api_key_admin: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.api_key_admin.is_none() {
                return Err("API_KEY_ADMIN is required in production mode".to_string());
            }
            if self.api_key_authenticated.is_none() {
                return Err("API_KEY_AUTHENTICATED is required in production mode".to_string());
            }
        }

        if self.attribution_url.is_some() && self.house_agent_uid.is_none() {
            return Err(
                "ATTRIBUTION_URL requires HOUSE_AGENT_UID so the house share can be computed"
                    .to_string(),
            );
        }

        Ok(())
    }
}
