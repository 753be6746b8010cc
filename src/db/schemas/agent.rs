//! Agent document schema
//!
//! One document per agent in the roster. Upline links (`upline_uid`) form
//! a forest; commission overrides walk at most two tiers up regardless of
//! actual chain depth.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for agents
pub const AGENT_COLLECTION: &str = "agents";

/// Role of an agent within the agency
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    #[default]
    Agent,
    Admin,
    Owner,
}

/// Agent document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AgentDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Stable agent identifier
    pub uid: String,

    /// Display name
    pub name: String,

    /// Contact email
    pub email: String,

    /// Static commission level, used when no dated history entry applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// uid of the upline (recruiting/sponsoring) agent, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upline_uid: Option<String>,

    /// Agency this agent belongs to
    pub agency: String,

    /// Role within the agency
    #[serde(default)]
    pub role: AgentRole,
}

impl AgentDoc {
    /// Create a new agent document
    pub fn new(uid: String, name: String, email: String, agency: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            uid,
            name,
            email,
            level: None,
            upline_uid: None,
            agency,
            role: AgentRole::Agent,
        }
    }
}

impl IntoIndexes for AgentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on uid
            (
                doc! { "uid": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("uid_unique".to_string())
                        .build(),
                ),
            ),
            // Index on upline_uid for downline queries
            (
                doc! { "upline_uid": 1 },
                Some(
                    IndexOptions::builder()
                        .name("upline_uid_index".to_string())
                        .build(),
                ),
            ),
            // Index on agency for per-agency listings
            (
                doc! { "agency": 1 },
                Some(
                    IndexOptions::builder()
                        .name("agency_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for AgentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
