//! Level history document schema
//!
//! Time-versioned commission levels per agent. The level effective for a
//! policy is the latest entry whose effective date is on or before the
//! policy's effective date; the agent's static level is the fallback.

use bson::{doc, oid::ObjectId, Document};
use chrono::NaiveDate;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for agent level history
pub const LEVEL_HISTORY_COLLECTION: &str = "agent_levels";

/// A dated commission-level change for one agent
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LevelHistoryDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// uid of the agent this entry belongs to
    pub agent_uid: String,

    /// Date this level takes effect
    pub effective_date: NaiveDate,

    /// Commission level tier code
    pub level: String,
}

impl LevelHistoryDoc {
    /// Create a new level history entry
    pub fn new(agent_uid: String, effective_date: NaiveDate, level: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            agent_uid,
            effective_date,
            level,
        }
    }
}

impl Default for LevelHistoryDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            agent_uid: String::new(),
            effective_date: NaiveDate::default(),
            level: String::new(),
        }
    }
}

impl IntoIndexes for LevelHistoryDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Compound index for "latest entry <= date" per agent
            (
                doc! { "agent_uid": 1, "effective_date": 1 },
                Some(
                    IndexOptions::builder()
                        .name("agent_effective_date_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for LevelHistoryDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
