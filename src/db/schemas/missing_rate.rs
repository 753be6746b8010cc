//! Missing-rate diagnostic schema
//!
//! Records carrier/product/level combinations absent from the rate book so
//! a human can correct the table. Best-effort and idempotent per
//! carrier+type; commission math proceeds with the fail-open default rate.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for missing-rate diagnostics
pub const MISSING_RATE_COLLECTION: &str = "missing_rates";

/// Missing-rate diagnostic document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MissingRateDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Dedup key, "{carrier}-{policy_type}"
    pub key: String,

    /// Carrier as seen on the policy (trimmed)
    pub carrier: String,

    /// Policy type as seen on the policy (trimmed)
    pub policy_type: String,

    /// Level that failed to resolve, if one was available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl MissingRateDoc {
    /// Create a diagnostic for a carrier/type/level miss
    pub fn new(carrier: String, policy_type: String, level: Option<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            key: format!("{}-{}", carrier, policy_type),
            carrier,
            policy_type,
            level,
        }
    }
}

impl IntoIndexes for MissingRateDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "key": 1 },
            Some(
                IndexOptions::builder()
                    .name("missing_rate_key_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for MissingRateDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
