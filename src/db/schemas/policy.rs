//! Policy document schema
//!
//! Sold policies as received from the upstream CRM flow. Premiums arrive
//! as numeric strings; commission math annualizes them (monthly x 12).

use bson::{doc, oid::ObjectId, Document};
use chrono::NaiveDate;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for policies
pub const POLICY_COLLECTION: &str = "policies";

/// Lifecycle status of a policy
///
/// Parsed case-insensitively; upstream data is not consistent about
/// casing ("Cancelled" vs "cancelled"). Unknown values are preserved
/// verbatim so a new upstream status never drops documents on read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyStatus {
    Active,
    Pending,
    Lapsed,
    Cancelled,
    InsufficientFunds,
    Other(String),
}

impl Default for PolicyStatus {
    fn default() -> Self {
        PolicyStatus::Pending
    }
}

impl PolicyStatus {
    /// Parse a status string; never fails, unknown values become `Other`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "active" => PolicyStatus::Active,
            "pending" => PolicyStatus::Pending,
            "lapsed" => PolicyStatus::Lapsed,
            "cancelled" | "canceled" => PolicyStatus::Cancelled,
            "insufficient funds" => PolicyStatus::InsufficientFunds,
            _ => PolicyStatus::Other(s.trim().to_string()),
        }
    }

    /// Cancelled and Lapsed policies are excluded from commission reports
    pub fn excluded_from_reports(&self) -> bool {
        matches!(self, PolicyStatus::Cancelled | PolicyStatus::Lapsed)
    }
}

impl FromStr for PolicyStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PolicyStatus::parse(s))
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyStatus::Active => write!(f, "Active"),
            PolicyStatus::Pending => write!(f, "Pending"),
            PolicyStatus::Lapsed => write!(f, "Lapsed"),
            PolicyStatus::Cancelled => write!(f, "Cancelled"),
            PolicyStatus::InsufficientFunds => write!(f, "Insufficient Funds"),
            PolicyStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for PolicyStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PolicyStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(PolicyStatus::parse(&raw))
    }
}

/// Policy document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PolicyDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Carrier-assigned policy number, unique across the book
    pub policy_number: String,

    /// Carrier name, matched against the rate book after trimming
    pub carrier: String,

    /// Product/policy type, matched against the rate book after trimming
    pub policy_type: String,

    /// Monthly premium as a numeric string (upstream data shape)
    pub monthly_premium: String,

    /// Lifecycle status
    #[serde(default)]
    pub status: PolicyStatus,

    /// Date the policy takes effect
    pub effective_date: NaiveDate,

    /// Selling agent uid(s); exactly two when split_policy is set
    pub agent_ids: Vec<String>,

    /// 50/50 split between exactly two agents
    #[serde(default)]
    pub split_policy: bool,

    /// Lead source attribution string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Default for PolicyDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            policy_number: String::new(),
            carrier: String::new(),
            policy_type: String::new(),
            monthly_premium: String::new(),
            status: PolicyStatus::default(),
            effective_date: NaiveDate::default(),
            agent_ids: Vec::new(),
            split_policy: false,
            source: None,
        }
    }
}

impl IntoIndexes for PolicyDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on policy number
            (
                doc! { "policy_number": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("policy_number_unique".to_string())
                        .build(),
                ),
            ),
            // Index on effective_date for report range queries
            (
                doc! { "effective_date": 1 },
                Some(
                    IndexOptions::builder()
                        .name("effective_date_index".to_string())
                        .build(),
                ),
            ),
            // Index on agent_ids for per-agent listings
            (
                doc! { "agent_ids": 1 },
                Some(
                    IndexOptions::builder()
                        .name("agent_ids_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PolicyDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_case_insensitively() {
        assert_eq!(
            "cancelled".parse::<PolicyStatus>().unwrap(),
            PolicyStatus::Cancelled
        );
        assert_eq!(
            "LAPSED".parse::<PolicyStatus>().unwrap(),
            PolicyStatus::Lapsed
        );
        assert_eq!(
            "Insufficient Funds".parse::<PolicyStatus>().unwrap(),
            PolicyStatus::InsufficientFunds
        );
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let status: PolicyStatus = "Under Review".parse().unwrap();
        assert_eq!(status, PolicyStatus::Other("Under Review".to_string()));
        assert_eq!(status.to_string(), "Under Review");
        assert!(!status.excluded_from_reports());
    }

    #[test]
    fn test_report_exclusion() {
        assert!(PolicyStatus::Cancelled.excluded_from_reports());
        assert!(PolicyStatus::Lapsed.excluded_from_reports());
        assert!(!PolicyStatus::Active.excluded_from_reports());
        assert!(!PolicyStatus::Pending.excluded_from_reports());
        assert!(!PolicyStatus::InsufficientFunds.excluded_from_reports());
    }
}
