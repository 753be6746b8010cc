//! Rate book loading and commission rate resolution
//!
//! The rate book is a static nested mapping supplied by the agency:
//! carrier -> policy type -> level -> contract percentage. Lookups trim
//! carrier and type. A miss records a diagnostic and fails open at 100%
//! so reports never block on rate-table gaps.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

use crate::types::BinderyError;

/// Rate substituted when a carrier/type/level combination is absent
pub const FALLBACK_RATE: f64 = 1.0;

/// Static commission rate table: carrier -> policy type -> level -> percentage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateBook {
    table: HashMap<String, HashMap<String, HashMap<String, f64>>>,
}

impl RateBook {
    /// Load the rate book from a JSON file
    pub fn from_path(path: &Path) -> Result<Self, BinderyError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BinderyError::RateBook(format!("failed to read {}: {}", path.display(), e))
        })?;
        let book: RateBook = serde_json::from_str(&raw).map_err(|e| {
            BinderyError::RateBook(format!("failed to parse {}: {}", path.display(), e))
        })?;

        info!(
            carriers = book.table.len(),
            "Rate book loaded from {}",
            path.display()
        );
        Ok(book)
    }

    /// Build a rate book from an in-memory table
    pub fn from_table(table: HashMap<String, HashMap<String, HashMap<String, f64>>>) -> Self {
        Self { table }
    }

    /// Look up the contract rate as a fraction (table percentage / 100)
    ///
    /// Carrier and policy type are trimmed before matching; levels are
    /// compared as exact strings.
    pub fn lookup(&self, carrier: &str, policy_type: &str, level: &str) -> Option<f64> {
        self.table
            .get(carrier.trim())
            .and_then(|products| products.get(policy_type.trim()))
            .and_then(|levels| levels.get(level))
            .map(|pct| pct / 100.0)
    }

    /// Number of carriers in the book
    pub fn carrier_count(&self) -> usize {
        self.table.len()
    }
}

/// A carrier/type/level combination that was absent from the rate book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingRate {
    pub carrier: String,
    pub policy_type: String,
    pub level: Option<String>,
}

impl MissingRate {
    /// Dedup key: one diagnostic per carrier+type per run
    pub fn key(&self) -> String {
        format!("{}-{}", self.carrier, self.policy_type)
    }
}

/// Per-run rate resolution with fail-open defaulting
///
/// Wraps the rate book for one rollup run, collecting missing-rate
/// diagnostics (at most one per carrier+type) as lookups fail.
pub struct RateResolver<'a> {
    book: &'a RateBook,
    misses: Vec<MissingRate>,
    seen: HashSet<String>,
}

impl<'a> RateResolver<'a> {
    pub fn new(book: &'a RateBook) -> Self {
        Self {
            book,
            misses: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Resolve the rate for a carrier/type/level, failing open on a miss
    ///
    /// `level: None` means the agent had neither a dated history entry nor
    /// a static level; that is also a miss.
    pub fn resolve(&mut self, carrier: &str, policy_type: &str, level: Option<&str>) -> f64 {
        if let Some(level) = level {
            if let Some(rate) = self.book.lookup(carrier, policy_type, level) {
                return rate;
            }
        }

        let miss = MissingRate {
            carrier: carrier.trim().to_string(),
            policy_type: policy_type.trim().to_string(),
            level: level.map(|l| l.to_string()),
        };
        if self.seen.insert(miss.key()) {
            warn!(
                carrier = %miss.carrier,
                policy_type = %miss.policy_type,
                level = ?miss.level,
                "No rate book entry, defaulting to 100%"
            );
            self.misses.push(miss);
        }

        FALLBACK_RATE
    }

    /// Diagnostics collected during this run, for persistence at the edge
    pub fn into_misses(self) -> Vec<MissingRate> {
        self.misses
    }
}
