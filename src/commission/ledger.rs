//! Commission accumulator
//!
//! Keyed by agent uid so two agents sharing a display name never merge;
//! names are carried alongside and only matter at the serialization edge.
//! Ledgers are ephemeral, built fresh per report or policy creation.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// One agent's accumulated commission, as returned by the report endpoint
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRow {
    pub uid: String,
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone)]
struct LedgerEntry {
    name: String,
    amount: f64,
}

/// Uid-keyed running commission totals for one rollup run
#[derive(Debug, Default)]
pub struct CommissionLedger {
    entries: HashMap<String, LedgerEntry>,
}

impl CommissionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an amount to an agent's running total
    pub fn credit(&mut self, uid: &str, name: &str, amount: f64) {
        self.entries
            .entry(uid.to_string())
            .and_modify(|e| e.amount += amount)
            .or_insert_with(|| LedgerEntry {
                name: name.to_string(),
                amount,
            });
    }

    /// Running total for one agent (0 if never credited)
    pub fn total_for(&self, uid: &str) -> f64 {
        self.entries.get(uid).map(|e| e.amount).unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the ledger into rows sorted descending by amount
    ///
    /// Ties break by name then uid so identical snapshots always produce
    /// identical output.
    pub fn into_sorted_rows(self) -> Vec<CommissionRow> {
        let mut rows: Vec<CommissionRow> = self
            .entries
            .into_iter()
            .map(|(uid, entry)| CommissionRow {
                uid,
                name: entry.name,
                amount: entry.amount,
            })
            .collect();

        rows.sort_by(|a, b| {
            b.amount
                .partial_cmp(&a.amount)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.uid.cmp(&b.uid))
        });
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_accumulates_by_uid() {
        let mut ledger = CommissionLedger::new();
        ledger.credit("a1", "Jamie Ortiz", 960.0);
        ledger.credit("a1", "Jamie Ortiz", 120.0);

        assert_eq!(ledger.total_for("a1"), 1080.0);
        assert_eq!(ledger.total_for("nobody"), 0.0);
    }

    #[test]
    fn test_same_name_different_uids_stay_separate() {
        let mut ledger = CommissionLedger::new();
        ledger.credit("a1", "Sam Lee", 500.0);
        ledger.credit("a2", "Sam Lee", 300.0);

        assert_eq!(ledger.total_for("a1"), 500.0);
        assert_eq!(ledger.total_for("a2"), 300.0);

        let rows = ledger.into_sorted_rows();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_rows_sort_descending_with_stable_ties() {
        let mut ledger = CommissionLedger::new();
        ledger.credit("a3", "Zoe", 200.0);
        ledger.credit("a1", "Abe", 200.0);
        ledger.credit("a2", "Mia", 900.0);

        let rows = ledger.into_sorted_rows();
        assert_eq!(rows[0].uid, "a2");
        // Equal amounts ordered by name
        assert_eq!(rows[1].name, "Abe");
        assert_eq!(rows[2].name, "Zoe");
    }
}
