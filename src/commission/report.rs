//! Date-ranged commission report aggregation
//!
//! Iterates every qualifying policy in the window, runs the override walk
//! per policy, and merges everything into one uid-keyed ledger. Cancelled
//! and Lapsed policies are excluded; Pending and Insufficient Funds still
//! count. A bad policy or agent record is logged and skipped so the rest
//! of the roster reports correctly.

use chrono::NaiveDate;
use tracing::debug;

use crate::commission::ledger::{CommissionLedger, CommissionRow};
use crate::commission::rates::{MissingRate, RateBook, RateResolver};
use crate::commission::snapshot::RosterSnapshot;
use crate::commission::walk::credit_policy;
use crate::db::schemas::PolicyDoc;

/// Aggregated commissions for a date window
#[derive(Debug)]
pub struct CommissionReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Per-agent totals, descending by amount
    pub rows: Vec<CommissionRow>,
    /// Policies that contributed commission
    pub policies_included: usize,
    /// Policies excluded by status or date
    pub policies_excluded: usize,
    /// Rate-book gaps hit during this run, for persistence at the edge
    pub missing_rates: Vec<MissingRate>,
}

/// Run the rollup over every qualifying policy in `[start, end]`
pub fn aggregate_commissions(
    roster: &RosterSnapshot,
    book: &RateBook,
    policies: &[PolicyDoc],
    start: NaiveDate,
    end: NaiveDate,
    max_override_tiers: usize,
) -> CommissionReport {
    let mut rates = RateResolver::new(book);
    let mut ledger = CommissionLedger::new();
    let mut included = 0usize;
    let mut excluded = 0usize;

    for policy in policies {
        if policy.status.excluded_from_reports() {
            debug!(
                policy = %policy.policy_number,
                status = %policy.status,
                "Excluded from report by status"
            );
            excluded += 1;
            continue;
        }
        if policy.effective_date < start || policy.effective_date > end {
            excluded += 1;
            continue;
        }

        credit_policy(roster, &mut rates, &mut ledger, policy, max_override_tiers);
        included += 1;
    }

    CommissionReport {
        start,
        end,
        rows: ledger.into_sorted_rows(),
        policies_included: included,
        policies_excluded: excluded,
        missing_rates: rates.into_misses(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commission::test_fixtures::{agent, policy, rate_book, split_policy};
    use crate::db::schemas::PolicyStatus;

    fn window() -> (NaiveDate, NaiveDate) {
        ("2025-01-01".parse().unwrap(), "2025-12-31".parse().unwrap())
    }

    #[test]
    fn test_cancelled_and_lapsed_are_excluded() {
        let roster = RosterSnapshot::new(vec![agent("x", "Xia", Some("100"), None)], vec![]);
        let book = rate_book(&[("100", 80.0)]);
        let (start, end) = window();

        let mut cancelled = policy("P-1", "100", &["x"]);
        cancelled.status = PolicyStatus::parse("cancelled");
        let mut lapsed = policy("P-2", "100", &["x"]);
        lapsed.status = PolicyStatus::parse("LAPSED");

        let report =
            aggregate_commissions(&roster, &book, &[cancelled, lapsed], start, end, 2);

        assert!(report.rows.is_empty());
        assert_eq!(report.policies_included, 0);
        assert_eq!(report.policies_excluded, 2);
    }

    #[test]
    fn test_pending_and_insufficient_funds_contribute() {
        let roster = RosterSnapshot::new(vec![agent("x", "Xia", Some("100"), None)], vec![]);
        let book = rate_book(&[("100", 80.0)]);
        let (start, end) = window();

        let mut pending = policy("P-1", "100", &["x"]);
        pending.status = PolicyStatus::Pending;
        let mut nsf = policy("P-2", "100", &["x"]);
        nsf.status = PolicyStatus::InsufficientFunds;

        let report = aggregate_commissions(&roster, &book, &[pending, nsf], start, end, 2);

        assert_eq!(report.policies_included, 2);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].amount, 1920.0);
    }

    #[test]
    fn test_date_window_is_inclusive() {
        let roster = RosterSnapshot::new(vec![agent("x", "Xia", Some("100"), None)], vec![]);
        let book = rate_book(&[("100", 80.0)]);
        let start: NaiveDate = "2025-01-01".parse().unwrap();
        let end: NaiveDate = "2025-01-31".parse().unwrap();

        let mut on_start = policy("P-1", "100", &["x"]);
        on_start.effective_date = start;
        let mut on_end = policy("P-2", "100", &["x"]);
        on_end.effective_date = end;
        let mut after = policy("P-3", "100", &["x"]);
        after.effective_date = "2025-02-01".parse().unwrap();

        let report =
            aggregate_commissions(&roster, &book, &[on_start, on_end, after], start, end, 2);

        assert_eq!(report.policies_included, 2);
        assert_eq!(report.policies_excluded, 1);
    }

    #[test]
    fn test_report_merges_and_sorts_descending() {
        let roster = RosterSnapshot::new(
            vec![
                agent("x", "Xia", Some("100"), Some("u")),
                agent("y", "Yuri", Some("100"), Some("u")),
                agent("u", "Uma", Some("110"), None),
            ],
            vec![],
        );
        let book = rate_book(&[("100", 80.0), ("110", 90.0)]);
        let (start, end) = window();

        let policies = vec![
            policy("P-1", "100", &["x"]),
            policy("P-2", "200", &["y"]),
            split_policy("P-3", "100", "x", "y"),
        ];

        let report = aggregate_commissions(&roster, &book, &policies, start, end, 2);

        // y: 2400*0.8 + 600*0.8 = 2400; x: 1200*0.8 + 600*0.8 = 1440
        // u: 120 + 240 + 60 + 60 = 480
        assert_eq!(report.rows[0].uid, "y");
        assert_eq!(report.rows[0].amount, 2400.0);
        assert_eq!(report.rows[1].uid, "x");
        assert_eq!(report.rows[1].amount, 1440.0);
        assert_eq!(report.rows[2].uid, "u");
        assert_eq!(report.rows[2].amount, 480.0);
    }

    #[test]
    fn test_identical_snapshots_yield_identical_output() {
        let roster = RosterSnapshot::new(
            vec![
                agent("x", "Xia", Some("100"), Some("u")),
                agent("y", "Yuri", Some("100"), Some("u")),
                agent("u", "Uma", Some("110"), None),
            ],
            vec![],
        );
        let book = rate_book(&[("100", 80.0), ("110", 90.0)]);
        let (start, end) = window();
        let policies = vec![
            policy("P-1", "100", &["x"]),
            policy("P-2", "100", &["y"]),
            split_policy("P-3", "80", "y", "x"),
        ];

        let a = aggregate_commissions(&roster, &book, &policies, start, end, 2);
        let b = aggregate_commissions(&roster, &book, &policies, start, end, 2);

        let a_json = serde_json::to_string(&a.rows).unwrap();
        let b_json = serde_json::to_string(&b.rows).unwrap();
        assert_eq!(a_json, b_json);
    }

    #[test]
    fn test_one_bad_record_does_not_poison_the_report() {
        let roster = RosterSnapshot::new(vec![agent("x", "Xia", Some("100"), None)], vec![]);
        let book = rate_book(&[("100", 80.0)]);
        let (start, end) = window();

        let good = policy("P-1", "100", &["x"]);
        let orphan = policy("P-2", "100", &["nobody"]);
        let mut garbled = policy("P-3", "100", &["x"]);
        garbled.monthly_premium = "n/a".to_string();

        let report =
            aggregate_commissions(&roster, &book, &[good, orphan, garbled], start, end, 2);

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].uid, "x");
        assert_eq!(report.rows[0].amount, 960.0);
    }

    #[test]
    fn test_missing_rates_surface_once_per_combination() {
        let roster = RosterSnapshot::new(vec![agent("x", "Xia", Some("100"), None)], vec![]);
        let book = rate_book(&[]);
        let (start, end) = window();

        let report = aggregate_commissions(
            &roster,
            &book,
            &[policy("P-1", "100", &["x"]), policy("P-2", "100", &["x"])],
            start,
            end,
            2,
        );

        assert_eq!(report.missing_rates.len(), 1);
        // Fail-open: both policies still paid at 100%
        assert_eq!(report.rows[0].amount, 2400.0);
    }
}
