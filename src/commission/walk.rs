//! The override walk
//!
//! One function computes commissions for a sold policy: the selling
//! agent's share, then a compression-style override at each upline tier
//! (the difference between the upline's contract rate and the rate of the
//! agent below). The walk is shared by single and split policies, by the
//! commissions report, and by the attribution side-channel; the tier cap
//! is a parameter, not copy-pasted logic.

use tracing::{error, warn};

use crate::commission::ledger::CommissionLedger;
use crate::commission::rates::RateResolver;
use crate::commission::snapshot::RosterSnapshot;
use crate::db::schemas::PolicyDoc;

/// Overrides reach at most this many tiers above the selling agent
pub const DEFAULT_MAX_OVERRIDE_TIERS: usize = 2;

/// Parse a monthly premium string as received from upstream
///
/// Tolerates surrounding whitespace, a leading dollar sign, and thousands
/// separators. Returns `None` for anything that still fails to parse.
pub fn parse_monthly_premium(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Annualized premium: monthly x 12, rounded
pub fn annualized_premium(monthly: f64) -> f64 {
    (monthly * 12.0).round()
}

/// Credit one policy into the ledger
///
/// Split policies run one walk per co-selling agent on half the
/// annualized premium; each leg gets its own independent upline walk, so
/// a shared upline is credited once per leg. Everything else runs a
/// single walk on the full annualized premium.
pub fn credit_policy(
    roster: &RosterSnapshot,
    rates: &mut RateResolver,
    ledger: &mut CommissionLedger,
    policy: &PolicyDoc,
    max_override_tiers: usize,
) {
    let Some(monthly) = parse_monthly_premium(&policy.monthly_premium) else {
        warn!(
            policy = %policy.policy_number,
            premium = %policy.monthly_premium,
            "Unparseable premium, policy contributes no commission"
        );
        return;
    };
    let annualized = annualized_premium(monthly);

    if policy.split_policy && policy.agent_ids.len() == 2 {
        let leg_base = (annualized / 2.0).round();
        for uid in &policy.agent_ids {
            walk_commission(roster, rates, ledger, uid, policy, leg_base, max_override_tiers);
        }
        return;
    }

    if policy.split_policy {
        warn!(
            policy = %policy.policy_number,
            agents = policy.agent_ids.len(),
            "Split policy without exactly two agents, crediting first agent only"
        );
    }

    match policy.agent_ids.first() {
        Some(uid) => {
            walk_commission(roster, rates, ledger, uid, policy, annualized, max_override_tiers)
        }
        None => warn!(policy = %policy.policy_number, "Policy has no agents, skipping"),
    }
}

/// Walk one agent's commission and the override chain above them
///
/// Each tier's override is `round(base x (upline rate - downstream
/// rate))`. Differentials are not clamped; a negative value means the
/// rate table is inverted for that chain and is worth surfacing, not
/// hiding. The walk stops at `max_override_tiers` above the seller, or
/// earlier when an upline reference is missing from the roster.
pub fn walk_commission(
    roster: &RosterSnapshot,
    rates: &mut RateResolver,
    ledger: &mut CommissionLedger,
    selling_uid: &str,
    policy: &PolicyDoc,
    base: f64,
    max_override_tiers: usize,
) {
    let Some(seller) = roster.agent(selling_uid) else {
        error!(
            agent = %selling_uid,
            policy = %policy.policy_number,
            "Selling agent not in roster, no commission credited"
        );
        return;
    };

    let level = roster.level_as_of(selling_uid, policy.effective_date);
    let rate = rates.resolve(&policy.carrier, &policy.policy_type, level.as_deref());
    let commission = (base * rate).round();
    ledger.credit(&seller.uid, &seller.name, commission);

    let mut downstream_rate = rate;
    let mut current = seller;
    for _ in 0..max_override_tiers {
        let Some(upline_uid) = current.upline_uid.as_deref() else {
            break;
        };
        let Some(upline) = roster.agent(upline_uid) else {
            error!(
                agent = %current.uid,
                upline = %upline_uid,
                policy = %policy.policy_number,
                "Upline not in roster, abandoning override walk"
            );
            break;
        };

        let upline_level = roster.level_as_of(upline_uid, policy.effective_date);
        let upline_rate = rates.resolve(&policy.carrier, &policy.policy_type, upline_level.as_deref());
        let override_amount = (base * (upline_rate - downstream_rate)).round();
        if override_amount < 0.0 {
            warn!(
                upline = %upline.uid,
                policy = %policy.policy_number,
                amount = override_amount,
                "Negative override differential, rate table may be inverted"
            );
        }
        ledger.credit(&upline.uid, &upline.name, override_amount);

        downstream_rate = upline_rate;
        current = upline;
    }
}

/// The house agent's share of one policy's immediate commission
///
/// Used at policy creation to feed ad-attribution integrations: the same
/// walk as the report, read back for a single uid. Diagnostics stay on
/// the resolver for the caller to persist.
pub fn house_commission(
    roster: &RosterSnapshot,
    rates: &mut RateResolver,
    policy: &PolicyDoc,
    house_uid: &str,
    max_override_tiers: usize,
) -> f64 {
    let mut ledger = CommissionLedger::new();
    credit_policy(roster, rates, &mut ledger, policy, max_override_tiers);
    ledger.total_for(house_uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commission::rates::RateBook;
    use crate::commission::test_fixtures::{agent, policy, rate_book, split_policy};

    #[test]
    fn test_premium_parsing() {
        assert_eq!(parse_monthly_premium("100"), Some(100.0));
        assert_eq!(parse_monthly_premium(" 99.50 "), Some(99.5));
        assert_eq!(parse_monthly_premium("$1,250.75"), Some(1250.75));
        assert_eq!(parse_monthly_premium("abc"), None);
        assert_eq!(parse_monthly_premium(""), None);
    }

    #[test]
    fn test_single_agent_no_upline() {
        // premium 100/mo at 80%: round(1200 * 0.80) = 960
        let roster = RosterSnapshot::new(vec![agent("x", "Xia", Some("100"), None)], vec![]);
        let book = rate_book(&[("100", 80.0)]);
        let mut rates = RateResolver::new(&book);
        let mut ledger = CommissionLedger::new();

        credit_policy(&roster, &mut rates, &mut ledger, &policy("P-1", "100", &["x"]), 2);

        assert_eq!(ledger.total_for("x"), 960.0);
        assert!(rates.into_misses().is_empty());
    }

    #[test]
    fn test_override_differential() {
        // seller at 80%, upline at 90%: override = round(1200 * 0.10) = 120
        let roster = RosterSnapshot::new(
            vec![
                agent("x", "Xia", Some("100"), Some("y")),
                agent("y", "Yuri", Some("110"), None),
            ],
            vec![],
        );
        let book = rate_book(&[("100", 80.0), ("110", 90.0)]);
        let mut rates = RateResolver::new(&book);
        let mut ledger = CommissionLedger::new();

        credit_policy(&roster, &mut rates, &mut ledger, &policy("P-1", "100", &["x"]), 2);

        assert_eq!(ledger.total_for("x"), 960.0);
        assert_eq!(ledger.total_for("y"), 120.0);
    }

    #[test]
    fn test_walk_caps_at_two_tiers() {
        // Four-deep chain: x -> y -> z -> w. Only y and z get overrides.
        let roster = RosterSnapshot::new(
            vec![
                agent("x", "Xia", Some("100"), Some("y")),
                agent("y", "Yuri", Some("110"), Some("z")),
                agent("z", "Zef", Some("120"), Some("w")),
                agent("w", "Wes", Some("130"), None),
            ],
            vec![],
        );
        let book = rate_book(&[("100", 80.0), ("110", 90.0), ("120", 95.0), ("130", 100.0)]);
        let mut rates = RateResolver::new(&book);
        let mut ledger = CommissionLedger::new();

        credit_policy(&roster, &mut rates, &mut ledger, &policy("P-1", "100", &["x"]), 2);

        assert_eq!(ledger.total_for("x"), 960.0);
        assert_eq!(ledger.total_for("y"), 120.0);
        assert_eq!(ledger.total_for("z"), 60.0);
        assert_eq!(ledger.total_for("w"), 0.0);
    }

    #[test]
    fn test_tier_cap_is_configurable() {
        let roster = RosterSnapshot::new(
            vec![
                agent("x", "Xia", Some("100"), Some("y")),
                agent("y", "Yuri", Some("110"), Some("z")),
                agent("z", "Zef", Some("120"), None),
            ],
            vec![],
        );
        let book = rate_book(&[("100", 80.0), ("110", 90.0), ("120", 95.0)]);
        let mut rates = RateResolver::new(&book);
        let mut ledger = CommissionLedger::new();

        credit_policy(&roster, &mut rates, &mut ledger, &policy("P-1", "100", &["x"]), 1);

        assert_eq!(ledger.total_for("y"), 120.0);
        assert_eq!(ledger.total_for("z"), 0.0);
    }

    #[test]
    fn test_missing_rate_defaults_to_full_premium() {
        // No table entry for level 100: commission = round(1200 * 1.0)
        let roster = RosterSnapshot::new(vec![agent("x", "Xia", Some("100"), None)], vec![]);
        let book = rate_book(&[("110", 90.0)]);
        let mut rates = RateResolver::new(&book);
        let mut ledger = CommissionLedger::new();

        credit_policy(&roster, &mut rates, &mut ledger, &policy("P-1", "100", &["x"]), 2);

        assert_eq!(ledger.total_for("x"), 1200.0);
        let misses = rates.into_misses();
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].carrier, "Acme Mutual");
        assert_eq!(misses[0].policy_type, "Term Life");
    }

    #[test]
    fn test_upline_with_rate_miss_gets_full_differential() {
        // Upline level absent from table defaults to 100%:
        // override = round(1200 * (1.0 - 0.80)) = 240
        let roster = RosterSnapshot::new(
            vec![
                agent("x", "Xia", Some("100"), Some("y")),
                agent("y", "Yuri", Some("999"), None),
            ],
            vec![],
        );
        let book = rate_book(&[("100", 80.0)]);
        let mut rates = RateResolver::new(&book);
        let mut ledger = CommissionLedger::new();

        credit_policy(&roster, &mut rates, &mut ledger, &policy("P-1", "100", &["x"]), 2);

        assert_eq!(ledger.total_for("y"), 240.0);
    }

    #[test]
    fn test_negative_differential_is_not_clamped() {
        // Inverted table: upline at 70% below seller's 80%
        let roster = RosterSnapshot::new(
            vec![
                agent("x", "Xia", Some("100"), Some("y")),
                agent("y", "Yuri", Some("90"), None),
            ],
            vec![],
        );
        let book = rate_book(&[("100", 80.0), ("90", 70.0)]);
        let mut rates = RateResolver::new(&book);
        let mut ledger = CommissionLedger::new();

        credit_policy(&roster, &mut rates, &mut ledger, &policy("P-1", "100", &["x"]), 2);

        assert_eq!(ledger.total_for("y"), -120.0);
    }

    #[test]
    fn test_missing_upline_abandons_branch_keeps_agent_commission() {
        let roster = RosterSnapshot::new(
            vec![agent("x", "Xia", Some("100"), Some("ghost"))],
            vec![],
        );
        let book = rate_book(&[("100", 80.0)]);
        let mut rates = RateResolver::new(&book);
        let mut ledger = CommissionLedger::new();

        credit_policy(&roster, &mut rates, &mut ledger, &policy("P-1", "100", &["x"]), 2);

        assert_eq!(ledger.total_for("x"), 960.0);
        assert_eq!(ledger.total_for("ghost"), 0.0);
    }

    #[test]
    fn test_split_policy_halves_base_per_leg() {
        let roster = RosterSnapshot::new(
            vec![
                agent("x", "Xia", Some("100"), None),
                agent("y", "Yuri", Some("100"), None),
            ],
            vec![],
        );
        let book = rate_book(&[("100", 80.0)]);
        let mut rates = RateResolver::new(&book);
        let mut ledger = CommissionLedger::new();

        credit_policy(
            &roster,
            &mut rates,
            &mut ledger,
            &split_policy("P-1", "100", "x", "y"),
            2,
        );

        // Each leg: round(round(1200 / 2) * 0.80) = 480
        assert_eq!(ledger.total_for("x"), 480.0);
        assert_eq!(ledger.total_for("y"), 480.0);
    }

    #[test]
    fn test_split_legs_match_independent_halved_walks() {
        // Splitting law: the split result equals two independent walks on
        // the halved premium, including each leg's own override chain.
        let roster = RosterSnapshot::new(
            vec![
                agent("x", "Xia", Some("100"), Some("u")),
                agent("y", "Yuri", Some("110"), Some("u")),
                agent("u", "Uma", Some("120"), None),
            ],
            vec![],
        );
        let book = rate_book(&[("100", 80.0), ("110", 90.0), ("120", 95.0)]);

        let split = split_policy("P-1", "100", "x", "y");
        let mut rates = RateResolver::new(&book);
        let mut split_ledger = CommissionLedger::new();
        credit_policy(&roster, &mut rates, &mut split_ledger, &split, 2);

        let mut expected = CommissionLedger::new();
        let mut rates_b = RateResolver::new(&book);
        let leg_base = (annualized_premium(100.0) / 2.0).round();
        walk_commission(&roster, &mut rates_b, &mut expected, "x", &split, leg_base, 2);
        walk_commission(&roster, &mut rates_b, &mut expected, "y", &split, leg_base, 2);

        for uid in ["x", "y", "u"] {
            assert_eq!(split_ledger.total_for(uid), expected.total_for(uid));
        }

        // Shared upline was credited once per leg
        let x_override = (600.0_f64 * (0.95 - 0.80)).round();
        let y_override = (600.0_f64 * (0.95 - 0.90)).round();
        assert_eq!(split_ledger.total_for("u"), x_override + y_override);
    }

    #[test]
    fn test_house_commission_reads_single_uid() {
        let roster = RosterSnapshot::new(
            vec![
                agent("x", "Xia", Some("100"), Some("house")),
                agent("house", "The House", Some("110"), None),
            ],
            vec![],
        );
        let book = rate_book(&[("100", 80.0), ("110", 90.0)]);
        let mut rates = RateResolver::new(&book);

        let amount = house_commission(&roster, &mut rates, &policy("P-1", "100", &["x"]), "house", 2);
        assert_eq!(amount, 120.0);

        // An uninvolved house agent earns nothing
        let mut rates = RateResolver::new(&book);
        let amount = house_commission(&roster, &mut rates, &policy("P-2", "100", &["house"]), "x", 2);
        assert_eq!(amount, 0.0);
    }

    #[test]
    fn test_level_history_applies_as_of_effective_date() {
        let roster = RosterSnapshot::new(
            vec![agent("x", "Xia", Some("100"), None)],
            vec![crate::db::schemas::LevelHistoryDoc::new(
                "x".to_string(),
                "2025-01-01".parse().unwrap(),
                "110".to_string(),
            )],
        );
        let book = rate_book(&[("100", 80.0), ("110", 90.0)]);

        // Policy effective after the level change uses the dated level
        let mut rates = RateResolver::new(&book);
        let mut ledger = CommissionLedger::new();
        let mut p = policy("P-1", "100", &["x"]);
        p.effective_date = "2025-02-01".parse().unwrap();
        credit_policy(&roster, &mut rates, &mut ledger, &p, 2);
        assert_eq!(ledger.total_for("x"), 1080.0);

        // Policy effective before it falls back to the static level
        let mut rates = RateResolver::new(&book);
        let mut ledger = CommissionLedger::new();
        let mut p = policy("P-2", "100", &["x"]);
        p.effective_date = "2024-06-01".parse().unwrap();
        credit_policy(&roster, &mut rates, &mut ledger, &p, 2);
        assert_eq!(ledger.total_for("x"), 960.0);
    }

    #[test]
    fn test_unparseable_premium_contributes_nothing() {
        let roster = RosterSnapshot::new(vec![agent("x", "Xia", Some("100"), None)], vec![]);
        let book = RateBook::default();
        let mut rates = RateResolver::new(&book);
        let mut ledger = CommissionLedger::new();

        let mut p = policy("P-1", "100", &["x"]);
        p.monthly_premium = "not a number".to_string();
        credit_policy(&roster, &mut rates, &mut ledger, &p, 2);

        assert!(ledger.is_empty());
        assert!(rates.into_misses().is_empty());
    }
}
