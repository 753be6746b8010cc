//! Commission rollup engine
//!
//! Given a sold policy and the agent roster (upline links plus
//! per-carrier/per-product rate tables), computes the selling agent's
//! commission and compression-style overrides for up to two upline tiers.
//! Pure and synchronous: callers load a roster snapshot and the policies,
//! the engine does arithmetic, diagnostics are persisted at the edge.

pub mod ledger;
pub mod rates;
pub mod report;
pub mod snapshot;
pub mod walk;

pub use ledger::{CommissionLedger, CommissionRow};
pub use rates::{MissingRate, RateBook, RateResolver, FALLBACK_RATE};
pub use report::{aggregate_commissions, CommissionReport};
pub use snapshot::RosterSnapshot;
pub use walk::{
    annualized_premium, credit_policy, house_commission, parse_monthly_premium, walk_commission,
    DEFAULT_MAX_OVERRIDE_TIERS,
};
