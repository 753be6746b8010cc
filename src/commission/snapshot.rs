//! Request-scoped roster snapshot
//!
//! Each rollup run loads the full agent roster and level history once,
//! then resolves uplines and effective levels from memory. Snapshots are
//! ephemeral; nothing here is cached across requests.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::db::schemas::{AgentDoc, LevelHistoryDoc};

/// In-memory view of the roster for one rollup run
pub struct RosterSnapshot {
    agents: HashMap<String, AgentDoc>,
    /// Level changes per agent, ascending by effective date
    levels: HashMap<String, Vec<(NaiveDate, String)>>,
}

impl RosterSnapshot {
    /// Build a snapshot from loaded documents
    pub fn new(agents: Vec<AgentDoc>, history: Vec<LevelHistoryDoc>) -> Self {
        let agents: HashMap<String, AgentDoc> =
            agents.into_iter().map(|a| (a.uid.clone(), a)).collect();

        let mut levels: HashMap<String, Vec<(NaiveDate, String)>> = HashMap::new();
        for entry in history {
            levels
                .entry(entry.agent_uid)
                .or_default()
                .push((entry.effective_date, entry.level));
        }
        for entries in levels.values_mut() {
            entries.sort_by_key(|(date, _)| *date);
        }

        Self { agents, levels }
    }

    /// Look up an agent by uid
    pub fn agent(&self, uid: &str) -> Option<&AgentDoc> {
        self.agents.get(uid)
    }

    /// Commission level effective for an agent as of a given date
    ///
    /// The latest history entry with effective date <= `as_of` wins; the
    /// agent's static level is the fallback. `None` means the agent is
    /// rate-unresolvable and the rate lookup will fail open.
    pub fn level_as_of(&self, uid: &str, as_of: NaiveDate) -> Option<String> {
        if let Some(entries) = self.levels.get(uid) {
            if let Some((_, level)) = entries.iter().rev().find(|(date, _)| *date <= as_of) {
                return Some(level.clone());
            }
        }

        self.agents.get(uid).and_then(|a| a.level.clone())
    }

    /// Number of agents in the snapshot
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(uid: &str, level: Option<&str>) -> AgentDoc {
        AgentDoc {
            uid: uid.to_string(),
            name: format!("Agent {}", uid),
            email: format!("{}@agency.test", uid),
            level: level.map(|l| l.to_string()),
            ..AgentDoc::default()
        }
    }

    fn history(uid: &str, date: &str, level: &str) -> LevelHistoryDoc {
        LevelHistoryDoc::new(
            uid.to_string(),
            date.parse().unwrap(),
            level.to_string(),
        )
    }

    #[test]
    fn test_latest_entry_on_or_before_date_wins() {
        let snapshot = RosterSnapshot::new(
            vec![agent("a1", Some("80"))],
            vec![
                history("a1", "2024-01-01", "100"),
                history("a1", "2024-06-01", "110"),
                history("a1", "2025-01-01", "120"),
            ],
        );

        assert_eq!(
            snapshot.level_as_of("a1", "2024-07-15".parse().unwrap()),
            Some("110".to_string())
        );
        // Entry effective exactly on the policy date applies
        assert_eq!(
            snapshot.level_as_of("a1", "2025-01-01".parse().unwrap()),
            Some("120".to_string())
        );
    }

    #[test]
    fn test_falls_back_to_static_level_before_first_entry() {
        let snapshot = RosterSnapshot::new(
            vec![agent("a1", Some("80"))],
            vec![history("a1", "2024-06-01", "110")],
        );

        assert_eq!(
            snapshot.level_as_of("a1", "2024-01-15".parse().unwrap()),
            Some("80".to_string())
        );
    }

    #[test]
    fn test_no_history_no_static_level_is_unresolvable() {
        let snapshot = RosterSnapshot::new(vec![agent("a1", None)], vec![]);
        assert_eq!(snapshot.level_as_of("a1", "2024-01-15".parse().unwrap()), None);
    }

    #[test]
    fn test_unsorted_history_is_ordered_on_build() {
        let snapshot = RosterSnapshot::new(
            vec![agent("a1", None)],
            vec![
                history("a1", "2025-01-01", "120"),
                history("a1", "2024-01-01", "100"),
            ],
        );

        assert_eq!(
            snapshot.level_as_of("a1", "2024-06-01".parse().unwrap()),
            Some("100".to_string())
        );
    }

    #[test]
    fn test_unknown_agent_resolves_nothing() {
        let snapshot = RosterSnapshot::new(vec![], vec![]);
        assert!(snapshot.agent("ghost").is_none());
        assert_eq!(snapshot.level_as_of("ghost", "2024-01-01".parse().unwrap()), None);
    }
}
