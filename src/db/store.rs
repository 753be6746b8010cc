//! CRM data access
//!
//! `CrmStore` owns the typed collections and the bulk loads the
//! commission engine needs. Every rollup request re-reads the roster and
//! relevant policies; there is no cross-request cache.

use bson::doc;
use chrono::NaiveDate;
use dashmap::DashMap;
use mongodb::options::FindOptions;
use tracing::{info, warn};

use crate::commission::{MissingRate, RosterSnapshot};
use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    AgentDoc, LevelHistoryDoc, MissingRateDoc, PolicyDoc, AGENT_COLLECTION,
    LEVEL_HISTORY_COLLECTION, MISSING_RATE_COLLECTION, POLICY_COLLECTION,
};
use crate::types::{BinderyError, Result};

/// Typed access to the CRM collections
pub struct CrmStore {
    agents: MongoCollection<AgentDoc>,
    levels: MongoCollection<LevelHistoryDoc>,
    policies: MongoCollection<PolicyDoc>,
    missing_rates: MongoCollection<MissingRateDoc>,
    /// Process-lifetime guard so each rate-book gap is written once.
    /// Best-effort: not atomic with the insert, which is fine for a
    /// diagnostic record.
    recorded_misses: DashMap<String, ()>,
}

impl CrmStore {
    /// Open all collections and apply their indexes
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            agents: mongo.collection(AGENT_COLLECTION).await?,
            levels: mongo.collection(LEVEL_HISTORY_COLLECTION).await?,
            policies: mongo.collection(POLICY_COLLECTION).await?,
            missing_rates: mongo.collection(MISSING_RATE_COLLECTION).await?,
            recorded_misses: DashMap::new(),
        })
    }

    // --- roster ---

    /// Load the full roster plus level history into a snapshot
    pub async fn load_roster(&self) -> Result<RosterSnapshot> {
        let agents = self.agents.find_many(doc! {}).await?;
        let history = self
            .levels
            .find_many_with_options(
                doc! {},
                Some(
                    FindOptions::builder()
                        .sort(doc! { "agent_uid": 1, "effective_date": 1 })
                        .build(),
                ),
            )
            .await?;

        Ok(RosterSnapshot::new(agents, history))
    }

    /// List all agents, ordered by name
    pub async fn list_agents(&self) -> Result<Vec<AgentDoc>> {
        self.agents
            .find_many_with_options(
                doc! {},
                Some(FindOptions::builder().sort(doc! { "name": 1 }).build()),
            )
            .await
    }

    /// Fetch one agent by uid
    pub async fn find_agent(&self, uid: &str) -> Result<Option<AgentDoc>> {
        self.agents.find_one(doc! { "uid": uid }).await
    }

    /// Insert a new agent; uid must not already exist
    pub async fn insert_agent(&self, agent: AgentDoc) -> Result<AgentDoc> {
        if self.find_agent(&agent.uid).await?.is_some() {
            return Err(BinderyError::Conflict(format!(
                "agent '{}' already exists",
                agent.uid
            )));
        }
        self.agents.insert_one(agent.clone()).await?;
        Ok(agent)
    }

    /// Level history for one agent, ascending by effective date
    pub async fn level_history_for(&self, uid: &str) -> Result<Vec<LevelHistoryDoc>> {
        self.levels
            .find_many_with_options(
                doc! { "agent_uid": uid },
                Some(FindOptions::builder().sort(doc! { "effective_date": 1 }).build()),
            )
            .await
    }

    /// Append a dated level change for an agent
    pub async fn append_level(&self, entry: LevelHistoryDoc) -> Result<LevelHistoryDoc> {
        self.levels.insert_one(entry.clone()).await?;
        Ok(entry)
    }

    // --- policies ---

    /// List policies, optionally restricted to one agent's book
    pub async fn list_policies(&self, agent_uid: Option<&str>) -> Result<Vec<PolicyDoc>> {
        let filter = match agent_uid {
            Some(uid) => doc! { "agent_ids": uid },
            None => doc! {},
        };
        self.policies
            .find_many_with_options(
                filter,
                Some(FindOptions::builder().sort(doc! { "effective_date": -1 }).build()),
            )
            .await
    }

    /// Policies with an effective date inside `[start, end]`
    ///
    /// Effective dates are stored as ISO strings, so lexicographic range
    /// bounds are correct.
    pub async fn policies_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<PolicyDoc>> {
        self.policies
            .find_many(doc! {
                "effective_date": {
                    "$gte": start.to_string(),
                    "$lte": end.to_string(),
                }
            })
            .await
    }

    /// Fetch one policy by policy number
    pub async fn find_policy(&self, policy_number: &str) -> Result<Option<PolicyDoc>> {
        self.policies
            .find_one(doc! { "policy_number": policy_number })
            .await
    }

    /// Insert a new policy; the policy number must not already exist
    pub async fn insert_policy(&self, policy: PolicyDoc) -> Result<PolicyDoc> {
        if self.find_policy(&policy.policy_number).await?.is_some() {
            return Err(BinderyError::Conflict(format!(
                "policy '{}' already exists",
                policy.policy_number
            )));
        }
        self.policies.insert_one(policy.clone()).await?;
        Ok(policy)
    }

    /// Update one policy's status
    pub async fn update_policy_status(&self, policy_number: &str, status: &str) -> Result<()> {
        let result = self
            .policies
            .update_one(
                doc! { "policy_number": policy_number },
                doc! { "$set": {
                    "status": status,
                    "metadata.updated_at": bson::DateTime::now(),
                } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(BinderyError::NotFound(format!(
                "policy '{}'",
                policy_number
            )));
        }
        Ok(())
    }

    // --- diagnostics ---

    /// Persist missing-rate diagnostics from a rollup run
    ///
    /// Check-then-set per carrier+type: the in-process guard short-circuits
    /// repeats, and a find-before-insert keeps restarts from duplicating
    /// records. A failed write is logged and dropped.
    pub async fn record_missing_rates(&self, misses: &[MissingRate]) {
        for miss in misses {
            let key = miss.key();
            if self.recorded_misses.contains_key(&key) {
                continue;
            }

            match self.missing_rates.find_one(doc! { "key": &key }).await {
                Ok(Some(_)) => {
                    self.recorded_misses.insert(key, ());
                }
                Ok(None) => {
                    let doc = MissingRateDoc::new(
                        miss.carrier.clone(),
                        miss.policy_type.clone(),
                        miss.level.clone(),
                    );
                    match self.missing_rates.insert_one(doc).await {
                        Ok(_) => {
                            info!(key = %key, "Recorded missing-rate diagnostic");
                            self.recorded_misses.insert(key, ());
                        }
                        Err(e) => {
                            warn!(key = %key, error = %e, "Failed to record missing rate")
                        }
                    }
                }
                Err(e) => warn!(key = %key, error = %e, "Missing-rate lookup failed"),
            }
        }
    }

    /// List recorded missing-rate diagnostics
    pub async fn list_missing_rates(&self) -> Result<Vec<MissingRateDoc>> {
        self.missing_rates
            .find_many_with_options(
                doc! {},
                Some(FindOptions::builder().sort(doc! { "key": 1 }).build()),
            )
            .await
    }
}
