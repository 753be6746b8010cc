//! Attribution side-channel
//!
//! At policy creation the house agent's commission share is forwarded to
//! an external webhook (ad attribution / CRM sync). Delivery is
//! fire-and-forget: a failed POST is logged, never surfaced to the
//! request that created the policy.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Payload posted to the attribution webhook
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionEvent {
    pub policy_number: String,
    /// House agent's share of the immediate commission
    pub amount: f64,
    /// Lead source attribution string from the policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Forwards attribution events to the configured webhook
#[derive(Clone)]
pub struct AttributionForwarder {
    client: reqwest::Client,
    url: Option<String>,
}

impl AttributionForwarder {
    /// Create a forwarder; `url: None` disables forwarding
    pub fn new(url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, url }
    }

    pub fn enabled(&self) -> bool {
        self.url.is_some()
    }

    /// Send an event without blocking the caller
    pub fn spawn_forward(&self, event: AttributionEvent) {
        let Some(url) = self.url.clone() else {
            debug!(
                policy = %event.policy_number,
                "Attribution forwarding disabled, dropping event"
            );
            return;
        };
        let client = self.client.clone();

        tokio::spawn(async move {
            match client.post(&url).json(&event).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!(
                        policy = %event.policy_number,
                        amount = event.amount,
                        "Attribution event forwarded"
                    );
                }
                Ok(resp) => {
                    warn!(
                        policy = %event.policy_number,
                        status = %resp.status(),
                        "Attribution webhook rejected event"
                    );
                }
                Err(e) => {
                    warn!(
                        policy = %event.policy_number,
                        error = %e,
                        "Attribution webhook unreachable"
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_forwarder() {
        let forwarder = AttributionForwarder::new(None);
        assert!(!forwarder.enabled());
    }

    #[test]
    fn test_disabled_forwarder_drops_events() {
        tokio_test::block_on(async {
            let forwarder = AttributionForwarder::new(None);
            forwarder.spawn_forward(AttributionEvent {
                policy_number: "P-1".to_string(),
                amount: 0.0,
                source: None,
            });
        });
    }

    #[test]
    fn test_event_serialization() {
        let event = AttributionEvent {
            policy_number: "P-100".to_string(),
            amount: 120.0,
            source: Some("meta-ads".to_string()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["policyNumber"], "P-100");
        assert_eq!(json["amount"], 120.0);
        assert_eq!(json["source"], "meta-ads");
    }
}
