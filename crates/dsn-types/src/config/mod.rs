//! Shared configuration for Distributed Sentience Network components.

use serde::{Deserialize, Serialize};

/// Network-wide tunables governing consensus thresholds, evaluation
/// budgets, and transport behavior.
///
/// Every field carries a default matching the specification's knobs table,
/// so a node can start from `DsnConfig::default()` and override only what a
/// deployment needs via its config file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DsnConfig {
    /// Minimum fraction of weighted votes that must agree for a proposal to
    /// be accepted into the GMF.
    #[serde(default = "default_coherence_threshold")]
    pub coherence_threshold: f64,
    /// Minimum unweighted agreement fraction (`Proposal::redundancy_score`)
    /// required alongside `coherence_threshold`.
    #[serde(default = "default_redundancy_threshold")]
    pub redundancy_threshold: f64,
    /// Minimum local-field coherence a node requires of itself before its
    /// vote counts at full weight.
    #[serde(default = "default_stability_threshold")]
    pub stability_threshold: f64,
    /// Minimum number of distinct voters before a proposal can finalize.
    #[serde(default = "default_voting_quorum")]
    pub voting_quorum: usize,
    /// Maximum reduction steps the evaluator will take before declaring a
    /// term `Undefined` for exceeding its budget.
    #[serde(default = "default_max_eval_steps")]
    pub max_eval_steps: u64,
    /// Maximum number of entries retained in the proposal log ring buffer;
    /// oldest entries are dropped once exceeded.
    #[serde(default = "default_proposal_log_cap")]
    pub proposal_log_cap: usize,
    /// Maximum number of messages a transport's outbound queue may hold
    /// before applying backpressure.
    #[serde(default = "default_transport_queue_cap")]
    pub transport_queue_cap: usize,
    /// Maximum number of reconnect attempts before a transport gives up.
    #[serde(default = "default_reconnect_max_attempts")]
    pub reconnect_max_attempts: u32,
    /// Base delay, in milliseconds, for exponential-backoff reconnection.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Interval, in milliseconds, at which a memory broker sweeps expired
    /// entries.
    #[serde(default = "default_broker_cleanup_interval_ms")]
    pub broker_cleanup_interval_ms: u64,
    /// Interval, in milliseconds, at which a WebSocket transport pings its
    /// peer to detect silent disconnects.
    #[serde(default = "default_ws_ping_interval_ms")]
    pub ws_ping_interval_ms: u64,
    /// Timeout, in milliseconds, for a single long-poll HTTP request.
    #[serde(default = "default_long_poll_timeout_ms")]
    pub long_poll_timeout_ms: u64,
    /// Interval, in milliseconds, between polls for transports with no
    /// native push mechanism.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_coherence_threshold() -> f64 {
    0.7
}
fn default_redundancy_threshold() -> f64 {
    0.6
}
fn default_stability_threshold() -> f64 {
    0.5
}
fn default_voting_quorum() -> usize {
    3
}
fn default_max_eval_steps() -> u64 {
    1000
}
fn default_proposal_log_cap() -> usize {
    10_000
}
fn default_transport_queue_cap() -> usize {
    1000
}
fn default_reconnect_max_attempts() -> u32 {
    5
}
fn default_reconnect_base_delay_ms() -> u64 {
    1000
}
fn default_broker_cleanup_interval_ms() -> u64 {
    60_000
}
fn default_ws_ping_interval_ms() -> u64 {
    30_000
}
fn default_long_poll_timeout_ms() -> u64 {
    30_000
}
fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for DsnConfig {
    fn default() -> Self {
        Self {
            coherence_threshold: default_coherence_threshold(),
            redundancy_threshold: default_redundancy_threshold(),
            stability_threshold: default_stability_threshold(),
            voting_quorum: default_voting_quorum(),
            max_eval_steps: default_max_eval_steps(),
            proposal_log_cap: default_proposal_log_cap(),
            transport_queue_cap: default_transport_queue_cap(),
            reconnect_max_attempts: default_reconnect_max_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            broker_cleanup_interval_ms: default_broker_cleanup_interval_ms(),
            ws_ping_interval_ms: default_ws_ping_interval_ms(),
            long_poll_timeout_ms: default_long_poll_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl DsnConfig {
    /// Validates cross-field invariants the per-field defaults alone can't
    /// express.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("coherence_threshold", self.coherence_threshold),
            ("redundancy_threshold", self.redundancy_threshold),
            ("stability_threshold", self.stability_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("Configuration Error: '{name}' must be in [0, 1], got {value}"));
            }
        }
        if self.voting_quorum == 0 {
            return Err("Configuration Error: 'voting_quorum' must be greater than 0.".to_string());
        }
        if self.max_eval_steps == 0 {
            return Err("Configuration Error: 'max_eval_steps' must be greater than 0.".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_knobs_table() {
        let config = DsnConfig::default();
        assert_eq!(config.coherence_threshold, 0.7);
        assert_eq!(config.redundancy_threshold, 0.6);
        assert_eq!(config.stability_threshold, 0.5);
        assert_eq!(config.voting_quorum, 3);
        assert_eq!(config.max_eval_steps, 1000);
        assert_eq!(config.proposal_log_cap, 10_000);
        assert_eq!(config.transport_queue_cap, 1000);
        assert_eq!(config.reconnect_max_attempts, 5);
        assert_eq!(config.reconnect_base_delay_ms, 1000);
        assert_eq!(config.broker_cleanup_interval_ms, 60_000);
        assert_eq!(config.ws_ping_interval_ms, 30_000);
        assert_eq!(config.long_poll_timeout_ms, 30_000);
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn empty_json_object_fills_in_every_default() {
        let config: DsnConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DsnConfig::default());
    }

    #[test]
    fn validate_rejects_out_of_range_thresholds() {
        let mut config = DsnConfig::default();
        config.coherence_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_quorum() {
        let mut config = DsnConfig::default();
        config.voting_quorum = 0;
        assert!(config.validate().is_err());
    }
}
