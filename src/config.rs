//! Runtime configuration for the negotiation engine.
//!
//! Mirrors [`CloudLLMConfig`](crate::config)'s philosophy: a plain struct with
//! public fields and a `Default` impl. No TOML/YAML/env-var parsing dependency
//! is introduced here — callers construct a [`Config`] however they like.

use std::collections::HashMap;
use std::time::Duration;

/// Identifies one of the seven oracle operations, for per-operation timeout
/// overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleOperation {
    UnderstandDemand,
    FilterCandidates,
    GenerateOfferResponse,
    AggregateOffers,
    AdjustProposal,
    IdentifyGaps,
    JudgeRecursion,
}

/// Tunables for the negotiation engine.
///
/// # Example
///
/// ```rust
/// use negotiation_engine::Config;
///
/// let config = Config::default();
/// assert_eq!(config.max_rounds, 3);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of negotiation rounds per channel.
    pub max_rounds: u32,
    /// How long the administrator waits for offers before aggregating anyway.
    pub collection_deadline: Duration,
    /// How long the administrator waits for feedback within a single round.
    pub negotiation_round_deadline: Duration,
    /// Accept-rate threshold at or above which a channel finalizes.
    pub accept_rate_threshold: f64,
    /// Withdraw-rate threshold above which a channel fails outright.
    pub withdraw_rate_threshold: f64,
    /// Whether a participant who never responds in NEGOTIATING is treated as
    /// an implicit accept once the round deadline fires.
    pub implicit_accept_on_silence: bool,
    /// Deepest a recursive sub-channel may go (0 = top-level only).
    pub max_recursion_depth: u32,
    /// Maximum direct sub-channels a single channel may spawn.
    pub max_subnets_per_channel: u32,
    /// Default wall-clock budget for any oracle call.
    pub oracle_call_timeout: Duration,
    /// Per-operation overrides of `oracle_call_timeout`.
    pub oracle_call_timeout_overrides: HashMap<OracleOperation, Duration>,
    /// Consecutive oracle failures before the circuit breaker opens.
    pub circuit_breaker_failure_threshold: u32,
    /// How long the circuit stays open before allowing a half-open probe.
    pub circuit_breaker_cooldown: Duration,
    /// Width of the router's at-most-once delivery dedup window.
    pub router_dedup_window: Duration,
    /// Capacity of the event recorder's ring buffer.
    pub event_ring_capacity: usize,
    /// Capacity of each subscriber's multiplexed event queue.
    pub subscriber_queue_capacity: usize,
}

impl Config {
    /// Resolve the timeout budget for a specific oracle operation, falling
    /// back to [`Config::oracle_call_timeout`] when no override is set.
    pub fn oracle_timeout_for(&self, op: OracleOperation) -> Duration {
        self.oracle_call_timeout_overrides
            .get(&op)
            .copied()
            .unwrap_or(self.oracle_call_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            collection_deadline: Duration::from_secs(120),
            negotiation_round_deadline: Duration::from_secs(120),
            accept_rate_threshold: 0.8,
            withdraw_rate_threshold: 0.5,
            implicit_accept_on_silence: true,
            max_recursion_depth: 2,
            max_subnets_per_channel: 3,
            oracle_call_timeout: Duration::from_secs(10),
            oracle_call_timeout_overrides: HashMap::new(),
            circuit_breaker_failure_threshold: 3,
            circuit_breaker_cooldown: Duration::from_secs(30),
            router_dedup_window: Duration::from_secs(5),
            event_ring_capacity: 1000,
            subscriber_queue_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_constants() {
        let config = Config::default();
        assert_eq!(config.max_rounds, 3);
        assert_eq!(config.max_recursion_depth, 2);
        assert_eq!(config.max_subnets_per_channel, 3);
        assert!(config.implicit_accept_on_silence);
    }

    #[test]
    fn per_operation_override_wins() {
        let mut config = Config::default();
        config
            .oracle_call_timeout_overrides
            .insert(OracleOperation::AggregateOffers, Duration::from_secs(2));
        assert_eq!(
            config.oracle_timeout_for(OracleOperation::AggregateOffers),
            Duration::from_secs(2)
        );
        assert_eq!(
            config.oracle_timeout_for(OracleOperation::FilterCandidates),
            Duration::from_secs(10)
        );
    }
}
