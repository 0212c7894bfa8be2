//! The Oracle Adapter: a small, typed, latency-bounded, failure-tolerant
//! interface to a language-model oracle.
//!
//! [`OracleService`] is the trait a concrete LLM-backed implementation (or a
//! test double) implements, mirroring how this codebase already abstracts
//! over concrete model providers via `ClientWrapper`. [`SupervisedOracle`]
//! wraps any `Arc<dyn OracleService>` with the timeout, circuit breaker, and
//! fallback machinery described in the spec, so that machinery is exercised
//! uniformly regardless of which oracle is plugged in underneath.

mod circuit_breaker;
mod fallback;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use fallback::FallbackRecord;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{Config, OracleOperation};
use crate::domain::{AgentProfile, Demand, Feedback, Gap, Offer, Proposal};
use crate::error::OracleError;
use crate::events::EventBus;

/// Result of `understandDemand`.
#[derive(Debug, Clone)]
pub struct DemandUnderstanding {
    pub surface: String,
    pub deep: Value,
    pub tags: HashSet<String>,
    pub uncertainties: Vec<String>,
    pub confidence: u8,
}

/// One entry of `filterCandidates`'s result.
#[derive(Debug, Clone)]
pub struct FilteredCandidate {
    pub agent_id: String,
    pub reason: String,
}

/// Result of `adjustProposal`.
#[derive(Debug, Clone)]
pub struct Adjustment {
    pub proposal: Proposal,
    pub should_continue: bool,
}

/// The seven typed operations the negotiation engine asks of the oracle.
///
/// Implementations must be `Send + Sync`; a single implementation instance
/// is shared behind `Arc` across every channel driver in the engine.
#[async_trait]
pub trait OracleService: Send + Sync {
    async fn understand_demand(&self, raw_text: &str) -> Result<DemandUnderstanding, OracleError>;

    async fn filter_candidates(
        &self,
        demand: &Demand,
        profiles: &[AgentProfile],
    ) -> Result<Vec<FilteredCandidate>, OracleError>;

    async fn generate_offer_response(
        &self,
        demand: &Demand,
        profile: &AgentProfile,
        filter_reason: &str,
    ) -> Result<Offer, OracleError>;

    async fn aggregate_offers(
        &self,
        demand: &Demand,
        offers: &[Offer],
    ) -> Result<Proposal, OracleError>;

    async fn adjust_proposal(
        &self,
        current: &Proposal,
        feedback: &[Feedback],
    ) -> Result<Adjustment, OracleError>;

    async fn identify_gaps(
        &self,
        demand: &Demand,
        proposal: &Proposal,
    ) -> Result<Vec<Gap>, OracleError>;

    async fn judge_recursion(
        &self,
        gaps: &[Gap],
        depth: u32,
        time_remaining: std::time::Duration,
    ) -> Result<Vec<Gap>, OracleError>;
}

/// Running totals of how `SupervisedOracle` has handled calls. Published as
/// `oracle.call_completed`/`oracle.circuit_*` event payloads.
#[derive(Debug, Default)]
pub struct OracleStats {
    pub total: AtomicU64,
    pub success: AtomicU64,
    pub timeout: AtomicU64,
    pub failure: AtomicU64,
    pub fallback: AtomicU64,
}

impl OracleStats {
    fn snapshot(&self) -> Value {
        serde_json::json!({
            "total": self.total.load(Ordering::Relaxed),
            "success": self.success.load(Ordering::Relaxed),
            "timeout": self.timeout.load(Ordering::Relaxed),
            "failure": self.failure.load(Ordering::Relaxed),
            "fallback": self.fallback.load(Ordering::Relaxed),
        })
    }
}

/// Wraps an inner [`OracleService`] with a bounded timeout, a three-state
/// circuit breaker, and a deterministic per-operation fallback table.
///
/// Every public method here is infallible from the caller's perspective: a
/// timeout, upstream failure, or open circuit never surfaces as an `Err` —
/// it degrades to [`FallbackRecord::fallback_for`]'s record for that operation and the
/// degradation is published onto the event bus instead.
pub struct SupervisedOracle {
    inner: Arc<dyn OracleService>,
    breaker: CircuitBreaker,
    config: Arc<Config>,
    events: Arc<EventBus>,
    stats: OracleStats,
}

impl SupervisedOracle {
    pub fn new(inner: Arc<dyn OracleService>, config: Arc<Config>, events: Arc<EventBus>) -> Self {
        let breaker = CircuitBreaker::new(
            config.circuit_breaker_failure_threshold,
            config.circuit_breaker_cooldown,
        );
        Self {
            inner,
            breaker,
            config,
            events,
            stats: OracleStats::default(),
        }
    }

    async fn call<T, F>(&self, op: OracleOperation, fut: F) -> T
    where
        F: std::future::Future<Output = Result<T, OracleError>>,
        T: FallbackRecord,
    {
        self.stats.total.fetch_add(1, Ordering::Relaxed);
        self.events.publish_sync(crate::domain::Event::new(
            "oracle.call_started",
            "oracle_adapter",
            serde_json::json!({ "operation": format!("{op:?}") }),
        ));

        if !self.breaker.allow_call() {
            self.stats.fallback.fetch_add(1, Ordering::Relaxed);
            self.publish_degraded(op, "circuit_open");
            return T::fallback_for(op);
        }

        let timeout = self.config.oracle_timeout_for(op);
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => {
                self.stats.success.fetch_add(1, Ordering::Relaxed);
                if self.breaker.record_success() {
                    self.publish_circuit_transition(op, "oracle.circuit_closed");
                }
                self.publish_completed(op, "success", None);
                value
            }
            Ok(Err(err)) => {
                self.stats.failure.fetch_add(1, Ordering::Relaxed);
                self.stats.fallback.fetch_add(1, Ordering::Relaxed);
                if self.breaker.record_failure() {
                    self.publish_circuit_transition(op, "oracle.circuit_opened");
                }
                self.publish_degraded(op, &err.to_string());
                T::fallback_for(op)
            }
            Err(_elapsed) => {
                self.stats.timeout.fetch_add(1, Ordering::Relaxed);
                self.stats.fallback.fetch_add(1, Ordering::Relaxed);
                if self.breaker.record_failure() {
                    self.publish_circuit_transition(op, "oracle.circuit_opened");
                }
                self.publish_degraded(op, "timeout");
                T::fallback_for(op)
            }
        }
    }

    fn publish_completed(&self, op: OracleOperation, outcome: &str, reason: Option<&str>) {
        self.events.publish_sync(crate::domain::Event::new(
            "oracle.call_completed",
            "oracle_adapter",
            serde_json::json!({
                "operation": format!("{op:?}"),
                "outcome": outcome,
                "reason": reason,
                "breaker_state": self.breaker.state_label(),
                "stats": self.stats.snapshot(),
            }),
        ));
    }

    fn publish_degraded(&self, op: OracleOperation, reason: &str) {
        log::warn!("oracle call {op:?} degraded to fallback: {reason}");
        self.publish_completed(op, "fallback", Some(reason));
    }

    fn publish_circuit_transition(&self, op: OracleOperation, event_type: &'static str) {
        if event_type == "oracle.circuit_opened" {
            log::warn!("oracle circuit breaker opened for {op:?}");
        } else {
            log::info!("oracle circuit breaker closed for {op:?}");
        }
        self.events.publish_sync(crate::domain::Event::new(
            event_type,
            "oracle_adapter",
            serde_json::json!({
                "operation": format!("{op:?}"),
                "breaker_state": self.breaker.state_label(),
            }),
        ));
    }

    pub fn stats_snapshot(&self) -> Value {
        self.stats.snapshot()
    }
}

impl SupervisedOracle {
    pub async fn understand_demand(&self, raw_text: &str) -> DemandUnderstanding {
        self.call(
            OracleOperation::UnderstandDemand,
            self.inner.understand_demand(raw_text),
        )
        .await
    }

    pub async fn filter_candidates(
        &self,
        demand: &Demand,
        profiles: &[AgentProfile],
    ) -> Vec<FilteredCandidate> {
        self.call(
            OracleOperation::FilterCandidates,
            self.inner.filter_candidates(demand, profiles),
        )
        .await
    }

    pub async fn generate_offer_response(
        &self,
        demand: &Demand,
        profile: &AgentProfile,
        filter_reason: &str,
    ) -> Offer {
        self.call(
            OracleOperation::GenerateOfferResponse,
            self.inner
                .generate_offer_response(demand, profile, filter_reason),
        )
        .await
    }

    pub async fn aggregate_offers(&self, demand: &Demand, offers: &[Offer]) -> Proposal {
        self.call(
            OracleOperation::AggregateOffers,
            self.inner.aggregate_offers(demand, offers),
        )
        .await
    }

    pub async fn adjust_proposal(&self, current: &Proposal, feedback: &[Feedback]) -> Adjustment {
        self.call(
            OracleOperation::AdjustProposal,
            self.inner.adjust_proposal(current, feedback),
        )
        .await
    }

    pub async fn identify_gaps(&self, demand: &Demand, proposal: &Proposal) -> Vec<Gap> {
        self.call(
            OracleOperation::IdentifyGaps,
            self.inner.identify_gaps(demand, proposal),
        )
        .await
    }

    pub async fn judge_recursion(
        &self,
        gaps: &[Gap],
        depth: u32,
        time_remaining: std::time::Duration,
    ) -> Vec<Gap> {
        self.call(
            OracleOperation::JudgeRecursion,
            self.inner.judge_recursion(gaps, depth, time_remaining),
        )
        .await
    }
}
