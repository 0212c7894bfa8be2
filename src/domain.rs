//! Core data model: the entities described in the negotiation engine's
//! domain — agents, demands, offers, proposals, feedback, channels, and
//! events. Every type that crosses a component boundary derives `Serialize`/
//! `Deserialize` so an external façade can put it on the wire unchanged.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A read-only, externally-owned description of one human user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub display_name: String,
    pub location: Option<String>,
    pub capability_tags: HashSet<String>,
    pub interests: Vec<String>,
    pub availability: Option<String>,
    pub self_description: String,
}

/// Lifecycle status of a [`Demand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemandStatus {
    Submitted,
    Understood,
    Filtered,
    ChannelCreated,
    Failed,
}

/// A user-submitted (or gap-synthesized) request for collaboration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demand {
    pub id: Uuid,
    pub submitter_id: String,
    pub raw_text: String,
    pub surface_form: Option<String>,
    pub deep_understanding: Option<serde_json::Value>,
    pub capability_tags: HashSet<String>,
    pub parent_demand_id: Option<Uuid>,
    pub recursion_depth: u32,
    pub status: DemandStatus,
}

impl Demand {
    /// A fresh top-level demand, depth 0, status `Submitted`.
    pub fn new_top_level(raw_text: impl Into<String>, submitter_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            submitter_id: submitter_id.into(),
            raw_text: raw_text.into(),
            surface_form: None,
            deep_understanding: None,
            capability_tags: HashSet::new(),
            parent_demand_id: None,
            recursion_depth: 0,
            status: DemandStatus::Submitted,
        }
    }

    /// A sub-demand synthesized from a capability [`Gap`] in a parent
    /// channel's proposal.
    pub fn new_sub_demand(
        raw_text: impl Into<String>,
        submitter_id: impl Into<String>,
        parent_demand_id: Uuid,
        recursion_depth: u32,
    ) -> Self {
        Self {
            parent_demand_id: Some(parent_demand_id),
            recursion_depth,
            ..Self::new_top_level(raw_text, submitter_id)
        }
    }
}

/// A candidate's decision when responding to a demand broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Participate,
    Decline,
    Conditional,
}

/// One candidate's response to an invitation. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub demand_id: Uuid,
    pub channel_id: String,
    pub responder_agent_id: String,
    pub decision: Decision,
    pub contribution: String,
    pub conditions: Vec<String>,
    pub confidence: u8,
    pub rationale: String,
}

/// One role allocated to one participant within a [`Proposal`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub agent_id: String,
    pub role: String,
    pub responsibility: String,
    pub accepted_conditions: bool,
}

/// A versioned, concrete allocation of roles produced by aggregation or
/// adjustment. Each round increments `version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub channel_id: String,
    pub version: u32,
    pub summary: String,
    pub assignments: Vec<Assignment>,
    pub timeline_hint: Option<String>,
    pub open_questions: Vec<String>,
    pub overall_confidence: u8,
}

impl Proposal {
    /// The set of agent IDs named in this proposal's assignments — by
    /// construction, the channel's participant set.
    pub fn participant_ids(&self) -> HashSet<String> {
        self.assignments.iter().map(|a| a.agent_id.clone()).collect()
    }
}

/// A participant's reaction to a distributed [`Proposal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackKind {
    Accept,
    Negotiate,
    Withdraw,
}

/// One participant's feedback for one round of one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub channel_id: String,
    pub version: u32,
    pub agent_id: String,
    pub kind: FeedbackKind,
    pub requested_adjustment: Option<String>,
    pub rationale: String,
}

/// A capability or resource missing from an aggregated proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gap {
    pub id: Uuid,
    pub description: String,
    pub importance: u8,
}

/// States of the Channel Administrator's per-channel state machine.
/// See `SPEC_FULL.md` §4.2 for the full transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelStatus {
    Created,
    Broadcasting,
    Collecting,
    Aggregating,
    ProposalSent,
    Negotiating,
    Finalized,
    Failed,
}

impl ChannelStatus {
    /// FINALIZED and FAILED are terminal; nothing transitions out of them.
    pub fn is_terminal(self) -> bool {
        matches!(self, ChannelStatus::Finalized | ChannelStatus::Failed)
    }
}

/// The set of agent IDs a channel has invited, who has responded, and who
/// is actually participating. `participants ⊆ responded ⊆ invited` is a
/// maintained invariant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Participation {
    pub invited: HashSet<String>,
    pub responded: HashSet<String>,
    pub participating: HashSet<String>,
}

impl Participation {
    pub fn invariant_holds(&self) -> bool {
        self.participating.is_subset(&self.responded) && self.responded.is_subset(&self.invited)
    }
}

/// The outcome of a terminated sub-channel, recorded against the gap that
/// spawned it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SubChannelOutcome {
    Finalized(Box<Proposal>),
    Failed(String),
}

/// Why a demand's negotiation ended without a plan. See `SPEC_FULL.md` §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    NoCandidates,
    NoResponses,
    MajorityRejected,
    CoreParticipantWithdrew,
    MaxRoundsNoConsensus,
    Internal,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::NoCandidates => "no_candidates",
            FailureReason::NoResponses => "no_responses",
            FailureReason::MajorityRejected => "majority_rejected",
            FailureReason::CoreParticipantWithdrew => "core_participant_withdrew",
            FailureReason::MaxRoundsNoConsensus => "max_rounds_no_consensus",
            FailureReason::Internal => "internal",
        }
    }
}

/// The unit of negotiation created for one demand.
///
/// Owned and mutated exclusively by the channel's driver task; other
/// components only ever see a cloned snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub demand: Demand,
    pub participation: Participation,
    pub current_proposal: Option<Proposal>,
    pub round: u32,
    pub status: ChannelStatus,
    pub parent_channel_id: Option<String>,
    /// Set only on a channel spawned to fill a gap in a parent's proposal —
    /// the key this channel's own outcome gets reported back under.
    pub gap_id: Option<Uuid>,
    pub recursion_depth: u32,
    #[serde(skip)]
    pub processed_fingerprints: HashSet<u64>,
    pub pending_subchannels: HashMap<Uuid, Option<SubChannelOutcome>>,
}

impl Channel {
    pub fn new(id: String, demand: Demand, invited: HashSet<String>) -> Self {
        let recursion_depth = demand.recursion_depth;
        Self {
            id,
            demand,
            participation: Participation {
                invited,
                responded: HashSet::new(),
                participating: HashSet::new(),
            },
            current_proposal: None,
            round: 0,
            status: ChannelStatus::Created,
            parent_channel_id: None,
            gap_id: None,
            recursion_depth,
            processed_fingerprints: HashSet::new(),
            pending_subchannels: HashMap::new(),
        }
    }

    /// A channel spawned by `ChannelAdministrator::start_managing` to fill
    /// a gap in some other channel's proposal, rather than from a top-level
    /// demand.
    pub fn new_sub_channel(
        id: String,
        demand: Demand,
        invited: HashSet<String>,
        parent_channel_id: String,
        gap_id: Uuid,
    ) -> Self {
        let mut channel = Self::new(id, demand, invited);
        channel.parent_channel_id = Some(parent_channel_id);
        channel.gap_id = Some(gap_id);
        channel
    }

    /// Derive a channel ID from a demand's UUID, per `collab-<first-8>`.
    pub fn id_for_demand(demand_id: Uuid) -> String {
        format!("collab-{}", &demand_id.simple().to_string()[..8])
    }
}

/// Something happened in the engine. Append-only into the bus/recorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub source_agent: String,
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(
        event_type: impl Into<String>,
        source_agent: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            source_agent: source_agent.into(),
            payload,
        }
    }
}
