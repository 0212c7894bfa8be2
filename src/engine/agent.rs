//! The `Agent` enum: per Design Notes §9, the three cooperating roles are
//! not three trait objects behind dynamic dispatch but variants of one
//! small enum. The router resolves a recipient ID to an `Agent` and
//! dispatches to whichever variant's handler logic applies.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Demand, Feedback, Gap, Offer, Proposal, SubChannelOutcome};
use crate::error::RouterError;
use crate::router::InboundHandler;

use super::channel_admin::ChannelAdministrator;
use super::coordinator::Coordinator;
use super::user_agent::UserAgent;

/// Every message shape the three agent roles exchange through the router.
#[derive(Debug, Clone)]
pub enum AgentMessage {
    /// A new top-level demand, addressed to the Coordinator.
    NewDemand { raw_text: String, submitter_id: String },
    /// A gap-synthesized sub-demand, addressed to the Coordinator.
    SubnetDemand {
        parent_channel_id: String,
        parent_demand_id: Uuid,
        gap: Gap,
        depth: u32,
    },
    /// Ask the Channel Administrator to start managing a freshly created
    /// channel, addressed to the Channel Administrator.
    StartManaging {
        channel_id: String,
        demand: Demand,
        invitees: std::collections::HashSet<String>,
        max_rounds: u32,
        /// `Some` only for a channel spawned to fill a gap in another
        /// channel's proposal.
        parent: Option<SubChannelParent>,
    },
    /// An invitation to respond to a demand, addressed to a User Agent.
    DemandOffer {
        demand: Demand,
        channel_id: String,
        selection_reason: String,
    },
    /// A distributed proposal awaiting the user's reaction, addressed to a
    /// User Agent.
    ProposalReview {
        channel_id: String,
        proposal: Proposal,
    },
    /// A User Agent's offer, addressed to the Channel Administrator.
    Offer {
        channel_id: String,
        agent_id: String,
        offer: Offer,
    },
    /// A User Agent's feedback, addressed to the Channel Administrator.
    Feedback {
        channel_id: String,
        agent_id: String,
        feedback: Feedback,
    },
    /// A terminated sub-channel's outcome, addressed to the parent
    /// channel's Channel Administrator.
    SubChannelResult {
        parent_channel_id: String,
        sub_channel_id: String,
        gap_id: Uuid,
        outcome: SubChannelOutcome,
    },
}

/// Identifies which gap, in which parent channel, a sub-channel was spawned
/// to fill. Carried on `StartManaging` so the sub-channel's driver knows
/// where to report its outcome, and echoed back on `SubChannelResult`.
#[derive(Debug, Clone)]
pub struct SubChannelParent {
    pub channel_id: String,
    pub gap_id: Uuid,
}

impl AgentMessage {
    /// Stable discriminant used as the `message type` component of the
    /// router's delivery fingerprint.
    pub fn type_name(&self) -> &'static str {
        match self {
            AgentMessage::NewDemand { .. } => "new_demand",
            AgentMessage::SubnetDemand { .. } => "subnet_demand",
            AgentMessage::StartManaging { .. } => "start_managing",
            AgentMessage::DemandOffer { .. } => "demand_offer",
            AgentMessage::ProposalReview { .. } => "proposal_review",
            AgentMessage::Offer { .. } => "offer",
            AgentMessage::Feedback { .. } => "feedback",
            AgentMessage::SubChannelResult { .. } => "sub_channel_result",
        }
    }

    /// The channel this message concerns, if any — used as part of the
    /// delivery fingerprint and, for offers/feedback, the dedup window.
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            AgentMessage::DemandOffer { channel_id, .. }
            | AgentMessage::ProposalReview { channel_id, .. }
            | AgentMessage::Offer { channel_id, .. }
            | AgentMessage::Feedback { channel_id, .. }
            | AgentMessage::StartManaging { channel_id, .. } => Some(channel_id.as_str()),
            AgentMessage::SubChannelResult {
                parent_channel_id, ..
            } => Some(parent_channel_id.as_str()),
            AgentMessage::NewDemand { .. } | AgentMessage::SubnetDemand { .. } => None,
        }
    }
}

/// One of the two system singletons or a per-user representative.
#[derive(Clone)]
pub enum Agent {
    Coordinator(Arc<Coordinator>),
    ChannelAdmin(Arc<ChannelAdministrator>),
    UserAgent(Arc<UserAgent>),
}

#[async_trait]
impl InboundHandler for Agent {
    async fn handle(&self, message: AgentMessage) -> Result<(), RouterError> {
        match self {
            Agent::Coordinator(coordinator) => coordinator.handle(message).await,
            Agent::ChannelAdmin(admin) => admin.handle(message).await,
            Agent::UserAgent(user) => user.handle(message).await,
        }
    }
}
