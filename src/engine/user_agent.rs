//! User Agent: a per-user representative, lazily materialized by the
//! registry on first message. Reacts to invitations and proposal reviews
//! on the user's behalf by consulting the oracle, never the user directly.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;

use crate::domain::{AgentProfile, Event};
use crate::error::RouterError;
use crate::events::EventBus;
use crate::oracle::SupervisedOracle;
use crate::router::{AgentRouter, InboundHandler};

use super::agent::AgentMessage;

pub struct UserAgent {
    pub profile: AgentProfile,
    oracle: Arc<SupervisedOracle>,
    events: EventBus,
    router: OnceLock<Arc<AgentRouter>>,
    /// Channels this agent has already submitted an offer for — guards
    /// against a redelivered `DemandOffer` producing a second offer.
    offered: Mutex<HashSet<String>>,
}

impl UserAgent {
    pub fn new(profile: AgentProfile, oracle: Arc<SupervisedOracle>, events: EventBus) -> Self {
        Self {
            profile,
            oracle,
            events,
            router: OnceLock::new(),
            offered: Mutex::new(HashSet::new()),
        }
    }

    pub fn set_router(&self, router: Arc<AgentRouter>) {
        let _ = self.router.set(router);
    }

    fn router(&self) -> Arc<AgentRouter> {
        self.router
            .get()
            .cloned()
            .expect("router must be set before a user agent handles any message")
    }

    async fn on_demand_offer(
        &self,
        demand: crate::domain::Demand,
        channel_id: String,
        selection_reason: String,
    ) {
        {
            let mut offered = self.offered.lock().unwrap();
            if !offered.insert(channel_id.clone()) {
                return;
            }
        }

        let mut offer = self
            .oracle
            .generate_offer_response(&demand, &self.profile, &selection_reason)
            .await;
        offer.channel_id = channel_id.clone();
        offer.responder_agent_id = self.profile.id.clone();

        self.events.publish(Event::new(
            "offer.generated",
            &format!("user_agent_{}", self.profile.id),
            serde_json::json!({ "channelID": channel_id, "decision": format!("{:?}", offer.decision) }),
        ));

        let _ = self
            .router()
            .route(
                &format!("user_agent_{}", self.profile.id),
                "channel_administrator",
                "offer",
                Some(&channel_id),
                AgentMessage::Offer {
                    channel_id: channel_id.clone(),
                    agent_id: self.profile.id.clone(),
                    offer,
                },
            )
            .await;
    }

    /// The oracle's seven operations have no dedicated "judge this proposal"
    /// call, so the reaction is derived from the user's own assignment: no
    /// assignment means the proposal dropped this user (withdraw); an
    /// assignment whose conditions the aggregator already accepted is a
    /// clean accept; anything else asks for a renegotiation.
    async fn on_proposal_review(&self, channel_id: String, proposal: crate::domain::Proposal) {
        let assignment = proposal
            .assignments
            .iter()
            .find(|a| a.agent_id == self.profile.id)
            .cloned();

        let feedback = match assignment {
            None => crate::domain::Feedback {
                channel_id: channel_id.clone(),
                version: proposal.version,
                agent_id: self.profile.id.clone(),
                kind: crate::domain::FeedbackKind::Withdraw,
                requested_adjustment: None,
                rationale: "no role assigned in this proposal".to_string(),
            },
            Some(assignment) if assignment.accepted_conditions => crate::domain::Feedback {
                channel_id: channel_id.clone(),
                version: proposal.version,
                agent_id: self.profile.id.clone(),
                kind: crate::domain::FeedbackKind::Accept,
                requested_adjustment: None,
                rationale: String::new(),
            },
            Some(assignment) => crate::domain::Feedback {
                channel_id: channel_id.clone(),
                version: proposal.version,
                agent_id: self.profile.id.clone(),
                kind: crate::domain::FeedbackKind::Negotiate,
                requested_adjustment: Some(format!(
                    "revisit conditions for role {}",
                    assignment.role
                )),
                rationale: "assigned conditions were not fully accepted".to_string(),
            },
        };

        let _ = self
            .router()
            .route(
                &format!("user_agent_{}", self.profile.id),
                "channel_administrator",
                "feedback",
                Some(&channel_id),
                AgentMessage::Feedback {
                    channel_id: channel_id.clone(),
                    agent_id: self.profile.id.clone(),
                    feedback,
                },
            )
            .await;
    }
}

#[async_trait]
impl InboundHandler for UserAgent {
    async fn handle(&self, message: AgentMessage) -> Result<(), RouterError> {
        match message {
            AgentMessage::DemandOffer {
                demand,
                channel_id,
                selection_reason,
            } => {
                self.on_demand_offer(demand, channel_id, selection_reason)
                    .await;
                Ok(())
            }
            AgentMessage::ProposalReview {
                channel_id,
                proposal,
            } => {
                self.on_proposal_review(channel_id, proposal).await;
                Ok(())
            }
            other => Err(RouterError::HandlerFailed(format!(
                "user agent cannot handle {}",
                other.type_name()
            ))),
        }
    }
}
