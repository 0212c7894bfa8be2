//! Coordinator: one of the two process-wide singletons. Owns the
//! understand → filter → create-channel pipeline for top-level demands
//! (§4.3) and the narrower variant for gap-synthesized sub-demands.
//!
//! Each demand runs to completion on its own `tokio::spawn`'d task so
//! demands are concurrent with each other but a single demand's pipeline
//! stays causally ordered — matching §5's "single-threaded per demand,
//! concurrent across demands" requirement.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::config::Config;
use crate::domain::{Channel, Demand, Event, Gap};
use crate::error::RouterError;
use crate::events::EventBus;
use crate::oracle::SupervisedOracle;
use crate::registry::ProfileRepository;
use crate::router::{AgentRouter, InboundHandler};

use super::agent::{AgentMessage, SubChannelParent};

/// Sub-demand invitee pools are deliberately smaller than top-level ones —
/// a gap is a narrow, specific need, not a fresh broadcast to everyone.
const SUBNET_CANDIDATE_CAP: usize = 5;

pub struct Coordinator {
    oracle: Arc<SupervisedOracle>,
    profiles: Arc<dyn ProfileRepository>,
    events: EventBus,
    config: Arc<Config>,
    router: OnceLock<Arc<AgentRouter>>,
}

impl Coordinator {
    pub fn new(
        oracle: Arc<SupervisedOracle>,
        profiles: Arc<dyn ProfileRepository>,
        events: EventBus,
        config: Arc<Config>,
    ) -> Self {
        Self {
            oracle,
            profiles,
            events,
            config,
            router: OnceLock::new(),
        }
    }

    pub fn set_router(&self, router: Arc<AgentRouter>) {
        let _ = self.router.set(router);
    }

    fn router(&self) -> Arc<AgentRouter> {
        self.router
            .get()
            .cloned()
            .expect("router must be set before the coordinator handles any message")
    }

    fn publish(&self, event_type: &str, payload: serde_json::Value) {
        self.events
            .publish(Event::new(event_type, "coordinator", payload));
    }

    pub async fn on_new_demand(&self, raw_text: String, submitter_id: String) {
        let mut demand = Demand::new_top_level(raw_text, submitter_id);
        self.publish(
            "demand.submitted",
            serde_json::json!({ "demandID": demand.id, "submitterID": demand.submitter_id }),
        );

        let understanding = self.oracle.understand_demand(&demand.raw_text).await;
        demand.surface_form = Some(understanding.surface.clone());
        demand.deep_understanding = Some(understanding.deep.clone());
        demand.capability_tags = understanding.tags.clone();
        demand.status = crate::domain::DemandStatus::Understood;
        self.publish(
            "demand.understood",
            serde_json::json!({
                "demandID": demand.id,
                "tags": understanding.tags,
                "confidence": understanding.confidence,
            }),
        );

        let profiles = self.profiles.list_active().await;
        let filtered = self.oracle.filter_candidates(&demand, &profiles).await;
        demand.status = crate::domain::DemandStatus::Filtered;
        self.publish(
            "filter.completed",
            serde_json::json!({
                "demandID": demand.id,
                "candidateCount": filtered.len(),
            }),
        );

        if filtered.len() < 2 {
            self.publish(
                "negotiation.failed",
                serde_json::json!({
                    "demandID": demand.id,
                    "reason": "no_candidates",
                }),
            );
            return;
        }

        let invitees: HashSet<String> = filtered.into_iter().map(|c| c.agent_id).collect();
        let channel_id = Channel::id_for_demand(demand.id);
        demand.status = crate::domain::DemandStatus::ChannelCreated;

        let _ = self
            .router()
            .route(
                "coordinator",
                "channel_administrator",
                "start_managing",
                Some(&channel_id),
                AgentMessage::StartManaging {
                    channel_id: channel_id.clone(),
                    demand,
                    invitees,
                    max_rounds: self.config.max_rounds,
                    parent: None,
                },
            )
            .await;
    }

    pub async fn on_subnet_demand(
        &self,
        parent_channel_id: String,
        parent_demand_id: uuid::Uuid,
        gap: Gap,
        depth: u32,
    ) {
        let gap_id = gap.id;
        let demand = Demand::new_sub_demand(
            format!("fill the gap: {}", gap.description),
            "coordinator",
            parent_demand_id,
            depth,
        );

        let profiles = self.profiles.list_active().await;
        let mut filtered = self.oracle.filter_candidates(&demand, &profiles).await;
        filtered.truncate(SUBNET_CANDIDATE_CAP);

        if filtered.len() < 2 {
            self.publish(
                "subnet.failed",
                serde_json::json!({
                    "parentChannelID": parent_channel_id,
                    "demandID": demand.id,
                    "reason": "no_candidates",
                }),
            );
            return;
        }

        let invitees: HashSet<String> = filtered.into_iter().map(|c| c.agent_id).collect();
        let channel_id = Channel::id_for_demand(demand.id);

        self.publish(
            "subnet.triggered",
            serde_json::json!({
                "parentChannelID": parent_channel_id,
                "subChannelID": channel_id,
                "gap": gap.description,
                "depth": depth,
            }),
        );

        let _ = self
            .router()
            .route(
                "coordinator",
                "channel_administrator",
                "start_managing",
                Some(&channel_id),
                AgentMessage::StartManaging {
                    channel_id: channel_id.clone(),
                    demand,
                    invitees,
                    max_rounds: self.config.max_rounds,
                    parent: Some(SubChannelParent {
                        channel_id: parent_channel_id,
                        gap_id,
                    }),
                },
            )
            .await;
    }
}

#[async_trait]
impl InboundHandler for Coordinator {
    async fn handle(&self, message: AgentMessage) -> Result<(), RouterError> {
        match message {
            AgentMessage::NewDemand {
                raw_text,
                submitter_id,
            } => {
                self.on_new_demand(raw_text, submitter_id).await;
                Ok(())
            }
            AgentMessage::SubnetDemand {
                parent_channel_id,
                parent_demand_id,
                gap,
                depth,
            } => {
                self.on_subnet_demand(parent_channel_id, parent_demand_id, gap, depth)
                    .await;
                Ok(())
            }
            other => Err(RouterError::HandlerFailed(format!(
                "coordinator cannot handle {}",
                other.type_name()
            ))),
        }
    }
}
