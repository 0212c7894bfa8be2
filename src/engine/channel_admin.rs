//! Channel Administrator: the facade spec §4.2 exposes publicly
//! (`startManaging`/`onOffer`/`onFeedback`/`onSubChannelResult`), backed by
//! one [`ChannelDriver`] task per live channel. The facade itself holds no
//! negotiation state — only a map from channel ID to that channel's
//! mailbox — so every mutation happens inside the owning driver task.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};

use crate::config::Config;
use crate::domain::{Demand, Event, Feedback, Offer, SubChannelOutcome};
use crate::error::RouterError;
use crate::events::EventBus;
use crate::oracle::SupervisedOracle;
use crate::router::{fingerprint, AgentRouter, InboundHandler};

use super::agent::{AgentMessage, SubChannelParent};
use super::channel_driver::{AdminCommand, ChannelDriver, SpawnSubnetRequest};

pub struct ChannelAdministrator {
    mailboxes: DashMap<String, mpsc::Sender<AdminCommand>>,
    oracle: Arc<SupervisedOracle>,
    events: EventBus,
    config: Arc<Config>,
    subnet_requests: mpsc::UnboundedSender<SpawnSubnetRequest>,
    router: OnceLock<Arc<AgentRouter>>,
}

impl ChannelAdministrator {
    pub fn new(
        oracle: Arc<SupervisedOracle>,
        events: EventBus,
        config: Arc<Config>,
        subnet_requests: mpsc::UnboundedSender<SpawnSubnetRequest>,
    ) -> Self {
        Self {
            mailboxes: DashMap::new(),
            oracle,
            events,
            config,
            subnet_requests,
            router: OnceLock::new(),
        }
    }

    /// Set once by `Engine::new()` after the router is constructed from
    /// this administrator's already-built `Arc`. Breaks the cyclic
    /// reference between the router and the agents it addresses.
    pub fn set_router(&self, router: Arc<AgentRouter>) {
        let _ = self.router.set(router);
    }

    fn router(&self) -> Arc<AgentRouter> {
        self.router
            .get()
            .cloned()
            .expect("router must be set before the administrator handles any message")
    }

    pub async fn start_managing(
        &self,
        channel_id: String,
        demand: Demand,
        invitees: std::collections::HashSet<String>,
        parent: Option<SubChannelParent>,
    ) -> oneshot::Receiver<()> {
        let (tx, broadcasting) = ChannelDriver::spawn(
            channel_id.clone(),
            demand,
            invitees,
            parent,
            self.oracle.clone(),
            self.events.clone(),
            self.router(),
            self.config.clone(),
            self.subnet_requests.clone(),
        );
        self.mailboxes.insert(channel_id.clone(), tx);
        self.events.publish(Event::new(
            "channel.created",
            "channel_administrator",
            serde_json::json!({ "channelID": channel_id }),
        ));
        broadcasting
    }

    pub async fn on_offer(&self, channel_id: &str, agent_id: String, offer: Offer) {
        let key = fingerprint("user_agent", channel_id, "offer", Some(channel_id));
        self.dispatch(
            channel_id,
            AdminCommand::Offer {
                fingerprint: key ^ offer_salt(&agent_id),
                agent_id,
                offer,
            },
        )
        .await;
    }

    pub async fn on_feedback(&self, channel_id: &str, agent_id: String, feedback: Feedback) {
        // `feedback.version` ties the fingerprint to the round it was given
        // in — without it, round 2's feedback from the same agent collides
        // with round 1's in `processed_fingerprints` (which is never
        // cleared) and gets silently dropped as a replay.
        let message_type = format!("feedback_v{}", feedback.version);
        let key = fingerprint("user_agent", channel_id, &message_type, Some(channel_id));
        self.dispatch(
            channel_id,
            AdminCommand::Feedback {
                fingerprint: key ^ offer_salt(&agent_id),
                agent_id,
                feedback,
            },
        )
        .await;
    }

    pub async fn on_sub_channel_result(
        &self,
        parent_channel_id: &str,
        sub_channel_id: String,
        gap_id: uuid::Uuid,
        outcome: SubChannelOutcome,
    ) {
        self.dispatch(
            parent_channel_id,
            AdminCommand::SubChannelResult {
                sub_channel_id,
                gap_id,
                outcome,
            },
        )
        .await;
    }

    async fn dispatch(&self, channel_id: &str, cmd: AdminCommand) {
        let Some(mailbox) = self.mailboxes.get(channel_id).map(|entry| entry.value().clone()) else {
            log::warn!("dropped command for unknown channel {channel_id}");
            return;
        };
        if mailbox.send(cmd).await.is_err() {
            log::warn!("channel {channel_id} driver has already exited");
        }
    }
}

/// Per-agent salt mixed into the offer/feedback fingerprint so two different
/// agents responding to the same channel don't collide on the router's
/// coarser (sender, recipient, type, channel) key — dedup here is keyed by
/// the message's actual author instead.
fn offer_salt(agent_id: &str) -> u64 {
    fingerprint(agent_id, "", "", None)
}

#[async_trait]
impl InboundHandler for ChannelAdministrator {
    async fn handle(&self, message: AgentMessage) -> Result<(), RouterError> {
        match message {
            AgentMessage::StartManaging {
                channel_id,
                demand,
                invitees,
                max_rounds: _,
                parent,
            } => {
                self.start_managing(channel_id, demand, invitees, parent)
                    .await;
                Ok(())
            }
            AgentMessage::Offer {
                channel_id,
                agent_id,
                offer,
            } => {
                self.on_offer(&channel_id, agent_id, offer).await;
                Ok(())
            }
            AgentMessage::Feedback {
                channel_id,
                agent_id,
                feedback,
            } => {
                self.on_feedback(&channel_id, agent_id, feedback).await;
                Ok(())
            }
            AgentMessage::SubChannelResult {
                parent_channel_id,
                sub_channel_id,
                gap_id,
                outcome,
            } => {
                self.on_sub_channel_result(&parent_channel_id, sub_channel_id, gap_id, outcome)
                    .await;
                Ok(())
            }
            other => Err(RouterError::HandlerFailed(format!(
                "channel administrator cannot handle {}",
                other.type_name()
            ))),
        }
    }
}
