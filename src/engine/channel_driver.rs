//! One Tokio task per live channel ("channel driver"). The driver owns its
//! [`Channel`] exclusively and receives typed commands over an `mpsc`
//! mailbox, so no two tasks ever mutate the same channel concurrently —
//! this is the per-channel lock/mailbox serialization §5 calls for,
//! implemented as an actor rather than a shared `Mutex<Channel>`.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::config::Config;
use crate::domain::{
    Channel, ChannelStatus, Decision, Event, Feedback, FeedbackKind, Gap, Offer, Proposal,
    SubChannelOutcome,
};
use crate::events::EventBus;
use crate::oracle::SupervisedOracle;
use crate::router::AgentRouter;

use super::agent::{AgentMessage, SubChannelParent};
use super::channel::{evaluate_round, is_allowed_transition, RoundOutcome};

/// Commands a channel driver accepts over its mailbox. Everything the
/// public `ChannelAdministrator` operations do funnels through here so the
/// owning task is the only place `Channel` is ever mutated.
pub enum AdminCommand {
    Offer {
        fingerprint: u64,
        agent_id: String,
        offer: Offer,
    },
    Feedback {
        fingerprint: u64,
        agent_id: String,
        feedback: Feedback,
    },
    SubChannelResult {
        sub_channel_id: String,
        gap_id: uuid::Uuid,
        outcome: SubChannelOutcome,
    },
}

/// §4.4: a conditional offer must name its conditions, a decline must say
/// why. Everything else is well-formed by construction.
fn validate_offer(offer: &Offer) -> Result<(), &'static str> {
    match offer.decision {
        Decision::Conditional if offer.conditions.is_empty() => {
            Err("conditional offer has no conditions")
        }
        Decision::Decline if offer.rationale.trim().is_empty() => {
            Err("decline has no rationale")
        }
        _ => Ok(()),
    }
}

/// A `negotiate` feedback without a requested adjustment gives the oracle
/// nothing to act on — §5's `proposal review` contract requires one.
fn validate_feedback(feedback: &Feedback) -> Result<(), &'static str> {
    match feedback.kind {
        FeedbackKind::Negotiate
            if feedback
                .requested_adjustment
                .as_deref()
                .map(str::trim)
                .unwrap_or("")
                .is_empty() =>
        {
            Err("negotiate feedback has no requested adjustment")
        }
        _ => Ok(()),
    }
}

/// A gap the administrator wants the Coordinator to spin up a sub-channel
/// for. Handed up rather than created directly, so gap spawning stays
/// subject to the same dedup/ordering rules as any other inter-agent
/// message.
pub struct SpawnSubnetRequest {
    pub parent_channel_id: String,
    pub parent_demand_id: uuid::Uuid,
    pub gap: Gap,
    pub depth: u32,
}

pub struct ChannelDriver {
    channel: Channel,
    collected_offers: Vec<Offer>,
    oracle: Arc<SupervisedOracle>,
    events: EventBus,
    router: Arc<AgentRouter>,
    config: Arc<Config>,
    mailbox: mpsc::Receiver<AdminCommand>,
    subnet_requests: mpsc::UnboundedSender<SpawnSubnetRequest>,
    gaps_identified_once: bool,
}

impl ChannelDriver {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        channel_id: String,
        demand: crate::domain::Demand,
        invitees: HashSet<String>,
        parent: Option<SubChannelParent>,
        oracle: Arc<SupervisedOracle>,
        events: EventBus,
        router: Arc<AgentRouter>,
        config: Arc<Config>,
        subnet_requests: mpsc::UnboundedSender<SpawnSubnetRequest>,
    ) -> (mpsc::Sender<AdminCommand>, oneshot::Receiver<()>) {
        let (tx, rx) = mpsc::channel(256);
        let (broadcasting_tx, broadcasting_rx) = oneshot::channel();

        let channel = match parent {
            Some(SubChannelParent { channel_id: parent_channel_id, gap_id }) => {
                Channel::new_sub_channel(channel_id, demand, invitees, parent_channel_id, gap_id)
            }
            None => Channel::new(channel_id, demand, invitees),
        };

        let mut driver = ChannelDriver {
            channel,
            collected_offers: Vec::new(),
            oracle,
            events,
            router,
            config,
            mailbox: rx,
            subnet_requests,
            gaps_identified_once: false,
        };

        tokio::spawn(async move {
            driver.run(broadcasting_tx).await;
        });

        (tx, broadcasting_rx)
    }

    fn transition(&mut self, to: ChannelStatus) {
        let from = self.channel.status;
        if !is_allowed_transition(from, to) {
            log::error!(
                "illegal transition on channel {}: {from:?} -> {to:?}",
                self.channel.id
            );
            self.channel.status = ChannelStatus::Failed;
            self.publish_failed("internal.invalid_transition");
            return;
        }
        self.channel.status = to;
    }

    fn publish(&self, event_type: &str, payload: serde_json::Value) {
        self.events
            .publish(Event::new(event_type, "channel_administrator", payload));
    }

    fn publish_failed(&self, reason: &str) {
        self.publish(
            "negotiation.failed",
            serde_json::json!({ "channelID": self.channel.id, "reason": reason }),
        );
    }

    /// Log, drop, and publish `protocol.violation` per §7's error taxonomy
    /// for a malformed offer or feedback message. Never fails the channel.
    fn publish_violation(&self, agent_id: &str, message: &str, reason: &str) {
        log::warn!(
            "protocol violation on channel {} from {agent_id}: {reason}",
            self.channel.id
        );
        self.publish(
            "protocol.violation",
            serde_json::json!({
                "channelID": self.channel.id,
                "agentID": agent_id,
                "message": message,
                "reason": reason,
            }),
        );
    }

    /// Transition to FAILED, publish `negotiation.failed`, and — if this
    /// channel was spawned to fill a gap in some other channel's proposal —
    /// report the failure back to that parent.
    async fn fail(&mut self, reason: &str) {
        self.transition(ChannelStatus::Failed);
        self.publish_failed(reason);
        self.report_outcome_to_parent(SubChannelOutcome::Failed(reason.to_string()))
            .await;
    }

    /// Transition to FINALIZED, publish `negotiation.finalized`, and report
    /// success back to the parent channel if this one is a sub-channel.
    async fn finalize(&mut self) {
        self.transition(ChannelStatus::Finalized);
        self.publish(
            "negotiation.finalized",
            serde_json::json!({
                "channelID": self.channel.id,
                "round": self.channel.round,
                "finalProposal": self.channel.current_proposal,
            }),
        );
        if let Some(proposal) = self.channel.current_proposal.clone() {
            self.report_outcome_to_parent(SubChannelOutcome::Finalized(Box::new(proposal)))
                .await;
        }
    }

    async fn report_outcome_to_parent(&self, outcome: SubChannelOutcome) {
        let (Some(parent_channel_id), Some(gap_id)) =
            (self.channel.parent_channel_id.clone(), self.channel.gap_id)
        else {
            return;
        };
        // Fingerprinted on this sub-channel's own ID, not the parent's —
        // two sibling sub-channels reporting to the same parent within the
        // dedup window must not collide on the router's replay key.
        let _ = self
            .router
            .route(
                "channel_administrator",
                "channel_administrator",
                "sub_channel_result",
                Some(&self.channel.id),
                AgentMessage::SubChannelResult {
                    parent_channel_id,
                    sub_channel_id: self.channel.id.clone(),
                    gap_id,
                    outcome,
                },
            )
            .await;
    }

    async fn run(&mut self, broadcasting_signal: oneshot::Sender<()>) {
        self.transition(ChannelStatus::Broadcasting);
        self.broadcast().await;
        let _ = broadcasting_signal.send(());
        if self.channel.status.is_terminal() {
            return;
        }

        self.transition(ChannelStatus::Collecting);
        while !self.channel.status.is_terminal() {
            let keep_going = match self.channel.status {
                ChannelStatus::Collecting => self.run_collection_phase().await,
                ChannelStatus::Negotiating => self.run_negotiation_phase().await,
                _ => false,
            };
            if !keep_going {
                break;
            }
        }
    }

    async fn broadcast(&mut self) {
        for invitee in self.channel.participation.invited.clone() {
            let _ = self
                .router
                .route(
                    "channel_administrator",
                    &format!("user_agent_{invitee}"),
                    "demand_offer",
                    Some(&self.channel.id),
                    AgentMessage::DemandOffer {
                        demand: self.channel.demand.clone(),
                        channel_id: self.channel.id.clone(),
                        selection_reason: "matched requested capabilities".to_string(),
                    },
                )
                .await;
        }
        self.publish(
            "demand.broadcast",
            serde_json::json!({
                "channelID": self.channel.id,
                "recipientCount": self.channel.participation.invited.len(),
            }),
        );
    }

    /// COLLECTING: pump the mailbox until every invitee has responded or
    /// the collection deadline fires, then move to aggregation.
    async fn run_collection_phase(&mut self) -> bool {
        let deadline = tokio::time::sleep(self.config.collection_deadline);
        tokio::pin!(deadline);
        loop {
            if self.channel.participation.responded.len() >= self.channel.participation.invited.len()
            {
                break;
            }
            tokio::select! {
                _ = &mut deadline => break,
                cmd = self.mailbox.recv() => {
                    match cmd {
                        Some(cmd) => self.apply_command(cmd),
                        None => break,
                    }
                }
            }
        }

        if self.channel.participation.responded.is_empty() {
            self.fail("no_responses").await;
            return false;
        }

        self.transition(ChannelStatus::Aggregating);
        let proposal = self
            .oracle
            .aggregate_offers(&self.channel.demand, &self.collected_offers)
            .await;
        self.channel.participation.participating = proposal.participant_ids();
        self.publish_and_distribute(proposal).await;
        true
    }

    /// NEGOTIATING: pump the mailbox until every participant has fed back
    /// or the round deadline fires, then finalize, fail, or adjust.
    async fn run_negotiation_phase(&mut self) -> bool {
        let participants = self.channel.participation.participating.clone();
        let deadline = tokio::time::sleep(self.config.negotiation_round_deadline);
        tokio::pin!(deadline);
        let mut feedback_by_agent: std::collections::HashMap<String, FeedbackKind> =
            std::collections::HashMap::new();

        loop {
            if feedback_by_agent.len() >= participants.len() {
                break;
            }
            tokio::select! {
                _ = &mut deadline => break,
                cmd = self.mailbox.recv() => {
                    match cmd {
                        Some(AdminCommand::Feedback { fingerprint, agent_id, feedback }) => {
                            if self.channel.processed_fingerprints.insert(fingerprint) {
                                if let Err(reason) = validate_feedback(&feedback) {
                                    self.publish_violation(&agent_id, "feedback", reason);
                                    continue;
                                }
                                self.publish(
                                    "feedback.submitted",
                                    serde_json::json!({
                                        "channelID": self.channel.id,
                                        "version": feedback.version,
                                        "agentID": agent_id,
                                        "kind": format!("{:?}", feedback.kind),
                                    }),
                                );
                                feedback_by_agent.insert(agent_id, feedback.kind);
                            }
                        }
                        Some(other) => self.apply_command(other),
                        None => break,
                    }
                }
            }
        }

        if self.config.implicit_accept_on_silence {
            for agent_id in &participants {
                feedback_by_agent
                    .entry(agent_id.clone())
                    .or_insert(FeedbackKind::Accept);
            }
        }

        if self.core_participant_withdrew_without_replacement(&feedback_by_agent) {
            self.fail("core_participant_withdrew").await;
            return false;
        }

        let accepts = feedback_by_agent
            .values()
            .filter(|k| **k == FeedbackKind::Accept)
            .count();
        let withdraws = feedback_by_agent
            .values()
            .filter(|k| **k == FeedbackKind::Withdraw)
            .count();

        let outcome = evaluate_round(
            accepts,
            withdraws,
            participants.len(),
            self.channel.round,
            self.config.max_rounds,
            self.config.accept_rate_threshold,
            self.config.withdraw_rate_threshold,
        );

        match outcome {
            RoundOutcome::Finalize => {
                self.finalize().await;
                false
            }
            RoundOutcome::Fail => {
                let reason = if participants.is_empty() {
                    "no_responses"
                } else if withdraws as f64 / participants.len() as f64
                    > self.config.withdraw_rate_threshold
                {
                    "majority_rejected"
                } else {
                    "max_rounds_no_consensus"
                };
                self.fail(reason).await;
                false
            }
            RoundOutcome::AdjustAndContinue => {
                self.adjust_proposal(feedback_by_agent).await;
                true
            }
        }
    }

    fn core_participant_withdrew_without_replacement(
        &self,
        feedback_by_agent: &std::collections::HashMap<String, FeedbackKind>,
    ) -> bool {
        let Some(proposal) = &self.channel.current_proposal else {
            return false;
        };
        for assignment in &proposal.assignments {
            if feedback_by_agent.get(&assignment.agent_id) == Some(&FeedbackKind::Withdraw) {
                let role_absorbable = proposal.assignments.iter().any(|other| {
                    other.agent_id != assignment.agent_id
                        && other.role == assignment.role
                        && feedback_by_agent.get(&other.agent_id) != Some(&FeedbackKind::Withdraw)
                });
                let sub_channel_viable = self
                    .channel
                    .pending_subchannels
                    .values()
                    .any(|outcome| matches!(outcome, Some(SubChannelOutcome::Finalized(_))));
                if !role_absorbable && !sub_channel_viable {
                    return true;
                }
            }
        }
        false
    }

    /// NEGOTIATING -> COLLECTING -> AGGREGATING -> (adjustProposal result)
    /// -> PROPOSAL_SENT -> NEGOTIATING, per §4.2's redistribution sequence.
    /// The COLLECTING/AGGREGATING stop here is bookkeeping, not a new
    /// offer-collection pass — only `aggregateOffers` (round 1) collects
    /// raw offers; later rounds run on `adjustProposal`.
    async fn adjust_proposal(
        &mut self,
        feedback_by_agent: std::collections::HashMap<String, FeedbackKind>,
    ) {
        let Some(current) = self.channel.current_proposal.clone() else {
            return;
        };
        let feedback: Vec<Feedback> = feedback_by_agent
            .into_iter()
            .filter(|(_, kind)| *kind != FeedbackKind::Accept)
            .map(|(agent_id, kind)| Feedback {
                channel_id: self.channel.id.clone(),
                version: current.version,
                agent_id,
                kind,
                requested_adjustment: None,
                rationale: String::new(),
            })
            .collect();

        let adjustment = self.oracle.adjust_proposal(&current, &feedback).await;
        if !adjustment.should_continue {
            self.fail("max_rounds_no_consensus").await;
            return;
        }

        self.channel.participation.responded.clear();
        self.transition(ChannelStatus::Collecting);
        self.transition(ChannelStatus::Aggregating);
        self.publish_and_distribute(adjustment.proposal).await;
    }

    /// Stamp the next proposal version, derive the 0-indexed round from it
    /// (`round = version - 1` — `Channel::round` and `Proposal::version`
    /// track the same progression but on different origins), run gap
    /// identification exactly once (first aggregation of the channel), and
    /// distribute to participants.
    async fn publish_and_distribute(&mut self, mut proposal: Proposal) {
        let version = self
            .channel
            .current_proposal
            .as_ref()
            .map_or(1, |previous| previous.version + 1);
        self.channel.round = version - 1;
        proposal.channel_id = self.channel.id.clone();
        proposal.version = version;

        self.publish(
            "proposal.distributed",
            serde_json::json!({
                "channelID": self.channel.id,
                "version": proposal.version,
                "participants": proposal.participant_ids(),
            }),
        );
        if self.channel.round > 0 {
            self.publish(
                "negotiation.round_started",
                serde_json::json!({ "channelID": self.channel.id, "round": self.channel.round }),
            );
        }

        self.channel.current_proposal = Some(proposal);
        self.transition(ChannelStatus::ProposalSent);

        if !self.gaps_identified_once {
            self.gaps_identified_once = true;
            self.identify_and_spawn_gaps().await;
        }

        self.distribute_proposal().await;
    }

    async fn identify_and_spawn_gaps(&mut self) {
        let Some(proposal) = self.channel.current_proposal.clone() else {
            return;
        };
        let gaps = self
            .oracle
            .identify_gaps(&self.channel.demand, &proposal)
            .await;
        if gaps.is_empty() {
            return;
        }
        self.publish(
            "gap.identified",
            serde_json::json!({
                "channelID": self.channel.id,
                "gaps": gaps.iter().map(|g| &g.description).collect::<Vec<_>>(),
            }),
        );

        let selected = self
            .oracle
            .judge_recursion(
                &gaps,
                self.channel.recursion_depth,
                self.config.negotiation_round_deadline,
            )
            .await;

        for gap in selected {
            if self.channel.recursion_depth >= self.config.max_recursion_depth {
                continue;
            }
            if self.channel.pending_subchannels.len() as u32 >= self.config.max_subnets_per_channel
            {
                continue;
            }
            let gap_id = gap.id;
            self.channel.pending_subchannels.insert(gap_id, None);
            let _ = self.subnet_requests.send(SpawnSubnetRequest {
                parent_channel_id: self.channel.id.clone(),
                parent_demand_id: self.channel.demand.id,
                gap,
                depth: self.channel.recursion_depth + 1,
            });
        }
    }

    async fn distribute_proposal(&mut self) {
        let Some(proposal) = self.channel.current_proposal.clone() else {
            return;
        };
        for agent_id in proposal.participant_ids() {
            let _ = self
                .router
                .route(
                    "channel_administrator",
                    &format!("user_agent_{agent_id}"),
                    "proposal_review",
                    Some(&self.channel.id),
                    AgentMessage::ProposalReview {
                        channel_id: self.channel.id.clone(),
                        proposal: proposal.clone(),
                    },
                )
                .await;
        }
        self.channel.participation.responded.clear();
        self.transition(ChannelStatus::Negotiating);
    }

    fn apply_command(&mut self, cmd: AdminCommand) {
        match cmd {
            AdminCommand::Offer {
                fingerprint,
                agent_id,
                offer,
            } => {
                if !self.channel.processed_fingerprints.insert(fingerprint) {
                    return;
                }
                if !matches!(
                    self.channel.status,
                    ChannelStatus::Broadcasting | ChannelStatus::Collecting
                ) {
                    return;
                }
                if let Err(reason) = validate_offer(&offer) {
                    self.publish_violation(&agent_id, "offer", reason);
                    return;
                }
                self.channel.participation.responded.insert(agent_id.clone());
                if offer.decision != Decision::Decline {
                    self.channel
                        .participation
                        .participating
                        .insert(agent_id.clone());
                }
                self.publish(
                    "offer.submitted",
                    serde_json::json!({
                        "channelID": self.channel.id,
                        "agentID": agent_id,
                        "decision": format!("{:?}", offer.decision),
                        "confidence": offer.confidence,
                    }),
                );
                self.collected_offers.push(offer);
            }
            AdminCommand::Feedback { .. } => {
                // Feedback delivered outside the NEGOTIATING phase (e.g. a
                // stray redelivery after the round already closed) is
                // simply not actionable; drop it.
            }
            AdminCommand::SubChannelResult {
                sub_channel_id,
                gap_id,
                outcome,
            } => {
                match self.channel.pending_subchannels.get_mut(&gap_id) {
                    Some(slot) => {
                        let outcome_name = match &outcome {
                            SubChannelOutcome::Finalized(_) => "finalized",
                            SubChannelOutcome::Failed(_) => "failed",
                        };
                        *slot = Some(outcome);
                        self.publish(
                            "subnet.outcome_recorded",
                            serde_json::json!({
                                "channelID": self.channel.id,
                                "subChannelID": sub_channel_id,
                                "gapID": gap_id,
                                "outcome": outcome_name,
                            }),
                        );
                    }
                    None => log::warn!(
                        "sub-channel {sub_channel_id} reported for unknown gap {gap_id} on channel {}",
                        self.channel.id
                    ),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentProfile, Assignment, Demand};

    fn bare_driver(proposal: Proposal) -> ChannelDriver {
        let (_tx, rx) = mpsc::channel(4);
        let (subnet_tx, _subnet_rx) = mpsc::unbounded_channel();
        let demand = Demand::new_top_level("organize a meetup", "user-1");
        let mut channel = Channel::new("collab-test".to_string(), demand, HashSet::new());
        channel.current_proposal = Some(proposal);

        ChannelDriver {
            channel,
            collected_offers: Vec::new(),
            oracle: test_oracle(),
            events: EventBus::new(16, 16),
            router: test_router(),
            config: Arc::new(Config::default()),
            mailbox: rx,
            subnet_requests: subnet_tx,
            gaps_identified_once: false,
        }
    }

    fn test_oracle() -> Arc<SupervisedOracle> {
        struct Unreachable;
        #[async_trait::async_trait]
        impl crate::oracle::OracleService for Unreachable {
            async fn understand_demand(
                &self,
                _raw_text: &str,
            ) -> Result<crate::oracle::DemandUnderstanding, crate::error::OracleError> {
                unreachable!()
            }
            async fn filter_candidates(
                &self,
                _demand: &Demand,
                _profiles: &[AgentProfile],
            ) -> Result<Vec<crate::oracle::FilteredCandidate>, crate::error::OracleError> {
                unreachable!()
            }
            async fn generate_offer_response(
                &self,
                _demand: &Demand,
                _profile: &AgentProfile,
                _filter_reason: &str,
            ) -> Result<Offer, crate::error::OracleError> {
                unreachable!()
            }
            async fn aggregate_offers(
                &self,
                _demand: &Demand,
                _offers: &[Offer],
            ) -> Result<Proposal, crate::error::OracleError> {
                unreachable!()
            }
            async fn adjust_proposal(
                &self,
                _current: &Proposal,
                _feedback: &[Feedback],
            ) -> Result<crate::oracle::Adjustment, crate::error::OracleError> {
                unreachable!()
            }
            async fn identify_gaps(
                &self,
                _demand: &Demand,
                _proposal: &Proposal,
            ) -> Result<Vec<Gap>, crate::error::OracleError> {
                unreachable!()
            }
            async fn judge_recursion(
                &self,
                _gaps: &[Gap],
                _depth: u32,
                _time_remaining: std::time::Duration,
            ) -> Result<Vec<Gap>, crate::error::OracleError> {
                unreachable!()
            }
        }
        let config = Arc::new(Config::default());
        Arc::new(SupervisedOracle::new(
            Arc::new(Unreachable),
            config.clone(),
            Arc::new(EventBus::new(16, 16)),
        ))
    }

    fn test_router() -> Arc<AgentRouter> {
        struct NoRecipients;
        #[async_trait::async_trait]
        impl crate::router::AgentLookup for NoRecipients {
            async fn resolve(
                &self,
                _recipient_id: &str,
            ) -> Option<Arc<dyn crate::router::InboundHandler>> {
                None
            }
        }
        Arc::new(AgentRouter::new(
            Arc::new(NoRecipients),
            std::time::Duration::from_secs(5),
        ))
    }

    fn sole_venue_proposal() -> Proposal {
        Proposal {
            channel_id: "collab-test".to_string(),
            version: 1,
            summary: "one venue, one speaker".to_string(),
            assignments: vec![
                Assignment {
                    agent_id: "venue-agent".to_string(),
                    role: "venue".to_string(),
                    responsibility: "host the meetup".to_string(),
                    accepted_conditions: true,
                },
                Assignment {
                    agent_id: "speaker-agent".to_string(),
                    role: "speaker".to_string(),
                    responsibility: "give the talk".to_string(),
                    accepted_conditions: true,
                },
            ],
            timeline_hint: None,
            open_questions: vec![],
            overall_confidence: 80,
        }
    }

    /// S6: the sole holder of a role withdraws and nothing else absorbs it,
    /// with no sub-channel outcome to fall back on.
    #[test]
    fn sole_role_holder_withdrawing_with_no_fallback_fails_the_channel() {
        let driver = bare_driver(sole_venue_proposal());
        let mut feedback = std::collections::HashMap::new();
        feedback.insert("venue-agent".to_string(), FeedbackKind::Withdraw);
        feedback.insert("speaker-agent".to_string(), FeedbackKind::Accept);
        assert!(driver.core_participant_withdrew_without_replacement(&feedback));
    }

    /// A role with a second, still-participating holder is absorbable —
    /// one withdrawal doesn't sink the channel.
    #[test]
    fn withdrawal_with_role_sharing_peer_is_absorbable() {
        let mut proposal = sole_venue_proposal();
        proposal.assignments.push(Assignment {
            agent_id: "venue-agent-2".to_string(),
            role: "venue".to_string(),
            responsibility: "backup venue".to_string(),
            accepted_conditions: true,
        });
        let driver = bare_driver(proposal);
        let mut feedback = std::collections::HashMap::new();
        feedback.insert("venue-agent".to_string(), FeedbackKind::Withdraw);
        feedback.insert("venue-agent-2".to_string(), FeedbackKind::Accept);
        feedback.insert("speaker-agent".to_string(), FeedbackKind::Accept);
        assert!(!driver.core_participant_withdrew_without_replacement(&feedback));
    }

    #[test]
    fn no_withdrawals_never_trips_the_check() {
        let driver = bare_driver(sole_venue_proposal());
        let mut feedback = std::collections::HashMap::new();
        feedback.insert("venue-agent".to_string(), FeedbackKind::Accept);
        feedback.insert("speaker-agent".to_string(), FeedbackKind::Accept);
        assert!(!driver.core_participant_withdrew_without_replacement(&feedback));
    }
}
