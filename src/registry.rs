//! Agent Registry: the Factory that resolves recipient IDs to live
//! [`Agent`] handles, lazily materializing User Agents on first reference
//! and keeping the two singletons (Coordinator, Channel Administrator)
//! reachable by their well-known names.
//!
//! Implements [`AgentLookup`] rather than being depended on directly by the
//! router, and never holds a reference back to the router itself — this is
//! what keeps Router <-> Registry construction acyclic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::domain::AgentProfile;
use crate::events::EventBus;
use crate::oracle::SupervisedOracle;
use crate::router::{AgentLookup, AgentRouter, InboundHandler};

use crate::engine::agent::Agent;
use crate::engine::channel_admin::ChannelAdministrator;
use crate::engine::coordinator::Coordinator;
use crate::engine::user_agent::UserAgent;

/// External source of truth for who's active and what their profile looks
/// like. Implemented by the embedding application; an in-memory test
/// double lives alongside the integration tests.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn list_active(&self) -> Vec<AgentProfile>;
    async fn get(&self, user_id: &str) -> Option<AgentProfile>;
}

pub struct AgentRegistry {
    coordinator: Arc<Coordinator>,
    channel_admin: Arc<ChannelAdministrator>,
    profiles: Arc<dyn ProfileRepository>,
    oracle: Arc<SupervisedOracle>,
    events: EventBus,
    /// Singleflight-safe per-user materialization: a `UserAgent` is built
    /// at most once per user ID even under concurrent first-reference.
    user_agents: Mutex<HashMap<String, Arc<OnceCell<Arc<UserAgent>>>>>,
    router: OnceLock<Arc<AgentRouter>>,
}

impl AgentRegistry {
    pub fn new(
        coordinator: Arc<Coordinator>,
        channel_admin: Arc<ChannelAdministrator>,
        profiles: Arc<dyn ProfileRepository>,
        oracle: Arc<SupervisedOracle>,
        events: EventBus,
    ) -> Self {
        Self {
            coordinator,
            channel_admin,
            profiles,
            oracle,
            events,
            user_agents: Mutex::new(HashMap::new()),
            router: OnceLock::new(),
        }
    }

    pub fn set_router(&self, router: Arc<AgentRouter>) {
        self.coordinator.set_router(router.clone());
        self.channel_admin.set_router(router.clone());
        let _ = self.router.set(router);
    }

    fn router(&self) -> Arc<AgentRouter> {
        self.router
            .get()
            .cloned()
            .expect("router must be set before the registry materializes any agent")
    }

    async fn materialize_user_agent(&self, user_id: &str) -> Option<Arc<UserAgent>> {
        let cell = {
            let mut agents = self.user_agents.lock().unwrap();
            agents
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let result = cell
            .get_or_try_init(|| async {
                let profile = self.profiles.get(user_id).await.ok_or(())?;
                let agent = Arc::new(UserAgent::new(profile, self.oracle.clone(), self.events.clone()));
                agent.set_router(self.router());
                Ok::<_, ()>(agent)
            })
            .await;

        result.ok().cloned()
    }
}

#[async_trait]
impl AgentLookup for AgentRegistry {
    async fn resolve(&self, recipient_id: &str) -> Option<Arc<dyn InboundHandler>> {
        match recipient_id {
            "coordinator" => Some(Arc::new(Agent::Coordinator(self.coordinator.clone()))),
            "channel_administrator" => {
                Some(Arc::new(Agent::ChannelAdmin(self.channel_admin.clone())))
            }
            id => {
                let user_id = id.strip_prefix("user_agent_")?;
                let agent = self.materialize_user_agent(user_id).await?;
                Some(Arc::new(Agent::UserAgent(agent)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyRepo;

    #[async_trait]
    impl ProfileRepository for EmptyRepo {
        async fn list_active(&self) -> Vec<AgentProfile> {
            Vec::new()
        }
        async fn get(&self, _user_id: &str) -> Option<AgentProfile> {
            None
        }
    }

    #[tokio::test]
    async fn resolving_a_profile_less_user_returns_none() {
        let config = Arc::new(crate::config::Config::default());
        let events = EventBus::new(config.event_ring_capacity, config.subscriber_queue_capacity);
        let (subnet_tx, _subnet_rx) = tokio::sync::mpsc::unbounded_channel();
        let oracle_stub: Arc<dyn crate::oracle::OracleService> = Arc::new(NoopOracle);
        let oracle = Arc::new(SupervisedOracle::new(oracle_stub, config.clone(), Arc::new(events.clone())));
        let channel_admin = Arc::new(ChannelAdministrator::new(
            oracle.clone(),
            events.clone(),
            config.clone(),
            subnet_tx,
        ));
        let profiles: Arc<dyn ProfileRepository> = Arc::new(EmptyRepo);
        let coordinator = Arc::new(Coordinator::new(
            oracle.clone(),
            profiles.clone(),
            events.clone(),
            config.clone(),
        ));
        let registry = AgentRegistry::new(coordinator, channel_admin, profiles, oracle, events);
        assert!(registry.resolve("user_agent_ghost").await.is_none());
    }

    struct NoopOracle;

    #[async_trait]
    impl crate::oracle::OracleService for NoopOracle {
        async fn understand_demand(
            &self,
            _raw_text: &str,
        ) -> Result<crate::oracle::DemandUnderstanding, crate::error::OracleError> {
            unreachable!("not exercised by this test")
        }
        async fn filter_candidates(
            &self,
            _demand: &crate::domain::Demand,
            _profiles: &[AgentProfile],
        ) -> Result<Vec<crate::oracle::FilteredCandidate>, crate::error::OracleError> {
            unreachable!("not exercised by this test")
        }
        async fn generate_offer_response(
            &self,
            _demand: &crate::domain::Demand,
            _profile: &AgentProfile,
            _filter_reason: &str,
        ) -> Result<crate::domain::Offer, crate::error::OracleError> {
            unreachable!("not exercised by this test")
        }
        async fn aggregate_offers(
            &self,
            _demand: &crate::domain::Demand,
            _offers: &[crate::domain::Offer],
        ) -> Result<crate::domain::Proposal, crate::error::OracleError> {
            unreachable!("not exercised by this test")
        }
        async fn adjust_proposal(
            &self,
            _current: &crate::domain::Proposal,
            _feedback: &[crate::domain::Feedback],
        ) -> Result<crate::oracle::Adjustment, crate::error::OracleError> {
            unreachable!("not exercised by this test")
        }
        async fn identify_gaps(
            &self,
            _demand: &crate::domain::Demand,
            _proposal: &crate::domain::Proposal,
        ) -> Result<Vec<crate::domain::Gap>, crate::error::OracleError> {
            unreachable!("not exercised by this test")
        }
        async fn judge_recursion(
            &self,
            _gaps: &[crate::domain::Gap],
            _depth: u32,
            _time_remaining: std::time::Duration,
        ) -> Result<Vec<crate::domain::Gap>, crate::error::OracleError> {
            unreachable!("not exercised by this test")
        }
    }
}
