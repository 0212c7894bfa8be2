//! The engine: the `Agent` enum, the per-role implementations, the
//! per-channel actor, and the [`Engine`] facade that wires them together.

pub mod agent;
pub mod channel;
pub mod channel_admin;
pub mod channel_driver;
pub mod coordinator;
pub mod user_agent;

use std::sync::Arc;

use crate::config::Config;
use crate::events::{EventBus, Subscription};
use crate::oracle::{OracleService, SupervisedOracle};
use crate::registry::{AgentRegistry, ProfileRepository};
use crate::router::AgentRouter;

use agent::AgentMessage;
use channel_admin::ChannelAdministrator;
use channel_driver::SpawnSubnetRequest;
use coordinator::Coordinator;

/// The engine's public facade. `Engine::new` wires every component in the
/// non-cyclic order Design Notes §9 calls for: build the singletons first,
/// build the router from the already-constructed registry, then hand each
/// singleton a copy of the router post-hoc through a `OnceLock`.
pub struct Engine {
    router: Arc<AgentRouter>,
    coordinator: Arc<Coordinator>,
    events: EventBus,
}

impl Engine {
    pub fn new(
        config: Config,
        oracle: Arc<dyn OracleService>,
        profiles: Arc<dyn ProfileRepository>,
    ) -> Self {
        let config = Arc::new(config);
        let events = EventBus::new(config.event_ring_capacity, config.subscriber_queue_capacity);
        let supervised_oracle = Arc::new(SupervisedOracle::new(
            oracle,
            config.clone(),
            Arc::new(events.clone()),
        ));

        let (subnet_tx, mut subnet_rx) = tokio::sync::mpsc::unbounded_channel::<SpawnSubnetRequest>();

        let channel_admin = Arc::new(ChannelAdministrator::new(
            supervised_oracle.clone(),
            events.clone(),
            config.clone(),
            subnet_tx,
        ));
        let coordinator = Arc::new(Coordinator::new(
            supervised_oracle.clone(),
            profiles.clone(),
            events.clone(),
            config.clone(),
        ));
        let registry = Arc::new(AgentRegistry::new(
            coordinator.clone(),
            channel_admin.clone(),
            profiles,
            supervised_oracle,
            events.clone(),
        ));

        let router = Arc::new(AgentRouter::new(registry.clone(), config.router_dedup_window));
        registry.set_router(router.clone());

        let router_for_subnets = router.clone();
        tokio::spawn(async move {
            while let Some(request) = subnet_rx.recv().await {
                route_subnet_demand(&router_for_subnets, request).await;
            }
        });

        Engine {
            router,
            coordinator,
            events,
        }
    }

    /// Submit a new top-level demand. Returns immediately; progress is
    /// observable through [`Engine::subscribe_events`].
    ///
    /// Calls straight into the Coordinator rather than going through the
    /// Router: `SubmitDemand` is the external-facing boundary op (§6), and
    /// the Router's fingerprint is only stable entropy for inter-agent
    /// messages that already carry a channel ID. Every external submission
    /// would otherwise fingerprint identically and get deduped as a replay
    /// of the last one within `router_dedup_window`.
    pub async fn submit_demand(&self, raw_text: impl Into<String>, submitter_id: impl Into<String>) {
        let coordinator = self.coordinator.clone();
        let raw_text = raw_text.into();
        let submitter_id = submitter_id.into();
        tokio::spawn(async move {
            coordinator.on_new_demand(raw_text, submitter_id).await;
        });
    }

    pub fn subscribe_events(&self, filter: &str) -> Subscription {
        self.events.subscribe(filter)
    }

    /// No background tasks hold engine-external resources that need
    /// explicit teardown today; provided so callers have a stable shutdown
    /// hook as the engine grows one.
    pub async fn shutdown(&self) {}
}

async fn route_subnet_demand(router: &Arc<AgentRouter>, request: SpawnSubnetRequest) {
    let SpawnSubnetRequest {
        parent_channel_id,
        parent_demand_id,
        gap,
        depth,
    } = request;
    let _ = router
        .route(
            "channel_administrator",
            "coordinator",
            "subnet_demand",
            Some(&parent_channel_id),
            AgentMessage::SubnetDemand {
                parent_channel_id: parent_channel_id.clone(),
                parent_demand_id,
                gap,
                depth,
            },
        )
        .await;
}
