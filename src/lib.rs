// src/lib.rs

//! Multi-agent negotiation engine: a Coordinator and Channel Administrator
//! singleton plus per-user agents cooperate, through an Oracle Adapter and
//! an Agent Router, to turn a plain-text demand into a negotiated proposal.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod events;
pub mod oracle;
pub mod registry;
pub mod router;

pub use config::Config;
pub use domain::{
    AgentProfile, Assignment, Channel, ChannelStatus, Decision, Demand, DemandStatus, Event,
    FailureReason, Feedback, FeedbackKind, Gap, Offer, Participation, Proposal,
    SubChannelOutcome,
};
pub use engine::Engine;
pub use error::{ChannelError, EngineError, OracleError, RouterError};
pub use events::{EventBus, Recorder, Subscription};
pub use oracle::{Adjustment, DemandUnderstanding, FilteredCandidate, OracleService, SupervisedOracle};
pub use registry::{AgentRegistry, ProfileRepository};
pub use router::{AgentRouter, RouteOutcome};
