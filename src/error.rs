//! Error taxonomy for the negotiation engine.
//!
//! Follows this crate's existing `OrchestrationError` convention: plain enums
//! with a hand-written [`std::fmt::Display`] and [`std::error::Error`] impl
//! rather than a derive-macro error crate.

use std::fmt;

use crate::domain::ChannelStatus;

/// Errors surfaced at the [`crate::Engine`] boundary.
#[derive(Debug, Clone)]
pub enum EngineError {
    /// The caller asked for an operation the engine doesn't expose.
    UnknownOperation(String),
    /// The supplied [`crate::Config`] is internally inconsistent.
    ConfigurationError(String),
    /// The oracle could not be reached and no fallback was usable.
    OracleUnavailable(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnknownOperation(op) => write!(f, "unknown operation: {op}"),
            EngineError::ConfigurationError(msg) => write!(f, "configuration error: {msg}"),
            EngineError::OracleUnavailable(msg) => write!(f, "oracle unavailable: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Errors surfaced by the [`crate::router::AgentRouter`].
#[derive(Debug, Clone)]
pub enum RouterError {
    /// The addressed agent does not exist and is not a user agent the
    /// registry can lazily materialize.
    UnknownRecipient(String),
    /// The recipient's handler returned an error while processing the
    /// delivered message.
    HandlerFailed(String),
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::UnknownRecipient(id) => write!(f, "unknown recipient: {id}"),
            RouterError::HandlerFailed(msg) => write!(f, "handler failed: {msg}"),
        }
    }
}

impl std::error::Error for RouterError {}

/// Errors surfaced by channel operations.
#[derive(Debug, Clone)]
pub enum ChannelError {
    /// The administrator was asked to take a transition not present in the
    /// allowed graph. This is a programming error, not a recoverable
    /// condition; the channel is failed with `internal.invalid_transition`.
    IllegalTransition {
        from: ChannelStatus,
        to: ChannelStatus,
    },
    /// No channel exists with the given ID.
    ChannelNotFound(String),
    /// An offer arrived while the channel isn't accepting offers.
    NotAcceptingOffers(ChannelStatus),
    /// Feedback arrived while the channel isn't in NEGOTIATING.
    NotAcceptingFeedback(ChannelStatus),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::IllegalTransition { from, to } => {
                write!(f, "illegal transition: {from:?} -> {to:?}")
            }
            ChannelError::ChannelNotFound(id) => write!(f, "channel not found: {id}"),
            ChannelError::NotAcceptingOffers(status) => {
                write!(f, "channel not accepting offers in state {status:?}")
            }
            ChannelError::NotAcceptingFeedback(status) => {
                write!(f, "channel not accepting feedback in state {status:?}")
            }
        }
    }
}

impl std::error::Error for ChannelError {}

/// Errors internal to an [`crate::oracle::OracleService`] call, consumed by
/// [`crate::oracle::SupervisedOracle`] and never propagated past it — every
/// public oracle call degrades to a fallback record instead.
#[derive(Debug, Clone)]
pub enum OracleError {
    /// The call did not complete within its timeout budget.
    Timeout,
    /// The circuit breaker is open; no call was attempted.
    CircuitOpen,
    /// The upstream oracle returned an error.
    Upstream(String),
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::Timeout => write!(f, "oracle call timed out"),
            OracleError::CircuitOpen => write!(f, "oracle circuit is open"),
            OracleError::Upstream(msg) => write!(f, "oracle upstream error: {msg}"),
        }
    }
}

impl std::error::Error for OracleError {}
