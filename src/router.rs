//! Agent Router: delivers a typed message from one agent to a named other
//! agent, deduplicating by message fingerprint to guarantee at-most-once
//! delivery per (sender, recipient, type, channel) tuple over a short
//! window.
//!
//! The router depends on the registry only through [`AgentLookup`], never on
//! the registry's concrete type — this is what breaks the cyclic reference
//! Design Notes call out: the registry implements the interface the router
//! consumes, and never holds a reference back.

use std::convert::TryInto;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::engine::agent::AgentMessage;
use crate::error::RouterError;

/// Whatever the router needs from the registry: resolve a recipient ID to
/// something that can handle an [`AgentMessage`].
#[async_trait]
pub trait AgentLookup: Send + Sync {
    async fn resolve(&self, recipient_id: &str) -> Option<Arc<dyn InboundHandler>>;
}

/// Implemented by every routable agent (Coordinator, Channel Administrator,
/// User Agent) so the router can deliver without knowing which variant it's
/// talking to.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle(&self, message: AgentMessage) -> Result<(), RouterError>;
}

/// Result of a single `route` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Delivered,
    Duplicate,
}

/// Stable fingerprint of (sender, recipient, message type, channel) used
/// for at-most-once delivery.
pub fn fingerprint(
    sender_id: &str,
    recipient_id: &str,
    message_type: &str,
    channel_id: Option<&str>,
) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(sender_id.as_bytes());
    hasher.update(b"|");
    hasher.update(recipient_id.as_bytes());
    hasher.update(b"|");
    hasher.update(message_type.as_bytes());
    hasher.update(b"|");
    hasher.update(channel_id.unwrap_or("").as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[..8].try_into().expect("sha256 digest is 32 bytes"))
}

pub struct AgentRouter {
    lookup: Arc<dyn AgentLookup>,
    seen: DashMap<u64, Instant>,
    window: Duration,
}

impl AgentRouter {
    pub fn new(lookup: Arc<dyn AgentLookup>, window: Duration) -> Self {
        Self {
            lookup,
            seen: DashMap::new(),
            window,
        }
    }

    /// Route `message` from `sender_id` to `recipient_id`. Computes the
    /// delivery fingerprint, drops silently on replay, otherwise resolves
    /// the recipient through the registry and awaits its handler.
    pub async fn route(
        &self,
        sender_id: &str,
        recipient_id: &str,
        message_type: &str,
        channel_id: Option<&str>,
        message: AgentMessage,
    ) -> Result<RouteOutcome, RouterError> {
        let key = fingerprint(sender_id, recipient_id, message_type, channel_id);

        if let Some(seen_at) = self.seen.get(&key) {
            if seen_at.elapsed() < self.window {
                log::debug!("router dropped duplicate {message_type} to {recipient_id}");
                return Ok(RouteOutcome::Duplicate);
            }
        }
        self.seen.insert(key, Instant::now());
        self.evict_expired();

        let handler = self
            .lookup
            .resolve(recipient_id)
            .await
            .ok_or_else(|| RouterError::UnknownRecipient(recipient_id.to_string()))?;

        handler
            .handle(message)
            .await
            .map_err(|e| RouterError::HandlerFailed(e.to_string()))?;

        Ok(RouteOutcome::Delivered)
    }

    /// Bound the dedup set's size per §7's resource-exhaustion handling:
    /// opportunistically sweep entries older than the window on every
    /// insert rather than running a background task.
    fn evict_expired(&self) {
        self.seen.retain(|_, seen_at| seen_at.elapsed() < self.window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_order_sensitive() {
        let a = fingerprint("sender", "recipient", "demand_offer", Some("chan-1"));
        let b = fingerprint("sender", "recipient", "demand_offer", Some("chan-1"));
        let c = fingerprint("recipient", "sender", "demand_offer", Some("chan-1"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn fingerprint_distinguishes_channel() {
        let a = fingerprint("sender", "recipient", "demand_offer", Some("chan-1"));
        let b = fingerprint("sender", "recipient", "demand_offer", Some("chan-2"));
        assert_ne!(a, b);
    }
}
