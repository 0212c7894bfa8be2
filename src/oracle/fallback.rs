//! Deterministic fallback records, one per oracle operation, returned
//! whenever the circuit is open, a call times out, or the upstream oracle
//! errors. Chosen so downstream code always sees a well-formed value — the
//! state machine degrades, it never wedges.

use crate::config::OracleOperation;
use crate::domain::Proposal;

use super::{Adjustment, DemandUnderstanding, FilteredCandidate};

/// A type that has a deterministic, well-formed placeholder value for every
/// [`OracleOperation`] that can return it.
pub trait FallbackRecord {
    fn fallback_for(op: OracleOperation) -> Self;
}

impl FallbackRecord for DemandUnderstanding {
    fn fallback_for(_op: OracleOperation) -> Self {
        DemandUnderstanding {
            surface: String::new(),
            deep: serde_json::json!({}),
            tags: Default::default(),
            uncertainties: vec!["oracle unavailable".to_string()],
            confidence: 0,
        }
    }
}

impl FallbackRecord for Vec<FilteredCandidate> {
    fn fallback_for(_op: OracleOperation) -> Self {
        // Empty: the Coordinator treats an empty filter result as
        // `no_candidates` and fails the demand cleanly.
        Vec::new()
    }
}

impl FallbackRecord for crate::domain::Offer {
    fn fallback_for(_op: OracleOperation) -> Self {
        crate::domain::Offer {
            id: uuid::Uuid::new_v4(),
            demand_id: uuid::Uuid::nil(),
            channel_id: String::new(),
            responder_agent_id: String::new(),
            decision: crate::domain::Decision::Decline,
            contribution: String::new(),
            conditions: Vec::new(),
            confidence: 0,
            rationale: "oracle unavailable".to_string(),
        }
    }
}

impl FallbackRecord for Proposal {
    fn fallback_for(_op: OracleOperation) -> Self {
        Proposal {
            channel_id: String::new(),
            version: 0,
            summary: "proposal unavailable".to_string(),
            assignments: Vec::new(),
            timeline_hint: None,
            open_questions: vec!["oracle unavailable".to_string()],
            overall_confidence: 0,
        }
    }
}

impl FallbackRecord for Adjustment {
    fn fallback_for(op: OracleOperation) -> Self {
        Adjustment {
            proposal: Proposal::fallback_for(op),
            // Without a working oracle there is nothing productive left to
            // do with this round; stop rather than loop on degraded output.
            should_continue: false,
        }
    }
}

impl FallbackRecord for Vec<crate::domain::Gap> {
    fn fallback_for(_op: OracleOperation) -> Self {
        Vec::new()
    }
}
