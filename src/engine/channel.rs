//! Pure state-machine rules for a [`Channel`](crate::domain::Channel):
//! the allowed transition graph and the round-outcome arithmetic. Kept
//! free of I/O so the graph itself — the part property tests pin down —
//! is trivial to exercise in isolation from the actor that drives it.

use crate::domain::ChannelStatus;

/// Whether `from -> to` is one of the edges in §4.2's transition table.
/// Anything else is a programming error the driver must fail loudly on.
pub fn is_allowed_transition(from: ChannelStatus, to: ChannelStatus) -> bool {
    use ChannelStatus::*;
    if from.is_terminal() {
        return false;
    }
    match (from, to) {
        (Created, Broadcasting) => true,
        (Broadcasting, Collecting) => true,
        (Collecting, Aggregating) => true,
        (Collecting, Failed) => true,
        (Aggregating, ProposalSent) => true,
        (ProposalSent, Negotiating) => true,
        (Negotiating, Finalized) => true,
        (Negotiating, Failed) => true,
        (Negotiating, Collecting) => true,
        // "any non-terminal -> FAILED" (core participant withdrew, no
        // replacement) is already covered for Collecting/Negotiating above;
        // the remaining non-terminal states reach it here.
        (Created | Broadcasting | Aggregating | ProposalSent, Failed) => true,
        _ => false,
    }
}

/// Outcome of evaluating a completed negotiation round against the
/// configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Finalize,
    Fail,
    AdjustAndContinue,
}

/// §4.2's negotiation round arithmetic: accept rate, withdraw rate, and the
/// three-way branch between finalizing, failing, and adjusting for another
/// round.
pub fn evaluate_round(
    accepts: usize,
    withdraws: usize,
    participants: usize,
    round: u32,
    max_rounds: u32,
    accept_rate_threshold: f64,
    withdraw_rate_threshold: f64,
) -> RoundOutcome {
    if participants == 0 {
        return RoundOutcome::Fail;
    }
    let accept_rate = accepts as f64 / participants as f64;
    let withdraw_rate = withdraws as f64 / participants as f64;

    if accept_rate >= accept_rate_threshold || accepts == participants {
        RoundOutcome::Finalize
    } else if withdraw_rate > withdraw_rate_threshold
        || (round >= max_rounds && accept_rate < 0.5)
    {
        RoundOutcome::Fail
    } else {
        RoundOutcome::AdjustAndContinue
    }
}
