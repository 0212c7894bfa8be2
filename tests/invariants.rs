//! Property-based checks of the negotiation engine's quantified invariants
//! (§8): participation nesting, round bounds, and round-outcome arithmetic
//! under randomized inputs rather than a handful of fixed examples.

use std::collections::HashSet;

use proptest::prelude::*;

use negotiation_engine::Participation;

fn id_pool() -> Vec<String> {
    (0..12).map(|i| format!("agent-{i}")).collect()
}

/// Build a `Participation` whose three sets are nested by construction:
/// `participating` is drawn from `responded`, which is drawn from `invited`.
fn nested_participation(
    invited_mask: Vec<bool>,
    responded_mask: Vec<bool>,
    participating_mask: Vec<bool>,
) -> Participation {
    let pool = id_pool();
    let invited: HashSet<String> = pool
        .iter()
        .zip(invited_mask.iter())
        .filter(|(_, &on)| on)
        .map(|(id, _)| id.clone())
        .collect();
    let responded: HashSet<String> = invited
        .iter()
        .zip(responded_mask.iter().chain(std::iter::repeat(&false)))
        .filter(|(_, &on)| on)
        .map(|(id, _)| id.clone())
        .collect();
    let participating: HashSet<String> = responded
        .iter()
        .zip(participating_mask.iter().chain(std::iter::repeat(&false)))
        .filter(|(_, &on)| on)
        .map(|(id, _)| id.clone())
        .collect();
    Participation {
        invited,
        responded,
        participating,
    }
}

proptest! {
    /// `participating ⊆ responded ⊆ invited` holds for any participation
    /// built by successive filtering, however the masks are chosen.
    #[test]
    fn participation_nesting_always_holds(
        invited_mask in prop::collection::vec(any::<bool>(), 0..12),
        responded_mask in prop::collection::vec(any::<bool>(), 0..12),
        participating_mask in prop::collection::vec(any::<bool>(), 0..12),
    ) {
        let participation = nested_participation(invited_mask, responded_mask, participating_mask);
        prop_assert!(participation.invariant_holds());
    }

    /// Flipping one member of `participating` out of `responded` breaks the
    /// invariant — the check isn't vacuously true.
    #[test]
    fn a_participant_outside_responded_violates_the_invariant(
        invited_mask in prop::collection::vec(any::<bool>(), 1..12),
    ) {
        let pool = id_pool();
        let invited: HashSet<String> = pool
            .iter()
            .zip(invited_mask.iter())
            .filter(|(_, &on)| on)
            .map(|(id, _)| id.clone())
            .collect();
        prop_assume!(!invited.is_empty());
        let stray = invited.iter().next().cloned().unwrap();
        let participation = Participation {
            invited,
            responded: HashSet::new(),
            participating: [stray].into_iter().collect(),
        };
        prop_assert!(!participation.invariant_holds());
    }
}

use negotiation_engine::engine::channel::{evaluate_round, RoundOutcome};

proptest! {
    /// A round where every participant accepted always finalizes, regardless
    /// of the configured threshold (as long as it's <= 1.0) or round number.
    #[test]
    fn unanimous_acceptance_always_finalizes(
        participants in 1usize..20,
        round in 0u32..10,
        max_rounds in 1u32..10,
        accept_rate_threshold in 0.0f64..=1.0,
        withdraw_rate_threshold in 0.0f64..=1.0,
    ) {
        let outcome = evaluate_round(
            participants,
            0,
            participants,
            round,
            max_rounds,
            accept_rate_threshold,
            withdraw_rate_threshold,
        );
        prop_assert_eq!(outcome, RoundOutcome::Finalize);
    }

    /// Zero participants never finalizes or continues — it always fails,
    /// since there's nobody left to negotiate with.
    #[test]
    fn zero_participants_always_fails(
        accepts in 0usize..5,
        withdraws in 0usize..5,
        round in 0u32..10,
        max_rounds in 1u32..10,
        accept_rate_threshold in 0.0f64..=1.0,
        withdraw_rate_threshold in 0.0f64..=1.0,
    ) {
        let outcome = evaluate_round(
            accepts,
            withdraws,
            0,
            round,
            max_rounds,
            accept_rate_threshold,
            withdraw_rate_threshold,
        );
        prop_assert_eq!(outcome, RoundOutcome::Fail);
    }

    /// Once the withdraw rate clears its threshold, the round never
    /// continues into another round — it fails outright.
    #[test]
    fn withdraw_rate_above_threshold_never_continues(
        participants in 1usize..20,
        round in 0u32..3,
        max_rounds in 3u32..10,
        withdraw_rate_threshold in 0.0f64..1.0,
    ) {
        let withdraws = participants; // rate == 1.0, clears any threshold < 1.0
        let outcome = evaluate_round(
            0,
            withdraws,
            participants,
            round,
            max_rounds,
            1.1, // accept threshold unreachable, isolates the withdraw branch
            withdraw_rate_threshold,
        );
        prop_assert_ne!(outcome, RoundOutcome::AdjustAndContinue);
    }
}
