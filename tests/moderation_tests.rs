use chrono::Utc;
use road_watch::{
    models::{Category, Marker},
    moderation::{Effect, InvalidTransition, ModerationState, Transition},
};
use rstest::rstest;

fn marker(approved: bool) -> Marker {
    Marker {
        id: 1,
        user_id: 1,
        lat: 50.0,
        lng: 14.0,
        category: Category::Ice,
        description: None,
        approved,
        created_at: Utc::now(),
    }
}

#[test]
fn test_state_follows_approval_flag() {
    assert_eq!(ModerationState::of(&marker(false)), ModerationState::Pending);
    assert_eq!(ModerationState::of(&marker(true)), ModerationState::Approved);
}

#[rstest]
#[case(ModerationState::Pending, Transition::Approve, Effect::MarkApproved)]
#[case(ModerationState::Approved, Transition::Approve, Effect::Unchanged)]
#[case(ModerationState::Pending, Transition::Reject, Effect::Remove)]
#[case(ModerationState::Pending, Transition::Withdraw, Effect::Remove)]
#[case(ModerationState::Approved, Transition::Withdraw, Effect::Remove)]
fn test_allowed_transitions(
    #[case] from: ModerationState,
    #[case] transition: Transition,
    #[case] effect: Effect,
) {
    assert_eq!(from.apply(transition), Ok(effect));
}

#[test]
fn test_rejecting_approved_marker_is_invalid() {
    let err = ModerationState::Approved
        .apply(Transition::Reject)
        .unwrap_err();

    assert_eq!(
        err,
        InvalidTransition {
            from: ModerationState::Approved,
            transition: Transition::Reject,
        }
    );
    assert_eq!(err.to_string(), "cannot reject a marker that is already approved");
}

#[test]
fn test_approval_is_one_way() {
    // No transition leads from Approved back to Pending.
    for transition in [Transition::Approve, Transition::Reject, Transition::Withdraw] {
        assert_ne!(
            ModerationState::Approved.apply(transition),
            Ok(Effect::MarkApproved)
        );
    }
}
