use proptest::prelude::*;

use super::{EntityStatusController, InvalidStatusTransition, TransitionPolicy};
use crate::domain::entity::Effort;
use crate::domain::entity_class::EntityClass;
use crate::domain::state::StateId;
use crate::test_support::{at, entity, task, task_states};

#[test]
fn scenario_a_completing_backfills_actual_and_stamps_completion() {
    let set = task_states();
    let now = at("2026-03-10T09:30:00Z");
    let before = task("tk-a", 1, 8.0, 0.0);

    let after = EntityStatusController::apply(&before, &StateId::Number(3), &set, now);

    assert_eq!(after.status, StateId::Number(3));
    assert_eq!(
        after.effort,
        Some(Effort {
            estimated: 8.0,
            actual: 8.0
        })
    );
    assert_eq!(after.completed_at, Some(now));
    assert_eq!(before.status, StateId::Number(1), "input must not be mutated");
}

#[test]
fn scenario_b_reopening_clears_completion_and_actual() {
    let set = task_states();
    let mut before = task("tk-b", 3, 8.0, 8.0);
    before.completed_at = Some(at("2026-03-01T00:00:00Z"));

    let after =
        EntityStatusController::apply(&before, &StateId::Number(2), &set, at("2026-03-02T00:00:00Z"));

    assert_eq!(after.status, StateId::Number(2));
    assert_eq!(
        after.effort,
        Some(Effort {
            estimated: 8.0,
            actual: 0.0
        })
    );
    assert_eq!(after.completed_at, None);
}

#[test]
fn completing_never_overwrites_recorded_actual() {
    let set = task_states();
    let after = EntityStatusController::apply(
        &task("tk-c", 2, 8.0, 5.5),
        &StateId::Number(3),
        &set,
        at("2026-03-10T00:00:00Z"),
    );
    assert_eq!(after.effort.map(|effort| effort.actual), Some(5.5));
}

#[test]
fn entities_without_effort_only_get_timestamps() {
    let set = task_states();
    let epic = entity("ep-1", EntityClass::Epic, 2i64);
    let done = EntityStatusController::apply(&epic, &StateId::Number(3), &set, at("2026-03-10T00:00:00Z"));
    assert!(done.effort.is_none());
    assert!(done.completed_at.is_some());
}

#[test]
fn non_boundary_transitions_only_touch_status() {
    let set = task_states();
    let before = task("tk-d", 1, 3.0, 1.0);
    let after = EntityStatusController::apply(&before, &StateId::Number(2), &set, at("2026-03-10T00:00:00Z"));
    let mut expected = before.clone();
    expected.status = StateId::Number(2);
    assert_eq!(after, expected);
}

#[test]
fn unknown_target_falls_back_to_default_state() {
    let set = task_states();
    let mut before = task("tk-e", 3, 2.0, 2.0);
    before.completed_at = Some(at("2026-03-01T00:00:00Z"));
    let after = EntityStatusController::apply(
        &before,
        &StateId::from("archivada"),
        &set,
        at("2026-03-10T00:00:00Z"),
    );
    assert_eq!(after.status, StateId::Number(1));
    assert_eq!(after.completed_at, None);
}

#[test]
fn stale_current_status_is_treated_as_non_terminal() {
    let set = task_states();
    let now = at("2026-03-10T00:00:00Z");
    let stale = task("tk-f", 77, 4.0, 0.0);
    let after = EntityStatusController::apply(&stale, &StateId::Number(3), &set, now);
    assert_eq!(after.completed_at, Some(now));
    assert_eq!(after.effort.map(|effort| effort.actual), Some(4.0));
}

#[test]
fn advisory_policy_allows_leaving_final_states() {
    let set = task_states();
    assert!(EntityStatusController::check_transition(
        &set,
        &StateId::Number(3),
        &StateId::Number(1),
        false,
        TransitionPolicy::Advisory,
    )
    .is_ok());
}

#[test]
fn strict_policy_requires_force_to_leave_final_states() {
    let set = task_states();
    let err = EntityStatusController::check_transition(
        &set,
        &StateId::Number(3),
        &StateId::Number(2),
        false,
        TransitionPolicy::Strict,
    )
    .expect_err("strict policy should reject reopening");
    assert_eq!(
        err,
        InvalidStatusTransition {
            from: StateId::Number(3),
            to: StateId::Number(2),
        }
    );
    assert!(err.to_string().contains("requires --force"));

    assert!(EntityStatusController::check_transition(
        &set,
        &StateId::Number(3),
        &StateId::Number(2),
        true,
        TransitionPolicy::Strict,
    )
    .is_ok());
    assert!(EntityStatusController::check_transition(
        &set,
        &StateId::Number(1),
        &StateId::Number(3),
        false,
        TransitionPolicy::Strict,
    )
    .is_ok());
}

fn status_strategy() -> impl Strategy<Value = i64> {
    1i64..=3
}

proptest! {
    #[test]
    fn prop_applying_current_status_is_a_no_op(
        status in status_strategy(),
        estimated in 0.0f64..40.0,
        actual in 0.0f64..40.0,
        stamped in any::<bool>(),
    ) {
        let set = task_states();
        let mut before = task("tk-p1", status, estimated, actual);
        if stamped {
            before.completed_at = Some(at("2026-02-01T00:00:00Z"));
        }
        let after = EntityStatusController::apply(
            &before,
            &before.status.clone(),
            &set,
            at("2026-04-01T00:00:00Z"),
        );
        prop_assert_eq!(after, before);
    }

    #[test]
    fn prop_entering_final_state_sets_completion(
        from in 1i64..=2,
        estimated in 0.5f64..40.0,
        actual in prop_oneof![Just(0.0f64), 0.5f64..40.0],
    ) {
        let set = task_states();
        let now = at("2026-04-01T00:00:00Z");
        let after = EntityStatusController::apply(
            &task("tk-p2", from, estimated, actual),
            &StateId::Number(3),
            &set,
            now,
        );
        prop_assert_eq!(after.completed_at, Some(now));
        let expected_actual = if actual == 0.0 { estimated } else { actual };
        prop_assert_eq!(after.effort.map(|effort| effort.actual), Some(expected_actual));
    }

    #[test]
    fn prop_leaving_final_state_clears_completion(
        to in 1i64..=2,
        estimated in 0.0f64..40.0,
        actual in 0.0f64..40.0,
    ) {
        let set = task_states();
        let mut before = task("tk-p3", 3, estimated, actual);
        before.completed_at = Some(at("2026-02-01T00:00:00Z"));
        let after = EntityStatusController::apply(
            &before,
            &StateId::Number(to),
            &set,
            at("2026-04-01T00:00:00Z"),
        );
        prop_assert_eq!(after.completed_at, None);
        prop_assert_eq!(after.effort.map(|effort| effort.actual), Some(0.0));
    }
}
