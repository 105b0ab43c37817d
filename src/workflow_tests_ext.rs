use std::error::Error;

use serde_json::json;

use super::{RegistryError, StateSet, StateSetEdit, StateSetError, StateSetRegistry};
use crate::domain::entity_class::EntityClass;
use crate::domain::state::{State, StateId};

fn scenario_set() -> StateSet {
    StateSet::from_json(&json!({
        "states": [
            { "id": 1, "label": "Pendiente", "isDefault": true, "isProtected": true },
            { "id": 2, "label": "En progreso" },
            { "id": 3, "label": "Completada", "isProtected": true }
        ],
        "default_state": 1,
        "final_states": [3],
        "reopen_state": 2
    }))
    .expect("scenario state set should be valid")
}

fn kanban_set() -> StateSet {
    StateSet::from_json(&json!({
        "states": [
            { "id": "backlog", "label": "Backlog", "isDefault": true },
            { "id": "doing", "label": "Doing" },
            { "id": "qa", "label": "QA" },
            { "id": "done", "label": "Done", "isProtected": true },
            { "id": "archived", "label": "Archived" }
        ],
        "default_state": "backlog",
        "final_states": ["done", "archived"]
    }))
    .expect("kanban state set should be valid")
}

#[test]
fn resolve_returns_exact_match_or_default() {
    let set = scenario_set();
    assert_eq!(set.resolve(&StateId::Number(2)).label, "En progreso");
    assert_eq!(
        set.resolve(&StateId::from("not-a-real-id")).id,
        StateId::Number(1)
    );
    assert_eq!(set.resolve(&StateId::Number(99)).id, StateId::Number(1));
}

#[test]
fn terminal_and_transition_queries_follow_final_states() {
    let set = scenario_set();
    assert!(set.is_terminal(&StateId::Number(3)));
    assert!(!set.is_terminal(&StateId::Number(1)));
    assert!(!set.is_terminal(&StateId::from("3")));

    assert!(set.is_valid_transition(&StateId::Number(1), &StateId::Number(3)));
    assert!(set.is_valid_transition(&StateId::Number(2), &StateId::Number(1)));
    assert!(set.is_valid_transition(&StateId::Number(3), &StateId::Number(3)));
    assert!(!set.is_valid_transition(&StateId::Number(3), &StateId::Number(2)));
}

#[test]
fn ordered_states_are_preserved_through_json_round_trip() {
    let set = kanban_set();
    let ids = |set: &StateSet| {
        set.ordered_states()
            .iter()
            .map(|state| state.id.to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&set), ["backlog", "doing", "qa", "done", "archived"]);

    let round_tripped = StateSet::from_json(&set.to_json()).expect("round trip should parse");
    assert_eq!(round_tripped, set);
    assert_eq!(ids(&round_tripped), ids(&set));
}

#[test]
fn canonical_terminal_is_first_final_in_order() {
    let set = kanban_set();
    assert_eq!(
        set.canonical_terminal().map(|state| state.id.clone()),
        Some(StateId::from("done"))
    );
    assert!(set.reopen().is_none());
}

#[test]
fn configured_ids_are_normalized_to_their_stored_form() {
    let set = StateSet::from_json(&json!({
        "states": [
            { "id": "To-Do", "label": "To do", "isDefault": true },
            { "id": "Doing", "label": "Doing" },
            { "id": "Done", "label": "Done" },
            { "id": "1", "label": "Numbered" }
        ],
        "default_state": "TO-DO",
        "final_states": ["Done", "1"],
        "reopen_state": "doing"
    }))
    .expect("mixed-case ids should load");

    let ids: Vec<StateId> = set.ordered_states().iter().map(|s| s.id.clone()).collect();
    assert_eq!(
        ids,
        vec![
            StateId::from("to_do"),
            StateId::from("doing"),
            StateId::from("done"),
            StateId::Number(1)
        ]
    );
    assert_eq!(set.default_state(), &StateId::from("to_do"));
    assert_eq!(set.reopen_state(), Some(&StateId::from("doing")));
    for id in set.final_states() {
        let stored = StateId::parse(&id.to_string()).expect("stored text should parse");
        assert!(set.is_terminal(&stored), "{id} should stay final after storage");
    }

    let added = set
        .edited(&StateSetEdit::AddState {
            state: State::new("Archived", "Archived"),
            position: None,
            terminal: true,
        })
        .expect("add should normalize the new id");
    assert!(added.is_terminal(&StateId::from("archived")));

    assert_eq!(
        StateSet::from_json(&json!({
            "states": [
                { "id": "done", "label": "Done" },
                { "id": "DONE", "label": "Shouting" }
            ],
            "default_state": "done"
        })),
        Err(StateSetError::DuplicateState(StateId::from("done")))
    );
    assert_eq!(
        StateSet::from_json(&json!({
            "states": [{ "id": " ", "label": "Blank" }],
            "default_state": " "
        })),
        Err(StateSetError::EmptyStateId)
    );
}

#[test]
fn final_states_are_deduplicated_in_order() {
    let set = StateSet::from_json(&json!({
        "states": [
            { "id": 1, "label": "Open" },
            { "id": 2, "label": "Closed" },
            { "id": 3, "label": "Cancelled" }
        ],
        "default_state": 1,
        "final_states": [3, 2, 3, "2"]
    }))
    .expect("duplicate final ids should collapse");
    assert_eq!(set.final_states(), &[StateId::Number(3), StateId::Number(2)]);
    assert_eq!(
        StateSet::from_json(&set.to_json()).expect("round trip should parse"),
        set
    );
}

#[test]
fn malformed_state_sets_are_configuration_errors() {
    assert_eq!(
        StateSet::from_json(&json!({ "default_state": 1 })),
        Err(StateSetError::MissingStates)
    );
    assert_eq!(
        StateSet::from_json(&json!({ "states": {"id": 1}, "default_state": 1 })),
        Err(StateSetError::StatesNotArray)
    );
    assert_eq!(
        StateSet::from_json(&json!("nope")),
        Err(StateSetError::MissingStates)
    );
    assert!(matches!(
        StateSet::from_json(&json!({ "states": [{ "id": 1 }], "default_state": 1 })),
        Err(StateSetError::Malformed(_))
    ));
    assert_eq!(
        StateSet::from_json(&json!({ "states": [], "default_state": 1 })),
        Err(StateSetError::Empty)
    );
}

#[test]
fn invariant_violations_are_reported() {
    let states = json!([
        { "id": 1, "label": "One" },
        { "id": 2, "label": "Two" }
    ]);
    assert_eq!(
        StateSet::from_json(&json!({ "states": states, "default_state": 7 })),
        Err(StateSetError::UnknownDefault(StateId::Number(7)))
    );
    assert_eq!(
        StateSet::from_json(&json!({
            "states": states, "default_state": 1, "final_states": [9]
        })),
        Err(StateSetError::UnknownFinal(StateId::Number(9)))
    );
    assert_eq!(
        StateSet::from_json(&json!({
            "states": [{ "id": 1, "label": "A" }, { "id": 1, "label": "B" }],
            "default_state": 1
        })),
        Err(StateSetError::DuplicateState(StateId::Number(1)))
    );
    assert_eq!(
        StateSet::from_json(&json!({
            "states": [
                { "id": 1, "label": "One" },
                { "id": 2, "label": "Two", "isDefault": true }
            ],
            "default_state": 1
        })),
        Err(StateSetError::DefaultFlagMismatch {
            flagged: StateId::Number(2),
            default_state: StateId::Number(1),
        })
    );
    assert_eq!(
        StateSet::from_json(&json!({
            "states": [
                { "id": 1, "label": "One", "isDefault": true },
                { "id": 2, "label": "Two", "isDefault": true }
            ],
            "default_state": 1
        })),
        Err(StateSetError::MultipleDefaults)
    );
    assert_eq!(
        StateSet::from_json(&json!({
            "states": states, "default_state": 1, "final_states": [2], "reopen_state": 2
        })),
        Err(StateSetError::InvalidReopen(StateId::Number(2)))
    );
    assert_eq!(
        StateSet::from_json(&json!({
            "states": states, "default_state": 1, "reopen_state": 1
        })),
        Err(StateSetError::InvalidReopen(StateId::Number(1)))
    );
}

#[test]
fn protected_default_and_reopen_states_cannot_be_removed() {
    let set = scenario_set();
    assert_eq!(
        set.with_state_removed(&StateId::Number(3)),
        Err(StateSetError::ProtectedState(StateId::Number(3)))
    );
    assert_eq!(
        set.with_state_removed(&StateId::Number(2)),
        Err(StateSetError::RemoveReopen(StateId::Number(2)))
    );
    assert_eq!(
        set.with_state_removed(&StateId::Number(42)),
        Err(StateSetError::UnknownState(StateId::Number(42)))
    );

    let unprotected_default = StateSet::from_json(&json!({
        "states": [{ "id": "a", "label": "A" }, { "id": "b", "label": "B" }],
        "default_state": "a"
    }))
    .unwrap();
    assert_eq!(
        unprotected_default.with_state_removed(&StateId::from("a")),
        Err(StateSetError::RemoveDefault(StateId::from("a")))
    );
}

#[test]
fn removing_a_final_state_drops_it_from_final_states() {
    let set = kanban_set();
    let edited = set
        .with_state_removed(&StateId::from("archived"))
        .expect("unprotected final state should be removable");
    assert_eq!(edited.final_states(), &[StateId::from("done")]);
    assert!(!edited.contains(&StateId::from("archived")));
    assert!(set.contains(&StateId::from("archived")), "input is untouched");
}

#[test]
fn edits_add_move_and_flag_states() {
    let set = kanban_set();
    let edited = set
        .edited(&StateSetEdit::AddState {
            state: State::new("blocked", "Blocked"),
            position: Some(2),
            terminal: false,
        })
        .expect("add should succeed");
    assert_eq!(edited.position(&StateId::from("blocked")), Some(2));

    let moved = edited
        .edited(&StateSetEdit::MoveState {
            id: StateId::from("blocked"),
            index: 100,
        })
        .expect("move should clamp");
    assert_eq!(moved.position(&StateId::from("blocked")), Some(5));

    let redefaulted = moved
        .edited(&StateSetEdit::SetDefault(StateId::from("doing")))
        .expect("default change should succeed");
    assert_eq!(redefaulted.default().id, StateId::from("doing"));
    assert_eq!(
        redefaulted
            .ordered_states()
            .iter()
            .filter(|state| state.is_default)
            .count(),
        1
    );

    let not_final = redefaulted
        .edited(&StateSetEdit::SetFinal {
            id: StateId::from("archived"),
            terminal: false,
        })
        .expect("unmark final should succeed");
    assert!(!not_final.is_terminal(&StateId::from("archived")));

    assert_eq!(
        set.edited(&StateSetEdit::AddState {
            state: State::new("done", "Again"),
            position: None,
            terminal: false,
        }),
        Err(StateSetError::DuplicateState(StateId::from("done")))
    );
}

#[test]
fn reopen_state_cannot_become_final() {
    let set = scenario_set();
    assert_eq!(
        set.with_final(&StateId::Number(2), true),
        Err(StateSetError::InvalidReopen(StateId::Number(2)))
    );
    let cleared = set.with_reopen(None).expect("clearing reopen should succeed");
    assert!(cleared.reopen_state().is_none());
    assert!(cleared.with_final(&StateId::Number(2), true).is_ok());
}

#[test]
fn registry_rejects_incomplete_or_invalid_files() {
    assert!(matches!(
        StateSetRegistry::from_toml("not = "),
        Err(RegistryError::Toml(_))
    ));
    assert!(matches!(
        StateSetRegistry::from_toml(""),
        Err(RegistryError::MissingClass(EntityClass::Epic))
    ));
    assert!(matches!(
        StateSetRegistry::from_toml("[state_sets.project]\ndefault_state = 1\nstates = []\n"),
        Err(RegistryError::UnknownClass(_))
    ));

    let err = StateSetRegistry::from_toml("[state_sets.task]\ndefault_state = 1\n")
        .expect_err("missing states should fail");
    assert!(matches!(
        err,
        RegistryError::InvalidStateSet {
            class: EntityClass::Task,
            source: StateSetError::MissingStates,
        }
    ));
    assert!(err.source().is_some());
}

#[test]
fn registry_override_replaces_one_class() {
    let registry = StateSetRegistry::builtin()
        .expect("builtin should load")
        .with_override(EntityClass::Story, kanban_set());
    let story = registry.require(EntityClass::Story).unwrap();
    assert_eq!(story.default_state(), &StateId::from("backlog"));
    let task = registry.require(EntityClass::Task).unwrap();
    assert_eq!(task.default_state(), &StateId::Number(1));
}
