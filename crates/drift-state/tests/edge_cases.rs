//! Edge case tests for container transitions and draft writes.

use drift_state::{create, select, DriftError, StateCell, Value};
use serde_json::json;

// ============================================================================
// Container transitions
// ============================================================================

#[test]
fn test_update_with_replacement_at_root() {
    let (_, controller) = create(json!({"replace": {"type": "item", "id": "not-replaced"}}));

    let next = controller
        .update(|root| {
            let kept = root
                .at(&select!("replace", "type"))
                .cloned()
                .unwrap_or(Value::Null);
            let mut replacement = Value::from(json!({"replace": {"id": "replaced"}}));
            replacement.set_at(&select!("replace", "type"), kept)?;
            Ok(Some(replacement))
        })
        .unwrap();

    assert_eq!(
        next,
        Value::from(json!({"replace": {"id": "replaced", "type": "item"}}))
    );
}

#[test]
fn test_collection_root_update() {
    let (_, controller) = create(json!([{"type": "budget", "id": "1"}]));

    let next = controller
        .draft(|root| root.append_at(&select!(), json!({"type": "budget", "id": "2"})))
        .unwrap();

    assert_eq!(
        next,
        Value::from(json!([
            {"type": "budget", "id": "1"},
            {"type": "budget", "id": "2"}
        ]))
    );
}

#[test]
fn test_transition_replaces_root_identity_but_not_content_twins() {
    let (state, controller) = create(json!({"a": {"k": 1}, "b": {"k": 2}}));
    let next = controller
        .draft(|root| root.set_at(&select!("a", "k"), 9))
        .unwrap();

    assert!(!Value::ptr_eq(&state, &next));
    assert!(Value::ptr_eq(
        state.at(&select!("b")).unwrap(),
        next.at(&select!("b")).unwrap()
    ));
}

#[test]
fn test_replace_root_ignores_structural_equality() {
    let initial = json!({"same": true});
    let (state, controller) = create(initial.clone());

    controller.cell().replace_root(initial).unwrap();

    let replaced = controller.state().unwrap();
    // Equal content, but a brand-new tree: replacement is unconditional.
    assert_eq!(replaced, state);
    assert!(!Value::ptr_eq(&replaced, &state));
}

#[test]
fn test_observer_injected_at_construction() {
    use std::sync::{Arc, Mutex};

    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let cell = StateCell::with_observer(json!({"n": 0}), move |snapshot| {
        sink.lock().unwrap().push(snapshot.clone());
    });

    let controller = cell.controller();
    controller
        .draft(|root| root.set_at(&select!("n"), 1))
        .unwrap();
    controller
        .draft(|root| root.set_at(&select!("n"), 2))
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], Value::from(json!({"n": 1})));
    assert_eq!(seen[1], Value::from(json!({"n": 2})));
}

#[test]
fn test_update_inside_update_is_rejected() {
    let (_, controller) = create(json!({"n": 0}));
    let other = controller.clone();

    controller
        .draft(|root| {
            let nested = other.draft(|r| r.set_at(&select!("n"), 1));
            assert!(matches!(nested, Err(DriftError::InvalidTransaction { .. })));
            root.set_at(&select!("n"), 2)
        })
        .unwrap();

    assert_eq!(controller.state().unwrap(), Value::from(json!({"n": 2})));
}

// ============================================================================
// Draft writes
// ============================================================================

#[test]
fn test_set_at_deeply_missing_chain_creates_records() {
    let (_, controller) = create(json!({}));
    let next = controller
        .draft(|root| root.set_at(&select!("a", "b", "c", "d"), 42))
        .unwrap();
    assert_eq!(next, Value::from(json!({"a": {"b": {"c": {"d": 42}}}})));
}

#[test]
fn test_delete_at_inside_transition() {
    let (_, controller) = create(json!({"a": {"b": {"c": 1, "d": 2}}}));
    let next = controller
        .draft(|root| {
            root.delete_at(&select!("a", "b", "c"));
            Ok(())
        })
        .unwrap();
    assert_eq!(next, Value::from(json!({"a": {"b": {"d": 2}}})));
}

#[test]
fn test_delete_from_collection_shifts_left() {
    let (_, controller) = create(json!({"arr": [1, 2, 3]}));
    let next = controller
        .draft(|root| {
            root.delete_at(&select!("arr", 1));
            Ok(())
        })
        .unwrap();
    assert_eq!(next, Value::from(json!({"arr": [1, 3]})));
}

#[test]
fn test_append_at_nested_collection() {
    let (_, controller) = create(json!({"a": {"b": {"items": [1]}}}));
    let next = controller
        .draft(|root| root.append_at(&select!("a", "b", "items"), 2))
        .unwrap();
    assert_eq!(
        next.at(&select!("a", "b", "items")),
        Some(&Value::from(json!([1, 2])))
    );
}

#[test]
fn test_append_to_scalar_slot_aborts_transition() {
    let (_, controller) = create(json!({"x": 1}));
    let err = controller
        .draft(|root| root.append_at(&select!("x"), 2))
        .unwrap_err();
    assert!(matches!(err, DriftError::TypeMismatch { .. }));
    assert_eq!(controller.state().unwrap(), Value::from(json!({"x": 1})));
}

#[test]
fn test_set_at_out_of_bounds_aborts_transition() {
    let (_, controller) = create(json!({"arr": [1, 2, 3]}));
    let err = controller
        .draft(|root| root.set_at(&select!("arr", 10), 0))
        .unwrap_err();
    assert!(matches!(
        err,
        DriftError::IndexOutOfBounds { index: 10, len: 3, .. }
    ));
    assert_eq!(
        controller.state().unwrap(),
        Value::from(json!({"arr": [1, 2, 3]}))
    );
}
