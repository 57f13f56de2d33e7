//! The draft engine: imperative mutation in, structurally-shared snapshot out.
//!
//! [`produce`] hands the mutator a draft of the current snapshot. The draft
//! is a cheap clone whose every branch is shared with the original; writes
//! go through `Arc::make_mut`, so exactly the ancestor chains that were
//! written detach while everything untouched keeps its allocation. The
//! mutator's borrow of the draft ends when the mutator returns — a draft
//! cannot outlive its transition.

use crate::{DriftError, DriftResult, Kind, Seg, Selector, Value};
use std::sync::Arc;

/// Compute the next snapshot from `current` and one imperative mutator.
///
/// The mutator runs exactly once, synchronously. It may write to the draft
/// in place and return `Ok(None)`, or return `Ok(Some(replacement))` to
/// replace the whole node (the replacement must be shape-compatible with
/// the node it replaces). `current` is never modified; on error nothing is
/// produced and the caller's snapshot stands.
///
/// # Examples
///
/// ```
/// use drift_state::{produce, select, Value};
/// use serde_json::json;
///
/// let current = Value::from(json!({"attributes": {"status": "idle"}, "id": "1"}));
/// let next = produce(&current, |draft| {
///     draft.set_at(&select!("attributes", "status"), "successful")?;
///     Ok(None)
/// })
/// .unwrap();
///
/// assert_eq!(
///     next.at(&select!("attributes", "status")),
///     Some(&Value::from("successful"))
/// );
/// // The original snapshot is untouched.
/// assert_eq!(
///     current.at(&select!("attributes", "status")),
///     Some(&Value::from("idle"))
/// );
/// ```
pub fn produce<F>(current: &Value, mutator: F) -> DriftResult<Value>
where
    F: FnOnce(&mut Value) -> DriftResult<Option<Value>>,
{
    let mut draft = current.clone();
    match mutator(&mut draft)? {
        Some(replacement) => {
            check_replacement(&Selector::root(), current, &replacement)?;
            Ok(replacement)
        }
        None => Ok(draft),
    }
}

/// In-place-only variant of [`produce`] for mutators with nothing to return.
pub fn produce_draft<F>(current: &Value, mutator: F) -> DriftResult<Value>
where
    F: FnOnce(&mut Value) -> DriftResult<()>,
{
    produce(current, |draft| {
        mutator(draft)?;
        Ok(None)
    })
}

/// A replacement must keep the shape of the slot it replaces: record for
/// record, collection for collection. Null and scalar slots accept anything.
pub(crate) fn check_replacement(
    path: &Selector,
    slot: &Value,
    replacement: &Value,
) -> DriftResult<()> {
    let compatible = match slot.kind() {
        Kind::Record => replacement.is_record(),
        Kind::Collection => replacement.is_collection(),
        _ => true,
    };
    if compatible {
        Ok(())
    } else {
        Err(DriftError::type_mismatch(
            path.clone(),
            slot.type_name(),
            replacement.type_name(),
        ))
    }
}

impl Value {
    /// Set a value at the selected slot, creating intermediate records for
    /// missing keys on the way down.
    ///
    /// Errors with `IndexOutOfBounds` for an out-of-range collection index
    /// and `TypeMismatch` when an index segment meets a non-collection.
    pub fn set_at(&mut self, selector: &Selector, value: impl Into<Value>) -> DriftResult<()> {
        set_segments(self, selector.segments(), value.into(), selector)
    }

    /// Delete the selected slot. Returns `false` (and changes nothing) when
    /// the path does not resolve.
    pub fn delete_at(&mut self, selector: &Selector) -> bool {
        if selector.is_empty() {
            *self = Value::Null;
            return true;
        }
        delete_segments(self, selector.segments())
    }

    /// Append a value to the collection at the selected slot, creating the
    /// collection when the slot is missing or null.
    pub fn append_at(&mut self, selector: &Selector, value: impl Into<Value>) -> DriftResult<()> {
        let target = reach_or_create(self, selector, 0, Value::collection)?;
        let found = target.type_name();
        match target {
            Value::Collection(items) => {
                Arc::make_mut(items).push(value.into());
                Ok(())
            }
            _ => Err(DriftError::type_mismatch(
                selector.clone(),
                "collection",
                found,
            )),
        }
    }

    /// Insert a value at `index` in the collection at the selected slot,
    /// shifting later elements right. The slot must already exist.
    pub fn insert_at(
        &mut self,
        selector: &Selector,
        index: usize,
        value: impl Into<Value>,
    ) -> DriftResult<()> {
        let target = self
            .at_mut(selector)
            .ok_or_else(|| DriftError::path_not_found(selector.clone()))?;
        let found = target.type_name();
        match target {
            Value::Collection(items) => {
                let items = Arc::make_mut(items);
                if index > items.len() {
                    return Err(DriftError::index_out_of_bounds(
                        selector.clone(),
                        index,
                        items.len(),
                    ));
                }
                items.insert(index, value.into());
                Ok(())
            }
            _ => Err(DriftError::type_mismatch(
                selector.clone(),
                "collection",
                found,
            )),
        }
    }
}

/// Recursively set a value, creating intermediate records as needed.
fn set_segments(
    current: &mut Value,
    segments: &[Seg],
    value: Value,
    full: &Selector,
) -> DriftResult<()> {
    match segments {
        [] => {
            *current = value;
            Ok(())
        }
        [Seg::Key(key), rest @ ..] => {
            if !current.is_record() {
                *current = Value::record();
            }
            let map = current.record_mut().unwrap();

            if rest.is_empty() {
                map.insert(key.clone(), value);
            } else {
                let entry = map.entry(key.clone()).or_insert(Value::Null);
                set_segments(entry, rest, value, full)?;
            }
            Ok(())
        }
        [Seg::Index(index), rest @ ..] => {
            if !current.is_collection() {
                return Err(DriftError::type_mismatch(
                    full.clone(),
                    "collection",
                    current.type_name(),
                ));
            }
            let items = current.collection_mut().unwrap();
            let len = items.len();
            let slot = items
                .get_mut(*index)
                .ok_or_else(|| DriftError::index_out_of_bounds(full.clone(), *index, len))?;

            if rest.is_empty() {
                *slot = value;
            } else {
                set_segments(slot, rest, value, full)?;
            }
            Ok(())
        }
    }
}

/// Try to delete the slot at `segments`. Returns true if something was
/// removed.
fn delete_segments(current: &mut Value, segments: &[Seg]) -> bool {
    match segments {
        [] => false,
        [Seg::Key(key)] => match current {
            Value::Record(map) => {
                if map.contains_key(key.as_str()) {
                    Arc::make_mut(map).remove(key).is_some()
                } else {
                    false
                }
            }
            _ => false,
        },
        [Seg::Index(index)] => match current {
            Value::Collection(items) => {
                if *index < items.len() {
                    Arc::make_mut(items).remove(*index);
                    true
                } else {
                    false
                }
            }
            _ => false,
        },
        [Seg::Key(key), rest @ ..] => match current {
            Value::Record(map) => {
                if !map.contains_key(key.as_str()) {
                    return false;
                }
                match Arc::make_mut(map).get_mut(key) {
                    Some(child) => delete_segments(child, rest),
                    None => false,
                }
            }
            _ => false,
        },
        [Seg::Index(index), rest @ ..] => match current {
            Value::Collection(items) => {
                if *index >= items.len() {
                    return false;
                }
                match Arc::make_mut(items).get_mut(*index) {
                    Some(child) => delete_segments(child, rest),
                    None => false,
                }
            }
            _ => false,
        },
    }
}

/// Navigate to the selected slot, creating intermediate records for missing
/// keys and replacing a null leaf with `default()`.
fn reach_or_create<'a, F>(
    current: &'a mut Value,
    full: &Selector,
    consumed: usize,
    default: F,
) -> DriftResult<&'a mut Value>
where
    F: Fn() -> Value,
{
    let segments = &full.segments()[consumed..];
    match segments {
        [] => {
            if current.is_null() {
                *current = default();
            }
            Ok(current)
        }
        [Seg::Key(key), ..] => {
            if !current.is_record() {
                *current = Value::record();
            }
            let map = current.record_mut().unwrap();
            let entry = map.entry(key.clone()).or_insert(Value::Null);
            reach_or_create(entry, full, consumed + 1, default)
        }
        [Seg::Index(index), ..] => {
            // Report the path up to and including this segment.
            let error_path: Selector = full.segments()[..=consumed].iter().cloned().collect();
            if !current.is_collection() {
                return Err(DriftError::type_mismatch(
                    error_path,
                    "collection",
                    current.type_name(),
                ));
            }
            let items = current.collection_mut().unwrap();
            let len = items.len();
            match items.get_mut(*index) {
                Some(child) => reach_or_create(child, full, consumed + 1, default),
                None => Err(DriftError::index_out_of_bounds(error_path, *index, len)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select;
    use serde_json::json;

    #[test]
    fn test_produce_in_place_write() {
        let current = Value::from(json!({"attributes": {"status": "idle"}}));
        let next = produce_draft(&current, |draft| {
            draft.set_at(&select!("attributes", "status"), "successful")
        })
        .unwrap();
        assert_eq!(next, Value::from(json!({"attributes": {"status": "successful"}})));
        assert_eq!(current, Value::from(json!({"attributes": {"status": "idle"}})));
    }

    #[test]
    fn test_produce_noop_is_deep_equal() {
        let current = Value::from(json!({"a": {"b": 1}, "c": [2, 3]}));
        let next = produce(&current, |_| Ok(None)).unwrap();
        assert_eq!(next, current);
        // A no-op draft never detaches anything, so identity even holds.
        assert!(Value::ptr_eq(&next, &current));
    }

    #[test]
    fn test_produce_replacement_short_circuits() {
        let current = Value::from(json!({"id": "not-replaced", "type": "item"}));
        let next = produce(&current, |draft| {
            let kept = draft.get("type").cloned().unwrap_or(Value::Null);
            let mut replacement = crate::Record::new();
            replacement.insert("id".into(), "replaced".into());
            replacement.insert("type".into(), kept);
            Ok(Some(Value::from(replacement)))
        })
        .unwrap();
        assert_eq!(next, Value::from(json!({"id": "replaced", "type": "item"})));
    }

    #[test]
    fn test_produce_rejects_incompatible_replacement() {
        let current = Value::from(json!({"id": "1"}));
        let result = produce(&current, |_| Ok(Some(Value::from(json!([1, 2])))));
        assert!(matches!(result, Err(DriftError::TypeMismatch { .. })));
    }

    #[test]
    fn test_produce_error_leaves_caller_snapshot_standing() {
        let current = Value::from(json!({"a": 1}));
        let result = produce_draft(&current, |draft| {
            draft.set_at(&select!("a"), 2)?;
            Err(DriftError::invalid_transaction("mutator bailed"))
        });
        assert!(result.is_err());
        assert_eq!(current, Value::from(json!({"a": 1})));
    }

    #[test]
    fn test_set_at_creates_intermediate_records() {
        let mut draft = Value::from(json!({}));
        draft.set_at(&select!("a", "b", "c"), 42).unwrap();
        assert_eq!(draft, Value::from(json!({"a": {"b": {"c": 42}}})));
    }

    #[test]
    fn test_set_at_index_out_of_bounds() {
        let mut draft = Value::from(json!({"arr": [1, 2, 3]}));
        let err = draft.set_at(&select!("arr", 10), 42).unwrap_err();
        assert!(matches!(err, DriftError::IndexOutOfBounds { index: 10, len: 3, .. }));
    }

    #[test]
    fn test_set_at_index_into_non_collection() {
        let mut draft = Value::from(json!({"x": 1}));
        let err = draft.set_at(&select!("x", 0), 42).unwrap_err();
        assert!(matches!(err, DriftError::TypeMismatch { .. }));
    }

    #[test]
    fn test_delete_at_missing_is_noop() {
        let mut draft = Value::from(json!({"x": 1}));
        assert!(!draft.delete_at(&select!("missing")));
        assert_eq!(draft, Value::from(json!({"x": 1})));
    }

    #[test]
    fn test_delete_at_existing() {
        let mut draft = Value::from(json!({"x": 1, "y": 2}));
        assert!(draft.delete_at(&select!("x")));
        assert_eq!(draft, Value::from(json!({"y": 2})));
    }

    #[test]
    fn test_append_at_creates_collection() {
        let mut draft = Value::from(json!({}));
        draft.append_at(&select!("items"), 1).unwrap();
        draft.append_at(&select!("items"), 2).unwrap();
        assert_eq!(draft, Value::from(json!({"items": [1, 2]})));
    }

    #[test]
    fn test_append_at_non_collection_errors() {
        let mut draft = Value::from(json!({"x": 1}));
        let err = draft.append_at(&select!("x"), 2).unwrap_err();
        assert!(matches!(err, DriftError::TypeMismatch { .. }));
    }

    #[test]
    fn test_insert_at_bounds_checked() {
        let mut draft = Value::from(json!({"arr": [1, 2, 3]}));
        draft.insert_at(&select!("arr"), 1, 99).unwrap();
        assert_eq!(draft, Value::from(json!({"arr": [1, 99, 2, 3]})));

        let err = draft.insert_at(&select!("arr"), 9, 0).unwrap_err();
        assert!(matches!(err, DriftError::IndexOutOfBounds { .. }));
    }
}
