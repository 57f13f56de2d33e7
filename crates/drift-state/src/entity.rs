//! Chainable mutation operators over one draft node.
//!
//! [`entity`] resolves the shape tag of a draft node once and dispatches to
//! a [`RecordOperator`] or [`CollectionOperator`]. Operators borrow the
//! enclosing draft, so every call they make lands in the same in-flight
//! transition as the mutator that created them — a nested independent
//! transaction cannot be expressed.
//!
//! A missed lookup (a `select` with no match, a slice over a dangling
//! selector, a scalar where a record was expected) produces an operator
//! with an absent target: every subsequent chained call is a silent no-op,
//! so chains compose without null checks.

use crate::{Kind, Selector, Value};
use std::sync::Arc;

/// Element predicate used by collection operators.
pub type Predicate<'p> = &'p dyn Fn(&Value) -> bool;

/// Inspect a draft node's shape and dispatch to the matching operator.
///
/// Records (and absent or scalar targets) dispatch to [`RecordOperator`],
/// collections to [`CollectionOperator`].
///
/// # Examples
///
/// ```
/// use drift_state::{create, entity, select, Value};
/// use serde_json::json;
///
/// let (_, controller) = create(json!({"budgets": [{"id": "1", "name": "one"}]}));
/// let next = controller
///     .draft(|root| {
///         if let Some(budgets) = root.at_mut(&select!("budgets")) {
///             entity(budgets)
///                 .into_collection()
///                 .select(|b| b.get("id").and_then(Value::as_str) == Some("1"))
///                 .draft(|b| {
///                     let _ = b.set_at(&select!("name"), "altered");
///                 });
///         }
///         Ok(())
///     })
///     .unwrap();
/// assert_eq!(
///     next.at(&select!("budgets", 0, "name")),
///     Some(&Value::from("altered"))
/// );
/// ```
pub fn entity(target: &mut Value) -> EntityOperator<'_> {
    match target.kind() {
        Kind::Collection => EntityOperator::Collection(CollectionOperator {
            target: Some(target),
        }),
        Kind::Record => EntityOperator::Record(RecordOperator {
            target: Some(target),
        }),
        _ => EntityOperator::Record(RecordOperator { target: None }),
    }
}

/// The result of shape dispatch: one of the two operator behaviors.
pub enum EntityOperator<'a> {
    /// The target is a record (or absent).
    Record(RecordOperator<'a>),
    /// The target is a collection.
    Collection(CollectionOperator<'a>),
}

impl<'a> EntityOperator<'a> {
    /// Adapt to a record operator; a collection target becomes an absent
    /// one (the chain no-ops).
    pub fn into_record(self) -> RecordOperator<'a> {
        match self {
            EntityOperator::Record(op) => op,
            EntityOperator::Collection(_) => RecordOperator { target: None },
        }
    }

    /// Adapt to a collection operator; a record target becomes an absent
    /// one (the chain no-ops).
    pub fn into_collection(self) -> CollectionOperator<'a> {
        match self {
            EntityOperator::Collection(op) => op,
            EntityOperator::Record(_) => CollectionOperator { target: None },
        }
    }
}

/// Declarative mutation primitives over one record node.
pub struct RecordOperator<'a> {
    target: Option<&'a mut Value>,
}

impl<'a> RecordOperator<'a> {
    pub(crate) fn absent() -> Self {
        Self { target: None }
    }

    /// True when this operator holds a live target.
    pub fn exists(&self) -> bool {
        self.target.is_some()
    }

    /// Overwrite each existing key of the target with the corresponding key
    /// of `record`, key by key. Keys absent from `record` are left alone.
    pub fn replace(mut self, record: impl Into<Value>) -> Self {
        let source = record.into();
        if let Some(target) = self.target.as_deref_mut() {
            if let (Value::Record(dst), Value::Record(src)) = (target, &source) {
                let dst = Arc::make_mut(dst);
                for (key, slot) in dst.iter_mut() {
                    if let Some(replacement) = src.get(key) {
                        *slot = replacement.clone();
                    }
                }
            }
        }
        self
    }

    /// Set a single key on the target. Chainable.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Some(Value::Record(map)) = self.target.as_deref_mut() {
            Arc::make_mut(map).insert(key.into(), value.into());
        }
        self
    }

    /// Hand the target to `f` for direct nested mutation. No-op when the
    /// target is absent (e.g. a prior `select` matched nothing).
    pub fn draft(self, f: impl FnOnce(&mut Value)) {
        if let Some(target) = self.target {
            f(target);
        }
    }
}

/// Declarative mutation primitives over one collection node.
pub struct CollectionOperator<'a> {
    target: Option<&'a mut Value>,
}

impl<'a> CollectionOperator<'a> {
    /// True when this operator holds a live target.
    pub fn exists(&self) -> bool {
        self.target.is_some()
    }

    /// Append items in iterator order. Chainable.
    pub fn add<I>(mut self, items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let added: Vec<Value> = items.into_iter().map(Into::into).collect();
        if added.is_empty() {
            return self;
        }
        if let Some(Value::Collection(list)) = self.target.as_deref_mut() {
            Arc::make_mut(list).extend(added);
        }
        self
    }

    /// Remove every element for which any predicate returns true. Each
    /// element is tested once, in order; matches are deleted from the
    /// highest index down so earlier removals cannot shift later ones.
    pub fn remove(mut self, predicates: &[Predicate<'_>]) -> Self {
        if let Some(Value::Collection(list)) = self.target.as_deref_mut() {
            let mut matched = Vec::new();
            for (index, item) in list.iter().enumerate() {
                if predicates.iter().any(|predicate| predicate(item)) {
                    matched.push(index);
                }
            }
            if !matched.is_empty() {
                let items = Arc::make_mut(list);
                for index in matched.into_iter().rev() {
                    items.remove(index);
                }
            }
        }
        self
    }

    /// Remove every record whose `"id"` field equals `id`. Chainable.
    pub fn remove_id(self, id: &str) -> Self {
        self.remove(&[&|item: &Value| {
            item.get("id").and_then(Value::as_str) == Some(id)
        }])
    }

    /// Scan in order and wrap the first matching element as a
    /// [`RecordOperator`]. With no match the returned operator is absent
    /// and every chained call on it is a safe no-op.
    pub fn select(self, predicate: impl Fn(&Value) -> bool) -> RecordOperator<'a> {
        let target = match self.target {
            Some(value) => {
                let position = value
                    .as_collection()
                    .and_then(|items| items.iter().position(|item| predicate(item)));
                match position {
                    Some(index) => match value {
                        Value::Collection(items) => Arc::make_mut(items).get_mut(index),
                        _ => None,
                    },
                    None => None,
                }
            }
            None => None,
        };
        RecordOperator { target }
    }
}

/// A selector bound into a reusable entity invoker.
///
/// Binding fixes the path once; [`EntitySlice::of`] applies it to whatever
/// in-flight draft it is handed, so the resulting operator participates in
/// the enclosing transition exactly like a direct [`entity`] call.
///
/// # Examples
///
/// ```
/// use drift_state::{create, select, EntitySlice, Value};
/// use serde_json::json;
///
/// let (_, controller) = create(json!({
///     "relationships": {"revision": {"id": "10", "name": "revision-1"}}
/// }));
/// let revision = controller.slice_entity(select!("relationships", "revision"));
///
/// let next = controller
///     .draft(|root| {
///         revision
///             .of(root)
///             .into_record()
///             .set("id", "33")
///             .set("name", "revision-2");
///         Ok(())
///     })
///     .unwrap();
/// assert_eq!(
///     next.at(&select!("relationships", "revision", "id")),
///     Some(&Value::from("33"))
/// );
/// ```
#[derive(Clone, Debug)]
pub struct EntitySlice {
    selector: Selector,
}

impl EntitySlice {
    /// Bind a selector into a reusable invoker.
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            selector: selector.into(),
        }
    }

    /// The bound selector.
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Resolve the bound selector against the in-flight draft and dispatch.
    /// A dangling selector yields an absent operator (the chain no-ops).
    pub fn of<'a>(&self, draft: &'a mut Value) -> EntityOperator<'a> {
        match draft.at_mut(&self.selector) {
            Some(node) => entity(node),
            None => EntityOperator::Record(RecordOperator::absent()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select;
    use serde_json::json;

    #[test]
    fn test_dispatch_by_shape() {
        let mut record = Value::from(json!({"id": "1"}));
        assert!(matches!(entity(&mut record), EntityOperator::Record(_)));

        let mut collection = Value::from(json!([{"id": "1"}]));
        assert!(matches!(
            entity(&mut collection),
            EntityOperator::Collection(_)
        ));

        let mut scalar = Value::from("plain");
        let op = entity(&mut scalar).into_record();
        assert!(!op.exists());
    }

    #[test]
    fn test_shape_adapters_absorb_mismatch() {
        let mut record = Value::from(json!({"id": "1"}));
        let op = entity(&mut record).into_collection();
        assert!(!op.exists());
        // The whole chain stays a no-op.
        op.add([json!({"id": "2"})]).remove_id("1");
        assert_eq!(record, Value::from(json!({"id": "1"})));
    }

    #[test]
    fn test_record_replace_is_key_by_key() {
        let mut target = Value::from(json!({"id": "10", "type": "revision", "extra": true}));
        entity(&mut target)
            .into_record()
            .replace(json!({"id": "33", "type": "revision", "ignored": "x"}));
        // Existing keys overwritten, keys absent from the source kept,
        // source-only keys not introduced.
        assert_eq!(
            target,
            Value::from(json!({"id": "33", "type": "revision", "extra": true}))
        );
    }

    #[test]
    fn test_collection_select_then_draft() {
        let mut target = Value::from(json!([{"id": "1", "name": "one"}]));
        entity(&mut target)
            .into_collection()
            .select(|b| b.get("id").and_then(Value::as_str) == Some("1"))
            .draft(|b| {
                let _ = b.set_at(&select!("name"), "altered");
            });
        assert_eq!(target, Value::from(json!([{"id": "1", "name": "altered"}])));
    }

    #[test]
    fn test_collection_select_miss_leaves_collection_unchanged() {
        let original = Value::from(json!([{"id": "1", "name": "one"}]));
        let mut target = original.clone();
        entity(&mut target)
            .into_collection()
            .select(|b| b.get("id").and_then(Value::as_str) == Some("9"))
            .replace(json!({"name": "never"}))
            .draft(|b| {
                let _ = b.set_at(&select!("name"), "never");
            });
        assert_eq!(target, original);
        // No write happened, so the allocation was never detached either.
        assert!(Value::ptr_eq(&target, &original));
    }

    #[test]
    fn test_remove_union_deletes_each_match_once() {
        let mut target = Value::from(json!([{"id": "1"}, {"id": "2"}, {"id": "3"}]));
        entity(&mut target).into_collection().remove(&[
            &|item: &Value| item.get("id").and_then(Value::as_str) == Some("1"),
            &|item: &Value| item.get("id").and_then(Value::as_str) == Some("2"),
        ]);
        assert_eq!(target, Value::from(json!([{"id": "3"}])));
    }

    #[test]
    fn test_slice_dangling_selector_noops() {
        let slice = EntitySlice::new(select!("relationships", "missing"));
        let original = Value::from(json!({"relationships": {}}));
        let mut draft = original.clone();
        slice.of(&mut draft).into_record().set("id", "1");
        assert_eq!(draft, original);
    }
}
