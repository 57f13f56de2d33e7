//! The state container and its lens-scoped controller.
//!
//! A [`StateCell`] owns the current snapshot behind a mutex and is the
//! single commit entry point: every transition goes through one `produce`
//! call at the root, no matter how deeply a [`Controller`] has been
//! narrowed. Narrowing composes selectors; committing re-applies the joined
//! selector against the root draft, so there is never more than one live
//! snapshot.

use crate::draft::check_replacement;
use crate::{produce, DriftError, DriftResult, EntityOperator, EntitySlice, Selector, Value};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use tracing::trace;

type CommitHook = Arc<dyn Fn(&Value) + Send + Sync>;

/// Construct a container from an initial value and return its
/// `[state, controller]` pair.
///
/// # Examples
///
/// ```
/// use drift_state::{create, select, Value};
/// use serde_json::json;
///
/// let (state, controller) = create(json!({"attributes": {"status": "idle"}}));
/// assert_eq!(
///     state.at(&select!("attributes", "status")),
///     Some(&Value::from("idle"))
/// );
///
/// let next = controller
///     .draft(|root| root.set_at(&select!("attributes", "status"), "successful"))
///     .unwrap();
/// assert_eq!(
///     next.at(&select!("attributes", "status")),
///     Some(&Value::from("successful"))
/// );
/// ```
pub fn create(initial: impl Into<Value>) -> (Value, Controller) {
    StateCell::new(initial).pair()
}

/// Owner of the current snapshot.
///
/// Cloning a cell clones a handle: all clones share the same snapshot and
/// observer. The cell supports exactly one meaningful transition —
/// current snapshot to next snapshot — and each `update`/`draft` call on a
/// controller is one such atomic transition.
pub struct StateCell {
    inner: Arc<CellInner>,
}

struct CellInner {
    snapshot: Mutex<Value>,
    on_commit: Option<CommitHook>,
}

impl StateCell {
    /// Create a cell holding `initial`.
    pub fn new(initial: impl Into<Value>) -> Self {
        Self {
            inner: Arc::new(CellInner {
                snapshot: Mutex::new(initial.into()),
                on_commit: None,
            }),
        }
    }

    /// Create a cell from any serializable model.
    pub fn from_model<T: serde::Serialize>(model: &T) -> DriftResult<Self> {
        let doc = serde_json::to_value(model)?;
        Ok(Self::new(doc))
    }

    /// Create a cell with a commit observer.
    ///
    /// The observer is invoked with every committed snapshot, including
    /// wholesale replacements via [`StateCell::replace_root`].
    pub fn with_observer(
        initial: impl Into<Value>,
        observer: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(CellInner {
                snapshot: Mutex::new(initial.into()),
                on_commit: Some(Arc::new(observer)),
            }),
        }
    }

    /// Clone out the current snapshot. O(1) — branch nodes are shared.
    ///
    /// Reads the committed state; inside a mutator, read the draft instead.
    pub fn snapshot(&self) -> Value {
        self.inner.snapshot.lock().unwrap().clone()
    }

    /// Discard the current snapshot and restart the tree from `value`,
    /// independent of structural equality (an upstream input change).
    ///
    /// Narrowed controllers stay usable; a selector the new tree no longer
    /// satisfies surfaces as `PathNotFound` on its next use.
    pub fn replace_root(&self, value: impl Into<Value>) -> DriftResult<()> {
        let value = value.into();
        let mut guard = self.lock()?;
        *guard = value.clone();
        drop(guard);
        trace!("root snapshot replaced wholesale");
        self.notify(&value);
        Ok(())
    }

    /// A root-scoped controller for this cell.
    pub fn controller(&self) -> Controller {
        Controller {
            cell: self.clone(),
            selector: Selector::root(),
        }
    }

    /// The `[state, controller]` pair at the root.
    pub fn pair(&self) -> (Value, Controller) {
        (self.snapshot(), self.controller())
    }

    /// Acquire the commit lock without blocking.
    ///
    /// A transition opened while another is in flight — a second writer, or
    /// an `update` issued from inside a running mutator — fails fast here
    /// instead of corrupting the shared draft.
    fn lock(&self) -> DriftResult<MutexGuard<'_, Value>> {
        match self.inner.snapshot.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) => Err(DriftError::invalid_transaction(
                "a transition is already in flight for this cell",
            )),
            Err(TryLockError::Poisoned(_)) => Err(DriftError::invalid_transaction(
                "state cell mutex poisoned",
            )),
        }
    }

    fn notify(&self, snapshot: &Value) {
        if let Some(hook) = &self.inner.on_commit {
            hook(snapshot);
        }
    }
}

impl Clone for StateCell {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for StateCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateCell").field(&"<Value>").finish()
    }
}

/// Operations closed over one path from the root.
///
/// A controller created by [`create`] is scoped to the root; [`select`]
/// narrows the scope. Every controller, however deep, commits through the
/// root cell in a single `produce` transaction.
///
/// [`select`]: Controller::select
#[derive(Clone)]
pub struct Controller {
    cell: StateCell,
    selector: Selector,
}

impl Controller {
    /// The selector from the root to this controller's scope.
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// A handle to the owning cell (e.g. for `replace_root`).
    pub fn cell(&self) -> StateCell {
        self.cell.clone()
    }

    /// The committed value at this controller's scope.
    pub fn state(&self) -> DriftResult<Value> {
        let root = self.cell.snapshot();
        root.at(&self.selector)
            .cloned()
            .ok_or_else(|| DriftError::path_not_found(self.selector.clone()))
    }

    /// Narrow to a sub-path: returns the `[narrowedState, narrowedController]`
    /// pair. Side-effect free and composable without bound —
    /// `select(s1)?.select(s2)?` behaves exactly like `select(s1.join(s2))?`.
    ///
    /// Fails with `PathNotFound` when the selector does not resolve against
    /// the current snapshot.
    ///
    /// # Examples
    ///
    /// ```
    /// use drift_state::{create, select, Value};
    /// use serde_json::json;
    ///
    /// let (_, controller) = create(json!({"attributes": {"info": "y"}}));
    /// let (attributes, attr_controller) = controller.select(select!("attributes")).unwrap();
    /// assert_eq!(attributes.get("info"), Some(&Value::from("y")));
    ///
    /// attr_controller
    ///     .draft(|a| a.set_at(&select!("info"), "x"))
    ///     .unwrap();
    /// // The update resolved through the true root.
    /// let (root, _) = controller.cell().pair();
    /// assert_eq!(root.at(&select!("attributes", "info")), Some(&Value::from("x")));
    /// ```
    pub fn select(&self, selector: impl Into<Selector>) -> DriftResult<(Value, Controller)> {
        let joined = self.selector.join(&selector.into());
        let root = self.cell.snapshot();
        let narrowed = root
            .at(&joined)
            .cloned()
            .ok_or_else(|| DriftError::path_not_found(joined.clone()))?;
        Ok((
            narrowed,
            Controller {
                cell: self.cell.clone(),
                selector: joined,
            },
        ))
    }

    /// Commit one transition.
    ///
    /// The root engine produces the next snapshot: the controller's full
    /// selector chain is re-applied against the root draft and the resulting
    /// narrowed draft is handed to `mutator`. In-place writes rebuild only
    /// the written paths; returning `Ok(Some(v))` replaces the narrowed slot
    /// wholesale (shape-checked). Returns the new value at this scope.
    ///
    /// A mutator error aborts the transition: the snapshot is left exactly
    /// as it was (no partial commit).
    pub fn update<F>(&self, mutator: F) -> DriftResult<Value>
    where
        F: FnOnce(&mut Value) -> DriftResult<Option<Value>>,
    {
        let mut guard = self.cell.lock()?;
        let current = guard.clone();
        let selector = &self.selector;

        let next = produce(&current, |root_draft| {
            let slot = root_draft
                .at_mut(selector)
                .ok_or_else(|| DriftError::path_not_found(selector.clone()))?;
            if let Some(replacement) = mutator(slot)? {
                check_replacement(selector, slot, &replacement)?;
                *slot = replacement;
            }
            Ok(None)
        })?;

        *guard = next.clone();
        drop(guard);
        trace!(path = %self.selector, "committed snapshot transition");
        self.cell.notify(&next);

        next.at(&self.selector)
            .cloned()
            .ok_or_else(|| DriftError::path_not_found(self.selector.clone()))
    }

    /// Commit one transition with an in-place-only mutator.
    pub fn draft<F>(&self, mutator: F) -> DriftResult<Value>
    where
        F: FnOnce(&mut Value) -> DriftResult<()>,
    {
        self.update(|slot| {
            mutator(slot)?;
            Ok(None)
        })
    }

    /// Dispatch an entity operator over a node of the in-flight draft.
    ///
    /// Only meaningful from inside an active mutator — nothing outside one
    /// can produce a `&mut` into the tree, so the operator always
    /// participates in the enclosing transition. Equivalent to the free
    /// [`entity`](crate::entity) function.
    pub fn entity<'a>(&self, target: &'a mut Value) -> EntityOperator<'a> {
        crate::entity::entity(target)
    }

    /// Bind a selector (relative to this controller's scope) into a
    /// reusable entity invoker for use inside later mutators.
    pub fn slice_entity(&self, selector: impl Into<Selector>) -> EntitySlice {
        EntitySlice::new(selector.into())
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("selector", &self.selector.to_string())
            .finish()
    }
}
