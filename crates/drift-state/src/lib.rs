//! Copy-on-write snapshot engine with lens-style narrowing and chainable
//! entity operators.
//!
//! `drift-state` turns an imperative mutation into a new, structurally
//! shared snapshot: the caller describes the change against a draft, and
//! always receives back a fresh immutable tree in which every untouched
//! subtree is the same allocation as before.
//!
//! # Core Concepts
//!
//! - **Value**: one immutable tree of records and collections; branch nodes
//!   are `Arc`-shared, so snapshots clone in O(1)
//! - **produce**: the draft engine — `(current, mutator) -> next` with
//!   structural sharing
//! - **Selector**: an explicit navigation path, applicable to snapshot and
//!   draft alike
//! - **Controller**: `update`/`draft`/`select` scoped to a path, always
//!   committing through the true root
//! - **EntityOperator**: chainable `replace`/`draft`/`add`/`remove`/`select`
//!   primitives over one draft node
//! - **StateCell**: owner of the current snapshot and single commit entry
//!   point
//!
//! # Transitions
//!
//! ```text
//! next = produce(current, mutator)
//! ```
//!
//! - The mutator runs once, synchronously, against a draft of `current`
//! - `current` is never modified; a mutator error commits nothing
//! - Any subtree the mutator did not write is reference-identical in `next`
//!
//! # Quick Start
//!
//! ```
//! use drift_state::{create, entity, select, Value};
//! use serde_json::json;
//!
//! let (state, controller) = create(json!({
//!     "attributes": {"status": "idle"},
//!     "relationships": {"budgets": [{"id": "10", "threshold": 10}]}
//! }));
//!
//! let next = controller.draft(|root| {
//!     root.set_at(&select!("attributes", "status"), "successful")?;
//!     if let Some(budgets) = root.at_mut(&select!("relationships", "budgets")) {
//!         entity(budgets)
//!             .into_collection()
//!             .add([json!({"id": "11", "threshold": 11})])
//!             .remove_id("10");
//!     }
//!     Ok(())
//! })?;
//!
//! assert_eq!(
//!     next.at(&select!("attributes", "status")),
//!     Some(&Value::from("successful"))
//! );
//! // The previous snapshot still reads as it did.
//! assert_eq!(
//!     state.at(&select!("attributes", "status")),
//!     Some(&Value::from("idle"))
//! );
//! # Ok::<(), drift_state::DriftError>(())
//! ```
//!
//! # Narrowing
//!
//! `select` recursively narrows a `[state, controller]` pair to a sub-path
//! while keeping updates routed through the root:
//!
//! ```
//! use drift_state::{create, select, Value};
//! use serde_json::json;
//!
//! let (_, controller) = create(json!({"attributes": {"info": "y"}}));
//! let (_, attributes) = controller.select(select!("attributes"))?;
//!
//! attributes.draft(|a| a.set_at(&select!("info"), "x"))?;
//!
//! assert_eq!(
//!     controller.state()?.at(&select!("attributes", "info")),
//!     Some(&Value::from("x"))
//! );
//! # Ok::<(), drift_state::DriftError>(())
//! ```

mod cell;
mod draft;
mod entity;
mod error;
mod selector;
mod value;

pub use cell::{create, Controller, StateCell};
pub use draft::{produce, produce_draft};
pub use entity::{
    entity, CollectionOperator, EntityOperator, EntitySlice, Predicate, RecordOperator,
};
pub use error::{DriftError, DriftResult};
pub use selector::{Seg, Selector};
pub use value::{Collection, Kind, Record, Value};
