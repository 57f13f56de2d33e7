//! Narrow a `[state, controller]` pair and update through the root.

use drift_state::{create, select, DriftResult, Value};
use serde_json::json;

fn main() -> DriftResult<()> {
    let (record, controller) = create(json!({
        "attributes": {"status": "idle", "info": "initial value"}
    }));
    println!("before: {}", serde_json::Value::from(&record));

    // Root update.
    controller.draft(|root| {
        root.set_at(&select!("attributes", "status"), "successful")
    })?;

    // Narrowed update: the attributes controller still commits at the root.
    let (_, attributes) = controller.select(select!("attributes"))?;
    attributes.draft(|a| a.set_at(&select!("info"), "some value..."))?;

    let after = controller.state()?;
    println!("after:  {}", serde_json::Value::from(&after));

    assert_eq!(
        after.at(&select!("attributes", "status")),
        Some(&Value::from("successful"))
    );
    assert_eq!(
        after.at(&select!("attributes", "info")),
        Some(&Value::from("some value..."))
    );
    Ok(())
}
