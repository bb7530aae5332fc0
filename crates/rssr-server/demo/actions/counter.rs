use rssr::{action, ActionFn};
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Exports of the counter module; only the `Server*` ones become actions
pub fn exports() -> Vec<(&'static str, ActionFn)> {
    let count = Arc::new(AtomicI64::new(0));
    let increment = count.clone();
    vec![
        (
            "ServerIncrement",
            action(move |args: Vec<JsonValue>| {
                let by = args.first().and_then(JsonValue::as_i64).unwrap_or(1);
                let value = increment.fetch_add(by, Ordering::SeqCst) + by;
                async move { Ok(json!(value)) }
            }),
        ),
        (
            "ServerRead",
            action(move |_| {
                let value = count.load(Ordering::SeqCst);
                async move { Ok(json!(value)) }
            }),
        ),
        ("format", action(|args| async move { Ok(json!(format!("{args:?}"))) })),
    ]
}
