//! Decision pipelines: fetch → filter → map → filter → decide.
//!
//! Both runnable pipelines share this shape and the same failure policy: a
//! collaborator error fails the attempt, is recorded in the audit trail, and
//! the whole sequence re-runs from fetch with exponential backoff until it
//! succeeds, comes up empty, or the attempt ceiling is reached.

pub mod creator;
pub mod trader;

pub use creator::Creator;
pub use trader::Trader;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Coerce a reasoning-service filter reply into a typed list.
///
/// The service is expected to return a JSON array; anything else counts as
/// zero candidates rather than a type error. Malformed array elements are
/// dropped individually.
pub(crate) fn coerce_items<T: DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("Dropping malformed candidate from reasoning service: {e}");
                    None
                }
            })
            .collect(),
        other => {
            warn!(
                "Reasoning service returned a non-list result ({}), treating as empty",
                kind(&other)
            );
            Vec::new()
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Event;
    use serde_json::json;

    #[test]
    fn non_array_coerces_to_empty() {
        let events: Vec<Event> = coerce_items(json!("I could not find any."));
        assert!(events.is_empty());

        let events: Vec<Event> = coerce_items(json!({"kept": []}));
        assert!(events.is_empty());
    }

    #[test]
    fn array_elements_parse_individually() {
        let events: Vec<Event> = coerce_items(json!([
            {"id": "1", "title": "A"},
            42,
            {"id": "2"},
        ]));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id.as_deref(), Some("1"));
    }
}
