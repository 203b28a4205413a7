//! Structural change detection over backend responses
//!
//! Comparison is over parsed values, never serialized text, so object key
//! order cannot produce false positives.

/// Returns true when a new response differs structurally from the previous one.
///
/// A card with no previous response always counts as changed.
pub fn response_changed(previous: Option<&serde_json::Value>, new: &serde_json::Value) -> bool {
    match previous {
        Some(prev) => prev != new,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_response_counts_as_changed() {
        assert!(response_changed(None, &serde_json::json!({"info": {}})));
    }

    #[test]
    fn identical_response_is_not_a_change() {
        let value = serde_json::json!({"info": {"title": "Orders"}, "paths": {}});
        assert!(!response_changed(Some(&value), &value.clone()));
    }

    #[test]
    fn key_order_does_not_produce_a_change() {
        let a: serde_json::Value =
            serde_json::from_str(r#"{"info": {"title": "x"}, "paths": {"/a": {}}}"#).unwrap();
        let b: serde_json::Value =
            serde_json::from_str(r#"{"paths": {"/a": {}}, "info": {"title": "x"}}"#).unwrap();
        assert!(!response_changed(Some(&a), &b));
    }

    #[test]
    fn nested_difference_is_detected() {
        let a = serde_json::json!({"paths": {"/a": {"get": {}}}});
        let b = serde_json::json!({"paths": {"/a": {"get": {}, "post": {}}}});
        assert!(response_changed(Some(&a), &b));
    }

    #[test]
    fn array_order_is_significant() {
        let a = serde_json::json!({"servers": ["a", "b"]});
        let b = serde_json::json!({"servers": ["b", "a"]});
        assert!(response_changed(Some(&a), &b));
    }
}
