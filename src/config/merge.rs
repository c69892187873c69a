//! Deep merge for structured documents.
//!
//! Used for three things: layering tool configuration tiers, folding entry
//! manifest patches into the run accumulator, and the default merge of an
//! existing config file with freshly generated content.

use serde_json::Value;

/// Deep merge two JSON values without touching `base`, returning a fresh value.
///
/// - Objects are merged key-wise; keys present in both recurse, keys present
///   in only one side are copied
/// - Arrays are concatenated (`base` first) and deduplicated by value,
///   keeping the first occurrence
/// - If `incoming` is null, the base value is preserved (null means "not specified")
/// - Any other combination: `incoming` replaces `base`, including mismatched
///   kinds such as object vs. number
///
/// # Example
/// ```
/// use serde_json::json;
/// use scaffold_kit::config::deep_merge;
///
/// let base = json!({ "rules": { "semi": "error" }, "plugins": ["a", "b"] });
/// let incoming = json!({ "rules": { "quotes": "single" }, "plugins": ["b", "c"] });
/// let merged = deep_merge(&base, &incoming);
/// assert_eq!(
///     merged,
///     json!({ "rules": { "semi": "error", "quotes": "single" }, "plugins": ["a", "b", "c"] })
/// );
/// ```
pub fn deep_merge(base: &Value, incoming: &Value) -> Value {
    let mut merged = base.clone();
    deep_merge_into(&mut merged, incoming.clone());
    merged
}

/// Deep merge `incoming` into `base` in place.
///
/// Same rules as [`deep_merge`]. Only owners of a private accumulator should
/// call this; everything else goes through the non-mutating form.
pub fn deep_merge_into(base: &mut Value, incoming: Value) {
    if incoming.is_null() {
        return;
    }

    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            for (key, incoming_value) in incoming_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => deep_merge_into(base_value, incoming_value),
                    None => {
                        base_map.insert(key, incoming_value);
                    }
                }
            }
        }
        (Value::Array(base_items), Value::Array(incoming_items)) => {
            let mut combined = std::mem::take(base_items);
            combined.extend(incoming_items);
            *base_items = dedupe_preserving_order(combined);
        }
        (slot, incoming) => *slot = incoming,
    }
}

/// Merge multiple values in order, with later values taking precedence.
///
/// Equivalent to folding `deep_merge_into` over the list, starting from null.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, |mut acc, value| {
        deep_merge_into(&mut acc, value);
        acc
    })
}

fn dedupe_preserving_order(items: Vec<Value>) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}
