use serde_json::{Map, Value};

/// Deep-merges `target` over `source` and returns a new tree.
///
/// Maps merge key by key, sequences merge position by position (map elements
/// at the same index merge recursively, anything else takes `target`'s
/// element, unmatched tail elements are kept), every other pairing takes
/// `target`'s value. Neither argument is modified.
pub fn merge(source: &Value, target: &Value) -> Value {
    match (source, target) {
        (Value::Object(source_obj), Value::Object(target_obj)) => {
            Value::Object(merge_maps(source_obj, target_obj))
        }
        (Value::Array(source_items), Value::Array(target_items)) => {
            Value::Array(merge_sequences(source_items, target_items))
        }
        (_, other) => other.clone(),
    }
}

pub fn merge_maps(source: &Map<String, Value>, target: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = source.clone();
    for (key, value) in target {
        let merged_value = match merged.get(key) {
            Some(existing) => merge(existing, value),
            None => value.clone(),
        };
        merged.insert(key.clone(), merged_value);
    }
    merged
}

fn merge_sequences(source: &[Value], target: &[Value]) -> Vec<Value> {
    let len = source.len().max(target.len());
    (0..len)
        .map(|index| match (source.get(index), target.get(index)) {
            (Some(Value::Object(left)), Some(Value::Object(right))) => {
                Value::Object(merge_maps(left, right))
            }
            (_, Some(right)) => right.clone(),
            (Some(left), None) => left.clone(),
            (None, None) => Value::Null,
        })
        .collect()
}
