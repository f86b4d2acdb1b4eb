use serde::Serialize;
use serde_json::Value;

/// One leaf that differs between two successive gateway bodies. A side that
/// is absent is `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Change {
    pub path: String,
    pub old: Value,
    pub new: Value,
}

/// Compare two gateway bodies leaf by leaf. Object keys join with `.`, array
/// elements as `[i]`. Keys dropped from `current` are reported with `new: null`.
pub(crate) fn changed_leaves(previous: &Value, current: &Value) -> Vec<Change> {
    let mut changes = Vec::new();
    walk(Some(previous), Some(current), "", &mut changes);
    changes
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn walk(previous: Option<&Value>, current: Option<&Value>, path: &str, changes: &mut Vec<Change>) {
    match (previous, current) {
        (Some(Value::Object(prev)), Some(Value::Object(curr))) => {
            for (key, value) in curr {
                walk(prev.get(key), Some(value), &join(path, key), changes);
            }
            for (key, value) in prev.iter().filter(|(k, _)| !curr.contains_key(*k)) {
                walk(Some(value), None, &join(path, key), changes);
            }
        }
        (Some(Value::Array(prev)), Some(Value::Array(curr))) if prev.len() == curr.len() => {
            for (i, (p, c)) in prev.iter().zip(curr).enumerate() {
                walk(Some(p), Some(c), &format!("{path}[{i}]"), changes);
            }
        }
        (None, Some(Value::Object(curr))) => {
            for (key, value) in curr {
                walk(None, Some(value), &join(path, key), changes);
            }
        }
        (Some(Value::Object(prev)), None) => {
            for (key, value) in prev {
                walk(Some(value), None, &join(path, key), changes);
            }
        }
        (prev, curr) if prev != curr => changes.push(Change {
            path: path.to_string(),
            old: prev.cloned().unwrap_or(Value::Null),
            new: curr.cloned().unwrap_or(Value::Null),
        }),
        _ => {}
    }
}
