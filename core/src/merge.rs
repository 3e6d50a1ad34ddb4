/// Locale tree merger
/// Walks the source tree key by key and plans which leaves need translation,
/// then rebuilds a merged tree without disturbing existing destination values.
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Path of object keys from the tree root down to one value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.to_string());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// A translatable string present in the source tree but missing from the
/// destination tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingLeaf {
    pub path: KeyPath,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanStats {
    /// Exact number of leaves in the source tree.
    pub source_leaves: u32,
    /// Leaves already present in the destination and kept untouched.
    pub reused: u32,
    /// Missing non-string leaves (arrays, numbers, booleans) that will be
    /// copied from the source verbatim instead of being translated.
    pub copied: u32,
    /// Destination-only keys that the merge leaves alone.
    pub preserved: u32,
}

/// Result of walking source against destination: the leaves that need a
/// translation, plus exact counters for reporting.
#[derive(Debug, Clone, Default)]
pub struct MergePlan {
    pub missing: Vec<MissingLeaf>,
    pub stats: PlanStats,
}

/// A destination value counts as missing only when the key is absent or holds
/// an explicit null. Empty strings, zero, and false are real values and stay.
fn is_missing(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// Collects every source leaf whose destination counterpart is missing.
///
/// Depth first, driven by the source tree's key order. Arrays are opaque
/// leaves and are never recursed into.
pub fn plan(destination: &Map<String, Value>, source: &Map<String, Value>) -> MergePlan {
    let mut result = MergePlan::default();
    walk(Some(destination), source, &KeyPath::root(), &mut result);
    result
}

fn walk(
    destination: Option<&Map<String, Value>>,
    source: &Map<String, Value>,
    path: &KeyPath,
    result: &mut MergePlan,
) {
    for (key, source_value) in source {
        let child = path.child(key);
        match source_value {
            Value::Object(source_map) => {
                // A destination scalar under an object key is treated as
                // absent; the subtree is merged fresh.
                let dest_map = destination
                    .and_then(|map| map.get(key))
                    .and_then(Value::as_object);
                walk(dest_map, source_map, &child, result);
            }
            leaf => {
                result.stats.source_leaves += 1;
                let existing = destination.and_then(|map| map.get(key));
                if is_missing(existing) {
                    match leaf {
                        Value::String(text) => result.missing.push(MissingLeaf {
                            path: child,
                            text: text.clone(),
                        }),
                        _ => result.stats.copied += 1,
                    }
                } else {
                    result.stats.reused += 1;
                }
            }
        }
    }

    if let Some(dest_map) = destination {
        for key in dest_map.keys() {
            if !source.contains_key(key) {
                result.stats.preserved += 1;
            }
        }
    }
}

/// Builds the merged tree.
///
/// Starts from a copy of the destination, so destination-only keys survive in
/// place, then fills every missing source path: translated strings come from
/// `resolved`, everything else is copied from the source verbatim.
pub fn apply(
    destination: &Map<String, Value>,
    source: &Map<String, Value>,
    resolved: &HashMap<KeyPath, String>,
) -> Map<String, Value> {
    merge_level(Some(destination), source, resolved, &KeyPath::root())
}

fn merge_level(
    destination: Option<&Map<String, Value>>,
    source: &Map<String, Value>,
    resolved: &HashMap<KeyPath, String>,
    path: &KeyPath,
) -> Map<String, Value> {
    let mut merged = destination.cloned().unwrap_or_default();

    for (key, source_value) in source {
        let child = path.child(key);
        match source_value {
            Value::Object(source_map) => {
                let dest_map = merged.get(key).and_then(Value::as_object).cloned();
                let sub = merge_level(dest_map.as_ref(), source_map, resolved, &child);
                merged.insert(key.clone(), Value::Object(sub));
            }
            leaf => {
                if is_missing(merged.get(key)) {
                    let filled = match resolved.get(&child) {
                        Some(text) => Value::String(text.clone()),
                        None => leaf.clone(),
                    };
                    merged.insert(key.clone(), filled);
                }
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn plan_finds_missing_leaves_in_source_order() {
        let source = object(json!({
            "title": "Settings",
            "menu": { "save": "Save", "load": "Load" },
            "footer": "Done"
        }));
        let destination = object(json!({ "menu": { "save": "Lưu" } }));

        let plan = plan(&destination, &source);
        let paths: Vec<String> = plan.missing.iter().map(|m| m.path.to_string()).collect();
        assert_eq!(paths, vec!["title", "menu.load", "footer"]);
        assert_eq!(plan.stats.source_leaves, 4);
        assert_eq!(plan.stats.reused, 1);
    }

    #[test]
    fn present_falsy_values_are_not_missing() {
        let source = object(json!({ "a": "one", "b": "two", "c": "three" }));
        let destination = object(json!({ "a": "", "b": false, "c": 0 }));

        let plan = plan(&destination, &source);
        assert!(plan.missing.is_empty());
        assert_eq!(plan.stats.reused, 3);
    }

    #[test]
    fn explicit_null_counts_as_missing() {
        let source = object(json!({ "a": "Hello" }));
        let destination = object(json!({ "a": null }));

        let plan = plan(&destination, &source);
        assert_eq!(plan.missing.len(), 1);
        assert_eq!(plan.missing[0].text, "Hello");
    }

    #[test]
    fn arrays_and_scalars_are_opaque_leaves() {
        let source = object(json!({ "tags": ["a", "b"], "count": 3, "label": "Hi" }));
        let destination = Map::new();

        let plan = plan(&destination, &source);
        assert_eq!(plan.missing.len(), 1);
        assert_eq!(plan.missing[0].path.to_string(), "label");
        assert_eq!(plan.stats.copied, 2);
        assert_eq!(plan.stats.source_leaves, 3);
    }

    #[test]
    fn destination_scalar_under_object_key_is_replaced() {
        let source = object(json!({ "menu": { "save": "Save" } }));
        let destination = object(json!({ "menu": "oops" }));

        let plan = plan(&destination, &source);
        assert_eq!(plan.missing.len(), 1);
        assert_eq!(plan.missing[0].path.to_string(), "menu.save");

        let mut resolved = HashMap::new();
        resolved.insert(KeyPath::root().child("menu").child("save"), "Lưu".to_string());
        let merged = apply(&destination, &source, &resolved);
        assert_eq!(Value::Object(merged), json!({ "menu": { "save": "Lưu" } }));
    }

    #[test]
    fn destination_object_under_leaf_key_is_kept() {
        let source = object(json!({ "thing": "flat" }));
        let destination = object(json!({ "thing": { "nested": "giữ" } }));

        let plan = plan(&destination, &source);
        assert!(plan.missing.is_empty());

        let merged = apply(&destination, &source, &HashMap::new());
        assert_eq!(Value::Object(merged), json!({ "thing": { "nested": "giữ" } }));
    }

    #[test]
    fn apply_preserves_destination_only_keys() {
        let source = object(json!({ "a": "Hello" }));
        let destination = object(json!({ "extra": "Giữ nguyên", "deep": { "old": true } }));

        let mut resolved = HashMap::new();
        resolved.insert(KeyPath::root().child("a"), "Xin chào".to_string());
        let merged = apply(&destination, &source, &resolved);

        assert_eq!(
            Value::Object(merged),
            json!({
                "extra": "Giữ nguyên",
                "deep": { "old": true },
                "a": "Xin chào"
            })
        );
    }

    #[test]
    fn apply_mirrors_source_structure() {
        let source = object(json!({ "a": "x", "b": { "c": "y", "d": { "e": "z" } } }));
        let merged = apply(&Map::new(), &source, &HashMap::new());

        // no translations resolved: every leaf falls back to the source text
        assert_eq!(
            Value::Object(merged),
            json!({ "a": "x", "b": { "c": "y", "d": { "e": "z" } } })
        );
    }

    #[test]
    fn counts_destination_only_keys() {
        let source = object(json!({ "a": "x", "sub": { "b": "y" } }));
        let destination = object(json!({ "a": "giữ", "sub": { "old": "v" }, "legacy": "w" }));

        let plan = plan(&destination, &source);
        assert_eq!(plan.stats.preserved, 2);
    }
}
