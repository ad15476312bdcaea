//! Patch computation and application
//!
//! Three patch formats are supported, all over `serde_json::Value`:
//!
//! - **Strategic merge**: maps merge recursively; list fields that declare a
//!   merge key (see [`KindInfo::merge_key`]) merge element-by-element, other
//!   lists are replaced. Removed list elements are expressed with the
//!   `{"$patch": "delete"}` directive.
//! - **JSON merge** (RFC 7396): maps merge recursively, every list is replaced
//!   wholesale, `null` deletes a field.
//! - **JSON patch** (RFC 6902): an explicit list of operations.
//!
//! The `*_diff` functions compute the patch that turns `original` into
//! `modified`. The `apply_*` functions apply a patch the way the API server
//! does, which lets tests and offline previews see the resulting object.

use serde_json::{Map, Value};

use crate::codec::value_type;
use crate::error::{CoreError, Result};
use crate::kind::KindInfo;

const PATCH_DIRECTIVE: &str = "$patch";
const DIRECTIVE_DELETE: &str = "delete";
const DIRECTIVE_REPLACE: &str = "replace";
const DIRECTIVE_PREFIX: &str = "$";

/// Compute a strategic two-way merge patch from `original` to `modified`
///
/// Returns an empty object when the two are equivalent.
pub fn strategic_merge_diff(original: &Value, modified: &Value, kind: &KindInfo) -> Result<Value> {
    diff_root(original, modified, Some(kind))
}

/// Compute an RFC 7396 merge patch from `original` to `modified`
///
/// Returns an empty object when the two are equivalent.
pub fn json_merge_diff(original: &Value, modified: &Value) -> Result<Value> {
    diff_root(original, modified, None)
}

/// Compute an RFC 6902 patch from `original` to `modified`
///
/// Returns an empty array when the two are equivalent.
pub fn json_patch_diff(original: &Value, modified: &Value) -> Result<Value> {
    let ops = json_patch::diff(original, modified);
    serde_json::to_value(&ops).map_err(|e| CoreError::Serialization(e.to_string()))
}

/// Whether an encoded patch payload changes nothing
///
/// Empty or whitespace-only payloads, `null`, `{}` and `[]` are no-ops.
pub fn is_noop(payload: &[u8]) -> Result<bool> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Ok(true);
    }
    let value: Value = serde_json::from_slice(payload).map_err(|e| CoreError::Decode {
        kind: "patch".to_string(),
        message: e.to_string(),
    })?;
    Ok(is_noop_value(&value))
}

pub fn is_noop_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Apply a strategic merge patch to `target` in place
pub fn apply_strategic_merge(target: &mut Value, patch: &Value, kind: &KindInfo) -> Result<()> {
    if !patch.is_object() {
        return Err(CoreError::Decode {
            kind: "strategic merge patch".to_string(),
            message: format!("expected a mapping, found {}", value_type(patch)),
        });
    }
    merge_value(target, patch, "", Some(kind));
    Ok(())
}

/// Apply an RFC 7396 merge patch to `target` in place
pub fn apply_json_merge(target: &mut Value, patch: &Value) {
    json_patch::merge(target, patch);
}

/// Apply an RFC 6902 patch to `target` in place
///
/// The target is left untouched when any operation fails.
pub fn apply_json_patch(target: &mut Value, patch: &Value) -> Result<()> {
    let ops: json_patch::Patch =
        serde_json::from_value(patch.clone()).map_err(|e| CoreError::Decode {
            kind: "json patch".to_string(),
            message: e.to_string(),
        })?;
    json_patch::patch(target, &ops.0).map_err(|e| CoreError::Patch(e.to_string()))
}

fn diff_root(original: &Value, modified: &Value, kind: Option<&KindInfo>) -> Result<Value> {
    match (original, modified) {
        (Value::Object(original), Value::Object(modified)) => {
            Ok(Value::Object(diff_maps(original, modified, "", kind)))
        }
        (original, modified) => Err(CoreError::Patch(format!(
            "cannot diff {} against {}: both sides must be objects",
            value_type(original),
            value_type(modified)
        ))),
    }
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn diff_maps(
    original: &Map<String, Value>,
    modified: &Map<String, Value>,
    path: &str,
    kind: Option<&KindInfo>,
) -> Map<String, Value> {
    let mut patch = Map::new();

    for (key, new) in modified {
        let Some(old) = original.get(key) else {
            patch.insert(key.clone(), new.clone());
            continue;
        };
        if old == new {
            continue;
        }

        let field_path = child_path(path, key);
        match (old, new) {
            (Value::Object(old), Value::Object(new)) => {
                let sub = diff_maps(old, new, &field_path, kind);
                if !sub.is_empty() {
                    patch.insert(key.clone(), Value::Object(sub));
                }
            }
            (Value::Array(old), Value::Array(new)) => {
                let merge_key = kind.and_then(|k| k.merge_key(&field_path));
                match merge_key.and_then(|mk| diff_keyed_list(old, new, mk, &field_path, kind)) {
                    Some(items) if items.is_empty() => {}
                    Some(items) => {
                        patch.insert(key.clone(), Value::Array(items));
                    }
                    None => {
                        patch.insert(key.clone(), Value::Array(new.clone()));
                    }
                }
            }
            _ => {
                patch.insert(key.clone(), new.clone());
            }
        }
    }

    for key in original.keys() {
        if !modified.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }

    patch
}

/// Key value of a list element, if it is a map carrying the merge key
fn element_key<'a>(item: &'a Value, merge_key: &str) -> Option<&'a Value> {
    item.as_object().and_then(|map| map.get(merge_key))
}

/// Diff two lists merged by key
///
/// Returns `None` when some element has no merge key, in which case the
/// caller falls back to replacing the whole list.
fn diff_keyed_list(
    old: &[Value],
    new: &[Value],
    merge_key: &str,
    path: &str,
    kind: Option<&KindInfo>,
) -> Option<Vec<Value>> {
    if old
        .iter()
        .chain(new)
        .any(|item| element_key(item, merge_key).is_none())
    {
        return None;
    }

    let mut items = Vec::new();

    for new_item in new {
        let key_value = element_key(new_item, merge_key)?;
        let old_item = old
            .iter()
            .find(|item| element_key(item, merge_key) == Some(key_value));

        match old_item {
            None => items.push(new_item.clone()),
            Some(old_item) if old_item == new_item => {}
            Some(old_item) => {
                let (Value::Object(old_map), Value::Object(new_map)) = (old_item, new_item) else {
                    return None;
                };
                let mut sub = diff_maps(old_map, new_map, path, kind);
                sub.insert(merge_key.to_string(), key_value.clone());
                items.push(Value::Object(sub));
            }
        }
    }

    for old_item in old {
        let key_value = element_key(old_item, merge_key)?;
        let kept = new
            .iter()
            .any(|item| element_key(item, merge_key) == Some(key_value));
        if !kept {
            let mut directive = Map::new();
            directive.insert(
                PATCH_DIRECTIVE.to_string(),
                Value::String(DIRECTIVE_DELETE.to_string()),
            );
            directive.insert(merge_key.to_string(), key_value.clone());
            items.push(Value::Object(directive));
        }
    }

    Some(items)
}

fn merge_value(target: &mut Value, patch: &Value, path: &str, kind: Option<&KindInfo>) {
    let Value::Object(patch_map) = patch else {
        *target = without_directives(patch);
        return;
    };
    if !target.is_object() || directive(patch_map) == Some(DIRECTIVE_REPLACE) {
        *target = without_directives(patch);
        return;
    }
    let Value::Object(target_map) = target else {
        return;
    };

    for (key, patch_value) in patch_map {
        if key.starts_with(DIRECTIVE_PREFIX) {
            continue;
        }
        if patch_value.is_null() {
            target_map.remove(key);
            continue;
        }

        let field_path = child_path(path, key);
        let merge_key = kind.and_then(|k| k.merge_key(&field_path));

        match (target_map.get_mut(key), patch_value, merge_key) {
            (Some(Value::Array(current)), Value::Array(items), Some(merge_key)) => {
                merge_keyed_list(current, items, merge_key, &field_path, kind);
                continue;
            }
            (Some(current), Value::Object(_), _) if current.is_object() => {
                merge_value(current, patch_value, &field_path, kind);
                continue;
            }
            _ => {}
        }

        target_map.insert(key.clone(), without_directives(patch_value));
    }
}

fn merge_keyed_list(
    current: &mut Vec<Value>,
    items: &[Value],
    merge_key: &str,
    path: &str,
    kind: Option<&KindInfo>,
) {
    if items
        .iter()
        .any(|item| element_key(item, merge_key).is_none())
    {
        *current = items.iter().map(without_directives).collect();
        return;
    }

    for item in items {
        let Some(key_value) = element_key(item, merge_key) else {
            continue;
        };
        let position = current
            .iter()
            .position(|existing| element_key(existing, merge_key) == Some(key_value));

        if is_delete_directive(item) {
            current.retain(|existing| element_key(existing, merge_key) != Some(key_value));
            continue;
        }

        match position {
            Some(index) => merge_value(&mut current[index], item, path, kind),
            None => current.push(without_directives(item)),
        }
    }
}

fn directive(map: &Map<String, Value>) -> Option<&str> {
    map.get(PATCH_DIRECTIVE).and_then(Value::as_str)
}

fn is_delete_directive(item: &Value) -> bool {
    item.as_object()
        .and_then(directive)
        .is_some_and(|d| d == DIRECTIVE_DELETE)
}

/// Copy of a patch value with `$`-directives and deletion markers removed
fn without_directives(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, v)| !key.starts_with(DIRECTIVE_PREFIX) && !v.is_null())
                .map(|(key, v)| (key.clone(), without_directives(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|item| !is_delete_directive(item))
                .map(without_directives)
                .collect(),
        ),
        other => other.clone(),
    }
}
