//! Conversions between encoded text, typed resources and loosely-typed documents
//!
//! Input text may be YAML or JSON (YAML is a superset, so one decoder handles
//! both). Everything is normalized to JSON before it reaches a typed schema.

use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::kind::{KindInfo, ResourceKind};

/// Loosely-typed nested key/value form of a resource
pub type Document = Map<String, Value>;

/// Normalize a YAML or JSON document into JSON bytes
///
/// Empty input yields `null`, matching what an empty YAML stream decodes to.
pub fn yaml_to_json(bytes: &[u8]) -> std::result::Result<Vec<u8>, serde_yaml::Error> {
    let value: Value = if is_blank(bytes) {
        Value::Null
    } else {
        serde_yaml::from_slice(bytes)?
    };
    // Serializing a serde_json::Value cannot fail
    Ok(serde_json::to_vec(&value).unwrap_or_else(|_| b"null".to_vec()))
}

/// Decode a YAML or JSON document into a typed resource
pub fn decode<K: ResourceKind>(bytes: &[u8]) -> Result<K> {
    let info = K::INFO;
    if is_blank(bytes) {
        return Err(CoreError::decode(info.kind, "document is empty"));
    }

    let value: Value =
        serde_yaml::from_slice(bytes).map_err(|e| CoreError::decode(info.kind, e))?;
    let Value::Object(mut doc) = value else {
        return Err(CoreError::decode(
            info.kind,
            format!("expected a mapping, found {}", value_type(&value)),
        ));
    };

    normalize_type_meta(&info, &mut doc)?;
    serde_json::from_value(Value::Object(doc)).map_err(|e| CoreError::decode(info.kind, e))
}

/// Convert a typed resource into a loosely-typed document
///
/// The document always carries `apiVersion` and `kind`.
pub fn to_document<K: ResourceKind>(resource: &K) -> Result<Document> {
    match to_value(resource)? {
        Value::Object(doc) => Ok(doc),
        other => Err(CoreError::Serialization(format!(
            "{} serialized to {} instead of an object",
            K::INFO.kind,
            value_type(&other)
        ))),
    }
}

/// Convert a loosely-typed document into a typed resource
///
/// Missing `apiVersion`/`kind` are filled in from the bound kind; present ones
/// must match it.
pub fn from_document<K: ResourceKind>(mut doc: Document) -> Result<K> {
    let info = K::INFO;
    normalize_type_meta(&info, &mut doc)?;
    serde_json::from_value(Value::Object(doc)).map_err(|e| CoreError::conversion(info.kind, e))
}

/// Serialize a typed resource to a JSON value
pub fn to_value<K: ResourceKind>(resource: &K) -> Result<Value> {
    serde_json::to_value(resource).map_err(|e| CoreError::Serialization(e.to_string()))
}

/// Deserialize a JSON value returned by the control plane
pub fn from_value<K: ResourceKind>(value: Value) -> Result<K> {
    match value {
        Value::Object(doc) => from_document(doc),
        other => Err(CoreError::conversion(
            K::INFO.kind,
            format!("expected an object, found {}", value_type(&other)),
        )),
    }
}

/// Fill in or verify apiVersion/kind against the bound kind
fn normalize_type_meta(info: &KindInfo, doc: &mut Document) -> Result<()> {
    match doc.get("kind") {
        None | Some(Value::Null) => {
            doc.insert("kind".to_string(), Value::String(info.kind.to_string()));
        }
        Some(Value::String(kind)) if kind == info.kind => {}
        Some(other) => {
            return Err(CoreError::TypeMismatch {
                expected: info.kind.to_string(),
                found: display_scalar(other),
            });
        }
    }

    match doc.get("apiVersion") {
        None | Some(Value::Null) => {
            doc.insert(
                "apiVersion".to_string(),
                Value::String(info.api_version.to_string()),
            );
        }
        Some(Value::String(version)) if version == info.api_version => {}
        Some(other) => {
            return Err(CoreError::TypeMismatch {
                expected: format!("{} {}", info.api_version, info.kind),
                found: format!("{} {}", display_scalar(other), info.kind),
            });
        }
    }

    Ok(())
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

/// Short description of a JSON value's type, for error messages
pub fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
