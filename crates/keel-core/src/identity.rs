//! Namespace and identity rules shared by every operation
//!
//! Get, create, update, apply, patch and delete all pick their namespace with
//! [`effective_namespace`], so the same object always lands in the same place
//! no matter which operation touches it.

use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::kind::ResourceKind;

/// Namespace an operation on `resource` should target
///
/// Cluster-scoped kinds have no namespace. For namespaced kinds a non-empty
/// namespace on the object wins over the handler default.
pub fn effective_namespace<'a, K: ResourceKind>(
    resource: &'a K,
    default: &'a str,
) -> Option<&'a str> {
    scoped_namespace::<K>(resource.meta().namespace.as_deref(), default)
}

/// Same rule as [`effective_namespace`] for a bare namespace value
pub fn scoped_namespace<'a, K: ResourceKind>(
    namespace: Option<&'a str>,
    default: &'a str,
) -> Option<&'a str> {
    if !K::INFO.namespaced {
        return None;
    }
    match namespace {
        Some(ns) if !ns.is_empty() => Some(ns),
        _ => Some(default),
    }
}

/// Name of the resource, which must be present before submission
pub fn resource_name<K: ResourceKind>(resource: &K) -> Result<&str> {
    match resource.meta().name.as_deref() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(CoreError::MissingName {
            kind: K::INFO.kind.to_string(),
        }),
    }
}

/// Clear the server-assigned identity (resource version and UID)
pub fn strip_identity<K: ResourceKind>(resource: &mut K) {
    let meta = resource.meta_mut();
    meta.resource_version = None;
    meta.uid = None;
}

/// Remove the server-populated status from an encoded object
pub fn strip_status(object: &mut Value) {
    if let Value::Object(map) = object {
        map.remove("status");
    }
}

/// Metadata fields owned by the control plane
const SERVER_METADATA: &[&str] = &[
    "resourceVersion",
    "uid",
    "creationTimestamp",
    "generation",
    "managedFields",
    "selfLink",
];

/// Remove status and server-owned metadata from an encoded object
pub fn strip_server_fields(object: &mut Value) {
    strip_status(object);
    if let Some(Value::Object(meta)) = object.get_mut("metadata") {
        for field in SERVER_METADATA {
            meta.remove(*field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ConfigMap, Namespace};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use serde_json::json;

    fn configmap(namespace: Option<&str>) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                namespace: namespace.map(str::to_string),
                resource_version: Some("42".to_string()),
                uid: Some("0b1c".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_object_namespace_wins() {
        let cm = configmap(Some("a"));
        assert_eq!(effective_namespace(&cm, "b"), Some("a"));
    }

    #[test]
    fn test_empty_namespace_uses_default() {
        assert_eq!(effective_namespace(&configmap(None), "b"), Some("b"));
        assert_eq!(effective_namespace(&configmap(Some("")), "b"), Some("b"));
    }

    #[test]
    fn test_cluster_scoped_has_no_namespace() {
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some("team-a".to_string()),
                namespace: Some("ignored".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(effective_namespace(&ns, "b"), None);
    }

    #[test]
    fn test_resource_name_required() {
        assert_eq!(resource_name(&configmap(None)).unwrap(), "web");

        let mut cm = configmap(None);
        cm.metadata.name = Some(String::new());
        assert!(matches!(
            resource_name(&cm),
            Err(CoreError::MissingName { .. })
        ));

        cm.metadata.name = None;
        assert!(resource_name(&cm).is_err());
    }

    #[test]
    fn test_strip_identity() {
        let mut cm = configmap(Some("a"));
        strip_identity(&mut cm);
        assert!(cm.metadata.resource_version.is_none());
        assert!(cm.metadata.uid.is_none());
        assert_eq!(cm.metadata.name.as_deref(), Some("web"));
        assert_eq!(cm.metadata.namespace.as_deref(), Some("a"));
    }

    #[test]
    fn test_strip_server_fields() {
        let mut obj = json!({
            "metadata": {
                "name": "x",
                "resourceVersion": "7",
                "uid": "u",
                "generation": 3,
                "managedFields": [{"manager": "kubectl"}],
                "labels": {"app": "x"}
            },
            "status": {"phase": "Active"}
        });
        strip_server_fields(&mut obj);
        assert_eq!(obj, json!({"metadata": {"name": "x", "labels": {"app": "x"}}}));
    }

    #[test]
    fn test_strip_status() {
        let mut obj = json!({"metadata": {"name": "x"}, "status": {"phase": "Active"}});
        strip_status(&mut obj);
        assert_eq!(obj, json!({"metadata": {"name": "x"}}));
    }
}
