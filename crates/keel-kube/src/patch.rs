//! Patch strategies and patch planning
//!
//! A [`PatchOperation`] is what the patch engine submits: a strategy plus a
//! JSON payload in that strategy's format. It comes either straight from the
//! caller (encoded payload) or from a diff between two full objects.

use std::fmt;
use std::str::FromStr;

use keel_core::{CoreError, ResourceKind, codec, merge};
use serde_json::Value;

use crate::error::{KubeError, Result};

/// Wire format of a patch payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PatchStrategy {
    /// Kubernetes strategic merge patch (keyed lists merge element-wise)
    #[default]
    StrategicMerge,
    /// RFC 7396 JSON merge patch (lists are replaced)
    JsonMerge,
    /// RFC 6902 JSON patch (explicit operations)
    JsonPatch,
}

impl PatchStrategy {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::StrategicMerge => "application/strategic-merge-patch+json",
            Self::JsonMerge => "application/merge-patch+json",
            Self::JsonPatch => "application/json-patch+json",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrategicMerge => "strategic",
            Self::JsonMerge => "merge",
            Self::JsonPatch => "json",
        }
    }
}

impl fmt::Display for PatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchStrategy {
    type Err = KubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strategic" | "strategic-merge" => Ok(Self::StrategicMerge),
            "merge" | "json-merge" => Ok(Self::JsonMerge),
            "json" | "json-patch" => Ok(Self::JsonPatch),
            other => Err(KubeError::InvalidConfig(format!(
                "unknown patch type '{other}' (expected strategic, merge or json)"
            ))),
        }
    }
}

/// A patch ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOperation {
    pub strategy: PatchStrategy,
    /// JSON payload in the strategy's format
    pub payload: Vec<u8>,
    /// Whether the payload was computed from a diff rather than supplied
    pub derived: bool,
}

impl PatchOperation {
    /// Wrap a caller-supplied YAML or JSON payload
    ///
    /// Strategic and JSON merge payloads must be mappings and JSON patch
    /// payloads must be sequences. Empty payloads of any shape are accepted.
    pub fn from_payload(bytes: &[u8], strategy: PatchStrategy) -> Result<Self> {
        let decode_error = |message: String| CoreError::Decode {
            kind: format!("{strategy} patch"),
            message,
        };
        let payload = keel_core::yaml_to_json(bytes).map_err(|e| decode_error(e.to_string()))?;

        if !merge::is_noop(&payload)? {
            let value: Value =
                serde_json::from_slice(&payload).map_err(|e| decode_error(e.to_string()))?;
            let shape_ok = match strategy {
                PatchStrategy::StrategicMerge | PatchStrategy::JsonMerge => value.is_object(),
                PatchStrategy::JsonPatch => value.is_array(),
            };
            if !shape_ok {
                let expected = match strategy {
                    PatchStrategy::JsonPatch => "a sequence of operations",
                    _ => "a mapping",
                };
                return Err(decode_error(format!(
                    "expected {expected}, found {}",
                    codec::value_type(&value)
                ))
                .into());
            }
        }

        Ok(Self {
            strategy,
            payload,
            derived: false,
        })
    }

    /// Compute the patch turning `original` into `modified`
    ///
    /// Server-managed fields are ignored on both sides so that a modification
    /// read from a file does not try to clear them.
    pub fn diff<K: ResourceKind>(
        original: &K,
        modified: &K,
        strategy: PatchStrategy,
    ) -> Result<Self> {
        let mut original = codec::to_value(original)?;
        let mut modified = codec::to_value(modified)?;
        keel_core::identity::strip_server_fields(&mut original);
        keel_core::identity::strip_server_fields(&mut modified);

        let patch = match strategy {
            PatchStrategy::StrategicMerge => {
                merge::strategic_merge_diff(&original, &modified, &K::INFO)?
            }
            PatchStrategy::JsonMerge => merge::json_merge_diff(&original, &modified)?,
            PatchStrategy::JsonPatch => merge::json_patch_diff(&original, &modified)?,
        };

        Ok(Self {
            strategy,
            payload: serde_json::to_vec(&patch)?,
            derived: true,
        })
    }

    /// Whether submitting this patch would change nothing
    pub fn is_noop(&self) -> Result<bool> {
        Ok(merge::is_noop(&self.payload)?)
    }

    /// Payload as a JSON value
    pub fn to_value(&self) -> Result<Value> {
        if self.payload.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.payload).map_err(|e| {
            CoreError::Decode {
                kind: format!("{} patch", self.strategy),
                message: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ConfigMap, Service, ServicePort, ServiceSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use serde_json::json;

    fn service(ports: &[(&str, i32)]) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                namespace: Some("a".to_string()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                ports: Some(
                    ports
                        .iter()
                        .map(|(name, port)| ServicePort {
                            name: Some(name.to_string()),
                            port: *port,
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            "strategic".parse::<PatchStrategy>().unwrap(),
            PatchStrategy::StrategicMerge
        );
        assert_eq!(
            "Merge".parse::<PatchStrategy>().unwrap(),
            PatchStrategy::JsonMerge
        );
        assert_eq!(
            "json-patch".parse::<PatchStrategy>().unwrap(),
            PatchStrategy::JsonPatch
        );
        assert!("apply".parse::<PatchStrategy>().is_err());
        assert_eq!(PatchStrategy::default(), PatchStrategy::StrategicMerge);
    }

    #[test]
    fn test_from_payload_normalizes_yaml() {
        let op = PatchOperation::from_payload(b"data:\n  a: \"1\"\n", PatchStrategy::JsonMerge)
            .unwrap();
        assert!(!op.derived);
        assert_eq!(op.to_value().unwrap(), json!({"data": {"a": "1"}}));
        assert!(!op.is_noop().unwrap());
    }

    #[test]
    fn test_from_payload_malformed_is_decode_error() {
        let err = PatchOperation::from_payload(b"data: [", PatchStrategy::StrategicMerge)
            .unwrap_err();
        assert!(matches!(err, KubeError::Core(CoreError::Decode { .. })));
    }

    #[test]
    fn test_from_payload_rejects_wrong_shape() {
        let cases: [(&[u8], PatchStrategy); 5] = [
            (b"42", PatchStrategy::StrategicMerge),
            (b"\"text\"", PatchStrategy::JsonMerge),
            (b"- name: a\n", PatchStrategy::StrategicMerge),
            (br#"[{"op":"add","path":"/data/a","value":"1"}]"#, PatchStrategy::JsonMerge),
            (br#"{"data":{"a":"1"}}"#, PatchStrategy::JsonPatch),
        ];
        for (payload, strategy) in cases {
            let err = PatchOperation::from_payload(payload, strategy).unwrap_err();
            assert!(
                matches!(err, KubeError::Core(CoreError::Decode { .. })),
                "{strategy}: {err}"
            );
        }

        let ops = br#"[{"op":"add","path":"/data/a","value":"1"}]"#;
        assert!(PatchOperation::from_payload(ops, PatchStrategy::JsonPatch).is_ok());
    }

    #[test]
    fn test_empty_payloads_are_noops() {
        for payload in [&b""[..], b"{}", b"null", b"[]", b"  \n"] {
            let op = PatchOperation::from_payload(payload, PatchStrategy::JsonPatch).unwrap();
            assert!(op.is_noop().unwrap(), "payload {payload:?}");
        }
    }

    #[test]
    fn test_diff_of_identical_objects_is_noop_for_every_strategy() {
        let svc = service(&[("http", 80)]);
        for strategy in [
            PatchStrategy::StrategicMerge,
            PatchStrategy::JsonMerge,
            PatchStrategy::JsonPatch,
        ] {
            let op = PatchOperation::diff(&svc, &svc, strategy).unwrap();
            assert!(op.derived);
            assert!(op.is_noop().unwrap(), "{strategy} diff should be empty");
        }
    }

    #[test]
    fn test_strategic_diff_only_carries_new_port() {
        let original = service(&[("http", 80)]);
        let modified = service(&[("http", 80), ("https", 443)]);

        let op = PatchOperation::diff(&original, &modified, PatchStrategy::StrategicMerge).unwrap();
        assert_eq!(
            op.to_value().unwrap(),
            json!({"spec": {"ports": [{"name": "https", "port": 443}]}})
        );

        let op = PatchOperation::diff(&original, &modified, PatchStrategy::JsonMerge).unwrap();
        assert_eq!(
            op.to_value().unwrap(),
            json!({"spec": {"ports": [
                {"name": "http", "port": 80},
                {"name": "https", "port": 443}
            ]}})
        );
    }

    #[test]
    fn test_diff_ignores_server_fields_missing_from_modification() {
        let mut original = ConfigMap {
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                resource_version: Some("12".to_string()),
                uid: Some("abc".to_string()),
                ..Default::default()
            },
            data: Some([("a".to_string(), "1".to_string())].into()),
            ..Default::default()
        };
        let mut modified = original.clone();
        modified.metadata.resource_version = None;
        modified.metadata.uid = None;

        let op = PatchOperation::diff(&original, &modified, PatchStrategy::JsonMerge).unwrap();
        assert!(op.is_noop().unwrap());

        original.data = None;
        let op = PatchOperation::diff(&original, &modified, PatchStrategy::JsonMerge).unwrap();
        assert_eq!(op.to_value().unwrap(), json!({"data": {"a": "1"}}));
    }
}
