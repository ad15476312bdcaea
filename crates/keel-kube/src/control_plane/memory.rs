//! In-memory control plane for testing
//!
//! Stores objects in memory and applies patches with the same algorithms the
//! API server uses, so handler behavior can be tested without a cluster.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use keel_core::{KindInfo, merge};
use kube::api::{DeleteParams, GetParams, PatchParams, PostParams};
use kube::core::ErrorResponse;
use serde_json::{Map, Value};

use super::ControlPlane;
use crate::error::{KubeError, Result};
use crate::patch::PatchStrategy;

/// Store key: (apiVersion/kind, namespace, name). Cluster-scoped objects use "".
type ObjectKey = (String, String, String);

/// In-memory control plane
#[derive(Clone, Default)]
pub struct InMemoryControlPlane {
    state: Arc<RwLock<State>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
}

#[derive(Default)]
struct State {
    objects: HashMap<ObjectKey, Value>,
    revision: u64,
    /// Status code every create is rejected with, if set
    reject_creates: Option<(u16, String)>,
    /// Status code every update is rejected with, if set
    reject_updates: Option<(u16, String)>,
}

/// Counts of calls received, for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub creates: usize,
    pub updates: usize,
    pub gets: usize,
    pub patches: usize,
    pub deletes: usize,
}

impl OperationCounts {
    /// Total number of calls of any kind
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.gets + self.patches + self.deletes
    }
}

impl InMemoryControlPlane {
    /// Create a new empty control plane
    pub fn new() -> Self {
        Self::default()
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        *self.counts() = OperationCounts::default();
    }

    /// Stored object, without counting a call
    pub fn object(&self, kind: &KindInfo, namespace: Option<&str>, name: &str) -> Option<Value> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .objects
            .get(&key(kind, namespace, name))
            .cloned()
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .objects
            .len()
    }

    /// Reject every following create with the given status code and reason
    pub fn reject_creates(&self, code: u16, reason: &str) {
        self.state().reject_creates = Some((code, reason.to_string()));
    }

    /// Reject every following update with the given status code and reason
    pub fn reject_updates(&self, code: u16, reason: &str) {
        self.state().reject_updates = Some((code, reason.to_string()));
    }

    fn state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn counts(&self) -> RwLockWriteGuard<'_, OperationCounts> {
        self.operations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn key(kind: &KindInfo, namespace: Option<&str>, name: &str) -> ObjectKey {
    (
        format!("{}/{}", kind.api_version, kind.kind),
        namespace.unwrap_or_default().to_string(),
        name.to_string(),
    )
}

fn api_error(code: u16, reason: &str, message: String) -> KubeError {
    KubeError::ControlPlane(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    }))
}

fn not_found(kind: &KindInfo, name: &str) -> KubeError {
    KubeError::NotFound {
        kind: kind.kind.to_string(),
        name: name.to_string(),
    }
}

fn metadata(object: &Value) -> Option<&Map<String, Value>> {
    object.get("metadata").and_then(Value::as_object)
}

fn metadata_str<'a>(object: &'a Value, field: &str) -> Option<&'a str> {
    metadata(object)
        .and_then(|meta| meta.get(field))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

impl State {
    fn next_revision(&mut self) -> String {
        self.revision += 1;
        self.revision.to_string()
    }

    /// Stamp server-owned fields onto an object about to be stored
    fn admit(
        &mut self,
        kind: &KindInfo,
        namespace: Option<&str>,
        mut object: Value,
        uid: Option<String>,
    ) -> Result<Value> {
        let Value::Object(root) = &mut object else {
            return Err(api_error(
                400,
                "BadRequest",
                format!("{} body must be an object", kind.kind),
            ));
        };
        root.insert("apiVersion".to_string(), Value::from(kind.api_version));
        root.insert("kind".to_string(), Value::from(kind.kind));

        let revision = self.next_revision();
        let meta = root
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(meta) = meta {
            match namespace {
                Some(ns) => meta.insert("namespace".to_string(), Value::from(ns)),
                None => meta.remove("namespace"),
            };
            let uid = uid.unwrap_or_else(|| format!("uid-{revision}"));
            meta.insert("uid".to_string(), Value::from(uid));
            meta.insert("resourceVersion".to_string(), Value::from(revision));
        }
        Ok(object)
    }
}

#[async_trait]
impl ControlPlane for InMemoryControlPlane {
    async fn create(
        &self,
        kind: &KindInfo,
        namespace: Option<&str>,
        object: &Value,
        params: &PostParams,
    ) -> Result<Value> {
        self.counts().creates += 1;

        let mut state = self.state();
        if let Some((code, reason)) = &state.reject_creates {
            return Err(api_error(*code, reason, format!("create rejected: {reason}")));
        }

        let Some(name) = metadata_str(object, "name") else {
            return Err(api_error(
                422,
                "Invalid",
                format!("{}: metadata.name is required", kind.kind),
            ));
        };
        if metadata_str(object, "resourceVersion").is_some() {
            return Err(api_error(
                400,
                "BadRequest",
                "resourceVersion should not be set on objects to be created".to_string(),
            ));
        }

        let key = key(kind, namespace, name);
        if state.objects.contains_key(&key) {
            return Err(KubeError::AlreadyExists {
                kind: kind.kind.to_string(),
                name: name.to_string(),
            });
        }

        let stored = state.admit(kind, namespace, object.clone(), None)?;
        if !params.dry_run {
            state.objects.insert(key, stored.clone());
        }
        Ok(stored)
    }

    async fn update(
        &self,
        kind: &KindInfo,
        namespace: Option<&str>,
        name: &str,
        object: &Value,
        params: &PostParams,
    ) -> Result<Value> {
        self.counts().updates += 1;

        let mut state = self.state();
        if let Some((code, reason)) = &state.reject_updates {
            return Err(api_error(*code, reason, format!("update rejected: {reason}")));
        }
        let key = key(kind, namespace, name);
        let Some(current) = state.objects.get(&key) else {
            return Err(not_found(kind, name));
        };

        if let Some(version) = metadata_str(object, "resourceVersion") {
            if Some(version) != metadata_str(current, "resourceVersion") {
                return Err(api_error(
                    409,
                    "Conflict",
                    format!("the object has been modified: {}/{name}", kind.kind),
                ));
            }
        }

        let uid = metadata_str(current, "uid").map(str::to_string);
        let stored = state.admit(kind, namespace, object.clone(), uid)?;
        if !params.dry_run {
            state.objects.insert(key, stored.clone());
        }
        Ok(stored)
    }

    async fn get(
        &self,
        kind: &KindInfo,
        namespace: Option<&str>,
        name: &str,
        _params: &GetParams,
    ) -> Result<Value> {
        self.counts().gets += 1;

        self.object(kind, namespace, name)
            .ok_or_else(|| not_found(kind, name))
    }

    async fn patch(
        &self,
        kind: &KindInfo,
        namespace: Option<&str>,
        name: &str,
        strategy: PatchStrategy,
        payload: &[u8],
        params: &PatchParams,
    ) -> Result<Value> {
        self.counts().patches += 1;

        let patch: Value = serde_json::from_slice(payload)
            .map_err(|e| api_error(400, "BadRequest", format!("invalid patch body: {e}")))?;

        let mut state = self.state();
        let key = key(kind, namespace, name);
        let Some(current) = state.objects.get(&key) else {
            return Err(not_found(kind, name));
        };

        let mut patched = current.clone();
        let outcome = match strategy {
            PatchStrategy::StrategicMerge => {
                merge::apply_strategic_merge(&mut patched, &patch, kind)
            }
            PatchStrategy::JsonMerge => {
                merge::apply_json_merge(&mut patched, &patch);
                Ok(())
            }
            PatchStrategy::JsonPatch => merge::apply_json_patch(&mut patched, &patch),
        };
        outcome.map_err(|e| api_error(422, "Invalid", e.to_string()))?;

        // Identity cannot be changed through a patch
        if metadata_str(&patched, "name") != Some(name) {
            return Err(api_error(
                422,
                "Invalid",
                format!("{}: metadata.name is immutable", kind.kind),
            ));
        }

        let uid = metadata_str(current, "uid").map(str::to_string);
        let stored = state.admit(kind, namespace, patched, uid)?;
        if !params.dry_run {
            state.objects.insert(key, stored.clone());
        }
        Ok(stored)
    }

    async fn delete(
        &self,
        kind: &KindInfo,
        namespace: Option<&str>,
        name: &str,
        params: &DeleteParams,
    ) -> Result<()> {
        self.counts().deletes += 1;

        let mut state = self.state();
        let key = key(kind, namespace, name);
        if !state.objects.contains_key(&key) {
            return Err(not_found(kind, name));
        }
        if !params.dry_run {
            state.objects.remove(&key);
        }
        Ok(())
    }
}
