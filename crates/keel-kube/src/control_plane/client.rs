//! Control plane backed by a live cluster

use async_trait::async_trait;
use keel_core::KindInfo;
use kube::Client;
use kube::api::{Api, DeleteParams, DynamicObject, GetParams, Patch, PatchParams, PostParams};
use serde_json::Value;

use super::ControlPlane;
use crate::error::{KubeError, Result};
use crate::patch::PatchStrategy;

/// Reason the API server gives when a create hits an existing name
const REASON_ALREADY_EXISTS: &str = "AlreadyExists";

/// [`ControlPlane`] over a kube-rs client
///
/// Uses dynamic APIs built from the kind descriptor, so no discovery round
/// trip is needed. The client is cheap to clone and shared by every handler.
#[derive(Clone)]
pub struct KubeControlPlane {
    client: Client,
}

impl KubeControlPlane {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the default kubeconfig or in-cluster configuration
    pub async fn try_default() -> Result<Self> {
        Ok(Self::new(Client::try_default().await?))
    }

    fn api(&self, kind: &KindInfo, namespace: Option<&str>) -> Api<DynamicObject> {
        let resource = kind.api_resource();
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        }
    }
}

fn to_object(object: &Value) -> Result<DynamicObject> {
    Ok(serde_json::from_value(object.clone())?)
}

fn from_object(object: DynamicObject) -> Result<Value> {
    Ok(serde_json::to_value(object)?)
}

/// Sort an API failure into the conditions handlers route on
fn classify(kind: &KindInfo, name: &str, err: kube::Error) -> KubeError {
    match &err {
        kube::Error::Api(resp) if resp.code == 409 && resp.reason == REASON_ALREADY_EXISTS => {
            KubeError::AlreadyExists {
                kind: kind.kind.to_string(),
                name: name.to_string(),
            }
        }
        kube::Error::Api(resp) if resp.code == 404 => KubeError::NotFound {
            kind: kind.kind.to_string(),
            name: name.to_string(),
        },
        _ => KubeError::ControlPlane(err),
    }
}

#[async_trait]
impl ControlPlane for KubeControlPlane {
    async fn create(
        &self,
        kind: &KindInfo,
        namespace: Option<&str>,
        object: &Value,
        params: &PostParams,
    ) -> Result<Value> {
        let object = to_object(object)?;
        let name = object.metadata.name.clone().unwrap_or_default();
        let created = self
            .api(kind, namespace)
            .create(params, &object)
            .await
            .map_err(|e| classify(kind, &name, e))?;
        from_object(created)
    }

    async fn update(
        &self,
        kind: &KindInfo,
        namespace: Option<&str>,
        name: &str,
        object: &Value,
        params: &PostParams,
    ) -> Result<Value> {
        let object = to_object(object)?;
        let updated = self
            .api(kind, namespace)
            .replace(name, params, &object)
            .await
            .map_err(|e| classify(kind, name, e))?;
        from_object(updated)
    }

    async fn get(
        &self,
        kind: &KindInfo,
        namespace: Option<&str>,
        name: &str,
        params: &GetParams,
    ) -> Result<Value> {
        let object = self
            .api(kind, namespace)
            .get_with(name, params)
            .await
            .map_err(|e| classify(kind, name, e))?;
        from_object(object)
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
        let body: Value = serde_json::from_slice(payload)?;
        let patch = match strategy {
            PatchStrategy::StrategicMerge => Patch::Strategic(body),
            PatchStrategy::JsonMerge => Patch::Merge(body),
            PatchStrategy::JsonPatch => Patch::Json(serde_json::from_value(body)?),
        };
        let patched = self
            .api(kind, namespace)
            .patch(name, params, &patch)
            .await
            .map_err(|e| classify(kind, name, e))?;
        from_object(patched)
    }

    async fn delete(
        &self,
        kind: &KindInfo,
        namespace: Option<&str>,
        name: &str,
        params: &DeleteParams,
    ) -> Result<()> {
        self.api(kind, namespace)
            .delete(name, params)
            .await
            .map_err(|e| classify(kind, name, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use keel_core::ResourceKind;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{reason} for test"),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_classify_already_exists() {
        let err = classify(&ConfigMap::INFO, "web", api_error(409, "AlreadyExists"));
        assert!(err.is_already_exists());
        assert_eq!(err.to_string(), "ConfigMap 'web' already exists");
    }

    #[test]
    fn test_classify_conflict_is_not_already_exists() {
        let err = classify(&ConfigMap::INFO, "web", api_error(409, "Conflict"));
        assert!(!err.is_already_exists());
        assert!(matches!(err, KubeError::ControlPlane(_)));
    }

    #[test]
    fn test_classify_not_found() {
        let err = classify(&ConfigMap::INFO, "web", api_error(404, "NotFound"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_classify_other_errors_pass_through() {
        let err = classify(&ConfigMap::INFO, "web", api_error(422, "Invalid"));
        assert_eq!(err.status_code(), Some(422));
    }

    #[test]
    fn test_value_object_round_trip() {
        let value = serde_json::json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "web", "namespace": "a"},
            "data": {"k": "v"}
        });
        let object = to_object(&value).unwrap();
        assert_eq!(object.metadata.name.as_deref(), Some("web"));
        assert_eq!(from_object(object).unwrap(), value);
    }
}
