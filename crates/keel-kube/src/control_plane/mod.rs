//! Control-plane backends
//!
//! Handlers never talk to the API server directly. They go through a
//! [`ControlPlane`], which works on encoded objects (`serde_json::Value`) keyed
//! by a [`KindInfo`], so one implementation serves every kind:
//! - [`KubeControlPlane`]: a live cluster through a kube-rs [`kube::Client`]
//! - [`InMemoryControlPlane`]: an in-process object store for tests and dry runs

mod client;
mod memory;

pub use client::KubeControlPlane;
pub use memory::{InMemoryControlPlane, OperationCounts};

use async_trait::async_trait;
use keel_core::KindInfo;
use kube::api::{DeleteParams, GetParams, PatchParams, PostParams};
use serde_json::Value;

use crate::error::Result;
use crate::patch::PatchStrategy;

/// The four object primitives (plus delete) every handler is built on
///
/// `namespace` is `None` for cluster-scoped kinds. Implementations report a
/// create conflict as [`KubeError::AlreadyExists`] and a missing object as
/// [`KubeError::NotFound`]; everything else is returned as-is.
///
/// Implementations must be Send + Sync for use across async tasks.
///
/// [`KubeError::AlreadyExists`]: crate::KubeError::AlreadyExists
/// [`KubeError::NotFound`]: crate::KubeError::NotFound
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Create a new object
    async fn create(
        &self,
        kind: &KindInfo,
        namespace: Option<&str>,
        object: &Value,
        params: &PostParams,
    ) -> Result<Value>;

    /// Replace an existing object
    async fn update(
        &self,
        kind: &KindInfo,
        namespace: Option<&str>,
        name: &str,
        object: &Value,
        params: &PostParams,
    ) -> Result<Value>;

    /// Fetch an object by name
    async fn get(
        &self,
        kind: &KindInfo,
        namespace: Option<&str>,
        name: &str,
        params: &GetParams,
    ) -> Result<Value>;

    /// Patch an object with a JSON payload in `strategy`'s format
    async fn patch(
        &self,
        kind: &KindInfo,
        namespace: Option<&str>,
        name: &str,
        strategy: PatchStrategy,
        payload: &[u8],
        params: &PatchParams,
    ) -> Result<Value>;

    /// Delete an object by name
    async fn delete(
        &self,
        kind: &KindInfo,
        namespace: Option<&str>,
        name: &str,
        params: &DeleteParams,
    ) -> Result<()>;
}
