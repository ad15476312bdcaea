//! Generic resource handler
//!
//! A [`Handler`] binds one [`ResourceKind`] to a shared [`ControlPlane`], a
//! default namespace, a [`RequestContext`] and per-operation options. The
//! same engine serves every kind:
//!
//! - **apply**: create, falling back to a single update when the name exists
//! - **patch**: submit a payload as-is, or diff a full object against the
//!   original; no-op patches never reach the control plane
//! - **create / update / get / delete**: thin wrappers that share the
//!   input resolution and namespace rules
//!
//! Every operation picks its namespace with
//! [`keel_core::effective_namespace`]: the object's own namespace wins over
//! the handler default, and cluster-scoped kinds have none.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use keel_core::identity::{strip_identity, strip_status};
use keel_core::{CoreError, Input, ResourceKind, codec, effective_namespace, resource_name};
use tracing::{debug, info};

use crate::config::{DEFAULT_NAMESPACE, HandlerConfig, HandlerOptions};
use crate::context::RequestContext;
use crate::control_plane::{ControlPlane, KubeControlPlane};
use crate::error::{KubeError, Result};
use crate::patch::{PatchOperation, PatchStrategy};

/// Operations on objects of kind `K` through control plane `C`
pub struct Handler<K, C = KubeControlPlane> {
    client: Arc<C>,
    namespace: String,
    context: RequestContext,
    options: HandlerOptions,
    _kind: PhantomData<fn() -> K>,
}

impl<K, C> Clone for Handler<K, C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            namespace: self.namespace.clone(),
            context: self.context.clone(),
            options: self.options.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K, C> fmt::Debug for Handler<K, C>
where
    K: ResourceKind,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("kind", &K::INFO.kind)
            .field("namespace", &self.namespace)
            .field("context", &self.context)
            .field("options", &self.options)
            .finish()
    }
}

impl<K, C> Handler<K, C>
where
    K: ResourceKind,
    C: ControlPlane,
{
    /// Create a handler with default context and options
    ///
    /// An empty namespace falls back to `"default"`.
    pub fn new(client: Arc<C>, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            client,
            namespace: if namespace.is_empty() {
                DEFAULT_NAMESPACE.to_string()
            } else {
                namespace
            },
            context: RequestContext::new(),
            options: HandlerOptions::default(),
            _kind: PhantomData,
        }
    }

    /// Create a handler from a loaded configuration
    pub fn from_config(client: Arc<C>, config: &HandlerConfig) -> Self {
        Self::new(client, config.namespace.clone())
            .with_context(config.context())
            .with_options(config.options())
    }

    /// Default namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn options(&self) -> &HandlerOptions {
        &self.options
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Derived handler scoped to another namespace, sharing the client
    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        let mut handler = self.clone();
        let namespace = namespace.into();
        if !namespace.is_empty() {
            handler.namespace = namespace;
        }
        handler
    }

    /// Derived handler observing another request context
    pub fn with_context(&self, context: RequestContext) -> Self {
        let mut handler = self.clone();
        handler.context = context;
        handler
    }

    /// Derived handler with other option bundles
    pub fn with_options(&self, options: HandlerOptions) -> Self {
        let mut handler = self.clone();
        handler.options = options;
        handler
    }

    /// Resolve any input shape into the typed resource
    ///
    /// File reads observe the request context.
    pub async fn resolve(&self, input: impl Into<Input<K>>) -> Result<K> {
        match input.into() {
            Input::Path(path) => {
                let bytes = self.read_file(&path).await?;
                Ok(Input::<K>::Bytes(bytes).resolve()?)
            }
            input => Ok(input.resolve()?),
        }
    }

    async fn read_file(&self, path: &std::path::Path) -> Result<Vec<u8>> {
        self.context
            .run(async {
                tokio::fs::read(path).await.map_err(|source| {
                    KubeError::from(CoreError::Io {
                        path: path.display().to_string(),
                        source,
                    })
                })
            })
            .await
    }

    /// Namespace an operation on `resource` targets
    fn namespace_for<'a>(&'a self, resource: &'a K) -> Option<&'a str> {
        effective_namespace(resource, &self.namespace)
    }

    /// Namespace for a bare name lookup
    fn default_scope(&self) -> Option<&str> {
        keel_core::scoped_namespace::<K>(None, &self.namespace)
    }

    /// Create the object; an existing name is reported as [`KubeError::AlreadyExists`]
    pub async fn create(&self, input: impl Into<Input<K>>) -> Result<K> {
        let mut resource = self.resolve(input).await?;
        strip_identity(&mut resource);
        self.submit_create(&resource).await
    }

    /// Replace the object unconditionally (last writer wins)
    pub async fn update(&self, input: impl Into<Input<K>>) -> Result<K> {
        let mut resource = self.resolve(input).await?;
        strip_identity(&mut resource);
        self.submit_update(&resource).await
    }

    /// Create the object, or update it in place if the name already exists
    ///
    /// Exactly one fallback is attempted. Update failures are returned as-is,
    /// and any create failure other than "already exists" ends the call.
    pub async fn apply(&self, input: impl Into<Input<K>>) -> Result<K> {
        let mut resource = self.resolve(input).await?;
        strip_identity(&mut resource);

        match self.submit_create(&resource).await {
            Err(e) if e.is_already_exists() => {
                info!(
                    kind = K::INFO.kind,
                    name = resource.meta().name.as_deref(),
                    namespace = self.namespace_for(&resource),
                    "resource already exists, updating"
                );
                self.submit_update(&resource).await
            }
            result => result,
        }
    }

    /// Fetch an object by name in the handler namespace
    pub async fn get(&self, name: &str) -> Result<K> {
        self.fetch(self.default_scope(), name).await
    }

    /// Like [`Handler::get`], with a missing object as `None`
    pub async fn get_opt(&self, name: &str) -> Result<Option<K>> {
        match self.get(name).await {
            Ok(resource) => Ok(Some(resource)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetch the current state of the object described by `input`
    pub async fn get_from(&self, input: impl Into<Input<K>>) -> Result<K> {
        let resource = self.resolve(input).await?;
        self.fetch(self.namespace_for(&resource), resource_name(&resource)?)
            .await
    }

    /// Delete an object by name in the handler namespace
    pub async fn delete(&self, name: &str) -> Result<()> {
        self.remove(self.default_scope(), name).await
    }

    /// Delete the object described by `input`
    pub async fn delete_from(&self, input: impl Into<Input<K>>) -> Result<()> {
        let resource = self.resolve(input).await?;
        self.remove(self.namespace_for(&resource), resource_name(&resource)?)
            .await
    }

    /// Patch `original` with `modification`
    ///
    /// Encoded payloads (file or bytes) are submitted as-is with `strategy`,
    /// strategic merge by default. Full objects are diffed against
    /// `original` in the requested format. The target name and namespace
    /// always come from `original`. When the patch changes nothing,
    /// `original` is returned without contacting the control plane.
    pub async fn patch(
        &self,
        original: &K,
        modification: impl Into<Input<K>>,
        strategy: Option<PatchStrategy>,
    ) -> Result<K> {
        let strategy = strategy.unwrap_or_default();
        let operation = self.plan_patch(original, modification.into(), strategy).await?;

        if operation.is_noop()? {
            debug!(
                kind = K::INFO.kind,
                name = original.meta().name.as_deref(),
                strategy = %operation.strategy,
                "patch is a no-op, skipping"
            );
            return Ok(original.clone());
        }

        self.submit_patch(original, &operation).await
    }

    /// Build the patch [`Handler::patch`] would submit
    pub async fn plan_patch(
        &self,
        original: &K,
        modification: Input<K>,
        strategy: PatchStrategy,
    ) -> Result<PatchOperation> {
        match modification {
            Input::Path(path) => {
                let bytes = self.read_file(&path).await?;
                PatchOperation::from_payload(&bytes, strategy)
            }
            Input::Bytes(bytes) => PatchOperation::from_payload(&bytes, strategy),
            object => {
                let mut modified = object.resolve()?;
                inherit_identity(original, &mut modified);
                PatchOperation::diff(original, &modified, strategy)
            }
        }
    }

    /// Submit a prepared patch against `original`'s name and namespace
    pub async fn submit_patch(&self, original: &K, operation: &PatchOperation) -> Result<K> {
        let name = resource_name(original)?;
        let namespace = self.namespace_for(original);
        debug!(
            kind = K::INFO.kind,
            name,
            namespace,
            strategy = %operation.strategy,
            derived = operation.derived,
            "patching"
        );

        let patched = self
            .context
            .run(self.client.patch(
                &K::INFO,
                namespace,
                name,
                operation.strategy,
                &operation.payload,
                &self.options.patch,
            ))
            .await?;
        Ok(codec::from_value(patched)?)
    }

    async fn submit_create(&self, resource: &K) -> Result<K> {
        let name = resource_name(resource)?;
        let namespace = self.namespace_for(resource);
        debug!(kind = K::INFO.kind, name, namespace, "creating");

        let mut object = codec::to_value(resource)?;
        strip_status(&mut object);

        let created = self
            .context
            .run(
                self.client
                    .create(&K::INFO, namespace, &object, &self.options.create),
            )
            .await?;
        Ok(codec::from_value(created)?)
    }

    async fn submit_update(&self, resource: &K) -> Result<K> {
        let name = resource_name(resource)?;
        let namespace = self.namespace_for(resource);
        debug!(kind = K::INFO.kind, name, namespace, "updating");

        let object = codec::to_value(resource)?;
        let updated = self
            .context
            .run(
                self.client
                    .update(&K::INFO, namespace, name, &object, &self.options.update),
            )
            .await?;
        Ok(codec::from_value(updated)?)
    }

    async fn fetch(&self, namespace: Option<&str>, name: &str) -> Result<K> {
        debug!(kind = K::INFO.kind, name, namespace, "getting");
        let object = self
            .context
            .run(
                self.client
                    .get(&K::INFO, namespace, name, &self.options.get),
            )
            .await?;
        Ok(codec::from_value(object)?)
    }

    async fn remove(&self, namespace: Option<&str>, name: &str) -> Result<()> {
        debug!(kind = K::INFO.kind, name, namespace, "deleting");
        self.context
            .run(
                self.client
                    .delete(&K::INFO, namespace, name, &self.options.delete),
            )
            .await
    }
}

/// Fill a modification's missing name and namespace from the patch target
fn inherit_identity<K: ResourceKind>(original: &K, modified: &mut K) {
    let source = original.meta();
    let meta = modified.meta_mut();
    if meta.name.as_deref().is_none_or(str::is_empty) {
        meta.name = source.name.clone();
    }
    if meta.namespace.as_deref().is_none_or(str::is_empty) {
        meta.namespace = source.namespace.clone();
    }
}
