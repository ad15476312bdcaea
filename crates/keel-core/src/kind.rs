//! Resource kind descriptors
//!
//! Every handler is bound to exactly one [`ResourceKind`]. The descriptor carries
//! everything the engine needs to know about a kind that is not already in its
//! schema type: where it lives in the API, whether it is namespaced, and which
//! list fields merge by key under strategic merge patch.
//!
//! Adding support for a kind is a single entry in the `resource_kinds!` table
//! at the bottom of this module.

use std::any::Any;
use std::fmt::Debug;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Pod, Secret, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::{Ingress, IngressClass};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use kube::api::DynamicObject;
use kube::core::{GroupVersionKind, TypeMeta};
use kube::discovery::ApiResource;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A list field that merges element-by-element under strategic merge patch
///
/// `path` is the dotted field path from the object root. List elements are
/// transparent, so the env list of every container in a pod is
/// `spec.containers.env`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergeKey {
    pub path: &'static str,
    pub key: &'static str,
}

impl MergeKey {
    pub const fn new(path: &'static str, key: &'static str) -> Self {
        Self { path, key }
    }
}

/// Merge keys shared by every kind (they live in ObjectMeta)
const COMMON_MERGE_KEYS: &[MergeKey] = &[MergeKey::new("metadata.ownerReferences", "uid")];

/// Static description of a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KindInfo {
    /// Kind name, e.g. `ConfigMap`
    pub kind: &'static str,
    /// `group/version`, or just `version` for the core group
    pub api_version: &'static str,
    /// URL path segment, e.g. `configmaps`
    pub plural: &'static str,
    /// Namespaced (true) or cluster-scoped (false)
    pub namespaced: bool,
    /// Kind-specific strategic merge keys
    pub merge_keys: &'static [MergeKey],
}

impl KindInfo {
    /// API group ("" for the core group)
    pub fn group(&self) -> &'static str {
        self.api_version
            .rsplit_once('/')
            .map(|(group, _)| group)
            .unwrap_or("")
    }

    /// API version without the group
    pub fn version(&self) -> &'static str {
        self.api_version
            .rsplit_once('/')
            .map(|(_, version)| version)
            .unwrap_or(self.api_version)
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::gvk(self.group(), self.version(), self.kind)
    }

    /// Discovery-free API resource for building dynamic API handles
    pub fn api_resource(&self) -> ApiResource {
        ApiResource::from_gvk_with_plural(&self.gvk(), self.plural)
    }

    pub fn type_meta(&self) -> TypeMeta {
        TypeMeta {
            api_version: self.api_version.to_string(),
            kind: self.kind.to_string(),
        }
    }

    /// Strategic merge key for the list field at `path`, if it merges by key
    pub fn merge_key(&self, path: &str) -> Option<&'static str> {
        self.merge_keys
            .iter()
            .chain(COMMON_MERGE_KEYS)
            .find(|mk| mk.path == path)
            .map(|mk| mk.key)
    }
}

/// A typed Kubernetes object the engine can manage
pub trait ResourceKind:
    kube::Resource<DynamicType = ()>
    + Clone
    + Debug
    + PartialEq
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const INFO: KindInfo;
}

/// Object-safe view of any Kubernetes object, used for polymorphic input
///
/// Implemented for every built-in [`ResourceKind`] and for [`DynamicObject`].
pub trait AnyObject: Send + Sync {
    /// The apiVersion/kind the object declares
    fn type_meta(&self) -> TypeMeta;

    /// Whether this is a schema-less object that needs document conversion
    fn is_dynamic(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

impl AnyObject for DynamicObject {
    fn type_meta(&self) -> TypeMeta {
        self.types.clone().unwrap_or(TypeMeta {
            api_version: String::new(),
            kind: String::new(),
        })
    }

    fn is_dynamic(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }
}

/// Maps an upstream resource scope type to a namespaced flag
trait ScopeFlag {
    const NAMESPACED: bool;
}

impl ScopeFlag for k8s_openapi::NamespaceResourceScope {
    const NAMESPACED: bool = true;
}

impl ScopeFlag for k8s_openapi::ClusterResourceScope {
    const NAMESPACED: bool = false;
}

macro_rules! resource_kinds {
    ($($ty:ty => $keys:expr),* $(,)?) => {
        $(
            impl ResourceKind for $ty {
                const INFO: KindInfo = KindInfo {
                    kind: <$ty as k8s_openapi::Resource>::KIND,
                    api_version: <$ty as k8s_openapi::Resource>::API_VERSION,
                    plural: <$ty as k8s_openapi::Resource>::URL_PATH_SEGMENT,
                    namespaced: <<$ty as k8s_openapi::Resource>::Scope as ScopeFlag>::NAMESPACED,
                    merge_keys: $keys,
                };
            }

            impl AnyObject for $ty {
                fn type_meta(&self) -> TypeMeta {
                    <$ty as ResourceKind>::INFO.type_meta()
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
                    self
                }
            }
        )*

        /// Descriptors of every built-in kind
        pub const BUILTIN_KINDS: &[KindInfo] = &[$(<$ty as ResourceKind>::INFO),*];
    };
}

/// Merge keys of a pod spec found at `$prefix`, plus extra entries
macro_rules! pod_spec_keys {
    ($prefix:literal $(, $path:literal => $key:literal)* $(,)?) => {
        &[
            MergeKey::new(concat!($prefix, "containers"), "name"),
            MergeKey::new(concat!($prefix, "containers.env"), "name"),
            MergeKey::new(concat!($prefix, "containers.ports"), "containerPort"),
            MergeKey::new(concat!($prefix, "containers.volumeMounts"), "mountPath"),
            MergeKey::new(concat!($prefix, "containers.volumeDevices"), "devicePath"),
            MergeKey::new(concat!($prefix, "initContainers"), "name"),
            MergeKey::new(concat!($prefix, "initContainers.env"), "name"),
            MergeKey::new(concat!($prefix, "initContainers.ports"), "containerPort"),
            MergeKey::new(concat!($prefix, "initContainers.volumeMounts"), "mountPath"),
            MergeKey::new(concat!($prefix, "ephemeralContainers"), "name"),
            MergeKey::new(concat!($prefix, "volumes"), "name"),
            MergeKey::new(concat!($prefix, "imagePullSecrets"), "name"),
            MergeKey::new(concat!($prefix, "hostAliases"), "ip"),
            $(MergeKey::new($path, $key),)*
        ]
    };
}

resource_kinds! {
    ConfigMap => &[],
    Secret => &[],
    Service => &[MergeKey::new("spec.ports", "port")],
    ServiceAccount => &[
        MergeKey::new("secrets", "name"),
        MergeKey::new("imagePullSecrets", "name"),
    ],
    Namespace => &[MergeKey::new("status.conditions", "type")],
    Pod => pod_spec_keys!("spec.", "status.conditions" => "type"),
    Deployment => pod_spec_keys!("spec.template.spec.", "status.conditions" => "type"),
    ReplicaSet => pod_spec_keys!("spec.template.spec.", "status.conditions" => "type"),
    StatefulSet => pod_spec_keys!("spec.template.spec.", "status.conditions" => "type"),
    DaemonSet => pod_spec_keys!("spec.template.spec.", "status.conditions" => "type"),
    Job => pod_spec_keys!("spec.template.spec.", "status.conditions" => "type"),
    Role => &[],
    RoleBinding => &[],
    ClusterRole => &[],
    ClusterRoleBinding => &[],
    Ingress => &[],
    IngressClass => &[],
}

/// Look up a built-in kind by name, ignoring ASCII case
pub fn find_builtin(kind: &str) -> Option<&'static KindInfo> {
    BUILTIN_KINDS
        .iter()
        .find(|info| info.kind.eq_ignore_ascii_case(kind))
}
