//! CLI commands

pub mod apply;
pub mod delete;
pub mod diff;
pub mod get;
pub mod kinds;
pub mod patch;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use console::style;
use keel_core::ResourceKind;
use keel_kube::{Handler, HandlerConfig, KubeControlPlane, PatchStrategy};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{CliError, Result};

/// Run `$body` with `$k` bound to the built-in kind named `$name`
macro_rules! with_kind {
    ($name:expr, |$k:ident| $body:expr) => {
        $crate::commands::with_kind!(@dispatch $name, $k, $body,
            k8s_openapi::api::core::v1::ConfigMap,
            k8s_openapi::api::core::v1::Secret,
            k8s_openapi::api::core::v1::Service,
            k8s_openapi::api::core::v1::ServiceAccount,
            k8s_openapi::api::core::v1::Namespace,
            k8s_openapi::api::core::v1::Pod,
            k8s_openapi::api::apps::v1::Deployment,
            k8s_openapi::api::apps::v1::ReplicaSet,
            k8s_openapi::api::apps::v1::StatefulSet,
            k8s_openapi::api::apps::v1::DaemonSet,
            k8s_openapi::api::batch::v1::Job,
            k8s_openapi::api::rbac::v1::Role,
            k8s_openapi::api::rbac::v1::RoleBinding,
            k8s_openapi::api::rbac::v1::ClusterRole,
            k8s_openapi::api::rbac::v1::ClusterRoleBinding,
            k8s_openapi::api::networking::v1::Ingress,
            k8s_openapi::api::networking::v1::IngressClass,
        )
    };
    (@dispatch $name:expr, $k:ident, $body:expr, $($ty:path),+ $(,)?) => {{
        let requested: &str = $name;
        match keel_core::find_builtin(requested) {
            $(
                Some(info) if info.kind == <$ty as keel_core::ResourceKind>::INFO.kind => {
                    type $k = $ty;
                    $body
                }
            )+
            _ => Err($crate::error::CliError::unknown_kind(requested)),
        }
    }};
}

pub(crate) use with_kind;

/// Connection settings shared by cluster commands
#[derive(Debug, Clone, Default)]
pub struct ClusterArgs {
    pub namespace: Option<String>,
    pub timeout: Option<u64>,
    pub config: Option<std::path::PathBuf>,
}

/// A connected cluster plus the resolved handler configuration
pub struct Session {
    client: Arc<KubeControlPlane>,
    config: HandlerConfig,
    token: CancellationToken,
}

impl Session {
    /// Load configuration, connect and hook Ctrl-C to cancellation
    pub async fn connect(args: &ClusterArgs) -> Result<Self> {
        let config = load_config(args)?;
        debug!(namespace = %config.namespace, timeout = ?config.timeout, "connecting");

        let client = KubeControlPlane::try_default().await?;

        let token = CancellationToken::new();
        let on_interrupt = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        Ok(Self {
            client: Arc::new(client),
            config,
            token,
        })
    }

    pub fn dry_run(&self) -> bool {
        self.config.dry_run
    }

    pub fn handler<K: ResourceKind>(&self) -> Handler<K> {
        let context = self.config.context().with_token(self.token.child_token());
        Handler::from_config(Arc::clone(&self.client), &self.config).with_context(context)
    }
}

/// Resolve the configuration file, then apply flag overrides
pub fn load_config(args: &ClusterArgs) -> Result<HandlerConfig> {
    let mut config = match &args.config {
        Some(path) => HandlerConfig::load_from(path)?,
        None => HandlerConfig::load()?,
    };
    if let Some(namespace) = args.namespace.as_ref().filter(|ns| !ns.is_empty()) {
        config.namespace = namespace.clone();
    }
    if let Some(seconds) = args.timeout {
        config.timeout = Some(Duration::from_secs(seconds));
    }
    Ok(config)
}

/// `--type` values for patch and diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PatchType {
    /// Strategic merge patch (keyed lists merge by key)
    #[default]
    Strategic,
    /// JSON merge patch (RFC 7396, lists are replaced)
    Merge,
    /// JSON patch (RFC 6902 operations)
    Json,
}

impl From<PatchType> for PatchStrategy {
    fn from(value: PatchType) -> Self {
        match value {
            PatchType::Strategic => PatchStrategy::StrategicMerge,
            PatchType::Merge => PatchStrategy::JsonMerge,
            PatchType::Json => PatchStrategy::JsonPatch,
        }
    }
}

/// Output format for printed objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Render an object in the requested format
pub fn render<K: ResourceKind>(resource: &K, format: OutputFormat) -> Result<String> {
    let value = keel_core::codec::to_value(resource)?;
    let text = match format {
        OutputFormat::Yaml => {
            serde_yaml::to_string(&value).map_err(|e| CliError::internal(e.to_string()))?
        }
        OutputFormat::Json => serde_json::to_string_pretty(&value)
            .map_err(|e| CliError::internal(e.to_string()))?,
    };
    Ok(text)
}

/// `Kind/name` display label, with the namespace when there is one
pub fn describe<K: ResourceKind>(resource: &K) -> String {
    let meta = resource.meta();
    let name = meta.name.as_deref().unwrap_or("<unnamed>");
    match meta.namespace.as_deref() {
        Some(ns) if !ns.is_empty() => format!("{}/{} in {}", K::INFO.kind, name, ns),
        _ => format!("{}/{}", K::INFO.kind, name),
    }
}

/// Print a one-line success message
pub fn report(verb: &str, label: &str) {
    println!(
        "{} {} {}",
        style("✓").green().bold(),
        style(label).cyan(),
        verb
    );
}

/// Read a file for an offline command
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| CliError::Io {
        message: format!("{}: {e}", path.display()),
    })
}
