//! Handler configuration
//!
//! Stored in `~/.config/keel/config.yaml`:
//!
//! ```yaml
//! namespace: team-a
//! timeout: 30s
//! fieldManager: keel
//! dryRun: false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use kube::api::{DeleteParams, GetParams, PatchParams, PostParams};
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::{KubeError, Result};

/// Namespace used when neither the object nor the configuration names one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Handler configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandlerConfig {
    /// Default namespace for namespaced kinds
    pub namespace: String,

    /// Limit on each control-plane call, e.g. `30s` or `2m`
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Field manager recorded on writes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_manager: Option<String>,

    /// Ask the control plane to validate writes without persisting them
    pub dry_run: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            timeout: None,
            field_manager: None,
            dry_run: false,
        }
    }
}

impl HandlerConfig {
    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| KubeError::InvalidConfig(format!("{}: {e}", path.display())))?;
        if config.namespace.is_empty() {
            return Err(KubeError::InvalidConfig(format!(
                "{}: namespace must not be empty",
                path.display()
            )));
        }
        Ok(config)
    }

    /// Default configuration path, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("keel").join("config.yaml"))
    }

    /// Option bundles for every operation
    pub fn options(&self) -> HandlerOptions {
        let mut options = HandlerOptions::default();

        options.create.dry_run = self.dry_run;
        options.create.field_manager = self.field_manager.clone();
        options.update.dry_run = self.dry_run;
        options.update.field_manager = self.field_manager.clone();
        options.patch.dry_run = self.dry_run;
        options.patch.field_manager = self.field_manager.clone();
        options.delete.dry_run = self.dry_run;

        options
    }

    /// Request context bounding each call by the configured timeout
    pub fn context(&self) -> RequestContext {
        match self.timeout {
            Some(timeout) => RequestContext::with_timeout(timeout),
            None => RequestContext::new(),
        }
    }
}

/// Per-operation parameter bundles passed through to the control plane
#[derive(Debug, Clone, Default)]
pub struct HandlerOptions {
    pub get: GetParams,
    pub create: PostParams,
    pub update: PostParams,
    pub patch: PatchParams,
    pub delete: DeleteParams,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = HandlerConfig::default();
        assert_eq!(config.namespace, "default");
        assert!(config.timeout.is_none());
        assert!(!config.dry_run);
        assert!(config.context().deadline().is_none());
        assert!(config.context().per_call_timeout().is_none());
    }

    #[test]
    fn test_load_from_yaml() {
        let file = write_config(
            "namespace: team-a\ntimeout: 1m 30s\nfieldManager: keel\ndryRun: true\n",
        );
        let config = HandlerConfig::load_from(file.path()).unwrap();
        assert_eq!(config.namespace, "team-a");
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.field_manager.as_deref(), Some("keel"));
        assert!(config.dry_run);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config("timeout: 5s\n");
        let config = HandlerConfig::load_from(file.path()).unwrap();
        assert_eq!(config.namespace, "default");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_invalid_files() {
        let file = write_config("timeout: soon\n");
        assert!(matches!(
            HandlerConfig::load_from(file.path()),
            Err(KubeError::InvalidConfig(_))
        ));

        let file = write_config("namespace: \"\"\n");
        assert!(matches!(
            HandlerConfig::load_from(file.path()),
            Err(KubeError::InvalidConfig(_))
        ));

        assert!(matches!(
            HandlerConfig::load_from(Path::new("/nonexistent/keel/config.yaml")),
            Err(KubeError::Io(_))
        ));
    }

    #[test]
    fn test_options_carry_field_manager_and_dry_run() {
        let config = HandlerConfig {
            field_manager: Some("keel".to_string()),
            dry_run: true,
            ..Default::default()
        };
        let options = config.options();
        assert!(options.create.dry_run);
        assert!(options.patch.dry_run);
        assert!(options.delete.dry_run);
        assert_eq!(options.update.field_manager.as_deref(), Some("keel"));
        assert_eq!(options.patch.field_manager.as_deref(), Some("keel"));
    }

    #[tokio::test]
    async fn test_context_has_per_call_timeout() {
        let config = HandlerConfig {
            timeout: Some(Duration::from_secs(10)),
            ..Default::default()
        };
        let ctx = config.context();
        assert_eq!(ctx.per_call_timeout(), Some(Duration::from_secs(10)));
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_default_path() {
        if let Some(path) = HandlerConfig::default_path() {
            assert!(path.ends_with("keel/config.yaml"));
        }
    }
}
