//! Diff command
//!
//! Computes the patch that turns one manifest into another without
//! contacting a cluster.

use std::path::Path;

use console::style;
use keel_core::{Input, ResourceKind};
use keel_kube::PatchOperation;

use super::{PatchType, read_file, with_kind};
use crate::error::{CliError, Result};

pub fn run(kind: &str, original: &Path, modified: &Path, patch_type: PatchType) -> Result<()> {
    let text = patch_text(kind, original, modified, patch_type)?;
    match text {
        Some(text) => println!("{text}"),
        None => println!("{} No changes", style("✓").green().bold()),
    }
    Ok(())
}

/// Pretty-printed patch, or `None` when the manifests are equivalent
pub fn patch_text(
    kind: &str,
    original: &Path,
    modified: &Path,
    patch_type: PatchType,
) -> Result<Option<String>> {
    let original_bytes = read_file(original)?;
    let modified_bytes = read_file(modified)?;

    with_kind!(kind, |K| {
        let before: K = Input::<K>::from(original_bytes).resolve()?;
        let after: K = Input::<K>::from(modified_bytes).resolve()?;

        let operation = PatchOperation::diff(&before, &after, patch_type.into())?;
        if operation.is_noop()? {
            return Ok(None);
        }
        let value = operation.to_value()?;
        serde_json::to_string_pretty(&value)
            .map(Some)
            .map_err(|e| CliError::internal(e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    const BEFORE: &str = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: web\ndata:\n  a: \"1\"\n";
    const AFTER: &str = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: web\ndata:\n  a: \"2\"\n";

    #[test]
    fn test_patch_text_strategic() {
        let dir = tempfile::tempdir().unwrap();
        let before = write(dir.path(), "before.yaml", BEFORE);
        let after = write(dir.path(), "after.yaml", AFTER);

        let text = patch_text("ConfigMap", &before, &after, PatchType::Strategic)
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, serde_json::json!({"data": {"a": "2"}}));
    }

    #[test]
    fn test_patch_text_json_patch() {
        let dir = tempfile::tempdir().unwrap();
        let before = write(dir.path(), "before.yaml", BEFORE);
        let after = write(dir.path(), "after.yaml", AFTER);

        let text = patch_text("configmap", &before, &after, PatchType::Json)
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"op": "replace", "path": "/data/a", "value": "2"}])
        );
    }

    #[test]
    fn test_patch_text_identical() {
        let dir = tempfile::tempdir().unwrap();
        let before = write(dir.path(), "before.yaml", BEFORE);
        let after = write(dir.path(), "after.yaml", BEFORE);

        assert!(
            patch_text("ConfigMap", &before, &after, PatchType::Merge)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_patch_text_wrong_kind() {
        let dir = tempfile::tempdir().unwrap();
        let before = write(dir.path(), "before.yaml", BEFORE);
        let after = write(dir.path(), "after.yaml", AFTER);

        let err = patch_text("Service", &before, &after, PatchType::Strategic).unwrap_err();
        assert_eq!(err.exit_code(), crate::exit_codes::INPUT_ERROR);
    }
}
