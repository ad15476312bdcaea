//! Integration tests for the offline CLI commands

use std::path::{Path, PathBuf};
use std::process::Command;

/// Helper to run the keel binary
fn keel(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_keel"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute keel")
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

const SERVICE: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: web
  namespace: team-a
spec:
  ports:
    - name: http
      port: 80
    - name: https
      port: 443
"#;

const SERVICE_CHANGED: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: web
  namespace: team-a
spec:
  ports:
    - name: http
      port: 80
      targetPort: 8080
    - name: https
      port: 443
"#;

mod kinds_command {
    use super::*;

    #[test]
    fn test_kinds_lists_builtin_kinds() {
        let output = keel(&["kinds"]);
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("ConfigMap"));
        assert!(stdout.contains("ClusterRoleBinding"));
        assert!(stdout.contains("rbac.authorization.k8s.io/v1"));
        assert!(stdout.contains("Cluster"));
    }
}

mod diff_command {
    use super::*;

    #[test]
    fn test_diff_strategic_merges_ports_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let original = write(dir.path(), "original.yaml", SERVICE);
        let modified = write(dir.path(), "modified.yaml", SERVICE_CHANGED);

        let output = keel(&[
            "diff",
            "--kind",
            "Service",
            original.to_str().unwrap(),
            modified.to_str().unwrap(),
        ]);
        assert!(output.status.success());

        let patch: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
        assert_eq!(
            patch,
            serde_json::json!({
                "spec": {"ports": [{"port": 80, "targetPort": 8080}]}
            })
        );
    }

    #[test]
    fn test_diff_merge_replaces_lists() {
        let dir = tempfile::tempdir().unwrap();
        let original = write(dir.path(), "original.yaml", SERVICE);
        let modified = write(dir.path(), "modified.yaml", SERVICE_CHANGED);

        let output = keel(&[
            "diff",
            "--kind",
            "service",
            original.to_str().unwrap(),
            modified.to_str().unwrap(),
            "--type",
            "merge",
        ]);
        assert!(output.status.success());

        let patch: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let ports = patch["spec"]["ports"].as_array().unwrap();
        assert_eq!(ports.len(), 2);
    }

    #[test]
    fn test_diff_json_patch_operations() {
        let dir = tempfile::tempdir().unwrap();
        let original = write(dir.path(), "original.yaml", SERVICE);
        let modified = write(dir.path(), "modified.yaml", SERVICE_CHANGED);

        let output = keel(&[
            "diff",
            "--kind",
            "Service",
            original.to_str().unwrap(),
            modified.to_str().unwrap(),
            "--type",
            "json",
        ]);
        assert!(output.status.success());

        let patch: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let ops = patch.as_array().unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0]["op"], "add");
        assert!(ops[0]["path"].as_str().unwrap().ends_with("/targetPort"));
        assert_eq!(ops[0]["value"], 8080);
    }

    #[test]
    fn test_diff_identical_reports_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let original = write(dir.path(), "original.yaml", SERVICE);
        let modified = write(dir.path(), "modified.json", &{
            let value: serde_json::Value = serde_yaml::from_str(SERVICE).unwrap();
            value.to_string()
        });

        for patch_type in ["strategic", "merge", "json"] {
            let output = keel(&[
                "diff",
                "--kind",
                "Service",
                original.to_str().unwrap(),
                modified.to_str().unwrap(),
                "--type",
                patch_type,
            ]);
            assert!(output.status.success());
            let stdout = String::from_utf8_lossy(&output.stdout);
            assert!(stdout.contains("No changes"), "{patch_type}: {stdout}");
        }
    }

    #[test]
    fn test_diff_unknown_kind() {
        let dir = tempfile::tempdir().unwrap();
        let original = write(dir.path(), "original.yaml", SERVICE);

        let output = keel(&[
            "diff",
            "--kind",
            "Widget",
            original.to_str().unwrap(),
            original.to_str().unwrap(),
        ]);
        assert_eq!(output.status.code(), Some(64));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Unknown kind 'Widget'"));
    }

    #[test]
    fn test_diff_kind_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let original = write(dir.path(), "original.yaml", SERVICE);

        let output = keel(&[
            "diff",
            "--kind",
            "ConfigMap",
            original.to_str().unwrap(),
            original.to_str().unwrap(),
        ]);
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_diff_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let original = write(dir.path(), "original.yaml", SERVICE);
        let missing = dir.path().join("missing.yaml");

        let output = keel(&[
            "diff",
            "--kind",
            "Service",
            original.to_str().unwrap(),
            missing.to_str().unwrap(),
        ]);
        assert_eq!(output.status.code(), Some(5));
    }
}

mod usage {
    use super::*;

    #[test]
    fn test_help_lists_commands() {
        let output = keel(&["--help"]);
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        for command in ["apply", "create", "update", "get", "delete", "patch", "diff", "kinds"] {
            assert!(stdout.contains(command), "missing {command}");
        }
    }

    #[test]
    fn test_invalid_patch_type_is_rejected() {
        let output = keel(&["diff", "--kind", "Service", "a.yaml", "b.yaml", "--type", "xml"]);
        assert!(!output.status.success());
        assert_eq!(output.status.code(), Some(2));
    }
}
