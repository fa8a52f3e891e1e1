use std::io::Write;
use std::path::Path;
use std::collections::HashMap;
use stratum_kernel::config::{load_config, load_config_with_env, load_stratum_config};
use stratum_kernel::domain::config::StratumConfig;
use stratum_kernel::domain::config::{OpenFlagsPolicy, SyncFailurePolicy};
use stratum_kernel::domain::LayerKind;

fn write_toml(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("stratum.toml");
    let mut file = std::fs::File::create(&path).expect("create config file");
    file.write_all(body.as_bytes()).expect("write config file");
    path
}

#[test]
fn loads_file_and_keeps_defaults_for_missing_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_toml(
        &dir,
        r#"
[connector]
open_flags = "force_truncate"

[[layers]]
name = "nvme0"
kind = "nvme"
capacity_bytes = 1048576
mount_point = "/mnt/nvme0"
"#,
    );

    let cfg = load_stratum_config(Some(&path)).expect("load config");
    assert_eq!(cfg.connector.open_flags, OpenFlagsPolicy::ForceTruncate);
    assert_eq!(cfg.connector.sync_failure, SyncFailurePolicy::Warn);
    assert!(cfg.connector.sync_on_close);
    assert_eq!(cfg.layers.len(), 1);
    assert_eq!(cfg.layers[0].kind, LayerKind::Nvme);
    assert_eq!(cfg.logging.level, "info");
}

#[test]
fn explicit_missing_file_is_an_error() {
    let err = load_stratum_config(Some(Path::new("/definitely/not/here/stratum.toml")))
        .expect_err("missing explicit file must fail");
    assert!(err.to_string().contains("Failed to build config"));
}

#[test]
fn malformed_values_report_deserialize_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_toml(&dir, "[connector]\nsync_failure = \"explode\"\n");

    let err = load_stratum_config(Some(&path)).expect_err("unknown policy must fail");
    assert!(err.to_string().contains("Failed to deserialize config"));
}

#[test]
fn generic_loader_accepts_any_deserializable_target() {
    #[derive(Debug, serde::Deserialize)]
    struct Answer {
        answer: u32,
    }

    let dir = tempfile::tempdir().unwrap();
    let path = write_toml(&dir, "answer = 42\n");
    let parsed: Answer = load_config(Some(&path)).unwrap();
    assert_eq!(parsed.answer, 42);
}

#[test]
fn environment_overrides_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_toml(&dir, "[connector]\nsync_on_close = true\n[logging]\nlevel = \"warn\"\n");
    let env = HashMap::from([
        ("STRATUM__CONNECTOR__SYNC_ON_CLOSE".to_owned(), "false".to_owned()),
        ("STRATUM__CONNECTOR__SYNC_FAILURE".to_owned(), "surface".to_owned()),
        ("UNRELATED__LOGGING__LEVEL".to_owned(), "trace".to_owned()),
    ]);

    let cfg: StratumConfig = load_config_with_env(Some(&path), Some(env)).unwrap();
    assert!(!cfg.connector.sync_on_close);
    assert_eq!(cfg.connector.sync_failure, SyncFailurePolicy::Surface);
    assert_eq!(cfg.logging.level, "warn");
}
