//! Integration tests for building configurations from documents on disk.

use std::path::Path;
use std::sync::Arc;

use config_tree_core::config::{EngineSettings, SchemaProvider, StaticSchemaProvider};
use config_tree_core::{group_digest, Configuration, Error};
use serde_json::{json, Value};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(&path, content).expect("write fixture");
    path
}

fn permissive() -> Arc<dyn SchemaProvider> {
    Arc::new(StaticSchemaProvider::permissive())
}

fn strict_schema() -> Arc<dyn SchemaProvider> {
    Arc::new(
        StaticSchemaProvider::new(&json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": {"type": "string"},
                "backtest": {
                    "type": "object",
                    "required": ["start"],
                    "properties": {"start": {"type": "string"}}
                }
            }
        }))
        .expect("schema"),
    )
}

#[test]
fn builds_from_file_with_nested_references() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        "configs/base.json",
        r#"{
            "name": "run",
            "storage": "__PATH__:shared/storage.json",
            "model_path": "weights.bin"
        }"#,
    );
    write(
        dir.path(),
        "configs/shared/storage.json",
        r#"{"bucket": "artifacts", "credentials_path": "creds.json"}"#,
    );

    let config = Configuration::builder(dir.path().join("configs/base.json"))
        .schema(permissive())
        .build()
        .expect("build");

    let configs_dir = std::fs::canonicalize(dir.path().join("configs")).expect("canonical");
    assert_eq!(config.get("name").expect("name"), &json!("run"));
    assert_eq!(
        config.get("model_path").expect("model_path"),
        &json!(configs_dir.join("weights.bin").to_string_lossy())
    );
    assert_eq!(
        config.get("storage").expect("storage"),
        &json!({
            "bucket": "artifacts",
            "credentials_path": configs_dir.join("shared").join("creds.json").to_string_lossy()
        })
    );
    assert!(!config.serialize().contains("__PATH__:"));
}

#[test]
fn in_memory_suffix_keys_resolve_against_working_directory() {
    let config = Configuration::builder(json!({"model_path": "model.bin"}))
        .schema(permissive())
        .build()
        .expect("build");

    let expected = std::env::current_dir().expect("cwd").join("model.bin");
    assert_eq!(
        config.get("model_path").expect("model_path"),
        &json!(expected.to_string_lossy())
    );
}

#[test]
fn path_and_marker_overrides_are_loaded() {
    let dir = TempDir::new().expect("tempdir");
    let data = write(dir.path(), "data.json", r#"{"symbols": ["A", "B"]}"#);
    let minio = write(dir.path(), "minio.json", r#"{"endpoint": "localhost:9000"}"#);

    let config = Configuration::builder(json!({"a": 1}))
        .with_override("path__to__list_1__other", data)
        .with_override(
            "configs__minio_config",
            format!("__PATH__:{}", minio.display()),
        )
        .schema(permissive())
        .build()
        .expect("build");

    assert_eq!(
        config.to_plain_tree(),
        json!({
            "a": 1,
            "path": {"to": [null, {"other": {"symbols": ["A", "B"]}}]},
            "configs": {"minio_config": {"endpoint": "localhost:9000"}}
        })
    );
}

#[test]
fn nested_markers_inside_override_values_are_resolved() {
    let dir = TempDir::new().expect("tempdir");
    let sub = write(dir.path(), "sub.json", r#"{"y": 1}"#);

    let config = Configuration::builder(json!({}))
        .with_override("x", json!({"inner": format!("__PATH__:{}", sub.display())}))
        .schema(permissive())
        .build()
        .expect("build");
    assert_eq!(config.to_plain_tree(), json!({"x": {"inner": {"y": 1}}}));
}

#[test]
fn missing_base_file_is_invalid_source() {
    let dir = TempDir::new().expect("tempdir");
    let error = Configuration::builder(dir.path().join("absent.json"))
        .schema(permissive())
        .build()
        .expect_err("missing base must fail");
    assert!(matches!(error, Error::InvalidSource(_)));
}

#[test]
fn missing_reference_aborts_construction() {
    let dir = TempDir::new().expect("tempdir");
    let base = write(dir.path(), "base.json", r#"{"x": "__PATH__:gone.json"}"#);

    let error = Configuration::builder(base)
        .schema(permissive())
        .build()
        .expect_err("missing reference must fail");
    assert!(matches!(error, Error::ReferenceNotFound { .. }));
}

#[test]
fn self_referencing_document_is_a_cycle() {
    let dir = TempDir::new().expect("tempdir");
    let base = write(dir.path(), "loop.json", r#"{"again": "__PATH__:loop.json"}"#);

    let error = Configuration::builder(base)
        .schema(permissive())
        .build()
        .expect_err("cycle must fail");
    assert!(matches!(error, Error::ReferenceCycle { .. }));
}

#[test]
fn schema_violation_names_location() {
    let error = Configuration::builder(json!({"name": "run", "backtest": {}}))
        .schema(strict_schema())
        .build()
        .expect_err("validation should fail");

    match error {
        Error::SchemaValidation { location, message } => {
            assert_eq!(location, "/backtest");
            assert!(message.contains("start"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn override_can_repair_or_break_validity() {
    let fixed = Configuration::builder(json!({"backtest": {"start": "2024-01-01"}}))
        .with_override("name", "run")
        .schema(strict_schema())
        .build();
    assert!(fixed.is_ok());

    let broken = Configuration::builder(json!({"name": "run"}))
        .with_override("name", 5_i64)
        .schema(strict_schema())
        .build();
    assert!(matches!(broken, Err(Error::SchemaValidation { .. })));
}

#[test]
fn merge_with_is_validated() {
    let base = Configuration::builder(json!({"name": "run"}))
        .schema(strict_schema())
        .build()
        .expect("base");
    let overlay = Configuration::builder(json!({"name": 3}))
        .schema(permissive())
        .build()
        .expect("overlay");

    let error = base.merge_with(&overlay).expect_err("merged tree is invalid");
    assert!(matches!(error, Error::SchemaValidation { .. }));
}

#[test]
fn write_to_round_trips_through_from_file() {
    let dir = TempDir::new().expect("tempdir");
    let config = Configuration::builder(json!({"b": [1, {"c": null}], "a": "x"}))
        .schema(permissive())
        .build()
        .expect("build");

    let out = dir.path().join("out/config.json");
    config.write_to(&out).expect("write");
    let text = std::fs::read_to_string(&out).expect("read back");
    assert_eq!(text, config.serialize());

    let reloaded = Configuration::builder(out)
        .schema(permissive())
        .build()
        .expect("reload");
    assert_eq!(reloaded, config);
}

#[test]
fn write_to_leaves_neighbouring_files_alone() {
    let dir = TempDir::new().expect("tempdir");
    let config = Configuration::builder(json!({"a": 1}))
        .schema(permissive())
        .build()
        .expect("build");

    let neighbour = write(dir.path(), "config.tmp", "keep me");
    config.write_to(&dir.path().join("config.json")).expect("write json");
    config.write_to(&dir.path().join("config.yaml")).expect("write yaml");

    assert_eq!(std::fs::read_to_string(&neighbour).expect("read"), "keep me");
    let mut names = std::fs::read_dir(dir.path())
        .expect("list")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();
    assert_eq!(names, vec!["config.json", "config.tmp", "config.yaml"]);
}

#[test]
fn engine_settings_supply_schema_locations() {
    let dir = TempDir::new().expect("tempdir");
    let schema = write(
        dir.path(),
        "schema.json",
        r#"{"type": "object", "required": ["name"]}"#,
    );
    let settings_path = write(
        dir.path(),
        "engine.toml",
        &format!("[schema]\ncandidates = [{:?}]\n", schema.display().to_string()),
    );
    let settings = EngineSettings::load_from_file(&settings_path).expect("settings");

    let config = Configuration::builder(json!({"name": "run"}))
        .settings(&settings)
        .build()
        .expect("build");
    assert_eq!(config.get("name").expect("name"), &json!("run"));

    let error = Configuration::builder(json!({"other": 1}))
        .settings(&settings)
        .build()
        .expect_err("schema from settings must apply");
    assert!(matches!(error, Error::SchemaValidation { .. }));

    let explicit = Configuration::builder(json!({"other": 1}))
        .schema(permissive())
        .settings(&settings)
        .build();
    assert!(explicit.is_ok());
}

#[test]
fn yaml_documents_can_be_referenced() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "model.yaml", "layers:\n  - 64\n  - 32\n");
    let base = write(dir.path(), "base.json", r#"{"model": "__PATH__:model.yaml"}"#);

    let config = Configuration::builder(base)
        .schema(permissive())
        .build()
        .expect("build");
    assert_eq!(config.get("model").expect("model"), &json!({"layers": [64, 32]}));
}

#[test]
fn group_digest_depends_on_members() {
    let first = Configuration::builder(json!({"a": 1}))
        .schema(permissive())
        .build()
        .expect("first");
    let second = Configuration::builder(json!({"a": 2}))
        .schema(permissive())
        .build()
        .expect("second");

    let digest = group_digest([&first, &second]);
    assert_eq!(digest, group_digest(vec![&first, &second]));
    assert_ne!(digest, group_digest([&first]));
    assert_eq!(digest.len(), 64);
}

#[test]
fn configurations_build_concurrently() {
    let schema = strict_schema();
    let handles = (0..4_i64)
        .map(|index| {
            let schema = Arc::clone(&schema);
            std::thread::spawn(move || {
                Configuration::builder(json!({"name": "run"}))
                    .with_override("seed", index)
                    .schema(schema)
                    .build()
                    .map(|config| config.get("seed").cloned())
            })
        })
        .collect::<Vec<_>>();

    let seeds = handles
        .into_iter()
        .map(|handle| {
            handle
                .join()
                .expect("thread")
                .expect("build")
                .expect("seed")
        })
        .collect::<Vec<Value>>();
    assert_eq!(seeds, vec![json!(0), json!(1), json!(2), json!(3)]);
}
