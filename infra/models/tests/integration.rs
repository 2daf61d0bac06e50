use corral_database::{
    ConnectionConfig, ConnectionMap, ConnectionOptions, ConnectionRegistry, LoggerConfig,
};
use corral_models::{Extensions, ModelError, ModelRegistry};
use fxhash::FxHashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const BIRD: &str = r#"
connection = "main"

[attributes]
name = "string"
color = "string"
"#;

const PARROT: &str = r#"
connection = "main"
extends = "bird"

[attributes]
wingspan = "int"
"#;

async fn registry() -> ConnectionRegistry {
    let mut config: ConnectionMap = FxHashMap::default();
    config.insert(
        "main".to_owned(),
        ConnectionConfig {
            uris: vec!["mem://".to_owned()],
            options: ConnectionOptions {
                namespace: "corral_models".to_owned(),
                database: "test".to_owned(),
                username: None,
                password: None,
            },
        },
    );
    let mut registry = ConnectionRegistry::new();
    registry.connect(&config, LoggerConfig::Off).await.expect("connect");
    registry
}

fn write_models(dir: &Path, files: &[(&str, &str)]) {
    for (name, body) in files {
        fs::write(dir.join(name), body).expect("write model file");
    }
}

#[tokio::test]
async fn loads_base_models_and_discriminators_in_two_passes() {
    let dir = TempDir::new().expect("tempdir");
    write_models(dir.path(), &[("bird.toml", BIRD), ("parrot.toml", PARROT)]);
    let connections = registry().await;

    let mut models = ModelRegistry::new();
    models.load(&connections, dir.path(), &Extensions::with_builtins()).await.expect("load");

    assert_eq!(models.len(), 2);
    let bird = models.get("bird").expect("bird model");
    assert!(!bird.is_discriminator());
    assert_eq!(bird.table(), "bird");

    let parrot = models.get("parrot").expect("parrot model");
    let discriminator = parrot.discriminator().expect("discriminator relationship");
    assert_eq!(discriminator.parent, "bird");
    assert_eq!(discriminator.key, "kind");
    assert_eq!(discriminator.value, "parrot");
    // Shared table and connection with the parent.
    assert_eq!(parrot.table(), "bird");
    assert_eq!(parrot.connection().name(), bird.connection().name());
    // Merged attributes: parent's and its own.
    assert_eq!(parrot.schema().attributes()["name"], "string");
    assert_eq!(parrot.schema().attributes()["wingspan"], "int");

    assert!(models.get("unknown").is_none());
}

#[tokio::test]
async fn subdirectories_are_ignored() {
    let dir = TempDir::new().expect("tempdir");
    write_models(dir.path(), &[("bird.toml", BIRD)]);
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).expect("mkdir");
    write_models(&nested, &[("ignored.toml", BIRD)]);
    let connections = registry().await;

    let mut models = ModelRegistry::new();
    models.load(&connections, dir.path(), &Extensions::with_builtins()).await.expect("load");

    assert_eq!(models.len(), 1);
    assert!(models.get("ignored").is_none());
}

#[tokio::test]
async fn reload_replaces_prior_models() {
    let dir = TempDir::new().expect("tempdir");
    write_models(dir.path(), &[("bird.toml", BIRD)]);
    let connections = registry().await;

    let mut models = ModelRegistry::new();
    let extensions = Extensions::with_builtins();
    models.load(&connections, dir.path(), &extensions).await.expect("first load");

    write_models(dir.path(), &[("fish.toml", BIRD)]);
    models.load(&connections, dir.path(), &extensions).await.expect("second load");

    assert_eq!(models.len(), 2);
    assert!(models.get("bird").is_some());
    assert!(models.get("fish").is_some());

    models.unload();
    assert!(models.is_empty());
    assert!(!connections.is_empty(), "unload must not touch connections");
}

#[tokio::test]
async fn missing_parent_definition_fails_the_discriminator_pass() {
    let dir = TempDir::new().expect("tempdir");
    write_models(dir.path(), &[("parrot.toml", PARROT)]);
    let connections = registry().await;

    let mut models = ModelRegistry::new();
    let err = models
        .load(&connections, dir.path(), &Extensions::with_builtins())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::SchemaBuild { .. }), "err: {err}");
}

#[tokio::test]
async fn unregistered_connection_fails_model_registration() {
    let dir = TempDir::new().expect("tempdir");
    write_models(
        dir.path(),
        &[(
            "orphan.toml",
            r#"
            connection = "nope"

            [attributes]
            name = "string"
            "#,
        )],
    );
    let connections = registry().await;

    let mut models = ModelRegistry::new();
    let err = models
        .load(&connections, dir.path(), &Extensions::with_builtins())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Connection { .. }), "err: {err}");
}

#[tokio::test]
async fn unreadable_model_directory_is_an_io_error() {
    let connections = registry().await;
    let mut models = ModelRegistry::new();
    let err = models
        .load(&connections, "does/not/exist", &Extensions::with_builtins())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Io { .. }), "err: {err}");
}
