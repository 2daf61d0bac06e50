use corral_database::*;
use fxhash::FxHashMap;
use std::fs;

fn memory_config(name: &str, database: &str) -> ConnectionConfig {
    let _ = name;
    ConnectionConfig {
        uris: vec!["mem://".to_owned()],
        options: ConnectionOptions {
            namespace: "corral_test".to_owned(),
            database: database.to_owned(),
            username: None,
            password: None,
        },
    }
}

#[tokio::test]
async fn connects_every_configured_name() {
    let mut config: ConnectionMap = FxHashMap::default();
    config.insert("main".to_owned(), memory_config("main", "main"));
    config.insert("analytics".to_owned(), memory_config("analytics", "analytics"));

    let mut registry = ConnectionRegistry::new();
    registry.connect(&config, LoggerConfig::Off).await.expect("connect");

    assert_eq!(registry.len(), 2);
    let main = registry.get("main").expect("main connection");
    main.health().await.expect("health check");
    assert_eq!(main.name(), "main");
    assert_eq!(main.database(), "main");
    assert!(registry.get("analytics").is_some());
    assert!(registry.get("unknown").is_none());

    registry.disconnect();
    assert!(registry.is_empty());
    assert!(registry.get("main").is_none());
}

#[tokio::test]
async fn failed_entry_leaves_earlier_connections_registered() {
    let mut config: ConnectionMap = FxHashMap::default();
    config.insert("a_good".to_owned(), memory_config("a_good", "good"));
    config.insert(
        "b_bad".to_owned(),
        ConnectionConfig {
            uris: vec!["nosuchscheme://nowhere".to_owned()],
            options: ConnectionOptions {
                namespace: "corral_test".to_owned(),
                database: "bad".to_owned(),
                username: None,
                password: None,
            },
        },
    );

    let mut registry = ConnectionRegistry::new();
    let err = registry.connect(&config, LoggerConfig::Off).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Connection { .. }), "err: {err}");

    // Entries are opened in name order, so the good one is already live.
    assert!(registry.get("a_good").is_some());
    assert!(registry.get("b_bad").is_none());

    registry.disconnect();
    assert!(registry.is_empty());
}

#[tokio::test]
async fn empty_uri_list_fails_validation() {
    let config = ConnectionConfig {
        uris: Vec::new(),
        options: ConnectionOptions {
            namespace: "corral_test".to_owned(),
            database: "none".to_owned(),
            username: None,
            password: None,
        },
    };
    let err = Connection::open("empty", &config).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
}

#[tokio::test]
async fn uri_fallback_skips_dead_endpoints() {
    let config = ConnectionConfig {
        uris: vec!["nosuchscheme://nowhere".to_owned(), "mem://".to_owned()],
        options: ConnectionOptions {
            namespace: "corral_test".to_owned(),
            database: "fallback".to_owned(),
            username: None,
            password: None,
        },
    };
    let connection = Connection::open("fallback", &config).await.expect("second URI wins");
    connection.health().await.expect("health check");
}

#[tokio::test]
async fn config_file_round_trips_through_registry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("database.toml");
    fs::write(
        &path,
        r#"
        [main]
        uris = ["mem://"]
        [main.options]
        namespace = "corral_test"
        database = "file_backed"
        "#,
    )
    .expect("write config");

    let config = load_connection_config(Some(&path)).expect("load config");
    let mut registry = ConnectionRegistry::new();
    registry.connect(&config, LoggerConfig::Off).await.expect("connect");
    assert!(registry.get("main").is_some());
}
