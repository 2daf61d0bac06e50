use crate::error::{DatabaseError, DatabaseErrorExt};
use config::{Config, Environment, File};
use fxhash::FxHashMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Options applied while opening a single connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionOptions {
    pub namespace: String,
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Declarative description of one named connection: an ordered list of
/// candidate URIs plus session options. Read once at connect time and
/// immutable thereafter.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub uris: Vec<String>,
    pub options: ConnectionOptions,
}

/// Connection name to configuration, as read from the config file.
pub type ConnectionMap = FxHashMap<String, ConnectionConfig>;

/// Reads the connection map from a config file with environment overrides.
///
/// Layered strategy, same as the rest of the workspace configuration:
/// 1. **Base file**: the given path (extension resolved by the `config`
///    crate), defaulting to `config/database` under the working directory.
/// 2. **Environment**: variables prefixed with `CORRAL__`, nested keys
///    separated by double underscores (e.g. `CORRAL__MAIN__URIS`).
///
/// # Errors
/// Returns [`DatabaseError::Config`] if the file is missing or its content
/// does not match the expected connection map shape.
pub fn load_connection_config(
    path: Option<impl AsRef<Path>>,
) -> Result<ConnectionMap, DatabaseError> {
    let effective_path =
        path.map_or_else(|| PathBuf::from("config/database"), |p| p.as_ref().to_path_buf());

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(true))
        .add_source(
            Environment::with_prefix("CORRAL")
                .separator("__")
                .convert_case(config::Case::Snake),
        );

    info!("Loading connection config from {}", effective_path.display());

    let config = builder
        .build()
        .context("Failed to build connection config")?
        .try_deserialize::<ConnectionMap>()
        .context("Failed to deserialize connection config")?;

    Ok(config)
}
