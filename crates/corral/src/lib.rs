//! Facade crate for Corral: declarative model loading over `SurrealDB`.
//! Composes the connection and model registries behind one entry point.
//! Keep this crate thin: it should compose the infra crates, not implement
//! loading logic.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use corral::{ConnectOptions, Corral};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), corral::CorralError> {
//!     let mut corral = Corral::connect(ConnectOptions::default()).await?;
//!
//!     let bird = corral.model("bird").expect("loaded model");
//!     let flock = bird.find().await?;
//!     tracing::info!(count = flock.len(), "birds");
//!
//!     corral.disconnect();
//!     Ok(())
//! }
//! ```

pub use corral_database as database;
pub use corral_models as models;

// Driver pass-through, including its type vocabulary for documents.
pub use surrealdb;
pub use surrealdb::types;

pub use corral_database::{
    Connection, ConnectionConfig, ConnectionMap, ConnectionOptions, ConnectionRegistry,
    DatabaseError, LoggerConfig,
};
pub use corral_models::{
    Extensions, HookOutcome, Instance, Model, ModelDefinition, ModelError, ModelRegistry,
};

use std::path::{Path, PathBuf};
use tracing::instrument;

/// Facade error: whichever layer failed.
#[derive(Debug, thiserror::Error)]
pub enum CorralError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Options for [`Corral::connect`]. Setters overlay the defaults:
/// `config/database` for the connection config, `app/models` for model
/// definitions, logging off, built-in extensions only.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    config_path: PathBuf,
    models_path: PathBuf,
    logger: LoggerConfig,
    extensions: Extensions,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config/database"),
            models_path: PathBuf::from("app/models"),
            logger: LoggerConfig::Off,
            extensions: Extensions::with_builtins(),
        }
    }
}

impl ConnectOptions {
    #[must_use]
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    #[must_use]
    pub fn models_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.models_path = path.into();
        self
    }

    #[must_use]
    pub fn logger(mut self, logger: LoggerConfig) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }
}

/// The loaded system: a connection registry and a model registry with an
/// explicit, instance-owned lifecycle.
///
/// Lifecycle methods are expected to be called sequentially by a single
/// orchestrating caller; operations issued through compiled models may run
/// concurrently once loading completes.
#[derive(Debug)]
pub struct Corral {
    connections: ConnectionRegistry,
    models: ModelRegistry,
    extensions: Extensions,
    models_path: PathBuf,
}

impl Corral {
    /// Opens every configured connection, then loads every model — in that
    /// order, since models bind to connections.
    ///
    /// # Errors
    /// * [`DatabaseError::Config`] if the connection config is missing or malformed.
    /// * [`DatabaseError::Connection`] if an open fails (already-opened
    ///   connections stay registered; call [`disconnect`](Self::disconnect)
    ///   to recover a clean state).
    /// * [`ModelError`] variants if a definition fails to read, build or register.
    #[instrument(skip(options), fields(config = %options.config_path.display(), models = %options.models_path.display()))]
    pub async fn connect(options: ConnectOptions) -> Result<Self, CorralError> {
        let config = database::load_connection_config(Some(&options.config_path))?;

        let mut connections = ConnectionRegistry::new();
        connections.connect(&config, options.logger.clone()).await?;

        let mut models = ModelRegistry::new();
        models.load(&connections, &options.models_path, &options.extensions).await?;

        Ok(Self {
            connections,
            models,
            extensions: options.extensions,
            models_path: options.models_path,
        })
    }

    /// Reloads model definitions onto the existing connections. Prior
    /// entries are replaced wholesale; connections are untouched.
    pub async fn load(&mut self, models_path: impl AsRef<Path>) -> Result<(), CorralError> {
        self.models_path = models_path.as_ref().to_path_buf();
        self.models.load(&self.connections, &self.models_path, &self.extensions).await?;
        Ok(())
    }

    /// Unloads every model, then closes every connection.
    pub fn disconnect(&mut self) {
        self.models.unload();
        self.connections.disconnect();
    }

    /// Returns the named connection, or `None` if unknown.
    #[must_use]
    pub fn connection(&self, name: &str) -> Option<Connection> {
        self.connections.get(name)
    }

    /// Returns the named model, or `None` if unknown.
    #[must_use]
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    #[must_use]
    pub const fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    #[must_use]
    pub const fn models(&self) -> &ModelRegistry {
        &self.models
    }
}
