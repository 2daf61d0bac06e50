//! # Connection Infrastructure
//!
//! Owns the process of opening, naming and closing [SurrealDB](https://surrealdb.com)
//! connections from a declarative configuration map.
//!
//! ## Key Features
//! - **Engine agnostic**: supports `mem://`, `ws://`, and `http://` via the `any` engine.
//! - **Ordered URI fallback**: the first URI of a connection that opens wins.
//! - **Resilient connectivity**: built-in retry logic for health checks during engine startup.
//! - **Explicit lifecycle**: an owned registry, not process-wide state, so
//!   independent instances (and tests) never interfere.
//!
//! ## Example
//!
//! ```rust,no_run
//! use corral_database::{ConnectionConfig, ConnectionOptions, ConnectionRegistry, LoggerConfig};
//! use fxhash::FxHashMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), corral_database::DatabaseError> {
//!     let mut config = FxHashMap::default();
//!     config.insert("main".to_owned(), ConnectionConfig {
//!         uris: vec!["mem://".to_owned()],
//!         options: ConnectionOptions {
//!             namespace: "corral".to_owned(),
//!             database: "main".to_owned(),
//!             username: None,
//!             password: None,
//!         },
//!     });
//!
//!     let mut registry = ConnectionRegistry::new();
//!     registry.connect(&config, LoggerConfig::Off).await?;
//!     let connection = registry.get("main").expect("configured connection");
//!     connection.health().await?;
//!     registry.disconnect();
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod logger;

pub use config::{ConnectionConfig, ConnectionMap, ConnectionOptions, load_connection_config};
pub use error::{DatabaseError, DatabaseErrorExt};
pub use logger::{LoggerConfig, format_call};

use fxhash::FxHashMap;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect};
use surrealdb::opt::auth::Root;
use tracing::{info, instrument, warn};

/// Inner state of a [`Connection`] handle.
#[derive(Debug)]
struct ConnectionInner {
    instance: Surreal<Any>,
    name: String,
    namespace: String,
    database: String,
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        info!(name = %self.name, ns = %self.namespace, db = %self.database, "Connection handle dropped");
    }
}

/// Cheaply clonable handle to one named, live connection.
///
/// Dereferences to the underlying `SurrealDB` client; the engine session is
/// closed when the last handle is dropped.
#[derive(Debug, Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.inner.database
    }

    /// Opens a connection from its configuration.
    ///
    /// # Process
    /// 1. **URI fallback**: each configured URI is tried in declared order;
    ///    the first engine that connects wins.
    /// 2. **Resilience**: up to 3 health checks with exponential backoff
    ///    (starting at 500ms) while the engine starts up.
    /// 3. **Authentication**: signs in as root when credentials are present.
    /// 4. **Session activation**: selects the configured namespace/database.
    ///
    /// # Errors
    /// * [`DatabaseError::Validation`] if no URI is configured.
    /// * [`DatabaseError::Connection`] if every URI fails or the engine stays unhealthy.
    /// * [`DatabaseError::Auth`] if the configured credentials are rejected.
    /// * [`DatabaseError::Surreal`] if session activation fails.
    #[instrument(skip(config), fields(uris = ?config.uris))]
    pub async fn open(name: &str, config: &ConnectionConfig) -> Result<Self, DatabaseError> {
        if config.uris.is_empty() {
            return Err(DatabaseError::Validation {
                message: "At least one URI is required".into(),
                context: Some(name.to_owned().into()),
            });
        }

        let mut instance = None;
        for uri in &config.uris {
            match connect(uri).await {
                Ok(handle) => {
                    instance = Some(handle);
                    break;
                }
                Err(error) => warn!(%uri, %error, "Engine connect failed, trying next URI"),
            }
        }
        let instance = instance.ok_or_else(|| DatabaseError::Connection {
            message: "No configured URI could be opened".into(),
            context: Some(name.to_owned().into()),
        })?;

        let mut delay = Duration::from_millis(500);
        for attempt in 1..=3 {
            if instance.health().await.is_ok() {
                break;
            }
            if attempt == 3 {
                return Err(DatabaseError::Connection {
                    message: "Unhealthy after retries".into(),
                    context: Some(name.to_owned().into()),
                });
            }
            warn!(attempt, ?delay, "Database not ready, retrying...");
            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        let options = &config.options;
        if let (Some(username), Some(password)) = (&options.username, &options.password) {
            instance
                .signin(Root { username: username.clone(), password: password.clone() })
                .await
                .map_err(|error| DatabaseError::Auth {
                    message: error.to_string().into(),
                    context: Some(name.to_owned().into()),
                })?;
        }

        instance
            .use_ns(&options.namespace)
            .use_db(&options.database)
            .await
            .context("Activating session")?;

        info!(name, namespace = %options.namespace, database = %options.database, "Connection established");

        Ok(Self {
            inner: Arc::new(ConnectionInner {
                instance,
                name: name.to_owned(),
                namespace: options.namespace.clone(),
                database: options.database.clone(),
            }),
        })
    }
}

impl Deref for Connection {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.inner.instance
    }
}

/// Registry owning every live connection, keyed by name.
///
/// At most one connection exists per name. Lifecycle methods take `&mut self`
/// and are expected to be called sequentially by a single orchestrating
/// caller; no internal locking is performed.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: FxHashMap<String, Connection>,
    logger: LoggerConfig,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens every configured connection, in name order.
    ///
    /// Fails loudly on the first open that errors. There is no rollback:
    /// connections opened earlier in the same call stay registered, and the
    /// caller recovers a clean state via [`disconnect`](Self::disconnect).
    #[instrument(skip_all, fields(entries = config.len()))]
    pub async fn connect(
        &mut self,
        config: &ConnectionMap,
        logger: LoggerConfig,
    ) -> Result<(), DatabaseError> {
        self.logger = logger;

        // Name order keeps failures and logs reproducible.
        let mut names: Vec<&String> = config.keys().collect();
        names.sort();

        for name in names {
            let connection = Connection::open(name, &config[name]).await?;
            self.connections.insert(name.clone(), connection);
        }
        Ok(())
    }

    /// Pure lookup; clones the handle for the caller.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Connection> {
        self.connections.get(name).cloned()
    }

    /// The driver-call logger wired at connect time.
    #[must_use]
    pub const fn logger(&self) -> &LoggerConfig {
        &self.logger
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    /// Closes every stored connection and clears the registry.
    ///
    /// Each close is independent: the engine session ends when the last
    /// handle drops, so one connection can never prevent closing the others.
    pub fn disconnect(&mut self) {
        for (name, connection) in self.connections.drain() {
            info!(%name, "Closing connection");
            drop(connection);
        }
    }
}
