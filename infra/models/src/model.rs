use crate::error::{ModelError, ModelErrorExt};
use crate::extensions::HookOutcome;
use crate::schema::Schema;
use corral_database::{Connection, LoggerConfig};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use surrealdb::types::{Object, Value};
use tracing::debug;

/// Structural relationship of a discriminator model to its already-compiled
/// parent: same connection, shared table, distinguished by one field.
#[derive(Debug, Clone)]
pub struct Discriminator {
    /// Parent model name.
    pub parent: String,
    /// Field distinguishing records of this model on the shared table.
    pub key: String,
    /// Value stamped into [`key`](Self::key); the discriminator model name.
    pub value: String,
}

/// A compiled, connection-bound model handle.
///
/// Cloning is cheap; all handles share the compiled schema. Operations
/// issued through a model are independent of the loading subsystem and may
/// run concurrently once loading completes.
#[derive(Clone)]
pub struct Model {
    name: String,
    table: String,
    connection: Connection,
    schema: Arc<Schema>,
    discriminator: Option<Discriminator>,
    logger: LoggerConfig,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("connection", &self.connection.name())
            .field("discriminator", &self.discriminator)
            .finish_non_exhaustive()
    }
}

impl Model {
    pub(crate) fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        connection: Connection,
        schema: Schema,
        discriminator: Option<Discriminator>,
        logger: LoggerConfig,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            connection,
            schema: Arc::new(schema),
            discriminator,
            logger,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub const fn discriminator(&self) -> Option<&Discriminator> {
        self.discriminator.as_ref()
    }

    #[must_use]
    pub const fn is_discriminator(&self) -> bool {
        self.discriminator.is_some()
    }

    /// Executes the schema DDL on the model's connection.
    ///
    /// Base models define their table and fields; discriminators define only
    /// their merged fields (plus the discriminator key) on the parent's
    /// table. Malformed attribute descriptors surface here, from the driver.
    pub(crate) async fn register(&self) -> Result<(), ModelError> {
        let ddl = match &self.discriminator {
            Some(discriminator) => {
                let mut ddl = self.schema.field_ddl(&self.table);
                ddl.push(format!(
                    "DEFINE FIELD OVERWRITE {} ON TABLE {} TYPE option<string>;",
                    discriminator.key, self.table
                ));
                ddl
            }
            None => self.schema.table_ddl(&self.table),
        };

        for statement in &ddl {
            let response = self
                .connection
                .query(statement)
                .await
                .context("Registering model schema")?;
            response
                .check()
                .map_err(surrealdb::Error::from)
                .context("Applying model DDL")?;
        }
        debug!(model = %self.name, table = %self.table, "Model schema registered");
        Ok(())
    }

    /// Creates one record.
    ///
    /// Pre-save hooks run first, in registration order; a hook may mutate
    /// the document or abort the operation. Discriminator models stamp their
    /// key before the driver call. Post-save hooks observe the stored
    /// record.
    pub async fn create(&self, content: Object) -> Result<Instance, ModelError> {
        let mut doc = content;
        for hook in self.schema.pre_hooks("save") {
            match hook(&mut doc) {
                HookOutcome::Proceed => {}
                HookOutcome::Abort(reason) => {
                    return Err(ModelError::Hook {
                        message: reason,
                        context: Some(self.name.clone().into()),
                    });
                }
            }
        }
        if let Some(discriminator) = &self.discriminator {
            doc.insert(discriminator.key.clone(), Value::String(discriminator.value.clone()));
        }

        let payload = Value::Object(doc);
        let log_payload = self.logger.is_enabled().then(|| payload.clone());
        let started = Instant::now();

        let mut response = self
            .connection
            .query("CREATE type::table($table) CONTENT $content")
            .bind(("table", self.table.clone()))
            .bind(("content", payload))
            .await
            .context("Creating record")?;
        let mut rows = response.take::<Vec<Value>>(0).context("Reading created record")?;

        if let Some(payload) = &log_payload {
            self.logger.log(&self.table, "create", &[payload], started.elapsed());
        }

        if rows.is_empty() {
            return Err(ModelError::Internal {
                message: "Driver returned no created record".into(),
                context: Some(self.name.clone().into()),
            });
        }
        let stored = self.into_instance(rows.remove(0))?;
        for hook in self.schema.post_hooks("save") {
            hook(stored.doc());
        }
        Ok(stored)
    }

    /// Returns every record of this model.
    ///
    /// A discriminator model selects only records carrying its key value on
    /// the shared table; the parent model sees all records, discriminator
    /// records included.
    pub async fn find(&self) -> Result<Vec<Instance>, ModelError> {
        let query = match &self.discriminator {
            Some(discriminator) => format!(
                "SELECT * FROM type::table($table) WHERE {} = $kind",
                discriminator.key
            ),
            None => "SELECT * FROM type::table($table)".to_owned(),
        };

        let started = Instant::now();
        let mut request = self.connection.query(&query).bind(("table", self.table.clone()));
        if let Some(discriminator) = &self.discriminator {
            request = request.bind(("kind", discriminator.value.clone()));
        }
        let mut response = request.await.context("Finding records")?;
        let rows = response.take::<Vec<Value>>(0).context("Reading found records")?;
        self.logger.log(&self.table, "find", &[], started.elapsed());

        rows.into_iter().map(|row| self.into_instance(row)).collect()
    }

    /// Deletes every record of this model (discriminator-scoped on shared
    /// tables).
    pub async fn delete_all(&self) -> Result<(), ModelError> {
        let query = match &self.discriminator {
            Some(discriminator) => format!(
                "DELETE type::table($table) WHERE {} = $kind",
                discriminator.key
            ),
            None => "DELETE type::table($table)".to_owned(),
        };

        let started = Instant::now();
        let mut request = self.connection.query(&query).bind(("table", self.table.clone()));
        if let Some(discriminator) = &self.discriminator {
            request = request.bind(("kind", discriminator.value.clone()));
        }
        let response = request.await.context("Deleting records")?;
        response.check().map_err(surrealdb::Error::from).context("Deleting records")?;
        self.logger.log(&self.table, "delete", &[], started.elapsed());
        Ok(())
    }

    /// Invokes a class method declared by the definition; `None` on an
    /// unknown method name.
    #[must_use]
    pub fn call(&self, name: &str) -> Option<Value> {
        self.schema.class_method(name).map(|method| method(self))
    }

    fn into_instance(&self, row: Value) -> Result<Instance, ModelError> {
        match row {
            Value::Object(doc) => Ok(Instance::new(doc, self.schema.clone())),
            other => Err(ModelError::Internal {
                message: format!("Expected a record object, got {other:?}").into(),
                context: Some(self.name.clone().into()),
            }),
        }
    }
}

/// One record produced by a model operation, carrying the schema that built
/// it so virtuals and instance methods resolve.
#[derive(Clone)]
pub struct Instance {
    doc: Object,
    schema: Arc<Schema>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance").field("doc", &self.doc).finish_non_exhaustive()
    }
}

impl Instance {
    pub(crate) const fn new(doc: Object, schema: Arc<Schema>) -> Self {
        Self { doc, schema }
    }

    /// Reads a field; a virtual getter declared for the name wins over a
    /// stored field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        if let Some((Some(getter), _)) = self.schema.virtual_accessors(field) {
            return Some(getter(&self.doc));
        }
        self.doc.get(field).cloned()
    }

    /// Writes a field. A virtual with a setter writes through it; a virtual
    /// without one is read-only and rejects the write.
    pub fn set(&mut self, field: &str, value: Value) -> Result<(), ModelError> {
        match self.schema.virtual_accessors(field) {
            Some((_, Some(setter))) => {
                setter(&mut self.doc, value);
                Ok(())
            }
            Some((_, None)) => Err(ModelError::SchemaBuild {
                message: format!("Virtual field '{field}' is read-only").into(),
                context: None,
            }),
            None => {
                self.doc.insert(field.to_owned(), value);
                Ok(())
            }
        }
    }

    /// Invokes an instance method declared by the definition; `None` on an
    /// unknown method name.
    #[must_use]
    pub fn call(&self, name: &str) -> Option<Value> {
        self.schema.instance_method(name).map(|method| method(&self.doc))
    }

    /// The record id assigned by the driver.
    #[must_use]
    pub fn id(&self) -> Option<Value> {
        self.doc.get("id").cloned()
    }

    /// Raw document access.
    #[must_use]
    pub const fn doc(&self) -> &Object {
        &self.doc
    }

    #[must_use]
    pub fn into_doc(self) -> Object {
        self.doc
    }
}
