use crate::definition::{ModelDefinition, merge_definitions};
use crate::error::{ModelError, ModelErrorExt};
use crate::extensions::Extensions;
use crate::model::{Discriminator, Model};
use crate::schema::SchemaBuilder;
use config::{Config, File};
use corral_database::ConnectionRegistry;
use fxhash::FxHashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Which partition of the definition files a pass loads. A definition with
/// `extends` belongs only to the discriminator pass; one without it only to
/// the base pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pass {
    Base,
    Discriminators,
}

/// Reads one model definition file through the `config` crate.
fn read_definition(path: &Path) -> Result<ModelDefinition, ModelError> {
    Config::builder()
        .add_source(File::from(path).required(true))
        .build()
        .context(path.display().to_string())?
        .try_deserialize::<ModelDefinition>()
        .context(path.display().to_string())
}

/// Regular files directly under `root`, sorted for reproducible load order.
/// Subdirectories are not scanned.
fn definition_files(root: &Path) -> Result<Vec<PathBuf>, ModelError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(root).context(root.display().to_string())? {
        let entry = entry.context(root.display().to_string())?;
        if entry.file_type().context(root.display().to_string())?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Finds the definition file whose stem is `name` (parent definitions are
/// referenced by model name, extension-agnostic).
fn definition_path(root: &Path, name: &str) -> Result<PathBuf, ModelError> {
    definition_files(root)?
        .into_iter()
        .find(|path| path.file_stem().and_then(OsStr::to_str) == Some(name))
        .ok_or_else(|| ModelError::SchemaBuild {
            message: format!("Parent definition '{name}' not found").into(),
            context: Some(root.display().to_string().into()),
        })
}

/// Loads one partition of the model directory.
///
/// The base pass compiles and registers plain models. The discriminator pass
/// re-reads each parent definition from disk, merges the child onto it, and
/// registers the result against the already-compiled parent model from
/// `base_models` — same connection, shared table.
#[instrument(skip(connections, base_models, extensions), fields(root = %root.display(), ?pass))]
pub(crate) async fn load_models(
    connections: &ConnectionRegistry,
    root: &Path,
    pass: Pass,
    base_models: &FxHashMap<String, Model>,
    extensions: &Extensions,
) -> Result<FxHashMap<String, Model>, ModelError> {
    let mut models = FxHashMap::default();

    for path in definition_files(root)? {
        let Some(name) = path.file_stem().and_then(OsStr::to_str) else {
            continue;
        };
        let definition = read_definition(&path)?;

        match (pass, &definition.extends) {
            (Pass::Base, None) => {
                let model = load_model(connections, name, &definition, extensions).await?;
                models.insert(name.to_owned(), model);
            }
            (Pass::Discriminators, Some(parent_name)) => {
                let parent_path = definition_path(root, parent_name)?;
                let parent_definition = read_definition(&parent_path)?;
                let merged = merge_definitions(&parent_definition, &definition);
                let model = load_discriminator(
                    connections,
                    base_models,
                    name,
                    parent_name,
                    &merged,
                    extensions,
                )
                .await?;
                models.insert(name.to_owned(), model);
            }
            // The other partition's pass picks this file up.
            _ => {}
        }
    }

    Ok(models)
}

async fn load_model(
    connections: &ConnectionRegistry,
    name: &str,
    definition: &ModelDefinition,
    extensions: &Extensions,
) -> Result<Model, ModelError> {
    // The schema is built regardless of the connection's existence; only
    // the registration driver call requires a live connection.
    let schema = SchemaBuilder::build(definition, extensions)?;
    let connection = connections.get(&definition.connection).ok_or_else(|| {
        ModelError::Connection {
            message: format!("Connection '{}' is not registered", definition.connection).into(),
            context: Some(name.to_owned().into()),
        }
    })?;

    let table = schema.options().table.clone().unwrap_or_else(|| name.to_owned());
    let model = Model::new(name, table, connection, schema, None, connections.logger().clone());
    model.register().await?;
    debug!(model = name, "Base model loaded");
    Ok(model)
}

async fn load_discriminator(
    connections: &ConnectionRegistry,
    base_models: &FxHashMap<String, Model>,
    name: &str,
    parent_name: &str,
    merged: &ModelDefinition,
    extensions: &Extensions,
) -> Result<Model, ModelError> {
    let schema = SchemaBuilder::build(merged, extensions)?;

    let parent = base_models.get(parent_name).ok_or_else(|| ModelError::SchemaBuild {
        message: format!("Parent model '{parent_name}' is not loaded").into(),
        context: Some(name.to_owned().into()),
    })?;
    if parent.connection().name() != merged.connection {
        return Err(ModelError::SchemaBuild {
            message: format!(
                "Discriminator targets connection '{}' but parent '{parent_name}' lives on '{}'",
                merged.connection,
                parent.connection().name()
            )
            .into(),
            context: Some(name.to_owned().into()),
        });
    }

    let discriminator = Discriminator {
        parent: parent.name().to_owned(),
        key: merged.options.discriminator_key.clone(),
        value: name.to_owned(),
    };
    let model = Model::new(
        name,
        parent.table(),
        parent.connection().clone(),
        schema,
        Some(discriminator),
        connections.logger().clone(),
    );
    model.register().await?;
    debug!(model = name, parent = parent_name, "Discriminator loaded");
    Ok(model)
}
