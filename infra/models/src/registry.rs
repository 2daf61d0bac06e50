use crate::error::ModelError;
use crate::extensions::Extensions;
use crate::loader::{Pass, load_models};
use crate::model::Model;
use corral_database::ConnectionRegistry;
use fxhash::FxHashMap;
use std::path::Path;
use tracing::{info, instrument};

/// Registry owning every compiled model, keyed by name.
///
/// Like the connection registry, this is explicit instance state: lifecycle
/// methods take `&mut self` and are expected to be called sequentially.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: FxHashMap<String, Model>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Two-pass load over the model directory: base models first, then
    /// discriminators (which need the compiled parents).
    ///
    /// Replaces any previously loaded set wholesale, so repeated loads are
    /// idempotent and never leak stale models. On collision (ill-formed
    /// input), a discriminator entry wins over a base entry of the same
    /// name.
    #[instrument(skip_all, fields(root = %root_path.as_ref().display()))]
    pub async fn load(
        &mut self,
        connections: &ConnectionRegistry,
        root_path: impl AsRef<Path>,
        extensions: &Extensions,
    ) -> Result<(), ModelError> {
        let root = root_path.as_ref();

        let base = load_models(connections, root, Pass::Base, &FxHashMap::default(), extensions)
            .await?;
        let discriminators =
            load_models(connections, root, Pass::Discriminators, &base, extensions).await?;

        let mut models = base;
        models.extend(discriminators);
        self.models = models;

        info!(count = self.models.len(), "Models loaded");
        Ok(())
    }

    /// Pure lookup.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Clears the registry. Connections are not affected.
    pub fn unload(&mut self) {
        self.models.clear();
    }
}
