use crate::model::Model;
use crate::schema::SchemaDraft;
use fxhash::FxHashMap;
use serde_json::Value as Json;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use surrealdb::types::{Object, Value};

/// Callable bound to a single record.
pub type InstanceMethodFn = Arc<dyn Fn(&Object) -> Value + Send + Sync>;
/// Callable bound to the whole model.
pub type ClassMethodFn = Arc<dyn Fn(&Model) -> Value + Send + Sync>;
/// Extends a schema under construction; receives the options declared in the
/// definition file.
pub type PluginFn =
    Arc<dyn Fn(&mut SchemaDraft, &Json) -> Result<(), crate::ModelError> + Send + Sync>;
/// Runs before a lifecycle event; may mutate the document or abort.
pub type PreHookFn = Arc<dyn Fn(&mut Object) -> HookOutcome + Send + Sync>;
/// Runs after a lifecycle event with the resulting record.
pub type PostHookFn = Arc<dyn Fn(&Object) + Send + Sync>;
/// Read accessor of a virtual field.
pub type GetterFn = Arc<dyn Fn(&Object) -> Value + Send + Sync>;
/// Write accessor of a virtual field.
pub type SetterFn = Arc<dyn Fn(&mut Object, Value) + Send + Sync>;

/// Outcome of a pre hook. Hooks run to completion, in order, before the
/// wrapped driver call; `Abort` fails the operation without reaching the
/// driver.
#[derive(Debug, Clone)]
pub enum HookOutcome {
    Proceed,
    Abort(Cow<'static, str>),
}

/// Named behaviors referenced from model definition files.
///
/// Definition files are pure data; every function they mention is looked up
/// here by key at schema-build time. Unknown keys fail the build.
#[derive(Clone, Default)]
pub struct Extensions {
    instance_methods: FxHashMap<String, InstanceMethodFn>,
    class_methods: FxHashMap<String, ClassMethodFn>,
    plugins: FxHashMap<String, PluginFn>,
    pre_hooks: FxHashMap<String, PreHookFn>,
    post_hooks: FxHashMap<String, PostHookFn>,
    getters: FxHashMap<String, GetterFn>,
    setters: FxHashMap<String, SetterFn>,
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("instance_methods", &self.instance_methods.len())
            .field("class_methods", &self.class_methods.len())
            .field("plugins", &self.plugins.len())
            .field("pre_hooks", &self.pre_hooks.len())
            .field("post_hooks", &self.post_hooks.len())
            .field("getters", &self.getters.len())
            .field("setters", &self.setters.len())
            .finish()
    }
}

impl Extensions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in plugins.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::default().plugin("timestamps", Arc::new(timestamps_plugin))
    }

    #[must_use]
    pub fn instance_method(mut self, key: impl Into<String>, method: InstanceMethodFn) -> Self {
        self.instance_methods.insert(key.into(), method);
        self
    }

    #[must_use]
    pub fn class_method(mut self, key: impl Into<String>, method: ClassMethodFn) -> Self {
        self.class_methods.insert(key.into(), method);
        self
    }

    #[must_use]
    pub fn plugin(mut self, key: impl Into<String>, plugin: PluginFn) -> Self {
        self.plugins.insert(key.into(), plugin);
        self
    }

    #[must_use]
    pub fn pre_hook(mut self, key: impl Into<String>, hook: PreHookFn) -> Self {
        self.pre_hooks.insert(key.into(), hook);
        self
    }

    #[must_use]
    pub fn post_hook(mut self, key: impl Into<String>, hook: PostHookFn) -> Self {
        self.post_hooks.insert(key.into(), hook);
        self
    }

    #[must_use]
    pub fn getter(mut self, key: impl Into<String>, getter: GetterFn) -> Self {
        self.getters.insert(key.into(), getter);
        self
    }

    #[must_use]
    pub fn setter(mut self, key: impl Into<String>, setter: SetterFn) -> Self {
        self.setters.insert(key.into(), setter);
        self
    }

    pub(crate) fn instance_method_fn(&self, key: &str) -> Option<&InstanceMethodFn> {
        self.instance_methods.get(key)
    }

    pub(crate) fn class_method_fn(&self, key: &str) -> Option<&ClassMethodFn> {
        self.class_methods.get(key)
    }

    pub(crate) fn plugin_fn(&self, key: &str) -> Option<&PluginFn> {
        self.plugins.get(key)
    }

    pub(crate) fn pre_hook_fn(&self, key: &str) -> Option<&PreHookFn> {
        self.pre_hooks.get(key)
    }

    pub(crate) fn post_hook_fn(&self, key: &str) -> Option<&PostHookFn> {
        self.post_hooks.get(key)
    }

    pub(crate) fn getter_fn(&self, key: &str) -> Option<&GetterFn> {
        self.getters.get(key)
    }

    pub(crate) fn setter_fn(&self, key: &str) -> Option<&SetterFn> {
        self.setters.get(key)
    }
}

/// Built-in timestamping plugin: declares `created_at`/`updated_at`
/// attributes and stamps them in a pre-save hook. Timestamps are stored as
/// RFC 3339 strings.
fn timestamps_plugin(draft: &mut SchemaDraft, _options: &Json) -> Result<(), crate::ModelError> {
    draft.add_attribute("created_at", "string");
    draft.add_attribute("updated_at", "string");
    draft.add_pre_hook(
        "save",
        Arc::new(|doc: &mut Object| {
            let now = Value::String(chrono::Utc::now().to_rfc3339());
            if doc.get("created_at").is_none() {
                doc.insert("created_at".to_owned(), now.clone());
            }
            doc.insert("updated_at".to_owned(), now);
            HookOutcome::Proceed
        }),
    );
    Ok(())
}
