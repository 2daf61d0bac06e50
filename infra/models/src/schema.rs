use crate::definition::{ModelDefinition, SchemaOptions};
use crate::error::ModelError;
use crate::extensions::{
    ClassMethodFn, Extensions, GetterFn, InstanceMethodFn, PostHookFn, PreHookFn, SetterFn,
};
use fxhash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt;

/// Mutable schema under construction. This is what plugins see: they may add
/// attributes and hooks, and they can rely on everything applied before them
/// (e.g. instance methods) already being present.
#[derive(Default)]
pub struct SchemaDraft {
    pub(crate) attributes: BTreeMap<String, String>,
    pub(crate) options: SchemaOptions,
    pub(crate) instance_methods: FxHashMap<String, InstanceMethodFn>,
    pub(crate) class_methods: FxHashMap<String, ClassMethodFn>,
    pub(crate) pre_hooks: Vec<(String, PreHookFn)>,
    pub(crate) post_hooks: Vec<(String, PostHookFn)>,
    pub(crate) virtuals: FxHashMap<String, (Option<GetterFn>, Option<SetterFn>)>,
}

impl fmt::Debug for SchemaDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDraft")
            .field("attributes", &self.attributes)
            .field("options", &self.options)
            .field("instance_methods", &self.instance_methods.len())
            .field("class_methods", &self.class_methods.len())
            .field("pre_hooks", &self.pre_hooks.len())
            .field("post_hooks", &self.post_hooks.len())
            .field("virtuals", &self.virtuals.len())
            .finish()
    }
}

impl SchemaDraft {
    pub fn add_attribute(&mut self, field: impl Into<String>, descriptor: impl Into<String>) {
        self.attributes.insert(field.into(), descriptor.into());
    }

    pub fn add_pre_hook(&mut self, event: impl Into<String>, hook: PreHookFn) {
        self.pre_hooks.push((event.into(), hook));
    }

    pub fn add_post_hook(&mut self, event: impl Into<String>, hook: PostHookFn) {
        self.post_hooks.push((event.into(), hook));
    }

    #[must_use]
    pub fn has_instance_method(&self, name: &str) -> bool {
        self.instance_methods.contains_key(name)
    }

    #[must_use]
    pub fn has_class_method(&self, name: &str) -> bool {
        self.class_methods.contains_key(name)
    }

    fn into_schema(self) -> Schema {
        Schema {
            attributes: self.attributes,
            options: self.options,
            instance_methods: self.instance_methods,
            class_methods: self.class_methods,
            pre_hooks: self.pre_hooks,
            post_hooks: self.post_hooks,
            virtuals: self.virtuals,
        }
    }
}

/// Compiled, immutable schema: fields, methods, hooks and virtuals of one
/// model, plus the DDL to register it against the driver.
pub struct Schema {
    attributes: BTreeMap<String, String>,
    options: SchemaOptions,
    instance_methods: FxHashMap<String, InstanceMethodFn>,
    class_methods: FxHashMap<String, ClassMethodFn>,
    pre_hooks: Vec<(String, PreHookFn)>,
    post_hooks: Vec<(String, PostHookFn)>,
    virtuals: FxHashMap<String, (Option<GetterFn>, Option<SetterFn>)>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("attributes", &self.attributes)
            .field("options", &self.options)
            .field("instance_methods", &self.instance_methods.len())
            .field("class_methods", &self.class_methods.len())
            .field("pre_hooks", &self.pre_hooks.len())
            .field("post_hooks", &self.post_hooks.len())
            .field("virtuals", &self.virtuals.len())
            .finish()
    }
}

impl Schema {
    #[must_use]
    pub const fn options(&self) -> &SchemaOptions {
        &self.options
    }

    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub(crate) fn pre_hooks(&self, event: &str) -> impl Iterator<Item = &PreHookFn> {
        self.pre_hooks.iter().filter(move |(e, _)| e == event).map(|(_, hook)| hook)
    }

    pub(crate) fn post_hooks(&self, event: &str) -> impl Iterator<Item = &PostHookFn> {
        self.post_hooks.iter().filter(move |(e, _)| e == event).map(|(_, hook)| hook)
    }

    pub(crate) fn instance_method(&self, name: &str) -> Option<&InstanceMethodFn> {
        self.instance_methods.get(name)
    }

    pub(crate) fn class_method(&self, name: &str) -> Option<&ClassMethodFn> {
        self.class_methods.get(name)
    }

    pub(crate) fn virtual_accessors(&self, field: &str) -> Option<&(Option<GetterFn>, Option<SetterFn>)> {
        self.virtuals.get(field)
    }

    /// DDL defining the table and all of its fields.
    ///
    /// Fields are `option<...>`-wrapped so records may omit them; the
    /// descriptor itself is interpolated unvalidated, leaving malformed
    /// declarations to the driver at registration time. `OVERWRITE` keeps
    /// re-registration (repeated loads) idempotent.
    #[must_use]
    pub fn table_ddl(&self, table: &str) -> Vec<String> {
        let mode = if self.options.strict { "SCHEMAFULL" } else { "SCHEMALESS" };
        let mut ddl = vec![format!("DEFINE TABLE OVERWRITE {table} {mode};")];
        ddl.extend(self.field_ddl(table));
        ddl
    }

    /// DDL for the fields only; a discriminator registers its merged fields
    /// against the parent's already-defined table.
    #[must_use]
    pub fn field_ddl(&self, table: &str) -> Vec<String> {
        self.attributes
            .iter()
            .map(|(field, descriptor)| {
                format!("DEFINE FIELD OVERWRITE {field} ON TABLE {table} TYPE option<{descriptor}>;")
            })
            .collect()
    }
}

/// Translates one resolved [`ModelDefinition`] into a [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder;

impl SchemaBuilder {
    /// Pure function of the definition and the extension registry.
    ///
    /// Extension points apply in a fixed order, because later steps may
    /// depend on state declared by earlier ones:
    /// 1. attributes + options
    /// 2. instance methods
    /// 3. class methods
    /// 4. plugins, in declared order, each receiving its options
    /// 5. middleware, pre then post, appended after plugin-added hooks
    /// 6. virtuals (a virtual with neither accessor is a no-op)
    pub fn build(
        definition: &ModelDefinition,
        extensions: &Extensions,
    ) -> Result<Schema, ModelError> {
        let mut draft = SchemaDraft {
            attributes: definition.attributes.clone(),
            options: definition.options.clone(),
            ..SchemaDraft::default()
        };

        for (name, key) in &definition.instance_methods {
            let method = extensions.instance_method_fn(key).ok_or_else(|| {
                unknown_extension("instance method", key, name)
            })?;
            draft.instance_methods.insert(name.clone(), method.clone());
        }

        for (name, key) in &definition.class_methods {
            let method = extensions
                .class_method_fn(key)
                .ok_or_else(|| unknown_extension("class method", key, name))?;
            draft.class_methods.insert(name.clone(), method.clone());
        }

        for plugin in &definition.plugins {
            let apply = extensions
                .plugin_fn(&plugin.name)
                .ok_or_else(|| unknown_extension("plugin", &plugin.name, &plugin.name))?
                .clone();
            apply(&mut draft, &plugin.options)?;
        }

        for hook in &definition.middleware.pre {
            let hook_fn = extensions
                .pre_hook_fn(&hook.hook)
                .ok_or_else(|| unknown_extension("pre hook", &hook.hook, &hook.event))?;
            draft.pre_hooks.push((hook.event.clone(), hook_fn.clone()));
        }

        for hook in &definition.middleware.post {
            let hook_fn = extensions
                .post_hook_fn(&hook.hook)
                .ok_or_else(|| unknown_extension("post hook", &hook.hook, &hook.event))?;
            draft.post_hooks.push((hook.event.clone(), hook_fn.clone()));
        }

        for (field, accessors) in &definition.virtuals {
            let getter = match &accessors.get {
                Some(key) => Some(
                    extensions
                        .getter_fn(key)
                        .ok_or_else(|| unknown_extension("virtual getter", key, field))?
                        .clone(),
                ),
                None => None,
            };
            let setter = match &accessors.set {
                Some(key) => Some(
                    extensions
                        .setter_fn(key)
                        .ok_or_else(|| unknown_extension("virtual setter", key, field))?
                        .clone(),
                ),
                None => None,
            };
            if getter.is_none() && setter.is_none() {
                continue;
            }
            draft.virtuals.insert(field.clone(), (getter, setter));
        }

        Ok(draft.into_schema())
    }
}

fn unknown_extension(kind: &str, key: &str, at: &str) -> ModelError {
    ModelError::SchemaBuild {
        message: format!("Unknown {kind} extension '{key}'").into(),
        context: Some(at.to_owned().into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{HookRef, PluginRef, VirtualRef};
    use crate::extensions::HookOutcome;
    use std::sync::Arc;
    use surrealdb::types::{Object, Value};

    fn definition() -> ModelDefinition {
        let mut definition = ModelDefinition::default();
        definition.attributes.insert("name".to_owned(), "string".to_owned());
        definition
    }

    fn noop_pre_hook() -> crate::extensions::PreHookFn {
        Arc::new(|_doc: &mut Object| HookOutcome::Proceed)
    }

    #[test]
    fn plugins_observe_previously_registered_methods() {
        let mut definition = definition();
        definition.instance_methods.insert("describe".to_owned(), "describe_key".to_owned());
        definition
            .plugins
            .push(PluginRef { name: "probe".to_owned(), options: serde_json::Value::Null });

        let extensions = Extensions::new()
            .instance_method("describe_key", Arc::new(|_doc| Value::None))
            .plugin(
                "probe",
                Arc::new(|draft, _options| {
                    // Methods are applied before plugins.
                    assert!(draft.has_instance_method("describe"));
                    draft.add_attribute("probed", "bool");
                    Ok(())
                }),
            );

        let schema = SchemaBuilder::build(&definition, &extensions).expect("build");
        assert_eq!(schema.attributes()["probed"], "bool");
    }

    #[test]
    fn middleware_hooks_append_after_plugin_hooks() {
        let mut definition = definition();
        definition
            .plugins
            .push(PluginRef { name: "early".to_owned(), options: serde_json::Value::Null });
        definition
            .middleware
            .pre
            .push(HookRef { event: "save".to_owned(), hook: "late".to_owned() });

        let extensions = Extensions::new()
            .plugin(
                "early",
                Arc::new(|draft, _options| {
                    draft.add_pre_hook("save", Arc::new(|doc: &mut Object| {
                        doc.insert("order".to_owned(), Value::String("plugin".to_owned()));
                        HookOutcome::Proceed
                    }));
                    Ok(())
                }),
            )
            .pre_hook(
                "late",
                Arc::new(|doc: &mut Object| {
                    // Runs second, so it sees and overwrites the plugin's value.
                    assert!(doc.get("order").is_some());
                    doc.insert("order".to_owned(), Value::String("middleware".to_owned()));
                    HookOutcome::Proceed
                }),
            );

        let schema = SchemaBuilder::build(&definition, &extensions).expect("build");
        let mut doc = Object::default();
        for hook in schema.pre_hooks("save") {
            assert!(matches!(hook(&mut doc), HookOutcome::Proceed));
        }
        assert_eq!(doc.get("order"), Some(&Value::String("middleware".to_owned())));
    }

    #[test]
    fn unknown_extension_key_fails_the_build() {
        let mut definition = definition();
        definition.class_methods.insert("speak".to_owned(), "missing".to_owned());

        let err = SchemaBuilder::build(&definition, &Extensions::new()).unwrap_err();
        assert!(matches!(err, ModelError::SchemaBuild { .. }), "err: {err}");
    }

    #[test]
    fn accessorless_virtual_is_a_noop() {
        let mut definition = definition();
        definition.virtuals.insert("ghost".to_owned(), VirtualRef::default());

        let schema = SchemaBuilder::build(&definition, &Extensions::new()).expect("build");
        assert!(schema.virtual_accessors("ghost").is_none());
    }

    #[test]
    fn table_ddl_defines_table_then_fields() {
        let mut definition = definition();
        definition.attributes.insert("age".to_owned(), "int".to_owned());

        let schema = SchemaBuilder::build(&definition, &Extensions::new()).expect("build");
        let ddl = schema.table_ddl("bird");
        assert_eq!(ddl[0], "DEFINE TABLE OVERWRITE bird SCHEMALESS;");
        assert!(ddl.contains(&"DEFINE FIELD OVERWRITE name ON TABLE bird TYPE option<string>;".to_owned()));
        assert!(ddl.contains(&"DEFINE FIELD OVERWRITE age ON TABLE bird TYPE option<int>;".to_owned()));
    }

    #[test]
    fn strict_option_defines_a_schemafull_table() {
        let mut definition = definition();
        definition.options.strict = true;

        let schema = SchemaBuilder::build(&definition, &Extensions::new()).expect("build");
        assert_eq!(schema.table_ddl("bird")[0], "DEFINE TABLE OVERWRITE bird SCHEMAFULL;");
    }

    #[test]
    fn pre_hooks_filter_by_event() {
        let mut definition = definition();
        definition.middleware.pre.push(HookRef { event: "save".to_owned(), hook: "h".to_owned() });
        definition
            .middleware
            .pre
            .push(HookRef { event: "remove".to_owned(), hook: "h".to_owned() });

        let extensions = Extensions::new().pre_hook("h", noop_pre_hook());
        let schema = SchemaBuilder::build(&definition, &extensions).expect("build");
        assert_eq!(schema.pre_hooks("save").count(), 1);
        assert_eq!(schema.pre_hooks("remove").count(), 1);
        assert_eq!(schema.pre_hooks("find").count(), 0);
    }
}
