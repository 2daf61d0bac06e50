use fxhash::FxHashMap;
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;

/// One model definition, as read from a file. Definitions are immutable
/// values: re-reading the same file (e.g. once as a parent, once as itself)
/// is referentially safe.
///
/// Behavioral entries (methods, plugins, hooks, virtual accessors) cannot
/// live in a data file, so they reference named extensions registered in
/// code; see [`Extensions`](crate::Extensions).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelDefinition {
    /// Name of the connection this model binds to.
    pub connection: String,
    /// Parent model name; set only on discriminator definitions.
    pub extends: Option<String>,
    /// Field name to driver type descriptor. Descriptors are passed through
    /// to the driver unvalidated.
    pub attributes: BTreeMap<String, String>,
    /// Schema-level options.
    pub options: SchemaOptions,
    /// Method name to extension registry key.
    pub class_methods: FxHashMap<String, String>,
    /// Method name to extension registry key.
    pub instance_methods: FxHashMap<String, String>,
    /// Applied in declared order.
    pub plugins: Vec<PluginRef>,
    /// Hooks around lifecycle events, per phase.
    pub middleware: MiddlewareSpec,
    /// Virtual field name to accessor keys.
    pub virtuals: FxHashMap<String, VirtualRef>,
}

/// Schema-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaOptions {
    /// Explicit table name; defaults to the model name.
    pub table: Option<String>,
    /// Field distinguishing discriminator records on the shared table.
    pub discriminator_key: String,
    /// `SCHEMAFULL` table definition when set.
    pub strict: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self { table: None, discriminator_key: "kind".to_owned(), strict: false }
    }
}

/// Reference to a registered plugin plus the options passed to it.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginRef {
    pub name: String,
    #[serde(default)]
    pub options: Json,
}

/// Hooks per phase, each an ordered sequence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MiddlewareSpec {
    pub pre: Vec<HookRef>,
    pub post: Vec<HookRef>,
}

/// Reference to a registered hook for one lifecycle event.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookRef {
    pub event: String,
    pub hook: String,
}

/// Accessor keys of a virtual field; either side is optional, and a virtual
/// with neither accessor is a no-op.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VirtualRef {
    pub get: Option<String>,
    pub set: Option<String>,
}

/// Resolves a discriminator definition against its parent.
///
/// Per-field strategy, instead of a generic recursive merge:
/// - `connection`: child wins when set, otherwise inherited.
/// - `extends`: cleared; the result is a resolved definition.
/// - `attributes`, `class_methods`, `instance_methods`, `virtuals`:
///   key-wise union, child wins per key.
/// - `middleware`: merged per phase, parent sequence first, then child's.
/// - `plugins`: keyed by plugin name; parent order is preserved, a child
///   entry replaces the same-named parent entry in place, new child plugins
///   are appended.
/// - `options`: taken from the parent. A discriminator shares the parent's
///   table, so table name, strictness and the discriminator key must stay
///   coherent with the already-registered parent schema.
#[must_use]
pub fn merge_definitions(parent: &ModelDefinition, child: &ModelDefinition) -> ModelDefinition {
    let mut merged = parent.clone();
    merged.extends = None;

    if !child.connection.is_empty() {
        merged.connection = child.connection.clone();
    }

    for (field, descriptor) in &child.attributes {
        merged.attributes.insert(field.clone(), descriptor.clone());
    }
    for (name, key) in &child.class_methods {
        merged.class_methods.insert(name.clone(), key.clone());
    }
    for (name, key) in &child.instance_methods {
        merged.instance_methods.insert(name.clone(), key.clone());
    }
    for (field, accessors) in &child.virtuals {
        merged.virtuals.insert(field.clone(), accessors.clone());
    }

    merged.middleware.pre.extend(child.middleware.pre.iter().cloned());
    merged.middleware.post.extend(child.middleware.post.iter().cloned());

    for plugin in &child.plugins {
        match merged.plugins.iter_mut().find(|existing| existing.name == plugin.name) {
            Some(existing) => *existing = plugin.clone(),
            None => merged.plugins.push(plugin.clone()),
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> ModelDefinition {
        let mut parent = ModelDefinition {
            connection: "main".to_owned(),
            ..ModelDefinition::default()
        };
        parent.attributes.insert("name".to_owned(), "string".to_owned());
        parent.attributes.insert("color".to_owned(), "string".to_owned());
        parent.class_methods.insert("speak".to_owned(), "parent_speak".to_owned());
        parent.plugins.push(PluginRef { name: "timestamps".to_owned(), options: Json::Null });
        parent.middleware.pre.push(HookRef { event: "save".to_owned(), hook: "a".to_owned() });
        parent
    }

    #[test]
    fn child_attributes_extend_and_override() {
        let mut child = ModelDefinition {
            extends: Some("bird".to_owned()),
            ..ModelDefinition::default()
        };
        child.attributes.insert("color".to_owned(), "int".to_owned());
        child.attributes.insert("wingspan".to_owned(), "int".to_owned());

        let merged = merge_definitions(&parent(), &child);
        assert!(merged.extends.is_none());
        assert_eq!(merged.connection, "main");
        assert_eq!(merged.attributes["name"], "string");
        assert_eq!(merged.attributes["color"], "int");
        assert_eq!(merged.attributes["wingspan"], "int");
    }

    #[test]
    fn middleware_sequences_concatenate_parent_first() {
        let mut child = ModelDefinition::default();
        child.middleware.pre.push(HookRef { event: "save".to_owned(), hook: "b".to_owned() });

        let merged = merge_definitions(&parent(), &child);
        let hooks: Vec<&str> = merged.middleware.pre.iter().map(|h| h.hook.as_str()).collect();
        assert_eq!(hooks, ["a", "b"]);
    }

    #[test]
    fn child_plugin_replaces_same_named_parent_entry_in_place() {
        let mut child = ModelDefinition::default();
        child.plugins.push(PluginRef {
            name: "timestamps".to_owned(),
            options: serde_json::json!({ "index": true }),
        });
        child.plugins.push(PluginRef { name: "audit".to_owned(), options: Json::Null });

        let merged = merge_definitions(&parent(), &child);
        assert_eq!(merged.plugins.len(), 2);
        assert_eq!(merged.plugins[0].name, "timestamps");
        assert_eq!(merged.plugins[0].options, serde_json::json!({ "index": true }));
        assert_eq!(merged.plugins[1].name, "audit");
    }

    #[test]
    fn connection_inherited_unless_child_sets_it() {
        let child = ModelDefinition::default();
        assert_eq!(merge_definitions(&parent(), &child).connection, "main");

        let child = ModelDefinition { connection: "other".to_owned(), ..Default::default() };
        assert_eq!(merge_definitions(&parent(), &child).connection, "other");
    }

    #[test]
    fn class_methods_union_child_wins() {
        let mut child = ModelDefinition::default();
        child.class_methods.insert("speak".to_owned(), "child_speak".to_owned());
        child.class_methods.insert("fly".to_owned(), "child_fly".to_owned());

        let merged = merge_definitions(&parent(), &child);
        assert_eq!(merged.class_methods["speak"], "child_speak");
        assert_eq!(merged.class_methods["fly"], "child_fly");
    }
}
