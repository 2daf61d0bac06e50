//! # Model Infrastructure
//!
//! Turns per-model definition files into compiled, connection-bound model
//! handles:
//!
//! - [`ModelDefinition`] — the declarative shape read from one file
//!   (attributes, options, extension references, optional `extends`).
//! - [`SchemaBuilder`] — translates one resolved definition into a
//!   [`Schema`], applying extension points in a fixed order.
//! - [`ModelRegistry`] — orchestrates the two-pass load (base models, then
//!   discriminators) and owns the compiled [`Model`] handles.
//!
//! Discriminators (`extends = "parent"`) share the parent's table and
//! connection; their definition is resolved by a per-field merge with the
//! parent before building, and their records are distinguished by a
//! discriminator key stamped on every create.

mod definition;
mod error;
mod extensions;
mod loader;
mod model;
mod registry;
mod schema;

pub use definition::{
    HookRef, MiddlewareSpec, ModelDefinition, PluginRef, SchemaOptions, VirtualRef,
    merge_definitions,
};
pub use error::{ModelError, ModelErrorExt};
pub use extensions::{
    ClassMethodFn, Extensions, GetterFn, HookOutcome, InstanceMethodFn, PluginFn, PostHookFn,
    PreHookFn, SetterFn,
};
pub use model::{Discriminator, Instance, Model};
pub use registry::ModelRegistry;
pub use schema::{Schema, SchemaBuilder, SchemaDraft};
