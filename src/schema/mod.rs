//! GraphQL schema composition
//!
//! Type fragments ([`SchemaRegistry`]) and resolver maps ([`ResolverRegistry`]) are built
//! independently by the caller and handed once to the [`Composer`], which produces an
//! immutable [`ExecutableSchema`].

mod composer;
mod document;
mod pubsub;
mod registry;
mod resolver;
mod scalars;
mod type_mapping;

pub use composer::{compose, Composer, ExecutableSchema};
pub use document::RootTypes;
pub use pubsub::PubSub;
pub use registry::{SchemaRegistry, TypeFragment};
pub use resolver::{
    Binding, FieldContext, FieldKey, RequestContext, Resolver, ResolverMap, ResolverRegistry,
    ResolverResult,
};
pub use scalars::{custom_scalar, is_builtin_scalar};
pub use type_mapping::{named_type, to_type_ref};
