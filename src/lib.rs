pub mod config;
pub mod error;
pub mod schema;

// Re-export commonly used types
pub use config::{Config, ResolverConfig, SchemaConfig, ServerConfig};
pub use error::{CompositionError, Result, WeaveError};
pub use schema::{
    compose, Composer, ExecutableSchema, FieldContext, PubSub, RequestContext, ResolverMap,
    ResolverRegistry, SchemaRegistry, TypeFragment,
};
