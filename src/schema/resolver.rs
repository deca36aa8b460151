//! Resolver maps, the resolver registry, and resolver binding
//!
//! A [`ResolverMap`] is an explicit list of `(Type, field) -> Resolver` bindings built by
//! the caller. Maps are merged in a [`ResolverRegistry`], which refuses to bind the
//! same field twice. At composition time each declared field is turned into a
//! dynamic-schema field whose resolver either calls the bound function or falls back to
//! a property lookup on the parent value.

use crate::error::CompositionError;
use crate::schema::document::FieldDecl;
use crate::schema::type_mapping::{to_input_value, to_type_ref, TypeShapes};

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, ResolverContext, SubscriptionField, SubscriptionFieldFuture,
};
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::{FutureExt, Stream, StreamExt};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

/// Result type returned by resolver functions
pub type ResolverResult = async_graphql::Result<Value>;

type ValueFn = dyn Fn(FieldContext) -> BoxFuture<'static, ResolverResult> + Send + Sync;
type StreamFn = dyn Fn(FieldContext) -> BoxStream<'static, ResolverResult> + Send + Sync;

/// A `Type.field` coordinate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey {
    type_name: String,
    field_name: String,
}

impl FieldKey {
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.field_name)
    }
}

fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl FromStr for FieldKey {
    type Err = String;

    /// Parse `Type.field`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (type_name, field_name) = s
            .split_once('.')
            .ok_or_else(|| format!("'{}' must be in format 'Type.field'", s))?;

        if !is_graphql_name(type_name) || !is_graphql_name(field_name) {
            return Err(format!(
                "'{}' must be two GraphQL names joined by '.' (e.g. 'Query.getAuthors')",
                s
            ));
        }

        Ok(Self::new(type_name, field_name))
    }
}

/// Read-only per-request values visible to every resolver
///
/// The HTTP server stores the request headers under `headers`.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    values: Arc<Map<String, Value>>,
}

impl RequestContext {
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            values: Arc::new(values),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Look up a request header (names are stored lowercase)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.values
            .get("headers")?
            .get(name.to_ascii_lowercase())?
            .as_str()
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

impl From<Map<String, Value>> for RequestContext {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

/// Everything a resolver sees about the field being resolved
#[derive(Debug, Clone)]
pub struct FieldContext {
    /// The field being resolved
    pub key: FieldKey,
    /// Parent object; the root value for fields of root types
    pub parent: Value,
    /// Field arguments with declared defaults applied
    pub args: Map<String, Value>,
    pub context: RequestContext,
}

impl FieldContext {
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    fn from_resolver(
        ctx: &ResolverContext<'_>,
        key: FieldKey,
        parent: Value,
    ) -> async_graphql::Result<Self> {
        let mut args = Map::new();
        for (name, value) in ctx.args.iter() {
            args.insert(name.to_string(), value.as_value().clone().into_json()?);
        }

        let context = ctx.data_opt::<RequestContext>().cloned().unwrap_or_default();

        Ok(Self {
            key,
            parent,
            args,
            context,
        })
    }
}

/// A function bound to one field
#[derive(Clone)]
pub enum Resolver {
    /// Produces one value per request (queries, mutations, object fields)
    Value(Arc<ValueFn>),
    /// Produces a stream of values (subscription root fields)
    Stream(Arc<StreamFn>),
}

impl Resolver {
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(FieldContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        Resolver::Value(Arc::new(move |ctx| f(ctx).boxed()))
    }

    /// A resolver that always returns the same value
    pub fn constant(value: Value) -> Self {
        Self::from_fn(move |_ctx| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    pub fn from_stream<F, S>(f: F) -> Self
    where
        F: Fn(FieldContext) -> S + Send + Sync + 'static,
        S: Stream<Item = ResolverResult> + Send + 'static,
    {
        Resolver::Stream(Arc::new(move |ctx| f(ctx).boxed()))
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Resolver::Stream(_))
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::Value(_) => f.write_str("Resolver::Value"),
            Resolver::Stream(_) => f.write_str("Resolver::Stream"),
        }
    }
}

/// Bindings from declared fields to resolvers, authored as one unit
#[derive(Debug, Clone)]
pub struct ResolverMap {
    origin: String,
    entries: Vec<(FieldKey, Resolver)>,
}

impl ResolverMap {
    /// # Arguments
    ///
    /// * `origin` - Name used in duplicate/orphan error messages
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            entries: Vec::new(),
        }
    }

    pub fn insert(mut self, key: FieldKey, resolver: Resolver) -> Self {
        self.entries.push((key, resolver));
        self
    }

    /// Bind an async function to `type_name.field_name`
    pub fn field<F, Fut>(self, type_name: &str, field_name: &str, f: F) -> Self
    where
        F: Fn(FieldContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        self.insert(FieldKey::new(type_name, field_name), Resolver::from_fn(f))
    }

    /// Bind a constant value to `type_name.field_name`
    pub fn value(self, type_name: &str, field_name: &str, value: Value) -> Self {
        self.insert(FieldKey::new(type_name, field_name), Resolver::constant(value))
    }

    /// Bind a stream of values to a subscription field
    pub fn subscription<F, S>(self, type_name: &str, field_name: &str, f: F) -> Self
    where
        F: Fn(FieldContext) -> S + Send + Sync + 'static,
        S: Stream<Item = ResolverResult> + Send + 'static,
    {
        self.insert(
            FieldKey::new(type_name, field_name),
            Resolver::from_stream(f),
        )
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn entries(&self) -> &[(FieldKey, Resolver)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A resolver together with the map that bound it
#[derive(Debug, Clone)]
pub struct Binding {
    pub resolver: Resolver,
    pub origin: String,
}

/// Merged resolver maps; every field is bound at most once
#[derive(Debug, Clone, Default)]
pub struct ResolverRegistry {
    bindings: IndexMap<FieldKey, Binding>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a resolver map
    ///
    /// Fails with [`CompositionError::DuplicateResolver`] if any field of the map is
    /// already bound, or bound twice within the map. Nothing is bound on failure.
    pub fn register(&mut self, map: ResolverMap) -> Result<(), CompositionError> {
        let mut seen = HashSet::new();

        for (key, _) in map.entries() {
            let first = match self.bindings.get(key) {
                Some(existing) => Some(existing.origin.clone()),
                None if !seen.insert(key) => Some(map.origin().to_string()),
                None => None,
            };

            if let Some(first) = first {
                return Err(CompositionError::DuplicateResolver {
                    type_name: key.type_name().to_string(),
                    field_name: key.field_name().to_string(),
                    first,
                    second: map.origin().to_string(),
                });
            }
        }

        tracing::debug!(
            "Registered {} resolver(s) from {}",
            map.len(),
            map.origin()
        );

        let ResolverMap { origin, entries } = map;
        for (key, resolver) in entries {
            self.bindings.insert(
                key,
                Binding {
                    resolver,
                    origin: origin.clone(),
                },
            );
        }

        Ok(())
    }

    pub fn get(&self, key: &FieldKey) -> Option<&Binding> {
        self.bindings.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &Binding)> {
        self.bindings.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.bindings.keys()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Create the engine field for a declared object field
///
/// # Arguments
///
/// * `owner` - Name of the object type declaring the field
/// * `field` - The declared field
/// * `resolver` - Bound value resolver, if any
/// * `root` - The root value when `owner` is a query or mutation root
/// * `shapes` - Shapes of all declared types, for result conversion
///
/// Without a bound resolver the field resolves to the property of the same name on
/// the parent (or root) value.
pub(crate) fn create_field(
    owner: &str,
    field: &FieldDecl,
    resolver: Option<Resolver>,
    root: Option<Arc<Value>>,
    shapes: Arc<TypeShapes>,
) -> Field {
    let key = FieldKey::new(owner, &field.name);
    let ty = field.ty.clone();
    let resolve = match resolver {
        Some(Resolver::Value(resolve)) => Some(resolve),
        _ => None,
    };

    let mut graphql_field = Field::new(field.name.clone(), to_type_ref(&field.ty), move |ctx| {
        let key = key.clone();
        let ty = ty.clone();
        let resolve = resolve.clone();
        let root = root.clone();
        let shapes = shapes.clone();

        FieldFuture::new(async move {
            let value = match resolve {
                Some(resolve) => {
                    let parent = match &root {
                        Some(root) => root.as_ref().clone(),
                        None => ctx.parent_value.try_downcast_ref::<Value>()?.clone(),
                    };
                    let field_ctx = FieldContext::from_resolver(&ctx, key.clone(), parent)?;
                    (*resolve)(field_ctx).await.map_err(|err| {
                        tracing::debug!("Resolver for {} failed: {}", key, err.message);
                        err
                    })?
                }
                None => {
                    let parent = match &root {
                        Some(root) => root.as_ref(),
                        None => ctx.parent_value.try_downcast_ref::<Value>()?,
                    };
                    parent.get(key.field_name()).cloned().unwrap_or(Value::Null)
                }
            };

            shapes.to_field_value(&ty, value)
        })
    });

    for arg in &field.arguments {
        graphql_field = graphql_field.argument(to_input_value(arg));
    }
    if let Some(desc) = &field.description {
        graphql_field = graphql_field.description(desc);
    }
    if let Some(reason) = &field.deprecation {
        graphql_field = graphql_field.deprecation(Some(reason.as_str()));
    }

    graphql_field
}

/// Create the engine field for a subscription root field
pub(crate) fn create_subscription_field(
    owner: &str,
    field: &FieldDecl,
    resolver: Arc<StreamFn>,
    root: Arc<Value>,
    shapes: Arc<TypeShapes>,
) -> SubscriptionField {
    let key = FieldKey::new(owner, &field.name);
    let ty = field.ty.clone();

    let mut subscription_field =
        SubscriptionField::new(field.name.clone(), to_type_ref(&field.ty), move |ctx| {
            let key = key.clone();
            let ty = ty.clone();
            let resolver = resolver.clone();
            let root = root.clone();
            let shapes = shapes.clone();

            SubscriptionFieldFuture::new(async move {
                let field_ctx = FieldContext::from_resolver(&ctx, key, root.as_ref().clone())?;
                let stream = (*resolver)(field_ctx);

                Ok(stream.map(move |item| {
                    item.and_then(|value| shapes.to_field_value(&ty, value))
                        .map(|value| value.unwrap_or(FieldValue::NULL))
                }))
            })
        });

    for arg in &field.arguments {
        subscription_field = subscription_field.argument(to_input_value(arg));
    }
    if let Some(desc) = &field.description {
        subscription_field = subscription_field.description(desc);
    }

    subscription_field
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_key_parse() {
        let key: FieldKey = "Query.getAuthors".parse().unwrap();
        assert_eq!(key.type_name(), "Query");
        assert_eq!(key.field_name(), "getAuthors");
        assert_eq!(key.to_string(), "Query.getAuthors");
    }

    #[test]
    fn test_field_key_parse_invalid() {
        assert!("getAuthors".parse::<FieldKey>().is_err());
        assert!("Query.".parse::<FieldKey>().is_err());
        assert!("Query.get-authors".parse::<FieldKey>().is_err());
        assert!("1Query.a".parse::<FieldKey>().is_err());
    }

    #[test]
    fn test_register_disjoint_maps() {
        let mut registry = ResolverRegistry::new();
        registry
            .register(ResolverMap::new("authors").value("Query", "getAuthors", json!([])))
            .unwrap();
        registry
            .register(ResolverMap::new("books").value("Query", "getBooks", json!([])))
            .unwrap();

        let keys: Vec<String> = registry.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["Query.getAuthors", "Query.getBooks"]);
        assert_eq!(
            registry
                .get(&FieldKey::new("Query", "getBooks"))
                .unwrap()
                .origin,
            "books"
        );
    }

    #[test]
    fn test_duplicate_across_maps() {
        let mut registry = ResolverRegistry::new();
        registry
            .register(ResolverMap::new("first").value("Query", "getAuthors", json!([])))
            .unwrap();

        let err = registry
            .register(
                ResolverMap::new("second")
                    .value("Query", "other", json!(1))
                    .value("Query", "getAuthors", json!([])),
            )
            .unwrap_err();

        assert_eq!(
            err,
            CompositionError::DuplicateResolver {
                type_name: "Query".to_string(),
                field_name: "getAuthors".to_string(),
                first: "first".to_string(),
                second: "second".to_string(),
            }
        );
        // The failed map bound nothing
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&FieldKey::new("Query", "other")).is_none());
    }

    #[test]
    fn test_duplicate_within_map() {
        let mut registry = ResolverRegistry::new();
        let result = registry.register(
            ResolverMap::new("twice")
                .value("Query", "getAuthors", json!([]))
                .value("Query", "getAuthors", json!([])),
        );

        assert!(matches!(
            result,
            Err(CompositionError::DuplicateResolver { .. })
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_constant_resolver() {
        let resolver = Resolver::constant(json!({ "a": 1 }));
        let ctx = FieldContext {
            key: FieldKey::new("Query", "a"),
            parent: Value::Null,
            args: Map::new(),
            context: RequestContext::default(),
        };

        match resolver {
            Resolver::Value(resolve) => {
                assert_eq!((*resolve)(ctx).await.unwrap(), json!({ "a": 1 }));
            }
            Resolver::Stream(_) => panic!("Expected a value resolver"),
        }
    }

    #[test]
    fn test_request_context_header() {
        let mut values = Map::new();
        values.insert(
            "headers".to_string(),
            json!({ "authorization": "Bearer token" }),
        );
        let ctx = RequestContext::from(values);

        assert_eq!(ctx.header("Authorization"), Some("Bearer token"));
        assert_eq!(ctx.header("x-missing"), None);
    }
}
