//! Schema composer
//!
//! Merges type fragments and resolver maps into an [`ExecutableSchema`]. Composition
//! is a one-shot, deterministic transformation: concatenate, parse, validate the
//! resolver bindings, then bind everything into an async-graphql dynamic schema.

use crate::error::CompositionError;
use crate::schema::document::{
    DeclaredKind, DeclaredType, MergedDocument, ObjectDecl, RootTypes, TypeGraph,
};
use crate::schema::registry::{SchemaRegistry, TypeFragment};
use crate::schema::resolver::{
    create_field, create_subscription_field, FieldKey, RequestContext, Resolver, ResolverMap,
    ResolverRegistry,
};
use crate::schema::scalars::{custom_scalar, is_builtin_scalar};
use crate::schema::type_mapping::{named_type, to_input_value, to_type_ref, TypeShapes};

use async_graphql::dynamic::{
    Enum, EnumItem, InputObject, Interface, InterfaceField, Object, Schema, SchemaBuilder,
    Subscription, Union,
};
use async_graphql::{Request, Response};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// The validated, resolver-bound result of composition
///
/// Immutable once built; clones share the same underlying schema and can be handed
/// to any number of concurrent request handlers.
#[derive(Clone)]
pub struct ExecutableSchema {
    schema: Schema,
    merged_document: Arc<str>,
    type_names: Arc<[String]>,
    roots: RootTypes,
}

impl ExecutableSchema {
    /// Execute a query or mutation without request context
    pub async fn execute(&self, request: impl Into<Request>) -> Response {
        self.schema.execute(request.into()).await
    }

    /// Execute a query or mutation; `context` is visible to every resolver
    pub async fn execute_with_context(
        &self,
        request: impl Into<Request>,
        context: RequestContext,
    ) -> Response {
        self.schema.execute(request.into().data(context)).await
    }

    /// Execute a subscription, yielding one response per event
    pub fn execute_stream(
        &self,
        request: impl Into<Request>,
        context: RequestContext,
    ) -> BoxStream<'static, Response> {
        self.schema
            .execute_stream(request.into().data(context))
            .boxed()
    }

    /// SDL of the bound schema as the engine sees it
    pub fn sdl(&self) -> String {
        self.schema.sdl()
    }

    /// All fragments concatenated in registration order
    pub fn merged_document(&self) -> &str {
        &self.merged_document
    }

    /// Names of every declared type, in declaration order
    pub fn type_names(&self) -> &[String] {
        &self.type_names
    }

    pub fn root_types(&self) -> &RootTypes {
        &self.roots
    }

    /// The engine schema, for transports that drive it directly
    pub fn inner(&self) -> &Schema {
        &self.schema
    }
}

impl fmt::Debug for ExecutableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableSchema")
            .field("type_names", &self.type_names)
            .field("roots", &self.roots)
            .finish()
    }
}

/// Composition options
#[derive(Debug, Clone)]
pub struct Composer {
    root_value: Value,
}

impl Default for Composer {
    fn default() -> Self {
        Self {
            root_value: Value::Object(Map::new()),
        }
    }
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parent value of query and mutation root fields
    ///
    /// Root fields without a resolver resolve to the property of the same name.
    pub fn root_value(mut self, root_value: Value) -> Self {
        self.root_value = root_value;
        self
    }

    /// Compose fragments and resolver maps
    ///
    /// The maps are merged first; a field bound by two maps fails with
    /// [`CompositionError::DuplicateResolver`].
    pub fn compose(
        &self,
        fragments: &[TypeFragment],
        resolvers: impl IntoIterator<Item = ResolverMap>,
    ) -> Result<ExecutableSchema, CompositionError> {
        let mut registry = ResolverRegistry::new();
        for map in resolvers {
            if let Err(err) = registry.register(map) {
                tracing::error!("❌ Schema composition failed: {}", err);
                return Err(err);
            }
        }
        self.compose_fragments(fragments, &registry)
    }

    /// Compose from caller-built registries
    pub fn compose_registries(
        &self,
        schema: &SchemaRegistry,
        resolvers: &ResolverRegistry,
    ) -> Result<ExecutableSchema, CompositionError> {
        self.compose_fragments(schema.fragments(), resolvers)
    }

    fn compose_fragments(
        &self,
        fragments: &[TypeFragment],
        resolvers: &ResolverRegistry,
    ) -> Result<ExecutableSchema, CompositionError> {
        tracing::info!(
            "🔧 Composing schema from {} fragment(s) and {} resolver(s)",
            fragments.len(),
            resolvers.len()
        );

        let result = self.try_compose(fragments, resolvers);
        match &result {
            Ok(schema) => tracing::info!(
                "✅ Schema composed with {} type(s)",
                schema.type_names().len()
            ),
            Err(err) => tracing::error!("❌ Schema composition failed: {}", err),
        }
        result
    }

    fn try_compose(
        &self,
        fragments: &[TypeFragment],
        resolvers: &ResolverRegistry,
    ) -> Result<ExecutableSchema, CompositionError> {
        let merged = MergedDocument::concatenate(fragments);
        let graph = TypeGraph::parse(&merged, fragments)?;

        if graph.object_fields(&graph.roots.query).is_none() {
            return Err(CompositionError::MissingQueryRoot(graph.roots.query.clone()));
        }

        validate_type_references(&graph)?;

        let shapes = TypeShapes::from_graph(&graph);
        validate_resolvers(&graph, resolvers, &shapes, &self.root_value)?;

        let schema = bind(&graph, resolvers, shapes, &self.root_value)?;

        Ok(ExecutableSchema {
            schema,
            merged_document: Arc::from(merged.text()),
            type_names: graph.types.keys().cloned().collect(),
            roots: graph.roots,
        })
    }
}

/// Compose with default options (empty root value)
pub fn compose(
    fragments: &[TypeFragment],
    resolvers: impl IntoIterator<Item = ResolverMap>,
) -> Result<ExecutableSchema, CompositionError> {
    Composer::new().compose(fragments, resolvers)
}

/// Every named type used by a field, argument, member or interface must be declared
fn validate_type_references(graph: &TypeGraph) -> Result<(), CompositionError> {
    let check = |name: &str, referenced_by: String, origin: &str| {
        if is_builtin_scalar(name) || graph.types.contains_key(name) {
            Ok(())
        } else {
            Err(CompositionError::UnknownType {
                name: name.to_string(),
                referenced_by,
                origin: origin.to_string(),
            })
        }
    };

    for declared in graph.types.values() {
        let type_name = &declared.name;
        match &declared.kind {
            DeclaredKind::Object(object) | DeclaredKind::Interface(object) => {
                for interface in &object.implements {
                    check(interface, type_name.clone(), &declared.origin)?;
                }
                for field in object.fields.values() {
                    let referenced_by = format!("{}.{}", type_name, field.name);
                    check(named_type(&field.ty), referenced_by.clone(), &field.origin)?;
                    for arg in &field.arguments {
                        check(
                            named_type(&arg.ty),
                            format!("{}({})", referenced_by, arg.name),
                            &field.origin,
                        )?;
                    }
                }
            }
            DeclaredKind::Union(members) => {
                for member in members {
                    check(member, type_name.clone(), &declared.origin)?;
                }
            }
            DeclaredKind::InputObject(fields) => {
                for field in fields {
                    check(
                        named_type(&field.ty),
                        format!("{}.{}", type_name, field.name),
                        &declared.origin,
                    )?;
                }
            }
            DeclaredKind::Scalar | DeclaredKind::Enum(_) => {}
        }
    }

    Ok(())
}

/// Check every binding against the type graph and every root field for a resolver
fn validate_resolvers(
    graph: &TypeGraph,
    resolvers: &ResolverRegistry,
    shapes: &TypeShapes,
    root_value: &Value,
) -> Result<(), CompositionError> {
    let subscription_root = graph.roots.subscription.as_deref();

    for (key, binding) in resolvers.iter() {
        let declared = graph
            .object_fields(key.type_name())
            .is_some_and(|fields| fields.contains_key(key.field_name()));

        if !declared {
            return Err(CompositionError::OrphanResolver {
                type_name: key.type_name().to_string(),
                field_name: key.field_name().to_string(),
                origin: binding.origin.clone(),
            });
        }

        let on_subscription_root = subscription_root == Some(key.type_name());
        let reason = match (&binding.resolver, on_subscription_root) {
            (Resolver::Stream(_), false) => {
                Some("stream resolvers can only be bound on the subscription root")
            }
            (Resolver::Value(_), true) => Some("subscription fields need a stream resolver"),
            _ => None,
        };

        if let Some(reason) = reason {
            return Err(CompositionError::MismatchedResolver {
                type_name: key.type_name().to_string(),
                field_name: key.field_name().to_string(),
                reason: reason.to_string(),
            });
        }
    }

    let value_roots = [Some(graph.roots.query.as_str()), graph.roots.mutation.as_deref()];
    for root in value_roots.into_iter().flatten() {
        let Some(fields) = graph.object_fields(root) else {
            continue;
        };

        for field in fields.values() {
            let bound = resolvers.get(&FieldKey::new(root, &field.name)).is_some();
            let on_root_value = root_value.get(&field.name).is_some();

            if !bound && !on_root_value && !shapes.is_leaf(&field.ty) {
                return Err(unresolved(root, &field.name, &field.origin));
            }
        }
    }

    if let Some(root) = subscription_root {
        if let Some(fields) = graph.object_fields(root) {
            for field in fields.values() {
                if resolvers.get(&FieldKey::new(root, &field.name)).is_none() {
                    return Err(unresolved(root, &field.name, &field.origin));
                }
            }
        }
    }

    Ok(())
}

fn unresolved(type_name: &str, field_name: &str, origin: &str) -> CompositionError {
    CompositionError::UnresolvedField {
        type_name: type_name.to_string(),
        field_name: field_name.to_string(),
        origin: origin.to_string(),
    }
}

/// Bind the validated type graph and resolvers into an engine schema
fn bind(
    graph: &TypeGraph,
    resolvers: &ResolverRegistry,
    shapes: TypeShapes,
    root_value: &Value,
) -> Result<Schema, CompositionError> {
    let shapes = Arc::new(shapes);
    let root = Arc::new(root_value.clone());
    let roots = &graph.roots;

    let mut builder = Schema::build(
        &roots.query,
        roots.mutation.as_deref(),
        roots.subscription.as_deref(),
    );

    for declared in graph.types.values() {
        tracing::debug!("Binding type {} from {}", declared.name, declared.origin);
        builder = bind_type(builder, declared, graph, resolvers, &shapes, &root);
    }

    builder
        .finish()
        .map_err(|e| CompositionError::Invalid(e.to_string()))
}

fn bind_type(
    builder: SchemaBuilder,
    declared: &DeclaredType,
    graph: &TypeGraph,
    resolvers: &ResolverRegistry,
    shapes: &Arc<TypeShapes>,
    root: &Arc<Value>,
) -> SchemaBuilder {
    let name = declared.name.as_str();
    let description = declared.description.as_deref();

    match &declared.kind {
        DeclaredKind::Scalar if is_builtin_scalar(name) => builder,
        DeclaredKind::Scalar => builder.register(custom_scalar(name, description)),
        DeclaredKind::Object(object) if graph.roots.subscription.as_deref() == Some(name) => {
            builder.register(bind_subscription(name, description, object, resolvers, shapes, root))
        }
        DeclaredKind::Object(object) => {
            let root = graph.roots.is_root(name).then(|| root.clone());
            builder.register(bind_object(name, description, object, resolvers, shapes, root))
        }
        DeclaredKind::Interface(interface) => {
            let mut bound = Interface::new(name);
            for implemented in &interface.implements {
                bound = bound.implement(implemented);
            }
            for field in interface.fields.values() {
                let mut interface_field =
                    InterfaceField::new(field.name.clone(), to_type_ref(&field.ty));
                for arg in &field.arguments {
                    interface_field = interface_field.argument(to_input_value(arg));
                }
                if let Some(desc) = &field.description {
                    interface_field = interface_field.description(desc);
                }
                bound = bound.field(interface_field);
            }
            if let Some(desc) = description {
                bound = bound.description(desc);
            }
            builder.register(bound)
        }
        DeclaredKind::Union(members) => {
            let mut bound = Union::new(name);
            for member in members {
                bound = bound.possible_type(member);
            }
            if let Some(desc) = description {
                bound = bound.description(desc);
            }
            builder.register(bound)
        }
        DeclaredKind::Enum(values) => {
            let mut bound = Enum::new(name);
            for value in values {
                let mut item = EnumItem::new(value.name.clone());
                if let Some(desc) = &value.description {
                    item = item.description(desc);
                }
                bound = bound.item(item);
            }
            if let Some(desc) = description {
                bound = bound.description(desc);
            }
            builder.register(bound)
        }
        DeclaredKind::InputObject(fields) => {
            let mut bound = InputObject::new(name);
            for field in fields {
                bound = bound.field(to_input_value(field));
            }
            if let Some(desc) = description {
                bound = bound.description(desc);
            }
            builder.register(bound)
        }
    }
}

fn bind_object(
    name: &str,
    description: Option<&str>,
    object: &ObjectDecl,
    resolvers: &ResolverRegistry,
    shapes: &Arc<TypeShapes>,
    root: Option<Arc<Value>>,
) -> Object {
    let mut bound = Object::new(name);
    for implemented in &object.implements {
        bound = bound.implement(implemented);
    }

    for field in object.fields.values() {
        let resolver = resolvers
            .get(&FieldKey::new(name, &field.name))
            .map(|binding| binding.resolver.clone());
        bound = bound.field(create_field(name, field, resolver, root.clone(), shapes.clone()));
    }

    if let Some(desc) = description {
        bound = bound.description(desc);
    }
    bound
}

fn bind_subscription(
    name: &str,
    description: Option<&str>,
    object: &ObjectDecl,
    resolvers: &ResolverRegistry,
    shapes: &Arc<TypeShapes>,
    root: &Arc<Value>,
) -> Subscription {
    let mut bound = Subscription::new(name);

    for field in object.fields.values() {
        // Validation guarantees every subscription field has a stream resolver
        if let Some(Resolver::Stream(resolve)) = resolvers
            .get(&FieldKey::new(name, &field.name))
            .map(|binding| &binding.resolver)
        {
            bound = bound.field(create_subscription_field(
                name,
                field,
                resolve.clone(),
                root.clone(),
                shapes.clone(),
            ));
        }
    }

    if let Some(desc) = description {
        bound = bound.description(desc);
    }
    bound
}
