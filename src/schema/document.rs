//! Fragment concatenation and type graph construction
//!
//! Fragments are joined into one SDL document in registration order, parsed with
//! async-graphql's SDL parser, and folded into a [`TypeGraph`]: every declared type
//! keyed by name, with `extend` definitions merged into their base declaration.

use crate::error::CompositionError;
use crate::schema::registry::TypeFragment;

use async_graphql::parser::types::{
    ConstDirective, FieldDefinition, InputValueDefinition, ServiceDocument, Type, TypeDefinition,
    TypeKind, TypeSystemDefinition,
};
use async_graphql::parser::{parse_schema, Positioned};
use async_graphql::Value as ConstValue;
use indexmap::IndexMap;

/// Lines of the merged document contributed by one fragment
#[derive(Debug, Clone)]
struct FragmentSpan {
    origin: String,
    first_line: usize,
    line_count: usize,
}

/// All fragments joined into one SDL document
#[derive(Debug, Clone)]
pub(crate) struct MergedDocument {
    text: String,
    spans: Vec<FragmentSpan>,
}

impl MergedDocument {
    /// Join fragments in order, each terminated by a newline
    pub(crate) fn concatenate(fragments: &[TypeFragment]) -> Self {
        let mut text = String::new();
        let mut spans = Vec::with_capacity(fragments.len());
        let mut next_line = 1;

        for fragment in fragments {
            let source = fragment.source();
            let line_count = source.lines().count().max(1);

            spans.push(FragmentSpan {
                origin: fragment.origin().to_string(),
                first_line: next_line,
                line_count,
            });

            text.push_str(source);
            if !source.ends_with('\n') {
                text.push('\n');
            }
            next_line += line_count;
        }

        Self { text, spans }
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    /// Map a 1-based line of the merged document to (fragment origin, fragment-relative line)
    ///
    /// Lines past the end of a fragment (EOF errors) are attributed to the last fragment
    /// starting at or before them.
    pub(crate) fn locate(&self, line: usize) -> (&str, usize) {
        match self.spans.iter().rev().find(|span| span.first_line <= line) {
            Some(span) => {
                let relative = (line - span.first_line + 1).min(span.line_count + 1);
                (span.origin.as_str(), relative)
            }
            None => ("<empty document>", line),
        }
    }
}

/// Names of the operation root types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootTypes {
    pub query: String,
    pub mutation: Option<String>,
    pub subscription: Option<String>,
}

impl RootTypes {
    pub fn is_root(&self, type_name: &str) -> bool {
        self.query == type_name
            || self.mutation.as_deref() == Some(type_name)
            || self.subscription.as_deref() == Some(type_name)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct InputDecl {
    pub name: String,
    pub description: Option<String>,
    pub ty: Type,
    pub default_value: Option<ConstValue>,
}

#[derive(Debug, Clone)]
pub(crate) struct FieldDecl {
    pub name: String,
    pub description: Option<String>,
    pub ty: Type,
    pub arguments: Vec<InputDecl>,
    pub deprecation: Option<String>,
    pub origin: String,
}

#[derive(Debug, Clone)]
pub(crate) struct EnumValueDecl {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectDecl {
    pub implements: Vec<String>,
    pub fields: IndexMap<String, FieldDecl>,
}

#[derive(Debug, Clone)]
pub(crate) enum DeclaredKind {
    Scalar,
    Object(ObjectDecl),
    Interface(ObjectDecl),
    Union(Vec<String>),
    Enum(Vec<EnumValueDecl>),
    InputObject(Vec<InputDecl>),
}

#[derive(Debug, Clone)]
pub(crate) struct DeclaredType {
    pub name: String,
    pub origin: String,
    pub description: Option<String>,
    pub kind: DeclaredKind,
}

/// Every type declared across all fragments, in declaration order
#[derive(Debug, Clone)]
pub(crate) struct TypeGraph {
    pub types: IndexMap<String, DeclaredType>,
    pub roots: RootTypes,
}

impl TypeGraph {
    /// Parse the merged document and build the type graph
    pub(crate) fn parse(
        merged: &MergedDocument,
        fragments: &[TypeFragment],
    ) -> Result<Self, CompositionError> {
        if !has_definitions(merged.text()) {
            return Ok(Self {
                types: IndexMap::new(),
                roots: default_roots(&IndexMap::new()),
            });
        }

        let document = parse_schema(merged.text())
            .map_err(|err| pinpoint_parse_error(merged, fragments, &err))?;

        Self::build(document, merged)
    }

    fn build(document: ServiceDocument, merged: &MergedDocument) -> Result<Self, CompositionError> {
        let mut types: IndexMap<String, DeclaredType> = IndexMap::new();
        let mut extensions = Vec::new();
        let mut query_root = None;
        let mut mutation_root = None;
        let mut subscription_root = None;

        for definition in document.definitions {
            match definition {
                TypeSystemDefinition::Type(definition) => {
                    let origin = merged.locate(definition.pos.line).0.to_string();
                    let definition = definition.node;

                    if definition.extend {
                        extensions.push((origin, definition));
                        continue;
                    }

                    let declared = declare_type(definition, &origin)?;
                    if let Some(existing) = types.get(&declared.name) {
                        return Err(CompositionError::DuplicateType {
                            name: declared.name,
                            first: existing.origin.clone(),
                            second: origin,
                        });
                    }
                    tracing::debug!("Declared type {} from {}", declared.name, origin);
                    types.insert(declared.name.clone(), declared);
                }
                TypeSystemDefinition::Schema(schema) => {
                    let schema = schema.node;
                    if let Some(query) = schema.query {
                        query_root = Some(query.node.to_string());
                    }
                    if let Some(mutation) = schema.mutation {
                        mutation_root = Some(mutation.node.to_string());
                    }
                    if let Some(subscription) = schema.subscription {
                        subscription_root = Some(subscription.node.to_string());
                    }
                }
                TypeSystemDefinition::Directive(directive) => {
                    tracing::debug!(
                        "Ignoring directive definition @{}",
                        directive.node.name.node
                    );
                }
            }
        }

        for (origin, extension) in extensions {
            apply_extension(&mut types, extension, &origin)?;
        }

        let defaults = default_roots(&types);
        let roots = RootTypes {
            query: query_root.unwrap_or(defaults.query),
            mutation: mutation_root.or(defaults.mutation),
            subscription: subscription_root.or(defaults.subscription),
        };

        Ok(Self { types, roots })
    }

    /// Fields of an object type; `None` for anything that is not an object
    pub(crate) fn object_fields(&self, type_name: &str) -> Option<&IndexMap<String, FieldDecl>> {
        match self.types.get(type_name).map(|declared| &declared.kind) {
            Some(DeclaredKind::Object(object)) => Some(&object.fields),
            _ => None,
        }
    }
}

fn default_roots(types: &IndexMap<String, DeclaredType>) -> RootTypes {
    RootTypes {
        query: "Query".to_string(),
        mutation: types.contains_key("Mutation").then(|| "Mutation".to_string()),
        subscription: types
            .contains_key("Subscription")
            .then(|| "Subscription".to_string()),
    }
}

/// Whether SDL text holds anything besides whitespace and `#` comments
fn has_definitions(source: &str) -> bool {
    source.lines().any(|line| {
        let line = line.trim_start_matches(|c: char| c.is_whitespace() || c == ',' || c == '\u{feff}');
        !line.is_empty() && !line.starts_with('#')
    })
}

/// Find the fragment responsible for a parse failure of the merged document
///
/// A fragment with an unbalanced brace can make the parser fail inside the *next*
/// fragment, so fragments are first re-parsed on their own.
fn pinpoint_parse_error(
    merged: &MergedDocument,
    fragments: &[TypeFragment],
    err: &async_graphql::parser::Error,
) -> CompositionError {
    for fragment in fragments {
        // Comment-only fragments never parse alone but are never at fault
        if !has_definitions(fragment.source()) {
            continue;
        }
        if let Err(fragment_err) = parse_schema(fragment.source()) {
            let (line, column) = fragment_err
                .positions()
                .next()
                .map(|pos| (pos.line, pos.column))
                .unwrap_or((0, 0));
            return CompositionError::SchemaParse {
                origin: fragment.origin().to_string(),
                line,
                column,
                message: fragment_err.to_string(),
            };
        }
    }

    let (origin, line, column) = match err.positions().next() {
        Some(pos) => {
            let (origin, line) = merged.locate(pos.line);
            (origin.to_string(), line, pos.column)
        }
        None => ("<merged document>".to_string(), 0, 0),
    };

    CompositionError::SchemaParse {
        origin,
        line,
        column,
        message: err.to_string(),
    }
}

fn declare_type(definition: TypeDefinition, origin: &str) -> Result<DeclaredType, CompositionError> {
    let name = definition.name.node.to_string();
    let description = definition.description.map(|d| d.node);

    let kind = match definition.kind {
        TypeKind::Scalar => DeclaredKind::Scalar,
        TypeKind::Object(object) => {
            let mut decl = ObjectDecl::default();
            extend_object(&mut decl, &name, object.implements, object.fields, origin)?;
            DeclaredKind::Object(decl)
        }
        TypeKind::Interface(interface) => {
            let mut decl = ObjectDecl::default();
            extend_object(&mut decl, &name, interface.implements, interface.fields, origin)?;
            DeclaredKind::Interface(decl)
        }
        TypeKind::Union(union) => {
            let mut members = Vec::new();
            extend_names(&mut members, &name, union.members, origin)?;
            DeclaredKind::Union(members)
        }
        TypeKind::Enum(enum_type) => {
            let mut values = Vec::new();
            extend_enum(&mut values, &name, enum_type.values, origin)?;
            DeclaredKind::Enum(values)
        }
        TypeKind::InputObject(input) => {
            let mut fields = Vec::new();
            extend_inputs(&mut fields, &name, input.fields, origin)?;
            DeclaredKind::InputObject(fields)
        }
    };

    Ok(DeclaredType {
        name,
        origin: origin.to_string(),
        description,
        kind,
    })
}

fn apply_extension(
    types: &mut IndexMap<String, DeclaredType>,
    extension: TypeDefinition,
    origin: &str,
) -> Result<(), CompositionError> {
    let name = extension.name.node.to_string();
    let unknown = || CompositionError::UnknownExtension {
        name: name.clone(),
        origin: origin.to_string(),
    };

    let declared = types.get_mut(&name).ok_or_else(unknown)?;

    match (&mut declared.kind, extension.kind) {
        (DeclaredKind::Scalar, TypeKind::Scalar) => {}
        (DeclaredKind::Object(decl), TypeKind::Object(object)) => {
            extend_object(decl, &name, object.implements, object.fields, origin)?;
        }
        (DeclaredKind::Interface(decl), TypeKind::Interface(interface)) => {
            extend_object(decl, &name, interface.implements, interface.fields, origin)?;
        }
        (DeclaredKind::Union(members), TypeKind::Union(union)) => {
            extend_names(members, &name, union.members, origin)?;
        }
        (DeclaredKind::Enum(values), TypeKind::Enum(enum_type)) => {
            extend_enum(values, &name, enum_type.values, origin)?;
        }
        (DeclaredKind::InputObject(fields), TypeKind::InputObject(input)) => {
            extend_inputs(fields, &name, input.fields, origin)?;
        }
        _ => return Err(unknown()),
    }

    tracing::debug!("Extended type {} from {}", name, origin);
    Ok(())
}

fn duplicate(type_name: &str, field_name: &str, origin: &str) -> CompositionError {
    CompositionError::DuplicateField {
        type_name: type_name.to_string(),
        field_name: field_name.to_string(),
        origin: origin.to_string(),
    }
}

fn extend_object(
    decl: &mut ObjectDecl,
    type_name: &str,
    implements: Vec<Positioned<async_graphql::Name>>,
    fields: Vec<Positioned<FieldDefinition>>,
    origin: &str,
) -> Result<(), CompositionError> {
    for interface in implements {
        let interface = interface.node.to_string();
        if !decl.implements.contains(&interface) {
            decl.implements.push(interface);
        }
    }

    for field in fields {
        let field = field.node;
        let name = field.name.node.to_string();
        if decl.fields.contains_key(&name) {
            return Err(duplicate(type_name, &name, origin));
        }

        let arguments = field
            .arguments
            .into_iter()
            .map(|arg| input_decl(arg.node))
            .collect();

        decl.fields.insert(
            name.clone(),
            FieldDecl {
                name,
                description: field.description.map(|d| d.node),
                ty: field.ty.node,
                arguments,
                deprecation: deprecation_reason(&field.directives),
                origin: origin.to_string(),
            },
        );
    }

    Ok(())
}

fn extend_names(
    members: &mut Vec<String>,
    type_name: &str,
    additions: Vec<Positioned<async_graphql::Name>>,
    origin: &str,
) -> Result<(), CompositionError> {
    for member in additions {
        let member = member.node.to_string();
        if members.contains(&member) {
            return Err(duplicate(type_name, &member, origin));
        }
        members.push(member);
    }
    Ok(())
}

fn extend_enum(
    values: &mut Vec<EnumValueDecl>,
    type_name: &str,
    additions: Vec<Positioned<async_graphql::parser::types::EnumValueDefinition>>,
    origin: &str,
) -> Result<(), CompositionError> {
    for value in additions {
        let value = value.node;
        let name = value.value.node.to_string();
        if values.iter().any(|existing| existing.name == name) {
            return Err(duplicate(type_name, &name, origin));
        }
        values.push(EnumValueDecl {
            name,
            description: value.description.map(|d| d.node),
        });
    }
    Ok(())
}

fn extend_inputs(
    fields: &mut Vec<InputDecl>,
    type_name: &str,
    additions: Vec<Positioned<InputValueDefinition>>,
    origin: &str,
) -> Result<(), CompositionError> {
    for field in additions {
        let field = input_decl(field.node);
        if fields.iter().any(|existing| existing.name == field.name) {
            return Err(duplicate(type_name, &field.name, origin));
        }
        fields.push(field);
    }
    Ok(())
}

fn input_decl(input: InputValueDefinition) -> InputDecl {
    InputDecl {
        name: input.name.node.to_string(),
        description: input.description.map(|d| d.node),
        ty: input.ty.node,
        default_value: input.default_value.map(|v| v.node),
    }
}

/// Reason carried by an `@deprecated` directive, if present
fn deprecation_reason(directives: &[Positioned<ConstDirective>]) -> Option<String> {
    let directive = directives
        .iter()
        .find(|d| d.node.name.node.as_str() == "deprecated")?;

    let reason = directive
        .node
        .arguments
        .iter()
        .find(|(name, _)| name.node.as_str() == "reason")
        .and_then(|(_, value)| match &value.node {
            ConstValue::String(reason) => Some(reason.clone()),
            _ => None,
        });

    Some(reason.unwrap_or_else(|| "No longer supported".to_string()))
}
