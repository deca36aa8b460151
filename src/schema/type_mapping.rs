//! SDL type to engine type mapping
//!
//! Converts parsed SDL types into dynamic-schema [`TypeRef`]s and converts JSON values
//! produced by resolvers into [`FieldValue`]s shaped for the declared field type.

use crate::schema::document::{DeclaredKind, InputDecl, TypeGraph};
use crate::schema::scalars::is_builtin_scalar;

use async_graphql::dynamic::{FieldValue, InputValue, TypeRef};
use async_graphql::parser::types::{BaseType, Type};
use async_graphql::{Name, Value as ConstValue};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

/// Map an SDL type (e.g. `[Author!]!`) to a dynamic-schema TypeRef
pub fn to_type_ref(ty: &Type) -> TypeRef {
    let base = match &ty.base {
        BaseType::Named(name) => TypeRef::Named(Cow::Owned(name.to_string())),
        BaseType::List(inner) => TypeRef::List(Box::new(to_type_ref(inner))),
    };

    if ty.nullable {
        base
    } else {
        TypeRef::NonNull(Box::new(base))
    }
}

/// Name of the innermost named type, unwrapping lists
pub fn named_type(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => named_type(inner),
    }
}

pub(crate) fn to_input_value(input: &InputDecl) -> InputValue {
    let mut value = InputValue::new(input.name.clone(), to_type_ref(&input.ty));
    if let Some(desc) = &input.description {
        value = value.description(desc);
    }
    if let Some(default) = &input.default_value {
        value = value.default_value(default.clone());
    }
    value
}

/// How a value of some named type is handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    /// Scalars: passed through as engine values
    Leaf,
    Enum,
    /// Objects: carried as JSON so child fields can look up properties
    Object,
    /// Interfaces and unions: concrete type taken from `__typename`
    Abstract,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TypeShapes {
    shapes: HashMap<String, Shape>,
}

impl TypeShapes {
    pub(crate) fn from_graph(graph: &TypeGraph) -> Self {
        let shapes = graph
            .types
            .values()
            .map(|declared| {
                let shape = match &declared.kind {
                    DeclaredKind::Scalar | DeclaredKind::InputObject(_) => Shape::Leaf,
                    DeclaredKind::Enum(_) => Shape::Enum,
                    DeclaredKind::Object(_) => Shape::Object,
                    DeclaredKind::Interface(_) | DeclaredKind::Union(_) => Shape::Abstract,
                };
                (declared.name.clone(), shape)
            })
            .collect();

        Self { shapes }
    }

    pub(crate) fn shape_of(&self, name: &str) -> Shape {
        if is_builtin_scalar(name) {
            return Shape::Leaf;
        }
        self.shapes.get(name).copied().unwrap_or(Shape::Leaf)
    }

    /// Scalars, enums and lists of them
    pub(crate) fn is_leaf(&self, ty: &Type) -> bool {
        matches!(self.shape_of(named_type(ty)), Shape::Leaf | Shape::Enum)
    }

    /// Convert a resolver's JSON result into a field value for `ty`
    ///
    /// `null` becomes `None`; the engine enforces non-null declarations itself.
    pub(crate) fn to_field_value<'a>(
        &self,
        ty: &Type,
        value: Value,
    ) -> async_graphql::Result<Option<FieldValue<'a>>> {
        if value.is_null() {
            return Ok(None);
        }

        match &ty.base {
            BaseType::List(inner) => {
                let items = match value {
                    Value::Array(items) => items,
                    other => {
                        return Err(async_graphql::Error::new(format!(
                            "Expected a list for type {}, got {}",
                            ty, other
                        )))
                    }
                };

                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.to_field_value(inner, item)?.unwrap_or(FieldValue::NULL));
                }
                Ok(Some(FieldValue::list(values)))
            }
            BaseType::Named(name) => match self.shape_of(name) {
                Shape::Leaf => Ok(Some(FieldValue::value(ConstValue::from_json(value)?))),
                Shape::Enum => match value {
                    Value::String(item) => {
                        Ok(Some(FieldValue::value(ConstValue::Enum(Name::new(item)))))
                    }
                    other => Err(async_graphql::Error::new(format!(
                        "Expected an enum value of {} as a string, got {}",
                        name, other
                    ))),
                },
                Shape::Object => Ok(Some(FieldValue::owned_any(value))),
                Shape::Abstract => {
                    let concrete = value
                        .get("__typename")
                        .and_then(Value::as_str)
                        .map(str::to_owned)
                        .ok_or_else(|| {
                            async_graphql::Error::new(format!(
                                "Cannot resolve concrete type of {}: value has no __typename",
                                name
                            ))
                        })?;
                    Ok(Some(FieldValue::owned_any(value).with_type(concrete)))
                }
            },
        }
    }
}
