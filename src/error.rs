use thiserror::Error;

/// Errors raised while composing fragments and resolver maps into an executable schema.
///
/// All of these are configuration-time defects: composition aborts on the first one
/// and never hands back a partially bound schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("Schema parse error in {origin} at line {line}, column {column}: {message}")]
    SchemaParse {
        origin: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Duplicate resolver for {type_name}.{field_name} (bound by {first} and {second})")]
    DuplicateResolver {
        type_name: String,
        field_name: String,
        first: String,
        second: String,
    },

    #[error(
        "Field {type_name}.{field_name} declared in {origin} has no resolver and no matching root value property"
    )]
    UnresolvedField {
        type_name: String,
        field_name: String,
        origin: String,
    },

    #[error("Type '{name}' is declared in both {first} and {second}")]
    DuplicateType {
        name: String,
        first: String,
        second: String,
    },

    #[error("{type_name}.{field_name} is declared more than once ({origin})")]
    DuplicateField {
        type_name: String,
        field_name: String,
        origin: String,
    },

    #[error("{origin} extends '{name}', which is not declared with a matching kind")]
    UnknownExtension { name: String, origin: String },

    #[error("Resolver for {type_name}.{field_name} (from {origin}) does not match any declared object field")]
    OrphanResolver {
        type_name: String,
        field_name: String,
        origin: String,
    },

    #[error("Resolver for {type_name}.{field_name} has the wrong kind: {reason}")]
    MismatchedResolver {
        type_name: String,
        field_name: String,
        reason: String,
    },

    #[error("{referenced_by} (declared in {origin}) references undeclared type '{name}'")]
    UnknownType {
        name: String,
        referenced_by: String,
        origin: String,
    },

    #[error("Schema has no query root type '{0}'")]
    MissingQueryRoot(String),

    #[error("Schema validation failed: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum WeaveError {
    #[error("Composition error: {0}")]
    Composition(#[from] CompositionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for WeaveError {
    fn from(err: toml::de::Error) -> Self {
        WeaveError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for WeaveError {
    fn from(err: toml::ser::Error) -> Self {
        WeaveError::Serialization(format!("TOML serialization error: {}", err))
    }
}

impl From<serde_json::Error> for WeaveError {
    fn from(err: serde_json::Error) -> Self {
        WeaveError::Serialization(format!("JSON error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, WeaveError>;
