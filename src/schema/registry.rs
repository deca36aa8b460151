//! Schema registry
//!
//! Holds the SDL fragments handed to the composer. Fragments are kept exactly as
//! authored and in registration order; nothing is parsed or validated here.

use crate::error::Result;
use std::path::Path;

/// One independently authored piece of SDL, identified by where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeFragment {
    origin: String,
    source: String,
}

impl TypeFragment {
    /// Create a fragment from SDL text
    ///
    /// # Arguments
    ///
    /// * `origin` - Name used in error messages (usually a file path or module name)
    /// * `source` - The SDL text
    pub fn new(origin: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            source: source.into(),
        }
    }

    /// Read a fragment from a `.graphql` file; the path becomes its origin
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        Ok(Self::new(path.display().to_string(), source))
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Ordered collection of type fragments built by the caller
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    fragments: Vec<TypeFragment>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Malformed SDL is only reported at composition time.
    pub fn register(&mut self, fragment: TypeFragment) {
        tracing::debug!("Registered type fragment from {}", fragment.origin());
        self.fragments.push(fragment);
    }

    /// Read a `.graphql` file and register it
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let fragment = TypeFragment::from_file(path)?;
        self.register(fragment);
        Ok(())
    }

    pub fn fragments(&self) -> &[TypeFragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl FromIterator<TypeFragment> for SchemaRegistry {
    fn from_iter<I: IntoIterator<Item = TypeFragment>>(iter: I) -> Self {
        Self {
            fragments: iter.into_iter().collect(),
        }
    }
}
