//! Qualified symbols.
//!
//! A qualified symbol is a leaf name plus an ordered list of namespace
//! parts. The fully-qualified form is cached at construction; two symbols
//! are equal iff their fully-qualified names match.

use crate::source::SourceLocation;
use serde::{Deserialize, Serialize};

/// Separator between namespace parts in a fully-qualified name.
pub const NAMESPACE_SEPARATOR: &str = "::";

/// A possibly namespace-qualified name.
///
/// Equality and hashing consider only the fully-qualified name; the
/// location is carried for diagnostics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QualifiedSymbol {
    pub name: String,
    pub namespaces: Vec<String>,
    pub fully_qualified: String,
    pub location: SourceLocation,
}

impl QualifiedSymbol {
    /// An unqualified symbol.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let fully_qualified = name.clone();
        QualifiedSymbol {
            name,
            namespaces: Vec::new(),
            fully_qualified,
            location: SourceLocation::default(),
        }
    }

    /// A symbol inside one or more namespaces.
    pub fn qualified(name: impl Into<String>, namespaces: Vec<String>) -> Self {
        let name = name.into();
        let fully_qualified = make_fully_qualified(&namespaces, &name);
        QualifiedSymbol {
            name,
            namespaces,
            fully_qualified,
            location: SourceLocation::default(),
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    #[inline]
    pub fn is_qualified(&self) -> bool {
        !self.namespaces.is_empty()
    }
}

impl PartialEq for QualifiedSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.fully_qualified == other.fully_qualified
    }
}

impl Eq for QualifiedSymbol {}

impl std::hash::Hash for QualifiedSymbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.fully_qualified.hash(state);
    }
}

impl std::fmt::Display for QualifiedSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fully_qualified)
    }
}

/// Join namespace parts and a leaf name into a fully-qualified name.
pub fn make_fully_qualified(namespaces: &[String], name: &str) -> String {
    if namespaces.is_empty() {
        return name.to_string();
    }
    let mut result = String::with_capacity(name.len() + namespaces.len() * 8);
    for part in namespaces {
        result.push_str(part);
        result.push_str(NAMESPACE_SEPARATOR);
    }
    result.push_str(name);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unqualified_fully_qualified_is_name() {
        let sym = QualifiedSymbol::new("foo");
        assert!(!sym.is_qualified());
        assert_eq!(sym.fully_qualified, "foo");
    }

    #[test]
    fn qualified_joins_with_separator() {
        let sym = QualifiedSymbol::qualified("bar", vec!["core".into(), "io".into()]);
        assert!(sym.is_qualified());
        assert_eq!(sym.fully_qualified, "core::io::bar");
    }

    #[test]
    fn equality_ignores_location() {
        let a = QualifiedSymbol::new("x");
        let b = QualifiedSymbol::new("x").with_location(SourceLocation::at(crate::Position::new(
            3, 14,
        )));
        assert_eq!(a, b);
    }
}
