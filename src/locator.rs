//! Element locators and their resolution against a [`SyntaxTree`].
//!
//! A locator is one or two dot-separated identifiers: `name` addresses a
//! top-level class or function, `Class.member` addresses a method of a class
//! at any nesting depth. Resolution never fails; a locator that matches
//! nothing resolves to the scope where the element would be inserted.

use crate::syntax::{DefinitionNode, NodeKind, SyntaxTree};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementLocator {
    /// Top-level class or function.
    Item { name: String },
    /// Method (or nested class) inside a class.
    Member { class: String, member: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorParseError {
    #[error("locator is empty")]
    Empty,

    #[error("locator `{locator}` has {segments} segments; expected `name` or `Class.member`")]
    TooManySegments { locator: String, segments: usize },

    #[error("locator `{locator}` has an invalid identifier `{segment}`")]
    InvalidIdentifier { locator: String, segment: String },
}

impl ElementLocator {
    pub fn item(name: impl Into<String>) -> Self {
        ElementLocator::Item { name: name.into() }
    }

    pub fn member(class: impl Into<String>, member: impl Into<String>) -> Self {
        ElementLocator::Member {
            class: class.into(),
            member: member.into(),
        }
    }

    /// The element's own name (last segment).
    pub fn name(&self) -> &str {
        match self {
            ElementLocator::Item { name } => name,
            ElementLocator::Member { member, .. } => member,
        }
    }

    pub fn class(&self) -> Option<&str> {
        match self {
            ElementLocator::Item { .. } => None,
            ElementLocator::Member { class, .. } => Some(class),
        }
    }

    /// Same scope, different element name.
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        match self {
            ElementLocator::Item { .. } => ElementLocator::item(name),
            ElementLocator::Member { class, .. } => ElementLocator::member(class.clone(), name),
        }
    }
}

impl FromStr for ElementLocator {
    type Err = LocatorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(LocatorParseError::Empty);
        }

        let segments: Vec<&str> = trimmed.split('.').map(str::trim).collect();
        if let Some(bad) = segments.iter().find(|seg| !is_identifier(seg)) {
            return Err(LocatorParseError::InvalidIdentifier {
                locator: trimmed.to_string(),
                segment: bad.to_string(),
            });
        }

        match segments.as_slice() {
            [name] => Ok(ElementLocator::item(*name)),
            [class, member] => Ok(ElementLocator::member(*class, *member)),
            _ => Err(LocatorParseError::TooManySegments {
                locator: trimmed.to_string(),
                segments: segments.len(),
            }),
        }
    }
}

impl fmt::Display for ElementLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementLocator::Item { name } => f.write_str(name),
            ElementLocator::Member { class, member } => write!(f, "{class}.{member}"),
        }
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' || c == '#' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Where the element would be inserted when it does not exist yet.
#[derive(Debug, Clone, Copy)]
pub enum AbsentScope<'t> {
    /// End of the file.
    TopLevel,
    /// End of an existing class body.
    Class(&'t DefinitionNode),
    /// The class itself is missing and has to be created.
    MissingClass,
}

#[derive(Debug, Clone, Copy)]
pub enum Location<'t> {
    Found {
        node: &'t DefinitionNode,
        /// Enclosing class for members.
        parent: Option<&'t DefinitionNode>,
    },
    Absent(AbsentScope<'t>),
}

impl<'t> Location<'t> {
    pub fn node(&self) -> Option<&'t DefinitionNode> {
        match self {
            Location::Found { node, .. } => Some(node),
            Location::Absent(_) => None,
        }
    }
}

/// Resolve `locator` in `tree`.
///
/// With several candidates the first in document order wins. At top level
/// classes are preferred over functions sharing the name.
pub fn locate<'t>(tree: &'t SyntaxTree, locator: &ElementLocator) -> Location<'t> {
    match locator {
        ElementLocator::Item { name } => {
            let found = find_named(&tree.definitions, name, NodeKind::Class)
                .or_else(|| find_named(&tree.definitions, name, NodeKind::Function));
            match found {
                Some(node) => Location::Found { node, parent: None },
                None => Location::Absent(AbsentScope::TopLevel),
            }
        }
        ElementLocator::Member { class, member } => {
            let Some(class_node) = find_class(&tree.definitions, class) else {
                return Location::Absent(AbsentScope::MissingClass);
            };
            let found = find_named(&class_node.members, member, NodeKind::Method)
                .or_else(|| find_named(&class_node.members, member, NodeKind::Class));
            match found {
                Some(node) => Location::Found {
                    node,
                    parent: Some(class_node),
                },
                None => Location::Absent(AbsentScope::Class(class_node)),
            }
        }
    }
}

/// Number of elements `locator` could refer to.
pub fn candidates(tree: &SyntaxTree, locator: &ElementLocator) -> usize {
    match locator {
        ElementLocator::Item { name } => tree.definitions.iter().filter(|d| d.name == *name).count(),
        ElementLocator::Member { class, member } => tree
            .classes()
            .into_iter()
            .filter(|c| c.name == *class)
            .map(|c| c.members.iter().filter(|m| m.name == *member).count())
            .sum(),
    }
}

/// Closest existing class name, for "did you mean" hints.
pub fn similar_class<'t>(tree: &'t SyntaxTree, name: &str) -> Option<&'t str> {
    tree.classes()
        .into_iter()
        .map(|c| (c.name.as_str(), strsim::jaro_winkler(&c.name, name)))
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate)
}

fn find_named<'t>(
    defs: &'t [DefinitionNode],
    name: &str,
    kind: NodeKind,
) -> Option<&'t DefinitionNode> {
    defs.iter().find(|d| d.kind == kind && d.name == name)
}

/// Depth-first, document-order search for a class at any depth.
fn find_class<'t>(defs: &'t [DefinitionNode], name: &str) -> Option<&'t DefinitionNode> {
    for def in defs.iter().filter(|d| d.is_class()) {
        if def.name == name {
            return Some(def);
        }
        if let Some(nested) = find_class(&def.members, name) {
            return Some(nested);
        }
    }
    None
}
