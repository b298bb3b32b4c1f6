//! Syntax validation of final file contents.
//!
//! # Hard Rule
//!
//! A file is written only if its final content parses without ERROR or
//! MISSING nodes in the grammar chosen by its (destination) extension.
//! Files without a registered grammar are treated as plain text and pass.

use crate::lang::{ErrorLocation, Syntax, SyntaxCapability, SyntaxError};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{language} content does not parse: {count} syntax error(s), first at {first}")]
    Syntax {
        language: &'static str,
        count: usize,
        first: ErrorLocation,
        errors: Vec<ErrorLocation>,
    },

    #[error("parser error: {0}")]
    Parser(#[from] SyntaxError),
}

/// Validate `content` with one capability.
pub fn validate(capability: &dyn SyntaxCapability, content: &str) -> Result<(), ValidationError> {
    let tree = capability.parse(content)?;
    match tree.errors.first() {
        None => Ok(()),
        Some(first) => Err(ValidationError::Syntax {
            language: capability.name(),
            count: tree.errors.len(),
            first: first.clone(),
            errors: tree.errors.clone(),
        }),
    }
}

/// Validates content destined for a path.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    syntax: &'a Syntax,
}

impl<'a> Validator<'a> {
    pub fn new(syntax: &'a Syntax) -> Self {
        Self { syntax }
    }

    /// Validate `content` as it would be written to `path`.
    ///
    /// Returns `Ok(false)` when no grammar is registered for the path and the
    /// content was not checked.
    pub fn validate_for_path(&self, path: &Path, content: &str) -> Result<bool, ValidationError> {
        match self.syntax.for_path(path) {
            Some(capability) => validate(capability, content).map(|()| true),
            None => Ok(false),
        }
    }
}
