//! Per-language syntax capabilities.
//!
//! A [`SyntaxCapability`] knows how to turn one language's source into a
//! [`SyntaxTree`] and which layout conventions to follow when the merge engine
//! inserts new definitions. The [`Syntax`] registry maps file extensions to
//! capabilities; adding a language means registering another implementation.

pub mod errors;
pub mod javascript;
pub mod parser;
pub mod python;

pub use errors::SyntaxError;
pub use javascript::JavaScriptSyntax;
pub use parser::{ErrorLocation, ParsedSource, SourceParser};
pub use python::PythonSyntax;

use crate::syntax::SyntaxTree;
use ast_grep_language::SupportLang;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

/// Grammars bundled with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
}

impl Language {
    pub fn support_lang(self) -> SupportLang {
        match self {
            Language::Python => SupportLang::Python,
            Language::JavaScript => SupportLang::JavaScript,
            Language::TypeScript => SupportLang::TypeScript,
            Language::Tsx => SupportLang::Tsx,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a fragment should be read before it is lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentScope {
    /// Module/program level: classes and functions.
    TopLevel,
    /// Inside a class body: functions become methods.
    ClassBody,
}

pub trait SyntaxCapability: Send + Sync {
    fn name(&self) -> &'static str;

    /// File extensions handled, without the leading dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Parse a whole file.
    fn parse(&self, source: &str) -> Result<SyntaxTree, SyntaxError>;

    /// Parse a request body. Offsets in the result are relative to `fragment`.
    fn parse_fragment(&self, fragment: &str, scope: FragmentScope)
        -> Result<SyntaxTree, SyntaxError>;

    /// Separator placed before a definition appended at top level.
    fn top_level_gap(&self) -> &'static str;

    /// Separator placed before a member appended to a class.
    fn member_gap(&self) -> &'static str {
        "\n\n"
    }

    fn indent_unit(&self) -> &'static str {
        "    "
    }

    /// Keywords such as `export` that lead `definition` without being part of
    /// the declaration itself.
    fn export_prefix<'s>(&self, _definition: &'s str) -> Option<&'s str> {
        None
    }

    /// Minimal class wrapping `member`, used when the target class is missing.
    /// Lines of `member` starting inside `literals` keep their text.
    fn class_shell(&self, class: &str, member: &str, literals: &[Range<usize>]) -> String;

    /// Statement left behind when the last member of a class is removed.
    fn empty_body_placeholder(&self) -> Option<&'static str> {
        None
    }
}

/// Registry of syntax capabilities keyed by file extension.
#[derive(Clone, Default)]
pub struct Syntax {
    by_extension: HashMap<String, Arc<dyn SyntaxCapability>>,
}

impl Syntax {
    /// Python, JavaScript, TypeScript and TSX.
    pub fn builtin() -> Self {
        let mut syntax = Self::default();
        syntax.register(PythonSyntax);
        syntax.register(JavaScriptSyntax::new(Language::JavaScript));
        syntax.register(JavaScriptSyntax::new(Language::TypeScript));
        syntax.register(JavaScriptSyntax::new(Language::Tsx));
        syntax
    }

    pub fn register(&mut self, capability: impl SyntaxCapability + 'static) {
        let capability: Arc<dyn SyntaxCapability> = Arc::new(capability);
        for ext in capability.extensions() {
            self.by_extension
                .insert(ext.to_ascii_lowercase(), Arc::clone(&capability));
        }
    }

    pub fn for_extension(&self, ext: &str) -> Option<&dyn SyntaxCapability> {
        self.by_extension
            .get(&ext.to_ascii_lowercase())
            .map(|c| c.as_ref())
    }

    /// Capability for a path, chosen by extension. `None` means the file is
    /// handled as plain text and never syntax-checked.
    pub fn for_path(&self, path: &Path) -> Option<&dyn SyntaxCapability> {
        let ext = path.extension()?.to_str()?;
        self.for_extension(ext)
    }
}

impl fmt::Debug for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exts: Vec<&String> = self.by_extension.keys().collect();
        exts.sort();
        f.debug_struct("Syntax").field("extensions", &exts).finish()
    }
}
