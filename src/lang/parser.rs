use super::{Language, SyntaxError};
use ast_grep_language::LanguageExt;
use std::fmt;
use std::ops::Range;
use tree_sitter::{Node, Parser, Tree};

/// Tree-sitter parser bound to one bundled grammar.
pub struct SourceParser {
    parser: Parser,
    language: Language,
}

impl SourceParser {
    pub fn new(language: Language) -> Result<Self, SyntaxError> {
        let mut parser = Parser::new();
        let ts_lang = language.support_lang().get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| SyntaxError::LanguageSet { language })?;

        Ok(Self { parser, language })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Parse source code into a tree-sitter Tree.
    pub fn parse(&mut self, source: &str) -> Result<Tree, SyntaxError> {
        self.parser
            .parse(source, None)
            .ok_or(SyntaxError::ParseFailed {
                language: self.language,
            })
    }

    /// Parse source code and return the tree along with the source.
    pub fn parse_with_source<'a>(
        &mut self,
        source: &'a str,
    ) -> Result<ParsedSource<'a>, SyntaxError> {
        let tree = self.parse(source)?;
        Ok(ParsedSource { source, tree })
    }
}

/// A parsed source file with its tree-sitter tree.
pub struct ParsedSource<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl<'a> ParsedSource<'a> {
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Check if the tree contains any ERROR or MISSING nodes.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Locations of every ERROR/MISSING node, in document order.
    pub fn error_locations(&self) -> Vec<ErrorLocation> {
        let mut errors = Vec::new();
        collect_errors(self.tree.root_node(), self.source, &mut errors);
        errors
    }

    /// Byte ranges of every comment node, in document order.
    pub fn comment_ranges(&self) -> Vec<Range<usize>> {
        self.ranges_of(&["comment"])
    }

    /// Byte ranges of string literals spanning more than one line.
    pub fn multiline_literal_ranges(&self, kinds: &[&str]) -> Vec<Range<usize>> {
        self.ranges_of(kinds)
            .into_iter()
            .filter(|r| self.source[r.clone()].contains('\n'))
            .collect()
    }

    /// Outermost nodes of the given kinds, in document order. Matched nodes
    /// are not descended into.
    fn ranges_of(&self, kinds: &[&str]) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut cursor = self.tree.walk();
        'walk: loop {
            let node = cursor.node();
            if kinds.contains(&node.kind()) {
                ranges.push(node.byte_range());
            } else if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    continue 'walk;
                }
                if !cursor.goto_parent() {
                    break 'walk;
                }
            }
        }
        ranges
    }

    pub fn node_text(&self, node: Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }
}

/// Position of a syntax error, 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    pub byte_start: usize,
    pub byte_end: usize,
    pub line: usize,
    pub column: usize,
    pub context: String,
}

impl ErrorLocation {
    /// Shift byte offsets left by `delta`, saturating at zero.
    pub fn shifted_back(mut self, delta: usize) -> Self {
        self.byte_start = self.byte_start.saturating_sub(delta);
        self.byte_end = self.byte_end.saturating_sub(delta);
        self
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)?;
        if !self.context.is_empty() {
            write!(f, " near `{}`", self.context)?;
        }
        Ok(())
    }
}

fn collect_errors(node: Node<'_>, source: &str, errors: &mut Vec<ErrorLocation>) {
    if !node.has_error() {
        return;
    }

    if node.is_error() || node.is_missing() {
        let start = node.start_position();
        let context_start = floor_char_boundary(source, node.start_byte().saturating_sub(20));
        let context_end = ceil_char_boundary(source, (node.end_byte() + 20).min(source.len()));
        errors.push(ErrorLocation {
            byte_start: node.start_byte(),
            byte_end: node.end_byte(),
            line: start.row + 1,
            column: start.column + 1,
            context: source[context_start..context_end]
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
        });
        if node.is_missing() {
            return;
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_errors(child, source, errors);
    }
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

fn ceil_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset < text.len() && !text.is_char_boundary(offset) {
        offset += 1;
    }
    offset
}
