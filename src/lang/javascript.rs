use super::{FragmentScope, Language, ParsedSource, SyntaxCapability, SyntaxError};
use crate::pool;
use crate::syntax::{
    leading_comments, Attachment, ClassBody, DefinitionNode, NodeKind, SyntaxTree,
};
use crate::text;
use std::ops::Range;
use tree_sitter::Node;

/// Wrapper class used to parse class-body fragments.
const SHELL_OPEN: &str = "class __PatchwrightFragment__ {\n";
const SHELL_CLOSE: &str = "\n}\n";

/// JavaScript, TypeScript and TSX share one lowering; the grammars agree on
/// the node kinds we read.
#[derive(Debug, Clone, Copy)]
pub struct JavaScriptSyntax {
    language: Language,
}

impl JavaScriptSyntax {
    /// `Language::Python` falls back to plain JavaScript.
    pub fn new(language: Language) -> Self {
        let language = match language {
            Language::TypeScript | Language::Tsx => language,
            _ => Language::JavaScript,
        };
        Self { language }
    }
}

impl SyntaxCapability for JavaScriptSyntax {
    fn name(&self) -> &'static str {
        self.language.name()
    }

    fn extensions(&self) -> &'static [&'static str] {
        match self.language {
            Language::TypeScript => &["ts", "mts", "cts"],
            Language::Tsx => &["tsx"],
            _ => &["js", "jsx", "mjs", "cjs"],
        }
    }

    fn parse(&self, source: &str) -> Result<SyntaxTree, SyntaxError> {
        pool::with_parser(self.language, |parser| {
            let parsed = parser.parse_with_source(source)?;
            Ok(lower(&parsed))
        })?
    }

    fn parse_fragment(
        &self,
        fragment: &str,
        scope: FragmentScope,
    ) -> Result<SyntaxTree, SyntaxError> {
        match scope {
            FragmentScope::TopLevel => self.parse(fragment),
            FragmentScope::ClassBody => {
                let wrapped = format!("{SHELL_OPEN}{fragment}{SHELL_CLOSE}");
                let tree = self.parse(&wrapped)?;
                let delta = SHELL_OPEN.len();
                let members = tree
                    .definitions
                    .into_iter()
                    .find(|d| d.is_class())
                    .map(|shell| shell.members)
                    .unwrap_or_default();

                Ok(SyntaxTree {
                    definitions: members
                        .into_iter()
                        .map(|m| m.shifted_back(delta))
                        .collect(),
                    errors: tree
                        .errors
                        .into_iter()
                        .map(|e| e.shifted_back(delta))
                        .collect(),
                    literals: tree
                        .literals
                        .into_iter()
                        .filter(|r| r.start >= delta)
                        .map(|r| r.start - delta..r.end - delta)
                        .collect(),
                })
            }
        }
    }

    fn top_level_gap(&self) -> &'static str {
        "\n\n"
    }

    fn export_prefix<'s>(&self, definition: &'s str) -> Option<&'s str> {
        export_keywords(definition)
    }

    fn class_shell(&self, class: &str, member: &str, literals: &[Range<usize>]) -> String {
        format!(
            "class {class} {{\n{}\n}}",
            text::indent_block(member, self.indent_unit(), literals)
        )
    }
}

fn lower(parsed: &ParsedSource<'_>) -> SyntaxTree {
    let lowering = Lowering {
        source: parsed.source,
        comments: parsed.comment_ranges(),
    };
    let root = parsed.root_node();
    let mut cursor = root.walk();
    let children: Vec<Node<'_>> = root.named_children(&mut cursor).collect();

    SyntaxTree {
        definitions: children
            .into_iter()
            .filter_map(|child| lowering.top_level(child))
            .collect(),
        errors: parsed.error_locations(),
        literals: parsed.multiline_literal_ranges(&["string", "template_string"]),
    }
}

struct Lowering<'s> {
    source: &'s str,
    comments: Vec<Range<usize>>,
}

impl<'s> Lowering<'s> {
    fn text(&self, node: Node<'_>) -> String {
        self.source[node.byte_range()].to_string()
    }

    fn top_level(&self, node: Node<'_>) -> Option<DefinitionNode> {
        let mut def = if node.kind() == "export_statement" {
            let declaration = node
                .child_by_field_name("declaration")
                .or_else(|| node.child_by_field_name("value"))?;
            let mut def = self.declaration(declaration)?;
            // The export keyword belongs to the definition proper; decorators
            // written after it are part of the signature text.
            let (decorators, proper_start) = own_decorators(node);
            def.range = proper_start..node.end_byte();
            def.attachments = decorators;
            def
        } else {
            self.declaration(node)?
        };
        self.attach_comments(&mut def);
        Some(def)
    }

    fn declaration(&self, node: Node<'_>) -> Option<DefinitionNode> {
        match node.kind() {
            "class_declaration" | "abstract_class_declaration" | "class" => self.class(node),
            "function_declaration"
            | "generator_function_declaration"
            | "function_expression"
            | "function"
            | "generator_function" => {
                let name = self.text(node.child_by_field_name("name")?);
                Some(plain(NodeKind::Function, name, node.byte_range()))
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = node.walk();
                let declarators: Vec<Node<'_>> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "variable_declarator")
                    .collect();
                let [declarator] = declarators.as_slice() else {
                    return None;
                };
                if !is_function_value(declarator.child_by_field_name("value")?) {
                    return None;
                }
                let name = self.text(declarator.child_by_field_name("name")?);
                Some(plain(NodeKind::Function, name, node.byte_range()))
            }
            _ => None,
        }
    }

    fn class(&self, node: Node<'_>) -> Option<DefinitionNode> {
        let name = self.text(node.child_by_field_name("name")?);
        let (decorators, proper_start) = own_decorators(node);
        let mut def = plain(NodeKind::Class, name, proper_start..node.end_byte());
        def.attachments = decorators;

        let body = node.child_by_field_name("body")?;
        let mut cursor = body.walk();
        let items: Vec<Node<'_>> = body
            .named_children(&mut cursor)
            .filter(|c| !matches!(c.kind(), "comment" | "decorator"))
            .collect();

        def.members = items
            .iter()
            .filter_map(|item| self.member(*item))
            .collect();
        def.body = Some(self.class_body(node, body, &items));
        Some(def)
    }

    fn member(&self, node: Node<'_>) -> Option<DefinitionNode> {
        match node.kind() {
            "method_definition" | "method_signature" | "abstract_method_signature" => {
                let name = self.text(node.child_by_field_name("name")?);
                let (own, proper_start) = own_decorators(node);
                let mut decorators = sibling_decorators(node);
                decorators.extend(own);
                let mut def = plain(NodeKind::Method, name, proper_start..node.end_byte());
                def.attachments = decorators;
                self.attach_comments(&mut def);
                Some(def)
            }
            // `handle = () => {}` is a method in all but syntax.
            "field_definition" | "public_field_definition" => {
                if !is_function_value(node.child_by_field_name("value")?) {
                    return None;
                }
                let name = node
                    .child_by_field_name("property")
                    .or_else(|| node.child_by_field_name("name"))?;
                let (own, proper_start) = own_decorators(node);
                let mut decorators = sibling_decorators(node);
                decorators.extend(own);
                let end = match node.next_sibling() {
                    Some(semi) if semi.kind() == ";" => semi.end_byte(),
                    _ => node.end_byte(),
                };
                let mut def = plain(NodeKind::Method, self.text(name), proper_start..end);
                def.attachments = decorators;
                self.attach_comments(&mut def);
                Some(def)
            }
            _ => None,
        }
    }

    fn attach_comments(&self, def: &mut DefinitionNode) {
        let lead = def.full_range().start;
        let mut attachments = leading_comments(self.source, &self.comments, lead);
        attachments.append(&mut def.attachments);
        def.attachments = attachments;
    }

    fn class_body(&self, class: Node<'_>, body: Node<'_>, items: &[Node<'_>]) -> ClassBody {
        let header_indent = text::indent_at(self.source, class.start_byte()).to_string();
        let member_indent = match items.first() {
            Some(first) if first.start_position().row != body.start_position().row => {
                text::indent_at(self.source, first.start_byte()).to_string()
            }
            _ => format!("{header_indent}    "),
        };

        // class_body spans `{` .. `}` inclusive
        let open = body.start_byte();
        let close = body.end_byte().saturating_sub(1).max(open);
        let insert_at = items.last().map_or(close, |last| {
            let end = last.end_byte();
            if text::rest_of_line_is_trivia(self.source, end) {
                text::line_end(self.source, end).min(close)
            } else {
                end
            }
        });
        let empty_interior = items.is_empty().then(|| open + 1..close);

        ClassBody {
            insert_at,
            member_indent,
            header_indent,
            items: items.len(),
            empty_interior,
        }
    }
}

fn is_function_value(value: Node<'_>) -> bool {
    matches!(
        value.kind(),
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

/// Leading `export` (and `default`) keywords of a definition's text.
fn export_keywords(definition: &str) -> Option<&str> {
    let rest = definition.strip_prefix("export")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let rest = rest
        .strip_prefix("default")
        .filter(|r| r.starts_with(char::is_whitespace))
        .map_or(rest, str::trim_start);
    Some(&definition[..definition.len() - rest.len()])
}

fn plain(kind: NodeKind, name: String, range: Range<usize>) -> DefinitionNode {
    DefinitionNode {
        kind,
        name,
        range,
        attachments: Vec::new(),
        members: Vec::new(),
        body: None,
    }
}

/// Decorator children that precede everything else in `node`, and the start
/// of the first non-decorator child.
fn own_decorators(node: Node<'_>) -> (Vec<Attachment>, usize) {
    let mut decorators = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "decorator" {
            decorators.push(Attachment::decorator(child.byte_range()));
        } else {
            return (decorators, child.start_byte());
        }
    }
    (decorators, node.start_byte())
}

/// Decorators written as preceding siblings inside a class body.
fn sibling_decorators(node: Node<'_>) -> Vec<Attachment> {
    let mut decorators = Vec::new();
    let mut prev = node.prev_named_sibling();
    while let Some(sibling) = prev {
        match sibling.kind() {
            "decorator" => decorators.push(Attachment::decorator(sibling.byte_range())),
            "comment" => {}
            _ => break,
        }
        prev = sibling.prev_named_sibling();
    }
    decorators.reverse();
    decorators
}
