use super::{FragmentScope, Language, ParsedSource, SyntaxCapability, SyntaxError};
use crate::pool;
use crate::syntax::{
    leading_comments, Attachment, ClassBody, DefinitionNode, NodeKind, SyntaxTree,
};
use crate::text;
use std::ops::Range;
use tree_sitter::Node;

/// Python classes, functions and methods.
///
/// Decorators come from `decorated_definition` wrappers; a class body is the
/// indented `block` and an emptied class is kept valid with `pass`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonSyntax;

impl SyntaxCapability for PythonSyntax {
    fn name(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn parse(&self, source: &str) -> Result<SyntaxTree, SyntaxError> {
        pool::with_parser(Language::Python, |parser| {
            let parsed = parser.parse_with_source(source)?;
            Ok(lower(&parsed))
        })?
    }

    fn parse_fragment(
        &self,
        fragment: &str,
        scope: FragmentScope,
    ) -> Result<SyntaxTree, SyntaxError> {
        let mut tree = self.parse(fragment)?;
        if scope == FragmentScope::ClassBody {
            tree.definitions = tree
                .definitions
                .into_iter()
                .map(DefinitionNode::into_member)
                .collect();
        }
        Ok(tree)
    }

    fn top_level_gap(&self) -> &'static str {
        "\n\n\n"
    }

    fn class_shell(&self, class: &str, member: &str, literals: &[Range<usize>]) -> String {
        format!(
            "class {class}:\n{}",
            text::indent_block(member, self.indent_unit(), literals)
        )
    }

    fn empty_body_placeholder(&self) -> Option<&'static str> {
        Some("pass")
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
            .filter_map(|child| lowering.definition(child, false))
            .collect(),
        errors: parsed.error_locations(),
        literals: parsed.multiline_literal_ranges(&["string"]),
    }
}

struct Lowering<'s> {
    source: &'s str,
    comments: Vec<Range<usize>>,
}

impl<'s> Lowering<'s> {
    fn definition(&self, node: Node<'_>, in_class: bool) -> Option<DefinitionNode> {
        let (decorators, def) = match node.kind() {
            "decorated_definition" => {
                let def = node.child_by_field_name("definition")?;
                let mut cursor = node.walk();
                let decorators: Vec<Attachment> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "decorator")
                    .map(|c| Attachment::decorator(c.byte_range()))
                    .collect();
                (decorators, def)
            }
            "class_definition" | "function_definition" => (Vec::new(), node),
            _ => return None,
        };

        let name = def
            .child_by_field_name("name")?
            .utf8_text(self.source.as_bytes())
            .ok()?
            .to_string();

        let lead = decorators.first().map_or(def.start_byte(), |d| d.range.start);
        let mut attachments = leading_comments(self.source, &self.comments, lead);
        attachments.extend(decorators);

        let mut definition = DefinitionNode {
            kind: NodeKind::Function,
            name,
            range: def.byte_range(),
            attachments,
            members: Vec::new(),
            body: None,
        };

        if def.kind() == "class_definition" {
            definition.kind = NodeKind::Class;
            if let Some(block) = def.child_by_field_name("body") {
                let mut cursor = block.walk();
                let items: Vec<Node<'_>> = block
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() != "comment")
                    .collect();
                definition.members = items
                    .iter()
                    .filter_map(|item| self.definition(*item, true))
                    .collect();
                definition.body = Some(self.class_body(def, &items));
            }
        } else if in_class {
            definition.kind = NodeKind::Method;
        }

        Some(definition)
    }

    fn class_body(&self, class: Node<'_>, items: &[Node<'_>]) -> ClassBody {
        let header_indent = text::indent_at(self.source, class.start_byte()).to_string();
        let member_indent = match items.first() {
            Some(first) if first.start_position().row != class.start_position().row => {
                text::indent_at(self.source, first.start_byte()).to_string()
            }
            _ => format!("{header_indent}    "),
        };
        let insert_at = items.last().map_or(class.end_byte(), |last| {
            let end = last.end_byte();
            if text::rest_of_line_is_trivia(self.source, end) {
                text::line_end(self.source, end)
            } else {
                end
            }
        });

        ClassBody {
            insert_at,
            member_indent,
            header_indent,
            items: items.len(),
            empty_interior: None,
        }
    }
}
