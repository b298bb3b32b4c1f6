//! Language-neutral view of a parsed file.
//!
//! Syntax capabilities lower their tree-sitter trees into [`SyntaxTree`]s so
//! that the locator, splitter and merge engine never look at grammar node
//! kinds. Each [`DefinitionNode`] carries two ranges: `range` covers the
//! definition proper (signature and body) and [`DefinitionNode::full_range`]
//! extends it over attached decorators and leading comments.

use crate::lang::ErrorLocation;
use crate::text;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Class,
    Function,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Decorator,
    Comment,
}

/// A decorator or leading comment owned by a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub range: Range<usize>,
}

impl Attachment {
    pub fn decorator(range: Range<usize>) -> Self {
        Self {
            kind: AttachmentKind::Decorator,
            range,
        }
    }

    pub fn comment(range: Range<usize>) -> Self {
        Self {
            kind: AttachmentKind::Comment,
            range,
        }
    }
}

/// Where and how members are added to a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassBody {
    /// Offset after the last member (end of its line when only trivia follows).
    pub insert_at: usize,
    /// Indentation of existing members, or header indentation plus one unit.
    pub member_indent: String,
    /// Indentation of the class header line.
    pub header_indent: String,
    /// Number of statements/members in the body, comments excluded.
    pub items: usize,
    /// Interior of an empty braced body (between `{` and `}`).
    pub empty_interior: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionNode {
    pub kind: NodeKind,
    pub name: String,
    pub range: Range<usize>,
    /// Leading comments first, then decorators, both in document order.
    pub attachments: Vec<Attachment>,
    /// Methods and nested classes, for classes only.
    pub members: Vec<DefinitionNode>,
    pub body: Option<ClassBody>,
}

impl DefinitionNode {
    /// Range covering attachments and the definition proper.
    pub fn full_range(&self) -> Range<usize> {
        let start = self
            .attachments
            .iter()
            .map(|a| a.range.start)
            .min()
            .map_or(self.range.start, |s| s.min(self.range.start));
        start..self.range.end
    }

    pub fn decorators(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments_of(AttachmentKind::Decorator)
    }

    pub fn comments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments_of(AttachmentKind::Comment)
    }

    fn attachments_of(&self, kind: AttachmentKind) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().filter(move |a| a.kind == kind)
    }

    /// Range of the contiguous block holding all attachments of `kind`.
    ///
    /// The block runs from the first such attachment up to the next piece of
    /// the definition (the first decorator for comments, the definition proper
    /// for decorators), so interleaved whitespace and stray comments between
    /// decorators travel with it.
    pub fn block_range(&self, kind: AttachmentKind) -> Option<Range<usize>> {
        let start = self.attachments_of(kind).map(|a| a.range.start).min()?;
        let end = match kind {
            AttachmentKind::Comment => self
                .decorators()
                .map(|a| a.range.start)
                .min()
                .unwrap_or(self.range.start),
            AttachmentKind::Decorator => self.range.start,
        };
        Some(start..end.max(start))
    }

    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.full_range()]
    }

    pub fn is_class(&self) -> bool {
        self.kind == NodeKind::Class
    }

    /// Move every offset left by `delta`, recursively.
    pub fn shifted_back(mut self, delta: usize) -> Self {
        let shift = |r: &Range<usize>| r.start - delta..r.end - delta;
        self.range = shift(&self.range);
        for attachment in &mut self.attachments {
            attachment.range = shift(&attachment.range);
        }
        if let Some(body) = &mut self.body {
            body.insert_at -= delta;
            body.empty_interior = body.empty_interior.as_ref().map(shift);
        }
        self.members = self
            .members
            .into_iter()
            .map(|m| m.shifted_back(delta))
            .collect();
        self
    }

    /// Turn top-level functions into methods (fragments parsed for a class body).
    pub fn into_member(mut self) -> Self {
        if self.kind == NodeKind::Function {
            self.kind = NodeKind::Method;
        }
        self
    }
}

/// Definitions and syntax errors of one parsed source text.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    pub definitions: Vec<DefinitionNode>,
    pub errors: Vec<ErrorLocation>,
    /// String literals spanning several lines. Their inner lines are never
    /// re-indented.
    pub literals: Vec<Range<usize>>,
}

impl SyntaxTree {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// All classes at any depth, in document order.
    pub fn classes(&self) -> Vec<&DefinitionNode> {
        fn walk<'t>(defs: &'t [DefinitionNode], out: &mut Vec<&'t DefinitionNode>) {
            for def in defs.iter().filter(|d| d.is_class()) {
                out.push(def);
                walk(&def.members, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.definitions, &mut out);
        out
    }
}

/// Collect the comments that lead into a definition starting at `start`.
///
/// Walks backwards from `start` accepting each comment that sits on its own
/// line and is separated from what follows by at most one line break. A
/// blank line, code, or a trailing comment on a code line ends the run.
pub fn leading_comments(source: &str, comments: &[Range<usize>], start: usize) -> Vec<Attachment> {
    let mut attached = Vec::new();
    let mut cursor = start;
    let mut idx = comments.partition_point(|c| c.end <= cursor);

    while idx > 0 {
        let comment = &comments[idx - 1];
        let gap = &source[comment.end..cursor];
        if !gap.trim().is_empty() || gap.matches('\n').count() > 1 {
            break;
        }
        if !text::starts_line(source, comment.start) {
            break;
        }
        attached.push(Attachment::comment(comment.clone()));
        cursor = comment.start;
        idx -= 1;
    }

    attached.reverse();
    attached
}
