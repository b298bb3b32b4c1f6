//! Merge/replace engine.
//!
//! Given the working content of a file, its [`SyntaxTree`], a resolved
//! [`Location`] and a request body, compute the single [`Edit`] that makes the
//! change:
//!
//! - found + non-empty body: replace the element (Replace) or replace it while
//!   keeping its decorators/leading comments when the body has none (Merge)
//! - found + empty body: delete the element with its decorators and comments
//! - absent + non-empty body: insert at the end of the scope the locator names
//! - absent + empty body: nothing to do

use crate::edit::{Edit, EditError};
use crate::lang::{ErrorLocation, FragmentScope, SyntaxCapability, SyntaxError};
use crate::locator::{AbsentScope, ElementLocator, Location};
use crate::syntax::{AttachmentKind, DefinitionNode, NodeKind, SyntaxTree};
use crate::text;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;

/// How an existing element is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// The body becomes the element, attachments included.
    #[default]
    Replace,
    /// Keep the old decorators (and leading comments) when the body
    /// supplies none of its own.
    Merge,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("request body does not parse: {count} syntax error(s), first at {first}")]
    ParseFailure { count: usize, first: ErrorLocation },

    #[error("class `{class}` has no body to insert into")]
    MissingClassBody { class: String },

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

impl EngineError {
    /// Fail when `tree` (a parsed request body) holds syntax errors.
    pub fn check(tree: &SyntaxTree) -> Result<(), EngineError> {
        match tree.errors.first() {
            None => Ok(()),
            Some(first) => Err(EngineError::ParseFailure {
                count: tree.errors.len(),
                first: first.clone(),
            }),
        }
    }
}

/// Compute the edit for `body` at `location`, or `None` when there is nothing
/// to change.
pub fn compute(
    capability: &dyn SyntaxCapability,
    content: &str,
    locator: &ElementLocator,
    location: &Location<'_>,
    body: &str,
    mode: Mode,
) -> Result<Option<Edit>, EngineError> {
    let scope = match locator.class() {
        Some(_) => FragmentScope::ClassBody,
        None => FragmentScope::TopLevel,
    };
    let fragment = normalize_body(capability, body, scope)?;

    match (location, fragment.is_empty()) {
        (Location::Found { node, parent }, true) => {
            Ok(Some(removal(capability, content, node, *parent)))
        }
        (Location::Found { node, .. }, false) => {
            replacement(capability, content, node, &fragment, mode).map(Some)
        }
        (Location::Absent(_), true) => Ok(None),
        (Location::Absent(scope), false) => {
            insertion(capability, content, locator, scope, &fragment).map(Some)
        }
    }
}

/// Trim and dedent a request body, leaving the inner lines of multi-line
/// string literals as they were written.
pub fn normalize_body(
    capability: &dyn SyntaxCapability,
    body: &str,
    scope: FragmentScope,
) -> Result<String, EngineError> {
    let trimmed = text::trim_blank_lines(body);
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    let rough = text::normalize_fragment(trimmed, &text::shallow_lines(trimmed));
    let literals = literals_in(capability, &rough, scope)?;
    let verbatim = text::literal_lines(&rough, &literals);
    Ok(text::normalize_fragment(trimmed, &verbatim))
}

fn literals_in(
    capability: &dyn SyntaxCapability,
    fragment: &str,
    scope: FragmentScope,
) -> Result<Vec<Range<usize>>, EngineError> {
    Ok(capability.parse_fragment(fragment, scope)?.literals)
}

fn scope_of(node: &DefinitionNode) -> FragmentScope {
    match node.kind {
        NodeKind::Method => FragmentScope::ClassBody,
        NodeKind::Class | NodeKind::Function => FragmentScope::TopLevel,
    }
}

fn replacement(
    capability: &dyn SyntaxCapability,
    content: &str,
    node: &DefinitionNode,
    fragment: &str,
    mode: Mode,
) -> Result<Edit, EngineError> {
    let span = node.full_range();
    let indent = text::indent_at(content, span.start);

    let composed = match mode {
        Mode::Replace => fragment.to_string(),
        Mode::Merge => merge_attachments(capability, content, node, fragment)?,
    };
    let composed = restore_export(capability, &content[node.range.clone()], composed, node)?;
    let literals = literals_in(capability, &composed, scope_of(node))?;

    Ok(Edit::new(
        span.start,
        span.end,
        text::reindent(&composed, indent, &literals),
        &content[span],
    ))
}

/// Put back the `export` keywords of the old definition when `composed`
/// defines the element without them.
fn restore_export(
    capability: &dyn SyntaxCapability,
    old: &str,
    composed: String,
    node: &DefinitionNode,
) -> Result<String, EngineError> {
    let Some(prefix) = capability.export_prefix(old) else {
        return Ok(composed);
    };
    let parsed = capability.parse_fragment(&composed, scope_of(node))?;
    let Some(new) = parsed.definitions.first() else {
        return Ok(composed);
    };
    if capability.export_prefix(&composed[new.range.clone()]).is_some() {
        return Ok(composed);
    }
    Ok(format!(
        "{}{prefix}{}",
        &composed[..new.range.start],
        &composed[new.range.start..]
    ))
}

/// Compose `fragment` with the old element's decorator and comment blocks.
///
/// Each block kind is decided independently: the fragment's own block wins
/// when present, otherwise the old one is carried over. A class also keeps
/// the old members the fragment does not define.
fn merge_attachments(
    capability: &dyn SyntaxCapability,
    content: &str,
    node: &DefinitionNode,
    fragment: &str,
) -> Result<String, EngineError> {
    let parsed = capability.parse_fragment(fragment, scope_of(node))?;
    EngineError::check(&parsed)?;

    let old_indent = text::indent_at(content, node.range.start);
    let old_block = |kind| {
        node.block_range(kind)
            .map(|r| text::strip_block_indent(&content[r], old_indent))
            .unwrap_or_default()
    };

    let Some(new) = parsed.definitions.first() else {
        // Not a definition: nothing to compare against, keep both old blocks.
        return Ok(format!(
            "{}{}{fragment}",
            old_block(AttachmentKind::Comment),
            old_block(AttachmentKind::Decorator)
        ));
    };

    let new_block = |kind| {
        new.block_range(kind)
            .map(|r| fragment[r].to_string())
            .unwrap_or_default()
    };
    let comments = match new.comments().next() {
        Some(_) => new_block(AttachmentKind::Comment),
        None => old_block(AttachmentKind::Comment),
    };
    let decorators = match new.decorators().next() {
        Some(_) => new_block(AttachmentKind::Decorator),
        None => old_block(AttachmentKind::Decorator),
    };

    let prefix = &fragment[..new.full_range().start];
    let rest = match (node.is_class(), new.is_class()) {
        (true, true) => carry_members(capability, content, node, fragment, new)?,
        _ => fragment[new.range.start..].to_string(),
    };
    Ok(format!("{prefix}{comments}{decorators}{rest}"))
}

/// `fragment` from the start of class `new`, with the members of `old` that
/// `new` lacks appended to its body.
fn carry_members(
    capability: &dyn SyntaxCapability,
    content: &str,
    old: &DefinitionNode,
    fragment: &str,
    new: &DefinitionNode,
) -> Result<String, EngineError> {
    let start = new.range.start;
    let missing: Vec<&DefinitionNode> = old
        .members
        .iter()
        .filter(|m| new.members.iter().all(|n| n.name != m.name))
        .collect();
    let Some(body) = new.body.as_ref().filter(|_| !missing.is_empty()) else {
        return Ok(fragment[start..].to_string());
    };

    let content_literals = capability.parse(content)?.literals;
    let mut carried = Vec::with_capacity(missing.len());
    for member in missing {
        let span = member.full_range();
        let old_indent = text::indent_at(content, span.start);
        let literals: Vec<Range<usize>> = content_literals
            .iter()
            .filter(|r| r.start >= span.start && r.end <= span.end)
            .map(|r| r.start - span.start..r.end - span.start)
            .collect();
        let flush = text::outdent(&content[span], old_indent, &literals);
        let literals = literals_in(capability, &flush, FragmentScope::ClassBody)?;
        carried.push(text::reindent(&flush, &body.member_indent, &literals));
    }
    let separator = format!("{}{}", capability.member_gap(), body.member_indent);
    let members = carried.join(separator.as_str());

    Ok(match &body.empty_interior {
        Some(interior) => format!(
            "{}\n{}{members}\n{}{}",
            &fragment[start..interior.start],
            body.member_indent,
            body.header_indent,
            &fragment[interior.end..]
        ),
        None => format!(
            "{}{separator}{members}{}",
            &fragment[start..body.insert_at],
            &fragment[body.insert_at..]
        ),
    })
}

fn insertion(
    capability: &dyn SyntaxCapability,
    content: &str,
    locator: &ElementLocator,
    scope: &AbsentScope<'_>,
    fragment: &str,
) -> Result<Edit, EngineError> {
    match scope {
        AbsentScope::TopLevel => Ok(append_top_level(capability, content, fragment)),
        AbsentScope::MissingClass => {
            let class = locator.class().unwrap_or(locator.name());
            let literals = literals_in(capability, fragment, FragmentScope::ClassBody)?;
            let shell = capability.class_shell(class, fragment, &literals);
            Ok(append_top_level(capability, content, &shell))
        }
        AbsentScope::Class(class) => {
            let body = class.body.as_ref().ok_or_else(|| EngineError::MissingClassBody {
                class: class.name.clone(),
            })?;
            let literals = literals_in(capability, fragment, FragmentScope::ClassBody)?;
            let member = text::reindent(fragment, &body.member_indent, &literals);

            match &body.empty_interior {
                Some(interior) => Ok(Edit::new(
                    interior.start,
                    interior.end,
                    format!("\n{}{member}\n{}", body.member_indent, body.header_indent),
                    &content[interior.clone()],
                )),
                None => Ok(Edit::insert(
                    body.insert_at,
                    format!("{}{}{member}", capability.member_gap(), body.member_indent),
                )),
            }
        }
    }
}

fn append_top_level(capability: &dyn SyntaxCapability, content: &str, text: &str) -> Edit {
    let kept = content.trim_end().len();
    let new_text = if kept == 0 {
        format!("{text}\n")
    } else {
        format!("{}{text}\n", capability.top_level_gap())
    };
    Edit::new(kept, content.len(), new_text, &content[kept..])
}

/// Delete `node` with its attachments, whole lines at a time.
///
/// One adjacent run of blank lines goes with it (the one before, else the
/// one after) so no double gap is left behind. Removing the only member of
/// a class leaves the language's placeholder statement when it has one.
fn removal(
    capability: &dyn SyntaxCapability,
    content: &str,
    node: &DefinitionNode,
    parent: Option<&DefinitionNode>,
) -> Edit {
    let span = node.full_range();
    let indent = text::indent_at(content, span.start).to_string();

    let mut start = span.start;
    if text::starts_line(content, start) {
        start = text::line_start(content, start);
    }
    let mut end = span.end;
    let line_end = text::line_end(content, end);
    if content[end..line_end].trim().is_empty() {
        end = (line_end + 1).min(content.len());
    }
    let whole_lines = start == text::line_start(content, start)
        && (end == content.len() || content[..end].ends_with('\n'));

    let sole_member = parent
        .and_then(|p| p.body.as_ref())
        .is_some_and(|body| body.items == 1);
    if let (true, Some(placeholder)) = (sole_member, capability.empty_body_placeholder()) {
        let newline = if content[..end].ends_with('\n') { "\n" } else { "" };
        return Edit::new(
            start,
            end,
            format!("{indent}{placeholder}{newline}"),
            &content[start..end],
        );
    }

    if whole_lines {
        let before = text::skip_blank_lines_before(content, start);
        if before < start {
            start = before;
        } else {
            end = text::skip_blank_lines_after(content, end);
        }
    }

    Edit::new(start, end, "", &content[start..end])
}
