//! Split a multi-definition request body into one part per definition.

use crate::lang::{FragmentScope, SyntaxCapability};
use crate::locator::ElementLocator;
use crate::merge::{self, EngineError};
use crate::syntax::DefinitionNode;
use tracing::warn;

/// One definition's worth of a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPart {
    pub locator: ElementLocator,
    pub body: String,
}

/// Split `body` when it holds several definitions.
///
/// Each part is addressed in the request's scope: top-level names for a
/// one-segment locator, `Class.name` for a two-segment one (so a method
/// list may be sent for a single method's locator). A body with zero or one
/// definition is returned unchanged as a single part. Each part keeps its
/// own decorators and leading comments. Text outside every definition is
/// dropped with a warning.
pub fn split(
    capability: &dyn SyntaxCapability,
    locator: &ElementLocator,
    body: &str,
) -> Result<Vec<SplitPart>, EngineError> {
    let scope = match locator {
        ElementLocator::Item { .. } => FragmentScope::TopLevel,
        ElementLocator::Member { .. } => FragmentScope::ClassBody,
    };
    let fragment = merge::normalize_body(capability, body, scope)?;
    let unchanged = || {
        vec![SplitPart {
            locator: locator.clone(),
            body: body.to_string(),
        }]
    };
    if fragment.is_empty() {
        return Ok(unchanged());
    }

    let tree = capability.parse_fragment(&fragment, scope)?;
    EngineError::check(&tree)?;

    if tree.definitions.len() <= 1 {
        return Ok(unchanged());
    }

    for stray in stray_text(&fragment, &tree.definitions) {
        warn!("dropping text outside any definition in body for {locator}: {stray:?}");
    }

    Ok(tree
        .definitions
        .iter()
        .map(|def| SplitPart {
            locator: locator.sibling(def.name.clone()),
            body: fragment[def.full_range()].to_string(),
        })
        .collect())
}

/// Non-blank text before, between and after `definitions`.
fn stray_text<'f>(fragment: &'f str, definitions: &[DefinitionNode]) -> Vec<&'f str> {
    let mut gaps = Vec::new();
    let mut cursor = 0;
    for def in definitions {
        let span = def.full_range();
        gaps.push(&fragment[cursor..span.start.max(cursor)]);
        cursor = span.end.max(cursor);
    }
    gaps.push(&fragment[cursor..]);
    gaps.into_iter()
        .map(|gap| gap.trim_matches(|c: char| c.is_whitespace() || c == ';'))
        .filter(|gap| !gap.is_empty())
        .collect()
}
