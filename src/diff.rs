//! Line diff between a file's original and working content.

use similar::{ChangeTag, TextDiff};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTag {
    Equal,
    Insert,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChange {
    pub tag: LineTag,
    /// 1-based line in the original content.
    pub old_line: Option<usize>,
    /// 1-based line in the working content.
    pub new_line: Option<usize>,
    /// Line text without its terminator.
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    pub changes: Vec<LineChange>,
}

impl FileDiff {
    pub fn insertions(&self) -> usize {
        self.count(LineTag::Insert)
    }

    pub fn deletions(&self) -> usize {
        self.count(LineTag::Delete)
    }

    /// True when both sides are identical.
    pub fn is_empty(&self) -> bool {
        self.changes.iter().all(|c| c.tag == LineTag::Equal)
    }

    fn count(&self, tag: LineTag) -> usize {
        self.changes.iter().filter(|c| c.tag == tag).count()
    }
}

/// Line-level diff of `original` against `working`.
pub fn diff(original: &str, working: &str) -> FileDiff {
    let text_diff = TextDiff::from_lines(original, working);
    let changes = text_diff
        .iter_all_changes()
        .map(|change| LineChange {
            tag: match change.tag() {
                ChangeTag::Equal => LineTag::Equal,
                ChangeTag::Insert => LineTag::Insert,
                ChangeTag::Delete => LineTag::Delete,
            },
            old_line: change.old_index().map(|i| i + 1),
            new_line: change.new_index().map(|i| i + 1),
            text: change
                .value()
                .trim_end_matches('\n')
                .trim_end_matches('\r')
                .to_string(),
        })
        .collect();
    FileDiff { changes }
}

/// Unified diff with three lines of context, labelled with `path`.
pub fn unified(original: &str, working: &str, path: &Path) -> String {
    let label = path.display().to_string();
    let text_diff = TextDiff::from_lines(original, working);
    let mut unified = text_diff.unified_diff();
    unified
        .context_radius(3)
        .header(&format!("a/{label}"), &format!("b/{label}"));
    unified.to_string()
}
