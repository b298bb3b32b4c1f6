//! Line and indentation helpers shared by the splitter and the merge engine.
//!
//! All offsets are byte offsets into UTF-8 text. Helpers only ever split at
//! `'\n'` boundaries or after ASCII whitespace, so every returned offset is a
//! valid char boundary.

use std::ops::Range;

/// Offset of the first byte of the line containing `offset`.
pub fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map_or(0, |i| i + 1)
}

/// Offset of the `'\n'` terminating the line containing `offset`, or `text.len()`.
pub fn line_end(text: &str, offset: usize) -> usize {
    text[offset..].find('\n').map_or(text.len(), |i| offset + i)
}

/// Leading spaces/tabs of a single line.
pub fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// Indentation of the line containing `offset`.
pub fn indent_at(text: &str, offset: usize) -> &str {
    let start = line_start(text, offset);
    leading_whitespace(&text[start..line_end(text, offset)])
}

/// True when `text[start..offset]` of the current line holds only whitespace.
pub fn starts_line(text: &str, offset: usize) -> bool {
    text[line_start(text, offset)..offset].trim().is_empty()
}

/// True when the rest of the line after `offset` is blank, a separator, or a
/// trailing comment.
pub fn rest_of_line_is_trivia(text: &str, offset: usize) -> bool {
    let rest = text[offset..line_end(text, offset)].trim();
    rest.is_empty()
        || rest == ";"
        || rest == ","
        || rest.starts_with('#')
        || rest.starts_with("//")
}

/// One flag per `'\n'`-separated line of `text`: true when the line begins
/// inside one of `literals`.
pub fn literal_lines(text: &str, literals: &[Range<usize>]) -> Vec<bool> {
    let mut offset = 0;
    text.split('\n')
        .map(|line| {
            let start = offset;
            offset += line.len() + 1;
            literals.iter().any(|r| r.start < start && start < r.end)
        })
        .collect()
}

/// One flag per line: true for non-blank lines indented less than the first.
///
/// In a well-formed fragment only string literal content sits left of the
/// header, so this is a first guess at `literal_lines` before the fragment
/// can be parsed.
pub fn shallow_lines(text: &str) -> Vec<bool> {
    let mut lines = text.split('\n');
    let base = lines.next().map(leading_whitespace).unwrap_or("");
    std::iter::once(false)
        .chain(lines.map(|line| !line.trim().is_empty() && !line.starts_with(base)))
        .collect()
}

/// Remove the longest whitespace prefix shared by all non-blank lines.
///
/// Lines flagged in `verbatim` are copied unchanged and take no part in the
/// shared prefix. Other blank lines become empty. Line terminators are
/// normalized to `'\n'`.
pub fn dedent(text: &str, verbatim: &[bool]) -> String {
    let keep = |idx: usize| verbatim.get(idx).copied().unwrap_or(false);
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();

    let mut common: Option<&str> = None;
    for (idx, line) in lines.iter().enumerate() {
        if keep(idx) || line.trim().is_empty() {
            continue;
        }
        let indent = leading_whitespace(line);
        common = Some(match common {
            None => indent,
            Some(prev) => common_prefix(prev, indent),
        });
    }
    let common = common.unwrap_or("");

    lines
        .iter()
        .enumerate()
        .map(|(idx, &line)| {
            if keep(idx) {
                line
            } else if line.trim().is_empty() {
                ""
            } else {
                &line[common.len()..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..len]
}

/// Prefix every line except the first with `indent`.
///
/// The first line lands at a position whose indentation already exists in
/// the surrounding text. Blank lines stay empty. Lines that start inside one
/// of `literals` are left alone.
pub fn reindent(text: &str, indent: &str, literals: &[Range<usize>]) -> String {
    let verbatim = literal_lines(text, literals);
    let mut out = String::with_capacity(text.len() + indent.len() * 8);
    for (idx, line) in text.split('\n').enumerate() {
        if idx == 0 {
            out.push_str(line);
            continue;
        }
        out.push('\n');
        if verbatim[idx] {
            out.push_str(line);
        } else if !line.trim().is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
    }
    out
}

/// Prefix every non-blank line with `indent`, except lines starting inside
/// one of `literals`.
pub fn indent_block(text: &str, indent: &str, literals: &[Range<usize>]) -> String {
    let verbatim = literal_lines(text, literals);
    let mut out = String::with_capacity(text.len() + indent.len() * 8);
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        if verbatim[idx] {
            out.push_str(line);
        } else if !line.trim().is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
    }
    out
}

/// `body` without the blank lines around it.
pub fn trim_blank_lines(body: &str) -> &str {
    let lines: Vec<&str> = body.split('\n').collect();
    let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return "";
    };
    let last = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .unwrap_or(first);
    let start: usize = lines[..first].iter().map(|l| l.len() + 1).sum();
    let end: usize = start + lines[first..=last].iter().map(|l| l.len() + 1).sum::<usize>() - 1;
    &body[start..end]
}

/// Normalize a request body: drop blank lines around it, remove the common
/// indentation and trailing whitespace.
///
/// `verbatim` flags lines of the trimmed body that sit inside a string
/// literal and must keep their text.
pub fn normalize_fragment(body: &str, verbatim: &[bool]) -> String {
    dedent(trim_blank_lines(body), verbatim).trim_end().to_string()
}

/// Strip `indent` from every line after the first, except lines starting
/// inside one of `literals`. Lines indented less lose what they have.
pub fn outdent(text: &str, indent: &str, literals: &[Range<usize>]) -> String {
    let verbatim = literal_lines(text, literals);
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            if idx == 0 || verbatim[idx] {
                line
            } else {
                line.strip_prefix(indent).unwrap_or(line.trim_start())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip `indent` from the start of every line after the first and drop the
/// whitespace that follows the final newline.
///
/// Used to lift a decorator or comment block out of its original column.
pub fn strip_block_indent(block: &str, indent: &str) -> String {
    let mut out = String::with_capacity(block.len());
    for (idx, line) in block.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
            out.push_str(line.strip_prefix(indent).unwrap_or(line.trim_start()));
        } else {
            out.push_str(line);
        }
    }
    if let Some(pos) = out.rfind('\n') {
        if out[pos + 1..].trim().is_empty() {
            out.truncate(pos + 1);
        }
    }
    out
}

/// Move `pos` (a line start) backwards over whole blank lines.
pub fn skip_blank_lines_before(text: &str, mut pos: usize) -> usize {
    while pos > 0 {
        let prev = line_start(text, pos - 1);
        if text[prev..pos].trim().is_empty() {
            pos = prev;
        } else {
            break;
        }
    }
    pos
}

/// Move `pos` (a line start) forwards over whole blank lines.
pub fn skip_blank_lines_after(text: &str, mut pos: usize) -> usize {
    while pos < text.len() {
        let end = line_end(text, pos);
        if text[pos..end].trim().is_empty() {
            pos = (end + 1).min(text.len());
        } else {
            break;
        }
    }
    pos
}
