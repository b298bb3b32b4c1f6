//! Thread-local parser pooling.
//!
//! Tree-sitter parsers are not `Sync` and are costly to set up, so each
//! thread keeps one parser per grammar. A parser is created on first use and
//! reused for every later parse on that thread.

use crate::lang::{Language, SourceParser, SyntaxError};
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

thread_local! {
    static PARSERS: RefCell<HashMap<Language, SourceParser>> = RefCell::new(HashMap::new());
}

/// Execute function with the pooled parser for `language`.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use patchwright::lang::Language;
/// use patchwright::pool::with_parser;
///
/// let has_errors = with_parser(Language::Python, |parser| {
///     parser.parse_with_source("def f(): pass\n").map(|p| p.has_errors())
/// })??;
/// assert!(!has_errors);
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(language: Language, f: F) -> Result<R, SyntaxError>
where
    F: FnOnce(&mut SourceParser) -> R,
{
    PARSERS.with(|cell| {
        let mut parsers = cell.borrow_mut();
        let parser = match parsers.entry(language) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(SourceParser::new(language)?),
        };
        Ok(f(parser))
    })
}
