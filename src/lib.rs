//! Patchwright: structured change requests for Python and JavaScript/TypeScript
//!
//! Requests name a file and either a whole new body, one element to replace
//! or merge (`Class`, `function`, `Class.method`), or a file operation.
//! They are staged in memory per file, shown as diffs, validated with
//! tree-sitter and only then written.
//!
//! # Architecture
//!
//! Every element change compiles down to a single primitive: [`Edit`], a
//! verified byte-span replacement against the working copy. Intelligence
//! lives in span acquisition (the [`lang`] lowering and the [`locator`]),
//! not in the application logic.
//!
//! # Safety
//!
//! - All edits verify expected before-text before applying
//! - Nothing touches disk before confirmation and validation
//! - Atomic file writes (tempfile + fsync + rename)
//! - A file that fails validation is rolled back and left byte-identical
//! - Replacing an element with its own text is a no-op
//!
//! # Example
//!
//! ```no_run
//! use patchwright::{ApproveAll, ChangeRequest, ElementLocator, Mode, Orchestrator, RunOptions};
//!
//! let mut orchestrator = Orchestrator::new(RunOptions::new("/srv/app"));
//! let staged = orchestrator.process([ChangeRequest::element(
//!     "service.py",
//!     ElementLocator::member("Service", "run"),
//!     Mode::Merge,
//!     "def run(self):\n    return 42\n",
//! )]);
//!
//! for change in &staged {
//!     print!("{}", change.unified_diff());
//! }
//!
//! let confirmed = orchestrator.confirm_with(&mut ApproveAll);
//! let summary = orchestrator.commit(&confirmed);
//! println!("wrote {} file(s)", summary.written.len());
//! ```

pub mod diff;
pub mod edit;
pub mod lang;
pub mod locator;
pub mod merge;
pub mod orchestrator;
pub mod pool;
pub mod request;
pub mod session;
pub mod splitter;
pub mod syntax;
pub mod text;
pub mod validate;

// Re-exports
pub use diff::{FileDiff, LineChange, LineTag};
pub use edit::{Edit, EditError, EditVerification};
pub use lang::{
    ErrorLocation, JavaScriptSyntax, Language, PythonSyntax, Syntax, SyntaxCapability,
    SyntaxError,
};
pub use locator::{ElementLocator, Location, LocatorParseError};
pub use merge::{EngineError, Mode};
pub use orchestrator::{
    ApproveAll, Confirmation, Orchestrator, RequestError, RequestFailure, RunOptions,
    RunSummary, StagedChange,
};
pub use request::{
    load_from_path, load_from_str, ChangeRequest, IngestError, IngestReport, Operation,
    RecordIssue, RequestFormat, RequestKind,
};
pub use session::{FileSession, SessionStatus};
pub use splitter::SplitPart;
pub use syntax::{DefinitionNode, NodeKind, SyntaxTree};
pub use validate::{ValidationError, Validator};
