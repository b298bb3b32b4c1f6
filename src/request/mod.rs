//! Change requests: what the pipeline is asked to do to one file.
//!
//! Requests arrive as loosely-typed records (TOML or JSON, see [`loader`]) and
//! are validated into [`ChangeRequest`]s by [`schema`]. A malformed record is
//! rejected on its own; the rest of the batch still runs.

pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, IngestError, IngestReport, RequestFormat};
pub use schema::{RawRecord, RecordIssue};

use crate::locator::ElementLocator;
use crate::merge::Mode;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    /// Target file, relative to the run root unless absolute.
    pub path: PathBuf,
    pub kind: RequestKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// Replace the whole file (creating it if needed).
    FullFile { body: String },
    /// Replace, merge, insert or (with an empty body) delete one element.
    Element {
        locator: ElementLocator,
        mode: Mode,
        body: String,
    },
    Operation(Operation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    MoveFile { target: PathBuf },
    DeleteFile,
    DeleteMethod { class: String, method: String },
}

impl ChangeRequest {
    pub fn full_file(path: impl Into<PathBuf>, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: RequestKind::FullFile { body: body.into() },
        }
    }

    pub fn element(
        path: impl Into<PathBuf>,
        locator: ElementLocator,
        mode: Mode,
        body: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kind: RequestKind::Element {
                locator,
                mode,
                body: body.into(),
            },
        }
    }

    pub fn operation(path: impl Into<PathBuf>, operation: Operation) -> Self {
        Self {
            path: path.into(),
            kind: RequestKind::Operation(operation),
        }
    }

    pub fn move_file(path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self::operation(
            path,
            Operation::MoveFile {
                target: target.into(),
            },
        )
    }

    pub fn delete_file(path: impl Into<PathBuf>) -> Self {
        Self::operation(path, Operation::DeleteFile)
    }

    pub fn delete_method(
        path: impl Into<PathBuf>,
        class: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self::operation(
            path,
            Operation::DeleteMethod {
                class: class.into(),
                method: method.into(),
            },
        )
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::FullFile { .. } => write!(f, "full file"),
            RequestKind::Element {
                locator,
                mode,
                body,
            } => {
                if body.trim().is_empty() {
                    write!(f, "delete {locator}")
                } else {
                    match mode {
                        Mode::Replace => write!(f, "replace {locator}"),
                        Mode::Merge => write!(f, "merge {locator}"),
                    }
                }
            }
            RequestKind::Operation(Operation::MoveFile { target }) => {
                write!(f, "move to {}", target.display())
            }
            RequestKind::Operation(Operation::DeleteFile) => write!(f, "delete file"),
            RequestKind::Operation(Operation::DeleteMethod { class, method }) => {
                write!(f, "delete method {class}.{method}")
            }
        }
    }
}
