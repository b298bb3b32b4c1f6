use super::{ChangeRequest, Operation, RequestKind};
use crate::locator::{ElementLocator, LocatorParseError};
use crate::merge::Mode;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// A request record as it appears in a request file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RawRecord {
    pub kind: RecordKind,
    pub path: String,
    #[serde(default)]
    pub locator: Option<String>,
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub operation: Option<OperationKind>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    #[serde(alias = "FullFile")]
    FullFile,
    #[serde(alias = "Element")]
    Element,
    #[serde(alias = "Operation")]
    Operation,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    MoveFile,
    DeleteFile,
    DeleteMethod,
}

/// Why a record was rejected. `index` is the record's 0-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordIssue {
    Malformed {
        index: usize,
        message: String,
    },
    MissingField {
        index: usize,
        field: &'static str,
    },
    InvalidCombo {
        index: usize,
        message: String,
    },
    InvalidLocator {
        index: usize,
        source: LocatorParseError,
    },
}

impl RecordIssue {
    pub fn index(&self) -> usize {
        match self {
            RecordIssue::Malformed { index, .. }
            | RecordIssue::MissingField { index, .. }
            | RecordIssue::InvalidCombo { index, .. }
            | RecordIssue::InvalidLocator { index, .. } => *index,
        }
    }
}

impl fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordIssue::Malformed { index, message } => {
                write!(f, "record #{} is malformed: {message}", index + 1)
            }
            RecordIssue::MissingField { index, field } => {
                write!(f, "record #{} missing required field '{field}'", index + 1)
            }
            RecordIssue::InvalidCombo { index, message } => {
                write!(f, "record #{} has invalid fields: {message}", index + 1)
            }
            RecordIssue::InvalidLocator { index, source } => {
                write!(f, "record #{} has an invalid locator: {source}", index + 1)
            }
        }
    }
}

impl std::error::Error for RecordIssue {}

impl RawRecord {
    /// Validate the record into a request.
    pub fn into_request(self, index: usize) -> Result<ChangeRequest, RecordIssue> {
        if self.path.trim().is_empty() {
            return Err(RecordIssue::MissingField {
                index,
                field: "path",
            });
        }
        let invalid = |message: &str| RecordIssue::InvalidCombo {
            index,
            message: message.to_string(),
        };
        let missing = |field| RecordIssue::MissingField { index, field };

        if self.kind != RecordKind::Operation
            && (self.operation.is_some() || self.target.is_some())
        {
            return Err(invalid("operation fields are only valid on operation records"));
        }

        let kind = match self.kind {
            RecordKind::FullFile => {
                if self.locator.is_some() || self.mode.is_some() {
                    return Err(invalid("full_file records take no locator or mode"));
                }
                RequestKind::FullFile {
                    body: self.body.ok_or_else(|| missing("body"))?,
                }
            }
            RecordKind::Element => {
                let locator: ElementLocator = self
                    .locator
                    .ok_or_else(|| missing("locator"))?
                    .parse()
                    .map_err(|source| RecordIssue::InvalidLocator { index, source })?;
                RequestKind::Element {
                    locator,
                    mode: self.mode.unwrap_or_default(),
                    body: self.body.ok_or_else(|| missing("body"))?,
                }
            }
            RecordKind::Operation => {
                if self.locator.is_some() || self.body.is_some() {
                    return Err(invalid("operation records take no locator or body"));
                }
                let operation = match self.operation.ok_or_else(|| missing("operation"))? {
                    OperationKind::MoveFile => Operation::MoveFile {
                        target: PathBuf::from(
                            self.target
                                .filter(|t| !t.trim().is_empty())
                                .ok_or_else(|| missing("target"))?,
                        ),
                    },
                    OperationKind::DeleteFile => Operation::DeleteFile,
                    OperationKind::DeleteMethod => {
                        let class = self.class.ok_or_else(|| missing("class"))?;
                        let method = self.method.ok_or_else(|| missing("method"))?;
                        // Validate both names through the locator grammar.
                        format!("{class}.{method}")
                            .parse::<ElementLocator>()
                            .map_err(|source| RecordIssue::InvalidLocator { index, source })?;
                        Operation::DeleteMethod { class, method }
                    }
                };
                RequestKind::Operation(operation)
            }
        };

        Ok(ChangeRequest {
            path: PathBuf::from(self.path),
            kind,
        })
    }
}
