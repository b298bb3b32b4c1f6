use super::schema::{RawRecord, RecordIssue};
use super::ChangeRequest;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Request file format, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFormat {
    /// `[[request]]` array of tables.
    Toml,
    /// A bare array of records, or `{"request": [...]}`.
    Json,
}

impl RequestFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "toml" => Some(RequestFormat::Toml),
            "json" => Some(RequestFormat::Json),
            _ => None,
        }
    }
}

/// Accepted requests in file order, plus the records that were rejected.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub requests: Vec<ChangeRequest>,
    pub rejected: Vec<RecordIssue>,
}

#[derive(Debug)]
pub enum IngestError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Json {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
    UnknownFormat {
        path: PathBuf,
    },
}

impl IngestError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            IngestError::Toml { path: None, source } => IngestError::Toml {
                path: Some(path),
                source,
            },
            IngestError::Json { path: None, source } => IngestError::Json {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Io { path, source } => {
                write!(f, "failed to read requests from {}: {}", path.display(), source)
            }
            IngestError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse request TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse request TOML: {}", source),
            },
            IngestError::Json { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse request JSON ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse request JSON: {}", source),
            },
            IngestError::UnknownFormat { path } => write!(
                f,
                "cannot tell request format of {} (expected .toml or .json)",
                path.display()
            ),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::Io { source, .. } => Some(source),
            IngestError::Toml { source, .. } => Some(source),
            IngestError::Json { source, .. } => Some(source),
            IngestError::UnknownFormat { .. } => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RequestDocument {
    #[serde(default)]
    request: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonDocument {
    List(Vec<Value>),
    Wrapped(RequestDocument),
}

pub fn load_from_str(input: &str, format: RequestFormat) -> Result<IngestReport, IngestError> {
    let records = match format {
        RequestFormat::Toml => {
            let document: RequestDocument = toml_edit::de::from_str(input)
                .map_err(|source| IngestError::Toml { path: None, source })?;
            document.request
        }
        RequestFormat::Json => {
            let document: JsonDocument = serde_json::from_str(input)
                .map_err(|source| IngestError::Json { path: None, source })?;
            match document {
                JsonDocument::List(records) => records,
                JsonDocument::Wrapped(document) => document.request,
            }
        }
    };
    Ok(ingest_records(records))
}

pub fn load_from_path(path: &Path) -> Result<IngestReport, IngestError> {
    let format = RequestFormat::from_path(path).ok_or_else(|| IngestError::UnknownFormat {
        path: path.to_path_buf(),
    })?;
    let input = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&input, format).map_err(|e| e.with_path(path))
}

/// Validate loosely-typed records one by one.
pub fn ingest_records(records: Vec<Value>) -> IngestReport {
    let mut report = IngestReport::default();
    for (index, value) in records.into_iter().enumerate() {
        let parsed = serde_json::from_value::<RawRecord>(value)
            .map_err(|e| RecordIssue::Malformed {
                index,
                message: e.to_string(),
            })
            .and_then(|raw| raw.into_request(index));
        match parsed {
            Ok(request) => report.requests.push(request),
            Err(issue) => {
                tracing::warn!(%issue, "rejected request record");
                report.rejected.push(issue);
            }
        }
    }
    report
}
