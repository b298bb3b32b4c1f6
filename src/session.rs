//! Per-file staging state.
//!
//! A [`FileSession`] holds the content a file had when it was first touched
//! and the working content every accepted request has been applied to.
//! Nothing reaches disk until the orchestrator commits the session.

use crate::diff::{self, FileDiff};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Committed,
    RolledBack { reason: String },
    Skipped { reason: String },
}

/// A request accepted into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRequest {
    /// Position of the request in the run.
    pub index: usize,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct FileSession {
    path: PathBuf,
    /// `None` when the file did not exist.
    original: Option<String>,
    original_digest: Option<u64>,
    working: String,
    applied: Vec<AppliedRequest>,
    tombstoned: bool,
    destination: Option<PathBuf>,
    status: SessionStatus,
}

impl FileSession {
    /// Read `path` from disk; a missing file starts an empty session.
    pub fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let original = match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };
        Ok(Self::from_content(path, original))
    }

    pub fn from_content(path: impl Into<PathBuf>, original: Option<String>) -> Self {
        let working = original.clone().unwrap_or_default();
        Self {
            path: path.into(),
            original_digest: original.as_deref().map(|c| xxh3_64(c.as_bytes())),
            original,
            working,
            applied: Vec::new(),
            tombstoned: false,
            destination: None,
            status: SessionStatus::Pending,
        }
    }

    /// A fresh empty session for a file that was marked for deletion earlier
    /// in the run. The on-disk content stays the "before" side of the diff.
    pub fn recreated(&self) -> Self {
        Self {
            path: self.path.clone(),
            original: self.original.clone(),
            original_digest: self.original_digest,
            working: String::new(),
            applied: self.applied.clone(),
            tombstoned: false,
            destination: None,
            status: SessionStatus::Pending,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    pub fn working(&self) -> &str {
        &self.working
    }

    pub fn applied(&self) -> &[AppliedRequest] {
        &self.applied
    }

    pub fn is_tombstoned(&self) -> bool {
        self.tombstoned
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    /// Where the working content will be written.
    pub fn effective_path(&self) -> &Path {
        self.destination.as_deref().unwrap_or(&self.path)
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn set_working(&mut self, content: String, index: usize, summary: impl Into<String>) {
        self.working = content;
        self.record(index, summary);
    }

    pub fn tombstone(&mut self, index: usize) {
        self.tombstoned = true;
        self.destination = None;
        self.record(index, "delete file");
    }

    pub fn move_to(&mut self, destination: PathBuf, index: usize) {
        let summary = format!("move to {}", destination.display());
        self.destination = Some(destination);
        self.record(index, summary);
    }

    fn record(&mut self, index: usize, summary: impl Into<String>) {
        self.applied.push(AppliedRequest {
            index,
            summary: summary.into(),
        });
    }

    /// True when committing would change anything on disk.
    pub fn has_changes(&self) -> bool {
        if self.tombstoned {
            return self.original.is_some();
        }
        if self.destination.is_some() {
            return true;
        }
        match &self.original {
            Some(original) => *original != self.working,
            None => !self.applied.is_empty(),
        }
    }

    /// Content the file will have after commit; `None` when it is deleted.
    pub fn final_content(&self) -> Option<&str> {
        (!self.tombstoned).then_some(self.working.as_str())
    }

    pub fn diff(&self) -> FileDiff {
        diff::diff(
            self.original.as_deref().unwrap_or(""),
            self.final_content().unwrap_or(""),
        )
    }

    /// True when the file on disk still matches what was read.
    pub fn disk_unchanged(&self) -> io::Result<bool> {
        match (fs::read(&self.path), self.original_digest) {
            (Ok(bytes), Some(digest)) => Ok(xxh3_64(&bytes) == digest),
            (Ok(_), None) => Ok(false),
            (Err(e), None) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            (Err(e), Some(_)) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            (Err(e), _) => Err(e),
        }
    }

    pub fn mark_committed(&mut self) {
        self.status = SessionStatus::Committed;
    }

    pub fn mark_rolled_back(&mut self, reason: impl Into<String>) {
        self.status = SessionStatus::RolledBack {
            reason: reason.into(),
        };
    }

    pub fn mark_skipped(&mut self, reason: impl Into<String>) {
        self.status = SessionStatus::Skipped {
            reason: reason.into(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let session = FileSession::load(dir.path().join("new.py")).unwrap();
        assert!(session.original().is_none());
        assert_eq!(session.working(), "");
        assert!(!session.has_changes());
    }

    #[test]
    fn changes_track_working_content() {
        let mut session = FileSession::from_content("a.py", Some("x = 1\n".into()));
        assert!(!session.has_changes());

        session.set_working("x = 2\n".into(), 0, "full file");
        assert!(session.has_changes());
        assert_eq!(session.diff().insertions(), 1);

        session.set_working("x = 1\n".into(), 1, "full file");
        assert!(!session.has_changes());
        assert_eq!(session.applied().len(), 2);
    }

    #[test]
    fn tombstone_then_recreate() {
        let mut session = FileSession::from_content("a.py", Some("x = 1\n".into()));
        session.tombstone(0);
        assert!(session.has_changes());
        assert_eq!(session.final_content(), None);
        assert_eq!(session.diff().deletions(), 1);

        let fresh = session.recreated();
        assert!(!fresh.is_tombstoned());
        assert_eq!(fresh.working(), "");
        assert_eq!(fresh.original(), Some("x = 1\n"));
    }

    #[test]
    fn tombstoning_a_missing_file_changes_nothing() {
        let mut session = FileSession::from_content("ghost.py", None);
        session.tombstone(0);
        assert!(!session.has_changes());
    }

    #[test]
    fn disk_digest_detects_external_edits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.py");
        fs::write(&path, "x = 1\n").unwrap();

        let session = FileSession::load(&path).unwrap();
        assert!(session.disk_unchanged().unwrap());

        fs::write(&path, "x = 99\n").unwrap();
        assert!(!session.disk_unchanged().unwrap());

        fs::remove_file(&path).unwrap();
        assert!(!session.disk_unchanged().unwrap());
    }

    #[test]
    fn move_sets_effective_path() {
        let mut session = FileSession::from_content("a.py", Some(String::new()));
        session.move_to(PathBuf::from("b.py"), 3);
        assert_eq!(session.effective_path(), Path::new("b.py"));
        assert!(session.has_changes());
    }
}
