//! Pipeline orchestrator.
//!
//! Requests are staged in order into per-file [`FileSession`]s:
//! split → locate → compute edit → apply to the working copy. Nothing touches
//! disk until [`Orchestrator::commit`], which validates each confirmed session
//! and writes it atomically, or rolls it back leaving the file untouched.
//! Request failures and rollbacks are collected, never fatal to the run.

use crate::diff::{self, FileDiff};
use crate::edit;
use crate::lang::{Syntax, SyntaxCapability};
use crate::locator::{self, AbsentScope, ElementLocator, Location};
use crate::merge::{self, EngineError, Mode};
use crate::request::{ChangeRequest, Operation, RequestKind};
use crate::session::{FileSession, SessionStatus};
use crate::splitter::{self, SplitPart};
use crate::validate::{ValidationError, Validator};
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Relative request paths resolve against this directory.
    pub root: PathBuf,
    /// Skip writing a file whose disk content changed after it was read.
    pub check_disk_unchanged: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            check_disk_unchanged: true,
        }
    }
}

impl RunOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no syntax support for {path}")]
    UnsupportedLanguage { path: PathBuf },

    #[error("operation conflict: {message}")]
    OperationConflict { message: String },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl RequestError {
    fn conflict(message: impl Into<String>) -> Self {
        RequestError::OperationConflict {
            message: message.into(),
        }
    }
}

/// A request that could not be staged. `index` is its 0-based position.
#[derive(Debug)]
pub struct RequestFailure {
    pub index: usize,
    pub path: PathBuf,
    pub error: RequestError,
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "request #{} ({}): {}",
            self.index + 1,
            self.path.display(),
            self.error
        )
    }
}

/// What a confirmed commit would do to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedChange {
    pub path: PathBuf,
    pub destination: Option<PathBuf>,
    pub original: String,
    /// Final content; empty for deletions.
    pub working: String,
    pub tombstoned: bool,
    pub diff: FileDiff,
}

impl StagedChange {
    /// Where the content ends up.
    pub fn target(&self) -> &Path {
        self.destination.as_deref().unwrap_or(&self.path)
    }

    pub fn unified_diff(&self) -> String {
        diff::unified(&self.original, &self.working, self.target())
    }
}

/// Decides which staged changes may be committed.
pub trait Confirmation {
    fn confirm(&mut self, change: &StagedChange) -> bool;
}

impl<F> Confirmation for F
where
    F: FnMut(&StagedChange) -> bool,
{
    fn confirm(&mut self, change: &StagedChange) -> bool {
        self(change)
    }
}

/// Confirms everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproveAll;

impl Confirmation for ApproveAll {
    fn confirm(&mut self, _change: &StagedChange) -> bool {
        true
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub written: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub rolled_back: Vec<(PathBuf, String)>,
    pub skipped: Vec<(PathBuf, String)>,
    pub failures: Vec<RequestFailure>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.rolled_back.is_empty() && self.failures.is_empty()
    }
}

#[derive(Debug)]
pub struct Orchestrator {
    syntax: Syntax,
    options: RunOptions,
    sessions: IndexMap<PathBuf, FileSession>,
    /// Move targets pointing at the session they alias.
    aliases: HashMap<PathBuf, PathBuf>,
    failures: Vec<RequestFailure>,
    next_index: usize,
}

impl Orchestrator {
    pub fn new(options: RunOptions) -> Self {
        Self::with_syntax(Syntax::builtin(), options)
    }

    pub fn with_syntax(syntax: Syntax, options: RunOptions) -> Self {
        Self {
            syntax,
            options,
            sessions: IndexMap::new(),
            aliases: HashMap::new(),
            failures: Vec::new(),
            next_index: 0,
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Stage every request in order and return the resulting changes.
    pub fn process<I>(&mut self, requests: I) -> Vec<StagedChange>
    where
        I: IntoIterator<Item = ChangeRequest>,
    {
        for request in requests {
            self.submit(request);
        }
        self.staged()
    }

    /// Stage one request. Returns false (and records the failure) when the
    /// request was dropped.
    pub fn submit(&mut self, request: ChangeRequest) -> bool {
        let index = self.next_index;
        self.next_index += 1;

        match self.stage(index, &request) {
            Ok(()) => {
                debug!("staged request #{} ({}) for {}", index + 1, request.kind, request.path.display());
                true
            }
            Err(error) => {
                warn!("request #{} for {} failed: {error}", index + 1, request.path.display());
                self.failures.push(RequestFailure {
                    index,
                    path: request.path,
                    error,
                });
                false
            }
        }
    }

    pub fn failures(&self) -> &[RequestFailure] {
        &self.failures
    }

    pub fn sessions(&self) -> impl Iterator<Item = &FileSession> {
        self.sessions.values()
    }

    /// Sessions that would change something on commit, in first-touch order.
    pub fn staged(&self) -> Vec<StagedChange> {
        self.sessions
            .values()
            .filter(|s| *s.status() == SessionStatus::Pending && s.has_changes())
            .map(|s| StagedChange {
                path: s.path().to_path_buf(),
                destination: s.destination().map(Path::to_path_buf),
                original: s.original().unwrap_or_default().to_string(),
                working: s.final_content().unwrap_or_default().to_string(),
                tombstoned: s.is_tombstoned(),
                diff: s.diff(),
            })
            .collect()
    }

    /// Validate staged content without writing. `Ok(false)` marks files
    /// without a registered grammar.
    pub fn validate_staged(&self) -> Vec<(PathBuf, Result<bool, ValidationError>)> {
        let validator = Validator::new(&self.syntax);
        self.staged()
            .into_iter()
            .filter(|change| !change.tombstoned)
            .map(|change| {
                let result = validator.validate_for_path(change.target(), &change.working);
                (change.path, result)
            })
            .collect()
    }

    /// Ask `confirmation` about each staged change.
    pub fn confirm_with<C>(&self, confirmation: &mut C) -> HashSet<PathBuf>
    where
        C: Confirmation + ?Sized,
    {
        self.staged()
            .into_iter()
            .filter(|change| confirmation.confirm(change))
            .map(|change| change.path)
            .collect()
    }

    /// Validate and write every confirmed session.
    pub fn commit(&mut self, confirmed: &HashSet<PathBuf>) -> RunSummary {
        let mut summary = RunSummary {
            failures: std::mem::take(&mut self.failures),
            ..RunSummary::default()
        };
        let validator = Validator::new(&self.syntax);

        for (path, session) in self.sessions.iter_mut() {
            if *session.status() != SessionStatus::Pending {
                continue;
            }
            if !session.has_changes() {
                skip(&mut summary, session, "no changes");
                continue;
            }
            if !confirmed.contains(path) {
                skip(&mut summary, session, "not confirmed");
                continue;
            }
            if self.options.check_disk_unchanged {
                match session.disk_unchanged() {
                    Ok(true) => {}
                    Ok(false) => {
                        skip(&mut summary, session, "modified externally since it was read");
                        continue;
                    }
                    Err(e) => {
                        skip(&mut summary, session, &format!("cannot re-read: {e}"));
                        continue;
                    }
                }
            }

            if session.is_tombstoned() {
                match edit::remove_file(path) {
                    Ok(()) => {
                        info!("deleted {}", path.display());
                        session.mark_committed();
                        summary.deleted.push(path.clone());
                    }
                    Err(e) => roll_back(&mut summary, session, &e.to_string()),
                }
                continue;
            }

            let target = session.effective_path().to_path_buf();
            if let Err(e) = validator.validate_for_path(&target, session.working()) {
                roll_back(&mut summary, session, &e.to_string());
                continue;
            }
            if let Err(e) = edit::write_file(&target, session.working()) {
                roll_back(&mut summary, session, &e.to_string());
                continue;
            }
            if target != *path {
                if let Err(e) = edit::remove_file(path) {
                    warn!("moved {} to {} but could not remove the source: {e}", path.display(), target.display());
                }
            }

            info!("wrote {}", target.display());
            session.mark_committed();
            summary.written.push(target);
        }

        summary
    }

    fn stage(&mut self, index: usize, request: &ChangeRequest) -> Result<(), RequestError> {
        match &request.kind {
            RequestKind::FullFile { body } => {
                let key = self.ensure_session(&request.path, true)?;
                self.sessions[&key].set_working(body.clone(), index, "full file");
            }
            RequestKind::Element {
                locator,
                mode,
                body,
            } => {
                self.stage_element(index, &request.path, locator, *mode, body, request.kind.to_string())?;
            }
            RequestKind::Operation(Operation::MoveFile { target }) => {
                self.stage_move(index, &request.path, target)?;
            }
            RequestKind::Operation(Operation::DeleteFile) => {
                let key = self.ensure_session(&request.path, false)?;
                self.sessions[&key].tombstone(index);
                // A pending move is cancelled; its target no longer names this file.
                self.aliases.retain(|_, source| *source != key);
            }
            RequestKind::Operation(Operation::DeleteMethod { class, method }) => {
                let locator = ElementLocator::member(class.clone(), method.clone());
                self.stage_element(index, &request.path, &locator, Mode::Replace, "", request.kind.to_string())?;
            }
        }
        Ok(())
    }

    fn stage_element(
        &mut self,
        index: usize,
        path: &Path,
        locator: &ElementLocator,
        mode: Mode,
        body: &str,
        summary: String,
    ) -> Result<(), RequestError> {
        let key = self.ensure_session(path, true)?;
        let session = &mut self.sessions[&key];
        let capability = self.syntax.for_path(session.effective_path()).ok_or_else(|| {
            RequestError::UnsupportedLanguage {
                path: session.effective_path().to_path_buf(),
            }
        })?;

        let parts = splitter::split(capability, locator, body)?;
        if parts.len() > 1 {
            debug!("split body for {locator} into {} parts", parts.len());
        }

        // All parts apply or none do.
        let mut working = session.working().to_string();
        let mut changed = false;
        for part in &parts {
            if let Some(next) = apply_part(capability, &working, part, mode)? {
                working = next;
                changed = true;
            }
        }
        if changed {
            session.set_working(working, index, summary);
        } else {
            debug!("request #{} left {} unchanged", index + 1, key.display());
        }
        Ok(())
    }

    fn stage_move(&mut self, index: usize, path: &Path, target: &Path) -> Result<(), RequestError> {
        let source = self.session_key(path);
        let target = self.resolve(target);
        if source == target {
            return Err(RequestError::conflict(format!(
                "cannot move {} onto itself",
                source.display()
            )));
        }
        if self.sessions.contains_key(&target) || self.aliases.contains_key(&target) {
            return Err(RequestError::conflict(format!(
                "move target {} already has pending changes",
                target.display()
            )));
        }

        let key = self.ensure_session(path, false)?;
        let session = &mut self.sessions[&key];
        if session.is_tombstoned() {
            return Err(RequestError::conflict(format!(
                "cannot move {}: it is marked for deletion",
                key.display()
            )));
        }
        if session.original().is_none() && session.applied().is_empty() {
            return Err(RequestError::conflict(format!(
                "cannot move {}: file does not exist",
                key.display()
            )));
        }

        if let Some(previous) = session.destination().map(Path::to_path_buf) {
            self.aliases.remove(&previous);
        }
        session.move_to(target.clone(), index);
        info!("{} will move to {}", key.display(), target.display());
        self.aliases.insert(target, key);
        Ok(())
    }

    /// Load (once) the session for `path` and return its key. A tombstoned
    /// session is replaced by a fresh empty one when `recreate` is set.
    fn ensure_session(&mut self, path: &Path, recreate: bool) -> Result<PathBuf, RequestError> {
        let key = self.session_key(path);
        let session = match self.sessions.entry(key.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let session = FileSession::load(entry.key().clone()).map_err(|source| {
                    RequestError::Io {
                        path: key.clone(),
                        source,
                    }
                })?;
                debug!("opened session for {}", key.display());
                entry.insert(session)
            }
        };
        if recreate && session.is_tombstoned() {
            info!("recreating {} after deletion", key.display());
            *session = session.recreated();
        }
        Ok(key)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        normalize(&self.options.root.join(path))
    }

    fn session_key(&self, path: &Path) -> PathBuf {
        let resolved = self.resolve(path);
        self.aliases.get(&resolved).cloned().unwrap_or(resolved)
    }
}

/// Apply one split part to `working`. `None` when nothing changes.
fn apply_part(
    capability: &dyn SyntaxCapability,
    working: &str,
    part: &SplitPart,
    mode: Mode,
) -> Result<Option<String>, EngineError> {
    let tree = capability.parse(working)?;
    let location = locator::locate(&tree, &part.locator);

    let Some(edit) = merge::compute(capability, working, &part.locator, &location, &part.body, mode)?
    else {
        debug!("{} not found; nothing to delete", part.locator);
        return Ok(None);
    };

    match location {
        Location::Found { .. } => {
            let candidates = locator::candidates(&tree, &part.locator);
            if candidates > 1 {
                debug!("{} matches {candidates} elements; using the first", part.locator);
            }
        }
        Location::Absent(AbsentScope::MissingClass) => {
            let class = part.locator.class().unwrap_or_default();
            match locator::similar_class(&tree, class) {
                Some(hint) => warn!("class `{class}` not found, creating it (did you mean `{hint}`?)"),
                None => info!("class `{class}` not found, creating it"),
            }
        }
        Location::Absent(_) => debug!("{} not found; appending", part.locator),
    }

    let next = edit.apply_to(working)?;
    Ok((next != working).then_some(next))
}

fn skip(summary: &mut RunSummary, session: &mut FileSession, reason: &str) {
    debug!("skipping {}: {reason}", session.path().display());
    session.mark_skipped(reason);
    summary
        .skipped
        .push((session.path().to_path_buf(), reason.to_string()));
}

fn roll_back(summary: &mut RunSummary, session: &mut FileSession, reason: &str) {
    warn!("rolled back {}: {reason}", session.path().display());
    session.mark_rolled_back(reason);
    summary
        .rolled_back
        .push((session.path().to_path_buf(), reason.to_string()));
}

/// Lexically normalize a path: drop `.` and fold `..` where possible.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
