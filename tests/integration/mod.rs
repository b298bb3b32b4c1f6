//! Integration tests for the staging → confirmation → commit pipeline.
//!
//! Each test builds a throwaway workspace in a temp directory, runs change
//! requests through the orchestrator and inspects both the staged state and
//! what ends up on disk.

mod ingestion;
mod operations;
mod pipeline;
mod properties;

use patchwright::{ApproveAll, ChangeRequest, Orchestrator, RunOptions, RunSummary};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temp directory acting as the request root.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(RunOptions::new(self.root()))
    }

    /// Stage `requests`, approve everything and commit.
    pub fn run(&self, requests: Vec<ChangeRequest>) -> RunSummary {
        let mut orchestrator = self.orchestrator();
        orchestrator.process(requests);
        let confirmed = orchestrator.confirm_with(&mut ApproveAll);
        orchestrator.commit(&confirmed)
    }
}
