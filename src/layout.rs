//! On-disk names under one coordination root.

use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

/// Well-known file locations shared by every cooperating process. Keeping
/// them under a caller-chosen root lets tests coordinate inside a tempdir
/// and makes `rm -r <root>` the teardown story.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn region_path(&self) -> PathBuf {
        self.root.join("counter.region")
    }

    pub fn leader_lock_path(&self) -> PathBuf {
        self.root.join("leader.lock")
    }

    pub fn journal_path(&self) -> PathBuf {
        self.root.join("events.log")
    }
}
