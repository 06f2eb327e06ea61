//! Worker process launching.

use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use crate::worker::Role;
use crate::Result;

/// Launches worker processes and reaps the ones that have exited.
///
/// Spawned children are not waited on; `spawn` returns the pid immediately.
/// Handles are retained so `reap` can collect exit statuses with a
/// non-blocking `try_wait` — a zombie still answers signal 0, so without
/// reaping the liveness check would report dead workers alive forever and no
/// replacement would ever start.
pub struct Spawner {
    program: PathBuf,
    children: Vec<Child>,
}

impl Spawner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            children: Vec::new(),
        }
    }

    /// Spawner for the currently running executable.
    pub fn current_exe() -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    /// Launch a worker for `role` against the coordination root. Does not
    /// wait; returns the child's pid.
    pub fn spawn(&mut self, role: Role, root: &Path) -> Result<u32> {
        let child = Command::new(&self.program)
            .arg(role.flag())
            .arg("--root")
            .arg(root)
            .spawn()?;
        let pid = child.id();
        self.children.push(child);
        Ok(pid)
    }

    /// Collect exit statuses of finished children without blocking.
    pub fn reap(&mut self) {
        self.children
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }

    /// Number of spawned children not yet reaped.
    pub fn active(&self) -> usize {
        self.children.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Spawner;
    use crate::liveness::is_alive;
    use std::process::Command;
    use std::time::Duration;

    #[test]
    fn reap_collects_exited_children() {
        // Bypass the role plumbing: any short-lived program demonstrates the
        // spawn/reap/liveness cycle.
        let child = Command::new("true").spawn().expect("spawn true");
        let pid = child.id();
        let mut spawner = Spawner::new("true");
        spawner.children.push(child);
        assert!(pid != 0);

        let mut reaped = false;
        for _ in 0..200 {
            spawner.reap();
            if spawner.active() == 0 {
                reaped = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(reaped, "child was never reaped");
        assert!(!is_alive(pid));
    }

    #[test]
    fn running_child_counts_as_alive() {
        let mut spawner = Spawner::new("sleep");
        let child = Command::new("sleep").arg("5").spawn().expect("spawn sleep");
        let pid = child.id();
        spawner.children.push(child);

        spawner.reap();
        assert_eq!(spawner.active(), 1);
        assert!(is_alive(pid));

        // Clean up so the test process does not leave a straggler.
        if let Some(child) = spawner.children.last_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
