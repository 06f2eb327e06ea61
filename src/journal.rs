//! Shared append-only event journal.
//!
//! One file, appended by every cooperating process. Writes are serialized by
//! an exclusive `flock` held for the duration of a single line — a lock
//! domain deliberately independent of the region mutex, so a slow journal
//! write never stalls counter traffic.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use crate::worker::Role;
use crate::Result;

#[derive(Debug, Clone, Copy)]
pub enum Event {
    MainStart,
    MainExit,
    RoleStart(Role),
    RoleExit(Role),
    Tick { counter: i64 },
    SpawnSkip { role: Role, worker_pid: u32 },
    SpawnFail { role: Role },
}

pub struct Journal {
    file: File,
    pid: u32,
}

impl Journal {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            pid: std::process::id(),
        })
    }

    /// Append one event line under the journal's file lock.
    pub fn record(&self, event: &Event) -> Result<()> {
        let line = self.format(event);
        lock_exclusive(&self.file)?;
        let res = (&self.file).write_all(line.as_bytes());
        unlock(&self.file);
        res?;
        Ok(())
    }

    fn format(&self, event: &Event) -> String {
        let pid = self.pid;
        let time = timestamp();
        match event {
            Event::MainStart => format!("MAIN START pid={pid} time={time}\n"),
            Event::MainExit => format!("MAIN EXIT pid={pid} time={time}\n"),
            Event::RoleStart(role) => {
                format!("{} START pid={pid} time={time}\n", role.tag())
            }
            Event::RoleExit(role) => {
                format!("{} EXIT pid={pid} time={time}\n", role.tag())
            }
            Event::Tick { counter } => {
                format!("TICK pid={pid} time={time} counter={counter}\n")
            }
            Event::SpawnSkip { role, worker_pid } => format!(
                "SPAWN SKIP {} still running pid={worker_pid} leader_pid={pid} time={time}\n",
                role.label()
            ),
            Event::SpawnFail { role } => format!(
                "SPAWN FAIL {} leader_pid={pid} time={time}\n",
                role.label()
            ),
        }
    }
}

/// Local wall-clock time with millisecond precision.
fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

fn lock_exclusive(file: &File) -> Result<()> {
    loop {
        let res = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if res == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err.into());
    }
}

fn unlock(file: &File) {
    unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn records_tagged_lines() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("events.log");
        let journal = Journal::open(&path).expect("open");

        journal.record(&Event::MainStart).expect("record");
        journal.record(&Event::Tick { counter: 7 }).expect("record");
        journal
            .record(&Event::SpawnSkip {
                role: Role::Copy1,
                worker_pid: 1234,
            })
            .expect("record");
        journal
            .record(&Event::SpawnFail { role: Role::Copy2 })
            .expect("record");
        journal.record(&Event::MainExit).expect("record");

        let contents = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 5);
        let pid = std::process::id();
        assert!(lines[0].starts_with("MAIN START"));
        assert!(lines[0].contains(&format!("pid={pid}")));
        assert!(lines[1].starts_with("TICK"));
        assert!(lines[1].ends_with("counter=7"));
        assert!(lines[2].starts_with("SPAWN SKIP copy1 still running pid=1234"));
        assert!(lines[3].starts_with("SPAWN FAIL copy2"));
        assert!(lines[4].starts_with("MAIN EXIT"));
    }

    #[test]
    fn concurrent_writers_produce_whole_lines() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("events.log");

        let threads: usize = 4;
        let rounds: i64 = 50;
        let mut handles = Vec::new();
        for _ in 0..threads {
            let path = path.clone();
            handles.push(thread::spawn(move || {
                // Independent handle per writer, like separate processes.
                let journal = Journal::open(&path).expect("open");
                for i in 0..rounds {
                    journal.record(&Event::Tick { counter: i }).expect("record");
                }
            }));
        }
        for handle in handles {
            handle.join().expect("join");
        }

        let contents = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), threads * rounds as usize);
        for line in lines {
            assert!(line.starts_with("TICK pid="), "torn line: {line}");
            assert!(line.contains(" counter="), "torn line: {line}");
        }
    }
}
