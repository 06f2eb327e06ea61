//! Leader election through a well-known exclusive lock file.
//!
//! Every process tries a non-blocking `flock` once at startup. The single
//! winner is leader for its whole lifetime; everyone else runs as a follower
//! and never re-contends. The kernel drops the lock when the holder exits for
//! any reason, so a crashed leader's seat is free the next time a process
//! starts.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{Error, Result};
use std::os::unix::io::AsRawFd;

pub struct LeaderLock {
    file: Option<File>,
    is_leader: bool,
}

impl LeaderLock {
    /// Attempt to become leader. Contention is the normal follower outcome,
    /// not an error; only a lock API failure errors.
    pub fn try_acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        if try_lock(&file)? {
            write_holder_record(&file)?;
            Ok(Self {
                file: Some(file),
                is_leader: true,
            })
        } else {
            Ok(Self {
                file: None,
                is_leader: false,
            })
        }
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader
    }

    /// Release leadership. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(file) = self.file.take() {
            unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
        }
        self.is_leader = false;
    }
}

impl Drop for LeaderLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn try_lock(file: &File) -> Result<bool> {
    let res = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if res == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    if err.kind() == std::io::ErrorKind::WouldBlock {
        return Ok(false);
    }
    Err(Error::Io(err))
}

/// The leader records `pid start_time` in the lock file so an observer can
/// identify the holder even across pid reuse.
fn write_holder_record(file: &File) -> Result<()> {
    let pid = std::process::id();
    let start_time = proc_start_time(pid).unwrap_or(0);
    let record = format!("{pid} {start_time}\n");
    let mut handle = file.try_clone()?;
    handle.set_len(0)?;
    handle.seek(SeekFrom::Start(0))?;
    handle.write_all(record.as_bytes())?;
    handle.sync_all()?;
    Ok(())
}

/// Parse the holder record out of a lock file, if one has been written.
pub fn holder(path: &Path) -> Result<Option<(u32, u64)>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut contents = String::new();
    File::open(path)?.read_to_string(&mut contents)?;
    let mut parts = contents.split_whitespace();
    let pid = parts.next().unwrap_or("0").parse::<u32>().unwrap_or(0);
    if pid == 0 {
        return Ok(None);
    }
    let start_time = parts.next().unwrap_or("0").parse::<u64>().unwrap_or(0);
    Ok(Some((pid, start_time)))
}

#[cfg(target_os = "linux")]
fn proc_start_time(pid: u32) -> Result<u64> {
    let path = format!("/proc/{pid}/stat");
    let mut contents = String::new();
    File::open(&path)?.read_to_string(&mut contents)?;
    // Field 22, counted after the parenthesized comm which may contain spaces.
    let end = contents.rfind(')').ok_or(Error::Corrupt("stat parse"))?;
    let after = &contents[end + 1..];
    let mut fields = after.split_whitespace();
    for _ in 0..19 {
        fields.next();
    }
    let start = fields.next().ok_or(Error::Corrupt("stat missing starttime"))?;
    start
        .parse::<u64>()
        .map_err(|_| Error::Corrupt("stat starttime invalid"))
}

#[cfg(not(target_os = "linux"))]
fn proc_start_time(_pid: u32) -> Result<u64> {
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::{holder, LeaderLock};
    use tempfile::tempdir;

    #[test]
    fn single_winner_until_release() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("leader.lock");

        // flock contends across open file descriptions, so two handles in one
        // process exercise the same race as two processes.
        let mut first = LeaderLock::try_acquire(&path).expect("first");
        assert!(first.is_leader());

        let second = LeaderLock::try_acquire(&path).expect("second");
        assert!(!second.is_leader());

        first.release();
        first.release(); // idempotent

        let third = LeaderLock::try_acquire(&path).expect("third");
        assert!(third.is_leader());
    }

    #[test]
    fn drop_frees_the_seat() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("leader.lock");

        drop(LeaderLock::try_acquire(&path).expect("first"));
        let next = LeaderLock::try_acquire(&path).expect("next");
        assert!(next.is_leader());
    }

    #[test]
    fn holder_record_names_the_leader() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("leader.lock");

        let _lock = LeaderLock::try_acquire(&path).expect("acquire");
        let (pid, _start_time) = holder(&path).expect("read").expect("record");
        assert_eq!(pid, std::process::id());
    }
}
