//! Cross-process mutex over a single word in shared memory.
//!
//! The lock word lives inside the mapped region, so any process that attaches
//! the region contends on the same futex. State protocol: 0 = unlocked,
//! 1 = locked, 2 = locked with waiters. Acquisition waits in the kernel
//! rather than erroring or busy-spinning; only an unexpected futex errno
//! aborts the caller.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::Result;

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;
const CONTENDED: u32 = 2;

// Bounded wait so a waiter rechecks the word even if a wake is lost.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Acquire the lock, returning a guard that releases on drop.
pub fn lock(word: &AtomicU32) -> Result<Guard<'_>> {
    if word
        .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
        .is_ok()
    {
        return Ok(Guard { word });
    }
    loop {
        // Mark contended before sleeping so the holder knows to wake us.
        if word.swap(CONTENDED, Ordering::Acquire) == UNLOCKED {
            return Ok(Guard { word });
        }
        futex_wait(word, CONTENDED, Some(WAIT_SLICE))?;
    }
}

pub struct Guard<'a> {
    word: &'a AtomicU32,
}

impl Drop for Guard<'_> {
    fn drop(&mut self) {
        if self.word.swap(UNLOCKED, Ordering::Release) == CONTENDED {
            // A failed wake only delays waiters until their wait slice expires.
            let _ = futex_wake(self.word);
        }
    }
}

#[cfg(target_os = "linux")]
fn futex_wait(addr: &AtomicU32, expected: u32, timeout: Option<Duration>) -> Result<()> {
    use libc::{syscall, timespec, EAGAIN, EINTR, ETIMEDOUT, FUTEX_WAIT, SYS_futex};

    let mut ts = timespec { tv_sec: 0, tv_nsec: 0 };
    let ts_ptr = if let Some(timeout) = timeout {
        ts.tv_sec = timeout.as_secs() as libc::time_t;
        ts.tv_nsec = timeout.subsec_nanos() as libc::c_long;
        &ts as *const timespec
    } else {
        std::ptr::null()
    };

    let res = unsafe {
        syscall(
            SYS_futex,
            addr as *const AtomicU32 as *const u32,
            FUTEX_WAIT,
            expected,
            ts_ptr,
            std::ptr::null::<u32>(),
            0,
        )
    };
    if res == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    match err.raw_os_error() {
        Some(code) if code == EAGAIN || code == EINTR || code == ETIMEDOUT => Ok(()),
        _ => Err(crate::Error::Io(err)),
    }
}

#[cfg(target_os = "linux")]
fn futex_wake(addr: &AtomicU32) -> Result<()> {
    use libc::{syscall, FUTEX_WAKE, SYS_futex};
    let res = unsafe {
        syscall(
            SYS_futex,
            addr as *const AtomicU32 as *const u32,
            FUTEX_WAKE,
            i32::MAX,
            std::ptr::null::<u32>(),
            std::ptr::null::<u32>(),
            0,
        )
    };
    if res < 0 {
        return Err(crate::Error::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn futex_wait(_addr: &AtomicU32, _expected: u32, timeout: Option<Duration>) -> Result<()> {
    if let Some(timeout) = timeout {
        std::thread::sleep(timeout.min(Duration::from_millis(1)));
    } else {
        std::thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn futex_wake(_addr: &AtomicU32) -> Result<()> {
    Ok(())
}
