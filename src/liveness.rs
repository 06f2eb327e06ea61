//! Non-blocking process liveness probe.

/// Whether `pid` currently names a live process. A pid of 0 means "no
/// recorded worker" and is dead by definition. The probe is signal 0: it
/// never affects the target. EPERM means the process exists but belongs to
/// someone else, which still counts as alive.
///
/// A recycled pid belonging to an unrelated process is indistinguishable from
/// the original worker here; accepted approximation (the leader lock record
/// pairs pid with start time, worker slots do not).
#[cfg(unix)]
pub fn is_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let res = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if res == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn is_alive(_pid: u32) -> bool {
    false
}
