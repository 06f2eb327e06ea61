//! Periodic action loop.
//!
//! Three deadlines evaluated in one polling loop, not one sleep per action:
//!
//! - every 300 ms the counter is incremented, with catch-up: a stalled loop
//!   fires once per full elapsed period so the counter tracks wall-clock
//!   300 ms units;
//! - every 1 s the leader journals a TICK snapshot, at most once per poll;
//! - every 3 s the leader reaps finished workers and, per role, either logs
//!   SPAWN SKIP for a live worker or clears the slot and spawns a
//!   replacement, at most once per poll.
//!
//! `poll` takes the current instant from the caller so the deadline
//! arithmetic can be tested without real waiting; `run` feeds it real time
//! every ~10 ms until cancelled.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::journal::{Event, Journal};
use crate::liveness::is_alive;
use crate::region::SharedRegion;
use crate::spawn::Spawner;
use crate::worker::Role;
use crate::Result;

pub const TICK_PERIOD: Duration = Duration::from_millis(300);
pub const SNAPSHOT_PERIOD: Duration = Duration::from_secs(1);
pub const SPAWN_CHECK_PERIOD: Duration = Duration::from_secs(3);
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct Scheduler<'a> {
    region: &'a SharedRegion,
    journal: &'a Journal,
    spawner: Spawner,
    root: PathBuf,
    is_leader: bool,
    last_tick: Instant,
    last_snapshot: Instant,
    last_spawn_check: Instant,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        region: &'a SharedRegion,
        journal: &'a Journal,
        spawner: Spawner,
        root: PathBuf,
        is_leader: bool,
        now: Instant,
    ) -> Self {
        Self {
            region,
            journal,
            spawner,
            root,
            is_leader,
            last_tick: now,
            last_snapshot: now,
            last_spawn_check: now,
        }
    }

    /// Apply every action due at `now`.
    pub fn poll(&mut self, now: Instant) -> Result<()> {
        // Tick catch-up: one increment per full elapsed period, each firing
        // advancing the deadline by exactly one period.
        while now.duration_since(self.last_tick) >= TICK_PERIOD {
            self.region.add_counter(1)?;
            self.last_tick += TICK_PERIOD;
        }

        if !self.is_leader {
            return Ok(());
        }

        if now.duration_since(self.last_snapshot) >= SNAPSHOT_PERIOD {
            self.last_snapshot += SNAPSHOT_PERIOD;
            let counter = self.region.counter()?;
            self.journal.record(&Event::Tick { counter })?;
        }

        if now.duration_since(self.last_spawn_check) >= SPAWN_CHECK_PERIOD {
            self.last_spawn_check += SPAWN_CHECK_PERIOD;
            self.spawn_check()?;
        }

        Ok(())
    }

    /// Poll with real time until the token is cancelled.
    pub fn run(&mut self, cancel: &CancelToken) -> Result<()> {
        while !cancel.is_cancelled() {
            self.poll(Instant::now())?;
            std::thread::sleep(POLL_INTERVAL);
        }
        Ok(())
    }

    fn spawn_check(&mut self) -> Result<()> {
        // Reap first so an exited worker's pid stops probing alive.
        self.spawner.reap();
        for role in Role::ALL {
            let pid = self.region.worker_pid(role)?;
            if is_alive(pid) {
                self.journal.record(&Event::SpawnSkip {
                    role,
                    worker_pid: pid,
                })?;
                continue;
            }
            if pid != 0 {
                self.region.set_worker_pid(role, 0)?;
            }
            match self.spawner.spawn(role, &self.root) {
                Ok(new_pid) => {
                    self.region.set_worker_pid(role, new_pid)?;
                    log::debug!("spawned {} worker pid={new_pid}", role.label());
                }
                Err(err) => {
                    // Not retried until the next spawn-check evaluation.
                    log::warn!("failed to spawn {} worker: {err}", role.label());
                    self.journal.record(&Event::SpawnFail { role })?;
                }
            }
        }
        Ok(())
    }
}
