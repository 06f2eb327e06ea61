//! The two fixed worker-role behaviors.

use std::time::Duration;

use crate::journal::{Event, Journal};
use crate::region::SharedRegion;
use crate::Result;

/// How long role 2 holds the counter doubled in production.
pub const ROLE2_DWELL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Copy1,
    Copy2,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Copy1, Role::Copy2];

    /// Index of this role's pid slot in the shared region.
    pub fn slot(self) -> usize {
        match self {
            Role::Copy1 => 0,
            Role::Copy2 => 1,
        }
    }

    /// Command-line flag a spawned worker is started with.
    pub fn flag(self) -> &'static str {
        match self {
            Role::Copy1 => "--copy1",
            Role::Copy2 => "--copy2",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Role::Copy1 => "COPY1",
            Role::Copy2 => "COPY2",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Copy1 => "copy1",
            Role::Copy2 => "copy2",
        }
    }
}

/// Run one worker role to completion.
///
/// Role 1 adds 10 to the counter. Role 2 doubles the counter, dwells with the
/// lock released, then halves it again; during the dwell every other attached
/// process observes the doubled value. That window is the point of the
/// exercise, not a race to close.
pub fn run(role: Role, region: &SharedRegion, journal: &Journal, dwell: Duration) -> Result<()> {
    journal.record(&Event::RoleStart(role))?;
    match role {
        Role::Copy1 => region.add_counter(10)?,
        Role::Copy2 => {
            region.mul_counter(2)?;
            std::thread::sleep(dwell);
            region.div_counter(2)?;
        }
    }
    journal.record(&Event::RoleExit(role))?;
    Ok(())
}
