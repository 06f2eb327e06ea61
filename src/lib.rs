//! Cross-process shared-counter coordination kernel.
//!
//! Several independent processes attach one memory-mapped region holding a
//! counter and two worker-pid slots, all guarded by a futex embedded in the
//! region itself. One process wins a non-blocking leader lock and drives the
//! periodic duties: counter ticks, journal snapshots, and respawning the two
//! short-lived worker roles.

pub mod cancel;
pub mod control;
pub mod error;
pub mod journal;
pub mod layout;
pub mod leader;
pub mod liveness;
pub mod lock;
pub mod mmap;
pub mod region;
pub mod sched;
pub mod spawn;
pub mod worker;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use journal::{Event, Journal};
pub use layout::Layout;
pub use leader::LeaderLock;
pub use region::SharedRegion;
pub use sched::Scheduler;
pub use spawn::Spawner;
pub use worker::Role;
