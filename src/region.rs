//! The shared region every cooperating process attaches.
//!
//! A fixed 128-byte block is mapped from a well-known file and holds the
//! counter, the last recorded pid per worker role, and the futex word that
//! serializes all access. First attach wins an init race through `init_state`
//! (0 = raw, 1 = initializing, 2 = ready); later attachers wait for 2 and
//! then verify magic and version, so two processes racing to be "first"
//! initialize exactly once.
//!
//! Every accessor takes the embedded lock, performs one primitive operation
//! and releases. No compound read-modify sequences are offered; callers that
//! need them must accept interleaving. A process that dies while holding the
//! lock leaves the word stuck (no robust-futex recovery); removing the region
//! file is the reset.

use std::mem::size_of;
use std::path::Path;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use crate::lock;
use crate::mmap::MmapFile;
use crate::worker::Role;
use crate::{Error, Result};

pub const REGION_MAGIC: u32 = 0x4845_5244; // 'HERD'
pub const REGION_VERSION: u32 = 1;

#[repr(C, align(128))]
struct SharedBlock {
    magic: AtomicU32,
    version: AtomicU32,
    init_state: AtomicU32,
    lock: AtomicU32,
    counter: AtomicI64,
    worker_pids: [AtomicU32; 2],
    _pad: [u8; 96],
}

pub struct SharedRegion {
    _mmap: MmapFile,
    ptr: *const SharedBlock,
}

// The block is all atomics; mutation is serialized by the embedded lock.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Map the region file, creating and zero-initializing it on first attach.
    /// Attaching to an existing region preserves its state.
    pub fn attach_or_create(path: &Path) -> Result<Self> {
        let mmap = MmapFile::open_or_create(path, size_of::<SharedBlock>())?;
        let ptr = mmap.as_ptr() as *const SharedBlock;
        let region = Self { _mmap: mmap, ptr };
        region.init_once()?;
        Ok(region)
    }

    fn init_once(&self) -> Result<()> {
        let block = self.block();
        match block
            .init_state
            .compare_exchange(0, 1, Ordering::Acquire, Ordering::Acquire)
        {
            Ok(_) => {
                block.lock.store(0, Ordering::Relaxed);
                block.counter.store(0, Ordering::Relaxed);
                block.worker_pids[0].store(0, Ordering::Relaxed);
                block.worker_pids[1].store(0, Ordering::Relaxed);
                block.version.store(REGION_VERSION, Ordering::Relaxed);
                block.magic.store(REGION_MAGIC, Ordering::Relaxed);
                block.init_state.store(2, Ordering::Release);
                Ok(())
            }
            Err(_) => self.wait_ready(),
        }
    }

    fn wait_ready(&self) -> Result<()> {
        let block = self.block();
        loop {
            if block.init_state.load(Ordering::Acquire) == 2 {
                break;
            }
            std::thread::yield_now();
        }
        if block.magic.load(Ordering::Acquire) != REGION_MAGIC {
            return Err(Error::Corrupt("region magic mismatch"));
        }
        let version = block.version.load(Ordering::Acquire);
        if version != REGION_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        Ok(())
    }

    fn block(&self) -> &SharedBlock {
        unsafe { &*self.ptr }
    }

    pub fn counter(&self) -> Result<i64> {
        let block = self.block();
        let _guard = lock::lock(&block.lock)?;
        Ok(block.counter.load(Ordering::Relaxed))
    }

    pub fn set_counter(&self, value: i64) -> Result<()> {
        let block = self.block();
        let _guard = lock::lock(&block.lock)?;
        block.counter.store(value, Ordering::Relaxed);
        Ok(())
    }

    pub fn add_counter(&self, delta: i64) -> Result<()> {
        let block = self.block();
        let _guard = lock::lock(&block.lock)?;
        let value = block.counter.load(Ordering::Relaxed);
        block.counter.store(value.wrapping_add(delta), Ordering::Relaxed);
        Ok(())
    }

    pub fn mul_counter(&self, factor: i64) -> Result<()> {
        let block = self.block();
        let _guard = lock::lock(&block.lock)?;
        let value = block.counter.load(Ordering::Relaxed);
        block.counter.store(value.wrapping_mul(factor), Ordering::Relaxed);
        Ok(())
    }

    /// Division by zero is the caller's responsibility, as in the original.
    pub fn div_counter(&self, divisor: i64) -> Result<()> {
        let block = self.block();
        let _guard = lock::lock(&block.lock)?;
        let value = block.counter.load(Ordering::Relaxed);
        block.counter.store(value.wrapping_div(divisor), Ordering::Relaxed);
        Ok(())
    }

    pub fn worker_pid(&self, role: Role) -> Result<u32> {
        let block = self.block();
        let _guard = lock::lock(&block.lock)?;
        Ok(block.worker_pids[role.slot()].load(Ordering::Relaxed))
    }

    pub fn set_worker_pid(&self, role: Role, pid: u32) -> Result<()> {
        let block = self.block();
        let _guard = lock::lock(&block.lock)?;
        block.worker_pids[role.slot()].store(pid, Ordering::Relaxed);
        Ok(())
    }
}
