use std::fs::{File, OpenOptions};
use std::path::Path;

use memmap2::{MmapMut, MmapOptions};

use crate::{Error, Result};

/// Fixed-size shared file mapping.
///
/// Unlike a scratch mapping, `open_or_create` never truncates: an existing
/// file keeps its contents so a re-attaching process sees the previous state.
pub struct MmapFile {
    _file: File,
    map: MmapMut,
    len: usize,
}

impl MmapFile {
    pub fn open_or_create(path: &Path, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(Error::Unsupported("mmap length must be non-zero"));
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        if (file.metadata()?.len() as usize) < len {
            file.set_len(len as u64)?;
        }
        let map = unsafe { MmapOptions::new().len(len).map_mut(&file)? };
        Ok(Self { _file: file, map, len })
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.map.as_ptr()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
