//! LRU block cache: write-through, miss triggers a device read, a hit bumps
//! recency. One instance is owned per mounted [`crate::volume::Volume`].

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use spin::Mutex;

use crate::device::BlockDevice;
use crate::error::Result;
use crate::{MAX_CACHE, SECTOR_SIZE};

type Sector = [u8; SECTOR_SIZE];

pub struct BlockCache {
    device: Arc<dyn BlockDevice>,
    slots: Mutex<LruCache<u32, Sector>>,
}

impl BlockCache {
    pub fn new(device: Arc<dyn BlockDevice>) -> Self {
        Self {
            device,
            slots: Mutex::new(LruCache::new(NonZeroUsize::new(MAX_CACHE).unwrap())),
        }
    }

    /// Reads `block_no` into `out`, consulting the cache first.
    pub fn read(&self, block_no: u32, out: &mut Sector) -> Result<()> {
        let mut slots = self.slots.lock();
        if let Some(cached) = slots.get(&block_no) {
            out.copy_from_slice(cached);
            return Ok(());
        }
        let mut fresh = [0u8; SECTOR_SIZE];
        self.device.read_block(block_no, &mut fresh)?;
        slots.put(block_no, fresh);
        out.copy_from_slice(&fresh);
        Ok(())
    }

    /// Writes `data` to `block_no`. Always write-through to the device; also
    /// updates the cached slot if one is resident so a subsequent read does
    /// not observe stale data.
    pub fn write(&self, block_no: u32, data: &Sector) -> Result<()> {
        self.device.write_block(block_no, data)?;
        let mut slots = self.slots.lock();
        if slots.contains(&block_no) {
            slots.put(block_no, *data);
        }
        Ok(())
    }

    /// Reads `block_no`, applies `f` to a mutable copy, and writes the result
    /// back through the cache. The read-modify-write idiom every sector
    /// touched by a partial write goes through (see `file::write`).
    pub fn modify<F>(&self, block_no: u32, f: F) -> Result<()>
    where
        F: FnOnce(&mut Sector),
    {
        let mut sector = [0u8; SECTOR_SIZE];
        self.read(block_no, &mut sector)?;
        f(&mut sector);
        self.write(block_no, &sector)
    }
}
