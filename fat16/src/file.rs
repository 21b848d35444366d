//! Per-open-file operations: fstat, read, write, seek, close.
//!
//! Every operation here takes the file's own mutex first; `write` then also
//! takes the volume mutex — that order (file lock, then volume lock) is the
//! only one ever used, anywhere in this crate.

use std::sync::Arc;

use spin::Mutex;

use crate::dirent::{DirEntry, DirEntryLocation, DirFlags};
use crate::error::{Error, Result};
use crate::volume::Volume;
use crate::SECTOR_SIZE;

pub struct FileState {
    pub entry: DirEntry,
    pub location: DirEntryLocation,
    pub file_pos: u64,
    pub end_pos: u64,
    pub writable: bool,
}

pub struct FileHandle {
    volume: Arc<Volume>,
    state: Mutex<FileState>,
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Stat {
    pub size: u64,
    pub is_directory: bool,
    pub readable: bool,
    pub writable: bool,
}

impl FileHandle {
    pub fn new(volume: Arc<Volume>, entry: DirEntry, location: DirEntryLocation, writable: bool) -> Self {
        let end_pos = entry.size as u64;
        Self {
            volume,
            state: Mutex::new(FileState {
                entry,
                location,
                file_pos: 0,
                end_pos,
                writable,
            }),
        }
    }

    pub fn fstat(&self) -> Stat {
        let state = self.state.lock();
        let flags = state.entry.flags();
        Stat {
            size: state.entry.size as u64,
            is_directory: flags.contains(DirFlags::IS_DIR),
            readable: true,
            writable: !flags.contains(DirFlags::READ_ONLY),
        }
    }

    /// Reads `buf.len()` bytes starting at the current file position.
    /// Fails with `OutOfBounds` if the read would run past `end_pos`. The
    /// destination offset is threaded through every sector segment copied,
    /// interior and trailing alike, so no copied segment ever overwrites
    /// an earlier one in the caller's buffer.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.state.lock();
        let start = state.file_pos;
        let n = buf.len() as u64;
        let end = start + n;
        if end > state.end_pos {
            return Err(Error::out_of_bounds(start, n, state.end_pos));
        }

        let volume = self.volume.clone();
        let vstate = volume.state.lock();
        let chain = vstate.fat.chain_from(state.entry.first_cluster as u32);
        drop(vstate);

        let start_sector_idx = (start / SECTOR_SIZE as u64) as usize;
        let mut remaining = n as usize;
        let mut src_offset = (start % SECTOR_SIZE as u64) as usize;
        let mut dst_offset = 0usize;

        for &sector in chain.iter().skip(start_sector_idx) {
            if remaining == 0 {
                break;
            }
            let mut sector_buf = [0u8; SECTOR_SIZE];
            volume.cache.read(sector, &mut sector_buf)?;
            let take = remaining.min(SECTOR_SIZE - src_offset);
            buf[dst_offset..dst_offset + take]
                .copy_from_slice(&sector_buf[src_offset..src_offset + take]);
            dst_offset += take;
            remaining -= take;
            src_offset = 0;
        }

        state.file_pos += n;
        Ok(n as usize)
    }

    /// Writes `data` starting at the current file position, allocating new
    /// sectors via the FAT table as needed. Every sector touched goes
    /// through read-modify-write, even interior ones, so a write that
    /// doesn't start or end on a sector boundary can't clobber neighboring
    /// bytes already on disk. Returns the number of bytes written.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let mut state = self.state.lock();
        if !state.writable {
            return Err(Error::permission("file not opened for writing"));
        }

        let start = state.file_pos;
        let n = data.len() as u64;
        let end = start + n;

        let volume = self.volume.clone();
        let mut vstate = volume.state.lock();

        let mut chain = vstate.fat.chain_from(state.entry.first_cluster as u32);
        if chain.is_empty() {
            let first = vstate.fat.alloc()?;
            state.entry.first_cluster = first as u16;
            chain.push(first);
        }

        let sectors_needed = ((end + SECTOR_SIZE as u64 - 1) / SECTOR_SIZE as u64) as usize;
        while chain.len() < sectors_needed {
            let last = *chain.last().unwrap();
            let next = vstate.fat.alloc()?;
            vstate.fat.link(last, next);
            chain.push(next);
        }
        drop(vstate);

        let start_sector_idx = (start / SECTOR_SIZE as u64) as usize;
        let mut remaining = n as usize;
        let mut dst_offset = (start % SECTOR_SIZE as u64) as usize;
        let mut src_offset = 0usize;

        for &sector in chain.iter().skip(start_sector_idx) {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(SECTOR_SIZE - dst_offset);
            let src_slice = &data[src_offset..src_offset + take];
            volume.cache.modify(sector, |sector_buf| {
                sector_buf[dst_offset..dst_offset + take].copy_from_slice(src_slice);
            })?;
            src_offset += take;
            remaining -= take;
            dst_offset = 0;
        }

        state.file_pos += n;
        if end > state.entry.size as u64 {
            state.entry.size = end as u32;
            state.end_pos = end;
        }
        Ok(n as usize)
    }

    pub fn seek(&self, pos: u64) {
        self.state.lock().file_pos = pos;
    }

    /// Releases the handle. Size growth recorded in the in-memory entry
    /// snapshot is not persisted here — only `mount::MountPoint::sync`
    /// writes the directory area back to disk.
    pub fn close(self) -> (DirEntry, DirEntryLocation) {
        let state = self.state.into_inner();
        (state.entry, state.location)
    }

    pub fn entry_snapshot(&self) -> (DirEntry, DirEntryLocation) {
        let state = self.state.lock();
        (state.entry, state.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{BlockDevice, FileBlockDevice};
    use crate::volume::Volume;
    use crate::FIRST_DATA_BLOCK;

    fn mounted(name: &str) -> Arc<Volume> {
        let path = std::env::temp_dir().join(format!(
            "fat16-file-test-{}-{:?}",
            name,
            std::thread::current().id()
        ));
        let size = (FIRST_DATA_BLOCK as u64 + 32) * SECTOR_SIZE as u64;
        let dev: Arc<dyn BlockDevice> = Arc::new(FileBlockDevice::create_sized(&path, size).unwrap());
        Volume::format(dev.clone()).unwrap();
        Volume::mount(dev).unwrap()
    }

    #[test]
    fn write_then_read_round_trips() {
        let volume = mounted("rw");
        let entry = DirEntry::EMPTY;
        let handle = FileHandle::new(volume, entry, DirEntryLocation::Root(0), true);
        let payload = b"hello, world!";
        assert_eq!(handle.write(payload).unwrap(), payload.len());
        handle.seek(0);
        let mut out = vec![0u8; payload.len()];
        assert_eq!(handle.read(&mut out).unwrap(), payload.len());
        assert_eq!(&out, payload);
    }

    #[test]
    fn write_crossing_sector_boundary_allocates_second_sector() {
        let volume = mounted("cross-sector");
        let entry = DirEntry::EMPTY;
        let handle = FileHandle::new(volume, entry, DirEntryLocation::Root(0), true);
        let payload = vec![0xABu8; 600];
        assert_eq!(handle.write(&payload).unwrap(), 600);
        handle.seek(0);
        let mut out = vec![0u8; 600];
        handle.read(&mut out).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn read_past_end_is_out_of_bounds() {
        let volume = mounted("oob");
        let entry = DirEntry::EMPTY;
        let handle = FileHandle::new(volume, entry, DirEntryLocation::Root(0), true);
        handle.write(b"abc").unwrap();
        handle.seek(0);
        let mut out = vec![0u8; 10];
        assert!(handle.read(&mut out).is_err());
    }

    #[test]
    fn write_without_write_mode_is_permission_denied() {
        let volume = mounted("perm");
        let entry = DirEntry::EMPTY;
        let handle = FileHandle::new(volume, entry, DirEntryLocation::Root(0), false);
        assert!(handle.write(b"x").is_err());
    }
}
