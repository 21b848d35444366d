//! Mount-point operations: open, stat, sync, plus the unsupported
//! operations this core does not implement (create_directory,
//! open_directory, delete).

use std::sync::Arc;

use bitflags::bitflags;

use crate::dirent::{DirEntry, DirEntryLocation, DirFlags, DIRENT_SIZE};
use crate::error::{Error, Result};
use crate::file::{FileHandle, Stat};
use crate::path::{resolve, Located, PathResult};
use crate::volume::{Volume, VolumeState};
use crate::{DIR_PER_SECTOR, SECTOR_SIZE};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const READ   = 0x1;
        const WRITE  = 0x2;
        const CREATE = 0x4;
    }
}

pub struct MountPoint {
    volume: Arc<Volume>,
}

impl MountPoint {
    pub fn new(volume: Arc<Volume>) -> Self {
        Self { volume }
    }

    pub fn open(&self, path: &str, mode: OpenFlags) -> Result<FileHandle> {
        let mut state = self.volume.state.lock();
        let resolved = resolve(&state, &self.volume.cache, path)?;

        let (entry, location) = match resolved {
            PathResult::Found { entry, .. } => {
                if mode.contains(OpenFlags::CREATE) {
                    return Err(Error::already_exists(path));
                }
                if entry.0.is_dir() {
                    return Err(Error::not_a_file(path));
                }
                entry
            }
            PathResult::NotFound {
                parent,
                missing_name,
            } => {
                if !mode.contains(OpenFlags::CREATE) {
                    return Err(Error::not_found(path));
                }
                create_entry(&mut state, &self.volume.cache, parent, &missing_name, mode)?
            }
        };

        let writable = mode.contains(OpenFlags::WRITE) && !entry.flags().contains(DirFlags::READ_ONLY);
        drop(state);
        Ok(FileHandle::new(self.volume.clone(), entry, location, writable))
    }

    pub fn stat(&self, path: &str) -> Result<Stat> {
        let state = self.volume.state.lock();
        match resolve(&state, &self.volume.cache, path)? {
            PathResult::Found { entry, .. } => {
                let flags = entry.0.flags();
                Ok(Stat {
                    size: entry.0.size as u64,
                    is_directory: flags.contains(DirFlags::IS_DIR),
                    readable: true,
                    writable: !flags.contains(DirFlags::READ_ONLY),
                })
            }
            PathResult::NotFound { .. } => Err(Error::not_found(path)),
        }
    }

    pub fn sync(&self) -> Result<()> {
        self.volume.sync()
    }

    /// Persists a closed file's size/first_cluster growth back into its
    /// owning location: the resident root array if it lived there, or
    /// immediately through the cache if it was a nested directory entry
    /// (nested directories are not kept resident).
    pub fn commit_close(&self, entry: DirEntry, location: DirEntryLocation) -> Result<()> {
        let mut state = self.volume.state.lock();
        write_entry(&mut state, &self.volume.cache, &entry, location)
    }

    pub fn create_directory(&self, _path: &str) -> Result<()> {
        Err(Error::unsupported("create_directory"))
    }

    pub fn open_directory(&self, _path: &str) -> Result<()> {
        Err(Error::unsupported("open_directory"))
    }

    pub fn delete(&self, _path: &str) -> Result<()> {
        Err(Error::unsupported("delete"))
    }
}

fn write_entry(
    state: &mut VolumeState,
    cache: &crate::cache::BlockCache,
    entry: &DirEntry,
    location: DirEntryLocation,
) -> Result<()> {
    match location {
        DirEntryLocation::Root(idx) => {
            state.root[idx] = *entry;
            state.root_bitset.set(idx);
            Ok(())
        }
        DirEntryLocation::Data { sector, offset } => cache.modify(sector, |buf| {
            buf[offset..offset + DIRENT_SIZE].copy_from_slice(&entry.to_bytes());
        }),
    }
}

fn find_free_root_slot(state: &VolumeState) -> Result<usize> {
    state
        .root_bitset
        .find_first_free_in(0, state.root.len())
        .ok_or_else(Error::out_of_space)
}

/// Finds a free directory-entry slot in `dir`'s first data sector. Parent
/// directories only support one sector of children.
fn find_free_slot_in_dir(
    state: &VolumeState,
    cache: &crate::cache::BlockCache,
    dir: &DirEntry,
) -> Result<(u32, usize)> {
    let sector = *state
        .fat
        .chain_from(dir.first_cluster as u32)
        .first()
        .ok_or_else(Error::out_of_space)?;
    let mut buf = [0u8; SECTOR_SIZE];
    cache.read(sector, &mut buf)?;
    for slot in 0..DIR_PER_SECTOR {
        let offset = slot * DIRENT_SIZE;
        if buf[offset] == 0 {
            return Ok((sector, offset));
        }
    }
    Err(Error::out_of_space())
}

fn create_entry(
    state: &mut VolumeState,
    cache: &crate::cache::BlockCache,
    parent: Option<Located>,
    name: &str,
    mode: OpenFlags,
) -> Result<Located> {
    let mut entry = DirEntry::EMPTY;
    entry.set_name(name).map_err(|_| Error::invalid_path(name))?;
    if !mode.contains(OpenFlags::WRITE) {
        entry.flag |= DirFlags::READ_ONLY.bits();
    }

    let location = match parent {
        None => {
            let idx = find_free_root_slot(state)?;
            DirEntryLocation::Root(idx)
        }
        Some((parent_entry, parent_location)) => {
            let (sector, offset) = find_free_slot_in_dir(state, cache, &parent_entry)?;
            let new_parent_size = ((offset / DIRENT_SIZE + 1) * DIRENT_SIZE) as u32;
            if new_parent_size > parent_entry.size {
                let mut grown = parent_entry;
                grown.size = new_parent_size;
                write_entry(state, cache, &grown, parent_location)?;
            }
            DirEntryLocation::Data { sector, offset }
        }
    };

    write_entry(state, cache, &entry, location)?;
    Ok((entry, location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{BlockDevice, FileBlockDevice};
    use crate::volume::Volume;
    use crate::FIRST_DATA_BLOCK;

    fn mount_point(name: &str) -> MountPoint {
        let path = std::env::temp_dir().join(format!(
            "fat16-mount-test-{}-{:?}",
            name,
            std::thread::current().id()
        ));
        let size = (FIRST_DATA_BLOCK as u64 + 32) * SECTOR_SIZE as u64;
        let dev: Arc<dyn BlockDevice> = Arc::new(FileBlockDevice::create_sized(&path, size).unwrap());
        Volume::format(dev.clone()).unwrap();
        let volume = Volume::mount(dev).unwrap();
        MountPoint::new(volume)
    }

    #[test]
    fn create_write_sync_remount_read_cycle() {
        let mp = mount_point("cycle");
        let handle = mp
            .open("/a", OpenFlags::CREATE | OpenFlags::WRITE)
            .unwrap();
        handle.write(b"hello, world!").unwrap();
        let (entry, location) = handle.close();
        mp.commit_close(entry, location).unwrap();
        mp.sync().unwrap();

        let stat = mp.stat("/a").unwrap();
        assert_eq!(stat.size, 13);

        let handle = mp.open("/a", OpenFlags::READ).unwrap();
        let mut out = vec![0u8; 13];
        handle.read(&mut out).unwrap();
        assert_eq!(&out, b"hello, world!");
    }

    #[test]
    fn open_missing_without_create_is_not_found() {
        let mp = mount_point("missing");
        assert!(mp.open("/nope", OpenFlags::READ).is_err());
    }

    #[test]
    fn open_create_on_existing_is_already_exists() {
        let mp = mount_point("exists");
        mp.open("/a", OpenFlags::CREATE | OpenFlags::WRITE).unwrap();
        let result = mp.open("/a", OpenFlags::CREATE | OpenFlags::WRITE);
        assert!(result.is_err());
    }

    #[test]
    fn depth_beyond_limit_is_invalid_path() {
        let mp = mount_point("depth");
        let result = mp.open("/a/b/c/d/e/f/g", OpenFlags::READ);
        assert!(result.is_err());
    }
}
