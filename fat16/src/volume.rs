//! Owns the whole in-memory representation of one mounted volume: the boot
//! sector, the resident FAT table, the resident root directory array and
//! its occupancy bitset, and the block cache. Exactly one `spin::Mutex`
//! (`Volume::state`) guards everything except the cache, which is its own
//! leaf lock: file mutex -> volume mutex -> cache mutex, never reversed.

use std::sync::Arc;

use spin::Mutex;

use crate::bitset::BitSet;
use crate::boot_sector::BootSector;
use crate::cache::BlockCache;
use crate::device::BlockDevice;
use crate::dirent::{DirEntry, DIRENT_SIZE};
use crate::error::Result;
use crate::fat::FatTable;
use crate::{DIR_PER_SECTOR, FIRST_DATA_BLOCK, FIRST_DIR_BLOCK, MAX_DIR_COUNT, MAX_SECTOR, SECTOR_SIZE};

pub struct VolumeState {
    pub boot_sector: BootSector,
    pub fat: FatTable,
    pub root: Vec<DirEntry>,
    pub root_bitset: BitSet,
}

pub struct Volume {
    pub state: Mutex<VolumeState>,
    pub cache: BlockCache,
    pub device: Arc<dyn BlockDevice>,
}

impl Volume {
    /// Zero-fills the metadata region (FAT copies + root directory area)
    /// and writes a fresh boot sector. Data sectors beyond the root
    /// directory area are left untouched.
    pub fn format(device: Arc<dyn BlockDevice>) -> Result<()> {
        let zero = [0u8; SECTOR_SIZE];
        for sector in 1..FIRST_DATA_BLOCK as u32 {
            device.write_block(sector, &zero)?;
        }
        device.write_block(0, &BootSector::fresh().to_bytes())?;
        Ok(())
    }

    /// Reads the boot sector, both FAT copies' worth of metadata (only the
    /// first copy's content is consulted at runtime), and the root
    /// directory area into memory, then reconstructs both occupancy
    /// bitsets. On any I/O failure, the partially built state is simply
    /// dropped rather than requiring manual unwind bookkeeping.
    pub fn mount(device: Arc<dyn BlockDevice>) -> Result<Arc<Volume>> {
        let mut boot_buf = [0u8; SECTOR_SIZE];
        device.read_block(0, &mut boot_buf)?;
        let boot_sector = BootSector::from_bytes(&boot_buf);

        let mut raw_fat = vec![0u16; MAX_SECTOR];
        let entries_per_sector = SECTOR_SIZE / 2;
        for i in 0..boot_sector.sector_per_fat_table as u32 {
            let mut buf = [0u8; SECTOR_SIZE];
            device.read_block(1 + i, &mut buf)?;
            for slot in 0..entries_per_sector {
                let idx = i as usize * entries_per_sector + slot;
                if idx >= MAX_SECTOR {
                    break;
                }
                raw_fat[idx] = u16::from_le_bytes([buf[slot * 2], buf[slot * 2 + 1]]);
            }
        }
        let mut fat = FatTable::init_from_disk(raw_fat);

        let mut root = Vec::with_capacity(MAX_DIR_COUNT);
        for i in 0..crate::DIR_BLOCKS as u32 {
            let mut buf = [0u8; SECTOR_SIZE];
            device.read_block(FIRST_DIR_BLOCK as u32 + i, &mut buf)?;
            for slot in 0..DIR_PER_SECTOR {
                let offset = slot * DIRENT_SIZE;
                root.push(DirEntry::from_bytes(&buf[offset..offset + DIRENT_SIZE]));
            }
        }
        let mut root_bitset = BitSet::new(root.len());
        for (i, entry) in root.iter().enumerate() {
            if !entry.is_free() {
                root_bitset.set(i);
                // A single-sector chain has fat[first_cluster] == 0, the same
                // value a free sector holds; init_from_disk's walk alone
                // would miss it, so every live entry's chain start is seeded
                // here explicitly.
                fat.mark_live(entry.first_cluster as u32);
            }
        }

        let cache = BlockCache::new(device.clone());
        Ok(Arc::new(Volume {
            state: Mutex::new(VolumeState {
                boot_sector,
                fat,
                root,
                root_bitset,
            }),
            cache,
            device,
        }))
    }

    /// Writes the boot sector, both FAT copies, and the root directory area
    /// back to the device directly (not through the cache).
    pub fn sync(&self) -> Result<()> {
        let state = self.state.lock();

        self.device.write_block(0, &state.boot_sector.to_bytes())?;

        let entries_per_sector = SECTOR_SIZE / 2;
        let mut fat_bytes = vec![0u8; MAX_SECTOR * 2];
        for (i, entry) in state.fat.raw().iter().enumerate() {
            fat_bytes[i * 2..i * 2 + 2].copy_from_slice(&entry.to_le_bytes());
        }
        for copy in 0..2u32 {
            let base = copy * state.boot_sector.sector_per_fat_table as u32;
            for i in 0..state.boot_sector.sector_per_fat_table as u32 {
                let start = i as usize * entries_per_sector * 2;
                let mut buf = [0u8; SECTOR_SIZE];
                buf.copy_from_slice(&fat_bytes[start..start + SECTOR_SIZE]);
                self.device.write_block(1 + base + i, &buf)?;
            }
        }

        for i in 0..crate::DIR_BLOCKS as u32 {
            let mut buf = [0u8; SECTOR_SIZE];
            for slot in 0..DIR_PER_SECTOR {
                let idx = i as usize * DIR_PER_SECTOR + slot;
                if idx >= state.root.len() {
                    break;
                }
                let offset = slot * DIRENT_SIZE;
                buf[offset..offset + DIRENT_SIZE].copy_from_slice(&state.root[idx].to_bytes());
            }
            self.device.write_block(FIRST_DIR_BLOCK as u32 + i, &buf)?;
        }
        Ok(())
    }
}
