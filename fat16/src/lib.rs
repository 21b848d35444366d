//! A FAT16-style read/write filesystem core: on-disk layout, FAT chain
//! management, path resolution, a block cache, and the file/mount-point
//! operations a VFS layer plugs into.

pub mod bitset;
pub mod boot_sector;
pub mod cache;
pub mod device;
pub mod dirent;
pub mod error;
pub mod fat;
pub mod file;
pub mod logging;
pub mod mount;
pub mod path;
pub mod vfs;
pub mod volume;

pub use error::{Error, Result};

/// Bytes per sector; all I/O in this crate is sector-granular.
pub const SECTOR_SIZE: usize = 512;

/// One 16-bit FAT entry per sector; this bounds the whole addressable volume.
pub const MAX_SECTOR: usize = 1 << 16;

/// Max bytes in a name field (no extension separator).
pub const MAX_NAME_LEN: usize = 11;

/// Max path depth a resolver will walk before failing with `InvalidPath`.
pub const MAX_DIR_DEEP: usize = 6;

/// Sectors needed to hold one copy of the whole FAT: `MAX_SECTOR * 2 bytes / SECTOR_SIZE`.
pub const SECTOR_PER_FATT: usize = MAX_SECTOR * 2 / SECTOR_SIZE;

/// Sector at which the root directory area begins: sector 0 is the boot
/// sector, followed by two FAT copies.
pub const FIRST_DIR_BLOCK: usize = 1 + 2 * SECTOR_PER_FATT;

/// Sectors reserved for the root directory area.
pub const DIR_BLOCKS: usize = 32;

/// Directory entries per sector.
pub const DIR_PER_SECTOR: usize = SECTOR_SIZE / dirent::DIRENT_SIZE;

/// Total root directory entry capacity.
pub const MAX_DIR_COUNT: usize = DIR_BLOCKS * DIR_PER_SECTOR;

/// First sector available for file data.
pub const FIRST_DATA_BLOCK: usize = FIRST_DIR_BLOCK + DIR_BLOCKS;

/// Default block cache capacity (slots), matching the original design's
/// `MAX_CACHE`.
pub const MAX_CACHE: usize = 200;
