//! Block device contract and a host-file-backed implementation.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::SECTOR_SIZE;

/// A block device exposes sector-granular reads and writes. The kernel this
/// is embedded in is expected to supply its own implementation backed by a
/// real disk driver; this crate never assumes anything about the device
/// beyond this contract.
pub trait BlockDevice: Send + Sync {
    fn read_block(&self, block_no: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<()>;
    fn write_block(&self, block_no: u32, buf: &[u8; SECTOR_SIZE]) -> Result<()>;
}

/// A `BlockDevice` backed by a host file, used by the image builder and by
/// every test in this crate in place of a real disk driver.
pub struct FileBlockDevice {
    file: Mutex<File>,
}

impl FileBlockDevice {
    pub fn open(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let file = File::options().read(true).write(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    pub fn create_sized(path: impl AsRef<std::path::Path>, size_bytes: u64) -> std::io::Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(size_bytes)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl BlockDevice for FileBlockDevice {
    fn read_block(&self, block_no: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<()> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(block_no as u64 * SECTOR_SIZE as u64))
            .map_err(|_| Error::io(block_no))?;
        file.read_exact(buf).map_err(|_| Error::io(block_no))
    }

    fn write_block(&self, block_no: u32, buf: &[u8; SECTOR_SIZE]) -> Result<()> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(block_no as u64 * SECTOR_SIZE as u64))
            .map_err(|_| Error::io(block_no))?;
        file.write_all(buf).map_err(|_| Error::io(block_no))
    }
}
