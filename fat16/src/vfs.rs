//! The VFS-facing trait contracts this core implements, registered under
//! the name `"fat16"` by an embedding kernel's dispatch layer (out of
//! scope here).

use std::sync::Arc;

use crate::device::BlockDevice;
use crate::error::Result;
use crate::file::{FileHandle, Stat};
use crate::mount::{MountPoint, OpenFlags};
use crate::volume::Volume;

pub const FILESYSTEM_NAME: &str = "fat16";

/// Top-level filesystem operations a VFS dispatcher calls to bring a volume
/// up, mirroring the original's `fat16_FilesystemOps` vtable.
pub trait FilesystemOps {
    fn format(&self, device: Arc<dyn BlockDevice>) -> Result<()>;
    fn mount(&self, device: Arc<dyn BlockDevice>) -> Result<Box<dyn MountPointOps>>;
}

/// Per-mounted-volume operations, mirroring `fat16_mountPointOps`.
pub trait MountPointOps {
    fn open(&self, path: &str, mode: OpenFlags) -> Result<Box<dyn FileOps>>;
    fn create_directory(&self, path: &str) -> Result<()>;
    fn open_directory(&self, path: &str) -> Result<()>;
    fn stat(&self, path: &str) -> Result<Stat>;
    fn sync(&self) -> Result<()>;
    fn delete(&self, path: &str) -> Result<()>;
}

/// Per-open-file operations, mirroring `fat16_FileOps`.
pub trait FileOps {
    fn fstat(&self) -> Stat;
    fn read(&self, buf: &mut [u8]) -> Result<usize>;
    fn write(&self, data: &[u8]) -> Result<usize>;
    fn seek(&self, pos: u64);
    fn close(self: Box<Self>) -> Result<()>;
    fn read_entry(&self) -> Result<()> {
        Err(crate::error::Error::unsupported("read_entry"))
    }
}

pub struct Fat16Filesystem;

impl FilesystemOps for Fat16Filesystem {
    fn format(&self, device: Arc<dyn BlockDevice>) -> Result<()> {
        Volume::format(device)
    }

    fn mount(&self, device: Arc<dyn BlockDevice>) -> Result<Box<dyn MountPointOps>> {
        let volume = Volume::mount(device)?;
        Ok(Box::new(Arc::new(MountPoint::new(volume))))
    }
}

impl MountPointOps for Arc<MountPoint> {
    fn open(&self, path: &str, mode: OpenFlags) -> Result<Box<dyn FileOps>> {
        let handle = MountPoint::open(self, path, mode)?;
        Ok(Box::new(OpenFile {
            mount: self.clone(),
            handle: Some(handle),
        }))
    }

    fn create_directory(&self, path: &str) -> Result<()> {
        MountPoint::create_directory(self, path)
    }

    fn open_directory(&self, path: &str) -> Result<()> {
        MountPoint::open_directory(self, path)
    }

    fn stat(&self, path: &str) -> Result<Stat> {
        MountPoint::stat(self, path)
    }

    fn sync(&self) -> Result<()> {
        MountPoint::sync(self)
    }

    fn delete(&self, path: &str) -> Result<()> {
        MountPoint::delete(self, path)
    }
}

/// Adapts an owned [`FileHandle`] to the `FileOps` trait object contract,
/// persisting its entry back through the owning mount point on close.
struct OpenFile {
    mount: Arc<MountPoint>,
    handle: Option<FileHandle>,
}

impl FileOps for OpenFile {
    fn fstat(&self) -> Stat {
        self.handle.as_ref().unwrap().fstat()
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.handle.as_ref().unwrap().read(buf)
    }

    fn write(&self, data: &[u8]) -> Result<usize> {
        self.handle.as_ref().unwrap().write(data)
    }

    fn seek(&self, pos: u64) {
        self.handle.as_ref().unwrap().seek(pos)
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        let handle = self.handle.take().unwrap();
        let (entry, location) = handle.close();
        self.mount.commit_close(entry, location)
    }
}
