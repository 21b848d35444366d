//! On-disk directory entry record and the location tag resolved entries
//! carry with them.

use bitflags::bitflags;

use crate::MAX_NAME_LEN;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DirFlags: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const IS_DIR    = 0x10;
    }
}

/// `#[repr(C, packed)]` to match the on-disk byte layout exactly.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct DirEntry {
    pub name: [u8; MAX_NAME_LEN],
    pub flag: u8,
    pub reserved1: u32,
    pub reserved2: u16,
    pub modified_time: u16,
    pub modified_date: u16,
    pub first_cluster: u16,
    pub size: u32,
}

pub const DIRENT_SIZE: usize = core::mem::size_of::<DirEntry>();

impl DirEntry {
    pub const EMPTY: DirEntry = DirEntry {
        name: [0u8; MAX_NAME_LEN],
        flag: 0,
        reserved1: 0,
        reserved2: 0,
        modified_time: 0,
        modified_date: 0,
        first_cluster: 0,
        size: 0,
    };

    pub fn is_free(&self) -> bool {
        self.name[0] == 0
    }

    pub fn flags(&self) -> DirFlags {
        DirFlags::from_bits_truncate(self.flag)
    }

    pub fn is_dir(&self) -> bool {
        self.flags().contains(DirFlags::IS_DIR)
    }

    pub fn name_matches(&self, component: &str) -> bool {
        let mut packed = [0u8; MAX_NAME_LEN];
        let bytes = component.as_bytes();
        if bytes.len() > MAX_NAME_LEN {
            return false;
        }
        packed[..bytes.len()].copy_from_slice(bytes);
        packed == self.name
    }

    pub fn name_str(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LEN);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    pub fn set_name(&mut self, component: &str) -> Result<(), ()> {
        let bytes = component.as_bytes();
        if bytes.is_empty() || bytes.len() > MAX_NAME_LEN {
            return Err(());
        }
        self.name = [0u8; MAX_NAME_LEN];
        self.name[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; DIRENT_SIZE] {
        let mut buf = [0u8; DIRENT_SIZE];
        buf[0..MAX_NAME_LEN].copy_from_slice(&self.name);
        buf[11] = self.flag;
        buf[12..16].copy_from_slice(&self.reserved1.to_le_bytes());
        buf[16..18].copy_from_slice(&self.reserved2.to_le_bytes());
        buf[18..20].copy_from_slice(&self.modified_time.to_le_bytes());
        buf[20..22].copy_from_slice(&self.modified_date.to_le_bytes());
        buf[22..24].copy_from_slice(&self.first_cluster.to_le_bytes());
        buf[24..28].copy_from_slice(&self.size.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Self {
        let mut name = [0u8; MAX_NAME_LEN];
        name.copy_from_slice(&buf[0..MAX_NAME_LEN]);
        Self {
            name,
            flag: buf[11],
            reserved1: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            reserved2: u16::from_le_bytes([buf[16], buf[17]]),
            modified_time: u16::from_le_bytes([buf[18], buf[19]]),
            modified_date: u16::from_le_bytes([buf[20], buf[21]]),
            first_cluster: u16::from_le_bytes([buf[22], buf[23]]),
            size: u32::from_le_bytes([buf[24], buf[25], buf[26], buf[27]]),
        }
    }
}

/// Where a resolved [`DirEntry`] physically lives, replacing the original
/// source's `reserved2 == 1` out-of-band sentinel with an explicit tag a
/// caller dispatches a write-back on.
#[derive(Clone, Copy, Debug)]
pub enum DirEntryLocation {
    /// A direct slot in the resident root directory array.
    Root(usize),
    /// An entry read out of a directory's data sector; `offset` is the
    /// byte offset of the entry within that sector.
    Data { sector: u32, offset: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trips_through_bytes() {
        let mut e = DirEntry::EMPTY;
        e.set_name("hello.txt").unwrap();
        e.size = 13;
        let bytes = e.to_bytes();
        let back = DirEntry::from_bytes(&bytes);
        assert_eq!(back.name_str(), "hello.txt");
        assert_eq!({ back.size }, 13);
    }

    #[test]
    fn rejects_name_too_long() {
        let mut e = DirEntry::EMPTY;
        assert!(e.set_name("this-name-is-too-long").is_err());
    }

    #[test]
    fn free_detection() {
        let e = DirEntry::EMPTY;
        assert!(e.is_free());
    }
}
