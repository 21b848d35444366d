//! Exercises the same packing algorithm `mkfat16` uses (lay out file data,
//! then write boot sector + FAT copies + root directory last) directly
//! against the library, then mounts the result and reads it back.

use std::sync::Arc;

use fat16::bitset::BitSet;
use fat16::boot_sector::BootSector;
use fat16::device::{BlockDevice, FileBlockDevice};
use fat16::dirent::DirEntry;
use fat16::fat::FatTable;
use fat16::mount::{MountPoint, OpenFlags};
use fat16::volume::{Volume, VolumeState};
use fat16::{FIRST_DATA_BLOCK, MAX_DIR_COUNT, SECTOR_SIZE};

fn build_image(path: &std::path::Path, files: &[(&str, &[u8])]) {
    let total_sectors: usize = files
        .iter()
        .map(|(_, data)| (data.len() + SECTOR_SIZE - 1) / SECTOR_SIZE)
        .sum();
    let size = (FIRST_DATA_BLOCK + total_sectors) as u64 * SECTOR_SIZE as u64;
    let device: Arc<dyn BlockDevice> =
        Arc::new(FileBlockDevice::create_sized(path, size).unwrap());

    let mut fat = FatTable::empty();
    let mut root = vec![DirEntry::EMPTY; MAX_DIR_COUNT];
    let mut root_bitset = BitSet::new(MAX_DIR_COUNT);
    let mut next_sector = FIRST_DATA_BLOCK as u32;

    for (idx, (name, data)) in files.iter().enumerate() {
        let sectors = ((data.len() + SECTOR_SIZE - 1) / SECTOR_SIZE).max(1);
        let chain: Vec<u32> = (0..sectors as u32).map(|i| next_sector + i).collect();
        next_sector += sectors as u32;

        for (i, &sector) in chain.iter().enumerate() {
            let next = if i + 1 < chain.len() { chain[i + 1] } else { 0 };
            fat.link(sector, next);
        }

        for (i, &sector) in chain.iter().enumerate() {
            let mut buf = [0u8; SECTOR_SIZE];
            let start = i * SECTOR_SIZE;
            let end = (start + SECTOR_SIZE).min(data.len());
            if start < data.len() {
                buf[..end - start].copy_from_slice(&data[start..end]);
            }
            device.write_block(sector, &buf).unwrap();
        }

        let mut entry = DirEntry::EMPTY;
        entry.set_name(name).unwrap();
        entry.first_cluster = chain[0] as u16;
        entry.size = data.len() as u32;
        root[idx] = entry;
        root_bitset.set(idx);
    }

    let volume = Arc::new(Volume {
        state: spin::Mutex::new(VolumeState {
            boot_sector: BootSector::fresh(),
            fat,
            root,
            root_bitset,
        }),
        cache: fat16::cache::BlockCache::new(device.clone()),
        device,
    });
    volume.sync().unwrap();
}

#[test]
fn build_then_mount_then_read_each_file() {
    let path = std::env::temp_dir().join(format!(
        "fat16-build-mount-read-{:?}.img",
        std::thread::current().id()
    ));
    let big = vec![0xABu8; 2000];
    build_image(&path, &[("hello.txt", b"hello, world!"), ("big.dat", &big)]);

    let dev: Arc<dyn BlockDevice> = Arc::new(FileBlockDevice::open(&path).unwrap());
    let mp = MountPoint::new(Volume::mount(dev).unwrap());

    let stat = mp.stat("/hello.txt").unwrap();
    assert_eq!(stat.size, 13);
    let handle = mp.open("/hello.txt", OpenFlags::READ).unwrap();
    let mut buf = vec![0u8; 13];
    handle.read(&mut buf).unwrap();
    assert_eq!(&buf, b"hello, world!");

    let stat = mp.stat("/big.dat").unwrap();
    assert_eq!(stat.size, 2000);
    let handle = mp.open("/big.dat", OpenFlags::READ).unwrap();
    let mut buf = vec![0u8; 2000];
    handle.read(&mut buf).unwrap();
    assert_eq!(buf, big);

    let _ = std::fs::remove_file(&path);
}
