//! Offline image builder: packs a set of host files into a ready-to-mount
//! volume image. Grounded on `buildFat16.c`'s packing algorithm — lay out
//! file data first, then write the boot sector, both FAT copies, and the
//! root directory area last.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::error;

use fat16::bitset::BitSet;
use fat16::boot_sector::BootSector;
use fat16::device::{BlockDevice, FileBlockDevice};
use fat16::dirent::DirEntry;
use fat16::fat::FatTable;
use fat16::volume::{Volume, VolumeState};
use fat16::{FIRST_DATA_BLOCK, MAX_DIR_COUNT, MAX_NAME_LEN, SECTOR_SIZE};

#[derive(Parser)]
#[command(name = "mkfat16", about = "Build a FAT16-style volume image from host files")]
struct Args {
    /// Path to the disk image to write. Created if it does not already exist.
    disk_image: PathBuf,

    /// Files to pack into the image's root directory.
    files: Vec<PathBuf>,

    /// Image size in bytes, used only when `disk_image` does not already
    /// exist. Defaults to the smallest size that fits the fixed metadata
    /// region plus every input file.
    #[arg(long)]
    size: Option<u64>,
}

fn basename(path: &std::path::Path) -> Result<String, String> {
    let name = path
        .file_name()
        .ok_or_else(|| format!("{}: has no file name", path.display()))?
        .to_string_lossy()
        .into_owned();
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(format!(
            "{}: name must be 1-{} characters, got {:?}",
            path.display(),
            MAX_NAME_LEN,
            name
        ));
    }
    Ok(name)
}

fn run(args: Args) -> Result<(), String> {
    if args.files.len() > MAX_DIR_COUNT {
        return Err(format!(
            "too many files: {} exceeds root directory capacity of {}",
            args.files.len(),
            MAX_DIR_COUNT
        ));
    }

    let mut file_bytes = Vec::with_capacity(args.files.len());
    let mut total_data_sectors = 0usize;
    for path in &args.files {
        let bytes = std::fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        total_data_sectors += (bytes.len() + SECTOR_SIZE - 1) / SECTOR_SIZE;
        file_bytes.push((basename(path)?, bytes));
    }

    let device: Arc<dyn BlockDevice> = if args.disk_image.exists() {
        Arc::new(FileBlockDevice::open(&args.disk_image).map_err(|e| e.to_string())?)
    } else {
        let size = args.size.unwrap_or(
            (FIRST_DATA_BLOCK + total_data_sectors) as u64 * SECTOR_SIZE as u64,
        );
        Arc::new(FileBlockDevice::create_sized(&args.disk_image, size).map_err(|e| e.to_string())?)
    };

    let mut fat = FatTable::empty();
    let mut root = vec![DirEntry::EMPTY; MAX_DIR_COUNT];
    let mut root_bitset = BitSet::new(MAX_DIR_COUNT);

    let mut next_data_sector = FIRST_DATA_BLOCK as u32;
    for (idx, (name, bytes)) in file_bytes.into_iter().enumerate() {
        let sectors_needed = (bytes.len() + SECTOR_SIZE - 1) / SECTOR_SIZE;
        let first_sector = next_data_sector;

        let mut chain = Vec::with_capacity(sectors_needed.max(1));
        for i in 0..sectors_needed.max(1) {
            chain.push(next_data_sector + i as u32);
        }
        next_data_sector += sectors_needed.max(1) as u32;

        for (i, &sector) in chain.iter().enumerate() {
            let next = if i + 1 < chain.len() { chain[i + 1] } else { 0 };
            fat.link(sector, next);
        }
        if bytes.is_empty() {
            fat.link(chain[0], 0);
        }

        for (i, &sector) in chain.iter().enumerate() {
            let mut buf = [0u8; SECTOR_SIZE];
            let start = i * SECTOR_SIZE;
            let end = (start + SECTOR_SIZE).min(bytes.len());
            if start < bytes.len() {
                buf[..end - start].copy_from_slice(&bytes[start..end]);
            }
            device.write_block(sector, &buf).map_err(|e| e.to_string())?;
        }

        let mut entry = DirEntry::EMPTY;
        entry.set_name(&name).map_err(|_| format!("{}: invalid name", name))?;
        entry.first_cluster = first_sector as u16;
        entry.size = bytes.len() as u32;
        root[idx] = entry;
        root_bitset.set(idx);
    }

    let mut boot_sector = BootSector::fresh();
    boot_sector.root_entry_count = file_bytes_len(&args.files);

    let volume = Arc::new(Volume {
        state: spin::Mutex::new(VolumeState {
            boot_sector,
            fat,
            root,
            root_bitset,
        }),
        cache: fat16::cache::BlockCache::new(device.clone()),
        device,
    });
    volume.sync().map_err(|e| e.to_string())?;

    Ok(())
}

fn file_bytes_len(files: &[PathBuf]) -> u16 {
    files.len() as u16
}

fn main() -> ExitCode {
    fat16::logging::init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            error!("{msg}");
            ExitCode::FAILURE
        }
    }
}
