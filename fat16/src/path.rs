//! Path resolution: split a slash-separated path into components and walk
//! it one directory level at a time, bounded by `MAX_DIR_DEEP`.

use crate::cache::BlockCache;
use crate::dirent::{DirEntry, DirEntryLocation, DIRENT_SIZE};
use crate::error::{Error, Result};
use crate::volume::VolumeState;
use crate::{MAX_DIR_DEEP, SECTOR_SIZE};

/// One located entry: the entry itself and where it physically lives.
pub type Located = (DirEntry, DirEntryLocation);

pub enum PathResult {
    Found {
        entry: Located,
        parent: Option<Located>,
    },
    /// The directory chain up to (but not including) the final component
    /// resolved, but the final component itself does not exist. `parent` is
    /// `None` when the missing entry would live directly in the root (path
    /// depth 1) — the original source's `father == NULL` case.
    NotFound {
        parent: Option<Located>,
        missing_name: String,
    },
}

fn split(path: &str) -> Result<Vec<&str>> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(Error::invalid_path(path));
    }
    let parts: Vec<&str> = trimmed.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(Error::invalid_path(path));
    }
    if parts.len() > MAX_DIR_DEEP {
        return Err(Error::invalid_path(path));
    }
    Ok(parts)
}

fn find_in_root(state: &VolumeState, name: &str) -> Option<usize> {
    state
        .root
        .iter()
        .enumerate()
        .find(|(_, e)| !e.is_free() && e.name_matches(name))
        .map(|(i, _)| i)
}

/// Reads every directory entry reachable from `dir.first_cluster`'s chain,
/// up to `dir.size / DIRENT_SIZE` entries, alongside where each one lives.
fn read_dir_entries(
    state: &VolumeState,
    cache: &BlockCache,
    dir: &DirEntry,
) -> Result<Vec<Located>> {
    let entries_per_sector = SECTOR_SIZE / DIRENT_SIZE;
    let total = (dir.size as usize) / DIRENT_SIZE;
    let chain = state.fat.chain_from(dir.first_cluster as u32);
    let mut out = Vec::with_capacity(total);
    'outer: for sector in chain {
        let mut buf = [0u8; SECTOR_SIZE];
        cache.read(sector, &mut buf)?;
        for slot in 0..entries_per_sector {
            if out.len() >= total {
                break 'outer;
            }
            let offset = slot * DIRENT_SIZE;
            let entry = DirEntry::from_bytes(&buf[offset..offset + DIRENT_SIZE]);
            out.push((entry, DirEntryLocation::Data { sector, offset }));
        }
    }
    Ok(out)
}

fn find_in_dir(
    state: &VolumeState,
    cache: &BlockCache,
    dir: &DirEntry,
    name: &str,
) -> Result<Option<Located>> {
    let entries = read_dir_entries(state, cache, dir)?;
    Ok(entries
        .into_iter()
        .find(|(e, _)| !e.is_free() && e.name_matches(name)))
}

/// Walks `path` against the mounted volume, producing either the located
/// entry (and its parent, if any) or the fact that only the parent
/// resolved. Any intermediate component that is missing, not found, or not
/// a directory is `Error::InvalidPath` — only the *final* component may be
/// legitimately absent.
pub fn resolve(state: &VolumeState, cache: &BlockCache, path: &str) -> Result<PathResult> {
    let parts = split(path)?;
    let last = parts.len() - 1;

    if last == 0 {
        let name = parts[0];
        return match find_in_root(state, name) {
            Some(idx) => Ok(PathResult::Found {
                entry: (state.root[idx], DirEntryLocation::Root(idx)),
                parent: None,
            }),
            None => Ok(PathResult::NotFound {
                parent: None,
                missing_name: name.to_string(),
            }),
        };
    }

    let mut current = match find_in_root(state, parts[0]) {
        Some(idx) => (state.root[idx], DirEntryLocation::Root(idx)),
        None => return Err(Error::invalid_path(path)),
    };

    for &component in &parts[1..last] {
        if !current.0.is_dir() {
            return Err(Error::invalid_path(path));
        }
        current = match find_in_dir(state, cache, &current.0, component)? {
            Some(found) => found,
            None => return Err(Error::invalid_path(path)),
        };
    }

    if !current.0.is_dir() {
        return Err(Error::invalid_path(path));
    }

    let final_name = parts[last];
    match find_in_dir(state, cache, &current.0, final_name)? {
        Some(found) => Ok(PathResult::Found {
            entry: found,
            parent: Some(current),
        }),
        None => Ok(PathResult::NotFound {
            parent: Some(current),
            missing_name: final_name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_path() {
        assert!(split("").is_err());
        assert!(split("/").is_err());
    }

    #[test]
    fn rejects_depth_beyond_limit() {
        assert!(split("/a/b/c/d/e/f/g").is_err());
        assert!(split("/a/b/c/d/e/f").is_ok());
    }

    #[test]
    fn rejects_empty_component() {
        assert!(split("/a//b").is_err());
    }
}
