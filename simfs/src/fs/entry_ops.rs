// SPDX-License-Identifier: MIT

use simio::BlockIO;

use crate::core::{
    attr::AccessRights,
    dir::{DirEntry, validate_name},
    errors::*,
    meta::*,
    resolver::*,
};
use crate::ensure;
use crate::fs::SimFs;

/// Block usage of a volume. Reserved blocks count as used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeUsage {
    pub block_size: usize,
    pub total: u32,
    pub used: u32,
    pub free: u32,
}

impl<IO: BlockIO> SimFs<IO> {
    /// Renames or moves an entry.
    ///
    /// Within one directory the slot is renamed in place. Across directories
    /// the entry changes hands without touching its blocks, and a moved
    /// directory gets its `..` repointed.
    pub fn mv(&mut self, src: &str, dst: &str) -> FsResult {
        self.transact(|st, cwd| {
            let (src_dir, src_slot, entry) = match resolve_target(st, cwd, src)? {
                Target::Entry { dir, slot, entry } => (dir, slot, entry),
                Target::Vacant { .. } => return Err(FsError::PathNotFound),
                Target::Directory(_) => return Err(FsError::InvalidPath),
            };
            let (dst_dir, name) = destination(st, cwd, dst, &entry.name)?;
            validate_name(&name)?;

            ensure!(dir_rights(st, src_dir)?.can_write(), FsError::PermissionDenied);
            ensure!(dir_rights(st, dst_dir)?.can_write(), FsError::PermissionDenied);
            if entry.is_dir() {
                ensure!(
                    !is_ancestor(st, entry.first_block, dst_dir)?,
                    FsError::InvalidMove
                );
            }

            let moved = DirEntry { name, ..entry };

            if src_dir == dst_dir {
                let mut block = st.read_dir(src_dir)?;
                if let Some(slot) = block.find_by_name(&moved.name) {
                    ensure!(slot == src_slot, FsError::AlreadyExists);
                }
                block.set(src_slot, moved);
                st.write_dir(src_dir, block);
                return Ok(());
            }

            let mut target = st.read_dir(dst_dir)?;
            ensure!(
                target.find_by_name(&moved.name).is_none(),
                FsError::AlreadyExists
            );
            let moved_dir = moved.is_dir().then_some(moved.first_block);
            target.insert(moved)?;
            st.write_dir(dst_dir, target);

            let mut source = st.read_dir(src_dir)?;
            source.clear(src_slot);
            st.write_dir(src_dir, source);

            if let Some(child) = moved_dir {
                let mut block = st.read_dir(child)?;
                block.set_parent(dst_dir);
                st.write_dir(child, block);
            }
            Ok(())
        })
    }

    /// Replaces the rights of an entry. `mode` is a single octal digit.
    pub fn chmod(&mut self, mode: &str, path: &str) -> FsResult {
        let rights = AccessRights::parse_octal(mode)?;
        self.transact(|st, cwd| match resolve_target(st, cwd, path)? {
            Target::Entry {
                dir,
                slot,
                mut entry,
            } => {
                entry.rights = rights;
                let mut block = st.read_dir(dir)?;
                block.set(slot, entry);
                st.write_dir(dir, block);
                Ok(())
            }
            Target::Vacant { .. } => Err(FsError::PathNotFound),
            Target::Directory(_) => Err(FsError::InvalidPath),
        })
    }

    /// Metadata of one entry. The root reports itself as `/`.
    pub fn stat(&mut self, path: &str) -> FsResult<DirEntry> {
        self.inspect(|st, cwd| match resolve_target(st, cwd, path)? {
            Target::Entry { entry, .. } => Ok(entry),
            Target::Vacant { .. } => Err(FsError::PathNotFound),
            Target::Directory(ROOT_BLOCK) => Ok(DirEntry::directory("/", ROOT_BLOCK)),
            Target::Directory(block) => {
                let parent = parent_of(st, block)?;
                let dir = st.read_dir(parent)?;
                dir.find_by_block(block)
                    .and_then(|slot| dir.get(slot))
                    .cloned()
                    .ok_or(FsError::Corrupted("directory is not linked from its parent"))
            }
        })
    }

    pub fn df(&self) -> VolumeUsage {
        let total = self.geometry.block_count;
        let free = self.fat.free_blocks();
        VolumeUsage {
            block_size: self.geometry.block_size,
            total,
            used: total - free,
            free,
        }
    }
}
