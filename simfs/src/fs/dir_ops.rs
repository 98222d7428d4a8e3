// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{string::String, vec::Vec};

use simio::BlockIO;

use crate::core::{
    dir::{DirBlock, DirEntry},
    errors::*,
    resolver::*,
    staging::Staging,
};
use crate::ensure;
use crate::fs::{SimFs, file_ops::prepare_insert};

fn sorted_entries<IO: BlockIO + ?Sized>(
    st: &mut Staging<'_, IO>,
    dir: u32,
) -> FsResult<Vec<DirEntry>> {
    let block = st.read_dir(dir)?;
    let mut entries: Vec<DirEntry> = block.entries().map(|(_, e)| e.clone()).collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

impl<IO: BlockIO> SimFs<IO> {
    /// Creates an empty directory with default rights `rwx`.
    pub fn mkdir(&mut self, path: &str) -> FsResult {
        self.transact(|st, cwd| {
            let (dir, name) = resolve_to_parent(st, cwd, path)?;
            let mut block = prepare_insert(st, dir, name)?;
            let geometry = st.geometry();
            let child = st.fat_mut().allocate_chain(0)?;
            st.write_dir(child, DirBlock::new_directory(dir, &geometry));
            block.insert(DirEntry::directory(name, child))?;
            st.write_dir(dir, block);
            Ok(())
        })
    }

    /// Moves the current directory.
    pub fn cd(&mut self, path: &str) -> FsResult {
        let block = self.inspect(|st, cwd| resolve_dir(st, cwd, path))?;
        self.cwd = block;
        Ok(())
    }

    /// Absolute path of the current directory, `/` for the root.
    pub fn pwd(&mut self) -> FsResult<String> {
        self.inspect(|st, cwd| absolute_path(st, cwd))
    }

    /// Entries of the current directory sorted by name, `..` excluded.
    pub fn ls(&mut self) -> FsResult<Vec<DirEntry>> {
        self.inspect(|st, cwd| sorted_entries(st, cwd))
    }

    /// Entries of the directory at `path`, which must be readable.
    pub fn list(&mut self, path: &str) -> FsResult<Vec<DirEntry>> {
        self.inspect(|st, cwd| {
            let dir = resolve_dir(st, cwd, path)?;
            ensure!(dir_rights(st, dir)?.can_read(), FsError::PermissionDenied);
            sorted_entries(st, dir)
        })
    }

    /// Removes a file or an empty directory and frees its blocks.
    ///
    /// The root, `..` targets and the directories on the way to the current
    /// one cannot be removed.
    pub fn rm(&mut self, path: &str) -> FsResult {
        self.transact(|st, cwd| {
            let (dir, slot, entry) = match resolve_target(st, cwd, path)? {
                Target::Entry { dir, slot, entry } => (dir, slot, entry),
                Target::Vacant { .. } => return Err(FsError::PathNotFound),
                Target::Directory(_) => return Err(FsError::InvalidPath),
            };
            ensure!(dir_rights(st, dir)?.can_write(), FsError::PermissionDenied);

            if entry.is_dir() {
                ensure!(
                    !is_ancestor(st, entry.first_block, cwd)?,
                    FsError::InvalidPath
                );
                ensure!(
                    st.read_dir(entry.first_block)?.is_empty(),
                    FsError::DirectoryNotEmpty
                );
            }

            st.fat_mut().free_chain(entry.first_block);
            let mut block = st.read_dir(dir)?;
            block.clear(slot);
            st.write_dir(dir, block);
            Ok(())
        })
    }
}
