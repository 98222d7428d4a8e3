// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use simio::BlockIO;

use crate::core::{
    dir::{DirBlock, DirEntry, validate_name},
    errors::*,
    resolver::*,
    staging::Staging,
};
use crate::ensure;
use crate::fs::SimFs;

/// Resolves a path that must name an existing regular file.
pub(super) fn resolve_file<IO: BlockIO + ?Sized>(
    st: &mut Staging<'_, IO>,
    cwd: u32,
    path: &str,
) -> FsResult<(u32, usize, DirEntry)> {
    match resolve_target(st, cwd, path)? {
        Target::Entry { dir, slot, entry } if !entry.is_dir() => Ok((dir, slot, entry)),
        Target::Vacant { .. } => Err(FsError::PathNotFound),
        _ => Err(FsError::IsADirectory),
    }
}

/// Checks that `name` can be added to directory `dir` and returns its block.
pub(super) fn prepare_insert<IO: BlockIO + ?Sized>(
    st: &mut Staging<'_, IO>,
    dir: u32,
    name: &str,
) -> FsResult<DirBlock> {
    validate_name(name)?;
    let block = st.read_dir(dir)?;
    ensure!(block.find_by_name(name).is_none(), FsError::AlreadyExists);
    ensure!(dir_rights(st, dir)?.can_write(), FsError::PermissionDenied);
    ensure!(block.find_free_slot().is_some(), FsError::DirectoryFull);
    Ok(block)
}

impl<IO: BlockIO> SimFs<IO> {
    /// Creates a file holding exactly `data`.
    ///
    /// Even an empty file owns one block.
    pub fn create(&mut self, path: &str, data: &[u8]) -> FsResult {
        self.transact(|st, cwd| {
            let (dir, name) = resolve_to_parent(st, cwd, path)?;
            let mut block = prepare_insert(st, dir, name)?;
            let size = u32::try_from(data.len()).map_err(|_| FsError::NoFreeBlocks)?;
            let first = st.store(data)?;
            block.insert(DirEntry::file(name, first, size))?;
            st.write_dir(dir, block);
            Ok(())
        })
    }

    /// Returns the `size` bytes of a readable file.
    pub fn cat(&mut self, path: &str) -> FsResult<Vec<u8>> {
        self.inspect(|st, cwd| {
            let (_, _, entry) = resolve_file(st, cwd, path)?;
            ensure!(entry.rights.can_read(), FsError::PermissionDenied);
            st.read_chain(entry.first_block, entry.size)
        })
    }

    /// Copies a file to a new name, or into an existing directory under its
    /// own name. The copy keeps the source rights.
    pub fn cp(&mut self, src: &str, dst: &str) -> FsResult {
        self.transact(|st, cwd| {
            let (_, _, entry) = resolve_file(st, cwd, src)?;
            ensure!(entry.rights.can_read(), FsError::PermissionDenied);

            let (dir, name) = destination(st, cwd, dst, &entry.name)?;
            let mut block = prepare_insert(st, dir, &name)?;

            let content = st.read_chain(entry.first_block, entry.size)?;
            let first = st.store(&content)?;
            block.insert(DirEntry {
                name,
                first_block: first,
                ..entry
            })?;
            st.write_dir(dir, block);
            Ok(())
        })
    }

    /// Appends the content of `src` to the end of `dst`.
    pub fn append(&mut self, src: &str, dst: &str) -> FsResult {
        self.transact(|st, cwd| {
            let (_, _, source) = resolve_file(st, cwd, src)?;
            ensure!(source.rights.can_read(), FsError::PermissionDenied);

            let (dir, slot, mut target) = resolve_file(st, cwd, dst)?;
            ensure!(
                target.rights.can_read() && target.rights.can_write(),
                FsError::PermissionDenied
            );

            let extra = st.read_chain(source.first_block, source.size)?;
            target.size = st.append_chain(target.first_block, target.size, &extra)?;

            let mut block = st.read_dir(dir)?;
            block.set(slot, target);
            st.write_dir(dir, block);
            Ok(())
        })
    }
}

#[cfg(all(test, feature = "mem"))]
mod tests {
    use crate::prelude::*;

    fn fs() -> SimFs<MemBlockIO> {
        SimFs::format_new(MemBlockIO::new(512, 64)).unwrap()
    }

    #[test]
    fn test_create_and_cat() {
        let mut fs = fs();
        fs.create("f1", b"hej heja hejare\n").unwrap();
        assert_eq!(fs.cat("f1").unwrap(), b"hej heja hejare\n");
        assert_eq!(fs.stat("f1").unwrap().size, 16);

        let big: Vec<u8> = (0..2000u32).map(|i| i as u8).collect();
        fs.create("/big", &big).unwrap();
        assert_eq!(fs.cat("big").unwrap(), big);
    }

    #[test]
    fn test_create_empty_file_owns_a_block() {
        let mut fs = fs();
        let before = fs.df().free;
        fs.create("empty", b"").unwrap();
        assert_eq!(fs.df().free, before - 1);
        assert!(fs.cat("empty").unwrap().is_empty());
    }

    #[test]
    fn test_create_errors() {
        let mut fs = fs();
        fs.create("f1", b"x").unwrap();
        fs.mkdir("d1").unwrap();
        assert_eq!(fs.create("f1", b"y"), Err(FsError::AlreadyExists));
        assert_eq!(fs.create("d1", b"y"), Err(FsError::AlreadyExists));
        assert_eq!(fs.create("nope/f", b"y"), Err(FsError::PathNotFound));
        assert_eq!(fs.create("f1/f", b"y"), Err(FsError::NotADirectory));
        assert_eq!(fs.create("/", b"y"), Err(FsError::InvalidPath));
        assert_eq!(fs.create("d1/..", b"y"), Err(FsError::InvalidPath));
        assert_eq!(fs.cat("f1").unwrap(), b"x");
    }

    #[test]
    fn test_cat_errors() {
        let mut fs = fs();
        fs.mkdir("d1").unwrap();
        assert_eq!(fs.cat("missing"), Err(FsError::PathNotFound));
        assert_eq!(fs.cat("d1"), Err(FsError::IsADirectory));
        assert_eq!(fs.cat("/"), Err(FsError::IsADirectory));
    }

    #[test]
    fn test_cp_into_directory_and_rename() {
        let mut fs = fs();
        fs.create("f1", b"data\n").unwrap();
        fs.mkdir("d1").unwrap();
        fs.chmod("4", "f1").unwrap();

        fs.cp("f1", "d1").unwrap();
        fs.cp("f1", "d1/copy").unwrap();
        assert_eq!(fs.cat("d1/f1").unwrap(), b"data\n");
        assert_eq!(fs.stat("d1/copy").unwrap().rights, AccessRights::READ);
        assert_ne!(
            fs.stat("d1/f1").unwrap().first_block,
            fs.stat("f1").unwrap().first_block
        );
        assert_eq!(fs.cp("f1", "d1"), Err(FsError::AlreadyExists));
        assert_eq!(fs.cp("d1", "x"), Err(FsError::IsADirectory));
    }

    #[test]
    fn test_append_grows_chain() {
        let mut fs = fs();
        let a = vec![b'a'; 500];
        let b = vec![b'b'; 600];
        fs.create("a", &a).unwrap();
        fs.create("b", &b).unwrap();
        fs.append("b", "a").unwrap();

        let out = fs.cat("a").unwrap();
        assert_eq!(out.len(), 1100);
        assert_eq!(&out[..500], &a[..]);
        assert_eq!(&out[500..], &b[..]);
        assert_eq!(fs.cat("b").unwrap(), b);
        assert!(fs.check().unwrap().ok());
    }

    #[test]
    fn test_append_to_itself() {
        let mut fs = fs();
        fs.create("f", b"ab").unwrap();
        fs.append("f", "f").unwrap();
        assert_eq!(fs.cat("f").unwrap(), b"abab");
    }
}
