// SPDX-License-Identifier: MIT

use simio::{BlockIO, BlockIOExt};

use crate::core::{
    checker::{CheckOptions, FsChecker, SimFsChecker, VerifyReport},
    dir::DirBlock,
    errors::*,
    fat::Fat,
    meta::*,
    staging::Staging,
};
use crate::ensure;

mod dir_ops;
mod entry_ops;
mod file_ops;
pub mod formatter;

pub use entry_ops::VolumeUsage;
pub use formatter::SimFormatter;

/// A mounted volume.
///
/// Owns the block device, the cached FAT and the current directory. Every
/// operation takes `&mut self`, runs against a [`Staging`] copy of the
/// volume, and only touches the device once it has fully succeeded.
#[derive(Debug)]
pub struct SimFs<IO: BlockIO> {
    io: IO,
    geometry: Geometry,
    fat: Fat,
    cwd: u32,
}

impl<IO: BlockIO> SimFs<IO> {
    /// Mounts an already formatted volume. The current directory is the root.
    pub fn mount(mut io: IO) -> FsResult<Self> {
        let geometry = Geometry::of(&io)?;
        let fat = Self::probe(&mut io, geometry)?.ok_or(FsError::NotFormatted)?;
        Ok(Self {
            io,
            geometry,
            fat,
            cwd: ROOT_BLOCK,
        })
    }

    /// Formats `io` and mounts the fresh volume.
    pub fn format_new(mut io: IO) -> FsResult<Self> {
        let geometry = Geometry::of(&io)?;
        let fat = SimFormatter::new(&mut io, geometry).format(false)?;
        Ok(Self {
            io,
            geometry,
            fat,
            cwd: ROOT_BLOCK,
        })
    }

    /// Reads the FAT and the root, `None` when they do not form a volume.
    fn probe(io: &mut IO, geometry: Geometry) -> FsResult<Option<Fat>> {
        let fat = Fat::decode(&io.read_block_vec(FAT_BLOCK)?, geometry)?;
        if !fat.is_formatted() {
            return Ok(None);
        }
        let root = match DirBlock::decode(&io.read_block_vec(ROOT_BLOCK)?) {
            Ok(root) => root,
            Err(FsError::Corrupted(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok((root.parent() == Ok(ROOT_BLOCK)).then_some(fat))
    }

    /// Quick format: fresh FAT and empty root, back to the root directory.
    pub fn format(&mut self) -> FsResult {
        self.format_with(false)
    }

    /// Format that also zeroes every data block.
    pub fn format_full(&mut self) -> FsResult {
        self.format_with(true)
    }

    fn format_with(&mut self, full_format: bool) -> FsResult {
        self.fat = SimFormatter::new(&mut self.io, self.geometry).format(full_format)?;
        self.cwd = ROOT_BLOCK;
        Ok(())
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[inline]
    pub fn fat(&self) -> &Fat {
        &self.fat
    }

    /// Block of the current directory.
    #[inline]
    pub fn cwd(&self) -> u32 {
        self.cwd
    }

    #[inline]
    pub fn io(&self) -> &IO {
        &self.io
    }

    #[inline]
    pub fn into_inner(self) -> IO {
        self.io
    }

    /// Runs a mutating operation and commits it only if it succeeds.
    fn transact<T, F>(&mut self, op: F) -> FsResult<T>
    where
        F: FnOnce(&mut Staging<'_, IO>, u32) -> FsResult<T>,
    {
        let mut st = Staging::new(&mut self.io, &self.fat);
        let out = op(&mut st, self.cwd)?;
        if let Some(fat) = st.commit()? {
            self.fat = fat;
        }
        Ok(out)
    }

    /// Runs a read-only operation. Nothing is ever written.
    fn inspect<T, F>(&mut self, op: F) -> FsResult<T>
    where
        F: FnOnce(&mut Staging<'_, IO>, u32) -> FsResult<T>,
    {
        let mut st = Staging::new(&mut self.io, &self.fat);
        op(&mut st, self.cwd)
    }

    /// Runs every consistency check on the volume.
    pub fn check(&mut self) -> FsResult<VerifyReport> {
        self.check_with(&CheckOptions::default())
    }

    pub fn check_with(&mut self, opt: &CheckOptions) -> FsResult<VerifyReport> {
        ensure!(self.fat.is_formatted(), FsError::NotFormatted);
        SimFsChecker::new(&mut self.io, &self.fat).check_with(opt)
    }
}
