// SPDX-License-Identifier: MIT

use simio::{BlockIO, BlockIOExt};

use crate::core::{dir::DirBlock, errors::*, fat::Fat, meta::*};

/// Writes an empty volume: a fresh FAT and a root directory holding only its
/// `..` self link.
///
/// A full format also zeroes every data block, a quick one leaves them as is
/// since the FAT alone decides what is allocated.
pub struct SimFormatter<'a, IO: BlockIO + ?Sized> {
    io: &'a mut IO,
    geometry: Geometry,
}

impl<'a, IO: BlockIO + ?Sized> SimFormatter<'a, IO> {
    pub fn new(io: &'a mut IO, geometry: Geometry) -> Self {
        Self { io, geometry }
    }

    fn zero_data_area(&mut self) -> FsResult {
        let first = self.geometry.first_data_unit();
        let count = self.geometry.last_data_unit() + 1 - first;
        self.io.zero_fill(first, count)?;
        Ok(())
    }

    fn write_root(&mut self) -> FsResult {
        let root = DirBlock::new_directory(ROOT_BLOCK, &self.geometry);
        self.io.write_block(ROOT_BLOCK, &root.encode())?;
        Ok(())
    }

    fn write_fat(&mut self, fat: &Fat) -> FsResult {
        self.io.write_block(FAT_BLOCK, &fat.encode())?;
        Ok(())
    }

    /// Formats the volume and returns the FAT now on disk.
    #[must_use = "format result must be checked for errors"]
    pub fn format(&mut self, full_format: bool) -> FsResult<Fat> {
        if full_format {
            self.zero_data_area()?;
        }
        let fat = Fat::new(self.geometry);
        self.write_root()?;
        self.write_fat(&fat)?;
        self.io.flush()?;
        Ok(fat)
    }
}
