// SPDX-License-Identifier: MIT

use simio::BlockIO;

use crate::core::errors::*;
use crate::ensure;

/// Block holding the root directory.
pub const ROOT_BLOCK: u32 = 0;
/// Block holding the allocation table.
pub const FAT_BLOCK: u32 = 1;
/// First block handed out by the allocator.
pub const FIRST_DATA_BLOCK: u32 = 2;

/// Allocation table markers.
pub const FAT_FREE: i16 = 0;
pub const FAT_EOF: i16 = -1;
pub const FAT_ENTRY_SIZE: usize = 2;

/// On-disk directory entry layout.
pub const DIR_ENTRY_SIZE: usize = 64;
pub const NAME_FIELD_LEN: usize = 56;
pub const MAX_NAME_LEN: usize = NAME_FIELD_LEN - 1;

/// Block indices must fit a positive `i16` table entry.
pub const MAX_BLOCK_COUNT: u32 = i16::MAX as u32 + 1;
pub const MIN_BLOCK_SIZE: usize = 2 * DIR_ENTRY_SIZE;
pub const MIN_BLOCK_COUNT: u32 = 3;

/// Trait implemented by the volume metadata.
/// Provides the static layout needed during formatting, allocation and checking.
pub trait FsMeta<Unit: Ord + Copy> {
    /// Size of one allocation unit in bytes.
    fn unit_size(&self) -> usize;

    /// Offset (in bytes) on disk of a given allocation unit.
    fn unit_offset(&self, unit: Unit) -> u64;

    /// Unit holding the root directory.
    fn root_unit(&self) -> Unit;

    /// First valid unit for allocation.
    fn first_data_unit(&self) -> Unit;

    /// Last valid unit.
    fn last_data_unit(&self) -> Unit;

    /// Total number of units on the volume, reserved ones included.
    fn total_units(&self) -> usize;

    /// Total size in bytes of the FS.
    fn size_bytes(&self) -> u64;

    /// Check if a given unit is valid for allocation.
    fn is_valid_unit(&self, unit: Unit) -> bool {
        unit >= self.first_data_unit() && unit <= self.last_data_unit()
    }
}

/// Shape of a volume: how many blocks and how large each one is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub block_size: usize,
    pub block_count: u32,
}

impl Geometry {
    /// Validates a geometry.
    ///
    /// The single FAT block must hold one entry per block, every block index
    /// must fit a signed 16-bit entry, and a directory block must hold the
    /// `..` entry plus at least one user entry.
    pub fn new(block_size: usize, block_count: u32) -> FsResult<Self> {
        ensure!(
            block_size >= MIN_BLOCK_SIZE,
            FsError::Geometry("block size is too small")
        );
        ensure!(
            block_size.is_multiple_of(DIR_ENTRY_SIZE),
            FsError::Geometry("block size is not a multiple of the directory entry size")
        );
        ensure!(
            block_count >= MIN_BLOCK_COUNT,
            FsError::Geometry("volume needs at least three blocks")
        );
        ensure!(
            block_count <= MAX_BLOCK_COUNT,
            FsError::Geometry("block count exceeds the FAT entry range")
        );
        ensure!(
            block_count as usize <= block_size / FAT_ENTRY_SIZE,
            FsError::Geometry("block count exceeds the entries of one FAT block")
        );
        Ok(Self {
            block_size,
            block_count,
        })
    }

    /// Geometry of an existing device.
    #[inline]
    pub fn of<IO: BlockIO + ?Sized>(io: &IO) -> FsResult<Self> {
        Self::new(io.block_size(), io.block_count())
    }

    /// Slots per directory block, the `..` slot included.
    #[inline]
    pub fn dir_slots(&self) -> usize {
        self.block_size / DIR_ENTRY_SIZE
    }

    /// User-visible entries per directory.
    #[inline]
    pub fn dir_capacity(&self) -> usize {
        self.dir_slots() - 1
    }

    #[inline]
    pub fn fat_entries(&self) -> usize {
        self.block_size / FAT_ENTRY_SIZE
    }

    /// Blocks needed for `len` bytes. Every file owns at least one block.
    #[inline]
    pub fn blocks_for(&self, len: usize) -> usize {
        len.div_ceil(self.block_size).max(1)
    }
}

impl FsMeta<u32> for Geometry {
    #[inline]
    fn unit_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    fn unit_offset(&self, unit: u32) -> u64 {
        unit as u64 * self.block_size as u64
    }

    #[inline]
    fn root_unit(&self) -> u32 {
        ROOT_BLOCK
    }

    #[inline]
    fn first_data_unit(&self) -> u32 {
        FIRST_DATA_BLOCK
    }

    #[inline]
    fn last_data_unit(&self) -> u32 {
        self.block_count - 1
    }

    #[inline]
    fn total_units(&self) -> usize {
        self.block_count as usize
    }

    #[inline]
    fn size_bytes(&self) -> u64 {
        self.block_count as u64 * self.block_size as u64
    }
}
