// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

// Core modules
pub mod errors;
pub mod stats;

// Backend modules
#[cfg(feature = "mem")]
mod mem;

#[cfg(feature = "std")]
mod file;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::{BlockIO, DEFAULT_BLOCK_COUNT, DEFAULT_BLOCK_SIZE};
    pub use super::BlockIOExt;
    pub use super::errors::*;
    pub use super::stats::*;

    #[cfg(feature = "mem")]
    pub use super::mem::MemBlockIO;

    #[cfg(feature = "std")]
    pub use super::file::{FileBlockIO, StdBlockIO};
}

// Internal use
use errors::*;

// Constants

/// Default block size of a simulated disk (one page, one FAT block).
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Default number of blocks of a simulated disk (8 MiB at the default block size).
pub const DEFAULT_BLOCK_COUNT: u32 = 2048;

// Traits

/// Block IO abstraction trait.
///
/// A device is a fixed array of `block_count()` blocks of `block_size()` bytes.
/// Only whole blocks are transferred: there is no partial-block IO and no
/// allocation semantics at this level.
/// Implementations may target RAM, flat files, or any seekable stream.
pub trait BlockIO {
    /// Size of one block in bytes.
    fn block_size(&self) -> usize;

    /// Number of addressable blocks.
    fn block_count(&self) -> u32;

    /// Reads block `index` into `buf` (`buf.len()` must equal `block_size()`).
    fn read_block(&mut self, index: u32, buf: &mut [u8]) -> BlockIOResult;

    /// Writes `data` as block `index` (`data.len()` must equal `block_size()`).
    fn write_block(&mut self, index: u32, data: &[u8]) -> BlockIOResult;

    /// Flushes any buffered data (may be a no-op).
    fn flush(&mut self) -> BlockIOResult;

    /// Validates an access before it reaches the backend.
    #[inline]
    fn check_access(&self, index: u32, len: usize) -> BlockIOResult {
        if index >= self.block_count() {
            return Err(BlockIOError::OutOfBounds);
        }
        if len != self.block_size() {
            return Err(BlockIOError::Invalid("buffer length differs from block size"));
        }
        Ok(())
    }

    /// Total size of the device in bytes.
    #[inline]
    fn size_bytes(&self) -> u64 {
        self.block_size() as u64 * self.block_count() as u64
    }
}

impl<T: BlockIO + ?Sized> BlockIO for &mut T {
    #[inline]
    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    #[inline]
    fn block_count(&self) -> u32 {
        (**self).block_count()
    }

    #[inline]
    fn read_block(&mut self, index: u32, buf: &mut [u8]) -> BlockIOResult {
        (**self).read_block(index, buf)
    }

    #[inline]
    fn write_block(&mut self, index: u32, data: &[u8]) -> BlockIOResult {
        (**self).write_block(index, data)
    }

    #[inline]
    fn flush(&mut self) -> BlockIOResult {
        (**self).flush()
    }
}

/// Extension helpers for BlockIO.
///
/// Provides convenient helpers:
/// - owned block reads
/// - zero fill of block ranges
pub trait BlockIOExt: BlockIO {
    /// Reads block `index` into a freshly allocated buffer.
    #[cfg(feature = "alloc")]
    #[inline]
    fn read_block_vec(&mut self, index: u32) -> BlockIOResult<Vec<u8>> {
        let mut buf = alloc::vec![0u8; self.block_size()];
        self.read_block(index, &mut buf)?;
        Ok(buf)
    }

    /// Fills `count` blocks starting at `first` with zeroes.
    ///
    /// Used for full formats and scrubbing freshly created volumes.
    #[cfg(feature = "alloc")]
    fn zero_fill(&mut self, first: u32, count: u32) -> BlockIOResult {
        let end = first.checked_add(count).ok_or(BlockIOError::OutOfBounds)?;
        if end > self.block_count() {
            return Err(BlockIOError::OutOfBounds);
        }
        let zero = alloc::vec![0u8; self.block_size()];
        for index in first..end {
            self.write_block(index, &zero)?;
        }
        Ok(())
    }
}

impl<T: BlockIO + ?Sized> BlockIOExt for T {}
