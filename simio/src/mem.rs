// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec;
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use crate::{BlockIO, BlockIOError, BlockIOResult};

/// In-memory implementation of `BlockIO`.
///
/// Useful for tests, RAM-backed volumes and benchmarks.
#[derive(Debug, Clone)]
pub struct MemBlockIO {
    buffer: Vec<u8>,
    block_size: usize,
    block_count: u32,
}

impl MemBlockIO {
    /// Zero-filled device of `block_count` blocks.
    #[inline]
    pub fn new(block_size: usize, block_count: u32) -> Self {
        Self {
            buffer: vec![0u8; block_size * block_count as usize],
            block_size,
            block_count,
        }
    }

    /// Wraps an existing image. The image length must be a whole number of blocks.
    pub fn from_image(buffer: Vec<u8>, block_size: usize) -> BlockIOResult<Self> {
        if block_size == 0 || !buffer.len().is_multiple_of(block_size) {
            return Err(BlockIOError::Invalid("image is not a whole number of blocks"));
        }
        let block_count = u32::try_from(buffer.len() / block_size)
            .map_err(|_| BlockIOError::Invalid("image has too many blocks"))?;
        Ok(Self {
            buffer,
            block_size,
            block_count,
        })
    }

    /// Raw view of the whole device.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    #[inline]
    fn range(&self, index: u32) -> core::ops::Range<usize> {
        let start = index as usize * self.block_size;
        start..start + self.block_size
    }
}

impl BlockIO for MemBlockIO {
    #[inline]
    fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    fn block_count(&self) -> u32 {
        self.block_count
    }

    #[inline(always)]
    fn read_block(&mut self, index: u32, buf: &mut [u8]) -> BlockIOResult {
        self.check_access(index, buf.len())?;
        buf.copy_from_slice(&self.buffer[self.range(index)]);
        Ok(())
    }

    #[inline(always)]
    fn write_block(&mut self, index: u32, data: &[u8]) -> BlockIOResult {
        self.check_access(index, data.len())?;
        let range = self.range(index);
        self.buffer[range].copy_from_slice(data);
        Ok(())
    }

    #[inline]
    fn flush(&mut self) -> BlockIOResult {
        Ok(())
    }
}

#[cfg(all(test, feature = "std"))]
mod test {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn test_rw() {
        let mut io = MemBlockIO::new(16, 4);
        let block = [7u8; 16];
        io.write_block(2, &block).unwrap();

        let mut output = [0u8; 16];
        io.read_block(2, &mut output).unwrap();
        assert_eq!(output, block);
        assert_eq!(&io.as_bytes()[32..48], &block);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut io = MemBlockIO::new(16, 4);
        let mut buf = [0u8; 16];
        assert_eq!(io.read_block(4, &mut buf), Err(BlockIOError::OutOfBounds));
        assert_eq!(io.write_block(9, &buf), Err(BlockIOError::OutOfBounds));
    }

    #[test]
    fn test_partial_block_rejected() {
        let mut io = MemBlockIO::new(16, 4);
        let buf = [0u8; 8];
        assert!(matches!(
            io.write_block(0, &buf),
            Err(BlockIOError::Invalid(_))
        ));
    }

    #[test]
    fn test_from_image() {
        assert!(MemBlockIO::from_image(vec![0u8; 33], 16).is_err());
        let io = MemBlockIO::from_image(vec![0u8; 64], 16).unwrap();
        assert_eq!(io.block_count(), 4);
        assert_eq!(io.size_bytes(), 64);
    }

    #[test]
    fn test_zero_fill() {
        let mut io = MemBlockIO::new(8, 4);
        io.write_block(3, &[0xFF; 8]).unwrap();
        assert_eq!(io.read_block_vec(3).unwrap(), vec![0xFF; 8]);

        io.zero_fill(0, 4).unwrap();
        assert!(io.as_bytes().iter().all(|&b| b == 0));
        assert_eq!(io.zero_fill(3, 2), Err(BlockIOError::OutOfBounds));
    }
}
