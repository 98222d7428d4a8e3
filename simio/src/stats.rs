// SPDX-License-Identifier: MIT

use crate::{BlockIO, BlockIOResult};

/// Simple counters, no_std friendly.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct IoStats {
    pub reads: u64,
    pub writes: u64,
    pub flushes: u64,

    // Highest block index touched, handy to see how far allocation reached
    pub max_block_read: Option<u32>,
    pub max_block_written: Option<u32>,
}

impl IoStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = IoStats::default();
    }
}

/// Transparent instrumentation wrapper.
pub struct IOCounter<IO: BlockIO> {
    inner: IO,
    pub stats: IoStats,
}

impl<IO: BlockIO> IOCounter<IO> {
    #[inline]
    pub fn new(inner: IO) -> Self {
        Self {
            inner,
            stats: IoStats::default(),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> IoStats {
        self.stats
    }

    #[inline]
    pub fn inner(&self) -> &IO {
        &self.inner
    }

    #[inline]
    pub fn into_inner(self) -> IO {
        self.inner
    }
}

impl<IO: BlockIO> BlockIO for IOCounter<IO> {
    #[inline]
    fn block_size(&self) -> usize {
        self.inner.block_size()
    }

    #[inline]
    fn block_count(&self) -> u32 {
        self.inner.block_count()
    }

    #[inline]
    fn read_block(&mut self, index: u32, buf: &mut [u8]) -> BlockIOResult {
        self.stats.reads += 1;
        self.stats.max_block_read = self.stats.max_block_read.max(Some(index));
        self.inner.read_block(index, buf)
    }

    #[inline]
    fn write_block(&mut self, index: u32, data: &[u8]) -> BlockIOResult {
        self.stats.writes += 1;
        self.stats.max_block_written = self.stats.max_block_written.max(Some(index));
        self.inner.write_block(index, data)
    }

    #[inline]
    fn flush(&mut self) -> BlockIOResult {
        self.stats.flushes += 1;
        self.inner.flush()
    }
}
