// SPDX-License-Identifier: MIT

use std::fs::{File, OpenOptions};
use std::io::{Error, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{BlockIO, BlockIOError, BlockIOResult};

/// `BlockIO` over any seekable byte stream (file, cursor, device node).
#[derive(Debug)]
pub struct StdBlockIO<T: Read + Write + Seek> {
    io: T,
    block_size: usize,
    block_count: u32,
}

/// A simulated disk backed by a flat file.
pub type FileBlockIO = StdBlockIO<File>;

impl<T: Read + Write + Seek> StdBlockIO<T> {
    #[inline]
    pub fn new(io: T, block_size: usize, block_count: u32) -> Self {
        Self {
            io,
            block_size,
            block_count,
        }
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.io
    }

    #[inline]
    fn offset(&self, index: u32) -> u64 {
        index as u64 * self.block_size as u64
    }
}

impl StdBlockIO<File> {
    /// Opens the disk file at `path`, creating it on first use.
    ///
    /// A new file is pre-sized to the whole volume. An existing file must be
    /// at least `block_size * block_count` bytes long. The flag is `true`
    /// when the file was created by this call.
    pub fn open_or_create<P: AsRef<Path>>(
        path: P,
        block_size: usize,
        block_count: u32,
    ) -> BlockIOResult<(Self, bool)> {
        let path = path.as_ref();
        let expected = block_size as u64 * block_count as u64;

        let existed = path.exists();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if existed {
            if file.metadata()?.len() < expected {
                return Err(BlockIOError::Invalid("disk file is smaller than the volume"));
            }
        } else {
            file.set_len(expected)?;
        }

        Ok((Self::new(file, block_size, block_count), !existed))
    }

    /// Whether a disk file already exists at `path`.
    #[inline]
    pub fn exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists()
    }
}

impl<T: Read + Write + Seek> BlockIO for StdBlockIO<T> {
    #[inline]
    fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn read_block(&mut self, index: u32, buf: &mut [u8]) -> BlockIOResult {
        self.check_access(index, buf.len())?;
        let offset = self.offset(index);
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&mut self, index: u32, data: &[u8]) -> BlockIOResult {
        self.check_access(index, data.len())?;
        let offset = self.offset(index);
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> BlockIOResult {
        self.io.flush()?;
        Ok(())
    }
}

impl From<Error> for BlockIOError {
    #[cold]
    #[inline(never)]
    fn from(e: Error) -> Self {
        // Leak the string to produce a 'static str. Acceptable for error mapping.
        let leaked_str: &'static str = Box::leak(e.to_string().into_boxed_str());
        BlockIOError::Other(leaked_str)
    }
}
