// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{collections::BTreeMap, vec::Vec};
#[cfg(feature = "std")]
use std::collections::BTreeMap;

use simio::{BlockIO, BlockIOExt};

use crate::core::{dir::*, errors::*, fat::Fat, meta::*, resolver::DirSource};
use crate::ensure;

/// Buffered view of the volume for the duration of one operation.
///
/// Holds a private copy of the FAT and every block written so far. Reads see
/// the pending writes first, so an operation observes its own changes.
/// Nothing reaches the device before [`Staging::commit`]; dropping the
/// staging discards the whole operation.
pub struct Staging<'a, IO: BlockIO + ?Sized> {
    io: &'a mut IO,
    base: &'a Fat,
    fat: Fat,
    data: BTreeMap<u32, Vec<u8>>,
    dirs: BTreeMap<u32, DirBlock>,
}

impl<'a, IO: BlockIO + ?Sized> Staging<'a, IO> {
    pub fn new(io: &'a mut IO, fat: &'a Fat) -> Self {
        Self {
            io,
            base: fat,
            fat: fat.clone(),
            data: BTreeMap::new(),
            dirs: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn geometry(&self) -> Geometry {
        *self.fat.geometry()
    }

    #[inline]
    pub fn fat(&self) -> &Fat {
        &self.fat
    }

    #[inline]
    pub fn fat_mut(&mut self) -> &mut Fat {
        &mut self.fat
    }

    pub fn read_block(&mut self, block: u32) -> FsResult<Vec<u8>> {
        if let Some(buf) = self.data.get(&block) {
            return Ok(buf.clone());
        }
        if let Some(dir) = self.dirs.get(&block) {
            return Ok(dir.encode());
        }
        Ok(self.io.read_block_vec(block)?)
    }

    pub fn write_block(&mut self, block: u32, buf: Vec<u8>) -> FsResult {
        ensure!(
            buf.len() == self.geometry().block_size,
            FsError::Io(BlockIOError::Invalid("buffer length differs from block size"))
        );
        self.dirs.remove(&block);
        self.data.insert(block, buf);
        Ok(())
    }

    pub fn write_dir(&mut self, block: u32, dir: DirBlock) {
        self.data.remove(&block);
        self.dirs.insert(block, dir);
    }

    /// Exactly `size` bytes of the chain starting at `first`.
    pub fn read_chain(&mut self, first: u32, size: u32) -> FsResult<Vec<u8>> {
        let size = size as usize;
        let chain = self.fat.chain(first)?;
        ensure!(
            chain.len() * self.geometry().block_size >= size,
            FsError::Corrupted("file size exceeds its chain")
        );
        let mut out = Vec::with_capacity(size);
        for block in chain {
            if out.len() >= size {
                break;
            }
            out.extend_from_slice(&self.read_block(block)?);
        }
        out.truncate(size);
        Ok(out)
    }

    /// Writes `bytes` over the chain starting at `first`, zero-padding the tail.
    pub fn write_chain(&mut self, first: u32, bytes: &[u8]) -> FsResult {
        let block_size = self.geometry().block_size;
        let chain = self.fat.chain(first)?;
        ensure!(
            chain.len() * block_size >= bytes.len(),
            FsError::Corrupted("chain is too short for the data")
        );
        for (i, block) in chain.into_iter().enumerate() {
            let mut buf = vec![0u8; block_size];
            let start = (i * block_size).min(bytes.len());
            let end = (start + block_size).min(bytes.len());
            buf[..end - start].copy_from_slice(&bytes[start..end]);
            self.write_block(block, buf)?;
        }
        Ok(())
    }

    /// Allocates a chain sized for `bytes`, fills it, and returns its head.
    pub fn store(&mut self, bytes: &[u8]) -> FsResult<u32> {
        let first = self.fat.allocate_chain(bytes.len())?;
        self.write_chain(first, bytes)?;
        Ok(first)
    }

    /// Writes `extra` right after the first `size` bytes of the chain,
    /// growing the chain when the last block runs out. Returns the new size.
    pub fn append_chain(&mut self, first: u32, size: u32, extra: &[u8]) -> FsResult<u32> {
        let block_size = self.geometry().block_size;
        let total = size as usize + extra.len();
        let total_u32 = u32::try_from(total).map_err(|_| FsError::NoFreeBlocks)?;

        let mut chain = self.fat.chain(first)?;
        let needed = self.geometry().blocks_for(total);
        if needed > chain.len() {
            let last = chain[chain.len() - 1];
            let added = self.fat.extend_chain(last, needed - chain.len())?;
            chain.extend(added);
        }

        let mut offset = size as usize;
        let mut rest = extra;
        while !rest.is_empty() {
            let block = chain[offset / block_size];
            let within = offset % block_size;
            let mut buf = if within == 0 {
                vec![0u8; block_size]
            } else {
                self.read_block(block)?
            };
            let n = (block_size - within).min(rest.len());
            buf[within..within + n].copy_from_slice(&rest[..n]);
            self.write_block(block, buf)?;
            offset += n;
            rest = &rest[n..];
        }
        Ok(total_u32)
    }

    /// Pushes every pending write to the device.
    ///
    /// Data blocks go first, then directory blocks, then the FAT when it
    /// changed. Returns the new FAT if it has to replace the cached one.
    pub fn commit(self) -> FsResult<Option<Fat>> {
        let fat_changed = self.fat != *self.base;
        if self.data.is_empty() && self.dirs.is_empty() && !fat_changed {
            return Ok(None);
        }

        for (block, buf) in &self.data {
            self.io.write_block(*block, buf)?;
        }
        for (block, dir) in &self.dirs {
            self.io.write_block(*block, &dir.encode())?;
        }
        if fat_changed {
            self.io.write_block(FAT_BLOCK, &self.fat.encode())?;
        }
        self.io.flush()?;

        Ok(fat_changed.then_some(self.fat))
    }
}

impl<IO: BlockIO + ?Sized> DirSource for Staging<'_, IO> {
    fn read_dir(&mut self, block: u32) -> FsResult<DirBlock> {
        if let Some(dir) = self.dirs.get(&block) {
            return Ok(dir.clone());
        }
        let bytes = self.read_block(block)?;
        DirBlock::decode(&bytes)
    }
}
