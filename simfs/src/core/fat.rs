// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use crate::core::{errors::*, meta::*};
use crate::ensure;

/// Decoded value of one table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatEntry {
    Free,
    Eof,
    Next(u32),
    /// Negative marker other than EOF, or a link past the volume.
    Invalid(i16),
}

/// In-memory copy of the allocation table.
///
/// One signed 16-bit little-endian entry per block, persisted as a whole in
/// [`FAT_BLOCK`]. Entries past `block_count` are never handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fat {
    geometry: Geometry,
    entries: Vec<i16>,
}

impl Fat {
    /// Fresh table: everything free except the root and FAT blocks.
    pub fn new(geometry: Geometry) -> Self {
        let mut entries = vec![FAT_FREE; geometry.fat_entries()];
        entries[ROOT_BLOCK as usize] = FAT_EOF;
        entries[FAT_BLOCK as usize] = FAT_EOF;
        Self { geometry, entries }
    }

    pub fn decode(block: &[u8], geometry: Geometry) -> FsResult<Self> {
        ensure!(
            block.len() == geometry.block_size,
            FsError::Corrupted("FAT block has the wrong length")
        );
        let entries = block
            .chunks_exact(FAT_ENTRY_SIZE)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        Ok(Self { geometry, entries })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.entries.iter().flat_map(|e| e.to_le_bytes()).collect()
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Reserved entries carry the EOF marker on a formatted volume.
    pub fn is_formatted(&self) -> bool {
        self.entries[ROOT_BLOCK as usize] == FAT_EOF && self.entries[FAT_BLOCK as usize] == FAT_EOF
    }

    pub fn get(&self, block: u32) -> FatEntry {
        match self.entries[block as usize] {
            FAT_FREE => FatEntry::Free,
            FAT_EOF => FatEntry::Eof,
            next if next > 0 && (next as u32) < self.geometry.block_count => {
                FatEntry::Next(next as u32)
            }
            other => FatEntry::Invalid(other),
        }
    }

    #[inline]
    fn set_next(&mut self, block: u32, next: u32) {
        self.entries[block as usize] = next as i16;
    }

    #[inline]
    fn set_eof(&mut self, block: u32) {
        self.entries[block as usize] = FAT_EOF;
    }

    #[inline]
    fn set_free(&mut self, block: u32) {
        self.entries[block as usize] = FAT_FREE;
    }

    /// First free block at or after `start`, never a reserved one.
    pub fn scan_free(&self, start: u32) -> Option<u32> {
        (start.max(FIRST_DATA_BLOCK)..self.geometry.block_count)
            .find(|&b| self.entries[b as usize] == FAT_FREE)
    }

    /// Picks `count` free blocks in ascending order without touching the table.
    fn pick_free(&self, count: usize) -> FsAllocatorResult<Vec<u32>> {
        let picked: Vec<u32> = (FIRST_DATA_BLOCK..self.geometry.block_count)
            .filter(|&b| self.entries[b as usize] == FAT_FREE)
            .take(count)
            .collect();
        if picked.len() < count {
            return Err(FsAllocatorError::OutOfBlocks);
        }
        Ok(picked)
    }

    fn link(&mut self, blocks: &[u32]) {
        for pair in blocks.windows(2) {
            self.set_next(pair[0], pair[1]);
        }
        if let Some(&last) = blocks.last() {
            self.set_eof(last);
        }
    }

    /// Allocates the chain for `byte_length` bytes and returns its head.
    ///
    /// The table is left untouched when there are not enough free blocks.
    pub fn allocate_chain(&mut self, byte_length: usize) -> FsAllocatorResult<u32> {
        let blocks = self.pick_free(self.geometry.blocks_for(byte_length))?;
        self.link(&blocks);
        Ok(blocks[0])
    }

    /// Links `count` new blocks after `last`, the current tail of a chain.
    pub fn extend_chain(&mut self, last: u32, count: usize) -> FsAllocatorResult<Vec<u32>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let blocks = self.pick_free(count)?;
        self.link(&blocks);
        self.set_next(last, blocks[0]);
        Ok(blocks)
    }

    /// Releases every block of the chain starting at `first`.
    ///
    /// Stops at EOF, at any invalid link, and after `block_count` steps.
    /// Reserved blocks are never released.
    pub fn free_chain(&mut self, first: u32) {
        let mut current = first;
        for _ in 0..self.geometry.block_count {
            if !self.geometry.is_valid_unit(current) {
                return;
            }
            let entry = self.get(current);
            self.set_free(current);
            match entry {
                FatEntry::Next(next) => current = next,
                _ => return,
            }
        }
    }

    /// Blocks of the chain starting at `first`, in order.
    pub fn chain(&self, first: u32) -> FsResult<Vec<u32>> {
        let mut visited = vec![false; self.geometry.block_count as usize];
        let mut blocks = Vec::new();
        let mut current = first;
        loop {
            ensure!(
                self.geometry.is_valid_unit(current),
                FsError::Corrupted("chain points outside the data area")
            );
            ensure!(
                !visited[current as usize],
                FsError::Corrupted("chain loops back on itself")
            );
            visited[current as usize] = true;
            blocks.push(current);

            match self.get(current) {
                FatEntry::Eof => return Ok(blocks),
                FatEntry::Next(next) => current = next,
                FatEntry::Free => return Err(FsError::Corrupted("chain runs into a free block")),
                FatEntry::Invalid(_) => {
                    return Err(FsError::Corrupted("chain holds an invalid link"));
                }
            }
        }
    }

    pub fn free_blocks(&self) -> u32 {
        (FIRST_DATA_BLOCK..self.geometry.block_count)
            .filter(|&b| self.entries[b as usize] == FAT_FREE)
            .count() as u32
    }

    /// Allocated data blocks (reserved blocks excluded).
    pub fn used_blocks(&self) -> u32 {
        self.geometry.block_count - FIRST_DATA_BLOCK - self.free_blocks()
    }
}
