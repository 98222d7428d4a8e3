// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{string::String, vec::Vec};

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::core::{attr::*, errors::*, meta::*};
use crate::ensure;

/// Name stored in slot 0 of every directory block.
pub const PARENT_NAME: &str = "..";
pub const PARENT_SLOT: usize = 0;

/// On-disk directory entry, 64 bytes.
///
/// An all-zero `file_name` marks a free slot.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct RawDirEntry {
    pub file_name: [u8; NAME_FIELD_LEN],
    pub size: u32,
    pub first_blk: u16,
    pub kind: u8,
    pub access_rights: u8,
}

const _: () = assert!(core::mem::size_of::<RawDirEntry>() == DIR_ENTRY_SIZE);

impl RawDirEntry {
    #[inline]
    pub fn is_free(&self) -> bool {
        self.file_name[0] == 0
    }
}

/// Decoded view of a live directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub size: u32,
    pub first_block: u32,
    pub kind: EntryKind,
    pub rights: AccessRights,
}

impl DirEntry {
    pub fn file(name: &str, first_block: u32, size: u32) -> Self {
        Self {
            name: name.into(),
            size,
            first_block,
            kind: EntryKind::File,
            rights: AccessRights::FILE_DEFAULT,
        }
    }

    pub fn directory(name: &str, block: u32) -> Self {
        Self {
            name: name.into(),
            size: 0,
            first_block: block,
            kind: EntryKind::Directory,
            rights: AccessRights::DIR_DEFAULT,
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    fn decode(raw: &RawDirEntry) -> FsResult<Option<Self>> {
        if raw.is_free() {
            return Ok(None);
        }
        let len = raw
            .file_name
            .iter()
            .position(|&b| b == 0)
            .ok_or(FsError::Corrupted("directory entry name is not terminated"))?;
        let name = core::str::from_utf8(&raw.file_name[..len])
            .map_err(|_| FsError::Corrupted("directory entry name is not UTF-8"))?;
        Ok(Some(Self {
            name: name.into(),
            size: u32::from_le(raw.size),
            first_block: u16::from_le(raw.first_blk) as u32,
            kind: EntryKind::try_from(raw.kind)?,
            rights: AccessRights::from_bits_truncate(raw.access_rights),
        }))
    }

    fn encode(&self) -> RawDirEntry {
        let mut file_name = [0u8; NAME_FIELD_LEN];
        let bytes = self.name.as_bytes();
        let len = bytes.len().min(MAX_NAME_LEN);
        file_name[..len].copy_from_slice(&bytes[..len]);
        RawDirEntry {
            file_name,
            size: self.size.to_le(),
            first_blk: (self.first_block as u16).to_le(),
            kind: self.kind as u8,
            access_rights: self.rights.bits(),
        }
    }
}

/// Checks a single path component before it is stored.
pub fn validate_name(name: &str) -> FsResult {
    ensure!(!name.is_empty(), FsError::InvalidName);
    ensure!(name.len() <= MAX_NAME_LEN, FsError::NameTooLong);
    ensure!(
        !name.contains(['/', '\0']) && name != "." && name != PARENT_NAME,
        FsError::InvalidName
    );
    Ok(())
}

/// One directory block decoded into slots.
///
/// Slot 0 is the `..` link, every other slot is either free or a user entry.
/// Blocks are decoded, mutated, then re-encoded as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirBlock {
    slots: Vec<Option<DirEntry>>,
}

impl DirBlock {
    /// Empty directory whose `..` points to `parent`.
    pub fn new_directory(parent: u32, geometry: &Geometry) -> Self {
        let mut slots = vec![None; geometry.dir_slots()];
        slots[PARENT_SLOT] = Some(DirEntry::directory(PARENT_NAME, parent));
        Self { slots }
    }

    pub fn decode(bytes: &[u8]) -> FsResult<Self> {
        ensure!(
            !bytes.is_empty() && bytes.len().is_multiple_of(DIR_ENTRY_SIZE),
            FsError::Corrupted("directory block has a partial entry")
        );
        let slots = bytes
            .chunks_exact(DIR_ENTRY_SIZE)
            .map(|chunk| {
                let raw = RawDirEntry::read_from_bytes(chunk)
                    .map_err(|_| FsError::Corrupted("unreadable directory entry"))?;
                DirEntry::decode(&raw)
            })
            .collect::<FsResult<Vec<_>>>()?;
        Ok(Self { slots })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.slots.len() * DIR_ENTRY_SIZE];
        for (chunk, slot) in out.chunks_exact_mut(DIR_ENTRY_SIZE).zip(&self.slots) {
            if let Some(entry) = slot {
                chunk.copy_from_slice(entry.encode().as_bytes());
            }
        }
        out
    }

    /// Block pointed to by the `..` entry.
    pub fn parent(&self) -> FsResult<u32> {
        match &self.slots[PARENT_SLOT] {
            Some(e) if e.name == PARENT_NAME && e.is_dir() => Ok(e.first_block),
            _ => Err(FsError::Corrupted("directory has no parent link")),
        }
    }

    pub fn set_parent(&mut self, parent: u32) {
        self.slots[PARENT_SLOT] = Some(DirEntry::directory(PARENT_NAME, parent));
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&DirEntry> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Live user entries with their slot index.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &DirEntry)> {
        self.slots
            .iter()
            .enumerate()
            .skip(PARENT_SLOT + 1)
            .filter_map(|(i, slot)| slot.as_ref().map(|e| (i, e)))
    }

    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.entries().find(|(_, e)| e.name == name).map(|(i, _)| i)
    }

    pub fn find_by_block(&self, block: u32) -> Option<usize> {
        self.entries()
            .find(|(_, e)| e.first_block == block)
            .map(|(i, _)| i)
    }

    pub fn find_free_slot(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .skip(PARENT_SLOT + 1)
            .find(|(_, slot)| slot.is_none())
            .map(|(i, _)| i)
    }

    /// Stores `entry` in the first free slot.
    pub fn insert(&mut self, entry: DirEntry) -> FsResult<usize> {
        let slot = self.find_free_slot().ok_or(FsError::DirectoryFull)?;
        self.slots[slot] = Some(entry);
        Ok(slot)
    }

    pub fn set(&mut self, slot: usize, entry: DirEntry) {
        self.slots[slot] = Some(entry);
    }

    pub fn clear(&mut self, slot: usize) {
        self.slots[slot] = None;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries().count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }
}
