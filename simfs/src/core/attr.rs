// SPDX-License-Identifier: MIT

use core::fmt;

use crate::core::errors::*;

bitflags::bitflags! {
    /// POSIX-like permission bits stored in `access_rights`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessRights: u8 {
        const READ    = 0x04;
        const WRITE   = 0x02;
        const EXECUTE = 0x01;
    }
}

impl AccessRights {
    pub const FILE_DEFAULT: Self = Self::READ.union(Self::WRITE);
    pub const DIR_DEFAULT: Self = Self::all();

    /// Parses a single octal digit (`0` to `7`).
    pub fn parse_octal(text: &str) -> FsResult<Self> {
        let text = text.trim();
        if text.is_empty() || !text.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
            return Err(FsError::InvalidAccessMode);
        }
        let value = u8::from_str_radix(text, 8).map_err(|_| FsError::InvalidAccessMode)?;
        Self::from_bits(value).ok_or(FsError::InvalidAccessMode)
    }

    #[inline]
    pub fn can_read(&self) -> bool {
        self.contains(Self::READ)
    }

    #[inline]
    pub fn can_write(&self) -> bool {
        self.contains(Self::WRITE)
    }
}

impl fmt::Display for AccessRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |bit: Self, c: char| if self.contains(bit) { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(Self::READ, 'r'),
            flag(Self::WRITE, 'w'),
            flag(Self::EXECUTE, 'x')
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryKind {
    File = 0,
    Directory = 1,
}

impl EntryKind {
    #[inline]
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "dir",
        }
    }
}

impl TryFrom<u8> for EntryKind {
    type Error = FsError;

    fn try_from(value: u8) -> FsResult<Self> {
        match value {
            0 => Ok(EntryKind::File),
            1 => Ok(EntryKind::Directory),
            _ => Err(FsError::Corrupted("unknown directory entry kind")),
        }
    }
}
