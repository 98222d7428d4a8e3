// SPDX-License-Identifier: MIT

use core::fmt;

pub use simio::errors::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsAllocatorError {
    OutOfBlocks,
}

impl FsAllocatorError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsAllocatorError::OutOfBlocks => "Out of blocks",
        }
    }
}

impl fmt::Display for FsAllocatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())
    }
}

/// Every failure a file system operation can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    PathNotFound,
    NotADirectory,
    IsADirectory,
    AlreadyExists,
    NameTooLong,
    InvalidName,
    InvalidPath,
    DirectoryFull,
    NoFreeBlocks,
    DirectoryNotEmpty,
    PermissionDenied,
    InvalidAccessMode,
    InvalidMove,
    NotFormatted,
    Geometry(&'static str),
    Corrupted(&'static str),
    Io(BlockIOError),
}

impl FsError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsError::PathNotFound => "No such file or directory",
            FsError::NotADirectory => "Not a directory",
            FsError::IsADirectory => "Is a directory",
            FsError::AlreadyExists => "File exists",
            FsError::NameTooLong => "File name too long",
            FsError::InvalidName => "Invalid file name",
            FsError::InvalidPath => "Invalid path",
            FsError::DirectoryFull => "Directory is full",
            FsError::NoFreeBlocks => "No free blocks left on the volume",
            FsError::DirectoryNotEmpty => "Directory not empty",
            FsError::PermissionDenied => "Permission denied",
            FsError::InvalidAccessMode => "Invalid access mode",
            FsError::InvalidMove => "Cannot move a directory into itself",
            FsError::NotFormatted => "Volume is not formatted",
            FsError::Geometry(msg) => msg,
            FsError::Corrupted(msg) => msg,
            FsError::Io(_) => "IO error",
        }
    }

    pub fn source(&self) -> Option<BlockIOError> {
        match self {
            FsError::Io(e) => Some(*e),
            _ => None,
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        if let Some(src) = self.source() {
            write!(f, "\n  caused by: {}", src.msg())?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FsError {}

impl From<BlockIOError> for FsError {
    #[inline]
    fn from(e: BlockIOError) -> Self {
        FsError::Io(e)
    }
}

impl From<FsAllocatorError> for FsError {
    #[inline]
    fn from(e: FsAllocatorError) -> Self {
        match e {
            FsAllocatorError::OutOfBlocks => FsError::NoFreeBlocks,
        }
    }
}

pub type FsResult<T = ()> = Result<T, FsError>;
pub type FsAllocatorResult<T = ()> = Result<T, FsAllocatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_maps_to_no_free_blocks() {
        let err: FsError = FsAllocatorError::OutOfBlocks.into();
        assert_eq!(err, FsError::NoFreeBlocks);
    }

    #[test]
    fn test_io_display_has_cause() {
        let err: FsError = BlockIOError::OutOfBounds.into();
        let text = format!("{err}");
        assert!(text.starts_with("IO error"));
        assert!(text.contains("caused by"));
    }
}
