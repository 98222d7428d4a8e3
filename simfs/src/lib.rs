#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
extern crate alloc;

// Core Modules
pub mod core;
pub mod fs;

// Reusable types and traits
pub use crate::core::traits::*;

// Utilities
pub use crate::core::resolver::{Component, split};

/// Everything needed to format, mount and drive a simulated volume.
///
/// See [`fs::SimFs`] for the operations and [`core::checker::SimFsChecker`]
/// for consistency checks.
pub mod prelude {
    pub use super::core::attr::{AccessRights, EntryKind};
    pub use super::core::checker::{
        CheckOptions, Finding, ReportDisplayOpts, Severity, SimFsChecker, VerifyPhases,
        VerifyReport, WalkerStats,
    };
    pub use super::core::dir::{DirBlock, DirEntry};
    pub use super::core::errors::*;
    pub use super::core::fat::{Fat, FatEntry};
    pub use super::core::meta::*;
    pub use super::core::traits::*;
    pub use super::fs::{SimFs, VolumeUsage};
    pub use simio::prelude::*;
}
