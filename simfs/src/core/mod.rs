// === Sub-modules ===
pub mod attr;
pub mod checker;
pub mod dir;
pub mod errors;
pub mod fat;
mod macros;
pub mod meta;
pub mod resolver;
pub mod staging;

// === Core Traits ===
pub mod traits {
    pub use super::checker::FsChecker;
    pub use super::meta::FsMeta;
}

// === Error types ===
pub use errors::*;
