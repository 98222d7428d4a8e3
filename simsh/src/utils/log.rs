// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicU8, Ordering};

use colored::{ColoredString, Colorize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LogLevel {
    Quiet = 0,
    Normal = 1,
    Verbose = 2,
}

impl LogLevel {
    /// `-q` wins over `-v`.
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (_, true) => LogLevel::Quiet,
            (true, false) => LogLevel::Verbose,
            _ => LogLevel::Normal,
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Normal as u8);

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn log_level() -> LogLevel {
    match LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Quiet,
        2 => LogLevel::Verbose,
        _ => LogLevel::Normal,
    }
}

pub fn prefix() -> ColoredString {
    "[simsh]".cyan().bold()
}

#[macro_export]
macro_rules! log_normal {
    ($($arg:tt)*) => {
        println!("{} {}", $crate::utils::prefix(), format_args!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if $crate::utils::log_level() != $crate::utils::LogLevel::Quiet {
            println!("{} {}", $crate::utils::prefix(), format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_verbose {
    ($($arg:tt)*) => {
        if $crate::utils::log_level() == $crate::utils::LogLevel::Verbose {
            println!("{} {}", $crate::utils::prefix(), format_args!($($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_flags() {
        assert_eq!(LogLevel::from_flags(false, false), LogLevel::Normal);
        assert_eq!(LogLevel::from_flags(true, false), LogLevel::Verbose);
        assert_eq!(LogLevel::from_flags(true, true), LogLevel::Quiet);
        assert_eq!(LogLevel::from_flags(false, true), LogLevel::Quiet);
    }

    #[test]
    fn test_level_store() {
        set_log_level(LogLevel::Verbose);
        assert_eq!(log_level(), LogLevel::Verbose);
        set_log_level(LogLevel::Normal);
        assert_eq!(log_level(), LogLevel::Normal);
    }
}
