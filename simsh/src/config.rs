// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use simfs::prelude::*;

pub const DEFAULT_DISK_PATH: &str = "diskfile.bin";
pub const DEFAULT_PROMPT: &str = "filesystem> ";

/// Settings read from `simsh.toml`. Missing keys fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub disk: DiskConfig,
    pub shell: ShellConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiskConfig {
    pub path: PathBuf,
    pub block_size: usize,
    pub block_count: u32,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DISK_PATH),
            block_size: DEFAULT_BLOCK_SIZE,
            block_count: DEFAULT_BLOCK_COUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    pub prompt: String,
    pub color: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            color: true,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Geometry of the configured disk, rejected when it cannot hold a volume.
    pub fn geometry(&self) -> anyhow::Result<Geometry> {
        Geometry::new(self.disk.block_size, self.disk.block_count)
            .map_err(|e| anyhow::anyhow!("invalid disk geometry: {e}"))
    }

    pub fn print_summary(&self) {
        crate::log_verbose!(
            "Disk: {} ({} blocks of {} bytes)",
            self.disk.path.display(),
            self.disk.block_count,
            self.disk.block_size
        );
        crate::log_verbose!("Prompt: {:?}, color: {}", self.shell.prompt, self.shell.color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.disk.path, PathBuf::from("diskfile.bin"));
        assert_eq!(config.disk.block_size, 4096);
        assert_eq!(config.disk.block_count, 2048);
        assert_eq!(config.shell.prompt, "filesystem> ");
        assert!(config.geometry().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let config = Config::parse(
            r#"
            [disk]
            block_count = 64

            [shell]
            prompt = "> "
            color = false
            "#,
        )
        .unwrap();
        assert_eq!(config.disk.block_count, 64);
        assert_eq!(config.disk.block_size, 4096);
        assert_eq!(config.shell.prompt, "> ");
        assert!(!config.shell.color);
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_geometry() {
        assert!(Config::parse("[disk]\nsectors = 3\n").is_err());

        let config = Config::parse("[disk]\nblock_size = 100\n").unwrap();
        assert!(config.geometry().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simsh.toml");
        fs::write(&path, "[disk]\npath = \"vol.bin\"\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.disk.path, PathBuf::from("vol.bin"));
        assert!(Config::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
