// simsh/src/main.rs

mod config;
mod shell;
mod utils;

use anyhow::Context;
use clap::Parser;
use simfs::prelude::*;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use crate::config::Config;
use crate::shell::Shell;
use crate::utils::{LogLevel, set_log_level};

#[derive(Parser)]
#[command(name = "simsh", version, about = "Shell over a simulated FAT volume", long_about = None)]
struct Cli {
    /// Disk file holding the volume
    #[arg(short, long)]
    disk: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Block size in bytes of the volume
    #[arg(long)]
    block_size: Option<usize>,

    /// Number of blocks of the volume
    #[arg(long)]
    block_count: Option<u32>,

    /// Log every command
    #[arg(short, long)]
    verbose: bool,

    /// Silence startup messages
    #[arg(short, long)]
    quiet: bool,

    /// Read commands from a file instead of stdin
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Erase the disk and format a new volume before starting
    #[arg(long)]
    format: bool,
}

impl Cli {
    /// Flags win over the file, the file wins over defaults.
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("cannot load config {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(disk) = &self.disk {
            config.disk.path = disk.clone();
        }
        if let Some(block_size) = self.block_size {
            config.disk.block_size = block_size;
        }
        if let Some(block_count) = self.block_count {
            config.disk.block_count = block_count;
        }
        Ok(config)
    }
}

/// Opens the configured disk file.
///
/// A disk file created by this call is formatted right away. An existing
/// one is only formatted when `format` is set, otherwise it must already
/// hold a volume of the configured geometry.
fn open_volume(config: &Config, format: bool) -> anyhow::Result<SimFs<FileBlockIO>> {
    let geometry = config.geometry()?;
    let path = &config.disk.path;
    let (io, created) =
        FileBlockIO::open_or_create(path, geometry.block_size, geometry.block_count)
            .with_context(|| format!("cannot open disk {}", path.display()))?;

    if created {
        let fs = SimFs::format_new(io)?;
        log_info!(
            "Created {}, formatted {} blocks of {} bytes",
            path.display(),
            geometry.block_count,
            geometry.block_size
        );
        return Ok(fs);
    }
    if format {
        let fs = SimFs::format_new(io)?;
        log_normal!("Erased {} and formatted a new volume", path.display());
        return Ok(fs);
    }

    match SimFs::mount(io) {
        Ok(fs) => {
            log_verbose!("Mounted {}", path.display());
            Ok(fs)
        }
        Err(FsError::NotFormatted) => anyhow::bail!(
            "{} holds no volume of {} blocks of {} bytes; check --block-size and \
             --block-count, or run with --format to erase it",
            path.display(),
            geometry.block_count,
            geometry.block_size
        ),
        Err(e) => Err(e.into()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    set_log_level(LogLevel::from_flags(cli.verbose, cli.quiet));

    let config = cli.load_config()?;
    config.print_summary();
    let fs = open_volume(&config, cli.format)?;

    if !config.shell.color {
        colored::control::set_override(false);
    }

    log_info!("Starting shell...");
    let stdout = io::stdout();
    match &cli.script {
        Some(script) => {
            let file = File::open(script)
                .with_context(|| format!("cannot open script {}", script.display()))?;
            Shell::new(fs, BufReader::new(file), stdout.lock(), &config.shell)
                .with_echo(true)
                .run()?;
        }
        None => {
            let stdin = io::stdin();
            Shell::new(fs, stdin.lock(), stdout.lock(), &config.shell).run()?;
        }
    }
    log_info!("Exiting shell...");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_at(path: PathBuf) -> Config {
        let mut config = Config::default();
        config.disk.path = path;
        config.disk.block_size = 512;
        config.disk.block_count = 32;
        config
    }

    #[test]
    fn test_cli_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simsh.toml");
        std::fs::write(&path, "[disk]\nblock_size = 1024\nblock_count = 128\n").unwrap();

        let cli = Cli::parse_from([
            "simsh",
            "--config",
            path.to_str().unwrap(),
            "--block-count",
            "64",
            "-d",
            "vol.bin",
        ]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.disk.block_size, 1024);
        assert_eq!(config.disk.block_count, 64);
        assert_eq!(config.disk.path, PathBuf::from("vol.bin"));
    }

    #[test]
    fn test_open_volume_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_at(dir.path().join("disk.bin"));

        {
            let mut fs = open_volume(&config, false).unwrap();
            fs.mkdir("d1").unwrap();
            fs.create("d1/f", b"kept\n").unwrap();
        }
        let mut fs = open_volume(&config, false).unwrap();
        assert_eq!(fs.cat("/d1/f").unwrap(), b"kept\n");

        drop(fs);
        let mut fs = open_volume(&config, true).unwrap();
        assert!(fs.ls().unwrap().is_empty());
    }

    #[test]
    fn test_open_volume_never_formats_existing_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_at(dir.path().join("disk.bin"));
        config.disk.block_size = 4096;
        config.disk.block_count = 64;
        {
            let mut fs = open_volume(&config, false).unwrap();
            fs.create("keep", b"precious\n").unwrap();
        }

        let mut other = config.clone();
        other.disk.block_size = 512;
        other.disk.block_count = 32;
        let err = open_volume(&other, false).unwrap_err();
        assert!(err.to_string().contains("--format"));

        let mut fs = open_volume(&config, false).unwrap();
        assert_eq!(fs.cat("keep").unwrap(), b"precious\n");
    }

    #[test]
    fn test_open_volume_rejects_bad_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_at(dir.path().join("disk.bin"));
        config.disk.block_size = 100;
        assert!(open_volume(&config, false).is_err());
        assert!(!config.disk.path.exists());
    }
}
