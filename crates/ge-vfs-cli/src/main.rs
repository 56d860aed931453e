//! gevfs: inspect a geEngineSDK mount stack.
//!
//! Usage:
//!   # Mount a data directory, then a patch archive on top of it
//!   gevfs --mount data --mount zip:patches/patch1.zip ls
//!
//!   # Same stack from a config file
//!   gevfs --config mounts.toml which textures/wall.png
//!   gevfs --config mounts.toml cat maps/level1.map > level1.map
//!
//! Sources from `--config` are mounted first, then each `--mount` in the
//! order given. Set `RUST_LOG=ge_vfs=debug` to see what gets mounted.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ge_vfs::{MountConfig, MountManager, SourceKind};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Inspect a virtual file system built from disk directories and zip archives.
#[derive(Parser, Debug)]
#[command(name = "gevfs")]
#[command(about = "Inspect a geEngineSDK mount stack")]
struct Args {
    /// TOML mount config, applied before any --mount
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source to mount: `zip:PATH`, `disk:PATH`, or a bare path (zip if it ends in .zip)
    #[arg(short, long = "mount", value_name = "SOURCE", value_parser = parse_mount)]
    mounts: Vec<MountArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List mounted files
    Ls {
        /// Only paths starting with this prefix, ignoring case
        prefix: Option<String>,

        /// Also show which kind of source serves each file
        #[arg(short, long)]
        long: bool,
    },
    /// Write a file's contents to stdout
    Cat { path: String },
    /// Show which source serves a path
    Which { path: String },
    /// Exit successfully if a path is mounted
    Exists { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MountArg {
    kind: SourceKind,
    path: PathBuf,
}

fn parse_mount(s: &str) -> Result<MountArg, String> {
    if s.is_empty() {
        return Err("mount source is empty".to_string());
    }

    let (kind, path) = match s.split_once(':') {
        Some(("zip", rest)) => (SourceKind::Zip, rest),
        Some(("disk", rest)) => (SourceKind::Disk, rest),
        _ => {
            let is_zip = std::path::Path::new(s)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
            let kind = if is_zip { SourceKind::Zip } else { SourceKind::Disk };
            (kind, s)
        }
    };

    if path.is_empty() {
        return Err(format!("no path after '{}:'", kind));
    }
    Ok(MountArg {
        kind,
        path: PathBuf::from(path),
    })
}

fn build_manager(args: &Args) -> Result<MountManager> {
    let manager = MountManager::new();

    if let Some(path) = &args.config {
        let config = MountConfig::load(path)
            .with_context(|| format!("failed to load mount config {}", path.display()))?;
        let report = config.apply(&manager)?;
        tracing::info!(
            mounted = report.mounted.len(),
            skipped = report.skipped.len(),
            files = report.files_indexed,
            "applied {}",
            path.display()
        );
    }

    let mut extra = MountConfig::new();
    for mount in &args.mounts {
        extra.push(mount.kind, &mount.path);
    }
    extra.apply(&manager)?;

    Ok(manager)
}

fn run(args: Args) -> Result<ExitCode> {
    let manager = build_manager(&args)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Ls { prefix, long } => {
            let prefix = prefix.map(|p| ge_vfs::path::lookup_key(&p));
            for path in manager.all_files() {
                let matches = prefix
                    .as_deref()
                    .is_none_or(|prefix| path.to_lowercase().starts_with(prefix));
                if !matches {
                    continue;
                }
                if long {
                    let kind = manager
                        .source_kind(&path)
                        .map(|k| k.to_string())
                        .unwrap_or_default();
                    writeln!(out, "{:<4}  {}", kind, path)?;
                } else {
                    writeln!(out, "{}", path)?;
                }
            }
        }
        Command::Cat { path } => {
            let Some(bytes) = manager.read(&path)? else {
                eprintln!("gevfs: {}: not mounted", path);
                return Ok(ExitCode::FAILURE);
            };
            out.write_all(&bytes)?;
        }
        Command::Which { path } => {
            let Some(entry) = manager.entry(&path) else {
                eprintln!("gevfs: {}: not mounted", path);
                return Ok(ExitCode::FAILURE);
            };
            let source = match &entry.backend {
                ge_vfs::Backend::Zip(zip) => zip.archive_name().to_string(),
                ge_vfs::Backend::Disk(disk) => disk.root().display().to_string(),
            };
            writeln!(out, "{}  {}  {}", entry.kind(), source, entry.internal_path)?;
        }
        Command::Exists { path } => {
            if !manager.exists(&path) {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    out.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("gevfs: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
