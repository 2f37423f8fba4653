use clap::Parser;
use eyre::{Context, Result, eyre};
use granola_backup::{sequential, utils};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Back up Granola meeting transcripts to Markdown files.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to write markdown files to.
    /// Defaults to ~/Documents/granola-transcripts if not set in config.
    #[arg(value_name = "OUTPUT_DIR", env = "GRANOLA_BACKUP_DIR")]
    output_dir: Option<PathBuf>,

    /// Path to Granola's cache file (cache-v3.json).
    /// Auto-detected if omitted.
    #[arg(long, value_name = "PATH", env = "GRANOLA_CACHE_PATH")]
    cache: Option<PathBuf>,

    /// IANA timezone used for filenames and dates (e.g. "America/Chicago").
    /// Auto-detected if omitted or invalid.
    #[arg(long, value_name = "TZ", env = "GRANOLA_TIMEZONE")]
    timezone: Option<String>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/granola-backup/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log debug details to stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress the progress and summary report.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    output_dir: Option<PathBuf>,
    cache_path: Option<PathBuf>,
    timezone: Option<String>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("granola-backup/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn resolve(cli: Cli, file_cfg: FileConfig) -> Result<utils::BackupConfig> {
    // output_dir: CLI/env > Config > Default
    let output_dir = cli
        .output_dir
        .or(file_cfg.output_dir)
        .unwrap_or_else(utils::default_output_dir);

    // cache_path: CLI/env > Config > Auto-detect
    let cache_path = cli
        .cache
        .or(file_cfg.cache_path)
        .or_else(utils::default_cache_path)
        .ok_or_else(|| {
            eyre!("Could not determine the Granola cache path.\nUse --cache to specify it manually, or set cache_path in config.toml.")
        })?;

    // timezone: CLI/env > Config > Auto-detect
    let timezone = utils::resolve_timezone(cli.timezone.or(file_cfg.timezone).as_deref());

    Ok(utils::BackupConfig {
        cache_path,
        output_dir,
        timezone,
        quiet: cli.quiet,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Merge CLI/env, config file and defaults
    let config = resolve(cli, file_cfg)?;

    if !config.quiet {
        println!("\n=== Granola Transcript Backup ===");
        println!("Time: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
        println!("Output: {}", config.output_dir.display());
        println!("Timezone: {}\n", config.timezone);
    }

    // 3. Run the backup; only an unloadable cache ends up here as an error.
    let report = sequential::execute(&config)?;

    if !config.quiet {
        report.print_summary();
    }

    Ok(())
}
