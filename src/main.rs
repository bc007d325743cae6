mod config;
mod error;
mod file_hash;
mod logging;
mod portable;
mod ports;
mod services;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use color_eyre::Result;

use crate::{
    config::Config,
    error::AppError,
    logging::setup_logging,
    portable::PortableSync,
    ports::command::Verbosity,
    services::command::SystemCommandRunner,
    services::playlist::{PlaylistStore, check_playlists, dedup_playlists},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage and maintain a music library", long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "TUNEKEEP_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Be verbose (repeat for more detail and external tool output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Be quiet (overrides -v)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,

    /// Path to log file
    #[arg(long, env = "TUNEKEEP_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// File log level (default: debug)
    #[arg(long, default_value = "debug", global = true)]
    log_file_level: log::LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a portable version of the library
    ///
    /// Certain formats are re-encoded to a consistent format, excluded
    /// directories (scans, extras) are left out and everything else is
    /// copied verbatim. Tracks whose portable copy is already up to date are
    /// skipped.
    #[command(visible_aliases = [
        "portable",
        "gen-portable",
        "generate-portable",
        "gen-port",
        "port",
    ])]
    SyncPortable,
    /// Check all playlist tracks exist
    #[command(visible_alias = "playlist-check")]
    CheckPlaylists,
    /// Remove duplicate tracks from every playlist
    #[command(visible_aliases = [
        "dedup",
        "deduplicate",
        "deduplicate-playlists",
        "playlist-dedup",
    ])]
    DedupPlaylists,
    /// Run all maintenance commands (dedup then check)
    #[command(visible_alias = "maint")]
    Maintenance,
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, AppError> {
    log::debug!("Loading configuration");
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    config.validate()?;
    Ok(config)
}

fn run_config_command(command: ConfigCommands) -> Result<(), AppError> {
    match command {
        ConfigCommands::CreateDefault => {
            log::debug!("Creating default config");
            let (path, created) = Config::create_default()?;
            if created {
                log::info!("Default config created at {}", path.display());
            } else {
                log::info!("Config already exists at {}", path.display());
            }
        }
        ConfigCommands::Path => match Config::config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("No default config path found"),
        },
    }
    Ok(())
}

fn run(args: Args, verbosity: Verbosity) -> Result<(), AppError> {
    let config_file = args.config.as_ref();

    match args.command {
        Commands::SyncPortable => {
            let config = load_config(config_file)?;
            let music = config.music_root()?;
            let portable = config.portable_root()?;
            let runner = SystemCommandRunner::new(verbosity);
            PortableSync {
                runner: &runner,
                verbosity,
                music: &music,
                portable: &portable,
                transcode_extensions: config.transcode_extensions(),
                excluded_dirs: config.excluded_dirs(),
                transcode: config.transcode(),
            }
            .run()?;
        }
        Commands::CheckPlaylists => {
            let config = load_config(config_file)?;
            let store = PlaylistStore::new(config.playlists_root()?.path());
            check_playlists(&store, config.music_root()?.path())?;
        }
        Commands::DedupPlaylists => {
            let config = load_config(config_file)?;
            let store = PlaylistStore::new(config.playlists_root()?.path());
            dedup_playlists(&store)?;
        }
        Commands::Maintenance => {
            let config = load_config(config_file)?;
            let music = config.music_root()?;
            let store = PlaylistStore::new(config.playlists_root()?.path());
            dedup_playlists(&store)?;
            check_playlists(&store, music.path())?;
        }
        Commands::Config(command) => run_config_command(command)?,
    }

    Ok(())
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.verbose, args.quiet);
    setup_logging(
        verbosity.console_log_level(),
        args.log_file.clone(),
        args.log_file_level,
    )?;

    log::debug!("tunekeep starting");

    match run(args, verbosity) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            let code = e.exit_code();
            log::error!("{:#}", color_eyre::Report::new(e));
            Ok(ExitCode::from(code))
        }
    }
}
