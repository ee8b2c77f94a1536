//! store-ffi - privileged store operations for external processes
//!
//! Usage:
//!   store-ffi [OPTIONS] ffi-helper
//!   store-ffi [OPTIONS] testsuite --test-root <DIRECTORY> run --command <COMMAND>...
//!
//! Example:
//!   store-ffi --store-dir /tmp/root/store --state-dir /tmp/root/var/nix ffi-helper

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;
use store_ffi::config::{parse_log_level, Config};
use store_ffi::helper::serve_stdio;
use store_ffi::store::LocalStore;
use store_ffi::testsuite::TestRoot;

#[derive(Parser, Debug)]
#[command(name = "store-ffi")]
#[command(version)]
#[command(about = "Privileged store operations for external processes", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding store paths
    #[arg(long, global = true, env = "NIX_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// State directory (temp roots are recorded below it)
    #[arg(long, global = true, env = "NIX_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the helper protocol on stdin/stdout
    #[command(name = "ffi-helper")]
    FfiHelper,

    /// Commands for test suites needing an isolated store
    Testsuite {
        /// The directory root for the test store and all data/config files
        #[arg(long, value_name = "DIRECTORY")]
        test_root: PathBuf,

        #[command(subcommand)]
        command: TestsuiteCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TestsuiteCommand {
    /// Run a program in an environment where store operations point to the test store
    Run {
        /// The command to run, with all of its arguments
        #[arg(
            long,
            required = true,
            num_args = 1..,
            allow_hyphen_values = true,
            value_name = "COMMAND"
        )]
        command: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration, then let flags override it
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(store_dir) = cli.store_dir {
        config.store.store_dir = store_dir;
    }
    if let Some(state_dir) = cli.state_dir {
        config.store.state_dir = state_dir;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.validate().context("invalid configuration")?;

    // Logs go to stderr; stdout carries the protocol
    let level = parse_log_level(&config.logging.level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::from_env(Env::default().default_filter_or(level.as_str())).init();

    match cli.command {
        Commands::FfiHelper => run_helper(&config),
        Commands::Testsuite { test_root, command } => match command {
            TestsuiteCommand::Run { command } => run_in_test_root(test_root, &command),
        },
    }
}

fn run_helper(config: &Config) -> Result<()> {
    log::debug!("store-ffi v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("  Store directory: {}", config.store.store_dir.display());
    log::debug!("  State directory: {}", config.store.state_dir.display());

    let store = LocalStore::open(&config.store.store_dir, &config.store.state_dir)
        .with_context(|| {
            format!(
                "failed to open store at {}",
                config.store.store_dir.display()
            )
        })?;

    serve_stdio(&store, &config.helper).context("ffi-helper failed")?;
    Ok(())
}

fn run_in_test_root(test_root: PathBuf, command: &[String]) -> Result<()> {
    let root = TestRoot::new(test_root);
    match root.exec(command) {
        Ok(never) => match never {},
        Err(e) => Err(e).with_context(|| {
            format!("failed to run command in test root {}", root.path().display())
        }),
    }
}
