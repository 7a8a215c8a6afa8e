pub mod cli;
pub mod commands;
pub mod files;
pub mod prompt;
pub mod watch;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use commands::Host;
use ideaboard_core::app;
use ideaboard_core::config::{to_pretty_json, AppConfig, ConfigStore, DATA_DIR_ENV};
use prompt::TerminalPrompt;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn config_store(cli: &Cli) -> anyhow::Result<ConfigStore> {
    match cli.config.clone() {
        Some(path) => Ok(ConfigStore::new(path)),
        None => Ok(ConfigStore::default_store()?),
    }
}

fn show_config(
    store: &ConfigStore,
    config: &AppConfig,
    init: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    if init {
        store
            .save(config)
            .with_context(|| format!("failed to write {}", store.path().display()))?;
        writeln!(out, "Wrote {}", store.path().display())?;
    }
    writeln!(out, "# {}", store.path().display())?;
    writeln!(out, "{}", to_pretty_json(config)?)?;
    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let store = config_store(&cli)?;
    let config = store
        .load()
        .with_context(|| format!("failed to read {}", store.path().display()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if let Command::Config { init } = cli.command {
        return show_config(&store, &config, init, &mut out);
    }

    let dir_override = cli
        .data_dir
        .clone()
        .or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from));
    let data_dir = app::resolve_data_dir(&config, dir_override)?;
    tracing::debug!(data_dir = %data_dir.display(), "opening board");
    let db = app::open_board_database(&data_dir)
        .with_context(|| format!("failed to open the board in {}", data_dir.display()))?;

    let mut prompt = TerminalPrompt;
    let mut host = Host {
        db: &db,
        config: &config,
        prompt: &mut prompt,
        out: &mut out,
    };
    host.dispatch(cli.command)
}
