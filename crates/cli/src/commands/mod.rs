// CLI subcommand dispatch.

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;

use crate::config::{resolve_config_path, Config};

pub mod auth;
pub mod init;
pub mod sections;
pub mod sync;
pub mod watch;

#[derive(Subcommand)]
pub enum Command {
    /// Refresh the tasks note once
    Sync(sync::SyncArgs),
    /// Refresh the tasks note on an interval until interrupted
    Watch(watch::WatchArgs),
    /// List managed sections and the tasks they hold (offline)
    Sections(sections::SectionsArgs),
    /// Write a default config file
    Init(init::InitArgs),
    /// Manage the stored GitHub token
    #[command(subcommand)]
    Auth(auth::AuthCommand),
}

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn config_path(&self) -> anyhow::Result<PathBuf> {
        Ok(resolve_config_path(self.config.as_deref())?)
    }

    /// Load and validate the config.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let path = self.config_path()?;
        let config = Config::load_or_default(&path)?;
        config.validate()?;
        Ok(config)
    }
}

pub fn run(cmd: Command, global: &GlobalArgs) -> anyhow::Result<()> {
    match cmd {
        Command::Sync(args) => sync::run(args, global),
        Command::Watch(args) => watch::run(args, global),
        Command::Sections(args) => sections::run(args, global),
        Command::Init(args) => init::run(args, global),
        Command::Auth(cmd) => auth::run(cmd, global),
    }
}

/// Drive `future` to completion on a fresh current-thread runtime.
pub(crate) fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    Ok(runtime.block_on(future))
}

/// The note to work on: `--note` when given, the configured note otherwise.
pub(crate) fn resolve_note(config: &Config, explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    let base = std::env::current_dir().context("failed to read current directory")?;
    Ok(match explicit {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => base.join(path),
        None => config.note_path(&base),
    })
}
