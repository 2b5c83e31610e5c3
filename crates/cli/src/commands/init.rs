// `ghtasks init` — write a default config file.

use std::path::Path;

use anyhow::bail;
use clap::Args;
use serde::Serialize;

use super::GlobalArgs;
use crate::config::Config;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Tasks note to sync into (relative paths resolve against the working directory).
    #[arg(long, value_name = "PATH")]
    pub note: Option<String>,

    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitResult {
    pub config_path: String,
    pub note: String,
    pub overwritten: bool,
}

pub fn run(args: InitArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = global.config_path().and_then(|path| write_default_config(&path, &args));
    match result {
        Ok(result) => {
            output::print_output(format, &result, format_human)?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

fn write_default_config(path: &Path, args: &InitArgs) -> anyhow::Result<InitResult> {
    let exists = path.exists();
    if exists && !args.force {
        bail!("config already exists at `{}`; pass --force to overwrite it", path.display());
    }

    let mut config = Config::default();
    if let Some(note) = args.note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        config.note = note.to_string();
    }
    config.save_to(path)?;

    Ok(InitResult {
        config_path: path.display().to_string(),
        note: config.note,
        overwritten: exists,
    })
}

fn format_human(result: &InitResult) -> String {
    let verb = if result.overwritten { "Rewrote" } else { "Wrote" };
    format!(
        "{verb} {}\nTasks note: {}\nNext: run `ghtasks auth login`, then `ghtasks sync`.",
        result.config_path, result.note
    )
}
