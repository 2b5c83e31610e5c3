// `ghtasks sync` — refresh the tasks note once.

use std::path::PathBuf;

use clap::Args;

use ghtasks_common::reconcile::ReconcileStats;

use super::{block_on, resolve_note, GlobalArgs};
use crate::config::Config;
use crate::credentials::require_token;
use crate::github::GitHubClient;
use crate::output::{self, OutputFormat};
use crate::sync::{run_cycle, SyncOutcome};

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Tasks note to update (defaults to the configured note).
    #[arg(long, value_name = "PATH")]
    pub note: Option<PathBuf>,

    /// Print the updated note instead of writing it.
    #[arg(long)]
    pub dry_run: bool,

    /// Force JSON output.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: SyncArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match sync_once(&args, global) {
        Ok(outcome) => {
            output::print_output(format, &outcome, format_human)?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

fn sync_once(args: &SyncArgs, global: &GlobalArgs) -> anyhow::Result<SyncOutcome> {
    let config = global.load_config()?;
    let note = resolve_note(&config, args.note.as_deref())?;
    block_on(refresh(&config, note, args.dry_run))?
}

/// One authenticated refresh of `note` with the settings in `config`.
pub(crate) async fn refresh(
    config: &Config,
    note: PathBuf,
    dry_run: bool,
) -> anyhow::Result<SyncOutcome> {
    let token = require_token(config.token.as_deref())?;
    let client = GitHubClient::new(&config.api_url, token.token)?;
    run_cycle(&client, &note, &config.section_specs(), &config.sync, dry_run).await
}

fn format_human(outcome: &SyncOutcome) -> String {
    if let Some(preview) = &outcome.preview {
        return preview.trim_end_matches('\n').to_string();
    }

    let mut lines = Vec::new();
    let verdict = if outcome.written { "updated" } else { "unchanged" };
    lines.push(format!("{}: {verdict} ({})", outcome.note, summarize(&outcome.totals)));
    for section in &outcome.sections {
        let appended = if section.appended { " [new]" } else { "" };
        lines.push(format!("  {}{appended}: {}", section.header, summarize(&section.stats)));
    }
    lines.join("\n")
}

fn summarize(stats: &ReconcileStats) -> String {
    format!(
        "{} kept, {} added, {} updated, {} dropped",
        stats.kept,
        stats.added,
        stats.patched + stats.rendered,
        stats.dropped
    )
}
