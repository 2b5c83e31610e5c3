// `ghtasks watch` — refresh the tasks note on an interval.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Args;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::sync::refresh;
use super::{block_on, resolve_note, GlobalArgs};
use crate::config::Config;
use crate::credentials::require_token;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Minutes between refreshes (defaults to `refresh_interval_min`).
    #[arg(long, value_name = "MIN")]
    pub every: Option<u32>,

    /// Tasks note to update (defaults to the configured note).
    #[arg(long, value_name = "PATH")]
    pub note: Option<PathBuf>,
}

pub fn run(args: WatchArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(false);
    let result = prepare(&args, global)
        .and_then(|(config, note, every)| block_on(watch_loop(&config, note, every))?);
    if let Err(error) = &result {
        output::print_anyhow_error(format, error);
    }
    result
}

fn prepare(args: &WatchArgs, global: &GlobalArgs) -> anyhow::Result<(Config, PathBuf, Duration)> {
    let config = global.load_config()?;
    let every = refresh_interval(args.every, config.refresh_interval_min)?;
    let note = resolve_note(&config, args.note.as_deref())?;
    // Fail fast instead of warning on every tick.
    require_token(config.token.as_deref())?;
    Ok((config, note, every))
}

/// `--every` wins over the config; zero means no interval was chosen.
fn refresh_interval(flag: Option<u32>, configured: u32) -> anyhow::Result<Duration> {
    let minutes = flag.unwrap_or(configured);
    if minutes == 0 {
        bail!("no refresh interval; pass --every MIN or set `refresh_interval_min` in the config");
    }
    Ok(Duration::from_secs(u64::from(minutes) * 60))
}

async fn watch_loop(config: &Config, note: PathBuf, every: Duration) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(note = %note.display(), every_secs = every.as_secs(), "watching tasks note");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match refresh(config, note.clone(), false).await {
                    Ok(outcome) => info!(
                        written = outcome.written,
                        added = outcome.totals.added,
                        dropped = outcome.totals.dropped,
                        "refresh cycle finished"
                    ),
                    Err(error) => warn!(error = %format!("{error:#}"), "refresh cycle failed"),
                }
            }
            signal = &mut shutdown => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("stopping watch");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_overrides_config_interval() {
        assert_eq!(refresh_interval(Some(5), 30).unwrap(), Duration::from_secs(300));
        assert_eq!(refresh_interval(None, 30).unwrap(), Duration::from_secs(1800));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let error = refresh_interval(None, 0).unwrap_err();
        assert!(error.to_string().contains("--every"));
        assert!(refresh_interval(Some(0), 10).is_err());
    }
}
