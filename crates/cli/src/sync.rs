// One refresh cycle: read the note, fetch every section, assemble, write back.

use std::path::{Path, PathBuf};

use anyhow::Context;
use futures_util::future::try_join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use ghtasks_common::document::{assemble, SectionBatch, SectionReport};
use ghtasks_common::reconcile::ReconcileStats;
use ghtasks_common::settings::SyncSettings;
use ghtasks_common::types::SectionSpec;

use crate::github::IssueSource;

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("tasks note `{}` not found; create it or point `note` at an existing file", .0.display())]
    NotFound(PathBuf),

    #[error("failed to access tasks note `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub note: String,
    pub changed: bool,
    pub written: bool,
    pub totals: ReconcileStats,
    pub sections: Vec<SectionReport>,
    /// Assembled document, kept only for dry runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

pub fn read_note(path: &Path) -> Result<String, NoteError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            NoteError::NotFound(path.to_path_buf())
        } else {
            NoteError::Io { path: path.to_path_buf(), source }
        }
    })
}

/// Run one cycle against `note`. Nothing is written when any fetch fails,
/// when the document is unchanged, or on a dry run.
pub async fn run_cycle<S: IssueSource>(
    source: &S,
    note: &Path,
    specs: &[SectionSpec],
    settings: &SyncSettings,
    dry_run: bool,
) -> anyhow::Result<SyncOutcome> {
    let document = read_note(note)?;

    let fetched = try_join_all(specs.iter().map(|spec| source.fetch(spec.category)))
        .await
        .context("failed to fetch items from GitHub")?;

    let batches: Vec<SectionBatch> = specs
        .iter()
        .cloned()
        .zip(fetched)
        .map(|(spec, items)| SectionBatch::new(spec, items))
        .collect();

    let assembled = assemble(&document, &batches, settings).context("invalid sync settings")?;
    let totals = assembled.totals();

    let written = assembled.changed && !dry_run;
    if written {
        std::fs::write(note, &assembled.text)
            .map_err(|source| NoteError::Io { path: note.to_path_buf(), source })?;
        info!(
            note = %note.display(),
            added = totals.added,
            patched = totals.patched,
            dropped = totals.dropped,
            "updated tasks note"
        );
    } else {
        info!(note = %note.display(), changed = assembled.changed, dry_run, "tasks note not written");
    }

    Ok(SyncOutcome {
        note: note.display().to_string(),
        changed: assembled.changed,
        written,
        totals,
        sections: assembled.sections,
        preview: dry_run.then_some(assembled.text),
    })
}
