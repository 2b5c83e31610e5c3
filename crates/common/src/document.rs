// Whole-document assembly: locate every managed section, reconcile each one,
// splice the results back and normalize blank lines.

use std::ops::Range;

use serde::Serialize;
use tracing::{debug, trace};

use crate::reconcile::{reconcile, ReconcileStats};
use crate::section::locate_sections;
use crate::settings::{validate_sections, SettingsError, SyncSettings};
use crate::types::{Category, RemoteItem, SectionSpec};

/// Items fetched for one managed section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionBatch {
    pub spec: SectionSpec,
    pub items: Vec<RemoteItem>,
}

impl SectionBatch {
    pub fn new(spec: SectionSpec, items: Vec<RemoteItem>) -> Self {
        Self { spec, items }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionReport {
    pub category: Category,
    pub header: String,
    /// The header was missing and the section was added at the end.
    pub appended: bool,
    pub stats: ReconcileStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub text: String,
    /// `text` differs from the input document.
    pub changed: bool,
    pub sections: Vec<SectionReport>,
}

impl Assembled {
    pub fn totals(&self) -> ReconcileStats {
        let mut totals = ReconcileStats::default();
        for section in &self.sections {
            totals.absorb(&section.stats);
        }
        totals
    }
}

/// Rewrite `document` so every batch's section reflects its items.
///
/// Batches are applied in the order given. Lines outside managed sections are
/// carried over unchanged; line endings are normalized to `\n`.
pub fn assemble(
    document: &str,
    batches: &[SectionBatch],
    settings: &SyncSettings,
) -> Result<Assembled, SettingsError> {
    settings.validate()?;
    let specs: Vec<SectionSpec> = batches.iter().map(|batch| batch.spec.clone()).collect();
    validate_sections(&specs)?;

    let lines: Vec<&str> = document.lines().collect();
    let located = locate_sections(&lines, &specs);

    let mut replacements: Vec<(Range<usize>, Vec<String>)> = Vec::new();
    let mut appended: Vec<Vec<String>> = Vec::new();
    let mut reports = Vec::with_capacity(batches.len());

    for (batch, section) in batches.iter().zip(located) {
        let existing = section.as_ref().map(|s| s.records.as_slice()).unwrap_or(&[]);
        let update = reconcile(existing, &batch.items, batch.spec.kind, settings);
        debug!(
            category = %batch.spec.category,
            fetched = batch.items.len(),
            kept = update.stats.kept,
            patched = update.stats.patched,
            rendered = update.stats.rendered,
            dropped = update.stats.dropped,
            added = update.stats.added,
            "reconciled section"
        );

        let was_present = section.is_some();
        match section {
            Some(section) => {
                let mut block = Vec::with_capacity(update.lines.len() + 2);
                block.push(lines[section.range.start].to_string());
                block.extend(update.lines);
                if ends_with_blank(&lines[section.body()]) {
                    block.push(String::new());
                }
                replacements.push((section.range, block));
            }
            None if !update.lines.is_empty() => {
                trace!(header = %batch.spec.header, "appending missing section");
                let mut block = Vec::with_capacity(update.lines.len() + 2);
                block.push(String::new());
                block.push(batch.spec.header.trim_end().to_string());
                block.extend(update.lines);
                appended.push(block);
            }
            None => {}
        }

        reports.push(SectionReport {
            category: batch.spec.category,
            header: batch.spec.header.clone(),
            appended: !was_present && update.stats.added > 0,
            stats: update.stats,
        });
    }

    let spliced = splice(&lines, replacements, appended);
    let mut text = normalize_blank_lines(&spliced).join("\n");
    if document.ends_with('\n') && !text.is_empty() {
        text.push('\n');
    }

    let changed = text != document;
    debug!(changed, sections = reports.len(), "assembled document");
    Ok(Assembled { text, changed, sections: reports })
}

/// Copy `lines`, substituting each replacement range and appending the new
/// sections at the end.
fn splice(
    lines: &[&str],
    mut replacements: Vec<(Range<usize>, Vec<String>)>,
    appended: Vec<Vec<String>>,
) -> Vec<String> {
    replacements.sort_by_key(|(range, _)| range.start);

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut cursor = 0;
    for (range, block) in replacements {
        out.extend(lines[cursor..range.start].iter().map(|line| line.to_string()));
        out.extend(block);
        cursor = range.end;
    }
    out.extend(lines[cursor..].iter().map(|line| line.to_string()));

    for block in appended {
        if out.iter().all(|line| is_blank(line)) {
            out.clear();
        }
        out.extend(block);
    }
    out
}

/// Collapse runs of blank lines to one and drop trailing blanks.
fn normalize_blank_lines(lines: &[String]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    for line in lines {
        if is_blank(line) && out.last().is_some_and(|prev| is_blank(prev)) {
            continue;
        }
        out.push(line.as_str());
    }
    while out.last().is_some_and(|line| is_blank(line)) {
        out.pop();
    }
    out
}

fn ends_with_blank(body: &[&str]) -> bool {
    body.last().is_some_and(|line| is_blank(line))
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}
