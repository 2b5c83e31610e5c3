// Task line codec: `TaskRecord` <-> markdown line.
//
// - [ |x] [PR: ]?[<title>](<url>) (<repo>#<number>)( #<tag>)* ( <date>)* ^gh-<identity>

use std::fmt::Write as _;

use chrono::NaiveDate;

use super::annotation::{self, AnnotationKind};
use super::scan::{escape_title, scan_line, Field, ANCHOR_PREFIX};
use super::tags::remote_tags;
use crate::settings::SyncSettings;
use crate::types::{RemoteItem, TaskKind, TaskRecord};

/// Render `record` as a task line for a section holding `kind` items.
pub fn encode(record: &TaskRecord, kind: TaskKind, settings: &SyncSettings) -> String {
    let mut line = String::with_capacity(96 + record.title.len() + record.url.len());
    let _ = write!(
        line,
        "- [{}] {}[{}]({}) ({}#{})",
        record.status.glyph(),
        kind.prefix(),
        escape_title(&record.title),
        escape_url(&record.url),
        record.repository_ref,
        record.sequence_number,
    );

    for tag in record.tags.iter() {
        line.push_str(" #");
        line.push_str(tag);
    }

    if settings.show_created_at {
        if let Some(created_at) = record.created_at {
            line.push(' ');
            line.push_str(&annotation::render(
                AnnotationKind::Created,
                created_at,
                settings.render_dialect,
            ));
        }
    }

    if record.status.is_closed() && settings.show_completed_at {
        if let Some(closed_at) = record.closed_at {
            line.push(' ');
            line.push_str(&annotation::render(
                AnnotationKind::Completion,
                closed_at,
                settings.render_dialect,
            ));
        }
    }

    let _ = write!(line, " {ANCHOR_PREFIX}{}", record.identity);
    line
}

/// Decode a task line. Returns `None` for lines that are not task lines;
/// damaged sub-parts come back as empty/zero values.
pub fn decode(line: &str) -> Option<TaskRecord> {
    let scan = scan_line(line)?;

    let (title, url) = match scan.link {
        Field::Matched(link) => (link.title, link.url),
        Field::Defaulted => (String::new(), String::new()),
    };
    let (repository_ref, sequence_number) = match scan.repository {
        Field::Matched(repo) => (repo.repository_ref, repo.sequence_number),
        Field::Defaulted => (String::new(), 0),
    };

    Some(TaskRecord {
        identity: scan.identity,
        kind: scan.kind.into_option().unwrap_or(TaskKind::Issue),
        title,
        url,
        repository_ref,
        sequence_number,
        status: scan.status,
        tags: scan.tags.into_iter().collect(),
        created_at: scan.created_at.into_option(),
        closed_at: scan.closed_at.into_option(),
        source_line: Some(line.to_string()),
    })
}

impl TaskRecord {
    /// Record for a freshly fetched item, tagged per `settings`.
    pub fn from_remote(item: &RemoteItem, settings: &SyncSettings) -> Self {
        Self {
            identity: item.identity,
            kind: item.kind,
            title: item.title.clone(),
            url: item.url.clone(),
            repository_ref: item.repository_ref.clone(),
            sequence_number: item.sequence_number,
            status: item.status,
            tags: remote_tags(item, settings),
            created_at: item.created_at.map(|at| at.date_naive()),
            closed_at: item.closed_at.map(|at| at.date_naive()),
            source_line: None,
        }
    }
}

/// Mark an open task line closed without touching anything else: flip the
/// checkbox and, when enabled and known, insert the completion date right
/// before the anchor.
pub fn close_in_place(line: &str, closed_at: Option<NaiveDate>, settings: &SyncSettings) -> String {
    let flipped = match line.strip_prefix("- [ ]") {
        Some(rest) => format!("- [x]{rest}"),
        None => line.replacen("[ ]", "[x]", 1),
    };

    let Some(closed_at) = closed_at.filter(|_| settings.show_completed_at) else {
        return flipped;
    };
    let Some(scan) = scan_line(&flipped) else {
        return flipped;
    };
    if scan.closed_at.is_matched() {
        return flipped;
    }

    let annotation =
        annotation::render(AnnotationKind::Completion, closed_at, settings.render_dialect);
    let (before, after) = flipped.split_at(scan.anchor.start);
    if before.ends_with(' ') {
        format!("{before}{annotation} {after}")
    } else {
        format!("{before} {annotation} {after}")
    }
}

/// Whether two link targets are the same once rendered. Decoded lines carry
/// the escaped form, fetched items the raw one.
pub fn same_link(a: &str, b: &str) -> bool {
    escape_url(a) == escape_url(b)
}

/// Keep the link target on one token: spaces and parentheses are percent-encoded.
fn escape_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for ch in url.chars() {
        match ch {
            ' ' => out.push_str("%20"),
            '(' => out.push_str("%28"),
            ')' => out.push_str("%29"),
            _ => out.push(ch),
        }
    }
    out
}
