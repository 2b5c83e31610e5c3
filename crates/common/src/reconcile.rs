// Per-section reconciliation of document records against fetched items.
//
// Existing lines come first in their document order, then newly seen open
// items in fetch order. A line whose item is still the same link is the
// user's: it is kept byte-for-byte, except that a close on the tracker flips
// its checkbox in place.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::settings::SyncSettings;
use crate::task::codec::{close_in_place, encode, same_link};
use crate::types::{RemoteItem, TaskKind, TaskRecord, TaskStatus};

/// What happened to one record during reconciliation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LineDecision {
    /// Existing line emitted unchanged.
    Keep,
    /// Existing line emitted with its checkbox flipped (and completion date spliced in).
    Patch,
    /// Existing record re-rendered from the remote item.
    Render,
    /// Existing line removed.
    Drop,
    /// Remote item not yet in the section, rendered fresh.
    Add,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileStats {
    pub kept: usize,
    pub patched: usize,
    pub rendered: usize,
    pub dropped: usize,
    pub added: usize,
}

impl ReconcileStats {
    fn record(&mut self, decision: LineDecision) {
        match decision {
            LineDecision::Keep => self.kept += 1,
            LineDecision::Patch => self.patched += 1,
            LineDecision::Render => self.rendered += 1,
            LineDecision::Drop => self.dropped += 1,
            LineDecision::Add => self.added += 1,
        }
    }

    /// True when every existing line survived untouched and nothing was added.
    pub fn is_unchanged(&self) -> bool {
        self.patched == 0 && self.rendered == 0 && self.dropped == 0 && self.added == 0
    }

    pub fn absorb(&mut self, other: &ReconcileStats) {
        self.kept += other.kept;
        self.patched += other.patched;
        self.rendered += other.rendered;
        self.dropped += other.dropped;
        self.added += other.added;
    }
}

/// New content for one section (task lines only, header excluded).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionUpdate {
    pub lines: Vec<String>,
    pub stats: ReconcileStats,
}

impl SectionUpdate {
    fn push(&mut self, decision: LineDecision, line: Option<String>) {
        self.stats.record(decision);
        if let Some(line) = line {
            self.lines.push(line);
        }
    }
}

/// Merge a section's `existing` records with the `remote` items fetched for it.
pub fn reconcile(
    existing: &[TaskRecord],
    remote: &[RemoteItem],
    kind: TaskKind,
    settings: &SyncSettings,
) -> SectionUpdate {
    let mut by_identity: HashMap<u64, &RemoteItem> = HashMap::with_capacity(remote.len());
    for item in remote {
        by_identity.entry(item.identity).or_insert(item);
    }

    let mut update = SectionUpdate::default();
    let mut seen: HashSet<u64> = HashSet::with_capacity(existing.len() + remote.len());

    for record in existing {
        if !seen.insert(record.identity) {
            // A second line for an identity already handled.
            update.push(LineDecision::Drop, None);
            continue;
        }

        let (decision, line) = match by_identity.get(&record.identity) {
            Some(item) => update_existing(record, item, kind, settings),
            None => retain_orphan(record, kind, settings),
        };
        update.push(decision, line);
    }

    for item in remote {
        if !seen.insert(item.identity) {
            continue;
        }
        if item.status == TaskStatus::Open {
            let line = encode(&TaskRecord::from_remote(item, settings), kind, settings);
            update.push(LineDecision::Add, Some(line));
        }
    }

    update
}

fn update_existing(
    record: &TaskRecord,
    item: &RemoteItem,
    kind: TaskKind,
    settings: &SyncSettings,
) -> (LineDecision, Option<String>) {
    if settings.auto_clear_completed && item.status.is_closed() {
        return (LineDecision::Drop, None);
    }

    let same_target = same_link(&record.url, &item.url);
    if let Some(source) = record.source_line.as_deref().filter(|_| same_target) {
        if item.status.is_closed() && !record.status.is_closed() {
            let closed_at = item.closed_at.map(|at| at.date_naive());
            return (LineDecision::Patch, Some(close_in_place(source, closed_at, settings)));
        }
        return (LineDecision::Keep, Some(source.to_string()));
    }

    let mut fresh = TaskRecord::from_remote(item, settings);
    fresh.tags = fresh.tags.merged(&record.tags);
    if fresh.created_at.is_none() {
        fresh.created_at = record.created_at;
    }
    if record.status.is_closed() {
        fresh.status = TaskStatus::Closed;
        if fresh.closed_at.is_none() {
            fresh.closed_at = record.closed_at;
        }
    }
    (LineDecision::Render, Some(encode(&fresh, kind, settings)))
}

/// A record the tracker no longer reports: checked-off lines stay until
/// auto-clear is on, open ones go.
fn retain_orphan(
    record: &TaskRecord,
    kind: TaskKind,
    settings: &SyncSettings,
) -> (LineDecision, Option<String>) {
    if !record.status.is_closed() || settings.auto_clear_completed {
        return (LineDecision::Drop, None);
    }
    let line = match &record.source_line {
        Some(source) => source.clone(),
        None => encode(record, kind, settings),
    };
    (LineDecision::Keep, Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::codec::decode;
    use chrono::{TimeZone, Utc};

    fn item(identity: u64, status: TaskStatus) -> RemoteItem {
        RemoteItem {
            identity,
            kind: TaskKind::Issue,
            title: format!("Item {identity}"),
            url: format!("https://github.com/o/r/issues/{identity}"),
            repository_ref: "o/r".into(),
            sequence_number: identity,
            status,
            labels: vec![],
            created_at: None,
            closed_at: None,
        }
    }

    fn records(lines: &[&str]) -> Vec<TaskRecord> {
        lines.iter().map(|line| decode(line).expect("fixture line should decode")).collect()
    }

    fn plain() -> SyncSettings {
        SyncSettings { tag_prefix: String::new(), ..Default::default() }
    }

    #[test]
    fn new_open_items_are_added_and_closed_ones_skipped() {
        let remote = vec![item(1, TaskStatus::Open), item(2, TaskStatus::Closed)];
        let update = reconcile(&[], &remote, TaskKind::Issue, &plain());
        assert_eq!(
            update.lines,
            vec!["- [ ] [Item 1](https://github.com/o/r/issues/1) (o/r#1) ^gh-1"]
        );
        assert_eq!(update.stats.added, 1);
    }

    #[test]
    fn hand_edited_line_is_kept_verbatim() {
        let existing =
            records(&["- [ ] [My words](https://github.com/o/r/issues/1) (o/r#1) #mine ^gh-1"]);
        let update = reconcile(&existing, &[item(1, TaskStatus::Open)], TaskKind::Issue, &plain());
        assert_eq!(update.lines, vec![existing[0].source_line.clone().unwrap()]);
        assert!(update.stats.is_unchanged());
    }

    #[test]
    fn remote_close_flips_checkbox_in_place() {
        let existing =
            records(&["- [ ] [My words](https://github.com/o/r/issues/1) (o/r#1) #mine ^gh-1"]);
        let mut closed = item(1, TaskStatus::Closed);
        closed.closed_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());

        let update = reconcile(&existing, &[closed], TaskKind::Issue, &plain());
        assert_eq!(
            update.lines,
            vec!["- [x] [My words](https://github.com/o/r/issues/1) (o/r#1) #mine ✅ 2024-03-01 ^gh-1"]
        );
        assert_eq!(update.stats.patched, 1);
    }

    #[test]
    fn locally_closed_line_stays_closed_while_remote_is_open() {
        let line = "- [x] [Item 1](https://github.com/o/r/issues/1) (o/r#1) ^gh-1";
        let update =
            reconcile(&records(&[line]), &[item(1, TaskStatus::Open)], TaskKind::Issue, &plain());
        assert_eq!(update.lines, vec![line]);
    }

    #[test]
    fn edited_line_with_escaped_url_is_kept() {
        let line = "- [ ] [My edit](https://x/a%20b) (o/r#5) ^gh-42";
        let mut remote = item(42, TaskStatus::Open);
        remote.url = "https://x/a b".into();

        let update = reconcile(&records(&[line]), &[remote], TaskKind::Issue, &plain());
        assert_eq!(update.lines, vec![line]);
        assert_eq!(update.stats.kept, 1);
        assert_eq!(update.stats.rendered, 0);
    }

    #[test]
    fn auto_clear_drops_closed_items_regardless_of_local_state() {
        let settings = SyncSettings { auto_clear_completed: true, ..plain() };
        let existing = records(&[
            "- [ ] [Item 1](https://github.com/o/r/issues/1) (o/r#1) ^gh-1",
            "- [x] [Item 2](https://github.com/o/r/issues/2) (o/r#2) ^gh-2",
        ]);
        let remote = vec![item(1, TaskStatus::Closed), item(3, TaskStatus::Closed)];
        let update = reconcile(&existing, &remote, TaskKind::Issue, &settings);
        assert!(update.lines.is_empty());
        assert_eq!(update.stats.dropped, 2);
    }

    #[test]
    fn orphans_keep_only_when_closed_and_auto_clear_off() {
        let existing = records(&[
            "- [ ] [Gone open](https://github.com/o/r/issues/1) (o/r#1) ^gh-1",
            "- [x] [Gone done](https://github.com/o/r/issues/2) (o/r#2) ^gh-2",
        ]);
        let update = reconcile(&existing, &[], TaskKind::Issue, &plain());
        assert_eq!(
            update.lines,
            vec!["- [x] [Gone done](https://github.com/o/r/issues/2) (o/r#2) ^gh-2"]
        );

        let settings = SyncSettings { auto_clear_completed: true, ..plain() };
        let update = reconcile(&existing, &[], TaskKind::Issue, &settings);
        assert!(update.lines.is_empty());
    }

    #[test]
    fn url_mismatch_rerenders_with_merged_tags() {
        let settings = SyncSettings { import_labels: true, ..Default::default() };
        let existing =
            records(&["- [ ] [Old](https://github.com/o/r/issues/999) (o/r#999) #urgent ^gh-1"]);
        let mut remote = item(1, TaskStatus::Open);
        remote.labels = vec!["needs review".into()];

        let update = reconcile(&existing, &[remote], TaskKind::Issue, &settings);
        assert_eq!(
            update.lines,
            vec!["- [ ] [Item 1](https://github.com/o/r/issues/1) (o/r#1) #github #needs-review #urgent ^gh-1"]
        );
        assert_eq!(update.stats.rendered, 1);
    }

    #[test]
    fn url_mismatch_inherits_closed_status_and_created_date() {
        let settings = SyncSettings { show_created_at: true, ..plain() };
        let existing = records(&[
            "- [x] [Old](https://elsewhere/1) (o/r#1) ➕ 2023-12-24 ^gh-1",
        ]);
        let update = reconcile(&existing, &[item(1, TaskStatus::Open)], TaskKind::Issue, &settings);
        assert_eq!(
            update.lines,
            vec!["- [x] [Item 1](https://github.com/o/r/issues/1) (o/r#1) ➕ 2023-12-24 ^gh-1"]
        );
    }

    #[test]
    fn existing_order_precedes_new_items() {
        let existing = records(&[
            "- [ ] [B](https://github.com/o/r/issues/2) (o/r#2) ^gh-2",
            "- [ ] [A](https://github.com/o/r/issues/1) (o/r#1) ^gh-1",
        ]);
        let remote = vec![
            item(1, TaskStatus::Open),
            item(3, TaskStatus::Open),
            item(2, TaskStatus::Open),
        ];
        let update = reconcile(&existing, &remote, TaskKind::Issue, &plain());
        let anchors: Vec<&str> =
            update.lines.iter().map(|l| l.rsplit(' ').next().unwrap()).collect();
        assert_eq!(anchors, vec!["^gh-2", "^gh-1", "^gh-3"]);
    }

    #[test]
    fn duplicate_identities_emit_one_line() {
        let existing = records(&[
            "- [ ] [A](https://github.com/o/r/issues/1) (o/r#1) ^gh-1",
            "- [ ] [A copy](https://github.com/o/r/issues/1) (o/r#1) ^gh-1",
        ]);
        let remote = vec![item(1, TaskStatus::Open), item(1, TaskStatus::Open), item(2, TaskStatus::Open), item(2, TaskStatus::Open)];
        let update = reconcile(&existing, &remote, TaskKind::Issue, &plain());
        assert_eq!(update.lines.len(), 2);
        assert!(update.lines[0].contains("[A]"));
        assert!(update.lines[1].ends_with("^gh-2"));
    }

    #[test]
    fn pull_request_sections_render_prefix() {
        let mut pr = item(5, TaskStatus::Open);
        pr.kind = TaskKind::PullRequest;
        let update = reconcile(&[], &[pr], TaskKind::PullRequest, &plain());
        assert_eq!(
            update.lines,
            vec!["- [ ] PR: [Item 5](https://github.com/o/r/issues/5) (o/r#5) ^gh-5"]
        );
    }
}
