// Tag normalization and the ordered tag set carried by each task line.
//
// Tags: NFKC, lowercase, anything other than letters, digits, `_` and `/`
// becomes a hyphen, hyphen runs collapse, leading/trailing hyphens stripped.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::settings::SyncSettings;
use crate::types::RemoteItem;

/// Convert a tracker label (or repository reference) into a tag body.
///
/// - Applies Unicode NFKC normalization and lowercases
/// - Replaces characters other than letters, digits, `_` and `/` with hyphens
/// - Collapses consecutive hyphens
/// - Strips leading and trailing hyphens
///
/// Returns an empty string if nothing taggable remains.
pub fn normalize_tag(raw: &str) -> String {
    let normalized: String = raw.trim().trim_start_matches('#').nfkc().collect();
    let mapped: String = normalized
        .to_lowercase()
        .chars()
        .map(|ch| if is_tag_char(ch) { ch } else { '-' })
        .collect();

    mapped.split('-').filter(|part| !part.is_empty()).collect::<Vec<_>>().join("-")
}

/// Characters allowed in a tag body (after the `#`).
pub fn is_tag_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '/'
}

/// Characters accepted when reading a tag back from a line.
pub(crate) fn is_tag_body_char(ch: char) -> bool {
    is_tag_char(ch) || ch == '-'
}

/// Insertion-ordered, case-insensitively deduplicated tags.
///
/// Equality ignores order; rendering uses insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `tag` unless it is empty or already present. Returns whether it was added.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        let tag = tag.trim_start_matches('#');
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        let wanted = tag.trim_start_matches('#').to_lowercase();
        self.0.iter().any(|existing| existing.to_lowercase() == wanted)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// `self` followed by every tag of `other` not already present.
    pub fn merged(&self, other: &TagSet) -> TagSet {
        let mut out = self.clone();
        for tag in other.iter() {
            out.insert(tag);
        }
        out
    }
}

impl PartialEq for TagSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|tag| other.contains(tag))
    }
}

impl Eq for TagSet {}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

/// Tags derived from a remote item, in precedence order:
/// user tag, label tags, repository tag.
pub fn remote_tags(item: &RemoteItem, settings: &SyncSettings) -> TagSet {
    let mut tags = TagSet::new();
    if let Some(user_tag) = settings.user_tag() {
        tags.insert(user_tag);
    }
    if settings.import_labels {
        for label in &item.labels {
            tags.insert(normalize_tag(label));
        }
    }
    if settings.repository_tags {
        tags.insert(normalize_tag(&item.repository_ref));
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaskKind, TaskStatus};

    fn item_with_labels(labels: &[&str]) -> RemoteItem {
        RemoteItem {
            identity: 7,
            kind: TaskKind::Issue,
            title: "Title".into(),
            url: "https://github.com/Acme/Web.App/issues/3".into(),
            repository_ref: "Acme/Web.App".into(),
            sequence_number: 3,
            status: TaskStatus::Open,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            created_at: None,
            closed_at: None,
        }
    }

    // ── normalize_tag ────────────────────────────────────────────────

    #[test]
    fn normalize_lowercases_and_hyphenates() {
        assert_eq!(normalize_tag("needs review"), "needs-review");
        assert_eq!(normalize_tag("Good First Issue"), "good-first-issue");
    }

    #[test]
    fn normalize_collapses_and_strips_hyphens() {
        assert_eq!(normalize_tag("--a---b--"), "a-b");
        assert_eq!(normalize_tag("  type: bug  "), "type-bug");
    }

    #[test]
    fn normalize_keeps_slashes_and_underscores() {
        assert_eq!(normalize_tag("Acme/Web.App"), "acme/web-app");
        assert_eq!(normalize_tag("area/ci_cd"), "area/ci_cd");
    }

    #[test]
    fn normalize_keeps_unicode_letters_and_drops_symbols() {
        assert_eq!(normalize_tag("Über Cool"), "über-cool");
        assert_eq!(normalize_tag("bug 🐛"), "bug");
        assert_eq!(normalize_tag("🔥"), "");
    }

    #[test]
    fn normalize_applies_nfkc() {
        assert_eq!(normalize_tag("ｆｕｌｌｗｉｄｔｈ"), "fullwidth");
    }

    // ── TagSet ───────────────────────────────────────────────────────

    #[test]
    fn tag_set_deduplicates_case_insensitively() {
        let tags: TagSet = ["github", "GitHub", "#github", "urgent"].into_iter().collect();
        assert_eq!(tags.as_slice(), &["github".to_string(), "urgent".to_string()]);
    }

    #[test]
    fn tag_set_equality_ignores_order() {
        let a: TagSet = ["a", "b"].into_iter().collect();
        let b: TagSet = ["b", "a"].into_iter().collect();
        let c: TagSet = ["a"].into_iter().collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn merged_keeps_receiver_first() {
        let remote: TagSet = ["github", "needs-review"].into_iter().collect();
        let existing: TagSet = ["urgent", "github"].into_iter().collect();
        let merged = remote.merged(&existing);
        assert_eq!(
            merged.iter().collect::<Vec<_>>(),
            vec!["github", "needs-review", "urgent"]
        );
    }

    // ── remote_tags ──────────────────────────────────────────────────

    #[test]
    fn remote_tags_only_user_tag_by_default() {
        let tags = remote_tags(&item_with_labels(&["bug"]), &SyncSettings::default());
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["github"]);
    }

    #[test]
    fn remote_tags_follow_precedence_order() {
        let settings = SyncSettings {
            import_labels: true,
            repository_tags: true,
            ..Default::default()
        };
        let tags = remote_tags(&item_with_labels(&["needs review", "GitHub"]), &settings);
        assert_eq!(
            tags.iter().collect::<Vec<_>>(),
            vec!["github", "needs-review", "acme/web-app"]
        );
    }

    #[test]
    fn remote_tags_skip_untaggable_labels() {
        let settings = SyncSettings { import_labels: true, tag_prefix: String::new(), ..Default::default() };
        let tags = remote_tags(&item_with_labels(&["🔥", "p1"]), &settings);
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["p1"]);
    }
}
