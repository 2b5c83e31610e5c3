// Line scanner for task lines.
//
// A task line is `- [ ]`/`- [x]` followed eventually by a `^gh-<digits>`
// anchor. Everything else in the line is optional: each sub-part is reported
// as `Field::Matched` when found and `Field::Defaulted` otherwise, so that a
// damaged line still yields a record instead of failing the section scan.

use std::ops::Range;

use chrono::NaiveDate;

use super::annotation::{find_annotations, first_of, AnnotationKind, AnnotationMatch};
use super::tags::is_tag_body_char;
use crate::types::{TaskKind, TaskStatus};

pub const ANCHOR_PREFIX: &str = "^gh-";
const PR_PREFIX: &str = "PR:";

/// A sub-part of a task line that was either found or filled with a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Matched(T),
    Defaulted,
}

impl<T> Field<T> {
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Matched(value) => Some(value),
            Self::Defaulted => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPart {
    /// Anchor text with escapes removed.
    pub title: String,
    pub url: String,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryPart {
    pub repository_ref: String,
    pub sequence_number: u64,
    pub span: Range<usize>,
}

/// Result of scanning one task line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineScan<'a> {
    pub line: &'a str,
    pub status: TaskStatus,
    pub identity: u64,
    pub anchor: Range<usize>,
    pub kind: Field<TaskKind>,
    pub link: Field<LinkPart>,
    pub repository: Field<RepositoryPart>,
    pub created_at: Field<NaiveDate>,
    pub closed_at: Field<NaiveDate>,
    pub tags: Vec<String>,
}

/// Scan `line`. Returns `None` when the line is not a task line.
pub fn scan_line(line: &str) -> Option<LineScan<'_>> {
    let (status, body_start) = scan_checkbox(line)?;
    let (identity, anchor) = scan_anchor(line, body_start)?;

    let kind = if line[body_start..].trim_start().starts_with(PR_PREFIX) {
        Field::Matched(TaskKind::PullRequest)
    } else {
        Field::Defaulted
    };

    let link = scan_link(line, body_start, &anchor);
    let after_link = match &link {
        Field::Matched(part) => part.span.end,
        Field::Defaulted => body_start,
    };
    let repository = scan_repository(line, after_link, &anchor);

    let link_span = match &link {
        Field::Matched(part) => Some(part.span.clone()),
        Field::Defaulted => None,
    };
    let annotations: Vec<AnnotationMatch> = find_annotations(line)
        .into_iter()
        .filter(|m| m.span.start >= body_start)
        .filter(|m| !link_span.as_ref().is_some_and(|span| overlaps(span, &m.span)))
        .filter(|m| !overlaps(&anchor, &m.span))
        .collect();
    let created_at = date_field(&annotations, AnnotationKind::Created);
    let closed_at = date_field(&annotations, AnnotationKind::Completion);

    let mut excluded: Vec<Range<usize>> = vec![0..body_start, anchor.clone()];
    excluded.extend(link_span);
    if let Field::Matched(part) = &repository {
        excluded.push(part.span.clone());
    }
    excluded.extend(annotations.iter().map(|m| m.span.clone()));
    let tags = scan_tags(line, &excluded);

    Some(LineScan {
        line,
        status,
        identity,
        anchor,
        kind,
        link,
        repository,
        created_at,
        closed_at,
        tags,
    })
}

/// `- [ ]`, `- [x]` or `- [X]` at the start of the line.
fn scan_checkbox(line: &str) -> Option<(TaskStatus, usize)> {
    let rest = line.strip_prefix("- [")?;
    let mut chars = rest.chars();
    let status = match chars.next()? {
        ' ' => TaskStatus::Open,
        'x' | 'X' => TaskStatus::Closed,
        _ => return None,
    };
    if chars.next()? != ']' {
        return None;
    }
    Some((status, "- [ ]".len()))
}

/// The last `^gh-<digits>` in the line, after the checkbox.
fn scan_anchor(line: &str, body_start: usize) -> Option<(u64, Range<usize>)> {
    for (start, _) in line.rmatch_indices(ANCHOR_PREFIX) {
        if start < body_start {
            break;
        }
        let digits_start = start + ANCHOR_PREFIX.len();
        let digits_len = line[digits_start..].bytes().take_while(u8::is_ascii_digit).count();
        if digits_len == 0 {
            continue;
        }
        let digits_end = digits_start + digits_len;
        let identity = line[digits_start..digits_end].parse::<u64>().ok()?;
        return Some((identity, start..digits_end));
    }
    None
}

/// The first `[text](target)` between the checkbox and the anchor.
fn scan_link(line: &str, body_start: usize, anchor: &Range<usize>) -> Field<LinkPart> {
    let region_end = anchor.start;
    let mut search_from = body_start;

    while let Some(offset) = line[search_from..region_end].find('[') {
        let open = search_from + offset;
        if let Some(part) = link_at(line, open, region_end) {
            return Field::Matched(part);
        }
        search_from = open + 1;
    }
    Field::Defaulted
}

/// Parse a link whose `[` sits at `open`. Brackets nest; `\` escapes.
fn link_at(line: &str, open: usize, region_end: usize) -> Option<LinkPart> {
    let mut depth = 0usize;
    let mut escaped = false;
    let mut close = None;

    for (index, ch) in line[open..region_end].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + index);
                    break;
                }
            }
            _ => {}
        }
    }

    let close = close?;
    let url_start = close + 1;
    if !line[url_start..region_end].starts_with('(') {
        return None;
    }
    let url_end = url_start + 1 + line[url_start + 1..region_end].find(')')?;

    Some(LinkPart {
        title: unescape_title(&line[open + 1..close]),
        url: line[url_start + 1..url_end].to_string(),
        span: open..url_end + 1,
    })
}

/// The first `(text#digits)` group after `from`, before the anchor.
fn scan_repository(line: &str, from: usize, anchor: &Range<usize>) -> Field<RepositoryPart> {
    let region_end = anchor.start.max(from);
    let mut search_from = from;

    while let Some(offset) = line[search_from..region_end].find('(') {
        let open = search_from + offset;
        let Some(close_offset) = line[open + 1..region_end].find(')') else {
            break;
        };
        let close = open + 1 + close_offset;
        let inner = &line[open + 1..close];

        if let Some((repository_ref, number)) = inner.rsplit_once('#') {
            let valid = !repository_ref.is_empty()
                && !number.is_empty()
                && number.bytes().all(|b| b.is_ascii_digit());
            if valid {
                if let Ok(sequence_number) = number.parse::<u64>() {
                    return Field::Matched(RepositoryPart {
                        repository_ref: repository_ref.to_string(),
                        sequence_number,
                        span: open..close + 1,
                    });
                }
            }
        }
        search_from = open + 1;
    }
    Field::Defaulted
}

fn date_field(annotations: &[AnnotationMatch], kind: AnnotationKind) -> Field<NaiveDate> {
    match first_of(annotations, kind) {
        Some(found) => Field::Matched(found.date),
        None => Field::Defaulted,
    }
}

/// Every `#token` outside the excluded spans. A token starts at the line start
/// or after whitespace and must contain something other than digits.
fn scan_tags(line: &str, excluded: &[Range<usize>]) -> Vec<String> {
    let mut tags = Vec::new();
    let mut previous: Option<char> = None;
    let mut indices = line.char_indices().peekable();

    while let Some((index, ch)) = indices.next() {
        let starts_token = ch == '#'
            && previous.map_or(true, char::is_whitespace)
            && !excluded.iter().any(|span| span.contains(&index));
        previous = Some(ch);
        if !starts_token {
            continue;
        }

        let body_start = index + ch.len_utf8();
        let mut body_end = body_start;
        while let Some(&(next_index, next)) = indices.peek() {
            if !is_tag_body_char(next) || excluded.iter().any(|span| span.contains(&next_index)) {
                break;
            }
            body_end = next_index + next.len_utf8();
            previous = Some(next);
            indices.next();
        }

        let body = &line[body_start..body_end];
        if !body.is_empty() && !body.bytes().all(|b| b.is_ascii_digit()) {
            tags.push(body.to_string());
        }
    }
    tags
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Escape characters that would end or nest the link text.
pub fn escape_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for ch in title.chars() {
        match ch {
            '\\' | '[' | ']' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' | '\r' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}

fn unescape_title(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "- [x] PR: [Fix \\[parser\\] bug](https://github.com/o/r/pull/5) (o/r#5) #github #needs-review ➕ 2024-01-02 ✅ 2024-01-05 ^gh-42";

    #[test]
    fn non_task_lines_are_not_scanned() {
        assert!(scan_line("Just prose").is_none());
        assert!(scan_line("- [ ] a task without an anchor").is_none());
        assert!(scan_line("- [?] [t](u) ^gh-1").is_none());
        assert!(scan_line("  - [ ] indented ^gh-1").is_none());
        assert!(scan_line("- [ ] overflow ^gh-99999999999999999999999").is_none());
    }

    #[test]
    fn full_line_matches_every_field() {
        let scan = scan_line(FULL).expect("line should scan");
        assert_eq!(scan.status, TaskStatus::Closed);
        assert_eq!(scan.identity, 42);
        assert_eq!(&FULL[scan.anchor.clone()], "^gh-42");
        assert_eq!(scan.kind, Field::Matched(TaskKind::PullRequest));

        let Field::Matched(link) = &scan.link else { panic!("link should match") };
        assert_eq!(link.title, "Fix [parser] bug");
        assert_eq!(link.url, "https://github.com/o/r/pull/5");

        let Field::Matched(repo) = &scan.repository else { panic!("repo should match") };
        assert_eq!(repo.repository_ref, "o/r");
        assert_eq!(repo.sequence_number, 5);

        assert_eq!(scan.created_at, Field::Matched(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
        assert_eq!(scan.closed_at, Field::Matched(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()));
        assert_eq!(scan.tags, vec!["github", "needs-review"]);
    }

    #[test]
    fn missing_parts_are_defaulted() {
        let scan = scan_line("- [ ] something odd ^gh-7").expect("line should scan");
        assert_eq!(scan.status, TaskStatus::Open);
        assert_eq!(scan.identity, 7);
        assert_eq!(scan.kind, Field::Defaulted);
        assert_eq!(scan.link, Field::Defaulted);
        assert_eq!(scan.repository, Field::Defaulted);
        assert_eq!(scan.created_at, Field::Defaulted);
        assert!(scan.tags.is_empty());
    }

    #[test]
    fn link_without_target_is_defaulted() {
        let scan = scan_line("- [ ] [half a link] (o/r#3) ^gh-8").expect("line should scan");
        assert_eq!(scan.link, Field::Defaulted);
        let Field::Matched(repo) = scan.repository else { panic!("repo should match") };
        assert_eq!(repo.repository_ref, "o/r");
    }

    #[test]
    fn hashes_inside_repository_and_link_are_not_tags() {
        let line = "- [ ] [Fix #12 crash](https://x/issues/12#top) (org/#repo#12) #real ^gh-3";
        let scan = scan_line(line).expect("line should scan");
        assert_eq!(scan.tags, vec!["real"]);
        let Field::Matched(repo) = scan.repository else { panic!("repo should match") };
        assert_eq!(repo.repository_ref, "org/#repo");
        assert_eq!(repo.sequence_number, 12);
    }

    #[test]
    fn numeric_and_glued_hashes_are_not_tags() {
        let scan = scan_line("- [ ] [t](u) (o/r#1) #123 a#b #ok/nested ^gh-3").unwrap();
        assert_eq!(scan.tags, vec!["ok/nested"]);
    }

    #[test]
    fn last_anchor_wins() {
        let scan = scan_line("- [ ] [see ^gh-1](u) (o/r#1) ^gh-2").unwrap();
        assert_eq!(scan.identity, 2);
    }

    #[test]
    fn uppercase_checkbox_is_closed() {
        let scan = scan_line("- [X] [t](u) (o/r#1) ^gh-2").unwrap();
        assert_eq!(scan.status, TaskStatus::Closed);
    }

    #[test]
    fn escape_title_round_trips_through_link() {
        let title = "a \\ b [c] d";
        let line = format!("- [ ] [{}](u) ^gh-1", escape_title(title));
        let Field::Matched(link) = scan_line(&line).unwrap().link else {
            panic!("link should match")
        };
        assert_eq!(link.title, title);
    }

    #[test]
    fn unescaped_nested_brackets_in_title_still_match() {
        let scan = scan_line("- [ ] [[WIP] thing](https://u) (o/r#2) ^gh-9").unwrap();
        let Field::Matched(link) = scan.link else { panic!("link should match") };
        assert_eq!(link.title, "[WIP] thing");
        assert_eq!(link.url, "https://u");
    }
}
