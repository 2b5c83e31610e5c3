// Date annotations in both dialects.
//
// Emoji:     `➕ 2024-01-31`            `✅ 2024-02-01`
// Key-value: `[created:: 2024-01-31]`  `[completion:: 2024-02-01]`

use std::ops::Range;

use chrono::NaiveDate;

use crate::settings::RenderDialect;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Created,
    Completion,
}

impl AnnotationKind {
    const fn emoji(self) -> &'static str {
        match self {
            Self::Created => "➕",
            Self::Completion => "✅",
        }
    }

    const fn key(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Completion => "completion",
        }
    }
}

/// An annotation recognized in a line, with its byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationMatch {
    pub kind: AnnotationKind,
    pub date: NaiveDate,
    pub span: Range<usize>,
}

pub fn render(kind: AnnotationKind, date: NaiveDate, dialect: RenderDialect) -> String {
    let date = date.format(DATE_FORMAT);
    match dialect {
        RenderDialect::Emoji => format!("{} {date}", kind.emoji()),
        RenderDialect::KeyValue => format!("[{}:: {date}]", kind.key()),
    }
}

/// All annotations in `line`, of either dialect, ordered by position.
pub fn find_annotations(line: &str) -> Vec<AnnotationMatch> {
    let mut found = Vec::new();
    for kind in [AnnotationKind::Created, AnnotationKind::Completion] {
        for (start, marker) in line.match_indices(kind.emoji()) {
            if let Some((date, end)) = date_after(line, start + marker.len()) {
                found.push(AnnotationMatch { kind, date, span: start..end });
            }
        }

        let opener = format!("[{}::", kind.key());
        for (start, marker) in line.match_indices(opener.as_str()) {
            let Some((date, date_end)) = date_after(line, start + marker.len()) else {
                continue;
            };
            let rest = &line[date_end..];
            let trimmed = rest.trim_start_matches(' ');
            if trimmed.starts_with(']') {
                let end = date_end + (rest.len() - trimmed.len()) + 1;
                found.push(AnnotationMatch { kind, date, span: start..end });
            }
        }
    }
    found.sort_by_key(|m| m.span.start);
    found
}

/// First annotation of `kind`, by position.
pub fn first_of(matches: &[AnnotationMatch], kind: AnnotationKind) -> Option<&AnnotationMatch> {
    matches.iter().find(|m| m.kind == kind)
}

/// Parse a `YYYY-MM-DD` date after optional spaces at `offset`. Returns the
/// date and the byte offset just past it.
fn date_after(line: &str, offset: usize) -> Option<(NaiveDate, usize)> {
    let rest = line.get(offset..)?;
    let trimmed = rest.trim_start_matches(' ');
    let start = offset + (rest.len() - trimmed.len());
    let candidate = trimmed.get(..DATE_LEN)?;

    let shape_ok = candidate.char_indices().all(|(index, ch)| match index {
        4 | 7 => ch == '-',
        _ => ch.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    let date = NaiveDate::parse_from_str(candidate, DATE_FORMAT).ok()?;
    Some((date, start + DATE_LEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn renders_both_dialects() {
        let day = date(2024, 3, 9);
        assert_eq!(render(AnnotationKind::Created, day, RenderDialect::Emoji), "➕ 2024-03-09");
        assert_eq!(render(AnnotationKind::Completion, day, RenderDialect::Emoji), "✅ 2024-03-09");
        assert_eq!(
            render(AnnotationKind::Created, day, RenderDialect::KeyValue),
            "[created:: 2024-03-09]"
        );
        assert_eq!(
            render(AnnotationKind::Completion, day, RenderDialect::KeyValue),
            "[completion:: 2024-03-09]"
        );
    }

    #[test]
    fn finds_annotations_of_mixed_dialects_in_order() {
        let line = "- [x] a [completion:: 2024-02-01] ➕ 2024-01-31 ^gh-1";
        let found = find_annotations(line);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, AnnotationKind::Completion);
        assert_eq!(found[0].date, date(2024, 2, 1));
        assert_eq!(&line[found[0].span.clone()], "[completion:: 2024-02-01]");
        assert_eq!(found[1].kind, AnnotationKind::Created);
        assert_eq!(&line[found[1].span.clone()], "➕ 2024-01-31");
    }

    #[test]
    fn first_match_wins_per_kind() {
        let line = "[created:: 2023-05-01] ➕ 2024-01-31";
        let found = find_annotations(line);
        let created = first_of(&found, AnnotationKind::Created).unwrap();
        assert_eq!(created.date, date(2023, 5, 1));
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(find_annotations("➕ 2024-1-31").is_empty());
        assert!(find_annotations("➕ 2024-02-30").is_empty());
        assert!(find_annotations("[created:: 2024-01-31").is_empty());
        assert!(find_annotations("✅").is_empty());
    }
}
