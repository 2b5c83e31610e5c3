// `ghtasks sections` — list managed sections and the tasks under them.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use ghtasks_common::section::locate_sections;
use ghtasks_common::types::{Category, SectionSpec, TaskRecord};

use super::{resolve_note, GlobalArgs};
use crate::output::{self, OutputFormat};
use crate::sync::read_note;

#[derive(Debug, Args)]
pub struct SectionsArgs {
    /// Tasks note to inspect (defaults to the configured note).
    #[arg(long, value_name = "PATH")]
    pub note: Option<PathBuf>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionsResult {
    pub note: String,
    pub sections: Vec<SectionListing>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionListing {
    pub category: Category,
    pub header: String,
    /// 1-based line of the header; `None` when the section is not in the note yet.
    pub line: Option<usize>,
    pub tasks: Vec<TaskRecord>,
}

pub fn run(args: SectionsArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match list(&args, global) {
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

fn list(args: &SectionsArgs, global: &GlobalArgs) -> anyhow::Result<SectionsResult> {
    let config = global.load_config()?;
    let note = resolve_note(&config, args.note.as_deref())?;
    let document = read_note(&note)?;
    Ok(SectionsResult {
        note: note.display().to_string(),
        sections: listings(&document, &config.section_specs()),
    })
}

fn listings(document: &str, specs: &[SectionSpec]) -> Vec<SectionListing> {
    let lines: Vec<&str> = document.lines().collect();
    specs
        .iter()
        .zip(locate_sections(&lines, specs))
        .map(|(spec, found)| {
            let (line, tasks) = match found {
                Some(section) => (
                    Some(section.range.start + 1),
                    section
                        .records
                        .into_iter()
                        .map(|record| TaskRecord { source_line: None, ..record })
                        .collect(),
                ),
                None => (None, Vec::new()),
            };
            SectionListing { category: spec.category, header: spec.header.clone(), line, tasks }
        })
        .collect()
}

fn format_human(result: &SectionsResult) -> String {
    let mut lines = Vec::new();
    let present = result.sections.iter().filter(|s| s.line.is_some()).count();
    lines.push(format!("{}: {present} of {} section(s) present", result.note, result.sections.len()));

    for section in &result.sections {
        let Some(line) = section.line else {
            lines.push(format!("  {} (missing)", section.header));
            continue;
        };
        lines.push(format!("  {} (line {line}, {} task(s))", section.header, section.tasks.len()));
        for task in &section.tasks {
            let mark = if task.status.is_closed() { 'x' } else { ' ' };
            lines.push(format!(
                "    [{mark}] {}#{} {}",
                task.repository_ref, task.sequence_number, task.title
            ));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghtasks_common::types::default_sections;

    const NOTE: &str = "\
# Tasks

## Issues assigned to me
- [ ] [Fix bug](https://github.com/o/r/issues/5) (o/r#5) ^gh-42
- [x] [Old bug](https://github.com/o/r/issues/3) (o/r#3) ^gh-41
some prose

## PRs opened by me
";

    #[test]
    fn lists_present_and_missing_sections() {
        let sections = listings(NOTE, &default_sections());
        assert_eq!(sections.len(), 3);

        assert_eq!(sections[0].line, Some(3));
        assert_eq!(sections[0].tasks.len(), 2);
        assert_eq!(sections[0].tasks[0].identity, 42);
        assert!(sections[0].tasks[1].status.is_closed());
        assert!(sections[0].tasks.iter().all(|t| t.source_line.is_none()));

        assert_eq!(sections[1].line, None);
        assert_eq!(sections[2].line, Some(8));
        assert!(sections[2].tasks.is_empty());
    }

    #[test]
    fn human_format_shows_tasks() {
        let result = SectionsResult {
            note: "Tasks.md".into(),
            sections: listings(NOTE, &default_sections()),
        };
        let output = format_human(&result);
        assert!(output.contains("Tasks.md: 2 of 3 section(s) present"));
        assert!(output.contains("## Issues assigned to me (line 3, 2 task(s))"));
        assert!(output.contains("[ ] o/r#5 Fix bug"));
        assert!(output.contains("[x] o/r#3 Old bug"));
        assert!(output.contains("## PRs assigned to me (missing)"));
    }

    #[test]
    fn json_format_has_line_and_tasks() {
        let result = SectionsResult {
            note: "Tasks.md".into(),
            sections: listings(NOTE, &default_sections()),
        };
        let mut buf = Vec::new();
        output::write_output(&mut buf, OutputFormat::Json, &result, format_human).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed["sections"][0]["category"], "assigned_issues");
        assert_eq!(parsed["sections"][0]["tasks"][0]["identity"], 42);
        assert!(parsed["sections"][1]["line"].is_null());
    }
}
