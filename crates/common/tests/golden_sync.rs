use ghtasks_common::document::{assemble, SectionBatch};
use ghtasks_common::settings::SyncSettings;
use ghtasks_common::types::{Category, RemoteItem, SectionSpec};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
struct GoldenCase {
    name: String,
    before: String,
    after: String,
    settings: SyncSettings,
    batches: Vec<SectionBatch>,
}

#[derive(Debug, Deserialize)]
struct RemoteSection {
    category: Category,
    #[serde(default)]
    header: Option<String>,
    #[serde(default)]
    items: Vec<RemoteItem>,
}

impl From<RemoteSection> for SectionBatch {
    fn from(value: RemoteSection) -> Self {
        let spec = SectionSpec::new(value.category);
        let spec = match value.header {
            Some(header) => spec.with_header(header),
            None => spec,
        };
        SectionBatch::new(spec, value.items)
    }
}

#[test]
fn sync_golden_cases() {
    let cases_dir = golden_cases_dir();
    let cases = load_cases(&cases_dir);

    assert!(!cases.is_empty(), "no golden cases found in {}", cases_dir.display());

    let mut failures = Vec::new();
    for case in cases {
        if let Err(message) = run_case(&case) {
            failures.push(message);
        }
    }

    if !failures.is_empty() {
        panic!("{} golden case(s) failed:\n\n{}", failures.len(), failures.join("\n\n"));
    }
}

fn golden_cases_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/golden/cases")
}

fn load_cases(cases_dir: &Path) -> Vec<GoldenCase> {
    let mut case_dirs: Vec<PathBuf> = fs::read_dir(cases_dir)
        .unwrap_or_else(|error| panic!("failed to read {}: {error}", cases_dir.display()))
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            if path.is_dir() {
                Some(path)
            } else {
                None
            }
        })
        .collect();
    case_dirs.sort();
    case_dirs.into_iter().map(load_case).collect()
}

fn load_case(case_dir: PathBuf) -> GoldenCase {
    let name = case_dir
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("<unnamed-case>")
        .to_owned();

    let before = read_required(&case_dir.join("before.md"));
    let after = read_required(&case_dir.join("after.md"));

    let remote_path = case_dir.join("remote.json");
    let remote: Vec<RemoteSection> = serde_json::from_str(&read_required(&remote_path))
        .unwrap_or_else(|error| panic!("failed to parse {}: {error}", remote_path.display()));

    let settings_path = case_dir.join("settings.json");
    let settings = if settings_path.exists() {
        serde_json::from_str(&read_required(&settings_path))
            .unwrap_or_else(|error| panic!("failed to parse {}: {error}", settings_path.display()))
    } else {
        SyncSettings::default()
    };

    GoldenCase {
        name,
        before,
        after,
        settings,
        batches: remote.into_iter().map(Into::into).collect(),
    }
}

fn run_case(case: &GoldenCase) -> Result<(), String> {
    let first = assemble(&case.before, &case.batches, &case.settings)
        .map_err(|error| format!("case `{}` rejected: {error}", case.name))?;

    if first.text != case.after {
        return Err(format!(
            "case `{}` markdown mismatch.\n{}",
            case.name,
            render_line_diff(&case.after, &first.text)
        ));
    }

    let second = assemble(&first.text, &case.batches, &case.settings)
        .map_err(|error| format!("case `{}` rejected on second pass: {error}", case.name))?;
    if second.changed {
        return Err(format!(
            "case `{}` is not stable on a second pass.\n{}",
            case.name,
            render_line_diff(&first.text, &second.text)
        ));
    }

    Ok(())
}

fn render_line_diff(expected: &str, actual: &str) -> String {
    let expected_lines: Vec<&str> = expected.split('\n').collect();
    let actual_lines: Vec<&str> = actual.split('\n').collect();
    let max_len = expected_lines.len().max(actual_lines.len());

    let mut diff_lines = Vec::with_capacity(max_len);
    for index in 0..max_len {
        let expected_line = expected_lines.get(index).copied().unwrap_or("<none>");
        let actual_line = actual_lines.get(index).copied().unwrap_or("<none>");
        let marker = if expected_line == actual_line { " " } else { "!" };
        diff_lines.push(format!(
            "{marker} [{index}] expected: {expected_line:?}\n      actual:   {actual_line:?}"
        ));
    }
    diff_lines.join("\n")
}

fn read_required(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|error| panic!("failed to read {}: {error}", path.display()))
}
