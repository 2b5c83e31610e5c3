use std::ops::Range;

use serde::Serialize;

use crate::task::codec::decode;
use crate::types::{SectionSpec, TaskRecord};

/// A managed section found in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub header: String,
    /// `[start, end)`: `start` is the header line, `end` the next heading or end of document.
    pub range: Range<usize>,
    /// Task records decoded from the lines after the header, in document order.
    pub records: Vec<TaskRecord>,
}

impl Section {
    /// Lines owned by the section, excluding the header.
    pub fn body(&self) -> Range<usize> {
        self.range.start + 1..self.range.end
    }
}

/// Find each configured section in one pass over `lines`.
///
/// Returns one slot per spec, in spec order; `None` when the header is absent.
/// A header matches when the line equals it up to trailing whitespace; the
/// first match wins. A section ends at the next `# `/`## ` heading or the next
/// managed header, whichever comes first.
pub fn locate_sections(lines: &[&str], specs: &[SectionSpec]) -> Vec<Option<Section>> {
    let mut starts: Vec<Option<usize>> = vec![None; specs.len()];
    let mut boundaries: Vec<usize> = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let text = line.trim_end();
        let mut managed = false;
        for (slot, spec) in specs.iter().enumerate() {
            if text == spec.header.trim_end() {
                managed = true;
                if starts[slot].is_none() {
                    starts[slot] = Some(index);
                }
            }
        }
        if managed || is_boundary(line) {
            boundaries.push(index);
        }
    }

    specs
        .iter()
        .zip(starts)
        .map(|(spec, start)| {
            let start = start?;
            let end = boundaries.iter().copied().find(|&b| b > start).unwrap_or(lines.len());
            let records = lines[start + 1..end].iter().filter_map(|line| decode(line)).collect();
            Some(Section { header: spec.header.clone(), range: start..end, records })
        })
        .collect()
}

/// Level-1 or level-2 ATX heading.
fn is_boundary(line: &str) -> bool {
    line.starts_with("# ") || line.starts_with("## ")
}
