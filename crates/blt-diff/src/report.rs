//! Line-level report: the outline renderings of two trees, diffed.
//!
//! Uses the `similar` crate (Myers diff algorithm) to produce hunks with
//! context lines, for a human looking at why two logs are not equivalent.

use std::fmt;

use blt_text::outline;
use blt_tree::Tree;
use similar::{ChangeTag, TextDiff};

const CONTEXT_LINES: usize = 3;

/// The result of diffing two outline renderings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// Changed regions, in order.
    pub hunks: Vec<Hunk>,
    /// Lines in the left outline.
    pub left_lines: usize,
    /// Lines in the right outline.
    pub right_lines: usize,
}

impl Report {
    /// Returns `true` if both outlines are identical.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Number of lines only on the right.
    pub fn additions(&self) -> usize {
        self.lines()
            .filter(|l| matches!(l, ReportLine::Added(_)))
            .count()
    }

    /// Number of lines only on the left.
    pub fn deletions(&self) -> usize {
        self.lines()
            .filter(|l| matches!(l, ReportLine::Removed(_)))
            .count()
    }

    fn lines(&self) -> impl Iterator<Item = &ReportLine> {
        self.hunks.iter().flat_map(|h| &h.lines)
    }
}

/// A contiguous region of changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based start line in the left outline.
    pub left_start: usize,
    /// Left lines covered by the hunk.
    pub left_count: usize,
    /// 1-based start line in the right outline.
    pub right_start: usize,
    /// Right lines covered by the hunk.
    pub right_count: usize,
    /// Lines of the hunk in output order.
    pub lines: Vec<ReportLine>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportLine {
    Context(String),
    Added(String),
    Removed(String),
}

/// Diff the outline renderings of two trees.
pub fn render_report(left: &Tree, right: &Tree) -> Report {
    let left_text = outline::render(left);
    let right_text = outline::render(right);
    let left_lines = left_text.lines().count();
    let right_lines = right_text.lines().count();

    if left_text == right_text {
        return Report {
            hunks: Vec::new(),
            left_lines,
            right_lines,
        };
    }

    let diff = TextDiff::from_lines(&left_text, &right_text);
    let mut hunks = Vec::new();

    for group in diff.grouped_ops(CONTEXT_LINES) {
        let Some(first) = group.first() else {
            continue;
        };
        let mut hunk = Hunk {
            left_start: first.old_range().start + 1,
            left_count: 0,
            right_start: first.new_range().start + 1,
            right_count: 0,
            lines: Vec::new(),
        };

        for op in &group {
            for change in diff.iter_changes(op) {
                let text = change.value().trim_end_matches('\n').to_string();
                match change.tag() {
                    ChangeTag::Equal => {
                        hunk.lines.push(ReportLine::Context(text));
                        hunk.left_count += 1;
                        hunk.right_count += 1;
                    }
                    ChangeTag::Delete => {
                        hunk.lines.push(ReportLine::Removed(text));
                        hunk.left_count += 1;
                    }
                    ChangeTag::Insert => {
                        hunk.lines.push(ReportLine::Added(text));
                        hunk.right_count += 1;
                    }
                }
            }
        }
        hunks.push(hunk);
    }

    Report {
        hunks,
        left_lines,
        right_lines,
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for hunk in &self.hunks {
            writeln!(
                f,
                "@@ -{},{} +{},{} @@",
                hunk.left_start, hunk.left_count, hunk.right_start, hunk.right_count
            )?;
            for line in &hunk.lines {
                match line {
                    ReportLine::Context(text) => writeln!(f, " {text}")?,
                    ReportLine::Removed(text) => writeln!(f, "-{text}")?,
                    ReportLine::Added(text) => writeln!(f, "+{text}")?,
                }
            }
        }
        Ok(())
    }
}
