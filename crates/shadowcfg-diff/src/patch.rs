//! Line-level patches: computing them and rendering them as unified diffs.
//!
//! Uses the `similar` crate (Myers diff algorithm) to produce structured
//! hunks with context lines. Lines keep their terminators, so a missing
//! newline at end of file survives a diff/apply cycle.

use similar::{ChangeTag, TextDiff};

/// Context lines per hunk, as `diff -u` uses.
pub const DEFAULT_CONTEXT: usize = 3;

/// A set of hunks that turns one text into another.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Patch {
    pub hunks: Vec<Hunk>,
}

impl Patch {
    /// Returns `true` if the two inputs were identical.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Total number of lines added across all hunks.
    pub fn additions(&self) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| matches!(l, PatchLine::Added(_)))
            .count()
    }

    /// Total number of lines removed across all hunks.
    pub fn deletions(&self) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| matches!(l, PatchLine::Removed(_)))
            .count()
    }

    /// Render in unified diff format.
    pub fn to_unified(&self, old_label: &str, new_label: &str) -> String {
        let mut out = format!("--- {old_label}\n+++ {new_label}\n");
        for hunk in &self.hunks {
            out.push_str(&format!(
                "@@ -{} +{} @@\n",
                unified_range(hunk.old_start, hunk.old_len),
                unified_range(hunk.new_start, hunk.new_len)
            ));
            for line in &hunk.lines {
                let (prefix, text) = match line {
                    PatchLine::Context(t) => (' ', t),
                    PatchLine::Added(t) => ('+', t),
                    PatchLine::Removed(t) => ('-', t),
                };
                out.push(prefix);
                out.push_str(text);
                if !text.ends_with('\n') {
                    out.push_str("\n\\ No newline at end of file\n");
                }
            }
        }
        out
    }
}

/// A contiguous region of changes with surrounding context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hunk {
    /// 0-based index of the first old line covered by this hunk.
    pub old_start: usize,
    /// Number of old lines (context + removed).
    pub old_len: usize,
    /// 0-based index of the first new line covered by this hunk.
    pub new_start: usize,
    /// Number of new lines (context + added).
    pub new_len: usize,
    pub lines: Vec<PatchLine>,
}

impl Hunk {
    /// Lines the target must contain for this hunk to apply.
    pub fn old_side(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| match l {
            PatchLine::Context(t) | PatchLine::Removed(t) => Some(t.as_str()),
            PatchLine::Added(_) => None,
        })
    }

    /// Lines that replace the old side.
    pub fn new_side(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| match l {
            PatchLine::Context(t) | PatchLine::Added(t) => Some(t.as_str()),
            PatchLine::Removed(_) => None,
        })
    }
}

/// A single line in a hunk, terminator included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchLine {
    /// A line present in both old and new (context).
    Context(String),
    /// A line added in the new content.
    Added(String),
    /// A line removed from the old content.
    Removed(String),
}

/// Compute the patch that turns `old` into `new`.
pub fn diff_lines(old: &str, new: &str, context: usize) -> Patch {
    if old == new {
        return Patch::default();
    }

    let text_diff = TextDiff::from_lines(old, new);
    let mut hunks = Vec::new();

    for group in text_diff.grouped_ops(context) {
        let Some(first) = group.first() else {
            continue;
        };
        let mut hunk = Hunk {
            old_start: first.old_range().start,
            old_len: 0,
            new_start: first.new_range().start,
            new_len: 0,
            lines: Vec::new(),
        };

        for op in &group {
            for change in text_diff.iter_changes(op) {
                let text = change.value().to_string();
                match change.tag() {
                    ChangeTag::Equal => {
                        hunk.lines.push(PatchLine::Context(text));
                        hunk.old_len += 1;
                        hunk.new_len += 1;
                    }
                    ChangeTag::Delete => {
                        hunk.lines.push(PatchLine::Removed(text));
                        hunk.old_len += 1;
                    }
                    ChangeTag::Insert => {
                        hunk.lines.push(PatchLine::Added(text));
                        hunk.new_len += 1;
                    }
                }
            }
        }
        hunks.push(hunk);
    }

    Patch { hunks }
}

/// `start,len` in unified notation: 1-based, except that an empty range
/// names the line before it.
fn unified_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_no_hunks() {
        let patch = diff_lines("a\nb\n", "a\nb\n", DEFAULT_CONTEXT);
        assert!(patch.is_empty());
        assert_eq!(patch.additions(), 0);
        assert_eq!(patch.deletions(), 0);
    }

    #[test]
    fn modification_shows_remove_and_add() {
        let patch = diff_lines("ssid=home\n", "ssid=office\n", DEFAULT_CONTEXT);
        assert_eq!(patch.hunks.len(), 1);
        assert_eq!(patch.additions(), 1);
        assert_eq!(patch.deletions(), 1);
    }

    #[test]
    fn hunk_positions_and_context() {
        let old = "a\nb\nc\nd\ne\nf\ng\nh\ni\nj\n";
        let new = "a\nb\nc\nd\nX\nf\ng\nh\ni\nj\n";
        let patch = diff_lines(old, new, DEFAULT_CONTEXT);
        assert_eq!(patch.hunks.len(), 1);

        let hunk = &patch.hunks[0];
        assert_eq!(hunk.old_start, 1);
        assert_eq!(hunk.old_len, 7);
        assert_eq!(hunk.new_len, 7);
        let old_side: Vec<_> = hunk.old_side().collect();
        assert_eq!(old_side, vec!["b\n", "c\n", "d\n", "e\n", "f\n", "g\n", "h\n"]);
        let new_side: Vec<_> = hunk.new_side().collect();
        assert_eq!(new_side[3], "X\n");
    }

    #[test]
    fn distant_changes_split_into_hunks() {
        let old: String = (0..30).map(|i| format!("k{i}=v\n")).collect();
        let new = old.replace("k2=v\n", "k2=w\n").replace("k25=v\n", "k25=w\n");
        let patch = diff_lines(&old, &new, DEFAULT_CONTEXT);
        assert_eq!(patch.hunks.len(), 2);

        let joined = diff_lines(&old, &new, 20);
        assert_eq!(joined.hunks.len(), 1);
    }

    #[test]
    fn unified_rendering() {
        let patch = diff_lines("a\nb\nc\n", "a\nB\nc\n", 1);
        let text = patch.to_unified("a/x.base", "b/x.conf");
        assert_eq!(
            text,
            "--- a/x.base\n+++ b/x.conf\n@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n"
        );
    }

    #[test]
    fn unified_marks_missing_newline() {
        let patch = diff_lines("a\n", "a\nb", 0);
        let text = patch.to_unified("old", "new");
        assert_eq!(
            text,
            "--- old\n+++ new\n@@ -1,0 +2 @@\n+b\n\\ No newline at end of file\n"
        );
    }

    #[test]
    fn empty_to_content() {
        let patch = diff_lines("", "new content\n", DEFAULT_CONTEXT);
        assert_eq!(patch.additions(), 1);
        assert_eq!(patch.hunks[0].old_len, 0);
        assert!(patch.to_unified("o", "n").contains("@@ -0,0 +1 @@"));
    }

    #[test]
    fn content_to_empty() {
        let patch = diff_lines("old content\n", "", DEFAULT_CONTEXT);
        assert_eq!(patch.deletions(), 1);
        assert_eq!(patch.hunks[0].new_len, 0);
    }
}
