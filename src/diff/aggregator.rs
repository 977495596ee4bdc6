use crate::diff::quoting::unquote_path;
use crate::history::CommitRange;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// A path named by a diff marker line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedPath {
    pub path: String,
    pub binary: bool,
}

impl ChangedPath {
    pub fn text<S: Into<String>>(path: S) -> Self {
        Self {
            path: path.into(),
            binary: false,
        }
    }

    pub fn binary<S: Into<String>>(path: S) -> Self {
        Self {
            path: path.into(),
            binary: true,
        }
    }

    fn is_discarded(&self) -> bool {
        self.path.starts_with('/') || self.path.starts_with('.')
    }
}

fn binary_marker() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^(?:.*\s)?(?:"a/.*"|a/.*|/dev/null) and ("b/.*"|b/.*) differ$"#)
            .expect("binary marker pattern is valid")
    })
}

fn hunk_header() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^@@ -\d+(?:,(\d+))? \+\d+(?:,(\d+))? @@")
            .expect("hunk header pattern is valid")
    })
}

/// Lines still owed by the hunk being read. While any are owed, `+`, `-`
/// and ` ` lines are hunk content and never markers.
#[derive(Debug, Default, Clone, Copy)]
struct HunkBudget {
    old: u32,
    new: u32,
}

impl HunkBudget {
    fn from_header(line: &str) -> Option<Self> {
        let captures = hunk_header().captures(line)?;
        let count = |i: usize| {
            captures
                .get(i)
                .map_or(Some(1), |m| m.as_str().parse::<u32>().ok())
        };
        Some(Self {
            old: count(1)?,
            new: count(2)?,
        })
    }

    fn is_spent(&self) -> bool {
        self.old == 0 && self.new == 0
    }

    /// Charge one content line. Returns false when the line is not hunk content.
    fn consume(&mut self, line: &str) -> bool {
        match line.as_bytes().first().copied() {
            Some(b' ') if self.old > 0 && self.new > 0 => {
                self.old -= 1;
                self.new -= 1;
                true
            }
            Some(b'+') if self.new > 0 => {
                self.new -= 1;
                true
            }
            Some(b'-') if self.old > 0 => {
                self.old -= 1;
                true
            }
            Some(b'\\') => true,
            _ => false,
        }
    }
}

/// Strip the `b/` side prefix from a marker path, unquoting it first when git
/// wrote it C-quoted.
fn new_side_path(raw: &str) -> Option<String> {
    let path = if raw.starts_with('"') {
        unquote_path(raw)?.strip_prefix("b/")?.to_string()
    } else {
        raw.strip_prefix("b/")?.to_string()
    };

    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

fn parse_text_marker(line: &str) -> Option<ChangedPath> {
    let rest = line.strip_prefix("+++ ")?;
    // Anything after a tab is a timestamp or similar trailer
    let rest = rest.split('\t').next().unwrap_or(rest).trim_end_matches('\r');
    new_side_path(rest).map(ChangedPath::text)
}

fn parse_binary_marker(line: &str) -> Option<ChangedPath> {
    let line = line.trim_end_matches('\r');
    let captures = binary_marker().captures(line)?;
    new_side_path(captures.get(1)?.as_str()).map(ChangedPath::binary)
}

/// Collects the changed paths of a resolved commit range from per-commit
/// patch text.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffAggregator;

impl DiffAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Every marker line of one commit's patch text, in order, unfiltered.
    ///
    /// Lines that look like markers but cannot be parsed are skipped.
    pub fn scan_markers(&self, text: &str) -> Vec<ChangedPath> {
        let mut markers = Vec::new();
        let mut budget: Option<HunkBudget> = None;

        for line in text.lines() {
            if let Some(active) = budget.as_mut() {
                if active.consume(line) {
                    if active.is_spent() {
                        budget = None;
                    }
                    continue;
                }
                budget = None;
            }

            if line.starts_with("@@") {
                budget = HunkBudget::from_header(line).filter(|b| !b.is_spent());
                continue;
            }

            if let Some(marker) = parse_text_marker(line).or_else(|| parse_binary_marker(line)) {
                markers.push(marker);
            }
        }

        markers
    }

    /// Walk `range.ordered` and merge the markers of every commit into one
    /// ordered list.
    ///
    /// A marker naming the same path as the marker immediately before it is
    /// dropped, even across commit boundaries. Absolute and hidden paths are
    /// dropped. Repeats separated by another path are kept.
    pub fn aggregate(
        &self,
        range: &CommitRange,
        diff_text_by_commit: &HashMap<String, String>,
    ) -> Vec<ChangedPath> {
        let mut paths = Vec::new();
        let mut previous: Option<String> = None;

        for entry in &range.ordered {
            let Some(text) = diff_text_by_commit.get(&entry.id) else {
                tracing::warn!(commit = entry.short_id(), "no diff text for commit, skipping");
                continue;
            };

            let before = paths.len();
            for marker in self.scan_markers(text) {
                if previous.as_deref() == Some(marker.path.as_str()) {
                    continue;
                }
                previous = Some(marker.path.clone());

                if marker.is_discarded() {
                    tracing::trace!(path = %marker.path, "ignoring absolute or hidden path");
                    continue;
                }
                paths.push(marker);
            }

            tracing::debug!(
                commit = entry.short_id(),
                paths = paths.len() - before,
                "scanned commit"
            );
        }

        paths
    }
}
