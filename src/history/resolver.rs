use crate::error::{DsnPullError, Result};
use serde::{Deserialize, Serialize};

/// One entry of the commit log, as delivered newest-first by a [`ChangeSource`].
///
/// [`ChangeSource`]: crate::history::ChangeSource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEntry {
    pub id: String,
    pub date: String,
}

impl CommitEntry {
    pub fn new<I: Into<String>, D: Into<String>>(id: I, date: D) -> Self {
        Self {
            id: id.into(),
            date: date.into(),
        }
    }

    pub fn short_id(&self) -> &str {
        self.id.get(..7).unwrap_or(&self.id)
    }
}

/// The contiguous slice of history covering every matched target.
///
/// `ordered` keeps the log's newest-first order and runs from `newest` to
/// `oldest` inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRange {
    pub newest: CommitEntry,
    pub oldest: CommitEntry,
    pub ordered: Vec<CommitEntry>,
    /// Targets that were never seen before the scan ended.
    pub unmatched: Vec<String>,
}

impl CommitRange {
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.ordered.iter().map(|entry| entry.id.clone()).collect()
    }

    pub fn display_summary(&self) -> String {
        format!(
            "Range: {} ({}) .. {} ({}), {} commit(s)",
            self.newest.short_id(),
            self.newest.date,
            self.oldest.short_id(),
            self.oldest.date,
            self.ordered.len()
        )
    }
}

/// Turns an unordered set of commit ids into the minimal bounding range of a
/// newest-first log.
#[derive(Debug, Default, Clone, Copy)]
pub struct HistoryResolver;

impl HistoryResolver {
    pub fn new() -> Self {
        Self
    }

    /// Scan `log` newest to oldest, collecting entries from the first matched
    /// target through the last one.
    ///
    /// Entries seen before the first match never enter the range. Scanning
    /// stops as soon as every target has been seen; targets missing from the
    /// log are reported in [`CommitRange::unmatched`] rather than failing.
    ///
    /// # Errors
    ///
    /// Returns [`DsnPullError::NoTargetsMatched`] when `targets` is empty or
    /// none of them occur in `log`.
    pub fn resolve(&self, log: &[CommitEntry], targets: &[String]) -> Result<CommitRange> {
        if targets.is_empty() {
            return Err(DsnPullError::NoTargetsMatched { targets: Vec::new() });
        }

        let mut pending: Vec<&str> = targets.iter().map(String::as_str).collect();
        let mut newest: Option<&CommitEntry> = None;
        let mut oldest: Option<&CommitEntry> = None;
        let mut since_last_match: Vec<&CommitEntry> = Vec::new();
        let mut ordered = Vec::new();

        for entry in log {
            if pending.is_empty() {
                break;
            }

            let matched = pending.contains(&entry.id.as_str());
            if newest.is_none() && !matched {
                continue;
            }

            since_last_match.push(entry);

            if matched {
                // Drops repeated targets too, so a duplicate never matches twice.
                pending.retain(|target| *target != entry.id);
                newest.get_or_insert(entry);
                oldest = Some(entry);
                ordered.extend(since_last_match.drain(..).cloned());
                tracing::trace!(
                    commit = entry.short_id(),
                    remaining = pending.len(),
                    "target matched"
                );
            }
        }

        match (newest, oldest) {
            (Some(newest), Some(oldest)) => {
                let mut unmatched: Vec<String> = Vec::new();
                for target in pending {
                    if !unmatched.iter().any(|seen| seen == target) {
                        unmatched.push(target.to_string());
                    }
                }

                Ok(CommitRange {
                    newest: newest.clone(),
                    oldest: oldest.clone(),
                    ordered,
                    unmatched,
                })
            }
            _ => Err(DsnPullError::NoTargetsMatched {
                targets: targets.to_vec(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(ids: &[&str]) -> Vec<CommitEntry> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| CommitEntry::new(*id, format!("2024-01-{:02}", 30 - i)))
            .collect()
    }

    fn targets(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn ordered_ids(range: &CommitRange) -> Vec<&str> {
        range.ordered.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_single_target_starts_at_match() {
        let log = log(&["C3", "C2", "C1"]);

        let range = HistoryResolver::new().resolve(&log, &targets(&["C2"])).unwrap();
        assert_eq!(ordered_ids(&range), vec!["C2"]);
        assert_eq!(range.newest.id, "C2");
        assert_eq!(range.oldest.id, "C2");

        let range = HistoryResolver::new().resolve(&log, &targets(&["C1"])).unwrap();
        assert_eq!(ordered_ids(&range), vec!["C1"]);
    }

    #[test]
    fn test_range_spans_between_matches() {
        let log = log(&["C5", "C4", "C3", "C2", "C1"]);

        // User order does not matter
        let range = HistoryResolver::new().resolve(&log, &targets(&["C2", "C4"])).unwrap();
        assert_eq!(ordered_ids(&range), vec!["C4", "C3", "C2"]);
        assert_eq!(range.newest.id, "C4");
        assert_eq!(range.oldest.id, "C2");
        assert!(range.unmatched.is_empty());
    }

    #[test]
    fn test_range_is_contiguous_slice_containing_all_targets() {
        let log = log(&["C8", "C7", "C6", "C5", "C4", "C3", "C2", "C1"]);
        let wanted = targets(&["C3", "C7", "C5"]);

        let range = HistoryResolver::new().resolve(&log, &wanted).unwrap();
        let start = log.iter().position(|e| e == &range.ordered[0]).unwrap();
        assert_eq!(&log[start..start + range.len()], range.ordered.as_slice());
        for id in &wanted {
            assert!(range.ordered.iter().any(|e| &e.id == id));
        }
    }

    #[test]
    fn test_missing_targets_are_ignored() {
        let log = log(&["C3", "C2", "C1"]);

        let range = HistoryResolver::new()
            .resolve(&log, &targets(&["C2", "nope"]))
            .unwrap();
        assert_eq!(ordered_ids(&range), vec!["C2"]);
        assert_eq!(range.unmatched, vec!["nope"]);
    }

    #[test]
    fn test_no_match_is_not_found() {
        let log = log(&["C3", "C2", "C1"]);

        let result = HistoryResolver::new().resolve(&log, &targets(&["X1", "X2"]));
        match result {
            Err(DsnPullError::NoTargetsMatched { targets }) => assert_eq!(targets.len(), 2),
            other => panic!("expected NoTargetsMatched, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_targets_is_not_found() {
        let log = log(&["C1"]);
        assert!(matches!(
            HistoryResolver::new().resolve(&log, &[]),
            Err(DsnPullError::NoTargetsMatched { .. })
        ));
    }

    #[test]
    fn test_empty_log_is_not_found() {
        assert!(HistoryResolver::new().resolve(&[], &targets(&["C1"])).is_err());
    }

    #[test]
    fn test_duplicate_targets_collapse() {
        let log = log(&["C4", "C3", "C2", "C1"]);

        let deduped = HistoryResolver::new().resolve(&log, &targets(&["C3", "C2"])).unwrap();
        let duplicated = HistoryResolver::new()
            .resolve(&log, &targets(&["C3", "C2", "C3", "C2"]))
            .unwrap();
        assert_eq!(deduped, duplicated);
    }

    #[test]
    fn test_short_id_and_summary() {
        let entry = CommitEntry::new("0123456789abcdef", "2024-05-01 10:00:00 +0000");
        assert_eq!(entry.short_id(), "0123456");
        assert_eq!(CommitEntry::new("abc", "d").short_id(), "abc");

        let range = HistoryResolver::new()
            .resolve(&[entry.clone()], &["0123456789abcdef".to_string()])
            .unwrap();
        assert!(range.display_summary().contains("1 commit(s)"));
    }
}
