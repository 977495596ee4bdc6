use crate::history::CommitRange;
use crate::plan::ExtractionPlan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSummary {
    pub newest: String,
    pub newest_date: String,
    pub oldest: String,
    pub oldest_date: String,
    pub commit_count: usize,
}

impl From<&CommitRange> for RangeSummary {
    fn from(range: &CommitRange) -> Self {
        Self {
            newest: range.newest.id.clone(),
            newest_date: range.newest.date.clone(),
            oldest: range.oldest.id.clone(),
            oldest_date: range.oldest.date.clone(),
            commit_count: range.len(),
        }
    }
}

/// Everything one run produced, ready to be printed or written as `plan.json`.
///
/// `range` is `None` when no target named a commit in the history; the plan
/// is then empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub range: Option<RangeSummary>,
    pub changed_paths: usize,
    pub plan: ExtractionPlan,
    pub ambiguous_names: Vec<String>,
    pub unresolved_targets: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl ExtractionReport {
    pub fn new(range: &CommitRange, changed_paths: usize, plan: ExtractionPlan) -> Self {
        Self {
            range: Some(RangeSummary::from(range)),
            changed_paths,
            plan,
            ambiguous_names: Vec::new(),
            unresolved_targets: range.unmatched.clone(),
            generated_at: Utc::now(),
        }
    }

    /// Empty plan for a run where none of `targets` matched.
    pub fn nothing_to_do(targets: &[String]) -> Self {
        Self {
            range: None,
            changed_paths: 0,
            plan: ExtractionPlan::default(),
            ambiguous_names: Vec::new(),
            unresolved_targets: targets.to_vec(),
            generated_at: Utc::now(),
        }
    }

    pub fn with_ambiguous_names(mut self, names: Vec<String>) -> Self {
        self.ambiguous_names = names;
        self
    }

    pub fn has_warnings(&self) -> bool {
        !self.ambiguous_names.is_empty() || !self.unresolved_targets.is_empty()
    }
}
