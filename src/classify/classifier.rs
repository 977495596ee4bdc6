use crate::classify::name_validator::{check_syntax, NameValidator, Rejection, Verdict};
use crate::diff::ChangedPath;
use crate::plan::{ExtractionPlan, Group};
use std::collections::{HashMap, HashSet};

/// Result of classifying one path list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub plan: ExtractionPlan,
    /// Prefixes the catalog could not answer for, in first-seen order.
    pub ambiguous_names: Vec<String>,
}

/// Splits changed paths into dataset groups and plain files.
///
/// Paths are fed one at a time through [`observe`](Self::observe). Members
/// accumulate on a single current group which is flushed whenever the
/// prefix changes and once more by [`flush_pending`](Self::flush_pending).
pub struct PathClassifier<'a> {
    validator: &'a NameValidator<'a>,
    current: Option<Group>,
    groups: Vec<Group>,
    files: Vec<String>,
    seen_files: HashSet<String>,
    ambiguous_names: Vec<String>,
    verdicts: HashMap<String, Option<String>>,
}

fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.rfind('/') {
        Some(i) => {
            let suffix = &path[i + 1..];
            (&path[..i], (!suffix.is_empty()).then_some(suffix))
        }
        None => (path, None),
    }
}

impl<'a> PathClassifier<'a> {
    pub fn new(validator: &'a NameValidator<'a>) -> Self {
        Self {
            validator,
            current: None,
            groups: Vec::new(),
            files: Vec::new(),
            seen_files: HashSet::new(),
            ambiguous_names: Vec::new(),
            verdicts: HashMap::new(),
        }
    }

    /// Dataset name for `prefix`, or `None` when its paths are plain files.
    /// Definitive answers are cached per prefix; a failed probe is not, so
    /// the next path under the same prefix asks the catalog again.
    fn dataset_name(&mut self, prefix: &str) -> Option<String> {
        if let Some(name) = self.verdicts.get(prefix) {
            return name.clone();
        }

        let name = match self.validator.validate(prefix) {
            Verdict::Valid(status) => {
                tracing::trace!(prefix, ?status, "dataset prefix");
                check_syntax(prefix).ok().map(str::to_string)
            }
            Verdict::Invalid(Rejection::ProbeFailed { .. }) => {
                if !self.ambiguous_names.iter().any(|n| n == prefix) {
                    self.ambiguous_names.push(prefix.to_string());
                }
                return None;
            }
            Verdict::Invalid(rejection) => {
                tracing::trace!(prefix, %rejection, "not a dataset");
                None
            }
        };

        self.verdicts.insert(prefix.to_string(), name.clone());
        name
    }

    pub fn observe(&mut self, path: &str) {
        let (prefix, member) = split_path(path);

        let Some(name) = self.dataset_name(prefix) else {
            if self.seen_files.insert(path.to_string()) {
                self.files.push(path.to_string());
            }
            return;
        };

        if self.current.as_ref().map(|g| g.name.as_str()) != Some(name.as_str()) {
            self.flush_pending();
            self.current = Some(Group::new(name));
        }

        if let (Some(group), Some(member)) = (self.current.as_mut(), member) {
            group.add_member(member);
        }
    }

    /// Move the current group into the finished list, merging it into an
    /// earlier group of the same name. Never touches `files`.
    pub fn flush_pending(&mut self) {
        let Some(group) = self.current.take() else {
            return;
        };

        match self.groups.iter_mut().find(|g| g.name == group.name) {
            Some(existing) => existing.absorb(group),
            None => self.groups.push(group),
        }
    }

    pub fn finish(mut self) -> Classification {
        self.flush_pending();
        Classification {
            plan: ExtractionPlan {
                groups: self.groups,
                files: self.files,
            },
            ambiguous_names: self.ambiguous_names,
        }
    }

    pub fn classify(mut self, paths: &[ChangedPath]) -> Classification {
        for changed in paths {
            self.observe(&changed.path);
        }
        self.finish()
    }
}
