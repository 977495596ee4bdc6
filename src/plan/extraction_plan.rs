use serde::{Deserialize, Serialize};

/// A partitioned dataset and the members touched in the range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub members: Vec<String>,
}

impl Group {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Append `member` unless already present. Returns whether it was added.
    pub fn add_member(&mut self, member: &str) -> bool {
        if self.members.iter().any(|m| m == member) {
            return false;
        }
        self.members.push(member.to_string());
        true
    }

    /// Fold another group of the same name into this one, keeping first order.
    pub fn absorb(&mut self, other: Group) {
        debug_assert_eq!(self.name, other.name);
        for member in &other.members {
            self.add_member(member);
        }
    }

    /// `NAME MEMBER1 MEMBER2 ...`
    pub fn manifest_line(&self) -> String {
        std::iter::once(self.name.as_str())
            .chain(self.members.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What to extract: dataset groups plus plain hierarchical files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionPlan {
    pub groups: Vec<Group>,
    pub files: Vec<String>,
}

impl ExtractionPlan {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.files.is_empty()
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn member_count(&self) -> usize {
        self.groups.iter().map(|g| g.members.len()).sum()
    }

    pub fn display_summary(&self) -> String {
        format!(
            "{} dataset(s) with {} member(s), {} file(s)",
            self.groups.len(),
            self.member_count(),
            self.files.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_members_unique_in_first_order() {
        let mut group = Group::new("PROJ.SRC.COBOL");
        assert!(group.add_member("MEMBER2"));
        assert!(group.add_member("MEMBER1"));
        assert!(!group.add_member("MEMBER2"));
        assert_eq!(group.members, vec!["MEMBER2", "MEMBER1"]);
    }

    #[test]
    fn test_absorb_keeps_order() {
        let mut first = Group::new("A.B");
        first.add_member("M1");
        first.add_member("M2");

        let mut later = Group::new("A.B");
        later.add_member("M3");
        later.add_member("M1");

        first.absorb(later);
        assert_eq!(first.members, vec!["M1", "M2", "M3"]);
    }

    #[test]
    fn test_manifest_line() {
        let mut group = Group::new("PROJ.SRC.COBOL");
        assert_eq!(group.manifest_line(), "PROJ.SRC.COBOL");
        group.add_member("MEMBER1");
        group.add_member("MEMBER2");
        assert_eq!(group.manifest_line(), "PROJ.SRC.COBOL MEMBER1 MEMBER2");
    }

    #[test]
    fn test_plan_summary() {
        let mut group = Group::new("A.B");
        group.add_member("M1");
        let plan = ExtractionPlan {
            groups: vec![group],
            files: vec!["bin/tool".to_string()],
        };

        assert!(!plan.is_empty());
        assert_eq!(plan.member_count(), 1);
        assert!(plan.group("A.B").is_some());
        assert!(plan.group("A.C").is_none());
        assert_eq!(plan.display_summary(), "1 dataset(s) with 1 member(s), 1 file(s)");
        assert!(ExtractionPlan::default().is_empty());
    }
}
