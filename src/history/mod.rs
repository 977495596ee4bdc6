pub mod git_source;
pub mod resolver;

pub use git_source::{ChangeSource, GitChangeSource};
pub use resolver::{CommitEntry, CommitRange, HistoryResolver};
