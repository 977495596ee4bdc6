use crate::config::GitConfig;
use crate::error::{DsnPullError, Result};
use crate::history::resolver::CommitEntry;
use chrono::{FixedOffset, Offset, TimeZone, Utc};
use git2::{Delta, DiffFindOptions, DiffFormat, DiffOptions, ErrorCode, Oid, Repository, Sort};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Read access to the version-control history the planner works from.
///
/// The planner only ever consumes text: a newest-first log and the patch
/// text of individual commits. Implementations own every git invocation.
pub trait ChangeSource: Send + Sync {
    /// The full accessible history, newest first.
    fn commit_log(&self) -> Result<Vec<CommitEntry>>;

    /// Resolve a tag, branch, or abbreviated hash to a full commit id.
    ///
    /// Returns `Ok(None)` when the reference does not name a commit.
    fn resolve_reference(&self, reference: &str) -> Result<Option<String>>;

    /// Patch text of a single commit against its first parent.
    fn diff_text(&self, commit_id: &str) -> Result<String>;

    /// Patch text for several commits, keyed by commit id.
    fn diff_texts(
        &self,
        commit_ids: &[String],
        on_fetched: &(dyn Fn(&str) + Sync),
    ) -> Result<HashMap<String, String>> {
        let mut texts = HashMap::with_capacity(commit_ids.len());
        for id in commit_ids {
            let text = self.diff_text(id)?;
            on_fetched(id);
            texts.insert(id.clone(), text);
        }
        Ok(texts)
    }
}

/// [`ChangeSource`] backed by a local repository through libgit2.
#[derive(Debug, Clone)]
pub struct GitChangeSource {
    git_dir: PathBuf,
    revision: String,
    all_refs: bool,
    context_lines: u32,
    detect_renames: bool,
}

impl GitChangeSource {
    pub fn open(config: &GitConfig) -> Result<Self> {
        let repo = Repository::discover(&config.repository).map_err(|_| {
            DsnPullError::RepositoryNotFound {
                path: config.repository.display().to_string(),
            }
        })?;

        Ok(Self {
            git_dir: repo.path().to_path_buf(),
            revision: config.revision.clone(),
            all_refs: config.all_refs,
            context_lines: config.context_lines,
            detect_renames: config.detect_renames,
        })
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn repository(&self) -> Result<Repository> {
        Repository::open(&self.git_dir).map_err(|_| DsnPullError::RepositoryNotFound {
            path: self.git_dir.display().to_string(),
        })
    }

    fn render_diff(&self, repo: &Repository, commit_id: &str) -> Result<String> {
        let oid = Oid::from_str(commit_id).map_err(|_| DsnPullError::InvalidReference {
            reference: commit_id.to_string(),
        })?;
        let commit = repo.find_commit(oid)?;
        let tree = commit.tree()?;

        // Merges are shown against their first parent
        let parent_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0)?.tree()?)
        } else {
            None
        };

        let mut opts = DiffOptions::new();
        opts.context_lines(self.context_lines);

        let mut diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;

        if self.detect_renames {
            let mut find = DiffFindOptions::new();
            find.renames(true).copies(true);
            diff.find_similar(Some(&mut find))?;
        }

        let mut text = String::new();
        diff.print(DiffFormat::Patch, |delta, _hunk, line| {
            if !is_reported_change(delta.status()) {
                return true;
            }
            if let origin @ ('+' | '-' | ' ') = line.origin() {
                text.push(origin);
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;

        tracing::trace!(commit = commit_id, bytes = text.len(), "rendered diff");
        Ok(text)
    }
}

impl ChangeSource for GitChangeSource {
    fn commit_log(&self) -> Result<Vec<CommitEntry>> {
        let repo = self.repository()?;
        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

        if self.all_refs {
            revwalk.push_glob("refs/*")?;
            if repo.head_detached().unwrap_or(false) {
                revwalk.push_head()?;
            }
        } else {
            let start = repo.revparse_single(&self.revision)?.peel_to_commit()?;
            revwalk.push(start.id())?;
        }

        let mut entries = Vec::new();
        for oid in revwalk {
            let commit = repo.find_commit(oid?)?;
            entries.push(CommitEntry::new(
                commit.id().to_string(),
                format_commit_time(&commit.time()),
            ));
        }

        tracing::debug!(commits = entries.len(), revision = %self.revision, "loaded commit log");
        Ok(entries)
    }

    fn resolve_reference(&self, reference: &str) -> Result<Option<String>> {
        let repo = self.repository()?;

        let object = match repo.revparse_single(reference) {
            Ok(object) => object,
            Err(e)
                if matches!(
                    e.code(),
                    ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::Ambiguous
                ) =>
            {
                tracing::debug!(reference, error = %e.message(), "reference did not resolve");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(object.peel_to_commit().ok().map(|commit| commit.id().to_string()))
    }

    fn diff_text(&self, commit_id: &str) -> Result<String> {
        let repo = self.repository()?;
        self.render_diff(&repo, commit_id)
    }

    #[cfg(feature = "parallel")]
    fn diff_texts(
        &self,
        commit_ids: &[String],
        on_fetched: &(dyn Fn(&str) + Sync),
    ) -> Result<HashMap<String, String>> {
        use rayon::prelude::*;

        // One repository handle per worker; libgit2 handles are not shareable
        let fetched = commit_ids
            .par_iter()
            .map_init(
                || Repository::open(&self.git_dir).ok(),
                |repo, id| -> Result<(String, String)> {
                    let text = match repo {
                        Some(repo) => self.render_diff(repo, id)?,
                        None => self.diff_text(id)?,
                    };
                    on_fetched(id);
                    Ok((id.clone(), text))
                },
            )
            .collect::<Result<Vec<(String, String)>>>()?;

        Ok(fetched.into_iter().collect())
    }
}

/// Added, copied, deleted, modified, renamed, or type-changed.
fn is_reported_change(status: Delta) -> bool {
    matches!(
        status,
        Delta::Added
            | Delta::Copied
            | Delta::Deleted
            | Delta::Modified
            | Delta::Renamed
            | Delta::Typechange
    )
}

fn format_commit_time(time: &git2::Time) -> String {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60).unwrap_or_else(|| Utc.fix());

    match Utc.timestamp_opt(time.seconds(), 0).single() {
        Some(utc) => utc.with_timezone(&offset).format("%Y-%m-%d %H:%M:%S %z").to_string(),
        None => time.seconds().to_string(),
    }
}
