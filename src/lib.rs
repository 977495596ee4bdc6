pub mod classify;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod history;
pub mod plan;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CatalogConfig, CliOverrides, Config, GitConfig, OutputConfig};
pub use error::{DsnPullError, Result, UserFriendlyError};

// Core functionality re-exports
pub use classify::{
    catalog_from_config, CatalogStatus, Classification, CommandCatalog, DatasetCatalog,
    NameValidator, PathClassifier, StaticCatalog,
};
pub use diff::{quote_path, unquote_path, ChangedPath, DiffAggregator};
pub use history::{ChangeSource, CommitEntry, CommitRange, GitChangeSource, HistoryResolver};
pub use plan::{ExtractionPlan, ExtractionReport, Group, ManifestWriter, RangeSummary};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task;

/// Main library interface: commit targets in, extraction plan out.
pub struct DsnPull {
    config: Config,
    source: Arc<dyn ChangeSource>,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
    force: bool,
}

impl DsnPull {
    /// Open the configured repository and install the Ctrl+C handler.
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let source = Arc::new(GitChangeSource::open(&config.git)?);
        let shutdown = GracefulShutdown::new()?;
        Ok(Self::with_source(config, source, output_mode, verbose, quiet, shutdown))
    }

    /// Run against any [`ChangeSource`] without touching process-wide state.
    pub fn new_for_test(config: Config, source: Arc<dyn ChangeSource>) -> Self {
        Self::with_source(
            config,
            source,
            OutputMode::Plain,
            0,
            true,
            GracefulShutdown::new_for_test(),
        )
    }

    fn with_source(
        config: Config,
        source: Arc<dyn ChangeSource>,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        shutdown: GracefulShutdown,
    ) -> Self {
        Self {
            config,
            source,
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            progress_manager: ProgressManager::new(!quiet && output_mode == OutputMode::Human),
            shutdown,
            force: false,
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let dsnpull = Self::new(
            config,
            cli_args.output_mode(),
            cli_args.verbosity_level(),
            cli_args.quiet,
        )?;

        Ok(dsnpull
            .with_force_overwrite(cli_args.force)
            .with_progress(cli_args.show_progress()))
    }

    pub fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress_manager = ProgressManager::new(enabled);
        self
    }

    /// Resolve `targets` against the history and bound the commit range.
    ///
    /// Targets that name no commit are passed through unchanged, so they
    /// only ever show up as unmatched.
    pub async fn resolve_range(&self, targets: &[String]) -> Result<CommitRange> {
        self.shutdown.check_shutdown()?;
        self.output_formatter.start_operation("Reading commit history");

        let spinner = self.progress_manager.create_spinner("Reading commit history...");
        let source = Arc::clone(&self.source);
        let wanted = targets.to_vec();
        let (log, resolved) = task::spawn_blocking(move || -> Result<_> {
            let log = source.commit_log()?;
            let mut resolved = Vec::with_capacity(wanted.len());
            for target in wanted {
                let id = source.resolve_reference(&target)?;
                resolved.push((target, id));
            }
            Ok((log, resolved))
        })
        .await
        .map_err(|e| DsnPullError::Config {
            message: format!("History task failed: {}", e),
        })??;
        spinner.finish_and_clear();
        tracing::debug!(commits = log.len(), "loaded commit log");

        let mut ids = Vec::with_capacity(resolved.len());
        let mut spelled_as: HashMap<String, String> = HashMap::new();
        for (target, id) in resolved {
            match id {
                Some(id) => {
                    tracing::debug!(%target, %id, "resolved target");
                    spelled_as.entry(id.clone()).or_insert(target);
                    ids.push(id);
                }
                None => {
                    tracing::warn!(%target, "target does not name a commit");
                    ids.push(target);
                }
            }
        }

        let mut range = HistoryResolver::new()
            .resolve(&log, &ids)
            .map_err(|e| match e {
                DsnPullError::NoTargetsMatched { .. } => DsnPullError::NoTargetsMatched {
                    targets: targets.to_vec(),
                },
                other => other,
            })?;

        range.unmatched = range
            .unmatched
            .iter()
            .map(|id| spelled_as.get(id).cloned().unwrap_or_else(|| id.clone()))
            .collect();
        for target in &range.unmatched {
            tracing::warn!(%target, "target not found in the walked history");
        }

        self.output_formatter.info(&range.display_summary());
        Ok(range)
    }

    /// Run the whole pipeline and write manifests when configured.
    pub async fn plan_extraction(&self, targets: &[String]) -> Result<ExtractionReport> {
        let range = self.resolve_range(targets).await?;
        self.shutdown.check_shutdown()?;

        let texts = self.fetch_diffs(&range).await?;
        self.shutdown.check_shutdown()?;

        let changed = DiffAggregator::new().aggregate(&range, &texts);
        tracing::debug!(paths = changed.len(), "aggregated changed paths");

        let classification = self.classify(&changed)?;
        self.shutdown.check_shutdown()?;

        for name in &classification.ambiguous_names {
            self.output_formatter.warning(&format!(
                "Catalog could not check {}; its paths are listed as files",
                name
            ));
        }

        let report = ExtractionReport::new(&range, changed.len(), classification.plan)
            .with_ambiguous_names(classification.ambiguous_names);

        let written = self.write_manifests(&report)?;
        self.output_formatter.print_manifests(&written);

        Ok(report)
    }

    async fn fetch_diffs(&self, range: &CommitRange) -> Result<HashMap<String, String>> {
        self.output_formatter
            .start_operation(&format!("Reading diffs of {} commit(s)", range.len()));

        let started = Instant::now();
        let bar = self.progress_manager.create_commit_progress(range.len() as u64);
        let source = Arc::clone(&self.source);
        let ids = range.ids();
        let texts = {
            let bar = bar.clone();
            task::spawn_blocking(move || source.diff_texts(&ids, &move |_: &str| bar.inc(1)))
                .await
                .map_err(|e| DsnPullError::Config {
                    message: format!("Diff task failed: {}", e),
                })??
        };

        ui::progress::finish_progress_with_summary(
            &bar,
            &format!("Read {} diff(s)", texts.len()),
            started.elapsed(),
        );
        Ok(texts)
    }

    fn classify(&self, changed: &[ChangedPath]) -> Result<Classification> {
        self.output_formatter
            .start_operation(&format!("Classifying {} path(s)", changed.len()));

        let catalog = catalog_from_config(&self.config.catalog)?;
        let validator = NameValidator::new(catalog.as_ref());
        let classification = PathClassifier::new(&validator).classify(changed);

        tracing::debug!(
            groups = classification.plan.groups.len(),
            files = classification.plan.files.len(),
            "classified paths"
        );
        Ok(classification)
    }

    fn write_manifests(&self, report: &ExtractionReport) -> Result<Vec<PathBuf>> {
        match self.config.output.manifest_directory {
            Some(ref dir) if self.config.output.write_manifests => ManifestWriter::new(dir)
                .with_force_overwrite(self.force)
                .write(report),
            _ => Ok(Vec::new()),
        }
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        Config::create_sample_config().save_to_file(output_path)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &DsnPullError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// In-memory history: ids are newest first, refs map names to ids.
    struct FakeSource {
        log: Vec<CommitEntry>,
        diffs: HashMap<String, String>,
        refs: HashMap<String, String>,
    }

    impl ChangeSource for FakeSource {
        fn commit_log(&self) -> Result<Vec<CommitEntry>> {
            Ok(self.log.clone())
        }

        fn resolve_reference(&self, reference: &str) -> Result<Option<String>> {
            if let Some(id) = self.refs.get(reference) {
                return Ok(Some(id.clone()));
            }
            Ok(self
                .log
                .iter()
                .find(|entry| entry.id.starts_with(reference))
                .map(|entry| entry.id.clone()))
        }

        fn diff_text(&self, commit_id: &str) -> Result<String> {
            self.diffs
                .get(commit_id)
                .cloned()
                .ok_or_else(|| DsnPullError::InvalidReference {
                    reference: commit_id.to_string(),
                })
        }
    }

    fn fake_source() -> Arc<dyn ChangeSource> {
        let log = vec![
            CommitEntry::new("cccc333", "2024-03-03 00:00:00 +0000"),
            CommitEntry::new("bbbb222", "2024-03-02 00:00:00 +0000"),
            CommitEntry::new("aaaa111", "2024-03-01 00:00:00 +0000"),
        ];
        let mut diffs = HashMap::new();
        diffs.insert(
            "cccc333".to_string(),
            "+++ b/PROJ.SRC.COBOL/MEMBER1\n+++ b/bin/tool\n".to_string(),
        );
        diffs.insert(
            "bbbb222".to_string(),
            "+++ b/PROJ.SRC.COBOL/MEMBER2\n+++ b/PROJ.SRC.COBOL/MEMBER1\n".to_string(),
        );
        diffs.insert("aaaa111".to_string(), "+++ b/readme.txt\n".to_string());

        let mut refs = HashMap::new();
        refs.insert("v1.0".to_string(), "bbbb222".to_string());
        refs.insert("v2.0".to_string(), "cccc333".to_string());

        Arc::new(FakeSource { log, diffs, refs })
    }

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_plan_extraction_end_to_end() {
        let dsnpull = DsnPull::new_for_test(Config::default(), fake_source());
        let report = dsnpull.plan_extraction(&targets(&["v2.0", "v1.0"])).await.unwrap();

        assert_eq!(report.range.as_ref().map(|r| r.commit_count), Some(2));
        assert_eq!(report.changed_paths, 4);
        assert_eq!(report.plan.groups.len(), 1);
        assert_eq!(
            report.plan.groups[0].members,
            vec!["MEMBER1", "MEMBER2"]
        );
        assert_eq!(report.plan.files, vec!["bin/tool"]);
        assert!(!report.has_warnings());
    }

    #[tokio::test]
    async fn test_unresolved_targets_keep_user_spelling() {
        let dsnpull = DsnPull::new_for_test(Config::default(), fake_source());
        let range = dsnpull
            .resolve_range(&targets(&["bbbb", "v9.9"]))
            .await
            .unwrap();

        assert_eq!(range.ids(), vec!["bbbb222"]);
        assert_eq!(range.unmatched, vec!["v9.9"]);
    }

    #[tokio::test]
    async fn test_no_targets_matched_reports_user_targets() {
        let dsnpull = DsnPull::new_for_test(Config::default(), fake_source());
        let result = dsnpull.plan_extraction(&targets(&["nope"])).await;

        match result {
            Err(DsnPullError::NoTargetsMatched { targets }) => assert_eq!(targets, vec!["nope"]),
            other => panic!("expected NoTargetsMatched, got {:?}", other.map(|r| r.plan)),
        }
    }

    #[tokio::test]
    async fn test_manifests_written_when_configured() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.manifest_directory = Some(temp_dir.path().join("out"));

        let dsnpull = DsnPull::new_for_test(config, fake_source());
        dsnpull.plan_extraction(&targets(&["v2.0"])).await.unwrap();

        let datasets = std::fs::read_to_string(temp_dir.path().join("out/datasets.txt")).unwrap();
        assert_eq!(datasets, "PROJ.SRC.COBOL MEMBER1\n");

        // A second run refuses to overwrite until forced
        let again = dsnpull.plan_extraction(&targets(&["v2.0"])).await;
        assert!(matches!(again, Err(DsnPullError::ManifestExists { .. })));
        let forced = dsnpull.with_force_overwrite(true);
        assert!(forced.plan_extraction(&targets(&["v2.0"])).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_run_stops() {
        let dsnpull = DsnPull::new_for_test(Config::default(), fake_source());
        dsnpull.request_shutdown();
        assert!(!dsnpull.is_running());

        let result = dsnpull.plan_extraction(&targets(&["v2.0"])).await;
        assert!(matches!(result, Err(DsnPullError::Cancelled)));
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        DsnPull::generate_sample_config(&config_path).unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[git]"));
        assert!(content.contains("[catalog]"));
        assert!(content.contains("[output]"));
    }

    #[test]
    fn test_version_info() {
        assert!(!version_info().is_empty());
    }
}
