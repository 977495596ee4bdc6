use crate::classify::name_validator::check_syntax;
use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::ui::OutputMode;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dsnpull")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Plan mainframe dataset extraction from a range of git commits")]
#[command(
    long_about = "dsnpull finds every file changed across a set of commits or tags, then \
                  sorts the changes into partitioned-dataset members and plain files so they \
                  can be copied to the right place."
)]
#[command(after_help = "EXAMPLES:\n  \
    dsnpull v1.4 v1.5\n  \
    dsnpull 3f2a9c1 --repository ../cobol-src --output manifests\n  \
    dsnpull v2.0 --known-dataset PROJ.SRC.COBOL --output-format json\n  \
    dsnpull v2.0 --probe-command 'dscheck {name}'\n  \
    dsnpull v2.0 --dry-run")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Commit ids or tags bounding the range (any order)
    #[arg(value_parser = validate_target, required_unless_present = "generate_config")]
    pub targets: Vec<String>,

    /// Path to the git repository (or any directory inside it)
    #[arg(short, long)]
    pub repository: Option<PathBuf>,

    /// Revision whose history is searched
    #[arg(long, help = "Revision to walk history from (default: HEAD)")]
    pub revision: Option<String>,

    /// Walk every ref instead of a single revision
    #[arg(long)]
    pub all_refs: bool,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Directory receiving plan.json, datasets.txt and files.txt
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Dataset known to exist in the catalog (repeatable)
    #[arg(long = "known-dataset", value_name = "NAME", value_parser = validate_dataset_name)]
    pub known_datasets: Vec<String>,

    /// External catalog probe, e.g. "dscheck {name}"
    ///
    /// Split on whitespace. Arguments containing spaces need the argv form,
    /// `probe_command = [...]` under `[catalog]` in the config file.
    #[arg(long, value_name = "COMMAND")]
    pub probe_command: Option<String>,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Overwrite existing manifest files
    #[arg(long)]
    pub force: bool,

    /// Resolve and show the commit range without reading diffs
    #[arg(long)]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl From<&OutputFormat> for OutputMode {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let known = (!self.known_datasets.is_empty()).then(|| self.known_datasets.clone());

        CliOverrides::new()
            .with_repository(self.repository.clone())
            .with_revision(self.revision.clone())
            .with_all_refs(self.all_refs)
            .with_known_datasets(known)
            .with_probe_command(self.probe_command.clone())
            .with_manifest_directory(self.output.clone())
    }

    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from(&self.output_format)
    }

    pub fn show_progress(&self) -> bool {
        !self.quiet
            && matches!(self.output_format, OutputFormat::Human)
            && console::Term::stderr().features().is_attended()
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

/// Commit ids and tags are single tokens; anything else is a typo.
pub fn validate_target(s: &str) -> std::result::Result<String, String> {
    let target = s.trim();

    if target.is_empty() {
        return Err("Target must not be empty".to_string());
    }

    if target.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("Target must be a single commit id or tag without spaces".to_string());
    }

    if target.contains("..") {
        return Err(
            "Ranges are not accepted; list the commits or tags that bound the range".to_string(),
        );
    }

    Ok(target.to_string())
}

pub fn validate_dataset_name(s: &str) -> std::result::Result<String, String> {
    check_syntax(s.trim())
        .map(str::to_string)
        .map_err(|rejection| format!("'{}' is not a dataset name: it {}", s, rejection))
}
