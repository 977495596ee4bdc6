use crate::diff::quote_path;
use crate::error::{DsnPullError, UserFriendlyError};
use crate::history::CommitRange;
use crate::plan::ExtractionReport;
use crate::ui::progress::format_duration;
use console::{style, Emoji, Term};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static PACKAGE: Emoji = Emoji("📦 ", "");
static PAGE: Emoji = Emoji("📄 ", "");

/// Prints messages and the final plan to stdout.
///
/// In JSON mode stdout carries only the report document; messages are
/// written to stderr as JSON lines so the document stays parseable.
pub struct OutputFormatter {
    term: Term,
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let term = Term::stdout();
        let use_colors = match mode {
            OutputMode::Human => term.features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            term,
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => eprintln!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &DsnPullError) {
        self.error(&error.user_message());

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    eprintln!();
                    if self.use_colors {
                        let text = format!("Suggestion: {}", suggestion);
                        eprintln!("{}{}", INFO, style(text).cyan());
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => self.print_json_object(&serde_json::json!({
                    "type": "suggestion",
                    "message": suggestion
                })),
                OutputMode::Plain => eprintln!("SUGGESTION: {}", suggestion),
            }
        }
    }

    /// Resolved range only, for `--dry-run`.
    pub fn print_range(&self, range: &CommitRange) {
        match self.mode {
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(range).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            OutputMode::Plain => {
                for entry in &range.ordered {
                    println!("COMMIT {} {}", entry.id, entry.date);
                }
                for target in &range.unmatched {
                    println!("UNMATCHED {}", target);
                }
            }
            OutputMode::Human => {
                self.print_header("Commit Range");
                println!("{}", range.display_summary());
                println!();
                for entry in &range.ordered {
                    if self.use_colors {
                        println!(
                            "  {} {}",
                            style(entry.short_id()).yellow(),
                            style(&entry.date).dim()
                        );
                    } else {
                        println!("  {} {}", entry.short_id(), entry.date);
                    }
                }
                if !range.unmatched.is_empty() {
                    println!();
                    println!("Not in range: {}", range.unmatched.join(", "));
                }
            }
        }
    }

    pub fn print_report(&self, report: &ExtractionReport, elapsed: Duration) {
        match self.mode {
            OutputMode::Human => self.print_human_report(report, elapsed),
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            OutputMode::Plain => self.print_plain_report(report),
        }
    }

    pub fn print_manifests(&self, paths: &[PathBuf]) {
        if paths.is_empty() || !self.should_show_message(0) {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                for path in paths {
                    let message = format!("Wrote {}", path.display());
                    self.print_human_message(MessageType::Success, &message);
                }
            }
            OutputMode::Json => {
                let written: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                self.print_json_object(&serde_json::json!({
                    "type": "manifests",
                    "paths": written
                }));
            }
            OutputMode::Plain => {
                for path in paths {
                    eprintln!("WROTE {}", path.display());
                }
            }
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{}", style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Plain => println!("=== {} ===", title),
            OutputMode::Json => {}
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                let width = usize::from(self.term.size().1).clamp(20, 60);
                if self.use_colors {
                    println!("{}", style("─".repeat(width)).dim());
                } else {
                    println!("{}", "-".repeat(width));
                }
            }
            OutputMode::Plain => println!("{}", "-".repeat(60)),
            OutputMode::Json => {}
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error | MessageType::Warning => {
                    eprintln!("{}{}", emoji, color_fn(message))
                }
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error | MessageType::Warning => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        eprintln!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn highlight(&self, text: String) -> String {
        if self.use_colors {
            style(text).cyan().bold().to_string()
        } else {
            text
        }
    }

    fn print_human_report(&self, report: &ExtractionReport, elapsed: Duration) {
        self.print_header("Extraction Plan");

        match report.range {
            Some(ref range) => {
                println!(
                    "Range:         {} .. {} ({} commit(s))",
                    short(&range.newest),
                    short(&range.oldest),
                    range.commit_count
                );
                println!("               {} .. {}", range.newest_date, range.oldest_date);
            }
            None => println!("Range:         none of the targets are in the history"),
        }
        println!("Changed paths: {}", self.highlight(report.changed_paths.to_string()));
        println!("Time taken:    {}", self.highlight(format_duration(elapsed)));
        println!();

        if report.plan.groups.is_empty() {
            println!("No datasets changed.");
        } else {
            println!("Datasets:");
            for group in &report.plan.groups {
                let name = if self.use_colors {
                    style(&group.name).bold().to_string()
                } else {
                    group.name.clone()
                };
                println!("  {}{} ({} member(s))", PACKAGE, name, group.members.len());
                for member in &group.members {
                    println!("      {}", member);
                }
            }
        }
        println!();

        if report.plan.files.is_empty() {
            println!("No files changed.");
        } else {
            println!("Files:");
            for file in &report.plan.files {
                println!("  {}{}", PAGE, quote_path(file));
            }
        }

        if report.has_warnings() {
            println!();
            if !report.unresolved_targets.is_empty() {
                self.warning(&format!(
                    "Not found in range: {}",
                    report.unresolved_targets.join(", ")
                ));
            }
            if !report.ambiguous_names.is_empty() {
                self.warning(&format!(
                    "Catalog could not check (treated as files): {}",
                    report.ambiguous_names.join(", ")
                ));
            }
        }

        self.print_separator();
        self.success(&report.plan.display_summary());
    }

    fn print_plain_report(&self, report: &ExtractionReport) {
        if let Some(ref range) = report.range {
            println!("RANGE {} {} {}", range.newest, range.oldest, range.commit_count);
        }
        for group in &report.plan.groups {
            println!("DATASET {}", group.manifest_line());
        }
        for file in &report.plan.files {
            println!("FILE {}", quote_path(file));
        }
        for target in &report.unresolved_targets {
            println!("UNRESOLVED {}", target);
        }
        for name in &report.ambiguous_names {
            println!("AMBIGUOUS {}", name);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn short(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}
