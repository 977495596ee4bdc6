use clap::Parser;
use dsnpull::{
    Cli, DsnPull, DsnPullError, ExtractionReport, OutputFormatter, OutputMode, UserFriendlyError,
};
use std::process;
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();
    setup_logging(cli.verbosity_level(), cli.quiet);
    tracing::debug!(version = dsnpull::version_info(), "starting");

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let dsnpull = match DsnPull::from_cli(&cli) {
        Ok(dsnpull) => dsnpull,
        Err(e) => {
            print_startup_error(&cli, &e);
            return exit_code_for(&e);
        }
    };

    if cli.dry_run {
        return handle_dry_run(&cli, &dsnpull).await;
    }

    let started = Instant::now();
    match dsnpull.plan_extraction(&cli.targets).await {
        Ok(report) => {
            dsnpull
                .output_formatter()
                .print_report(&report, started.elapsed());

            if report.ambiguous_names.is_empty() {
                0
            } else {
                2 // Success, but some names could not be checked
            }
        }
        Err(e) => {
            if let DsnPullError::NoTargetsMatched { ref targets } = e {
                dsnpull
                    .output_formatter()
                    .print_report(&ExtractionReport::nothing_to_do(targets), started.elapsed());
            }
            dsnpull.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &DsnPullError) -> i32 {
    match error {
        DsnPullError::Cancelled => 130, // Interrupted (SIGINT)
        DsnPullError::NoTargetsMatched { .. } => 3,
        DsnPullError::RepositoryNotFound { .. } => 4,
        DsnPullError::InvalidReference { .. } => 5,
        DsnPullError::Permission { .. } => 7,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "dsnpull.toml".to_string());

    if std::path::Path::new(&config_path).exists() && !cli.force {
        eprintln!(
            "Configuration file already exists: {} (use --force to replace it)",
            config_path
        );
        return 1;
    }

    match DsnPull::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  dsnpull <COMMIT-OR-TAG>... --config {}", config_path);
            println!("\nEdit the file to list known datasets or set a catalog probe command.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

async fn handle_dry_run(cli: &Cli, dsnpull: &DsnPull) -> i32 {
    let formatter = dsnpull.output_formatter();
    formatter.info("DRY RUN MODE - no diffs are read and no manifests are written");

    let range = match dsnpull.resolve_range(&cli.targets).await {
        Ok(range) => range,
        Err(e) => {
            dsnpull.handle_error(&e);
            return exit_code_for(&e);
        }
    };

    formatter.print_range(&range);

    if formatter.mode() == OutputMode::Human {
        let config = dsnpull.config();
        formatter.print_separator();
        match config.catalog.probe_command {
            Some(ref argv) => formatter.info(&format!("Catalog probe: {}", argv.join(" "))),
            None => formatter.info(&format!(
                "Catalog: {} known dataset(s)",
                config.catalog.known_datasets.len()
            )),
        }
        if let Some(ref dir) = config.output.manifest_directory {
            formatter.info(&format!("Manifests would be written to {}", dir.display()));
            if cli.force {
                formatter.warning("Force mode enabled - existing manifests would be replaced");
            }
        }
        formatter.success("Dry run completed successfully");
    }

    0
}

fn print_startup_error(cli: &Cli, error: &DsnPullError) {
    let formatter = OutputFormatter::new(cli.output_mode(), 0, false);
    formatter.print_user_friendly_error(error);
}

/// Diagnostics go to stderr so stdout stays clean for the plan.
fn setup_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        _ => Level::TRACE,
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dsnpull={}", level.as_str().to_lowercase())));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
