use clap::{CommandFactory, Parser};
use colored::*;
use env_logger::{Builder, Env, Target};
use is_terminal::IsTerminal;
use log::{info, warn};
use rfseek::cli::{Cli, Commands, SearchArgs};
use rfseek::config::Config;
use rfseek::controller::{CancelToken, SearchController};
use rfseek::error::{Result, RfseekError};
use rfseek::export::{export_file, import_file};
use rfseek::filters::format_elapsed;
use rfseek::hash::{file_sha256_hex, hash_file};
use rfseek::output_formats::OutputFormatter;
use rfseek::progress::{SearchProgress, follow_events};
use rfseek::request::SearchLimits;
use rfseek::results::{RescanOptions, ResultsModel};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli)?;

    let start_time = Instant::now();
    info!("Application started with command: {:?}", cli.command);
    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Search(args) => run_search(args, &config)?,
        Commands::Rescan {
            csv,
            output,
            invert,
            timeout,
            max_occurrences,
        } => {
            let limits = SearchLimits {
                timeout_secs: timeout.or(config.limits.timeout_secs),
                max_files: None,
                max_occurrences: max_occurrences.or(config.limits.max_occurrences),
            };
            let options = RescanOptions {
                limits: limits.scan_limits(),
                match_text: invert.then_some(false),
            };
            run_rescan(csv, output.as_deref().unwrap_or(csv), &options, &config)?;
        }
        Commands::Hash {
            file,
            variant,
            sha256,
        } => {
            let digest = hash_file(file, *variant)?;
            println!("{}  {}", variant.to_hex(digest), file.display());
            if *sha256 {
                println!("{}  {}", file_sha256_hex(file)?, file.display());
            }
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "rfseek", &mut io::stdout());
        }
    }

    info!(
        "Application finished. Total elapsed time: {:.2?}",
        start_time.elapsed()
    );
    Ok(())
}

fn cancel_on_interrupt(token: CancelToken) -> Result<()> {
    ctrlc::set_handler(move || {
        warn!("Interrupted, canceling");
        token.cancel();
    })
    .map_err(|e| RfseekError::Other(e.to_string()))
}

fn run_search(args: &SearchArgs, config: &Config) -> Result<()> {
    let request = args.to_request(config)?;
    let size_system = args.size_system.unwrap_or(config.display.size_system);
    let format = args.output_format.unwrap_or(config.display.output_format);

    let mut controller = SearchController::new().with_size_system(size_system);
    let events = controller.events();
    controller.start(request)?;
    if let Some(token) = controller.cancel_token() {
        cancel_on_interrupt(token)?;
    }

    let mut progress = SearchProgress::new(io::stderr().is_terminal())?;
    follow_events(&events, &mut progress, || controller.is_running());

    let report = controller
        .wait()?
        .ok_or_else(|| RfseekError::Other("search did not start".to_string()))?;
    let stats = report.outcome.statistics();
    let rows = report.results.rows();

    OutputFormatter::new(format)
        .with_metadata(config.display.show_metadata)
        .with_timing(report.timing)
        .write_results(rows, Some(&stats), &mut io::stdout().lock())?;

    if let Some(path) = &args.export {
        let written = export_file(rows, path)?;
        eprintln!("{} {}", "Results saved to".green(), written.display());
    }

    if config.display.show_summary {
        let status = if report.outcome.is_canceled() {
            "Search canceled".yellow()
        } else {
            "Search finished".green()
        };
        let found = report.results.statistics();
        eprintln!(
            "{}: {} directories, {} files, {} results, {} occurrences in {} ({} to {})",
            status,
            stats.processed_directories,
            stats.processed_files,
            found.files_found,
            found.total_occurrences,
            format_elapsed(report.timing.elapsed()),
            report.timing.started.format("%H:%M:%S"),
            report.timing.finished.format("%H:%M:%S")
        );
    }
    Ok(())
}

fn run_rescan(input: &Path, output: &Path, options: &RescanOptions, config: &Config) -> Result<()> {
    let cancel = CancelToken::new();
    cancel_on_interrupt(cancel.clone())?;

    let mut model = ResultsModel::new(config.display.size_system);
    let imported = import_file(input, &mut model, &cancel)?;
    let summary = model.rescan(options, &cancel);
    let written = export_file(model.rows(), output)?;

    if config.display.show_summary {
        eprintln!(
            "{} {} rows imported ({} skipped), {} rescanned, {} removed, {} kept",
            if summary.canceled {
                "Rescan canceled:".yellow()
            } else {
                "Rescan finished:".green()
            },
            imported.imported,
            imported.skipped,
            summary.rescanned,
            summary.removed,
            model.len()
        );
        eprintln!("{} {}", "Results saved to".green(), written.display());
    }
    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "info" } else { "warn" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));

    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "{} [{}] [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });

    if let Some(log_path) = &cli.log {
        if let Some(parent_dir) = log_path.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                fs::create_dir_all(parent_dir)?;
            }
        }
        let log_file = fs::File::create(log_path)?;
        builder.target(Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| RfseekError::Other(e.to_string()))?;
    Ok(())
}
