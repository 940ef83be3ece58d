mod commands;
mod logging;
mod progress;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use avsift_core::{
    format_size, AppConfig, ProgressReporter, ScanEngine, ScanReport, SilentReporter,
};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let config = match avsift_core::config::load_configuration_from(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let result = match args.command {
        Some(Commands::Scan { roots, json }) => run_scan(&config, &roots, json),
        Some(Commands::Id { paths }) => run_id(&config, &paths),
        Some(Commands::Subtitle { dir, identifier }) => run_subtitle(&config, &dir, &identifier),
        Some(Commands::PrintConfig) => print_config(&config),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn build_engine(config: &AppConfig) -> anyhow::Result<ScanEngine> {
    ScanEngine::new(config.clone()).context("invalid scanner configuration")
}

fn run_scan(config: &AppConfig, roots: &[PathBuf], json: bool) -> anyhow::Result<()> {
    let engine = build_engine(config)?;
    let reporter: Box<dyn ProgressReporter> = if json {
        Box::new(SilentReporter)
    } else {
        Box::new(CliReporter::new())
    };

    let reports = if roots.is_empty() {
        if config.root_paths.is_empty() {
            bail!("no directories given and no root_paths configured");
        }
        engine.scan_configured_roots(reporter.as_ref())?
    } else {
        roots
            .iter()
            .map(|root| engine.scan(root, reporter.as_ref()))
            .collect::<Result<Vec<_>, _>>()?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        print_report(report);
    }
    Ok(())
}

fn print_report(report: &ScanReport) {
    println!();
    for group in report.title_groups() {
        println!(
            "{} [{}]",
            group.identifier.to_string().green(),
            group.category.to_string().cyan()
        );
        if let Some(hint) = &group.code_hint {
            println!("    code: {}", hint);
        }
        for file in &group.files {
            let shown = file.strip_prefix(report.root()).unwrap_or(file);
            println!("    {}", shown.display());
        }
    }

    if let Some(summary) = report.conflict_summary() {
        println!();
        println!("{}", "Conflicts:".red());
        print!("{}", summary);
    }

    for file in report.undersized() {
        println!(
            "{} {} ({})",
            "small".yellow(),
            file.path.display(),
            format_size(file.size)
        );
    }
    for path in report.unrecognized() {
        println!("{} {}", "unrecognized".yellow(), path.display());
    }

    let stats = report.stats();
    println!();
    info!(
        "Scan: {}, Reconcile: {}",
        format!("{:.2}s", stats.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", stats.reconcile_duration.as_secs_f64()).green(),
    );
    info!(
        "{} titles, {} conflicts, {} small and {} unrecognized out of {} files",
        format!("{}", report.title_groups().len()).green(),
        format!("{}", report.conflict_groups().len()).red(),
        format!("{}", report.undersized().len()).yellow(),
        format!("{}", report.unrecognized().len()).yellow(),
        stats.total_files,
    );
}

fn run_id(config: &AppConfig, paths: &[PathBuf]) -> anyhow::Result<()> {
    let engine = build_engine(config)?;
    for path in paths {
        match engine.identify(path) {
            Some(id) => println!(
                "{}\t{}\t{}",
                path.display(),
                id.to_string().green(),
                engine.classify(&id).to_string().cyan()
            ),
            None => println!("{}\t{}", path.display(), "-".red()),
        }
    }
    Ok(())
}

fn run_subtitle(config: &AppConfig, dir: &Path, identifier: &str) -> anyhow::Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let engine = build_engine(config)?;
    match engine.subtitle_index().find_subtitle(dir, identifier) {
        Some(path) => println!("{}", path.display()),
        None => warn!("No subtitle for {} under {}", identifier, dir.display()),
    }
    Ok(())
}

fn print_config(config: &AppConfig) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(config).context("cannot render configuration")?;
    println!("{}", rendered);
    Ok(())
}
