//! fbsgen CLI - Incremental FlatBuffers Schema Builds
//!
//! Commands:
//! - fbsgen [build]   - Compile schemas that changed or include something that changed
//! - fbsgen clean     - Remove generated code and the digest cache
//! - fbsgen rebuild   - clean, then build everything
//!
//! Paths and the compiler come from `fbsgen.json` in the working directory
//! when present.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use fbsgen_core::{BuildConfig, BuildReport, Builder, FieldStyle, FileOutcome, Flatc};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// fbsgen - Incremental FlatBuffers schema compiler driver
#[derive(Parser)]
#[command(name = "fbsgen", version, about = "Incremental FlatBuffers schema compiler driver")]
struct Cli {
    /// What to do
    #[arg(value_enum, default_value_t = Action::Build)]
    action: Action,

    /// Field naming style passed to flatc
    #[arg(long, value_enum)]
    field_style: Option<Style>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    Build,
    Clean,
    Rebuild,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Style {
    Original,
    Lower,
    Upper,
}

impl From<Style> for FieldStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::Original => FieldStyle::Original,
            Style::Lower => FieldStyle::Lower,
            Style::Upper => FieldStyle::Upper,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let mut config = BuildConfig::load(&cwd)?;
    if let Some(style) = cli.field_style {
        config = config.field_style(style.into());
    }
    tracing::debug!("Using config {:?}", config);

    let compiler = Flatc::new(&config.compiler);
    let builder = Builder::new(config, compiler);

    match cli.action {
        Action::Clean => {
            builder.clean().context("clean failed")?;
            let config = builder.config();
            println!(
                "🗑️  Removed {} and {}",
                config.output_root.display(),
                config.cache_file.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Action::Build => {
            let report = builder.build().context("build failed")?;
            Ok(print_report(&report))
        }
        Action::Rebuild => {
            let report = builder.rebuild().context("rebuild failed")?;
            Ok(print_report(&report))
        }
    }
}

fn print_report(report: &BuildReport) -> ExitCode {
    if report.up_to_date() {
        println!("✅ Incremental build: no changes detected ({} schemas)", report.files_scanned);
        return ExitCode::SUCCESS;
    }

    println!(
        "🔨 Building {} files (including dependencies)...",
        report.invalidation.closure.len()
    );
    for file in &report.dispatch.files {
        match &file.outcome {
            FileOutcome::Compiled => println!("   ✓ Compiled: {}", file.rel_path),
            FileOutcome::Failed(reason) => {
                println!("   ✗ Error compiling: {} ({})", file.rel_path, reason)
            }
        }
    }

    let failed = report.dispatch.failed().count();
    if failed == 0 {
        println!(
            "✅ Build step finished: {} compiled in {:?}",
            report.dispatch.invocations(),
            report.duration
        );
        ExitCode::SUCCESS
    } else {
        println!(
            "❌ Build step finished: {} compiled, {} failed in {:?}",
            report.dispatch.invocations() - failed,
            failed,
            report.duration
        );
        ExitCode::FAILURE
    }
}
