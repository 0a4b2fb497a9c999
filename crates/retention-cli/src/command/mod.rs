use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use self::{cohorts::CohortsArg, compute::ComputeArg, curve::CurveArg};

mod args;
mod cohorts;
mod compute;
mod curve;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log filter directive such as `debug` or `retention_analysis=trace`
    /// [default: `RUST_LOG` or `info`]
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// What to compute
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Compute day-N retention with a bootstrap confidence interval
    Compute(#[clap(flatten)] ComputeArg),
    /// Show day-N retention of every cohort
    Cohorts(#[clap(flatten)] CohortsArg),
    /// Compute retention for a range of day offsets
    Curve(#[clap(flatten)] CurveArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_logging(args.log_level.as_deref())?;
    match args.mode {
        Mode::Compute(arg) => compute::run(&arg)?,
        Mode::Cohorts(arg) => cohorts::run(&arg)?,
        Mode::Curve(arg) => curve::run(&arg)?,
    }
    Ok(())
}

/// Installs a stderr subscriber so reports on stdout stay machine-readable.
fn init_logging(level: Option<&str>) -> anyhow::Result<()> {
    let filter = match level {
        Some(level) => {
            EnvFilter::try_new(level).with_context(|| format!("Invalid log level: {level}"))?
        }
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .context("Failed to build default log filter")?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();

    Ok(())
}
