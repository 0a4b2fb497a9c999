use std::io::{self, Write};

use retention_analysis::retention::{self, RetentionReport};

use super::args::{InputArg, OutputArg, OutputFormat, ParamsArg};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ComputeArg {
    #[clap(flatten)]
    input: InputArg,
    /// Day whose retention is computed [default: 1]
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    day_offset: Option<i64>,
    #[clap(flatten)]
    params: ParamsArg,
    #[clap(flatten)]
    output: OutputArg,
}

pub(crate) fn run(arg: &ComputeArg) -> anyhow::Result<()> {
    let params = arg.params.validate(arg.day_offset)?;
    let events = arg.input.read_events()?;
    let report = retention::compute_retention(&events, &params)?;

    let mut output = arg.output.open()?;
    match arg.output.format {
        OutputFormat::Json => output.write_json(&report)?,
        OutputFormat::Text => output.write_text(|out| write_report(out, &report))?,
    }
    Ok(())
}

fn write_report<W>(out: &mut W, report: &RetentionReport) -> io::Result<()>
where
    W: Write,
{
    let result = &report.result;
    writeln!(out, "Day-{} retention ({})", report.day_offset, report.timezone)?;
    writeln!(out, "==========================================")?;
    writeln!(out, "  {:<18} {}", "Cohorts:", result.cohort_count)?;
    writeln!(out, "  {:<18} {:.2}%", "Retention:", 100.0 * result.point_estimate)?;
    writeln!(
        out,
        "  {:<18} [{:.2}%, {:.2}%]",
        format!("{:.0}% CI:", 100.0 * report.confidence_level),
        100.0 * result.ci_low,
        100.0 * result.ci_high
    )?;
    writeln!(out, "  {:<18} {:.2}%", "Bootstrap mean:", 100.0 * result.bootstrap_mean)?;
    writeln!(out, "  {:<18} {:.2}%", "Standard error:", 100.0 * result.std_error)?;
    writeln!(
        out,
        "  {:<18} {} (seed {})",
        "Resamples:", report.resample_count, result.seed
    )?;
    Ok(())
}
