use std::io::{self, Write};

use retention_analysis::retention::{self, CurvePoint};

use super::args::{InputArg, OutputArg, OutputFormat, ParamsArg};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CurveArg {
    #[clap(flatten)]
    input: InputArg,
    /// First day offset of the curve
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    min_day: i64,
    /// Last day offset of the curve
    #[arg(long, allow_negative_numbers = true)]
    max_day: i64,
    #[clap(flatten)]
    params: ParamsArg,
    #[clap(flatten)]
    output: OutputArg,
}

pub(crate) fn run(arg: &CurveArg) -> anyhow::Result<()> {
    if arg.min_day > arg.max_day {
        anyhow::bail!("--min-day {} is after --max-day {}", arg.min_day, arg.max_day);
    }
    let params = arg.params.validate(Some(arg.min_day))?;
    let events = arg.input.read_events()?;
    let curve = retention::retention_curve(&events, &params, arg.min_day..=arg.max_day)?;

    let mut output = arg.output.open()?;
    match arg.output.format {
        OutputFormat::Json => output.write_json(&curve)?,
        OutputFormat::Text => {
            let level = params.estimator.confidence_level();
            output.write_text(|out| write_curve(out, &curve, level))?;
        }
    }
    Ok(())
}

fn write_curve<W>(out: &mut W, curve: &[CurvePoint], confidence_level: f64) -> io::Result<()>
where
    W: Write,
{
    let ci = format!("{:.0}% CI", 100.0 * confidence_level);
    writeln!(
        out,
        "  {:>5} {:>8} {:>10} {:>21}",
        "Day", "Cohorts", "Retention", ci
    )?;
    writeln!(out, "  {}", "-".repeat(47))?;
    for point in curve {
        match &point.result {
            Some(result) => writeln!(
                out,
                "  {:>5} {:>8} {:>9.2}% {:>21}",
                point.day_offset,
                point.cohort_count,
                100.0 * result.point_estimate,
                format!("[{:.2}%, {:.2}%]", 100.0 * result.ci_low, 100.0 * result.ci_high)
            )?,
            None => writeln!(
                out,
                "  {:>5} {:>8} {:>10} {:>21}",
                point.day_offset, point.cohort_count, "N/A", "-"
            )?,
        }
    }
    Ok(())
}
