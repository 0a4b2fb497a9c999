//! Per-cohort retention table
//!
//! Lists every cohort that passed the date and size filters together with
//! its day-N counts. Cohorts whose target day lies beyond the log are listed
//! without counts, since they do not contribute to the estimate.

use std::{
    collections::HashMap,
    io::{self, Write},
};

use chrono::NaiveDate;
use retention_analysis::cohort::{CohortAggregator, CohortRetentionRow};
use retention_stats::descriptive::DescriptiveStats;
use serde::Serialize;

use super::args::{InputArg, OutputArg, OutputFormat, ParamsArg};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CohortsArg {
    #[clap(flatten)]
    input: InputArg,
    /// Day whose retention is shown [default: 1]
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    day_offset: Option<i64>,
    #[clap(flatten)]
    params: ParamsArg,
    #[clap(flatten)]
    output: OutputArg,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct CohortTable {
    day_offset: i64,
    timezone: &'static str,
    /// First and last dates with any login.
    observed_range: Option<(NaiveDate, NaiveDate)>,
    cohorts: Vec<CohortEntry>,
    /// Summary of cohort sizes.
    sizes: Option<SizeSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct CohortEntry {
    cohort_date: NaiveDate,
    cohort_size: usize,
    /// `None` if the target day was not observed.
    day_n: Option<DayN>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct DayN {
    target_date: NaiveDate,
    returned_count: usize,
    retention_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct SizeSummary {
    count: usize,
    min: f64,
    max: f64,
    mean: f64,
    median: f64,
    std_dev: f64,
}

impl From<DescriptiveStats> for SizeSummary {
    fn from(stats: DescriptiveStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean,
            median: stats.median,
            std_dev: stats.std_dev,
        }
    }
}

pub(crate) fn run(arg: &CohortsArg) -> anyhow::Result<()> {
    let params = arg.params.validate(arg.day_offset)?;
    let events = arg.input.read_events()?;
    let aggregator = CohortAggregator::new(&events, &params.cohort)?;
    let table = build_table(&aggregator, params.day_offset, params.cohort.timezone.name());
    tracing::info!(
        cohorts = table.cohorts.len(),
        observed = table.cohorts.iter().filter(|c| c.day_n.is_some()).count(),
        "built cohort table"
    );

    let mut output = arg.output.open()?;
    match arg.output.format {
        OutputFormat::Json => output.write_json(&table)?,
        OutputFormat::Text => output.write_text(|out| write_table(out, &table))?,
    }
    Ok(())
}

fn build_table<U>(
    aggregator: &CohortAggregator<'_, U>,
    day_offset: i64,
    timezone: &'static str,
) -> CohortTable
where
    U: Eq + std::hash::Hash,
{
    let rows = aggregator
        .rows(day_offset)
        .into_iter()
        .map(|row| (row.cohort_date, row))
        .collect::<HashMap<NaiveDate, CohortRetentionRow>>();

    let cohorts = aggregator
        .cohorts()
        .iter()
        .map(|cohort| CohortEntry {
            cohort_date: cohort.date(),
            cohort_size: cohort.size(),
            day_n: rows.get(&cohort.date()).map(|row| DayN {
                target_date: row.target_date,
                returned_count: row.returned_count,
                retention_rate: row.retention_rate(),
            }),
        })
        .collect::<Vec<_>>();

    #[expect(clippy::cast_precision_loss)]
    let sizes = DescriptiveStats::new(cohorts.iter().map(|c| c.cohort_size as f64)).map(SizeSummary::from);

    CohortTable {
        day_offset,
        timezone,
        observed_range: aggregator.observed_range(),
        cohorts,
        sizes,
    }
}

fn write_table<W>(out: &mut W, table: &CohortTable) -> io::Result<()>
where
    W: Write,
{
    writeln!(out, "Day-{} retention by cohort ({})", table.day_offset, table.timezone)?;
    if let Some((first, last)) = table.observed_range {
        writeln!(out, "Observed logins: {first} .. {last}")?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "  {:<12} {:>8} {:<12} {:>8} {:>9}",
        "Cohort", "Size", "Target", "Returned", "Rate"
    )?;
    writeln!(out, "  {}", "-".repeat(53))?;
    for entry in &table.cohorts {
        match &entry.day_n {
            Some(day_n) => writeln!(
                out,
                "  {:<12} {:>8} {:<12} {:>8} {:>8.2}%",
                entry.cohort_date,
                entry.cohort_size,
                day_n.target_date,
                day_n.returned_count,
                100.0 * day_n.retention_rate
            )?,
            None => writeln!(
                out,
                "  {:<12} {:>8} {:<12} {:>8} {:>9}",
                entry.cohort_date, entry.cohort_size, "-", "-", "N/A"
            )?,
        }
    }

    if let Some(sizes) = &table.sizes {
        writeln!(out)?;
        writeln!(out, "Cohort sizes:")?;
        writeln!(
            out,
            "  {} cohorts, min {:.0}, median {:.1}, mean {:.1}, max {:.0}, std dev {:.1}",
            sizes.count, sizes.min, sizes.median, sizes.mean, sizes.max, sizes.std_dev
        )?;
    } else {
        writeln!(out, "  (no cohort passed the filters)")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};
    use chrono_tz::Tz;
    use retention_analysis::{cohort::CohortOptions, event::Event};

    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn events() -> Vec<Event<&'static str>> {
        let at = |day, user| Event::new(Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(), user);
        vec![
            at(1, "A"),
            at(1, "B"),
            at(1, "C"),
            at(2, "A"),
            at(2, "D"),
            at(3, "D"),
            at(3, "E"),
        ]
    }

    #[test]
    fn test_table_lists_unobserved_cohorts() {
        let events = events();
        let aggregator = CohortAggregator::new(&events, &CohortOptions::new(Tz::UTC)).unwrap();
        let table = build_table(&aggregator, 1, "UTC");

        assert_eq!(table.observed_range, Some((date(1), date(3))));
        let summary = table
            .cohorts
            .iter()
            .map(|c| (c.cohort_date, c.cohort_size, c.day_n.as_ref().map(|d| d.returned_count)))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            [
                (date(1), 3, Some(1)),
                (date(2), 1, Some(1)),
                (date(3), 1, None),
            ]
        );

        let sizes = table.sizes.unwrap();
        assert_eq!(sizes.count, 3);
        assert!((sizes.mean - 5.0 / 3.0).abs() < 1e-12);
        assert_eq!(sizes.max, 3.0);
    }

    #[test]
    fn test_text_table() {
        let events = events();
        let aggregator = CohortAggregator::new(&events, &CohortOptions::new(Tz::UTC)).unwrap();
        let table = build_table(&aggregator, 1, "UTC");

        let mut buf = Vec::new();
        write_table(&mut buf, &table).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("2024-03-01"), "{text}");
        assert!(text.contains("33.33%"), "{text}");
        assert!(text.contains("N/A"), "{text}");
        assert!(text.contains("3 cohorts"), "{text}");
    }

    #[test]
    fn test_empty_table() {
        let events = events();
        let options = CohortOptions {
            min_cohort_size: 10,
            ..CohortOptions::new(Tz::UTC)
        };
        let aggregator = CohortAggregator::new(&events, &options).unwrap();
        let table = build_table(&aggregator, 1, "UTC");
        assert!(table.cohorts.is_empty());
        assert_eq!(table.sizes, None);
    }
}
