//! Arguments shared by every subcommand

use std::path::PathBuf;

use anyhow::Context as _;
use retention_analysis::{
    event::Event,
    params::{RetentionConfig, RetentionParams},
};

use crate::util::{self, EventLogFormat, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct InputArg {
    /// Path to the login log (delimited text with a header row)
    pub events: PathBuf,
    /// Field delimiter of the login log
    #[arg(long, default_value_t = ';')]
    pub delimiter: char,
    /// Column holding login times as UNIX epoch seconds
    #[arg(long, default_value = "auth_ts")]
    pub time_column: String,
    /// Column holding user identifiers
    #[arg(long, default_value = "uid")]
    pub user_column: String,
}

impl InputArg {
    pub(crate) fn read_events(&self) -> anyhow::Result<Vec<Event<String>>> {
        let delimiter = u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .with_context(|| format!("Delimiter must be an ASCII character: {:?}", self.delimiter))?;
        let format = EventLogFormat {
            delimiter,
            time_column: self.time_column.clone(),
            user_column: self.user_column.clone(),
        };
        util::read_events_file(&self.events, &format)
    }
}

/// Retention parameters. Flags override values read from `--params`.
#[derive(Debug, Clone, Default, clap::Args)]
pub(crate) struct ParamsArg {
    /// JSON file with base retention parameters
    #[arg(long)]
    pub params: Option<PathBuf>,
    /// IANA time zone used to bucket logins into calendar dates [default: Europe/Berlin]
    #[arg(long)]
    pub timezone: Option<String>,
    /// First cohort date to include (YYYY-MM-DD)
    #[arg(long)]
    pub start_cohort: Option<String>,
    /// Last cohort date to include (YYYY-MM-DD)
    #[arg(long)]
    pub end_cohort: Option<String>,
    /// Smallest cohort size to include, may be fractional [default: 0]
    #[arg(long, allow_negative_numbers = true)]
    pub min_cohort_size: Option<f64>,
    /// Number of bootstrap resamples [default: 10000]
    #[arg(long, allow_negative_numbers = true)]
    pub resample_count: Option<i64>,
    /// Confidence level of the interval [default: 0.95]
    #[arg(long)]
    pub confidence_level: Option<f64>,
    /// Resampling seed [default: random]
    #[arg(long)]
    pub seed: Option<u64>,
    /// Resampling threads [default: available parallelism]
    #[arg(long)]
    pub workers: Option<usize>,
}

impl ParamsArg {
    /// Merges the parameter file and explicit flags into one configuration.
    pub(crate) fn config(&self, day_offset: Option<i64>) -> anyhow::Result<RetentionConfig> {
        let mut config = match &self.params {
            Some(path) => util::read_params_file(path)?,
            None => RetentionConfig::default(),
        };

        if let Some(day_offset) = day_offset {
            config.day_offset = day_offset;
        }
        if let Some(timezone) = &self.timezone {
            config.timezone.clone_from(timezone);
        }
        if let Some(date) = &self.start_cohort {
            config.start_cohort = Some(date.clone());
        }
        if let Some(date) = &self.end_cohort {
            config.end_cohort = Some(date.clone());
        }
        if let Some(size) = self.min_cohort_size {
            config.min_cohort_size = size;
        }
        if let Some(count) = self.resample_count {
            config.resample_count = count;
        }
        if let Some(level) = self.confidence_level {
            config.confidence_level = level;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }

        Ok(config)
    }

    pub(crate) fn validate(&self, day_offset: Option<i64>) -> anyhow::Result<RetentionParams> {
        let config = self.config(day_offset)?;
        tracing::debug!(?config, "retention configuration");
        let params = config.validate().context("Invalid retention parameters")?;
        Ok(params)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub(crate) struct OutputArg {
    /// Output file path [default: stdout]
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl OutputArg {
    pub(crate) fn open(&self) -> anyhow::Result<Output> {
        Output::new(self.output.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("retention-cli-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_flags_without_params_file_use_defaults() {
        let arg = ParamsArg {
            timezone: Some("UTC".to_owned()),
            seed: Some(3),
            ..ParamsArg::default()
        };
        let config = arg.config(Some(7)).unwrap();
        assert_eq!(
            config,
            RetentionConfig {
                day_offset: 7,
                timezone: "UTC".to_owned(),
                seed: Some(3),
                ..RetentionConfig::default()
            }
        );
    }

    #[test]
    fn test_flags_override_params_file() {
        let path = temp_file(
            "params.json",
            r#"{ "day_offset": 3, "timezone": "Asia/Tokyo", "min_cohort_size": 10, "seed": 1 }"#,
        );
        let arg = ParamsArg {
            params: Some(path.clone()),
            min_cohort_size: Some(20.5),
            ..ParamsArg::default()
        };
        let config = arg.config(None).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.day_offset, 3);
        assert_eq!(config.timezone, "Asia/Tokyo");
        assert!((config.min_cohort_size - 20.5).abs() < f64::EPSILON);
        assert_eq!(config.seed, Some(1));
    }

    #[test]
    fn test_missing_params_file_is_an_error() {
        let arg = ParamsArg {
            params: Some(Path::new("/nonexistent/params.json").to_owned()),
            ..ParamsArg::default()
        };
        assert!(arg.config(None).is_err());
    }

    #[test]
    fn test_invalid_flag_fails_validation() {
        let arg = ParamsArg {
            confidence_level: Some(1.5),
            ..ParamsArg::default()
        };
        assert!(arg.validate(Some(1)).is_err());
    }

    #[test]
    fn test_rejects_non_ascii_delimiter() {
        let arg = InputArg {
            events: temp_file("events.csv", "auth_ts;uid\n1;a\n"),
            delimiter: 'é',
            time_column: "auth_ts".to_owned(),
            user_column: "uid".to_owned(),
        };
        let result = arg.read_events();
        fs::remove_file(&arg.events).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_reads_events_file() {
        let arg = InputArg {
            events: temp_file("tabs.tsv", "uid\tauth_ts\nu1\t0\nu2\t60\n"),
            delimiter: '\t',
            time_column: "auth_ts".to_owned(),
            user_column: "uid".to_owned(),
        };
        let events = arg.read_events().unwrap();
        fs::remove_file(&arg.events).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].user_id, "u2");
    }
}
