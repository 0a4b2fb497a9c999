//! Retention configuration and its validation
//!
//! [`RetentionConfig`] is the raw configuration as written by a user: plain
//! strings and signed numbers, deserializable from JSON. [`RetentionConfig::validate`]
//! checks every value before any aggregation starts and produces the typed
//! [`RetentionParams`] the pipeline runs on.
//!
//! # Serialization
//!
//! Missing keys take their default values:
//!
//! ```json
//! {
//!   "day_offset": 7,
//!   "timezone": "Asia/Tokyo",
//!   "start_cohort": "2024-01-01",
//!   "resample_count": 5000,
//!   "seed": 42
//! }
//! ```

use std::{num::NonZeroUsize, thread};

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{
    bootstrap::BootstrapEstimator,
    cohort::CohortOptions,
    error::{Parameter, RetentionError},
};

/// Date format of cohort bounds.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Zone used when none is configured.
pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";

/// Raw, unvalidated retention configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetentionConfig {
    /// Day whose retention is computed. Zero and negative values are allowed.
    pub day_offset: i64,
    /// IANA zone name used for calendar-date bucketing.
    pub timezone: String,
    /// First cohort to include, `YYYY-MM-DD`.
    pub start_cohort: Option<String>,
    /// Last cohort to include, `YYYY-MM-DD`.
    pub end_cohort: Option<String>,
    /// Smallest cohort size to include. Fractional thresholds are allowed.
    pub min_cohort_size: f64,
    /// Number of bootstrap resamples.
    pub resample_count: i64,
    /// Confidence level of the interval, strictly between 0 and 1.
    pub confidence_level: f64,
    /// Resampling seed. A random seed is drawn if absent.
    pub seed: Option<u64>,
    /// Resampling threads. Defaults to the available parallelism.
    pub workers: Option<usize>,
}

impl Default for RetentionConfig {
    #[expect(clippy::cast_possible_wrap)]
    fn default() -> Self {
        Self {
            day_offset: 1,
            timezone: DEFAULT_TIMEZONE.to_owned(),
            start_cohort: None,
            end_cohort: None,
            min_cohort_size: 0.0,
            resample_count: BootstrapEstimator::DEFAULT_RESAMPLE_COUNT as i64,
            confidence_level: BootstrapEstimator::DEFAULT_CONFIDENCE_LEVEL,
            seed: None,
            workers: None,
        }
    }
}

/// Validated parameters of one retention computation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionParams {
    pub day_offset: i64,
    pub cohort: CohortOptions,
    pub estimator: BootstrapEstimator,
}

impl RetentionConfig {
    /// Checks every value and converts the configuration to typed parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use retention_analysis::{
    ///     error::{Parameter, RetentionError},
    ///     params::RetentionConfig,
    /// };
    ///
    /// let params = RetentionConfig::default().validate().unwrap();
    /// assert_eq!(params.day_offset, 1);
    /// assert_eq!(params.cohort.timezone.name(), "Europe/Berlin");
    ///
    /// let config = RetentionConfig {
    ///     timezone: "Mars/Olympus_Mons".to_owned(),
    ///     ..RetentionConfig::default()
    /// };
    /// assert!(matches!(
    ///     config.validate(),
    ///     Err(RetentionError::InvalidParameter { parameter: Parameter::Timezone, .. })
    /// ));
    /// ```
    pub fn validate(&self) -> Result<RetentionParams, RetentionError> {
        let timezone = self
            .timezone
            .parse::<Tz>()
            .map_err(|e| RetentionError::invalid(Parameter::Timezone, e.to_string()))?;
        let start_cohort = parse_date(Parameter::StartCohort, self.start_cohort.as_deref())?;
        let end_cohort = parse_date(Parameter::EndCohort, self.end_cohort.as_deref())?;
        if let (Some(start), Some(end)) = (start_cohort, end_cohort)
            && start > end
        {
            return Err(RetentionError::invalid(
                Parameter::StartCohort,
                format!("{start} is after end_cohort {end}"),
            ));
        }
        let min_cohort_size = cohort_size_threshold(self.min_cohort_size)?;
        let resample_count = usize::try_from(self.resample_count).map_err(|_| {
            RetentionError::invalid(
                Parameter::ResampleCount,
                format!("{} is negative", self.resample_count),
            )
        })?;
        let workers = match self.workers {
            Some(n) => NonZeroUsize::new(n)
                .ok_or_else(|| RetentionError::invalid(Parameter::Workers, "must be positive"))?,
            None => thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        };

        let mut estimator =
            BootstrapEstimator::new(resample_count, self.confidence_level)?.with_workers(workers);
        if let Some(seed) = self.seed {
            estimator = estimator.with_seed(seed);
        }

        Ok(RetentionParams {
            day_offset: self.day_offset,
            cohort: CohortOptions {
                timezone,
                start_cohort,
                end_cohort,
                min_cohort_size,
            },
            estimator,
        })
    }
}

/// Smallest integer cohort size satisfying `size >= limit`.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn cohort_size_threshold(limit: f64) -> Result<usize, RetentionError> {
    if limit.is_nan() || limit < 0.0 {
        return Err(RetentionError::invalid(
            Parameter::MinCohortSize,
            format!("{limit} is not a non-negative number"),
        ));
    }
    Ok(limit.ceil() as usize)
}

fn parse_date(parameter: Parameter, value: Option<&str>) -> Result<Option<NaiveDate>, RetentionError> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| {
                RetentionError::invalid(parameter, format!("'{s}' is not a valid YYYY-MM-DD date ({e})"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(config: &RetentionConfig) -> Option<Parameter> {
        match config.validate() {
            Err(RetentionError::InvalidParameter { parameter, .. }) => Some(parameter),
            _ => None,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let params = RetentionConfig::default().validate().unwrap();
        assert_eq!(params.cohort.min_cohort_size, 0);
        assert_eq!(params.cohort.start_cohort, None);
        assert_eq!(params.estimator.resample_count(), 10_000);
        assert!((params.estimator.confidence_level() - 0.95).abs() < f64::EPSILON);
        assert_eq!(params.estimator.seed(), None);
    }

    #[test]
    fn test_parses_bounds_and_seed() {
        let config = RetentionConfig {
            day_offset: 7,
            timezone: "Asia/Tokyo".to_owned(),
            start_cohort: Some("2024-01-01".to_owned()),
            end_cohort: Some("2024-01-31".to_owned()),
            min_cohort_size: 25.0,
            seed: Some(9),
            workers: Some(3),
            ..RetentionConfig::default()
        };
        let params = config.validate().unwrap();
        assert_eq!(params.day_offset, 7);
        assert_eq!(params.cohort.timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(params.cohort.start_cohort, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(params.cohort.end_cohort, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(params.cohort.min_cohort_size, 25);
        assert_eq!(params.estimator.seed().map(|s| s.value()), Some(9));
        assert_eq!(params.estimator.workers().get(), 3);
    }

    #[test]
    fn test_non_positive_offsets_are_allowed() {
        for day_offset in [0, -3] {
            let config = RetentionConfig {
                day_offset,
                ..RetentionConfig::default()
            };
            assert_eq!(config.validate().unwrap().day_offset, day_offset);
        }
    }

    #[test]
    fn test_rejects_each_invalid_value() {
        let base = RetentionConfig::default;
        let cases = [
            (
                RetentionConfig {
                    timezone: "Europe/Atlantis".to_owned(),
                    ..base()
                },
                Parameter::Timezone,
            ),
            (
                RetentionConfig {
                    start_cohort: Some("2024-02-30".to_owned()),
                    ..base()
                },
                Parameter::StartCohort,
            ),
            (
                RetentionConfig {
                    end_cohort: Some("31/01/2024".to_owned()),
                    ..base()
                },
                Parameter::EndCohort,
            ),
            (
                RetentionConfig {
                    start_cohort: Some("2024-02-01".to_owned()),
                    end_cohort: Some("2024-01-01".to_owned()),
                    ..base()
                },
                Parameter::StartCohort,
            ),
            (
                RetentionConfig {
                    min_cohort_size: -1.0,
                    ..base()
                },
                Parameter::MinCohortSize,
            ),
            (
                RetentionConfig {
                    min_cohort_size: f64::NAN,
                    ..base()
                },
                Parameter::MinCohortSize,
            ),
            (
                RetentionConfig {
                    resample_count: -10,
                    ..base()
                },
                Parameter::ResampleCount,
            ),
            (
                RetentionConfig {
                    resample_count: 0,
                    ..base()
                },
                Parameter::ResampleCount,
            ),
            (
                RetentionConfig {
                    confidence_level: 1.0,
                    ..base()
                },
                Parameter::ConfidenceLevel,
            ),
            (
                RetentionConfig {
                    confidence_level: 0.0,
                    ..base()
                },
                Parameter::ConfidenceLevel,
            ),
            (
                RetentionConfig {
                    workers: Some(0),
                    ..base()
                },
                Parameter::Workers,
            ),
        ];
        for (config, parameter) in cases {
            assert_eq!(rejected(&config), Some(parameter), "{config:?}");
        }
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: RetentionConfig =
            serde_json::from_str(r#"{ "day_offset": 3, "timezone": "UTC", "seed": 5 }"#).unwrap();
        assert_eq!(config.day_offset, 3);
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.resample_count, 10_000);
        assert_eq!(config.min_cohort_size, 0.0);
    }

    #[test]
    fn test_fractional_min_cohort_size_rounds_up() {
        let config: RetentionConfig = serde_json::from_str(r#"{ "min_cohort_size": 2.5 }"#).unwrap();
        assert_eq!(config.validate().unwrap().cohort.min_cohort_size, 3);

        for (limit, threshold) in [(0.0, 0), (0.1, 1), (3.0, 3), (3.000_001, 4)] {
            let config = RetentionConfig {
                min_cohort_size: limit,
                ..RetentionConfig::default()
            };
            assert_eq!(config.validate().unwrap().cohort.min_cohort_size, threshold, "{limit}");
        }
    }

    #[test]
    fn test_deserialize_rejects_unknown_keys() {
        let result = serde_json::from_str::<RetentionConfig>(r#"{ "n": 3 }"#);
        assert!(result.is_err());
    }
}
