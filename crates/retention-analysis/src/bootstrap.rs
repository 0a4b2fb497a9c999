//! Bootstrap confidence intervals for day-N retention
//!
//! The retention of a row set is the size-weighted ratio
//! `sum(returned_count) / sum(cohort_size)`, so large cohorts dominate small
//! ones. Its sampling distribution is approximated by resampling cohort rows
//! (not individual users) with replacement and recomputing the weighted
//! ratio on every resample.
//!
//! The interval bounds are type-7 quantiles of the resampled ratios at
//! `(1 - confidence_level) / 2` and `1 - (1 - confidence_level) / 2`.

use std::num::NonZeroUsize;

use retention_stats::{
    descriptive::DescriptiveStats,
    quantile::quantile_sorted,
    resample::{Bootstrap, ResampleSeed},
};
use serde::Serialize;
use tracing::debug;

use crate::{
    cohort::CohortRetentionRow,
    error::{Parameter, RetentionError},
};

/// Retention point estimate with its bootstrap confidence interval.
///
/// All ratios are in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RetentionResult {
    /// Size-weighted retention of the observed rows.
    pub point_estimate: f64,
    /// Lower bound of the confidence interval.
    pub ci_low: f64,
    /// Upper bound of the confidence interval.
    pub ci_high: f64,
    /// Mean of the resampled ratios.
    pub bootstrap_mean: f64,
    /// Standard deviation of the resampled ratios.
    pub std_error: f64,
    /// Number of cohort rows the estimate is based on.
    pub cohort_count: usize,
    /// Seed that reproduces the resampling.
    pub seed: u64,
}

/// Size-weighted retention ratio of a set of rows.
///
/// Returns NaN for an empty set.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use retention_analysis::{bootstrap::weighted_ratio, cohort::CohortRetentionRow};
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let row = |cohort_size, returned_count| CohortRetentionRow {
///     cohort_date: date,
///     target_date: date,
///     cohort_size,
///     returned_count,
/// };
///
/// // 60 / 110, not the mean of 0.5 and 1.0
/// let rows = [row(100, 50), row(10, 10)];
/// assert!((weighted_ratio(&rows) - 60.0 / 110.0).abs() < 1e-12);
/// ```
#[expect(clippy::cast_precision_loss)]
pub fn weighted_ratio<'a, I>(rows: I) -> f64
where
    I: IntoIterator<Item = &'a CohortRetentionRow>,
{
    let (returned, size) = rows
        .into_iter()
        .fold((0_usize, 0_usize), |(returned, size), row| {
            (returned + row.returned_count, size + row.cohort_size)
        });
    returned as f64 / size as f64
}

/// Estimates retention and its confidence interval by bootstrap resampling.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapEstimator {
    resample_count: usize,
    confidence_level: f64,
    seed: Option<ResampleSeed>,
    workers: NonZeroUsize,
}

impl BootstrapEstimator {
    pub const DEFAULT_RESAMPLE_COUNT: usize = 10_000;
    pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

    /// Creates a single-threaded estimator with a random seed.
    ///
    /// `resample_count` must be positive and `confidence_level` must lie in
    /// the open interval `(0, 1)`.
    pub fn new(resample_count: usize, confidence_level: f64) -> Result<Self, RetentionError> {
        if resample_count == 0 {
            return Err(RetentionError::invalid(
                Parameter::ResampleCount,
                "must be positive",
            ));
        }
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(RetentionError::invalid(
                Parameter::ConfidenceLevel,
                format!("{confidence_level} is not strictly between 0 and 1"),
            ));
        }
        Ok(Self {
            resample_count,
            confidence_level,
            seed: None,
            workers: NonZeroUsize::MIN,
        })
    }

    /// Pins the resampling seed.
    #[must_use]
    pub fn with_seed(mut self, seed: impl Into<ResampleSeed>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    /// Spreads resampling over `workers` threads. The result does not depend
    /// on the worker count.
    #[must_use]
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn resample_count(&self) -> usize {
        self.resample_count
    }

    #[must_use]
    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    #[must_use]
    pub fn seed(&self) -> Option<ResampleSeed> {
        self.seed
    }

    #[must_use]
    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    /// Computes the point estimate and the bootstrap interval of `rows`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use retention_analysis::{bootstrap::BootstrapEstimator, cohort::CohortRetentionRow};
    ///
    /// let rows = (1..=5)
    ///     .map(|day| CohortRetentionRow {
    ///         cohort_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
    ///         target_date: NaiveDate::from_ymd_opt(2024, 3, day + 1).unwrap(),
    ///         cohort_size: 10 * day as usize,
    ///         returned_count: 3 * day as usize,
    ///     })
    ///     .collect::<Vec<_>>();
    ///
    /// let estimator = BootstrapEstimator::new(1000, 0.95).unwrap().with_seed(42);
    /// let result = estimator.estimate(&rows).unwrap();
    ///
    /// assert!((result.point_estimate - 0.3).abs() < 1e-12);
    /// assert!(result.ci_low <= result.bootstrap_mean && result.bootstrap_mean <= result.ci_high);
    /// assert_eq!(result.seed, 42);
    /// ```
    pub fn estimate(&self, rows: &[CohortRetentionRow]) -> Result<RetentionResult, RetentionError> {
        if rows.is_empty() {
            return Err(RetentionError::EmptyInput);
        }

        let seed = self.seed.unwrap_or_else(ResampleSeed::random);
        let point_estimate = weighted_ratio(rows);

        let mut ratios = Bootstrap::new(self.resample_count, seed)
            .with_workers(self.workers)
            .run(rows, |sample| weighted_ratio(sample.iter().copied()));
        ratios.sort_by(f64::total_cmp);

        let tail = (1.0 - self.confidence_level) / 2.0;
        let ci_low = quantile_sorted(&ratios, tail);
        let ci_high = quantile_sorted(&ratios, 1.0 - tail);
        let summary = DescriptiveStats::from_sorted(&ratios).ok_or(RetentionError::EmptyInput)?;

        debug!(
            rows = rows.len(),
            resamples = ratios.len(),
            workers = self.workers.get(),
            %seed,
            "bootstrap finished"
        );

        Ok(RetentionResult {
            point_estimate,
            ci_low,
            ci_high,
            bootstrap_mean: summary.mean,
            std_error: summary.std_dev,
            cohort_count: rows.len(),
            seed: seed.value(),
        })
    }
}
