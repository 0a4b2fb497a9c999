//! End-to-end retention computation.
//!
//! Chains [`CohortAggregator`] and [`BootstrapEstimator`]: events are
//! aggregated once, then the row set for the requested offset is resampled.
//! [`retention_curve`] reuses the same aggregation for a range of offsets.

use std::{hash::Hash, ops::RangeInclusive};

use retention_stats::resample::ResampleSeed;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    bootstrap::{BootstrapEstimator, RetentionResult},
    cohort::{CohortAggregator, CohortRetentionRow},
    error::RetentionError,
    event::Event,
    params::RetentionParams,
};

/// Day-N retention of a login log together with the rows it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionReport {
    pub day_offset: i64,
    pub timezone: &'static str,
    pub confidence_level: f64,
    pub resample_count: usize,
    pub rows: Vec<CohortRetentionRow>,
    pub result: RetentionResult,
}

/// Retention of one offset of a [`retention_curve`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurvePoint {
    pub day_offset: i64,
    /// Cohorts whose target date was observed.
    pub cohort_count: usize,
    /// `None` if no cohort reached this offset within the log.
    pub result: Option<RetentionResult>,
}

/// Computes day-N retention of `events` with a bootstrap confidence interval.
///
/// Fails with [`RetentionError::EmptyResult`] before any resampling if no
/// cohort row survives filtering.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone as _, Utc};
/// use retention_analysis::{event::Event, params::RetentionConfig, retention};
///
/// let at = |day, user| Event::new(Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(), user);
/// let events = [at(1, "A"), at(1, "B"), at(1, "C"), at(2, "A"), at(2, "B")];
///
/// let params = RetentionConfig {
///     timezone: "UTC".to_owned(),
///     seed: Some(1),
///     ..RetentionConfig::default()
/// }
/// .validate()
/// .unwrap();
///
/// let report = retention::compute_retention(&events, &params).unwrap();
/// assert!((report.result.point_estimate - 2.0 / 3.0).abs() < 1e-12);
/// ```
pub fn compute_retention<U>(
    events: &[Event<U>],
    params: &RetentionParams,
) -> Result<RetentionReport, RetentionError>
where
    U: Eq + Hash,
{
    warn_questionable_offset(params.day_offset);

    let aggregator = CohortAggregator::new(events, &params.cohort)?;
    let rows = aggregator.retention_rows(params.day_offset)?;
    let result = params.estimator.estimate(&rows)?;

    info!(
        day_offset = params.day_offset,
        cohorts = result.cohort_count,
        retention = result.point_estimate,
        seed = result.seed,
        "computed retention"
    );

    Ok(RetentionReport {
        day_offset: params.day_offset,
        timezone: params.cohort.timezone.name(),
        confidence_level: params.estimator.confidence_level(),
        resample_count: params.estimator.resample_count(),
        rows,
        result,
    })
}

/// Computes retention for every offset in `offsets`.
///
/// All offsets share one aggregation and one resampling seed (the configured
/// one, or a single random draw). `params.day_offset` is ignored.
pub fn retention_curve<U>(
    events: &[Event<U>],
    params: &RetentionParams,
    offsets: RangeInclusive<i64>,
) -> Result<Vec<CurvePoint>, RetentionError>
where
    U: Eq + Hash,
{
    let aggregator = CohortAggregator::new(events, &params.cohort)?;
    let seed = params.estimator.seed().unwrap_or_else(ResampleSeed::random);
    let estimator: BootstrapEstimator = params.estimator.clone().with_seed(seed);
    info!(%seed, "computing retention curve");

    offsets
        .map(|day_offset| -> Result<CurvePoint, RetentionError> {
            let rows = aggregator.rows(day_offset);
            let result = if rows.is_empty() {
                debug!(day_offset, "no cohort reached offset");
                None
            } else {
                Some(estimator.estimate(&rows)?)
            };
            Ok(CurvePoint {
                day_offset,
                cohort_count: rows.len(),
                result,
            })
        })
        .collect()
}

fn warn_questionable_offset(day_offset: i64) {
    match day_offset {
        0 => warn!("day 0 retention is always 100%; computing anyway"),
        n if n < 0 => {
            warn!(day_offset = n, "nobody can return before their first login; computing anyway");
        }
        _ => {}
    }
}
