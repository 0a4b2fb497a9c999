//! Day-N user retention from login logs
//!
//! This crate turns a raw log of `(timestamp, user)` logins into a day-N
//! retention estimate with a bootstrap confidence interval.
//!
//! # Overview
//!
//! The computation runs in two stages:
//!
//! 1. **Cohort aggregation** ([`cohort::CohortAggregator`]): bucket logins
//!    into local calendar dates, assign every user to the cohort of their
//!    first login date and count how many members of each cohort were active
//!    exactly N days later.
//! 2. **Bootstrap estimation** ([`bootstrap::BootstrapEstimator`]): compute
//!    the size-weighted retention ratio over all cohorts and resample cohort
//!    rows with replacement to obtain a confidence interval.
//!
//! Configuration enters through [`params::RetentionConfig`], which is
//! validated into [`params::RetentionParams`] before any work starts. The
//! [`retention`] module chains both stages.
//!
//! # Errors
//!
//! Every failure is a [`error::RetentionError`]:
//!
//! - `InvalidParameter`: a configuration value is out of its domain
//! - `EmptyResult`: no cohort reached day N within the log
//! - `EmptyInput`: the estimator was given no rows
//! - `MalformedInput`: the event log is empty or contains unusable values
//!
//! # Examples
//!
//! ```
//! use chrono::{TimeZone as _, Utc};
//! use retention_analysis::{event::Event, params::RetentionConfig, retention};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let events = [
//!     Event::from_epoch_seconds(1_709_290_800, "alice")?, // 2024-03-01 11:00 UTC
//!     Event::from_epoch_seconds(1_709_294_400, "bob")?,   // 2024-03-01 12:00 UTC
//!     Event::from_epoch_seconds(1_709_380_800, "alice")?, // 2024-03-02 12:00 UTC
//! ];
//!
//! let params = RetentionConfig {
//!     day_offset: 1,
//!     timezone: "Europe/Berlin".to_owned(),
//!     resample_count: 1000,
//!     seed: Some(7),
//!     ..RetentionConfig::default()
//! }
//! .validate()?;
//!
//! let report = retention::compute_retention(&events, &params)?;
//! assert_eq!(report.result.point_estimate, 0.5);
//! assert_eq!(
//!     report.rows[0].cohort_date,
//!     Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap().date_naive()
//! );
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod cohort;
pub mod error;
pub mod event;
pub mod params;
pub mod retention;
