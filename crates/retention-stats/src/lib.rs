//! Statistical utilities for retention analysis.
//!
//! This crate provides the numeric building blocks used by the retention
//! pipeline. None of it knows about users or cohorts:
//!
//! - **Descriptive statistics**: mean, median, variance, standard deviation, etc.
//! - **Quantiles**: type-7 (linear interpolation) quantiles of a sample
//! - **Bootstrap resampling**: seedable, parallel, deterministic resampling
//!   of an arbitrary statistic
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`quantile`]: Quantile computation
//! - [`resample`]: Bootstrap resampling engine
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use retention_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Computing a percentile interval of a bootstrap distribution
//!
//! ```
//! use retention_stats::{
//!     quantile::quantile_sorted,
//!     resample::{Bootstrap, ResampleSeed},
//! };
//!
//! let observations = [0.2, 0.4, 0.4, 0.6, 0.9];
//! let mut means = Bootstrap::new(1000, ResampleSeed::from(1)).run(&observations, |sample| {
//!     sample.iter().copied().sum::<f64>() / sample.len() as f64
//! });
//! means.sort_by(f64::total_cmp);
//!
//! let (low, high) = (quantile_sorted(&means, 0.025), quantile_sorted(&means, 0.975));
//! assert!(0.2 <= low && low <= high && high <= 0.9);
//! ```

pub mod descriptive;
pub mod quantile;
pub mod resample;
