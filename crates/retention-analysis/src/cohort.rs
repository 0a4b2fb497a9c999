//! Cohort construction and the day-N join
//!
//! This module turns a raw login log into per-cohort retention counts.
//!
//! # Overview
//!
//! Every user belongs to exactly one cohort: the local calendar date of the
//! user's first login. Independently, every calendar date has a set of users
//! active on that date. For a day offset `N`, a cohort born on date `d`
//! is joined with the activity of date `d + N`:
//!
//! ```text
//! cohorts:   2024-03-01 {A, B, C}      2024-03-02 {D}
//! activity:  2024-03-01 {A, B, C}      2024-03-02 {A, B, D}
//!
//! N = 1:     2024-03-01 -> 2024-03-02  size 3, returned 2
//!            2024-03-02 -> 2024-03-03  after the last login, dropped
//! ```
//!
//! # Unobserved outcomes
//!
//! The log covers every date from its first to its last login. A cohort
//! whose target date lies outside that span is dropped rather than reported
//! with zero returns: the log does not cover that date yet. A date inside
//! the span with no logins at all is covered, and its cohorts count zero
//! returns.
//!
//! # Calendar days
//!
//! Dates are calendar dates in the configured zone, not 24-hour windows from
//! the first login. A user first seen at 23:00 and one first seen at 01:00 on
//! the same local date share a cohort.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    hash::Hash,
};

use chrono::{NaiveDate, TimeDelta};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

use crate::{
    error::{Parameter, RetentionError},
    event::Event,
};

/// Options controlling which cohorts are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CohortOptions {
    /// Zone in which instants are bucketed into calendar dates.
    pub timezone: Tz,
    /// Earliest cohort date to keep (inclusive). `None` keeps all earlier cohorts.
    pub start_cohort: Option<NaiveDate>,
    /// Latest cohort date to keep (inclusive). `None` keeps all later cohorts.
    pub end_cohort: Option<NaiveDate>,
    /// Cohorts with fewer members than this are dropped.
    pub min_cohort_size: usize,
}

impl CohortOptions {
    /// Options with no date bounds and no size filtering.
    #[must_use]
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            start_cohort: None,
            end_cohort: None,
            min_cohort_size: 0,
        }
    }

    fn contains(&self, date: NaiveDate) -> bool {
        self.start_cohort.is_none_or(|start| start <= date)
            && self.end_cohort.is_none_or(|end| date <= end)
    }
}

/// Retention counts of one cohort for one day offset.
///
/// Invariant: `1 <= cohort_size` and `returned_count <= cohort_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CohortRetentionRow {
    /// Local date of the first login of every member.
    pub cohort_date: NaiveDate,
    /// `cohort_date` shifted by the day offset.
    pub target_date: NaiveDate,
    /// Number of members of the cohort.
    pub cohort_size: usize,
    /// Number of members active on `target_date`.
    pub returned_count: usize,
}

impl CohortRetentionRow {
    /// Fraction of the cohort active on the target date.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn retention_rate(&self) -> f64 {
        self.returned_count as f64 / self.cohort_size as f64
    }
}

/// Users sharing the same local date of first activity.
#[derive(Debug, Clone)]
pub struct Cohort<'a, U> {
    date: NaiveDate,
    members: HashSet<&'a U>,
}

impl<'a, U> Cohort<'a, U> {
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> impl Iterator<Item = &'a U> + '_ {
        self.members.iter().copied()
    }
}

/// Cohort membership and daily activity of one login log.
///
/// Both tables are independent of the day offset, so one aggregator can
/// answer any number of offsets through [`Self::rows`].
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, TimeZone as _, Utc};
/// use chrono_tz::Tz;
/// use retention_analysis::{
///     cohort::{CohortAggregator, CohortOptions},
///     event::Event,
/// };
///
/// let at = |day, user| Event::new(Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(), user);
/// let events = [at(1, "A"), at(1, "B"), at(1, "C"), at(2, "A"), at(2, "B")];
///
/// let aggregator = CohortAggregator::new(&events, &CohortOptions::new(Tz::UTC)).unwrap();
/// let rows = aggregator.retention_rows(1).unwrap();
///
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].cohort_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
/// assert_eq!((rows[0].cohort_size, rows[0].returned_count), (3, 2));
/// ```
#[derive(Debug, Clone)]
pub struct CohortAggregator<'a, U> {
    cohorts: Vec<Cohort<'a, U>>,
    activity: HashMap<NaiveDate, HashSet<&'a U>>,
}

impl<'a, U> CohortAggregator<'a, U>
where
    U: Eq + Hash,
{
    /// Buckets `events` into cohorts and daily activity.
    ///
    /// Cohorts outside `[start_cohort, end_cohort]` or smaller than
    /// `min_cohort_size` are dropped. Daily activity always covers the whole
    /// log.
    pub fn new(events: &'a [Event<U>], options: &CohortOptions) -> Result<Self, RetentionError> {
        if events.is_empty() {
            return Err(RetentionError::malformed("event log is empty"));
        }
        if let (Some(start), Some(end)) = (options.start_cohort, options.end_cohort)
            && start > end
        {
            return Err(RetentionError::invalid(
                Parameter::StartCohort,
                format!("{start} is after end_cohort {end}"),
            ));
        }

        let mut first_dates = HashMap::<&U, NaiveDate>::new();
        let mut activity = HashMap::<NaiveDate, HashSet<&U>>::new();
        for event in events {
            let date = event.local_date(options.timezone)?;
            first_dates
                .entry(&event.user_id)
                .and_modify(|first| *first = (*first).min(date))
                .or_insert(date);
            activity.entry(date).or_default().insert(&event.user_id);
        }

        let mut by_date = BTreeMap::<NaiveDate, HashSet<&U>>::new();
        for (user, date) in first_dates {
            by_date.entry(date).or_default().insert(user);
        }
        let total_cohorts = by_date.len();

        let cohorts = by_date
            .into_iter()
            .filter(|(date, _)| options.contains(*date))
            .filter(|(_, members)| members.len() >= options.min_cohort_size)
            .map(|(date, members)| Cohort { date, members })
            .collect::<Vec<_>>();

        debug!(
            events = events.len(),
            active_days = activity.len(),
            total_cohorts,
            kept_cohorts = cohorts.len(),
            "aggregated login log"
        );

        Ok(Self { cohorts, activity })
    }

    /// Cohorts that passed the date and size filters, in date order.
    #[must_use]
    pub fn cohorts(&self) -> &[Cohort<'a, U>] {
        &self.cohorts
    }

    /// Number of distinct users active on `date`, or `None` if no activity
    /// was observed that day.
    #[must_use]
    pub fn active_users(&self, date: NaiveDate) -> Option<usize> {
        self.activity.get(&date).map(HashSet::len)
    }

    /// Earliest and latest dates with observed activity.
    #[must_use]
    pub fn observed_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.activity.keys().min()?;
        let last = self.activity.keys().max()?;
        Some((*first, *last))
    }

    /// Joins every kept cohort with the activity `day_offset` days later.
    ///
    /// Cohorts whose target date lies outside [`Self::observed_range`], or
    /// outside the representable calendar, are omitted. A target date inside
    /// the range without any login yields zero returns. The result may be
    /// empty.
    #[must_use]
    pub fn rows(&self, day_offset: i64) -> Vec<CohortRetentionRow> {
        let (Some(offset), Some((first, last))) =
            (TimeDelta::try_days(day_offset), self.observed_range())
        else {
            return vec![];
        };

        let rows = self
            .cohorts
            .iter()
            .filter_map(|cohort| {
                let target_date = cohort
                    .date
                    .checked_add_signed(offset)
                    .filter(|date| (first..=last).contains(date))?;
                let returned_count = self
                    .activity
                    .get(&target_date)
                    .map_or(0, |active| cohort.members.intersection(active).count());
                Some(CohortRetentionRow {
                    cohort_date: cohort.date,
                    target_date,
                    cohort_size: cohort.size(),
                    returned_count,
                })
            })
            .collect::<Vec<_>>();

        debug!(
            day_offset,
            rows = rows.len(),
            unobserved = self.cohorts.len() - rows.len(),
            "joined cohorts with target-day activity"
        );
        rows
    }

    /// Like [`Self::rows`], but an empty row set is an error.
    pub fn retention_rows(&self, day_offset: i64) -> Result<Vec<CohortRetentionRow>, RetentionError> {
        let rows = self.rows(day_offset);
        if rows.is_empty() {
            return Err(RetentionError::EmptyResult { day_offset });
        }
        Ok(rows)
    }
}

/// Builds the per-cohort retention table of `events` for `day_offset`.
///
/// Shorthand for [`CohortAggregator::new`] followed by
/// [`CohortAggregator::retention_rows`].
pub fn aggregate<U>(
    events: &[Event<U>],
    options: &CohortOptions,
    day_offset: i64,
) -> Result<Vec<CohortRetentionRow>, RetentionError>
where
    U: Eq + Hash,
{
    CohortAggregator::new(events, options)?.retention_rows(day_offset)
}
