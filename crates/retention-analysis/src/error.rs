//! Error conditions surfaced by the retention pipeline.

/// Configuration key that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Parameter {
    #[display("timezone")]
    Timezone,
    #[display("start_cohort")]
    StartCohort,
    #[display("end_cohort")]
    EndCohort,
    #[display("min_cohort_size")]
    MinCohortSize,
    #[display("resample_count")]
    ResampleCount,
    #[display("confidence_level")]
    ConfidenceLevel,
    #[display("workers")]
    Workers,
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum RetentionError {
    /// A configuration value is outside its documented domain.
    #[display("invalid {parameter}: {reason}")]
    InvalidParameter { parameter: Parameter, reason: String },
    /// No cohort row survived filtering for the requested day offset.
    #[display("no cohort has observed activity on day {day_offset} after filtering")]
    EmptyResult { day_offset: i64 },
    /// The estimator was given no rows to resample.
    #[display("cannot estimate retention from an empty row set")]
    EmptyInput,
    /// The event sequence cannot be interpreted as timestamp/user pairs.
    #[display("malformed input: {reason}")]
    MalformedInput { reason: String },
}

impl RetentionError {
    pub(crate) fn invalid(parameter: Parameter, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            reason: reason.into(),
        }
    }
}
