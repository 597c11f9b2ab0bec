//! Error types for lifecycle-managed metrics
//!
//! Every fallible operation in this crate returns [`MetricsResult`]. Absence
//! of a series is never an error: lookups return `Option` and deletions
//! return `bool`.
//!
//! [`MetricsError::severity`] tells callers how loudly to report a failure
//! without matching on individual variants.

use std::fmt;

use thiserror::Error;

/// Result alias for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Errors raised while building or addressing lifecycle metrics
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The underlying `prometheus` family or registry rejected the request
    #[error("prometheus rejected the metric: {0}")]
    Registry(#[from] prometheus::Error),

    /// A declared label collides with the label reserved for generation tags
    #[error("label name '{name}' is reserved for generation tags")]
    ReservedLabel { name: String },

    /// The number of label values does not match the declared label names
    #[error("inconsistent label cardinality: expected {expected} label values, got {got}")]
    Cardinality { expected: usize, got: usize },

    /// A label map named a label the vector does not declare
    #[error("label '{name}' is not declared on this metric")]
    UnknownLabel { name: String },

    /// Configuration values out of range
    #[error("invalid configuration for '{field}': {message}")]
    Config { field: String, message: String },
}

impl MetricsError {
    /// Create a configuration error for a named field
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config { field: field.into(), message: message.into() }
    }

    /// Whether the error comes from a caller passing labels that do not fit
    /// the declared label set
    #[must_use]
    pub fn is_label_error(&self) -> bool {
        matches!(
            self,
            Self::ReservedLabel { .. } | Self::Cardinality { .. } | Self::UnknownLabel { .. }
        )
    }
}

/// How loudly a failed operation should be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Expected during normal operation, such as registering a metric twice
    /// from code paths that race at startup
    Warning,
    /// Caller or configuration bug
    Error,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

impl MetricsError {
    /// Severity to log this error at
    ///
    /// Duplicate registration is a warning; everything else, including every
    /// label and configuration error, is an error. None of these errors is
    /// transient, so there is no retry classification.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifecycle_metrics::{ErrorSeverity, MetricsError};
    ///
    /// let err = MetricsError::from(prometheus::Error::AlreadyReg);
    /// assert_eq!(err.severity(), ErrorSeverity::Warning);
    /// assert_eq!(MetricsError::config("expiration", "too large").severity(), ErrorSeverity::Error);
    /// ```
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Registry(prometheus::Error::AlreadyReg) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }
}
