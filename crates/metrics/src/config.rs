//! Lifecycle configuration for metric vectors and single collectors
//!
//! A [`LifecycleConfig`] carries the two knobs of a lifecycle-managed metric:
//! how long a fresh series reports its neutral snapshot, and how long a series
//! may sit untouched before it is dropped.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use lifecycle_metrics::LifecycleConfig;
//!
//! let config = LifecycleConfig::builder()
//!     .warm_up(Duration::from_secs(2))
//!     .expiration(Duration::from_secs(10))
//!     .build()
//!     .unwrap();
//!
//! assert!(config.is_expiring());
//! ```

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, MetricsResult};

/// Upper bound for any configured duration
pub const MAX_DURATION: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Warm-up and expiration settings
///
/// The default has a zero warm-up (new series still report one neutral
/// collection) and never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LifecycleConfig {
    /// How long a new series reports its neutral snapshot after its first
    /// collection
    #[cfg_attr(
        feature = "serde",
        serde(rename = "warm_up_ms", with = "duration_millis", default)
    )]
    pub warm_up: Duration,

    /// How long a series may go without being looked up before it is
    /// dropped; zero disables expiration
    #[cfg_attr(
        feature = "serde",
        serde(rename = "expiration_ms", with = "duration_millis", default)
    )]
    pub expiration: Duration,

    /// Where expired series are removed
    #[cfg_attr(feature = "serde", serde(default))]
    pub sweep: SweepMode,
}

/// How expired series found during a collection are removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SweepMode {
    /// Hand expired series to a per-vector worker thread
    #[default]
    Background,
    /// Remove expired series on the collecting thread once the scan ends
    Inline,
}

impl LifecycleConfig {
    /// Create a new configuration builder
    pub fn builder() -> LifecycleConfigBuilder {
        LifecycleConfigBuilder::new()
    }

    /// Warm-up only; series never expire
    pub fn warm_up(warm_up: Duration) -> Self {
        Self { warm_up, ..Self::default() }
    }

    /// Expiration only; series warm up for a single collection
    pub fn expiring(expiration: Duration) -> Self {
        Self { expiration, ..Self::default() }
    }

    /// Whether idle series are dropped
    pub fn is_expiring(&self) -> bool {
        !self.expiration.is_zero()
    }

    /// Validate configuration values
    pub fn validate(&self) -> MetricsResult<()> {
        if self.warm_up > MAX_DURATION {
            return Err(MetricsError::config("warm_up", "must not exceed 100 years"));
        }
        if self.expiration > MAX_DURATION {
            return Err(MetricsError::config("expiration", "must not exceed 100 years"));
        }
        Ok(())
    }
}

/// Builder for [`LifecycleConfig`]
#[derive(Debug, Clone, Default)]
pub struct LifecycleConfigBuilder {
    config: LifecycleConfig,
}

impl LifecycleConfigBuilder {
    /// Start from the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the warm-up window
    pub fn warm_up(mut self, warm_up: Duration) -> Self {
        self.config.warm_up = warm_up;
        self
    }

    /// Set the idle expiration delay
    pub fn expiration(mut self, expiration: Duration) -> Self {
        self.config.expiration = expiration;
        self
    }

    /// Set where expired series are removed
    pub fn sweep(mut self, sweep: SweepMode) -> Self {
        self.config.sweep = sweep;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> MetricsResult<LifecycleConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Serde support for `Duration` as whole milliseconds
#[cfg(feature = "serde")]
pub mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serde serialization result type
    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    /// Serialize a Duration as milliseconds (u64)
    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    /// Deserialize milliseconds (u64) into a Duration
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
