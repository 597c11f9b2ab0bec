//! Prometheus metrics with per-series warm-up and expiration.
//!
//! High-cardinality labels (client addresses, user names, job ids) create
//! series that are interesting for a while and then go quiet forever. The
//! vectors in this crate bound that growth and make restarts visible:
//!
//! - **Warm-up**: a new series reports a neutral snapshot (zero counters,
//!   empty histograms) until it has been collected across a configured
//!   window, so rate calculations never see a partially accumulated jump.
//! - **Expiration**: a series nobody has looked up for the configured delay
//!   disappears from collections and its memory is reclaimed.
//! - **Generations**: every series carries a `_tag_` label holding its
//!   creation time; an expired tuple that comes back is a new series.
//!
//! # Crate layout
//!
//! - [`vec`]: [`LifecycleVec`] and its kind aliases ([`CounterVec`],
//!   [`GaugeVec`], [`HistogramVec`], ...)
//! - [`single`]: [`WarmUp`] for unlabeled metrics
//! - [`kind`]: adapters binding the engine to `prometheus` metric types
//! - [`lifecycle`], [`index`], [`hash`]: the building blocks
//! - [`config`], [`error`], [`time`]: ambient types
//! - [`testing`]: helpers for asserting on collected series
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use lifecycle_metrics::{CounterVec, LifecycleConfig, MockClock};
//! use lifecycle_metrics::testing::samples;
//! use prometheus::Opts;
//!
//! let clock = MockClock::new();
//! let hits = CounterVec::with_clock(
//!     Opts::new("hits_total", "Hits per client"),
//!     &["client"],
//!     LifecycleConfig::warm_up(Duration::from_secs(10)),
//!     clock.clone(),
//! )
//! .unwrap();
//!
//! hits.with_label_values(&["10.0.0.1"]).inc_by(10.0);
//! assert_eq!(samples(&hits)[0].value, 0.0);
//!
//! clock.advance(Duration::from_secs(11));
//! assert_eq!(samples(&hits)[0].value, 10.0);
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![deny(deprecated)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod config;
pub mod error;
pub mod hash;
pub mod index;
pub mod kind;
pub mod lifecycle;
pub mod neutral;
pub mod single;
mod sweep;
pub mod testing;
pub mod time;
pub mod vec;

pub use config::{LifecycleConfig, LifecycleConfigBuilder, SweepMode};
pub use error::{ErrorSeverity, MetricsError, MetricsResult};
pub use index::HashedTagIndex;
pub use kind::{
    CounterKind, GaugeKind, HistogramKind, IntCounterKind, IntGaugeKind, LabeledFamily, MetricKind,
};
pub use lifecycle::{LifecycleState, Phase};
pub use single::{Counter, Histogram, IntCounter, WarmUp};
pub use time::{Clock, MockClock, SystemClock};
pub use vec::{CounterVec, GaugeVec, HistogramVec, IntCounterVec, IntGaugeVec, LifecycleVec, TAG_LABEL};
