//! Warm-up for a single unlabeled metric
//!
//! [`WarmUp`] derefs to the wrapped `prometheus` metric, so call sites keep
//! using `inc`, `observe` and friends. Only collection changes: until the
//! warm-up window has passed, the registry sees the neutral snapshot.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{HistogramOpts, Opts};

use crate::config::LifecycleConfig;
use crate::error::MetricsResult;
use crate::kind::{CounterKind, HistogramKind, IntCounterKind, MetricKind};
use crate::lifecycle::{LifecycleState, Phase};
use crate::time::{Clock, SystemClock};

/// Counter reporting zero during warm-up
pub type Counter<C = SystemClock> = WarmUp<CounterKind, C>;
/// Integer counter reporting zero during warm-up
pub type IntCounter<C = SystemClock> = WarmUp<IntCounterKind, C>;
/// Histogram reporting empty buckets during warm-up
pub type Histogram<C = SystemClock> = WarmUp<HistogramKind, C>;

/// One metric of kind `K` with a warm-up window
///
/// Single metrics never expire; only the warm-up half of the configuration
/// applies. Clones share the metric and its lifecycle state.
pub struct WarmUp<K: MetricKind, C: Clock = SystemClock> {
    metric: K::Single,
    state: Arc<LifecycleState>,
    config: LifecycleConfig,
    clock: C,
}

impl<K: MetricKind> WarmUp<K> {
    /// Create a metric on the system clock
    pub fn new(opts: K::Opts, config: LifecycleConfig) -> MetricsResult<Self> {
        Self::with_clock(opts, config, SystemClock)
    }
}

impl<K: MetricKind, C: Clock> WarmUp<K, C> {
    /// Create a metric driven by `clock`
    pub fn with_clock(opts: K::Opts, config: LifecycleConfig, clock: C) -> MetricsResult<Self> {
        config.validate()?;
        let metric = K::new_single(opts)?;
        Ok(Self { metric, state: Arc::new(LifecycleState::new()), config, clock })
    }

    /// The wrapped metric
    pub fn metric(&self) -> &K::Single {
        &self.metric
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }
}

impl<C: Clock> WarmUp<CounterKind, C> {
    /// Counter from a name and help text
    pub fn counter(name: &str, help: &str, config: LifecycleConfig, clock: C) -> MetricsResult<Self> {
        Self::with_clock(Opts::new(name, help), config, clock)
    }
}

impl<C: Clock> WarmUp<HistogramKind, C> {
    /// Histogram with explicit bucket bounds
    pub fn histogram(
        name: &str,
        help: &str,
        buckets: Vec<f64>,
        config: LifecycleConfig,
        clock: C,
    ) -> MetricsResult<Self> {
        Self::with_clock(HistogramOpts::new(name, help).buckets(buckets), config, clock)
    }
}

impl<K: MetricKind, C: Clock> Deref for WarmUp<K, C> {
    type Target = K::Single;

    fn deref(&self) -> &Self::Target {
        &self.metric
    }
}

impl<K: MetricKind, C: Clock + Clone> Clone for WarmUp<K, C> {
    fn clone(&self) -> Self {
        Self {
            metric: self.metric.clone(),
            state: Arc::clone(&self.state),
            config: self.config,
            clock: self.clock.clone(),
        }
    }
}

impl<K: MetricKind, C: Clock> fmt::Debug for WarmUp<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarmUp")
            .field("kind", &std::any::type_name::<K>())
            .field("phase", &self.state.phase())
            .field("warm_up", &self.config.warm_up)
            .finish()
    }
}

impl<K: MetricKind, C: Clock> Collector for WarmUp<K, C> {
    fn desc(&self) -> Vec<&Desc> {
        self.metric.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families = self.metric.collect();
        let phase = self.state.on_collect(self.config.warm_up, self.clock.now());
        if phase.is_warming_up() {
            for family in &mut families {
                let neutral = family.get_metric().iter().map(K::neutral_snapshot).collect();
                family.set_metric(neutral);
            }
        }
        families
    }
}
