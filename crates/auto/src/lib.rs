//! One-call creation and registration of lifecycle metrics
//!
//! [`Factory`] builds the collectors from `lifecycle-metrics` and registers
//! them with a `prometheus::Registry` in the same step, so a metric declared
//! at startup cannot be forgotten by the exporter.
//!
//! ```
//! use std::time::Duration;
//!
//! use lifecycle_metrics::LifecycleConfig;
//! use lifecycle_metrics_auto::Factory;
//! use prometheus::Registry;
//!
//! let registry = Registry::new();
//! let factory = Factory::with_config(&registry, LifecycleConfig::warm_up(Duration::from_secs(10)));
//!
//! let hits = factory.counter_vec("hits_total", "Hits per client", &["client"]).unwrap();
//! hits.with_label_values(&["10.0.0.1"]).inc();
//!
//! assert_eq!(registry.gather().len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

use lifecycle_metrics::{
    Clock, Counter, CounterVec, ErrorSeverity, GaugeVec, Histogram, HistogramVec, IntCounter,
    IntCounterVec, IntGaugeVec, LifecycleConfig, MetricsError, MetricsResult, SystemClock,
};
use prometheus::core::Collector;
use prometheus::{Gauge, HistogramOpts, Opts, Registry};
use tracing::{debug, error, warn};

/// Creates lifecycle metrics and registers them
///
/// Every metric built by one factory shares its [`LifecycleConfig`] and
/// clock. Gauge vectors take the expiration from the config and report live
/// values while warming up.
///
/// Each constructor registers a clone of the collector and returns the
/// other handle, so the caller keeps using the metric while the registry
/// gathers it. A registration failure is logged at the error's
/// [`severity`](MetricsError::severity) and returned; nothing is left
/// half-registered.
///
/// # Examples
///
/// ```
/// use lifecycle_metrics::MetricsError;
/// use lifecycle_metrics_auto::Factory;
/// use prometheus::Registry;
///
/// let registry = Registry::new();
/// let factory = Factory::with(&registry);
///
/// factory.counter_vec("jobs_total", "Jobs run", &["worker"]).unwrap();
/// let err = factory.counter_vec("jobs_total", "Jobs run", &["worker"]).unwrap_err();
/// assert!(matches!(err, MetricsError::Registry(prometheus::Error::AlreadyReg)));
/// ```
#[derive(Debug, Clone)]
pub struct Factory<'a, C: Clock + Clone + 'static = SystemClock> {
    registry: Option<&'a Registry>,
    config: LifecycleConfig,
    clock: C,
}

impl Factory<'static> {
    /// Factory registering with `prometheus::default_registry()`
    ///
    /// Meant for application entry points; libraries should take a registry.
    pub fn default_registry() -> Self {
        Self::with(prometheus::default_registry())
    }

    /// Factory that builds metrics without registering them
    ///
    /// Useful for collectors that are registered later or exposed through a
    /// custom registry wrapper.
    pub fn unregistered(config: LifecycleConfig) -> Self {
        Self { registry: None, config, clock: SystemClock }
    }
}

impl<'a> Factory<'a> {
    /// Factory registering with `registry` under the default configuration
    pub fn with(registry: &'a Registry) -> Self {
        Self::with_config(registry, LifecycleConfig::default())
    }

    /// Factory registering with `registry` under `config`
    pub fn with_config(registry: &'a Registry, config: LifecycleConfig) -> Self {
        Self { registry: Some(registry), config, clock: SystemClock }
    }
}

impl<'a, C: Clock + Clone + 'static> Factory<'a, C> {
    /// Same factory driving its metrics from `clock`
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use lifecycle_metrics::testing::samples;
    /// use lifecycle_metrics::{LifecycleConfig, MockClock};
    /// use lifecycle_metrics_auto::Factory;
    ///
    /// let clock = MockClock::new();
    /// let factory = Factory::unregistered(LifecycleConfig::warm_up(Duration::from_secs(5)))
    ///     .with_clock(clock.clone());
    /// let hits = factory.counter_vec("hits_total", "Hits", &["client"]).unwrap();
    /// hits.with_label_values(&["10.0.0.1"]).inc();
    ///
    /// assert_eq!(samples(&hits)[0].value, 0.0);
    /// clock.advance(Duration::from_secs(6));
    /// assert_eq!(samples(&hits)[0].value, 1.0);
    /// ```
    pub fn with_clock<D: Clock + Clone + 'static>(self, clock: D) -> Factory<'a, D> {
        Factory { registry: self.registry, config: self.config, clock }
    }

    /// Configuration applied to created metrics
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Counter with a warm-up window
    pub fn counter(&self, name: &str, help: &str) -> MetricsResult<Counter<C>> {
        let counter = Counter::with_clock(Opts::new(name, help), self.config, self.clock.clone())?;
        self.register(counter, name)
    }

    /// Integer counter with a warm-up window
    pub fn int_counter(&self, name: &str, help: &str) -> MetricsResult<IntCounter<C>> {
        let counter = IntCounter::with_clock(Opts::new(name, help), self.config, self.clock.clone())?;
        self.register(counter, name)
    }

    /// Plain gauge; single gauges have no lifecycle
    pub fn gauge(&self, name: &str, help: &str) -> MetricsResult<Gauge> {
        let gauge = Gauge::with_opts(Opts::new(name, help))?;
        self.register(gauge, name)
    }

    /// Histogram with a warm-up window
    ///
    /// `buckets` of `None` uses `prometheus::DEFAULT_BUCKETS`.
    pub fn histogram(
        &self,
        name: &str,
        help: &str,
        buckets: Option<Vec<f64>>,
    ) -> MetricsResult<Histogram<C>> {
        let histogram =
            Histogram::with_clock(histogram_opts(name, help, buckets), self.config, self.clock.clone())?;
        self.register(histogram, name)
    }

    /// Counter vector
    ///
    /// Series warm up and expire per the factory's configuration; see
    /// [`LifecycleVec`](lifecycle_metrics::LifecycleVec).
    ///
    /// # Errors
    ///
    /// Label, configuration or registration errors from building the vector.
    pub fn counter_vec(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> MetricsResult<CounterVec<C>> {
        let vec = CounterVec::with_clock(
            Opts::new(name, help),
            label_names,
            self.config,
            self.clock.clone(),
        )?;
        self.register(vec, name)
    }

    /// Integer counter vector
    pub fn int_counter_vec(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> MetricsResult<IntCounterVec<C>> {
        let vec = IntCounterVec::with_clock(
            Opts::new(name, help),
            label_names,
            self.config,
            self.clock.clone(),
        )?;
        self.register(vec, name)
    }

    /// Gauge vector
    pub fn gauge_vec(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> MetricsResult<GaugeVec<C>> {
        let vec =
            GaugeVec::with_clock(Opts::new(name, help), label_names, self.config, self.clock.clone())?;
        self.register(vec, name)
    }

    /// Integer gauge vector
    pub fn int_gauge_vec(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> MetricsResult<IntGaugeVec<C>> {
        let vec = IntGaugeVec::with_clock(
            Opts::new(name, help),
            label_names,
            self.config,
            self.clock.clone(),
        )?;
        self.register(vec, name)
    }

    /// Histogram vector
    ///
    /// `buckets` of `None` uses `prometheus::DEFAULT_BUCKETS`. Buckets of a
    /// warming-up series report zero cumulative counts.
    ///
    /// # Errors
    ///
    /// Label, configuration or registration errors from building the vector.
    pub fn histogram_vec(
        &self,
        name: &str,
        help: &str,
        buckets: Option<Vec<f64>>,
        label_names: &[&str],
    ) -> MetricsResult<HistogramVec<C>> {
        let vec = HistogramVec::with_clock(
            histogram_opts(name, help, buckets),
            label_names,
            self.config,
            self.clock.clone(),
        )?;
        self.register(vec, name)
    }

    fn register<T>(&self, collector: T, name: &str) -> MetricsResult<T>
    where
        T: Collector + Clone + 'static,
    {
        let Some(registry) = self.registry else {
            return Ok(collector);
        };
        if let Err(err) = registry.register(Box::new(collector.clone())) {
            let err = MetricsError::from(err);
            match err.severity() {
                ErrorSeverity::Warning => warn!(metric = name, error = %err, "metric not registered"),
                ErrorSeverity::Error => error!(metric = name, error = %err, "metric not registered"),
            }
            return Err(err);
        }
        debug!(metric = name, "registered lifecycle metric");
        Ok(collector)
    }
}

fn histogram_opts(name: &str, help: &str, buckets: Option<Vec<f64>>) -> HistogramOpts {
    let opts = HistogramOpts::new(name, help);
    match buckets {
        Some(buckets) => opts.buckets(buckets),
        None => opts,
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the factory.
    use std::time::Duration;

    use lifecycle_metrics::MockClock;

    use super::*;

    /// Validates registration of every constructor.
    ///
    /// Assertions:
    /// - Confirms each created metric is gathered once it has a value.
    #[test]
    fn test_every_constructor_registers() {
        let registry = Registry::new();
        let factory = Factory::with(&registry);

        factory.counter("a_total", "help").expect("counter").inc();
        factory.int_counter("b_total", "help").expect("int counter").inc();
        factory.gauge("c", "help").expect("gauge").set(1.0);
        factory.histogram("d_seconds", "help", None).expect("histogram").observe(0.1);
        factory.counter_vec("e_total", "help", &["l"]).expect("vec").with_label_values(&["x"]);
        factory.int_counter_vec("f_total", "help", &["l"]).expect("vec").with_label_values(&["x"]);
        factory.gauge_vec("g", "help", &["l"]).expect("vec").with_label_values(&["x"]);
        factory.int_gauge_vec("h", "help", &["l"]).expect("vec").with_label_values(&["x"]);
        factory
            .histogram_vec("i_seconds", "help", Some(vec![1.0]), &["l"])
            .expect("vec")
            .with_label_values(&["x"]);

        let names: Vec<String> =
            registry.gather().iter().map(|family| family.name().to_owned()).collect();
        assert_eq!(
            names,
            ["a_total", "b_total", "c", "d_seconds", "e_total", "f_total", "g", "h", "i_seconds"]
        );
    }

    /// Validates duplicate names.
    ///
    /// Assertions:
    /// - Ensures a second metric under the same name fails with a warning
    ///   severity registry error.
    #[test]
    fn test_duplicate_name_is_rejected() {
        let registry = Registry::new();
        let factory = Factory::with(&registry);
        factory.counter_vec("hits_total", "help", &["l"]).expect("first");

        let err = factory.counter_vec("hits_total", "help", &["l"]).expect_err("duplicate");
        assert!(matches!(err, MetricsError::Registry(prometheus::Error::AlreadyReg)));
        assert_eq!(err.severity(), ErrorSeverity::Warning);
    }

    /// Validates the unregistered factory.
    ///
    /// Assertions:
    /// - Confirms metrics are built with the factory's configuration.
    /// - Confirms the same name can be built twice.
    #[test]
    fn test_unregistered_factory() {
        let config = LifecycleConfig::expiring(Duration::from_secs(30));
        let factory = Factory::unregistered(config);

        let first = factory.counter_vec("hits_total", "help", &["l"]).expect("first");
        let second = factory.counter_vec("hits_total", "help", &["l"]).expect("second");
        assert_eq!(first.config(), &config);
        assert_eq!(second.config(), factory.config());
    }

    /// Validates the clock handed to created metrics.
    ///
    /// Assertions:
    /// - Confirms a counter created through `with_clock` warms up on the
    ///   mock clock.
    #[test]
    fn test_with_clock() {
        let clock = MockClock::new();
        let factory = Factory::unregistered(LifecycleConfig::warm_up(Duration::from_secs(5)))
            .with_clock(clock.clone());
        let counter = factory.counter("jobs_total", "help").expect("counter");
        counter.inc();

        let value = |c: &Counter<MockClock>| c.collect()[0].get_metric()[0].get_counter().get_value();
        assert_eq!(value(&counter), 0.0);
        clock.advance(Duration::from_secs(6));
        assert_eq!(value(&counter), 1.0);
    }

    /// Validates invalid configuration is surfaced.
    ///
    /// Assertions:
    /// - Ensures an oversized warm-up fails before anything is registered.
    #[test]
    fn test_invalid_config_registers_nothing() {
        let registry = Registry::new();
        let config = LifecycleConfig::warm_up(Duration::MAX);
        let factory = Factory::with_config(&registry, config);

        let err = factory.counter("hits_total", "help").expect_err("invalid");
        assert!(matches!(err, MetricsError::Config { .. }));
        assert!(factory.counter_vec("hits_total", "help", &["l"]).is_err());
        assert!(registry.gather().is_empty());
    }
}
