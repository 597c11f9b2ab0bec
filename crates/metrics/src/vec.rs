//! Labeled metric vectors with per-series warm-up and expiration
//!
//! A [`LifecycleVec`] wraps a `prometheus` metric vector. Every label tuple a
//! caller asks for becomes a *generation*: a child metric registered under
//! the caller's labels plus a generation tag in the reserved [`TAG_LABEL`].
//! Each generation carries a [`LifecycleState`]:
//!
//! - while it warms up, collections report the kind's neutral snapshot;
//! - once it has gone unlooked-up past the configured expiration, it drops
//!   out of collections and is swept away;
//! - asking for the tuple again afterwards starts a new generation with a new
//!   tag, so a restarted series never continues an old one.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use lifecycle_metrics::{CounterVec, LifecycleConfig};
//! use prometheus::{Opts, Registry};
//!
//! let requests = CounterVec::new(
//!     Opts::new("requests_total", "Requests served"),
//!     &["route"],
//!     LifecycleConfig::builder()
//!         .warm_up(Duration::from_secs(10))
//!         .expiration(Duration::from_secs(300))
//!         .build()
//!         .unwrap(),
//! )
//! .unwrap();
//!
//! let registry = Registry::new();
//! registry.register(Box::new(requests.clone())).unwrap();
//!
//! requests.with_label_values(&["/health"]).inc();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::iter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use prometheus::core::{Collector, Desc, Metric};
use prometheus::proto::{self, MetricFamily};
use tracing::debug;

use crate::config::LifecycleConfig;
use crate::error::{MetricsError, MetricsResult};
use crate::index::HashedTagIndex;
use crate::kind::{
    Child, CounterKind, GaugeKind, HistogramKind, IntCounterKind, IntGaugeKind, LabeledFamily,
    MetricKind,
};
use crate::lifecycle::{LifecycleState, Phase};
use crate::sweep::{GenerationId, Sweep, Sweeper};
use crate::time::{Clock, SystemClock};

/// Label carrying the generation tag on every series of a vector
pub const TAG_LABEL: &str = "_tag_";

/// Counter vector with lifecycle management
pub type CounterVec<C = SystemClock> = LifecycleVec<CounterKind, C>;
/// Integer counter vector with lifecycle management
pub type IntCounterVec<C = SystemClock> = LifecycleVec<IntCounterKind, C>;
/// Gauge vector with expiration; gauges report live values while warming up
pub type GaugeVec<C = SystemClock> = LifecycleVec<GaugeKind, C>;
/// Integer gauge vector with expiration
pub type IntGaugeVec<C = SystemClock> = LifecycleVec<IntGaugeKind, C>;
/// Histogram vector with lifecycle management
pub type HistogramVec<C = SystemClock> = LifecycleVec<HistogramKind, C>;

#[derive(Debug, Clone)]
struct Slot {
    id: GenerationId,
    tag: String,
}

struct Entry<M> {
    child: M,
    labels: Vec<String>,
    tag: String,
    state: LifecycleState,
}

impl<M> Entry<M> {
    fn series_values(&self) -> Vec<&str> {
        self.labels.iter().map(String::as_str).chain(iter::once(self.tag.as_str())).collect()
    }
}

/// Index and generation map, guarded together by one lock
struct Generations<M> {
    index: HashedTagIndex<Slot>,
    entries: HashMap<GenerationId, Entry<M>>,
}

impl<M: Clone> Generations<M> {
    /// Return the live child for `values`, refreshing its expiration deadline
    fn lookup(&self, values: &[&str], config: &LifecycleConfig, now: Instant) -> Option<M> {
        let slot = self.index.get(values)?;
        let entry = self.entries.get(&slot.id)?;
        if entry.state.is_expired() {
            return None;
        }
        entry.state.on_access(config.expiration, now);
        Some(entry.child.clone())
    }
}

struct Shared<K: MetricKind, C> {
    family: K::Family,
    label_names: Vec<String>,
    config: LifecycleConfig,
    clock: C,
    generations: RwLock<Generations<Child<K>>>,
    next_id: AtomicU64,
    sweeper: Sweeper,
}

impl<K: MetricKind, C: Clock + 'static> Shared<K, C> {
    fn create(
        &self,
        generations: &mut Generations<Child<K>>,
        values: &[&str],
        now: Instant,
    ) -> MetricsResult<Child<K>> {
        // An expired predecessor still indexed under this tuple is retired
        // before its replacement is created.
        let predecessor = generations.index.get(values).cloned();
        if let Some(previous) = &predecessor {
            self.delete_by_instance(generations, previous.id);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut tag = format!("{:x}", self.clock.unix_seconds());
        if predecessor.is_some_and(|previous| previous.tag == tag) {
            tag = format!("{tag}-{id:x}");
        }

        let series: Vec<&str> = values.iter().copied().chain(iter::once(tag.as_str())).collect();
        let child = self.family.child(&series)?;

        let state = LifecycleState::new();
        state.on_access(self.config.expiration, now);
        generations.index.put(values, Slot { id, tag: tag.clone() });
        debug!(labels = ?values, tag = %tag, generation = id, "created metric generation");
        generations.entries.insert(
            id,
            Entry {
                child: child.clone(),
                labels: values.iter().map(|value| (*value).to_owned()).collect(),
                tag,
                state,
            },
        );
        Ok(child)
    }

    /// Remove one generation; its tuple stays indexed if a newer generation
    /// has taken it over
    fn delete_by_instance(&self, generations: &mut Generations<Child<K>>, id: GenerationId) -> bool {
        let Some(entry) = generations.entries.remove(&id) else {
            return false;
        };
        self.family.remove(&entry.series_values());
        if generations.index.get(&entry.labels).is_some_and(|slot| slot.id == id) {
            generations.index.delete(&entry.labels);
        }
        true
    }
}

impl<K: MetricKind, C: Clock + 'static> Sweep for Shared<K, C> {
    fn sweep(&self, batch: &[GenerationId]) {
        let mut generations = self.generations.write();
        let mut removed = 0usize;
        for id in batch {
            if self.delete_by_instance(&mut generations, *id) {
                removed += 1;
            }
        }
        debug!(
            requested = batch.len(),
            removed,
            remaining = generations.entries.len(),
            "swept expired metric generations"
        );
    }
}

/// Labeled metric vector whose series warm up and expire
///
/// Clones share the same series, so one clone can be registered with a
/// `prometheus::Registry` while others are handed to request handlers.
pub struct LifecycleVec<K: MetricKind, C: Clock + 'static = SystemClock> {
    shared: Arc<Shared<K, C>>,
}

impl<K: MetricKind, C: Clock + 'static> Clone for LifecycleVec<K, C> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<K: MetricKind, C: Clock + 'static> fmt::Debug for LifecycleVec<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleVec")
            .field("kind", &std::any::type_name::<K>())
            .field("label_names", &self.shared.label_names)
            .field("config", &self.shared.config)
            .field("len", &self.len())
            .field("sweeper", &self.shared.sweeper)
            .finish()
    }
}

impl<K: MetricKind> LifecycleVec<K> {
    /// Create a vector on the system clock
    ///
    /// The underlying `prometheus` family is declared with `label_names`
    /// followed by [`TAG_LABEL`], so registries and exporters see the tag as
    /// an ordinary label. The vector starts empty.
    ///
    /// # Errors
    ///
    /// [`MetricsError::ReservedLabel`] if `label_names` contains
    /// [`TAG_LABEL`], [`MetricsError::Config`] if `config` does not validate,
    /// [`MetricsError::Registry`] if prometheus rejects the options.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifecycle_metrics::{CounterVec, LifecycleConfig, MetricsError, TAG_LABEL};
    /// use prometheus::Opts;
    ///
    /// let vec = CounterVec::new(Opts::new("hits_total", "Hits"), &["client"], LifecycleConfig::default())
    ///     .unwrap();
    /// assert_eq!(vec.label_names(), ["client".to_string()]);
    ///
    /// let err = CounterVec::new(Opts::new("hits_total", "Hits"), &[TAG_LABEL], LifecycleConfig::default())
    ///     .unwrap_err();
    /// assert!(matches!(err, MetricsError::ReservedLabel { .. }));
    /// ```
    pub fn new(
        opts: K::Opts,
        label_names: &[&str],
        config: LifecycleConfig,
    ) -> MetricsResult<Self> {
        Self::with_clock(opts, label_names, config, SystemClock)
    }
}

impl<K: MetricKind, C: Clock + 'static> LifecycleVec<K, C> {
    /// Create a vector driven by `clock`
    ///
    /// Deadlines are measured on `clock.now()` and generation tags come from
    /// `clock.unix_seconds()`. Pass a [`MockClock`](crate::MockClock) to step
    /// through warm-up and expiration in tests.
    ///
    /// # Errors
    ///
    /// Same as [`new`](LifecycleVec::new).
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, UNIX_EPOCH};
    ///
    /// use lifecycle_metrics::testing::samples;
    /// use lifecycle_metrics::{CounterVec, LifecycleConfig, MockClock};
    /// use prometheus::Opts;
    ///
    /// let clock = MockClock::starting_at(UNIX_EPOCH + Duration::from_secs(1_219_204_980));
    /// let vec = CounterVec::with_clock(
    ///     Opts::new("hits_total", "Hits"),
    ///     &["client"],
    ///     LifecycleConfig::default(),
    ///     clock.clone(),
    /// )
    /// .unwrap();
    ///
    /// vec.with_label_values(&["10.0.0.1"]).inc();
    /// assert_eq!(samples(&vec)[0].label("_tag_"), Some("48ab9774"));
    /// ```
    pub fn with_clock(
        opts: K::Opts,
        label_names: &[&str],
        config: LifecycleConfig,
        clock: C,
    ) -> MetricsResult<Self> {
        Self::with_index(opts, label_names, config, clock, HashedTagIndex::new())
    }

    fn with_index(
        opts: K::Opts,
        label_names: &[&str],
        config: LifecycleConfig,
        clock: C,
        index: HashedTagIndex<Slot>,
    ) -> MetricsResult<Self> {
        config.validate()?;
        if let Some(name) = label_names.iter().find(|name| **name == TAG_LABEL) {
            return Err(MetricsError::ReservedLabel { name: (*name).to_owned() });
        }

        let series_labels: Vec<&str> =
            label_names.iter().copied().chain(iter::once(TAG_LABEL)).collect();
        let family = K::new_family(opts, &series_labels)?;
        let name = family.desc().first().map(|desc| desc.fq_name.clone()).unwrap_or_default();

        Ok(Self {
            shared: Arc::new(Shared {
                family,
                label_names: label_names.iter().map(|name| (*name).to_owned()).collect(),
                config,
                clock,
                generations: RwLock::new(Generations { index, entries: HashMap::new() }),
                next_id: AtomicU64::new(0),
                sweeper: Sweeper::new(config.sweep, name),
            }),
        })
    }

    /// Get the metric for `values`, creating a new generation if the tuple is
    /// unknown or its last generation expired
    ///
    /// Every successful call counts as an access and slides the series'
    /// expiration deadline. Known tuples are served under the shared lock;
    /// only a new or expired tuple takes the exclusive lock, and concurrent
    /// callers racing on the same new tuple all receive the one generation
    /// created.
    ///
    /// # Errors
    ///
    /// [`MetricsError::Cardinality`] if `values` does not match the declared
    /// label names; [`MetricsError::Registry`] if prometheus rejects the
    /// child.
    pub fn get_metric_with_label_values(&self, values: &[&str]) -> MetricsResult<Child<K>> {
        let expected = self.shared.label_names.len();
        if values.len() != expected {
            return Err(MetricsError::Cardinality { expected, got: values.len() });
        }

        let now = self.shared.clock.now();
        if let Some(child) = self.shared.generations.read().lookup(values, &self.shared.config, now)
        {
            return Ok(child);
        }

        let mut generations = self.shared.generations.write();
        if let Some(child) = generations.lookup(values, &self.shared.config, now) {
            return Ok(child);
        }
        self.shared.create(&mut generations, values, now)
    }

    /// Like [`get_metric_with_label_values`](Self::get_metric_with_label_values)
    ///
    /// # Panics
    ///
    /// Panics if the label values do not fit the vector.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifecycle_metrics::{GaugeVec, LifecycleConfig};
    /// use prometheus::Opts;
    ///
    /// let depth = GaugeVec::new(Opts::new("queue_depth", "Jobs"), &["queue"], LifecycleConfig::default())
    ///     .unwrap();
    /// depth.with_label_values(&["mail"]).set(3.0);
    /// assert_eq!(depth.with_label_values(&["mail"]).get(), 3.0);
    /// ```
    pub fn with_label_values(&self, values: &[&str]) -> Child<K> {
        self.get_metric_with_label_values(values)
            .unwrap_or_else(|err| panic!("label values {values:?} rejected: {err}"))
    }

    /// Get the metric for a label map keyed by label name
    ///
    /// The map must name every declared label exactly once; the values are
    /// reordered into declaration order and looked up as with
    /// [`get_metric_with_label_values`](Self::get_metric_with_label_values).
    ///
    /// # Errors
    ///
    /// [`MetricsError::UnknownLabel`] for a name the vector does not declare,
    /// [`MetricsError::Cardinality`] when declared names are missing.
    pub fn get_metric_with(&self, labels: &HashMap<&str, &str>) -> MetricsResult<Child<K>> {
        let values = self.resolve(labels)?;
        self.get_metric_with_label_values(&values)
    }

    /// Like [`get_metric_with`](Self::get_metric_with)
    ///
    /// # Panics
    ///
    /// Panics if the label map does not fit the vector.
    pub fn with(&self, labels: &HashMap<&str, &str>) -> Child<K> {
        self.get_metric_with(labels)
            .unwrap_or_else(|err| panic!("labels {labels:?} rejected: {err}"))
    }

    /// Delete the series for `values`; returns whether one existed
    ///
    /// The series disappears from the next collection. Asking for the tuple
    /// again afterwards starts a new generation. Values that do not fit the
    /// declared labels match nothing and return `false`.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifecycle_metrics::{CounterVec, LifecycleConfig};
    /// use prometheus::Opts;
    ///
    /// let vec = CounterVec::new(Opts::new("hits_total", "Hits"), &["client"], LifecycleConfig::default())
    ///     .unwrap();
    /// vec.with_label_values(&["10.0.0.1"]).inc();
    ///
    /// assert!(vec.delete_label_values(&["10.0.0.1"]));
    /// assert!(!vec.delete_label_values(&["10.0.0.1"]));
    /// assert!(vec.is_empty());
    /// ```
    pub fn delete_label_values(&self, values: &[&str]) -> bool {
        if values.len() != self.shared.label_names.len() {
            return false;
        }

        let mut generations = self.shared.generations.write();
        let Some(slot) = generations.index.delete(values) else {
            return false;
        };
        if let Some(entry) = generations.entries.remove(&slot.id) {
            self.shared.family.remove(&entry.series_values());
        }
        debug!(labels = ?values, tag = %slot.tag, "deleted metric generation");
        true
    }

    /// Delete the series for a label map; returns whether one existed
    pub fn delete(&self, labels: &HashMap<&str, &str>) -> bool {
        match self.resolve(labels) {
            Ok(values) => self.delete_label_values(&values),
            Err(_) => false,
        }
    }

    /// Delete every series
    ///
    /// Handles obtained earlier keep working but are no longer collected.
    pub fn reset(&self) {
        let mut generations = self.shared.generations.write();
        let dropped = generations.entries.len();
        generations.index.clear();
        generations.entries.clear();
        self.shared.family.clear();
        debug!(dropped, "reset metric vector");
    }

    /// Number of generations held, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.shared.generations.read().entries.len()
    }

    /// Whether the vector holds no generations
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Declared label names, without the generation tag label
    pub fn label_names(&self) -> &[String] {
        &self.shared.label_names
    }

    /// Lifecycle configuration of this vector
    pub fn config(&self) -> &LifecycleConfig {
        &self.shared.config
    }

    fn resolve<'a>(&self, labels: &HashMap<&str, &'a str>) -> MetricsResult<Vec<&'a str>> {
        let declared = &self.shared.label_names;
        if let Some(unknown) = labels.keys().find(|name| !declared.iter().any(|d| d == *name)) {
            return Err(MetricsError::UnknownLabel { name: (*unknown).to_owned() });
        }
        if labels.len() != declared.len() {
            return Err(MetricsError::Cardinality { expected: declared.len(), got: labels.len() });
        }
        // Every declared name is present once the two checks above pass.
        Ok(declared.iter().filter_map(|name| labels.get(name.as_str()).copied()).collect())
    }
}

fn compare_labels(a: &proto::Metric, b: &proto::Metric) -> std::cmp::Ordering {
    let (left, right) = (a.get_label(), b.get_label());
    left.len().cmp(&right.len()).then_with(|| {
        left.iter().map(|pair| pair.value()).cmp(right.iter().map(|pair| pair.value()))
    })
}

impl<K: MetricKind, C: Clock + 'static> Collector for LifecycleVec<K, C> {
    fn desc(&self) -> Vec<&Desc> {
        self.shared.family.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let shared = &self.shared;
        let now = shared.clock.now();
        let mut metrics = Vec::new();
        let mut expired = Vec::new();

        {
            let generations = shared.generations.read();
            metrics.reserve(generations.entries.len());
            for (id, entry) in &generations.entries {
                match entry.state.on_collect(shared.config.warm_up, now) {
                    Phase::Expired => expired.push(*id),
                    phase if phase.is_warming_up() => {
                        metrics.push(K::neutral_snapshot(&entry.child.metric()));
                    }
                    _ => metrics.push(entry.child.metric()),
                }
            }
        }

        if !expired.is_empty() {
            shared.sweeper.submit(&self.shared, expired);
        }
        if metrics.is_empty() {
            return Vec::new();
        }

        let Some(desc) = shared.family.desc().into_iter().next() else {
            return Vec::new();
        };
        metrics.sort_by(compare_labels);

        let mut family = MetricFamily::default();
        family.set_name(desc.fq_name.clone());
        family.set_help(desc.help.clone());
        family.set_field_type(K::metric_type());
        family.set_metric(metrics);
        vec![family]
    }
}
