//! Metric kind adapters
//!
//! The lifecycle engine is written once against [`MetricKind`]. Each kind
//! names the `prometheus` types that hold its numbers and how to build them,
//! and decides what a warming-up series reports.

use std::fmt::Debug;

use prometheus::core::{Collector, Metric, MetricVec, MetricVecBuilder};
use prometheus::proto::{self, MetricType};
use prometheus::{HistogramOpts, Opts};

use crate::neutral;

/// Child metric type of a kind's labeled family
pub type Child<K> = <<K as MetricKind>::Family as LabeledFamily>::Child;

/// Labeled metric family the engine stores its series in
///
/// Implemented for every `prometheus` metric vector. The engine always
/// passes the full series label values, generation tag included.
pub trait LabeledFamily: Collector + 'static {
    /// Metric handed to callers for one series
    type Child: Metric + 'static;

    /// Get or create the child for `values`
    fn child(&self, values: &[&str]) -> prometheus::Result<Self::Child>;

    /// Remove the child for `values`, returning whether it existed
    fn remove(&self, values: &[&str]) -> bool;

    /// Remove every child
    fn clear(&self);
}

impl<B> LabeledFamily for MetricVec<B>
where
    B: MetricVecBuilder + 'static,
    B::M: 'static,
{
    type Child = B::M;

    fn child(&self, values: &[&str]) -> prometheus::Result<B::M> {
        self.get_metric_with_label_values(values)
    }

    fn remove(&self, values: &[&str]) -> bool {
        self.remove_label_values(values).is_ok()
    }

    fn clear(&self) {
        self.reset();
    }
}

/// Capability set of one metric kind
pub trait MetricKind: Debug + Send + Sync + 'static {
    /// Options accepted by the kind's constructors
    type Opts: Clone + Send + Sync;

    /// Labeled family holding the kind's series
    type Family: LabeledFamily;

    /// Unlabeled metric of the same kind
    type Single: Metric + Collector + 'static;

    /// Type reported in collected metric families
    fn metric_type() -> MetricType;

    /// Build a labeled family with the given label names
    fn new_family(opts: Self::Opts, label_names: &[&str]) -> prometheus::Result<Self::Family>;

    /// Build one unlabeled metric
    fn new_single(opts: Self::Opts) -> prometheus::Result<Self::Single>;

    /// Snapshot reported in place of `live` while a series warms up
    fn neutral_snapshot(live: &proto::Metric) -> proto::Metric {
        neutral::zeroed(Self::metric_type(), live)
    }
}

/// Floating point counters
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterKind;

impl MetricKind for CounterKind {
    type Opts = Opts;
    type Family = prometheus::CounterVec;
    type Single = prometheus::Counter;

    fn metric_type() -> MetricType {
        MetricType::COUNTER
    }

    fn new_family(opts: Opts, label_names: &[&str]) -> prometheus::Result<Self::Family> {
        prometheus::CounterVec::new(opts, label_names)
    }

    fn new_single(opts: Opts) -> prometheus::Result<Self::Single> {
        prometheus::Counter::with_opts(opts)
    }
}

/// Integer counters
#[derive(Debug, Clone, Copy, Default)]
pub struct IntCounterKind;

impl MetricKind for IntCounterKind {
    type Opts = Opts;
    type Family = prometheus::IntCounterVec;
    type Single = prometheus::IntCounter;

    fn metric_type() -> MetricType {
        MetricType::COUNTER
    }

    fn new_family(opts: Opts, label_names: &[&str]) -> prometheus::Result<Self::Family> {
        prometheus::IntCounterVec::new(opts, label_names)
    }

    fn new_single(opts: Opts) -> prometheus::Result<Self::Single> {
        prometheus::IntCounter::with_opts(opts)
    }
}

/// Floating point gauges
///
/// A gauge's current value is meaningful from the first write, so warm-up
/// never hides it. Gauge vectors still expire idle series.
#[derive(Debug, Clone, Copy, Default)]
pub struct GaugeKind;

impl MetricKind for GaugeKind {
    type Opts = Opts;
    type Family = prometheus::GaugeVec;
    type Single = prometheus::Gauge;

    fn metric_type() -> MetricType {
        MetricType::GAUGE
    }

    fn new_family(opts: Opts, label_names: &[&str]) -> prometheus::Result<Self::Family> {
        prometheus::GaugeVec::new(opts, label_names)
    }

    fn new_single(opts: Opts) -> prometheus::Result<Self::Single> {
        prometheus::Gauge::with_opts(opts)
    }

    fn neutral_snapshot(live: &proto::Metric) -> proto::Metric {
        live.clone()
    }
}

/// Integer gauges
#[derive(Debug, Clone, Copy, Default)]
pub struct IntGaugeKind;

impl MetricKind for IntGaugeKind {
    type Opts = Opts;
    type Family = prometheus::IntGaugeVec;
    type Single = prometheus::IntGauge;

    fn metric_type() -> MetricType {
        MetricType::GAUGE
    }

    fn new_family(opts: Opts, label_names: &[&str]) -> prometheus::Result<Self::Family> {
        prometheus::IntGaugeVec::new(opts, label_names)
    }

    fn new_single(opts: Opts) -> prometheus::Result<Self::Single> {
        prometheus::IntGauge::with_opts(opts)
    }

    fn neutral_snapshot(live: &proto::Metric) -> proto::Metric {
        live.clone()
    }
}

/// Histograms
#[derive(Debug, Clone, Copy, Default)]
pub struct HistogramKind;

impl MetricKind for HistogramKind {
    type Opts = HistogramOpts;
    type Family = prometheus::HistogramVec;
    type Single = prometheus::Histogram;

    fn metric_type() -> MetricType {
        MetricType::HISTOGRAM
    }

    fn new_family(opts: HistogramOpts, label_names: &[&str]) -> prometheus::Result<Self::Family> {
        prometheus::HistogramVec::new(opts, label_names)
    }

    fn new_single(opts: HistogramOpts) -> prometheus::Result<Self::Single> {
        prometheus::Histogram::with_opts(opts)
    }
}
