//! Test helpers for asserting on collected series
//!
//! [`samples`] flattens whatever a collector reports into one [`Sample`] per
//! series, and [`wait_for`] polls a condition so tests can observe the
//! background sweeper without fixed sleeps.

use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

use prometheus::core::Collector;
use prometheus::proto::{MetricFamily, MetricType};

/// One collected series
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Metric family name
    pub name: String,
    /// Label pairs by name, generation tag included
    pub labels: BTreeMap<String, String>,
    /// Counter or gauge value; sample sum for histograms and summaries;
    /// zero for untyped metrics, whose value is not exposed by `prometheus`
    pub value: f64,
    /// Sample count for histograms and summaries, zero otherwise
    pub count: u64,
}

impl Sample {
    /// Value of the label `name`, if present
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }
}

/// Flatten metric families into samples, in family then label order
pub fn flatten(families: &[MetricFamily]) -> Vec<Sample> {
    let mut samples = Vec::new();
    for family in families {
        for metric in family.get_metric() {
            let labels = metric
                .get_label()
                .iter()
                .map(|pair| (pair.name().to_owned(), pair.value().to_owned()))
                .collect();
            let (value, count) = match family.get_field_type() {
                MetricType::COUNTER => (metric.get_counter().get_value(), 0),
                MetricType::GAUGE => (metric.get_gauge().get_value(), 0),
                MetricType::HISTOGRAM => {
                    let h = metric.get_histogram();
                    (h.get_sample_sum(), h.get_sample_count())
                }
                MetricType::SUMMARY => {
                    let s = metric.get_summary();
                    (s.sample_sum(), s.sample_count())
                }
                MetricType::UNTYPED => (0.0, 0),
            };
            samples.push(Sample { name: family.name().to_owned(), labels, value, count });
        }
    }
    samples
}

/// Collect `collector` once and flatten the result
pub fn samples<T: Collector + ?Sized>(collector: &T) -> Vec<Sample> {
    flatten(&collector.collect())
}

/// First sample whose label `name` equals `value`
pub fn find<'a>(samples: &'a [Sample], name: &str, value: &str) -> Option<&'a Sample> {
    samples.iter().find(|sample| sample.label(name) == Some(value))
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes
///
/// Returns the final evaluation of the condition.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[cfg(test)]
mod tests {
    //! Unit tests for testing helpers.
    use prometheus::{CounterVec, Opts};

    use super::*;

    /// Validates flattening of a labeled counter family.
    ///
    /// Assertions:
    /// - Confirms labels and values land in the sample.
    /// - Confirms `find` locates a series by label.
    #[test]
    fn test_samples_from_counter_vec() {
        let vec = CounterVec::new(Opts::new("hits_total", "help"), &["name"]).expect("vec");
        vec.with_label_values(&["toto"]).inc_by(3.0);
        vec.with_label_values(&["titi"]).inc();

        let collected = samples(&vec);
        assert_eq!(collected.len(), 2);
        let toto = find(&collected, "name", "toto").expect("toto");
        assert_eq!(toto.value, 3.0);
        assert_eq!(toto.name, "hits_total");
        assert!(find(&collected, "name", "tata").is_none());
    }

    /// Validates flattening of hand-built summary and untyped families.
    ///
    /// Assertions:
    /// - Confirms summary sum and count land in the sample.
    /// - Confirms untyped metrics flatten to zero with their labels intact.
    #[test]
    fn test_flatten_summary_and_untyped() {
        use prometheus::proto::{LabelPair, Metric, Summary};

        let mut label = LabelPair::default();
        label.set_name("name".to_owned());
        label.set_value("toto".to_owned());

        let mut summary = Summary::default();
        summary.set_sample_count(4);
        summary.set_sample_sum(30.0);
        let mut summary_metric = Metric::from_label(vec![label.clone()]);
        summary_metric.set_summary(summary);
        let mut summaries = MetricFamily::default();
        summaries.set_name("rpc_seconds".to_owned());
        summaries.set_field_type(MetricType::SUMMARY);
        summaries.set_metric(vec![summary_metric]);

        let mut untyped = MetricFamily::default();
        untyped.set_name("legacy".to_owned());
        untyped.set_field_type(MetricType::UNTYPED);
        untyped.set_metric(vec![Metric::from_label(vec![label])]);

        let flat = flatten(&[summaries, untyped]);
        assert_eq!(flat.len(), 2);
        assert_eq!((flat[0].value, flat[0].count), (30.0, 4));
        assert_eq!(flat[1].name, "legacy");
        assert_eq!(flat[1].value, 0.0);
        assert_eq!(flat[1].label("name"), Some("toto"));
    }

    /// Validates `wait_for` on an already-true condition.
    ///
    /// Assertions:
    /// - Confirms it returns immediately with true.
    /// - Confirms a never-true condition returns false after the timeout.
    #[test]
    fn test_wait_for() {
        assert!(wait_for(Duration::from_secs(1), || true));
        assert!(!wait_for(Duration::from_millis(10), || false));
    }
}
