//! Neutral snapshots reported while a series warms up
//!
//! A neutral snapshot keeps the live metric's labels and shape (bucket
//! bounds, quantile ranks) but reports zero for every accumulated value.

use prometheus::proto::{Bucket, Metric, MetricType, Quantile};

/// Build the neutral snapshot of `live` for a metric of `metric_type`
///
/// Counters report zero; histograms report zero cumulative counts, sum and
/// count; summaries report zero quantile values, sum and count. Gauges and
/// untyped metrics have no meaningful neutral value and are returned as-is.
pub fn zeroed(metric_type: MetricType, live: &Metric) -> Metric {
    let mut neutral = live.clone();
    match metric_type {
        MetricType::COUNTER => {
            let mut counter = live.get_counter().clone();
            counter.set_value(0.0);
            neutral.set_counter(counter);
        }
        MetricType::HISTOGRAM => {
            let mut histogram = live.get_histogram().clone();
            let buckets: Vec<Bucket> = histogram
                .get_bucket()
                .iter()
                .map(|bucket| {
                    let mut bucket = bucket.clone();
                    bucket.set_cumulative_count(0);
                    bucket
                })
                .collect();
            histogram.set_bucket(buckets);
            histogram.set_sample_count(0);
            histogram.set_sample_sum(0.0);
            neutral.set_histogram(histogram);
        }
        MetricType::SUMMARY => {
            let mut summary = live.get_summary().clone();
            let quantiles: Vec<Quantile> = summary
                .get_quantile()
                .iter()
                .map(|quantile| {
                    let mut quantile = quantile.clone();
                    quantile.set_value(0.0);
                    quantile
                })
                .collect();
            summary.set_quantile(quantiles);
            summary.set_sample_count(0);
            summary.set_sample_sum(0.0);
            neutral.set_summary(summary);
        }
        MetricType::GAUGE | MetricType::UNTYPED => {}
    }
    neutral
}

#[cfg(test)]
mod tests {
    //! Unit tests for neutral.
    use prometheus::core::Metric as _;
    use prometheus::proto::{LabelPair, Summary};
    use prometheus::{Counter, Gauge, Histogram, HistogramOpts, Opts};

    use super::*;

    /// Validates the counter neutral snapshot.
    ///
    /// Assertions:
    /// - Confirms the value is zeroed.
    /// - Ensures the live counter is untouched.
    #[test]
    fn test_counter_zeroed() {
        let counter = Counter::with_opts(Opts::new("requests_total", "help")).expect("counter");
        counter.inc_by(10.0);

        let live = counter.metric();
        let neutral = zeroed(MetricType::COUNTER, &live);

        assert_eq!(neutral.get_counter().get_value(), 0.0);
        assert_eq!(live.get_counter().get_value(), 10.0);
        assert_eq!(counter.get(), 10.0);
    }

    /// Validates the histogram neutral snapshot.
    ///
    /// Assertions:
    /// - Confirms bucket bounds are kept and counts zeroed.
    /// - Confirms sum and count are zero.
    #[test]
    fn test_histogram_zeroed() {
        let histogram = Histogram::with_opts(
            HistogramOpts::new("latency_seconds", "help").buckets(vec![0.1, 1.0, 10.0]),
        )
        .expect("histogram");
        histogram.observe(0.5);
        histogram.observe(5.0);

        let neutral = zeroed(MetricType::HISTOGRAM, &histogram.metric());
        let h = neutral.get_histogram();

        let bounds: Vec<f64> = h.get_bucket().iter().map(|b| b.upper_bound()).collect();
        assert_eq!(bounds, vec![0.1, 1.0, 10.0]);
        assert!(h.get_bucket().iter().all(|b| b.cumulative_count() == 0));
        assert_eq!(h.get_sample_count(), 0);
        assert_eq!(h.get_sample_sum(), 0.0);
    }

    /// Validates the summary neutral snapshot on a hand-built metric.
    ///
    /// Assertions:
    /// - Confirms quantile ranks survive and values are zeroed.
    #[test]
    fn test_summary_zeroed() {
        let mut quantile = Quantile::default();
        quantile.set_quantile(0.99);
        quantile.set_value(12.5);
        let mut summary = Summary::default();
        summary.set_quantile(vec![quantile]);
        summary.set_sample_count(4);
        summary.set_sample_sum(30.0);
        let mut live = Metric::default();
        live.set_summary(summary);

        let neutral = zeroed(MetricType::SUMMARY, &live);
        let s = neutral.get_summary();

        assert_eq!(s.get_quantile()[0].quantile(), 0.99);
        assert_eq!(s.get_quantile()[0].value(), 0.0);
        assert_eq!(s.sample_count(), 0);
        assert_eq!(s.sample_sum(), 0.0);
    }

    /// Validates that gauges pass through unchanged.
    ///
    /// Assertions:
    /// - Confirms the gauge value is kept.
    #[test]
    fn test_gauge_passthrough() {
        let gauge = Gauge::with_opts(Opts::new("in_flight", "help")).expect("gauge");
        gauge.set(7.0);

        let live = gauge.metric();
        assert_eq!(zeroed(MetricType::GAUGE, &live), live);
    }

    /// Validates that labels survive zeroing.
    ///
    /// Assertions:
    /// - Confirms the label pairs are identical.
    #[test]
    fn test_labels_preserved() {
        let mut pair = LabelPair::default();
        pair.set_name("_tag_".to_string());
        pair.set_value("48ab9774".to_string());
        let mut live = Metric::default();
        live.set_label(vec![pair]);

        let neutral = zeroed(MetricType::COUNTER, &live);
        assert_eq!(neutral.get_label(), live.get_label());
    }
}
