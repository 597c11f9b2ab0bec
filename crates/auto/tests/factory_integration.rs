//! Integration tests for the registering factory
//!
//! Metrics are created through [`Factory`] and observed only through what the
//! registry gathers and encodes.

use std::time::{Duration, UNIX_EPOCH};

use lifecycle_metrics::{LifecycleConfig, MockClock, SweepMode};
use lifecycle_metrics_auto::Factory;
use prometheus::{Registry, TextEncoder};

fn anchored_clock() -> MockClock {
    MockClock::starting_at(UNIX_EPOCH + Duration::from_secs(1_219_204_980))
}

fn exposition(registry: &Registry) -> String {
    TextEncoder::new().encode_to_string(&registry.gather()).expect("encode")
}

/// Verifies warm-up and expiration as seen by a scraper.
///
/// # Test Steps
/// 1. Create a counter vector through a factory with warm-up 2s and expiry 10s
/// 2. Scrape at t0: the series is exposed at 0 with its generation tag
/// 3. Scrape at t0+3s: the real value is exposed
/// 4. Scrape twice at t0+15s: the idle series disappears
#[test]
fn test_scraped_lifecycle() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let clock = anchored_clock();
    let registry = Registry::new();
    let config = LifecycleConfig::builder()
        .warm_up(Duration::from_secs(2))
        .expiration(Duration::from_secs(10))
        .sweep(SweepMode::Inline)
        .build()
        .expect("config");
    let factory = Factory::with_config(&registry, config).with_clock(clock.clone());

    let hits = factory.counter_vec("hits_total", "Hits per client", &["client"]).expect("vec");
    hits.with_label_values(&["10.0.0.1"]).inc_by(10.0);

    let text = exposition(&registry);
    assert!(text.contains("# TYPE hits_total counter"));
    assert!(text.contains("hits_total{_tag_=\"48ab9774\",client=\"10.0.0.1\"} 0"));

    clock.advance(Duration::from_secs(3));
    assert!(exposition(&registry).contains("hits_total{_tag_=\"48ab9774\",client=\"10.0.0.1\"} 10"));

    clock.advance(Duration::from_secs(12));
    exposition(&registry);
    assert!(!exposition(&registry).contains("hits_total"));
    assert!(hits.is_empty());
}

/// Verifies metrics from several factories share one registry.
///
/// # Test Steps
/// 1. Create metrics through two factories with different configurations
/// 2. Scrape once and check both kinds of behavior side by side
#[test]
fn test_factories_share_registry() {
    let clock = anchored_clock();
    let registry = Registry::new();
    let warm = Factory::with_config(&registry, LifecycleConfig::warm_up(Duration::from_secs(60)))
        .with_clock(clock.clone());
    let plain = Factory::with(&registry).with_clock(clock.clone());

    let slow = warm.counter("slow_total", "Warms up for a minute").expect("counter");
    let fast = plain.counter("fast_total", "Warms up for one scrape").expect("counter");
    let depth = plain.gauge("queue_depth", "Pending jobs").expect("gauge");
    slow.inc_by(3.0);
    fast.inc_by(4.0);
    depth.set(5.0);

    exposition(&registry);
    clock.advance(Duration::from_secs(1));
    let text = exposition(&registry);

    assert!(text.contains("slow_total 0"));
    assert!(text.contains("fast_total 4"));
    assert!(text.contains("queue_depth 5"));
}
