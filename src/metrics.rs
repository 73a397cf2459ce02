// Prometheus metrics for the crawl loop.

use std::path::Path;

use lazy_static::lazy_static;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    /// Players listed by the most recent successful fetch.
    pub static ref PLAYERS_ONLINE: IntGauge =
        IntGauge::new("botcrawler_players_online", "Players in the last fetched listing").unwrap();

    /// Crawl cycles, by outcome (ok, fetch_error).
    pub static ref CYCLES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("botcrawler_cycles_total", "Total crawl cycles"),
        &["outcome"],
    )
    .unwrap();

    /// Reconciled players, by outcome (inserted, unchanged, renamed, error).
    pub static ref PLAYERS_RECONCILED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("botcrawler_players_reconciled_total", "Total player reconciliations"),
        &["outcome"],
    )
    .unwrap();

    /// Wall time of a single fetch attempt.
    pub static ref FETCH_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("botcrawler_fetch_duration_seconds", "Fetch duration in seconds")
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(PLAYERS_ONLINE.clone()),
        Box::new(CYCLES_TOTAL.clone()),
        Box::new(PLAYERS_RECONCILED_TOTAL.clone()),
        Box::new(FETCH_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        if let Err(e) = REGISTRY.register(c) {
            tracing::debug!("Metric already registered: {e}");
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {e}");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Dump the exposition to `path` for a textfile collector. Written to a
/// sibling temp file first so scrapers never see a partial file.
pub fn write_textfile(path: &Path) -> std::io::Result<()> {
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, gather_metrics())?;
    std::fs::rename(tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_metrics_after_register() {
        register_metrics();
        register_metrics();
        CYCLES_TOTAL.with_label_values(&["ok"]).inc();
        let output = gather_metrics();
        assert!(output.contains("botcrawler_cycles_total"));
    }

    #[test]
    fn test_metric_increments() {
        PLAYERS_ONLINE.set(12);
        assert_eq!(PLAYERS_ONLINE.get(), 12);

        let before = PLAYERS_RECONCILED_TOTAL.with_label_values(&["renamed"]).get();
        PLAYERS_RECONCILED_TOTAL.with_label_values(&["renamed"]).inc();
        assert_eq!(
            PLAYERS_RECONCILED_TOTAL.with_label_values(&["renamed"]).get(),
            before + 1
        );

        FETCH_DURATION_SECONDS.observe(0.42);
    }

    #[test]
    fn test_write_textfile() {
        register_metrics();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("botcrawler.prom");
        write_textfile(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("botcrawler_"));
        assert!(!dir.path().join("botcrawler.prom.tmp").exists());
    }
}
