//! Prometheus metrics for the HTTP layer and the favorites scheduler

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    pub http_requests_total: IntCounter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_in_flight: IntGauge,
    pub database_connected: Gauge,
    /// Labelled by `outcome`: completed, skipped, failed
    pub scheduler_passes_total: IntCounterVec,
    pub scheduler_symbol_failures_total: IntCounter,
    pub scheduler_pass_duration_seconds: Histogram,
    pub scheduler_cached_symbols: IntGauge,
    pub scheduler_persist_failures_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total =
            IntCounter::new("http_requests_total", "Total HTTP requests served")?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        ))?;
        let http_requests_in_flight =
            IntGauge::new("http_requests_in_flight", "HTTP requests currently being served")?;
        let database_connected = Gauge::new(
            "database_connected",
            "Analysis store connection state (1=connected)",
        )?;
        let scheduler_passes_total = IntCounterVec::new(
            Opts::new("scheduler_passes_total", "Favorites analysis passes by outcome"),
            &["outcome"],
        )?;
        let scheduler_symbol_failures_total = IntCounter::new(
            "scheduler_symbol_failures_total",
            "Symbols whose recommendation could not be fetched",
        )?;
        let scheduler_pass_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "scheduler_pass_duration_seconds",
                "Wall time of a favorites analysis pass",
            )
            .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        )?;
        let scheduler_cached_symbols = IntGauge::new(
            "scheduler_cached_symbols",
            "Symbols with a cached scheduled analysis",
        )?;
        let scheduler_persist_failures_total = IntCounter::new(
            "scheduler_persist_failures_total",
            "Failed attempts to mirror the analysis cache into the store",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(database_connected.clone()))?;
        registry.register(Box::new(scheduler_passes_total.clone()))?;
        registry.register(Box::new(scheduler_symbol_failures_total.clone()))?;
        registry.register(Box::new(scheduler_pass_duration_seconds.clone()))?;
        registry.register(Box::new(scheduler_cached_symbols.clone()))?;
        registry.register(Box::new(scheduler_persist_failures_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            database_connected,
            scheduler_passes_total,
            scheduler_symbol_failures_total,
            scheduler_pass_duration_seconds,
            scheduler_cached_symbols,
            scheduler_persist_failures_total,
        })
    }

    pub fn record_pass(&self, outcome: &str) {
        self.scheduler_passes_total.with_label_values(&[outcome]).inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
