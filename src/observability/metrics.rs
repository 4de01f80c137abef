use anyhow::Result;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Dispatch metrics
    pub dispatch_requests: IntCounterVec,
    pub dispatch_duration: Histogram,
    pub token_renewals: IntCounter,

    // Token lifecycle
    pub token_issuance: IntCounterVec,
    pub token_validation: IntCounterVec,

    // Store
    pub store_failures: IntCounterVec,

    // Wire
    pub http_requests: IntCounterVec,

    // Config
    pub config_validation_errors: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("estatefeed".into()), None).expect("metrics registry");

        let metrics: Arc<Metrics> = Arc::new(Self {
            dispatch_requests: IntCounterVec::new(Opts::new("dispatch_requests_total", "Dispatch calls by outcome"), &["outcome"]).expect("metric"),
            dispatch_duration: Histogram::with_opts(HistogramOpts::new("dispatch_duration_seconds", "Dispatch duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])).expect("metric"),
            token_renewals: IntCounter::new("token_renewals_total", "Renewal cycles entered by the dispatcher").expect("metric"),

            token_issuance: IntCounterVec::new(Opts::new("token_issuance_total", "Token handshakes by result"), &["result"]).expect("metric"),
            token_validation: IntCounterVec::new(Opts::new("token_validation_total", "Token probes by result"), &["result"]).expect("metric"),

            store_failures: IntCounterVec::new(Opts::new("store_failures_total", "Credential store failures by operation"), &["op"]).expect("metric"),

            http_requests: IntCounterVec::new(Opts::new("http_requests_total", "HTTP requests by kind and status"), &["kind", "status"]).expect("metric"),

            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup").expect("metric"),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.dispatch_requests.clone())).expect("register");
        reg.register(Box::new(metrics.dispatch_duration.clone())).expect("register");
        reg.register(Box::new(metrics.token_renewals.clone())).expect("register");
        reg.register(Box::new(metrics.token_issuance.clone())).expect("register");
        reg.register(Box::new(metrics.token_validation.clone())).expect("register");
        reg.register(Box::new(metrics.store_failures.clone())).expect("register");
        reg.register(Box::new(metrics.http_requests.clone())).expect("register");
        reg.register(Box::new(metrics.config_validation_errors.clone())).expect("register");

        metrics
    }

    /// Prometheus text exposition of everything registered.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
