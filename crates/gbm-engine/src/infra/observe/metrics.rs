/// Metrics for the auction engine.
#[derive(Debug, Clone, prometheus_metric_storage::MetricStorage)]
pub struct Metrics {
    /// Committed bids by outcome.
    #[metric(labels("result"))]
    pub bids: prometheus::IntCounterVec,

    /// Auction registrations by outcome.
    #[metric(labels("result"))]
    pub registrations: prometheus::IntCounterVec,

    /// Claims by outcome.
    #[metric(labels("result"))]
    pub claims: prometheus::IntCounterVec,

    /// Cancellations by outcome.
    #[metric(labels("result"))]
    pub cancellations: prometheus::IntCounterVec,
}

/// Setup the metrics registry.
pub fn init() {
    observe::metrics::setup_registry_reentrant(Some("gbm_engine".to_owned()), None);
}

/// Get the metrics instance.
pub fn get() -> &'static Metrics {
    Metrics::instance(observe::metrics::get_storage_registry())
        .expect("unexpected error getting metrics instance")
}
