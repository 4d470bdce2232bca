//! Observability of the engine. Every function here stands for an event that
//! is meaningful to the system; it logs the event and updates the metrics if
//! the event is worth measuring.

use crate::domain::{
    Error,
    auction,
    engine::{Bid, BidReceipt, Registration, Settlement},
};

mod metrics;

/// Setup the observability. The log argument configures the tokio tracing
/// framework.
pub fn init(log: &str, use_json: bool) {
    observe::tracing::initialize(&observe::Config::new(log, None, use_json));
    metrics::init();
}

/// The metrics registry in the prometheus text format.
pub fn encoded_metrics() -> String {
    observe::metrics::encode(observe::metrics::get_registry())
}

fn outcome<T>(result: &Result<T, Error>) -> &'static str {
    match result {
        Ok(_) => "accepted",
        Err(err) => err.kind().as_str(),
    }
}

/// Observe the outcome of a registration.
pub fn registration(registration: &Registration, result: &Result<auction::Id, Error>) {
    match result {
        Ok(id) => tracing::info!(%id, ?registration, "registered auction"),
        Err(err) => tracing::info!(?registration, ?err, "rejected registration"),
    }
    metrics::get()
        .registrations
        .with_label_values(&[outcome(result)])
        .inc();
}

/// Observe the outcome of a bid.
pub fn bid(bid: &Bid, result: &Result<BidReceipt, Error>) {
    match result {
        Ok(receipt) => tracing::info!(?receipt, "accepted bid"),
        Err(err) => tracing::info!(
            auction = %bid.auction,
            bidder = %bid.bidder,
            amount = %bid.amount,
            ?err,
            "rejected bid"
        ),
    }
    metrics::get()
        .bids
        .with_label_values(&[outcome(result)])
        .inc();
}

/// Observe the outcome of a claim.
pub fn claim(auction: auction::Id, result: &Result<Settlement, Error>) {
    match result {
        Ok(settlement) => tracing::info!(?settlement, "claimed auction"),
        Err(err) => tracing::info!(%auction, ?err, "rejected claim"),
    }
    metrics::get()
        .claims
        .with_label_values(&[outcome(result)])
        .inc();
}

/// Observe the outcome of a cancellation.
pub fn cancellation(auction: auction::Id, result: &Result<(), Error>) {
    match result {
        Ok(()) => tracing::info!(%auction, "cancelled auction"),
        Err(err) => tracing::info!(%auction, ?err, "rejected cancellation"),
    }
    metrics::get()
        .cancellations
        .with_label_values(&[outcome(result)])
        .inc();
}
