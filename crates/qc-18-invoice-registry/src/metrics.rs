//! # Invoice Registry Metrics
//!
//! Prometheus metrics for invoice traffic and hold invoice backlog.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-18-invoice-registry = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `invoice_registry_invoices_added_total` - Counter of invoices added
//! - `invoice_registry_htlc_resolutions_total` - Counter of exit-hop resolutions (by outcome)
//! - `invoice_registry_hodl_events_total` - Counter of hold invoice events (by outcome)
//! - `invoice_registry_parked_htlcs` - Gauge of attempts parked on hold invoices
//! - `invoice_registry_subscribers` - Gauge of attached notification subscribers

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total invoices added
    pub static ref INVOICES_ADDED: IntCounter = register_int_counter!(
        "invoice_registry_invoices_added_total",
        "Total number of invoices added"
    )
    .expect("Failed to create INVOICES_ADDED metric");

    /// Exit-hop resolutions, labeled by outcome
    pub static ref HTLC_RESOLUTIONS: IntCounterVec = register_int_counter_vec!(
        "invoice_registry_htlc_resolutions_total",
        "Total number of exit-hop HTLCs resolved",
        &["resolution"]
    )
    .expect("Failed to create HTLC_RESOLUTIONS metric");

    /// Hold invoice events, labeled settle/cancel
    pub static ref HODL_EVENTS: IntCounterVec = register_int_counter_vec!(
        "invoice_registry_hodl_events_total",
        "Total number of hold invoice resolutions",
        &["event"]
    )
    .expect("Failed to create HODL_EVENTS metric");

    /// Attempts currently parked
    pub static ref PARKED_HTLCS: IntGauge = register_int_gauge!(
        "invoice_registry_parked_htlcs",
        "Number of HTLCs parked on accepted hold invoices"
    )
    .expect("Failed to create PARKED_HTLCS metric");

    /// Attached subscribers
    pub static ref SUBSCRIBERS: IntGauge = register_int_gauge!(
        "invoice_registry_subscribers",
        "Number of attached invoice notification subscribers"
    )
    .expect("Failed to create SUBSCRIBERS metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record an invoice added
#[cfg(feature = "metrics")]
pub fn record_invoice_added() {
    INVOICES_ADDED.inc();
}

/// Record an exit-hop resolution ("settle", "cancel", "accept")
#[cfg(feature = "metrics")]
pub fn record_htlc_resolution(resolution: &str) {
    HTLC_RESOLUTIONS.with_label_values(&[resolution]).inc();
}

/// Record a hold invoice settled or canceled
#[cfg(feature = "metrics")]
pub fn record_hodl_event(settle: bool) {
    let label = if settle { "settle" } else { "cancel" };
    HODL_EVENTS.with_label_values(&[label]).inc();
}

/// Update parked attempts gauge
#[cfg(feature = "metrics")]
pub fn set_parked_htlcs(count: usize) {
    PARKED_HTLCS.set(count as i64);
}

/// Update subscribers gauge
#[cfg(feature = "metrics")]
pub fn set_active_subscribers(count: usize) {
    SUBSCRIBERS.set(count as i64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_invoice_added() {}

#[cfg(not(feature = "metrics"))]
pub fn record_htlc_resolution(_resolution: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_hodl_event(_settle: bool) {}

#[cfg(not(feature = "metrics"))]
pub fn set_parked_htlcs(_count: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn set_active_subscribers(_count: usize) {}
