//! Domain module for the Invoice Registry subsystem
//!
//! ## Core Modules
//! - invoice: Invoice entity, payment hash/preimage, lifecycle
//! - htlc: Exit-hop HTLC resolution rules (pure)
//! - expiry: Final-hop CLTV margin
//! - hodl: Parked attempts on hold invoices

pub mod expiry;
pub mod hodl;
pub mod htlc;
pub mod invoice;

pub use expiry::{ExpiryCheck, ExpiryPolicy};
pub use hodl::{HodlDelivery, HodlSender, HodlTable};
pub use htlc::{
    decide_cancel, decide_htlc, decide_settle_hodl, HodlEvent, HtlcAttempt, HtlcDecision,
    HtlcResolution,
};
pub use invoice::{
    Invoice, InvoiceState, InvoiceUpdate, MilliSatoshi, PaymentHash, Preimage, Timestamp,
};
