//! # qc-18-invoice-registry
//!
//! Invoice Registry for exit-hop HTLC settlement, including hold invoices.
//!
//! ## Overview
//!
//! This subsystem provides:
//! - **Invoice lifecycle**: Open, Accepted, Settled, Canceled with strict transitions
//! - **Exit-hop validation**: deterministic resolution of incoming payments, safe to replay
//! - **Hold invoices**: accept now, settle or cancel later through a parked channel
//! - **Notifications**: all-invoice and single-invoice subscriptions with backlog replay
//!
//! ## Architecture
//!
//! ```text
//! Link layer ──notify_exit_hop_htlc──→ Invoice Registry (18) ──update_invoice──→ InvoiceStore
//!                                          │
//!                                          ├── HodlEvent ──→ parked attempt channel
//!                                          │
//!                                          └── Invoice snapshots ──→ subscribers
//! ```
//!
//! ## Invoice Lifecycle
//!
//! ```text
//! [OPEN] ──htlc (known preimage)──→ [SETTLED]
//!   │
//!   ├── htlc (hold invoice) ──→ [ACCEPTED] ──settle_hodl──→ [SETTLED]
//!   │                               │
//!   └──────── cancel ───────────────┴──────── cancel ──────→ [CANCELED]
//! ```
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `domain` | Invoice entity, HTLC resolution rules, hodl table |
//! | `ports` | Registry API and store/decoder/clock traits |
//! | `adapters` | In-memory and file-backed stores, static expiry decoder |
//! | `notifications` | Subscriber hub and subscription handles |
//! | `service` | `InvoiceRegistry` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use qc_18_invoice_registry::{
//!     InMemoryInvoiceStore, InvoiceRegistry, InvoiceRegistryApi, RegistryConfig,
//!     StaticExpiryDecoder,
//! };
//!
//! let registry = InvoiceRegistry::new(
//!     RegistryConfig::from_env(),
//!     Arc::new(InMemoryInvoiceStore::new()),
//!     Arc::new(StaticExpiryDecoder(40)),
//! );
//! registry.start()?;
//!
//! let add_index = registry.add_invoice(Invoice::new(100_000, None), payment_hash)?;
//! let resolution = registry.notify_exit_hop_htlc(&payment_hash, 100_000, 140, 100, &hodl_tx)?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod notifications;
pub mod ports;
pub mod service;

pub use adapters::{FileInvoiceStore, InMemoryInvoiceStore, StaticExpiryDecoder};
pub use config::RegistryConfig;
pub use domain::{
    HodlEvent, HodlSender, HtlcResolution, Invoice, InvoiceState, InvoiceUpdate, MilliSatoshi,
    PaymentHash, Preimage, Timestamp,
};
pub use error::{InvoiceError, InvoiceResult};
pub use notifications::{InvoiceSubscription, NotificationHub, SingleInvoiceSubscription};
pub use ports::inbound::{InvoiceLookup, InvoiceRegistryApi};
pub use ports::outbound::{
    ExpiryDecoder, InvoiceStore, InvoiceUpdateCallback, MockTimeSource, SystemTimeSource,
    TimeSource,
};
pub use service::InvoiceRegistry;
