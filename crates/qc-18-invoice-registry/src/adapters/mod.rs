//! Adapters layer for the Invoice Registry subsystem.
//!
//! - store: `InvoiceStore` implementations (memory, file)
//! - expiry: `ExpiryDecoder` implementations

pub mod expiry;
pub mod store;

pub use expiry::StaticExpiryDecoder;
pub use store::{FileInvoiceStore, InMemoryInvoiceStore};
