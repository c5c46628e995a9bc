//! Storage Adapters
//!
//! Implementations of the `InvoiceStore` trait.

mod file;
mod memory;
mod table;

pub use file::FileInvoiceStore;
pub use memory::InMemoryInvoiceStore;
