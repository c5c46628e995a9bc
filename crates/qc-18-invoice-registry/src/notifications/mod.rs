//! Invoice notifications
//!
//! - hub: subscriber registry and fan-out
//! - subscription: caller-owned handles

pub mod hub;
pub mod subscription;

pub use hub::NotificationHub;
pub use subscription::{InvoiceSubscription, SingleInvoiceSubscription};
