//! Driven Ports (SPI - Outbound Dependencies)
//!
//! These are the interfaces the registry requires the host node to provide:
//! durable invoice storage, final-hop expiry decoding and a clock.

use crate::domain::{Invoice, InvoiceUpdate, PaymentHash, Timestamp};
use crate::error::InvoiceResult;

/// Decides the next state of an invoice from its current record.
///
/// - `Ok(None)`: leave the record unchanged
/// - `Ok(Some(update))`: apply the update
/// - `Err(_)`: abort; nothing is written
pub type InvoiceUpdateCallback<'a> =
    dyn FnMut(&Invoice) -> InvoiceResult<Option<InvoiceUpdate>> + 'a;

/// Durable invoice storage
///
/// Production: the node's database layer
/// Testing: `InMemoryInvoiceStore`, `FileInvoiceStore`
///
/// ## Atomicity Guarantee
///
/// `update_invoice` reads, decides and writes as one step; concurrent readers
/// observe either the old or the new record, never a partial one.
pub trait InvoiceStore: Send + Sync {
    /// Persist a new invoice under `payment_hash` and return its add index.
    ///
    /// Add indices start at 1 and are never reused.
    ///
    /// # Errors
    /// - `InvoiceAlreadyExists`: hash already present
    fn add_invoice(&self, payment_hash: PaymentHash, invoice: Invoice) -> InvoiceResult<u64>;

    /// # Errors
    /// - `InvoiceNotFound`
    fn lookup_invoice(&self, payment_hash: &PaymentHash) -> InvoiceResult<Invoice>;

    /// # Errors
    /// - `AddIndexNotFound`: no invoice was added with this index
    fn lookup_by_add_index(&self, add_index: u64) -> InvoiceResult<Invoice>;

    /// Invoices with an add index above `add_index`, in add order.
    fn invoices_added_since(&self, add_index: u64) -> InvoiceResult<Vec<Invoice>>;

    /// Invoices with a settle index above `settle_index`, in settle order.
    fn invoices_settled_since(&self, settle_index: u64) -> InvoiceResult<Vec<Invoice>>;

    /// Atomically update an invoice and return the record as stored afterwards.
    ///
    /// The store assigns the next settle index when an update moves the
    /// invoice into Settled.
    ///
    /// # Errors
    /// - `InvoiceNotFound`: callback is not invoked
    /// - whatever the callback returns
    fn update_invoice(
        &self,
        payment_hash: &PaymentHash,
        callback: &mut InvoiceUpdateCallback<'_>,
    ) -> InvoiceResult<Invoice>;
}

/// Extracts the final-hop CLTV delta an invoice asks for from its encoded
/// payment request.
pub trait ExpiryDecoder: Send + Sync {
    /// # Errors
    /// - `ExpiryDecode`: request cannot be decoded
    fn decode_final_cltv_expiry(&self, payment_request: &str) -> InvoiceResult<u32>;
}

impl<F> ExpiryDecoder for F
where
    F: Fn(&str) -> InvoiceResult<u32> + Send + Sync,
{
    fn decode_final_cltv_expiry(&self, payment_request: &str) -> InvoiceResult<u32> {
        self(payment_request)
    }
}

/// Time source for creation and settlement timestamps.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Current time in seconds since the Unix epoch
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Mock time source for testing.
#[derive(Debug)]
pub struct MockTimeSource {
    time: std::sync::atomic::AtomicU64,
}

impl MockTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: std::sync::atomic::AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.time
            .fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvoiceError;

    #[test]
    fn test_system_time_source() {
        // Should be a reasonable timestamp (after year 2020)
        assert!(SystemTimeSource.now() > 1_577_836_800);
    }

    #[test]
    fn test_mock_time_source() {
        let source = MockTimeSource::new(1000);
        assert_eq!(source.now(), 1000);

        source.advance(500);
        assert_eq!(source.now(), 1500);
    }

    #[test]
    fn test_closure_is_expiry_decoder() {
        let decoder = |request: &str| -> InvoiceResult<u32> {
            request.parse().map_err(|_| InvoiceError::ExpiryDecode {
                reason: format!("not a number: {request}"),
            })
        };

        assert_eq!(decoder.decode_final_cltv_expiry("40").unwrap(), 40);
        assert!(decoder.decode_final_cltv_expiry("lnbc1").is_err());
    }

    fn _assert_object_safe(_: &dyn InvoiceStore, _: &dyn ExpiryDecoder, _: &dyn TimeSource) {}
}
