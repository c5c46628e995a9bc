//! Driving Ports (API - Inbound)
//!
//! | Method | Caller |
//! |--------|--------|
//! | `add_invoice` | RPC invoice creation |
//! | `notify_exit_hop_htlc` | Link layer, incoming contest resolver |
//! | `settle_hodl_invoice` | RPC (hold invoice owner) |
//! | `cancel_invoice` | RPC, hold invoice timeout logic |
//! | `lookup_invoice` / `subscribe_*` | RPC, wallet UI |

use crate::domain::{HodlSender, HtlcResolution, Invoice, MilliSatoshi, PaymentHash, Preimage};
use crate::error::InvoiceResult;
use crate::notifications::{InvoiceSubscription, SingleInvoiceSubscription};

/// Invoice snapshot plus the final CLTV delta decoded from its request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceLookup {
    pub invoice: Invoice,
    pub final_cltv_delta: u32,
}

/// Primary Invoice Registry API
///
/// Every state-affecting method is serialized per registry instance.
pub trait InvoiceRegistryApi: Send + Sync {
    /// Start the registry. Must be called once before any other operation.
    ///
    /// # Errors
    /// - `RegistryAlreadyStarted`
    fn start(&self) -> InvoiceResult<()>;

    /// Stop the registry: detaches all subscribers and forgets parked
    /// attempts. Idempotent.
    fn stop(&self);

    /// Add an invoice in Open state and return its add index.
    ///
    /// # Errors
    /// - `InvoiceAlreadyExists`: hash already registered
    /// - `PreimageMismatch`: known preimage does not hash to `payment_hash`
    fn add_invoice(&self, invoice: Invoice, payment_hash: PaymentHash) -> InvoiceResult<u64>;

    /// Resolve an HTLC paying one of our invoices.
    ///
    /// Never blocks on a hold invoice: `Accept` returns immediately and the
    /// final outcome arrives later as a `HodlEvent` on `hodl_sender`.
    ///
    /// # Errors
    /// - `InvoiceNotFound`: the hash is not ours (forwarded HTLC)
    fn notify_exit_hop_htlc(
        &self,
        payment_hash: &PaymentHash,
        amount_msat: MilliSatoshi,
        expiry: u32,
        current_height: u32,
        hodl_sender: &HodlSender,
    ) -> InvoiceResult<HtlcResolution>;

    /// Reveal the preimage of an accepted hold invoice.
    ///
    /// # Errors
    /// - `InvoiceNotFound`
    /// - `InvoiceAlreadySettled`, `InvoiceAlreadyCanceled`, `InvoiceStillOpen`
    fn settle_hodl_invoice(&self, preimage: Preimage) -> InvoiceResult<()>;

    /// Cancel an open or accepted invoice. Canceling twice succeeds.
    ///
    /// # Errors
    /// - `InvoiceNotFound`
    /// - `InvoiceAlreadySettled`
    fn cancel_invoice(&self, payment_hash: &PaymentHash) -> InvoiceResult<()>;

    /// # Errors
    /// - `InvoiceNotFound`
    fn lookup_invoice(&self, payment_hash: &PaymentHash) -> InvoiceResult<InvoiceLookup>;

    /// Subscribe to new and settled invoices, replaying everything above the
    /// given cursors first. Zero means "from the start".
    fn subscribe_notifications(
        &self,
        add_index: u64,
        settle_index: u64,
    ) -> InvoiceResult<InvoiceSubscription>;

    /// Subscribe to state changes of one invoice, which need not exist yet.
    fn subscribe_single_invoice(
        &self,
        payment_hash: PaymentHash,
    ) -> InvoiceResult<SingleInvoiceSubscription>;
}
