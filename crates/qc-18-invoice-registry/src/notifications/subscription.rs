//! Subscription handles returned to callers
//!
//! A handle owns its receivers. Canceling (or dropping) it detaches the
//! subscriber from the hub; events already queued stay readable and the
//! stream then ends.

use super::hub::{HubState, SubscriberId};
use crate::domain::{Invoice, PaymentHash};
use parking_lot::Mutex;
use std::sync::Weak;
use tokio::sync::mpsc::UnboundedReceiver;

/// Stream of newly added and newly settled invoices
pub struct InvoiceSubscription {
    id: SubscriberId,
    /// Invoices in add-index order
    pub new_invoices: UnboundedReceiver<Invoice>,
    /// Invoices in settle-index order
    pub settled_invoices: UnboundedReceiver<Invoice>,
    hub: Weak<Mutex<HubState>>,
}

impl InvoiceSubscription {
    pub(crate) fn new(
        id: SubscriberId,
        new_invoices: UnboundedReceiver<Invoice>,
        settled_invoices: UnboundedReceiver<Invoice>,
        hub: Weak<Mutex<HubState>>,
    ) -> Self {
        Self {
            id,
            new_invoices,
            settled_invoices,
            hub,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop receiving events. Idempotent.
    pub fn cancel(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.lock().remove_all(self.id);
        }
    }
}

impl Drop for InvoiceSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Stream of state snapshots for one payment hash
pub struct SingleInvoiceSubscription {
    id: SubscriberId,
    pub payment_hash: PaymentHash,
    pub updates: UnboundedReceiver<Invoice>,
    hub: Weak<Mutex<HubState>>,
}

impl SingleInvoiceSubscription {
    pub(crate) fn new(
        id: SubscriberId,
        payment_hash: PaymentHash,
        updates: UnboundedReceiver<Invoice>,
        hub: Weak<Mutex<HubState>>,
    ) -> Self {
        Self {
            id,
            payment_hash,
            updates,
            hub,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop receiving snapshots. Idempotent.
    pub fn cancel(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.lock().remove_single(self.id);
        }
    }
}

impl Drop for SingleInvoiceSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
