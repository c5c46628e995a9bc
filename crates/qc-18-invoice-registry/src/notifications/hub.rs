//! Notification hub
//!
//! Fans invoice snapshots out to two kinds of subscribers:
//!
//! ```text
//!                        ┌──────────────────────┐
//!  add_invoice ─────────→│                      │──new──────→ all-invoice subscribers
//!  settle ──────────────→│   NotificationHub    │──settled──→ all-invoice subscribers
//!  any state change ────→│                      │──snapshot─→ single-invoice subscribers
//!                        └──────────────────────┘
//! ```
//!
//! Every subscriber channel is unbounded, so dispatch never blocks the
//! registry and a slow subscriber cannot hold up any other one. A subscriber
//! whose receiver is gone is detached on the next failed send.

use super::subscription::{InvoiceSubscription, SingleInvoiceSubscription};
use crate::domain::{Invoice, PaymentHash};
use crate::metrics;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::debug;

pub(crate) type SubscriberId = u64;

struct AllInvoicesClient {
    /// Highest add index delivered
    add_index: u64,
    /// Highest settle index delivered
    settle_index: u64,
    new_invoices: UnboundedSender<Invoice>,
    settled_invoices: UnboundedSender<Invoice>,
}

impl AllInvoicesClient {
    /// Returns false once the receiver is gone.
    fn deliver_new(&mut self, invoice: &Invoice) -> bool {
        if invoice.add_index <= self.add_index {
            return true;
        }
        self.add_index = invoice.add_index;
        self.new_invoices.send(invoice.clone()).is_ok()
    }

    fn deliver_settled(&mut self, invoice: &Invoice) -> bool {
        let Some(settle_index) = invoice.settle_index else {
            return true;
        };
        if settle_index <= self.settle_index {
            return true;
        }
        self.settle_index = settle_index;
        self.settled_invoices.send(invoice.clone()).is_ok()
    }
}

struct SingleInvoiceClient {
    payment_hash: PaymentHash,
    updates: UnboundedSender<Invoice>,
}

#[derive(Default)]
pub(crate) struct HubState {
    next_id: SubscriberId,
    all: BTreeMap<SubscriberId, AllInvoicesClient>,
    single: BTreeMap<SubscriberId, SingleInvoiceClient>,
}

impl HubState {
    fn allocate_id(&mut self) -> SubscriberId {
        self.next_id += 1;
        self.next_id
    }

    fn subscriber_count(&self) -> usize {
        self.all.len() + self.single.len()
    }

    pub(crate) fn remove_all(&mut self, id: SubscriberId) {
        if self.all.remove(&id).is_some() {
            debug!(subscriber = id, "[qc-18] Invoice subscriber detached");
            metrics::set_active_subscribers(self.subscriber_count());
        }
    }

    pub(crate) fn remove_single(&mut self, id: SubscriberId) {
        if self.single.remove(&id).is_some() {
            debug!(subscriber = id, "[qc-18] Single invoice subscriber detached");
            metrics::set_active_subscribers(self.subscriber_count());
        }
    }
}

/// Registry of live subscribers
#[derive(Clone, Default)]
pub struct NotificationHub {
    state: Arc<Mutex<HubState>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an all-invoices subscriber.
    ///
    /// `added_backlog` and `settled_backlog` are delivered first, in the order
    /// given; live events at or below the delivered indices are skipped.
    pub fn subscribe_all(
        &self,
        add_index: u64,
        settle_index: u64,
        added_backlog: Vec<Invoice>,
        settled_backlog: Vec<Invoice>,
    ) -> InvoiceSubscription {
        let (new_tx, new_rx) = mpsc::unbounded_channel();
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();

        let mut client = AllInvoicesClient {
            add_index,
            settle_index,
            new_invoices: new_tx,
            settled_invoices: settled_tx,
        };

        // Receivers are still held below, sends cannot fail.
        for invoice in &added_backlog {
            client.deliver_new(invoice);
        }
        for invoice in &settled_backlog {
            client.deliver_settled(invoice);
        }

        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.all.insert(id, client);
        metrics::set_active_subscribers(state.subscriber_count());

        debug!(
            subscriber = id,
            add_index,
            settle_index,
            backlog_added = added_backlog.len(),
            backlog_settled = settled_backlog.len(),
            "[qc-18] Invoice subscriber registered"
        );

        InvoiceSubscription::new(id, new_rx, settled_rx, Arc::downgrade(&self.state))
    }

    /// Register a subscriber for one payment hash, seeded with `current`.
    pub fn subscribe_single(
        &self,
        payment_hash: PaymentHash,
        current: Option<Invoice>,
    ) -> SingleInvoiceSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(invoice) = current {
            let _ = tx.send(invoice);
        }

        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.single.insert(
            id,
            SingleInvoiceClient {
                payment_hash,
                updates: tx,
            },
        );
        metrics::set_active_subscribers(state.subscriber_count());

        debug!(
            subscriber = id,
            payment_hash = %payment_hash,
            "[qc-18] Single invoice subscriber registered"
        );

        SingleInvoiceSubscription::new(id, payment_hash, rx, Arc::downgrade(&self.state))
    }

    /// Broadcast a newly added invoice.
    pub fn notify_new(&self, invoice: &Invoice) {
        let mut state = self.state.lock();
        let closed: Vec<_> = state
            .all
            .iter_mut()
            .filter_map(|(id, client)| (!client.deliver_new(invoice)).then_some(*id))
            .collect();
        for id in closed {
            state.remove_all(id);
        }
    }

    /// Broadcast a newly settled invoice.
    pub fn notify_settled(&self, invoice: &Invoice) {
        let mut state = self.state.lock();
        let closed: Vec<_> = state
            .all
            .iter_mut()
            .filter_map(|(id, client)| (!client.deliver_settled(invoice)).then_some(*id))
            .collect();
        for id in closed {
            state.remove_all(id);
        }
    }

    /// Send a state snapshot to the subscribers of this invoice.
    pub fn notify_state(&self, invoice: &Invoice) {
        let mut state = self.state.lock();
        let closed: Vec<_> = state
            .single
            .iter()
            .filter(|(_, client)| client.payment_hash == invoice.payment_hash)
            .filter_map(|(id, client)| client.updates.send(invoice.clone()).is_err().then_some(*id))
            .collect();
        for id in closed {
            state.remove_single(id);
        }
    }

    /// Detach every subscriber; their receivers drain and then end.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.all.clear();
        state.single.clear();
        metrics::set_active_subscribers(0);
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscriber_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InvoiceState;

    fn invoice(hash_byte: u8, add_index: u64) -> Invoice {
        let mut invoice = Invoice::new(1_000, None);
        invoice.payment_hash = PaymentHash([hash_byte; 32]);
        invoice.add_index = add_index;
        invoice
    }

    fn settled(mut invoice: Invoice, settle_index: u64) -> Invoice {
        invoice.state = InvoiceState::Settled;
        invoice.settle_index = Some(settle_index);
        invoice
    }

    #[test]
    fn test_backlog_then_live_without_duplicates() {
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe_all(0, 0, vec![invoice(1, 1), invoice(2, 2)], vec![]);

        // Already replayed
        hub.notify_new(&invoice(2, 2));
        hub.notify_new(&invoice(3, 3));

        let indices: Vec<_> = std::iter::from_fn(|| sub.new_invoices.try_recv().ok())
            .map(|i| i.add_index)
            .collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_cursor_filters_live_events() {
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe_all(5, 2, vec![], vec![]);

        hub.notify_new(&invoice(1, 4));
        hub.notify_settled(&settled(invoice(1, 4), 2));
        hub.notify_settled(&settled(invoice(2, 6), 3));

        assert!(sub.new_invoices.try_recv().is_err());
        assert_eq!(sub.settled_invoices.try_recv().unwrap().settle_index, Some(3));
    }

    #[test]
    fn test_single_invoice_filtering() {
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe_single(PaymentHash([1; 32]), None);

        hub.notify_state(&invoice(2, 1));
        hub.notify_state(&invoice(1, 2));

        assert_eq!(sub.updates.try_recv().unwrap().add_index, 2);
        assert!(sub.updates.try_recv().is_err());
    }

    #[test]
    fn test_single_invoice_seeded_with_current() {
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe_single(PaymentHash([1; 32]), Some(invoice(1, 7)));
        assert_eq!(sub.updates.try_recv().unwrap().add_index, 7);
    }

    #[test]
    fn test_cancel_detaches_but_keeps_queued() {
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe_all(0, 0, vec![], vec![]);
        hub.notify_new(&invoice(1, 1));

        sub.cancel();
        assert_eq!(hub.subscriber_count(), 0);

        hub.notify_new(&invoice(2, 2));
        assert_eq!(sub.new_invoices.try_recv().unwrap().add_index, 1);
        assert!(sub.new_invoices.try_recv().is_err());
    }

    #[test]
    fn test_drop_detaches() {
        let hub = NotificationHub::new();
        let sub = hub.subscribe_single(PaymentHash([1; 32]), None);
        let _all = hub.subscribe_all(0, 0, vec![], vec![]);
        assert_eq!(hub.subscriber_count(), 2);

        drop(sub);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn test_dead_receiver_detached_on_send() {
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe_single(PaymentHash([1; 32]), None);
        sub.updates.close();

        hub.notify_state(&invoice(1, 1));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_slow_subscriber_does_not_affect_others() {
        let hub = NotificationHub::new();
        let mut slow = hub.subscribe_all(0, 0, vec![], vec![]);
        let mut fast = hub.subscribe_all(0, 0, vec![], vec![]);

        for add_index in 1..=1_000 {
            hub.notify_new(&invoice(1, add_index));
            assert_eq!(fast.new_invoices.try_recv().unwrap().add_index, add_index);
        }

        let backlog = std::iter::from_fn(|| slow.new_invoices.try_recv().ok()).count();
        assert_eq!(backlog, 1_000);
    }

    #[test]
    fn test_close_ends_streams() {
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe_single(PaymentHash([1; 32]), None);
        hub.close();

        assert_eq!(hub.subscriber_count(), 0);
        assert!(matches!(
            sub.updates.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
