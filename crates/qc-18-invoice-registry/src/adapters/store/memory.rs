use super::table::InvoiceTable;
use crate::domain::{Invoice, PaymentHash};
use crate::error::InvoiceResult;
use crate::ports::outbound::{InvoiceStore, InvoiceUpdateCallback};
use parking_lot::RwLock;

/// In-memory invoice store for tests and ephemeral nodes.
///
/// Updates hold the write lock for the whole read-decide-write step.
#[derive(Default)]
pub struct InMemoryInvoiceStore {
    table: RwLock<InvoiceTable>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InvoiceStore for InMemoryInvoiceStore {
    fn add_invoice(&self, payment_hash: PaymentHash, invoice: Invoice) -> InvoiceResult<u64> {
        self.table.write().add(payment_hash, invoice)
    }

    fn lookup_invoice(&self, payment_hash: &PaymentHash) -> InvoiceResult<Invoice> {
        self.table.read().get(payment_hash)
    }

    fn lookup_by_add_index(&self, add_index: u64) -> InvoiceResult<Invoice> {
        self.table.read().get_by_add_index(add_index)
    }

    fn invoices_added_since(&self, add_index: u64) -> InvoiceResult<Vec<Invoice>> {
        Ok(self.table.read().added_since(add_index))
    }

    fn invoices_settled_since(&self, settle_index: u64) -> InvoiceResult<Vec<Invoice>> {
        Ok(self.table.read().settled_since(settle_index))
    }

    fn update_invoice(
        &self,
        payment_hash: &PaymentHash,
        callback: &mut InvoiceUpdateCallback<'_>,
    ) -> InvoiceResult<Invoice> {
        Ok(self.table.write().update(payment_hash, callback)?.invoice)
    }
}
