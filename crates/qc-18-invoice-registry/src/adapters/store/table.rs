use crate::domain::{Invoice, InvoiceState, PaymentHash};
use crate::error::{InvoiceError, InvoiceResult};
use crate::ports::outbound::InvoiceUpdateCallback;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Invoice records plus their add and settle indices.
///
/// Shared by the in-memory and file-backed stores; the file store persists
/// the whole table as one snapshot.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct InvoiceTable {
    invoices: HashMap<PaymentHash, Invoice>,
    by_add_index: BTreeMap<u64, PaymentHash>,
    by_settle_index: BTreeMap<u64, PaymentHash>,
    last_add_index: u64,
    last_settle_index: u64,
}

/// Result of a successful `update`
pub(crate) struct Updated {
    pub invoice: Invoice,
    /// Record before the update, `None` if nothing changed
    pub previous: Option<Invoice>,
}

impl InvoiceTable {
    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn add(&mut self, payment_hash: PaymentHash, mut invoice: Invoice) -> InvoiceResult<u64> {
        if self.invoices.contains_key(&payment_hash) {
            return Err(InvoiceError::InvoiceAlreadyExists { payment_hash });
        }

        self.last_add_index += 1;
        let add_index = self.last_add_index;

        invoice.payment_hash = payment_hash;
        invoice.add_index = add_index;
        invoice.settle_index = None;

        self.by_add_index.insert(add_index, payment_hash);
        self.invoices.insert(payment_hash, invoice);
        Ok(add_index)
    }

    /// Undo the most recent `add` of `payment_hash`.
    pub fn revert_add(&mut self, payment_hash: &PaymentHash) {
        if let Some(invoice) = self.invoices.remove(payment_hash) {
            self.by_add_index.remove(&invoice.add_index);
            if invoice.add_index == self.last_add_index {
                self.last_add_index -= 1;
            }
        }
    }

    pub fn get(&self, payment_hash: &PaymentHash) -> InvoiceResult<Invoice> {
        self.invoices
            .get(payment_hash)
            .cloned()
            .ok_or(InvoiceError::InvoiceNotFound {
                payment_hash: *payment_hash,
            })
    }

    pub fn get_by_add_index(&self, add_index: u64) -> InvoiceResult<Invoice> {
        let payment_hash = self
            .by_add_index
            .get(&add_index)
            .ok_or(InvoiceError::AddIndexNotFound { add_index })?;
        self.get(payment_hash)
    }

    pub fn added_since(&self, add_index: u64) -> Vec<Invoice> {
        self.by_add_index
            .range(add_index.saturating_add(1)..)
            .filter_map(|(_, hash)| self.invoices.get(hash).cloned())
            .collect()
    }

    pub fn settled_since(&self, settle_index: u64) -> Vec<Invoice> {
        self.by_settle_index
            .range(settle_index.saturating_add(1)..)
            .filter_map(|(_, hash)| self.invoices.get(hash).cloned())
            .collect()
    }

    pub fn update(
        &mut self,
        payment_hash: &PaymentHash,
        callback: &mut InvoiceUpdateCallback<'_>,
    ) -> InvoiceResult<Updated> {
        let current = self.get(payment_hash)?;

        let Some(update) = callback(&current)? else {
            return Ok(Updated {
                invoice: current,
                previous: None,
            });
        };

        let mut next = current.clone();
        next.apply_update(&update)?;

        if next.state == InvoiceState::Settled && next.settle_index.is_none() {
            self.last_settle_index += 1;
            next.settle_index = Some(self.last_settle_index);
            self.by_settle_index
                .insert(self.last_settle_index, *payment_hash);
        }

        self.invoices.insert(*payment_hash, next.clone());
        Ok(Updated {
            invoice: next,
            previous: Some(current),
        })
    }

    /// Restore the record an `update` replaced.
    pub fn revert_update(&mut self, previous: Invoice) {
        let payment_hash = previous.payment_hash;
        if let Some(current) = self.invoices.get(&payment_hash) {
            if let (Some(index), None) = (current.settle_index, previous.settle_index) {
                self.by_settle_index.remove(&index);
                if index == self.last_settle_index {
                    self.last_settle_index -= 1;
                }
            }
        }
        self.invoices.insert(payment_hash, previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InvoiceUpdate, Preimage};

    fn hash(byte: u8) -> PaymentHash {
        PaymentHash([byte; 32])
    }

    fn settle(_: &Invoice) -> InvoiceResult<Option<InvoiceUpdate>> {
        Ok(Some(InvoiceUpdate::settle(Some(1), None, 5)))
    }

    fn reject(_: &Invoice) -> InvoiceResult<Option<InvoiceUpdate>> {
        Err(InvoiceError::InvoiceStillOpen)
    }

    #[test]
    fn test_add_indices_start_at_one() {
        let mut table = InvoiceTable::default();
        assert_eq!(table.add(hash(1), Invoice::new(1, None)).unwrap(), 1);
        assert_eq!(table.add(hash(2), Invoice::new(1, None)).unwrap(), 2);
        assert_eq!(table.get_by_add_index(2).unwrap().payment_hash, hash(2));
    }

    #[test]
    fn test_unknown_add_index_reports_index() {
        let mut table = InvoiceTable::default();
        table.add(hash(1), Invoice::new(1, None)).unwrap();

        let err = table.get_by_add_index(7).unwrap_err();
        assert_eq!(err, InvoiceError::AddIndexNotFound { add_index: 7 });
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_duplicate_rejected_without_consuming_index() {
        let mut table = InvoiceTable::default();
        table.add(hash(1), Invoice::new(1, None)).unwrap();
        assert_eq!(
            table.add(hash(1), Invoice::new(2, None)),
            Err(InvoiceError::InvoiceAlreadyExists {
                payment_hash: hash(1)
            })
        );
        assert_eq!(table.add(hash(2), Invoice::new(1, None)).unwrap(), 2);
    }

    #[test]
    fn test_settle_index_assigned_once() {
        let mut table = InvoiceTable::default();
        table.add(hash(1), Invoice::new(1, Some(Preimage([1; 32])))).unwrap();

        let updated = table
            .update(&hash(1), &mut settle)
            .unwrap();
        assert_eq!(updated.invoice.settle_index, Some(1));
        assert_eq!(table.settled_since(0).len(), 1);
        assert!(table.settled_since(1).is_empty());
    }

    #[test]
    fn test_callback_error_leaves_record() {
        let mut table = InvoiceTable::default();
        table.add(hash(1), Invoice::new(1, None)).unwrap();

        let result = table.update(&hash(1), &mut reject);
        assert!(result.is_err());
        assert_eq!(table.get(&hash(1)).unwrap().state, InvoiceState::Open);
    }

    #[test]
    fn test_revert_update_restores_settle_counter() {
        let mut table = InvoiceTable::default();
        table.add(hash(1), Invoice::new(1, Some(Preimage([1; 32])))).unwrap();

        let updated = table
            .update(&hash(1), &mut settle)
            .unwrap();
        table.revert_update(updated.previous.unwrap());

        assert_eq!(table.get(&hash(1)).unwrap().state, InvoiceState::Open);
        assert!(table.settled_since(0).is_empty());
        assert_eq!(table.last_settle_index, 0);
    }

    #[test]
    fn test_revert_add() {
        let mut table = InvoiceTable::default();
        table.add(hash(1), Invoice::new(1, None)).unwrap();
        table.revert_add(&hash(1));

        assert_eq!(table.len(), 0);
        assert_eq!(table.add(hash(1), Invoice::new(1, None)).unwrap(), 1);
    }
}
