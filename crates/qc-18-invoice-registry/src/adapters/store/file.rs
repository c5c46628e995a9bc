use super::table::InvoiceTable;
use crate::domain::{Invoice, PaymentHash};
use crate::error::{InvoiceError, InvoiceResult};
use crate::ports::outbound::{InvoiceStore, InvoiceUpdateCallback};
use parking_lot::RwLock;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File-backed invoice store.
///
/// Keeps the table in memory and rewrites a bincode snapshot on every
/// mutation. A mutation whose snapshot cannot be written is rolled back, so
/// memory never runs ahead of disk.
pub struct FileInvoiceStore {
    table: RwLock<InvoiceTable>,
    path: PathBuf,
}

impl FileInvoiceStore {
    /// Open the store at `path`, loading an existing snapshot if present.
    ///
    /// # Errors
    /// - `Storage`: the file exists but cannot be read or decoded
    pub fn open<P: AsRef<Path>>(path: P) -> InvoiceResult<Self> {
        let path = path.as_ref().to_path_buf();

        let table = match std::fs::read(&path) {
            Ok(bytes) => {
                let table: InvoiceTable = bincode::deserialize(&bytes).map_err(|e| {
                    InvoiceError::storage(format!("corrupt snapshot {}: {e}", path.display()))
                })?;
                info!(
                    "[qc-18] 💾 Loaded {} invoices from {}",
                    table.len(),
                    path.display()
                );
                table
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("[qc-18] 📁 No existing invoice file at {}", path.display());
                InvoiceTable::default()
            }
            Err(e) => return Err(InvoiceError::storage(e)),
        };

        Ok(Self {
            table: RwLock::new(table),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, table: &InvoiceTable) -> InvoiceResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(InvoiceError::storage)?;
        }

        let bytes = bincode::serialize(table).map_err(InvoiceError::storage)?;

        // Write atomically via temp file
        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(InvoiceError::storage)?;
        file.write_all(&bytes).map_err(InvoiceError::storage)?;
        file.sync_all().map_err(InvoiceError::storage)?;

        std::fs::rename(&temp_path, &self.path).map_err(InvoiceError::storage)
    }
}

impl InvoiceStore for FileInvoiceStore {
    fn add_invoice(&self, payment_hash: PaymentHash, invoice: Invoice) -> InvoiceResult<u64> {
        let mut table = self.table.write();
        let add_index = table.add(payment_hash, invoice)?;

        if let Err(e) = self.save(&table) {
            warn!(payment_hash = %payment_hash, error = %e, "[qc-18] Invoice add not persisted");
            table.revert_add(&payment_hash);
            return Err(e);
        }
        Ok(add_index)
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
        let mut table = self.table.write();
        let updated = table.update(payment_hash, callback)?;

        let Some(previous) = updated.previous else {
            return Ok(updated.invoice);
        };

        if let Err(e) = self.save(&table) {
            warn!(payment_hash = %payment_hash, error = %e, "[qc-18] Invoice update not persisted");
            table.revert_update(previous);
            return Err(e);
        }
        Ok(updated.invoice)
    }
}
