//! # Restart Tests (qc-18)
//!
//! A registry reopened on the same file store must resolve replayed HTLCs
//! exactly as before, from persisted state alone.

use qc_18_invoice_registry::{
    FileInvoiceStore, HodlEvent, HtlcResolution, Invoice, InvoiceRegistry, InvoiceRegistryApi,
    InvoiceState, Preimage, RegistryConfig, StaticExpiryDecoder,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

fn open_registry(path: &Path) -> InvoiceRegistry<FileInvoiceStore, StaticExpiryDecoder> {
    let store = FileInvoiceStore::open(path).unwrap();
    let registry = InvoiceRegistry::new(
        RegistryConfig::default(),
        Arc::new(store),
        Arc::new(StaticExpiryDecoder(3)),
    );
    registry.start().unwrap();
    registry
}

#[test]
fn test_replay_after_restart_resolves_identically() {
    quantum_telemetry::init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invoices.db");

    let known = Preimage([1; 32]);
    let hold = Preimage([2; 32]);
    let (hodl_tx, _stale_rx) = mpsc::channel(1);

    {
        let registry = open_registry(&path);
        registry
            .add_invoice(Invoice::new(100_000, Some(known)).with_memo("coffee"), known.hash())
            .unwrap();
        registry
            .add_invoice(Invoice::new(50_000, None), hold.hash())
            .unwrap();

        assert_eq!(
            registry
                .notify_exit_hop_htlc(&known.hash(), 100_500, 3, 0, &hodl_tx)
                .unwrap(),
            HtlcResolution::Settle(known)
        );
        assert_eq!(
            registry
                .notify_exit_hop_htlc(&hold.hash(), 50_000, 3, 0, &hodl_tx)
                .unwrap(),
            HtlcResolution::Accept
        );
        registry.stop();
    }

    let registry = open_registry(&path);

    let settled = registry.lookup_invoice(&known.hash()).unwrap().invoice;
    assert_eq!(settled.state, InvoiceState::Settled);
    assert_eq!(settled.amt_paid_msat, 100_500);
    assert_eq!(settled.memo, "coffee");

    assert_eq!(
        registry
            .notify_exit_hop_htlc(&known.hash(), 100_500, 3, 0, &hodl_tx)
            .unwrap(),
        HtlcResolution::Settle(known)
    );
    assert_eq!(
        registry
            .notify_exit_hop_htlc(&known.hash(), 100_000, 3, 0, &hodl_tx)
            .unwrap(),
        HtlcResolution::Cancel
    );

    // The hold invoice is still accepted; the fresh attempt is parked
    let (fresh_tx, mut fresh_rx) = mpsc::channel(1);
    assert_eq!(registry.parked_htlcs(), 0);
    assert_eq!(
        registry
            .notify_exit_hop_htlc(&hold.hash(), 50_000, 3, 0, &fresh_tx)
            .unwrap(),
        HtlcResolution::Accept
    );
    assert_eq!(registry.parked_htlcs(), 1);

    registry.settle_hodl_invoice(hold).unwrap();
    assert_eq!(
        fresh_rx.try_recv().unwrap(),
        HodlEvent::settle(hold.hash(), hold)
    );

    // Counters continue where they left off
    let third = Preimage([3; 32]);
    assert_eq!(
        registry
            .add_invoice(Invoice::new(1, Some(third)), third.hash())
            .unwrap(),
        3
    );
    assert_eq!(
        registry.lookup_invoice(&hold.hash()).unwrap().invoice.settle_index,
        Some(2)
    );
}

#[tokio::test]
async fn test_backlog_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invoices.db");
    let (hodl_tx, _hodl_rx) = mpsc::channel(1);

    {
        let registry = open_registry(&path);
        for byte in 1..=2u8 {
            let preimage = Preimage([byte; 32]);
            registry
                .add_invoice(Invoice::new(1_000, Some(preimage)), preimage.hash())
                .unwrap();
        }
        registry
            .notify_exit_hop_htlc(&Preimage([2; 32]).hash(), 1_000, 3, 0, &hodl_tx)
            .unwrap();
    }

    let registry = open_registry(&path);
    let mut sub = registry.subscribe_notifications(1, 0).unwrap();

    let replayed = sub.new_invoices.recv().await.unwrap();
    assert_eq!(replayed.add_index, 2);
    assert!(sub.new_invoices.try_recv().is_err());

    let settled = sub.settled_invoices.recv().await.unwrap();
    assert_eq!(settled.payment_hash, Preimage([2; 32]).hash());
}

#[tokio::test]
async fn test_settle_with_nothing_parked_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invoices.db");
    let hold = Preimage([4; 32]);
    let hash = hold.hash();

    {
        let registry = open_registry(&path);
        let (hodl_tx, _hodl_rx) = mpsc::channel(1);
        registry.add_invoice(Invoice::new(25_000, None), hash).unwrap();
        assert_eq!(
            registry
                .notify_exit_hop_htlc(&hash, 25_000, 3, 0, &hodl_tx)
                .unwrap(),
            HtlcResolution::Accept
        );
    }

    let registry = open_registry(&path);
    let mut sub = registry.subscribe_notifications(1, 0).unwrap();
    assert_eq!(registry.parked_htlcs(), 0);

    registry.settle_hodl_invoice(hold).unwrap();
    assert_eq!(registry.parked_htlcs(), 0);

    let settled = sub.settled_invoices.recv().await.unwrap();
    assert_eq!(settled.payment_hash, hash);
    assert_eq!(settled.state, InvoiceState::Settled);
    assert_eq!(settled.payment_preimage, Some(hold));

    // The next matching attempt sees the settled invoice
    let (hodl_tx, mut hodl_rx) = mpsc::channel(1);
    assert_eq!(
        registry
            .notify_exit_hop_htlc(&hash, 25_000, 3, 0, &hodl_tx)
            .unwrap(),
        HtlcResolution::Settle(hold)
    );
    assert_eq!(
        registry
            .notify_exit_hop_htlc(&hash, 24_000, 3, 0, &hodl_tx)
            .unwrap(),
        HtlcResolution::Cancel
    );
    assert!(hodl_rx.try_recv().is_err());
}
