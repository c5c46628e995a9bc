//! Invoice Registry Service - Core business logic
//!
//! Every state-affecting operation runs its read-decide-write-notify sequence
//! under one registry mutex. Lookups skip it and read the store directly.

use crate::config::RegistryConfig;
use crate::domain::{
    decide_cancel, decide_htlc, decide_settle_hodl, ExpiryPolicy, HodlDelivery, HodlEvent,
    HodlSender, HodlTable, HtlcAttempt, HtlcDecision, HtlcResolution, Invoice, InvoiceState,
    InvoiceUpdate, MilliSatoshi, PaymentHash, Preimage,
};
use crate::error::{InvoiceError, InvoiceResult};
use crate::metrics;
use crate::notifications::{InvoiceSubscription, NotificationHub, SingleInvoiceSubscription};
use crate::ports::inbound::{InvoiceLookup, InvoiceRegistryApi};
use crate::ports::outbound::{ExpiryDecoder, InvoiceStore, SystemTimeSource, TimeSource};
use parking_lot::{Mutex, RwLock};
use quantum_telemetry::log_invoice_event;
use std::sync::Arc;
use tracing::{debug, info};

const SUBSYSTEM: &str = "18";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Running,
    Stopped,
}

/// State guarded by the registry mutex
struct RegistryState {
    hodl: HodlTable,
}

/// Invoice Registry implementation
pub struct InvoiceRegistry<S, D>
where
    S: InvoiceStore,
    D: ExpiryDecoder,
{
    config: RegistryConfig,
    policy: ExpiryPolicy,
    store: Arc<S>,
    decoder: Arc<D>,
    time_source: Arc<dyn TimeSource>,
    hub: NotificationHub,
    /// Only written with `state` held
    lifecycle: RwLock<Lifecycle>,
    state: Mutex<RegistryState>,
}

impl<S, D> InvoiceRegistry<S, D>
where
    S: InvoiceStore,
    D: ExpiryDecoder,
{
    /// Create a registry. Call `start()` before using it.
    pub fn new(config: RegistryConfig, store: Arc<S>, decoder: Arc<D>) -> Self {
        Self {
            policy: ExpiryPolicy::new(config.final_cltv_reject_delta),
            config,
            store,
            decoder,
            time_source: Arc::new(SystemTimeSource),
            hub: NotificationHub::new(),
            lifecycle: RwLock::new(Lifecycle::Created),
            state: Mutex::new(RegistryState {
                hodl: HodlTable::new(),
            }),
        }
    }

    /// Replace the clock used for creation and settle dates.
    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        *self.lifecycle.read() == Lifecycle::Running
    }

    /// Number of attempts currently parked on hold invoices
    pub fn parked_htlcs(&self) -> usize {
        self.state.lock().hodl.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    fn ensure_running(&self) -> InvoiceResult<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(InvoiceError::RegistryNotRunning)
        }
    }

    fn final_cltv_delta(&self, invoice: &Invoice) -> InvoiceResult<u32> {
        self.decoder
            .decode_final_cltv_expiry(&invoice.payment_request)
    }

    /// Fan a persisted transition out to subscribers.
    fn notify_transition(&self, invoice: &Invoice) {
        if invoice.state == InvoiceState::Settled {
            self.hub.notify_settled(invoice);
        }
        self.hub.notify_state(invoice);
    }

    /// Hand a hold invoice outcome to its parked attempt, if one is waiting.
    fn resolve_parked(&self, state: &mut RegistryState, event: HodlEvent) {
        let delivery = state.hodl.resolve(event);
        if delivery != HodlDelivery::NotParked {
            metrics::set_parked_htlcs(state.hodl.len());
        }
    }
}

impl<S, D> InvoiceRegistryApi for InvoiceRegistry<S, D>
where
    S: InvoiceStore,
    D: ExpiryDecoder,
{
    fn start(&self) -> InvoiceResult<()> {
        let _state = self.state.lock();
        let mut lifecycle = self.lifecycle.write();
        if *lifecycle != Lifecycle::Created {
            return Err(InvoiceError::RegistryAlreadyStarted);
        }
        *lifecycle = Lifecycle::Running;

        info!(
            final_cltv_reject_delta = self.config.final_cltv_reject_delta,
            "[qc-18] Invoice registry started"
        );
        Ok(())
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        let mut lifecycle = self.lifecycle.write();
        if *lifecycle == Lifecycle::Stopped {
            return;
        }
        *lifecycle = Lifecycle::Stopped;

        let parked = state.hodl.len();
        state.hodl.clear();
        self.hub.close();
        metrics::set_parked_htlcs(0);

        info!(parked_dropped = parked, "[qc-18] Invoice registry stopped");
    }

    fn add_invoice(&self, mut invoice: Invoice, payment_hash: PaymentHash) -> InvoiceResult<u64> {
        let _state = self.state.lock();
        self.ensure_running()?;

        if let Some(preimage) = invoice.payment_preimage {
            if preimage.hash() != payment_hash {
                return Err(InvoiceError::PreimageMismatch { payment_hash });
            }
        }

        invoice.state = InvoiceState::Open;
        invoice.amt_paid_msat = 0;
        invoice.settle_date = None;
        invoice.creation_date = self.time_source.now();

        let add_index = self.store.add_invoice(payment_hash, invoice.clone())?;
        invoice.payment_hash = payment_hash;
        invoice.add_index = add_index;
        invoice.settle_index = None;

        self.hub.notify_new(&invoice);
        self.hub.notify_state(&invoice);
        metrics::record_invoice_added();

        log_invoice_event!(
            info,
            SUBSYSTEM,
            "[qc-18] Invoice added",
            payment_hash,
            add_index,
            value_msat = invoice.value_msat,
            hodl = invoice.is_hodl()
        );
        Ok(add_index)
    }

    fn notify_exit_hop_htlc(
        &self,
        payment_hash: &PaymentHash,
        amount_msat: MilliSatoshi,
        expiry: u32,
        current_height: u32,
        hodl_sender: &HodlSender,
    ) -> InvoiceResult<HtlcResolution> {
        let mut state = self.state.lock();
        self.ensure_running()?;

        let attempt = HtlcAttempt {
            amount_msat,
            expiry,
            current_height,
        };
        let now = self.time_source.now();

        let mut decision: Option<HtlcDecision> = None;
        let invoice = self.store.update_invoice(
            payment_hash,
            &mut |current: &Invoice| -> InvoiceResult<Option<InvoiceUpdate>> {
                let decided = decide_htlc(current, &attempt, &self.policy, now, |invoice| {
                    self.final_cltv_delta(invoice)
                })?;
                let update = decided.update.clone();
                decision = Some(decided);
                Ok(update)
            },
        )?;
        let decision =
            decision.ok_or_else(|| InvoiceError::storage("store skipped the update callback"))?;

        if decision.resolution == HtlcResolution::Accept
            && state.hodl.park(*payment_hash, hodl_sender.clone())
        {
            metrics::set_parked_htlcs(state.hodl.len());
        }

        if decision.update.is_some() {
            self.notify_transition(&invoice);
        }
        metrics::record_htlc_resolution(decision.resolution.label());

        log_invoice_event!(
            debug,
            SUBSYSTEM,
            "[qc-18] Exit hop HTLC resolved",
            payment_hash,
            amount_msat,
            expiry,
            current_height,
            resolution = decision.resolution.label(),
            state = %invoice.state
        );
        Ok(decision.resolution)
    }

    fn settle_hodl_invoice(&self, preimage: Preimage) -> InvoiceResult<()> {
        let mut state = self.state.lock();
        self.ensure_running()?;

        let payment_hash = preimage.hash();
        let now = self.time_source.now();

        let invoice = self.store.update_invoice(
            &payment_hash,
            &mut |current: &Invoice| -> InvoiceResult<Option<InvoiceUpdate>> {
                decide_settle_hodl(current, preimage, now).map(Some)
            },
        )?;

        self.resolve_parked(&mut state, HodlEvent::settle(payment_hash, preimage));
        self.notify_transition(&invoice);
        metrics::record_hodl_event(true);

        log_invoice_event!(
            info,
            SUBSYSTEM,
            "[qc-18] Hold invoice settled",
            payment_hash,
            amt_paid_msat = invoice.amt_paid_msat,
            settle_index = invoice.settle_index.unwrap_or_default()
        );
        Ok(())
    }

    fn cancel_invoice(&self, payment_hash: &PaymentHash) -> InvoiceResult<()> {
        let mut state = self.state.lock();
        self.ensure_running()?;

        let mut changed = false;
        let invoice = self.store.update_invoice(
            payment_hash,
            &mut |current: &Invoice| -> InvoiceResult<Option<InvoiceUpdate>> {
                let update = decide_cancel(current)?;
                changed = update.is_some();
                Ok(update)
            },
        )?;

        if !changed {
            debug!(payment_hash = %payment_hash, "[qc-18] Invoice already canceled");
            return Ok(());
        }

        self.resolve_parked(&mut state, HodlEvent::cancel(*payment_hash));
        self.notify_transition(&invoice);
        if invoice.is_hodl() {
            metrics::record_hodl_event(false);
        }

        log_invoice_event!(info, SUBSYSTEM, "[qc-18] Invoice canceled", payment_hash);
        Ok(())
    }

    fn lookup_invoice(&self, payment_hash: &PaymentHash) -> InvoiceResult<InvoiceLookup> {
        self.ensure_running()?;

        let invoice = self.store.lookup_invoice(payment_hash)?;
        let final_cltv_delta = self.final_cltv_delta(&invoice)?;
        Ok(InvoiceLookup {
            invoice,
            final_cltv_delta,
        })
    }

    fn subscribe_notifications(
        &self,
        add_index: u64,
        settle_index: u64,
    ) -> InvoiceResult<InvoiceSubscription> {
        let _state = self.state.lock();
        self.ensure_running()?;

        let added = self.store.invoices_added_since(add_index)?;
        let settled = self.store.invoices_settled_since(settle_index)?;
        Ok(self
            .hub
            .subscribe_all(add_index, settle_index, added, settled))
    }

    fn subscribe_single_invoice(
        &self,
        payment_hash: PaymentHash,
    ) -> InvoiceResult<SingleInvoiceSubscription> {
        let _state = self.state.lock();
        self.ensure_running()?;

        let current = match self.store.lookup_invoice(&payment_hash) {
            Ok(invoice) => Some(invoice),
            Err(InvoiceError::InvoiceNotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        Ok(self.hub.subscribe_single(payment_hash, current))
    }
}
