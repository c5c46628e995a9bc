//! Hodl resolution table
//!
//! Holds the delivery channel of the attempt parked on each accepted hold
//! invoice. One slot per payment hash; an entry is forgotten as soon as its
//! single event has been handed to the channel.

use super::htlc::HodlEvent;
use super::invoice::PaymentHash;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Caller-owned channel a parked attempt waits on
pub type HodlSender = mpsc::Sender<HodlEvent>;

/// Outcome of delivering a resolution to a parked attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HodlDelivery {
    /// Event queued on the attempt's channel
    Delivered,
    /// Nothing parked for this hash
    NotParked,
    /// Parked channel was full or closed; the event was dropped
    Dropped,
}

#[derive(Debug, Default)]
pub struct HodlTable {
    parked: HashMap<PaymentHash, HodlSender>,
}

impl HodlTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park an attempt. Returns false and keeps the existing entry if a live
    /// attempt is already parked for `payment_hash`. An entry whose receiver
    /// is gone is replaced.
    pub fn park(&mut self, payment_hash: PaymentHash, sender: HodlSender) -> bool {
        if let Some(existing) = self.parked.get(&payment_hash) {
            if !existing.is_closed() {
                return false;
            }
            debug!(
                payment_hash = %payment_hash,
                "[qc-18] Replacing parked attempt with closed channel"
            );
        }
        self.parked.insert(payment_hash, sender);
        true
    }

    /// Deliver `event` to the attempt parked on its hash and forget it.
    ///
    /// Never blocks: the channel is expected to have a free slot.
    pub fn resolve(&mut self, event: HodlEvent) -> HodlDelivery {
        let Some(sender) = self.parked.remove(&event.payment_hash) else {
            return HodlDelivery::NotParked;
        };

        match sender.try_send(event) {
            Ok(()) => {
                debug!(
                    payment_hash = %event.payment_hash,
                    settle = event.is_settle(),
                    "[qc-18] Hodl event delivered"
                );
                HodlDelivery::Delivered
            }
            Err(e) => {
                warn!(
                    payment_hash = %event.payment_hash,
                    error = %e,
                    "[qc-18] Hodl event dropped, parked channel unavailable"
                );
                HodlDelivery::Dropped
            }
        }
    }

    pub fn is_parked(&self, payment_hash: &PaymentHash) -> bool {
        self.parked.contains_key(payment_hash)
    }

    pub fn len(&self) -> usize {
        self.parked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parked.is_empty()
    }

    /// Forget every parked attempt without delivering anything.
    pub fn clear(&mut self) {
        self.parked.clear();
    }
}
