//! Exit-hop HTLC resolution rules
//!
//! Every decision here is a pure function of the persisted invoice and the
//! request. A payment replayed after a restart therefore resolves exactly as
//! it did the first time, without tracking seen HTLCs anywhere.

use super::expiry::{ExpiryCheck, ExpiryPolicy};
use super::invoice::{
    Invoice, InvoiceState, InvoiceUpdate, MilliSatoshi, PaymentHash, Preimage, Timestamp,
};
use crate::error::{InvoiceError, InvoiceResult};

/// An inbound payment attempt paying one of our invoices
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HtlcAttempt {
    pub amount_msat: MilliSatoshi,
    /// Expiry height claimed by the HTLC
    pub expiry: u32,
    pub current_height: u32,
}

/// How the registry answers an attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HtlcResolution {
    /// Settle the HTLC with this preimage
    Settle(Preimage),
    /// Fail the HTLC back
    Cancel,
    /// Hold the HTLC; a later `HodlEvent` on the attempt's channel resolves it
    Accept,
}

impl HtlcResolution {
    pub fn preimage(&self) -> Option<Preimage> {
        match self {
            HtlcResolution::Settle(preimage) => Some(*preimage),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HtlcResolution::Settle(_) => "settle",
            HtlcResolution::Cancel => "cancel",
            HtlcResolution::Accept => "accept",
        }
    }
}

/// Delivered exactly once on a parked attempt's channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HodlEvent {
    pub payment_hash: PaymentHash,
    /// `Some` settles the held HTLC, `None` cancels it
    pub preimage: Option<Preimage>,
}

impl HodlEvent {
    pub fn settle(payment_hash: PaymentHash, preimage: Preimage) -> Self {
        Self {
            payment_hash,
            preimage: Some(preimage),
        }
    }

    pub fn cancel(payment_hash: PaymentHash) -> Self {
        Self {
            payment_hash,
            preimage: None,
        }
    }

    pub fn is_settle(&self) -> bool {
        self.preimage.is_some()
    }
}

/// State machine output for one attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtlcDecision {
    pub resolution: HtlcResolution,
    /// Transition to persist, if any
    pub update: Option<InvoiceUpdate>,
}

impl HtlcDecision {
    fn unchanged(resolution: HtlcResolution) -> Self {
        Self {
            resolution,
            update: None,
        }
    }
}

/// Resolve an exit-hop HTLC against the current invoice.
///
/// `invoice_delta` decodes the invoice's final CLTV delta and is only called
/// for Open invoices.
pub fn decide_htlc<F>(
    invoice: &Invoice,
    attempt: &HtlcAttempt,
    policy: &ExpiryPolicy,
    now: Timestamp,
    invoice_delta: F,
) -> InvoiceResult<HtlcDecision>
where
    F: FnOnce(&Invoice) -> InvoiceResult<u32>,
{
    match invoice.state {
        InvoiceState::Canceled => Ok(HtlcDecision::unchanged(HtlcResolution::Cancel)),

        // Replays must reproduce the original outcome; anything paying a
        // different amount is a new HTLC and is rejected.
        InvoiceState::Settled => {
            let resolution = match invoice.payment_preimage {
                Some(preimage) if attempt.amount_msat == invoice.amt_paid_msat => {
                    HtlcResolution::Settle(preimage)
                }
                _ => HtlcResolution::Cancel,
            };
            Ok(HtlcDecision::unchanged(resolution))
        }

        InvoiceState::Accepted => {
            let resolution = if attempt.amount_msat == invoice.amt_paid_msat {
                HtlcResolution::Accept
            } else {
                HtlcResolution::Cancel
            };
            Ok(HtlcDecision::unchanged(resolution))
        }

        InvoiceState::Open => {
            let delta = invoice_delta(invoice)?;
            if let ExpiryCheck::TooSoon { .. } =
                policy.check(attempt.expiry, attempt.current_height, delta)
            {
                return Ok(HtlcDecision::unchanged(HtlcResolution::Cancel));
            }

            match invoice.payment_preimage {
                Some(preimage) => Ok(HtlcDecision {
                    resolution: HtlcResolution::Settle(preimage),
                    update: Some(InvoiceUpdate::settle(Some(attempt.amount_msat), None, now)),
                }),
                None => Ok(HtlcDecision {
                    resolution: HtlcResolution::Accept,
                    update: Some(InvoiceUpdate::accept(attempt.amount_msat)),
                }),
            }
        }
    }
}

/// Reveal the preimage of an accepted hold invoice.
pub fn decide_settle_hodl(
    invoice: &Invoice,
    preimage: Preimage,
    now: Timestamp,
) -> InvoiceResult<InvoiceUpdate> {
    match invoice.state {
        InvoiceState::Accepted => Ok(InvoiceUpdate::settle(None, Some(preimage), now)),
        InvoiceState::Settled => Err(InvoiceError::InvoiceAlreadySettled),
        InvoiceState::Canceled => Err(InvoiceError::InvoiceAlreadyCanceled),
        InvoiceState::Open => Err(InvoiceError::InvoiceStillOpen),
    }
}

/// Cancel an invoice. `Ok(None)` means it was already canceled.
pub fn decide_cancel(invoice: &Invoice) -> InvoiceResult<Option<InvoiceUpdate>> {
    match invoice.state {
        InvoiceState::Canceled => Ok(None),
        InvoiceState::Settled => Err(InvoiceError::InvoiceAlreadySettled),
        InvoiceState::Open | InvoiceState::Accepted => Ok(Some(InvoiceUpdate::cancel())),
    }
}
