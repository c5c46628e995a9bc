//! Invoice entity and lifecycle
//!
//! State Machine:
//! ```text
//! [OPEN] ──htlc (known preimage)──→ [SETTLED]
//!   │
//!   ├── htlc (hold invoice) ──→ [ACCEPTED] ──settle_hodl──→ [SETTLED]
//!   │                               │
//!   └──────── cancel ───────────────┴──────── cancel ──────→ [CANCELED]
//! ```

use crate::error::{InvoiceError, InvoiceResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Milli-satoshi amount
pub type MilliSatoshi = u64;

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// SHA-256 digest identifying an invoice
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaymentHash(pub [u8; 32]);

impl fmt::Display for PaymentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PaymentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentHash({})", self)
    }
}

impl From<[u8; 32]> for PaymentHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Payment secret whose hash is the invoice's payment hash
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preimage(pub [u8; 32]);

impl Preimage {
    /// SHA-256 of the preimage
    pub fn hash(&self) -> PaymentHash {
        PaymentHash(Sha256::digest(self.0).into())
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Preimage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Preimage(..)")
    }
}

impl From<[u8; 32]> for Preimage {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Invoice lifecycle state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceState {
    /// Awaiting payment
    #[default]
    Open,
    /// Hold invoice with a payment locked in, waiting for the preimage
    Accepted,
    /// Paid; terminal
    Settled,
    /// Canceled; terminal, later payment attempts are answered with cancel
    Canceled,
}

impl InvoiceState {
    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(self, next: InvoiceState) -> bool {
        use InvoiceState::*;
        matches!(
            (self, next),
            (Open, Accepted) | (Open, Settled) | (Open, Canceled) | (Accepted, Settled)
                | (Accepted, Canceled)
        )
    }

    pub fn is_final(self) -> bool {
        matches!(self, InvoiceState::Settled | InvoiceState::Canceled)
    }
}

impl fmt::Display for InvoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvoiceState::Open => "Open",
            InvoiceState::Accepted => "Accepted",
            InvoiceState::Settled => "Settled",
            InvoiceState::Canceled => "Canceled",
        };
        f.write_str(name)
    }
}

/// An invoice record as persisted by the store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Set by the store when the invoice is added
    pub payment_hash: PaymentHash,
    /// `None` marks a hold invoice whose preimage is revealed later
    pub payment_preimage: Option<Preimage>,
    /// Requested amount, zero when unspecified
    pub value_msat: MilliSatoshi,
    pub state: InvoiceState,
    /// Recorded once, on the first transition out of Open that accepts a payment
    pub amt_paid_msat: MilliSatoshi,
    pub memo: String,
    /// Encoded payment request handed to the expiry decoder
    pub payment_request: String,
    pub creation_date: Timestamp,
    pub settle_date: Option<Timestamp>,
    /// Insertion sequence number, starts at 1
    pub add_index: u64,
    /// Settlement sequence number, assigned once on entering Settled
    pub settle_index: Option<u64>,
}

impl Invoice {
    /// Create an invoice record ready to be added.
    ///
    /// Pass `None` as the preimage for a hold invoice.
    pub fn new(value_msat: MilliSatoshi, payment_preimage: Option<Preimage>) -> Self {
        Self {
            payment_hash: PaymentHash::default(),
            payment_preimage,
            value_msat,
            state: InvoiceState::Open,
            amt_paid_msat: 0,
            memo: String::new(),
            payment_request: String::new(),
            creation_date: 0,
            settle_date: None,
            add_index: 0,
            settle_index: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn with_payment_request(mut self, payment_request: impl Into<String>) -> Self {
        self.payment_request = payment_request.into();
        self
    }

    pub fn is_hodl(&self) -> bool {
        self.payment_preimage.is_none()
    }

    /// Apply a state-machine decision to this record.
    ///
    /// Settle index assignment is left to the store, which owns the counter.
    pub fn apply_update(&mut self, update: &InvoiceUpdate) -> InvoiceResult<()> {
        if !self.state.can_transition_to(update.state) {
            return Err(InvoiceError::InvalidTransition {
                from: self.state,
                to: update.state,
            });
        }

        if let Some(amt_paid) = update.amt_paid_msat {
            if self.state != InvoiceState::Open {
                return Err(InvoiceError::PaidAmountImmutable { state: self.state });
            }
            self.amt_paid_msat = amt_paid;
        }

        if let Some(preimage) = update.preimage {
            self.payment_preimage = Some(preimage);
        }

        if update.state == InvoiceState::Settled {
            self.settle_date = update.settle_date;
        }

        self.state = update.state;
        Ok(())
    }
}

/// A transition decided by the state machine, applied atomically by the store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceUpdate {
    pub state: InvoiceState,
    pub amt_paid_msat: Option<MilliSatoshi>,
    pub preimage: Option<Preimage>,
    pub settle_date: Option<Timestamp>,
}

impl InvoiceUpdate {
    pub fn accept(amt_paid_msat: MilliSatoshi) -> Self {
        Self {
            state: InvoiceState::Accepted,
            amt_paid_msat: Some(amt_paid_msat),
            preimage: None,
            settle_date: None,
        }
    }

    pub fn settle(amt_paid_msat: Option<MilliSatoshi>, preimage: Option<Preimage>, now: Timestamp) -> Self {
        Self {
            state: InvoiceState::Settled,
            amt_paid_msat,
            preimage,
            settle_date: Some(now),
        }
    }

    pub fn cancel() -> Self {
        Self {
            state: InvoiceState::Canceled,
            amt_paid_msat: None,
            preimage: None,
            settle_date: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preimage() -> Preimage {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        Preimage(bytes)
    }

    #[test]
    fn test_preimage_hash_is_sha256() {
        // sha256 of 31 zero bytes followed by 0x01
        assert_eq!(
            preimage().hash().to_string(),
            "ec4916dd28fc4c10d78e287ca5d9cc51ee1ae73cbfde08c6b37324cbfaac8bc5"
        );
    }

    #[test]
    fn test_lifecycle_transitions() {
        use InvoiceState::*;
        assert!(Open.can_transition_to(Accepted));
        assert!(Open.can_transition_to(Settled));
        assert!(Open.can_transition_to(Canceled));
        assert!(Accepted.can_transition_to(Settled));
        assert!(Accepted.can_transition_to(Canceled));

        assert!(!Settled.can_transition_to(Canceled));
        assert!(!Settled.can_transition_to(Open));
        assert!(!Canceled.can_transition_to(Open));
        assert!(!Canceled.can_transition_to(Settled));
        assert!(!Accepted.can_transition_to(Open));
        assert!(!Accepted.can_transition_to(Accepted));
    }

    #[test]
    fn test_apply_accept_then_settle() {
        let mut invoice = Invoice::new(100_000, None);

        invoice.apply_update(&InvoiceUpdate::accept(100_500)).unwrap();
        assert_eq!(invoice.state, InvoiceState::Accepted);
        assert_eq!(invoice.amt_paid_msat, 100_500);

        invoice
            .apply_update(&InvoiceUpdate::settle(None, Some(preimage()), 42))
            .unwrap();
        assert_eq!(invoice.state, InvoiceState::Settled);
        assert_eq!(invoice.amt_paid_msat, 100_500);
        assert_eq!(invoice.payment_preimage, Some(preimage()));
        assert_eq!(invoice.settle_date, Some(42));
    }

    #[test]
    fn test_paid_amount_cannot_be_rewritten() {
        let mut invoice = Invoice::new(100_000, None);
        invoice.apply_update(&InvoiceUpdate::accept(100_500)).unwrap();

        let err = invoice
            .apply_update(&InvoiceUpdate::settle(Some(1), Some(preimage()), 42))
            .unwrap_err();
        assert_eq!(
            err,
            InvoiceError::PaidAmountImmutable {
                state: InvoiceState::Accepted
            }
        );
        assert_eq!(invoice.amt_paid_msat, 100_500);
        assert_eq!(invoice.state, InvoiceState::Accepted);
    }

    #[test]
    fn test_settled_rejects_cancel() {
        let mut invoice = Invoice::new(100_000, Some(preimage()));
        invoice
            .apply_update(&InvoiceUpdate::settle(Some(100_000), None, 1))
            .unwrap();

        let err = invoice.apply_update(&InvoiceUpdate::cancel()).unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(invoice.state, InvoiceState::Settled);
    }

    #[test]
    fn test_preimage_debug_is_redacted() {
        assert_eq!(format!("{:?}", preimage()), "Preimage(..)");
    }
}
