//! Error types for the Invoice Registry subsystem
//!
//! One error enum is shared by the domain, the ports and the service so that a
//! store adapter can abort an update with the same error the state machine
//! produced.

use crate::domain::{InvoiceState, PaymentHash};
use thiserror::Error;

/// Invoice registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceError {
    /// No invoice is registered under this payment hash
    #[error("Invoice not found: {payment_hash}")]
    InvoiceNotFound { payment_hash: PaymentHash },

    /// No invoice was added with this add index
    #[error("No invoice with add index {add_index}")]
    AddIndexNotFound { add_index: u64 },

    /// An invoice with this payment hash already exists
    #[error("Invoice already exists: {payment_hash}")]
    InvoiceAlreadyExists { payment_hash: PaymentHash },

    /// Invoice is settled; settlement is irrevocable
    #[error("Invoice already settled")]
    InvoiceAlreadySettled,

    /// Invoice is canceled
    #[error("Invoice already canceled")]
    InvoiceAlreadyCanceled,

    /// Invoice has not accepted a payment yet
    #[error("Invoice still open")]
    InvoiceStillOpen,

    /// Lifecycle does not allow this transition
    #[error("Invalid invoice transition: cannot go from {from} to {to}")]
    InvalidTransition { from: InvoiceState, to: InvoiceState },

    /// Paid amount was recorded earlier and cannot be rewritten
    #[error("Paid amount already recorded for invoice in state {state}")]
    PaidAmountImmutable { state: InvoiceState },

    /// Known preimage does not hash to the payment hash it was added under
    #[error("Preimage does not match payment hash {payment_hash}")]
    PreimageMismatch { payment_hash: PaymentHash },

    /// Final-hop expiry could not be decoded from the payment request
    #[error("Failed to decode final CLTV expiry: {reason}")]
    ExpiryDecode { reason: String },

    /// Store failure; the operation was not applied
    #[error("Storage error: {reason}")]
    Storage { reason: String },

    /// Registry was not started, or was stopped
    #[error("Invoice registry is not running")]
    RegistryNotRunning,

    /// `start()` was called more than once
    #[error("Invoice registry already started")]
    RegistryAlreadyStarted,
}

impl InvoiceError {
    /// True for errors that reject an operation because of the invoice's
    /// current lifecycle state rather than because it is missing.
    pub fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            Self::InvoiceAlreadySettled
                | Self::InvoiceAlreadyCanceled
                | Self::InvoiceStillOpen
                | Self::InvalidTransition { .. }
                | Self::PaidAmountImmutable { .. }
        )
    }

    pub(crate) fn storage(reason: impl std::fmt::Display) -> Self {
        Self::Storage {
            reason: reason.to_string(),
        }
    }
}

/// Result type for invoice registry operations
pub type InvoiceResult<T> = Result<T, InvoiceError>;
