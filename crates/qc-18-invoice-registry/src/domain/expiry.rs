//! Final-hop expiry policy
//!
//! An exit-hop HTLC must leave enough blocks between the current height and
//! its expiry for us to claim it on-chain. Two margins apply: the registry-wide
//! reject delta and the delta requested by the invoice itself.

use serde::{Deserialize, Serialize};

/// Outcome of the expiry check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpiryCheck {
    Sufficient,
    /// HTLC expires before `required` height
    TooSoon { required: u64 },
}

/// Registry-wide expiry margin
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryPolicy {
    /// Minimum blocks between current height and HTLC expiry
    pub final_cltv_reject_delta: u32,
}

impl ExpiryPolicy {
    pub fn new(final_cltv_reject_delta: u32) -> Self {
        Self {
            final_cltv_reject_delta,
        }
    }

    /// Check `htlc_expiry` against both margins.
    ///
    /// `invoice_delta` is the final CLTV delta decoded from the invoice.
    pub fn check(&self, htlc_expiry: u32, current_height: u32, invoice_delta: u32) -> ExpiryCheck {
        let delta = self.final_cltv_reject_delta.max(invoice_delta);
        let required = u64::from(current_height) + u64::from(delta);

        if u64::from(htlc_expiry) < required {
            ExpiryCheck::TooSoon { required }
        } else {
            ExpiryCheck::Sufficient
        }
    }
}
