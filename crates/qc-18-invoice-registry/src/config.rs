//! Registry configuration

use serde::Deserialize;
use std::env;

/// Default extra blocks an exit-hop HTLC must leave before expiry
pub const DEFAULT_FINAL_CLTV_REJECT_DELTA: u32 = 3;

/// Invoice registry configuration
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Minimum blocks between the current height and an HTLC's expiry
    /// before it is accepted, regardless of the invoice's own delta
    pub final_cltv_reject_delta: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            final_cltv_reject_delta: DEFAULT_FINAL_CLTV_REJECT_DELTA,
        }
    }
}

impl RegistryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QC_INVOICE_FINAL_CLTV_REJECT_DELTA`: reject delta (default: 3)
    pub fn from_env() -> Self {
        Self {
            final_cltv_reject_delta: env::var("QC_INVOICE_FINAL_CLTV_REJECT_DELTA")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_FINAL_CLTV_REJECT_DELTA),
        }
    }
}
