//! Expiry decoders

use crate::error::InvoiceResult;
use crate::ports::outbound::ExpiryDecoder;

/// Answers the same final CLTV delta for every payment request.
///
/// For nodes whose invoices all carry the default delta, and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticExpiryDecoder(pub u32);

impl ExpiryDecoder for StaticExpiryDecoder {
    fn decode_final_cltv_expiry(&self, _payment_request: &str) -> InvoiceResult<u32> {
        Ok(self.0)
    }
}
