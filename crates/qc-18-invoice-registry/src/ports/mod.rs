//! Ports layer for the Invoice Registry subsystem.
//!
//! Defines the hexagonal architecture port traits:
//! - Inbound (Driving) ports: API exposed to the link layer and RPC
//! - Outbound (Driven) ports: Storage, expiry decoding, time

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
