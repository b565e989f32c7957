//!
//! Utility module for wallet session sync.
//!
//! Re-exports formatting and parsing helpers used by the adapters and the binary.
/// Utility functions for amounts and quantities
pub mod index;

pub use index::{format_token_amount, parse_hex_quantity};
