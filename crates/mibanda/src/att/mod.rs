//! Attribute Protocol (ATT) definitions
//!
//! This module holds the subset of the ATT protocol the band client speaks:
//! opcodes, error codes, and the request/response PDUs used for reading and
//! writing characteristic values.

pub mod constants;
pub mod error;
pub mod types;


pub use self::constants::*;
pub use self::error::AttErrorCode;
pub use self::types::*;
