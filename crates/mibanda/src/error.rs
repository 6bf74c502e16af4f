//! Error types for the mibanda library
//!
//! This module defines the error types used throughout the library. Each layer
//! has its own enum: raw HCI sockets, the GATT transport, and the band API on
//! top of them.

use crate::att::AttErrorCode;
use thiserror::Error;

/// Errors that can occur when working with HCI sockets
#[derive(Error, Debug)]
pub enum HciError {
    #[error("Failed to open HCI socket: {0}")]
    SocketError(#[from] std::io::Error),

    #[error("Failed to bind to HCI device: {0}")]
    BindError(std::io::Error),

    #[error("Failed to set HCI socket filter: {0}")]
    FilterError(std::io::Error),

    #[error("Failed to send HCI command: {0}")]
    SendError(std::io::Error),

    #[error("Failed to receive HCI event: {0}")]
    ReceiveError(std::io::Error),

    #[error("Timed out waiting for HCI event")]
    Timeout,

    #[error("Invalid HCI packet format")]
    InvalidPacketFormat,
}

/// Errors raised by a GATT transport round-trip.
///
/// These are surfaced to the caller verbatim; nothing in the library retries.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open L2CAP socket: {0}")]
    Socket(std::io::Error),

    #[error("Failed to bind L2CAP socket: {0}")]
    Bind(std::io::Error),

    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    #[error("Failed to send ATT PDU: {0}")]
    Send(std::io::Error),

    #[error("Failed to receive ATT PDU: {0}")]
    Receive(std::io::Error),

    #[error("Timed out waiting for ATT response")]
    Timeout,

    #[error("Connection closed by remote device")]
    Disconnected,

    #[error("ATT error: {code:?} on handle 0x{handle:04x}")]
    Att { code: AttErrorCode, handle: u16 },

    #[error("Unexpected ATT response opcode 0x{0:02x}")]
    UnexpectedResponse(u8),

    #[error("Invalid ATT PDU")]
    InvalidPdu,

    #[error("Read by UUID {0} returned no value")]
    EmptyRead(String),
}

/// Errors returned by the band API (codec, registry and session).
#[derive(Error, Debug)]
pub enum BandError {
    #[error("Malformed {attribute} value: {reason}")]
    MalformedAttribute {
        attribute: &'static str,
        reason: String,
    },

    #[error("Invalid user profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl BandError {
    pub(crate) fn malformed(attribute: &'static str, reason: impl Into<String>) -> Self {
        BandError::MalformedAttribute {
            attribute,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while reading a btsnoop capture
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to read capture: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a btsnoop capture")]
    BadMagic,

    #[error("Unsupported btsnoop version {0}")]
    UnsupportedVersion(u32),

    #[error("Unsupported btsnoop datalink type {0}")]
    UnsupportedDatalink(u32),

    #[error("Truncated btsnoop record")]
    Truncated,
}

/// Result type for band operations
pub type BandResult<T> = Result<T, BandError>;
