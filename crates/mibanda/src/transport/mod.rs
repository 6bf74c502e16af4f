//! GATT transport boundary
//!
//! The band session only needs three blocking operations from the link: read
//! by UUID, read by handle and write by handle. [`GattTransport`] captures that
//! seam; [`AttSocket`] implements it over a Linux L2CAP socket.

pub mod socket;

pub use socket::AttSocket;

use crate::error::TransportError;
use crate::gap::AddressType;
use crate::uuid::Uuid;
use std::time::Duration;

/// Seconds to wait for any single ATT response
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Link security requested when connecting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// Configuration for opening a session with a band
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HCI adapter index (0 for hci0)
    pub adapter: u16,
    /// Address type of the remote band
    pub address_type: AddressType,
    /// Link security level
    pub security: SecurityLevel,
    /// Timeout for every request/response round-trip
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            adapter: 0,
            address_type: AddressType::Public,
            security: SecurityLevel::Low,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Blocking GATT client operations, one outstanding request at a time
pub trait GattTransport {
    /// Read every attribute value whose type matches `uuid`
    fn read_by_uuid(&mut self, uuid: &Uuid) -> Result<Vec<Vec<u8>>, TransportError>;

    /// Read the value of a single attribute
    fn read_by_handle(&mut self, handle: u16) -> Result<Vec<u8>, TransportError>;

    /// Write a value and wait for the server to acknowledge it
    fn write_by_handle(&mut self, handle: u16, value: &[u8]) -> Result<(), TransportError>;
}

impl<T: GattTransport + ?Sized> GattTransport for Box<T> {
    fn read_by_uuid(&mut self, uuid: &Uuid) -> Result<Vec<Vec<u8>>, TransportError> {
        (**self).read_by_uuid(uuid)
    }

    fn read_by_handle(&mut self, handle: u16) -> Result<Vec<u8>, TransportError> {
        (**self).read_by_handle(handle)
    }

    fn write_by_handle(&mut self, handle: u16, value: &[u8]) -> Result<(), TransportError> {
        (**self).write_by_handle(handle, value)
    }
}
