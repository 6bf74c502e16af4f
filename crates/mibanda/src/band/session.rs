//! Band session
//!
//! A [`BandSession`] owns one transport to one band. Every call is a blocking
//! round-trip; failures are returned as-is and nothing is retried.

use super::codec::{self, BatteryInfo, DeviceInfo, LeParams, UserProfile};
use super::registry::{self, HandleRegistry};
use crate::error::{BandResult, TransportError};
use crate::gap::BdAddr;
use crate::transport::{AttSocket, GattTransport, SessionConfig};
use log::debug;

/// A connected band
#[derive(Debug)]
pub struct BandSession<T: GattTransport> {
    transport: T,
    address: BdAddr,
    name: String,
    registry: HandleRegistry,
}

impl BandSession<AttSocket> {
    /// Connect to a band over an L2CAP ATT socket
    pub fn connect(address: BdAddr, name: &str, config: &SessionConfig) -> BandResult<Self> {
        let socket = AttSocket::connect(address, config)?;
        Ok(Self::new(socket, address, name))
    }

    /// Connect to a band returned by [`crate::discovery::discover`]
    pub fn from_discovery(
        (address, name): (BdAddr, String),
        config: &SessionConfig,
    ) -> BandResult<Self> {
        Self::connect(address, &name, config)
    }
}

impl<T: GattTransport> BandSession<T> {
    /// Wrap an already connected transport
    pub fn new(transport: T, address: BdAddr, name: &str) -> Self {
        Self {
            transport,
            address,
            name: name.to_string(),
            registry: HandleRegistry::default(),
        }
    }

    /// Use a different attribute table
    pub fn with_registry(mut self, registry: HandleRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn address(&self) -> BdAddr {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Give back the transport, closing the session
    pub fn into_transport(self) -> T {
        self.transport
    }

    // Read by UUID and keep the first value
    fn read_first(&mut self, attribute: &str) -> BandResult<Vec<u8>> {
        let uuid = self.registry.resolve_uuid(attribute)?;
        debug!("Reading {} ({}) from {}", attribute, uuid, self.address);

        let values = self.transport.read_by_uuid(&uuid)?;
        values
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::EmptyRead(uuid.to_string()).into())
    }

    fn write(&mut self, attribute: &str, value: &[u8]) -> BandResult<()> {
        let handle = self.registry.resolve_handle(attribute)?;
        debug!(
            "Writing {} (0x{:04x}) to {}: {}",
            attribute,
            handle,
            self.address,
            hex::encode(value)
        );
        self.transport.write_by_handle(handle, value)?;
        Ok(())
    }

    pub fn read_battery(&mut self) -> BandResult<BatteryInfo> {
        let raw = self.read_first(registry::BATTERY)?;
        codec::decode_battery(&raw)
    }

    pub fn read_device_info(&mut self) -> BandResult<DeviceInfo> {
        let raw = self.read_first(registry::DEVICE_INFO)?;
        codec::decode_device_info(&raw)
    }

    pub fn read_steps(&mut self) -> BandResult<u16> {
        let raw = self.read_first(registry::REALTIME_STEPS)?;
        codec::decode_steps(&raw)
    }

    pub fn read_le_params(&mut self) -> BandResult<LeParams> {
        let raw = self.read_first(registry::LE_PARAMS)?;
        codec::decode_le_params(&raw)
    }

    /// Device name; with `cached` set the name known at connect time is
    /// returned without touching the transport.
    pub fn read_name(&mut self, cached: bool) -> BandResult<String> {
        if !cached || self.name.is_empty() {
            let raw = self.read_first(registry::DEVICE_NAME)?;
            self.name = codec::decode_name(&raw);
        }
        Ok(self.name.clone())
    }

    /// Write the user profile, keyed to this band's address
    pub fn write_user_profile(&mut self, profile: &UserProfile) -> BandResult<()> {
        let payload = codec::encode_user_profile(profile, self.address.low_byte());
        self.write(registry::USER_INFO, &payload)
    }

    pub fn self_test(&mut self) -> BandResult<()> {
        self.write(registry::TEST, &codec::encode_self_test())
    }

    pub fn pair(&mut self) -> BandResult<()> {
        self.write(registry::PAIR, &codec::encode_pair())
    }

    /// Flash the LEDs; each level must be within 1..=6
    pub fn flash_leds(&mut self, r: u8, g: u8, b: u8) -> BandResult<()> {
        let payload = codec::encode_flash_leds(r, g, b)?;
        self.write(registry::CONTROL_POINT, &payload)
    }

    /// Make the band vibrate
    pub fn locate(&mut self) -> BandResult<()> {
        self.write(registry::CONTROL_POINT, &codec::encode_locate())
    }
}
