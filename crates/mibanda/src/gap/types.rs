use crate::error::BandError;
use crate::gap::constants::*;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressType {
    #[default]
    Public,
    Random,
}

impl From<u8> for AddressType {
    fn from(value: u8) -> Self {
        match value {
            RANDOM_DEVICE_ADDRESS => AddressType::Random,
            _ => AddressType::Public,
        }
    }
}

impl From<AddressType> for u8 {
    fn from(value: AddressType) -> Self {
        match value {
            AddressType::Public => PUBLIC_DEVICE_ADDRESS,
            AddressType::Random => RANDOM_DEVICE_ADDRESS,
        }
    }
}

/// A Bluetooth device address.
///
/// Bytes are stored in over-the-air (little-endian) order, so `bytes[0]` is the
/// last octet of the usual `XX:XX:XX:XX:XX:XX` text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BdAddr {
    pub bytes: [u8; 6],
}

impl BdAddr {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() >= 6 {
            let mut bytes = [0u8; 6];
            bytes.copy_from_slice(&slice[0..6]);
            Some(Self { bytes })
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// The lowest-order octet, i.e. the last two hex digits of the text form.
    ///
    /// The band mixes this into the user-profile checksum.
    pub fn low_byte(&self) -> u8 {
        self.bytes[0]
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.bytes[5],
            self.bytes[4],
            self.bytes[3],
            self.bytes[2],
            self.bytes[1],
            self.bytes[0]
        )
    }
}

impl FromStr for BdAddr {
    type Err = BandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BandError::InvalidArgument(format!("invalid device address '{s}'"));

        let octets: Vec<&str> = s.split(':').collect();
        if octets.len() != 6 {
            return Err(invalid());
        }

        let mut bytes = [0u8; 6];
        for (i, octet) in octets.iter().enumerate() {
            if octet.len() != 2 || !octet.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            // Reverse order for little endian
            bytes[5 - i] = u8::from_str_radix(octet, 16).map_err(|_| invalid())?;
        }

        Ok(Self { bytes })
    }
}
