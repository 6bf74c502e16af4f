//! Attribute value codecs
//!
//! Pure conversions between the band's fixed-layout attribute values and typed
//! records, plus the payload builders for every write the band accepts. Nothing
//! here performs I/O.

use crate::error::{BandError, BandResult};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// Length of the battery attribute value
pub const BATTERY_INFO_LEN: usize = 10;
/// Length of the LE parameters attribute value
pub const LE_PARAMS_LEN: usize = 12;
/// Length of the user info attribute value
pub const USER_PROFILE_LEN: usize = 20;
/// Length of the alias carried in the user info value
pub const ALIAS_LEN: usize = 10;

/// Polynomial of the reflected CRC-8 shared with the band firmware
const CRC8_POLY: u8 = 0x8c;

// Control point commands
const CMD_FLASH_LEDS: u8 = 0x0e;
const CMD_LOCATE: u8 = 0x08;
const CMD_TRIGGER: u8 = 0x02;

/// Allowed range for each LED colour level
pub const LED_LEVELS: std::ops::RangeInclusive<u8> = 1..=6;

/// Charging state reported in the battery value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryStatus {
    Low,
    Medium,
    Full,
    NotCharging,
    Unknown,
}

impl From<u8> for BatteryStatus {
    fn from(value: u8) -> Self {
        match value {
            1 => BatteryStatus::Low,
            2 => BatteryStatus::Medium,
            3 => BatteryStatus::Full,
            4 => BatteryStatus::NotCharging,
            _ => BatteryStatus::Unknown,
        }
    }
}

impl fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatteryStatus::Low => "low",
            BatteryStatus::Medium => "medium",
            BatteryStatus::Full => "full",
            BatteryStatus::NotCharging => "not charging",
            BatteryStatus::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Calendar timestamp as stored by the band.
///
/// Fields are taken as-is from the device; no calendar validation is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub year: u16,
    /// 1-based month
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Battery information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryInfo {
    /// Charge level in percent
    pub level: u8,
    pub last_charged: Timestamp,
    pub charge_counter: u16,
    pub status: BatteryStatus,
}

/// Connection parameters the band is running with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeParams {
    pub minimum_connection_interval: u16,
    pub maximum_connection_interval: u16,
    pub latency: u16,
    pub timeout: u16,
    pub connection_interval: u16,
    pub advertisement_interval: u16,
}

/// Device information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Dotted four-part firmware version
    pub firmware_version: String,
}

/// User profile written to the band during setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub uid: u32,
    /// `true` for male
    pub gender: bool,
    pub age: u8,
    /// Height in cm
    pub height: u8,
    /// Weight in kg
    pub weight: u8,
    pub kind: u8,
    alias: [u8; ALIAS_LEN],
}

impl UserProfile {
    /// Build a profile, rejecting an alias that is not exactly ten bytes.
    pub fn new(
        uid: u32,
        gender: bool,
        age: u8,
        height: u8,
        weight: u8,
        kind: u8,
        alias: &[u8],
    ) -> BandResult<Self> {
        let alias: [u8; ALIAS_LEN] = alias.try_into().map_err(|_| {
            BandError::InvalidProfile(format!(
                "alias must be exactly {ALIAS_LEN} bytes, got {}",
                alias.len()
            ))
        })?;

        Ok(Self {
            uid,
            gender,
            age,
            height,
            weight,
            kind,
            alias,
        })
    }

    pub fn alias(&self) -> &[u8; ALIAS_LEN] {
        &self.alias
    }
}

fn expect_len(attribute: &'static str, raw: &[u8], len: usize) -> BandResult<()> {
    if raw.len() != len {
        return Err(BandError::malformed(
            attribute,
            format!("expected {len} bytes, got {}", raw.len()),
        ));
    }
    Ok(())
}

/// Decode the 10-byte battery value.
pub fn decode_battery(raw: &[u8]) -> BandResult<BatteryInfo> {
    expect_len("battery", raw, BATTERY_INFO_LEN)?;

    let last_charged = Timestamp {
        year: raw[1] as u16 + 2000,
        month: raw[2].wrapping_add(1),
        day: raw[3],
        hour: raw[4],
        minute: raw[5],
        second: raw[6],
    };

    Ok(BatteryInfo {
        level: raw[0],
        last_charged,
        charge_counter: LittleEndian::read_u16(&raw[7..9]),
        status: raw[9].into(),
    })
}

/// Decode the 12-byte LE parameters value.
pub fn decode_le_params(raw: &[u8]) -> BandResult<LeParams> {
    expect_len("LE params", raw, LE_PARAMS_LEN)?;

    let mut fields = [0u16; 6];
    LittleEndian::read_u16_into(raw, &mut fields);

    Ok(LeParams {
        minimum_connection_interval: fields[0],
        maximum_connection_interval: fields[1],
        latency: fields[2],
        timeout: fields[3],
        connection_interval: fields[4],
        advertisement_interval: fields[5],
    })
}

/// Decode the device info value; the firmware version is its last four bytes,
/// most significant part last.
pub fn decode_device_info(raw: &[u8]) -> BandResult<DeviceInfo> {
    if raw.len() < 4 {
        return Err(BandError::malformed(
            "device info",
            format!("expected at least 4 bytes, got {}", raw.len()),
        ));
    }

    let v = &raw[raw.len() - 4..];
    Ok(DeviceInfo {
        firmware_version: format!("{}.{}.{}.{}", v[3], v[2], v[1], v[0]),
    })
}

/// Decode the step counter from the first two bytes of the value.
pub fn decode_steps(raw: &[u8]) -> BandResult<u16> {
    if raw.len() < 2 {
        return Err(BandError::malformed(
            "steps",
            format!("expected at least 2 bytes, got {}", raw.len()),
        ));
    }
    Ok(LittleEndian::read_u16(&raw[..2]))
}

/// Decode the device name value.
pub fn decode_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches('\0')
        .to_string()
}

/// Bit-reversed CRC-8 (polynomial 0x8c, initial value 0).
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x01 != 0 {
                crc = (crc >> 1) ^ CRC8_POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Build the 20-byte user info payload.
///
/// The final byte authenticates the payload for one band: it is the CRC of the
/// first 19 bytes XOR the low octet of that band's address.
pub fn encode_user_profile(profile: &UserProfile, address_low_byte: u8) -> [u8; USER_PROFILE_LEN] {
    let mut seq = [0u8; USER_PROFILE_LEN];

    LittleEndian::write_u32(&mut seq[0..4], profile.uid);
    seq[4] = profile.gender as u8;
    seq[5] = profile.age;
    seq[6] = profile.height;
    seq[7] = profile.weight;
    seq[8] = profile.kind;
    seq[9..19].copy_from_slice(&profile.alias);
    seq[19] = crc8(&seq[..19]) ^ address_low_byte;

    seq
}

/// Decode a user info payload, ignoring its checksum byte.
pub fn decode_user_profile(raw: &[u8]) -> BandResult<UserProfile> {
    expect_len("user info", raw, USER_PROFILE_LEN)?;

    UserProfile::new(
        LittleEndian::read_u32(&raw[0..4]),
        raw[4] != 0,
        raw[5],
        raw[6],
        raw[7],
        raw[8],
        &raw[9..19],
    )
}

/// Check the checksum byte of a user info payload against a band address.
pub fn verify_user_profile(raw: &[u8], address_low_byte: u8) -> bool {
    raw.len() == USER_PROFILE_LEN && crc8(&raw[..19]) ^ address_low_byte == raw[19]
}

/// Payload written to the test handle to start the self test.
pub fn encode_self_test() -> [u8; 1] {
    [CMD_TRIGGER]
}

/// Payload written to the pair handle to trigger pairing.
pub fn encode_pair() -> [u8; 1] {
    [CMD_TRIGGER]
}

/// Control point payload that flashes the LEDs; each level must be in 1..=6.
pub fn encode_flash_leds(r: u8, g: u8, b: u8) -> BandResult<[u8; 5]> {
    for (colour, level) in [("red", r), ("green", g), ("blue", b)] {
        if !LED_LEVELS.contains(&level) {
            return Err(BandError::InvalidArgument(format!(
                "{colour} level {level} outside {}..={}",
                LED_LEVELS.start(),
                LED_LEVELS.end()
            )));
        }
    }
    Ok([CMD_FLASH_LEDS, r, g, b, 0x01])
}

/// Control point payload that makes the band vibrate.
pub fn encode_locate() -> [u8; 2] {
    [CMD_LOCATE, 0x00]
}
