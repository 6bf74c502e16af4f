//! Attribute handle registry
//!
//! A fixed table mapping the band's symbolic attribute names to their 16-bit
//! handles and, where the attribute is read by type, their UUIDs.

use crate::error::{BandError, BandResult};
use crate::uuid::Uuid;
use std::collections::HashMap;
use std::fmt;

/// One row of the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeEntry {
    pub name: &'static str,
    pub handle: u16,
    pub uuid: Option<Uuid>,
}

const fn entry(name: &'static str, handle: u16, uuid: Option<u16>) -> AttributeEntry {
    AttributeEntry {
        name,
        handle,
        uuid: match uuid {
            Some(short) => Some(Uuid::from_u16(short)),
            None => None,
        },
    }
}

pub const DEVICE_INFO: &str = "DEVICE_INFO";
pub const DEVICE_NAME: &str = "DEVICE_NAME";
pub const NOTIFICATION: &str = "NOTIFICATION";
pub const USER_INFO: &str = "USER_INFO";
pub const CONTROL_POINT: &str = "CONTROL_POINT";
pub const REALTIME_STEPS: &str = "REALTIME_STEPS";
pub const ACTIVITY_DATA: &str = "ACTIVITY_DATA";
pub const LE_PARAMS: &str = "LE_PARAMS";
pub const DATE_TIME: &str = "DATE_TIME";
pub const STATISTICS: &str = "STATISTICS";
pub const BATTERY: &str = "BATTERY";
pub const TEST: &str = "TEST";
pub const PAIR: &str = "PAIR";

/// The Mi Band attribute table
pub const MI_BAND_ATTRIBUTES: &[AttributeEntry] = &[
    entry(DEVICE_INFO, 0x0012, Some(0xff01)),
    entry(DEVICE_NAME, 0x0014, Some(0xff02)),
    entry(NOTIFICATION, 0x0016, Some(0xff03)),
    entry("CCC_USER_INFO", 0x0017, None),
    entry(USER_INFO, 0x0019, Some(0xff04)),
    entry(CONTROL_POINT, 0x001b, Some(0xff05)),
    entry(REALTIME_STEPS, 0x001d, Some(0xff06)),
    entry("CCC_ACTIVITY_DATA", 0x001e, None),
    entry(ACTIVITY_DATA, 0x0020, Some(0xff07)),
    entry("CCC_FIRMWARE_DATA", 0x0021, None),
    entry(LE_PARAMS, 0x0025, Some(0xff09)),
    entry(DATE_TIME, 0x0027, Some(0xff0a)),
    entry(STATISTICS, 0x0029, Some(0xff0b)),
    entry(BATTERY, 0x002b, Some(0xff0c)),
    entry("CCC_TEST", 0x002c, None),
    entry(TEST, 0x002e, Some(0xff0d)),
    entry("CCC_PAIR", 0x0031, None),
    entry(PAIR, 0x0033, Some(0xff0f)),
];

/// Display name of a handle: symbolic when registered, otherwise the raw handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleName {
    Symbolic(&'static str),
    Raw(u16),
}

impl HandleName {
    pub fn is_symbolic(&self) -> bool {
        matches!(self, HandleName::Symbolic(_))
    }
}

impl fmt::Display for HandleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleName::Symbolic(name) => f.pad(name),
            HandleName::Raw(handle) => f.pad(&format!("0x{:04x}", handle)),
        }
    }
}

/// Bidirectional name/handle/UUID lookup, built once per session
#[derive(Debug, Clone)]
pub struct HandleRegistry {
    entries: &'static [AttributeEntry],
    by_handle: HashMap<u16, usize>,
    by_name: HashMap<&'static str, usize>,
}

impl HandleRegistry {
    /// Build a registry from a custom table.
    ///
    /// Names and handles must each be unique.
    pub fn new(entries: &'static [AttributeEntry]) -> BandResult<Self> {
        let mut by_handle = HashMap::with_capacity(entries.len());
        let mut by_name = HashMap::with_capacity(entries.len());

        for (i, e) in entries.iter().enumerate() {
            if by_handle.insert(e.handle, i).is_some() {
                return Err(BandError::InvalidArgument(format!(
                    "duplicate handle 0x{:04x} in attribute table",
                    e.handle
                )));
            }
            if by_name.insert(e.name, i).is_some() {
                return Err(BandError::InvalidArgument(format!(
                    "duplicate attribute name {} in attribute table",
                    e.name
                )));
            }
        }

        Ok(Self {
            entries,
            by_handle,
            by_name,
        })
    }

    /// Name for a handle, falling back to the handle itself. Never fails.
    pub fn resolve_name(&self, handle: u16) -> HandleName {
        match self.by_handle.get(&handle) {
            Some(&i) => HandleName::Symbolic(self.entries[i].name),
            None => HandleName::Raw(handle),
        }
    }

    /// Handle registered under a name.
    pub fn resolve_handle(&self, name: &str) -> BandResult<u16> {
        self.entry(name).map(|e| e.handle)
    }

    /// UUID registered under a name, for reads by type.
    pub fn resolve_uuid(&self, name: &str) -> BandResult<Uuid> {
        self.entry(name)?
            .uuid
            .ok_or_else(|| BandError::UnknownAttribute(format!("{name} has no UUID")))
    }

    /// Full entry registered under a name.
    pub fn entry(&self, name: &str) -> BandResult<&AttributeEntry> {
        self.by_name
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| BandError::UnknownAttribute(name.to_string()))
    }

    /// Entry carrying a UUID, if any.
    pub fn by_uuid(&self, uuid: &Uuid) -> Option<&AttributeEntry> {
        self.entries.iter().find(|e| e.uuid.as_ref() == Some(uuid))
    }

    pub fn entries(&self) -> &'static [AttributeEntry] {
        self.entries
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        let by_handle = MI_BAND_ATTRIBUTES
            .iter()
            .enumerate()
            .map(|(i, e)| (e.handle, i))
            .collect();
        let by_name = MI_BAND_ATTRIBUTES
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name, i))
            .collect();

        Self {
            entries: MI_BAND_ATTRIBUTES,
            by_handle,
            by_name,
        }
    }
}
