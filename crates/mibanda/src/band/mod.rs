//! Mi Band attribute layer
//!
//! This module holds the attribute value codecs, the handle registry and the
//! session type that ties them to a GATT transport.

pub mod codec;
pub mod registry;
pub mod session;

#[cfg(test)]
mod tests;

pub use self::codec::{BatteryInfo, BatteryStatus, DeviceInfo, LeParams, Timestamp, UserProfile};
pub use self::registry::{AttributeEntry, HandleName, HandleRegistry, MI_BAND_ATTRIBUTES};
pub use self::session::BandSession;
