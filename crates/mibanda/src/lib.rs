//! mibanda - A Rust library for talking to Xiaomi Mi Band fitness trackers
//!
//! This library reads and writes the band's fixed-layout GATT attributes over a
//! Linux L2CAP socket, discovers bands with an LE scan, and decodes btsnoop
//! captures of band traffic into a readable attribute trace.

pub mod att;
pub mod band;
pub mod discovery;
pub mod error;
pub mod gap;
pub mod hci;
pub mod trace;
pub mod transport;
pub mod uuid;

// Re-export common types for convenience
pub use band::{
    BandSession, BatteryInfo, BatteryStatus, DeviceInfo, HandleName, HandleRegistry, LeParams,
    UserProfile,
};
pub use discovery::{discover, DiscoveryConfig};
pub use error::{BandError, BandResult, CaptureError, HciError, TransportError};
pub use gap::{AddressType, BdAddr};
pub use trace::{BtsnoopReader, CapturedPacket, TraceClassifier, TraceEvent};
pub use transport::{AttSocket, GattTransport, SecurityLevel, SessionConfig};
pub use uuid::Uuid;
