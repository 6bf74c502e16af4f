//! Protocol trace decoding
//!
//! Reads btsnoop captures and classifies the packets into a readable log of
//! connection and attribute traffic.

pub mod btsnoop;
pub mod classifier;
pub mod packet;

#[cfg(test)]
mod tests;

pub use self::btsnoop::{BtsnoopReader, BtsnoopRecord, Datalink, PacketFlags};
pub use self::classifier::{classify, Flow, TraceClassifier, TraceEvent};
pub use self::packet::CapturedPacket;
