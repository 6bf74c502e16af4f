//! Bluetooth HCI (Host Controller Interface) implementation
//!
//! This module provides functionality for interacting with HCI interfaces and
//! for recognizing HCI packets in captured traffic.

pub mod constants;
pub mod packet;
pub mod socket;


pub use packet::{opcode, AclHeader, HciCommand, HciEvent, LeAdvertisingReport};
pub use socket::HciSocket;
