//! HCI protocol constants
//!
//! This module contains constants used in the Bluetooth HCI protocol.

// HCI packet types
pub const HCI_COMMAND_PKT: u8 = 0x01;
pub const HCI_ACL_PKT: u8 = 0x02;
pub const HCI_SCO_PKT: u8 = 0x03;
pub const HCI_EVENT_PKT: u8 = 0x04;
pub const HCI_ISO_PKT: u8 = 0x05;

// Common OGF (Opcode Group Field) values
pub const OGF_LINK_CTL: u8 = 0x01;
pub const OGF_INFO_PARAM: u8 = 0x04;
pub const OGF_LE: u8 = 0x08;

// Link Control Commands (OGF: 0x01)
pub const OCF_DISCONNECT: u16 = 0x0006;

// Informational Parameters (OGF: 0x04)
pub const OCF_READ_BD_ADDR: u16 = 0x0009;

// LE Command OCF values (OGF: 0x08)
pub const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
pub const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;
pub const OCF_LE_CREATE_CONNECTION: u16 = 0x000D;

// HCI Events
pub const EVT_DISCONN_COMPLETE: u8 = 0x05;
pub const EVT_CMD_COMPLETE: u8 = 0x0E;
pub const EVT_CMD_STATUS: u8 = 0x0F;
pub const EVT_LE_META_EVENT: u8 = 0x3E;

// LE Meta Events
pub const EVT_LE_CONN_COMPLETE: u8 = 0x01;
pub const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

// ACL packet boundary flags (bits 12-13 of the handle field)
pub const ACL_PB_CONTINUING: u8 = 0x01;

// Maximum HCI event packet size (type + header + parameters)
pub const HCI_MAX_EVENT_SIZE: usize = 260;
