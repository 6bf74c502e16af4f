//! HCI packet structures and parsing
//!
//! This module contains structures and methods for handling HCI packets.

use crate::hci::constants::*;
use byteorder::{ByteOrder, LittleEndian};

/// Combine an OGF and OCF into a command opcode
pub const fn opcode(ogf: u8, ocf: u16) -> u16 {
    ((ogf as u16) << 10) | (ocf & 0x3ff)
}

/// HCI commands the band tooling sends
#[derive(Debug, Clone, PartialEq)]
pub enum HciCommand {
    ReadBdAddr,
    LeSetScanParameters {
        scan_type: u8,
        scan_interval: u16,
        scan_window: u16,
        own_address_type: u8,
        filter_policy: u8,
    },
    LeSetScanEnable {
        enable: bool,
        filter_duplicates: bool,
    },
}

impl HciCommand {
    /// Get the OGF and OCF for this command
    pub fn opcode_parts(&self) -> (u8, u16) {
        match self {
            Self::ReadBdAddr => (OGF_INFO_PARAM, OCF_READ_BD_ADDR),
            Self::LeSetScanParameters { .. } => (OGF_LE, OCF_LE_SET_SCAN_PARAMETERS),
            Self::LeSetScanEnable { .. } => (OGF_LE, OCF_LE_SET_SCAN_ENABLE),
        }
    }

    /// Full 16-bit opcode of this command
    pub fn opcode(&self) -> u16 {
        let (ogf, ocf) = self.opcode_parts();
        opcode(ogf, ocf)
    }

    /// Convert the command to its raw parameter bytes
    fn parameters(&self) -> Vec<u8> {
        match *self {
            Self::ReadBdAddr => vec![],

            Self::LeSetScanParameters {
                scan_type,
                scan_interval,
                scan_window,
                own_address_type,
                filter_policy,
            } => {
                let mut params = Vec::with_capacity(7);
                params.push(scan_type);
                params.extend_from_slice(&scan_interval.to_le_bytes());
                params.extend_from_slice(&scan_window.to_le_bytes());
                params.push(own_address_type);
                params.push(filter_policy);
                params
            }

            Self::LeSetScanEnable {
                enable,
                filter_duplicates,
            } => vec![enable as u8, filter_duplicates as u8],
        }
    }

    /// Convert the command to a raw HCI packet
    pub fn to_packet(&self) -> Vec<u8> {
        let params = self.parameters();

        let mut packet = vec![HCI_COMMAND_PKT];
        packet.extend_from_slice(&self.opcode().to_le_bytes());
        packet.push(params.len() as u8);
        packet.extend_from_slice(&params);
        packet
    }

    /// Read the opcode of a raw command (without the H4 type byte)
    pub fn parse_opcode(data: &[u8]) -> Option<u16> {
        (data.len() >= 3).then(|| LittleEndian::read_u16(&data[0..2]))
    }
}

/// HCI Event packet
#[derive(Debug, Clone, PartialEq)]
pub struct HciEvent {
    pub event_code: u8,
    pub parameter_total_length: u8,
    pub parameters: Vec<u8>,
}

impl HciEvent {
    /// Parse an HCI event from raw bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 2 {
            return None;
        }

        let event_code = data[0];
        let parameter_total_length = data[1];

        if data.len() < (parameter_total_length as usize + 2) {
            return None;
        }

        let parameters = data[2..(parameter_total_length as usize + 2)].to_vec();

        Some(HciEvent {
            event_code,
            parameter_total_length,
            parameters,
        })
    }

    /// Whether this is the Command Complete event for `opcode`
    pub fn is_command_complete(&self, opcode: u16) -> bool {
        self.event_code == EVT_CMD_COMPLETE
            && self.parameters.len() >= 4
            && LittleEndian::read_u16(&self.parameters[1..3]) == opcode
    }

    /// Status byte of a Command Complete event
    pub fn command_status(&self) -> Option<u8> {
        (self.event_code == EVT_CMD_COMPLETE && self.parameters.len() >= 4)
            .then(|| self.parameters[3])
    }

    /// Return parameters following the status byte of a Command Complete event
    pub fn return_parameters(&self) -> &[u8] {
        if self.event_code == EVT_CMD_COMPLETE && self.parameters.len() > 4 {
            &self.parameters[4..]
        } else {
            &[]
        }
    }
}

/// LE Advertising Report Event
#[derive(Debug, Clone, PartialEq)]
pub struct LeAdvertisingReport {
    pub event_type: u8,
    pub address_type: u8,
    pub address: [u8; 6],
    pub data: Vec<u8>,
    pub rssi: i8,
}

impl LeAdvertisingReport {
    /// Parse every report carried in an LE Advertising Report meta event
    pub fn parse_from_meta_event(event: &HciEvent) -> Vec<Self> {
        let params = &event.parameters;
        if event.event_code != EVT_LE_META_EVENT
            || params.len() < 2
            || params[0] != EVT_LE_ADVERTISING_REPORT
        {
            return Vec::new();
        }

        let mut reports = Vec::new();
        let mut offset = 2;

        for _ in 0..params[1] {
            // event type, address type, address, data length
            if params.len() < offset + 9 {
                break;
            }

            let event_type = params[offset];
            let address_type = params[offset + 1];
            let mut address = [0u8; 6];
            address.copy_from_slice(&params[offset + 2..offset + 8]);

            let data_length = params[offset + 8] as usize;
            let data_start = offset + 9;
            if params.len() < data_start + data_length + 1 {
                break;
            }

            let data = params[data_start..data_start + data_length].to_vec();
            let rssi = params[data_start + data_length] as i8;

            reports.push(LeAdvertisingReport {
                event_type,
                address_type,
                address,
                data,
                rssi,
            });

            offset = data_start + data_length + 1;
        }

        reports
    }
}

/// Header of an HCI ACL data packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclHeader {
    pub handle: u16,
    pub packet_boundary: u8,
    pub length: u16,
}

impl AclHeader {
    pub const SIZE: usize = 4;

    /// Parse the ACL header (without the H4 type byte)
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }

        let raw_handle = LittleEndian::read_u16(&data[0..2]);
        Some(AclHeader {
            handle: raw_handle & 0x0fff,
            packet_boundary: ((raw_handle >> 12) & 0x03) as u8,
            length: LittleEndian::read_u16(&data[2..4]),
        })
    }

    /// Whether this packet continues a previous fragment
    pub fn is_continuation(&self) -> bool {
        self.packet_boundary == ACL_PB_CONTINUING
    }
}
