//! Captured packet model
//!
//! Reduces a raw capture record to the few fields the classifier looks at.

use super::btsnoop::{BtsnoopRecord, Datalink, PacketFlags};
use crate::att::*;
use crate::hci::constants::*;
use crate::hci::{AclHeader, HciCommand};
use byteorder::{ByteOrder, LittleEndian};

const L2CAP_HEADER_LEN: usize = 4;

/// A captured packet, as far as the trace is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedPacket {
    /// HCI command sent to the controller
    Command { opcode: u16 },
    /// HCI event from the controller
    Event { code: u8 },
    /// ATT PDU carried on the LE fixed channel
    Attribute {
        opcode: u8,
        /// Present for PDUs that address a handle
        handle: Option<u16>,
        value: Vec<u8>,
    },
    /// Anything else (SCO, ISO, other L2CAP channels, fragments)
    Other,
}

impl CapturedPacket {
    /// Build a packet from a btsnoop record of the given datalink
    pub fn from_record(record: &BtsnoopRecord, datalink: Datalink) -> Self {
        match datalink {
            Datalink::H4 => Self::from_h4(&record.data),
            Datalink::Hci => {
                let packet_type = match (
                    record.flags.contains(PacketFlags::COMMAND_OR_EVENT),
                    record.flags.contains(PacketFlags::RECEIVED),
                ) {
                    (true, true) => HCI_EVENT_PKT,
                    (true, false) => HCI_COMMAND_PKT,
                    (false, _) => HCI_ACL_PKT,
                };
                Self::from_hci(packet_type, &record.data)
            }
        }
    }

    /// Parse an H4 frame (packet type byte followed by the HCI packet)
    pub fn from_h4(data: &[u8]) -> Self {
        match data.split_first() {
            Some((&packet_type, rest)) => Self::from_hci(packet_type, rest),
            None => CapturedPacket::Other,
        }
    }

    fn from_hci(packet_type: u8, data: &[u8]) -> Self {
        match packet_type {
            HCI_COMMAND_PKT => match HciCommand::parse_opcode(data) {
                Some(opcode) => CapturedPacket::Command { opcode },
                None => CapturedPacket::Other,
            },
            HCI_EVENT_PKT if data.len() >= 2 => CapturedPacket::Event { code: data[0] },
            HCI_ACL_PKT => Self::from_acl(data),
            _ => CapturedPacket::Other,
        }
    }

    fn from_acl(data: &[u8]) -> Self {
        let header = match AclHeader::parse(data) {
            Some(header) if !header.is_continuation() => header,
            _ => return CapturedPacket::Other,
        };

        let l2cap = &data[AclHeader::SIZE..];
        if l2cap.len() < L2CAP_HEADER_LEN {
            return CapturedPacket::Other;
        }

        let length = LittleEndian::read_u16(&l2cap[0..2]) as usize;
        let cid = LittleEndian::read_u16(&l2cap[2..4]);
        if cid != ATT_CID {
            return CapturedPacket::Other;
        }

        let payload = &l2cap[L2CAP_HEADER_LEN..];
        let pdu = &payload[..length.min(payload.len()).min(header.length as usize)];
        Self::from_att(pdu)
    }

    /// Split an ATT PDU into opcode, handle and value
    pub fn from_att(pdu: &[u8]) -> Self {
        let (&opcode, params) = match pdu.split_first() {
            Some(split) => split,
            None => return CapturedPacket::Other,
        };

        let (handle, value) = match opcode {
            ATT_READ_REQ | ATT_WRITE_REQ | ATT_WRITE_CMD | ATT_HANDLE_VALUE_NTF
            | ATT_HANDLE_VALUE_IND => {
                if params.len() >= 2 {
                    (
                        Some(LittleEndian::read_u16(&params[0..2])),
                        params[2..].to_vec(),
                    )
                } else {
                    (None, Vec::new())
                }
            }
            _ => (None, params.to_vec()),
        };

        CapturedPacket::Attribute {
            opcode,
            handle,
            value,
        }
    }
}
