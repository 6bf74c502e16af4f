//! Unit tests for capture reading and trace classification

use super::*;
use crate::att::*;
use crate::band::registry::{HandleName, HandleRegistry, BATTERY, USER_INFO};
use crate::error::CaptureError;
use crate::hci::constants::*;

fn read_request(handle: u16) -> CapturedPacket {
    CapturedPacket::Attribute {
        opcode: ATT_READ_REQ,
        handle: Some(handle),
        value: Vec::new(),
    }
}

fn read_response(value: &[u8]) -> CapturedPacket {
    CapturedPacket::Attribute {
        opcode: ATT_READ_RSP,
        handle: None,
        value: value.to_vec(),
    }
}

fn notification(handle: u16, value: &[u8]) -> CapturedPacket {
    CapturedPacket::Attribute {
        opcode: ATT_HANDLE_VALUE_NTF,
        handle: Some(handle),
        value: value.to_vec(),
    }
}

fn classify_all(packets: Vec<CapturedPacket>) -> Vec<TraceEvent> {
    let registry = HandleRegistry::default();
    TraceClassifier::new(packets, &registry).collect()
}

/// Build an H4 ACL frame carrying an ATT PDU on the fixed channel
fn h4_att(pdu: &[u8]) -> Vec<u8> {
    let mut frame = vec![HCI_ACL_PKT, 0x40, 0x20];
    frame.extend_from_slice(&((pdu.len() + 4) as u16).to_le_bytes());
    frame.extend_from_slice(&(pdu.len() as u16).to_le_bytes());
    frame.extend_from_slice(&ATT_CID.to_le_bytes());
    frame.extend_from_slice(pdu);
    frame
}

fn btsnoop_file(datalink: u32, records: &[(u32, &[u8])]) -> Vec<u8> {
    let mut file = BTSNOOP_HEADER.to_vec();
    file.extend_from_slice(&datalink.to_be_bytes());

    for (flags, data) in records {
        let len = data.len() as u32;
        file.extend_from_slice(&len.to_be_bytes());
        file.extend_from_slice(&len.to_be_bytes());
        file.extend_from_slice(&flags.to_be_bytes());
        file.extend_from_slice(&0u32.to_be_bytes());
        file.extend_from_slice(&0x00e1_e93e_f6ef_0000i64.to_be_bytes());
        file.extend_from_slice(data);
    }
    file
}

const BTSNOOP_HEADER: [u8; 12] = [b'b', b't', b's', b'n', b'o', b'o', b'p', 0, 0, 0, 0, 1];

#[test]
fn test_connection_read_and_unknown_notification() {
    let events = classify_all(vec![
        CapturedPacket::Command {
            opcode: classifier::CREATE_CONNECTION,
        },
        read_request(0x002b),
        read_response(&[0x64, 0x0f]),
        notification(0x9999, &[0x01, 0x02]),
        // Never reached
        read_request(0x002b),
        CapturedPacket::Command {
            opcode: classifier::DISCONNECT,
        },
    ]);

    assert_eq!(
        events,
        vec![
            TraceEvent::ConnectionOpened,
            TraceEvent::Read {
                name: HandleName::Symbolic(BATTERY)
            },
            TraceEvent::ReadResult {
                value: vec![0x64, 0x0f]
            },
            TraceEvent::Notify {
                name: HandleName::Raw(0x9999),
                value: vec![0x01, 0x02]
            },
        ]
    );
    assert_eq!(events[3].to_string(), format!("n {:<24} -> 0102", "0x9999"));
}

#[test]
fn test_unknown_packet_first() {
    let events = classify_all(vec![
        CapturedPacket::Other,
        CapturedPacket::Command {
            opcode: classifier::CREATE_CONNECTION,
        },
        read_request(0x002b),
    ]);

    assert_eq!(events, vec![TraceEvent::UnknownPacket]);
}

#[test]
fn test_suppressed_packets() {
    let mut packets = vec![
        CapturedPacket::Command { opcode: 0x0c03 },
        CapturedPacket::Event {
            code: EVT_CMD_COMPLETE,
        },
    ];
    for opcode in [
        ATT_ERROR_RSP,
        ATT_FIND_INFO_REQ,
        ATT_FIND_INFO_RSP,
        ATT_READ_BY_TYPE_REQ,
        ATT_READ_BY_TYPE_RSP,
        ATT_READ_BY_GROUP_TYPE_REQ,
        ATT_READ_BY_GROUP_TYPE_RSP,
        ATT_WRITE_RSP,
    ] {
        packets.push(CapturedPacket::Attribute {
            opcode,
            handle: None,
            value: vec![0x00],
        });
    }
    packets.push(CapturedPacket::Command {
        opcode: classifier::DISCONNECT,
    });

    assert_eq!(classify_all(packets), vec![TraceEvent::ConnectionClosed]);
}

#[test]
fn test_known_notification_continues() {
    let events = classify_all(vec![
        notification(0x0016, &[0x05]),
        CapturedPacket::Attribute {
            opcode: ATT_WRITE_REQ,
            handle: Some(0x0019),
            value: vec![0xaa, 0xbb],
        },
    ]);

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1],
        TraceEvent::Write {
            name: HandleName::Symbolic(USER_INFO),
            value: vec![0xaa, 0xbb]
        }
    );
}

#[test]
fn test_unknown_opcode_stops() {
    let registry = HandleRegistry::default();
    let indication = CapturedPacket::Attribute {
        opcode: ATT_HANDLE_VALUE_IND,
        handle: Some(0x002b),
        value: vec![],
    };

    let (event, flow) = classify(&indication, &registry);
    assert_eq!(
        event,
        Some(TraceEvent::ProtocolError {
            opcode: ATT_HANDLE_VALUE_IND
        })
    );
    assert_eq!(flow, Flow::Stop);

    // A handle-addressed PDU too short to carry its handle
    let truncated = CapturedPacket::Attribute {
        opcode: ATT_READ_REQ,
        handle: None,
        value: vec![],
    };
    assert_eq!(classify(&truncated, &registry).1, Flow::Stop);

    let events = classify_all(vec![indication, read_request(0x002b)]);
    assert_eq!(events.len(), 1);
}

#[test]
fn test_event_display() {
    assert_eq!(
        TraceEvent::ConnectionOpened.to_string(),
        "#### Create Connection ######"
    );
    assert_eq!(
        TraceEvent::ConnectionClosed.to_string(),
        "#### End Connection ######"
    );
    assert_eq!(
        TraceEvent::Read {
            name: HandleName::Symbolic(BATTERY)
        }
        .to_string(),
        "r BATTERY"
    );
    assert_eq!(
        TraceEvent::ReadResult {
            value: vec![0xde, 0xad]
        }
        .to_string(),
        "  -> dead"
    );
    assert_eq!(
        TraceEvent::Write {
            name: HandleName::Symbolic("CONTROL_POINT"),
            value: vec![0x08, 0x00]
        }
        .to_string(),
        format!("w {:<24} -> 0800", "CONTROL_POINT")
    );
    assert_eq!(
        TraceEvent::ProtocolError { opcode: 0x1d }.to_string(),
        "Unknown operation code"
    );
    assert_eq!(TraceEvent::UnknownPacket.to_string(), "Unknown packet type");
}

#[test]
fn test_captured_packet_from_h4() {
    assert_eq!(
        CapturedPacket::from_h4(&[HCI_COMMAND_PKT, 0x0d, 0x20, 0x00]),
        CapturedPacket::Command { opcode: 0x200d }
    );
    assert_eq!(
        CapturedPacket::from_h4(&[HCI_EVENT_PKT, EVT_DISCONN_COMPLETE, 0x04, 0, 0x40, 0, 0x13]),
        CapturedPacket::Event {
            code: EVT_DISCONN_COMPLETE
        }
    );
    assert_eq!(
        CapturedPacket::from_h4(&h4_att(&[ATT_WRITE_REQ, 0x1b, 0x00, 0x08, 0x00])),
        CapturedPacket::Attribute {
            opcode: ATT_WRITE_REQ,
            handle: Some(0x001b),
            value: vec![0x08, 0x00],
        }
    );
    assert_eq!(
        CapturedPacket::from_h4(&h4_att(&[ATT_READ_RSP, 0x01, 0x02])),
        read_response(&[0x01, 0x02])
    );

    // Signaling channel
    let mut signaling = h4_att(&[0x12, 0x01, 0x00, 0x00]);
    signaling[7] = 0x05;
    assert_eq!(CapturedPacket::from_h4(&signaling), CapturedPacket::Other);

    // Continuation fragment
    let mut fragment = h4_att(&[ATT_READ_RSP, 0x01]);
    fragment[2] = 0x10;
    assert_eq!(CapturedPacket::from_h4(&fragment), CapturedPacket::Other);

    assert_eq!(CapturedPacket::from_h4(&[HCI_SCO_PKT, 0, 0, 0]), CapturedPacket::Other);
    assert_eq!(CapturedPacket::from_h4(&[]), CapturedPacket::Other);
}

#[test]
fn test_btsnoop_reader_h4() {
    let connect = [HCI_COMMAND_PKT, 0x0d, 0x20, 0x00];
    let read = h4_att(&[ATT_READ_REQ, 0x2b, 0x00]);
    let file = btsnoop_file(1002, &[(0x02, &connect[..]), (0x00, &read[..])]);

    let mut reader = BtsnoopReader::new(file.as_slice()).unwrap();
    assert_eq!(reader.datalink(), Datalink::H4);

    let records: Vec<_> = reader.by_ref().collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].flags, PacketFlags::COMMAND_OR_EVENT);
    assert_eq!(records[0].data, connect.to_vec());
    assert!(!records[1].is_truncated());
    assert_eq!(records[1].unix_micros(), 1_420_070_400_000_000);
    assert!(reader.next().is_none());

    let packets: Vec<_> = records
        .iter()
        .map(|r| CapturedPacket::from_record(r, Datalink::H4))
        .collect();
    let events = classify_all(packets);
    assert_eq!(
        events,
        vec![
            TraceEvent::ConnectionOpened,
            TraceEvent::Read {
                name: HandleName::Symbolic(BATTERY)
            },
        ]
    );
}

#[test]
fn test_btsnoop_reader_hci_flags() {
    let disconnect = [0x06, 0x04, 0x03, 0x40, 0x00, 0x13];
    let event = [EVT_CMD_STATUS, 0x04, 0x00, 0x01, 0x06, 0x04];
    let frame = h4_att(&[ATT_HANDLE_VALUE_NTF, 0x1d, 0x00, 0x10, 0x27]);
    let file = btsnoop_file(
        1001,
        &[(0x02, &disconnect[..]), (0x03, &event[..]), (0x01, &frame[1..])],
    );

    let reader = BtsnoopReader::new(file.as_slice()).unwrap();
    assert_eq!(reader.datalink(), Datalink::Hci);

    let packets: Vec<_> = reader
        .map(|r| CapturedPacket::from_record(&r.unwrap(), Datalink::Hci))
        .collect();
    assert_eq!(
        packets,
        vec![
            CapturedPacket::Command { opcode: 0x0406 },
            CapturedPacket::Event {
                code: EVT_CMD_STATUS
            },
            notification(0x001d, &[0x10, 0x27]),
        ]
    );
}

#[test]
fn test_btsnoop_reader_errors() {
    assert!(matches!(
        BtsnoopReader::new(&b"pcapng\0\0\0\0\0\x01\0\0\x03\xea"[..]),
        Err(CaptureError::BadMagic)
    ));
    assert!(matches!(
        BtsnoopReader::new(&b"btsnoop\0"[..]),
        Err(CaptureError::BadMagic)
    ));

    let mut bad_version = btsnoop_file(1002, &[]);
    bad_version[11] = 2;
    assert!(matches!(
        BtsnoopReader::new(bad_version.as_slice()),
        Err(CaptureError::UnsupportedVersion(2))
    ));

    assert!(matches!(
        BtsnoopReader::new(btsnoop_file(2001, &[]).as_slice()),
        Err(CaptureError::UnsupportedDatalink(2001))
    ));

    // Record data cut short
    let connect = [HCI_COMMAND_PKT, 0x0d, 0x20, 0x00];
    let mut file = btsnoop_file(1002, &[(0x00, &connect[..])]);
    file.truncate(file.len() - 1);
    let mut reader = BtsnoopReader::new(file.as_slice()).unwrap();
    assert!(matches!(reader.next(), Some(Err(CaptureError::Truncated))));
    assert!(reader.next().is_none());
}
