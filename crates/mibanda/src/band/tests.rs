//! Unit tests for the band codecs, registry and session

use super::codec::*;
use super::registry::*;
use super::session::BandSession;
use crate::error::{BandError, TransportError};
use crate::gap::BdAddr;
use crate::transport::GattTransport;
use crate::uuid::Uuid;
use std::collections::VecDeque;

/// Mock transport for testing
#[derive(Debug, Default)]
struct MockTransport {
    queued_reads: VecDeque<Result<Vec<Vec<u8>>, TransportError>>,
    read_uuids: Vec<Uuid>,
    writes: Vec<(u16, Vec<u8>)>,
    fail_writes: bool,
}

impl MockTransport {
    fn new() -> Self {
        Self::default()
    }

    fn queue_read(&mut self, value: &[u8]) {
        self.queued_reads.push_back(Ok(vec![value.to_vec()]));
    }

    fn queue_read_error(&mut self, error: TransportError) {
        self.queued_reads.push_back(Err(error));
    }
}

impl GattTransport for MockTransport {
    fn read_by_uuid(&mut self, uuid: &Uuid) -> Result<Vec<Vec<u8>>, TransportError> {
        self.read_uuids.push(*uuid);
        self.queued_reads.pop_front().unwrap_or(Ok(Vec::new()))
    }

    fn read_by_handle(&mut self, _handle: u16) -> Result<Vec<u8>, TransportError> {
        Err(TransportError::Timeout)
    }

    fn write_by_handle(&mut self, handle: u16, value: &[u8]) -> Result<(), TransportError> {
        if self.fail_writes {
            return Err(TransportError::Disconnected);
        }
        self.writes.push((handle, value.to_vec()));
        Ok(())
    }
}

const BAND_ADDRESS: &str = "88:0F:10:12:34:56";

fn session(transport: MockTransport) -> BandSession<MockTransport> {
    BandSession::new(transport, BAND_ADDRESS.parse().unwrap(), "MI")
}

fn sample_profile() -> UserProfile {
    UserProfile::new(1550050550, true, 32, 175, 70, 0, b"1550050550").unwrap()
}

#[test]
fn test_crc8_reference_vectors() {
    assert_eq!(crc8(b""), 0x00);
    assert_eq!(crc8(&[0x00]), 0x00);
    assert_eq!(crc8(&[0x01]), 0x5e);
    assert_eq!(crc8(&[0xff]), 0x35);
    assert_eq!(crc8(b"123456789"), 0xa1);
    assert_eq!(crc8(&[0x02, 0x1c, 0xb8, 0x4e, 0x00, 0x00, 0x00, 0x00]), 0x95);

    let counting: Vec<u8> = (0..19).collect();
    assert_eq!(crc8(&counting), 0x26);
}

#[test]
fn test_encode_user_profile() {
    let payload = encode_user_profile(&sample_profile(), 0x56);

    assert_eq!(
        hex::encode(&payload[..19]),
        "f6e4635c0120af460031353530303530353530"
    );
    assert_eq!(crc8(&payload[..19]), 0xac);
    assert_eq!(payload[19], 0xfa);
    assert!(verify_user_profile(&payload, 0x56));
    assert!(!verify_user_profile(&payload, 0x57));
    assert!(!verify_user_profile(&payload[..19], 0x56));
}

#[test]
fn test_user_profile_round_trip() {
    let profiles = [
        sample_profile(),
        UserProfile::new(0, false, 0, 0, 0, 0, &[0u8; 10]).unwrap(),
        UserProfile::new(u32::MAX, true, 255, 255, 255, 255, &[0xffu8; 10]).unwrap(),
    ];

    for profile in profiles {
        for low_byte in [0x00, 0x56, 0xff] {
            let payload = encode_user_profile(&profile, low_byte);
            assert_eq!(decode_user_profile(&payload).unwrap(), profile);
        }
    }

    assert!(matches!(
        decode_user_profile(&[0u8; 19]),
        Err(BandError::MalformedAttribute { .. })
    ));
}

#[test]
fn test_user_profile_alias_length() {
    for len in [9, 11] {
        let alias = vec![b'a'; len];
        assert!(matches!(
            UserProfile::new(1, true, 30, 180, 80, 0, &alias),
            Err(BandError::InvalidProfile(_))
        ));
    }

    let profile = UserProfile::new(1, true, 30, 180, 80, 0, b"abcdefghij").unwrap();
    assert_eq!(profile.alias(), b"abcdefghij");
}

#[test]
fn test_decode_battery() {
    let raw = [80, 15, 2, 20, 13, 45, 30, 0x2c, 0x01, 3];
    let info = decode_battery(&raw).unwrap();

    assert_eq!(info.level, 80);
    assert_eq!(
        info.last_charged,
        Timestamp {
            year: 2015,
            month: 3,
            day: 20,
            hour: 13,
            minute: 45,
            second: 30,
        }
    );
    assert_eq!(info.last_charged.to_string(), "2015-03-20 13:45:30");
    assert_eq!(info.charge_counter, 300);
    assert_eq!(info.status, BatteryStatus::Full);
}

#[test]
fn test_battery_status_mapping() {
    let expected = [
        (1, BatteryStatus::Low),
        (2, BatteryStatus::Medium),
        (3, BatteryStatus::Full),
        (4, BatteryStatus::NotCharging),
        (5, BatteryStatus::Unknown),
        (0, BatteryStatus::Unknown),
    ];

    for (byte, status) in expected {
        let mut raw = [0u8; BATTERY_INFO_LEN];
        raw[9] = byte;
        assert_eq!(decode_battery(&raw).unwrap().status, status);
    }
}

#[test]
fn test_malformed_lengths() {
    assert!(matches!(
        decode_battery(&[0u8; 9]),
        Err(BandError::MalformedAttribute { .. })
    ));
    assert!(matches!(
        decode_battery(&[0u8; 11]),
        Err(BandError::MalformedAttribute { .. })
    ));
    assert!(matches!(
        decode_le_params(&[0u8; 11]),
        Err(BandError::MalformedAttribute { .. })
    ));
    assert!(matches!(
        decode_device_info(&[1, 2, 3]),
        Err(BandError::MalformedAttribute { .. })
    ));
    assert!(matches!(
        decode_steps(&[7]),
        Err(BandError::MalformedAttribute { .. })
    ));
}

#[test]
fn test_decode_le_params() {
    let raw = [
        0x27, 0x00, 0x31, 0x00, 0x00, 0x00, 0xf4, 0x01, 0x30, 0x00, 0xe8, 0x03,
    ];
    let params = decode_le_params(&raw).unwrap();

    assert_eq!(params.minimum_connection_interval, 39);
    assert_eq!(params.maximum_connection_interval, 49);
    assert_eq!(params.latency, 0);
    assert_eq!(params.timeout, 500);
    assert_eq!(params.connection_interval, 48);
    assert_eq!(params.advertisement_interval, 1000);
}

#[test]
fn test_decode_device_info_and_steps() {
    let raw = [0xaa, 0xbb, 0xcc, 0x01, 0x02, 0x03, 0x04];
    assert_eq!(decode_device_info(&raw).unwrap().firmware_version, "4.3.2.1");
    assert_eq!(
        decode_device_info(&[5, 0, 2, 1]).unwrap().firmware_version,
        "1.2.0.5"
    );

    assert_eq!(decode_steps(&[0x10, 0x27]).unwrap(), 10000);
    assert_eq!(decode_steps(&[0x01, 0x00, 0xff]).unwrap(), 1);

    assert_eq!(decode_name(b"MI\0\0"), "MI");
}

#[test]
fn test_control_point_payloads() {
    assert_eq!(encode_self_test(), [0x02]);
    assert_eq!(encode_pair(), [0x02]);
    assert_eq!(encode_locate(), [0x08, 0x00]);
    assert_eq!(encode_flash_leds(1, 6, 3).unwrap(), [0x0e, 1, 6, 3, 0x01]);

    for (r, g, b) in [(0, 1, 1), (1, 7, 1), (1, 1, 0), (255, 255, 255)] {
        assert!(matches!(
            encode_flash_leds(r, g, b),
            Err(BandError::InvalidArgument(_))
        ));
    }
}

#[test]
fn test_registry_lookups() {
    let registry = HandleRegistry::default();

    assert_eq!(registry.resolve_handle(BATTERY).unwrap(), 0x002b);
    assert_eq!(registry.resolve_handle(USER_INFO).unwrap(), 0x0019);
    assert_eq!(registry.resolve_name(0x002b), HandleName::Symbolic(BATTERY));
    assert_eq!(registry.resolve_name(0x0017).to_string(), "CCC_USER_INFO");

    let battery_uuid = registry.resolve_uuid(BATTERY).unwrap();
    assert_eq!(battery_uuid.as_u16(), Some(0xff0c));
    assert_eq!(
        battery_uuid.to_string(),
        "0000ff0c-0000-1000-8000-00805f9b34fb"
    );
    assert_eq!(registry.by_uuid(&battery_uuid).unwrap().handle, 0x002b);

    // Every UUID points back at the entry it came from
    for entry in registry.entries() {
        if let Some(uuid) = entry.uuid {
            assert_eq!(registry.by_uuid(&uuid).unwrap().name, entry.name);
        }
        assert_eq!(registry.resolve_name(entry.handle).to_string(), entry.name);
    }
}

#[test]
fn test_registry_unknown_entries() {
    let registry = HandleRegistry::default();

    let name = registry.resolve_name(0x9999);
    assert_eq!(name, HandleName::Raw(0x9999));
    assert!(!name.is_symbolic());
    assert_eq!(name.to_string(), "0x9999");

    assert!(matches!(
        registry.resolve_handle("HEART_RATE"),
        Err(BandError::UnknownAttribute(_))
    ));
    assert!(matches!(
        registry.resolve_uuid("CCC_PAIR"),
        Err(BandError::UnknownAttribute(_))
    ));
}

#[test]
fn test_registry_rejects_duplicates() {
    static DUPLICATE_HANDLE: [AttributeEntry; 2] = [
        AttributeEntry {
            name: "A",
            handle: 1,
            uuid: None,
        },
        AttributeEntry {
            name: "B",
            handle: 1,
            uuid: None,
        },
    ];
    static DUPLICATE_NAME: [AttributeEntry; 2] = [
        AttributeEntry {
            name: "A",
            handle: 1,
            uuid: None,
        },
        AttributeEntry {
            name: "A",
            handle: 2,
            uuid: None,
        },
    ];

    assert!(HandleRegistry::new(&DUPLICATE_HANDLE).is_err());
    assert!(HandleRegistry::new(&DUPLICATE_NAME).is_err());
    assert!(HandleRegistry::new(MI_BAND_ATTRIBUTES).is_ok());
}

#[test]
fn test_session_reads() {
    let mut transport = MockTransport::new();
    transport.queue_read(&[50, 14, 11, 31, 23, 59, 58, 0x05, 0x00, 4]);
    transport.queue_read(&[0, 0, 0, 0, 0x10, 0x02, 0x00, 0x01]);
    transport.queue_read(&[0xe8, 0x03]);
    transport.queue_read(&[0u8; LE_PARAMS_LEN]);

    let mut band = session(transport);

    let battery = band.read_battery().unwrap();
    assert_eq!(battery.level, 50);
    assert_eq!(battery.last_charged.month, 12);
    assert_eq!(battery.status, BatteryStatus::NotCharging);

    assert_eq!(band.read_device_info().unwrap().firmware_version, "1.0.2.16");
    assert_eq!(band.read_steps().unwrap(), 1000);
    assert_eq!(band.read_le_params().unwrap().latency, 0);

    let transport = band.into_transport();
    let uuids: Vec<_> = transport
        .read_uuids
        .iter()
        .map(|uuid| uuid.as_u16().unwrap())
        .collect();
    assert_eq!(uuids, vec![0xff0c, 0xff01, 0xff06, 0xff09]);
    assert!(transport.writes.is_empty());
}

#[test]
fn test_session_read_name() {
    let mut transport = MockTransport::new();
    transport.queue_read(b"MI1A");

    let mut band = session(transport);
    assert_eq!(band.read_name(true).unwrap(), "MI");
    assert_eq!(band.read_name(false).unwrap(), "MI1A");
    assert_eq!(band.name(), "MI1A");
}

#[test]
fn test_session_read_errors() {
    let mut transport = MockTransport::new();
    transport.queue_read(&[0u8; 9]);
    transport.queue_read_error(TransportError::Timeout);

    let mut band = session(transport);
    assert!(matches!(
        band.read_battery(),
        Err(BandError::MalformedAttribute { .. })
    ));
    assert!(matches!(
        band.read_battery(),
        Err(BandError::Transport(TransportError::Timeout))
    ));
    // Nothing queued: the band answered with no value
    assert!(matches!(
        band.read_steps(),
        Err(BandError::Transport(TransportError::EmptyRead(_)))
    ));
}

#[test]
fn test_session_writes() {
    let mut band = session(MockTransport::new());
    assert_eq!(band.address().low_byte(), 0x56);

    band.write_user_profile(&sample_profile()).unwrap();
    band.self_test().unwrap();
    band.pair().unwrap();
    band.flash_leds(1, 2, 3).unwrap();
    band.locate().unwrap();

    let writes = band.into_transport().writes;
    let mut profile = hex::decode("f6e4635c0120af460031353530303530353530").unwrap();
    profile.push(0xfa);

    assert_eq!(
        writes,
        vec![
            (0x0019, profile),
            (0x002e, vec![0x02]),
            (0x0033, vec![0x02]),
            (0x001b, vec![0x0e, 1, 2, 3, 0x01]),
            (0x001b, vec![0x08, 0x00]),
        ]
    );
}

#[test]
fn test_session_rejects_before_writing() {
    let mut band = session(MockTransport::new());

    assert!(matches!(
        band.flash_leds(1, 2, 9),
        Err(BandError::InvalidArgument(_))
    ));
    assert!(band.into_transport().writes.is_empty());
}

#[test]
fn test_session_write_errors() {
    let mut transport = MockTransport::new();
    transport.fail_writes = true;

    let mut band = session(transport);
    assert!(matches!(
        band.locate(),
        Err(BandError::Transport(TransportError::Disconnected))
    ));
}

#[test]
fn test_address_low_byte() {
    let address: BdAddr = BAND_ADDRESS.parse().unwrap();
    assert_eq!(address.low_byte(), 0x56);
    assert_eq!(address.to_string(), BAND_ADDRESS);
}
