//! ATT PDU definitions used by the band client
use super::constants::*;
use super::error::AttErrorCode;
use crate::error::TransportError;
use crate::uuid::Uuid;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Result of parsing an ATT PDU
pub type PduResult<T> = Result<T, TransportError>;

/// ATT packet formats
pub trait AttPacket: Sized {
    /// Opcode for this packet
    fn opcode() -> u8;

    /// Parse packet from bytes
    fn parse(data: &[u8]) -> PduResult<Self>;

    /// Serialize packet to bytes
    fn serialize(&self) -> Vec<u8>;
}

fn check_opcode<P: AttPacket>(data: &[u8], min_len: usize) -> PduResult<()> {
    if data.len() < min_len || data[0] != P::opcode() {
        return Err(TransportError::InvalidPdu);
    }
    Ok(())
}

fn read_handle(cursor: &mut Cursor<&[u8]>) -> PduResult<u16> {
    cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| TransportError::InvalidPdu)
}

/// Error response packet
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    /// Request opcode in error
    pub request_opcode: u8,
    /// Attribute handle in error
    pub handle: u16,
    /// Error code
    pub error_code: AttErrorCode,
}

impl AttPacket for ErrorResponse {
    fn opcode() -> u8 {
        ATT_ERROR_RSP
    }

    fn parse(data: &[u8]) -> PduResult<Self> {
        check_opcode::<Self>(data, 5)?;

        let request_opcode = data[1];
        let mut cursor = Cursor::new(&data[2..]);
        let handle = read_handle(&mut cursor)?;
        let error_code = data[4].into();

        Ok(Self {
            request_opcode,
            handle,
            error_code,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(5);
        packet.push(Self::opcode());
        packet.push(self.request_opcode);
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.push(self.error_code.into());
        packet
    }
}

impl From<ErrorResponse> for TransportError {
    fn from(rsp: ErrorResponse) -> Self {
        TransportError::Att {
            code: rsp.error_code,
            handle: rsp.handle,
        }
    }
}

/// Read By Type Request packet
///
/// This is what a "read by UUID" turns into on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadByTypeRequest {
    /// First requested handle
    pub start_handle: u16,
    /// Last requested handle
    pub end_handle: u16,
    /// Attribute type to match
    pub attribute_type: Uuid,
}

impl ReadByTypeRequest {
    /// Request every attribute of the given type on the server
    pub fn all(attribute_type: Uuid) -> Self {
        Self {
            start_handle: ATT_HANDLE_MIN,
            end_handle: ATT_HANDLE_MAX,
            attribute_type,
        }
    }
}

impl AttPacket for ReadByTypeRequest {
    fn opcode() -> u8 {
        ATT_READ_BY_TYPE_REQ
    }

    fn parse(data: &[u8]) -> PduResult<Self> {
        check_opcode::<Self>(data, 7)?;

        let mut cursor = Cursor::new(&data[1..]);
        let start_handle = read_handle(&mut cursor)?;
        let end_handle = read_handle(&mut cursor)?;
        let attribute_type =
            Uuid::try_from_slice_le(&data[5..]).ok_or(TransportError::InvalidPdu)?;

        Ok(Self {
            start_handle,
            end_handle,
            attribute_type,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(21);
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.start_handle.to_le_bytes());
        packet.extend_from_slice(&self.end_handle.to_le_bytes());
        match self.attribute_type.as_u16() {
            Some(short) => packet.extend_from_slice(&short.to_le_bytes()),
            None => packet.extend_from_slice(self.attribute_type.as_bytes_le()),
        }
        packet
    }
}

/// A handle-value pair in a Read By Type Response
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeData {
    pub handle: u16,
    pub value: Vec<u8>,
}

/// Read By Type Response packet
#[derive(Debug, Clone, PartialEq)]
pub struct ReadByTypeResponse {
    pub data: Vec<AttributeData>,
}

impl AttPacket for ReadByTypeResponse {
    fn opcode() -> u8 {
        ATT_READ_BY_TYPE_RSP
    }

    fn parse(data: &[u8]) -> PduResult<Self> {
        check_opcode::<Self>(data, 2)?;

        // Every entry is a 2-byte handle followed by `length - 2` value bytes
        let length = data[1] as usize;
        if length < 2 {
            return Err(TransportError::InvalidPdu);
        }

        let entries = &data[2..];
        if entries.is_empty() || entries.len() % length != 0 {
            return Err(TransportError::InvalidPdu);
        }

        let data = entries
            .chunks(length)
            .map(|chunk| AttributeData {
                handle: u16::from_le_bytes([chunk[0], chunk[1]]),
                value: chunk[2..].to_vec(),
            })
            .collect();

        Ok(Self { data })
    }

    fn serialize(&self) -> Vec<u8> {
        let length = self.data.first().map(|d| d.value.len() + 2).unwrap_or(2);
        let mut packet = vec![Self::opcode(), length as u8];
        for item in &self.data {
            packet.extend_from_slice(&item.handle.to_le_bytes());
            packet.extend_from_slice(&item.value);
        }
        packet
    }
}

/// Read Request packet
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRequest {
    pub handle: u16,
}

impl AttPacket for ReadRequest {
    fn opcode() -> u8 {
        ATT_READ_REQ
    }

    fn parse(data: &[u8]) -> PduResult<Self> {
        check_opcode::<Self>(data, 3)?;
        let mut cursor = Cursor::new(&data[1..]);
        let handle = read_handle(&mut cursor)?;
        Ok(Self { handle })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3);
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet
    }
}

/// Read Response packet
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResponse {
    pub value: Vec<u8>,
}

impl AttPacket for ReadResponse {
    fn opcode() -> u8 {
        ATT_READ_RSP
    }

    fn parse(data: &[u8]) -> PduResult<Self> {
        check_opcode::<Self>(data, 1)?;
        Ok(Self {
            value: data[1..].to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(1 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Write Request packet
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub handle: u16,
    pub value: Vec<u8>,
}

impl AttPacket for WriteRequest {
    fn opcode() -> u8 {
        ATT_WRITE_REQ
    }

    fn parse(data: &[u8]) -> PduResult<Self> {
        check_opcode::<Self>(data, 3)?;
        let mut cursor = Cursor::new(&data[1..]);
        let handle = read_handle(&mut cursor)?;
        Ok(Self {
            handle,
            value: data[3..].to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Write Response packet
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResponse;

impl AttPacket for WriteResponse {
    fn opcode() -> u8 {
        ATT_WRITE_RSP
    }

    fn parse(data: &[u8]) -> PduResult<Self> {
        check_opcode::<Self>(data, 1)?;
        Ok(Self)
    }

    fn serialize(&self) -> Vec<u8> {
        vec![Self::opcode()]
    }
}

/// Handle Value Notification packet
#[derive(Debug, Clone, PartialEq)]
pub struct HandleValueNotification {
    pub handle: u16,
    pub value: Vec<u8>,
}

impl AttPacket for HandleValueNotification {
    fn opcode() -> u8 {
        ATT_HANDLE_VALUE_NTF
    }

    fn parse(data: &[u8]) -> PduResult<Self> {
        check_opcode::<Self>(data, 3)?;
        let mut cursor = Cursor::new(&data[1..]);
        let handle = read_handle(&mut cursor)?;
        Ok(Self {
            handle,
            value: data[3..].to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Handle Value Confirmation packet, sent back for every indication
#[derive(Debug, Clone, PartialEq)]
pub struct HandleValueConfirmation;

impl AttPacket for HandleValueConfirmation {
    fn opcode() -> u8 {
        ATT_HANDLE_VALUE_CONF
    }

    fn parse(data: &[u8]) -> PduResult<Self> {
        check_opcode::<Self>(data, 1)?;
        Ok(Self)
    }

    fn serialize(&self) -> Vec<u8> {
        vec![Self::opcode()]
    }
}
