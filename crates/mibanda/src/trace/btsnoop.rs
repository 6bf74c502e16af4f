//! btsnoop capture reader
//!
//! The btsnoop format is a 16-byte file header followed by records, each a
//! 24-byte big-endian header and the captured bytes:
//!
//! ```text
//! header:  "btsnoop\0" | version: u32 | datalink: u32
//! record:  original length: u32 | included length: u32 | flags: u32 |
//!          cumulative drops: u32 | timestamp (us since year 0): i64 | data
//! ```

use crate::error::CaptureError;
use bitflags::bitflags;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read};

pub const BTSNOOP_MAGIC: &[u8; 8] = b"btsnoop\0";
pub const BTSNOOP_VERSION: u32 = 1;

const FILE_HEADER_LEN: usize = 16;
const RECORD_HEADER_LEN: usize = 24;

/// Microseconds between year 0 and the Unix epoch
const UNIX_EPOCH_OFFSET_US: i64 = 0x00dc_ddb3_0f2f_8000;

/// Largest record we are willing to allocate for
const MAX_RECORD_LEN: u32 = 64 * 1024;

/// Link type of the captured bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datalink {
    /// Un-encapsulated HCI; the packet type lives in the record flags
    Hci,
    /// HCI UART (H4); every record starts with the packet type byte
    H4,
}

impl TryFrom<u32> for Datalink {
    type Error = CaptureError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1001 => Ok(Datalink::Hci),
            1002 => Ok(Datalink::H4),
            other => Err(CaptureError::UnsupportedDatalink(other)),
        }
    }
}

bitflags! {
    /// Per-record direction and type flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PacketFlags: u32 {
        /// Controller to host; unset means host to controller
        const RECEIVED = 0x01;
        /// Command or event rather than data
        const COMMAND_OR_EVENT = 0x02;
    }
}

/// One captured packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BtsnoopRecord {
    pub original_length: u32,
    pub flags: PacketFlags,
    pub drops: u32,
    /// Microseconds since midnight, January 1st of year 0
    pub timestamp: i64,
    pub data: Vec<u8>,
}

impl BtsnoopRecord {
    /// Timestamp in microseconds since the Unix epoch
    pub fn unix_micros(&self) -> i64 {
        self.timestamp - UNIX_EPOCH_OFFSET_US
    }

    /// Whether the capture cut this packet short
    pub fn is_truncated(&self) -> bool {
        (self.data.len() as u32) < self.original_length
    }
}

/// Reads records from a btsnoop capture
#[derive(Debug)]
pub struct BtsnoopReader<R> {
    reader: R,
    datalink: Datalink,
    done: bool,
}

impl<R: Read> BtsnoopReader<R> {
    /// Validate the file header and position the reader on the first record
    pub fn new(mut reader: R) -> Result<Self, CaptureError> {
        let mut header = [0u8; FILE_HEADER_LEN];
        if fill(&mut reader, &mut header)? < FILE_HEADER_LEN {
            return Err(CaptureError::BadMagic);
        }

        if &header[..8] != BTSNOOP_MAGIC {
            return Err(CaptureError::BadMagic);
        }

        let mut fields = &header[8..];
        let version = fields.read_u32::<BigEndian>()?;
        if version != BTSNOOP_VERSION {
            return Err(CaptureError::UnsupportedVersion(version));
        }
        let datalink = Datalink::try_from(fields.read_u32::<BigEndian>()?)?;

        Ok(Self {
            reader,
            datalink,
            done: false,
        })
    }

    pub fn datalink(&self) -> Datalink {
        self.datalink
    }

    /// Read the next record, or `None` at a clean end of file
    pub fn read_record(&mut self) -> Result<Option<BtsnoopRecord>, CaptureError> {
        let mut header = [0u8; RECORD_HEADER_LEN];
        match fill(&mut self.reader, &mut header)? {
            0 => return Ok(None),
            RECORD_HEADER_LEN => {}
            _ => return Err(CaptureError::Truncated),
        }

        let mut fields = &header[..];
        let original_length = fields.read_u32::<BigEndian>()?;
        let included_length = fields.read_u32::<BigEndian>()?;
        let flags = PacketFlags::from_bits_retain(fields.read_u32::<BigEndian>()?);
        let drops = fields.read_u32::<BigEndian>()?;
        let timestamp = fields.read_i64::<BigEndian>()?;

        if included_length > MAX_RECORD_LEN {
            return Err(CaptureError::Truncated);
        }

        let mut data = vec![0u8; included_length as usize];
        if fill(&mut self.reader, &mut data)? < data.len() {
            return Err(CaptureError::Truncated);
        }

        Ok(Some(BtsnoopRecord {
            original_length,
            flags,
            drops,
            timestamp,
            data,
        }))
    }
}

impl<R: Read> Iterator for BtsnoopReader<R> {
    type Item = Result<BtsnoopRecord, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// Read until `buf` is full or the reader is exhausted
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
