//! L2CAP ATT socket transport
//!
//! Opens a `SOCK_SEQPACKET` L2CAP socket on the LE ATT fixed channel and speaks
//! plain request/response ATT over it. Each call blocks until the matching
//! response arrives or the receive timeout fires.

use super::{GattTransport, SecurityLevel, SessionConfig};
use crate::att::*;
use crate::error::TransportError;
use crate::gap::{AddressType, BdAddr};
use crate::hci::HciSocket;
use crate::uuid::Uuid;
use log::{debug, trace, warn};
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

// Bluetooth socket constants
const AF_BLUETOOTH: i32 = 31;
const BTPROTO_L2CAP: i32 = 0;
const SOL_BLUETOOTH: i32 = 274;
const BT_SECURITY: i32 = 4;

const BDADDR_LE_PUBLIC: u8 = 0x01;
const BDADDR_LE_RANDOM: u8 = 0x02;

/// Largest PDU the band can send us
const ATT_MAX_PDU: usize = 517;

#[repr(C)]
struct SockaddrL2 {
    l2_family: libc::sa_family_t,
    l2_psm: u16,
    l2_bdaddr: [u8; 6],
    l2_cid: u16,
    l2_bdaddr_type: u8,
}

impl SockaddrL2 {
    fn att(bdaddr: [u8; 6], bdaddr_type: u8) -> Self {
        Self {
            l2_family: AF_BLUETOOTH as libc::sa_family_t,
            l2_psm: 0,
            l2_bdaddr: bdaddr,
            l2_cid: ATT_CID.to_le(),
            l2_bdaddr_type: bdaddr_type,
        }
    }
}

#[repr(C)]
struct BtSecurity {
    level: u8,
    key_size: u8,
}

impl From<SecurityLevel> for u8 {
    fn from(level: SecurityLevel) -> Self {
        match level {
            SecurityLevel::Low => 1,
            SecurityLevel::Medium => 2,
            SecurityLevel::High => 3,
        }
    }
}

/// A connected ATT bearer to one remote device
#[derive(Debug)]
pub struct AttSocket {
    fd: RawFd,
    address: BdAddr,
}

impl AttSocket {
    /// Connect to a device's ATT server.
    ///
    /// Adapter 0 lets the kernel pick the route; any other adapter index is
    /// resolved to its public address and bound explicitly.
    pub fn connect(address: BdAddr, config: &SessionConfig) -> Result<Self, TransportError> {
        let source = if config.adapter == 0 {
            [0u8; 6]
        } else {
            HciSocket::open(config.adapter)
                .and_then(|socket| socket.read_bd_addr())
                .map_err(|e| TransportError::Bind(std::io::Error::other(e.to_string())))?
                .bytes
        };

        let fd = unsafe { libc::socket(AF_BLUETOOTH, libc::SOCK_SEQPACKET, BTPROTO_L2CAP) };
        if fd < 0 {
            return Err(TransportError::Socket(std::io::Error::last_os_error()));
        }

        // Owning the fd from here on closes it on every early return
        let socket = AttSocket { fd, address };

        let local = SockaddrL2::att(source, BDADDR_LE_PUBLIC);
        let result = unsafe {
            libc::bind(
                fd,
                &local as *const _ as *const libc::sockaddr,
                std::mem::size_of::<SockaddrL2>() as libc::socklen_t,
            )
        };
        if result < 0 {
            return Err(TransportError::Bind(std::io::Error::last_os_error()));
        }

        socket.set_security(config.security)?;
        socket.set_timeout(config.timeout)?;

        let remote_type = match config.address_type {
            AddressType::Public => BDADDR_LE_PUBLIC,
            AddressType::Random => BDADDR_LE_RANDOM,
        };
        let remote = SockaddrL2::att(address.bytes, remote_type);

        debug!("Connecting to {} on hci{}", address, config.adapter);
        let result = unsafe {
            libc::connect(
                fd,
                &remote as *const _ as *const libc::sockaddr,
                std::mem::size_of::<SockaddrL2>() as libc::socklen_t,
            )
        };
        if result < 0 {
            return Err(TransportError::Connect {
                address: address.to_string(),
                source: std::io::Error::last_os_error(),
            });
        }

        Ok(socket)
    }

    /// Address of the connected device
    pub fn address(&self) -> BdAddr {
        self.address
    }

    fn set_security(&self, level: SecurityLevel) -> Result<(), TransportError> {
        let security = BtSecurity {
            level: level.into(),
            key_size: 0,
        };
        let result = unsafe {
            libc::setsockopt(
                self.fd,
                SOL_BLUETOOTH,
                BT_SECURITY,
                &security as *const _ as *const libc::c_void,
                std::mem::size_of::<BtSecurity>() as libc::socklen_t,
            )
        };
        if result < 0 {
            return Err(TransportError::Socket(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    fn set_timeout(&self, timeout: Duration) -> Result<(), TransportError> {
        let timeout_val = libc::timeval {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        };
        let result = unsafe {
            libc::setsockopt(
                self.fd,
                libc::SOL_SOCKET,
                libc::SO_RCVTIMEO,
                &timeout_val as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::timeval>() as libc::socklen_t,
            )
        };
        if result < 0 {
            return Err(TransportError::Socket(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    fn send(&self, pdu: &[u8]) -> Result<(), TransportError> {
        trace!("ATT > {}", hex::encode(pdu));
        let written =
            unsafe { libc::send(self.fd, pdu.as_ptr() as *const libc::c_void, pdu.len(), 0) };
        if written < 0 {
            return Err(TransportError::Send(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    fn receive(&self) -> Result<Vec<u8>, TransportError> {
        let mut buffer = [0u8; ATT_MAX_PDU];
        let read = unsafe {
            libc::recv(
                self.fd,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
                0,
            )
        };

        if read < 0 {
            let err = std::io::Error::last_os_error();
            return match err.kind() {
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
                    Err(TransportError::Timeout)
                }
                _ => Err(TransportError::Receive(err)),
            };
        }
        if read == 0 {
            return Err(TransportError::Disconnected);
        }

        let pdu = buffer[..read as usize].to_vec();
        trace!("ATT < {}", hex::encode(&pdu));
        Ok(pdu)
    }

    /// Send a request and wait for the response with the `expected` opcode
    fn transact(&self, request: &[u8], expected: u8) -> Result<Vec<u8>, TransportError> {
        self.send(request)?;

        loop {
            let pdu = self.receive()?;
            let opcode = *pdu.first().ok_or(TransportError::InvalidPdu)?;

            match opcode {
                op if op == expected => return Ok(pdu),
                ATT_ERROR_RSP => return Err(ErrorResponse::parse(&pdu)?.into()),
                ATT_HANDLE_VALUE_NTF => {
                    let ntf = HandleValueNotification::parse(&pdu)?;
                    debug!("Skipping notification on handle 0x{:04x}", ntf.handle);
                }
                ATT_HANDLE_VALUE_IND => {
                    self.send(&HandleValueConfirmation.serialize())?;
                }
                ATT_EXCHANGE_MTU_REQ => {
                    let mut rsp = vec![ATT_EXCHANGE_MTU_RSP];
                    rsp.extend_from_slice(&ATT_DEFAULT_MTU.to_le_bytes());
                    self.send(&rsp)?;
                }
                other => {
                    warn!("Unexpected ATT opcode 0x{:02x} while waiting for 0x{:02x}", other, expected);
                    return Err(TransportError::UnexpectedResponse(other));
                }
            }
        }
    }
}

impl GattTransport for AttSocket {
    fn read_by_uuid(&mut self, uuid: &Uuid) -> Result<Vec<Vec<u8>>, TransportError> {
        let request = ReadByTypeRequest::all(*uuid);
        let pdu = self.transact(&request.serialize(), ReadByTypeResponse::opcode())?;
        let response = ReadByTypeResponse::parse(&pdu)?;
        Ok(response.data.into_iter().map(|d| d.value).collect())
    }

    fn read_by_handle(&mut self, handle: u16) -> Result<Vec<u8>, TransportError> {
        let request = ReadRequest { handle };
        let pdu = self.transact(&request.serialize(), ReadResponse::opcode())?;
        Ok(ReadResponse::parse(&pdu)?.value)
    }

    fn write_by_handle(&mut self, handle: u16, value: &[u8]) -> Result<(), TransportError> {
        if value.len() > ATT_DEFAULT_MTU as usize - 3 {
            return Err(TransportError::Att {
                code: AttErrorCode::InvalidAttributeValueLength,
                handle,
            });
        }

        let request = WriteRequest {
            handle,
            value: value.to_vec(),
        };
        let pdu = self.transact(&request.serialize(), WriteResponse::opcode())?;
        WriteResponse::parse(&pdu)?;
        Ok(())
    }
}

impl AsRawFd for AttSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for AttSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
