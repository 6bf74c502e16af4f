//! HCI Socket implementation for Bluetooth communication
//!
//! This module provides a wrapper around the raw HCI socket interface,
//! allowing for communication with Bluetooth controllers.

use crate::error::HciError;
use crate::gap::BdAddr;
use crate::hci::constants::*;
use crate::hci::packet::{HciCommand, HciEvent};
use log::trace;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::{Duration, Instant};

// Bluetooth socket constants
const AF_BLUETOOTH: i32 = 31;
const BTPROTO_HCI: i32 = 1;
const HCI_CHANNEL_RAW: i32 = 0;
const SOL_HCI: i32 = 0;
const HCI_FILTER: i32 = 2;

/// How long to wait for a Command Complete
const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Represents an HCI socket
#[derive(Debug)]
pub struct HciSocket {
    fd: RawFd,
}

// Define the sockaddr_hci structure
#[repr(C)]
struct SockaddrHci {
    hci_family: libc::sa_family_t,
    hci_dev: u16,
    hci_channel: u16,
}

// Mirrors struct hci_ufilter
#[repr(C)]
#[derive(Default)]
struct HciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl HciFilter {
    fn events(events: &[u8]) -> Self {
        let mut filter = HciFilter {
            type_mask: 1 << (HCI_EVENT_PKT & 31),
            ..Default::default()
        };
        for &event in events {
            filter.event_mask[(event >> 5) as usize] |= 1 << (event & 31);
        }
        filter
    }
}

impl HciSocket {
    /// Opens a new HCI socket
    ///
    /// # Arguments
    ///
    /// * `dev_id` - The device ID to open (0 for the first device)
    pub fn open(dev_id: u16) -> Result<Self, HciError> {
        // Open a raw HCI socket
        let fd = unsafe { libc::socket(AF_BLUETOOTH, libc::SOCK_RAW, BTPROTO_HCI) };

        if fd < 0 {
            return Err(HciError::SocketError(std::io::Error::last_os_error()));
        }

        // Bind to the specified device
        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as libc::sa_family_t,
            hci_dev: dev_id,
            hci_channel: HCI_CHANNEL_RAW as u16,
        };

        let result = unsafe {
            libc::bind(
                fd,
                &addr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<SockaddrHci>() as libc::socklen_t,
            )
        };

        if result < 0 {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(HciError::BindError(err));
        }

        Ok(HciSocket { fd })
    }

    /// Only deliver the given event codes to this socket
    pub fn set_event_filter(&self, events: &[u8]) -> Result<(), HciError> {
        let filter = HciFilter::events(events);
        let result = unsafe {
            libc::setsockopt(
                self.fd,
                SOL_HCI,
                HCI_FILTER,
                &filter as *const _ as *const libc::c_void,
                std::mem::size_of::<HciFilter>() as libc::socklen_t,
            )
        };

        if result < 0 {
            return Err(HciError::FilterError(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Read an HCI event from the socket
    pub fn read_event(&self) -> Result<HciEvent, HciError> {
        let mut buffer = [0u8; HCI_MAX_EVENT_SIZE];

        let bytes_read = unsafe {
            libc::read(
                self.fd,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
            )
        };

        if bytes_read < 0 {
            return Err(HciError::ReceiveError(std::io::Error::last_os_error()));
        }

        if bytes_read < 3 || buffer[0] != HCI_EVENT_PKT {
            return Err(HciError::InvalidPacketFormat);
        }

        trace!("HCI < {}", hex::encode(&buffer[..bytes_read as usize]));
        HciEvent::parse(&buffer[1..bytes_read as usize]).ok_or(HciError::InvalidPacketFormat)
    }

    /// Read an HCI event from the socket, waiting at most `timeout`
    pub fn read_event_timeout(&self, timeout: Duration) -> Result<HciEvent, HciError> {
        // Set up the fd_set for select()
        let mut read_fds: libc::fd_set = unsafe { std::mem::zeroed() };
        unsafe {
            libc::FD_ZERO(&mut read_fds);
            libc::FD_SET(self.fd, &mut read_fds);
        }

        let mut timeout_val = libc::timeval {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        };

        // Wait for data to be available
        let result = unsafe {
            libc::select(
                self.fd + 1,
                &mut read_fds,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                &mut timeout_val,
            )
        };

        if result < 0 {
            return Err(HciError::ReceiveError(std::io::Error::last_os_error()));
        }

        if result == 0 {
            return Err(HciError::Timeout);
        }

        self.read_event()
    }

    /// Sends an HCI command to the controller
    pub fn send_command(&self, command: &HciCommand) -> Result<(), HciError> {
        let packet = command.to_packet();
        trace!("HCI > {}", hex::encode(&packet));
        match unsafe {
            libc::write(
                self.fd,
                packet.as_ptr() as *const libc::c_void,
                packet.len(),
            )
        } {
            -1 => Err(HciError::SendError(std::io::Error::last_os_error())),
            _ => Ok(()),
        }
    }

    /// Send a command and wait for its Command Complete event
    pub fn execute(&self, command: &HciCommand) -> Result<HciEvent, HciError> {
        self.set_event_filter(&[EVT_CMD_COMPLETE, EVT_CMD_STATUS])?;
        self.send_command(command)?;

        let deadline = Instant::now() + COMMAND_TIMEOUT;
        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or(HciError::Timeout)?;
            let event = self.read_event_timeout(remaining)?;
            if event.is_command_complete(command.opcode()) {
                return Ok(event);
            }
        }
    }

    /// Read the controller's public address
    pub fn read_bd_addr(&self) -> Result<BdAddr, HciError> {
        let event = self.execute(&HciCommand::ReadBdAddr)?;
        if event.command_status() != Some(0) {
            return Err(HciError::InvalidPacketFormat);
        }
        BdAddr::from_slice(event.return_parameters()).ok_or(HciError::InvalidPacketFormat)
    }
}

impl AsRawFd for HciSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for HciSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
