//! Trace classifier
//!
//! Turns a stream of captured packets into display events. Each packet yields
//! at most one event. The stream ends early on an unknown ATT opcode, on a
//! packet that is neither command, event nor ATT, and after a notification on
//! a handle the registry does not know.

use super::packet::CapturedPacket;
use crate::att::*;
use crate::band::registry::{HandleName, HandleRegistry};
use crate::hci::constants::*;
use crate::hci::opcode;
use std::fmt;

/// HCI LE Create Connection
pub const CREATE_CONNECTION: u16 = opcode(OGF_LE, OCF_LE_CREATE_CONNECTION);
/// HCI Disconnect
pub const DISCONNECT: u16 = opcode(OGF_LINK_CTL, OCF_DISCONNECT);

/// Width the handle name is padded to in write and notify lines
const NAME_WIDTH: usize = 24;

/// A display event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    ConnectionOpened,
    ConnectionClosed,
    Read { name: HandleName },
    ReadResult { value: Vec<u8> },
    Write { name: HandleName, value: Vec<u8> },
    Notify { name: HandleName, value: Vec<u8> },
    ProtocolError { opcode: u8 },
    UnknownPacket,
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::ConnectionOpened => write!(f, "#### Create Connection ######"),
            TraceEvent::ConnectionClosed => write!(f, "#### End Connection ######"),
            TraceEvent::Read { name } => write!(f, "r {}", name),
            TraceEvent::ReadResult { value } => write!(f, "  -> {}", hex::encode(value)),
            TraceEvent::Write { name, value } => {
                write!(f, "w {:<width$} -> {}", name, hex::encode(value), width = NAME_WIDTH)
            }
            TraceEvent::Notify { name, value } => {
                write!(f, "n {:<width$} -> {}", name, hex::encode(value), width = NAME_WIDTH)
            }
            TraceEvent::ProtocolError { .. } => write!(f, "Unknown operation code"),
            TraceEvent::UnknownPacket => write!(f, "Unknown packet type"),
        }
    }
}

/// Whether the classifier should look at further packets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Classify a single packet
pub fn classify(packet: &CapturedPacket, registry: &HandleRegistry) -> (Option<TraceEvent>, Flow) {
    match packet {
        CapturedPacket::Command { opcode } => match *opcode {
            CREATE_CONNECTION => (Some(TraceEvent::ConnectionOpened), Flow::Continue),
            DISCONNECT => (Some(TraceEvent::ConnectionClosed), Flow::Continue),
            _ => (None, Flow::Continue),
        },

        CapturedPacket::Event { .. } => (None, Flow::Continue),

        CapturedPacket::Attribute {
            opcode,
            handle,
            value,
        } => classify_attribute(*opcode, *handle, value, registry),

        CapturedPacket::Other => (Some(TraceEvent::UnknownPacket), Flow::Stop),
    }
}

fn classify_attribute(
    opcode: u8,
    handle: Option<u16>,
    value: &[u8],
    registry: &HandleRegistry,
) -> (Option<TraceEvent>, Flow) {
    let protocol_error = (Some(TraceEvent::ProtocolError { opcode }), Flow::Stop);

    match opcode {
        ATT_ERROR_RSP
        | ATT_FIND_INFO_REQ
        | ATT_FIND_INFO_RSP
        | ATT_READ_BY_TYPE_REQ
        | ATT_READ_BY_TYPE_RSP
        | ATT_READ_BY_GROUP_TYPE_REQ
        | ATT_READ_BY_GROUP_TYPE_RSP
        | ATT_WRITE_RSP => (None, Flow::Continue),

        ATT_READ_REQ => match handle {
            Some(handle) => (
                Some(TraceEvent::Read {
                    name: registry.resolve_name(handle),
                }),
                Flow::Continue,
            ),
            None => protocol_error,
        },

        ATT_READ_RSP => (
            Some(TraceEvent::ReadResult {
                value: value.to_vec(),
            }),
            Flow::Continue,
        ),

        ATT_WRITE_REQ => match handle {
            Some(handle) => (
                Some(TraceEvent::Write {
                    name: registry.resolve_name(handle),
                    value: value.to_vec(),
                }),
                Flow::Continue,
            ),
            None => protocol_error,
        },

        ATT_HANDLE_VALUE_NTF => match handle {
            Some(handle) => {
                let name = registry.resolve_name(handle);
                // A notification on an unregistered handle ends the trace
                let flow = if name.is_symbolic() {
                    Flow::Continue
                } else {
                    Flow::Stop
                };
                (
                    Some(TraceEvent::Notify {
                        name,
                        value: value.to_vec(),
                    }),
                    flow,
                )
            }
            None => protocol_error,
        },

        _ => protocol_error,
    }
}

/// Lazy, non-restartable sequence of [`TraceEvent`]s over a packet stream
#[derive(Debug)]
pub struct TraceClassifier<'r, I> {
    packets: I,
    registry: &'r HandleRegistry,
    done: bool,
}

impl<'r, I> TraceClassifier<'r, I>
where
    I: Iterator<Item = CapturedPacket>,
{
    pub fn new<P>(packets: P, registry: &'r HandleRegistry) -> Self
    where
        P: IntoIterator<IntoIter = I>,
    {
        Self {
            packets: packets.into_iter(),
            registry,
            done: false,
        }
    }
}

impl<I> Iterator for TraceClassifier<'_, I>
where
    I: Iterator<Item = CapturedPacket>,
{
    type Item = TraceEvent;

    fn next(&mut self) -> Option<TraceEvent> {
        while !self.done {
            let packet = self.packets.next()?;
            let (event, flow) = classify(&packet, self.registry);
            if flow == Flow::Stop {
                self.done = true;
            }
            if event.is_some() {
                return event;
            }
        }
        None
    }
}
