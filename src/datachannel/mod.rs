//! Data channel subsystem (spec §3 "DataChannel", §4.5, §6.2).

pub mod channel;
pub mod dcep;
pub mod manager;
mod operations;

pub use channel::{DataChannel, DataChannelEvent, DataChannelInit, ReadyState, Reliability};
pub use manager::{DataChannelManager, IdParity};

use crate::error::DataChannelError;

/// Selects the PPID for an outgoing message per spec §4.5.5: "empty string
/// → 57; empty binary → 56; non-empty string → 51; non-empty binary → 53".
#[must_use]
pub fn ppid_for_send(is_string: bool, is_empty: bool) -> u32 {
    match (is_string, is_empty) {
        (true, true) => dcep::PPID_STRING_EMPTY,
        (true, false) => dcep::PPID_STRING,
        (false, true) => dcep::PPID_BINARY_EMPTY,
        (false, false) => dcep::PPID_BINARY,
    }
}

/// The decoded form of one inbound SCTP message, dispatched per spec
/// §4.5.6.
#[derive(Clone, Debug)]
pub enum InboundMessage {
    String(Option<String>),
    Data(Option<Vec<u8>>),
}

/// Dispatches an inbound (buffer, ppid) pair per spec §4.5.6, excluding the
/// PPID-50 control path (handled separately since it needs channel-level
/// DCEP state, not just the bytes).
pub fn decode_inbound(ppid: u32, buf: &[u8]) -> Result<InboundMessage, DataChannelError> {
    match ppid {
        dcep::PPID_STRING | dcep::PPID_STRING_PARTIAL_LEGACY => {
            let s = std::str::from_utf8(buf)
                .map_err(|e| DataChannelError::Protocol(format!("non-UTF-8 message: {}", e)))?;
            Ok(InboundMessage::String(Some(s.to_string())))
        }
        dcep::PPID_BINARY | dcep::PPID_BINARY_PARTIAL_LEGACY => {
            Ok(InboundMessage::Data(Some(buf.to_vec())))
        }
        dcep::PPID_STRING_EMPTY => Ok(InboundMessage::String(None)),
        dcep::PPID_BINARY_EMPTY => Ok(InboundMessage::Data(None)),
        other => Err(DataChannelError::Protocol(format!(
            "unknown PPID: {}",
            other
        ))),
    }
}
