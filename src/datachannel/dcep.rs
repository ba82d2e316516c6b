//! DCEP control frame codec (spec §4.5.2, §6.2, bit-exact).

use crate::error::DataChannelError;

/// DCEP `message-type` for an OPEN frame.
const MESSAGE_TYPE_OPEN: u8 = 0x03;
/// DCEP ACK frame: a single byte.
const MESSAGE_TYPE_ACK: u8 = 0x02;

const CHANNEL_TYPE_UNORDERED_BIT: u8 = 0x80;
const CHANNEL_TYPE_RELIABLE: u8 = 0x00;
const CHANNEL_TYPE_PARTIAL_RELIABLE_REXMIT: u8 = 0x01;
const CHANNEL_TYPE_PARTIAL_RELIABLE_TIMED: u8 = 0x02;

/// PPID carrying DCEP control messages (spec §4.5.3).
pub const PPID_CONTROL: u32 = 50;
/// Non-empty UTF-8 string.
pub const PPID_STRING: u32 = 51;
/// Non-empty binary.
pub const PPID_BINARY: u32 = 53;
/// Empty binary.
pub const PPID_BINARY_EMPTY: u32 = 56;
/// Empty string.
pub const PPID_STRING_EMPTY: u32 = 57;
/// Legacy partial-binary, accepted on receive only.
pub const PPID_BINARY_PARTIAL_LEGACY: u32 = 52;
/// Legacy partial-string, accepted on receive only.
pub const PPID_STRING_PARTIAL_LEGACY: u32 = 54;

/// Channel priority, mapped to/from the DCEP `priority` field (spec
/// §4.5.2).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Priority {
    VeryLow,
    Low,
    Medium,
    High,
}

impl Priority {
    #[must_use]
    pub fn to_wire(self) -> u16 {
        match self {
            Self::VeryLow => 64,
            Self::Low => 192,
            Self::Medium => 384,
            Self::High => 768,
        }
    }

    /// `1..128 → very-low, 129..256 → low, 257..512 → medium, 513+ → high`
    /// (spec §4.5.2 "Parsing reverses").
    #[must_use]
    pub fn from_wire(value: u16) -> Self {
        match value {
            0..=128 => Self::VeryLow,
            129..=256 => Self::Low,
            257..=512 => Self::Medium,
            _ => Self::High,
        }
    }
}

/// Reliability as carried on the wire: ordering plus at most one of
/// max-retransmits/max-packet-lifetime (spec §3 "DataChannel").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reliability {
    Reliable,
    PartialReliableRexmit(u32),
    PartialReliableTimed(u32),
}

/// A parsed (or to-be-serialised) DCEP OPEN message (spec §4.5.2).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DcepOpen {
    pub unordered: bool,
    pub reliability: Reliability,
    pub priority: Priority,
    pub label: String,
    pub protocol: String,
}

impl DcepOpen {
    /// Serialises this OPEN exactly per spec §4.5.2's layout table.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let (type_bits, reliability_parameter) = match self.reliability {
            Reliability::Reliable => (CHANNEL_TYPE_RELIABLE, 0u32),
            Reliability::PartialReliableRexmit(n) => {
                (CHANNEL_TYPE_PARTIAL_RELIABLE_REXMIT, n)
            }
            Reliability::PartialReliableTimed(n) => {
                (CHANNEL_TYPE_PARTIAL_RELIABLE_TIMED, n)
            }
        };
        let channel_type = if self.unordered {
            type_bits | CHANNEL_TYPE_UNORDERED_BIT
        } else {
            type_bits
        };

        let label = self.label.as_bytes();
        let protocol = self.protocol.as_bytes();

        let mut buf = Vec::with_capacity(12 + label.len() + protocol.len());
        buf.push(MESSAGE_TYPE_OPEN);
        buf.push(channel_type);
        buf.extend_from_slice(&self.priority.to_wire().to_be_bytes());
        buf.extend_from_slice(&reliability_parameter.to_be_bytes());
        buf.extend_from_slice(&(label.len() as u16).to_be_bytes());
        buf.extend_from_slice(&(protocol.len() as u16).to_be_bytes());
        buf.extend_from_slice(label);
        buf.extend_from_slice(protocol);
        buf
    }

    /// Parses a DCEP OPEN frame, reversing [`DcepOpen::encode`] exactly.
    pub fn decode(buf: &[u8]) -> Result<Self, DataChannelError> {
        if buf.len() < 12 {
            return Err(DataChannelError::Protocol(format!(
                "DCEP OPEN too short: {} bytes",
                buf.len()
            )));
        }
        if buf[0] != MESSAGE_TYPE_OPEN {
            return Err(DataChannelError::Protocol(format!(
                "not a DCEP OPEN: message-type {:#x}",
                buf[0]
            )));
        }
        let channel_type = buf[1];
        let unordered = channel_type & CHANNEL_TYPE_UNORDERED_BIT != 0;
        let reliability_bits = channel_type & !CHANNEL_TYPE_UNORDERED_BIT;

        let priority = Priority::from_wire(u16::from_be_bytes([buf[2], buf[3]]));
        let reliability_parameter = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let label_len = u16::from_be_bytes([buf[8], buf[9]]) as usize;
        let protocol_len = u16::from_be_bytes([buf[10], buf[11]]) as usize;

        let label_start = 12;
        let protocol_start = label_start + label_len;
        let protocol_end = protocol_start + protocol_len;
        if buf.len() < protocol_end {
            return Err(DataChannelError::Protocol(format!(
                "DCEP OPEN truncated: expected {} bytes, got {}",
                protocol_end,
                buf.len()
            )));
        }

        let label = std::str::from_utf8(&buf[label_start..protocol_start])
            .map_err(|e| DataChannelError::Protocol(format!("non-UTF-8 label: {}", e)))?
            .to_string();
        let protocol = std::str::from_utf8(&buf[protocol_start..protocol_end])
            .map_err(|e| DataChannelError::Protocol(format!("non-UTF-8 protocol: {}", e)))?
            .to_string();

        let reliability = match reliability_bits {
            CHANNEL_TYPE_RELIABLE => Reliability::Reliable,
            CHANNEL_TYPE_PARTIAL_RELIABLE_REXMIT => {
                Reliability::PartialReliableRexmit(reliability_parameter)
            }
            CHANNEL_TYPE_PARTIAL_RELIABLE_TIMED => {
                Reliability::PartialReliableTimed(reliability_parameter)
            }
            other => {
                return Err(DataChannelError::Protocol(format!(
                    "unknown DCEP channel-type: {:#x}",
                    other
                )))
            }
        };

        Ok(Self {
            unordered,
            reliability,
            priority,
            label,
            protocol,
        })
    }
}

/// Serialises a DCEP ACK: a single `0x02` byte (spec §4.5.2).
#[must_use]
pub fn encode_ack() -> Vec<u8> {
    vec![MESSAGE_TYPE_ACK]
}

/// Recognises a DCEP ACK frame.
#[must_use]
pub fn is_ack(buf: &[u8]) -> bool {
    buf.len() == 1 && buf[0] == MESSAGE_TYPE_ACK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_the_chat_example_from_the_scenario_table() {
        let open = DcepOpen {
            unordered: false,
            reliability: Reliability::Reliable,
            priority: Priority::Low,
            label: "chat".into(),
            protocol: String::new(),
        };
        let encoded = open.encode();
        assert_eq!(
            encoded,
            vec![0x03, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, b'c', b'h', b'a', b't']
        );
    }

    #[test]
    fn round_trips_open() {
        let open = DcepOpen {
            unordered: true,
            reliability: Reliability::PartialReliableRexmit(5),
            priority: Priority::High,
            label: "label".into(),
            protocol: "proto".into(),
        };
        let encoded = open.encode();
        let decoded = DcepOpen::decode(&encoded).unwrap();
        assert_eq!(open, decoded);
    }

    #[test]
    fn ack_is_a_single_byte() {
        let ack = encode_ack();
        assert_eq!(ack, vec![0x02]);
        assert!(is_ack(&ack));
    }

    #[test]
    fn priority_round_trips_at_band_boundaries() {
        assert_eq!(Priority::from_wire(Priority::VeryLow.to_wire()), Priority::VeryLow);
        assert_eq!(Priority::from_wire(Priority::Low.to_wire()), Priority::Low);
        assert_eq!(Priority::from_wire(Priority::Medium.to_wire()), Priority::Medium);
        assert_eq!(Priority::from_wire(Priority::High.to_wire()), Priority::High);
    }
}
