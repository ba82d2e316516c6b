//! Per-channel state machine (spec §3 "DataChannel", §4.5.1, §4.5.5-7).

use crate::error::DataChannelError;
use crate::ids::DataChannelId;

use super::dcep::Priority;
use super::InboundMessage;

/// Channel-level notification (spec §6.3's `on-open`/`on-message`/
/// `on-error`/`on-close`/`on-buffered-amount-low`, which are callbacks on
/// the channel itself rather than [`PeerConnectionEvent`]s).
///
/// [`PeerConnectionEvent`]: crate::event::PeerConnectionEvent
#[derive(Clone, Debug)]
pub enum DataChannelEvent {
    Open,
    Message(InboundMessage),
    BufferedAmountLow,
    Error(DataChannelError),
    Close,
}

/// `connecting → open → closing → closed` (spec §3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// At most one of max-retransmits/max-packet-lifetime may be set; neither
/// set means reliable (spec §3 "DataChannel" invariant).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reliability {
    Reliable,
    MaxRetransmits(u16),
    MaxPacketLifetime(u16),
}

/// Construction parameters for a locally-initiated channel (spec §4.5.1
/// "Create").
#[derive(Clone, Debug)]
pub struct DataChannelInit {
    pub label: String,
    pub protocol: String,
    pub ordered: bool,
    pub reliability: Reliability,
    pub priority: Priority,
    pub negotiated: bool,
    /// Pre-assigned id when `negotiated == true`.
    pub id: Option<u16>,
}

impl Default for DataChannelInit {
    fn default() -> Self {
        Self {
            label: String::new(),
            protocol: String::new(),
            ordered: true,
            reliability: Reliability::Reliable,
            priority: Priority::Low,
            negotiated: false,
            id: None,
        }
    }
}

/// Maximum label/protocol length, in UTF-8 bytes (spec §8 "Boundary
/// behaviours").
pub const MAX_LABEL_OR_PROTOCOL_BYTES: usize = 65_535;

impl DataChannelInit {
    /// Validates label/protocol length and the reliability invariant (spec
    /// §7 `type-error`), synchronously — never via a promise.
    pub fn validate(&self) -> Result<(), DataChannelError> {
        if self.label.len() > MAX_LABEL_OR_PROTOCOL_BYTES {
            return Err(DataChannelError::TypeError(format!(
                "label exceeds {} bytes",
                MAX_LABEL_OR_PROTOCOL_BYTES
            )));
        }
        if self.protocol.len() > MAX_LABEL_OR_PROTOCOL_BYTES {
            return Err(DataChannelError::TypeError(format!(
                "protocol exceeds {} bytes",
                MAX_LABEL_OR_PROTOCOL_BYTES
            )));
        }
        Ok(())
    }
}

/// The negotiation-level pairing of a label/protocol/reliability
/// configuration with a live SCTP stream id and its accounting (spec §3
/// "DataChannel").
#[derive(Debug)]
pub struct DataChannel {
    pub id: DataChannelId,
    pub label: String,
    pub protocol: String,
    pub negotiated: bool,
    pub ordered: bool,
    pub reliability: Reliability,
    pub priority: Priority,

    pub ready_state: ReadyState,
    pub buffered_amount: usize,
    pub buffered_amount_low_threshold: usize,

    pub peer_closed: bool,
    pub stored_error: Option<DataChannelError>,
    /// DCEP handshake complete (OPEN sent+ACKed, or OPEN received+ACKed).
    pub opened: bool,

    events: Vec<DataChannelEvent>,
}

impl DataChannel {
    #[must_use]
    pub fn new(id: DataChannelId, init: &DataChannelInit) -> Self {
        Self {
            id,
            label: init.label.clone(),
            protocol: init.protocol.clone(),
            negotiated: init.negotiated,
            ordered: init.ordered,
            reliability: init.reliability,
            priority: init.priority,
            ready_state: ReadyState::Connecting,
            buffered_amount: 0,
            buffered_amount_low_threshold: 0,
            peer_closed: false,
            stored_error: None,
            opened: false,
            events: Vec::new(),
        }
    }

    /// Inbound channel created because the SCTP layer surfaced a stream id
    /// with no matching local channel (spec §4.5.1 "Receive").
    #[must_use]
    pub fn new_inbound(id: DataChannelId) -> Self {
        Self {
            id,
            label: String::new(),
            protocol: String::new(),
            negotiated: false,
            ordered: true,
            reliability: Reliability::Reliable,
            priority: Priority::Low,
            ready_state: ReadyState::Connecting,
            buffered_amount: 0,
            buffered_amount_low_threshold: 0,
            peer_closed: false,
            stored_error: None,
            opened: false,
            events: Vec::new(),
        }
    }

    /// Applies the parameters carried by a received DCEP OPEN to an
    /// inbound channel (spec §4.5.1 "Receive").
    pub fn apply_remote_open(&mut self, open: &super::dcep::DcepOpen) {
        self.label = open.label.clone();
        self.protocol = open.protocol.clone();
        self.ordered = !open.unordered;
        self.priority = open.priority;
        self.reliability = match open.reliability {
            super::dcep::Reliability::Reliable => Reliability::Reliable,
            super::dcep::Reliability::PartialReliableRexmit(n) => {
                Reliability::MaxRetransmits(n as u16)
            }
            super::dcep::Reliability::PartialReliableTimed(n) => {
                Reliability::MaxPacketLifetime(n as u16)
            }
        };
    }

    /// Transitions to open and marks the DCEP handshake complete.
    pub fn mark_open(&mut self) {
        self.ready_state = ReadyState::Open;
        self.opened = true;
        self.events.push(DataChannelEvent::Open);
    }

    /// Records a decoded inbound message for delivery to `on-message`.
    pub fn receive_message(&mut self, message: InboundMessage) {
        self.events.push(DataChannelEvent::Message(message));
    }

    /// Drains channel-level notifications queued since the last call.
    pub fn drain_events(&mut self) -> Vec<DataChannelEvent> {
        std::mem::take(&mut self.events)
    }

    /// Begins the close handshake (spec §4.5.1 "Close").
    pub fn begin_close(&mut self) {
        if self.ready_state == ReadyState::Connecting || self.ready_state == ReadyState::Open {
            self.ready_state = ReadyState::Closing;
        }
    }

    /// Remote reset arrived first; marks peer-closed so the local side
    /// resets once its outbound buffer drains (spec §4.5.1 "Close").
    pub fn mark_peer_closed(&mut self) {
        self.peer_closed = true;
    }

    pub fn mark_closed(&mut self) {
        self.ready_state = ReadyState::Closed;
        self.events.push(DataChannelEvent::Close);
    }

    /// Increments `buffered_amount` synchronously on enqueue (spec
    /// §4.5.5).
    pub fn enqueue_bytes(&mut self, len: usize) {
        self.buffered_amount += len;
    }

    /// Decrements `buffered_amount` on SCTP hand-off; returns `true` if the
    /// decrement crossed below the low-threshold (spec §4.5.5), in which
    /// case the caller should emit `on-buffered-amount-low`.
    pub fn drain_bytes(&mut self, len: usize) -> bool {
        let was_above = self.buffered_amount >= self.buffered_amount_low_threshold;
        self.buffered_amount = self.buffered_amount.saturating_sub(len);
        let now_below = self.buffered_amount < self.buffered_amount_low_threshold;
        let crossed = was_above && now_below;
        if crossed {
            self.events.push(DataChannelEvent::BufferedAmountLow);
        }
        crossed
    }

    /// Stores an error and initiates close (spec §4.5.5 "On enqueue
    /// failure", §4.5.7). The error is delivered to `on-error` before
    /// `on-close`.
    pub fn fail(&mut self, error: DataChannelError) {
        self.stored_error = Some(error.clone());
        self.events.push(DataChannelEvent::Error(error));
        self.begin_close();
    }
}
