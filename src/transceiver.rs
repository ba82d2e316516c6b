//! Transceiver registry (spec §3 "Transceiver", §4.1).

use medea_reactive::ObservableCell;

use crate::ids::{SessionId, TransceiverId};
use crate::payload::FecType;
use crate::sdp::{Direction, MediaKind};

/// A single RTP payload format a transceiver is willing to send/receive,
/// mirroring the subset of `a=rtpmap`/`a=fmtp` this engine negotiates.
#[derive(Clone, Debug, PartialEq)]
pub struct CodecCaps {
    pub payload_type: Option<u8>,
    pub codec: String,
    pub clock_rate: u32,
    pub channels: Option<u8>,
    /// `a=mid` carried in the caps themselves, used as a mid candidate
    /// before falling back to auto-generation (spec §4.1.1 step 5).
    pub preferred_mid: Option<String>,
}

/// Priority of the sender half of a transceiver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Priority {
    VeryLow,
    Low,
    Medium,
    High,
}

/// FEC/RTX configuration of one transceiver (spec §3).
#[derive(Clone, Debug, Default)]
pub struct RepairConfig {
    pub do_nack: bool,
    pub fec_type: Option<FecTypeWrapper>,
    pub fec_percentage: u8,
}

/// Newtype so `RepairConfig` can derive `Default` without requiring
/// [`FecType`] to implement it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FecTypeWrapper(pub FecType);

/// The sender half of a transceiver: a priority and a binding to the
/// [`TransportStream`](crate::transport::TransportStream) it routes
/// through, once associated.
#[derive(Clone, Debug)]
pub struct Sender {
    pub priority: Priority,
    pub transport: Option<SessionId>,
}

/// The receiver half of a transceiver.
#[derive(Clone, Debug)]
pub struct Receiver {
    pub priority: Priority,
    pub transport: Option<SessionId>,
}

/// The negotiation-level pairing of an RTP sender and receiver at one
/// `m=` line (spec §3 "Transceiver").
#[derive(Debug)]
pub struct Transceiver {
    pub id: TransceiverId,

    pub mid: Option<String>,
    pub pending_mid: Option<String>,
    /// `-1` (unassociated) is represented as `None`.
    pub mline: Option<usize>,
    pub kind: MediaKind,

    pub direction: ObservableCell<Direction>,
    pub current_direction: Option<Direction>,

    pub codec_preferences: Vec<CodecCaps>,

    pub mline_locked: bool,
    pub stopped: bool,

    pub sender: Sender,
    pub receiver: Receiver,

    pub repair: RepairConfig,
}

impl Transceiver {
    #[must_use]
    pub fn new(id: TransceiverId, kind: MediaKind, direction: Direction) -> Self {
        Self {
            id,
            mid: None,
            pending_mid: None,
            mline: None,
            kind,
            direction: ObservableCell::new(direction),
            current_direction: None,
            codec_preferences: Vec::new(),
            mline_locked: false,
            stopped: false,
            sender: Sender {
                priority: Priority::High,
                transport: None,
            },
            receiver: Receiver {
                priority: Priority::High,
                transport: None,
            },
            repair: RepairConfig::default(),
        }
    }

    /// `true` once this transceiver has both a mid and an mline (spec §3
    /// invariant: a non-stopped transceiver either has both set or
    /// neither).
    #[must_use]
    pub fn is_associated(&self) -> bool {
        self.mid.is_some() && self.mline.is_some()
    }

    /// Whether this transceiver is eligible to be picked up by the
    /// "first unassociated, non-stopped transceiver" rule of spec §4.1.1
    /// step 5 / §4.1.2 step 4.
    #[must_use]
    pub fn is_available_for_association(&self) -> bool {
        !self.stopped && !self.is_associated()
    }

    /// Locks this transceiver's mline once assigned, per spec §3 invariant
    /// "once mline-locked, the transceiver's mline does not change".
    pub fn lock_to_mline(&mut self, mline: usize) {
        self.mline = Some(mline);
        self.mline_locked = true;
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }
}

/// Ordered collection of transceivers, one per [`PeerConnection`].
///
/// [`PeerConnection`]: crate::peer_connection::PeerConnection
#[derive(Debug, Default)]
pub struct TransceiverRegistry {
    transceivers: Vec<Transceiver>,
}

impl TransceiverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: MediaKind, direction: Direction) -> TransceiverId {
        let id = TransceiverId(self.transceivers.len());
        self.transceivers.push(Transceiver::new(id, kind, direction));
        id
    }

    #[must_use]
    pub fn get(&self, id: TransceiverId) -> Option<&Transceiver> {
        self.transceivers.get(id.0)
    }

    pub fn get_mut(&mut self, id: TransceiverId) -> Option<&mut Transceiver> {
        self.transceivers.get_mut(id.0)
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Transceiver> {
        self.transceivers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Transceiver> {
        self.transceivers.iter_mut()
    }

    #[must_use]
    pub fn find_by_mid(&self, mid: &str) -> Option<&Transceiver> {
        self.transceivers
            .iter()
            .find(|t| t.mid.as_deref() == Some(mid) || t.pending_mid.as_deref() == Some(mid))
    }

    pub fn find_by_mid_mut(&mut self, mid: &str) -> Option<&mut Transceiver> {
        self.transceivers
            .iter_mut()
            .find(|t| t.mid.as_deref() == Some(mid) || t.pending_mid.as_deref() == Some(mid))
    }

    #[must_use]
    pub fn find_locked_to_mline(&self, mline: usize) -> Option<&Transceiver> {
        self.transceivers
            .iter()
            .find(|t| t.mline_locked && t.mline == Some(mline))
    }

    /// First unassociated, non-stopped transceiver, in registration order
    /// (spec §4.1.1 step 5 / §4.1.2 step 4).
    pub fn find_first_available(&mut self) -> Option<&mut Transceiver> {
        self.transceivers
            .iter_mut()
            .find(|t| t.is_available_for_association())
    }

    /// Every reserved mid: confirmed mid, pending-mid, or `a=mid` present
    /// in codec preferences (spec §4.1.1 step 4).
    #[must_use]
    pub fn reserved_mids(&self) -> Vec<String> {
        let mut mids = Vec::new();
        for t in &self.transceivers {
            if let Some(mid) = &t.mid {
                mids.push(mid.clone());
            }
            if let Some(mid) = &t.pending_mid {
                mids.push(mid.clone());
            }
            for caps in &t.codec_preferences {
                if let Some(mid) = &caps.preferred_mid {
                    mids.push(mid.clone());
                }
            }
        }
        mids
    }
}
