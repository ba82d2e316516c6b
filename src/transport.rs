//! Per-RTP-session transport (spec §3 "TransportStream").

use std::collections::HashMap;

use medea_reactive::ObservableCell;

use crate::ids::{SessionId, TransceiverId};
use crate::payload::PayloadTypeSlot;

/// ICE connection state of one [`TransportStream`] (spec §4.4 feeds off
/// these per-transport states).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Failed,
    Disconnected,
    Closed,
}

/// ICE gathering state of one [`TransportStream`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IceGatheringState {
    New,
    Gathering,
    Complete,
}

/// DTLS handshake state of one [`TransportStream`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DtlsState {
    New,
    Connecting,
    Connected,
    Closed,
    Failed,
}

/// Direction of one entry in a [`TransportStream`]'s ssrc map.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SsrcDirection {
    Send,
    Receive,
}

/// One row of a [`TransportStream`]'s ssrc map (spec §3).
#[derive(Clone, Debug)]
pub struct SsrcMapEntry {
    pub direction: SsrcDirection,
    pub ssrc: u32,
    pub media_index: usize,
    pub mid: Option<String>,
    pub rid: Option<String>,
}

/// DTLS role of the local endpoint, derived from the negotiated `a=setup`
/// (spec §4.1.4 "Set DTLS client-mode").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DtlsRole {
    Client,
    Server,
}

/// A per-RTP-session DTLS+ICE transport pair plus its payload-type and ssrc
/// bookkeeping (spec §3 "TransportStream").
///
/// The concrete send/receive bins and RTX/RED/ULPFEC elements this carries
/// are opaque collaborators (spec §4, "explicitly out of scope"); this
/// struct only tracks the bookkeeping the negotiation engine is responsible
/// for.
#[derive(Debug)]
pub struct TransportStream {
    pub session_id: SessionId,

    pub ice_connection_state: ObservableCell<IceConnectionState>,
    pub ice_gathering_state: ObservableCell<IceGatheringState>,
    pub dtls_state: ObservableCell<DtlsState>,
    pub dtls_role: Option<DtlsRole>,

    pub local_ufrag: Option<String>,
    pub local_pwd: Option<String>,
    pub remote_ufrag: Option<String>,
    pub remote_pwd: Option<String>,

    pub payload_types: PayloadTypeSlot,
    pub ssrc_map: Vec<SsrcMapEntry>,

    pub has_rtx: bool,
    pub has_red: bool,
    pub has_ulpfec: bool,

    /// Transceivers whose send/receive pads currently route through this
    /// transport.
    pub routed_transceivers: Vec<TransceiverId>,

    /// `true` once at least one associated mline routes through it.
    pub active: bool,
}

impl TransportStream {
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            ice_connection_state: ObservableCell::new(IceConnectionState::New),
            ice_gathering_state: ObservableCell::new(IceGatheringState::New),
            dtls_state: ObservableCell::new(DtlsState::New),
            dtls_role: None,
            local_ufrag: None,
            local_pwd: None,
            remote_ufrag: None,
            remote_pwd: None,
            payload_types: PayloadTypeSlot::default(),
            ssrc_map: Vec::new(),
            has_rtx: false,
            has_red: false,
            has_ulpfec: false,
            routed_transceivers: Vec::new(),
            active: false,
        }
    }

    pub fn set_local_credentials(&mut self, ufrag: impl Into<String>, pwd: impl Into<String>) {
        self.local_ufrag = Some(ufrag.into());
        self.local_pwd = Some(pwd.into());
    }

    pub fn set_remote_credentials(&mut self, ufrag: impl Into<String>, pwd: impl Into<String>) {
        self.remote_ufrag = Some(ufrag.into());
        self.remote_pwd = Some(pwd.into());
    }

    pub fn record_ssrc(&mut self, entry: SsrcMapEntry) {
        self.ssrc_map.push(entry);
    }
}

/// session-id → [`TransportStream`] registry (spec §3: "TransportStreams
/// are created on first need for a session-id; they persist until the
/// PeerConnection is closed").
#[derive(Debug, Default)]
pub struct TransportRegistry {
    streams: HashMap<SessionId, TransportStream>,
    order: Vec<SessionId>,
}

impl TransportRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_or_create(&mut self, session_id: SessionId) -> &mut TransportStream {
        if !self.streams.contains_key(&session_id) {
            self.streams
                .insert(session_id, TransportStream::new(session_id));
            self.order.push(session_id);
        }
        self.streams.get_mut(&session_id).expect("just inserted")
    }

    #[must_use]
    pub fn get(&self, session_id: SessionId) -> Option<&TransportStream> {
        self.streams.get(&session_id)
    }

    pub fn get_mut(&mut self, session_id: SessionId) -> Option<&mut TransportStream> {
        self.streams.get_mut(&session_id)
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &TransportStream> {
        self.order.iter().filter_map(move |id| self.streams.get(id))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TransportStream> {
        self.streams.values_mut()
    }
}
