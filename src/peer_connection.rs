//! Top-level [`PeerConnection`] (spec §3, §6.4).

use log::debug;

use crate::collaborators::{DtlsTransport, IceAgent, MediaPipeline, NullMediaPipeline, SctpTransport};
use crate::config::RtcConfiguration;
use crate::datachannel::DataChannelManager;
use crate::event::PeerConnectionEvent;
use crate::ice::IceCoordinator;
use crate::payload::PayloadTypeAllocator;
use crate::sdp::SessionDescription;
use crate::state::SignalingState;
use crate::transceiver::TransceiverRegistry;
use crate::transport::TransportRegistry;

/// The four session-description slots plus the offerer's replay copies
/// (spec §3 "PeerConnection").
#[derive(Default)]
pub(crate) struct DescriptionSlots {
    pub current_local: Option<SessionDescription>,
    pub pending_local: Option<SessionDescription>,
    pub current_remote: Option<SessionDescription>,
    pub pending_remote: Option<SessionDescription>,
    pub last_generated_offer: Option<SessionDescription>,
    pub last_generated_answer: Option<SessionDescription>,
}

/// Monotonic counters a [`PeerConnection`] hands out over its lifetime
/// (spec §3 "Monotonic counters").
#[derive(Default)]
pub(crate) struct Counters {
    pub offer_count: u64,
    pub media_index: usize,
    pub sink_pad_serial: u64,
    pub source_pad_serial: u64,
    pub group_id: u64,
}

/// One WebRTC peer connection: negotiation engine, state aggregator and
/// data channel manager wired together (spec §1-§3).
///
/// The concrete ICE/DTLS/SCTP/media-pipeline collaborators are supplied by
/// the embedder at construction time (spec §4.7 [EXPANDED]); this struct
/// only orchestrates them.
pub struct PeerConnection {
    pub(crate) config: RtcConfiguration,
    pub(crate) signaling_state: SignalingState,
    pub(crate) closed: bool,
    pub(crate) need_negotiation: bool,
    pub(crate) sent_initial_offer: bool,

    pub(crate) transceivers: TransceiverRegistry,
    pub(crate) transports: TransportRegistry,
    pub(crate) ice_coordinator: IceCoordinator,
    pub(crate) data_channels: DataChannelManager,
    pub(crate) payload_allocator: PayloadTypeAllocator,

    pub(crate) descriptions: DescriptionSlots,
    pub(crate) counters: Counters,

    pub(crate) ice_agent: Box<dyn IceAgent + Send>,
    pub(crate) dtls: Box<dyn DtlsTransport + Send>,
    pub(crate) sctp: Box<dyn SctpTransport + Send>,
    pub(crate) media_pipeline: Box<dyn MediaPipeline + Send>,

    pub(crate) events: Vec<PeerConnectionEvent>,
}

impl PeerConnection {
    /// Builds a [`PeerConnection`] over the given configuration and
    /// collaborators. Use [`PeerConnectionBuilder`] when a caller doesn't
    /// need a media pipeline (data-channel-only sessions).
    pub fn new(
        config: RtcConfiguration,
        ice_agent: Box<dyn IceAgent + Send>,
        dtls: Box<dyn DtlsTransport + Send>,
        sctp: Box<dyn SctpTransport + Send>,
        media_pipeline: Box<dyn MediaPipeline + Send>,
    ) -> Self {
        debug!("creating PeerConnection");
        Self {
            config,
            signaling_state: SignalingState::Stable,
            closed: false,
            need_negotiation: false,
            sent_initial_offer: false,
            transceivers: TransceiverRegistry::new(),
            transports: TransportRegistry::new(),
            ice_coordinator: IceCoordinator::new(),
            data_channels: DataChannelManager::new(),
            payload_allocator: PayloadTypeAllocator::new(),
            descriptions: DescriptionSlots::default(),
            counters: Counters::default(),
            ice_agent,
            dtls,
            sctp,
            media_pipeline,
            events: Vec::new(),
        }
    }

    /// Convenience constructor for a connection that never touches media
    /// (data-channel-only), using [`NullMediaPipeline`].
    pub fn new_data_channel_only(
        config: RtcConfiguration,
        ice_agent: Box<dyn IceAgent + Send>,
        dtls: Box<dyn DtlsTransport + Send>,
        sctp: Box<dyn SctpTransport + Send>,
    ) -> Self {
        Self::new(config, ice_agent, dtls, sctp, Box::new(NullMediaPipeline))
    }

    #[must_use]
    pub fn signaling_state(&self) -> SignalingState {
        self.signaling_state
    }

    #[must_use]
    pub fn current_local_description(&self) -> Option<&SessionDescription> {
        self.descriptions.current_local.as_ref()
    }

    #[must_use]
    pub fn pending_local_description(&self) -> Option<&SessionDescription> {
        self.descriptions.pending_local.as_ref()
    }

    #[must_use]
    pub fn current_remote_description(&self) -> Option<&SessionDescription> {
        self.descriptions.current_remote.as_ref()
    }

    #[must_use]
    pub fn pending_remote_description(&self) -> Option<&SessionDescription> {
        self.descriptions.pending_remote.as_ref()
    }

    #[must_use]
    pub fn transceivers(&self) -> &TransceiverRegistry {
        &self.transceivers
    }

    #[must_use]
    pub fn data_channels(&self) -> &DataChannelManager {
        &self.data_channels
    }

    pub fn data_channel_mut(
        &mut self,
        id: crate::ids::DataChannelId,
    ) -> Option<&mut crate::datachannel::DataChannel> {
        self.data_channels.get_mut(id)
    }

    #[must_use]
    pub fn config(&self) -> &RtcConfiguration {
        &self.config
    }

    /// Drains signals queued since the last call, for embedders that poll
    /// rather than register a handler (spec §9 "Signals vs callbacks").
    pub fn drain_events(&mut self) -> Vec<PeerConnectionEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: PeerConnectionEvent) {
        self.events.push(event);
    }

    /// Closes the connection: every pending task enqueued after this point
    /// fails with `TaskError::Closed` (spec §5 "Cancellation"); transports
    /// and data channels are left for the caller/worker thread to drop.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        debug!("closing PeerConnection");
        self.closed = true;
        self.signaling_state = SignalingState::Closed;
        for channel in self.data_channels.iter_mut() {
            channel.mark_closed();
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
