//! Application-visible signals (spec §6.3 [EXPANDED]).
//!
//! Modelled the way `medea-jason`'s `peer::PeerEvent` is: a single
//! `#[dispatchable]` enum turned into a `PeerConnectionEventHandler` trait,
//! so the application implements typed `on_*` methods instead of matching
//! on an event enum by hand.

use medea_macro::dispatchable;

use crate::ids::DataChannelId;
use crate::state::{
    AggregateIceConnectionState, AggregateIceGatheringState, PeerConnectionState, SignalingState,
};
use crate::transceiver::Transceiver;

/// One application-visible signal emitted by a
/// [`PeerConnection`](crate::peer_connection::PeerConnection).
#[dispatchable]
#[derive(Debug)]
pub enum PeerConnectionEvent {
    /// Negotiation is required; the application should call
    /// `create_offer`/`set_local_description`.
    NegotiationNeeded,

    /// A local ICE candidate was gathered for `mline_index`. `candidate ==
    /// None` signals end-of-candidates for that mline.
    IceCandidate {
        mline_index: usize,
        candidate: Option<String>,
    },

    /// A new transceiver was created (locally via `add_transceiver`, or
    /// synthesised while answering a remote offer).
    NewTransceiver { transceiver_id: usize },

    /// A remotely-initiated data channel became visible to the
    /// application.
    DataChannel { channel_id: DataChannelId },

    /// Fires before any other notification on a new channel and before
    /// its first buffer is dispatched, so handlers can attach (spec §9).
    PrepareDataChannel {
        channel_id: DataChannelId,
        is_local: bool,
    },

    SignalingStateChange(SignalingState),
    IceConnectionStateChange(AggregateIceConnectionState),
    IceGatheringStateChange(AggregateIceGatheringState),
    PeerConnectionStateChange(PeerConnectionState),
}

/// Convenience constructor kept next to the enum so call sites don't need
/// to reach into [`Transceiver`] fields directly.
impl PeerConnectionEvent {
    #[must_use]
    pub fn new_transceiver(transceiver: &Transceiver) -> Self {
        Self::NewTransceiver {
            transceiver_id: transceiver.id.0,
        }
    }
}
