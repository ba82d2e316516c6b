//! Collaborator traits (spec §4.7 [EXPANDED], spec §1 "explicitly out of
//! scope").
//!
//! The concrete ICE agent, DTLS engine, SCTP association and media
//! pipeline are deliberately not implemented by this crate; it only
//! defines the interfaces it drives them through, the same boundary
//! `medea-jason`'s `platform` module draws around the browser's own
//! `RTCPeerConnection` implementation.

use crate::error::{DataChannelError, Result};
use crate::ids::SessionId;
use crate::transport::{DtlsRole, DtlsState, IceConnectionState, IceGatheringState};

/// Drives one ICE transport: credential application, candidate exchange,
/// gathering (spec §4.3).
pub trait IceAgent {
    /// Applies local ufrag/pwd to the underlying ICE stream for `session`.
    fn set_local_credentials(&mut self, session: SessionId, ufrag: &str, pwd: &str);

    /// Applies remote ufrag/pwd.
    fn set_remote_credentials(&mut self, session: SessionId, ufrag: &str, pwd: &str);

    /// Starts gathering local candidates for `session`, if not already
    /// gathering.
    fn gather_candidates(&mut self, session: SessionId);

    /// Hands a remote candidate to the agent. `None` signals end-of-
    /// candidates for the session.
    fn add_remote_candidate(&mut self, session: SessionId, candidate: Option<&str>);

    /// Sets whether this endpoint is the ICE controlling party.
    fn set_controlling(&mut self, session: SessionId, controlling: bool);

    fn connection_state(&self, session: SessionId) -> IceConnectionState;

    fn gathering_state(&self, session: SessionId) -> IceGatheringState;
}

/// Drives one DTLS handshake keying SRTP/SCTP (spec §4.1.4 "DTLS
/// client-mode").
pub trait DtlsTransport {
    fn set_role(&mut self, session: SessionId, role: DtlsRole);

    fn set_remote_fingerprint(&mut self, session: SessionId, algorithm: &str, hex: &str);

    fn state(&self, session: SessionId) -> DtlsState;
}

/// The per-stream send/receive facade over one SCTP association (spec §3
/// "DataChannel", spec component table "SCTP association facade").
pub trait SctpTransport {
    /// `true` once the association handshake has completed and streams may
    /// be opened.
    fn is_established(&self) -> bool;

    /// Maximum number of concurrent streams the association negotiated, or
    /// `None` if unknown (falls back to the spec §4.5.4 default of 65534).
    fn max_channels(&self) -> Option<u16>;

    /// Maximum single-message size in bytes the association accepts.
    fn max_message_size(&self) -> usize;

    /// Sends `data` on `stream_id` with the given PPID and reliability
    /// parameters (spec §4.5.5).
    fn send(
        &mut self,
        stream_id: u16,
        ppid: u32,
        ordered: bool,
        reliability_parameter: ReliabilityParameter,
        data: &[u8],
    ) -> Result<(), DataChannelError>;

    /// Requests a stream reset on `stream_id` (spec §4.5.1 "Close").
    fn reset_stream(&mut self, stream_id: u16);
}

/// SCTP-level reliability, derived from a data channel's
/// max-retransmits/max-packet-lifetime configuration (spec §4.5.5).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReliabilityParameter {
    Reliable,
    MaxRetransmits(u16),
    MaxPacketLifetime(u16),
}

/// The external media pipeline abstraction exposing pads/streams that
/// spec §1 describes: "the core manipulates that topology but does not
/// itself decode or encode media".
pub trait MediaPipeline {
    /// Creates (or ghosts in) a sink pad for an outgoing transceiver.
    fn create_sink_pad(&mut self, session: SessionId, media_index: usize);

    /// Pushes end-of-stream into an existing sink pad and tears it down.
    fn remove_sink_pad(&mut self, session: SessionId, media_index: usize);

    /// Creates (or reuses) a source pad for an incoming transceiver and
    /// links it to the transport's receive output.
    fn create_source_pad(&mut self, session: SessionId, media_index: usize);

    /// Blocks (or unblocks) the bundle leader's receive bin when no
    /// bundled mline is active (spec §4.1.4, final paragraph).
    fn set_receive_blocked(&mut self, session: SessionId, blocked: bool);
}

/// A [`MediaPipeline`] that performs no pad/element manipulation, used when
/// a [`PeerConnection`](crate::peer_connection::PeerConnection) is driven
/// purely for data channels.
#[derive(Debug, Default)]
pub struct NullMediaPipeline;

impl MediaPipeline for NullMediaPipeline {
    fn create_sink_pad(&mut self, _session: SessionId, _media_index: usize) {}

    fn remove_sink_pad(&mut self, _session: SessionId, _media_index: usize) {}

    fn create_source_pad(&mut self, _session: SessionId, _media_index: usize) {}

    fn set_receive_blocked(&mut self, _session: SessionId, _blocked: bool) {}
}
