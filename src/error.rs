//! Error taxonomy (spec §7).
//!
//! Every fallible operation on [`PeerConnection`] returns a
//! [`tracerr::Traced`] error so a log line can capture the call stack that
//! produced it, the same convention `medea-jason` uses at its JS boundary
//! (`tracerr::map_from_and_wrap!()`), just replied to a task's promise
//! instead of thrown across an FFI edge.
//!
//! [`PeerConnection`]: crate::peer_connection::PeerConnection

use derive_more::Display;

/// Result alias used throughout the negotiation engine.
pub type Result<T, E = PeerConnectionError> = std::result::Result<T, tracerr::Traced<E>>;

/// Errors produced by [`PeerConnection`] operations (createOffer,
/// createAnswer, setLocalDescription, setRemoteDescription,
/// addIceCandidate, addTransceiver).
///
/// [`PeerConnection`]: crate::peer_connection::PeerConnection
#[derive(Clone, Debug, Display)]
pub enum PeerConnectionError {
    /// Operation is not valid for the current signaling state (e.g.
    /// `set_local_description(answer)` while `stable`).
    #[display(fmt = "invalid state: {}", _0)]
    InvalidState(String),

    /// A renegotiation violated an invariant (m-line removed, mline-locked
    /// transceiver displaced, duplicate mid, etc).
    #[display(fmt = "invalid modification: {}", _0)]
    InvalidModification(String),

    /// A session description failed to parse.
    #[display(fmt = "{}", _0)]
    Sdp(SdpError),

    /// Transceiver/caps lookup or intersection failed internally.
    #[display(fmt = "internal failure: {}", _0)]
    Internal(String),

    /// ICE candidate referenced an unknown `m=` line index.
    #[display(fmt = "unknown mline index: {}", _0)]
    UnknownMLineIndex(usize),
}

impl std::error::Error for PeerConnectionError {}

/// SDP parse/serialize failures (spec §7, `sdp-syntax-error`).
#[derive(Clone, Debug, Display)]
pub enum SdpError {
    /// A required line (`v=`, `o=`, `s=`, `t=`) was missing or malformed.
    #[display(fmt = "malformed session line: {}", _0)]
    MalformedSessionLine(String),

    /// An `m=` line could not be parsed.
    #[display(fmt = "malformed media line: {}", _0)]
    MalformedMediaLine(String),

    /// An attribute line (`a=...`) had an unexpected shape.
    #[display(fmt = "malformed attribute: {}", _0)]
    MalformedAttribute(String),

    /// A numeric field (port, payload type, ssrc) did not parse as a
    /// number or was out of range.
    #[display(fmt = "invalid numeric field: {}", _0)]
    InvalidNumber(String),
}

impl std::error::Error for SdpError {}

/// Errors surfaced by the [`DataChannel`] subsystem (spec §4.5.7).
///
/// [`DataChannel`]: crate::datachannel::DataChannel
#[derive(Clone, Debug, Display)]
pub enum DataChannelError {
    /// Application misuse detected synchronously (spec §7 `type-error`):
    /// oversized label/protocol/message, or an invalid reliability
    /// combination. Returned directly from the call, never via a promise.
    #[display(fmt = "{}", _0)]
    TypeError(String),

    /// `id` was requested but collides with a live channel, or id space is
    /// exhausted.
    #[display(fmt = "id allocation failed: {}", _0)]
    IdAllocationFailed(String),

    /// A DCEP control message failed to parse, used an unknown PPID, or
    /// arrived for a channel that is not expecting it.
    #[display(fmt = "DCEP protocol error: {}", _0)]
    Protocol(String),

    /// The underlying SCTP association rejected a send or reset.
    #[display(fmt = "SCTP failure: {}", _0)]
    Sctp(String),

    /// The channel's `ready_state` does not permit the requested operation.
    #[display(fmt = "invalid ready state: {}", _0)]
    InvalidReadyState(String),
}

impl std::error::Error for DataChannelError {}

/// Errors the [`TaskQueue`] can reply with when it cannot run a task.
///
/// [`TaskQueue`]: crate::task::TaskQueue
#[derive(Clone, Debug, Display)]
pub enum TaskError {
    /// The [`PeerConnection`] was closed before this task ran.
    ///
    /// [`PeerConnection`]: crate::peer_connection::PeerConnection
    #[display(fmt = "PeerConnection is closed")]
    Closed,
}

impl std::error::Error for TaskError {}
