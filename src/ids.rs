//! Dense arena identifiers.
//!
//! [`Transceiver`]s, [`TransportStream`]s and [`DataChannel`]s all live in
//! flat [`Vec`]-backed arenas owned by [`PeerConnection`] and reference each
//! other only by id, never by pointer. This keeps the (cyclic) collaborator
//! graph trivial to iterate while mutating, which matters a lot once all of
//! it lives behind a single [`std::sync::Mutex`].
//!
//! [`Transceiver`]: crate::transceiver::Transceiver
//! [`TransportStream`]: crate::transport::TransportStream
//! [`DataChannel`]: crate::datachannel::DataChannel
//! [`PeerConnection`]: crate::peer_connection::PeerConnection

use std::fmt;

/// Index of a [`Transceiver`] in [`PeerConnection`]'s transceiver registry.
///
/// [`Transceiver`]: crate::transceiver::Transceiver
/// [`PeerConnection`]: crate::peer_connection::PeerConnection
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TransceiverId(pub(crate) usize);

impl fmt::Display for TransceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transceiver#{}", self.0)
    }
}

/// Identifier of a [`TransportStream`], equal to the RTP session number
/// (either an `m=` line index, or the bundle leader's index).
///
/// [`TransportStream`]: crate::transport::TransportStream
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SessionId(pub usize);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Zero-based position of an `m=` section within an SDP.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MLineIndex(pub usize);

impl fmt::Display for MLineIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SCTP stream id / DCEP channel id, in `[0, 65534]`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DataChannelId(pub u16);

impl fmt::Display for DataChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "datachannel#{}", self.0)
    }
}

/// Maximum SCTP stream id usable for a data channel, per §4.5.4.
pub const MAX_DATA_CHANNEL_ID: u16 = 65_534;
