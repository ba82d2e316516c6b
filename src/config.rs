//! Configurable knobs (spec §6.5).

use std::time::Duration;

/// `bundle-policy` knob.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BundlePolicy {
    /// Each `m=` section gets its own ICE/DTLS transport.
    None,
    /// Only the first `m=` section gathers candidates; every other section
    /// is bundled onto it. This is the only bundling mode this crate
    /// implements — "balanced" is an explicit Non-goal (spec.md REDESIGN
    /// FLAGS / Open Questions).
    MaxBundle,
    /// Same wire behaviour as `MaxBundle` from this engine's point of view;
    /// distinguished only because remote peers may offer it.
    MaxCompat,
}

/// `iceTransportPolicy` knob.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IceTransportPolicy {
    /// Gather and use all candidate types.
    All,
    /// Only use relayed candidates.
    Relay,
}

/// A single configured STUN/TURN server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IceServerConfig {
    /// Server URI, e.g. `stun:stun.l.google.com:19302` or
    /// `turn:turn.example.com:3478`.
    pub urls: Vec<String>,
    /// TURN username, if any.
    pub username: Option<String>,
    /// TURN credential, if any.
    pub credential: Option<String>,
}

/// Top-level [`PeerConnection`] configuration.
///
/// [`PeerConnection`]: crate::peer_connection::PeerConnection
#[derive(Clone, Debug)]
pub struct RtcConfiguration {
    /// See [`BundlePolicy`].
    pub bundle_policy: BundlePolicy,
    /// See [`IceTransportPolicy`].
    pub ice_transport_policy: IceTransportPolicy,
    /// STUN/TURN servers handed to the [`IceAgent`](crate::collaborators::IceAgent)
    /// collaborator at construction time.
    pub ice_servers: Vec<IceServerConfig>,
    /// HTTP proxy used for TURN-TCP traversal, if any. Opaque to this
    /// crate; forwarded verbatim to the ICE agent collaborator.
    pub http_proxy: Option<String>,
    /// Jitter-buffer latency, forwarded verbatim to the media pipeline
    /// collaborator. Has no effect on data-channel-only sessions.
    pub latency: Duration,
}

impl Default for RtcConfiguration {
    fn default() -> Self {
        Self {
            bundle_policy: BundlePolicy::MaxBundle,
            ice_transport_policy: IceTransportPolicy::All,
            ice_servers: Vec::new(),
            http_proxy: None,
            latency: Duration::from_millis(200),
        }
    }
}

impl RtcConfiguration {
    /// Appends a TURN server URI, as `add_turn_server(uri)` from spec §6.5.
    pub fn add_turn_server(&mut self, uri: impl Into<String>) {
        self.ice_servers.push(IceServerConfig {
            urls: vec![uri.into()],
            username: None,
            credential: None,
        });
    }
}
