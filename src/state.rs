//! State aggregator (spec §4.4).

use crate::transport::{DtlsState, IceConnectionState, IceGatheringState};

/// `stable | have-local-offer | have-remote-offer | have-local-pranswer |
/// have-remote-pranswer | closed` (spec §3, §4.1.5).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

/// Aggregate ICE connection state across every contributing transport
/// (spec §4.4).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AggregateIceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

/// Aggregate ICE gathering state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AggregateIceGatheringState {
    New,
    Gathering,
    Complete,
}

/// Aggregate PeerConnection state (W3C `RTCPeerConnectionState`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Collates per-transport ICE connection states into the aggregate state,
/// per spec §4.4.
#[must_use]
pub fn aggregate_ice_connection_state(
    states: &[IceConnectionState],
) -> AggregateIceConnectionState {
    if states.is_empty() {
        return AggregateIceConnectionState::New;
    }
    if states.iter().any(|s| *s == IceConnectionState::Failed) {
        return AggregateIceConnectionState::Failed;
    }
    if states.iter().any(|s| *s == IceConnectionState::Disconnected) {
        return AggregateIceConnectionState::Disconnected;
    }
    if states
        .iter()
        .all(|s| matches!(s, IceConnectionState::New | IceConnectionState::Closed))
    {
        return AggregateIceConnectionState::New;
    }
    if states
        .iter()
        .any(|s| matches!(s, IceConnectionState::Checking | IceConnectionState::New))
    {
        return AggregateIceConnectionState::Checking;
    }
    if states
        .iter()
        .all(|s| matches!(s, IceConnectionState::Completed | IceConnectionState::Closed))
    {
        return AggregateIceConnectionState::Completed;
    }
    if states.iter().all(|s| {
        matches!(
            s,
            IceConnectionState::Connected
                | IceConnectionState::Completed
                | IceConnectionState::Closed
        )
    }) {
        return AggregateIceConnectionState::Connected;
    }
    AggregateIceConnectionState::Checking
}

/// Collates per-transport ICE gathering states (spec §4.4).
#[must_use]
pub fn aggregate_ice_gathering_state(
    states: &[IceGatheringState],
) -> AggregateIceGatheringState {
    if states.iter().any(|s| *s == IceGatheringState::Gathering) {
        return AggregateIceGatheringState::Gathering;
    }
    if !states.is_empty()
        && states.iter().all(|s| *s == IceGatheringState::Complete)
    {
        return AggregateIceGatheringState::Complete;
    }
    AggregateIceGatheringState::New
}

/// Collates per-transport ICE and DTLS states into the aggregate
/// PeerConnection state (spec §4.4).
#[must_use]
pub fn aggregate_peer_connection_state(
    closed: bool,
    ice_states: &[IceConnectionState],
    dtls_states: &[DtlsState],
) -> PeerConnectionState {
    if closed {
        return PeerConnectionState::Closed;
    }
    if ice_states.iter().any(|s| *s == IceConnectionState::Failed)
        || dtls_states.iter().any(|s| *s == DtlsState::Failed)
    {
        return PeerConnectionState::Failed;
    }
    if ice_states
        .iter()
        .any(|s| *s == IceConnectionState::Disconnected)
    {
        return PeerConnectionState::Disconnected;
    }
    if ice_states.is_empty() && dtls_states.is_empty() {
        return PeerConnectionState::New;
    }
    let all_connected = ice_states.iter().all(|s| {
        matches!(
            s,
            IceConnectionState::Connected
                | IceConnectionState::Completed
                | IceConnectionState::Closed
        )
    }) && dtls_states
        .iter()
        .all(|s| matches!(s, DtlsState::Connected | DtlsState::Closed));
    if all_connected {
        return PeerConnectionState::Connected;
    }
    let all_new = ice_states.iter().all(|s| *s == IceConnectionState::New)
        && dtls_states.iter().all(|s| *s == DtlsState::New);
    if all_new {
        return PeerConnectionState::New;
    }
    PeerConnectionState::Connecting
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ice_states_are_new() {
        assert_eq!(
            aggregate_ice_connection_state(&[]),
            AggregateIceConnectionState::New
        );
    }

    #[test]
    fn any_failed_transport_fails_the_aggregate() {
        let states = [IceConnectionState::Connected, IceConnectionState::Failed];
        assert_eq!(
            aggregate_ice_connection_state(&states),
            AggregateIceConnectionState::Failed
        );
    }

    #[test]
    fn all_connected_or_completed_is_connected() {
        let states = [IceConnectionState::Connected, IceConnectionState::Completed];
        assert_eq!(
            aggregate_ice_connection_state(&states),
            AggregateIceConnectionState::Connected
        );
    }

    #[test]
    fn gathering_state_complete_requires_all_transports() {
        let states = [IceGatheringState::Complete, IceGatheringState::Complete];
        assert_eq!(
            aggregate_ice_gathering_state(&states),
            AggregateIceGatheringState::Complete
        );
        let states = [IceGatheringState::Complete, IceGatheringState::New];
        assert_eq!(
            aggregate_ice_gathering_state(&states),
            AggregateIceGatheringState::New
        );
    }

    #[test]
    fn closed_peer_connection_always_reports_closed() {
        assert_eq!(
            aggregate_peer_connection_state(true, &[IceConnectionState::Connected], &[]),
            PeerConnectionState::Closed
        );
    }
}
