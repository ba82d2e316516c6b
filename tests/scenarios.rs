//! End-to-end scenarios exercising a [`PeerConnection`] against fake
//! collaborators: offer/answer negotiation, bundling, ICE candidate
//! queueing, and the data channel wire protocol.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use webrtc_pc_engine::collaborators::ReliabilityParameter;
use webrtc_pc_engine::datachannel::dcep;
use webrtc_pc_engine::ids::{DataChannelId, SessionId};
use webrtc_pc_engine::sdp::{Direction, MediaKind, SdpType};
use webrtc_pc_engine::transceiver::CodecCaps;
use webrtc_pc_engine::transport::{DtlsRole, DtlsState, IceConnectionState, IceGatheringState};
use webrtc_pc_engine::{
    DataChannelEvent, DataChannelInit, DataChannelReliability, DescriptionSource, DtlsTransport,
    IceAgent, NullMediaPipeline, PeerConnection, ReadyState, RtcConfiguration,
    SctpTransport,
};

fn opus_caps() -> CodecCaps {
    CodecCaps {
        payload_type: Some(111),
        codec: "opus".into(),
        clock_rate: 48_000,
        channels: Some(2),
        preferred_mid: None,
    }
}

fn vp8_caps() -> CodecCaps {
    CodecCaps {
        payload_type: Some(96),
        codec: "VP8".into(),
        clock_rate: 90_000,
        channels: None,
        preferred_mid: None,
    }
}

#[derive(Default)]
struct FakeIceState {
    local_credentials: HashMap<usize, (String, String)>,
    remote_credentials: HashMap<usize, (String, String)>,
    gathered: Vec<usize>,
    remote_candidates: Vec<(usize, Option<String>)>,
}

#[derive(Clone, Default)]
struct FakeIce(Arc<Mutex<FakeIceState>>);

impl IceAgent for FakeIce {
    fn set_local_credentials(&mut self, session: SessionId, ufrag: &str, pwd: &str) {
        self.0
            .lock()
            .unwrap()
            .local_credentials
            .insert(session.0, (ufrag.to_string(), pwd.to_string()));
    }

    fn set_remote_credentials(&mut self, session: SessionId, ufrag: &str, pwd: &str) {
        self.0
            .lock()
            .unwrap()
            .remote_credentials
            .insert(session.0, (ufrag.to_string(), pwd.to_string()));
    }

    fn gather_candidates(&mut self, session: SessionId) {
        self.0.lock().unwrap().gathered.push(session.0);
    }

    fn add_remote_candidate(&mut self, session: SessionId, candidate: Option<&str>) {
        self.0
            .lock()
            .unwrap()
            .remote_candidates
            .push((session.0, candidate.map(str::to_string)));
    }

    fn set_controlling(&mut self, _session: SessionId, _controlling: bool) {}

    fn connection_state(&self, _session: SessionId) -> IceConnectionState {
        IceConnectionState::New
    }

    fn gathering_state(&self, _session: SessionId) -> IceGatheringState {
        IceGatheringState::New
    }
}

#[derive(Clone, Default)]
struct FakeDtls(Arc<Mutex<HashMap<usize, DtlsRole>>>);

impl DtlsTransport for FakeDtls {
    fn set_role(&mut self, session: SessionId, role: DtlsRole) {
        self.0.lock().unwrap().insert(session.0, role);
    }

    fn set_remote_fingerprint(&mut self, _session: SessionId, _algorithm: &str, _hex: &str) {}

    fn state(&self, _session: SessionId) -> DtlsState {
        DtlsState::New
    }
}

#[derive(Clone, Debug, PartialEq)]
struct SentFrame {
    stream_id: u16,
    ppid: u32,
    ordered: bool,
    reliability: ReliabilityParameter,
    data: Vec<u8>,
}

#[derive(Default)]
struct SctpState {
    established: bool,
    max_channels: Option<u16>,
    max_message_size: usize,
    sent: Vec<SentFrame>,
    reset: Vec<u16>,
}

#[derive(Clone)]
struct FakeSctp(Arc<Mutex<SctpState>>);

impl SctpTransport for FakeSctp {
    fn is_established(&self) -> bool {
        self.0.lock().unwrap().established
    }

    fn max_channels(&self) -> Option<u16> {
        self.0.lock().unwrap().max_channels
    }

    fn max_message_size(&self) -> usize {
        self.0.lock().unwrap().max_message_size
    }

    fn send(
        &mut self,
        stream_id: u16,
        ppid: u32,
        ordered: bool,
        reliability_parameter: ReliabilityParameter,
        data: &[u8],
    ) -> webrtc_pc_engine::Result<(), webrtc_pc_engine::DataChannelError> {
        self.0.lock().unwrap().sent.push(SentFrame {
            stream_id,
            ppid,
            ordered,
            reliability: reliability_parameter,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn reset_stream(&mut self, stream_id: u16) {
        self.0.lock().unwrap().reset.push(stream_id);
    }
}

/// Builds a data-channel-only [`PeerConnection`] with a 16 KiB default
/// max-message-size, returning a handle to its fake SCTP state for
/// inspection.
fn new_data_channel_pc() -> (PeerConnection, Arc<Mutex<SctpState>>) {
    let sctp_state = Arc::new(Mutex::new(SctpState {
        max_message_size: 16_384,
        ..SctpState::default()
    }));
    let pc = PeerConnection::new_data_channel_only(
        RtcConfiguration::default(),
        Box::new(FakeIce::default()),
        Box::new(FakeDtls::default()),
        Box::new(FakeSctp(sctp_state.clone())),
    );
    (pc, sctp_state)
}

fn new_media_pc() -> PeerConnection {
    PeerConnection::new(
        RtcConfiguration::default(),
        Box::new(FakeIce::default()),
        Box::new(FakeDtls::default()),
        Box::new(FakeSctp(Arc::new(Mutex::new(SctpState::default())))),
        Box::new(NullMediaPipeline),
    )
}

// 1. Offer/answer audio-only (spec scenario table, row 1).
#[test]
fn audio_only_offer_answer_negotiates_sendrecv() {
    let mut caller = new_media_pc();
    let mut callee = new_media_pc();

    let caller_tid = caller.add_transceiver(MediaKind::Audio, Direction::SendRecv);
    caller.set_codec_preferences(caller_tid, vec![opus_caps()]).unwrap();

    let offer = caller.create_offer().unwrap();
    assert_eq!(offer.media.len(), 1);
    let section = &offer.media[0];
    assert_eq!(section.media, MediaKind::Audio);
    assert_eq!(section.port, 9);
    assert_eq!(section.fmts, vec![111]);
    assert_eq!(section.mid.as_deref(), Some("audio0"));
    assert_eq!(section.direction, Some(Direction::SendRecv));
    assert_eq!(
        section.setup,
        Some(webrtc_pc_engine::sdp::Setup::ActPass)
    );
    assert_eq!(offer.bundle_group.as_deref(), Some(&["audio0".to_string()][..]));

    caller.set_description(DescriptionSource::Local, offer.clone()).unwrap();
    callee.set_description(DescriptionSource::Remote, offer).unwrap();

    let callee_tid = callee.add_transceiver(MediaKind::Audio, Direction::SendRecv);
    callee.set_codec_preferences(callee_tid, vec![opus_caps()]).unwrap();

    let answer = callee.create_answer().unwrap();
    assert_eq!(answer.media.len(), 1);
    let answer_section = &answer.media[0];
    assert_eq!(answer_section.direction, Some(Direction::SendRecv));
    assert_eq!(answer_section.setup, Some(webrtc_pc_engine::sdp::Setup::Active));
    assert_eq!(answer_section.mid.as_deref(), Some("audio0"));

    callee.set_description(DescriptionSource::Local, answer.clone()).unwrap();
    caller.set_description(DescriptionSource::Remote, answer).unwrap();

    let caller_t = caller
        .get_transceivers()
        .into_iter()
        .find(|t| t.id == caller_tid)
        .unwrap();
    assert_eq!(caller_t.current_direction, Some(Direction::SendRecv));
}

// 2. DCEP basic open (spec scenario table, row 2): the `chat` example's
// exact bytes, followed by an inbound ACK opening the channel.
#[test]
fn data_channel_open_sends_exact_dcep_open_and_opens_on_ack() {
    let (mut pc, sctp) = new_data_channel_pc();
    sctp.lock().unwrap().established = true;

    let init = DataChannelInit {
        label: "chat".into(),
        protocol: String::new(),
        ordered: true,
        reliability: DataChannelReliability::Reliable,
        priority: dcep::Priority::Low,
        negotiated: false,
        id: Some(4),
    };
    let id = pc.create_data_channel(init).unwrap();
    assert_eq!(id, DataChannelId(4));
    assert_eq!(
        pc.data_channel_mut(id).unwrap().ready_state,
        ReadyState::Connecting
    );

    let sent = sctp.lock().unwrap().sent.clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].stream_id, 4);
    assert_eq!(sent[0].ppid, dcep::PPID_CONTROL);
    assert!(sent[0].ordered);
    assert_eq!(sent[0].reliability, ReliabilityParameter::Reliable);
    assert_eq!(
        sent[0].data,
        vec![
            0x03, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, b'c', b'h',
            b'a', b't',
        ]
    );

    pc.handle_inbound_sctp_message(4, dcep::PPID_CONTROL, &dcep::encode_ack());

    let channel = pc.data_channel_mut(id).unwrap();
    assert_eq!(channel.ready_state, ReadyState::Open);
    let events = channel.drain_events();
    assert!(matches!(events.as_slice(), [DataChannelEvent::Open]));
}

// 3. Bundle of two video streams (spec scenario table, row 3).
#[test]
fn bundle_of_two_video_streams_marks_the_second_bundle_only() {
    let mut pc = new_media_pc();

    let first = pc.add_transceiver(MediaKind::Video, Direction::SendRecv);
    pc.set_codec_preferences(first, vec![vp8_caps()]).unwrap();
    let second = pc.add_transceiver(MediaKind::Video, Direction::SendRecv);
    pc.set_codec_preferences(second, vec![vp8_caps()]).unwrap();

    let offer = pc.create_offer().unwrap();
    assert_eq!(offer.media.len(), 2);

    let leader = &offer.media[0];
    assert!(!leader.bundle_only);
    assert_eq!(leader.port, 9);

    let follower = &offer.media[1];
    assert!(follower.bundle_only);
    assert_eq!(follower.port, 0);

    assert_eq!(
        offer.bundle_group.as_deref(),
        Some(&[leader.mid.clone().unwrap(), follower.mid.clone().unwrap()][..])
    );
}

// 4. ICE candidates queued before either description is set, drained in
// arrival order once both sides are present (spec scenario table, row 4).
#[test]
fn ice_candidates_queued_before_descriptions_drain_in_order() {
    let ice_state = Arc::new(Mutex::new(FakeIceState::default()));
    let mut pc = PeerConnection::new_data_channel_only(
        RtcConfiguration::default(),
        Box::new(FakeIce(ice_state.clone())),
        Box::new(FakeDtls::default()),
        Box::new(FakeSctp(Arc::new(Mutex::new(SctpState::default())))),
    );

    pc.add_ice_candidate(
        0,
        Some("candidate:1 1 udp 2122260223 10.0.0.1 5000 typ host".into()),
    )
    .unwrap();
    pc.add_ice_candidate(
        0,
        Some("candidate:2 1 udp 2122260222 10.0.0.2 5001 typ host".into()),
    )
    .unwrap();
    assert!(ice_state.lock().unwrap().remote_candidates.is_empty());

    let tid = pc.add_transceiver(MediaKind::Audio, Direction::SendRecv);
    pc.set_codec_preferences(tid, vec![opus_caps()]).unwrap();
    let offer = pc.create_offer().unwrap();
    pc.set_description(DescriptionSource::Local, offer.clone()).unwrap();

    let mut answer = offer;
    answer.sdp_type = SdpType::Answer;
    pc.set_description(DescriptionSource::Remote, answer).unwrap();

    let drained = ice_state.lock().unwrap().remote_candidates.clone();
    assert_eq!(drained.len(), 2);
    assert!(drained[0].1.as_deref().unwrap().contains("10.0.0.1"));
    assert!(drained[1].1.as_deref().unwrap().contains("10.0.0.2"));
}

// 5. Oversized message is rejected synchronously, without perturbing
// channel state (spec §8 "Boundary behaviours").
#[test]
fn oversized_message_is_rejected_without_touching_buffered_amount() {
    let (mut pc, sctp) = new_data_channel_pc();
    sctp.lock().unwrap().max_message_size = 8;

    let id = pc
        .create_data_channel(DataChannelInit {
            id: Some(0),
            negotiated: true,
            ..DataChannelInit::default()
        })
        .unwrap();
    assert_eq!(pc.data_channel_mut(id).unwrap().ready_state, ReadyState::Open);

    let err = pc.send_data(id, &[0u8; 100]).unwrap_err();
    let (raw, _trace) = err.unwrap();
    assert!(matches!(raw, webrtc_pc_engine::DataChannelError::TypeError(_)));

    let channel = pc.data_channel_mut(id).unwrap();
    assert_eq!(channel.buffered_amount, 0);
    assert_eq!(channel.ready_state, ReadyState::Open);
    assert!(sctp.lock().unwrap().sent.is_empty());
}

// 6. Graceful close defers the SCTP stream reset until outstanding bytes
// drain (spec §4.5.1 "Close", spec §4.5.5 buffered-amount accounting).
#[test]
fn close_with_outstanding_bytes_defers_reset_until_drained() {
    let (mut pc, sctp) = new_data_channel_pc();

    let id = pc
        .create_data_channel(DataChannelInit {
            id: Some(3),
            negotiated: true,
            ..DataChannelInit::default()
        })
        .unwrap();
    pc.data_channel_mut(id).unwrap().buffered_amount = 128;

    pc.close_data_channel(id).unwrap();
    assert!(sctp.lock().unwrap().reset.is_empty());
    assert_eq!(pc.data_channel_mut(id).unwrap().ready_state, ReadyState::Closing);

    pc.notify_bytes_sent(id, 128);
    assert_eq!(pc.data_channel_mut(id).unwrap().buffered_amount, 0);
    assert_eq!(sctp.lock().unwrap().reset, vec![3]);
}
