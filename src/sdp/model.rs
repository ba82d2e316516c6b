//! In-memory SDP model.

use std::fmt;

/// JSEP description type carried alongside the SDP text (spec §4.1.3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

impl SdpType {
    /// String as it appears on the wire / in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Pranswer => "pranswer",
            Self::Rollback => "rollback",
        }
    }
}

/// `m=` media kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MediaKind {
    Audio,
    Video,
    Application,
}

impl MediaKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Application => "application",
        }
    }
}

/// `a=setup` value (RFC 4145 / RFC 8842).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Setup {
    ActPass,
    Active,
    Passive,
}

impl Setup {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActPass => "actpass",
            Self::Active => "active",
            Self::Passive => "passive",
        }
    }

    /// Answerer setup given the offerer's setup, per spec §4.1.2 step 2/3.
    ///
    /// Returns `None` if the combination is invalid (both sides passive,
    /// both sides active).
    #[must_use]
    pub fn answer_for(offered: Self) -> Option<Self> {
        match offered {
            Self::ActPass => Some(Self::Active),
            Self::Active => Some(Self::Passive),
            Self::Passive => Some(Self::Active),
        }
    }

    /// `true` if this setup implies the DTLS client role (spec §4.1.4:
    /// "DTLS client-mode: client ⇔ (local setup = active)").
    #[must_use]
    pub fn is_dtls_client(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// `a=sendrecv`/`a=sendonly`/`a=recvonly`/`a=inactive` direction attribute.
///
/// `None` below models the "direction `none`" case from spec §3's
/// Transceiver direction intent; it never appears on the wire, it is only
/// ever a local intent that causes the section to be rejected.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    SendRecv,
    SendOnly,
    RecvOnly,
    Inactive,
}

impl Direction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SendRecv => "sendrecv",
            Self::SendOnly => "sendonly",
            Self::RecvOnly => "recvonly",
            Self::Inactive => "inactive",
        }
    }

    #[must_use]
    pub fn can_send(self) -> bool {
        matches!(self, Self::SendRecv | Self::SendOnly)
    }

    #[must_use]
    pub fn can_recv(self) -> bool {
        matches!(self, Self::SendRecv | Self::RecvOnly)
    }

    /// Builds a direction from independent send/recv capabilities.
    #[must_use]
    pub fn from_caps(can_send: bool, can_recv: bool) -> Self {
        match (can_send, can_recv) {
            (true, true) => Self::SendRecv,
            (true, false) => Self::SendOnly,
            (false, true) => Self::RecvOnly,
            (false, false) => Self::Inactive,
        }
    }

    /// Intersects two directions per spec §4.1.2 step 3.
    ///
    /// Returns `None` when the intersection is `none` (section must be
    /// rejected with port 0).
    #[must_use]
    pub fn intersect(local: Self, remote: Self) -> Option<Self> {
        let send = local.can_send() && remote.can_recv();
        let recv = local.can_recv() && remote.can_send();
        if !send && !recv {
            None
        } else {
            Some(Self::from_caps(send, recv))
        }
    }
}

/// `a=rtpmap:<pt> <codec>/<clockrate>[/<channels>]`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RtpMap {
    pub payload_type: u8,
    pub codec: String,
    pub clock_rate: u32,
    pub channels: Option<u8>,
}

/// `a=fmtp:<pt> <params>`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FmtpLine {
    pub payload_type: u8,
    pub params: String,
}

/// `a=ssrc:<ssrc> <attribute>:<value>`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SsrcLine {
    pub ssrc: u32,
    pub attribute: String,
    pub value: String,
}

/// One `m=` section and all attributes hanging off it.
#[derive(Clone, Debug)]
pub struct MediaSection {
    pub media: MediaKind,
    pub port: u16,
    pub proto: String,
    /// Payload type list from the `m=` line (empty for `application`
    /// sections, which instead carry a single `webrtc-datachannel` format
    /// token represented by `sctp_port`/`app_format`).
    pub fmts: Vec<u8>,
    pub app_format: Option<String>,

    pub mid: Option<String>,
    pub bundle_only: bool,

    pub ice_ufrag: Option<String>,
    pub ice_pwd: Option<String>,
    pub setup: Option<Setup>,
    pub fingerprint: Option<(String, String)>,
    pub direction: Option<Direction>,

    pub rtcp_mux: bool,
    pub rtcp_rsize: bool,
    pub rtcp_mux_only: bool,

    pub sctp_port: Option<u16>,

    pub rtpmaps: Vec<RtpMap>,
    pub fmtps: Vec<FmtpLine>,
    pub ssrcs: Vec<SsrcLine>,
    pub msid: Option<String>,

    /// Raw `a=candidate:...` lines (without the leading `a=`).
    pub candidates: Vec<String>,
    pub end_of_candidates: bool,

    /// `true` if an `a=rid` attribute was present; per spec §9 Open
    /// Questions this engine explicitly rejects sections carrying it
    /// rather than driving simulcast end-to-end.
    pub has_rid: bool,
}

impl MediaSection {
    #[must_use]
    pub fn new(media: MediaKind, port: u16, proto: impl Into<String>) -> Self {
        Self {
            media,
            port,
            proto: proto.into(),
            fmts: Vec::new(),
            app_format: None,
            mid: None,
            bundle_only: false,
            ice_ufrag: None,
            ice_pwd: None,
            setup: None,
            fingerprint: None,
            direction: None,
            rtcp_mux: false,
            rtcp_rsize: false,
            rtcp_mux_only: false,
            sctp_port: None,
            rtpmaps: Vec::new(),
            fmtps: Vec::new(),
            ssrcs: Vec::new(),
            msid: None,
            candidates: Vec::new(),
            end_of_candidates: false,
            has_rid: false,
        }
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.port == 0
    }

    /// Marks this section as rejected per spec §4.1.2 step 1/5: mirrored
    /// with port 0, every negotiable attribute stripped.
    pub fn reject(&mut self) {
        self.port = 0;
        self.direction = Some(Direction::Inactive);
    }
}

/// A full session description: one `o=`/`s=`/`t=` plus an ordered list of
/// `m=` sections (spec §3, §6.1).
#[derive(Clone, Debug)]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub sess_id: String,
    pub sess_version: u64,
    pub ice_options_trickle: bool,
    pub bundle_group: Option<Vec<String>>,
    pub media: Vec<MediaSection>,
}

impl SessionDescription {
    #[must_use]
    pub fn new(sdp_type: SdpType, sess_id: impl Into<String>, sess_version: u64) -> Self {
        Self {
            sdp_type,
            sess_id: sess_id.into(),
            sess_version,
            ice_options_trickle: true,
            bundle_group: None,
            media: Vec::new(),
        }
    }

    /// Returns the mline index of the bundle leader, if bundling, else
    /// `None`. The leader is the first non-rejected `m=` section whose mid
    /// appears in the `BUNDLE` group (spec §4.1.6).
    #[must_use]
    pub fn bundle_leader_index(&self) -> Option<usize> {
        let group = self.bundle_group.as_ref()?;
        let leader_mid = group.first()?;
        self.media
            .iter()
            .position(|m| m.mid.as_deref() == Some(leader_mid.as_str()))
    }
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        super::serialize::write_sdp(self, f)
    }
}
