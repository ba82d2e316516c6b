//! SDP model, parser and serializer (spec §2 "SDP model", §6.1).
//!
//! This is not a general-purpose RFC 8866 implementation: it models and
//! round-trips exactly the subset of SDP this engine produces and consumes
//! (JSEP offers/answers for audio/video/application `m=` sections), the
//! same scoping `medea-jason` applies to its own SDP-adjacent code (it
//! never touches SDP directly itself — but everything *this* crate needs
//! to speak is enumerated in spec §6.1).

mod model;
mod parse;
mod serialize;

pub use model::{
    Direction, FmtpLine, MediaKind, MediaSection, RtpMap, Setup,
    SsrcLine, SessionDescription, SdpType,
};
pub use parse::parse_sdp;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_simple_offer() {
        let mut sdp = SessionDescription::new(SdpType::Offer, "1234", 0);
        sdp.ice_options_trickle = true;
        sdp.bundle_group = Some(vec!["audio0".into()]);

        let mut m = MediaSection::new(MediaKind::Audio, 9, "UDP/TLS/RTP/SAVPF");
        m.fmts.push(111);
        m.mid = Some("audio0".into());
        m.ice_ufrag = Some("ufrag".into());
        m.ice_pwd = Some("password1234567890123".into());
        m.setup = Some(Setup::ActPass);
        m.fingerprint = Some(("sha-256".into(), "AB:CD:EF".into()));
        m.direction = Some(Direction::SendRecv);
        m.rtcp_mux = true;
        m.rtpmaps.push(RtpMap {
            payload_type: 111,
            codec: "opus".into(),
            clock_rate: 48_000,
            channels: Some(2),
        });
        sdp.media.push(m);

        let text = sdp.to_string();
        let parsed = parse_sdp(&text, SdpType::Offer).unwrap();

        assert_eq!(parsed.media.len(), 1);
        assert_eq!(parsed.media[0].mid.as_deref(), Some("audio0"));
        assert_eq!(parsed.media[0].fmts, vec![111]);
        assert_eq!(parsed.media[0].setup, Some(Setup::ActPass));
        assert_eq!(parsed.media[0].direction, Some(Direction::SendRecv));
        assert_eq!(parsed.bundle_group.as_deref(), Some(&["audio0".to_string()][..]));
    }
}
