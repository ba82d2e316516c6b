//! SDP serialization (spec §6.1).

use std::fmt::{self, Write as _};

use super::model::{MediaSection, SessionDescription};

pub(crate) fn write_sdp(sdp: &SessionDescription, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "v=0")?;
    writeln!(
        f,
        "o=- {} {} IN IP4 0.0.0.0",
        sdp.sess_id, sdp.sess_version
    )?;
    writeln!(f, "s=-")?;
    writeln!(f, "t=0 0")?;
    if sdp.ice_options_trickle {
        writeln!(f, "a=ice-options:trickle")?;
    }
    if let Some(group) = &sdp.bundle_group {
        if !group.is_empty() {
            writeln!(f, "a=group:BUNDLE {}", group.join(" "))?;
        }
    }
    for m in &sdp.media {
        write_media_section(m, f)?;
    }
    Ok(())
}

fn write_media_section(m: &MediaSection, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let fmt_list = if m.media == super::model::MediaKind::Application {
        m.app_format.clone().unwrap_or_else(|| "webrtc-datachannel".into())
    } else {
        let mut s = String::new();
        for (i, pt) in m.fmts.iter().enumerate() {
            if i > 0 {
                s.push(' ');
            }
            let _ = write!(s, "{}", pt);
        }
        s
    };
    writeln!(f, "m={} {} {} {}", m.media.as_str(), m.port, m.proto, fmt_list)?;
    writeln!(f, "c=IN IP4 0.0.0.0")?;

    if let Some(mid) = &m.mid {
        writeln!(f, "a=mid:{}", mid)?;
    }
    if m.bundle_only {
        writeln!(f, "a=bundle-only")?;
    }
    if let Some(ufrag) = &m.ice_ufrag {
        writeln!(f, "a=ice-ufrag:{}", ufrag)?;
    }
    if let Some(pwd) = &m.ice_pwd {
        writeln!(f, "a=ice-pwd:{}", pwd)?;
    }
    if let Some(setup) = m.setup {
        writeln!(f, "a=setup:{}", setup.as_str())?;
    }
    if let Some((algo, hex)) = &m.fingerprint {
        writeln!(f, "a=fingerprint:{} {}", algo, hex)?;
    }
    if let Some(direction) = m.direction {
        writeln!(f, "a={}", direction.as_str())?;
    }
    if m.rtcp_mux {
        writeln!(f, "a=rtcp-mux")?;
    }
    if m.rtcp_rsize {
        writeln!(f, "a=rtcp-rsize")?;
    }
    if m.rtcp_mux_only {
        writeln!(f, "a=rtcp-mux-only")?;
    }
    if let Some(port) = m.sctp_port {
        writeln!(f, "a=sctp-port:{}", port)?;
    }
    for rtpmap in &m.rtpmaps {
        if let Some(ch) = rtpmap.channels {
            writeln!(
                f,
                "a=rtpmap:{} {}/{}/{}",
                rtpmap.payload_type, rtpmap.codec, rtpmap.clock_rate, ch
            )?;
        } else {
            writeln!(
                f,
                "a=rtpmap:{} {}/{}",
                rtpmap.payload_type, rtpmap.codec, rtpmap.clock_rate
            )?;
        }
    }
    for fmtp in &m.fmtps {
        writeln!(f, "a=fmtp:{} {}", fmtp.payload_type, fmtp.params)?;
    }
    if let Some(msid) = &m.msid {
        writeln!(f, "a=msid:{}", msid)?;
    }
    for ssrc in &m.ssrcs {
        writeln!(f, "a=ssrc:{} {}:{}", ssrc.ssrc, ssrc.attribute, ssrc.value)?;
    }
    for cand in &m.candidates {
        writeln!(f, "a=candidate:{}", cand)?;
    }
    if m.end_of_candidates {
        writeln!(f, "a=end-of-candidates")?;
    }
    Ok(())
}
