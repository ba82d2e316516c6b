//! SDP parsing (spec §6.1).

use crate::error::SdpError;

use super::model::{
    Direction, FmtpLine, MediaKind, MediaSection, RtpMap, SdpType,
    SessionDescription, Setup, SsrcLine,
};

/// Parses `text` as a session description of the given JSEP `sdp_type`.
///
/// # Errors
///
/// Returns [`SdpError`] if a required line is missing or malformed. This
/// is deliberately lenient about unknown attributes (they are ignored)
/// since a remote peer may offer attributes this engine does not model.
pub fn parse_sdp(text: &str, sdp_type: SdpType) -> Result<SessionDescription, SdpError> {
    let mut lines = text.lines().peekable();

    let mut sess_id = String::new();
    let mut sess_version = 0u64;
    let mut saw_v = false;
    let mut saw_s = false;
    let mut saw_t = false;
    let mut ice_options_trickle = false;
    let mut bundle_group = None;

    // Session-level lines, up to the first `m=`.
    while let Some(line) = lines.peek() {
        if line.starts_with("m=") {
            break;
        }
        let line = lines.next().unwrap();
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let (tag, rest) = split_line(line)?;
        match tag {
            'v' => {
                saw_v = true;
            }
            'o' => {
                let fields: Vec<&str> = rest.split_whitespace().collect();
                if fields.len() < 2 {
                    return Err(SdpError::MalformedSessionLine(line.to_string()));
                }
                sess_id = fields[1].to_string();
                if fields.len() >= 3 {
                    sess_version = fields[2]
                        .parse()
                        .map_err(|_| SdpError::InvalidNumber(fields[2].to_string()))?;
                }
            }
            's' => {
                saw_s = true;
            }
            't' => {
                saw_t = true;
            }
            'a' => {
                if rest == "ice-options:trickle" {
                    ice_options_trickle = true;
                } else if let Some(mids) = rest.strip_prefix("group:BUNDLE ") {
                    bundle_group =
                        Some(mids.split_whitespace().map(str::to_string).collect());
                }
            }
            _ => {}
        }
    }

    if !saw_v || !saw_s || !saw_t || sess_id.is_empty() {
        return Err(SdpError::MalformedSessionLine(
            "missing v=/o=/s=/t= line".into(),
        ));
    }

    let mut sdp = SessionDescription::new(sdp_type, sess_id, sess_version);
    sdp.ice_options_trickle = ice_options_trickle;
    sdp.bundle_group = bundle_group;

    while let Some(line) = lines.next() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        if !line.starts_with("m=") {
            // Stray top-level line between sections; ignore.
            continue;
        }
        let mut section = parse_mline(line)?;
        while let Some(next) = lines.peek() {
            if next.starts_with("m=") {
                break;
            }
            let attr_line = lines.next().unwrap().trim_end_matches('\r').to_string();
            if attr_line.is_empty() {
                continue;
            }
            apply_attribute(&mut section, &attr_line)?;
        }
        sdp.media.push(section);
    }

    Ok(sdp)
}

fn split_line(line: &str) -> Result<(char, &str), SdpError> {
    let mut chars = line.chars();
    let tag = chars
        .next()
        .ok_or_else(|| SdpError::MalformedAttribute(line.to_string()))?;
    let rest = line
        .get(2..)
        .ok_or_else(|| SdpError::MalformedAttribute(line.to_string()))?;
    Ok((tag, rest))
}

fn parse_mline(line: &str) -> Result<MediaSection, SdpError> {
    let rest = line
        .strip_prefix("m=")
        .ok_or_else(|| SdpError::MalformedMediaLine(line.to_string()))?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(SdpError::MalformedMediaLine(line.to_string()));
    }
    let media = match fields[0] {
        "audio" => MediaKind::Audio,
        "video" => MediaKind::Video,
        "application" => MediaKind::Application,
        other => return Err(SdpError::MalformedMediaLine(format!("unknown media type {}", other))),
    };
    let port: u16 = fields[1]
        .parse()
        .map_err(|_| SdpError::InvalidNumber(fields[1].to_string()))?;
    let proto = fields[2].to_string();
    let mut section = MediaSection::new(media, port, proto);

    if media == MediaKind::Application {
        section.app_format = Some(fields[3].to_string());
    } else {
        for fmt in &fields[3..] {
            let pt: u8 = fmt
                .parse()
                .map_err(|_| SdpError::InvalidNumber((*fmt).to_string()))?;
            section.fmts.push(pt);
        }
    }
    Ok(section)
}

fn apply_attribute(section: &mut MediaSection, line: &str) -> Result<(), SdpError> {
    if line.starts_with("c=") {
        return Ok(());
    }
    let rest = match line.strip_prefix("a=") {
        Some(rest) => rest,
        None => return Ok(()),
    };

    if let Some(mid) = rest.strip_prefix("mid:") {
        section.mid = Some(mid.to_string());
    } else if rest == "bundle-only" {
        section.bundle_only = true;
    } else if let Some(ufrag) = rest.strip_prefix("ice-ufrag:") {
        section.ice_ufrag = Some(ufrag.to_string());
    } else if let Some(pwd) = rest.strip_prefix("ice-pwd:") {
        section.ice_pwd = Some(pwd.to_string());
    } else if let Some(setup) = rest.strip_prefix("setup:") {
        section.setup = Some(match setup {
            "actpass" => Setup::ActPass,
            "active" => Setup::Active,
            "passive" => Setup::Passive,
            other => {
                return Err(SdpError::MalformedAttribute(format!(
                    "unknown setup {}",
                    other
                )))
            }
        });
    } else if let Some(fp) = rest.strip_prefix("fingerprint:") {
        let mut parts = fp.splitn(2, ' ');
        let algo = parts.next().unwrap_or_default().to_string();
        let hex = parts.next().unwrap_or_default().to_string();
        section.fingerprint = Some((algo, hex));
    } else if rest == "sendrecv" {
        section.direction = Some(Direction::SendRecv);
    } else if rest == "sendonly" {
        section.direction = Some(Direction::SendOnly);
    } else if rest == "recvonly" {
        section.direction = Some(Direction::RecvOnly);
    } else if rest == "inactive" {
        section.direction = Some(Direction::Inactive);
    } else if rest == "rtcp-mux" {
        section.rtcp_mux = true;
    } else if rest == "rtcp-rsize" {
        section.rtcp_rsize = true;
    } else if rest == "rtcp-mux-only" {
        section.rtcp_mux_only = true;
    } else if let Some(port) = rest.strip_prefix("sctp-port:") {
        section.sctp_port = Some(
            port.parse()
                .map_err(|_| SdpError::InvalidNumber(port.to_string()))?,
        );
    } else if let Some(rtpmap) = rest.strip_prefix("rtpmap:") {
        section.rtpmaps.push(parse_rtpmap(rtpmap)?);
    } else if let Some(fmtp) = rest.strip_prefix("fmtp:") {
        let mut parts = fmtp.splitn(2, ' ');
        let pt: u8 = parts
            .next()
            .ok_or_else(|| SdpError::MalformedAttribute(line.to_string()))?
            .parse()
            .map_err(|_| SdpError::InvalidNumber(line.to_string()))?;
        let params = parts.next().unwrap_or_default().to_string();
        section.fmtps.push(FmtpLine {
            payload_type: pt,
            params,
        });
    } else if let Some(msid) = rest.strip_prefix("msid:") {
        section.msid = Some(msid.to_string());
    } else if let Some(ssrc) = rest.strip_prefix("ssrc:") {
        section.ssrcs.push(parse_ssrc(ssrc)?);
    } else if let Some(cand) = rest.strip_prefix("candidate:") {
        section.candidates.push(cand.to_string());
    } else if rest == "end-of-candidates" {
        section.end_of_candidates = true;
    } else if rest.starts_with("rid:") || rest.starts_with("rid=") {
        section.has_rid = true;
    }
    Ok(())
}

fn parse_rtpmap(rest: &str) -> Result<RtpMap, SdpError> {
    let mut parts = rest.splitn(2, ' ');
    let pt: u8 = parts
        .next()
        .ok_or_else(|| SdpError::MalformedAttribute(rest.to_string()))?
        .parse()
        .map_err(|_| SdpError::InvalidNumber(rest.to_string()))?;
    let codec_spec = parts.next().unwrap_or_default();
    let mut pieces = codec_spec.split('/');
    let codec = pieces.next().unwrap_or_default().to_string();
    let clock_rate: u32 = pieces
        .next()
        .ok_or_else(|| SdpError::MalformedAttribute(rest.to_string()))?
        .parse()
        .map_err(|_| SdpError::InvalidNumber(rest.to_string()))?;
    let channels = pieces.next().and_then(|s| s.parse().ok());
    Ok(RtpMap {
        payload_type: pt,
        codec,
        clock_rate,
        channels,
    })
}

fn parse_ssrc(rest: &str) -> Result<SsrcLine, SdpError> {
    let mut parts = rest.splitn(2, ' ');
    let ssrc: u32 = parts
        .next()
        .ok_or_else(|| SdpError::MalformedAttribute(rest.to_string()))?
        .parse()
        .map_err(|_| SdpError::InvalidNumber(rest.to_string()))?;
    let kv = parts.next().unwrap_or_default();
    let mut kv_parts = kv.splitn(2, ':');
    let attribute = kv_parts.next().unwrap_or_default().to_string();
    let value = kv_parts.next().unwrap_or_default().to_string();
    Ok(SsrcLine {
        ssrc,
        attribute,
        value,
    })
}
