//! Session description text <-> [`SdpDocument`]

use super::document::{
    Bandwidth, BandwidthKind, MediaKind, MediaSection, PayloadType, RtpMap, SdpDocument,
    SectionLine,
};
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

const LINE_TERMINATOR: &str = "\r\n";

/// Parse session description text
///
/// Fails only when the text has no `m=` line. Lines that are not
/// understood are kept verbatim at the position they were read.
pub fn parse(text: &str) -> Result<SdpDocument> {
    let mut doc = SdpDocument::new();
    let mut current: Option<MediaSection> = None;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        if let Some(media) = line.strip_prefix("m=") {
            if let Some(section) = current.take() {
                doc.push_media_section(section);
            }
            current = Some(parse_media_line(media, line));
            continue;
        }

        match current.as_mut() {
            Some(section) if section.is_opaque() => {
                section.push_line(SectionLine::Opaque(line.to_string()))
            }
            Some(section) => section.push_line(parse_section_line(line)),
            None => doc.push_session_line(line),
        }
    }

    if let Some(section) = current.take() {
        doc.push_media_section(section);
    }

    if doc.media_sections().is_empty() {
        return Err(Error::MalformedSdp(
            "description contains no media sections".to_string(),
        ));
    }

    Ok(doc)
}

/// Render a document back to text with CRLF terminators
pub fn serialize(doc: &SdpDocument) -> String {
    let mut out = String::new();

    for line in doc.session_lines() {
        out.push_str(line);
        out.push_str(LINE_TERMINATOR);
    }

    for section in doc.media_sections() {
        out.push_str(&section.media_line());
        out.push_str(LINE_TERMINATOR);
        for line in section.lines() {
            out.push_str(&line.to_string());
            out.push_str(LINE_TERMINATOR);
        }
    }

    out
}

impl FromStr for SdpDocument {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

impl fmt::Display for SdpDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize(self))
    }
}

fn parse_media_line(media: &str, line: &str) -> MediaSection {
    let mut fields = media.split_whitespace();
    let kind = MediaKind::from_token(fields.next().unwrap_or_default());

    if matches!(kind, MediaKind::Other(_)) {
        return MediaSection::opaque(kind, line.to_string());
    }

    let (Some(port), Some(protocol)) = (fields.next(), fields.next()) else {
        return MediaSection::opaque(kind, line.to_string());
    };

    let payloads: Option<Vec<PayloadType>> = fields.map(|f| f.parse().ok()).collect();
    match payloads {
        Some(payloads) => {
            let mut section = MediaSection::new(kind, port, protocol);
            for pt in payloads {
                section.push_payload(pt);
            }
            section
        }
        // Non-RTP format list, nothing to rewrite
        None => MediaSection::opaque(kind, line.to_string()),
    }
}

fn parse_section_line(line: &str) -> SectionLine {
    parse_typed_line(line).unwrap_or_else(|| SectionLine::Opaque(line.to_string()))
}

fn parse_typed_line(line: &str) -> Option<SectionLine> {
    if let Some(bw) = line.strip_prefix("b=") {
        let (kind, limit) = bw.split_once(':')?;
        return Some(SectionLine::Bandwidth(Bandwidth::new(
            BandwidthKind::from_token(kind)?,
            limit.trim().parse().ok()?,
        )));
    }

    if let Some(value) = line.strip_prefix("a=framerate:") {
        return Some(SectionLine::FrameRate(value.to_string()));
    }

    if let Some(rest) = line.strip_prefix("a=rtpmap:") {
        let (payload, encoding) = split_payload(rest)?;
        return Some(SectionLine::Rtpmap {
            payload,
            map: parse_rtpmap(encoding)?,
        });
    }

    if let Some(rest) = line.strip_prefix("a=fmtp:") {
        let (payload, params) = split_payload(rest)?;
        return Some(SectionLine::Fmtp {
            payload,
            params: params.to_string(),
        });
    }

    if let Some(rest) = line.strip_prefix("a=rtcp-fb:") {
        let (payload, mechanism) = split_payload(rest)?;
        return Some(SectionLine::RtcpFb {
            payload,
            mechanism: mechanism.to_string(),
        });
    }

    None
}

/// Split `<pt> <value>`; wildcard or non-numeric payloads yield None
fn split_payload(rest: &str) -> Option<(PayloadType, &str)> {
    let (payload, value) = rest.split_once(' ')?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some((payload.parse().ok()?, value))
}

fn parse_rtpmap(encoding: &str) -> Option<RtpMap> {
    let mut parts = encoding.splitn(3, '/');
    let codec = parts.next()?.trim();
    if codec.is_empty() {
        return None;
    }
    let clock_rate = parts.next()?.trim().parse().ok()?;
    let encoding_params = parts.next().map(|p| p.trim().to_string());

    Some(RtpMap {
        codec: codec.to_string(),
        clock_rate,
        encoding_params,
    })
}
