//! In-memory session description model
//!
//! A parsed description keeps every line it read, in order. Lines the
//! engine understands (`b=`, `a=rtpmap`, `a=fmtp`, `a=rtcp-fb`,
//! `a=framerate`) are held as typed [`SectionLine`] values; everything
//! else is kept verbatim. The per-payload mappings (`rtpmap`, `fmtp`,
//! `rtcp_feedback`) are views computed from those lines, so a payload
//! removed from a section can never linger in one of them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// RTP payload type number as declared on an `m=` line
pub type PayloadType = u8;

/// Media type of an `m=` section
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// `m=audio`
    Audio,
    /// `m=video`
    Video,
    /// Anything else (application, text, ...), passed through untouched
    Other(String),
}

impl MediaKind {
    pub(crate) fn from_token(token: &str) -> Self {
        match token {
            "audio" => MediaKind::Audio,
            "video" => MediaKind::Video,
            other => MediaKind::Other(other.to_string()),
        }
    }

    /// Token used on the `m=` line
    pub fn as_str(&self) -> &str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Other(token) => token,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bandwidth modifier of a `b=` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BandwidthKind {
    /// Conference total, kbps
    Ct,
    /// Application specific, kbps
    As,
    /// Transport independent application specific, bps
    Tias,
}

impl BandwidthKind {
    pub(crate) fn from_token(token: &str) -> Option<Self> {
        match token {
            "CT" => Some(BandwidthKind::Ct),
            "AS" => Some(BandwidthKind::As),
            "TIAS" => Some(BandwidthKind::Tias),
            _ => None,
        }
    }

    /// Token used on the `b=` line
    pub fn as_str(&self) -> &'static str {
        match self {
            BandwidthKind::Ct => "CT",
            BandwidthKind::As => "AS",
            BandwidthKind::Tias => "TIAS",
        }
    }
}

/// One `b=<kind>:<limit>` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bandwidth {
    pub kind: BandwidthKind,
    pub limit: u64,
}

impl Bandwidth {
    pub fn new(kind: BandwidthKind, limit: u64) -> Self {
        Self { kind, limit }
    }
}

/// Payload mapping of an `a=rtpmap` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpMap {
    /// Encoding name as written (case preserved)
    pub codec: String,
    /// Clock rate in Hz
    pub clock_rate: u32,
    /// Optional encoding parameters (channel count for audio)
    pub encoding_params: Option<String>,
}

impl RtpMap {
    pub fn new(codec: impl Into<String>, clock_rate: u32) -> Self {
        Self {
            codec: codec.into(),
            clock_rate,
            encoding_params: None,
        }
    }
}

impl fmt::Display for RtpMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.codec, self.clock_rate)?;
        if let Some(params) = &self.encoding_params {
            write!(f, "/{}", params)?;
        }
        Ok(())
    }
}

/// One line inside a media section, after the `m=` line
#[derive(Debug, Clone, PartialEq)]
pub enum SectionLine {
    /// `a=rtpmap:<pt> <codec>/<rate>[/<params>]`
    Rtpmap { payload: PayloadType, map: RtpMap },
    /// `a=fmtp:<pt> <params>`
    Fmtp { payload: PayloadType, params: String },
    /// `a=rtcp-fb:<pt> <mechanism>`
    RtcpFb { payload: PayloadType, mechanism: String },
    /// `b=CT|AS|TIAS:<limit>`
    Bandwidth(Bandwidth),
    /// `a=framerate:<value>`, text kept as written
    FrameRate(String),
    /// Any other line, verbatim
    Opaque(String),
}

impl SectionLine {
    /// Payload type this line is bound to, if any
    pub fn payload(&self) -> Option<PayloadType> {
        match self {
            SectionLine::Rtpmap { payload, .. }
            | SectionLine::Fmtp { payload, .. }
            | SectionLine::RtcpFb { payload, .. } => Some(*payload),
            _ => None,
        }
    }
}

impl fmt::Display for SectionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionLine::Rtpmap { payload, map } => write!(f, "a=rtpmap:{} {}", payload, map),
            SectionLine::Fmtp { payload, params } => write!(f, "a=fmtp:{} {}", payload, params),
            SectionLine::RtcpFb { payload, mechanism } => {
                write!(f, "a=rtcp-fb:{} {}", payload, mechanism)
            }
            SectionLine::Bandwidth(bw) => write!(f, "b={}:{}", bw.kind.as_str(), bw.limit),
            SectionLine::FrameRate(value) => write!(f, "a=framerate:{}", value),
            SectionLine::Opaque(line) => f.write_str(line),
        }
    }
}

/// One `m=` section and the lines that follow it
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSection {
    pub(crate) kind: MediaKind,
    pub(crate) port: String,
    pub(crate) protocol: String,
    pub(crate) payloads: Vec<PayloadType>,
    /// Verbatim `m=` line for sections the engine does not interpret
    pub(crate) raw_media_line: Option<String>,
    pub(crate) lines: Vec<SectionLine>,
}

impl MediaSection {
    /// Create an empty audio/video section
    pub fn new(kind: MediaKind, port: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            kind,
            port: port.into(),
            protocol: protocol.into(),
            payloads: Vec::new(),
            raw_media_line: None,
            lines: Vec::new(),
        }
    }

    pub(crate) fn opaque(kind: MediaKind, media_line: String) -> Self {
        Self {
            kind,
            port: String::new(),
            protocol: String::new(),
            payloads: Vec::new(),
            raw_media_line: Some(media_line),
            lines: Vec::new(),
        }
    }

    pub fn kind(&self) -> &MediaKind {
        &self.kind
    }

    /// Payload types in wire preference order
    pub fn payloads(&self) -> &[PayloadType] {
        &self.payloads
    }

    pub fn lines(&self) -> &[SectionLine] {
        &self.lines
    }

    /// True for sections passed through without inspection
    pub fn is_opaque(&self) -> bool {
        self.raw_media_line.is_some()
    }

    /// Render the `m=` line
    pub fn media_line(&self) -> String {
        if let Some(raw) = &self.raw_media_line {
            return raw.clone();
        }

        let mut line = format!("m={} {} {}", self.kind, self.port, self.protocol);
        for payload in &self.payloads {
            line.push(' ');
            line.push_str(&payload.to_string());
        }
        line
    }

    pub fn push_payload(&mut self, payload: PayloadType) {
        self.payloads.push(payload);
    }

    pub fn push_line(&mut self, line: SectionLine) {
        self.lines.push(line);
    }

    /// `rtpmap` entries keyed by payload type
    pub fn rtpmap(&self) -> BTreeMap<PayloadType, &RtpMap> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                SectionLine::Rtpmap { payload, map } => Some((*payload, map)),
                _ => None,
            })
            .collect()
    }

    /// Encoding name for a payload type, from its `rtpmap` line
    pub fn codec_name(&self, payload: PayloadType) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            SectionLine::Rtpmap { payload: pt, map } if *pt == payload => Some(map.codec.as_str()),
            _ => None,
        })
    }

    /// `fmtp` parameter strings keyed by payload type
    pub fn fmtp(&self) -> BTreeMap<PayloadType, &str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                SectionLine::Fmtp { payload, params } => Some((*payload, params.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn fmtp_for(&self, payload: PayloadType) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            SectionLine::Fmtp { payload: pt, params } if *pt == payload => Some(params.as_str()),
            _ => None,
        })
    }

    /// Feedback mechanisms keyed by payload type
    pub fn rtcp_feedback(&self) -> BTreeMap<PayloadType, BTreeSet<&str>> {
        let mut feedback: BTreeMap<PayloadType, BTreeSet<&str>> = BTreeMap::new();
        for line in &self.lines {
            if let SectionLine::RtcpFb { payload, mechanism } = line {
                feedback.entry(*payload).or_default().insert(mechanism.as_str());
            }
        }
        feedback
    }

    pub fn bandwidth(&self) -> Vec<Bandwidth> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                SectionLine::Bandwidth(bw) => Some(*bw),
                _ => None,
            })
            .collect()
    }

    /// Declared frame rate, if present and numeric
    pub fn frame_rate(&self) -> Option<f64> {
        self.lines.iter().find_map(|line| match line {
            SectionLine::FrameRate(value) => value.trim().parse().ok(),
            _ => None,
        })
    }

    /// Value of the `a=mid:` attribute
    pub fn mid(&self) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            SectionLine::Opaque(text) => text.strip_prefix("a=mid:"),
            _ => None,
        })
    }

    /// Remove a payload type from the `m=` line and every line bound to it
    pub fn remove_payload(&mut self, payload: PayloadType) {
        self.payloads.retain(|pt| *pt != payload);
        self.lines.retain(|line| line.payload() != Some(payload));
    }

    /// Drop payload-bound lines whose payload is not on the `m=` line
    pub(crate) fn drop_orphan_lines(&mut self) {
        let payloads = &self.payloads;
        self.lines
            .retain(|line| line.payload().map_or(true, |pt| payloads.contains(&pt)));
    }

    /// Insert an `rtpmap` line ahead of the first payload-bound line
    pub fn insert_rtpmap(&mut self, payload: PayloadType, map: RtpMap) {
        let at = self
            .lines
            .iter()
            .position(|line| line.payload().is_some())
            .unwrap_or(self.lines.len());
        self.lines.insert(at, SectionLine::Rtpmap { payload, map });
    }

    /// Replace the `fmtp` parameters of a payload, adding the line if missing
    ///
    /// A new line is placed right after the payload's `rtpmap` line.
    pub fn set_fmtp(&mut self, payload: PayloadType, new_params: impl Into<String>) {
        let new_params = new_params.into();

        for line in &mut self.lines {
            if let SectionLine::Fmtp { payload: pt, params } = line {
                if *pt == payload {
                    *params = new_params;
                    return;
                }
            }
        }

        let anchor = self
            .lines
            .iter()
            .position(|line| {
                matches!(line, SectionLine::Rtpmap { payload: pt, .. } if *pt == payload)
            })
            .or_else(|| self.lines.iter().rposition(|line| line.payload() == Some(payload)));

        let at = anchor.map_or(self.lines.len(), |idx| idx + 1);
        self.lines.insert(
            at,
            SectionLine::Fmtp {
                payload,
                params: new_params,
            },
        );
    }

    /// Rewrite every `fmtp` parameter string in place
    pub fn map_fmtp<F>(&mut self, mut f: F)
    where
        F: FnMut(PayloadType, &str) -> Option<String>,
    {
        for line in &mut self.lines {
            if let SectionLine::Fmtp { payload, params } = line {
                if let Some(rewritten) = f(*payload, params) {
                    *params = rewritten;
                }
            }
        }
    }

    /// Keep only the feedback mechanisms of `payload` for which `keep` is true
    pub fn retain_rtcp_feedback<F>(&mut self, payload: PayloadType, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.lines.retain(|line| match line {
            SectionLine::RtcpFb { payload: pt, mechanism } if *pt == payload => keep(mechanism),
            _ => true,
        });
    }

    /// Replace all CT/AS/TIAS entries with `entries`
    ///
    /// New entries take the slot of the first removed one, otherwise they go
    /// after the section's `i=`/`c=`/other `b=` lines, ahead of attributes.
    pub fn replace_bandwidth(&mut self, entries: &[Bandwidth]) {
        let existing = self
            .lines
            .iter()
            .position(|line| matches!(line, SectionLine::Bandwidth(_)));

        self.lines
            .retain(|line| !matches!(line, SectionLine::Bandwidth(_)));

        let at = existing.unwrap_or_else(|| {
            self.lines
                .iter()
                .rposition(|line| match line {
                    SectionLine::Opaque(text) => {
                        text.starts_with("i=") || text.starts_with("c=") || text.starts_with("b=")
                    }
                    _ => false,
                })
                .map_or(0, |idx| idx + 1)
        });

        for (offset, bw) in entries.iter().enumerate() {
            self.lines.insert(at + offset, SectionLine::Bandwidth(*bw));
        }
    }

    /// Set the declared frame rate, written with two decimals
    pub fn set_frame_rate(&mut self, fps: f64) {
        let value = format!("{:.2}", fps);

        for line in &mut self.lines {
            if let SectionLine::FrameRate(existing) = line {
                *existing = value;
                return;
            }
        }

        let at = self
            .lines
            .iter()
            .position(|line| {
                matches!(line, SectionLine::Opaque(text) if text.starts_with("a=mid:"))
            })
            .map_or(self.lines.len(), |idx| idx + 1);
        self.lines.insert(at, SectionLine::FrameRate(value));
    }

    /// Move a payload type to the front of the `m=` line
    ///
    /// Returns false if the payload is not declared in this section.
    pub fn move_payload_to_front(&mut self, payload: PayloadType) -> bool {
        match self.payloads.iter().position(|pt| *pt == payload) {
            Some(idx) => {
                let pt = self.payloads.remove(idx);
                self.payloads.insert(0, pt);
                true
            }
            None => false,
        }
    }

    /// True when every payload-bound line refers to a declared payload
    /// and every declared payload has an `rtpmap` entry
    pub fn is_consistent(&self) -> bool {
        let declared: BTreeSet<PayloadType> = self.payloads.iter().copied().collect();
        let mapped: BTreeSet<PayloadType> = self.rtpmap().keys().copied().collect();

        declared == mapped
            && self
                .lines
                .iter()
                .filter_map(SectionLine::payload)
                .all(|pt| declared.contains(&pt))
    }
}

/// A parsed session description
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SdpDocument {
    pub(crate) session_lines: Vec<String>,
    pub(crate) media: Vec<MediaSection>,
}

impl SdpDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session-level lines, in original order
    pub fn session_lines(&self) -> &[String] {
        &self.session_lines
    }

    pub fn push_session_line(&mut self, line: impl Into<String>) {
        self.session_lines.push(line.into());
    }

    pub fn media_sections(&self) -> &[MediaSection] {
        &self.media
    }

    pub fn media_sections_mut(&mut self) -> &mut [MediaSection] {
        &mut self.media
    }

    pub fn push_media_section(&mut self, section: MediaSection) {
        self.media.push(section);
    }

    /// Value of the `o=` line, without the prefix
    pub fn origin(&self) -> Option<&str> {
        self.session_lines
            .iter()
            .find_map(|line| line.strip_prefix("o="))
    }
}
