//! Preferred payload tracking across the passes of one negotiation
//!
//! The first pass that finds the configured codec in a section records its
//! payload type. Later passes over the counter-description move that
//! payload to the front of the section's `m=` line, which peers read as
//! codec preference order.

use super::document::{MediaKind, MediaSection, PayloadType, SdpDocument};
use super::fmtp;
use super::policy::ProfileLevelId;
use crate::config::{AudioConfig, CodecConfig, VideoConfig};
use std::collections::BTreeMap;
use tracing::debug;

/// Preferred payload type per media section index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferredPayloads {
    by_section: BTreeMap<usize, (MediaKind, PayloadType)>,
}

impl PreferredPayloads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a preference; the first one recorded for a section is kept
    pub fn record(&mut self, section: usize, kind: MediaKind, payload: PayloadType) {
        self.by_section.entry(section).or_insert((kind, payload));
    }

    pub fn get(&self, section: usize) -> Option<PayloadType> {
        self.by_section.get(&section).map(|(_, pt)| *pt)
    }

    pub fn is_empty(&self) -> bool {
        self.by_section.is_empty()
    }

    /// Move each recorded payload to the front of its section's `m=` line
    ///
    /// Sections whose kind changed or that no longer declare the payload are
    /// left alone. Returns the number of sections rewritten.
    pub fn apply(&self, doc: &mut SdpDocument) -> usize {
        let mut moved = 0;

        for (index, (kind, payload)) in &self.by_section {
            let Some(section) = doc.media_sections_mut().get_mut(*index) else {
                continue;
            };
            if section.kind() != kind {
                continue;
            }
            if section.move_payload_to_front(*payload) {
                debug!(section = index, payload, "Moved preferred payload to front");
                moved += 1;
            }
        }

        moved
    }
}

/// Whether `payload` carries the configured codec
///
/// A 6-hex-digit codec is an H.264 profile-level-id and matches the H.264
/// payload whose `fmtp` declares that id; anything else matches the
/// `rtpmap` encoding name.
pub fn matches_codec(section: &MediaSection, payload: PayloadType, wanted: &str) -> bool {
    let Some(name) = section.codec_name(payload) else {
        return false;
    };

    match wanted.parse::<ProfileLevelId>() {
        Ok(wanted_id) => {
            name.eq_ignore_ascii_case("h264")
                && section
                    .fmtp_for(payload)
                    .and_then(|params| fmtp::param(params, fmtp::PROFILE_LEVEL_ID))
                    .and_then(|id| id.parse::<ProfileLevelId>().ok())
                    == Some(wanted_id)
        }
        Err(_) => name.eq_ignore_ascii_case(wanted),
    }
}

/// First payload of `section`, in declaration order, that carries the codec
pub fn first_matching(section: &MediaSection, wanted: &str) -> Option<PayloadType> {
    section
        .payloads()
        .iter()
        .copied()
        .find(|pt| matches_codec(section, *pt, wanted))
}

/// Config that governs a section, if it is audio or video
pub(crate) fn section_config<'a>(
    kind: &MediaKind,
    video: &'a VideoConfig,
    audio: &'a AudioConfig,
) -> Option<CodecConfig<'a>> {
    match kind {
        MediaKind::Audio => Some(CodecConfig::Audio(audio)),
        MediaKind::Video => Some(CodecConfig::Video(video)),
        MediaKind::Other(_) => None,
    }
}

/// Record the configured codec's first payload in every section
pub fn record_preferences(
    doc: &SdpDocument,
    video: &VideoConfig,
    audio: &AudioConfig,
    preferred: &mut PreferredPayloads,
) {
    for (index, section) in doc.media_sections().iter().enumerate() {
        if section.is_opaque() {
            continue;
        }
        let Some(config) = section_config(section.kind(), video, audio) else {
            continue;
        };
        if let Some(payload) = first_matching(section, config.codec()) {
            preferred.record(index, section.kind().clone(), payload);
        }
    }
}
