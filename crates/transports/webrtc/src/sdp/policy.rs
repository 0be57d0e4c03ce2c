//! Codec lookup tables and the H.264 profile downgrade rule

use super::document::{MediaKind, PayloadType};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Audio encodings the media server accepts
pub const AUDIO_CODECS: &[&str] = &["opus", "isac", "g722", "pcmu", "pcma", "cn"];

/// Video encodings the media server accepts (including RTP helper formats)
pub const VIDEO_CODECS: &[&str] = &["vp8", "vp9", "h264", "red", "ulpfec", "rtx", "av1"];

const PROFILE_BASELINE: u8 = 0x42;
const CONSTRAINT_BASELINE: u8 = 0xE0;
const LEVEL_3_1: u8 = 0x1F;

/// Supported codec sets, matched case-insensitively against `rtpmap` names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecPolicy {
    audio: BTreeSet<String>,
    video: BTreeSet<String>,
}

impl Default for CodecPolicy {
    fn default() -> Self {
        Self {
            audio: AUDIO_CODECS.iter().map(|c| c.to_string()).collect(),
            video: VIDEO_CODECS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl CodecPolicy {
    /// Narrow the accepted audio encodings
    pub fn with_audio_codecs<I, S>(mut self, codecs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.audio = codecs
            .into_iter()
            .map(|c| c.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    /// Narrow the accepted video encodings
    pub fn with_video_codecs<I, S>(mut self, codecs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.video = codecs
            .into_iter()
            .map(|c| c.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    /// Whether `codec` is accepted for a section of `kind`
    ///
    /// Sections of other kinds are never filtered.
    pub fn is_supported(&self, kind: &MediaKind, codec: &str) -> bool {
        let codec = codec.to_ascii_lowercase();
        match kind {
            MediaKind::Audio => self.audio.contains(&codec),
            MediaKind::Video => self.video.contains(&codec),
            MediaKind::Other(_) => true,
        }
    }
}

/// Encoding name of a static RTP payload type (RFC 3551) the policy knows
pub fn static_payload(payload: PayloadType) -> Option<(&'static str, u32)> {
    match payload {
        0 => Some(("PCMU", 8000)),
        8 => Some(("PCMA", 8000)),
        9 => Some(("G722", 8000)),
        13 => Some(("CN", 8000)),
        _ => None,
    }
}

/// H.264 `profile-level-id`: profile_idc, constraint flags, level_idc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileLevelId(pub u32);

impl ProfileLevelId {
    pub fn from_parts(profile: u8, constraint: u8, level: u8) -> Self {
        Self(u32::from(profile) << 16 | u32::from(constraint) << 8 | u32::from(level))
    }

    pub fn profile(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn constraint(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn level(&self) -> u8 {
        self.0 as u8
    }

    /// Force a profile the server can always decode
    ///
    /// Anything above baseline becomes constrained baseline level 3.1; a
    /// baseline id without constraint flags gets the constrained set.
    pub fn downgrade(self) -> Self {
        if self.profile() > PROFILE_BASELINE {
            Self::from_parts(PROFILE_BASELINE, CONSTRAINT_BASELINE, LEVEL_3_1)
        } else if self.constraint() == 0x00 {
            Self::from_parts(self.profile(), CONSTRAINT_BASELINE, self.level())
        } else {
            self
        }
    }
}

/// Text that is not six hex digits
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid profile-level-id: {0:?}")]
pub struct InvalidProfileLevelId(pub String);

impl FromStr for ProfileLevelId {
    type Err = InvalidProfileLevelId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidProfileLevelId(s.to_string()));
        }
        u32::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| InvalidProfileLevelId(s.to_string()))
    }
}

impl fmt::Display for ProfileLevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}", self.0 & 0x00FF_FFFF)
    }
}

/// Apply [`ProfileLevelId::downgrade`] to a raw 24-bit id
pub fn downgrade_h264_profile(profile_level_id: u32) -> u32 {
    ProfileLevelId(profile_level_id).downgrade().0
}
