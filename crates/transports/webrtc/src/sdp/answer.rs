//! Play-direction rewrite of a locally generated answer

use super::document::SdpDocument;
use super::fmtp;
use tracing::debug;

/// Downgrades H.264 `profile-level-id` tokens the server cannot decode
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerTransformer;

impl AnswerTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Rewrite `doc`; the input is left untouched
    ///
    /// Only `profile-level-id` values change. Every other line is kept as is.
    pub fn transform(&self, doc: &SdpDocument) -> SdpDocument {
        let mut out = doc.clone();

        for section in out.media_sections_mut() {
            if section.is_opaque() {
                continue;
            }
            section.map_fmtp(|payload, params| {
                let rewritten = fmtp::downgrade_profile_level_id(params)?;
                debug!(payload, from = %params, to = %rewritten, "Downgraded H.264 profile");
                Some(rewritten)
            });
        }

        out
    }
}

pub fn transform_answer(doc: &SdpDocument) -> SdpDocument {
    AnswerTransformer::new().transform(doc)
}
