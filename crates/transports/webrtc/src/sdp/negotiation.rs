//! State carried across the passes of one offer/answer exchange

use super::answer::AnswerTransformer;
use super::description::{SdpType, SessionDescription};
use super::document::SdpDocument;
use super::offer::OfferTransformer;
use super::policy::CodecPolicy;
use super::reorder::{record_preferences, PreferredPayloads};
use crate::config::{AudioConfig, SessionConfig, TransformOptions, VideoConfig};
use crate::Result;

/// One logical negotiation: codec configs, engine options and the payloads
/// preferred by earlier passes
///
/// Use a fresh value per exchange. Preferences recorded while transforming
/// the offer reorder the counter-description, and vice versa.
#[derive(Debug, Clone)]
pub struct Negotiation {
    video: VideoConfig,
    audio: AudioConfig,
    offer: OfferTransformer,
    answer: AnswerTransformer,
    options: TransformOptions,
    preferred: PreferredPayloads,
}

impl Negotiation {
    pub fn new(video: VideoConfig, audio: AudioConfig, options: TransformOptions) -> Self {
        Self {
            video,
            audio,
            offer: OfferTransformer::new(CodecPolicy::default(), options),
            answer: AnswerTransformer::new(),
            options,
            preferred: PreferredPayloads::new(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.video.clone(),
            config.audio.clone(),
            config.transform_options(),
        )
    }

    /// Replace the codec policy used by the offer filter
    pub fn with_policy(mut self, policy: CodecPolicy) -> Self {
        self.offer = OfferTransformer::new(policy, self.options);
        self
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    pub fn preferred(&self) -> &PreferredPayloads {
        &self.preferred
    }

    /// Record preferences from a description this side did not produce
    pub fn observe(&mut self, doc: &SdpDocument) {
        record_preferences(doc, &self.video, &self.audio, &mut self.preferred);
    }

    /// Publish-direction rewrite
    pub fn transform_offer(&mut self, doc: &SdpDocument) -> SdpDocument {
        self.offer
            .transform_recording(doc, &self.video, &self.audio, &mut self.preferred)
    }

    /// Play-direction rewrite, reordered by earlier preferences when enabled
    pub fn transform_answer(&mut self, doc: &SdpDocument) -> SdpDocument {
        let mut reordered = doc.clone();
        if self.options.explicit_payload_order {
            self.preferred.apply(&mut reordered);
        }

        let out = self.answer.transform(&reordered);
        self.observe(&out);
        out
    }

    /// Dispatch on the description type; rollbacks pass through
    pub fn transform_description(
        &mut self,
        desc: &SessionDescription,
    ) -> Result<SessionDescription> {
        match desc.sdp_type {
            SdpType::Offer => desc.map_sdp(|doc| self.transform_offer(doc)),
            SdpType::Answer | SdpType::Pranswer => desc.map_sdp(|doc| self.transform_answer(doc)),
            SdpType::Rollback => Ok(desc.clone()),
        }
    }
}
