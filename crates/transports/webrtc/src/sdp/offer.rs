//! Publish-direction rewrite of a locally generated offer

use super::document::{Bandwidth, BandwidthKind, MediaKind, MediaSection, RtpMap, SdpDocument};
use super::fmtp;
use super::policy::{self, CodecPolicy};
use super::reorder::{first_matching, matches_codec, section_config, PreferredPayloads};
use crate::config::{AudioConfig, CodecConfig, TransformOptions, VideoConfig};
use tracing::debug;

const VPX_STRIPPED_FEEDBACK: &[&str] = &["transport-cc", "goog-remb", "nack"];

/// Filters unsupported codecs and injects bandwidth, frame rate and
/// per-codec bitrate bounds
#[derive(Debug, Clone, Default)]
pub struct OfferTransformer {
    policy: CodecPolicy,
    options: TransformOptions,
}

impl OfferTransformer {
    pub fn new(policy: CodecPolicy, options: TransformOptions) -> Self {
        Self { policy, options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Rewrite `doc`; the input is left untouched
    pub fn transform(
        &self,
        doc: &SdpDocument,
        video: &VideoConfig,
        audio: &AudioConfig,
    ) -> SdpDocument {
        let mut preferred = PreferredPayloads::new();
        self.transform_recording(doc, video, audio, &mut preferred)
    }

    /// Rewrite `doc` and record each section's preferred payload
    ///
    /// Preferences recorded by an earlier pass are applied first when
    /// `explicit_payload_order` is enabled.
    pub fn transform_recording(
        &self,
        doc: &SdpDocument,
        video: &VideoConfig,
        audio: &AudioConfig,
        preferred: &mut PreferredPayloads,
    ) -> SdpDocument {
        let mut out = doc.clone();

        if self.options.explicit_payload_order {
            preferred.apply(&mut out);
        }

        for (index, section) in out.media_sections_mut().iter_mut().enumerate() {
            if section.is_opaque() {
                continue;
            }
            let Some(config) = section_config(section.kind(), video, audio) else {
                continue;
            };

            self.filter_unsupported(section);

            if let Some(kbps) = config.bit_rate() {
                section.replace_bandwidth(&self.bandwidth_entries(kbps));
            }

            if let Some(fps) = config.frame_rate() {
                section.set_frame_rate(fps);
            }

            self.bound_codec_bitrate(section, &config);

            if let Some(payload) = first_matching(section, config.codec()) {
                preferred.record(index, section.kind().clone(), payload);
                if self.options.strip_vpx_feedback {
                    strip_vpx_feedback(section, payload);
                }
            }
        }

        out
    }

    /// Remove payloads the policy rejects, plus any that cannot be judged
    fn filter_unsupported(&self, section: &mut MediaSection) {
        let kind = section.kind().clone();

        for payload in section.payloads().to_vec() {
            let name = match section.codec_name(payload) {
                Some(name) => name.to_string(),
                None => match policy::static_payload(payload) {
                    Some((name, clock_rate)) => {
                        section.insert_rtpmap(payload, RtpMap::new(name, clock_rate));
                        name.to_string()
                    }
                    None => {
                        debug!(payload, "Dropping payload without rtpmap");
                        section.remove_payload(payload);
                        continue;
                    }
                },
            };

            if !self.policy.is_supported(&kind, &name) {
                debug!(media = %kind, payload, codec = %name, "Filtering unsupported codec");
                section.remove_payload(payload);
            }
        }

        section.drop_orphan_lines();
    }

    fn bandwidth_entries(&self, kbps: u32) -> Vec<Bandwidth> {
        let kbps = u64::from(kbps);
        let mut entries = vec![
            Bandwidth::new(BandwidthKind::As, kbps),
            Bandwidth::new(BandwidthKind::Ct, kbps),
        ];
        if self.options.emit_tias {
            entries.push(Bandwidth::new(BandwidthKind::Tias, tias_bps(kbps)));
        }
        entries
    }

    fn bound_codec_bitrate(&self, section: &mut MediaSection, config: &CodecConfig<'_>) {
        let Some(kbps) = config.bit_rate() else {
            return;
        };

        let matching: Vec<_> = section
            .payloads()
            .iter()
            .copied()
            .filter(|pt| matches_codec(section, *pt, config.codec()))
            .collect();

        for payload in matching {
            let params = fmtp::with_bitrate_bounds(section.fmtp_for(payload).unwrap_or(""), kbps);
            section.set_fmtp(payload, params);
        }
    }
}

/// TIAS in bps: 95% of the target minus 50 packets/s of 40-byte RTCP/FEC overhead
pub fn tias_bps(kbps: u64) -> u64 {
    let bps = (kbps * 1000) as f64 * 0.95 - 50.0 * 40.0 * 8.0;
    bps.max(0.0).round() as u64
}

fn strip_vpx_feedback(section: &mut MediaSection, payload: u8) {
    let is_vpx = section
        .codec_name(payload)
        .map_or(false, |name| name.eq_ignore_ascii_case("vp8") || name.eq_ignore_ascii_case("vp9"));
    if !is_vpx || section.kind() != &MediaKind::Video {
        return;
    }

    section.retain_rtcp_feedback(payload, |mechanism| {
        !VPX_STRIPPED_FEEDBACK
            .iter()
            .any(|stripped| mechanism.contains(stripped))
    });
}

/// Publish-side rewrite with the default codec tables and no engine quirks
pub fn transform_offer(doc: &SdpDocument, video: &VideoConfig, audio: &AudioConfig) -> SdpDocument {
    OfferTransformer::default().transform(doc, video, audio)
}
