//! Session description engine
//!
//! Parses SDP text into an [`SdpDocument`], rewrites it for the publish
//! ([`transform_offer`]) or play ([`transform_answer`]) direction, and
//! serializes it back with CRLF terminators.

mod answer;
mod description;
mod document;
pub mod fmtp;
mod negotiation;
mod offer;
mod parser;
pub mod policy;
mod reorder;

pub use answer::{transform_answer, AnswerTransformer};
pub use description::{SdpType, SessionDescription};
pub use document::{
    Bandwidth, BandwidthKind, MediaKind, MediaSection, PayloadType, RtpMap, SdpDocument,
    SectionLine,
};
pub use negotiation::Negotiation;
pub use offer::{tias_bps, transform_offer, OfferTransformer};
pub use parser::{parse, serialize};
pub use policy::{downgrade_h264_profile, CodecPolicy, ProfileLevelId};
pub use reorder::{first_matching, matches_codec, record_preferences, PreferredPayloads};
