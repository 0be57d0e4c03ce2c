//! Session description as exchanged with the peer connection and the server

use super::document::SdpDocument;
use super::parser;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Description type (`RTCSdpType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// `{ "type": ..., "sdp": ... }` (`RTCSessionDescriptionInit`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn new(sdp_type: SdpType, sdp: impl Into<String>) -> Self {
        Self {
            sdp_type,
            sdp: sdp.into(),
        }
    }

    pub fn offer(sdp: impl Into<String>) -> Self {
        Self::new(SdpType::Offer, sdp)
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self::new(SdpType::Answer, sdp)
    }

    pub fn document(&self) -> Result<SdpDocument> {
        parser::parse(&self.sdp)
    }

    /// Parse, rewrite with `f`, and serialize back, keeping the type
    pub fn map_sdp<F>(&self, f: F) -> Result<Self>
    where
        F: FnOnce(&SdpDocument) -> SdpDocument,
    {
        let doc = self.document()?;
        Ok(Self::new(self.sdp_type, parser::serialize(&f(&doc))))
    }
}
