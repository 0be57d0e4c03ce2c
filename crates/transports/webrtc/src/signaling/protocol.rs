//! Media server signaling protocol types
//!
//! Every outbound message is a flat JSON object: the command payload
//! (`direction`, `command`, command fields) plus `streamInfo` and
//! `userData`. Responses echo `command` with a numeric `status` and a
//! command-specific result.

use crate::config::EMPTY_SESSION_ID;
use crate::sdp::SessionDescription;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a successful response
pub const STATUS_OK: u16 = 200;

/// Status the server returns while a repeater stream is not ready yet
pub const STATUS_STREAM_NOT_READY: u16 = 514;

/// Session context carried on every message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub application_name: String,
    pub stream_name: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_token: Option<String>,
}

impl StreamInfo {
    /// Stream context before the server has assigned a session
    pub fn new(application_name: impl Into<String>, stream_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            stream_name: stream_name.into(),
            session_id: EMPTY_SESSION_ID.to_string(),
            secure_token: None,
        }
    }

    pub fn with_secure_token(mut self, token: Option<String>) -> Self {
        self.secure_token = token;
        self
    }
}

/// Media direction of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Publish,
    Play,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Publish => "publish",
            Direction::Play => "play",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command names understood by the server
pub mod commands {
    pub const GET_OFFER: &str = "getOffer";
    pub const SEND_OFFER: &str = "sendOffer";
    pub const SEND_RESPONSE: &str = "sendResponse";
    pub const GET_AVAILABLE_STREAMS: &str = "getAvailableStreams";
}

/// Outbound command before the session context is attached
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub direction: Direction,
    /// Extra top-level fields (`sdp`, `secureToken`)
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Command {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
            fields: serde_json::Map::new(),
        }
    }

    /// Add a top-level field
    pub fn with_field(mut self, key: &str, value: impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(value)?;
        self.fields.insert(key.to_string(), value);
        Ok(self)
    }

    /// Request the server's offer for a stream
    pub fn get_offer(secure_token: Option<&str>) -> Result<Self> {
        let command = Self::new(commands::GET_OFFER, Direction::Play);
        match secure_token {
            Some(token) => command.with_field("secureToken", token),
            None => Ok(command),
        }
    }

    pub fn send_offer(sdp: &SessionDescription) -> Result<Self> {
        Self::new(commands::SEND_OFFER, Direction::Publish).with_field("sdp", sdp)
    }

    pub fn send_response(sdp: &SessionDescription) -> Result<Self> {
        Self::new(commands::SEND_RESPONSE, Direction::Play).with_field("sdp", sdp)
    }

    pub fn get_available_streams() -> Self {
        Self::new(commands::GET_AVAILABLE_STREAMS, Direction::Play)
    }

    /// Build the wire message: payload, then `streamInfo` and `userData`
    pub fn to_envelope(
        &self,
        stream_info: &StreamInfo,
        user_data: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let mut message = self.fields.clone();
        message.insert(
            "direction".to_string(),
            serde_json::Value::from(self.direction.as_str()),
        );
        message.insert(
            "command".to_string(),
            serde_json::Value::from(self.name.as_str()),
        );
        message.insert("streamInfo".to_string(), serde_json::to_value(stream_info)?);
        message.insert(
            "userData".to_string(),
            user_data.cloned().unwrap_or(serde_json::Value::Null),
        );
        Ok(serde_json::Value::Object(message))
    }
}

/// Any inbound message, before it is matched to a pending command
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub command: String,
    pub status: u16,
    #[serde(default)]
    pub status_description: Option<String>,
    #[serde(default)]
    pub stream_info: Option<InboundStreamInfo>,
    /// The whole message, for typed decoding by the caller
    #[serde(skip)]
    pub raw: serde_json::Value,
}

/// The part of an echoed `streamInfo` the channel consumes
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundStreamInfo {
    #[serde(default)]
    pub session_id: Option<String>,
}

impl InboundMessage {
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(text)?;
        let mut message: InboundMessage = serde_json::from_value(raw.clone())?;
        message.raw = raw;
        Ok(message)
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Session id to adopt, if the server sent a non-empty one
    pub fn session_id(&self) -> Option<&str> {
        self.stream_info
            .as_ref()
            .and_then(|info| info.session_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Rejection for a non-200 status
    pub fn to_error(&self) -> Error {
        Error::ProtocolError {
            command: self.command.clone(),
            status: self.status,
            description: self.status_description.clone().unwrap_or_default(),
        }
    }

    /// Decode the command-specific result fields
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.raw.clone()).map_err(|e| {
            Error::SerializationError(format!("invalid {} response: {}", self.command, e))
        })
    }
}

/// `RTCIceCandidateInit`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_mline_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

/// One entry of `availableStreams`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamItem {
    pub stream_name: String,
    #[serde(default)]
    pub ready_audio: bool,
    #[serde(default)]
    pub ready_video: bool,
    #[serde(default)]
    pub codec_audio: i64,
    #[serde(default)]
    pub codec_video: i64,
}

/// Result of `sendOffer`: the server's answer and its candidates
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOfferResponse {
    pub sdp: SessionDescription,
    #[serde(default)]
    pub ice_candidates: Vec<IceCandidate>,
}

/// Result of `getOffer`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOfferResponse {
    pub sdp: SessionDescription,
}

/// Result of `sendResponse`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponseResponse {
    #[serde(default)]
    pub ice_candidates: Vec<IceCandidate>,
}

/// Result of `getAvailableStreams`; the list is absent when nothing is live
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableStreamsResponse {
    #[serde(default)]
    pub available_streams: Option<Vec<StreamItem>>,
}
