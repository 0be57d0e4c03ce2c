//! Configuration types for publish/play sessions

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Session id sent before the server has assigned one
pub const EMPTY_SESSION_ID: &str = "[empty]";

/// Main configuration for a [`StreamingSession`](crate::StreamingSession)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// WebSocket signaling URL of the media server (ws:// or wss://)
    pub sdp_url: String,

    /// Server application name
    pub application_name: String,

    /// Stream to publish or play
    pub stream_name: String,

    /// Optional secure token forwarded to the server
    pub secure_token: Option<String>,

    /// Opaque user data echoed on every signaling message
    pub user_data: Option<serde_json::Value>,

    /// ICE server URLs handed to the peer connection
    pub ice_servers: Vec<String>,

    /// Video codec preference (default: H.264 42e01f, 360 kbps, 29.97 fps)
    pub video: VideoConfig,

    /// Audio codec preference (default: Opus, 64 kbps)
    pub audio: AudioConfig,

    /// Peer engine the SDP rewrites target (default: Chromium)
    pub engine: BrowserEngine,

    /// Explicit capability set, overriding the engine defaults
    pub capabilities: Option<TransformOptions>,
}

/// Video codec configuration for one transform pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConfig {
    /// Codec name (`VP8`, `VP9`) or H.264 profile-level-id (`42e01f`)
    pub codec: String,

    /// Target bit rate in kbps
    #[serde(default)]
    pub bit_rate: Option<u32>,

    /// Target frame rate
    #[serde(default)]
    pub frame_rate: Option<f64>,
}

/// Audio codec configuration for one transform pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    /// Codec name (`opus`)
    pub codec: String,

    /// Target bit rate in kbps
    #[serde(default)]
    pub bit_rate: Option<u32>,
}

/// Either codec configuration, as seen by a single media section
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CodecConfig<'a> {
    Video(&'a VideoConfig),
    Audio(&'a AudioConfig),
}

impl CodecConfig<'_> {
    pub fn codec(&self) -> &str {
        match self {
            CodecConfig::Video(v) => &v.codec,
            CodecConfig::Audio(a) => &a.codec,
        }
    }

    pub fn bit_rate(&self) -> Option<u32> {
        match self {
            CodecConfig::Video(v) => v.bit_rate,
            CodecConfig::Audio(a) => a.bit_rate,
        }
    }

    /// Always None for audio
    pub fn frame_rate(&self) -> Option<f64> {
        match self {
            CodecConfig::Video(v) => v.frame_rate,
            CodecConfig::Audio(_) => None,
        }
    }
}

/// Peer engine whose SDP quirks the transforms accommodate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    /// Chrome, Edge and other Blink-based peers
    Chromium,
    Firefox,
    Safari,
    /// Native or unknown peers: no engine-specific rewrites
    Other,
}

/// Engine-specific rewrites, injected into every transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// Add a `b=TIAS` entry next to AS/CT
    pub emit_tias: bool,

    /// Move the preferred payload to the front of the `m=` line on later passes
    pub explicit_payload_order: bool,

    /// Drop transport-cc/goog-remb/nack feedback from the preferred VP8/VP9 payload
    pub strip_vpx_feedback: bool,
}

impl BrowserEngine {
    /// Default capability set for this engine
    pub fn transform_options(self) -> TransformOptions {
        match self {
            BrowserEngine::Chromium => TransformOptions {
                emit_tias: false,
                explicit_payload_order: true,
                strip_vpx_feedback: true,
            },
            BrowserEngine::Firefox => TransformOptions {
                emit_tias: true,
                explicit_payload_order: false,
                strip_vpx_feedback: false,
            },
            BrowserEngine::Safari => TransformOptions {
                emit_tias: true,
                explicit_payload_order: true,
                strip_vpx_feedback: false,
            },
            BrowserEngine::Other => TransformOptions::default(),
        }
    }
}

/// Partial overlay merged onto a [`SessionConfig`]; only present fields win
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionOptions {
    pub sdp_url: Option<String>,
    pub application_name: Option<String>,
    pub stream_name: Option<String>,
    pub secure_token: Option<String>,
    pub user_data: Option<serde_json::Value>,
    pub ice_servers: Option<Vec<String>>,
    pub video: Option<VideoConfig>,
    pub audio: Option<AudioConfig>,
    pub engine: Option<BrowserEngine>,
    pub capabilities: Option<TransformOptions>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sdp_url: "wss://localhost:443/webrtc-session.json".to_string(),
            application_name: "webrtc".to_string(),
            stream_name: "myStream".to_string(),
            secure_token: None,
            user_data: None,
            ice_servers: Vec::new(),
            video: VideoConfig::default(),
            audio: AudioConfig::default(),
            engine: BrowserEngine::Chromium,
            capabilities: None,
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            codec: "42e01f".to_string(),
            bit_rate: Some(360),
            frame_rate: Some(29.97),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            codec: "opus".to_string(),
            bit_rate: Some(64),
        }
    }
}

impl Default for BrowserEngine {
    fn default() -> Self {
        BrowserEngine::Chromium
    }
}

impl SessionConfig {
    /// Capability set in effect: the explicit override, else the engine default
    pub fn transform_options(&self) -> TransformOptions {
        self.capabilities
            .unwrap_or_else(|| self.engine.transform_options())
    }

    /// Merge an overlay; fields absent from `options` are left untouched
    pub fn apply(&mut self, options: SessionOptions) {
        if let Some(sdp_url) = options.sdp_url {
            self.sdp_url = sdp_url;
        }
        if let Some(application_name) = options.application_name {
            self.application_name = application_name;
        }
        if let Some(stream_name) = options.stream_name {
            self.stream_name = stream_name;
        }
        if let Some(secure_token) = options.secure_token {
            self.secure_token = Some(secure_token);
        }
        if let Some(user_data) = options.user_data {
            self.user_data = Some(user_data);
        }
        if let Some(ice_servers) = options.ice_servers {
            self.ice_servers = ice_servers;
        }
        if let Some(video) = options.video {
            self.video = video;
        }
        if let Some(audio) = options.audio {
            self.audio = audio;
        }
        if let Some(engine) = options.engine {
            self.engine = engine;
        }
        if let Some(capabilities) = options.capabilities {
            self.capabilities = Some(capabilities);
        }
    }

    /// Load a JSON (`.json`) or YAML (`.yaml`/`.yml`) file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        use crate::Error;

        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;

        let config: SessionConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)
                .map_err(|e| Error::SerializationError(e.to_string()))?,
            Some("json") => serde_json::from_str(&text)?,
            other => {
                return Err(Error::InvalidConfig(format!(
                    "unsupported config file extension: {:?}",
                    other
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `sdp_url` is not a WebSocket URL
    /// - `application_name` or `stream_name` is empty
    /// - a configured bit rate is zero
    /// - the frame rate is not a positive finite number
    /// - the video codec is neither a codec name nor a 6-digit profile-level-id
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if !self.sdp_url.starts_with("ws://") && !self.sdp_url.starts_with("wss://") {
            return Err(Error::InvalidConfig(format!(
                "sdp_url must start with ws:// or wss://, got {}",
                self.sdp_url
            )));
        }

        if self.application_name.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "application_name cannot be empty".to_string(),
            ));
        }

        if self.stream_name.trim().is_empty() {
            return Err(Error::InvalidConfig("stream_name cannot be empty".to_string()));
        }

        if self.video.bit_rate == Some(0) || self.audio.bit_rate == Some(0) {
            return Err(Error::InvalidConfig(
                "bit_rate must be greater than zero when set".to_string(),
            ));
        }

        if let Some(fps) = self.video.frame_rate {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "frame_rate must be a positive number, got {}",
                    fps
                )));
            }
        }

        let codec = self.video.codec.trim();
        if codec.is_empty() || !codec.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(Error::InvalidConfig(format!(
                "video codec must be a codec name or an H.264 profile-level-id, got {:?}",
                self.video.codec
            )));
        }

        if self.audio.codec.trim().is_empty() {
            return Err(Error::InvalidConfig("audio codec cannot be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.video.codec, "42e01f");
        assert_eq!(config.video.bit_rate, Some(360));
        assert_eq!(config.audio.bit_rate, Some(64));
    }

    #[test]
    fn test_invalid_url_fails() {
        let mut config = SessionConfig::default();
        config.sdp_url = "http://localhost:8080".to_string();
        assert!(config.validate().unwrap_err().is_config_error());
    }

    #[test]
    fn test_empty_names_fail() {
        let mut config = SessionConfig::default();
        config.stream_name = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.application_name.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_rates_fail() {
        let mut config = SessionConfig::default();
        config.video.bit_rate = Some(0);
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.video.frame_rate = Some(f64::NAN);
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.video.frame_rate = None;
        config.video.bit_rate = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_video_codec_forms() {
        let mut config = SessionConfig::default();
        config.video.codec = "VP9".to_string();
        assert!(config.validate().is_ok());

        config.video.codec = "h264 high".to_string();
        assert!(config.validate().is_err());

        config.video.codec = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_capabilities() {
        let mut config = SessionConfig::default();
        assert!(config.transform_options().strip_vpx_feedback);
        assert!(!config.transform_options().emit_tias);

        config.engine = BrowserEngine::Firefox;
        assert!(config.transform_options().emit_tias);

        config.capabilities = Some(TransformOptions::default());
        assert_eq!(config.transform_options(), TransformOptions::default());
    }

    #[test]
    fn test_apply_only_overrides_present_fields() {
        let mut config = SessionConfig::default();
        config.apply(SessionOptions {
            stream_name: Some("camera1".to_string()),
            audio: Some(AudioConfig {
                codec: "opus".to_string(),
                bit_rate: Some(96),
            }),
            ..Default::default()
        });

        assert_eq!(config.stream_name, "camera1");
        assert_eq!(config.audio.bit_rate, Some(96));
        assert_eq!(config.application_name, "webrtc");
        assert_eq!(config.video, VideoConfig::default());
    }

    #[test]
    fn test_config_serialization() {
        let config = SessionConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"applicationName\""));
        assert!(json.contains("\"bitRate\":360"));
        let deserialized: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"streamName":"cam","engine":"safari"}"#).unwrap();
        assert_eq!(config.stream_name, "cam");
        assert_eq!(config.engine, BrowserEngine::Safari);
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "sdpUrl: wss://media.example.com/webrtc-session.json\n\
             applicationName: live\n\
             streamName: lobby\n\
             video:\n  codec: VP8\n  bitRate: 500\n"
        )
        .unwrap();

        let config = SessionConfig::from_file(file.path()).unwrap();
        assert_eq!(config.application_name, "live");
        assert_eq!(config.video.codec, "VP8");
        assert_eq!(config.video.frame_rate, None);
    }

    #[test]
    fn test_from_file_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(SessionConfig::from_file(file.path()).is_err());
    }
}
