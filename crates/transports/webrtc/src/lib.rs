//! WebRTC publish/play negotiation against a streaming media server
//!
//! This crate rewrites session descriptions so the server accepts them and
//! exchanges them over the server's WebSocket signaling protocol.
//!
//! # Features
//!
//! - **SDP engine**: structured parse/serialize with byte-exact round trips
//! - **Publish rewrite**: codec filtering, AS/CT/TIAS bandwidth, frame rate,
//!   per-codec bitrate bounds
//! - **Play rewrite**: H.264 profile-level-id downgrade
//! - **Signaling channel**: command/response correlation over one WebSocket
//! - **Session facade**: publish/play flows over a host peer connection
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  StreamingSession<P: PeerConnection>                   │
//! │  ├─ Negotiation (offer/answer rewrites, preferences)   │
//! │  │   └─ SdpDocument ⇄ text (parse / serialize)         │
//! │  └─ SignalingChannel (JSON over WebSocket)             │
//! │     ↓                                                  │
//! │  Media server (getOffer / sendOffer / sendResponse)    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use streamrelay_webrtc::config::{AudioConfig, VideoConfig};
//! use streamrelay_webrtc::sdp::{parse, serialize, transform_offer};
//!
//! let offer = "v=0\r\n\
//! m=video 9 UDP/TLS/RTP/SAVPF 96 100\r\n\
//! a=rtpmap:96 VP8/90000\r\n\
//! a=rtpmap:100 flexfec-03/90000\r\n";
//!
//! let video = VideoConfig {
//!     codec: "VP8".to_string(),
//!     bit_rate: Some(500),
//!     frame_rate: None,
//! };
//! let doc = parse(offer)?;
//! let out = serialize(&transform_offer(&doc, &video, &AudioConfig::default()));
//!
//! assert!(out.starts_with("v=0\r\nm=video 9 UDP/TLS/RTP/SAVPF 96\r\nb=AS:500\r\nb=CT:500\r\n"));
//! assert!(out.contains("a=fmtp:96 x-google-min-bitrate=500;x-google-max-bitrate=500\r\n"));
//! # Ok::<(), streamrelay_webrtc::Error>(())
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod sdp;
pub mod session;
pub mod signaling;

pub use config::{
    AudioConfig, BrowserEngine, SessionConfig, SessionOptions, TransformOptions, VideoConfig,
};
pub use error::{Error, Result};
pub use sdp::{transform_answer, transform_offer, SdpDocument, SessionDescription};
pub use session::{PeerConnection, SdpHandler, StreamingSession};
pub use signaling::{ChannelState, SignalingChannel, StreamItem};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
