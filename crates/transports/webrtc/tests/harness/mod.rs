//! Signaling test harness
//!
//! Provides infrastructure for integration testing of the signaling channel
//! and the session facade:
//! - Scripted WebSocket media server on a random port
//! - Mock peer connection that records every call
//! - Sample session descriptions
//!
//! Basic usage pattern:
//!
//! 1. Start a `TestServer` with a script mapping each inbound command to replies
//! 2. Point a `SignalingChannel` or `StreamingSession` at `server.url()`
//! 3. Assert on the replies and on `server.received()`

#![allow(dead_code)]

pub mod mock_peer;
pub mod test_server;

pub use mock_peer::{MockPeer, MockPeerHandle, PeerCall};
pub use test_server::{ServerReply, TestServer};

use serde_json::{json, Value};
use std::time::Duration;

/// Result type for test harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Error type for test harness operations
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// How long helpers wait for the server to observe something
pub const WAIT: Duration = Duration::from_secs(2);

/// Offer as a browser would produce it for audio+video publish
pub const BROWSER_OFFER: &str = "v=0\r\n\
o=- 4611731400430051336 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0 1\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111 103 126\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:0\r\n\
a=sendonly\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=rtcp-fb:111 transport-cc\r\n\
a=fmtp:111 minptime=10;useinbandfec=1\r\n\
a=rtpmap:103 ISAC/16000\r\n\
a=rtpmap:126 telephone-event/8000\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96 97 102 127\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:1\r\n\
a=sendonly\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtcp-fb:96 nack\r\n\
a=rtpmap:97 rtx/90000\r\n\
a=fmtp:97 apt=96\r\n\
a=rtpmap:102 H264/90000\r\n\
a=rtcp-fb:102 nack\r\n\
a=fmtp:102 level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f\r\n\
a=rtpmap:127 flexfec-03/90000\r\n";

/// Server answer to `BROWSER_OFFER`
pub const SERVER_ANSWER: &str = "v=0\r\n\
o=- 1 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
a=mid:0\r\n\
a=recvonly\r\n\
a=rtpmap:111 opus/48000/2\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 102\r\n\
a=mid:1\r\n\
a=recvonly\r\n\
a=rtpmap:102 H264/90000\r\n\
a=fmtp:102 packetization-mode=1;profile-level-id=42e01f\r\n";

/// Server offer for play, listing VP8 ahead of H.264
pub const SERVER_OFFER: &str = "v=0\r\n\
o=- 2 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 97 102\r\n\
a=mid:0\r\n\
a=sendonly\r\n\
a=rtpmap:97 VP8/90000\r\n\
a=rtpmap:102 H264/90000\r\n\
a=fmtp:102 packetization-mode=1;profile-level-id=42e01f\r\n";

/// Local answer to `SERVER_OFFER` advertising High profile
pub const BROWSER_ANSWER: &str = "v=0\r\n\
o=- 99 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 97 102\r\n\
a=mid:0\r\n\
a=recvonly\r\n\
a=rtpmap:97 VP8/90000\r\n\
a=rtpmap:102 H264/90000\r\n\
a=fmtp:102 packetization-mode=1;profile-level-id=640032\r\n";

/// Successful response to `command` with extra result fields
pub fn ok_response(command: &str, fields: Value) -> Value {
    let mut response = json!({
        "direction": "play",
        "command": command,
        "status": 200,
        "statusDescription": "OK",
    });
    if let (Some(target), Value::Object(extra)) = (response.as_object_mut(), fields) {
        target.extend(extra);
    }
    response
}

/// Error response to `command`
pub fn error_response(command: &str, status: u16, description: &str) -> Value {
    json!({
        "command": command,
        "status": status,
        "statusDescription": description,
    })
}

/// Host candidate as the server sends them
pub fn host_candidate(port: u16) -> Value {
    json!({
        "candidate": format!("candidate:0 1 UDP 50 127.0.0.1 {} typ host generation 0", port),
        "sdpMid": "0",
        "sdpMLineIndex": 0
    })
}

/// Install a test subscriber once; honours RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
