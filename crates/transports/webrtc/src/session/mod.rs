//! Session facade
//!
//! Drives a host peer connection through the publish or play exchange with
//! the media server, one signaling channel per operation.

mod peer;
mod streaming;

pub use peer::{PeerConnection, PeerFactory};
pub use streaming::{SdpHandler, StreamingSession};
