//! Signaling protocol and client for exchanging SDP with the media server
//!
//! A single WebSocket carries JSON commands (`getOffer`, `sendOffer`,
//! `sendResponse`, `getAvailableStreams`); each response is matched to its
//! pending command by name.

pub mod channel;
pub mod protocol;

pub use channel::{ChannelState, SignalingChannel};
pub use protocol::{
    AvailableStreamsResponse, Command, Direction, GetOfferResponse, IceCandidate,
    InboundMessage, SendOfferResponse, SendResponseResponse, StreamInfo, StreamItem,
};
