//! Peer connection collaborator consumed by [`StreamingSession`](super::StreamingSession)

use crate::sdp::SessionDescription;
use crate::signaling::IceCandidate;
use crate::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// The host's WebRTC peer connection
///
/// ICE gathering, DTLS and media transport all live behind this trait;
/// the session only drives the offer/answer exchange through it.
///
/// # Thread Safety
///
/// Implementations must be Send + Sync. The session holds the connection
/// in an `Arc` so callers can keep a handle after `publish`/`play`.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Local or remote media, as the host represents it
    type MediaStream: Send + Sync + 'static;

    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Add the stream's tracks, or replace the tracks of existing senders
    async fn attach_local_tracks(&self, stream: &Self::MediaStream) -> Result<()>;

    /// Remote streams as they become available
    ///
    /// The receiver can be taken once; later calls return None.
    fn remote_streams(&self) -> Option<mpsc::Receiver<Self::MediaStream>>;

    async fn close(&self) -> Result<()>;
}

/// Builds a fresh peer connection for each publish or play
pub type PeerFactory<P> = Box<dyn Fn(&crate::config::SessionConfig) -> Result<P> + Send + Sync>;
