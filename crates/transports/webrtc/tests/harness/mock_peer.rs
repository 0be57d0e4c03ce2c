//! Scripted peer connection that records every call

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use streamrelay_webrtc::session::PeerConnection;
use streamrelay_webrtc::signaling::IceCandidate;
use streamrelay_webrtc::{Error, Result, SessionDescription};
use tokio::sync::mpsc;

/// One recorded collaborator call
#[derive(Debug, Clone, PartialEq)]
pub enum PeerCall {
    AttachTracks(String),
    CreateOffer,
    CreateAnswer,
    SetLocal(SessionDescription),
    SetRemote(SessionDescription),
    AddCandidate(IceCandidate),
    Close,
}

/// Test-side view of every peer a factory built
#[derive(Clone, Default)]
pub struct MockPeerHandle {
    calls: Arc<Mutex<Vec<PeerCall>>>,
    remote_tx: Arc<Mutex<Option<mpsc::Sender<String>>>>,
    offer: Arc<Mutex<Option<String>>>,
    answer: Arc<Mutex<Option<String>>>,
}

impl MockPeerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// SDP returned by `create_offer`
    pub fn with_offer(self, sdp: &str) -> Self {
        *self.offer.lock() = Some(sdp.to_string());
        self
    }

    /// SDP returned by `create_answer`
    pub fn with_answer(self, sdp: &str) -> Self {
        *self.answer.lock() = Some(sdp.to_string());
        self
    }

    pub fn calls(&self) -> Vec<PeerCall> {
        self.calls.lock().clone()
    }

    /// Description passed to the last `set_local_description`
    pub fn local_description(&self) -> Option<SessionDescription> {
        self.calls().into_iter().rev().find_map(|call| match call {
            PeerCall::SetLocal(desc) => Some(desc),
            _ => None,
        })
    }

    pub fn candidates(&self) -> Vec<IceCandidate> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PeerCall::AddCandidate(candidate) => Some(candidate),
                _ => None,
            })
            .collect()
    }

    /// Simulate the host reporting a remote stream on the latest peer
    pub async fn emit_remote_stream(&self, label: &str) -> bool {
        let tx = self.remote_tx.lock().clone();
        match tx {
            Some(tx) => tx.send(label.to_string()).await.is_ok(),
            None => false,
        }
    }

    /// Build a peer wired to this handle
    pub fn build(&self) -> MockPeer {
        let (tx, rx) = mpsc::channel(8);
        *self.remote_tx.lock() = Some(tx);
        MockPeer {
            handle: self.clone(),
            remote_rx: Mutex::new(Some(rx)),
        }
    }

    fn record(&self, call: PeerCall) {
        self.calls.lock().push(call);
    }
}

/// Peer connection double; media streams are plain labels
pub struct MockPeer {
    handle: MockPeerHandle,
    remote_rx: Mutex<Option<mpsc::Receiver<String>>>,
}

#[async_trait]
impl PeerConnection for MockPeer {
    type MediaStream = String;

    async fn create_offer(&self) -> Result<SessionDescription> {
        self.handle.record(PeerCall::CreateOffer);
        let sdp = self.handle.offer.lock().clone();
        sdp.map(SessionDescription::offer)
            .ok_or_else(|| Error::PeerConnectionError("no offer scripted".to_string()))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        self.handle.record(PeerCall::CreateAnswer);
        let sdp = self.handle.answer.lock().clone();
        sdp.map(SessionDescription::answer)
            .ok_or_else(|| Error::PeerConnectionError("no answer scripted".to_string()))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.handle.record(PeerCall::SetLocal(description));
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.handle.record(PeerCall::SetRemote(description));
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.handle.record(PeerCall::AddCandidate(candidate));
        Ok(())
    }

    async fn attach_local_tracks(&self, stream: &String) -> Result<()> {
        self.handle.record(PeerCall::AttachTracks(stream.clone()));
        Ok(())
    }

    fn remote_streams(&self) -> Option<mpsc::Receiver<String>> {
        self.remote_rx.lock().take()
    }

    async fn close(&self) -> Result<()> {
        self.handle.record(PeerCall::Close);
        Ok(())
    }
}
