//! Publish and play flows against the media server

use super::peer::{PeerConnection, PeerFactory};
use crate::config::{SessionConfig, SessionOptions};
use crate::sdp::{Negotiation, SessionDescription};
use crate::signaling::{Direction, IceCandidate, SignalingChannel, StreamItem};
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// User hook that replaces the default SDP rewrite
///
/// Receives the local description, the default transform for the current
/// direction, and the direction; returns the description to use.
pub type SdpHandler = Arc<
    dyn Fn(
            &SessionDescription,
            &mut dyn FnMut(&SessionDescription) -> Result<SessionDescription>,
            Direction,
        ) -> Result<SessionDescription>
        + Send
        + Sync,
>;

/// Publishes a local stream to, or plays a stream from, the media server
///
/// # Lifecycle
///
/// 1. Created with a config and a peer connection factory
/// 2. `publish()` or `play()` opens a signaling channel, negotiates, and
///    disconnects the channel whether or not negotiation succeeded
/// 3. `stop()` closes the peer connection; a later `publish()`/`play()`
///    builds a new one
pub struct StreamingSession<P: PeerConnection> {
    config: SessionConfig,
    factory: PeerFactory<P>,
    sdp_handler: Option<SdpHandler>,
    local_stream: Option<P::MediaStream>,
    peer: Option<Arc<P>>,
}

impl<P: PeerConnection> StreamingSession<P> {
    /// Create a session; the config is validated up front
    pub fn new<F>(config: SessionConfig, factory: F) -> Result<Self>
    where
        F: Fn(&SessionConfig) -> Result<P> + Send + Sync + 'static,
    {
        config.validate()?;

        Ok(Self {
            config,
            factory: Box::new(factory),
            sdp_handler: None,
            local_stream: None,
            peer: None,
        })
    }

    /// Install a hook that wraps the default SDP rewrite
    pub fn with_sdp_handler<H>(mut self, handler: H) -> Self
    where
        H: Fn(
                &SessionDescription,
                &mut dyn FnMut(&SessionDescription) -> Result<SessionDescription>,
                Direction,
            ) -> Result<SessionDescription>
            + Send
            + Sync
            + 'static,
    {
        self.sdp_handler = Some(Arc::new(handler));
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Merge an options overlay; the merged config must still be valid
    pub fn apply(&mut self, options: SessionOptions) -> Result<()> {
        let mut merged = self.config.clone();
        merged.apply(options);
        merged.validate()?;
        self.config = merged;
        Ok(())
    }

    /// Current peer connection, if one was created
    pub fn peer(&self) -> Option<&Arc<P>> {
        self.peer.as_ref()
    }

    pub fn local_stream(&self) -> Option<&P::MediaStream> {
        self.local_stream.as_ref()
    }

    /// Use `stream` as the local media; live peers get its tracks at once
    pub async fn attach_stream(&mut self, stream: P::MediaStream) -> Result<()> {
        if let Some(peer) = &self.peer {
            peer.attach_local_tracks(&stream).await?;
        }
        self.local_stream = Some(stream);
        Ok(())
    }

    /// Publish `stream` under the configured stream name
    pub async fn publish(&mut self, stream: P::MediaStream) -> Result<()> {
        self.local_stream = Some(stream);

        let channel = SignalingChannel::from_config(&self.config);
        let result = self.run_publish(&channel).await;
        channel.disconnect().await;

        match &result {
            Ok(()) => info!(stream = %self.config.stream_name, "Publish negotiated"),
            Err(e) => warn!(stream = %self.config.stream_name, error = %e, "Publish failed"),
        }
        result
    }

    async fn run_publish(&mut self, channel: &SignalingChannel) -> Result<()> {
        let peer = self.new_peer()?;
        if let Some(stream) = &self.local_stream {
            peer.attach_local_tracks(stream).await?;
        }

        let mut negotiation = Negotiation::from_config(&self.config);
        let offer = peer.create_offer().await?;
        let offer = self.rewrite(&mut negotiation, &offer, Direction::Publish)?;

        peer.set_local_description(offer.clone()).await?;
        let response = channel.send_offer(&offer).await?;
        debug!(
            session_id = %channel.session_id(),
            candidates = response.ice_candidates.len(),
            "Received server answer"
        );

        peer.set_remote_description(response.sdp).await?;
        add_candidates(peer.as_ref(), response.ice_candidates).await;
        Ok(())
    }

    /// Play the configured stream
    ///
    /// Returns the receiver of remote streams; the first one typically
    /// arrives once ICE completes.
    pub async fn play(&mut self) -> Result<mpsc::Receiver<P::MediaStream>> {
        let channel = SignalingChannel::from_config(&self.config);
        let result = self.run_play(&channel).await;
        channel.disconnect().await;

        match &result {
            Ok(_) => info!(stream = %self.config.stream_name, "Play negotiated"),
            Err(e) => warn!(stream = %self.config.stream_name, error = %e, "Play failed"),
        }
        result
    }

    async fn run_play(
        &mut self,
        channel: &SignalingChannel,
    ) -> Result<mpsc::Receiver<P::MediaStream>> {
        let peer = self.new_peer()?;
        let remote_streams = peer.remote_streams().ok_or_else(|| {
            Error::PeerConnectionError("remote stream receiver already taken".to_string())
        })?;

        let mut negotiation = Negotiation::from_config(&self.config);
        let offer = channel.get_offer().await?.sdp;
        negotiation.observe(&offer.document()?);
        peer.set_remote_description(offer).await?;

        let answer = peer.create_answer().await?;
        let answer = self.rewrite(&mut negotiation, &answer, Direction::Play)?;

        peer.set_local_description(answer.clone()).await?;
        let response = channel.send_response(&answer).await?;
        add_candidates(peer.as_ref(), response.ice_candidates).await;

        Ok(remote_streams)
    }

    /// Streams currently live on the server; any failure yields an empty list
    pub async fn get_available_streams(&self) -> Vec<StreamItem> {
        let channel = SignalingChannel::from_config(&self.config);
        let result = channel.get_available_streams().await;
        channel.disconnect().await;

        match result {
            Ok(response) => response.available_streams.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Listing available streams failed");
                Vec::new()
            }
        }
    }

    /// Close the current peer connection, if any
    pub async fn stop(&mut self) -> Result<()> {
        match self.peer.take() {
            Some(peer) => {
                info!(stream = %self.config.stream_name, "Stopping session");
                peer.close().await
            }
            None => Ok(()),
        }
    }

    fn new_peer(&mut self) -> Result<Arc<P>> {
        let peer = Arc::new((self.factory)(&self.config)?);
        self.peer = Some(peer.clone());
        Ok(peer)
    }

    fn rewrite(
        &self,
        negotiation: &mut Negotiation,
        description: &SessionDescription,
        direction: Direction,
    ) -> Result<SessionDescription> {
        let mut default = |desc: &SessionDescription| negotiation.transform_description(desc);
        match &self.sdp_handler {
            Some(handler) => handler(description, &mut default, direction),
            None => default(description),
        }
    }
}

async fn add_candidates<P: PeerConnection>(peer: &P, candidates: Vec<IceCandidate>) {
    for candidate in candidates {
        if let Err(e) = peer.add_ice_candidate(candidate).await {
            warn!(error = %e, "Failed to add server ICE candidate");
        }
    }
}
