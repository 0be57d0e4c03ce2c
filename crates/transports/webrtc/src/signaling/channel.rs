//! WebSocket signaling channel with per-command response correlation
//!
//! The server protocol cannot echo a request id, so responses are matched
//! by command name. At most one command of a given name may be in flight;
//! a second send is rejected with [`Error::CommandInFlight`] until the first
//! settles or its caller drops the future.

use super::protocol::{
    AvailableStreamsResponse, Command, GetOfferResponse, InboundMessage, SendOfferResponse,
    SendResponseResponse, StreamInfo,
};
use crate::config::SessionConfig;
use crate::sdp::SessionDescription;
use crate::{Error, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

type ResponseRx = oneshot::Receiver<Result<InboundMessage>>;

/// One outstanding command awaiting the response that carries its name
#[derive(Debug)]
struct PendingCommand {
    sender: oneshot::Sender<Result<InboundMessage>>,
    created_at: Instant,
}

impl PendingCommand {
    fn settle(self, result: Result<InboundMessage>) {
        let _ = self.sender.send(result);
    }
}

/// Lifecycle of a [`SignalingChannel`]; `Closed` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

/// State shared with the receiver task
#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<ChannelState>,
    pending: Mutex<HashMap<String, PendingCommand>>,
    stream_info: Mutex<StreamInfo>,
    /// Why the transport went away, once the receiver has seen it close
    close_reason: Mutex<Option<String>>,
}

impl Shared {
    pub(crate) fn new(stream_info: StreamInfo) -> Self {
        Self {
            state: Mutex::new(ChannelState::Disconnected),
            pending: Mutex::new(HashMap::new()),
            stream_info: Mutex::new(stream_info),
            close_reason: Mutex::new(None),
        }
    }

    fn state(&self) -> ChannelState {
        *self.state.lock()
    }

    fn set_state(&self, state: ChannelState) {
        *self.state.lock() = state;
    }

    /// Claim the slot for `command`
    ///
    /// A slot whose receiver was dropped is reclaimed. The state is checked
    /// under the pending lock, so a slot can never be added after
    /// [`fail_pending`](Self::fail_pending) drained the table.
    pub(crate) fn register(&self, command: &str) -> Result<ResponseRx> {
        let mut pending = self.pending.lock();

        if self.state() == ChannelState::Closed {
            return Err(match self.close_reason.lock().clone() {
                Some(reason) => Error::TransportError(reason),
                None => Error::ChannelClosed,
            });
        }

        if let Some(existing) = pending.get(command) {
            if !existing.sender.is_closed() {
                return Err(Error::CommandInFlight(command.to_string()));
            }
            debug!(
                command = %command,
                age_ms = existing.created_at.elapsed().as_millis() as u64,
                "Reclaiming abandoned command slot"
            );
        }

        let (sender, rx) = oneshot::channel();
        pending.insert(
            command.to_string(),
            PendingCommand {
                sender,
                created_at: Instant::now(),
            },
        );
        Ok(rx)
    }

    fn unregister(&self, command: &str) {
        self.pending.lock().remove(command);
    }

    /// Route one inbound text frame to the pending command it answers
    pub(crate) fn dispatch(&self, text: &str) {
        let message = match InboundMessage::from_json(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Dropping malformed signaling message");
                return;
            }
        };

        if !message.is_ok() {
            let slot = self.pending.lock().remove(&message.command);
            match slot {
                Some(pending) => {
                    warn!(
                        command = %message.command,
                        status = message.status,
                        description = ?message.status_description,
                        "Signaling command rejected"
                    );
                    let error = message.to_error();
                    pending.settle(Err(error));
                }
                None => debug!(
                    command = %message.command,
                    status = message.status,
                    "Dropping error response with no pending command"
                ),
            }
            return;
        }

        if let Some(session_id) = message.session_id() {
            let mut info = self.stream_info.lock();
            if info.session_id != session_id {
                debug!(session_id = %session_id, "Adopting server session id");
                info.session_id = session_id.to_string();
            }
        }

        let slot = self.pending.lock().remove(&message.command);
        match slot {
            Some(pending) => {
                debug!(
                    command = %message.command,
                    elapsed_ms = pending.created_at.elapsed().as_millis() as u64,
                    "Signaling command completed"
                );
                pending.settle(Ok(message));
            }
            None => debug!(
                command = %message.command,
                "Dropping response with no pending command"
            ),
        }
    }

    /// Move to `Closed` and fail every pending command
    ///
    /// Runs when the transport closes or errors; `disconnect` never calls it.
    pub(crate) fn fail_pending(&self, reason: &str) {
        let drained: Vec<(String, PendingCommand)> = {
            let mut pending = self.pending.lock();
            *self.close_reason.lock() = Some(reason.to_string());
            self.set_state(ChannelState::Closed);
            pending.drain().collect()
        };

        for (command, pending) in drained {
            debug!(command = %command, "Failing pending command");
            pending.settle(Err(Error::TransportError(reason.to_string())));
        }
    }
}

struct Connection {
    id: Uuid,
    tx: mpsc::UnboundedSender<Message>,
    receiver: JoinHandle<()>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

/// Request/response client for the media server's WebSocket signaling
///
/// One channel serves one publish or play exchange. After
/// [`disconnect`](Self::disconnect), or once the server closes the socket,
/// the channel is `Closed` and a new one is needed.
///
/// # Usage
///
/// ```
/// use streamrelay_webrtc::signaling::{ChannelState, SignalingChannel};
/// use streamrelay_webrtc::{Error, SessionConfig};
///
/// # tokio_test::block_on(async {
/// let channel = SignalingChannel::from_config(&SessionConfig::default());
/// // channel.get_available_streams().await opens the socket on first use
/// channel.disconnect().await;
///
/// assert_eq!(channel.state(), ChannelState::Closed);
/// assert!(matches!(channel.connect().await, Err(Error::ChannelClosed)));
/// # });
/// ```
pub struct SignalingChannel {
    /// Signaling server URL
    url: String,

    /// Opaque user data attached to every message
    user_data: Option<serde_json::Value>,

    /// State shared with the receiver task
    shared: Arc<Shared>,

    /// Open connection; the async lock serializes concurrent `connect` calls
    connection: tokio::sync::Mutex<Option<Connection>>,
}

impl SignalingChannel {
    /// Create a channel; nothing is opened until the first command
    ///
    /// # Arguments
    ///
    /// * `url` - WebSocket signaling URL (ws:// or wss://)
    /// * `stream_info` - Application, stream and initial session id
    /// * `user_data` - Echoed verbatim in every message
    pub fn new(
        url: impl Into<String>,
        stream_info: StreamInfo,
        user_data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            url: url.into(),
            user_data,
            shared: Arc::new(Shared::new(stream_info)),
            connection: tokio::sync::Mutex::new(None),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        let stream_info = StreamInfo::new(&config.application_name, &config.stream_name)
            .with_secure_token(config.secure_token.clone());
        Self::new(&config.sdp_url, stream_info, config.user_data.clone())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ChannelState {
        self.shared.state()
    }

    /// Current session continuity id
    pub fn session_id(&self) -> String {
        self.shared.stream_info.lock().session_id.clone()
    }

    /// Open the WebSocket if needed
    ///
    /// Returns the id of the open connection; calling again while connected
    /// returns the same id without opening another socket.
    pub async fn connect(&self) -> Result<Uuid> {
        let mut connection = self.connection.lock().await;

        match self.shared.state() {
            ChannelState::Closed => return Err(Error::ChannelClosed),
            ChannelState::Connected => {
                if let Some(open) = connection.as_ref() {
                    return Ok(open.id);
                }
            }
            _ => {}
        }

        info!(url = %self.url, "Connecting to signaling server");
        self.shared.set_state(ChannelState::Connecting);

        let ws_stream = match connect_async(self.url.as_str()).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                self.shared.set_state(ChannelState::Closed);
                error!(url = %self.url, error = %e, "Failed to connect to signaling server");
                return Err(Error::TransportError(format!("Failed to connect: {}", e)));
            }
        };

        let (write, read) = ws_stream.split();
        let (tx, rx) = mpsc::unbounded_channel();

        // The receiver may set `Closed` as soon as it starts
        self.shared.set_state(ChannelState::Connected);
        tokio::spawn(Self::sender_task(write, rx));
        let receiver = tokio::spawn(Self::receiver_task(read, self.shared.clone()));

        let id = Uuid::new_v4();
        *connection = Some(Connection { id, tx, receiver });

        info!(connection_id = %id, "Connected to signaling server");
        Ok(id)
    }

    /// Sender task: sends messages from channel to WebSocket
    async fn sender_task(
        mut write: SplitSink<WsStream, Message>,
        mut rx: mpsc::UnboundedReceiver<Message>,
    ) {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if let Err(e) = write.send(msg).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
            if closing {
                break;
            }
        }

        debug!("Sender task terminated");
    }

    /// Receiver task: dispatches frames until the socket closes
    async fn receiver_task(mut read: SplitStream<WsStream>, shared: Arc<Shared>) {
        let reason = loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => shared.dispatch(&text),
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => shared.dispatch(text),
                    Err(_) => warn!(len = bytes.len(), "Dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "WebSocket connection closed");
                    break "connection closed by server".to_string();
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    break format!("connection error: {}", e);
                }
                None => break "connection ended".to_string(),
            }
        };

        shared.fail_pending(&reason);
        debug!("Receiver task terminated");
    }

    /// Send a command and wait for the response carrying its name
    ///
    /// Connects first if needed.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] if the channel was disconnected before the
    ///   command was sent
    /// - [`Error::CommandInFlight`] if a command of the same name is pending
    /// - [`Error::TransportError`] if the socket fails before the response
    /// - [`Error::ProtocolError`] if the server answers with a non-200 status
    ///
    /// A command still waiting when [`disconnect`](Self::disconnect) runs is
    /// never settled.
    pub async fn send_command(&self, command: Command) -> Result<InboundMessage> {
        if self.state() == ChannelState::Closed {
            return Err(Error::ChannelClosed);
        }
        self.connect().await?;

        let envelope = {
            let info = self.shared.stream_info.lock();
            command.to_envelope(&info, self.user_data.as_ref())?
        };
        let text = serde_json::to_string(&envelope)?;

        let tx = self
            .connection
            .lock()
            .await
            .as_ref()
            .map(|open| open.tx.clone())
            .ok_or(Error::ChannelClosed)?;

        let rx = self.shared.register(&command.name)?;

        debug!(
            command = %command.name,
            direction = %command.direction,
            "Sending signaling command"
        );
        if tx.send(Message::Text(text)).is_err() {
            self.shared.unregister(&command.name);
            return Err(Error::TransportError(
                "signaling connection is not writable".to_string(),
            ));
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::ChannelClosed),
        }
    }

    /// Request the server's offer for the configured stream
    pub async fn get_offer(&self) -> Result<GetOfferResponse> {
        let token = self.shared.stream_info.lock().secure_token.clone();
        self.send_command(Command::get_offer(token.as_deref())?)
            .await?
            .decode()
    }

    /// Submit a local offer; returns the server's answer and candidates
    pub async fn send_offer(&self, sdp: &SessionDescription) -> Result<SendOfferResponse> {
        self.send_command(Command::send_offer(sdp)?).await?.decode()
    }

    /// Submit a local answer to the server's offer
    pub async fn send_response(&self, sdp: &SessionDescription) -> Result<SendResponseResponse> {
        self.send_command(Command::send_response(sdp)?)
            .await?
            .decode()
    }

    pub async fn get_available_streams(&self) -> Result<AvailableStreamsResponse> {
        self.send_command(Command::get_available_streams())
            .await?
            .decode()
    }

    /// Close the socket and move to `Closed`; safe to call repeatedly
    ///
    /// Commands still pending are not settled: their futures stay pending
    /// until the channel itself is dropped. Await every command before
    /// disconnecting.
    pub async fn disconnect(&self) {
        let mut connection = self.connection.lock().await;
        self.shared.set_state(ChannelState::Closed);

        let outstanding = self.shared.pending.lock().len();
        if outstanding > 0 {
            warn!(commands = outstanding, "Disconnecting with commands still pending");
        }

        if let Some(open) = connection.take() {
            info!(connection_id = %open.id, "Disconnecting from signaling server");
            // Stop dispatch first so the server's close reply cannot settle anything
            open.receiver.abort();
            let _ = open.tx.send(Message::Close(None));
        }
    }
}
