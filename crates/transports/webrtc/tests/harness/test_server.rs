//! Embedded media server for signaling tests
//!
//! Accepts WebSocket connections on a random port and answers each inbound
//! JSON command with whatever the test script returns.

use super::{HarnessError, HarnessResult, WAIT};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, info, warn};

/// One step the server takes in response to an inbound command
#[derive(Debug, Clone)]
pub enum ServerReply {
    /// Send a JSON message
    Send(Value),
    /// Pause before the next step
    Delay(Duration),
    /// Close the connection
    Close,
}

type Script = Arc<Mutex<Box<dyn FnMut(&Value) -> Vec<ServerReply> + Send>>>;

type ServerSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Scripted WebSocket media server
pub struct TestServer {
    /// Server address (127.0.0.1:port)
    addr: SocketAddr,

    /// Connections accepted so far
    connections: Arc<AtomicUsize>,

    /// Every inbound message, in arrival order
    received: Arc<Mutex<Vec<Value>>>,

    /// Accept loop handle
    server_handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a server on a random port
    ///
    /// # Arguments
    ///
    /// * `script` - Maps each inbound message to the replies to perform
    pub async fn start<F>(script: F) -> HarnessResult<Self>
    where
        F: FnMut(&Value) -> Vec<ServerReply> + Send + 'static,
    {
        Self::start_with_greeting(Vec::new(), script).await
    }

    /// Start a server that performs `greeting` on every connection right
    /// after the WebSocket handshake, before reading any command
    pub async fn start_with_greeting<F>(
        greeting: Vec<ServerReply>,
        script: F,
    ) -> HarnessResult<Self>
    where
        F: FnMut(&Value) -> Vec<ServerReply> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| HarnessError::ServerError(format!("Failed to bind: {}", e)))?;
        let addr = listener.local_addr()?;

        info!("Test server listening on {}", addr);

        let script: Script = Arc::new(Mutex::new(Box::new(script)));
        let connections = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));

        let server_handle = {
            let connections = Arc::clone(&connections);
            let received = Arc::clone(&received);
            tokio::spawn(async move {
                while let Ok((stream, peer)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    debug!("Accepted connection from {}", peer);
                    tokio::spawn(handle_connection(
                        stream,
                        greeting.clone(),
                        Arc::clone(&script),
                        Arc::clone(&received),
                    ));
                }
            })
        };

        Ok(Self {
            addr,
            connections,
            received,
            server_handle,
        })
    }

    /// Start a server that closes every connection once the handshake is done
    pub async fn closing_on_accept() -> HarnessResult<Self> {
        Self::start_with_greeting(vec![ServerReply::Close], |_| Vec::new()).await
    }

    /// Start a server that answers every command with the same replies
    pub async fn answering(replies: Vec<ServerReply>) -> HarnessResult<Self> {
        Self::start(move |_| replies.clone()).await
    }

    pub fn url(&self) -> String {
        format!("ws://{}/webrtc-session.json", self.addr)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    /// Wait until at least `count` messages arrived
    pub async fn wait_for_messages(&self, count: usize) -> HarnessResult<Vec<Value>> {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            let received = self.received();
            if received.len() >= count {
                return Ok(received);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(HarnessError::Timeout(format!(
                    "expected {} messages, got {}",
                    count,
                    received.len()
                )));
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

async fn handle_connection(
    stream: TcpStream,
    greeting: Vec<ServerReply>,
    script: Script,
    received: Arc<Mutex<Vec<Value>>>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            warn!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    if !perform(&mut ws_tx, greeting).await {
        return;
    }

    while let Some(msg) = ws_rx.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                warn!("Test server got invalid JSON: {}", e);
                continue;
            }
        };

        received.lock().push(value.clone());
        let replies = {
            let mut script = script.lock();
            (&mut **script)(&value)
        };

        if !perform(&mut ws_tx, replies).await {
            return;
        }
    }
}

/// Run `replies` in order; false once the connection is closed or broken
async fn perform(ws_tx: &mut ServerSink, replies: Vec<ServerReply>) -> bool {
    for reply in replies {
        match reply {
            ServerReply::Send(message) => {
                if ws_tx.send(Message::Text(message.to_string())).await.is_err() {
                    return false;
                }
            }
            ServerReply::Delay(duration) => tokio::time::sleep(duration).await,
            ServerReply::Close => {
                let _ = ws_tx.send(Message::Close(None)).await;
                return false;
            }
        }
    }
    true
}
