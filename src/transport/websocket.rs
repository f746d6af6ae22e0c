//! WebSocket transport over `tokio-tungstenite`

use super::Transport;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Persistent WebSocket connection to the backend
///
/// One writer task drains the outbound queue into the socket; one reader
/// task forwards text frames to the inbound channel. Either task stopping
/// (close frame, read or write error) stops the other; the inbound channel
/// then closes and the transport reports itself disconnected.
pub struct WebSocketTransport {
    url: String,
    outbound_tx: mpsc::Sender<Message>,
    inbound_rx: Mutex<Option<mpsc::Receiver<String>>>,
    connected: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl WebSocketTransport {
    /// Open the connection described by `config`
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut request = config.url.as_str().into_client_request()?;
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::Config(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ClientError::Config(format!("Invalid header value: {}", e)))?;
            request.headers_mut().insert(name, value);
        }

        let (stream, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| ClientError::Connection(format!("{}: {}", config.url, e)))?;

        tracing::info!(url = %config.url, "Connected to backend");

        let (mut sink, mut source) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(config.inbound_buffer);
        let (inbound_tx, inbound_rx) = mpsc::channel::<String>(config.inbound_buffer);
        let connected = Arc::new(AtomicBool::new(true));

        let shutdown = CancellationToken::new();

        let writer_connected = connected.clone();
        let writer_shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                // Queued frames (including a final Close) go out before shutdown
                let message = tokio::select! {
                    biased;
                    message = outbound_rx.recv() => match message {
                        Some(message) => message,
                        None => break,
                    },
                    _ = writer_shutdown.cancelled() => break,
                };
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    tracing::error!("Failed to write to WebSocket: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            writer_connected.store(false, Ordering::SeqCst);
            writer_shutdown.cancel();
            let _ = sink.close().await;
        });

        let reader_connected = connected.clone();
        let reader_shutdown = shutdown.clone();
        let url = config.url.clone();
        tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    frame = source.next() => match frame {
                        Some(frame) => frame,
                        None => break,
                    },
                    _ = reader_shutdown.cancelled() => {
                        tracing::debug!(url = %url, "Writer stopped, stopping reader");
                        break;
                    }
                };

                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(_) => {
                            tracing::warn!("Dropping non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        tracing::info!(url = %url, close = ?frame, "Backend closed the connection");
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::error!(url = %url, "Failed to read from WebSocket: {}", e);
                        break;
                    }
                };

                if inbound_tx.send(text).await.is_err() {
                    tracing::debug!("Inbound receiver dropped, stopping reader");
                    break;
                }
            }
            // Dropping inbound_tx here is what the correlator sees as a disconnect
            reader_connected.store(false, Ordering::SeqCst);
            reader_shutdown.cancel();
        });

        Ok(Self {
            url: config.url.clone(),
            outbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            connected,
            shutdown,
        })
    }

    /// Endpoint this transport is connected to
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, message: String) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ClientError::Connection(format!(
                "WebSocket to {} is not connected",
                self.url
            )));
        }

        self.outbound_tx
            .send(Message::Text(message))
            .await
            .map_err(|_| ClientError::Connection("WebSocket writer has stopped".to_string()))
    }

    fn incoming(&self) -> Option<mpsc::Receiver<String>> {
        self.inbound_rx.lock().ok().and_then(|mut rx| rx.take())
    }

    async fn close(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self.outbound_tx.send(Message::Close(None)).await;
        }
        self.shutdown.cancel();

        tracing::info!(url = %self.url, "WebSocket transport closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "websocket"
    }
}
