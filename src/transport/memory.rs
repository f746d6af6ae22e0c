//! In-memory transport for tests and in-process embedding
//!
//! Records every outbound message, lets the caller inject inbound
//! messages, and can auto-reply through a responder closure.

use super::Transport;
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use tokio::sync::mpsc;

/// Inbound channel depth
const DEFAULT_CAPACITY: usize = 1024;

type Responder = Box<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Loopback transport
pub struct MemoryTransport {
    sent: Mutex<Vec<String>>,
    inbound_tx: Mutex<Option<mpsc::Sender<String>>>,
    inbound_rx: Mutex<Option<mpsc::Receiver<String>>>,
    responder: RwLock<Option<Responder>>,
    connected: AtomicBool,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(DEFAULT_CAPACITY);
        Self {
            sent: Mutex::new(Vec::new()),
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: Mutex::new(Some(rx)),
            responder: RwLock::new(None),
            connected: AtomicBool::new(true),
        }
    }

    /// Transport that answers each outbound message with `responder(message)`
    pub fn with_responder(
        responder: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        let transport = Self::new();
        transport.set_responder(responder);
        transport
    }

    /// Replace the auto-reply closure
    pub fn set_responder(&self, responder: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static) {
        if let Ok(mut slot) = self.responder.write() {
            *slot = Some(Box::new(responder));
        }
    }

    /// Push a message into the inbound side as if the backend sent it
    pub fn inject(&self, message: Value) -> Result<()> {
        let guard = self
            .inbound_tx
            .lock()
            .map_err(|e| ClientError::Connection(format!("inbound lock poisoned: {}", e)))?;
        let tx = guard
            .as_ref()
            .ok_or_else(|| ClientError::Connection("memory transport disconnected".to_string()))?;
        tx.try_send(message.to_string())
            .map_err(|e| ClientError::Connection(format!("inbound channel rejected message: {}", e)))
    }

    /// Simulate the backend dropping the connection
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Ok(mut tx) = self.inbound_tx.lock() {
            tx.take();
        }
    }

    /// All outbound messages so far, parsed
    pub fn sent_messages(&self) -> Vec<Value> {
        self.sent
            .lock()
            .map(|sent| {
                sent.iter()
                    .filter_map(|raw| serde_json::from_str(raw).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Most recent outbound message
    pub fn last_sent(&self) -> Option<Value> {
        self.sent_messages().pop()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }

    pub fn clear_sent(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, message: String) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ClientError::Connection(
                "memory transport disconnected".to_string(),
            ));
        }

        let reply = match serde_json::from_str::<Value>(&message) {
            Ok(parsed) => self
                .responder
                .read()
                .ok()
                .and_then(|responder| responder.as_ref().and_then(|f| f(&parsed))),
            Err(_) => None,
        };

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }

        if let Some(reply) = reply {
            self.inject(reply)?;
        }

        Ok(())
    }

    fn incoming(&self) -> Option<mpsc::Receiver<String>> {
        self.inbound_rx.lock().ok().and_then(|mut rx| rx.take())
    }

    async fn close(&self) -> Result<()> {
        self.disconnect();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
