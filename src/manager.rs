//! Request/response correlator
//!
//! `MessageManager` owns the transport's inbound side. Every outbound
//! request registers a waiter keyed by `(response type, request id)`
//! before it is sent; the dispatch task resolves waiters as replies arrive
//! and hands everything else to push handlers.
//!
//! ```text
//! call(op, body) ──► register waiter ──► transport.send
//!                                             │
//! dispatch task ◄── transport inbound ◄───────┘
//!    ├── reply with requestId  → waiter (type, requestId)
//!    ├── reply without id      → oldest waiter for type
//!    └── unmatched             → push handlers for type
//! ```

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::protocol::{Operation, Request, Response};
use crate::transport::Transport;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Callback for unsolicited inbound messages of one type
pub type PushHandler = Arc<dyn Fn(&Response) + Send + Sync>;

struct Waiter {
    response_type: String,
    request_id: String,
    tx: oneshot::Sender<Response>,
}

/// Outstanding calls, ordered by registration
#[derive(Default)]
struct PendingTable {
    next_seq: u64,
    waiters: BTreeMap<u64, Waiter>,
    index: HashMap<(String, String), u64>,
}

impl PendingTable {
    /// Returns `None` if the same id is already waiting on the same type
    fn register(
        &mut self,
        response_type: &str,
        request_id: &str,
        tx: oneshot::Sender<Response>,
    ) -> Option<u64> {
        let key = (response_type.to_string(), request_id.to_string());
        if self.index.contains_key(&key) {
            return None;
        }

        self.next_seq += 1;
        let seq = self.next_seq;
        self.index.insert(key, seq);
        self.waiters.insert(
            seq,
            Waiter {
                response_type: response_type.to_string(),
                request_id: request_id.to_string(),
                tx,
            },
        );
        Some(seq)
    }

    fn remove(&mut self, seq: u64) -> Option<Waiter> {
        let waiter = self.waiters.remove(&seq)?;
        self.index
            .remove(&(waiter.response_type.clone(), waiter.request_id.clone()));
        Some(waiter)
    }

    fn take_match(&mut self, response: &Response) -> Option<Waiter> {
        let seq = match &response.request_id {
            Some(request_id) => *self
                .index
                .get(&(response.message_type.clone(), request_id.clone()))?,
            None => *self
                .waiters
                .iter()
                .find(|(_, w)| w.response_type == response.message_type)?
                .0,
        };
        self.remove(seq)
    }

    fn drain(&mut self) -> Vec<Waiter> {
        self.index.clear();
        std::mem::take(&mut self.waiters).into_values().collect()
    }

    fn len(&self) -> usize {
        self.waiters.len()
    }
}

/// Shared state between callers and the dispatch task
struct Shared {
    pending: Mutex<PendingTable>,
    handlers: RwLock<HashMap<String, Vec<PushHandler>>>,
    connected: AtomicBool,
}

impl Shared {
    fn route(&self, response: Response) {
        let waiter = match self.pending.lock() {
            Ok(mut pending) => pending.take_match(&response),
            Err(e) => {
                tracing::error!("Pending table lock poisoned: {}", e);
                return;
            }
        };

        let response = match waiter {
            Some(waiter) => {
                tracing::debug!(
                    request_id = %waiter.request_id,
                    response_type = %waiter.response_type,
                    "Reply matched"
                );
                match waiter.tx.send(response) {
                    Ok(()) => return,
                    // Caller stopped waiting; treat the reply as unsolicited
                    Err(response) => response,
                }
            }
            None => response,
        };

        let handlers = self
            .handlers
            .read()
            .ok()
            .and_then(|h| h.get(&response.message_type).cloned())
            .unwrap_or_default();

        if handlers.is_empty() {
            tracing::warn!(
                message_type = %response.message_type,
                request_id = ?response.request_id,
                "Dropping unroutable message"
            );
            return;
        }

        for handler in handlers {
            handler(&response);
        }
    }

    fn shutdown(&self) -> usize {
        let abandoned = match self.pending.lock() {
            Ok(mut pending) => {
                self.connected.store(false, Ordering::SeqCst);
                pending.drain()
            }
            Err(_) => {
                self.connected.store(false, Ordering::SeqCst);
                Vec::new()
            }
        };
        // Dropping the senders wakes every waiter with a disconnect
        abandoned.len()
    }

    fn unregister(&self, seq: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(seq);
        }
    }
}

/// Correlates outbound requests with inbound replies over one transport
pub struct MessageManager {
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
    request_timeout: Option<Duration>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl MessageManager {
    /// Take ownership of the transport's inbound side and start dispatching
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(transport: Arc<dyn Transport>, config: &ClientConfig) -> Result<Self> {
        let inbound = transport.incoming().ok_or_else(|| {
            ClientError::Connection(format!(
                "{} transport inbound channel is already owned",
                transport.name()
            ))
        })?;

        let shared = Arc::new(Shared {
            pending: Mutex::new(PendingTable::default()),
            handlers: RwLock::new(HashMap::new()),
            connected: AtomicBool::new(true),
        });

        let dispatcher = tokio::spawn(dispatch(inbound, shared.clone()));

        tracing::debug!(transport = transport.name(), "Message manager started");

        Ok(Self {
            transport,
            shared,
            request_timeout: config.request_timeout(),
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }

    /// Override the reply timeout (`None` waits indefinitely)
    pub fn set_request_timeout(&mut self, timeout: Option<Duration>) {
        self.request_timeout = timeout;
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Send a request and wait for the reply of `expected_type`
    pub async fn send_and_wait(&self, request: Request, expected_type: &str) -> Result<Response> {
        self.wait_for_reply(request, expected_type, None).await
    }

    /// Like `send_and_wait`, abandoning the wait when `cancel` fires
    ///
    /// The request may already be on the wire; cancelling only stops
    /// waiting for it.
    pub async fn send_and_wait_cancellable(
        &self,
        request: Request,
        expected_type: &str,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        self.wait_for_reply(request, expected_type, Some(cancel)).await
    }

    /// Call a routed operation
    pub async fn call(&self, op: &Operation, body: impl Serialize) -> Result<Response> {
        let request = op.request(body)?;
        self.send_and_wait(request, op.response_type).await
    }

    /// Call a routed operation with a cancellation token
    pub async fn call_cancellable(
        &self,
        op: &Operation,
        body: impl Serialize,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let request = op.request(body)?;
        self.send_and_wait_cancellable(request, op.response_type, cancel)
            .await
    }

    /// Send without waiting for any reply
    pub async fn send(&self, request: Request) -> Result<()> {
        let raw = serde_json::to_string(&request)?;
        self.transport
            .send(raw)
            .await
            .map_err(|e| ClientError::Send {
                message_type: request.message_type.clone(),
                reason: e.to_string(),
            })
    }

    /// Register a handler for unsolicited messages of `message_type`
    pub fn subscribe(
        &self,
        message_type: impl Into<String>,
        handler: impl Fn(&Response) + Send + Sync + 'static,
    ) {
        let message_type = message_type.into();
        match self.shared.handlers.write() {
            Ok(mut handlers) => {
                tracing::debug!(message_type = %message_type, "Push handler registered");
                handlers
                    .entry(message_type)
                    .or_default()
                    .push(Arc::new(handler));
            }
            Err(e) => tracing::error!("Handler table lock poisoned: {}", e),
        }
    }

    /// Remove every push handler for `message_type`
    pub fn unsubscribe(&self, message_type: &str) -> bool {
        self.shared
            .handlers
            .write()
            .map(|mut handlers| handlers.remove(message_type).is_some())
            .unwrap_or(false)
    }

    /// Number of calls still waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst) && self.transport.is_connected()
    }

    /// Close the transport; pending calls fail with `Disconnected`
    pub async fn close(&self) -> Result<()> {
        self.transport.close().await
    }

    async fn wait_for_reply(
        &self,
        request: Request,
        expected_type: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response> {
        let (tx, rx) = oneshot::channel();

        let seq = {
            let mut pending = self.shared.pending.lock().map_err(|e| {
                ClientError::Connection(format!("Pending table lock poisoned: {}", e))
            })?;
            // Checked under the lock so shutdown cannot slip in between
            if !self.shared.connected.load(Ordering::SeqCst) {
                return Err(ClientError::Disconnected(expected_type.to_string()));
            }
            pending
                .register(expected_type, &request.request_id, tx)
                .ok_or_else(|| ClientError::DuplicateRequest {
                    request_id: request.request_id.clone(),
                    response_type: expected_type.to_string(),
                })?
        };

        let raw = match serde_json::to_string(&request) {
            Ok(raw) => raw,
            Err(e) => {
                self.shared.unregister(seq);
                return Err(e.into());
            }
        };

        tracing::debug!(
            request_id = %request.request_id,
            request_type = %request.message_type,
            action = ?request.action,
            response_type = %expected_type,
            "Sending request"
        );

        if let Err(e) = self.transport.send(raw).await {
            self.shared.unregister(seq);
            return Err(ClientError::Send {
                message_type: request.message_type,
                reason: e.to_string(),
            });
        }

        let timeout = self.request_timeout;
        let timed_out = async move {
            match timeout {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };
        let cancelled = async move {
            match cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        let outcome = tokio::select! {
            reply = rx => reply.map_err(|_| ClientError::Disconnected(expected_type.to_string())),
            _ = timed_out => Err(ClientError::Timeout {
                response_type: expected_type.to_string(),
                secs: timeout.map(|d| d.as_secs()).unwrap_or_default(),
            }),
            _ = cancelled => Err(ClientError::Cancelled(expected_type.to_string())),
        };

        if let Err(ref e) = outcome {
            self.shared.unregister(seq);
            tracing::debug!(
                request_id = %request.request_id,
                response_type = %expected_type,
                error = %e,
                "Request abandoned"
            );
        }

        outcome
    }
}

impl Drop for MessageManager {
    fn drop(&mut self) {
        if let Ok(mut dispatcher) = self.dispatcher.lock() {
            if let Some(handle) = dispatcher.take() {
                handle.abort();
            }
        }
    }
}

async fn dispatch(mut inbound: mpsc::Receiver<String>, shared: Arc<Shared>) {
    while let Some(raw) = inbound.recv().await {
        match serde_json::from_str::<Response>(&raw) {
            Ok(response) => shared.route(response),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping inbound message that is not a valid envelope");
            }
        }
    }

    let abandoned = shared.shutdown();
    tracing::info!(abandoned, "Transport closed, dispatcher stopped");
}
