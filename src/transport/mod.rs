//! Transport trait: the byte pipe under the correlator
//!
//! A transport moves serialized JSON messages to and from the backend.
//! It knows nothing about request ids or reply types; correlation lives
//! in [`MessageManager`](crate::manager::MessageManager).

use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

pub mod memory;
pub mod websocket;

pub use memory::MemoryTransport;
pub use websocket::WebSocketTransport;

/// Bidirectional message pipe to the backend
///
/// Delivery is best-effort: nothing here retries, and a reply may never
/// come. The inbound channel closing means the connection is gone.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one serialized message
    async fn send(&self, message: String) -> Result<()>;

    /// Take the inbound message receiver
    ///
    /// Only the first call returns `Some`; the correlator owns it.
    fn incoming(&self) -> Option<mpsc::Receiver<String>>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the transport is still connected
    fn is_connected(&self) -> bool;

    /// Transport name (e.g., "websocket", "memory")
    fn name(&self) -> &str;
}
