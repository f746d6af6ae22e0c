//! Error types for codebolt-sdk

use thiserror::Error;

/// Errors raised by the client, transport and correlator
///
/// Backend-side failures (`success: false`) are not errors at this level;
/// they arrive as an ordinary [`Response`](crate::protocol::Response).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not establish the transport connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Outbound message could not be handed to the transport
    #[error("Failed to send '{message_type}': {reason}")]
    Send {
        message_type: String,
        reason: String,
    },

    /// The transport went away while a reply was outstanding
    #[error("Disconnected while waiting for '{0}'")]
    Disconnected(String),

    /// No reply arrived within the configured timeout
    #[error("Timed out after {secs}s waiting for '{response_type}'")]
    Timeout { response_type: String, secs: u64 },

    /// The caller cancelled the wait
    #[error("Cancelled while waiting for '{0}'")]
    Cancelled(String),

    /// A request with the same id is already waiting for the same reply type
    #[error("Request '{request_id}' is already pending for '{response_type}'")]
    DuplicateRequest {
        request_id: String,
        response_type: String,
    },

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reply did not have the expected shape
    #[error("Malformed response '{response_type}': {reason}")]
    MalformedResponse {
        response_type: String,
        reason: String,
    },

    /// Event was already acknowledged and the duplicate-ack policy rejects repeats
    #[error("Event already acknowledged: {0}")]
    AlreadyAcknowledged(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// WebSocket protocol failure
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
