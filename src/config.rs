//! Client configuration

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// What to do when an event id is acknowledged a second time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplicateAckPolicy {
    /// Send every acknowledgement to the backend and let it decide
    #[default]
    Forward,
    /// Answer repeats locally with a successful response, no network call
    Ignore,
    /// Fail repeats with `ClientError::AlreadyAcknowledged`
    Reject,
}

/// Connection and client-side bookkeeping settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// WebSocket endpoint (`ws://` or `wss://`)
    pub url: String,

    /// Per-request reply timeout in seconds
    ///
    /// `None` waits until a reply or a disconnect. No default is assumed.
    pub request_timeout_secs: Option<u64>,

    /// Maximum number of push-delivered events held in the local cache
    pub event_cache_capacity: usize,

    /// Handling of repeated acknowledgements for the same event id
    pub duplicate_ack: DuplicateAckPolicy,

    /// Depth of the inbound message channel between reader and dispatcher
    pub inbound_buffer: usize,

    /// Extra HTTP headers sent with the WebSocket handshake
    pub headers: HashMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:12345".to_string(),
            request_timeout_secs: None,
            event_cache_capacity: 1000,
            duplicate_ack: DuplicateAckPolicy::Forward,
            inbound_buffer: 256,
            headers: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Create a config for the given endpoint with defaults elsewhere
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Load a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            ClientError::Config(format!("Failed to parse config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    pub fn with_event_cache_capacity(mut self, capacity: usize) -> Self {
        self.event_cache_capacity = capacity;
        self
    }

    pub fn with_duplicate_ack(mut self, policy: DuplicateAckPolicy) -> Self {
        self.duplicate_ack = policy;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Request timeout as a `Duration`, if one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Check the config for values the client cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(ClientError::Config(format!(
                "url must start with ws:// or wss://, got '{}'",
                self.url
            )));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ClientError::Config(
                "requestTimeoutSecs must be greater than zero".to_string(),
            ));
        }
        if self.event_cache_capacity == 0 {
            return Err(ClientError::Config(
                "eventCacheCapacity must be greater than zero".to_string(),
            ));
        }
        if self.inbound_buffer == 0 {
            return Err(ClientError::Config(
                "inboundBuffer must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
