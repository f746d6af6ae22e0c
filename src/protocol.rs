//! Wire envelopes and the per-operation routing table
//!
//! All envelopes use camelCase JSON for wire compatibility with the
//! backend. Operations differ in where their body goes (`params`,
//! `message`, or inlined at the top level) and in where their result comes
//! back (`data`, `payload`, or the top level). Those differences are part of
//! the wire contract and are recorded per operation in [`Operation`] rather
//! than normalized.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level keys owned by the envelope itself
const RESERVED_KEYS: [&str; 3] = ["type", "requestId", "action"];

/// Where an operation's request body is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStyle {
    /// `{ type, requestId, params: {...} }`
    Params,
    /// `{ type, requestId, message: {...} }`
    Message,
    /// `{ type, requestId, ...fields }`
    Inline,
}

/// Where an operation's result is read from in the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultField {
    Data,
    Payload,
    /// Result fields sit next to `type`/`success` at the top level
    Root,
}

/// Routing entry for one backend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    /// Outbound `type`
    pub request_type: &'static str,
    /// Outbound `action`, for backends that multiplex one `type`
    pub action: Option<&'static str>,
    /// Inbound `type` the correlator waits for
    pub response_type: &'static str,
    pub body: BodyStyle,
    pub result: ResultField,
}

impl Operation {
    /// Operation with a `params` body and a `data` result
    pub const fn new(request_type: &'static str, response_type: &'static str) -> Self {
        Self {
            request_type,
            action: None,
            response_type,
            body: BodyStyle::Params,
            result: ResultField::Data,
        }
    }

    pub const fn with_action(self, action: &'static str) -> Self {
        Self {
            action: Some(action),
            ..self
        }
    }

    pub const fn with_body(self, body: BodyStyle) -> Self {
        Self { body, ..self }
    }

    pub const fn with_result(self, result: ResultField) -> Self {
        Self { result, ..self }
    }

    /// Build a request envelope with a fresh request id
    pub fn request(&self, body: impl Serialize) -> Result<Request> {
        let body = serde_json::to_value(body)?;
        let mut request = Request::new(self.request_type);
        request.action = self.action.map(str::to_string);

        match (self.body, body) {
            (_, Value::Null) => {}
            (BodyStyle::Params, body) => request.params = Some(body),
            (BodyStyle::Message, body) => request.message = Some(body),
            (BodyStyle::Inline, Value::Object(fields)) => {
                for (key, value) in fields {
                    if RESERVED_KEYS.contains(&key.as_str()) {
                        tracing::warn!(
                            request_type = self.request_type,
                            field = %key,
                            "Dropping inline field that collides with the envelope"
                        );
                        continue;
                    }
                    request.fields.insert(key, value);
                }
            }
            (BodyStyle::Inline, body) => request.params = Some(body),
        }

        Ok(request)
    }
}

/// Outbound request envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(rename = "type")]
    pub message_type: String,

    /// Correlation id, fresh per call
    pub request_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,

    /// Inlined body fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Request {
    /// Empty request of the given type with a random UUID request id
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            request_id: new_request_id(),
            action: None,
            params: None,
            message: None,
            fields: Map::new(),
        }
    }
}

/// Generate a request id
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Inbound message envelope
///
/// Used both for correlated replies and for unsolicited pushes. Unknown
/// top-level fields are kept in `fields` so a reply can be handed back to
/// the caller exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(rename = "type")]
    pub message_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Error string, or an error object on some operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Response {
    /// Successful reply with a `data` body
    pub fn ok(message_type: impl Into<String>, data: Value) -> Self {
        Self {
            message_type: message_type.into(),
            success: Some(true),
            data: Some(data),
            payload: None,
            error: None,
            message: None,
            request_id: None,
            fields: Map::new(),
        }
    }

    /// Logical failure reply
    pub fn failure(message_type: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            success: Some(false),
            data: None,
            payload: None,
            error: Some(Value::String(error.into())),
            message: None,
            request_id: None,
            fields: Map::new(),
        }
    }

    /// True unless the backend reported `success: false` or an `error`
    pub fn is_success(&self) -> bool {
        self.success != Some(false) && self.error.as_ref().map_or(true, Value::is_null)
    }

    /// Human-readable failure reason, if any
    pub fn error_message(&self) -> Option<String> {
        let from_value = |v: &Value| match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| Some(v.to_string())),
            other => Some(other.to_string()),
        };

        self.error
            .as_ref()
            .and_then(from_value)
            .or_else(|| self.message.as_ref().and_then(from_value))
    }

    /// Read the result section the operation declares
    pub fn result(&self, field: ResultField) -> Option<Value> {
        match field {
            ResultField::Data => self.data.clone(),
            ResultField::Payload => self.payload.clone(),
            ResultField::Root => {
                if self.fields.is_empty() {
                    None
                } else {
                    Some(Value::Object(self.fields.clone()))
                }
            }
        }
    }

    /// Read a single key inside the declared result section
    pub fn result_key(&self, field: ResultField, key: &str) -> Option<Value> {
        match field {
            ResultField::Data => self.data.as_ref().and_then(|v| v.get(key)).cloned(),
            ResultField::Payload => self.payload.as_ref().and_then(|v| v.get(key)).cloned(),
            ResultField::Root => self.fields.get(key).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PARAMS_OP: Operation = Operation::new("mail.reserveFiles", "mail.reserveFiles");
    const INLINE_OP: Operation = Operation::new("gitEvent", "gitCommitResponse")
        .with_action("Commit")
        .with_body(BodyStyle::Inline);
    const MESSAGE_OP: Operation = Operation::new("taskEvent", "createTaskResponse")
        .with_action("createTask")
        .with_body(BodyStyle::Message);

    #[test]
    fn test_params_request_shape() {
        let request = PARAMS_OP
            .request(json!({"agentId": "a1", "files": ["x.ts"]}))
            .unwrap();
        let wire = serde_json::to_value(&request).unwrap();

        assert_eq!(wire["type"], "mail.reserveFiles");
        assert_eq!(wire["params"], json!({"agentId": "a1", "files": ["x.ts"]}));
        assert!(wire.get("action").is_none());
        assert!(wire.get("message").is_none());
        assert!(!request.request_id.is_empty());
    }

    #[test]
    fn test_inline_request_shape() {
        let request = INLINE_OP.request(json!({"message": "fix", "path": "/repo"})).unwrap();
        let wire = serde_json::to_value(&request).unwrap();

        assert_eq!(wire["type"], "gitEvent");
        assert_eq!(wire["action"], "Commit");
        assert_eq!(wire["path"], "/repo");
        assert_eq!(wire["message"], "fix");
    }

    #[test]
    fn test_inline_drops_reserved_keys() {
        let request = INLINE_OP
            .request(json!({"type": "evil", "requestId": "x", "path": "/repo"}))
            .unwrap();
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["type"], "gitEvent");
        assert_ne!(wire["requestId"], "x");
        assert_eq!(wire["path"], "/repo");
    }

    #[test]
    fn test_message_request_shape() {
        let request = MESSAGE_OP.request(json!({"title": "t"})).unwrap();
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["message"], json!({"title": "t"}));
        assert!(wire.get("params").is_none());
    }

    #[test]
    fn test_null_body_omitted() {
        let request = PARAMS_OP.request(Value::Null).unwrap();
        let wire = serde_json::to_value(&request).unwrap();
        assert!(wire.get("params").is_none());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = PARAMS_OP.request(json!({})).unwrap();
        let b = PARAMS_OP.request(json!({})).unwrap();
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn test_response_success_rules() {
        let ok: Response = serde_json::from_value(json!({"type": "x"})).unwrap();
        assert!(ok.is_success());

        let failed: Response =
            serde_json::from_value(json!({"type": "x", "success": false})).unwrap();
        assert!(!failed.is_success());

        let errored: Response =
            serde_json::from_value(json!({"type": "x", "success": true, "error": "boom"}))
                .unwrap();
        assert!(!errored.is_success());
        assert_eq!(errored.error_message().unwrap(), "boom");
    }

    #[test]
    fn test_error_message_from_object_and_message() {
        let obj: Response = serde_json::from_value(
            json!({"type": "x", "success": false, "error": {"code": 4, "message": "nope"}}),
        )
        .unwrap();
        assert_eq!(obj.error_message().unwrap(), "nope");

        let msg: Response = serde_json::from_value(
            json!({"type": "x", "success": false, "message": "Agent not found"}),
        )
        .unwrap();
        assert_eq!(msg.error_message().unwrap(), "Agent not found");
    }

    #[test]
    fn test_response_preserves_unknown_fields() {
        let raw = json!({
            "type": "listAgentsResponse",
            "success": true,
            "agents": [{"id": "a"}],
            "requestId": "r-1"
        });
        let response: Response = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(response.request_id.as_deref(), Some("r-1"));
        assert_eq!(
            response.result_key(ResultField::Root, "agents").unwrap(),
            json!([{"id": "a"}])
        );
        assert_eq!(serde_json::to_value(&response).unwrap(), raw);
    }

    #[test]
    fn test_result_field_paths() {
        let response: Response = serde_json::from_value(json!({
            "type": "x",
            "data": {"event": {"eventId": "e1"}},
            "payload": {"url": "https://a"}
        }))
        .unwrap();

        assert_eq!(
            response.result_key(ResultField::Data, "event").unwrap()["eventId"],
            "e1"
        );
        assert_eq!(
            response.result_key(ResultField::Payload, "url").unwrap(),
            "https://a"
        );
        assert!(response.result(ResultField::Root).is_none());
    }
}
