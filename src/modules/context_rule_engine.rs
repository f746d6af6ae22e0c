//! Context rule engine: rules that decide which context an agent receives

use crate::error::Result;
use crate::manager::MessageManager;
use crate::protocol::Response;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub mod ops {
    use crate::protocol::{BodyStyle, Operation};

    const fn rule_op(action: &'static str) -> Operation {
        Operation::new("contextRuleEngineEvent", "contextRuleEngineResponse")
            .with_action(action)
            .with_body(BodyStyle::Message)
    }

    pub const CREATE: Operation = rule_op("create");
    pub const GET: Operation = rule_op("get");
    pub const LIST: Operation = rule_op("list");
    pub const UPDATE: Operation = rule_op("update");
    pub const DELETE: Operation = rule_op("delete");
    pub const EVALUATE: Operation = rule_op("evaluate");
    pub const GET_POSSIBLE_VARIABLES: Operation = rule_op("getPossibleVariables");
}

/// Input to `evaluate`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRulesParams {
    /// Restrict evaluation to these rule engines (all if empty)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_engine_ids: Vec<String>,
    /// Variable values the conditions are tested against
    #[serde(default)]
    pub variables: Value,
}

pub struct ContextRuleEngine {
    manager: Arc<MessageManager>,
}

impl ContextRuleEngine {
    pub fn new(manager: Arc<MessageManager>) -> Self {
        Self { manager }
    }

    /// Create a rule engine from its configuration object
    pub async fn create(&self, config: Value) -> Result<Response> {
        self.manager
            .call(&ops::CREATE, json!({ "config": config }))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Response> {
        self.manager.call(&ops::GET, json!({ "id": id })).await
    }

    pub async fn list(&self) -> Result<Response> {
        self.manager.call(&ops::LIST, json!({})).await
    }

    pub async fn update(&self, id: &str, updates: Value) -> Result<Response> {
        self.manager
            .call(&ops::UPDATE, json!({ "id": id, "updates": updates }))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<Response> {
        self.manager.call(&ops::DELETE, json!({ "id": id })).await
    }

    pub async fn evaluate(&self, params: &EvaluateRulesParams) -> Result<Response> {
        self.manager.call(&ops::EVALUATE, params).await
    }

    /// Variables that rule conditions may reference
    pub async fn get_possible_variables(&self) -> Result<Response> {
        self.manager
            .call(&ops::GET_POSSIBLE_VARIABLES, json!({}))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::test_support::replying;

    #[tokio::test]
    async fn test_get_returns_reply_unchanged() {
        let body = json!({"data": {"ruleEngine": {"id": "r1", "rules": []}}, "extra": 7});
        let (transport, manager) = replying("contextRuleEngineResponse", body);
        let engine = ContextRuleEngine::new(manager);

        let response = engine.get("r1").await.unwrap();

        let sent = transport.last_sent().unwrap();
        assert_eq!(sent["type"], "contextRuleEngineEvent");
        assert_eq!(sent["action"], "get");
        assert_eq!(sent["message"], json!({"id": "r1"}));

        let expected = json!({
            "type": "contextRuleEngineResponse",
            "requestId": sent["requestId"],
            "success": true,
            "data": {"ruleEngine": {"id": "r1", "rules": []}},
            "extra": 7
        });
        assert_eq!(serde_json::to_value(&response).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_evaluate_body() {
        let (transport, manager) = replying("contextRuleEngineResponse", json!({}));
        let engine = ContextRuleEngine::new(manager);

        engine
            .evaluate(&EvaluateRulesParams {
                rule_engine_ids: vec!["r1".into()],
                variables: json!({"language": "rust"}),
            })
            .await
            .unwrap();

        let sent = transport.last_sent().unwrap();
        assert_eq!(sent["action"], "evaluate");
        assert_eq!(sent["message"]["ruleEngineIds"], json!(["r1"]));
        assert_eq!(sent["message"]["variables"]["language"], "rust");
    }
}
