//! Context rule engine tools

use super::{outcome, pretty, DeclarativeTool, Kind, NoParams, ParameterSchema, ToolErrorType, ToolResult};
use crate::modules::context_rule_engine::{ops, ContextRuleEngine, EvaluateRulesParams};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Evaluate rules against a set of variables
pub struct ContextRuleEvaluateTool {
    rules: Arc<ContextRuleEngine>,
}

impl ContextRuleEvaluateTool {
    pub fn new(rules: Arc<ContextRuleEngine>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl DeclarativeTool for ContextRuleEvaluateTool {
    type Params = EvaluateRulesParams;

    fn name(&self) -> &str {
        "context_rule_evaluate"
    }

    fn description(&self) -> &str {
        "Evaluates context rules against the given variables and reports which rules matched."
    }

    fn kind(&self) -> Kind {
        Kind::Think
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string_array("ruleEngineIds", "Rule engines to evaluate (all when omitted)", false)
            .object("variables", "Variable values the conditions are tested against", false)
    }

    fn validate(&self, params: &EvaluateRulesParams) -> Result<(), String> {
        match params.variables {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err("variables must be an object".to_string()),
        }
    }

    async fn invoke(&self, params: EvaluateRulesParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.rules.evaluate(&params).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let result = response.result(ops::EVALUATE.result).unwrap_or(Value::Null);
                let matched = result
                    .get("matchedRules")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                ToolResult::success(
                    format!("{} rule(s) matched.\n{}", matched, pretty(&result)),
                    format!("{} rule(s) matched", matched),
                )
            },
        )
    }
}

/// List configured rule engines
pub struct ContextRuleListTool {
    rules: Arc<ContextRuleEngine>,
}

impl ContextRuleListTool {
    pub fn new(rules: Arc<ContextRuleEngine>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl DeclarativeTool for ContextRuleListTool {
    type Params = NoParams;

    fn name(&self) -> &str {
        "context_rule_list"
    }

    fn description(&self) -> &str {
        "Lists the configured context rule engines."
    }

    fn kind(&self) -> Kind {
        Kind::Read
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
    }

    async fn invoke(&self, _params: NoParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.rules.list().await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let result = response.result(ops::LIST.result).unwrap_or(Value::Null);
                ToolResult::success(pretty(&result), "Listed rule engines")
            },
        )
    }
}
