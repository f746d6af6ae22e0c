//! Requirement plan tools

use super::{outcome, pretty, DeclarativeTool, Kind, ParameterSchema, ToolErrorType, ToolResult};
use crate::modules::requirement_plan::{ops, RequirementPlanService};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPlanParams {
    file_path: String,
}

/// Read a requirement plan document
pub struct RequirementPlanGetTool {
    plans: Arc<RequirementPlanService>,
}

impl RequirementPlanGetTool {
    pub fn new(plans: Arc<RequirementPlanService>) -> Self {
        Self { plans }
    }
}

#[async_trait]
impl DeclarativeTool for RequirementPlanGetTool {
    type Params = GetPlanParams;

    fn name(&self) -> &str {
        "requirement_plan_get"
    }

    fn description(&self) -> &str {
        "Reads a requirement plan document and its sections."
    }

    fn kind(&self) -> Kind {
        Kind::Read
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new().string("filePath", "Path of the plan document", true)
    }

    async fn invoke(&self, params: GetPlanParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.plans.get(&params.file_path).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let plan = response.result(ops::GET.result).unwrap_or(Value::Null);
                ToolResult::success(pretty(&plan), format!("Read {}", params.file_path))
            },
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanParams {
    file_name: String,
}

/// Create an empty requirement plan
pub struct RequirementPlanCreateTool {
    plans: Arc<RequirementPlanService>,
}

impl RequirementPlanCreateTool {
    pub fn new(plans: Arc<RequirementPlanService>) -> Self {
        Self { plans }
    }
}

#[async_trait]
impl DeclarativeTool for RequirementPlanCreateTool {
    type Params = CreatePlanParams;

    fn name(&self) -> &str {
        "requirement_plan_create"
    }

    fn description(&self) -> &str {
        "Creates a new requirement plan document."
    }

    fn kind(&self) -> Kind {
        Kind::Edit
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new().string("fileName", "Name of the new plan (without extension)", true)
    }

    fn validate(&self, params: &CreatePlanParams) -> Result<(), String> {
        let name = params.file_name.trim();
        if name.is_empty() {
            return Err("fileName must not be empty".to_string());
        }
        if name.contains('/') || name.contains('\\') {
            return Err("fileName must not contain path separators".to_string());
        }
        Ok(())
    }

    async fn invoke(&self, params: CreatePlanParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.plans.create(&params.file_name).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let path = response
                    .result_key(ops::CREATE.result, "filePath")
                    .and_then(|path| path.as_str().map(str::to_string))
                    .unwrap_or_else(|| params.file_name.clone());
                ToolResult::success(
                    format!("Requirement plan created at {}.", path),
                    format!("Created {}", path),
                )
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::test_support::replying;
    use crate::tools::Tool;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_reads_payload_path() {
        let (transport, manager) = replying(
            "requirementPlanResponse",
            json!({"payload": {"filePath": "plans/auth.plan"}}),
        );
        let tool = RequirementPlanCreateTool::new(Arc::new(RequirementPlanService::new(manager)));

        let result = tool
            .execute(&json!({"fileName": "auth"}), &CancellationToken::new())
            .await;
        assert_eq!(result.llm_content, "Requirement plan created at plans/auth.plan.");
        assert_eq!(transport.last_sent().unwrap()["params"]["fileName"], "auth");
    }

    #[tokio::test]
    async fn test_get_failure_is_execution_failed() {
        let (_transport, manager) = replying(
            "requirementPlanResponse",
            json!({"success": false, "error": "boom"}),
        );
        let tool = RequirementPlanGetTool::new(Arc::new(RequirementPlanService::new(manager)));

        let result = tool
            .execute(&json!({"filePath": "nope.plan"}), &CancellationToken::new())
            .await;
        assert_eq!(result.error_type(), Some(ToolErrorType::ExecutionFailed));
        assert_eq!(result.llm_content, "Error: boom");
    }

    #[tokio::test]
    async fn test_create_rejects_paths() {
        let (transport, manager) = replying("requirementPlanResponse", json!({}));
        let tool = RequirementPlanCreateTool::new(Arc::new(RequirementPlanService::new(manager)));

        let result = tool
            .execute(&json!({"fileName": "../etc"}), &CancellationToken::new())
            .await;
        assert_eq!(result.error_type(), Some(ToolErrorType::InvalidToolParams));
        assert_eq!(transport.sent_count(), 0);
    }
}
