//! Tool adapters for LLM tool-calling harnesses
//!
//! Each tool wraps exactly one module call. Execution order is fixed:
//!
//! ```text
//! args ──► schema check ──► decode ──► validate ──► invoke ──► ToolResult
//!            └────────── INVALID_TOOL_PARAMS, nothing sent ──┘
//! ```
//!
//! Transport errors become `EXECUTION_FAILED`; backend `success: false`
//! becomes the tool's own failure type.

mod agent;
mod browser;
mod context_rule_engine;
mod crawler;
mod event_queue;
mod git;
mod mail;
mod rag;
mod registry;
mod requirement_plan;
mod review_merge_request;
mod schema;
mod search;
mod task;

pub use agent::{AgentDetailsTool, AgentFindTool, AgentListTool, AgentStartTool};
pub use browser::BrowserActionTool;
pub use context_rule_engine::{ContextRuleEvaluateTool, ContextRuleListTool};
pub use crawler::CrawlerActionTool;
pub use event_queue::{
    EventQueueAckTool, EventQueueAddEventTool, EventQueueClearCacheTool,
    EventQueueGetPendingTool, EventQueueLocalCacheTool, EventQueueSendMessageTool,
    EventQueueStatsTool, EventQueueWaitNextTool,
};
pub use git::GitActionTool;
pub use mail::{
    MailCheckConflictsTool, MailFetchInboxTool, MailListReservationsTool, MailRegisterAgentTool,
    MailReleaseFilesTool, MailReserveFilesTool, MailSendMessageTool,
};
pub use rag::RagRetrieveTool;
pub use registry::{ToolDefinition, ToolRegistry};
pub use requirement_plan::{RequirementPlanCreateTool, RequirementPlanGetTool};
pub use review_merge_request::{
    ReviewRequestCreateTool, ReviewRequestGetTool, ReviewRequestMergeTool,
};
pub use schema::ParameterSchema;
pub use search::WebSearchTool;
pub use task::{
    TaskAssignAgentTool, TaskCreateTool, TaskDeleteTool, TaskGetTool, TaskListTool,
    TaskUpdateTool,
};

use crate::client::CodeboltClient;
use crate::error::ClientError;
use crate::protocol::Response;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Permission category of a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Read,
    Edit,
    Delete,
    Move,
    Search,
    Execute,
    Think,
    Fetch,
    Other,
}

/// Failure taxonomy reported in [`ToolError::error_type`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorType {
    InvalidToolParams,
    Unknown,
    ToolNotRegistered,
    ExecutionFailed,
    FileNotFound,
    GitExecutionError,
    BrowserExecutionError,
    AgentNotFound,
    TaskNotFound,
}

impl ToolErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidToolParams => "invalid_tool_params",
            Self::Unknown => "unknown",
            Self::ToolNotRegistered => "tool_not_registered",
            Self::ExecutionFailed => "execution_failed",
            Self::FileNotFound => "file_not_found",
            Self::GitExecutionError => "git_execution_error",
            Self::BrowserExecutionError => "browser_execution_error",
            Self::AgentNotFound => "agent_not_found",
            Self::TaskNotFound => "task_not_found",
        }
    }
}

impl fmt::Display for ToolErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ToolErrorType,
}

/// Diff rendering for file-changing tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    pub file_diff: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_content: Option<String>,
    pub new_content: String,
}

/// Human-facing view of a tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReturnDisplay {
    Text(String),
    FileDiff(FileDiff),
}

impl From<String> for ReturnDisplay {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ReturnDisplay {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Outcome of a tool invocation
///
/// `llm_content` goes back into the model's context; `return_display` is
/// shown to the user. `error` is the only failure signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub llm_content: String,
    pub return_display: ReturnDisplay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolResult {
    pub fn success(llm_content: impl Into<String>, return_display: impl Into<ReturnDisplay>) -> Self {
        Self {
            llm_content: llm_content.into(),
            return_display: return_display.into(),
            error: None,
        }
    }

    pub fn error(error_type: ToolErrorType, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            llm_content: format!("Error: {}", message),
            return_display: ReturnDisplay::Text(format!("Error: {}", message)),
            error: Some(ToolError {
                message,
                error_type,
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_type(&self) -> Option<ToolErrorType> {
        self.error.as_ref().map(|e| e.error_type)
    }
}

/// Object-safe tool interface the registry stores
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name within a registry
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn kind(&self) -> Kind;

    /// Parameter descriptor published to the harness
    fn parameters(&self) -> Value;

    /// Run the tool; never fails, errors are reported in the result
    async fn execute(&self, args: &Value, cancel: &CancellationToken) -> ToolResult;
}

/// Typed tool definition
///
/// Implementors get [`Tool`] for free; the blanket impl checks the schema,
/// decodes `Params`, runs [`validate`](Self::validate) and only then calls
/// [`invoke`](Self::invoke).
#[async_trait]
pub trait DeclarativeTool: Send + Sync {
    type Params: DeserializeOwned + Send;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn kind(&self) -> Kind;

    fn schema(&self) -> ParameterSchema;

    /// Semantic checks the schema cannot express
    fn validate(&self, _params: &Self::Params) -> Result<(), String> {
        Ok(())
    }

    async fn invoke(&self, params: Self::Params, cancel: &CancellationToken) -> ToolResult;
}

#[async_trait]
impl<T: DeclarativeTool> Tool for T {
    fn name(&self) -> &str {
        DeclarativeTool::name(self)
    }

    fn description(&self) -> &str {
        DeclarativeTool::description(self)
    }

    fn kind(&self) -> Kind {
        DeclarativeTool::kind(self)
    }

    fn parameters(&self) -> Value {
        self.schema().to_json()
    }

    async fn execute(&self, args: &Value, cancel: &CancellationToken) -> ToolResult {
        if let Err(message) = self.schema().check(args) {
            return ToolResult::error(ToolErrorType::InvalidToolParams, message);
        }

        let params: T::Params = match serde_json::from_value(args.clone()) {
            Ok(params) => params,
            Err(e) => {
                return ToolResult::error(
                    ToolErrorType::InvalidToolParams,
                    format!("Invalid parameters: {}", e),
                );
            }
        };

        if let Err(message) = self.validate(&params) {
            return ToolResult::error(ToolErrorType::InvalidToolParams, message);
        }

        self.invoke(params, cancel).await
    }
}

/// Map a module call result onto a [`ToolResult`]
///
/// `render` only sees successful responses.
pub(crate) fn outcome(
    result: Result<Response, ClientError>,
    failure: ToolErrorType,
    render: impl FnOnce(&Response) -> ToolResult,
) -> ToolResult {
    match result {
        Err(e) => ToolResult::error(ToolErrorType::ExecutionFailed, e.to_string()),
        Ok(response) if !response.is_success() => ToolResult::error(
            failure,
            response
                .error_message()
                .unwrap_or_else(|| format!("{} failed", response.message_type)),
        ),
        Ok(response) => render(&response),
    }
}

/// Parameters of tools that take none
#[derive(Debug, Default, Deserialize)]
pub struct NoParams {}

/// Pretty JSON for tool output
pub(crate) fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Registry with every built-in tool bound to `client`
pub fn builtin_registry(client: &CodeboltClient) -> ToolRegistry {
    let registry = ToolRegistry::new();
    let queue = client.event_queue();

    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(EventQueueAddEventTool::new(queue.clone())),
        Arc::new(EventQueueSendMessageTool::new(queue.clone())),
        Arc::new(EventQueueGetPendingTool::new(queue.clone())),
        Arc::new(EventQueueWaitNextTool::new(queue.clone())),
        Arc::new(EventQueueAckTool::new(queue.clone())),
        Arc::new(EventQueueStatsTool::new(queue.clone())),
        Arc::new(EventQueueLocalCacheTool::new(queue.clone())),
        Arc::new(EventQueueClearCacheTool::new(queue.clone())),
        Arc::new(MailRegisterAgentTool::new(client.mail().clone())),
        Arc::new(MailSendMessageTool::new(client.mail().clone())),
        Arc::new(MailFetchInboxTool::new(client.mail().clone())),
        Arc::new(MailReserveFilesTool::new(client.mail().clone())),
        Arc::new(MailReleaseFilesTool::new(client.mail().clone())),
        Arc::new(MailCheckConflictsTool::new(client.mail().clone())),
        Arc::new(MailListReservationsTool::new(client.mail().clone())),
        Arc::new(GitActionTool::new(client.git().clone())),
        Arc::new(BrowserActionTool::new(client.browser().clone())),
        Arc::new(CrawlerActionTool::new(client.crawler().clone())),
        Arc::new(TaskCreateTool::new(client.tasks().clone())),
        Arc::new(TaskListTool::new(client.tasks().clone())),
        Arc::new(TaskGetTool::new(client.tasks().clone())),
        Arc::new(TaskUpdateTool::new(client.tasks().clone())),
        Arc::new(TaskDeleteTool::new(client.tasks().clone())),
        Arc::new(TaskAssignAgentTool::new(client.tasks().clone())),
        Arc::new(AgentFindTool::new(client.agents().clone())),
        Arc::new(AgentStartTool::new(client.agents().clone())),
        Arc::new(AgentListTool::new(client.agents().clone())),
        Arc::new(AgentDetailsTool::new(client.agents().clone())),
        Arc::new(ContextRuleEvaluateTool::new(client.context_rules().clone())),
        Arc::new(ContextRuleListTool::new(client.context_rules().clone())),
        Arc::new(RequirementPlanGetTool::new(client.requirement_plans().clone())),
        Arc::new(RequirementPlanCreateTool::new(client.requirement_plans().clone())),
        Arc::new(ReviewRequestCreateTool::new(client.review_requests().clone())),
        Arc::new(ReviewRequestGetTool::new(client.review_requests().clone())),
        Arc::new(ReviewRequestMergeTool::new(client.review_requests().clone())),
        Arc::new(RagRetrieveTool::new(client.rag().clone())),
        Arc::new(WebSearchTool::new(client.search().clone())),
    ];

    for tool in tools {
        registry.register(tool);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[derive(Deserialize)]
    struct EchoParams {
        text: String,
    }

    #[async_trait]
    impl DeclarativeTool for EchoTool {
        type Params = EchoParams;

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo text back"
        }

        fn kind(&self) -> Kind {
            Kind::Other
        }

        fn schema(&self) -> ParameterSchema {
            ParameterSchema::new().string("text", "Text to echo", true)
        }

        fn validate(&self, params: &EchoParams) -> Result<(), String> {
            if params.text.trim().is_empty() {
                return Err("text must not be blank".to_string());
            }
            Ok(())
        }

        async fn invoke(&self, params: EchoParams, _cancel: &CancellationToken) -> ToolResult {
            ToolResult::success(params.text.clone(), params.text)
        }
    }

    async fn run(args: Value) -> ToolResult {
        Tool::execute(&EchoTool, &args, &CancellationToken::new()).await
    }

    #[tokio::test]
    async fn test_declarative_pipeline() {
        let ok = run(json!({"text": "hi"})).await;
        assert!(!ok.is_error());
        assert_eq!(ok.llm_content, "hi");

        let missing = run(json!({})).await;
        assert_eq!(missing.error_type(), Some(ToolErrorType::InvalidToolParams));

        let wrong_type = run(json!({"text": 5})).await;
        assert_eq!(wrong_type.error_type(), Some(ToolErrorType::InvalidToolParams));

        let blank = run(json!({"text": "  "})).await;
        assert_eq!(blank.error.unwrap().message, "text must not be blank");
    }

    #[test]
    fn test_error_type_wire_names() {
        assert_eq!(
            serde_json::to_value(ToolErrorType::InvalidToolParams).unwrap(),
            json!("invalid_tool_params")
        );
        assert_eq!(
            serde_json::to_value(ToolErrorType::BrowserExecutionError).unwrap(),
            json!(ToolErrorType::BrowserExecutionError.as_str())
        );
        assert_eq!(serde_json::to_value(Kind::Fetch).unwrap(), json!("fetch"));
    }

    #[test]
    fn test_result_serialization() {
        let result = ToolResult::error(ToolErrorType::TaskNotFound, "no such task");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["error"]["type"], "task_not_found");
        assert_eq!(value["error"]["message"], "no such task");
        assert_eq!(value["returnDisplay"], "Error: no such task");
    }

    #[test]
    fn test_outcome_mapping() {
        let failed = outcome(
            Ok(Response::failure("gitCommitResponse", "boom")),
            ToolErrorType::GitExecutionError,
            |_| unreachable!(),
        );
        assert_eq!(failed.error_type(), Some(ToolErrorType::GitExecutionError));
        assert_eq!(failed.error.unwrap().message, "boom");

        let transport = outcome(
            Err(ClientError::Disconnected("gitCommitResponse".into())),
            ToolErrorType::GitExecutionError,
            |_| unreachable!(),
        );
        assert_eq!(transport.error_type(), Some(ToolErrorType::ExecutionFailed));

        let ok = outcome(
            Ok(Response::ok("gitCommitResponse", json!({}))),
            ToolErrorType::GitExecutionError,
            |_| ToolResult::success("done", "done"),
        );
        assert!(!ok.is_error());
    }
}
